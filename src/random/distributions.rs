//! Distributions over a `RandomSource`
//!
//! Each function consumes a fixed, documented number of draws (the Beta
//! sampler's rejection loops are the exception and are replayed exactly).

use std::f64::consts::{E, TAU};

use glam::Vec3;

use super::stream::RandomSource;

/// 1 + ln(4.5), from Cheng's gamma rejection sampler
const SG_MAGICCONST: f64 = 2.504_077_396_776_274;
/// ln(4)
const LOG4: f64 = 1.386_294_361_119_890_6;
/// Largest value produced by `create_random_hex` (0xFFFFFF exclusive)
const HEX_SCALE: f64 = 16_777_215.0;

/// Uniform float in [min, max). One draw.
#[inline]
pub fn in_range(src: &mut impl RandomSource, min: f64, max: f64) -> f64 {
    min + src.draw() * (max - min)
}

/// Uniform integer in [min, max). One draw, floored.
#[inline]
pub fn in_range_int(src: &mut impl RandomSource, min: i32, max: i32) -> i32 {
    in_range(src, min as f64, max as f64).floor() as i32
}

/// Normal sample via Box-Muller. Two draws: radius then angle.
pub fn in_gaussian(src: &mut impl RandomSource, mean: f64, std_dev: f64) -> f64 {
    let u1 = src.draw();
    let u2 = src.draw();
    // 1 - u1 keeps the log argument in (0, 1]
    let radius = (-2.0 * (1.0 - u1).ln()).sqrt();
    mean + std_dev * radius * (TAU * u2).cos()
}

/// Beta(alpha, beta) sample as the ratio of two unit-scale gamma samples.
///
/// Draws for `alpha` first, then `beta`. Both shape parameters must be > 0.
pub fn in_beta(src: &mut impl RandomSource, alpha: f64, beta: f64) -> f64 {
    let base = gamma(src, alpha);
    base / (base + gamma(src, beta))
}

/// Unit-scale gamma sampler with three branches on `alpha`.
///
/// - `alpha > 1`: Cheng's rejection method, two draws per attempt. The first
///   draw is discarded on its own if it falls outside (1e-7, 0.9999999).
/// - `alpha == 1`: exponential, redrawing while the draw is <= 1e-7.
/// - `alpha < 1`: two draws per attempt, accepting against `p / alpha` and
///   `x^alpha - 1` rather than the textbook Ahrens-Dieter form. Shared seeds
///   depend on this exact sequence.
fn gamma(src: &mut impl RandomSource, alpha: f64) -> f64 {
    debug_assert!(alpha > 0.0, "gamma shape must be positive");

    if alpha > 1.0 {
        let ainv = (2.0 * alpha - 1.0).sqrt();
        let bbb = alpha - LOG4;
        let ccc = alpha + ainv;

        loop {
            let u1 = src.draw();
            if !(u1 > 1e-7 && u1 < 0.999_999_9) {
                continue;
            }

            let u2 = 1.0 - src.draw();
            let v = (u1 / (1.0 - u1)).ln() / ainv;
            let x = alpha * v.exp();
            let z = u1 * u1 * u2;
            let r = bbb + ccc * v - x;

            if r + SG_MAGICCONST - 4.5 * z >= 0.0 || r >= z.ln() {
                return x;
            }
        }
    } else if alpha == 1.0 {
        let mut u = src.draw();
        while u <= 1e-7 {
            u = src.draw();
        }
        -u.ln()
    } else {
        let b = (E + alpha) / E;
        loop {
            let u3 = src.draw();
            let p = b * u3;
            let x = if p <= 1.0 {
                p / alpha
            } else {
                -((b - p) / alpha).ln()
            };

            let u4 = src.draw();
            let accepted = if p > 1.0 {
                u4 <= x.powf(alpha) - 1.0
            } else {
                u4 <= (-x).exp()
            };
            if accepted {
                return x;
            }
        }
    }
}

/// Uniformly chosen item. One draw. `None` for an empty slice.
pub fn pick<'a, T>(src: &mut impl RandomSource, items: &'a [T]) -> Option<&'a T> {
    let u = src.draw();
    if items.is_empty() {
        return None;
    }
    let index = ((u * items.len() as f64).floor() as usize).min(items.len() - 1);
    items.get(index)
}

/// +1 when the draw exceeds `probability`, otherwise -1. One draw.
#[inline]
pub fn create_sign(src: &mut impl RandomSource, probability: f64) -> i32 {
    if src.draw() > probability { 1 } else { -1 }
}

/// Point inside a `width` x `height` rectangle. Two draws: x then y.
#[inline]
pub fn in_square(src: &mut impl RandomSource, width: f64, height: f64) -> (f64, f64) {
    let x = src.draw() * width;
    let y = src.draw() * height;
    (x, y)
}

/// Random `#rrggbb` color. One draw per attempt.
///
/// Five hex digits are padded with a trailing `0`; anything shorter is
/// redrawn, so the result is always six digits.
pub fn create_random_hex(src: &mut impl RandomSource) -> String {
    loop {
        let value = (src.draw() * HEX_SCALE).floor() as u32;
        let digits = format!("{value:x}");
        match digits.len() {
            6 => return format!("#{digits}"),
            5 => return format!("#{digits}0"),
            _ => continue,
        }
    }
}

/// Parse `#rrggbb` into normalized RGB
pub fn hex_to_rgb(hex: &str) -> Option<Vec3> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(digits.get(range)?, 16)
            .ok()
            .map(|c| c as f32 / 255.0)
    };
    Some(Vec3::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededStream;
    use proptest::prelude::*;

    /// Replays a fixed list of draws, cycling when exhausted
    struct Scripted {
        values: Vec<f64>,
        cursor: usize,
    }

    impl Scripted {
        fn new(values: &[f64]) -> Self {
            Self {
                values: values.to_vec(),
                cursor: 0,
            }
        }
    }

    impl RandomSource for Scripted {
        fn draw(&mut self) -> f64 {
            let v = self.values[self.cursor % self.values.len()];
            self.cursor += 1;
            v
        }
    }

    fn is_hex_color(s: &str) -> bool {
        s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
    }

    #[test]
    fn test_in_range_maps_linearly() {
        let mut src = Scripted::new(&[0.0, 0.5, 0.999]);
        assert_eq!(in_range(&mut src, 10.0, 20.0), 10.0);
        assert_eq!(in_range(&mut src, 10.0, 20.0), 15.0);
        assert_eq!(in_range_int(&mut src, 0, 10), 9);
        assert_eq!(src.cursor, 3);
    }

    #[test]
    fn test_in_gaussian_uses_two_draws() {
        // u1 = 1 - e^-0.5 gives radius 1, u2 = 0 gives cos = 1
        let mut src = Scripted::new(&[1.0 - (-0.5f64).exp(), 0.0]);
        let v = in_gaussian(&mut src, 2.0, 0.5);
        assert!((v - 2.5).abs() < 1e-12);
        assert_eq!(src.cursor, 2);
    }

    #[test]
    fn test_gamma_alpha_one_redraws_tiny_values() {
        let mut src = Scripted::new(&[0.0, 1e-9, 0.5]);
        let g = gamma(&mut src, 1.0);
        assert!((g - 2f64.ln()).abs() < 1e-12);
        assert_eq!(src.cursor, 3);
    }

    #[test]
    fn test_gamma_cheng_discards_out_of_window_draw() {
        // First draw rejected on its own, then (0.5, 0.5) is accepted
        let mut src = Scripted::new(&[0.0, 0.5, 0.5]);
        let g = gamma(&mut src, 2.0);
        assert_eq!(src.cursor, 3);
        // v = ln(1) / sqrt(3) = 0, x = alpha
        assert!((g - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_gamma_cheng_retries_rejected_pair() {
        // (0.999, 0.5) fails both acceptance tests, (0.7, 0.4) passes
        let mut src = Scripted::new(&[0.999, 0.5, 0.7, 0.4]);
        let g = gamma(&mut src, 2.0);
        assert_eq!(src.cursor, 4);
        assert!((g - 3.261_981_485_395_491_4).abs() < 1e-12, "{g}");
    }

    #[test]
    fn test_gamma_small_alpha_low_branch() {
        // p = b * 0.2 <= 1, x = p / alpha, accepted against e^-x
        let mut src = Scripted::new(&[0.2, 0.3]);
        let g = gamma(&mut src, 0.5);
        assert_eq!(src.cursor, 2);
        assert!((g - 0.473_575_888_234_288_5).abs() < 1e-12, "{g}");

        // u4 = 0.9 rejects the first attempt
        let mut src = Scripted::new(&[0.2, 0.9, 0.5, 0.1]);
        let g = gamma(&mut src, 0.5);
        assert_eq!(src.cursor, 4);
        assert!((g - 1.183_939_720_585_721_2).abs() < 1e-12, "{g}");
    }

    #[test]
    fn test_gamma_small_alpha_high_branch() {
        // p = b * 0.9 > 1, x = -ln((b - p) / alpha), accepted against x^alpha - 1
        let mut src = Scripted::new(&[0.9, 0.1]);
        let g = gamma(&mut src, 0.5);
        assert_eq!(src.cursor, 2);
        assert!((g - 1.440_590_288_935_795).abs() < 1e-12, "{g}");

        // u4 = 0.5 exceeds x^alpha - 1, the retry lands in the low branch
        let mut src = Scripted::new(&[0.9, 0.5, 0.2, 0.3]);
        let g = gamma(&mut src, 0.5);
        assert_eq!(src.cursor, 4);
        assert!((g - 0.473_575_888_234_288_5).abs() < 1e-12, "{g}");
    }

    #[test]
    fn test_in_beta_is_unit_interval() {
        let mut stream = SeededStream::new("beta");
        for &(a, b) in &[(1.045, 1.0), (1.0, 4.0), (1.0, 3.0), (1.8, 5.0), (11.0, 1.0), (0.5, 0.5)] {
            for _ in 0..500 {
                let v = in_beta(&mut stream, a, b);
                assert!((0.0..=1.0).contains(&v), "beta({a},{b}) gave {v}");
            }
        }
    }

    #[test]
    fn test_in_beta_mean_roughly_matches() {
        let mut stream = SeededStream::new("beta-mean");
        let n = 4000;
        let total: f64 = (0..n).map(|_| in_beta(&mut stream, 1.8, 5.0)).sum();
        let mean = total / n as f64;
        // E[Beta(1.8, 5)] = 1.8 / 6.8
        assert!((mean - 1.8 / 6.8).abs() < 0.02, "mean was {mean}");
    }

    #[test]
    fn test_pick() {
        let items = [10, 20, 30];
        let mut src = Scripted::new(&[0.0, 0.34, 0.99]);
        assert_eq!(pick(&mut src, &items), Some(&10));
        assert_eq!(pick(&mut src, &items), Some(&20));
        assert_eq!(pick(&mut src, &items), Some(&30));
        let empty: [i32; 0] = [];
        assert_eq!(pick(&mut src, &empty), None);
    }

    #[test]
    fn test_create_sign_extremes() {
        let mut stream = SeededStream::new("sign");
        for _ in 0..1000 {
            assert_eq!(create_sign(&mut stream, 1.0), -1);
            assert_eq!(create_sign(&mut stream, 0.0), 1);
        }
        let mut src = Scripted::new(&[0.6, 0.61]);
        assert_eq!(create_sign(&mut src, 0.6), -1);
        assert_eq!(create_sign(&mut src, 0.6), 1);
    }

    #[test]
    fn test_in_square_order() {
        let mut src = Scripted::new(&[0.25, 0.5]);
        assert_eq!(in_square(&mut src, 800.0, 600.0), (200.0, 300.0));
    }

    #[test]
    fn test_hex_padding_and_retry() {
        // 0x0abcde -> five digits, padded
        let five = 0x0a_bcde as f64 / HEX_SCALE + 1e-9;
        let mut src = Scripted::new(&[five]);
        assert_eq!(create_random_hex(&mut src), "#abcde0");

        // 0x000123 -> three digits, redrawn
        let short = 0x000123 as f64 / HEX_SCALE + 1e-9;
        let full = 0x12_3456 as f64 / HEX_SCALE + 1e-9;
        let mut src = Scripted::new(&[short, full]);
        assert_eq!(create_random_hex(&mut src), "#123456");
        assert_eq!(src.cursor, 2);
    }

    #[test]
    fn test_hex_to_rgb() {
        let rgb = hex_to_rgb("#ff0080").unwrap();
        assert_eq!(rgb.x, 1.0);
        assert_eq!(rgb.y, 0.0);
        assert!((rgb.z - 128.0 / 255.0).abs() < 1e-6);
        assert!(hex_to_rgb("ff0080").is_none());
        assert!(hex_to_rgb("#fff").is_none());
        assert!(hex_to_rgb("#gg0000").is_none());
    }

    proptest! {
        #[test]
        fn prop_hex_always_six_digits(seed in "[a-z0-9]{1,16}") {
            let mut stream = SeededStream::new(&seed);
            for _ in 0..32 {
                let hex = create_random_hex(&mut stream);
                prop_assert!(is_hex_color(&hex), "bad hex {}", hex);
                prop_assert!(hex_to_rgb(&hex).is_some());
            }
        }

        #[test]
        fn prop_sign_is_unit(seed in "[a-z0-9]{1,16}", p in 0.0f64..1.0) {
            let mut stream = SeededStream::new(&seed);
            let s = create_sign(&mut stream, p);
            prop_assert!(s == 1 || s == -1);
        }

        #[test]
        fn prop_in_range_int_bounds(seed in "[a-z0-9]{1,16}", lo in -50i32..50, span in 1i32..50) {
            let mut stream = SeededStream::new(&seed);
            let v = in_range_int(&mut stream, lo, lo + span);
            prop_assert!(v >= lo && v < lo + span);
        }
    }
}
