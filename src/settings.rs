//! Launch options and animation settings
//!
//! Everything configurable comes from the page's query string:
//! `?world=<seed>&pixelation=<n>&no-ui&still&fps=<n>&delay=<ms>&endAfter=<ms>`.

use serde::{Deserialize, Serialize};
use url::{Url, form_urlencoded};

/// Query key carrying the shareable seed
pub const WORLD_PARAM: &str = "world";
const PIXELATION_STEP: f32 = 0.25;

/// Frame clock configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationSettings {
    /// Throttle target. `None` runs at display refresh rate.
    pub target_fps: Option<f64>,
    /// Milliseconds to wait before the first frame
    pub delay_ms: Option<f64>,
    /// Stop automatically this many milliseconds after start
    pub end_after_ms: Option<f64>,
    /// Whether the loop keeps running. A still world (`?still`) draws one frame.
    pub is_animated: bool,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            target_fps: None,
            delay_ms: None,
            end_after_ms: None,
            is_animated: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchOptions {
    /// Seed to replay, if one was shared
    pub world: Option<String>,
    /// Display pixels per render pixel, at least 1
    pub pixelation: f32,
    pub show_ui: bool,
    pub animation: AnimationSettings,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            world: None,
            pixelation: 1.0,
            show_ui: true,
            animation: AnimationSettings::default(),
        }
    }
}

impl LaunchOptions {
    /// Parse a query string, with or without the leading `?`.
    /// Malformed values fall back to defaults.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut options = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match &*key {
                WORLD_PARAM => {
                    let seed = value.trim();
                    options.world = (!seed.is_empty()).then(|| seed.to_string());
                }
                "pixelation" => {
                    options.pixelation = value
                        .parse::<f32>()
                        .ok()
                        .filter(|p| p.is_finite())
                        .unwrap_or(1.0)
                        .max(1.0);
                }
                "no-ui" => options.show_ui = false,
                "still" => options.animation.is_animated = false,
                "fps" => options.animation.target_fps = positive(&value),
                "delay" => options.animation.delay_ms = positive(&value),
                "endAfter" => options.animation.end_after_ms = positive(&value),
                _ => log::debug!("Ignoring query parameter {}", key),
            }
        }
        options
    }

    pub fn is_pixelated(&self) -> bool {
        self.pixelation != 1.0
    }
}

fn positive(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// `href` with the `world` parameter removed, or `None` if it had none.
///
/// Lets the page drop the seed from the address bar once it has been read,
/// so a reload rolls a fresh world.
pub fn strip_world_param(href: &str) -> Option<String> {
    let mut url = Url::parse(href).ok()?;
    if !url.query_pairs().any(|(key, _)| key == WORLD_PARAM) {
        return None;
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| *key != WORLD_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    Some(url.to_string())
}

/// Absolute link replaying `seed`
pub fn share_link(host: &str, seed: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(WORLD_PARAM, seed)
        .finish();
    format!("{}/?{}", host.trim_end_matches('/'), query)
}

/// Relative link replaying `seed` one pixelation step coarser
pub fn pixelate_link(current_pixelation: f32, seed: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("pixelation", &(current_pixelation + PIXELATION_STEP).to_string())
        .append_pair(WORLD_PARAM, seed)
        .finish();
    format!("/?{}", query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = LaunchOptions::from_query("");
        assert_eq!(options, LaunchOptions::default());
        assert!(options.show_ui);
        assert!(!options.is_pixelated());
        assert!(options.animation.is_animated);
    }

    #[test]
    fn test_full_query() {
        let options =
            LaunchOptions::from_query("?world=abc123&pixelation=2.5&no-ui&fps=30&delay=500&endAfter=10000");
        assert_eq!(options.world.as_deref(), Some("abc123"));
        assert_eq!(options.pixelation, 2.5);
        assert!(!options.show_ui);
        assert_eq!(options.animation.target_fps, Some(30.0));
        assert_eq!(options.animation.delay_ms, Some(500.0));
        assert_eq!(options.animation.end_after_ms, Some(10000.0));
    }

    #[test]
    fn test_pixelation_clamped() {
        assert_eq!(LaunchOptions::from_query("pixelation=0.5").pixelation, 1.0);
        assert_eq!(LaunchOptions::from_query("pixelation=-3").pixelation, 1.0);
        assert_eq!(LaunchOptions::from_query("pixelation=lots").pixelation, 1.0);
        assert_eq!(LaunchOptions::from_query("pixelation=NaN").pixelation, 1.0);
        assert!(LaunchOptions::from_query("pixelation=1.25").is_pixelated());
    }

    #[test]
    fn test_still_flag() {
        let options = LaunchOptions::from_query("?still&world=abc");
        assert!(!options.animation.is_animated);
        assert_eq!(options.world.as_deref(), Some("abc"));
        assert!(LaunchOptions::from_query("?stillness=1").animation.is_animated);
    }

    #[test]
    fn test_invalid_timing_ignored() {
        let options = LaunchOptions::from_query("fps=0&delay=-10&endAfter=soon");
        assert_eq!(options.animation, AnimationSettings::default());
    }

    #[test]
    fn test_empty_world_is_none() {
        assert_eq!(LaunchOptions::from_query("world=").world, None);
        assert_eq!(LaunchOptions::from_query("world=%20").world, None);
    }

    #[test]
    fn test_strip_world_param() {
        assert_eq!(
            strip_world_param("https://example.com/?world=abc&pixelation=2").as_deref(),
            Some("https://example.com/?pixelation=2")
        );
        assert_eq!(
            strip_world_param("https://example.com/?world=abc").as_deref(),
            Some("https://example.com/")
        );
        assert_eq!(strip_world_param("https://example.com/?pixelation=2"), None);
        assert_eq!(strip_world_param("not a url"), None);
    }

    #[test]
    fn test_links() {
        assert_eq!(
            share_link("worlds.example", "00ff7a"),
            "worlds.example/?world=00ff7a"
        );
        assert_eq!(pixelate_link(1.0, "00ff7a"), "/?pixelation=1.25&world=00ff7a");
        assert_eq!(pixelate_link(1.75, "00ff7a"), "/?pixelation=2&world=00ff7a");
    }

    #[test]
    fn test_pixelate_link_round_trips() {
        let link = pixelate_link(1.5, "seed");
        let options = LaunchOptions::from_query(link.trim_start_matches('/'));
        assert_eq!(options.pixelation, 1.75);
        assert_eq!(options.world.as_deref(), Some("seed"));
    }
}
