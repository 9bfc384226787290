//! Procedural world generation
//!
//! Samples every shader parameter from a seeded stream in a fixed order.
//! Changing the order (or adding a draw in the middle) changes every world
//! published before the change, so new parameters go at the end.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::shaders::{FRAGMENT_TEMPLATE, VERTEX_SOURCE};
use super::uniforms::{UniformDict, UniformValue};
use super::variants::{BaseShape, NoiseStyle};
use crate::consts::*;
use crate::random::{
    SeededStream, create_random_hex, create_sign, hex_to_rgb, in_beta, in_gaussian, in_range,
    in_range_int, in_square, pick,
};

/// Render surface dimensions
///
/// `width`/`height` are the internal render resolution. `pixelation` is how
/// much the surface element upscales it, so `display_size` is what the
/// pointer and the `resolution` uniform see.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub pixelation: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            pixelation: 1.0,
        }
    }

    /// Viewport for a display area rendered at `1 / pixelation` resolution
    pub fn for_display(display_width: f32, display_height: f32, pixelation: f32) -> Self {
        let pixelation = pixelation.max(1.0);
        Self {
            width: (display_width / pixelation).floor().max(1.0),
            height: (display_height / pixelation).floor().max(1.0),
            pixelation,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    pub fn display_size(&self) -> Vec2 {
        Vec2::new(self.width, self.height) * self.pixelation
    }

    /// Integer pixel size for the render target
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }
}

/// Per-world motion parameters consumed by the animator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionParams {
    /// Time advanced per frame at full frame rate
    pub initial_playback_speed: f32,
    /// Where the noise rotation axis drifts while nobody touches the canvas
    pub idle_mouse_position: Vec2,
    /// Per-frame lerp rate of the smoothed pointer
    pub mouse_lerp_speed: f32,
}

/// One seed-derived scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub seed: String,
    pub viewport: Viewport,
    pub noise_style: NoiseStyle,
    pub base_shape: BaseShape,
    /// Ray march iteration budget, baked into `fragment_source`
    pub draw_distance: u32,
    pub motion: MotionParams,
    pub uniforms: UniformDict,
    #[serde(skip)]
    pub vertex_source: String,
    #[serde(skip)]
    pub fragment_source: String,
}

impl World {
    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.uniforms.names()
    }

    /// One-line summary for logs
    pub fn describe(&self) -> String {
        format!(
            "{} / {} / {} steps",
            self.base_shape.as_str(),
            self.noise_style.as_str(),
            self.draw_distance
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Ray march step budget: Beta(1.045, 1) scaled to 256, never below the floor
pub fn sample_draw_distance(stream: &mut SeededStream) -> u32 {
    let sample = (in_beta(stream, 1.045, 1.0) * MAX_DRAW_DISTANCE).round() as u32;
    sample.max(MIN_DRAW_DISTANCE)
}

/// Substitute the step budget into the fragment template
pub fn bake_fragment_source(draw_distance: u32) -> String {
    FRAGMENT_TEMPLATE.replace(DRAW_DISTANCE_TOKEN, &draw_distance.to_string())
}

fn random_color(stream: &mut SeededStream) -> Vec3 {
    let hex = create_random_hex(stream);
    // create_random_hex always yields #rrggbb
    hex_to_rgb(&hex).unwrap_or(Vec3::ZERO)
}

fn float(value: f64) -> UniformValue {
    UniformValue::Float(value as f32)
}

/// Sample a complete world from `stream` for `viewport`.
///
/// Draw order: time; background brightness, color brightness, two colors;
/// noise style and its parameters; base shape, dimensions, offset and
/// rotation axis; grain; playback speed, idle pointer, pointer smoothing;
/// draw distance.
pub fn generate_world(stream: &mut SeededStream, viewport: Viewport) -> World {
    let aspect = viewport.aspect();
    let display = viewport.display_size();
    let mut uniforms = UniformDict::new();

    // Bootstrap
    uniforms.insert("aspect", UniformValue::Float(aspect));
    uniforms.insert("time", float(in_range(stream, 0.0, 999.0)));
    uniforms.insert("resolution", UniformValue::Vec2(display));
    uniforms.insert("mousePosition", UniformValue::Vec2(display / 2.0));

    // Lighting and palette
    uniforms.insert("bgBrightness", float(in_beta(stream, 1.0, 4.0) * 0.075));
    uniforms.insert("colorBrightness", float(in_range(stream, 0.63, 0.77)));
    uniforms.insert("color1", UniformValue::Vec3(random_color(stream)));
    uniforms.insert("color2", UniformValue::Vec3(random_color(stream)));

    // Noise field
    let noise_index = pick(stream, &NoiseStyle::WEIGHTED).copied().unwrap_or(0);
    let noise_style = NoiseStyle::from_index(noise_index).unwrap_or(NoiseStyle::AdditiveSimplex);
    uniforms.insert("noiseStyle", UniformValue::Int(noise_style.index()));
    let rotation_speed = in_range(stream, 0.6, 1.0) * create_sign(stream, 0.5) as f64;
    uniforms.insert("noiseRotationSpeed", float(rotation_speed));
    uniforms.insert("sinNoiseScale", float(in_range(stream, 5.0, 12.0)));
    uniforms.insert("sinScalar1", float(in_range(stream, 0.0, 30.0)));
    uniforms.insert("sinScalar2", float(in_range(stream, 0.0, 5.0)));
    uniforms.insert("scalarSwap", UniformValue::Int(create_sign(stream, 0.6)));
    uniforms.insert("simplexNoiseScale", float(in_range(stream, 0.58, 0.67)));
    let stretched = Vec3::new(
        in_range(stream, 0.4, 0.6) as f32,
        in_range(stream, 0.4, 0.6) as f32,
        in_range(stream, 0.4, 0.6) as f32,
    );
    uniforms.insert("stretchedSimplexNoiseScale", UniformValue::Vec3(stretched));
    uniforms.insert(
        "highFrequencysimplexNoiseScale",
        float(1.5 + in_beta(stream, 1.0, 3.0) * 48.5),
    );
    uniforms.insert("simplexIntensity", float(in_range(stream, 0.5, 4.3)));

    // Shape
    let shape_index = in_range_int(stream, 0, BaseShape::ALL.len() as i32);
    let base_shape = BaseShape::from_index(shape_index).unwrap_or(BaseShape::Sphere);
    uniforms.insert("baseShape", UniformValue::Int(base_shape.index()));
    uniforms.insert("shapeDimension1", float(in_range(stream, 0.4, 0.52)));
    uniforms.insert("shapeDimension2", float(in_range(stream, 0.2, 0.35)));
    uniforms.insert("shapeDimension3", float(in_range(stream, 0.32, 0.4)));
    let offset = Vec3::new(
        (in_gaussian(stream, 0.0, 0.17) * aspect as f64) as f32,
        in_gaussian(stream, 0.0, 0.17) as f32,
        ((in_beta(stream, 1.8, 5.0) - 0.12) * 0.57) as f32,
    );
    uniforms.insert("shapePositionOffset", UniformValue::Vec3(offset));
    let mut rotation_axis = [0.0f32; 3];
    for component in &mut rotation_axis {
        *component = (in_beta(stream, 11.0, 1.0) * create_sign(stream, 0.5) as f64) as f32;
    }
    uniforms.insert(
        "shapeRotationVector",
        UniformValue::Vec3(Vec3::from_array(rotation_axis)),
    );

    // Finish
    uniforms.insert("grainIntensity", float(in_range(stream, 0.005, 0.026)));

    // Motion
    let initial_playback_speed =
        (in_gaussian(stream, 0.62, 0.018) * 1e-4).clamp(0.2e-4, 1.2e-4) as f32;
    let (idle_x, idle_y) = in_square(stream, display.x as f64, display.y as f64);
    let mouse_lerp_speed = (in_gaussian(stream, 0.8, 0.1) * 1e-3) as f32;
    let motion = MotionParams {
        initial_playback_speed,
        idle_mouse_position: Vec2::new(idle_x as f32, idle_y as f32),
        mouse_lerp_speed,
    };

    let draw_distance = sample_draw_distance(stream);

    log::debug!(
        "Generated world {} after {} draws",
        stream.seed(),
        stream.draw_count()
    );

    World {
        seed: stream.seed().to_string(),
        viewport,
        noise_style,
        base_shape,
        draw_distance,
        motion,
        uniforms,
        vertex_source: VERTEX_SOURCE.to_string(),
        fragment_source: bake_fragment_source(draw_distance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn world(seed: &str, width: f32, height: f32) -> World {
        let mut stream = SeededStream::new(seed);
        generate_world(&mut stream, Viewport::new(width, height))
    }

    #[test]
    fn test_same_seed_same_world() {
        let a = world("abc123", 800.0, 600.0);
        let b = world("abc123", 800.0, 600.0);

        assert_eq!(a, b);
        assert_eq!(a.fragment_source, b.fragment_source);
        for (ua, ub) in a.uniforms.iter().zip(b.uniforms.iter()) {
            assert_eq!(ua.name, ub.name);
            assert_eq!(format!("{:?}", ua.value), format!("{:?}", ub.value));
        }
        assert_eq!(a.noise_style, b.noise_style);
        assert_eq!(a.base_shape, b.base_shape);
    }

    #[test]
    fn test_different_seed_different_world() {
        let a = world("abc123", 800.0, 600.0);
        let b = world("abc124", 800.0, 600.0);
        assert_ne!(a.uniforms, b.uniforms);
    }

    #[test]
    fn test_selectors_match_uniforms() {
        let w = world("abc123", 800.0, 600.0);
        assert_eq!(
            w.uniforms.get("noiseStyle").and_then(|v| v.as_int()),
            Some(w.noise_style.index())
        );
        assert_eq!(
            w.uniforms.get("baseShape").and_then(|v| v.as_int()),
            Some(w.base_shape.index())
        );
    }

    #[test]
    fn test_bootstrap_uniforms() {
        let w = world("bootstrap", 800.0, 600.0);
        let aspect = w.uniforms.get("aspect").and_then(|v| v.as_float()).unwrap();
        assert!((aspect - 800.0 / 600.0).abs() < 1e-6);
        assert_eq!(
            w.uniforms.get("resolution").and_then(|v| v.as_vec2()),
            Some(Vec2::new(800.0, 600.0))
        );
        assert_eq!(
            w.uniforms.get("mousePosition").and_then(|v| v.as_vec2()),
            Some(Vec2::new(400.0, 300.0))
        );
    }

    #[test]
    fn test_draw_distance_is_baked() {
        let w = world("abc123", 800.0, 600.0);
        assert!(!w.fragment_source.contains(DRAW_DISTANCE_TOKEN));
        assert!(
            w.fragment_source
                .contains(&format!("i <= {};", w.draw_distance))
        );
    }

    #[test]
    fn test_every_uniform_is_declared_in_shader() {
        let w = world("declared", 1280.0, 720.0);
        for uniform in w.uniforms.iter() {
            let decl = format!(
                "uniform {} {};",
                uniform.value.kind().glsl_type(),
                uniform.name
            );
            assert!(w.fragment_source.contains(&decl), "missing `{decl}`");
        }
    }

    #[test]
    fn test_pixelated_viewport() {
        let vp = Viewport::for_display(1000.0, 500.0, 2.0);
        assert_eq!(vp.pixel_size(), (500, 250));
        assert_eq!(vp.display_size(), Vec2::new(1000.0, 500.0));

        let w = world("pixel", 500.0, 250.0);
        let mut stream = SeededStream::new("pixel");
        let pixelated = generate_world(&mut stream, vp);
        // Same aspect, but the resolution uniform tracks the display size
        assert_eq!(
            pixelated.uniforms.get("aspect"),
            w.uniforms.get("aspect")
        );
        assert_eq!(
            pixelated.uniforms.get("resolution").and_then(|v| v.as_vec2()),
            Some(Vec2::new(1000.0, 500.0))
        );
    }

    #[test]
    fn test_viewport_pixelation_floor() {
        let vp = Viewport::for_display(640.0, 480.0, 0.5);
        assert_eq!(vp.pixelation, 1.0);
        assert_eq!(vp.pixel_size(), (640, 480));
    }

    #[test]
    fn test_json_omits_sources() {
        let w = world("json", 320.0, 240.0);
        let json = w.to_json().unwrap();
        assert!(json.contains("\"seed\": \"json\""));
        assert!(!json.contains("gl_FragColor"));
    }

    proptest! {
        #[test]
        fn prop_draw_distance_floor(seed in "[a-f0-9]{1,24}") {
            let mut stream = SeededStream::new(&seed);
            prop_assert!(sample_draw_distance(&mut stream) >= MIN_DRAW_DISTANCE);
        }

        #[test]
        fn prop_world_params_in_range(seed in "[a-f0-9]{1,24}") {
            let w = world(&seed, 800.0, 600.0);
            prop_assert!(w.draw_distance >= MIN_DRAW_DISTANCE);
            prop_assert!(w.draw_distance <= MAX_DRAW_DISTANCE as u32);

            let grain = w.uniforms.get("grainIntensity").and_then(|v| v.as_float()).unwrap();
            prop_assert!((0.005..0.026).contains(&grain));

            let swap = w.uniforms.get("scalarSwap").and_then(|v| v.as_int()).unwrap();
            prop_assert!(swap == 1 || swap == -1);

            let idle = w.motion.idle_mouse_position;
            prop_assert!(idle.x >= 0.0 && idle.x < 800.0);
            prop_assert!(idle.y >= 0.0 && idle.y < 600.0);
            prop_assert!(w.motion.initial_playback_speed >= 0.2e-4);
            prop_assert!(w.motion.initial_playback_speed <= 1.2e-4);
        }
    }
}
