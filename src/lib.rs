//! SDF Worlds - seeded ray-marched scenes in a single canvas
//!
//! Core modules:
//! - `random`: Deterministic seeded stream and the distributions built on it
//! - `world`: Procedural parameter generation, shader sources, per-frame animation
//! - `renderer`: Graphics resource lifecycle (WebGL2 in the browser, headless natively)
//! - `scheduler`: Frame clock, FPS averaging and pointer tracking
//! - `settings`: Launch options read from the page query string

pub mod random;
pub mod renderer;
pub mod scheduler;
pub mod settings;
pub mod world;

pub use random::{SeedSession, SeededStream};
pub use renderer::{RenderError, Renderer};
pub use scheduler::{FrameClock, FrameProps, PointerTracker};
pub use settings::{AnimationSettings, LaunchOptions};
pub use world::{Animator, Viewport, World, generate_world};

/// Engine configuration constants
pub mod consts {
    /// Number of instantaneous FPS samples averaged by the frame clock
    pub const FPS_WINDOW: usize = 20;
    /// FPS assumed before any frame has been measured (when not throttled)
    pub const DEFAULT_FPS: f64 = 60.0;
    /// Pointer is considered idle after this long without movement (ms)
    pub const POINTER_IDLE_MS: f64 = 3500.0;

    /// Averaged FPS at or below this raises the low frame rate signal (once)
    pub const LOW_FPS_THRESHOLD: f64 = 13.5;
    /// Below this averaged FPS the animation speeds up to compensate
    pub const SLOW_FPS_THRESHOLD: f64 = 45.0;
    /// Upper bound on the playback speed compensation factor
    pub const MAX_SPEED_COMPENSATION: f64 = 5.0;
    /// Lerp rate used when compensating playback speed
    pub const SPEED_LERP_RATE: f32 = 0.05;

    /// Ray march step budget is never sampled below this
    pub const MIN_DRAW_DISTANCE: u32 = 14;
    /// Ray march step budget scale applied to the Beta sample
    pub const MAX_DRAW_DISTANCE: f64 = 256.0;
    /// Placeholder replaced in the fragment source with the step budget
    pub const DRAW_DISTANCE_TOKEN: &str = "$DRAW_DISTANCE";

    /// Number of random bytes in a freshly generated seed
    pub const SEED_BYTES: usize = 12;
}

/// Linear interpolation from `a` toward `b` by `t`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Arithmetic mean of a sample set (0 when empty)
#[inline]
pub fn mean(samples: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = samples
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), s| (sum + s, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(lerp(2.0, 6.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 6.0, 1.0), 6.0);
        assert_eq!(lerp(2.0, 6.0, 0.25), 3.0);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(std::iter::empty()), 0.0);
        assert_eq!(mean([30.0, 40.0]), 35.0);
    }
}
