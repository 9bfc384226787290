//! Per-frame animation of a world
//!
//! The generated uniform dictionary is immutable. The handful of values that
//! move every frame live here instead, owned by the render instance.

use glam::Vec2;

use super::generator::{MotionParams, World};
use super::uniforms::UniformValue;
use crate::consts::*;
use crate::scheduler::FrameProps;
use crate::lerp;

/// Uniforms rewritten every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveUniforms {
    /// Accumulated in double precision, narrowed on upload
    pub time: f64,
    pub mouse_position: Vec2,
    pub playback_speed: f32,
}

impl LiveUniforms {
    /// Names of the uniforms re-uploaded each frame
    pub const NAMES: [&'static str; 2] = ["time", "mousePosition"];

    pub fn values(&self) -> [(&'static str, UniformValue); 2] {
        [
            ("time", UniformValue::Float(self.time as f32)),
            ("mousePosition", UniformValue::Vec2(self.mouse_position)),
        ]
    }
}

/// Advances a world's live uniforms from frame timing and pointer state
#[derive(Debug, Clone)]
pub struct Animator {
    motion: MotionParams,
    live: LiveUniforms,
}

impl Animator {
    pub fn new(world: &World) -> Self {
        let time = world
            .uniforms
            .get("time")
            .and_then(|v| v.as_float())
            .unwrap_or(0.0) as f64;
        let mouse_position = world
            .uniforms
            .get("mousePosition")
            .and_then(|v| v.as_vec2())
            .unwrap_or_else(|| world.viewport.display_size() / 2.0);

        Self {
            motion: world.motion,
            live: LiveUniforms {
                time,
                mouse_position,
                playback_speed: world.motion.initial_playback_speed,
            },
        }
    }

    pub fn live(&self) -> &LiveUniforms {
        &self.live
    }

    /// Advance one frame.
    ///
    /// Below `SLOW_FPS_THRESHOLD` the playback speed eases toward a multiple of
    /// the initial speed so the animation covers the same ground per second.
    /// The smoothed pointer drifts toward the real pointer once it has entered,
    /// otherwise toward the world's idle position.
    pub fn on_frame(&mut self, props: &FrameProps) -> &LiveUniforms {
        let initial = self.motion.initial_playback_speed;

        if props.fps < SLOW_FPS_THRESHOLD {
            let factor = (DEFAULT_FPS / props.fps).min(MAX_SPEED_COMPENSATION) as f32;
            self.live.playback_speed =
                lerp(self.live.playback_speed, initial * factor, SPEED_LERP_RATE);
        }

        self.live.time += self.live.playback_speed as f64;

        let target = if props.mouse_has_entered {
            props.mouse_position
        } else {
            self.motion.idle_mouse_position
        };
        self.live.mouse_position = self
            .live
            .mouse_position
            .lerp(target, self.motion.mouse_lerp_speed);

        &self.live
    }
}

/// Raises the low frame rate signal the first time averaged FPS drops to the
/// threshold, and never again for its lifetime
#[derive(Debug, Clone, Default)]
pub struct LowFrameRateLatch {
    shown: bool,
}

impl LowFrameRateLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true exactly once
    pub fn observe(&mut self, fps: f64) -> bool {
        if self.shown || fps > LOW_FPS_THRESHOLD {
            return false;
        }
        self.shown = true;
        log::warn!("Low frame rate detected ({:.1} fps)", fps);
        true
    }

    pub fn has_fired(&self) -> bool {
        self.shown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededStream;
    use crate::world::{Viewport, generate_world};

    fn props(fps: f64, entered: bool, pos: Vec2) -> FrameProps {
        FrameProps {
            fps,
            mouse_has_entered: entered,
            mouse_position: pos,
            ..FrameProps::default()
        }
    }

    fn animator() -> (World, Animator) {
        let mut stream = SeededStream::new("animator");
        let world = generate_world(&mut stream, Viewport::new(800.0, 600.0));
        let animator = Animator::new(&world);
        (world, animator)
    }

    #[test]
    fn test_starts_from_generated_values() {
        let (world, animator) = animator();
        assert_eq!(
            Some(animator.live().time as f32),
            world.uniforms.get("time").and_then(|v| v.as_float())
        );
        assert_eq!(animator.live().mouse_position, Vec2::new(400.0, 300.0));
        assert_eq!(
            animator.live().playback_speed,
            world.motion.initial_playback_speed
        );
    }

    #[test]
    fn test_time_advances_by_playback_speed() {
        let (world, mut animator) = animator();
        let start = animator.live().time;
        animator.on_frame(&props(60.0, false, Vec2::ZERO));
        let expected = start + world.motion.initial_playback_speed as f64;
        assert_eq!(animator.live().time, expected);
    }

    #[test]
    fn test_slow_frames_speed_up_playback() {
        let (world, mut animator) = animator();
        let initial = world.motion.initial_playback_speed;
        for _ in 0..200 {
            animator.on_frame(&props(20.0, false, Vec2::ZERO));
        }
        // Converges toward 3x at 20 fps
        let speed = animator.live().playback_speed;
        assert!(speed > initial * 2.9 && speed <= initial * 3.0 + 1e-9);
    }

    #[test]
    fn test_compensation_is_capped() {
        let (world, mut animator) = animator();
        for _ in 0..500 {
            animator.on_frame(&props(2.0, false, Vec2::ZERO));
        }
        let cap = world.motion.initial_playback_speed * MAX_SPEED_COMPENSATION as f32;
        assert!(animator.live().playback_speed <= cap * 1.0001);
    }

    #[test]
    fn test_pointer_smoothing_targets() {
        let (world, mut animator) = animator();
        let before = animator.live().mouse_position;
        let pointer = Vec2::new(0.0, 0.0);

        animator.on_frame(&props(60.0, true, pointer));
        let after = animator.live().mouse_position;
        assert!(after.distance(pointer) < before.distance(pointer));

        let mut idle = Animator::new(&world);
        let start = idle.live().mouse_position;
        idle.on_frame(&props(60.0, false, pointer));
        let target = world.motion.idle_mouse_position;
        assert!(idle.live().mouse_position.distance(target) <= start.distance(target));
    }

    #[test]
    fn test_low_frame_rate_fires_once() {
        let mut latch = LowFrameRateLatch::new();
        assert!(!latch.observe(60.0));
        assert!(!latch.observe(13.6));
        assert!(latch.observe(13.5));
        assert!(!latch.observe(5.0));
        assert!(latch.has_fired());
    }
}
