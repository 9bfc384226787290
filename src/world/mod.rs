//! Worlds: everything a seed decides
//!
//! - `generator`: Samples the uniform dictionary, motion parameters and shader source
//! - `uniforms`: Typed uniform values and the flat dictionary
//! - `variants`: Noise style / base shape selectors
//! - `shaders`: Vertex source and fragment template
//! - `animator`: Per-frame live uniforms and the low frame rate latch

pub mod animator;
pub mod generator;
pub mod shaders;
pub mod uniforms;
pub mod variants;

pub use animator::{Animator, LiveUniforms, LowFrameRateLatch};
pub use generator::{
    MotionParams, Viewport, World, bake_fragment_source, generate_world, sample_draw_distance,
};
pub use uniforms::{Uniform, UniformDict, UniformKind, UniformValue};
pub use variants::{BaseShape, NoiseStyle};
