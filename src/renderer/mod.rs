//! WebGL resource lifecycle
//!
//! One program drawing a full-screen quad, driven through a GL-style backend.
//!
//! - `backend`: Backend and surface traits
//! - `lifecycle`: `Renderer` state machine (initialize / tick / destroy)
//! - `webgl`: WebGL2 backend over a canvas (wasm only)
//! - `headless`: In-memory backend for tests and the native dry run (native only)

pub mod backend;
#[cfg(not(target_arch = "wasm32"))]
pub mod headless;
pub mod lifecycle;
#[cfg(target_arch = "wasm32")]
pub mod webgl;

use thiserror::Error;

pub use backend::{GraphicsBackend, RenderSurface, ShaderStage, SurfaceRect};
#[cfg(not(target_arch = "wasm32"))]
pub use headless::{HeadlessBackend, HeadlessLedger, HeadlessSurface};
pub use lifecycle::{QUAD_POSITIONS, QUAD_UVS, Renderer, RendererState};
#[cfg(target_arch = "wasm32")]
pub use webgl::{CanvasSurface, WebGlBackend};

/// Initialization and tick failures. None are retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("Graphics context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompilation { stage: ShaderStage, log: String },

    #[error("Program failed to link: {log}")]
    ShaderLink { log: String },

    #[error("Resource resolution failed: {0}")]
    ResourceResolution(String),

    #[error("Renderer is not initialized")]
    NotReady,
}

#[cfg(target_arch = "wasm32")]
impl From<RenderError> for wasm_bindgen::JsValue {
    fn from(err: RenderError) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}
