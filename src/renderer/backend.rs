//! Graphics backend seam
//!
//! `GraphicsBackend` is the GL-style call surface the lifecycle manager drives.
//! `RenderSurface` is whatever can hand one out (a canvas, or a headless stub).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::RenderError;
use crate::world::UniformValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Surface bounds in client (CSS pixel) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl SurfaceRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.left, self.top)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

#[cfg(target_arch = "wasm32")]
impl From<web_sys::DomRect> for SurfaceRect {
    fn from(rect: web_sys::DomRect) -> Self {
        Self::new(
            rect.left() as f32,
            rect.top() as f32,
            rect.width() as f32,
            rect.height() as f32,
        )
    }
}

/// Immediate-mode graphics calls.
///
/// Handles are owned values; deleting one consumes it, so the type system
/// rules out double frees.
pub trait GraphicsBackend {
    type Shader;
    type Program;
    type Buffer;
    type UniformLocation;

    /// Compile one stage. `Err` carries the driver's info log.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<Self::Shader, String>;

    /// Link a program. `Err` carries the driver's info log.
    fn link_program(
        &mut self,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<Self::Program, String>;

    fn use_program(&mut self, program: &Self::Program);

    /// Names of the uniforms the linked program actually exposes
    fn active_uniforms(&self, program: &Self::Program) -> Vec<String>;

    fn uniform_location(&self, program: &Self::Program, name: &str)
    -> Option<Self::UniformLocation>;

    fn attribute_location(&self, program: &Self::Program, name: &str) -> Option<u32>;

    /// Create a static vertex buffer holding `data`
    fn create_vertex_buffer(&mut self, data: &[u8]) -> Option<Self::Buffer>;

    /// Point attribute `location` at `buffer` as tightly packed floats and enable it
    fn bind_attribute(&mut self, buffer: &Self::Buffer, location: u32, components: i32);

    fn disable_attribute(&mut self, location: u32);

    fn set_uniform(&mut self, location: &Self::UniformLocation, value: &UniformValue);

    fn set_viewport(&mut self, width: u32, height: u32);

    /// Draw the bound four-vertex triangle strip
    fn draw_quad(&mut self);

    fn delete_shader(&mut self, shader: Self::Shader);

    fn delete_program(&mut self, program: Self::Program);

    fn delete_buffer(&mut self, buffer: Self::Buffer);

    /// Release the context's platform resources now rather than at collection
    fn lose_context(&mut self);
}

/// Something that can produce a graphics context
pub trait RenderSurface {
    type Backend: GraphicsBackend;

    /// Drawing buffer size in device pixels
    fn size(&self) -> (u32, u32);

    fn acquire_backend(&self) -> Result<Self::Backend, RenderError>;

    fn bounding_rect(&self) -> SurfaceRect;
}
