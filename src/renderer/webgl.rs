//! WebGL2 backend over an HTML canvas

use wasm_bindgen::JsCast;
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext as Gl, WebGlBuffer, WebGlProgram, WebGlShader,
    WebGlUniformLocation, WebglLoseContext,
};

use super::RenderError;
use super::backend::{GraphicsBackend, RenderSurface, ShaderStage, SurfaceRect};
use crate::world::{UniformValue, Viewport};

pub struct WebGlBackend {
    gl: Gl,
}

impl WebGlBackend {
    pub fn new(gl: Gl) -> Self {
        Self { gl }
    }

    pub fn context(&self) -> &Gl {
        &self.gl
    }
}

impl GraphicsBackend for WebGlBackend {
    type Shader = WebGlShader;
    type Program = WebGlProgram;
    type Buffer = WebGlBuffer;
    type UniformLocation = WebGlUniformLocation;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<WebGlShader, String> {
        let kind = match stage {
            ShaderStage::Vertex => Gl::VERTEX_SHADER,
            ShaderStage::Fragment => Gl::FRAGMENT_SHADER,
        };
        let shader = self
            .gl
            .create_shader(kind)
            .ok_or_else(|| format!("Unable to create {} shader object", stage))?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);

        if self
            .gl
            .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false)
        {
            Ok(shader)
        } else {
            let log = self
                .gl
                .get_shader_info_log(&shader)
                .unwrap_or_else(|| "Unknown error creating shader".to_string());
            self.gl.delete_shader(Some(&shader));
            Err(log)
        }
    }

    fn link_program(
        &mut self,
        vertex: &WebGlShader,
        fragment: &WebGlShader,
    ) -> Result<WebGlProgram, String> {
        let program = self
            .gl
            .create_program()
            .ok_or_else(|| "Unable to create program object".to_string())?;
        self.gl.attach_shader(&program, vertex);
        self.gl.attach_shader(&program, fragment);
        self.gl.link_program(&program);

        if self
            .gl
            .get_program_parameter(&program, Gl::LINK_STATUS)
            .as_bool()
            .unwrap_or(false)
        {
            Ok(program)
        } else {
            let log = self
                .gl
                .get_program_info_log(&program)
                .unwrap_or_else(|| "Unknown error creating program".to_string());
            self.gl.delete_program(Some(&program));
            Err(log)
        }
    }

    fn use_program(&mut self, program: &WebGlProgram) {
        self.gl.use_program(Some(program));
    }

    fn active_uniforms(&self, program: &WebGlProgram) -> Vec<String> {
        let count = self
            .gl
            .get_program_parameter(program, Gl::ACTIVE_UNIFORMS)
            .as_f64()
            .unwrap_or(0.0) as u32;
        (0..count)
            .filter_map(|i| self.gl.get_active_uniform(program, i))
            .map(|info| {
                let name = info.name();
                name.strip_suffix("[0]").map(str::to_string).unwrap_or(name)
            })
            .collect()
    }

    fn uniform_location(&self, program: &WebGlProgram, name: &str) -> Option<WebGlUniformLocation> {
        self.gl.get_uniform_location(program, name)
    }

    fn attribute_location(&self, program: &WebGlProgram, name: &str) -> Option<u32> {
        u32::try_from(self.gl.get_attrib_location(program, name)).ok()
    }

    fn create_vertex_buffer(&mut self, data: &[u8]) -> Option<WebGlBuffer> {
        let buffer = self.gl.create_buffer()?;
        self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&buffer));
        self.gl
            .buffer_data_with_u8_array(Gl::ARRAY_BUFFER, data, Gl::STATIC_DRAW);
        Some(buffer)
    }

    fn bind_attribute(&mut self, buffer: &WebGlBuffer, location: u32, components: i32) {
        self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(buffer));
        self.gl
            .vertex_attrib_pointer_with_i32(location, components, Gl::FLOAT, false, 0, 0);
        self.gl.enable_vertex_attrib_array(location);
    }

    fn disable_attribute(&mut self, location: u32) {
        self.gl.disable_vertex_attrib_array(location);
    }

    fn set_uniform(&mut self, location: &WebGlUniformLocation, value: &UniformValue) {
        let location = Some(location);
        match *value {
            UniformValue::Float(v) => self.gl.uniform1f(location, v),
            UniformValue::Int(v) => self.gl.uniform1i(location, v),
            UniformValue::Vec2(v) => self.gl.uniform2f(location, v.x, v.y),
            UniformValue::Vec3(v) => self.gl.uniform3f(location, v.x, v.y, v.z),
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.gl.viewport(0, 0, width as i32, height as i32);
    }

    fn draw_quad(&mut self) {
        self.gl.draw_arrays(Gl::TRIANGLE_STRIP, 0, 4);
    }

    fn delete_shader(&mut self, shader: WebGlShader) {
        self.gl.delete_shader(Some(&shader));
    }

    fn delete_program(&mut self, program: WebGlProgram) {
        self.gl.delete_program(Some(&program));
    }

    fn delete_buffer(&mut self, buffer: WebGlBuffer) {
        self.gl.delete_buffer(Some(&buffer));
    }

    fn lose_context(&mut self) {
        // Shrinking the drawing buffer frees its memory even if the extension is missing
        if let Some(canvas) = self
            .gl
            .canvas()
            .and_then(|c| c.dyn_into::<HtmlCanvasElement>().ok())
        {
            canvas.set_width(1);
            canvas.set_height(1);
        }
        match self.gl.get_extension("WEBGL_lose_context") {
            Ok(Some(ext)) => ext.unchecked_into::<WebglLoseContext>().lose_context(),
            _ => log::warn!("WEBGL_lose_context unavailable, context left to the collector"),
        }
    }
}

/// Canvas sized from a `Viewport`: drawing buffer at render resolution,
/// CSS box at display size
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Self {
        Self { canvas }
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    pub fn configure(&self, viewport: &Viewport) {
        let (width, height) = viewport.pixel_size();
        self.canvas.set_width(width);
        self.canvas.set_height(height);

        let display = viewport.display_size();
        let style = self.canvas.style();
        let _ = style.set_property("width", &format!("{}px", display.x));
        let _ = style.set_property("height", &format!("{}px", display.y));
        let rendering = if viewport.pixelation > 1.0 {
            "pixelated"
        } else {
            "auto"
        };
        let _ = style.set_property("image-rendering", rendering);
    }
}

impl RenderSurface for CanvasSurface {
    type Backend = WebGlBackend;

    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn acquire_backend(&self) -> Result<WebGlBackend, RenderError> {
        let context = self
            .canvas
            .get_context("webgl2")
            .map_err(|e| RenderError::ContextUnavailable(format!("{:?}", e)))?
            .ok_or_else(|| RenderError::ContextUnavailable("webgl2 not supported".to_string()))?;
        let gl = context
            .dyn_into::<Gl>()
            .map_err(|_| RenderError::ContextUnavailable("not a WebGL2 context".to_string()))?;
        if gl.is_context_lost() {
            return Err(RenderError::ContextUnavailable(
                "canvas context already lost".to_string(),
            ));
        }
        Ok(WebGlBackend::new(gl))
    }

    fn bounding_rect(&self) -> SurfaceRect {
        self.canvas.get_bounding_client_rect().into()
    }
}
