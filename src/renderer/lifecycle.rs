//! Renderer lifecycle
//!
//! `Uninitialized -> Ready -> Destroyed`, with `initialize` allowed again from
//! any state. Initialization is all-or-nothing: a failure at any step releases
//! every handle created before it.

use glam::Vec2;

use super::RenderError;
use super::backend::{GraphicsBackend, RenderSurface, ShaderStage};
use crate::scheduler::FrameProps;
use crate::world::{Animator, LiveUniforms, Viewport, World};

/// Full-screen quad as a four-vertex triangle strip
pub const QUAD_POSITIONS: [Vec2; 4] = [
    Vec2::new(-1.0, 1.0),
    Vec2::new(-1.0, -1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(1.0, -1.0),
];

/// Texture coordinates matching `QUAD_POSITIONS`
pub const QUAD_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    Ready,
    Destroyed,
}

/// GPU handles owned by one initialized program
struct Resources<B: GraphicsBackend> {
    program: B::Program,
    buffers: Vec<B::Buffer>,
    attributes: Vec<u32>,
    locations: Vec<(String, B::UniformLocation)>,
}

impl<B: GraphicsBackend> Resources<B> {
    fn new(program: B::Program) -> Self {
        Self {
            program,
            buffers: Vec::with_capacity(2),
            attributes: Vec::with_capacity(2),
            locations: Vec::new(),
        }
    }

    /// Resolve uniforms, create and bind the quad buffers, upload initial values
    fn setup(&mut self, backend: &mut B, world: &World) -> Result<(), RenderError> {
        backend.use_program(&self.program);

        for name in backend.active_uniforms(&self.program) {
            if !world.uniforms.contains(&name) {
                return Err(RenderError::ResourceResolution(format!(
                    "program uniform `{}` has no generated value",
                    name
                )));
            }
        }

        for uniform in world.uniforms.iter() {
            let location = backend
                .uniform_location(&self.program, &uniform.name)
                .ok_or_else(|| {
                    RenderError::ResourceResolution(format!(
                        "uniform `{}` is not exposed by the program",
                        uniform.name
                    ))
                })?;
            self.locations.push((uniform.name.clone(), location));
        }

        for (name, vertices) in [("position", &QUAD_POSITIONS), ("uv", &QUAD_UVS)] {
            let location = backend
                .attribute_location(&self.program, name)
                .ok_or_else(|| {
                    RenderError::ResourceResolution(format!("attribute `{}` not found", name))
                })?;
            let buffer = backend
                .create_vertex_buffer(bytemuck::cast_slice(vertices.as_slice()))
                .ok_or_else(|| {
                    RenderError::ResourceResolution(format!("could not create `{}` buffer", name))
                })?;
            backend.bind_attribute(&buffer, location, 2);
            self.buffers.push(buffer);
            self.attributes.push(location);
        }

        for (uniform, (_, location)) in world.uniforms.iter().zip(&self.locations) {
            backend.set_uniform(location, &uniform.value);
        }
        Ok(())
    }

    fn location(&self, name: &str) -> Option<&B::UniformLocation> {
        self.locations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, location)| location)
    }

    fn release(self, backend: &mut B) {
        for location in self.attributes {
            backend.disable_attribute(location);
        }
        for buffer in self.buffers {
            backend.delete_buffer(buffer);
        }
        backend.delete_program(self.program);
    }
}

/// Owns the backend, the GPU resources and the live uniforms of one world
pub struct Renderer<B: GraphicsBackend> {
    state: RendererState,
    backend: Option<B>,
    resources: Option<Resources<B>>,
    animator: Option<Animator>,
    viewport: Option<Viewport>,
    frames_drawn: u64,
}

impl<B: GraphicsBackend> Renderer<B> {
    pub fn new() -> Self {
        Self {
            state: RendererState::Uninitialized,
            backend: None,
            resources: None,
            animator: None,
            viewport: None,
            frames_drawn: 0,
        }
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == RendererState::Ready
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Frames drawn since the last successful `initialize`
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn live(&self) -> Option<&LiveUniforms> {
        self.animator.as_ref().map(|a| a.live())
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    /// A different viewport invalidates the generated world
    pub fn needs_reinitialize(&self, viewport: &Viewport) -> bool {
        !self.is_ready() || self.viewport.as_ref() != Some(viewport)
    }

    /// Build everything needed to draw `world` on `surface`.
    ///
    /// A ready renderer is destroyed first. On error the renderer is left
    /// uninitialized with nothing allocated.
    pub fn initialize<S>(&mut self, surface: &S, world: &World) -> Result<(), RenderError>
    where
        S: RenderSurface<Backend = B>,
    {
        if self.state == RendererState::Ready {
            self.destroy();
        }
        self.state = RendererState::Uninitialized;

        let mut backend = surface.acquire_backend()?;
        let resources = match Self::build(&mut backend, world) {
            Ok(resources) => resources,
            Err(e) => {
                backend.lose_context();
                log::error!("Renderer initialization failed: {}", e);
                return Err(e);
            }
        };

        let (width, height) = surface.size();
        backend.set_viewport(width, height);

        self.backend = Some(backend);
        self.resources = Some(resources);
        self.animator = Some(Animator::new(world));
        self.viewport = Some(world.viewport);
        self.frames_drawn = 0;
        self.state = RendererState::Ready;

        log::info!(
            "Renderer ready: world {} at {}x{} ({} uniforms)",
            world.seed,
            width,
            height,
            world.uniforms.len()
        );
        Ok(())
    }

    fn build(backend: &mut B, world: &World) -> Result<Resources<B>, RenderError> {
        let vertex = backend
            .compile_shader(ShaderStage::Vertex, &world.vertex_source)
            .map_err(|log| RenderError::ShaderCompilation {
                stage: ShaderStage::Vertex,
                log,
            })?;
        let fragment = match backend.compile_shader(ShaderStage::Fragment, &world.fragment_source)
        {
            Ok(shader) => shader,
            Err(log) => {
                backend.delete_shader(vertex);
                return Err(RenderError::ShaderCompilation {
                    stage: ShaderStage::Fragment,
                    log,
                });
            }
        };

        // Shaders are only needed until link
        let linked = backend.link_program(&vertex, &fragment);
        backend.delete_shader(vertex);
        backend.delete_shader(fragment);
        let program = linked.map_err(|log| RenderError::ShaderLink { log })?;

        let mut resources = Resources::new(program);
        match resources.setup(backend, world) {
            Ok(()) => Ok(resources),
            Err(e) => {
                resources.release(backend);
                Err(e)
            }
        }
    }

    /// Advance the live uniforms, upload them and draw once
    pub fn tick(&mut self, props: &FrameProps) -> Result<&LiveUniforms, RenderError> {
        if self.state != RendererState::Ready {
            return Err(RenderError::NotReady);
        }
        let (Some(backend), Some(resources), Some(animator)) = (
            self.backend.as_mut(),
            self.resources.as_ref(),
            self.animator.as_mut(),
        ) else {
            return Err(RenderError::NotReady);
        };

        let live = animator.on_frame(props);
        for (name, value) in live.values() {
            if let Some(location) = resources.location(name) {
                backend.set_uniform(location, &value);
            }
        }
        backend.draw_quad();
        self.frames_drawn += 1;

        Ok(live)
    }

    /// Release everything. Safe to call repeatedly or before `initialize`.
    pub fn destroy(&mut self) {
        let Some(mut backend) = self.backend.take() else {
            return;
        };
        if let Some(resources) = self.resources.take() {
            resources.release(&mut backend);
        }
        backend.lose_context();
        self.animator = None;
        self.state = RendererState::Destroyed;
        log::info!("Renderer destroyed after {} frames", self.frames_drawn);
    }
}

impl<B: GraphicsBackend> Default for Renderer<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: GraphicsBackend> Drop for Renderer<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}
