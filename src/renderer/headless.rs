//! Headless backend
//!
//! Runs the renderer without a GPU. Shader sources go through naga's GLSL
//! frontend, so syntax and type errors fail compilation the way a driver
//! would, and uniforms, attributes and varyings are reflected from the parsed
//! module. Every call lands in a shared `HeadlessLedger` that tests and the
//! native dry run inspect.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use naga::front::glsl::{Frontend, Options};
use naga::{AddressSpace, Binding, Module, TypeInner};

use super::RenderError;
use super::backend::{GraphicsBackend, RenderSurface, ShaderStage, SurfaceRect};
use crate::world::UniformValue;
/// Everything the headless backend has been asked to do
#[derive(Debug, Default)]
pub struct HeadlessLedger {
    next_id: u32,
    shaders: HashSet<u32>,
    programs: HashSet<u32>,
    buffers: BTreeMap<u32, usize>,
    enabled_attributes: BTreeSet<u32>,
    uniforms: HashMap<String, UniformValue>,
    viewport: Option<(u32, u32)>,
    draw_calls: u64,
    contexts_lost: u32,
}

impl HeadlessLedger {
    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_handles(&self) -> usize {
        self.live_shaders() + self.live_programs() + self.live_buffers()
    }

    /// Byte length of each live buffer in creation order
    pub fn buffer_sizes(&self) -> Vec<usize> {
        self.buffers.values().copied().collect()
    }

    pub fn enabled_attributes(&self) -> usize {
        self.enabled_attributes.len()
    }

    /// Last value uploaded for `name`
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }

    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.viewport
    }

    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    pub fn contexts_lost(&self) -> u32 {
        self.contexts_lost
    }
}


/// GLSL ES 1.00 source restated as GLSL 450, the dialect naga's frontend reads.
///
/// `attribute` and `varying` become located `in` / `out` variables, loose
/// uniforms move into one std140 block and `gl_FragColor` maps onto a declared
/// output. The prelude is prepended and every source line keeps its position,
/// so parser errors map back onto the caller's line numbers.
struct Translated {
    source: String,
    prelude_lines: usize,
}

impl Translated {
    fn new(stage: ShaderStage, source: &str) -> Self {
        let mut members = Vec::new();
        let mut body = String::with_capacity(source.len());
        let (mut inputs, mut outputs) = (0, 0);

        for line in source.lines() {
            let declaration = line
                .trim()
                .strip_suffix(';')
                .and_then(|statement| statement.split_once(char::is_whitespace));
            match declaration {
                Some(("precision", _)) => {}
                Some(("uniform", rest)) => members.push(without_precision(rest)),
                Some(("attribute", rest)) if stage == ShaderStage::Vertex => {
                    body.push_str(&format!(
                        "layout(location = {}) in {};",
                        inputs,
                        without_precision(rest)
                    ));
                    inputs += 1;
                }
                Some(("varying", rest)) => {
                    let (direction, location) = match stage {
                        ShaderStage::Vertex => ("out", &mut outputs),
                        ShaderStage::Fragment => ("in", &mut inputs),
                    };
                    body.push_str(&format!(
                        "layout(location = {}) {} {};",
                        location,
                        direction,
                        without_precision(rest)
                    ));
                    *location += 1;
                }
                _ if line.trim_start().starts_with("#version") => {}
                _ => body.push_str(line),
            }
            body.push('\n');
        }

        let mut prelude = String::from("#version 450\n");
        if stage == ShaderStage::Fragment {
            prelude.push_str("layout(location = 0) out vec4 sdfWorldsFragColor;\n");
            prelude.push_str("#define gl_FragColor sdfWorldsFragColor\n");
        }
        if !members.is_empty() {
            let block: String = members.iter().map(|m| format!(" {};", m)).collect();
            prelude.push_str(&format!(
                "layout(std140, set = 0, binding = 0) uniform WorldUniforms {{{} }};\n",
                block
            ));
        }

        Self {
            prelude_lines: prelude.lines().count(),
            source: prelude + &body,
        }
    }

    /// Driver-style log, one `ERROR: 0:<line>: <message>` per parser error
    fn describe(&self, errors: &[naga::front::glsl::Error]) -> String {
        errors
            .iter()
            .map(|error| {
                let line = error.meta.location(&self.source).line_number as usize;
                format!(
                    "ERROR: 0:{}: {}",
                    line.saturating_sub(self.prelude_lines),
                    error.kind
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn without_precision(declaration: &str) -> String {
    declaration
        .split_whitespace()
        .filter(|token| !matches!(*token, "lowp" | "mediump" | "highp"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

/// What a compiled stage exposes to the program
#[derive(Debug, Clone, Default)]
struct Interface {
    uniforms: Vec<String>,
    /// Located entry point inputs: attributes, or varyings read by a fragment stage
    inputs: Vec<String>,
    /// Located entry point outputs: varyings written by a vertex stage
    outputs: Vec<String>,
}

impl Interface {
    /// `None` when the module has no entry point
    fn reflect(module: &Module) -> Option<Self> {
        let entry = module.entry_points.first()?;

        let mut uniforms = Vec::new();
        for (_, var) in module.global_variables.iter() {
            if var.space != AddressSpace::Uniform {
                continue;
            }
            match &module.types[var.ty].inner {
                TypeInner::Struct { members, .. } => {
                    uniforms.extend(members.iter().filter_map(|m| m.name.clone()))
                }
                _ => uniforms.extend(var.name.clone()),
            }
        }

        let inputs = entry
            .function
            .arguments
            .iter()
            .filter(|arg| matches!(arg.binding, Some(Binding::Location { .. })))
            .filter_map(|arg| arg.name.clone())
            .collect();

        let outputs = entry
            .function
            .result
            .as_ref()
            .map(|result| match &module.types[result.ty].inner {
                TypeInner::Struct { members, .. } => members
                    .iter()
                    .filter(|m| matches!(m.binding, Some(Binding::Location { .. })))
                    .filter_map(|m| m.name.clone())
                    .collect(),
                _ => Vec::new(),
            })
            .unwrap_or_default();

        Some(Self {
            uniforms,
            inputs,
            outputs,
        })
    }
}

/// Parse one stage and reflect its interface, or return a compile log
fn compile(stage: ShaderStage, source: &str) -> Result<Interface, String> {
    let translated = Translated::new(stage, source);
    let module = Frontend::default()
        .parse(&Options::from(naga_stage(stage)), &translated.source)
        .map_err(|errors| translated.describe(&errors.errors))?;
    Interface::reflect(&module)
        .ok_or_else(|| "ERROR: 0:0: 'main' : function not defined".to_string())
}

#[derive(Debug)]
pub struct HeadlessShader {
    id: u32,
    stage: ShaderStage,
    interface: Interface,
}

#[derive(Debug)]
pub struct HeadlessProgram {
    id: u32,
    uniforms: Vec<String>,
    attributes: Vec<String>,
}

#[derive(Debug)]
pub struct HeadlessBuffer(u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessUniformLocation(String);

pub struct HeadlessBackend {
    ledger: Rc<RefCell<HeadlessLedger>>,
    lost: bool,
}

impl HeadlessBackend {
    pub fn new(ledger: Rc<RefCell<HeadlessLedger>>) -> Self {
        Self {
            ledger,
            lost: false,
        }
    }

    pub fn ledger(&self) -> Rc<RefCell<HeadlessLedger>> {
        self.ledger.clone()
    }

    pub fn is_lost(&self) -> bool {
        self.lost
    }
}

impl GraphicsBackend for HeadlessBackend {
    type Shader = HeadlessShader;
    type Program = HeadlessProgram;
    type Buffer = HeadlessBuffer;
    type UniformLocation = HeadlessUniformLocation;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<HeadlessShader, String> {
        let interface = compile(stage, source)?;
        let id = self.ledger.borrow_mut().allocate();
        self.ledger.borrow_mut().shaders.insert(id);
        Ok(HeadlessShader {
            id,
            stage,
            interface,
        })
    }

    fn link_program(
        &mut self,
        vertex: &HeadlessShader,
        fragment: &HeadlessShader,
    ) -> Result<HeadlessProgram, String> {
        if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
            return Err("Shader stages attached in the wrong slots".to_string());
        }
        if let Some(missing) = fragment
            .interface
            .inputs
            .iter()
            .find(|v| !vertex.interface.outputs.contains(v))
        {
            return Err(format!(
                "Varying `{}` is read by the fragment shader but not written by the vertex shader",
                missing
            ));
        }

        let mut uniforms = vertex.interface.uniforms.clone();
        for name in &fragment.interface.uniforms {
            if !uniforms.contains(name) {
                uniforms.push(name.clone());
            }
        }

        let id = self.ledger.borrow_mut().allocate();
        self.ledger.borrow_mut().programs.insert(id);
        Ok(HeadlessProgram {
            id,
            uniforms,
            attributes: vertex.interface.inputs.clone(),
        })
    }
    fn use_program(&mut self, _program: &HeadlessProgram) {}

    fn active_uniforms(&self, program: &HeadlessProgram) -> Vec<String> {
        program.uniforms.clone()
    }

    fn uniform_location(&self, program: &HeadlessProgram, name: &str) -> Option<HeadlessUniformLocation> {
        program
            .uniforms
            .iter()
            .any(|u| u == name)
            .then(|| HeadlessUniformLocation(name.to_string()))
    }

    fn attribute_location(&self, program: &HeadlessProgram, name: &str) -> Option<u32> {
        program
            .attributes
            .iter()
            .position(|a| a == name)
            .map(|index| index as u32)
    }

    fn create_vertex_buffer(&mut self, data: &[u8]) -> Option<HeadlessBuffer> {
        if self.lost {
            return None;
        }
        let mut ledger = self.ledger.borrow_mut();
        let id = ledger.allocate();
        ledger.buffers.insert(id, data.len());
        Some(HeadlessBuffer(id))
    }

    fn bind_attribute(&mut self, _buffer: &HeadlessBuffer, location: u32, _components: i32) {
        self.ledger.borrow_mut().enabled_attributes.insert(location);
    }

    fn disable_attribute(&mut self, location: u32) {
        self.ledger.borrow_mut().enabled_attributes.remove(&location);
    }

    fn set_uniform(&mut self, location: &HeadlessUniformLocation, value: &UniformValue) {
        if self.lost {
            return;
        }
        self.ledger
            .borrow_mut()
            .uniforms
            .insert(location.0.clone(), *value);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.ledger.borrow_mut().viewport = Some((width, height));
    }

    fn draw_quad(&mut self) {
        if !self.lost {
            self.ledger.borrow_mut().draw_calls += 1;
        }
    }

    fn delete_shader(&mut self, shader: HeadlessShader) {
        self.ledger.borrow_mut().shaders.remove(&shader.id);
    }

    fn delete_program(&mut self, program: HeadlessProgram) {
        self.ledger.borrow_mut().programs.remove(&program.id);
    }

    fn delete_buffer(&mut self, buffer: HeadlessBuffer) {
        self.ledger.borrow_mut().buffers.remove(&buffer.0);
    }

    fn lose_context(&mut self) {
        if !self.lost {
            self.lost = true;
            self.ledger.borrow_mut().contexts_lost += 1;
        }
    }
}

/// Fixed-size surface handing out headless backends that share one ledger
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    available: bool,
    ledger: Rc<RefCell<HeadlessLedger>>,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            available: true,
            ledger: Rc::new(RefCell::new(HeadlessLedger::default())),
        }
    }

    /// A surface that refuses to produce a context
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(1, 1)
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn ledger(&self) -> Rc<RefCell<HeadlessLedger>> {
        self.ledger.clone()
    }
}

impl RenderSurface for HeadlessSurface {
    type Backend = HeadlessBackend;

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn acquire_backend(&self) -> Result<HeadlessBackend, RenderError> {
        if !self.available {
            return Err(RenderError::ContextUnavailable(
                "headless surface has no context".to_string(),
            ));
        }
        Ok(HeadlessBackend::new(self.ledger.clone()))
    }

    fn bounding_rect(&self) -> SurfaceRect {
        SurfaceRect::new(0.0, 0.0, self.width as f32, self.height as f32)
    }
}
