//! A software [`GraphicsContext`] for running without a GPU.
//!
//! [`HeadlessContext`] keeps the object and binding state an OpenGL 3.3 core
//! context would keep and reports misuse through the same first-error-wins
//! error flag (`GL_INVALID_OPERATION`, `GL_INVALID_VALUE`, ...). Nothing is
//! rasterized: draw calls are recorded instead, together with the uniform
//! values and textures they would have used.
//!
//! Shader compilation is a structural check (see the private `glsl`
//! module), so diagnostics are non-empty but not driver-accurate. Unlike a
//! real linker, every declared uniform stays active; nothing is optimized
//! out.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    num::NonZeroU32,
};

use crate::{
    context::{
        BufferTarget, BufferUsage, ClearTargets, GraphicsContext, PixelFormat, Sampling,
        ShaderStage,
    },
    glsl::{self, StageInterface, UniformKind},
};

/// Number of texture units exposed.
pub const TEXTURE_UNITS: u32 = 16;

/// Number of vertex attribute slots exposed.
pub const MAX_VERTEX_ATTRIBS: u32 = 16;

/// The name of a headless GL object. Names are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectName(NonZeroU32);

impl ObjectName {
    /// The raw GL name.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// A resolved uniform location: an index into the linked program's
/// uniform table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot(usize);

/// A value written into a uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `int`, `bool` or sampler unit.
    Int(i32),
    /// `float`.
    Float(f32),
    /// Column-major `mat4`.
    Mat4([f32; 16]),
}

/// The attribute description recorded on a vertex array slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeState {
    /// Buffer that was bound to `GL_ARRAY_BUFFER` when the pointer was set.
    pub buffer: ObjectName,
    /// Float components per vertex.
    pub components: i32,
    /// Byte stride between vertices (0 means tightly packed).
    pub stride: i32,
    /// Byte offset of the first component.
    pub offset: i32,
    /// Whether the slot is enabled.
    pub enabled: bool,
}

/// Storage and sampler state of an uploaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    /// Width of level 0.
    pub width: u32,
    /// Height of level 0.
    pub height: u32,
    /// Storage format.
    pub format: PixelFormat,
    /// Number of mip levels with storage.
    pub mip_levels: u32,
    /// Applied sampler state, if any was set.
    pub sampling: Option<Sampling>,
}

/// A snapshot of every global binding point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings {
    /// Active program.
    pub program: Option<ObjectName>,
    /// Active vertex array.
    pub vertex_array: Option<ObjectName>,
    /// `GL_ARRAY_BUFFER` binding.
    pub array_buffer: Option<ObjectName>,
    /// `GL_ELEMENT_ARRAY_BUFFER` binding of the active vertex array (or of
    /// the default one when none is bound).
    pub element_buffer: Option<ObjectName>,
    /// Active texture unit.
    pub active_unit: u32,
    /// 2D texture bound on each unit.
    pub textures: Vec<Option<ObjectName>>,
}

/// A recorded `glDrawElements` call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// Program that was active.
    pub program: ObjectName,
    /// Vertex array that was active.
    pub vertex_array: ObjectName,
    /// Number of indices drawn.
    pub index_count: i32,
    /// Textures bound at draw time, by unit.
    pub textures: BTreeMap<u32, ObjectName>,
    /// Uniform values of the active program at draw time.
    pub uniforms: BTreeMap<String, UniformValue>,
}

struct ShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: Option<StageInterface>,
    log: String,
}

struct ActiveUniform {
    name: String,
    kind: UniformKind,
    value: Option<UniformValue>,
}

#[derive(Default)]
struct ProgramObject {
    attached: Vec<ObjectName>,
    linked: bool,
    log: String,
    uniforms: Vec<ActiveUniform>,
}

#[derive(Default)]
struct VertexArrayObject {
    pointers: BTreeMap<u32, (ObjectName, i32, i32, i32)>,
    enabled: BTreeMap<u32, bool>,
    element_buffer: Option<ObjectName>,
}

#[derive(Default)]
struct TextureObject {
    image: Option<(u32, u32, PixelFormat)>,
    pixels: Vec<u8>,
    mip_levels: u32,
    sampling: Option<Sampling>,
}

struct State {
    next_name: u32,
    shaders: HashMap<ObjectName, ShaderObject>,
    programs: HashMap<ObjectName, ProgramObject>,
    buffers: HashMap<ObjectName, Vec<u8>>,
    vertex_arrays: HashMap<ObjectName, VertexArrayObject>,
    textures: HashMap<ObjectName, TextureObject>,

    program: Option<ObjectName>,
    vertex_array: Option<ObjectName>,
    array_buffer: Option<ObjectName>,
    /// Element buffer binding used while no vertex array is bound.
    default_element_buffer: Option<ObjectName>,
    active_unit: u32,
    units: Vec<Option<ObjectName>>,

    clear_color: [f32; 4],
    depth_test: bool,
    viewport: [i32; 4],
    clears: usize,
    draw_calls: Vec<DrawCall>,
    error: Option<u32>,
    stray_deletes: usize,
}

impl Default for State {
    fn default() -> Self {
        Self {
            next_name: 0,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            textures: HashMap::new(),
            program: None,
            vertex_array: None,
            array_buffer: None,
            default_element_buffer: None,
            active_unit: 0,
            units: vec![None; TEXTURE_UNITS as usize],
            clear_color: [0.0; 4],
            depth_test: false,
            viewport: [0; 4],
            clears: 0,
            draw_calls: Vec::new(),
            error: None,
            stray_deletes: 0,
        }
    }
}

impl State {
    fn allocate(&mut self) -> Result<ObjectName, String> {
        self.next_name += 1;
        NonZeroU32::new(self.next_name)
            .map(ObjectName)
            .ok_or_else(|| "object names exhausted".to_owned())
    }

    /// Raise a GL error. Only the first error is kept until it is read.
    fn fail(&mut self, code: u32) {
        log::trace!("headless GL error 0x{code:04X}");
        self.error.get_or_insert(code);
    }

    fn element_buffer_slot(&mut self) -> &mut Option<ObjectName> {
        match self
            .vertex_array
            .and_then(|vao| self.vertex_arrays.get_mut(&vao))
        {
            Some(vao) => &mut vao.element_buffer,
            None => &mut self.default_element_buffer,
        }
    }

    fn bound_buffer(&self, target: BufferTarget) -> Option<ObjectName> {
        match target {
            BufferTarget::Array => self.array_buffer,
            BufferTarget::ElementArray => match self.vertex_array {
                Some(vao) => self
                    .vertex_arrays
                    .get(&vao)
                    .and_then(|vao| vao.element_buffer),
                None => self.default_element_buffer,
            },
        }
    }

    fn bound_texture(&self) -> Option<ObjectName> {
        self.units[self.active_unit as usize]
    }

    fn write_uniform(&mut self, slot: UniformSlot, value: UniformValue) {
        let Some(program) = self.program else {
            self.fail(glow::INVALID_OPERATION);
            return;
        };
        let uniform = self
            .programs
            .get_mut(&program)
            .and_then(|program| program.uniforms.get_mut(slot.0));
        let Some(uniform) = uniform else {
            self.fail(glow::INVALID_OPERATION);
            return;
        };
        let fits = matches!(
            (uniform.kind, value),
            (
                UniformKind::Int | UniformKind::Bool | UniformKind::Sampler,
                UniformValue::Int(_)
            ) | (UniformKind::Float, UniformValue::Float(_))
                | (UniformKind::Mat4, UniformValue::Mat4(_))
        );
        if fits {
            uniform.value = Some(value);
        } else {
            self.fail(glow::INVALID_OPERATION);
        }
    }

    fn link(&mut self, program: ObjectName) {
        let Some(attached) = self.programs.get(&program).map(|p| p.attached.clone()) else {
            self.fail(glow::INVALID_VALUE);
            return;
        };
        let result = self.link_stages(&attached);
        if let Some(program) = self.programs.get_mut(&program) {
            match result {
                Ok(uniforms) => {
                    program.linked = true;
                    program.log.clear();
                    program.uniforms = uniforms;
                }
                Err(log) => {
                    program.linked = false;
                    program.log = log;
                    program.uniforms.clear();
                }
            }
        }
    }

    fn link_stages(&self, attached: &[ObjectName]) -> Result<Vec<ActiveUniform>, String> {
        let mut vertex = Vec::new();
        let mut fragment = Vec::new();
        for name in attached {
            let shader = self
                .shaders
                .get(name)
                .ok_or_else(|| "ERROR: Linking: an attached shader was deleted".to_owned())?;
            let interface = shader.compiled.as_ref().ok_or_else(|| {
                format!(
                    "ERROR: Linking: attached {} shader is not compiled",
                    shader.stage
                )
            })?;
            match shader.stage {
                ShaderStage::Vertex => vertex.push(interface),
                ShaderStage::Fragment => fragment.push(interface),
            }
        }
        let ([vertex], [fragment]) = (vertex.as_slice(), fragment.as_slice()) else {
            return Err(
                "ERROR: Linking: program needs exactly one vertex and one fragment shader"
                    .to_owned(),
            );
        };

        if let Some(missing) = fragment
            .inputs
            .iter()
            .find(|input| !vertex.outputs.contains(*input))
        {
            return Err(format!(
                "ERROR: Linking: fragment input '{missing}' is not written by the vertex shader"
            ));
        }

        let mut uniforms: Vec<ActiveUniform> = Vec::new();
        for (name, kind) in vertex.uniforms.iter().chain(&fragment.uniforms) {
            match uniforms.iter().find(|u| &u.name == name) {
                Some(existing) if existing.kind != *kind => {
                    return Err(format!(
                        "ERROR: Linking: uniform '{name}' declared with conflicting types"
                    ));
                }
                Some(_) => {}
                None => uniforms.push(ActiveUniform {
                    name: name.clone(),
                    kind: *kind,
                    value: None,
                }),
            }
        }
        Ok(uniforms)
    }

    fn draw(&mut self, index_count: i32) {
        if index_count < 0 {
            self.fail(glow::INVALID_VALUE);
            return;
        }
        let (Some(program), Some(vertex_array)) = (self.program, self.vertex_array) else {
            self.fail(glow::INVALID_OPERATION);
            return;
        };
        if let Err(code) = self.check_draw_sources(vertex_array, index_count) {
            self.fail(code);
            return;
        }

        let uniforms: BTreeMap<String, UniformValue> = self
            .programs
            .get(&program)
            .map(|program| {
                program
                    .uniforms
                    .iter()
                    .filter_map(|u| u.value.map(|value| (u.name.clone(), value)))
                    .collect()
            })
            .unwrap_or_default();
        let textures: BTreeMap<u32, ObjectName> = (0..TEXTURE_UNITS)
            .zip(&self.units)
            .filter_map(|(unit, texture)| texture.map(|texture| (unit, texture)))
            .collect();

        self.draw_calls.push(DrawCall {
            program,
            vertex_array,
            index_count,
            textures,
            uniforms,
        });
    }

    /// Every index must be backed by the element buffer and address only
    /// vertices that exist in each enabled attribute's buffer.
    fn check_draw_sources(&self, vertex_array: ObjectName, index_count: i32) -> Result<(), u32> {
        let vao = self
            .vertex_arrays
            .get(&vertex_array)
            .ok_or(glow::INVALID_OPERATION)?;
        let elements = vao
            .element_buffer
            .and_then(|buffer| self.buffers.get(&buffer))
            .ok_or(glow::INVALID_OPERATION)?;

        let count = usize::try_from(index_count).map_err(|_| glow::INVALID_VALUE)?;
        let index_bytes = elements
            .get(..count * 4)
            .ok_or(glow::INVALID_OPERATION)?;
        let Some(max_index) = bytemuck::pod_collect_to_vec::<u8, u32>(index_bytes)
            .into_iter()
            .max()
        else {
            return Ok(());
        };

        for (slot, &(buffer, components, stride, offset)) in &vao.pointers {
            if !vao.enabled.get(slot).copied().unwrap_or(false) {
                continue;
            }
            let data = self.buffers.get(&buffer).ok_or(glow::INVALID_OPERATION)?;
            let element = usize::try_from(components).map_err(|_| glow::INVALID_VALUE)? * 4;
            let stride = match usize::try_from(stride).map_err(|_| glow::INVALID_VALUE)? {
                0 => element,
                stride => stride,
            };
            let offset = usize::try_from(offset).map_err(|_| glow::INVALID_VALUE)?;
            let end = offset + max_index as usize * stride + element;
            if end > data.len() {
                return Err(glow::INVALID_OPERATION);
            }
        }
        Ok(())
    }
}

/// A software stand-in for an OpenGL context.
///
/// Not thread-safe, like the real thing. Inspection methods
/// ([`bindings`](Self::bindings), [`draw_calls`](Self::draw_calls), ...) do
/// not touch the error flag.
///
/// ```
/// use gl_lessons::{context::GraphicsContext, headless::HeadlessContext};
///
/// let gl = HeadlessContext::new();
/// gl.draw_elements(3);
/// assert_eq!(gl.get_error(), Some(glow::INVALID_OPERATION));
/// assert_eq!(gl.get_error(), None);
/// ```
#[derive(Default)]
pub struct HeadlessContext {
    state: RefCell<State>,
}

impl HeadlessContext {
    /// A fresh context with no objects and nothing bound.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every binding point.
    #[must_use]
    pub fn bindings(&self) -> Bindings {
        let state = self.state.borrow();
        Bindings {
            program: state.program,
            vertex_array: state.vertex_array,
            array_buffer: state.array_buffer,
            element_buffer: state.bound_buffer(BufferTarget::ElementArray),
            active_unit: state.active_unit,
            textures: state.units.clone(),
        }
    }

    /// Every draw call issued so far, oldest first.
    #[must_use]
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.state.borrow().draw_calls.clone()
    }

    /// Number of `glClear` calls so far.
    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.state.borrow().clears
    }

    /// The last value written to `name` in `program`, if any.
    #[must_use]
    pub fn uniform_value(&self, program: ObjectName, name: &str) -> Option<UniformValue> {
        self.state
            .borrow()
            .programs
            .get(&program)?
            .uniforms
            .iter()
            .find(|u| u.name == name)?
            .value
    }

    /// Whether `program` exists and its last link succeeded.
    #[must_use]
    pub fn is_linked(&self, program: ObjectName) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|program| program.linked)
    }

    /// The source last given to `shader`, if it still exists.
    #[must_use]
    pub fn shader_source_text(&self, shader: ObjectName) -> Option<String> {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|shader| shader.source.clone())
    }

    /// Contents of a buffer object.
    #[must_use]
    pub fn buffer_contents(&self, buffer: ObjectName) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&buffer).cloned()
    }

    /// The attribute recorded on `slot` of `vertex_array`.
    #[must_use]
    pub fn attribute(&self, vertex_array: ObjectName, slot: u32) -> Option<AttributeState> {
        let state = self.state.borrow();
        let vao = state.vertex_arrays.get(&vertex_array)?;
        let &(buffer, components, stride, offset) = vao.pointers.get(&slot)?;
        Some(AttributeState {
            buffer,
            components,
            stride,
            offset,
            enabled: vao.enabled.get(&slot).copied().unwrap_or(false),
        })
    }

    /// The element buffer recorded on `vertex_array`.
    #[must_use]
    pub fn element_buffer_of(&self, vertex_array: ObjectName) -> Option<ObjectName> {
        self.state
            .borrow()
            .vertex_arrays
            .get(&vertex_array)?
            .element_buffer
    }

    /// Storage details of an uploaded texture.
    #[must_use]
    pub fn texture_info(&self, texture: ObjectName) -> Option<TextureInfo> {
        let state = self.state.borrow();
        let texture = state.textures.get(&texture)?;
        let (width, height, format) = texture.image?;
        Some(TextureInfo {
            width,
            height,
            format,
            mip_levels: texture.mip_levels,
            sampling: texture.sampling,
        })
    }

    /// Level-0 pixels of an uploaded texture.
    #[must_use]
    pub fn texture_pixels(&self, texture: ObjectName) -> Option<Vec<u8>> {
        let state = self.state.borrow();
        let texture = state.textures.get(&texture)?;
        texture.image.map(|_| texture.pixels.clone())
    }

    /// Number of shader stage objects still alive.
    #[must_use]
    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    /// Number of objects of any kind still alive.
    #[must_use]
    pub fn live_objects(&self) -> usize {
        let state = self.state.borrow();
        state.shaders.len()
            + state.programs.len()
            + state.buffers.len()
            + state.vertex_arrays.len()
            + state.textures.len()
    }

    /// Number of delete calls that named an object which no longer existed.
    #[must_use]
    pub fn stray_deletes(&self) -> usize {
        self.state.borrow().stray_deletes
    }

    /// Current viewport as `[x, y, width, height]`.
    #[must_use]
    pub fn viewport_rect(&self) -> [i32; 4] {
        self.state.borrow().viewport
    }

    /// Current clear color.
    #[must_use]
    pub fn clear_color_value(&self) -> [f32; 4] {
        self.state.borrow().clear_color
    }

    /// Whether depth testing is enabled.
    #[must_use]
    pub fn depth_test_enabled(&self) -> bool {
        self.state.borrow().depth_test
    }
}

impl GraphicsContext for HeadlessContext {
    type Shader = ObjectName;
    type Program = ObjectName;
    type Buffer = ObjectName;
    type VertexArray = ObjectName;
    type Texture = ObjectName;
    type UniformLocation = UniformSlot;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate()?;
        state.shaders.insert(
            name,
            ShaderObject {
                stage,
                source: String::new(),
                compiled: None,
                log: String::new(),
            },
        );
        Ok(name)
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        let mut state = self.state.borrow_mut();
        match state.shaders.get_mut(&shader) {
            Some(shader) => source.clone_into(&mut shader.source),
            None => state.fail(glow::INVALID_VALUE),
        }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        let mut state = self.state.borrow_mut();
        let Some(shader) = state.shaders.get_mut(&shader) else {
            state.fail(glow::INVALID_VALUE);
            return;
        };
        match glsl::check(&shader.source) {
            Ok(interface) => {
                shader.compiled = Some(interface);
                shader.log.clear();
            }
            Err(log) => {
                shader.compiled = None;
                shader.log = log;
            }
        }
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|shader| shader.compiled.is_some())
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|shader| shader.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: Self::Shader) {
        let mut state = self.state.borrow_mut();
        if state.shaders.remove(&shader).is_none() {
            state.stray_deletes += 1;
        }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate()?;
        state.programs.insert(name, ProgramObject::default());
        Ok(name)
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        let mut state = self.state.borrow_mut();
        if !state.shaders.contains_key(&shader) {
            state.fail(glow::INVALID_VALUE);
            return;
        }
        let Some(program) = state.programs.get_mut(&program) else {
            state.fail(glow::INVALID_VALUE);
            return;
        };
        if program.attached.contains(&shader) {
            state.fail(glow::INVALID_OPERATION);
        } else {
            program.attached.push(shader);
        }
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        let mut state = self.state.borrow_mut();
        let Some(program) = state.programs.get_mut(&program) else {
            state.fail(glow::INVALID_VALUE);
            return;
        };
        let before = program.attached.len();
        program.attached.retain(|attached| *attached != shader);
        if program.attached.len() == before {
            state.fail(glow::INVALID_OPERATION);
        }
    }

    fn link_program(&self, program: Self::Program) {
        self.state.borrow_mut().link(program);
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        self.is_linked(program)
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|program| program.log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: Option<Self::Program>) {
        let mut state = self.state.borrow_mut();
        match program {
            None => state.program = None,
            Some(name) => match state.programs.get(&name).map(|p| p.linked) {
                Some(true) => state.program = Some(name),
                Some(false) => state.fail(glow::INVALID_OPERATION),
                None => state.fail(glow::INVALID_VALUE),
            },
        }
    }

    fn delete_program(&self, program: Self::Program) {
        let mut state = self.state.borrow_mut();
        if state.programs.remove(&program).is_none() {
            state.stray_deletes += 1;
            return;
        }
        if state.program == Some(program) {
            state.program = None;
        }
    }

    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        let mut state = self.state.borrow_mut();
        let lookup = state.programs.get(&program).map(|p| {
            p.linked
                .then(|| p.uniforms.iter().position(|u| u.name == name))
        });
        match lookup {
            Some(Some(index)) => index.map(UniformSlot),
            Some(None) => {
                state.fail(glow::INVALID_OPERATION);
                None
            }
            None => {
                state.fail(glow::INVALID_VALUE);
                None
            }
        }
    }

    fn uniform_matrix4(&self, location: &Self::UniformLocation, columns: &[f32; 16]) {
        self.state
            .borrow_mut()
            .write_uniform(*location, UniformValue::Mat4(*columns));
    }

    fn uniform_i32(&self, location: &Self::UniformLocation, value: i32) {
        self.state
            .borrow_mut()
            .write_uniform(*location, UniformValue::Int(value));
    }

    fn uniform_f32(&self, location: &Self::UniformLocation, value: f32) {
        self.state
            .borrow_mut()
            .write_uniform(*location, UniformValue::Float(value));
    }

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate()?;
        state.buffers.insert(name, Vec::new());
        Ok(name)
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Self::Buffer>) {
        let mut state = self.state.borrow_mut();
        if buffer.is_some_and(|buffer| !state.buffers.contains_key(&buffer)) {
            state.fail(glow::INVALID_VALUE);
            return;
        }
        match target {
            BufferTarget::Array => state.array_buffer = buffer,
            BufferTarget::ElementArray => *state.element_buffer_slot() = buffer,
        }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], _usage: BufferUsage) {
        let mut state = self.state.borrow_mut();
        let bound = state.bound_buffer(target);
        match bound.and_then(|buffer| state.buffers.get_mut(&buffer)) {
            Some(contents) => data.clone_into(contents),
            None => state.fail(glow::INVALID_OPERATION),
        }
    }

    fn read_buffer(&self, target: BufferTarget, offset: i32, dst: &mut [u8]) {
        let mut state = self.state.borrow_mut();
        let Some(contents) = state
            .bound_buffer(target)
            .and_then(|buffer| state.buffers.get(&buffer))
        else {
            state.fail(glow::INVALID_OPERATION);
            return;
        };
        let source = usize::try_from(offset)
            .ok()
            .and_then(|start| contents.get(start..start + dst.len()));
        match source {
            Some(source) => dst.copy_from_slice(source),
            None => state.fail(glow::INVALID_VALUE),
        }
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        let mut state = self.state.borrow_mut();
        if state.buffers.remove(&buffer).is_none() {
            state.stray_deletes += 1;
            return;
        }
        if state.array_buffer == Some(buffer) {
            state.array_buffer = None;
        }
        let slot = state.element_buffer_slot();
        if *slot == Some(buffer) {
            *slot = None;
        }
    }

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate()?;
        state
            .vertex_arrays
            .insert(name, VertexArrayObject::default());
        Ok(name)
    }

    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>) {
        let mut state = self.state.borrow_mut();
        if vertex_array.is_some_and(|vao| !state.vertex_arrays.contains_key(&vao)) {
            state.fail(glow::INVALID_OPERATION);
            return;
        }
        state.vertex_array = vertex_array;
    }

    fn enable_vertex_attrib_array(&self, slot: u32) {
        let mut state = self.state.borrow_mut();
        if slot >= MAX_VERTEX_ATTRIBS {
            state.fail(glow::INVALID_VALUE);
            return;
        }
        let Some(vao) = state
            .vertex_array
            .and_then(|vao| state.vertex_arrays.get_mut(&vao))
        else {
            state.fail(glow::INVALID_OPERATION);
            return;
        };
        vao.enabled.insert(slot, true);
    }

    fn vertex_attrib_pointer_f32(&self, slot: u32, components: i32, stride: i32, offset: i32) {
        let mut state = self.state.borrow_mut();
        if slot >= MAX_VERTEX_ATTRIBS || !(1..=4).contains(&components) || stride < 0 {
            state.fail(glow::INVALID_VALUE);
            return;
        }
        let Some(buffer) = state.array_buffer else {
            state.fail(glow::INVALID_OPERATION);
            return;
        };
        let Some(vao) = state
            .vertex_array
            .and_then(|vao| state.vertex_arrays.get_mut(&vao))
        else {
            state.fail(glow::INVALID_OPERATION);
            return;
        };
        vao.pointers.insert(slot, (buffer, components, stride, offset));
    }

    fn delete_vertex_array(&self, vertex_array: Self::VertexArray) {
        let mut state = self.state.borrow_mut();
        if state.vertex_arrays.remove(&vertex_array).is_none() {
            state.stray_deletes += 1;
            return;
        }
        if state.vertex_array == Some(vertex_array) {
            state.vertex_array = None;
        }
    }

    fn create_texture(&self) -> Result<Self::Texture, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate()?;
        state.textures.insert(name, TextureObject::default());
        Ok(name)
    }

    fn active_texture(&self, unit: u32) {
        let mut state = self.state.borrow_mut();
        if unit >= TEXTURE_UNITS {
            state.fail(glow::INVALID_ENUM);
            return;
        }
        state.active_unit = unit;
    }

    fn bind_texture(&self, texture: Option<Self::Texture>) {
        let mut state = self.state.borrow_mut();
        if texture.is_some_and(|texture| !state.textures.contains_key(&texture)) {
            state.fail(glow::INVALID_OPERATION);
            return;
        }
        let unit = state.active_unit as usize;
        state.units[unit] = texture;
    }

    fn tex_image_2d(&self, width: i32, height: i32, format: PixelFormat, pixels: &[u8]) {
        let mut state = self.state.borrow_mut();
        let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
            state.fail(glow::INVALID_VALUE);
            return;
        };
        let expected = w as usize * h as usize * format.channels();
        if pixels.len() < expected {
            state.fail(glow::INVALID_OPERATION);
            return;
        }
        let Some(texture) = state
            .bound_texture()
            .and_then(|texture| state.textures.get_mut(&texture))
        else {
            state.fail(glow::INVALID_OPERATION);
            return;
        };
        texture.image = Some((w, h, format));
        texture.pixels = pixels[..expected].to_vec();
        texture.mip_levels = 1;
    }

    fn set_sampling(&self, sampling: &Sampling) {
        let mut state = self.state.borrow_mut();
        match state
            .bound_texture()
            .and_then(|texture| state.textures.get_mut(&texture))
        {
            Some(texture) => texture.sampling = Some(*sampling),
            None => state.fail(glow::INVALID_OPERATION),
        }
    }

    fn generate_mipmap(&self) {
        let mut state = self.state.borrow_mut();
        let texture = state
            .bound_texture()
            .and_then(|texture| state.textures.get_mut(&texture));
        match texture {
            Some(texture) => match texture.image {
                Some((width, height, _)) => {
                    texture.mip_levels = width.max(height).max(1).ilog2() + 1;
                }
                None => state.fail(glow::INVALID_OPERATION),
            },
            None => state.fail(glow::INVALID_OPERATION),
        }
    }

    fn delete_texture(&self, texture: Self::Texture) {
        let mut state = self.state.borrow_mut();
        if state.textures.remove(&texture).is_none() {
            state.stray_deletes += 1;
            return;
        }
        for unit in &mut state.units {
            if *unit == Some(texture) {
                *unit = None;
            }
        }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        let mut state = self.state.borrow_mut();
        if width < 0 || height < 0 {
            state.fail(glow::INVALID_VALUE);
            return;
        }
        state.viewport = [x, y, width, height];
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        self.state.borrow_mut().clear_color = rgba;
    }

    fn clear(&self, _targets: ClearTargets) {
        self.state.borrow_mut().clears += 1;
    }

    fn set_depth_test(&self, enabled: bool) {
        self.state.borrow_mut().depth_test = enabled;
    }

    fn draw_elements(&self, index_count: i32) {
        self.state.borrow_mut().draw(index_count);
    }

    fn get_error(&self) -> Option<u32> {
        self.state.borrow_mut().error.take()
    }
}
