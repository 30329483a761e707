#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use glam::Mat4;
use vout_renderer::format::TextureTarget;
use vout_renderer::gpu::{
    AttribLocation, BufferId, BufferTarget, ContextCaps, FixedState, GraphicsContext, ProgramId, TextureDesc,
    TextureId, TextureUpload, UniformLocation, UniformValue,
};
use vout_renderer::interop::{Interop, InteropCaps, Picture, SoftwareInterop};
use vout_renderer::shader::{Attribute, ShaderProgramSource, Uniform};
use vout_renderer::transform::PlaneTexture;
use vout_renderer::{RendererError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CreateProgram(ProgramId),
    DeleteProgram(ProgramId),
    CreateBuffer(BufferId, BufferTarget, usize),
    DeleteBuffer(BufferId),
    CreateTexture(TextureId, TextureDesc),
    DeleteTexture(TextureId),
    Upload(TextureId, u32, u32),
    FixedState(FixedState),
    Clear,
    Draw { index_buffer: BufferId, count: u32 },
    InteropRelease,
}

pub type Log = Rc<RefCell<Vec<Event>>>;

/// GraphicsContext that records every call instead of touching a GPU.
pub struct RecordingContext {
    pub caps: ContextCaps,
    pub log: Log,
    /// `uniform_location` answers `None` for this uniform.
    pub missing_uniform: Option<Uniform>,
    pub fail_uploads: bool,
    next_id: u32,
    programs: HashMap<ProgramId, ShaderProgramSource>,
    buffers: HashMap<BufferId, Vec<u8>>,
    current: Option<ProgramId>,
    values: HashMap<(ProgramId, UniformLocation), UniformValue>,
    bound_textures: HashMap<(ProgramId, UniformLocation), TextureId>,
    attributes: HashMap<(ProgramId, AttribLocation), (BufferId, u32)>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::with_caps(ContextCaps::default())
    }

    pub fn with_caps(caps: ContextCaps) -> Self {
        Self {
            caps,
            log: Rc::new(RefCell::new(Vec::new())),
            missing_uniform: None,
            fail_uploads: false,
            next_id: 1,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            current: None,
            values: HashMap::new(),
            bound_textures: HashMap::new(),
            attributes: HashMap::new(),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.borrow().clone()
    }

    pub fn draws(&self) -> Vec<(BufferId, u32)> {
        self.log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Draw { index_buffer, count } => Some((*index_buffer, *count)),
                _ => None,
            })
            .collect()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Contents of a live buffer, read back as floats.
    pub fn floats(&self, buffer: BufferId) -> Option<Vec<f32>> {
        let data = self.buffers.get(&buffer)?;
        Some(
            data.chunks_exact(4)
                .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn source(&self, program: ProgramId) -> Option<&ShaderProgramSource> {
        self.programs.get(&program)
    }

    /// Last value set for `uniform` on the program in use.
    pub fn uniform(&self, uniform: Uniform) -> Option<UniformValue> {
        let program = self.current?;
        let location = self.uniform_location(program, uniform)?;
        self.values.get(&(program, location)).copied()
    }

    pub fn mat4(&self, uniform: Uniform) -> Option<Mat4> {
        match self.uniform(uniform)? {
            UniformValue::Mat4(m) => Some(m),
            _ => None,
        }
    }

    pub fn texture_bound_to(&self, uniform: Uniform) -> Option<TextureId> {
        let program = self.current?;
        let location = self.uniform_location(program, uniform)?;
        self.bound_textures.get(&(program, location)).copied()
    }

    pub fn attribute(&self, attribute: Attribute) -> Option<(BufferId, u32)> {
        let program = self.current?;
        let location = self.attrib_location(program, attribute)?;
        self.attributes.get(&(program, location)).copied()
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn push(&self, event: Event) {
        self.log.borrow_mut().push(event);
    }
}

impl GraphicsContext for RecordingContext {
    fn caps(&self) -> &ContextCaps {
        &self.caps
    }

    fn create_program(&mut self, source: &ShaderProgramSource) -> Result<ProgramId> {
        let id = ProgramId(self.alloc_id());
        self.programs.insert(id, source.clone());
        self.push(Event::CreateProgram(id));
        Ok(id)
    }

    fn uniform_location(&self, program: ProgramId, uniform: Uniform) -> Option<UniformLocation> {
        if self.missing_uniform == Some(uniform) {
            return None;
        }
        self.programs
            .get(&program)?
            .interface
            .uniforms()
            .iter()
            .position(|u| u.uniform == uniform)
            .map(|i| UniformLocation(i as u32))
    }

    fn attrib_location(&self, program: ProgramId, attribute: Attribute) -> Option<AttribLocation> {
        self.programs
            .get(&program)?
            .interface
            .has_attribute(attribute)
            .then(|| AttribLocation(attribute.location()))
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        self.push(Event::DeleteProgram(program));
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferId> {
        let id = BufferId(self.alloc_id());
        self.buffers.insert(id, data.to_vec());
        self.push(Event::CreateBuffer(id, target, data.len()));
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        self.push(Event::DeleteBuffer(buffer));
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId> {
        let id = TextureId(self.alloc_id());
        self.push(Event::CreateTexture(id, *desc));
        Ok(id)
    }

    fn upload_texture(&mut self, texture: TextureId, upload: TextureUpload<'_>) -> Result<()> {
        if self.fail_uploads {
            return Err(RendererError::Upload("injected failure".into()));
        }
        self.push(Event::Upload(texture, upload.width, upload.height));
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.push(Event::DeleteTexture(texture));
    }

    fn set_fixed_state(&mut self, state: FixedState) {
        self.push(Event::FixedState(state));
    }

    fn clear(&mut self, _color: [f32; 4]) {
        self.push(Event::Clear);
    }

    fn use_program(&mut self, program: ProgramId) {
        self.current = Some(program);
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        if let Some(program) = self.current {
            self.values.insert((program, location), value);
        }
    }

    fn bind_texture(&mut self, location: UniformLocation, texture: TextureId) {
        if let Some(program) = self.current {
            self.bound_textures.insert((program, location), texture);
        }
    }

    fn bind_attribute(&mut self, location: AttribLocation, buffer: BufferId, components: u32) {
        if let Some(program) = self.current {
            self.attributes.insert((program, location), (buffer, components));
        }
    }

    fn draw_indexed(&mut self, index_buffer: BufferId, count: u32) -> Result<()> {
        self.push(Event::Draw { index_buffer, count });
        Ok(())
    }
}

/// Software interop that records its release in the context's log.
pub struct LoggingInterop {
    inner: SoftwareInterop,
    log: Log,
}

impl LoggingInterop {
    pub fn boxed(ctx: &RecordingContext, target: TextureTarget) -> Box<dyn Interop> {
        Box::new(LoggingInterop {
            inner: SoftwareInterop::new(target),
            log: ctx.log.clone(),
        })
    }
}

impl Interop for LoggingInterop {
    fn caps(&self) -> InteropCaps {
        self.inner.caps()
    }

    fn update_textures(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        textures: &[TextureId],
        sizes: &[PlaneTexture],
        picture: &Picture,
    ) -> Result<()> {
        self.inner.update_textures(ctx, textures, sizes, picture)
    }

    fn release(&mut self, ctx: &mut dyn GraphicsContext) {
        self.inner.release(ctx);
        self.log.borrow_mut().push(Event::InteropRelease);
    }
}

/// Interop that creates its own textures and deletes them on release.
pub struct GeneratingInterop {
    textures: Vec<TextureId>,
    log: Log,
}

impl GeneratingInterop {
    pub fn boxed(ctx: &RecordingContext) -> Box<dyn Interop> {
        Box::new(GeneratingInterop {
            textures: Vec::new(),
            log: ctx.log.clone(),
        })
    }
}

impl Interop for GeneratingInterop {
    fn caps(&self) -> InteropCaps {
        InteropCaps {
            target: TextureTarget::Texture2d,
            handles_texture_generation: true,
        }
    }

    fn generate_textures(&mut self, ctx: &mut dyn GraphicsContext, descs: &[TextureDesc]) -> Result<Vec<TextureId>> {
        for desc in descs {
            let texture = ctx.create_texture(desc)?;
            self.textures.push(texture);
        }
        Ok(self.textures.clone())
    }

    fn update_textures(
        &mut self,
        _ctx: &mut dyn GraphicsContext,
        _textures: &[TextureId],
        _sizes: &[PlaneTexture],
        _picture: &Picture,
    ) -> Result<()> {
        Ok(())
    }

    fn transform_matrix(&self) -> Option<Mat4> {
        Some(Mat4::from_scale(glam::Vec3::new(1.0, -1.0, 1.0)))
    }

    fn release(&mut self, ctx: &mut dyn GraphicsContext) {
        for texture in self.textures.drain(..) {
            ctx.delete_texture(texture);
        }
        self.log.borrow_mut().push(Event::InteropRelease);
    }
}
