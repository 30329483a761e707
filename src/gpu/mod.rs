// gpu/mod.rs — graphics context consumed by the renderer

pub mod wgpu_backend;

use glam::{Mat3, Mat4, Vec2, Vec4};

use crate::error::Result;
use crate::format::TexelFormat;
use crate::shader::{Attribute, ShaderProgramSource, Uniform};

pub use wgpu_backend::WgpuContext;

/// What the context can do, queried once at renderer construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextCaps {
    /// Textures may have non-power-of-two sizes.
    pub npot: bool,
    /// Prepended verbatim to every synthesized shader stage.
    pub shader_preamble: String,
    pub max_texture_size: u32,
    /// 16-bit normalized texture formats are available.
    pub norm16: bool,
}

impl Default for ContextCaps {
    fn default() -> Self {
        Self {
            npot: true,
            shader_preamble: String::new(),
            max_texture_size: 8192,
            norm16: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Opaque handle to a resolved uniform of one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Opaque handle to a resolved vertex attribute of one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttribLocation(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    Vertex,
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TexelFormat,
}

/// Tightly described CPU pixels for one texture.
#[derive(Debug, Clone, Copy)]
pub struct TextureUpload<'a> {
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: u32,
    pub data: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedState {
    pub cull_back_faces: bool,
    pub depth_test: bool,
    pub blend: bool,
}

impl FixedState {
    /// Culling on, no depth test, no blending.
    pub const VIDEO: FixedState = FixedState {
        cull_back_faces: true,
        depth_test: false,
        blend: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Mat3(Mat3),
    Vec2(Vec2),
    Vec4(Vec4),
}

/// GPU entry points. All calls are synchronous on the rendering thread.
pub trait GraphicsContext {
    fn caps(&self) -> &ContextCaps;

    /// Compiles and links both stages. The program keeps `source.interface`
    /// so locations can be resolved by tag.
    fn create_program(&mut self, source: &ShaderProgramSource) -> Result<ProgramId>;
    fn uniform_location(&self, program: ProgramId, uniform: Uniform) -> Option<UniformLocation>;
    fn attrib_location(&self, program: ProgramId, attribute: Attribute) -> Option<AttribLocation>;
    fn delete_program(&mut self, program: ProgramId);

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferId>;
    fn delete_buffer(&mut self, buffer: BufferId);

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId>;
    fn upload_texture(&mut self, texture: TextureId, upload: TextureUpload<'_>) -> Result<()>;
    fn delete_texture(&mut self, texture: TextureId);

    fn set_fixed_state(&mut self, state: FixedState);
    fn clear(&mut self, color: [f32; 4]);
    fn use_program(&mut self, program: ProgramId);
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);
    fn bind_texture(&mut self, location: UniformLocation, texture: TextureId);
    fn bind_attribute(&mut self, location: AttribLocation, buffer: BufferId, components: u32);
    fn draw_indexed(&mut self, index_buffer: BufferId, index_count: u32) -> Result<()>;
}

/// Packs a uniform value the way the uniform address space lays it out.
pub fn uniform_bytes(value: &UniformValue) -> Vec<u8> {
    match value {
        UniformValue::Mat4(m) => bytemuck::cast_slice(&m.to_cols_array()).to_vec(),
        UniformValue::Mat3(m) => {
            let mut padded = [0f32; 12];
            for (col, chunk) in padded.chunks_exact_mut(4).enumerate() {
                chunk[..3].copy_from_slice(&m.col(col).to_array());
            }
            bytemuck::cast_slice(&padded).to_vec()
        }
        UniformValue::Vec2(v) => bytemuck::cast_slice(&v.to_array()).to_vec(),
        UniformValue::Vec4(v) => bytemuck::cast_slice(&v.to_array()).to_vec(),
    }
}
