// interface.rs — typed uniform/attribute contract of a synthesized program

use std::fmt::{self, Write as _};

use crate::format::MAX_PLANES;

/// Bind group slot of the uniform block.
pub const UNIFORM_BLOCK_BINDING: u32 = 0;
/// Bind group slot of the shared sampler, when the program samples.
pub const SAMPLER_BINDING: u32 = 1;
/// Bind group slot of `Texture0`; later planes follow.
pub const FIRST_TEXTURE_BINDING: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uniform {
    TransformMatrix,
    OrientationMatrix,
    StereoMatrix,
    ProjectionMatrix,
    ViewMatrix,
    ZoomMatrix,
    ConvMatrix,
    TexCoordsMap(u8),
    Texture(u8),
    TexSize(u8),
    FillColor,
}

impl Uniform {
    pub fn kind(self) -> UniformKind {
        match self {
            Uniform::TransformMatrix
            | Uniform::OrientationMatrix
            | Uniform::ProjectionMatrix
            | Uniform::ViewMatrix
            | Uniform::ZoomMatrix
            | Uniform::ConvMatrix => UniformKind::Mat4,
            Uniform::StereoMatrix | Uniform::TexCoordsMap(_) => UniformKind::Mat3,
            Uniform::TexSize(_) => UniformKind::Vec2,
            Uniform::FillColor => UniformKind::Vec4,
            Uniform::Texture(_) => UniformKind::Texture,
        }
    }
}

impl fmt::Display for Uniform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Uniform::TransformMatrix => f.write_str("TransformMatrix"),
            Uniform::OrientationMatrix => f.write_str("OrientationMatrix"),
            Uniform::StereoMatrix => f.write_str("StereoMatrix"),
            Uniform::ProjectionMatrix => f.write_str("ProjectionMatrix"),
            Uniform::ViewMatrix => f.write_str("ViewMatrix"),
            Uniform::ZoomMatrix => f.write_str("ZoomMatrix"),
            Uniform::ConvMatrix => f.write_str("ConvMatrix"),
            Uniform::TexCoordsMap(i) => write!(f, "TexCoordsMap{i}"),
            Uniform::Texture(i) => write!(f, "Texture{i}"),
            Uniform::TexSize(i) => write!(f, "TexSize{i}"),
            Uniform::FillColor => f.write_str("FillColor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    VertexPosition,
    PicCoordsIn,
}

impl Attribute {
    pub fn location(self) -> u32 {
        match self {
            Attribute::VertexPosition => 0,
            Attribute::PicCoordsIn => 1,
        }
    }

    pub fn components(self) -> u32 {
        match self {
            Attribute::VertexPosition => 3,
            Attribute::PicCoordsIn => 2,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::VertexPosition => f.write_str("VertexPosition"),
            Attribute::PicCoordsIn => f.write_str("PicCoordsIn"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Mat4,
    Mat3,
    Vec2,
    Vec4,
    Texture,
}

impl UniformKind {
    /// `(align, size)` in the uniform address space.
    fn layout(self) -> (u32, u32) {
        match self {
            UniformKind::Mat4 => (16, 64),
            // columns are padded to vec4
            UniformKind::Mat3 => (16, 48),
            UniformKind::Vec2 => (8, 8),
            UniformKind::Vec4 => (16, 16),
            UniformKind::Texture => (0, 0),
        }
    }

    fn wgsl_type(self) -> &'static str {
        match self {
            UniformKind::Mat4 => "mat4x4<f32>",
            UniformKind::Mat3 => "mat3x3<f32>",
            UniformKind::Vec2 => "vec2<f32>",
            UniformKind::Vec4 => "vec4<f32>",
            UniformKind::Texture => "texture_2d<f32>",
        }
    }
}

/// Where a uniform's value lives once the program is linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Byte offset inside the uniform block.
    Offset(u32),
    /// Bind group binding of a texture.
    Binding(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub uniform: Uniform,
    pub slot: Slot,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramInterface {
    uniforms: Vec<UniformSlot>,
    attributes: Vec<Attribute>,
    block_size: u32,
    sampled: bool,
}

impl ProgramInterface {
    pub fn builder() -> InterfaceBuilder {
        InterfaceBuilder::default()
    }

    pub fn uniforms(&self) -> &[UniformSlot] {
        &self.uniforms
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn slot(&self, uniform: Uniform) -> Option<Slot> {
        self.uniforms.iter().find(|u| u.uniform == uniform).map(|u| u.slot)
    }

    pub fn contains(&self, uniform: Uniform) -> bool {
        self.slot(uniform).is_some()
    }

    pub fn has_attribute(&self, attribute: Attribute) -> bool {
        self.attributes.contains(&attribute)
    }

    /// Size in bytes of the uniform block, a multiple of 16.
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Whether textures are read through the shared sampler.
    pub fn sampled(&self) -> bool {
        self.sampled
    }

    pub fn texture_count(&self) -> usize {
        self.uniforms
            .iter()
            .filter(|u| matches!(u.uniform, Uniform::Texture(_)))
            .count()
    }

    /// WGSL declaration of the uniform block.
    pub(crate) fn block_declaration(&self) -> String {
        let mut out = String::from("struct Uniforms {\n");
        for entry in &self.uniforms {
            if let Slot::Offset(_) = entry.slot {
                let _ = writeln!(out, "    {}: {},", entry.uniform, entry.uniform.kind().wgsl_type());
            }
        }
        out.push_str("};\n");
        let _ = writeln!(
            out,
            "@group(0) @binding({UNIFORM_BLOCK_BINDING}) var<uniform> u: Uniforms;"
        );
        out
    }

    /// WGSL declarations of the sampler and plane textures.
    pub(crate) fn texture_declarations(&self) -> String {
        let mut out = String::new();
        if self.sampled {
            let _ = writeln!(out, "@group(0) @binding({SAMPLER_BINDING}) var TexSampler: sampler;");
        }
        for entry in &self.uniforms {
            if let Slot::Binding(binding) = entry.slot {
                let _ = writeln!(
                    out,
                    "@group(0) @binding({binding}) var {}: {};",
                    entry.uniform,
                    entry.uniform.kind().wgsl_type()
                );
            }
        }
        out
    }
}

/// Lays uniforms out in declaration order following the uniform address
/// space alignment rules.
#[derive(Debug, Default)]
pub struct InterfaceBuilder {
    interface: ProgramInterface,
    offset: u32,
}

impl InterfaceBuilder {
    pub fn uniform(mut self, uniform: Uniform) -> Self {
        if self.interface.contains(uniform) {
            return self;
        }
        let slot = match uniform {
            Uniform::Texture(i) => {
                debug_assert!((i as usize) < MAX_PLANES);
                Slot::Binding(FIRST_TEXTURE_BINDING + i as u32)
            }
            other => {
                let (align, size) = other.kind().layout();
                let offset = self.offset.next_multiple_of(align);
                self.offset = offset + size;
                Slot::Offset(offset)
            }
        };
        self.interface.uniforms.push(UniformSlot { uniform, slot });
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        if !self.interface.attributes.contains(&attribute) {
            self.interface.attributes.push(attribute);
        }
        self
    }

    pub fn sampled(mut self, sampled: bool) -> Self {
        self.interface.sampled = sampled;
        self
    }

    pub fn build(mut self) -> ProgramInterface {
        self.interface.block_size = self.offset.next_multiple_of(16).max(16);
        self.interface
    }
}
