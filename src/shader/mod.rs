// shader/mod.rs — shader program synthesis from a format description
//
// A program is composed from a fixed vertex stage and a fragment stage
// assembled per chroma: one texture and coordinate map per plane, swizzled
// into a YUV pixel and converted, or sampled directly for RGB. Both stages
// share one uniform block whose layout is returned with the source text as a
// `ProgramInterface`, so callers bind by `Uniform` tag instead of by name.

pub mod color_map;
mod fragment;
pub mod interface;
mod vertex;

pub use color_map::{ColorMapping, ToneMapping};
pub use interface::{Attribute, ProgramInterface, Slot, Uniform, UniformKind, UniformSlot};

use crate::error::{RendererError, Result};
use crate::format::{ChromaDescription, ColorModel, ColorPrimaries, TextureTarget, TransferFunction, MAX_PLANES};
use crate::gpu::ContextCaps;

/// Everything that changes the fragment stage's text.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentDescription {
    pub chroma: &'static ChromaDescription,
    pub target: TextureTarget,
    pub transfer: TransferFunction,
    pub primaries: ColorPrimaries,
    pub color_mapping: Option<ColorMapping>,
}

impl FragmentDescription {
    pub fn new(chroma: &'static ChromaDescription, target: TextureTarget) -> Self {
        Self {
            chroma,
            target,
            transfer: TransferFunction::default(),
            primaries: ColorPrimaries::default(),
            color_mapping: None,
        }
    }

    pub fn with_color(mut self, transfer: TransferFunction, primaries: ColorPrimaries, mapping: Option<ColorMapping>) -> Self {
        self.transfer = transfer;
        self.primaries = primaries;
        self.color_mapping = mapping;
        self
    }

    /// HDR or wide gamut input that will be shown without any mapping.
    pub fn needs_color_mapping(&self) -> bool {
        self.color_mapping.is_none() && (self.transfer == TransferFunction::Pq || self.primaries == ColorPrimaries::Bt2020)
    }

    fn validate(&self) -> Result<()> {
        let planes = self.chroma.plane_count();
        if planes == 0 || planes > MAX_PLANES {
            return Err(RendererError::UnsupportedFormat(format!(
                "{} uses {planes} planes, at most {MAX_PLANES} are supported",
                self.chroma.fourcc_str()
            )));
        }
        if let ColorModel::Yuv { .. } = self.chroma.model {
            let channels: usize = self.chroma.planes.iter().map(|p| p.swizzle.len()).sum();
            if channels != 3 {
                return Err(RendererError::UnsupportedFormat(format!(
                    "{} swizzles extract {channels} channels instead of 3",
                    self.chroma.fourcc_str()
                )));
            }
        }
        Ok(())
    }
}

/// Source text of both stages plus their uniform/attribute contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderProgramSource {
    pub label: String,
    pub vertex: String,
    pub fragment: String,
    pub interface: ProgramInterface,
}

impl ShaderProgramSource {
    /// Whether linking `other` would produce the same program.
    pub fn same_program(&self, other: &ShaderProgramSource) -> bool {
        self.vertex == other.vertex && self.fragment == other.fragment
    }
}

pub fn compose(desc: &FragmentDescription, caps: &ContextCaps) -> Result<ShaderProgramSource> {
    desc.validate()?;
    if let Some(mapping) = &desc.color_mapping {
        mapping.validate()?;
    }

    let builder = vertex::declare(ProgramInterface::builder());
    let interface = fragment::declare(builder, desc).build();

    let color_map = desc
        .color_mapping
        .as_ref()
        .and_then(|mapping| color_map::build(mapping, desc.transfer, desc.primaries));

    // XYZ sources are already mapped to display RGB by their own path.
    let color_map = match desc.chroma.model {
        ColorModel::LinearXyz => None,
        _ => color_map,
    };

    Ok(ShaderProgramSource {
        label: format!("vout program {}", desc.chroma.fourcc_str()),
        vertex: vertex::build(&caps.shader_preamble, &interface),
        fragment: fragment::build(&caps.shader_preamble, desc, &interface, color_map.as_deref()),
        interface,
    })
}
