// renderer.rs — draws decoded pictures through a synthesized shader program
//
// The renderer owns the linked program, the three geometry buffers, the plane
// textures (unless the interop generates them) and the interop itself. Every
// GPU call goes through the `GraphicsContext` passed to each method; the
// renderer never stores it, so teardown is the explicit `release`.

use glam::{Mat4, Vec2, Vec4};
use log::{debug, error, info, warn};

use crate::color;
use crate::config::RendererConfig;
use crate::error::{RendererError, Result};
use crate::format::{ColorModel, ColorRange, TextureTarget, VideoFormat};
use crate::gpu::{
    AttribLocation, BufferId, BufferTarget, FixedState, GraphicsContext, ProgramId, TextureDesc, TextureId,
    UniformLocation, UniformValue,
};
use crate::interop::{Interop, Picture};
use crate::mesh::Mesh;
use crate::shader::{self, Attribute, FragmentDescription, ProgramInterface, ShaderProgramSource, Uniform};
use crate::transform::{PlaneTexture, TransformState};
use crate::viewpoint::Viewpoint;

/// Locations of everything the program interface declares.
#[derive(Debug, Clone)]
struct Locations {
    uniforms: Vec<(Uniform, UniformLocation)>,
    attributes: Vec<(Attribute, AttribLocation)>,
}

impl Locations {
    fn resolve(ctx: &dyn GraphicsContext, program: ProgramId, interface: &ProgramInterface) -> Result<Locations> {
        let mut uniforms = Vec::with_capacity(interface.uniforms().len());
        for entry in interface.uniforms() {
            let location = ctx
                .uniform_location(program, entry.uniform)
                .ok_or_else(|| RendererError::MissingLocation {
                    kind: "uniform",
                    name: entry.uniform.to_string(),
                })?;
            uniforms.push((entry.uniform, location));
        }

        let mut attributes = Vec::with_capacity(interface.attributes().len());
        for &attribute in interface.attributes() {
            let location = ctx
                .attrib_location(program, attribute)
                .ok_or_else(|| RendererError::MissingLocation {
                    kind: "attribute",
                    name: attribute.to_string(),
                })?;
            attributes.push((attribute, location));
        }
        Ok(Locations { uniforms, attributes })
    }
}

#[derive(Debug, Clone, Copy)]
struct Geometry {
    positions: BufferId,
    tex_coords: BufferId,
    indices: BufferId,
    index_count: u32,
}

impl Geometry {
    fn upload(ctx: &mut dyn GraphicsContext, mesh: &Mesh, acquired: &mut Vec<BufferId>) -> Result<Geometry> {
        let positions = ctx.create_buffer(BufferTarget::Vertex, bytemuck::cast_slice(&mesh.positions))?;
        acquired.push(positions);
        let tex_coords = ctx.create_buffer(BufferTarget::Vertex, bytemuck::cast_slice(&mesh.tex_coords))?;
        acquired.push(tex_coords);
        let indices = ctx.create_buffer(BufferTarget::Index, bytemuck::cast_slice(&mesh.indices))?;
        acquired.push(indices);
        Ok(Geometry {
            positions,
            tex_coords,
            indices,
            index_count: mesh.index_count() as u32,
        })
    }

    /// Creation order, so deleting in reverse mirrors acquisition.
    fn buffers(&self) -> [BufferId; 3] {
        [self.positions, self.tex_coords, self.indices]
    }
}

/// Partially built renderer state, unwound in reverse on construction failure.
#[derive(Default)]
struct Acquired {
    program: Option<ProgramId>,
    textures: Vec<TextureId>,
    buffers: Vec<BufferId>,
}

impl Acquired {
    fn unwind(self, ctx: &mut dyn GraphicsContext, interop: &mut dyn Interop) {
        for &buffer in self.buffers.iter().rev() {
            ctx.delete_buffer(buffer);
        }
        for &texture in self.textures.iter().rev() {
            ctx.delete_texture(texture);
        }
        interop.release(ctx);
        if let Some(program) = self.program {
            ctx.delete_program(program);
        }
    }
}

/// Per-plane texture sizes, from the full buffer dimensions.
fn plane_textures(format: &VideoFormat, npot: bool) -> Vec<PlaneTexture> {
    format
        .description()
        .planes
        .iter()
        .map(|plane| {
            let mut tex_width = plane.width.apply(format.width).max(1);
            let mut tex_height = plane.height.apply(format.height).max(1);
            if !npot {
                tex_width = tex_width.next_power_of_two();
                tex_height = tex_height.next_power_of_two();
            }
            PlaneTexture {
                width: plane.width,
                height: plane.height,
                tex_width,
                tex_height,
            }
        })
        .collect()
}

fn cubemap_padding(format: &VideoFormat) -> (f32, f32) {
    if format.width == 0 || format.height == 0 {
        return (0.0, 0.0);
    }
    (
        format.cubemap_padding as f32 / format.width as f32,
        format.cubemap_padding as f32 / format.height as f32,
    )
}

/// The visible window must lie inside the decoded buffer.
fn check_crop(format: &VideoFormat) -> Result<()> {
    let crop = format.crop();
    let right = crop.x_offset.checked_add(crop.width);
    let bottom = crop.y_offset.checked_add(crop.height);
    match (right, bottom) {
        (Some(right), Some(bottom)) if right <= format.width && bottom <= format.height => Ok(()),
        _ => Err(RendererError::InvalidParameter(format!(
            "crop {crop:?} does not fit the {}x{} buffer",
            format.width, format.height
        ))),
    }
}

fn conversion_matrix(format: &VideoFormat) -> Mat4 {
    let desc = format.description();
    match desc.model {
        // Output is always expanded from the limited range, whatever the
        // source claims.
        ColorModel::Yuv { .. } => color::yuv_conversion_matrix(desc, format.color_space, ColorRange::Limited),
        ColorModel::Rgb | ColorModel::LinearXyz => Mat4::IDENTITY,
    }
}

/// Draws decoded pictures of one chroma and buffer size.
///
/// The renderer holds GPU objects but not the context that created them, so
/// it must be handed back with [`Renderer::release`]. Dropping it without
/// releasing leaks the program, buffers and textures and only logs a warning.
pub struct Renderer {
    format: VideoFormat,
    config: RendererConfig,
    target: TextureTarget,
    interop: Box<dyn Interop>,

    source: ShaderProgramSource,
    program: ProgramId,
    locations: Locations,

    planes: Vec<PlaneTexture>,
    textures: Vec<TextureId>,
    /// False when the interop generated (and will delete) the textures.
    owns_textures: bool,
    geometry: Geometry,

    transform: TransformState,
    conv_matrix: Mat4,
    alpha: f32,
    released: bool,
}

impl Renderer {
    pub fn new(
        ctx: &mut dyn GraphicsContext,
        format: VideoFormat,
        mut interop: Box<dyn Interop>,
        config: RendererConfig,
    ) -> Result<Renderer> {
        let mut acquired = Acquired::default();
        match Self::build(ctx, &format, interop.as_mut(), &config, &mut acquired) {
            Ok(parts) => {
                info!(
                    "renderer created for {} {}x{} ({:?})",
                    format.description().fourcc_str(),
                    format.width,
                    format.height,
                    format.projection
                );
                Ok(Renderer {
                    target: interop.caps().target,
                    conv_matrix: conversion_matrix(&format),
                    format,
                    config,
                    interop,
                    source: parts.source,
                    program: parts.program,
                    locations: parts.locations,
                    planes: parts.planes,
                    textures: parts.textures,
                    owns_textures: parts.owns_textures,
                    geometry: parts.geometry,
                    transform: parts.transform,
                    alpha: 1.0,
                    released: false,
                })
            }
            Err(err) => {
                error!("renderer creation failed: {err}");
                acquired.unwind(ctx, interop.as_mut());
                Err(err)
            }
        }
    }

    fn build(
        ctx: &mut dyn GraphicsContext,
        format: &VideoFormat,
        interop: &mut dyn Interop,
        config: &RendererConfig,
        acquired: &mut Acquired,
    ) -> Result<Parts> {
        check_crop(format)?;
        let caps = ctx.caps().clone();
        let interop_caps = interop.caps();

        let source = compose(format, interop_caps.target, config, &caps)?;
        let program = ctx.create_program(&source)?;
        acquired.program = Some(program);
        let locations = Locations::resolve(ctx, program, &source.interface)?;

        let mut transform = TransformState::new(format.projection, format.orientation, format.multiview);
        let planes = plane_textures(format, caps.npot);
        transform.set_planes(planes.clone());
        transform.update_tex_coords_map(format.crop());

        let descs: Vec<TextureDesc> = planes
            .iter()
            .zip(format.description().planes)
            .map(|(plane, desc)| TextureDesc {
                width: plane.tex_width,
                height: plane.tex_height,
                format: desc.texels,
            })
            .collect();
        let textures = if interop_caps.handles_texture_generation {
            interop.generate_textures(ctx, &descs)?
        } else {
            for desc in &descs {
                let texture = ctx.create_texture(desc)?;
                acquired.textures.push(texture);
            }
            acquired.textures.clone()
        };
        if textures.len() != descs.len() {
            return Err(RendererError::GpuResource(format!(
                "{} textures for {} planes",
                textures.len(),
                descs.len()
            )));
        }

        ctx.set_fixed_state(FixedState::VIDEO);
        ctx.clear(config.clear_color);

        let mesh = Mesh::for_projection(format.projection, cubemap_padding(format), config.sphere_bands)?;
        let geometry = Geometry::upload(ctx, &mesh, &mut acquired.buffers)?;
        debug!(
            "{:?} geometry: {} vertices, {} indices",
            format.projection,
            mesh.vertex_count(),
            mesh.index_count()
        );

        Ok(Parts {
            source,
            program,
            locations,
            planes,
            textures,
            owns_textures: !interop_caps.handles_texture_generation,
            geometry,
            transform,
        })
    }

    /// Refreshes the texture coordinate maps if the crop moved, then uploads
    /// the picture's planes. A crop outside the buffer is rejected before
    /// anything changes. A failed upload leaves the previous frame bound.
    pub fn prepare(&mut self, ctx: &mut dyn GraphicsContext, picture: &Picture) -> Result<()> {
        if picture.format.chroma != self.format.chroma {
            return Err(RendererError::UnsupportedFormat(format!(
                "picture is {:?}, renderer was built for {:?}",
                picture.format.chroma, self.format.chroma
            )));
        }
        check_crop(&picture.format)?;
        self.transform.update_tex_coords_map(picture.format.crop());
        self.interop
            .update_textures(ctx, &self.textures, &self.planes, picture)
    }

    /// Clears and issues one indexed draw with the current state.
    pub fn draw(&mut self, ctx: &mut dyn GraphicsContext) -> Result<()> {
        ctx.clear(self.config.clear_color);
        ctx.use_program(self.program);

        for &(uniform, location) in &self.locations.uniforms {
            match uniform {
                Uniform::Texture(i) => {
                    if let Some(&texture) = self.textures.get(i as usize) {
                        ctx.bind_texture(location, texture);
                    }
                }
                _ => {
                    if let Some(value) = self.uniform_value(uniform) {
                        ctx.set_uniform(location, value);
                    }
                }
            }
        }

        for &(attribute, location) in &self.locations.attributes {
            let buffer = match attribute {
                Attribute::VertexPosition => self.geometry.positions,
                Attribute::PicCoordsIn => self.geometry.tex_coords,
            };
            ctx.bind_attribute(location, buffer, attribute.components());
        }

        ctx.draw_indexed(self.geometry.indices, self.geometry.index_count)
    }

    fn uniform_value(&self, uniform: Uniform) -> Option<UniformValue> {
        let value = match uniform {
            Uniform::TransformMatrix => {
                UniformValue::Mat4(self.interop.transform_matrix().unwrap_or(Mat4::IDENTITY))
            }
            Uniform::OrientationMatrix => UniformValue::Mat4(self.transform.orientation()),
            Uniform::StereoMatrix => UniformValue::Mat3(self.transform.stereo()),
            Uniform::ProjectionMatrix => UniformValue::Mat4(self.transform.projection()),
            Uniform::ViewMatrix => UniformValue::Mat4(self.transform.view()),
            Uniform::ZoomMatrix => UniformValue::Mat4(self.transform.zoom()),
            Uniform::ConvMatrix => UniformValue::Mat4(self.conv_matrix),
            Uniform::TexCoordsMap(i) => UniformValue::Mat3(*self.transform.tex_coords_maps().get(i as usize)?),
            Uniform::TexSize(i) => {
                let plane = self.planes.get(i as usize)?;
                UniformValue::Vec2(Vec2::new(plane.tex_width as f32, plane.tex_height as f32))
            }
            Uniform::FillColor => UniformValue::Vec4(Vec4::new(1.0, 1.0, 1.0, self.alpha)),
            Uniform::Texture(_) => return None,
        };
        Some(value)
    }

    /// Rejects out-of-range values without changing anything.
    pub fn set_viewpoint(&mut self, viewpoint: &Viewpoint) -> Result<()> {
        self.transform.set_viewpoint(viewpoint)
    }

    pub fn set_window_aspect_ratio(&mut self, sar: f32) -> Result<()> {
        self.transform.set_window_aspect_ratio(sar)
    }

    /// Opacity applied through `FillColor`. Ignored by XYZ sources.
    pub fn set_alpha(&mut self, alpha: f32) -> Result<()> {
        if !alpha.is_finite() {
            return Err(RendererError::InvalidParameter(format!("alpha {alpha}")));
        }
        self.alpha = alpha.clamp(0.0, 1.0);
        Ok(())
    }

    /// Applies a new format with the same chroma and buffer size.
    ///
    /// Geometry is rebuilt on projection or padding changes and the program is
    /// relinked only when the synthesized source differs. On error the
    /// renderer keeps its previous state.
    pub fn update_format(&mut self, ctx: &mut dyn GraphicsContext, format: &VideoFormat) -> Result<()> {
        if format.chroma != self.format.chroma {
            return Err(RendererError::UnsupportedFormat(format!(
                "cannot switch from {:?} to {:?}",
                self.format.chroma, format.chroma
            )));
        }
        if (format.width, format.height) != (self.format.width, self.format.height) {
            return Err(RendererError::UnsupportedFormat(format!(
                "buffer size change {}x{} -> {}x{}",
                self.format.width, self.format.height, format.width, format.height
            )));
        }

        check_crop(format)?;

        let source = compose(format, self.target, &self.config, ctx.caps())?;
        let relink = !source.same_program(&self.source);
        let regenerate =
            format.projection != self.format.projection || format.cubemap_padding != self.format.cubemap_padding;

        let mut new_buffers = Vec::new();
        let geometry = if regenerate {
            let built = Mesh::for_projection(format.projection, cubemap_padding(format), self.config.sphere_bands)
                .and_then(|mesh| Geometry::upload(ctx, &mesh, &mut new_buffers));
            match built {
                Ok(geometry) => Some(geometry),
                Err(err) => {
                    for &buffer in new_buffers.iter().rev() {
                        ctx.delete_buffer(buffer);
                    }
                    return Err(err);
                }
            }
        } else {
            None
        };

        let linked = if relink {
            match link(ctx, &source) {
                Ok(linked) => Some(linked),
                Err(err) => {
                    error!("relinking for the new format failed: {err}");
                    for &buffer in new_buffers.iter().rev() {
                        ctx.delete_buffer(buffer);
                    }
                    return Err(err);
                }
            }
        } else {
            None
        };

        // Nothing below can fail.
        if let Some(geometry) = geometry {
            for &buffer in self.geometry.buffers().iter().rev() {
                ctx.delete_buffer(buffer);
            }
            self.geometry = geometry;
            self.transform.set_projection_mode(format.projection);
        }
        if let Some((program, locations)) = linked {
            ctx.delete_program(self.program);
            self.program = program;
            self.locations = locations;
            debug!("program relinked for {:?} {:?}", format.transfer, format.primaries);
        }
        self.source = source;

        if format.orientation != self.format.orientation {
            self.transform.set_orientation(format.orientation);
        }
        if format.multiview != self.format.multiview {
            self.transform.set_multiview(format.multiview);
        }
        if format.color_space != self.format.color_space {
            self.conv_matrix = conversion_matrix(format);
        }
        self.transform.update_tex_coords_map(format.crop());
        self.format = format.clone();
        Ok(())
    }

    pub fn format(&self) -> &VideoFormat {
        &self.format
    }

    pub fn transform(&self) -> &TransformState {
        &self.transform
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn textures(&self) -> &[TextureId] {
        &self.textures
    }

    pub fn plane_textures(&self) -> &[PlaneTexture] {
        &self.planes
    }

    pub fn conversion_matrix(&self) -> Mat4 {
        self.conv_matrix
    }

    pub fn index_count(&self) -> u32 {
        self.geometry.index_count
    }

    /// Deletes buffers, textures, the interop and the program, in that order.
    pub fn release(mut self, ctx: &mut dyn GraphicsContext) {
        for &buffer in self.geometry.buffers().iter().rev() {
            ctx.delete_buffer(buffer);
        }
        if self.owns_textures {
            for &texture in self.textures.iter().rev() {
                ctx.delete_texture(texture);
            }
        }
        self.interop.release(ctx);
        ctx.delete_program(self.program);
        self.released = true;
        debug!("renderer released");
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if !self.released {
            warn!("renderer dropped without release, its GPU objects are leaked");
        }
    }
}

struct Parts {
    source: ShaderProgramSource,
    program: ProgramId,
    locations: Locations,
    planes: Vec<PlaneTexture>,
    textures: Vec<TextureId>,
    owns_textures: bool,
    geometry: Geometry,
    transform: TransformState,
}

/// Links `source` and resolves its locations, deleting the program if any
/// location is missing.
fn link(ctx: &mut dyn GraphicsContext, source: &ShaderProgramSource) -> Result<(ProgramId, Locations)> {
    let program = ctx.create_program(source)?;
    match Locations::resolve(ctx, program, &source.interface) {
        Ok(locations) => Ok((program, locations)),
        Err(err) => {
            ctx.delete_program(program);
            Err(err)
        }
    }
}

fn compose(
    format: &VideoFormat,
    target: TextureTarget,
    config: &RendererConfig,
    caps: &crate::gpu::ContextCaps,
) -> Result<ShaderProgramSource> {
    let desc = FragmentDescription::new(format.description(), target).with_color(
        format.transfer,
        format.primaries,
        config.color_mapping,
    );
    if desc.needs_color_mapping() {
        warn!(
            "{:?}/{:?} source shown without tone or gamut mapping",
            format.transfer, format.primaries
        );
    }
    let source = shader::compose(&desc, caps)?;
    if config.dump_shaders {
        debug!("{} vertex shader:\n{}", source.label, source.vertex);
        debug!("{} fragment shader:\n{}", source.label, source.fragment);
    }
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Chroma, ColorSpace, Crop};

    #[test]
    fn npot_contexts_keep_exact_sizes() {
        let planes = plane_textures(&VideoFormat::new(Chroma::I420, 100, 50), true);
        assert_eq!((planes[0].tex_width, planes[0].tex_height), (100, 50));
        assert_eq!((planes[1].tex_width, planes[1].tex_height), (50, 25));
    }

    #[test]
    fn pow2_contexts_round_up() {
        let planes = plane_textures(&VideoFormat::new(Chroma::I420, 100, 50), false);
        assert_eq!((planes[0].tex_width, planes[0].tex_height), (128, 64));
        assert_eq!((planes[2].tex_width, planes[2].tex_height), (64, 32));
    }

    #[test]
    fn conversion_ignores_declared_range() {
        let mut format = VideoFormat::new(Chroma::I420, 16, 16);
        format.color_range = ColorRange::Full;
        format.color_space = ColorSpace::Bt601;
        assert_eq!(
            conversion_matrix(&format),
            color::conversion_matrix(ColorSpace::Bt601, ColorRange::Limited)
        );
        assert_eq!(conversion_matrix(&VideoFormat::new(Chroma::RGBA, 4, 4)), Mat4::IDENTITY);
    }

    #[test]
    fn crops_must_fit_the_buffer() {
        let format = VideoFormat::new(Chroma::I420, 64, 32);
        assert!(check_crop(&format).is_ok());
        let edge = Crop { x_offset: 16, y_offset: 2, width: 48, height: 30 };
        assert!(check_crop(&format.clone().with_crop(edge)).is_ok());

        for crop in [
            Crop { x_offset: u32::MAX, y_offset: 0, width: 64, height: 32 },
            Crop { x_offset: 0, y_offset: 1, width: 64, height: 32 },
            Crop { x_offset: 1, y_offset: 0, width: 64, height: 32 },
        ] {
            assert!(matches!(
                check_crop(&format.clone().with_crop(crop)),
                Err(RendererError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn padding_is_relative_to_the_picture() {
        let mut format = VideoFormat::new(Chroma::I420, 300, 200);
        format.cubemap_padding = 6;
        assert_eq!(cubemap_padding(&format), (0.02, 0.03));
    }
}
