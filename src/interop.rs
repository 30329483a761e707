// interop.rs — moving picture pixels into plane textures

use glam::Mat4;
use log::debug;

use crate::error::{RendererError, Result};
use crate::format::{TexelFormat, TextureTarget, VideoFormat};
use crate::gpu::{GraphicsContext, TextureDesc, TextureId, TextureUpload};
use crate::transform::PlaneTexture;

/// One plane of CPU-side pixels. `pitch` is in bytes, `lines` in rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PicturePlane {
    pub data: Vec<u8>,
    pub pitch: usize,
    pub lines: usize,
}

/// A decoded frame: its format plus one buffer per plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub format: VideoFormat,
    pub planes: Vec<PicturePlane>,
}

impl Picture {
    /// Zero-filled, tightly pitched planes for `format`.
    pub fn alloc(format: VideoFormat) -> Result<Picture> {
        let desc = format.description();
        let mut planes = Vec::new();
        planes
            .try_reserve_exact(desc.plane_count())
            .map_err(RendererError::oom("picture planes"))?;
        for plane in desc.planes {
            let lines = plane.height.apply(format.height) as usize;
            let sizes = (plane.width.apply(format.width) as usize)
                .checked_mul(plane.texels.bytes_per_texel())
                .and_then(|pitch| pitch.checked_mul(lines).map(|size| (pitch, size)));
            let (pitch, size) = sizes.ok_or_else(|| {
                RendererError::InvalidParameter(format!(
                    "{} plane of {}x{} overflows",
                    desc.fourcc_str(),
                    format.width,
                    format.height
                ))
            })?;
            let mut data = Vec::new();
            data.try_reserve_exact(size)
                .map_err(RendererError::oom("picture plane"))?;
            data.resize(size, 0);
            planes.push(PicturePlane { data, pitch, lines });
        }
        Ok(Picture { format, planes })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteropCaps {
    pub target: TextureTarget,
    /// The interop creates and deletes the plane textures itself.
    pub handles_texture_generation: bool,
}

/// Uploads pictures into the renderer's plane textures.
///
/// Interops that handle texture generation own the textures they return from
/// `generate_textures` and delete them in `release`.
pub trait Interop {
    fn caps(&self) -> InteropCaps;

    fn generate_textures(&mut self, ctx: &mut dyn GraphicsContext, descs: &[TextureDesc]) -> Result<Vec<TextureId>> {
        let _ = (ctx, descs);
        Err(RendererError::GpuResource(
            "interop does not generate its own textures".into(),
        ))
    }

    fn update_textures(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        textures: &[TextureId],
        sizes: &[PlaneTexture],
        picture: &Picture,
    ) -> Result<()>;

    /// Extra transform applied to picture coordinates, if the source is flipped.
    fn transform_matrix(&self) -> Option<Mat4> {
        None
    }

    fn release(&mut self, ctx: &mut dyn GraphicsContext) {
        let _ = ctx;
    }
}

/// Uploads CPU pictures plane by plane into renderer-created textures.
#[derive(Debug, Default)]
pub struct SoftwareInterop {
    target: TextureTarget,
    /// Scratch space for texel formats the GPU lacks (RGB16 → RGBA16).
    expanded: Vec<u8>,
}

impl SoftwareInterop {
    pub fn new(target: TextureTarget) -> Self {
        Self {
            target,
            expanded: Vec::new(),
        }
    }
}

/// Rewrites 6-byte RGB16 texels as 8-byte RGBA16 with an opaque alpha.
fn expand_rgb16(src: &[u8], pitch: usize, width: usize, height: usize, out: &mut Vec<u8>) -> Result<()> {
    let row_out = width * 8;
    out.clear();
    out.try_reserve(row_out * height)
        .map_err(RendererError::oom("rgb16 expansion"))?;
    for row in 0..height {
        let line = &src[row * pitch..row * pitch + width * 6];
        for texel in line.chunks_exact(6) {
            out.extend_from_slice(texel);
            out.extend_from_slice(&[0xff, 0xff]);
        }
    }
    Ok(())
}

impl Interop for SoftwareInterop {
    fn caps(&self) -> InteropCaps {
        InteropCaps {
            target: self.target,
            handles_texture_generation: false,
        }
    }

    fn update_textures(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        textures: &[TextureId],
        sizes: &[PlaneTexture],
        picture: &Picture,
    ) -> Result<()> {
        let desc = picture.format.description();
        if textures.len() < desc.plane_count() || sizes.len() < desc.plane_count() {
            return Err(RendererError::Upload(format!(
                "{} planes need textures, {} given",
                desc.plane_count(),
                textures.len()
            )));
        }

        for (i, plane) in desc.planes.iter().enumerate() {
            let src = picture
                .planes
                .get(i)
                .ok_or_else(|| RendererError::Upload(format!("picture has no plane {i}")))?;

            let width = plane.width.apply(picture.format.width);
            let height = plane.height.apply(picture.format.height);
            if width > sizes[i].tex_width || height > sizes[i].tex_height {
                return Err(RendererError::Upload(format!(
                    "plane {i} is {width}x{height}, texture is {}x{}",
                    sizes[i].tex_width, sizes[i].tex_height
                )));
            }

            let row_bytes = width as usize * plane.texels.bytes_per_texel();
            let needed = match height as usize {
                0 => 0,
                h => src.pitch * (h - 1) + row_bytes,
            };
            if src.pitch < row_bytes || src.lines < height as usize || src.data.len() < needed {
                return Err(RendererError::Upload(format!(
                    "plane {i} is too short: pitch {} lines {} size {}, need {row_bytes}x{height}",
                    src.pitch,
                    src.lines,
                    src.data.len()
                )));
            }

            let upload = if plane.texels == TexelFormat::Rgb16 {
                expand_rgb16(&src.data, src.pitch, width as usize, height as usize, &mut self.expanded)?;
                TextureUpload {
                    width,
                    height,
                    bytes_per_row: width * 8,
                    data: &self.expanded,
                }
            } else {
                TextureUpload {
                    width,
                    height,
                    bytes_per_row: src.pitch as u32,
                    data: &src.data,
                }
            };
            ctx.upload_texture(textures[i], upload)?;
        }
        debug!("uploaded {} planes of {}", desc.plane_count(), desc.fourcc_str());
        Ok(())
    }
}
