// wgpu_backend.rs — GraphicsContext on top of a wgpu device and window surface

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::{
    uniform_bytes, AttribLocation, BufferId, BufferTarget, ContextCaps, FixedState, GraphicsContext, ProgramId,
    TextureDesc, TextureId, TextureUpload, UniformLocation, UniformValue,
};
use crate::error::{RendererError, Result};
use crate::format::TexelFormat;
use crate::shader::interface::{SAMPLER_BINDING, UNIFORM_BLOCK_BINDING};
use crate::shader::{Attribute, ProgramInterface, ShaderProgramSource, Slot, Uniform};

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const PIC_COORDS_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];

fn texture_format(format: TexelFormat) -> wgpu::TextureFormat {
    match format.texture_format() {
        TexelFormat::R8 => wgpu::TextureFormat::R8Unorm,
        TexelFormat::Rg8 => wgpu::TextureFormat::Rg8Unorm,
        TexelFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        TexelFormat::Bgra8 => wgpu::TextureFormat::Bgra8Unorm,
        TexelFormat::R16 => wgpu::TextureFormat::R16Unorm,
        TexelFormat::Rg16 => wgpu::TextureFormat::Rg16Unorm,
        TexelFormat::Rgba16 | TexelFormat::Rgb16 => wgpu::TextureFormat::Rgba16Unorm,
    }
}

struct Program {
    interface: ProgramInterface,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    /// Built on first draw, rebuilt when the fixed state changes.
    pipeline: Option<(FixedState, wgpu::RenderPipeline)>,
    uniform_buffer: wgpu::Buffer,
    block: Vec<u8>,
    textures: HashMap<u32, TextureId>,
    attributes: HashMap<u32, BufferId>,
}

struct Texture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    desc: TextureDesc,
}

struct Frame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

pub struct WgpuContext {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    caps: ContextCaps,
    sampler: wgpu::Sampler,

    programs: HashMap<ProgramId, Program>,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    textures: HashMap<TextureId, Texture>,
    next_id: u32,

    state: FixedState,
    current: Option<ProgramId>,
    pending_clear: Option<wgpu::Color>,
    frame: Option<Frame>,
}

impl WgpuContext {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // The window is kept alive by the caller for as long as the context.
        let surface = unsafe { instance.create_surface(window.as_ref()) }
            .map_err(|e| RendererError::GpuResource(format!("surface: {e}")))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| RendererError::GpuResource("no compatible adapter".into()))?;

        let info = adapter.get_info();
        info!("using adapter {} ({:?})", info.name, info.backend);

        let norm16 = adapter.features().contains(wgpu::Features::TEXTURE_FORMAT_16BIT_NORM);
        let features = if norm16 {
            wgpu::Features::TEXTURE_FORMAT_16BIT_NORM
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features,
                    limits: if cfg!(target_arch = "wasm32") {
                        wgpu::Limits::downlevel_webgl2_defaults()
                    } else {
                        wgpu::Limits::default().using_resolution(adapter.limits())
                    },
                    label: None,
                },
                None,
            )
            .await
            .map_err(|e| RendererError::GpuResource(format!("device: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The synthesized shaders output display-referred values already.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| RendererError::GpuResource("surface has no formats".into()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("plane_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let caps = ContextCaps {
            npot: true,
            shader_preamble: format!("// backend: {:?}\n", info.backend),
            max_texture_size: device.limits().max_texture_dimension_2d,
            norm16,
        };

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            caps,
            sampler,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            next_id: 1,
            state: FixedState::VIDEO,
            current: None,
            pending_clear: None,
            frame: None,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Acquires the next surface texture; draws until `end_frame` land on it.
    pub fn begin_frame(&mut self) -> std::result::Result<(), wgpu::SurfaceError> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                self.surface.get_current_texture()?
            }
            Err(e) => return Err(e),
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        self.frame = Some(Frame {
            surface_texture,
            view,
            encoder,
        });
        Ok(())
    }

    /// Submits the frame's commands and presents it.
    pub fn end_frame(&mut self) {
        let Some(mut frame) = self.frame.take() else {
            return;
        };
        if let Some(color) = self.pending_clear.take() {
            // cleared but nothing drawn
            let _ = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
        }
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.surface_texture.present();
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn create_shader(&self, label: &str, source: &str) -> Result<wgpu::ShaderModule> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(RendererError::GpuResource(format!("{label}: {err}"))),
            None => Ok(module),
        }
    }

    fn bind_group_layout(&self, interface: &ProgramInterface) -> wgpu::BindGroupLayout {
        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: UNIFORM_BLOCK_BINDING,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        if interface.sampled() {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: SAMPLER_BINDING,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
        for entry in interface.uniforms() {
            if let Slot::Binding(binding) = entry.slot {
                entries.push(wgpu::BindGroupLayoutEntry {
                    binding,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float {
                            filterable: interface.sampled(),
                        },
                    },
                    count: None,
                });
            }
        }
        self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("plane_bind_group_layout"),
            entries: &entries,
        })
    }

    fn ensure_pipeline(&mut self, id: ProgramId) -> Result<()> {
        let state = self.state;
        let format = self.config.format;
        let program = self
            .programs
            .get_mut(&id)
            .ok_or_else(|| RendererError::GpuResource(format!("unknown program {id:?}")))?;
        if matches!(&program.pipeline, Some((built, _)) if *built == state) {
            return Ok(());
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Video Pipeline"),
            layout: Some(&program.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &program.vertex,
                entry_point: "vs_main",
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &POSITION_ATTRIBUTES,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &PIC_COORDS_ATTRIBUTES,
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &program.fragment,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: if state.blend {
                        Some(wgpu::BlendState::ALPHA_BLENDING)
                    } else {
                        Some(wgpu::BlendState::REPLACE)
                    },
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: state.cull_back_faces.then_some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            // no depth attachment, so depth testing is always off
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(RendererError::GpuResource(format!("pipeline: {err}")));
        }
        if state.depth_test {
            warn!("depth testing requested but the video pipeline has no depth attachment");
        }
        debug!("built pipeline for {id:?} with {state:?}");
        program.pipeline = Some((state, pipeline));
        Ok(())
    }
}

impl GraphicsContext for WgpuContext {
    fn caps(&self) -> &ContextCaps {
        &self.caps
    }

    fn create_program(&mut self, source: &ShaderProgramSource) -> Result<ProgramId> {
        let vertex = self.create_shader(&format!("{} (vertex)", source.label), &source.vertex)?;
        let fragment = self.create_shader(&format!("{} (fragment)", source.label), &source.fragment)?;

        let interface = source.interface.clone();
        let bind_group_layout = self.bind_group_layout(&interface);
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Video Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let block = vec![0u8; interface.block_size() as usize];
        let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Block"),
            contents: &block,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let id = ProgramId(self.alloc_id());
        self.programs.insert(
            id,
            Program {
                interface,
                vertex,
                fragment,
                bind_group_layout,
                pipeline_layout,
                pipeline: None,
                uniform_buffer,
                block,
                textures: HashMap::new(),
                attributes: HashMap::new(),
            },
        );
        Ok(id)
    }

    fn uniform_location(&self, program: ProgramId, uniform: Uniform) -> Option<UniformLocation> {
        let program = self.programs.get(&program)?;
        program
            .interface
            .uniforms()
            .iter()
            .position(|u| u.uniform == uniform)
            .map(|index| UniformLocation(index as u32))
    }

    fn attrib_location(&self, program: ProgramId, attribute: Attribute) -> Option<AttribLocation> {
        let program = self.programs.get(&program)?;
        program
            .interface
            .has_attribute(attribute)
            .then(|| AttribLocation(attribute.location()))
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.current == Some(program) {
            self.current = None;
        }
        self.programs.remove(&program);
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferId> {
        let usage = match target {
            BufferTarget::Vertex => wgpu::BufferUsages::VERTEX,
            BufferTarget::Index => wgpu::BufferUsages::INDEX,
        };
        // wgpu wants copy sizes in multiples of 4; u16 index data may not be.
        let mut contents = data.to_vec();
        contents.resize(data.len().next_multiple_of(4), 0);
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(match target {
                BufferTarget::Vertex => "Vertex Buffer",
                BufferTarget::Index => "Index Buffer",
            }),
            contents: &contents,
            usage,
        });
        let id = BufferId(self.alloc_id());
        self.buffers.insert(id, buffer);
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(buffer) = self.buffers.remove(&buffer) {
            buffer.destroy();
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId> {
        let max = self.caps.max_texture_size;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(RendererError::GpuResource(format!(
                "texture {}x{} outside 1..={max}",
                desc.width, desc.height
            )));
        }
        if matches!(desc.format, TexelFormat::R16 | TexelFormat::Rg16 | TexelFormat::Rgb16 | TexelFormat::Rgba16)
            && !self.caps.norm16
        {
            return Err(RendererError::UnsupportedFormat(format!(
                "{:?} textures need 16-bit normalized formats",
                desc.format
            )));
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(desc.format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            label: Some("plane_texture"),
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = TextureId(self.alloc_id());
        self.textures.insert(id, Texture { texture, view, desc: *desc });
        Ok(id)
    }

    fn upload_texture(&mut self, texture: TextureId, upload: TextureUpload<'_>) -> Result<()> {
        let target = self
            .textures
            .get(&texture)
            .ok_or_else(|| RendererError::Upload(format!("unknown texture {texture:?}")))?;
        if upload.width > target.desc.width || upload.height > target.desc.height {
            return Err(RendererError::Upload(format!(
                "{}x{} upload into {}x{} texture",
                upload.width, upload.height, target.desc.width, target.desc.height
            )));
        }
        let needed = upload.bytes_per_row as usize * upload.height.saturating_sub(1) as usize
            + upload.width as usize * target.desc.format.texture_format().bytes_per_texel();
        if upload.data.len() < needed {
            return Err(RendererError::Upload(format!(
                "{} bytes given, {needed} needed",
                upload.data.len()
            )));
        }

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            upload.data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(upload.bytes_per_row),
                rows_per_image: Some(upload.height),
            },
            wgpu::Extent3d {
                width: upload.width,
                height: upload.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(texture) = self.textures.remove(&texture) {
            texture.texture.destroy();
        }
    }

    fn set_fixed_state(&mut self, state: FixedState) {
        self.state = state;
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.pending_clear = Some(wgpu::Color {
            r: color[0] as f64,
            g: color[1] as f64,
            b: color[2] as f64,
            a: color[3] as f64,
        });
    }

    fn use_program(&mut self, program: ProgramId) {
        self.current = Some(program);
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let Some(program) = self.current.and_then(|id| self.programs.get_mut(&id)) else {
            return;
        };
        let Some(entry) = program.interface.uniforms().get(location.0 as usize) else {
            return;
        };
        if let Slot::Offset(offset) = entry.slot {
            let bytes = uniform_bytes(&value);
            let offset = offset as usize;
            if let Some(dst) = program.block.get_mut(offset..offset + bytes.len()) {
                dst.copy_from_slice(&bytes);
            }
        }
    }

    fn bind_texture(&mut self, location: UniformLocation, texture: TextureId) {
        let Some(program) = self.current.and_then(|id| self.programs.get_mut(&id)) else {
            return;
        };
        if let Some(Slot::Binding(binding)) = program.interface.uniforms().get(location.0 as usize).map(|u| u.slot) {
            program.textures.insert(binding, texture);
        }
    }

    fn bind_attribute(&mut self, location: AttribLocation, buffer: BufferId, _components: u32) {
        if let Some(program) = self.current.and_then(|id| self.programs.get_mut(&id)) {
            program.attributes.insert(location.0, buffer);
        }
    }

    fn draw_indexed(&mut self, index_buffer: BufferId, index_count: u32) -> Result<()> {
        let id = self
            .current
            .ok_or_else(|| RendererError::GpuResource("draw without a program".into()))?;
        self.ensure_pipeline(id)?;

        let Some(frame) = self.frame.as_mut() else {
            return Err(RendererError::GpuResource("draw outside of a frame".into()));
        };
        let Some(program) = self.programs.get(&id) else {
            return Err(RendererError::GpuResource(format!("unknown program {id:?}")));
        };
        let Some((_, pipeline)) = program.pipeline.as_ref() else {
            return Err(RendererError::GpuResource("pipeline missing".into()));
        };

        self.queue.write_buffer(&program.uniform_buffer, 0, &program.block);

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: UNIFORM_BLOCK_BINDING,
            resource: program.uniform_buffer.as_entire_binding(),
        }];
        if program.interface.sampled() {
            entries.push(wgpu::BindGroupEntry {
                binding: SAMPLER_BINDING,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            });
        }
        for entry in program.interface.uniforms() {
            if let Slot::Binding(binding) = entry.slot {
                let texture = program
                    .textures
                    .get(&binding)
                    .and_then(|t| self.textures.get(t))
                    .ok_or_else(|| RendererError::GpuResource(format!("no texture bound to {}", entry.uniform)))?;
                entries.push(wgpu::BindGroupEntry {
                    binding,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                });
            }
        }
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("plane_bind_group"),
            layout: &program.bind_group_layout,
            entries: &entries,
        });

        let vertex_buffer = |attribute: Attribute| {
            program
                .attributes
                .get(&attribute.location())
                .and_then(|b| self.buffers.get(b))
                .ok_or_else(|| RendererError::GpuResource(format!("attribute {attribute} has no buffer")))
        };
        let positions = vertex_buffer(Attribute::VertexPosition)?;
        let pic_coords = vertex_buffer(Attribute::PicCoordsIn)?;
        let indices = self
            .buffers
            .get(&index_buffer)
            .ok_or_else(|| RendererError::GpuResource(format!("unknown index buffer {index_buffer:?}")))?;

        let load = match self.pending_clear.take() {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };
        let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Video Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations { load, store: true },
            })],
            depth_stencil_attachment: None,
        });
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        render_pass.set_vertex_buffer(0, positions.slice(..));
        render_pass.set_vertex_buffer(1, pic_coords.slice(..));
        render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint16);
        render_pass.draw_indexed(0..index_count, 0, 0..1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_formats_are_unorm_and_not_srgb() {
        assert_eq!(texture_format(TexelFormat::R8), wgpu::TextureFormat::R8Unorm);
        assert_eq!(texture_format(TexelFormat::Rg16), wgpu::TextureFormat::Rg16Unorm);
        // widened on upload
        assert_eq!(texture_format(TexelFormat::Rgb16), wgpu::TextureFormat::Rgba16Unorm);
        assert!(!texture_format(TexelFormat::Bgra8).is_srgb());
    }
}
