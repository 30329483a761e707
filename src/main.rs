// main.rs — vout-viewer: shows a still image through the video renderer

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use image::io::Reader as ImageReader;
use image::RgbaImage;
use log::{error, info, warn};
use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, WindowBuilder},
};

use vout_renderer::format::TextureTarget;
use vout_renderer::gpu::WgpuContext;
use vout_renderer::logging::{init_logging, LoggingConfig};
use vout_renderer::{
    Chroma, ColorSpace, Picture, ProjectionMode, Renderer, RendererConfig, SoftwareInterop, VideoFormat, Viewpoint,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PixelFormat {
    Rgba,
    Bgra,
    I420,
    Nv12,
    Yuyv,
}

impl PixelFormat {
    fn chroma(self) -> Chroma {
        match self {
            PixelFormat::Rgba => Chroma::RGBA,
            PixelFormat::Bgra => Chroma::BGRA,
            PixelFormat::I420 => Chroma::I420,
            PixelFormat::Nv12 => Chroma::NV12,
            PixelFormat::Yuyv => Chroma::YUYV,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Projection {
    Flat,
    Equirectangular,
    Cubemap,
}

impl From<Projection> for ProjectionMode {
    fn from(projection: Projection) -> Self {
        match projection {
            Projection::Flat => ProjectionMode::Rectangular,
            Projection::Equirectangular => ProjectionMode::Equirectangular,
            Projection::Cubemap => ProjectionMode::CubemapStandard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Space {
    Bt601,
    Bt709,
    Bt2020,
}

impl From<Space> for ColorSpace {
    fn from(space: Space) -> Self {
        match space {
            Space::Bt601 => ColorSpace::Bt601,
            Space::Bt709 => ColorSpace::Bt709,
            Space::Bt2020 => ColorSpace::Bt2020,
        }
    }
}

/// Show an image as if it were a decoded video frame.
#[derive(Debug, Parser)]
#[command(name = "vout-viewer", version)]
struct Args {
    /// Image to show; more can be dropped onto the window.
    image: Option<PathBuf>,

    /// Pixel format the image is converted to before upload.
    #[arg(long, value_enum, default_value = "i420")]
    chroma: PixelFormat,

    #[arg(long, value_enum, default_value = "equirectangular")]
    projection: Projection,

    #[arg(long, value_enum, default_value = "bt709")]
    color_space: Space,

    /// Cubemap face padding in pixels.
    #[arg(long, default_value_t = 0)]
    padding: u32,

    /// Sample textures by texel coordinates instead of normalized ones.
    #[arg(long)]
    rectangle: bool,

    /// JSON renderer configuration; `VOUT_CONFIG` is used when absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Mouse drag speed.
    #[arg(long, default_value_t = 1.0)]
    sensitivity: f32,

    /// env_logger filter, overriding `RUST_LOG`.
    #[arg(long)]
    log: Option<String>,
}

/// BT.601/709/2020 R'G'B' to limited-range Y'CbCr.
fn rgb_to_yuv(space: ColorSpace, [r, g, b, _]: [u8; 4]) -> [u8; 3] {
    let (kr, kb) = space.luma_weights();
    let kg = 1.0 - kr - kb;
    let (r, g, b) = (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
    let y = kr * r + kg * g + kb * b;
    let cb = (b - y) / (2.0 * (1.0 - kb));
    let cr = (r - y) / (2.0 * (1.0 - kr));
    let quantize = |v: f64| v.round().clamp(0.0, 255.0) as u8;
    [
        quantize(16.0 + 219.0 * y),
        quantize(128.0 + 224.0 * cb),
        quantize(128.0 + 224.0 * cr),
    ]
}

/// Converts `img` into a picture of `chroma`, averaging chroma over each
/// subsampled block.
fn picture_from_rgba(img: &RgbaImage, chroma: Chroma, space: ColorSpace) -> anyhow::Result<Picture> {
    let (width, height) = img.dimensions();
    let mut format = VideoFormat::new(chroma, width, height);
    format.color_space = space;
    let mut picture = Picture::alloc(format)?;

    let yuv = |x: u32, y: u32| rgb_to_yuv(space, img.get_pixel(x.min(width - 1), y.min(height - 1)).0);
    let chroma_at = |x: u32, y: u32, w: u32, h: u32| {
        let (mut u, mut v) = (0u32, 0u32);
        for dy in 0..h {
            for dx in 0..w {
                let [_, cb, cr] = yuv(x + dx, y + dy);
                u += cb as u32;
                v += cr as u32;
            }
        }
        (((u + w * h / 2) / (w * h)) as u8, ((v + w * h / 2) / (w * h)) as u8)
    };

    match chroma {
        Chroma::RGBA | Chroma::BGRA => {
            let plane = &mut picture.planes[0];
            for (x, y, px) in img.enumerate_pixels() {
                let at = y as usize * plane.pitch + x as usize * 4;
                let [r, g, b, a] = px.0;
                let texel = if chroma == Chroma::BGRA { [b, g, r, a] } else { [r, g, b, a] };
                plane.data[at..at + 4].copy_from_slice(&texel);
            }
        }
        Chroma::I420 | Chroma::NV12 => {
            let luma = &mut picture.planes[0];
            for (x, y, _) in img.enumerate_pixels() {
                luma.data[y as usize * luma.pitch + x as usize] = yuv(x, y)[0];
            }
            for cy in 0..height.div_ceil(2) {
                for cx in 0..width.div_ceil(2) {
                    let (u, v) = chroma_at(cx * 2, cy * 2, 2, 2);
                    if chroma == Chroma::I420 {
                        let at = cy as usize * picture.planes[1].pitch + cx as usize;
                        picture.planes[1].data[at] = u;
                        let at = cy as usize * picture.planes[2].pitch + cx as usize;
                        picture.planes[2].data[at] = v;
                    } else {
                        let at = cy as usize * picture.planes[1].pitch + cx as usize * 2;
                        picture.planes[1].data[at..at + 2].copy_from_slice(&[u, v]);
                    }
                }
            }
        }
        Chroma::YUYV => {
            let plane = &mut picture.planes[0];
            for y in 0..height {
                for cx in 0..width.div_ceil(2) {
                    let (u, v) = chroma_at(cx * 2, y, 2, 1);
                    let at = y as usize * plane.pitch + cx as usize * 4;
                    let texel = [yuv(cx * 2, y)[0], u, yuv(cx * 2 + 1, y)[0], v];
                    plane.data[at..at + 4].copy_from_slice(&texel);
                }
            }
        }
        other => anyhow::bail!("the viewer cannot convert images to {other:?}"),
    }
    Ok(picture)
}

fn start_load_image(path: PathBuf, tx: Sender<RgbaImage>) {
    thread::spawn(move || {
        info!("loading {path:?}");
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                error!("cannot open {path:?}: {e}");
                return;
            }
        };
        let img_result = ImageReader::new(BufReader::new(file))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)
            .and_then(|mut r| {
                r.no_limits();
                r.decode()
            });
        match img_result {
            Ok(img) => {
                let rgba = img.to_rgba8();
                info!("loaded {}x{}", rgba.width(), rgba.height());
                if tx.send(rgba).is_err() {
                    warn!("viewer closed before the image arrived");
                }
            }
            Err(e) => error!("cannot decode {path:?}: {e}"),
        }
    });
}

struct Viewer {
    args: Args,
    config: RendererConfig,
    renderer: Option<Renderer>,
    viewpoint: Viewpoint,
}

impl Viewer {
    /// Replaces the renderer when the new picture's format differs.
    fn show(&mut self, ctx: &mut WgpuContext, img: &RgbaImage) -> anyhow::Result<()> {
        if img.width() == 0 || img.height() == 0 {
            anyhow::bail!("empty image");
        }
        let mut picture = picture_from_rgba(img, self.args.chroma.chroma(), self.args.color_space.into())?;
        picture.format.projection = self.args.projection.into();
        picture.format.cubemap_padding = self.args.padding;

        let reusable = self.renderer.as_ref().is_some_and(|r| {
            r.format().width == picture.format.width && r.format().height == picture.format.height
        });
        if !reusable {
            if let Some(old) = self.renderer.take() {
                old.release(ctx);
            }
            let target = if self.args.rectangle {
                TextureTarget::Rectangle
            } else {
                TextureTarget::Texture2d
            };
            let mut renderer = Renderer::new(
                ctx,
                picture.format.clone(),
                Box::new(SoftwareInterop::new(target)),
                self.config.clone(),
            )?;
            renderer.set_window_aspect_ratio(ctx.size.width.max(1) as f32 / ctx.size.height.max(1) as f32)?;
            renderer.set_viewpoint(&self.viewpoint)?;
            self.renderer = Some(renderer);
        }
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.prepare(ctx, &picture)?;
        }
        Ok(())
    }

    fn set_viewpoint(&mut self, viewpoint: Viewpoint) {
        self.viewpoint = viewpoint;
        if let Some(renderer) = self.renderer.as_mut() {
            if let Err(e) = renderer.set_viewpoint(&viewpoint) {
                warn!("{e}");
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(LoggingConfig {
        env_filter: args.log.clone(),
        ..Default::default()
    });

    let config = match &args.config {
        Some(path) => RendererConfig::from_file(path).with_context(|| format!("reading {path:?}"))?,
        None => RendererConfig::from_env().context("reading renderer configuration")?,
    };

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("vout-viewer")
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)
            .context("creating window")?,
    );
    let mut ctx = pollster::block_on(WgpuContext::new(window.clone())).context("creating graphics context")?;

    let (tx, rx): (Sender<RgbaImage>, Receiver<RgbaImage>) = channel();
    if let Some(path) = args.image.clone() {
        start_load_image(path, tx.clone());
    }

    let sensitivity = args.sensitivity;
    let mut viewer = Viewer {
        args,
        config,
        renderer: None,
        viewpoint: Viewpoint::default(),
    };

    let mut mouse_pressed = false;
    let mut last_mouse_pos: Option<PhysicalPosition<f64>> = None;
    let mut last_report = Instant::now();
    let mut frame_count = 0u32;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        if let Ok(img) = rx.try_recv() {
            if let Err(e) = viewer.show(&mut ctx, &img) {
                error!("cannot show image: {e:#}");
            }
        }

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    if let Some(renderer) = viewer.renderer.take() {
                        renderer.release(&mut ctx);
                    }
                    *control_flow = ControlFlow::Exit;
                }

                WindowEvent::Resized(new_size) => {
                    ctx.resize(new_size);
                    if let Some(renderer) = viewer.renderer.as_mut() {
                        if new_size.width > 0 && new_size.height > 0 {
                            let sar = new_size.width as f32 / new_size.height as f32;
                            if let Err(e) = renderer.set_window_aspect_ratio(sar) {
                                warn!("{e}");
                            }
                        }
                    }
                }

                WindowEvent::KeyboardInput { input, .. } => {
                    if input.state == ElementState::Pressed {
                        match input.virtual_keycode {
                            Some(VirtualKeyCode::F11) => {
                                if window.fullscreen().is_some() {
                                    window.set_fullscreen(None);
                                } else {
                                    window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                                }
                            }
                            Some(VirtualKeyCode::R) => viewer.set_viewpoint(Viewpoint::default()),
                            _ => {}
                        }
                    }
                }

                WindowEvent::MouseInput { state, button, .. } => {
                    if button == MouseButton::Left {
                        mouse_pressed = state == ElementState::Pressed;
                        if !mouse_pressed {
                            last_mouse_pos = None;
                        }
                    }
                }

                WindowEvent::CursorMoved { position, .. } => {
                    if mouse_pressed {
                        if let Some(last_pos) = last_mouse_pos {
                            let dx = (position.x - last_pos.x) as f32;
                            let dy = (position.y - last_pos.y) as f32;
                            let next = viewer.viewpoint.dragged(
                                dx,
                                dy,
                                ctx.size.width as f32,
                                ctx.size.height as f32,
                                sensitivity,
                            );
                            viewer.set_viewpoint(next);
                        }
                        last_mouse_pos = Some(position);
                    }
                }

                WindowEvent::MouseWheel { delta, .. } => {
                    let scroll = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                    };
                    let next = viewer.viewpoint.zoomed(scroll);
                    viewer.set_viewpoint(next);
                }

                WindowEvent::DroppedFile(path) => start_load_image(path, tx.clone()),

                _ => {}
            },

            Event::RedrawRequested(_) => {
                frame_count += 1;
                let elapsed = last_report.elapsed().as_secs_f32();
                if elapsed >= 5.0 {
                    log::debug!("{:.1} fps", frame_count as f32 / elapsed);
                    frame_count = 0;
                    last_report = Instant::now();
                }

                match ctx.begin_frame() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        error!("surface out of memory");
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                    Err(e) => {
                        warn!("skipping frame: {e:?}");
                        return;
                    }
                }
                if let Some(renderer) = viewer.renderer.as_mut() {
                    if let Err(e) = renderer.draw(&mut ctx) {
                        error!("draw failed: {e}");
                    }
                }
                ctx.end_frame();
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_and_black_hit_the_legal_range() {
        assert_eq!(rgb_to_yuv(ColorSpace::Bt709, [255, 255, 255, 255]), [235, 128, 128]);
        assert_eq!(rgb_to_yuv(ColorSpace::Bt709, [0, 0, 0, 255]), [16, 128, 128]);
    }

    #[test]
    fn nv12_interleaves_chroma() {
        let img = RgbaImage::from_pixel(3, 3, image::Rgba([0, 0, 0, 255]));
        let picture = picture_from_rgba(&img, Chroma::NV12, ColorSpace::Bt709).unwrap();
        assert_eq!(picture.planes.len(), 2);
        assert!(picture.planes[0].data.iter().all(|&y| y == 16));
        assert_eq!(&picture.planes[1].data[..4], &[128, 128, 128, 128]);
    }

    #[test]
    fn unsupported_chroma_is_an_error() {
        let img = RgbaImage::new(2, 2);
        assert!(picture_from_rgba(&img, Chroma::P010, ColorSpace::Bt709).is_err());
    }
}
