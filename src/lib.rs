// lib.rs — video output renderer: decoded pictures in, textured triangles out
//
// `Renderer` ties the pieces together: `shader` synthesizes a program per
// chroma, `color` supplies the YUV conversion, `mesh` builds the geometry for
// the projection and `transform` keeps the viewpoint and crop matrices. All
// GPU work goes through a `gpu::GraphicsContext`; `gpu::WgpuContext` is the
// window-backed implementation used by the viewer.

pub mod color;
pub mod config;
pub mod error;
pub mod format;
pub mod gpu;
pub mod interop;
pub mod logging;
pub mod mesh;
pub mod renderer;
pub mod shader;
pub mod transform;
pub mod viewpoint;

pub use config::RendererConfig;
pub use error::{RendererError, Result};
pub use format::{Chroma, ColorRange, ColorSpace, Crop, MultiviewMode, Orientation, ProjectionMode, VideoFormat};
pub use gpu::{ContextCaps, GraphicsContext};
pub use interop::{Interop, InteropCaps, Picture, PicturePlane, SoftwareInterop};
pub use renderer::Renderer;
pub use viewpoint::Viewpoint;
