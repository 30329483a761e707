// format.rs — input video format descriptor and the chroma lookup table

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Maximum number of texture planes a picture may be split into.
pub const MAX_PLANES: usize = 3;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chroma {
    I420,
    YV12,
    YV9,
    I422,
    I444,
    I420_10L,
    I420_12L,
    I444_16L,
    NV12,
    NV21,
    NV16,
    P010,
    P016,
    YUYV,
    UYVY,
    YVYU,
    VYUY,
    RGBA,
    BGRA,
    XYZ12,
}

impl Chroma {
    pub const ALL: [Chroma; 20] = [
        Chroma::I420,
        Chroma::YV12,
        Chroma::YV9,
        Chroma::I422,
        Chroma::I444,
        Chroma::I420_10L,
        Chroma::I420_12L,
        Chroma::I444_16L,
        Chroma::NV12,
        Chroma::NV21,
        Chroma::NV16,
        Chroma::P010,
        Chroma::P016,
        Chroma::YUYV,
        Chroma::UYVY,
        Chroma::YVYU,
        Chroma::VYUY,
        Chroma::RGBA,
        Chroma::BGRA,
        Chroma::XYZ12,
    ];

    pub fn fourcc(self) -> [u8; 4] {
        self.description().fourcc
    }

    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Chroma> {
        BY_FOURCC.get(fourcc).map(|desc| desc.chroma)
    }

    pub fn description(self) -> &'static ChromaDescription {
        // Every variant has a table row; see `table_covers_every_chroma`.
        BY_CHROMA[&self]
    }

    pub fn is_yuv(self) -> bool {
        matches!(self.description().model, ColorModel::Yuv { .. })
    }
}

/// Plane size relative to the picture size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ratio {
    pub num: u32,
    pub den: u32,
}

impl Ratio {
    pub const ONE: Ratio = Ratio { num: 1, den: 1 };
    pub const HALF: Ratio = Ratio { num: 1, den: 2 };
    pub const QUARTER: Ratio = Ratio { num: 1, den: 4 };

    pub fn apply(self, value: u32) -> u32 {
        (value * self.num).div_ceil(self.den)
    }

    pub fn as_f32(self) -> f32 {
        self.num as f32 / self.den as f32
    }
}

/// Storage format of one plane texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexelFormat {
    R8,
    Rg8,
    Rgba8,
    Bgra8,
    R16,
    Rg16,
    Rgba16,
    /// Three 16-bit channels; no GPU format stores this directly, so it is
    /// widened to `Rgba16` on upload.
    Rgb16,
}

impl TexelFormat {
    /// Bytes per texel as laid out in picture memory.
    pub fn bytes_per_texel(self) -> usize {
        match self {
            TexelFormat::R8 => 1,
            TexelFormat::Rg8 | TexelFormat::R16 => 2,
            TexelFormat::Rgba8 | TexelFormat::Bgra8 | TexelFormat::Rg16 => 4,
            TexelFormat::Rgb16 => 6,
            TexelFormat::Rgba16 => 8,
        }
    }

    /// Format of the GPU texture the plane is uploaded into.
    pub fn texture_format(self) -> TexelFormat {
        match self {
            TexelFormat::Rgb16 => TexelFormat::Rgba16,
            other => other,
        }
    }
}

/// How texel coordinates are addressed by the sampling code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureTarget {
    /// Normalized `[0, 1]` coordinates through a filtering sampler.
    #[default]
    Texture2d,
    /// Unnormalized texel coordinates, fetched without a sampler.
    Rectangle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneDescription {
    pub width: Ratio,
    pub height: Ratio,
    pub texels: TexelFormat,
    /// Texture channels extracted, in order, into the next pixel slots.
    pub swizzle: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    Rgb,
    Yuv { swap_uv: bool },
    /// CIE XYZ with gamma 2.6, converted through linear light.
    LinearXyz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChromaDescription {
    pub chroma: Chroma,
    pub fourcc: [u8; 4],
    pub planes: &'static [PlaneDescription],
    /// Bytes per sample.
    pub pixel_size: u8,
    /// Significant bits per sample.
    pub pixel_bits: u8,
    /// High bit depth samples are stored in the most significant bits.
    pub msb_aligned: bool,
    pub model: ColorModel,
}

impl ChromaDescription {
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    pub fn fourcc_str(&self) -> &str {
        std::str::from_utf8(&self.fourcc).unwrap_or("????")
    }
}

const fn plane(width: Ratio, height: Ratio, texels: TexelFormat, swizzle: &'static str) -> PlaneDescription {
    PlaneDescription { width, height, texels, swizzle }
}

const P8_420: [PlaneDescription; 3] = [
    plane(Ratio::ONE, Ratio::ONE, TexelFormat::R8, "r"),
    plane(Ratio::HALF, Ratio::HALF, TexelFormat::R8, "r"),
    plane(Ratio::HALF, Ratio::HALF, TexelFormat::R8, "r"),
];
const P8_410: [PlaneDescription; 3] = [
    plane(Ratio::ONE, Ratio::ONE, TexelFormat::R8, "r"),
    plane(Ratio::QUARTER, Ratio::QUARTER, TexelFormat::R8, "r"),
    plane(Ratio::QUARTER, Ratio::QUARTER, TexelFormat::R8, "r"),
];
const P8_422: [PlaneDescription; 3] = [
    plane(Ratio::ONE, Ratio::ONE, TexelFormat::R8, "r"),
    plane(Ratio::HALF, Ratio::ONE, TexelFormat::R8, "r"),
    plane(Ratio::HALF, Ratio::ONE, TexelFormat::R8, "r"),
];
const P8_444: [PlaneDescription; 3] = [
    plane(Ratio::ONE, Ratio::ONE, TexelFormat::R8, "r"),
    plane(Ratio::ONE, Ratio::ONE, TexelFormat::R8, "r"),
    plane(Ratio::ONE, Ratio::ONE, TexelFormat::R8, "r"),
];
const P16_420: [PlaneDescription; 3] = [
    plane(Ratio::ONE, Ratio::ONE, TexelFormat::R16, "r"),
    plane(Ratio::HALF, Ratio::HALF, TexelFormat::R16, "r"),
    plane(Ratio::HALF, Ratio::HALF, TexelFormat::R16, "r"),
];
const P16_444: [PlaneDescription; 3] = [
    plane(Ratio::ONE, Ratio::ONE, TexelFormat::R16, "r"),
    plane(Ratio::ONE, Ratio::ONE, TexelFormat::R16, "r"),
    plane(Ratio::ONE, Ratio::ONE, TexelFormat::R16, "r"),
];
const SP8_420: [PlaneDescription; 2] = [
    plane(Ratio::ONE, Ratio::ONE, TexelFormat::R8, "r"),
    plane(Ratio::HALF, Ratio::HALF, TexelFormat::Rg8, "rg"),
];
const SP8_422: [PlaneDescription; 2] = [
    plane(Ratio::ONE, Ratio::ONE, TexelFormat::R8, "r"),
    plane(Ratio::HALF, Ratio::ONE, TexelFormat::Rg8, "rg"),
];
const SP16_420: [PlaneDescription; 2] = [
    plane(Ratio::ONE, Ratio::ONE, TexelFormat::R16, "r"),
    plane(Ratio::HALF, Ratio::HALF, TexelFormat::Rg16, "rg"),
];

// Packed 4:2:2 stores two pixels per RGBA texel. Swizzles pick Y1 U V:
//   R  G  B  A
//   Y1 U  Y2 V  => rga
//   U  Y1 V  Y2 => grb
//   Y1 V  Y2 U  => rag
//   V  Y1 U  Y2 => gbr
const PACKED_YUYV: [PlaneDescription; 1] = [plane(Ratio::HALF, Ratio::ONE, TexelFormat::Rgba8, "rga")];
const PACKED_UYVY: [PlaneDescription; 1] = [plane(Ratio::HALF, Ratio::ONE, TexelFormat::Rgba8, "grb")];
const PACKED_YVYU: [PlaneDescription; 1] = [plane(Ratio::HALF, Ratio::ONE, TexelFormat::Rgba8, "rag")];
const PACKED_VYUY: [PlaneDescription; 1] = [plane(Ratio::HALF, Ratio::ONE, TexelFormat::Rgba8, "gbr")];

const RGBA: [PlaneDescription; 1] = [plane(Ratio::ONE, Ratio::ONE, TexelFormat::Rgba8, "rgba")];
const BGRA: [PlaneDescription; 1] = [plane(Ratio::ONE, Ratio::ONE, TexelFormat::Bgra8, "rgba")];
const XYZ: [PlaneDescription; 1] = [plane(Ratio::ONE, Ratio::ONE, TexelFormat::Rgb16, "rgb")];

const fn yuv(
    chroma: Chroma,
    fourcc: &[u8; 4],
    planes: &'static [PlaneDescription],
    pixel_size: u8,
    pixel_bits: u8,
    msb_aligned: bool,
    swap_uv: bool,
) -> ChromaDescription {
    ChromaDescription {
        chroma,
        fourcc: *fourcc,
        planes,
        pixel_size,
        pixel_bits,
        msb_aligned,
        model: ColorModel::Yuv { swap_uv },
    }
}

pub static CHROMA_TABLE: &[ChromaDescription] = &[
    yuv(Chroma::I420, b"I420", &P8_420, 1, 8, false, false),
    yuv(Chroma::YV12, b"YV12", &P8_420, 1, 8, false, true),
    yuv(Chroma::YV9, b"YVU9", &P8_410, 1, 8, false, true),
    yuv(Chroma::I422, b"I422", &P8_422, 1, 8, false, false),
    yuv(Chroma::I444, b"I444", &P8_444, 1, 8, false, false),
    yuv(Chroma::I420_10L, b"i0AL", &P16_420, 2, 10, false, false),
    yuv(Chroma::I420_12L, b"i0CL", &P16_420, 2, 12, false, false),
    yuv(Chroma::I444_16L, b"i4GL", &P16_444, 2, 16, false, false),
    yuv(Chroma::NV12, b"NV12", &SP8_420, 1, 8, false, false),
    yuv(Chroma::NV21, b"NV21", &SP8_420, 1, 8, false, true),
    yuv(Chroma::NV16, b"NV16", &SP8_422, 1, 8, false, false),
    yuv(Chroma::P010, b"P010", &SP16_420, 2, 10, true, false),
    yuv(Chroma::P016, b"P016", &SP16_420, 2, 16, true, false),
    yuv(Chroma::YUYV, b"YUY2", &PACKED_YUYV, 1, 8, false, false),
    yuv(Chroma::UYVY, b"UYVY", &PACKED_UYVY, 1, 8, false, false),
    yuv(Chroma::YVYU, b"YVYU", &PACKED_YVYU, 1, 8, false, false),
    yuv(Chroma::VYUY, b"VYUY", &PACKED_VYUY, 1, 8, false, false),
    ChromaDescription {
        chroma: Chroma::RGBA,
        fourcc: *b"RGBA",
        planes: &RGBA,
        pixel_size: 1,
        pixel_bits: 8,
        msb_aligned: false,
        model: ColorModel::Rgb,
    },
    ChromaDescription {
        chroma: Chroma::BGRA,
        fourcc: *b"BGRA",
        planes: &BGRA,
        pixel_size: 1,
        pixel_bits: 8,
        msb_aligned: false,
        model: ColorModel::Rgb,
    },
    ChromaDescription {
        chroma: Chroma::XYZ12,
        fourcc: *b"XY12",
        planes: &XYZ,
        pixel_size: 2,
        pixel_bits: 12,
        msb_aligned: true,
        model: ColorModel::LinearXyz,
    },
];

const fn swizzle_is_valid(swizzle: &str) -> bool {
    let bytes = swizzle.as_bytes();
    if bytes.is_empty() || bytes.len() > 4 {
        return false;
    }
    let mut i = 0;
    while i < bytes.len() {
        if !matches!(bytes[i], b'r' | b'g' | b'b' | b'a') {
            return false;
        }
        i += 1;
    }
    true
}

const fn table_is_consistent(table: &[ChromaDescription]) -> bool {
    let mut i = 0;
    while i < table.len() {
        let desc = &table[i];
        if desc.planes.is_empty() || desc.planes.len() > MAX_PLANES {
            return false;
        }
        let mut channels = 0;
        let mut j = 0;
        while j < desc.planes.len() {
            if !swizzle_is_valid(desc.planes[j].swizzle) {
                return false;
            }
            channels += desc.planes[j].swizzle.len();
            j += 1;
        }
        // YUV pixels are always assembled from exactly Y, U and V.
        if matches!(desc.model, ColorModel::Yuv { .. }) && channels != 3 {
            return false;
        }
        i += 1;
    }
    true
}

const _: () = assert!(
    table_is_consistent(CHROMA_TABLE),
    "chroma table: YUV swizzles must extract exactly 3 channels"
);

static BY_CHROMA: Lazy<HashMap<Chroma, &'static ChromaDescription>> =
    Lazy::new(|| CHROMA_TABLE.iter().map(|desc| (desc.chroma, desc)).collect());

static BY_FOURCC: Lazy<HashMap<[u8; 4], &'static ChromaDescription>> =
    Lazy::new(|| CHROMA_TABLE.iter().map(|desc| (desc.fourcc, desc)).collect());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    Bt601,
    #[default]
    Bt709,
    Bt2020,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorRange {
    #[default]
    Limited,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferFunction {
    Linear,
    Srgb,
    #[default]
    Bt709,
    /// SMPTE ST 2084.
    Pq,
    Hlg,
}

impl TransferFunction {
    pub fn is_hdr(self) -> bool {
        matches!(self, TransferFunction::Pq | TransferFunction::Hlg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorPrimaries {
    Bt601,
    #[default]
    Bt709,
    Bt2020,
}

/// 8-way picture orientation, named after where the first stored row/column lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Normal,
    HFlipped,
    VFlipped,
    Rotated180,
    Transposed,
    AntiTransposed,
    Rotated90,
    Rotated270,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiviewMode {
    #[default]
    Mono,
    /// Left eye in the left half.
    StereoSideBySide,
    /// Left eye in the top half.
    StereoTopBottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionMode {
    #[default]
    Rectangular,
    Equirectangular,
    CubemapStandard,
}

impl ProjectionMode {
    /// Whether the viewpoint drives the projection.
    pub fn is_spherical(self) -> bool {
        matches!(self, ProjectionMode::Equirectangular | ProjectionMode::CubemapStandard)
    }
}

/// Visible window into the decoded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crop {
    pub x_offset: u32,
    pub y_offset: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFormat {
    pub chroma: Chroma,
    /// Decoded buffer size.
    pub width: u32,
    pub height: u32,
    pub x_offset: u32,
    pub y_offset: u32,
    pub visible_width: u32,
    pub visible_height: u32,
    #[serde(default)]
    pub color_space: ColorSpace,
    #[serde(default)]
    pub color_range: ColorRange,
    #[serde(default)]
    pub transfer: TransferFunction,
    #[serde(default)]
    pub primaries: ColorPrimaries,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub multiview: MultiviewMode,
    #[serde(default)]
    pub projection: ProjectionMode,
    /// Cubemap face padding in pixels.
    #[serde(default)]
    pub cubemap_padding: u32,
}

impl VideoFormat {
    /// Uncropped format with default color and projection metadata.
    pub fn new(chroma: Chroma, width: u32, height: u32) -> Self {
        Self {
            chroma,
            width,
            height,
            x_offset: 0,
            y_offset: 0,
            visible_width: width,
            visible_height: height,
            color_space: ColorSpace::default(),
            color_range: ColorRange::default(),
            transfer: TransferFunction::default(),
            primaries: ColorPrimaries::default(),
            orientation: Orientation::default(),
            multiview: MultiviewMode::default(),
            projection: ProjectionMode::default(),
            cubemap_padding: 0,
        }
    }

    pub fn crop(&self) -> Crop {
        Crop {
            x_offset: self.x_offset,
            y_offset: self.y_offset,
            width: self.visible_width,
            height: self.visible_height,
        }
    }

    pub fn with_crop(mut self, crop: Crop) -> Self {
        self.x_offset = crop.x_offset;
        self.y_offset = crop.y_offset;
        self.visible_width = crop.width;
        self.visible_height = crop.height;
        self
    }

    pub fn description(&self) -> &'static ChromaDescription {
        self.chroma.description()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_chroma() {
        for chroma in Chroma::ALL {
            assert_eq!(chroma.description().chroma, chroma);
        }
        assert_eq!(CHROMA_TABLE.len(), Chroma::ALL.len());
    }

    #[test]
    fn fourcc_round_trips_through_table() {
        assert_eq!(Chroma::from_fourcc(b"NV12"), Some(Chroma::NV12));
        assert_eq!(Chroma::from_fourcc(b"YUY2"), Some(Chroma::YUYV));
        assert_eq!(Chroma::I420.fourcc(), *b"I420");
        assert_eq!(Chroma::from_fourcc(b"ZZZZ"), None);
    }

    #[test]
    fn interleaved_swizzles_extract_three_channels() {
        for (chroma, expected) in [
            (Chroma::YUYV, "rga"),
            (Chroma::UYVY, "grb"),
            (Chroma::YVYU, "rag"),
            (Chroma::VYUY, "gbr"),
        ] {
            let desc = chroma.description();
            assert_eq!(desc.plane_count(), 1);
            assert_eq!(desc.planes[0].swizzle, expected);
            assert_eq!(desc.planes[0].swizzle.len(), 3);
        }
    }

    #[test]
    fn yuv_channel_total_is_three() {
        for desc in CHROMA_TABLE.iter().filter(|d| d.chroma.is_yuv()) {
            let total: usize = desc.planes.iter().map(|p| p.swizzle.len()).sum();
            assert_eq!(total, 3, "{:?}", desc.chroma);
        }
    }

    #[test]
    fn semi_planar_chroma_plane_is_two_channels() {
        let desc = Chroma::NV12.description();
        assert_eq!(desc.planes[0].swizzle, "r");
        assert_eq!(desc.planes[1].swizzle, "rg");
        assert_eq!(desc.planes[1].texels, TexelFormat::Rg8);
    }

    #[test]
    fn ratio_rounds_odd_sizes_up() {
        assert_eq!(Ratio::HALF.apply(1921), 961);
        assert_eq!(Ratio::ONE.apply(1080), 1080);
        assert_eq!(Ratio::QUARTER.apply(10), 3);
    }

    #[test]
    fn format_deserializes_with_defaults() {
        let json = r#"{
            "chroma": "I420",
            "width": 64, "height": 32,
            "x_offset": 0, "y_offset": 0,
            "visible_width": 64, "visible_height": 32,
            "projection": "equirectangular"
        }"#;
        let fmt: VideoFormat = serde_json::from_str(json).unwrap();
        assert_eq!(fmt.projection, ProjectionMode::Equirectangular);
        assert_eq!(fmt.color_space, ColorSpace::Bt709);
        assert_eq!(fmt.orientation, Orientation::Normal);
    }
}
