// color.rs — YUV to RGB conversion matrices

use glam::Mat4;

use crate::format::{ChromaDescription, ColorModel, ColorRange, ColorSpace};

/// Row-major 3x4 matrix that expands legal-range samples to `[0, 1]` and
/// moves chroma around zero.
const LIMITED_RANGE: [f64; 12] = [
    255.0 / 219.0, 0.0, 0.0, -255.0 / 219.0 * 16.0 / 255.0,
    0.0, 255.0 / 224.0, 0.0, -255.0 / 224.0 * 128.0 / 255.0,
    0.0, 0.0, 255.0 / 224.0, -255.0 / 224.0 * 128.0 / 255.0,
];

const FULL_RANGE: [f64; 12] = [
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, -128.0 / 255.0,
    0.0, 0.0, 1.0, -128.0 / 255.0,
];

impl ColorSpace {
    /// Luma weights `(Kr, Kb)`.
    pub fn luma_weights(self) -> (f64, f64) {
        match self {
            ColorSpace::Bt601 => (0.299, 0.114),
            ColorSpace::Bt709 => (0.2126, 0.0722),
            ColorSpace::Bt2020 => (0.2627, 0.0593),
        }
    }

    /// Row-major 3x3 Y'CbCr to R'G'B' matrix.
    fn yuv_to_rgb(self) -> [f64; 9] {
        let (kr, kb) = self.luma_weights();
        let kg = 1.0 - kr - kb;
        [
            1.0, 0.0, 2.0 * (1.0 - kr),
            1.0, -2.0 * (1.0 - kb) * kb / kg, -2.0 * (1.0 - kr) * kr / kg,
            1.0, 2.0 * (1.0 - kb), 0.0,
        ]
    }
}

impl ColorRange {
    fn matrix(self) -> &'static [f64; 12] {
        match self {
            ColorRange::Limited => &LIMITED_RANGE,
            ColorRange::Full => &FULL_RANGE,
        }
    }
}

/// Combined space x range matrix, padded to 4x4 with a `0 0 0 1` last row.
///
/// The product is accumulated in `f64` and only narrowed when stored.
pub fn conversion_matrix(space: ColorSpace, range: ColorRange) -> Mat4 {
    let space = space.yuv_to_rgb();
    let range = range.matrix();

    let mut out = [0f32; 16];
    for x in 0..4 {
        for y in 0..3 {
            let mut acc = 0f64;
            for k in 0..3 {
                acc += space[y * 3 + k] * range[k * 4 + x];
            }
            out[x * 4 + y] = acc as f32;
        }
    }
    out[3] = 0.0;
    out[7] = 0.0;
    out[11] = 0.0;
    out[15] = 1.0;
    Mat4::from_cols_array(&out)
}

/// Conversion matrix for a YUV chroma.
///
/// Samples held in the low bits of 16-bit texels read back scaled by
/// `(2^bits - 1) / (2^16 - 1)`, so the coefficient columns are scaled up by
/// the inverse. Chromas storing V before U get the U and V columns swapped.
pub fn yuv_conversion_matrix(desc: &ChromaDescription, space: ColorSpace, range: ColorRange) -> Mat4 {
    let mut cols = conversion_matrix(space, range).to_cols_array();

    if desc.pixel_size == 2 && !desc.msb_aligned && desc.pixel_bits < 16 {
        let max = ((1u32 << desc.pixel_bits) - 1) as f32;
        let correction = 65535.0 / max;
        for value in cols.iter_mut().take(12) {
            *value *= correction;
        }
    }

    if let ColorModel::Yuv { swap_uv: true } = desc.model {
        for row in 0..4 {
            cols.swap(4 + row, 8 + row);
        }
    }

    Mat4::from_cols_array(&cols)
}
