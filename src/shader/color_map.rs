// color_map.rs — optional tone mapping, gamut mapping and dithering fragment

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{RendererError, Result};
use crate::format::{ColorPrimaries, TransferFunction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneMapping {
    /// Hard clip at the display peak.
    Clip,
    /// Extended Reinhard, reaching white at the source peak.
    Reinhard,
    /// Hable/Uncharted 2 filmic curve.
    #[default]
    Hable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorMapping {
    pub tone_mapping: ToneMapping,
    /// Display peak luminance in nits.
    pub target_peak: f32,
    /// Mastering peak assumed for HDR sources, in nits.
    pub source_peak: f32,
    /// Output bit depth for ordered dithering; `None` disables it.
    pub dither_depth: Option<u8>,
}

impl Default for ColorMapping {
    fn default() -> Self {
        Self {
            tone_mapping: ToneMapping::default(),
            target_peak: 203.0,
            source_peak: 1000.0,
            dither_depth: None,
        }
    }
}

impl ColorMapping {
    /// Peaks must be positive finite nits and the dither depth 1 to 16 bits.
    pub fn validate(&self) -> Result<()> {
        for (name, peak) in [("target_peak", self.target_peak), ("source_peak", self.source_peak)] {
            if !peak.is_finite() || peak <= 0.0 {
                return Err(RendererError::InvalidParameter(format!(
                    "color_mapping.{name} must be a positive number of nits, got {peak}"
                )));
            }
        }
        if let Some(depth) = self.dither_depth {
            if !(1..=16).contains(&depth) {
                return Err(RendererError::InvalidParameter(format!(
                    "color_mapping.dither_depth must be in 1..=16, got {depth}"
                )));
            }
        }
        Ok(())
    }
}

const PQ_EOTF: &str = "\
// SMPTE ST 2084 EOTF, in nits
fn pq_eotf(pq: vec3<f32>) -> vec3<f32> {
    let m1 = 0.1593017578125;
    let m2 = 78.84375;
    let c1 = 0.8359375;
    let c2 = 18.8515625;
    let c3 = 18.6875;

    let pq_pow = pow(max(pq, vec3<f32>(0.0)), vec3<f32>(1.0 / m2));
    let num = max(pq_pow - c1, vec3<f32>(0.0));
    let den = c2 - c3 * pq_pow;
    return pow(num / max(den, vec3<f32>(0.0001)), vec3<f32>(1.0 / m1)) * 10000.0;
}
";

const HLG_EOTF: &str = "\
// ARIB STD-B67 inverse OETF followed by a 1000 nit display OOTF
fn hlg_eotf(hlg: vec3<f32>) -> vec3<f32> {
    let a = 0.17883277;
    let b = 0.28466892;
    let c = 0.55991073;

    let e = max(hlg, vec3<f32>(0.0));
    let low = e * e / 3.0;
    let high = (exp((e - c) / a) + b) / 12.0;
    let scene = select(high, low, e <= vec3<f32>(0.5));
    return pow(scene, vec3<f32>(1.2)) * 1000.0;
}
";

const BT2020_TO_BT709: &str = "\
fn bt2020_to_bt709(color: vec3<f32>) -> vec3<f32> {
    let r = color.r *  1.6605 + color.g * -0.5876 + color.b * -0.0728;
    let g = color.r * -0.1246 + color.g *  1.1329 + color.b * -0.0083;
    let b = color.r * -0.0182 + color.g * -0.1006 + color.b *  1.1187;
    return vec3<f32>(r, g, b);
}
";

const LINEAR_TO_SRGB: &str = "\
fn linear_to_srgb(linear: vec3<f32>) -> vec3<f32> {
    let cutoff = vec3<f32>(0.0031308);
    let low = linear * 12.92;
    let high = 1.055 * pow(linear, vec3<f32>(1.0 / 2.4)) - 0.055;
    return select(high, low, linear <= cutoff);
}
";

const HABLE: &str = "\
fn hable(x: vec3<f32>) -> vec3<f32> {
    let a = 0.15;
    let b = 0.50;
    let c = 0.10;
    let d = 0.20;
    let e = 0.02;
    let f = 0.30;
    return (x * (a * x + c * b) + d * e) / (x * (a * x + b) + d * f) - e / f;
}
";

const BAYER: &str = "\
var<private> BAYER4: array<f32, 16> = array<f32, 16>(
    0.0, 8.0, 2.0, 10.0,
    12.0, 4.0, 14.0, 6.0,
    3.0, 11.0, 1.0, 9.0,
    15.0, 7.0, 13.0, 5.0,
);

fn bayer4(frag_coord: vec2<f32>) -> f32 {
    let p = vec2<u32>(frag_coord) % vec2<u32>(4u);
    return (BAYER4[p.y * 4u + p.x] + 0.5) / 16.0;
}
";

fn float(v: f32) -> String {
    format!("{v:.6}")
}

/// WGSL defining `color_map(color, frag_coord) -> vec4<f32>`, or `None`
/// when the mapping would leave every pixel unchanged. `mapping` must have
/// passed `validate`.
pub(crate) fn build(mapping: &ColorMapping, transfer: TransferFunction, primaries: ColorPrimaries) -> Option<String> {
    let hdr = transfer.is_hdr();
    let wide_gamut = primaries == ColorPrimaries::Bt2020;
    if !hdr && !wide_gamut && mapping.dither_depth.is_none() {
        return None;
    }

    let mut out = String::new();
    let linearize = match transfer {
        TransferFunction::Pq => {
            out.push_str(PQ_EOTF);
            Some("pq_eotf(rgb)".to_owned())
        }
        TransferFunction::Hlg => {
            out.push_str(HLG_EOTF);
            Some("hlg_eotf(rgb)".to_owned())
        }
        _ if wide_gamut => Some(format!("pow(max(rgb, vec3<f32>(0.0)), vec3<f32>(2.4)) * {}", float(mapping.target_peak))),
        _ => None,
    };
    if wide_gamut {
        out.push_str(BT2020_TO_BT709);
    }
    if hdr {
        out.push_str(LINEAR_TO_SRGB);
        if mapping.tone_mapping == ToneMapping::Hable {
            out.push_str(HABLE);
        }
    }
    if mapping.dither_depth.is_some() {
        out.push_str(BAYER);
    }

    out.push_str("fn color_map(color: vec4<f32>, frag_coord: vec2<f32>) -> vec4<f32> {\n");
    out.push_str("    var rgb = color.rgb;\n");

    if let Some(linearize) = linearize {
        let _ = writeln!(out, "    var nits = {linearize};");
        if wide_gamut {
            out.push_str("    nits = bt2020_to_bt709(nits);\n");
        }
        let _ = writeln!(out, "    let x = max(nits / {}, vec3<f32>(0.0));", float(mapping.target_peak));

        if hdr {
            let peak = float((mapping.source_peak / mapping.target_peak).max(1.0));
            let mapped = match mapping.tone_mapping {
                ToneMapping::Clip => "min(x, vec3<f32>(1.0))".to_owned(),
                ToneMapping::Reinhard => format!("x * (1.0 + x / ({peak} * {peak})) / (1.0 + x)"),
                ToneMapping::Hable => format!("hable(x) / hable(vec3<f32>({peak}))"),
            };
            let _ = writeln!(out, "    rgb = linear_to_srgb(clamp({mapped}, vec3<f32>(0.0), vec3<f32>(1.0)));");
        } else {
            out.push_str("    rgb = pow(clamp(x, vec3<f32>(0.0), vec3<f32>(1.0)), vec3<f32>(1.0 / 2.4));\n");
        }
    }

    if let Some(depth) = mapping.dither_depth {
        let levels = float(((1u32 << depth) - 1) as f32);
        let _ = writeln!(out, "    rgb = floor(rgb * {levels} + bayer4(frag_coord)) / {levels};");
    }

    out.push_str("    return vec4<f32>(rgb, color.a);\n}\n");
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sdr_without_dither_is_skipped() {
        let mapping = ColorMapping::default();
        assert!(build(&mapping, TransferFunction::Bt709, ColorPrimaries::Bt709).is_none());
    }

    #[test]
    fn pq_source_is_linearized_and_tone_mapped() {
        let mapping = ColorMapping { tone_mapping: ToneMapping::Reinhard, ..Default::default() };
        let src = build(&mapping, TransferFunction::Pq, ColorPrimaries::Bt2020).unwrap();
        assert!(src.contains("var nits = pq_eotf(rgb);"));
        assert!(src.contains("nits = bt2020_to_bt709(nits);"));
        assert!(src.contains("linear_to_srgb"));
        assert!(!src.contains("fn hable"));
        assert!(!src.contains("bayer4"));
    }

    #[test]
    fn dither_only_keeps_signal() {
        let mapping = ColorMapping { dither_depth: Some(8), ..Default::default() };
        let src = build(&mapping, TransferFunction::Bt709, ColorPrimaries::Bt709).unwrap();
        assert!(!src.contains("nits"));
        assert!(src.contains("floor(rgb * 255.000000 + bayer4(frag_coord)) / 255.000000"));
    }

    #[test]
    fn degenerate_mappings_are_refused() {
        assert!(ColorMapping::default().validate().is_ok());
        let bad = [
            ColorMapping { target_peak: 0.0, ..Default::default() },
            ColorMapping { source_peak: -1.0, ..Default::default() },
            ColorMapping { target_peak: f32::INFINITY, ..Default::default() },
            ColorMapping { source_peak: f32::NAN, ..Default::default() },
            ColorMapping { dither_depth: Some(0), ..Default::default() },
            ColorMapping { dither_depth: Some(17), ..Default::default() },
        ];
        for mapping in bad {
            assert!(
                matches!(mapping.validate(), Err(RendererError::InvalidParameter(_))),
                "{mapping:?} accepted"
            );
        }
    }

    #[test]
    fn hlg_uses_hable_by_default() {
        let src = build(&ColorMapping::default(), TransferFunction::Hlg, ColorPrimaries::Bt709).unwrap();
        assert!(src.contains("hlg_eotf(rgb)"));
        assert!(src.contains("hable(x) / hable("));
        assert!(!src.contains("bt2020_to_bt709"));
    }
}
