// fragment.rs — per-format fragment stage

use std::fmt::Write as _;

use super::interface::{InterfaceBuilder, ProgramInterface, Uniform};
use super::FragmentDescription;
use crate::format::{ColorModel, TextureTarget};

/// XYZ to linear BT.709 RGB, filled column by column.
const XYZ_TO_RGB: &str = "\
const XYZ_TO_RGB = mat4x4<f32>(
    3.240454, -0.9692660, 0.0556434, 0.0,
    -1.5371385, 1.8760108, -0.2040259, 0.0,
    -0.4985314, 0.0415560, 1.0572252, 0.0,
    0.0, 0.0, 0.0, 1.0,
);
";

fn texture_count(desc: &FragmentDescription) -> u8 {
    match desc.chroma.model {
        ColorModel::Yuv { .. } => desc.chroma.plane_count() as u8,
        ColorModel::Rgb | ColorModel::LinearXyz => 1,
    }
}

pub(super) fn declare(mut builder: InterfaceBuilder, desc: &FragmentDescription) -> InterfaceBuilder {
    builder = builder
        .uniform(Uniform::TransformMatrix)
        .uniform(Uniform::OrientationMatrix);

    let count = texture_count(desc);
    for i in 0..count {
        builder = builder.uniform(Uniform::Texture(i)).uniform(Uniform::TexCoordsMap(i));
    }
    if desc.target == TextureTarget::Rectangle {
        for i in 0..count {
            builder = builder.uniform(Uniform::TexSize(i));
        }
    }

    builder = match desc.chroma.model {
        ColorModel::Yuv { .. } => builder.uniform(Uniform::ConvMatrix).uniform(Uniform::FillColor),
        ColorModel::Rgb => builder.uniform(Uniform::FillColor),
        ColorModel::LinearXyz => builder,
    };
    builder.sampled(desc.target == TextureTarget::Texture2d)
}

/// Emits the coordinate lookup and texel fetch for plane `i` into `texel`.
fn fetch(out: &mut String, i: u8, target: TextureTarget) {
    let _ = writeln!(out, "    tex_coords = (u.TexCoordsMap{i} * pic_hcoords).xy;");
    match target {
        TextureTarget::Texture2d => {
            let _ = writeln!(out, "    texel = textureSample(Texture{i}, TexSampler, tex_coords);");
        }
        TextureTarget::Rectangle => {
            // texel units, not normalized
            let _ = writeln!(out, "    tex_coords = tex_coords * u.TexSize{i};");
            let _ = writeln!(out, "    texel = textureLoad(Texture{i}, vec2<i32>(tex_coords), 0);");
        }
    }
}

fn sample_yuv(out: &mut String, desc: &FragmentDescription) {
    out.push_str("    var pixel = vec4<f32>(0.0, 0.0, 0.0, 1.0);\n");
    let slots = ['x', 'y', 'z'];
    let mut color_idx = 0;
    for (i, plane) in desc.chroma.planes.iter().enumerate() {
        fetch(out, i as u8, desc.target);
        for channel in plane.swizzle.chars() {
            let _ = writeln!(out, "    pixel.{} = texel.{channel};", slots[color_idx]);
            color_idx += 1;
        }
    }
    out.push_str("    var result = u.ConvMatrix * pixel;\n");
}

fn sample_rgb(out: &mut String, desc: &FragmentDescription) {
    fetch(out, 0, desc.target);
    out.push_str("    var result = texel;\n");
}

fn sample_xyz(out: &mut String, desc: &FragmentDescription) {
    fetch(out, 0, desc.target);
    out.push_str(
        "    let v_in = vec4<f32>(pow(texel.rgb, vec3<f32>(2.6)), 1.0);
    var v_out = XYZ_TO_RGB * v_in;
    v_out = pow(max(v_out, vec4<f32>(0.0)), vec4<f32>(1.0 / 2.2));
    var result = clamp(v_out, vec4<f32>(0.0), vec4<f32>(1.0));
",
    );
}

pub(super) fn build(
    preamble: &str,
    desc: &FragmentDescription,
    interface: &ProgramInterface,
    color_map: Option<&str>,
) -> String {
    let mut out = String::from(preamble);
    out.push_str(&interface.block_declaration());
    out.push_str(&interface.texture_declarations());
    out.push('\n');

    if desc.chroma.model == ColorModel::LinearXyz {
        out.push_str(XYZ_TO_RGB);
        out.push('\n');
    }
    if let Some(color_map) = color_map {
        out.push_str(color_map);
        out.push('\n');
    }

    out.push_str(
        "fn sample_picture(pic_coords: vec2<f32>, frag_coord: vec2<f32>) -> vec4<f32> {
    // homogeneous, oriented picture coordinates
    let pic_hcoords = vec3<f32>((u.TransformMatrix * u.OrientationMatrix * vec4<f32>(pic_coords, 0.0, 1.0)).xy, 1.0);
    var tex_coords: vec2<f32>;
    var texel: vec4<f32>;
",
    );

    match desc.chroma.model {
        ColorModel::Yuv { .. } => sample_yuv(&mut out, desc),
        ColorModel::Rgb => sample_rgb(&mut out, desc),
        ColorModel::LinearXyz => sample_xyz(&mut out, desc),
    }

    if color_map.is_some() {
        out.push_str("    result = color_map(result, frag_coord);\n");
    }
    if interface.contains(Uniform::FillColor) {
        out.push_str("    return result * u.FillColor;\n}\n");
    } else {
        out.push_str("    return result;\n}\n");
    }

    out.push_str(
        "
struct FragmentInput {
    @builtin(position) position: vec4<f32>,
    @location(0) pic_coords: vec2<f32>,
};

@fragment
fn fs_main(input: FragmentInput) -> @location(0) vec4<f32> {
    return sample_picture(input.pic_coords, input.position.xy);
}
",
    );
    out
}
