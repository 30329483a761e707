// vertex.rs — fixed vertex stage

use super::interface::{Attribute, InterfaceBuilder, ProgramInterface, Uniform};

pub(super) fn declare(builder: InterfaceBuilder) -> InterfaceBuilder {
    builder
        .uniform(Uniform::ProjectionMatrix)
        .uniform(Uniform::ZoomMatrix)
        .uniform(Uniform::ViewMatrix)
        .uniform(Uniform::StereoMatrix)
        .attribute(Attribute::VertexPosition)
        .attribute(Attribute::PicCoordsIn)
}

pub(super) fn build(preamble: &str, interface: &ProgramInterface) -> String {
    let position = Attribute::VertexPosition;
    let pic_coords = Attribute::PicCoordsIn;
    format!(
        "{preamble}{block}
struct VertexOutput {{
    @builtin(position) position: vec4<f32>,
    @location(0) pic_coords: vec2<f32>,
}};

@vertex
fn vs_main(
    @location({pos_loc}) {position}: vec3<f32>,
    @location({pic_loc}) {pic_coords}: vec2<f32>,
) -> VertexOutput {{
    var output: VertexOutput;
    output.pic_coords = (u.StereoMatrix * vec3<f32>({pic_coords}, 1.0)).xy;
    var pos = u.ProjectionMatrix * u.ZoomMatrix * u.ViewMatrix * vec4<f32>({position}, 1.0);
    // clip depth from [-w, w] to [0, w]
    pos.z = (pos.z + pos.w) * 0.5;
    output.position = pos;
    return output;
}}
",
        block = interface.block_declaration(),
        pos_loc = position.location(),
        pic_loc = pic_coords.location(),
    )
}
