// mesh.rs — vertex, texture coordinate and index buffers per projection

use std::f32::consts::PI;

use crate::error::{RendererError, Result};
use crate::format::ProjectionMode;

pub const SPHERE_RADIUS: f32 = 1.0;
pub const DEFAULT_SPHERE_BANDS: u32 = 128;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u16>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Builds the geometry for `projection`.
    ///
    /// `padding` is the cubemap face margin as a fraction of the picture
    /// width and height; it is ignored by the other projections.
    pub fn for_projection(projection: ProjectionMode, padding: (f32, f32), sphere_bands: u32) -> Result<Mesh> {
        match projection {
            ProjectionMode::Rectangular => build_rectangle(),
            ProjectionMode::Equirectangular => build_sphere(sphere_bands, sphere_bands),
            ProjectionMode::CubemapStandard => build_cube(padding.0, padding.1),
        }
    }

    fn with_capacity(vertices: usize, indices: usize) -> Result<Mesh> {
        let mut mesh = Mesh::default();
        mesh.positions
            .try_reserve_exact(vertices)
            .map_err(RendererError::oom("vertex positions"))?;
        mesh.tex_coords
            .try_reserve_exact(vertices)
            .map_err(RendererError::oom("texture coordinates"))?;
        mesh.indices
            .try_reserve_exact(indices)
            .map_err(RendererError::oom("indices"))?;
        Ok(mesh)
    }
}

/// Full-frame quad at z = -1.
pub fn build_rectangle() -> Result<Mesh> {
    let mut mesh = Mesh::with_capacity(4, 6)?;
    mesh.positions.extend_from_slice(&[
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, -1.0],
        [1.0, 1.0, -1.0],
        [1.0, -1.0, -1.0],
    ]);
    mesh.tex_coords
        .extend_from_slice(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]);
    mesh.indices.extend_from_slice(&[0, 1, 2, 2, 1, 3]);
    Ok(mesh)
}

/// UV sphere seen from the inside; triangles wind counter-clockwise for a
/// viewer at the center.
pub fn build_sphere(lat_bands: u32, lon_bands: u32) -> Result<Mesh> {
    if lat_bands == 0 || lon_bands == 0 {
        return Err(RendererError::InvalidParameter(format!(
            "sphere needs at least one band, got {lat_bands}x{lon_bands}"
        )));
    }
    let vertices = (lat_bands as u64 + 1) * (lon_bands as u64 + 1);
    if vertices > u16::MAX as u64 + 1 {
        return Err(RendererError::InvalidParameter(format!(
            "{lat_bands}x{lon_bands} sphere bands overflow 16-bit indices"
        )));
    }
    let vertices = vertices as usize;
    let indices = lat_bands as usize * lon_bands as usize * 6;
    let mut mesh = Mesh::with_capacity(vertices, indices)?;

    for lat in 0..=lat_bands {
        let theta = lat as f32 * PI / lat_bands as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for lon in 0..=lon_bands {
            let phi = lon as f32 * 2.0 * PI / lon_bands as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();

            mesh.positions.push([
                SPHERE_RADIUS * cos_phi * sin_theta,
                SPHERE_RADIUS * cos_theta,
                SPHERE_RADIUS * sin_phi * sin_theta,
            ]);
            mesh.tex_coords
                .push([lon as f32 / lon_bands as f32, lat as f32 / lat_bands as f32]);
        }
    }

    // Fits: the vertex count check above bounds every index below 65536.
    for lat in 0..lat_bands {
        for lon in 0..lon_bands {
            let first = (lat * (lon_bands + 1) + lon) as u16;
            let second = first + lon_bands as u16 + 1;

            mesh.indices.extend_from_slice(&[
                first, second, first + 1,
                second, second + 1, first + 1,
            ]);
        }
    }

    Ok(mesh)
}

/// Unit cube sampling a 3x2 face atlas, inset by `pad_w` x `pad_h` on every
/// face edge so neighbouring faces do not bleed into each other.
pub fn build_cube(pad_w: f32, pad_h: f32) -> Result<Mesh> {
    const COORDS: [[f32; 3]; 24] = [
        // front
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, -1.0],
        [1.0, 1.0, -1.0],
        [1.0, -1.0, -1.0],
        // back
        [-1.0, 1.0, 1.0],
        [-1.0, -1.0, 1.0],
        [1.0, 1.0, 1.0],
        [1.0, -1.0, 1.0],
        // left
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, -1.0],
        [-1.0, 1.0, 1.0],
        [-1.0, -1.0, 1.0],
        // right
        [1.0, 1.0, -1.0],
        [1.0, -1.0, -1.0],
        [1.0, 1.0, 1.0],
        [1.0, -1.0, 1.0],
        // bottom
        [-1.0, -1.0, 1.0],
        [-1.0, -1.0, -1.0],
        [1.0, -1.0, 1.0],
        [1.0, -1.0, -1.0],
        // top
        [-1.0, 1.0, 1.0],
        [-1.0, 1.0, -1.0],
        [1.0, 1.0, 1.0],
        [1.0, 1.0, -1.0],
    ];
    const INDICES: [u16; 36] = [
        0, 1, 2, 2, 1, 3, // front
        6, 7, 4, 4, 7, 5, // back
        10, 11, 8, 8, 11, 9, // left
        12, 13, 14, 14, 13, 15, // right
        18, 19, 16, 16, 19, 17, // bottom
        20, 21, 22, 22, 21, 23, // top
    ];

    let col = [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0];
    let row = [0.0, 0.5, 1.0];

    let tex = [
        // front
        [col[1] + pad_w, row[1] + pad_h],
        [col[1] + pad_w, row[2] - pad_h],
        [col[2] - pad_w, row[1] + pad_h],
        [col[2] - pad_w, row[2] - pad_h],
        // back
        [col[3] - pad_w, row[1] + pad_h],
        [col[3] - pad_w, row[2] - pad_h],
        [col[2] + pad_w, row[1] + pad_h],
        [col[2] + pad_w, row[2] - pad_h],
        // left
        [col[2] - pad_w, row[0] + pad_h],
        [col[2] - pad_w, row[1] - pad_h],
        [col[1] + pad_w, row[0] + pad_h],
        [col[1] + pad_w, row[1] - pad_h],
        // right
        [col[0] + pad_w, row[0] + pad_h],
        [col[0] + pad_w, row[1] - pad_h],
        [col[1] - pad_w, row[0] + pad_h],
        [col[1] - pad_w, row[1] - pad_h],
        // bottom
        [col[0] + pad_w, row[2] - pad_h],
        [col[0] + pad_w, row[1] + pad_h],
        [col[1] - pad_w, row[2] - pad_h],
        [col[1] - pad_w, row[1] + pad_h],
        // top
        [col[2] + pad_w, row[0] + pad_h],
        [col[2] + pad_w, row[1] - pad_h],
        [col[3] - pad_w, row[0] + pad_h],
        [col[3] - pad_w, row[1] - pad_h],
    ];

    let mut mesh = Mesh::with_capacity(COORDS.len(), INDICES.len())?;
    mesh.positions.extend_from_slice(&COORDS);
    mesh.tex_coords.extend_from_slice(&tex);
    mesh.indices.extend_from_slice(&INDICES);
    Ok(mesh)
}
