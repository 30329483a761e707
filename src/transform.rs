// transform.rs — projection, zoom, view, stereo, orientation and texture coordinate matrices

use glam::{Mat3, Mat4, Vec3};
use log::debug;

use crate::error::{RendererError, Result};
use crate::format::{Crop, MultiviewMode, Orientation, ProjectionMode, Ratio};
use crate::mesh::SPHERE_RADIUS;
use crate::viewpoint::{Viewpoint, FIELD_OF_VIEW_DEGREES_MAX, FIELD_OF_VIEW_DEGREES_MIN};

const Z_NEAR: f32 = 0.01;
const Z_FAR: f32 = 1000.0;

/// Horizontal FOV changes below this (radians) keep the cached FOV-dependent values.
pub const FOV_EPSILON: f32 = 0.001;

/// Horizontal FOV above which the eye is pulled back from the sphere center.
const Z_THRESHOLD_DEGREES: f32 = 90.0;

/// Where a plane's samples live inside its texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneTexture {
    pub width: Ratio,
    pub height: Ratio,
    pub tex_width: u32,
    pub tex_height: u32,
}

#[derive(Debug, Clone)]
pub struct TransformState {
    projection_mode: ProjectionMode,
    /// Reversed: a world transform, not a head orientation.
    viewpoint: Viewpoint,
    fovx: f32,
    fovy: f32,
    z: f32,
    sar: f32,

    projection: Mat4,
    zoom: Mat4,
    view: Mat4,
    stereo: Mat3,
    orientation: Mat4,

    planes: Vec<PlaneTexture>,
    tex_coords_maps: Vec<Mat3>,
    last_crop: Option<Crop>,

    fov_recomputations: u64,
    tex_coords_recomputations: u64,
}

impl TransformState {
    pub fn new(projection_mode: ProjectionMode, orientation: Orientation, multiview: MultiviewMode) -> Self {
        let viewpoint = Viewpoint::default();
        let mut state = Self {
            projection_mode,
            viewpoint: viewpoint.reversed(),
            fovx: viewpoint.fov.to_radians(),
            fovy: 0.0,
            z: 0.0,
            sar: 1.0,
            projection: Mat4::IDENTITY,
            zoom: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            stereo: stereo_matrix(multiview),
            orientation: orientation_matrix(orientation),
            planes: Vec::new(),
            tex_coords_maps: Vec::new(),
            last_crop: None,
            fov_recomputations: 0,
            tex_coords_recomputations: 0,
        };
        state.update_fovy();
        state.update_z();
        state.update_viewpoint_matrices();
        state
    }

    /// Rejects out-of-range FOVs without touching any state.
    pub fn set_viewpoint(&mut self, viewpoint: &Viewpoint) -> Result<()> {
        if !viewpoint.fov_in_range() {
            return Err(RendererError::InvalidParameter(format!(
                "field of view {}° outside [{}°, {}°]",
                viewpoint.fov,
                FIELD_OF_VIEW_DEGREES_MIN,
                FIELD_OF_VIEW_DEGREES_MAX
            )));
        }

        let fovx = viewpoint.fov.to_radians();
        self.viewpoint = viewpoint.reversed();

        if (fovx - self.fovx).abs() >= FOV_EPSILON {
            self.fovx = fovx;
            self.update_fovy();
            self.update_z();
            self.fov_recomputations += 1;
        }
        self.update_viewpoint_matrices();
        Ok(())
    }

    pub fn set_window_aspect_ratio(&mut self, sar: f32) -> Result<()> {
        if !sar.is_finite() || sar <= 0.0 {
            return Err(RendererError::InvalidParameter(format!("window aspect ratio {sar}")));
        }
        self.sar = sar;
        self.update_fovy();
        self.update_z();
        self.fov_recomputations += 1;
        self.update_viewpoint_matrices();
        Ok(())
    }

    pub fn set_projection_mode(&mut self, projection_mode: ProjectionMode) {
        self.projection_mode = projection_mode;
        self.update_viewpoint_matrices();
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation_matrix(orientation);
    }

    pub fn set_multiview(&mut self, multiview: MultiviewMode) {
        self.stereo = stereo_matrix(multiview);
    }

    /// Replaces the plane layout; the next crop update always recomputes.
    pub fn set_planes(&mut self, planes: Vec<PlaneTexture>) {
        self.tex_coords_maps = vec![Mat3::IDENTITY; planes.len()];
        self.planes = planes;
        self.last_crop = None;
    }

    /// Maps picture coordinates onto the visible part of every plane.
    /// Returns whether anything was recomputed.
    pub fn update_tex_coords_map(&mut self, crop: Crop) -> bool {
        if self.last_crop == Some(crop) {
            return false;
        }

        for (map, plane) in self.tex_coords_maps.iter_mut().zip(&self.planes) {
            let scale_w = plane.width.as_f32() / plane.tex_width as f32;
            let scale_h = plane.height.as_f32() / plane.tex_height as f32;

            // Without NPOT support the texture is larger than the plane, so
            // right/bottom land between two texels and the outer one was
            // never uploaded.
            let left = crop.x_offset as f32 * scale_w;
            let top = crop.y_offset as f32 * scale_h;
            let right = (crop.x_offset as f32 + crop.width as f32) * scale_w;
            let bottom = (crop.y_offset as f32 + crop.height as f32) * scale_h;

            *map = Mat3::from_cols(
                Vec3::new(right - left, 0.0, 0.0),
                Vec3::new(0.0, bottom - top, 0.0),
                Vec3::new(left, top, 1.0),
            );
        }

        self.last_crop = Some(crop);
        self.tex_coords_recomputations += 1;
        debug!("texture coordinate maps recomputed for crop {crop:?}");
        true
    }

    fn update_fovy(&mut self) {
        self.fovy = 2.0 * ((self.fovx / 2.0).tan() / self.sar).atan();
    }

    /// Pulls the eye back at wide FOVs so the sphere fills the view
    /// without its outside showing.
    fn update_z(&mut self) {
        let tan_fovx_2 = (self.fovx / 2.0).tan();
        let tan_fovy_2 = (self.fovy / 2.0).tan();
        let z_min = -SPHERE_RADIUS / (tan_fovx_2 * tan_fovx_2 + tan_fovy_2 * tan_fovy_2).sqrt().atan().sin();

        let threshold = Z_THRESHOLD_DEGREES.to_radians();
        if self.fovx <= threshold {
            self.z = 0.0;
        } else {
            let f = z_min / (FIELD_OF_VIEW_DEGREES_MAX - Z_THRESHOLD_DEGREES).to_radians();
            self.z = (f * self.fovx - f * threshold).max(z_min);
        }
    }

    fn update_viewpoint_matrices(&mut self) {
        if self.projection_mode.is_spherical() {
            self.projection = Mat4::perspective_rh_gl(self.fovy, self.sar, Z_NEAR, Z_FAR);
            self.zoom = Mat4::from_translation(Vec3::new(0.0, 0.0, self.z));
            self.view = self.viewpoint.to_view_matrix();
        } else {
            self.projection = Mat4::IDENTITY;
            self.zoom = Mat4::IDENTITY;
            self.view = Mat4::IDENTITY;
        }
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn zoom(&self) -> Mat4 {
        self.zoom
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn stereo(&self) -> Mat3 {
        self.stereo
    }

    pub fn orientation(&self) -> Mat4 {
        self.orientation
    }

    pub fn tex_coords_maps(&self) -> &[Mat3] {
        &self.tex_coords_maps
    }

    pub fn projection_mode(&self) -> ProjectionMode {
        self.projection_mode
    }

    /// Horizontal and vertical FOV in radians.
    pub fn fov(&self) -> (f32, f32) {
        (self.fovx, self.fovy)
    }

    pub fn zoom_distance(&self) -> f32 {
        self.z
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.sar
    }

    pub fn fov_recomputations(&self) -> u64 {
        self.fov_recomputations
    }

    pub fn tex_coords_recomputations(&self) -> u64 {
        self.tex_coords_recomputations
    }
}

/// Crops picture coordinates to the left eye.
pub fn stereo_matrix(mode: MultiviewMode) -> Mat3 {
    match mode {
        MultiviewMode::Mono => Mat3::IDENTITY,
        MultiviewMode::StereoSideBySide => Mat3::from_diagonal(Vec3::new(0.5, 1.0, 1.0)),
        MultiviewMode::StereoTopBottom => Mat3::from_diagonal(Vec3::new(1.0, 0.5, 1.0)),
    }
}

/// Affine 2D transform of picture coordinates in `[0, 1]²`, in homogeneous
/// form so translations stay inside the unit square.
pub fn orientation_matrix(orientation: Orientation) -> Mat4 {
    #[rustfmt::skip]
    let cols: [f32; 16] = match orientation {
        Orientation::Normal => return Mat4::IDENTITY,
        Orientation::Rotated90 => [
            0.0, -1.0, 0.0, 0.0,
            1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 1.0, 0.0, 1.0,
        ],
        Orientation::Rotated180 => [
            -1.0, 0.0, 0.0, 0.0,
            0.0, -1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            1.0, 1.0, 0.0, 1.0,
        ],
        Orientation::Rotated270 => [
            0.0, 1.0, 0.0, 0.0,
            -1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            1.0, 0.0, 0.0, 1.0,
        ],
        Orientation::HFlipped => [
            -1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            1.0, 0.0, 0.0, 1.0,
        ],
        Orientation::VFlipped => [
            1.0, 0.0, 0.0, 0.0,
            0.0, -1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 1.0, 0.0, 1.0,
        ],
        Orientation::Transposed => [
            0.0, 1.0, 0.0, 0.0,
            1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, -1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ],
        Orientation::AntiTransposed => [
            0.0, -1.0, 0.0, 0.0,
            -1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, -1.0, 0.0,
            1.0, 1.0, 0.0, 1.0,
        ],
    };
    Mat4::from_cols_array(&cols)
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec4};

    use super::*;

    fn spherical() -> TransformState {
        TransformState::new(ProjectionMode::Equirectangular, Orientation::Normal, MultiviewMode::Mono)
    }

    fn snapshot(state: &TransformState) -> (Mat4, Mat4, Mat4, (f32, f32), f32) {
        (state.projection(), state.zoom(), state.view(), state.fov(), state.zoom_distance())
    }

    #[test]
    fn out_of_range_fov_leaves_state_untouched() {
        let mut state = spherical();
        state.set_viewpoint(&Viewpoint::new(30.0, 10.0, 0.0, 100.0)).unwrap();
        let before = snapshot(&state);
        let recomputed = state.fov_recomputations();

        let err = state.set_viewpoint(&Viewpoint::new(5.0, 5.0, 5.0, 200.0));
        assert!(matches!(err, Err(RendererError::InvalidParameter(_))));
        assert_eq!(snapshot(&state), before);
        assert_eq!(state.fov_recomputations(), recomputed);
    }

    #[test]
    fn tiny_fov_change_only_updates_view() {
        let mut state = spherical();
        state.set_viewpoint(&Viewpoint::new(0.0, 0.0, 0.0, 90.0)).unwrap();
        let recomputed = state.fov_recomputations();
        let (projection, zoom, view, fov, _) = snapshot(&state);

        state.set_viewpoint(&Viewpoint::new(15.0, 0.0, 0.0, 90.0001)).unwrap();
        assert_eq!(state.fov_recomputations(), recomputed);
        assert_eq!(state.fov(), fov);
        assert_eq!(state.projection(), projection);
        assert_eq!(state.zoom(), zoom);
        assert_ne!(state.view(), view);
    }

    #[test]
    fn fovy_follows_aspect_ratio() {
        let mut state = spherical();
        state.set_viewpoint(&Viewpoint::new(0.0, 0.0, 0.0, 90.0)).unwrap();
        state.set_window_aspect_ratio(2.0).unwrap();
        let (fovx, fovy) = state.fov();
        assert!((fovx - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!((fovy - 2.0 * (0.5f32).atan()).abs() < 1e-6);
    }

    #[test]
    fn bad_aspect_ratio_is_rejected() {
        let mut state = spherical();
        assert!(state.set_window_aspect_ratio(0.0).is_err());
        assert!(state.set_window_aspect_ratio(f32::NAN).is_err());
        assert!(state.set_window_aspect_ratio(-1.0).is_err());
        assert_eq!(state.aspect_ratio(), 1.0);
    }

    #[test]
    fn zoom_is_dynamic_only_above_ninety_degrees() {
        let mut state = spherical();
        state.set_window_aspect_ratio(16.0 / 9.0).unwrap();
        state.set_viewpoint(&Viewpoint::new(0.0, 0.0, 0.0, 80.0)).unwrap();
        assert_eq!(state.zoom_distance(), 0.0);

        state.set_viewpoint(&Viewpoint::new(0.0, 0.0, 0.0, 150.0)).unwrap();
        let z = state.zoom_distance();
        assert!(z < 0.0 && z >= -SPHERE_RADIUS * 2.0, "{z}");
        assert_eq!(state.zoom().w_axis.z, z);
    }

    #[test]
    fn flat_projection_ignores_viewpoint() {
        let mut state = TransformState::new(ProjectionMode::Rectangular, Orientation::Normal, MultiviewMode::Mono);
        state.set_viewpoint(&Viewpoint::new(45.0, 20.0, 10.0, 120.0)).unwrap();
        assert_eq!(state.projection(), Mat4::IDENTITY);
        assert_eq!(state.zoom(), Mat4::IDENTITY);
        assert_eq!(state.view(), Mat4::IDENTITY);

        state.set_projection_mode(ProjectionMode::CubemapStandard);
        assert_ne!(state.view(), Mat4::IDENTITY);
    }

    #[test]
    fn tex_coords_map_is_cached_per_crop() {
        let mut state = spherical();
        state.set_planes(vec![
            PlaneTexture { width: Ratio::ONE, height: Ratio::ONE, tex_width: 64, tex_height: 32 },
            PlaneTexture { width: Ratio::HALF, height: Ratio::HALF, tex_width: 32, tex_height: 16 },
        ]);
        let crop = Crop { x_offset: 8, y_offset: 4, width: 32, height: 16 };

        assert!(state.update_tex_coords_map(crop));
        let first = state.tex_coords_maps().to_vec();
        assert!(!state.update_tex_coords_map(crop));
        assert_eq!(state.tex_coords_maps(), first.as_slice());
        assert_eq!(state.tex_coords_recomputations(), 1);

        // picture (0,0) lands on the crop corner, (1,1) on its far corner
        let luma = first[0];
        let origin = luma * Vec3::new(0.0, 0.0, 1.0);
        let far = luma * Vec3::new(1.0, 1.0, 1.0);
        assert_eq!(Vec2::new(origin.x, origin.y), Vec2::new(8.0 / 64.0, 4.0 / 32.0));
        assert_eq!(Vec2::new(far.x, far.y), Vec2::new(40.0 / 64.0, 20.0 / 32.0));
        // chroma plane covers the same normalized window
        assert_eq!(first[1], luma);
    }

    #[test]
    fn stereo_crops_left_eye() {
        let sbs = stereo_matrix(MultiviewMode::StereoSideBySide) * Vec3::new(1.0, 1.0, 1.0);
        let tb = stereo_matrix(MultiviewMode::StereoTopBottom) * Vec3::new(1.0, 1.0, 1.0);
        assert_eq!(sbs, Vec3::new(0.5, 1.0, 1.0));
        assert_eq!(tb, Vec3::new(1.0, 0.5, 1.0));
    }

    #[test]
    fn orientations_keep_unit_square() {
        let corners = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0)];
        for orientation in [
            Orientation::Normal,
            Orientation::HFlipped,
            Orientation::VFlipped,
            Orientation::Rotated180,
            Orientation::Transposed,
            Orientation::AntiTransposed,
            Orientation::Rotated90,
            Orientation::Rotated270,
        ] {
            let m = orientation_matrix(orientation);
            for c in corners {
                let p = m * Vec4::new(c.x, c.y, 0.0, 1.0);
                assert!((0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y), "{orientation:?} {p:?}");
            }
        }
        let flipped = orientation_matrix(Orientation::HFlipped) * Vec4::new(0.25, 0.5, 0.0, 1.0);
        assert_eq!(flipped, Vec4::new(0.75, 0.5, 0.0, 1.0));
    }
}
