// viewpoint.rs — head orientation and field of view for 360° projections

use glam::Mat4;
use serde::{Deserialize, Serialize};

pub const FIELD_OF_VIEW_DEGREES_MIN: f32 = 20.0;
pub const FIELD_OF_VIEW_DEGREES_MAX: f32 = 150.0;
pub const FIELD_OF_VIEW_DEGREES_DEFAULT: f32 = 80.0;

/// Angles in degrees. `fov` is the horizontal field of view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub fov: f32,
}

impl Default for Viewpoint {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            fov: FIELD_OF_VIEW_DEGREES_DEFAULT,
        }
    }
}

impl Viewpoint {
    pub fn new(yaw: f32, pitch: f32, roll: f32, fov: f32) -> Self {
        Self { yaw, pitch, roll, fov }
    }

    pub fn fov_in_range(&self) -> bool {
        (FIELD_OF_VIEW_DEGREES_MIN..=FIELD_OF_VIEW_DEGREES_MAX).contains(&self.fov)
    }

    /// The inverse rotation: moving the head right turns the world left.
    pub fn reversed(&self) -> Viewpoint {
        Viewpoint {
            yaw: -self.yaw,
            pitch: -self.pitch,
            roll: -self.roll,
            fov: self.fov,
        }
    }

    /// World-to-eye rotation for this (already reversed) viewpoint.
    ///
    /// At zero yaw the eye faces the middle of an equirectangular picture.
    pub fn to_view_matrix(&self) -> Mat4 {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();
        let roll = self.roll.to_radians();

        Mat4::from_rotation_z(roll)
            * Mat4::from_rotation_x(pitch)
            * Mat4::from_rotation_y(-yaw - std::f32::consts::FRAC_PI_2)
    }

    /// Pans by a cursor drag of `dx` x `dy` pixels over a `width` x `height`
    /// viewport so the picture follows the pointer.
    pub fn dragged(&self, dx: f32, dy: f32, width: f32, height: f32, sensitivity: f32) -> Viewpoint {
        if width <= 0.0 || height <= 0.0 {
            return *self;
        }
        let h_f = self.fov.to_radians();
        let aspect = width / height;
        let v_f = 2.0 * ((h_f / 2.0).tan() / aspect).atan();

        let yaw_per_px_deg = (h_f / width).to_degrees();
        let pitch_per_px_deg = (v_f / height).to_degrees();

        Viewpoint {
            yaw: self.yaw - dx * yaw_per_px_deg * sensitivity,
            pitch: (self.pitch + dy * pitch_per_px_deg * sensitivity).clamp(-90.0, 90.0),
            ..*self
        }
    }

    /// Narrows or widens the field of view by a wheel step, within range.
    pub fn zoomed(&self, scroll: f32) -> Viewpoint {
        Viewpoint {
            fov: (self.fov - scroll * 2.5).clamp(FIELD_OF_VIEW_DEGREES_MIN, FIELD_OF_VIEW_DEGREES_MAX),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn forward(view: Mat4) -> Vec3 {
        // the eye looks down -z; pull that back into world space
        view.inverse().transform_vector3(Vec3::NEG_Z)
    }

    #[test]
    fn default_is_in_range() {
        assert!(Viewpoint::default().fov_in_range());
        assert!(!Viewpoint::new(0.0, 0.0, 0.0, 200.0).fov_in_range());
        assert!(!Viewpoint::new(0.0, 0.0, 0.0, 19.9).fov_in_range());
    }

    #[test]
    fn zero_yaw_faces_picture_center() {
        // u = 0.5 on the sphere is longitude pi, i.e. world -x
        let dir = forward(Viewpoint::default().reversed().to_view_matrix());
        assert!((dir - Vec3::NEG_X).length() < 1e-5, "{dir:?}");
    }

    #[test]
    fn positive_yaw_turns_right() {
        let dir = forward(Viewpoint::new(90.0, 0.0, 0.0, 80.0).reversed().to_view_matrix());
        assert!((dir - Vec3::NEG_Z).length() < 1e-5, "{dir:?}");
    }

    #[test]
    fn positive_pitch_looks_up() {
        let dir = forward(Viewpoint::new(0.0, 45.0, 0.0, 80.0).reversed().to_view_matrix());
        assert!(dir.y > 0.5, "{dir:?}");
    }

    #[test]
    fn drag_clamps_pitch_and_zoom_clamps_fov() {
        let vp = Viewpoint::default().dragged(0.0, 100_000.0, 800.0, 600.0, 1.0);
        assert_eq!(vp.pitch, 90.0);
        assert_eq!(Viewpoint::default().zoomed(1000.0).fov, FIELD_OF_VIEW_DEGREES_MIN);
        assert_eq!(Viewpoint::default().zoomed(-1000.0).fov, FIELD_OF_VIEW_DEGREES_MAX);
    }
}
