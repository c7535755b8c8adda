//! First-person camera driven by mouse deltas and fixed movement steps

use glam::{Mat4, Vec3};

use crate::core::config::CameraConfig;
use crate::gpu::Viewport;

/// Pitch is kept strictly inside the poles so the view never flips.
pub const PITCH_LIMIT_DEGREES: f32 = 89.0;
/// Vertical field of view
pub const FIELD_OF_VIEW_DEGREES: f32 = 60.0;
/// Near clipping plane
pub const NEAR_PLANE: f32 = 1.0;
/// Far clipping plane
pub const FAR_PLANE: f32 = 1.0e10;

/// Discrete movement steps a key press or repeat produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementKind {
    Forward,
    Backward,
    StrafeLeft,
    StrafeRight,
}

/// Perspective camera with a yaw/pitch orientation model.
///
/// Angles are in degrees and accumulate without wrapping. The view
/// direction is recomputed from them after every mouse delta.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Eye position in world space
    pub eye: Vec3,
    view_direction: Vec3,
    up: Vec3,
    yaw: f32,
    pitch: f32,
    sensitivity: f32,
}

impl Camera {
    /// Create a camera.
    ///
    /// `view_direction` and `up` are normalised; `pitch` is clamped.
    #[must_use]
    pub fn new(
        eye: Vec3,
        view_direction: Vec3,
        up: Vec3,
        yaw: f32,
        pitch: f32,
        sensitivity: f32,
    ) -> Self {
        Self {
            eye,
            view_direction: view_direction.normalize_or(Vec3::NEG_Z),
            up: up.normalize_or(Vec3::Y),
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT_DEGREES, PITCH_LIMIT_DEGREES),
            sensitivity,
        }
    }

    /// Create a camera from its configuration section.
    #[must_use]
    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(
            config.eye,
            config.view_direction,
            config.up,
            config.yaw,
            config.pitch,
            config.sensitivity,
        )
    }

    /// Unit vector the camera looks along.
    #[must_use]
    pub fn view_direction(&self) -> Vec3 {
        self.view_direction
    }

    /// Unit up vector
    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Yaw in degrees
    #[must_use]
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Pitch in degrees
    #[must_use]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    #[must_use]
    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// Turn the camera by a mouse delta, in raw device units.
    ///
    /// Positive `dy` pitches up.
    pub fn apply_mouse_delta(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch = (self.pitch + dy * self.sensitivity)
            .clamp(-PITCH_LIMIT_DEGREES, PITCH_LIMIT_DEGREES);

        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.view_direction = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
    }

    /// Move the eye by one fixed step of `speed` world units.
    pub fn apply_movement_step(&mut self, kind: MovementKind, speed: f32) {
        match kind {
            MovementKind::Forward => self.eye += self.view_direction * speed,
            MovementKind::Backward => self.eye -= self.view_direction * speed,
            MovementKind::StrafeLeft => self.eye -= self.right() * speed,
            MovementKind::StrafeRight => self.eye += self.right() * speed,
        }
    }

    /// Get the right vector
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.view_direction.cross(self.up).normalize_or_zero()
    }

    /// Get the view matrix
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.eye + self.view_direction, self.up)
    }

    /// Projection for a viewport, aspect = width / height.
    #[must_use]
    pub fn projection_matrix(&self, viewport: Viewport) -> Mat4 {
        Mat4::perspective_rh(
            FIELD_OF_VIEW_DEGREES.to_radians(),
            viewport.aspect_ratio(),
            NEAR_PLANE,
            FAR_PLANE,
        )
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_camera() -> Camera {
        Camera::new(
            Vec3::new(0.0, 0.0, 3.0),
            Vec3::NEG_Z,
            Vec3::Y,
            -90.0,
            0.0,
            0.1,
        )
    }

    #[test]
    fn test_yaw_delta() {
        let mut camera = reference_camera();
        camera.apply_mouse_delta(100.0, 0.0);

        assert!((camera.yaw() + 80.0).abs() < 1e-4);
        let expected = Vec3::new((-80.0f32).to_radians().cos(), 0.0, (-80.0f32).to_radians().sin())
            .normalize();
        assert!(camera.view_direction().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_pitch_clamps_at_limit() {
        let mut camera = reference_camera();
        camera.apply_mouse_delta(0.0, 20_000.0);
        assert_eq!(camera.pitch(), PITCH_LIMIT_DEGREES);

        camera.apply_mouse_delta(0.0, -50_000.0);
        assert_eq!(camera.pitch(), -PITCH_LIMIT_DEGREES);
    }

    #[test]
    fn test_direction_stays_unit_and_pitch_bounded() {
        let mut camera = reference_camera();
        let deltas = [
            (13.0, 900.0),
            (-4000.0, -3.5),
            (0.25, -2000.0),
            (77777.0, 12.0),
            (-1.0, 1.0),
        ];
        for (dx, dy) in deltas.iter().cycle().take(50) {
            camera.apply_mouse_delta(*dx, *dy);
            assert!((camera.view_direction().length() - 1.0).abs() < 1e-5);
            assert!(camera.pitch().abs() <= PITCH_LIMIT_DEGREES);
        }
    }

    #[test]
    fn test_yaw_accumulates_without_wrapping() {
        let mut camera = reference_camera();
        for _ in 0..10 {
            camera.apply_mouse_delta(1000.0, 0.0);
        }
        assert!((camera.yaw() - 910.0).abs() < 1e-3);
    }

    #[test]
    fn test_movement_steps() {
        let mut camera = reference_camera();

        camera.apply_movement_step(MovementKind::Forward, 0.2);
        assert!(camera.eye.abs_diff_eq(Vec3::new(0.0, 0.0, 2.8), 1e-6));

        camera.apply_movement_step(MovementKind::Backward, 0.2);
        assert!(camera.eye.abs_diff_eq(Vec3::new(0.0, 0.0, 3.0), 1e-6));

        // Looking down -Z with +Y up, right is +X.
        camera.apply_movement_step(MovementKind::StrafeRight, 0.5);
        assert!(camera.eye.abs_diff_eq(Vec3::new(0.5, 0.0, 3.0), 1e-6));

        camera.apply_movement_step(MovementKind::StrafeLeft, 1.0);
        assert!(camera.eye.abs_diff_eq(Vec3::new(-0.5, 0.0, 3.0), 1e-6));
    }

    #[test]
    fn test_view_matrix_looks_along_direction() {
        let camera = reference_camera();
        let view = camera.view_matrix();
        // A point straight ahead ends up on the -Z axis in view space.
        let ahead = view.transform_point3(Vec3::new(0.0, 0.0, 0.0));
        assert!(ahead.abs_diff_eq(Vec3::new(0.0, 0.0, -3.0), 1e-5));
    }

    #[test]
    fn test_projection_uses_viewport_aspect() {
        let camera = reference_camera();
        let wide = camera.projection_matrix(Viewport::new(1280, 720));
        let square = camera.projection_matrix(Viewport::new(720, 720));

        assert!((wide.y_axis.y - square.y_axis.y).abs() < 1e-6);
        assert!((square.x_axis.x / wide.x_axis.x - 1280.0 / 720.0).abs() < 1e-4);
    }
}
