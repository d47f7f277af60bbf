//! Parallax camera constrained to a small viewing volume
//!
//! The camera never leaves a sphere of radius [`HALF_BASELINE`] around the
//! origin and always looks at [`LOOK_AT`]. Updates are pure functions that
//! take a camera value and return the next one.

use glam::{Mat3, Mat4, Quat, Vec3};

/// Vertical field of view in degrees
pub const FOV_Y_DEGREES: f32 = 72.0;
/// Near clipping plane
pub const NEAR: f32 = 0.1;
/// Far clipping plane
pub const FAR: f32 = 10000.0;
/// Diameter of the viewing volume
pub const BASELINE: f32 = 0.7;
/// Maximum distance of the camera from the origin
pub const HALF_BASELINE: f32 = BASELINE / 2.0;
/// Fixed point the camera is oriented toward
pub const LOOK_AT: Vec3 = Vec3::new(0.0, 0.0, -2.0);
/// Camera Z displacement per wheel delta unit
pub const WHEEL_SPEED: f32 = 0.005;

/// Camera state for the layer viewer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParallaxCamera {
    position: Vec3,
    /// Rotation from camera space to world space
    orientation: Quat,
    /// Aspect ratio (width/height) for projection
    aspect: f32,
}

impl ParallaxCamera {
    /// Camera at the origin looking at [`LOOK_AT`]
    pub fn new(aspect: f32) -> Self {
        Self::at(Vec3::ZERO, aspect)
    }

    /// Camera at `position` (clamped into the viewing volume), oriented to the target
    pub fn at(position: Vec3, aspect: f32) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
            aspect: sanitize_aspect(aspect),
        }
        .constrained()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Unit vector the camera is looking along
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    /// Same camera with the aspect ratio of a `width` x `height` viewport
    pub fn with_aspect(self, width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return self;
        }
        Self {
            aspect: width as f32 / height as f32,
            ..self
        }
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position).inverse()
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), self.aspect, NEAR, FAR)
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Clamp into the viewing volume and re-orient toward the target
    fn constrained(self) -> Self {
        let position = self.position.clamp_length_max(HALF_BASELINE);
        Self {
            position,
            orientation: look_rotation(position, LOOK_AT),
            ..self
        }
    }
}

impl Default for ParallaxCamera {
    fn default() -> Self {
        Self::new(16.0 / 9.0)
    }
}

/// Move the camera along Z by a wheel delta (positive = scroll down = backward)
pub fn apply_wheel(camera: ParallaxCamera, delta_y: f32) -> ParallaxCamera {
    let mut position = camera.position;
    position.z += delta_y * WHEEL_SPEED;
    ParallaxCamera { position, ..camera }.constrained()
}

/// Place the camera from a pointer position normalised to `[0, 1]` on both axes.
///
/// Pointer right moves the camera left and pointer down moves it up, which
/// reads as the scene shifting with the pointer. Z is left untouched.
pub fn apply_pointer(camera: ParallaxCamera, x: f32, y: f32) -> ParallaxCamera {
    let position = Vec3::new(
        -HALF_BASELINE * (2.0 * x - 1.0),
        HALF_BASELINE * (2.0 * y - 1.0),
        camera.position.z,
    );
    ParallaxCamera { position, ..camera }.constrained()
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}

/// Rotation whose -Z axis points from `eye` to `target` with +Y kept up
fn look_rotation(eye: Vec3, target: Vec3) -> Quat {
    let forward = (target - eye).normalize();
    let right = forward.cross(Vec3::Y).normalize();
    let up = right.cross(forward);
    Quat::from_mat3(&Mat3::from_cols(right, up, -forward))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn assert_looks_at_target(camera: &ParallaxCamera) {
        let expected = (LOOK_AT - camera.position()).normalize();
        assert!(
            camera.forward().abs_diff_eq(expected, EPSILON),
            "forward {:?} != {:?}",
            camera.forward(),
            expected
        );
    }

    #[test]
    fn test_initial_camera() {
        let camera = ParallaxCamera::new(2.0);
        assert_eq!(camera.position(), Vec3::ZERO);
        assert!(camera.forward().abs_diff_eq(Vec3::NEG_Z, EPSILON));
        assert_eq!(camera.aspect(), 2.0);
    }

    #[test]
    fn test_pointer_center_is_origin() {
        let camera = apply_pointer(ParallaxCamera::default(), 0.5, 0.5);
        assert!(camera.position().abs_diff_eq(Vec3::ZERO, EPSILON));
        assert_looks_at_target(&camera);
    }

    #[test]
    fn test_pointer_corner_is_clamped_to_sphere() {
        let camera = apply_pointer(ParallaxCamera::default(), 0.0, 0.0);
        let expected = Vec3::new(
            HALF_BASELINE / 2f32.sqrt(),
            -HALF_BASELINE / 2f32.sqrt(),
            0.0,
        );
        assert!(camera.position().abs_diff_eq(expected, EPSILON));
        assert!((camera.position().length() - HALF_BASELINE).abs() < EPSILON);
        assert_looks_at_target(&camera);
    }

    #[test]
    fn test_pointer_axes() {
        let right = apply_pointer(ParallaxCamera::default(), 0.75, 0.5);
        assert!(right.position().x < 0.0);
        assert!(right.position().y.abs() < EPSILON);

        let bottom = apply_pointer(ParallaxCamera::default(), 0.5, 0.75);
        assert!(bottom.position().y > 0.0);
        assert!(bottom.position().x.abs() < EPSILON);
    }

    #[test]
    fn test_wheel_moves_along_z() {
        let camera = apply_wheel(ParallaxCamera::default(), 20.0);
        assert!(camera.position().abs_diff_eq(Vec3::new(0.0, 0.0, 0.1), EPSILON));
        assert_looks_at_target(&camera);

        let camera = apply_wheel(camera, -40.0);
        assert!(camera.position().abs_diff_eq(Vec3::new(0.0, 0.0, -0.1), EPSILON));
    }

    #[test]
    fn test_wheel_is_clamped() {
        let camera = apply_wheel(ParallaxCamera::default(), 10_000.0);
        assert!((camera.position().z - HALF_BASELINE).abs() < EPSILON);

        let camera = apply_wheel(camera, -1_000_000.0);
        assert!((camera.position().z + HALF_BASELINE).abs() < EPSILON);
        assert_looks_at_target(&camera);
    }

    #[test]
    fn test_radius_bound_under_adversarial_input() {
        let mut camera = ParallaxCamera::default();
        let inputs = [
            (-50.0, 3.0, 1e6),
            (1e9, -1e9, -1e6),
            (0.0, 1.0, 0.0),
            (1.0, 0.0, 250.0),
            (-3.0, 4.0, -7.5),
        ];
        for (x, y, wheel) in inputs {
            camera = apply_pointer(camera, x, y);
            assert!(camera.position().length() <= HALF_BASELINE + EPSILON);
            camera = apply_wheel(camera, wheel);
            assert!(camera.position().length() <= HALF_BASELINE + EPSILON);
            assert_looks_at_target(&camera);
        }
    }

    #[test]
    fn test_wheel_depth_shares_radius_with_pointer() {
        let camera = apply_wheel(ParallaxCamera::default(), 60.0);
        assert!((camera.position().z - 0.3).abs() < EPSILON);

        let camera = apply_pointer(camera, 1.0, 0.5);
        let position = camera.position();
        assert!((position.length() - HALF_BASELINE).abs() < EPSILON);
        assert!(position.z < 0.3);
    }

    #[test]
    fn test_with_aspect() {
        let camera = ParallaxCamera::default().with_aspect(1920, 1080);
        assert!((camera.aspect() - 16.0 / 9.0).abs() < EPSILON);

        let unchanged = camera.with_aspect(0, 600);
        assert_eq!(unchanged.aspect(), camera.aspect());
    }

    #[test]
    fn test_view_matrix_matches_look_at() {
        let camera = apply_pointer(ParallaxCamera::default(), 0.2, 0.9);
        let expected = Mat4::look_at_rh(camera.position(), LOOK_AT, Vec3::Y);
        assert!(camera.view_matrix().abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let camera = apply_pointer(ParallaxCamera::default(), 0.9, 0.1);
        let clip = camera.view_projection_matrix() * LOOK_AT.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4);
        assert!(ndc.y.abs() < 1e-4);
    }
}
