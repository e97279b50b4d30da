//! Perspective camera with an optional off-center view offset.

use glam::{Mat3, Mat4, Quat, Vec3, Vec4};
use posescope_core::{PosescopeError, Result};
use serde::{Deserialize, Serialize};

/// A sub-rectangle of a larger virtual image, used for off-center projection.
///
/// The camera renders the `width × height` window at (`offset_x`,
/// `offset_y`) of a `full_width × full_height` image. Shifting the window
/// moves the principal point away from the image centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewOffset {
    pub full_width: f32,
    pub full_height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewOffset {
    /// A view covering the whole `width × height` image with no shift.
    pub fn centered(width: f32, height: f32) -> Self {
        Self::shifted(width, height, 0.0, 0.0)
    }

    /// A full-size view shifted by (`offset_x`, `offset_y`).
    pub fn shifted(width: f32, height: f32, offset_x: f32, offset_y: f32) -> Self {
        Self {
            full_width: width,
            full_height: height,
            offset_x,
            offset_y,
            width,
            height,
        }
    }

    /// Checks that the offset can be applied to a projection.
    pub fn validate(&self) -> Result<()> {
        let values = [
            self.full_width,
            self.full_height,
            self.offset_x,
            self.offset_y,
            self.width,
            self.height,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(PosescopeError::InvalidViewOffset(format!(
                "non-finite component in {self:?}"
            )));
        }
        if self.full_width <= 0.0 || self.full_height <= 0.0 || self.width <= 0.0 || self.height <= 0.0
        {
            return Err(PosescopeError::InvalidViewOffset(format!(
                "non-positive size in {self:?}"
            )));
        }
        Ok(())
    }

    /// Rescales this offset into another full-size reference rectangle.
    ///
    /// Offsets scale proportionally (`offset × live / full`); the view window
    /// becomes the whole live rectangle.
    pub fn remap(&self, live_width: f32, live_height: f32) -> Self {
        Self::shifted(
            live_width,
            live_height,
            self.offset_x / self.full_width * live_width,
            self.offset_y / self.full_height * live_height,
        )
    }

    /// Same view with offsets rounded to whole pixels.
    pub fn rounded(&self) -> Self {
        Self {
            offset_x: self.offset_x.round(),
            offset_y: self.offset_y.round(),
            ..*self
        }
    }
}

/// Frozen camera state used as a transition endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSnapshot {
    pub position: Vec3,
    pub orientation: Quat,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub view: Option<ViewOffset>,
}

/// A perspective camera in renderer convention (looks down local -Z, +Y up).
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// World orientation.
    pub orientation: Quat,
    /// Scale decomposed from the world transform (normally one).
    pub scale: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Aspect ratio (width / height).
    pub aspect_ratio: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    view: Option<ViewOffset>,
}

impl Camera {
    /// Creates a camera at the origin looking down -Z.
    #[must_use]
    pub fn new(fov_degrees: f32, aspect_ratio: f32, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scale: Vec3::ONE,
            fov_degrees,
            aspect_ratio,
            near,
            far,
            view: None,
        }
    }

    /// Sets the view offset. Like the classic renderer API this also resets
    /// the aspect ratio to that of the full rectangle.
    pub fn set_view_offset(&mut self, view: ViewOffset) -> Result<()> {
        view.validate()?;
        self.aspect_ratio = view.full_width / view.full_height;
        self.view = Some(view);
        Ok(())
    }

    /// Removes the view offset.
    pub fn clear_view_offset(&mut self) {
        self.view = None;
    }

    /// Returns the current view offset.
    #[must_use]
    pub fn view_offset(&self) -> Option<ViewOffset> {
        self.view
    }

    /// Sets position, orientation, and scale from a world transform.
    pub fn set_world_matrix(&mut self, world: Mat4) {
        let (scale, orientation, position) = world.to_scale_rotation_translation();
        self.scale = scale;
        self.orientation = orientation.normalize();
        self.position = position;
    }

    /// Returns the camera's world transform.
    #[must_use]
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation, self.position)
    }

    /// Returns the view matrix (world to camera).
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.world_matrix().inverse()
    }

    /// Bounds `(left, right, bottom, top)` of the projection window on the
    /// near plane, honouring the view offset.
    #[must_use]
    pub fn window_bounds(&self) -> (f32, f32, f32, f32) {
        let mut top = self.near * (self.fov_degrees.to_radians() * 0.5).tan();
        let mut height = 2.0 * top;
        let mut width = self.aspect_ratio * height;
        let mut left = -0.5 * width;

        if let Some(view) = &self.view {
            left += view.offset_x * width / view.full_width;
            top -= view.offset_y * height / view.full_height;
            width *= view.width / view.full_width;
            height *= view.height / view.full_height;
        }

        (left, left + width, top - height, top)
    }

    /// Returns the projection matrix, honouring the view offset.
    ///
    /// Depth maps to [0, 1] like [`Mat4::perspective_rh`].
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        let (left, right, bottom, top) = self.window_bounds();
        off_axis_perspective_rh(left, right, bottom, top, self.near, self.far)
    }

    /// Returns the combined view-projection matrix.
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Returns the camera's forward direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        (self.orientation * Vec3::NEG_Z).normalize()
    }

    /// Returns the camera's up direction.
    #[must_use]
    pub fn up(&self) -> Vec3 {
        (self.orientation * Vec3::Y).normalize()
    }

    /// Orients the camera so it looks at `target`.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        if (target - self.position).length_squared() < 1e-12 {
            return;
        }
        let view = Mat4::look_at_rh(self.position, target, up);
        self.orientation = Quat::from_mat3(&Mat3::from_mat4(view)).inverse().normalize();
    }

    /// Captures position, orientation, field of view, and view offset.
    #[must_use]
    pub fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot {
            position: self.position,
            orientation: self.orientation,
            fov_degrees: self.fov_degrees,
            view: self.view,
        }
    }

    /// World-space corners of the projection window extended to `distance`
    /// along the view axis, ordered upper-left, upper-right, lower-left,
    /// lower-right.
    ///
    /// Computed from the window bounds rather than by unprojecting, so it
    /// stays exact for the paper-thin depth ranges frustum proxies use.
    #[must_use]
    pub fn frustum_corners(&self, distance: f32) -> [Vec3; 4] {
        let (left, right, bottom, top) = self.window_bounds();
        let s = distance / self.near;
        let world = self.world_matrix();
        [(left, top), (right, top), (left, bottom), (right, bottom)]
            .map(|(x, y)| world.transform_point3(Vec3::new(x * s, y * s, -distance)))
    }
}

/// Off-center right-handed perspective projection with [0, 1] depth.
fn off_axis_perspective_rh(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let x = 2.0 * near / (right - left);
    let y = 2.0 * near / (top - bottom);
    let a = (right + left) / (right - left);
    let b = (top + bottom) / (top - bottom);
    let c = far / (near - far);
    let d = near * far / (near - far);
    Mat4::from_cols(
        Vec4::new(x, 0.0, 0.0, 0.0),
        Vec4::new(0.0, y, 0.0, 0.0),
        Vec4::new(a, b, c, -1.0),
        Vec4::new(0.0, 0.0, d, 0.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_projection_matches_glam() {
        let camera = Camera::new(60.0, 1.5, 0.1, 100.0);
        let expected = Mat4::perspective_rh(60f32.to_radians(), 1.5, 0.1, 100.0);
        assert!(camera.projection_matrix().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_zero_view_offset_is_identity_shift() {
        let mut camera = Camera::new(50.0, 4.0 / 3.0, 0.5, 10.0);
        let plain = camera.projection_matrix();
        camera.set_view_offset(ViewOffset::centered(1024.0, 768.0)).unwrap();
        assert!(camera.projection_matrix().abs_diff_eq(plain, 1e-5));
    }

    #[test]
    fn test_view_offset_shifts_principal_point() {
        let mut camera = Camera::new(50.0, 1.0, 0.5, 10.0);
        // Principal point 100 px right of centre -> window shifted left.
        camera
            .set_view_offset(ViewOffset::shifted(1000.0, 1000.0, -100.0, 0.0))
            .unwrap();
        let projected = camera.projection_matrix() * Vec4::new(0.0, 0.0, -1.0, 1.0);
        let ndc_x = projected.x / projected.w;
        // 100 px of a 1000 px image is 0.2 in NDC.
        assert!((ndc_x - 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_set_view_offset_updates_aspect() {
        let mut camera = Camera::new(50.0, 1.0, 0.5, 10.0);
        camera.set_view_offset(ViewOffset::centered(800.0, 400.0)).unwrap();
        assert_eq!(camera.aspect_ratio, 2.0);
    }

    #[test]
    fn test_invalid_view_offset_is_rejected() {
        let mut camera = Camera::new(50.0, 1.0, 0.5, 10.0);
        assert!(camera.set_view_offset(ViewOffset::centered(0.0, 400.0)).is_err());
        let nan = ViewOffset::shifted(10.0, 10.0, f32::NAN, 0.0);
        assert!(camera.set_view_offset(nan).is_err());
        assert!(camera.view_offset().is_none());
    }

    #[test]
    fn test_remap_view_offset() {
        let stored = ViewOffset::shifted(1024.0, 768.0, -64.0, 32.0);
        let mapped = stored.remap(512.0, 384.0);
        assert_eq!(mapped.offset_x, -32.0);
        assert_eq!(mapped.offset_y, 16.0);
        assert_eq!(mapped.full_width, 512.0);
        assert_eq!(mapped.width, 512.0);
    }

    #[test]
    fn test_world_matrix_round_trip() {
        let mut camera = Camera::new(45.0, 1.0, 0.1, 10.0);
        let world = Mat4::from_rotation_translation(
            Quat::from_rotation_y(0.7) * Quat::from_rotation_x(-0.2),
            Vec3::new(1.0, 2.0, 3.0),
        );
        camera.set_world_matrix(world);
        assert!(camera.world_matrix().abs_diff_eq(world, 1e-5));
        assert!((camera.position - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
    }

    #[test]
    fn test_look_at() {
        let mut camera = Camera::new(45.0, 1.0, 0.1, 10.0);
        camera.position = Vec3::new(0.0, 0.0, 5.0);
        camera.look_at(Vec3::ZERO, Vec3::Y);
        assert!((camera.forward() - Vec3::NEG_Z).length() < 1e-5);
        assert!((camera.up() - Vec3::Y).length() < 1e-5);

        camera.position = Vec3::new(3.0, 3.0, 3.0);
        camera.look_at(Vec3::new(0.0, 1.0, 0.0), Vec3::Y);
        let expected = (Vec3::new(0.0, 1.0, 0.0) - camera.position).normalize();
        assert!((camera.forward() - expected).length() < 1e-5);
    }

    #[test]
    fn test_frustum_corners_lie_on_near_plane() {
        let mut camera = Camera::new(90.0, 1.0, 1.0, 10.0);
        camera.position = Vec3::new(0.0, 0.0, 2.0);
        let corners = camera.frustum_corners(1.0);
        for c in corners {
            assert!((c.z - 1.0).abs() < 1e-4);
            // tan(45°) * near = 1
            assert!((c.x.abs() - 1.0).abs() < 1e-4);
            assert!((c.y.abs() - 1.0).abs() < 1e-4);
        }
        assert!(corners[0].x < 0.0 && corners[0].y > 0.0);
    }
}
