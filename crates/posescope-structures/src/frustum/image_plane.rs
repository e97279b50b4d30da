use glam::{Mat4, Vec2, Vec3};
use posescope_core::ResolvedIntrinsics;

/// The reference photo shown just in front of a frustum's near plane.
///
/// Lives in the frustum camera's local frame: centred on the principal ray
/// and shifted so the photo lines up with the off-center projection window.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlane {
    size: Vec2,
    local_position: Vec3,
    opacity: f32,
    color: Vec3,
    double_sided: bool,
}

impl ImagePlane {
    /// Sizes and positions the plane for the given intrinsics.
    ///
    /// `near` is the frustum's near distance; `epsilon` moves the plane
    /// towards the camera so it does not coincide with the near rectangle.
    pub fn new(intrinsics: &ResolvedIntrinsics, near: f32, epsilon: f32, opacity: f32) -> Self {
        let height = 2.0 * (intrinsics.fov_degrees.to_radians() / 2.0).tan() * near;
        let width = height * intrinsics.aspect_ratio;
        let deviation = intrinsics.principal_offset();
        let dx = deviation.x * width / intrinsics.size.width as f32;
        let dy = deviation.y * height / intrinsics.size.height as f32;
        Self {
            size: Vec2::new(width, height),
            local_position: Vec3::new(-dx, dy, -near + epsilon),
            opacity,
            color: Vec3::ONE,
            double_sided: true,
        }
    }

    /// Width and height in camera-local units.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Centre of the plane in the camera's local frame.
    #[must_use]
    pub fn local_position(&self) -> Vec3 {
        self.local_position
    }

    #[must_use]
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity;
    }

    /// Tint multiplied into the photo.
    #[must_use]
    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    #[must_use]
    pub fn is_double_sided(&self) -> bool {
        self.double_sided
    }

    /// Always true; lets pickers skip image planes when testing meshes.
    #[must_use]
    pub fn is_image_plane(&self) -> bool {
        true
    }

    /// Local transform relative to the owning camera.
    #[must_use]
    pub fn local_transform(&self) -> Mat4 {
        Mat4::from_translation(self.local_position)
    }

    /// Corners in the camera's local frame: upper-left, upper-right,
    /// lower-left, lower-right.
    #[must_use]
    pub fn local_corners(&self) -> [Vec3; 4] {
        let half = self.size * 0.5;
        let c = self.local_position;
        [
            c + Vec3::new(-half.x, half.y, 0.0),
            c + Vec3::new(half.x, half.y, 0.0),
            c + Vec3::new(-half.x, -half.y, 0.0),
            c + Vec3::new(half.x, -half.y, 0.0),
        ]
    }
}
