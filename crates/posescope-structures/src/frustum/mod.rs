//! Camera frustum proxies built from recorded intrinsics and poses.
//!
//! A [`FrustumView`] owns a renderer camera that reproduces the recorded
//! projection exactly, including an off-center principal point, plus a
//! wireframe proxy for display and picking and an optional image plane
//! carrying the reference photo.

mod image_plane;

pub use image_plane::ImagePlane;

use glam::{Mat4, Vec3};
use posescope_core::{ImageSize, NormalizedIntrinsics, ResolvedIntrinsics, Result, ViewerOptions};
use posescope_render::{Camera, CameraSnapshot, ViewOffset};

use crate::ray::{ray_segment_closest, Ray};

/// Default wireframe color (medium gray).
pub const FRUSTUM_COLOR: Vec3 = Vec3::new(0.267, 0.267, 0.267);

/// Color of the orientation triangle.
pub const FRUSTUM_UP_COLOR: Vec3 = Vec3::new(0.267, 0.267, 1.0);

/// A frustum proxy for one recorded camera.
#[derive(Debug, Clone)]
pub struct FrustumView {
    intrinsics: ResolvedIntrinsics,
    camera: Camera,
    image_plane: Option<ImagePlane>,
    snapshot: CameraSnapshot,

    // Wireframe in camera-local coordinates
    nodes: Vec<Vec3>,
    edges: Vec<[u32; 2]>,

    color: Vec3,
    up_color: Vec3,
    opacity: f32,
    scale: f32,
}

impl FrustumView {
    /// Builds the frustum camera for a recorded pose.
    ///
    /// `image` is the size of the loaded reference photo; pass `None` when
    /// it failed to load and the placeholder square from `options` is used
    /// without an image plane. An image with a zero side counts as missing.
    pub fn build(
        intrinsics: &NormalizedIntrinsics,
        camera_to_world: Mat4,
        image: Option<ImageSize>,
        options: &ViewerOptions,
    ) -> Result<Self> {
        let image = match image {
            Some(size) if size.is_empty() => {
                log::warn!(
                    "reference image is {}x{}, using placeholder",
                    size.width,
                    size.height
                );
                None
            }
            image => image,
        };
        let size = image.unwrap_or_else(|| ImageSize::square(options.placeholder_image_size));
        let resolved = intrinsics.resolve(size);

        let near = options.frustum_near;
        let mut camera = Camera::new(
            resolved.fov_degrees,
            resolved.aspect_ratio,
            near,
            near + options.frustum_depth,
        );
        let deviation = resolved.principal_offset();
        let (width, height) = (size.width as f32, size.height as f32);
        camera.set_view_offset(ViewOffset::shifted(width, height, -deviation.x, -deviation.y))?;
        camera.set_world_matrix(camera_to_world);

        let image_plane = image.map(|_| {
            ImagePlane::new(
                &resolved,
                near,
                options.image_plane_epsilon,
                options.image_plane_opacity,
            )
        });

        let (nodes, edges) = generate_wireframe(&camera);
        let snapshot = camera.snapshot();
        log::debug!(
            "frustum: {}x{} fov {:.3} offset ({:.1}, {:.1}) at {:?}",
            size.width,
            size.height,
            resolved.fov_degrees,
            -deviation.x,
            -deviation.y,
            snapshot.position
        );

        Ok(Self {
            intrinsics: resolved,
            camera,
            image_plane,
            snapshot,
            nodes,
            edges,
            color: FRUSTUM_COLOR,
            up_color: FRUSTUM_UP_COLOR,
            opacity: 1.0,
            scale: 1.0,
        })
    }

    /// Pixel-space intrinsics the camera was built from.
    #[must_use]
    pub fn intrinsics(&self) -> &ResolvedIntrinsics {
        &self.intrinsics
    }

    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable access to the camera. The snapshot is not affected.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    #[must_use]
    pub fn image_plane(&self) -> Option<&ImagePlane> {
        self.image_plane.as_ref()
    }

    pub fn image_plane_mut(&mut self) -> Option<&mut ImagePlane> {
        self.image_plane.as_mut()
    }

    /// Camera state frozen when the frustum was built.
    #[must_use]
    pub fn snapshot(&self) -> &CameraSnapshot {
        &self.snapshot
    }

    /// Wireframe vertices in the camera's local frame: apex, the four
    /// window corners (upper-left, upper-right, lower-left, lower-right),
    /// then the three vertices of the orientation triangle.
    #[must_use]
    pub fn local_nodes(&self) -> &[Vec3] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[[u32; 2]] {
        &self.edges
    }

    /// Transform of the proxy, including the hover scale.
    #[must_use]
    pub fn world_transform(&self) -> Mat4 {
        self.camera.world_matrix() * Mat4::from_scale(Vec3::splat(self.scale))
    }

    /// Wireframe vertices in world space.
    #[must_use]
    pub fn world_nodes(&self) -> Vec<Vec3> {
        let transform = self.world_transform();
        self.nodes.iter().map(|&n| transform.transform_point3(n)).collect()
    }

    #[must_use]
    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn set_color(&mut self, color: Vec3) -> &mut Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn up_color(&self) -> Vec3 {
        self.up_color
    }

    pub fn set_up_color(&mut self, color: Vec3) -> &mut Self {
        self.up_color = color;
        self
    }

    #[must_use]
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) -> &mut Self {
        self.opacity = opacity;
        self
    }

    /// Uniform scale applied to the proxy around the camera apex.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) -> &mut Self {
        self.scale = scale;
        self
    }

    /// Tests a pick ray against the wireframe edges. Returns the distance
    /// along the ray to the nearest edge passing within `threshold`.
    #[must_use]
    pub fn pick(&self, ray: &Ray, threshold: f32) -> Option<f32> {
        let nodes = self.world_nodes();
        self.edges
            .iter()
            .filter_map(|&[a, b]| ray_segment_closest(ray, nodes[a as usize], nodes[b as usize]))
            .filter(|&(_, distance)| distance <= threshold)
            .map(|(t, _)| t)
            .min_by(f32::total_cmp)
    }
}

/// Generates the frustum wireframe in camera-local coordinates.
///
/// The window corners come from the off-center projection so the outline
/// matches what the camera actually sees.
fn generate_wireframe(camera: &Camera) -> (Vec<Vec3>, Vec<[u32; 2]>) {
    let (left, right, bottom, top) = camera.window_bounds();
    let z = -camera.near;
    let width = right - left;
    let height = top - bottom;
    // Map window-normalized coordinates in [-1, 1] to the near plane.
    let at = |u: f32, v: f32| {
        Vec3::new(
            left + (u + 1.0) * 0.5 * width,
            bottom + (v + 1.0) * 0.5 * height,
            z,
        )
    };

    // Nodes: 0=apex, 1-4=corners, 5-7=triangle
    let nodes = vec![
        Vec3::ZERO,      // 0
        at(-1.0, 1.0),   // 1
        at(1.0, 1.0),    // 2
        at(-1.0, -1.0),  // 3
        at(1.0, -1.0),   // 4
        at(-0.7, 1.1),   // 5
        at(0.7, 1.1),    // 6
        at(0.0, 2.0),    // 7
    ];

    let edges = vec![
        // From apex to corners
        [0, 1],
        [0, 2],
        [0, 3],
        [0, 4],
        // Window rectangle
        [1, 2],
        [2, 4],
        [4, 3],
        [3, 1],
        // Orientation triangle
        [5, 6],
        [6, 7],
        [7, 5],
    ];

    (nodes, edges)
}
