//! Placed mesh models.

use glam::{Mat4, UVec3, Vec3};

use crate::ray::{ray_intersect_triangle, Ray};

/// Default mesh color (light gray).
pub const MESH_COLOR: Vec3 = Vec3::new(0.8, 0.8, 0.8);

/// Triangle geometry of one mesh in its local frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGeometry {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<UVec3>,
}

impl MeshGeometry {
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<UVec3>) -> Self {
        Self { vertices, triangles }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Local axis-aligned bounds, or `None` for an empty mesh.
    #[must_use]
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.vertices.first()?;
        Some(
            self.vertices
                .iter()
                .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
        )
    }
}

/// A mesh placed in the scene.
#[derive(Debug, Clone)]
pub struct MeshModel {
    name: String,
    source: String,
    geometry: MeshGeometry,
    transform: Mat4,
    color: Vec3,
    opacity: f32,
    hover_scale: f32,
}

impl MeshModel {
    /// Creates a model at the identity transform.
    pub fn new(name: impl Into<String>, source: impl Into<String>, geometry: MeshGeometry) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            geometry,
            transform: Mat4::IDENTITY,
            color: MESH_COLOR,
            opacity: 1.0,
            hover_scale: 1.0,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path or URL the geometry was loaded from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }

    /// Placement transform (without the hover scale).
    #[must_use]
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Mat4) -> &mut Self {
        self.transform = transform;
        self
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
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) -> &mut Self {
        self.opacity = opacity;
        self
    }

    /// Extra uniform scale applied in the mesh's local frame.
    #[must_use]
    pub fn hover_scale(&self) -> f32 {
        self.hover_scale
    }

    pub fn set_hover_scale(&mut self, scale: f32) -> &mut Self {
        self.hover_scale = scale;
        self
    }

    /// Transform actually used for display and picking.
    #[must_use]
    pub fn world_transform(&self) -> Mat4 {
        self.transform * Mat4::from_scale(Vec3::splat(self.hover_scale))
    }

    /// World-space axis-aligned bounds of the transformed vertices.
    #[must_use]
    pub fn world_bounds(&self) -> Option<(Vec3, Vec3)> {
        let transform = self.world_transform();
        let mut points = self.geometry.vertices.iter().map(|&v| transform.transform_point3(v));
        let first = points.next()?;
        Some(points.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    /// Tests a pick ray against the triangles. Returns the world-space
    /// distance along the ray of the closest hit.
    #[must_use]
    pub fn pick(&self, ray: &Ray) -> Option<f32> {
        let transform = self.world_transform();
        let local = ray.to_local(transform)?;
        let vertices = &self.geometry.vertices;
        self.geometry
            .triangles
            .iter()
            .filter_map(|tri| {
                let v0 = *vertices.get(tri.x as usize)?;
                let v1 = *vertices.get(tri.y as usize)?;
                let v2 = *vertices.get(tri.z as usize)?;
                let t = ray_intersect_triangle(&local, v0, v1, v2)?;
                Some(transform.transform_point3(local.at(t)).distance(ray.origin))
            })
            .min_by(f32::total_cmp)
    }
}

/// Merges several optional bounds into one.
#[must_use]
pub fn union_bounds(bounds: impl IntoIterator<Item = (Vec3, Vec3)>) -> Option<(Vec3, Vec3)> {
    bounds
        .into_iter()
        .reduce(|(lo_a, hi_a), (lo_b, hi_b)| (lo_a.min(lo_b), hi_a.max(hi_b)))
}
