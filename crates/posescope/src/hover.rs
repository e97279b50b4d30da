//! Hover highlighting with explicit save and restore.
//!
//! Highlighting a node overwrites its display properties, so the previous
//! values are saved when the highlight is applied and written back when it
//! is removed. At most one frustum and one mesh are highlighted at a time.

use glam::Vec3;

use crate::scene::{NodeId, SceneGraph};

/// Highlight color of a hovered frustum.
pub const FRUSTUM_HOVER_COLOR: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// Highlight color of a hovered mesh.
pub const MESH_HOVER_COLOR: Vec3 = Vec3::new(1.0, 1.0, 0.4);

/// Image plane opacity while its frustum is hovered.
pub const HOVER_IMAGE_PLANE_OPACITY: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
struct SavedFrustum {
    node: NodeId,
    color: Vec3,
    up_color: Vec3,
    opacity: f32,
    scale: f32,
    image_plane: Option<(Vec3, f32)>,
}

#[derive(Debug, Clone, PartialEq)]
struct SavedMesh {
    node: NodeId,
    color: Vec3,
    opacity: f32,
    hover_scale: f32,
}

/// Saved state of the currently highlighted frustum and mesh.
#[derive(Debug, Default)]
pub struct HoverStack {
    frustum: Option<SavedFrustum>,
    mesh: Option<SavedMesh>,
}

impl HoverStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The highlighted frustum proxy, if any.
    #[must_use]
    pub fn hovered_frustum(&self) -> Option<NodeId> {
        self.frustum.as_ref().map(|saved| saved.node)
    }

    /// The highlighted mesh, if any.
    #[must_use]
    pub fn hovered_mesh(&self) -> Option<NodeId> {
        self.mesh.as_ref().map(|saved| saved.node)
    }

    /// Highlights a frustum proxy, restoring any other highlighted frustum
    /// first. Does nothing if `node` is already highlighted.
    pub fn enter_frustum(&mut self, scene: &mut SceneGraph, node: NodeId, grow: f32) {
        if self.hovered_frustum() == Some(node) {
            return;
        }
        self.leave_frustum(scene);

        let Some(frustum) = scene.frustum_mut(node) else {
            return;
        };
        let saved = SavedFrustum {
            node,
            color: frustum.color(),
            up_color: frustum.up_color(),
            opacity: frustum.opacity(),
            scale: frustum.scale(),
            image_plane: frustum.image_plane().map(|plane| (plane.color(), plane.opacity())),
        };

        frustum
            .set_color(FRUSTUM_HOVER_COLOR)
            .set_up_color(FRUSTUM_HOVER_COLOR)
            .set_opacity(saved.opacity.max(1.0))
            .set_scale(saved.scale * grow);
        if let Some(plane) = frustum.image_plane_mut() {
            plane.set_opacity(HOVER_IMAGE_PLANE_OPACITY);
        }
        self.frustum = Some(saved);
    }

    /// Restores the highlighted frustum, if any.
    pub fn leave_frustum(&mut self, scene: &mut SceneGraph) {
        let Some(saved) = self.frustum.take() else {
            return;
        };
        // The node may have been removed with its scene.
        let Some(frustum) = scene.frustum_mut(saved.node) else {
            return;
        };
        frustum
            .set_color(saved.color)
            .set_up_color(saved.up_color)
            .set_opacity(saved.opacity)
            .set_scale(saved.scale);
        if let (Some(plane), Some((color, opacity))) = (frustum.image_plane_mut(), saved.image_plane) {
            plane.set_color(color);
            plane.set_opacity(opacity);
        }
    }

    /// Highlights a mesh, restoring any other highlighted mesh first.
    pub fn enter_mesh(&mut self, scene: &mut SceneGraph, node: NodeId, grow: f32) {
        if self.hovered_mesh() == Some(node) {
            return;
        }
        self.leave_mesh(scene);

        let Some(mesh) = scene.mesh_mut(node) else {
            return;
        };
        let saved = SavedMesh {
            node,
            color: mesh.color(),
            opacity: mesh.opacity(),
            hover_scale: mesh.hover_scale(),
        };
        mesh.set_color(MESH_HOVER_COLOR)
            .set_opacity(saved.opacity.max(1.0))
            .set_hover_scale(saved.hover_scale * grow);
        self.mesh = Some(saved);
    }

    /// Restores the highlighted mesh, if any.
    pub fn leave_mesh(&mut self, scene: &mut SceneGraph) {
        let Some(saved) = self.mesh.take() else {
            return;
        };
        let Some(mesh) = scene.mesh_mut(saved.node) else {
            return;
        };
        mesh.set_color(saved.color)
            .set_opacity(saved.opacity)
            .set_hover_scale(saved.hover_scale);
    }

    /// Restores everything.
    pub fn clear(&mut self, scene: &mut SceneGraph) {
        self.leave_frustum(scene);
        self.leave_mesh(scene);
    }

    /// Forgets saved state without touching the scene, for when the
    /// highlighted nodes have been removed.
    pub fn forget(&mut self) {
        self.frustum = None;
        self.mesh = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::NodeContent;
    use glam::Mat4;
    use posescope_core::{ImageSize, NormalizedIntrinsics, ViewerOptions};
    use posescope_structures::{FrustumView, MeshGeometry, MeshModel};

    fn frustum_scene() -> (SceneGraph, NodeId) {
        let mut scene = SceneGraph::new();
        let frustum = FrustumView::build(
            &NormalizedIntrinsics::new(0.8, 0.8, 0.5, 0.5),
            Mat4::IDENTITY,
            Some(ImageSize::new(640, 480)),
            &ViewerOptions::default(),
        )
        .unwrap();
        let id = scene.add_root("frustum", NodeContent::Frustum(frustum));
        (scene, id)
    }

    #[test]
    fn test_frustum_enter_and_leave_restores() {
        let (mut scene, id) = frustum_scene();
        scene.frustum_mut(id).unwrap().image_plane_mut().unwrap().set_opacity(0.8);
        let before = scene.frustum(id).unwrap().clone();

        let mut hover = HoverStack::new();
        hover.enter_frustum(&mut scene, id, 1.06);
        let hovered = scene.frustum(id).unwrap();
        assert_eq!(hovered.color(), FRUSTUM_HOVER_COLOR);
        assert!((hovered.scale() - 1.06).abs() < 1e-6);
        assert_eq!(hovered.image_plane().unwrap().opacity(), HOVER_IMAGE_PLANE_OPACITY);
        assert_eq!(hover.hovered_frustum(), Some(id));

        // Entering again does not compound the growth.
        hover.enter_frustum(&mut scene, id, 1.06);
        assert!((scene.frustum(id).unwrap().scale() - 1.06).abs() < 1e-6);

        hover.leave_frustum(&mut scene);
        let after = scene.frustum(id).unwrap();
        assert_eq!(after.color(), before.color());
        assert_eq!(after.scale(), before.scale());
        assert_eq!(after.image_plane().unwrap().opacity(), 0.8);
        assert_eq!(hover.hovered_frustum(), None);
    }

    #[test]
    fn test_mesh_switch_restores_previous() {
        let mut scene = SceneGraph::new();
        let a = scene.add_root("a", NodeContent::Mesh(MeshModel::new("a", "a.glb", MeshGeometry::default())));
        let b = scene.add_root("b", NodeContent::Mesh(MeshModel::new("b", "b.glb", MeshGeometry::default())));
        let original = scene.mesh(a).unwrap().color();

        let mut hover = HoverStack::new();
        hover.enter_mesh(&mut scene, a, 1.06);
        assert_eq!(scene.mesh(a).unwrap().color(), MESH_HOVER_COLOR);
        hover.enter_mesh(&mut scene, b, 1.06);
        assert_eq!(scene.mesh(a).unwrap().color(), original);
        assert_eq!(scene.mesh(a).unwrap().hover_scale(), 1.0);
        assert_eq!(scene.mesh(b).unwrap().color(), MESH_HOVER_COLOR);

        hover.clear(&mut scene);
        assert_eq!(scene.mesh(b).unwrap().color(), original);
        assert_eq!(hover.hovered_mesh(), None);
    }

    #[test]
    fn test_leave_after_removal_is_harmless() {
        let (mut scene, id) = frustum_scene();
        let mut hover = HoverStack::new();
        hover.enter_frustum(&mut scene, id, 1.06);
        scene.remove(id);
        hover.leave_frustum(&mut scene);
        assert_eq!(hover.hovered_frustum(), None);
    }
}
