//! Pointer and keyboard handling for [`ViewerSession`].

use std::time::Instant;

use glam::{Vec2, Vec3, Vec4};
use posescope_core::{PickKind, PickResult};
use posescope_structures::Ray;

use crate::scene::NodeId;
use crate::session::ViewerSession;

/// Keys the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Other,
}

impl Key {
    /// Maps a DOM-style key code (`"Space"`, `"KeyA"`, ...) to a [`Key`].
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "Space" => Self::Space,
            _ => Self::Other,
        }
    }
}

/// What a double-click did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DoubleClickAction {
    /// Started a transition into the frustum's recorded pose.
    Frustum(NodeId),
    /// Started a transition to the default orbit pose around `target`.
    DefaultView { target: Vec3 },
    /// Nothing was hit.
    None,
}

impl ViewerSession {
    /// Builds a world-space ray through a pixel of the viewport.
    #[must_use]
    pub fn screen_ray(&self, pos: Vec2) -> Option<Ray> {
        let (width, height) = self.viewport();
        if width == 0 || height == 0 {
            return None;
        }

        let half_width = width as f32 / 2.0;
        let half_height = height as f32 / 2.0;
        let ndc_x = (pos.x / half_width) - 1.0;
        let ndc_y = 1.0 - (pos.y / half_height);

        let inv_view_proj = self.camera.view_projection_matrix().inverse();

        // NDC depth [0, 1]
        let near = inv_view_proj * Vec4::new(ndc_x, ndc_y, 0.0, 1.0);
        let far = inv_view_proj * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);

        if near.w.abs() < 1e-6 || far.w.abs() < 1e-6 {
            return None;
        }

        let origin = near.truncate() / near.w;
        let ray_far = far.truncate() / far.w;
        Ray::new(origin, ray_far - origin)
    }

    /// Nearest frustum proxy along `ray`, resolved to its clickable owner.
    #[must_use]
    pub fn pick_frustum(&self, ray: &Ray) -> Option<PickResult> {
        let threshold = self.options.line_pick_threshold;
        self.frustums
            .iter()
            .filter_map(|&id| {
                let t = self.scene.frustum(id)?.pick(ray, threshold)?;
                let owner = self.scene.clickable_owner(id).unwrap_or(id);
                Some(PickResult::new(PickKind::Frustum, owner.raw(), ray.at(t), t))
            })
            .fold(None, |best, hit| PickResult::nearest(best, Some(hit)))
    }

    /// Nearest mesh along `ray`. Image planes never count; the ground only
    /// when `include_ground` is set.
    #[must_use]
    pub fn pick_mesh(&self, ray: &Ray, include_ground: bool) -> Option<PickResult> {
        self.scene
            .mesh_ids()
            .filter(|&id| {
                let meta = self.scene.meta(id);
                !meta.image_plane && (include_ground || !meta.ground)
            })
            .filter_map(|id| {
                let t = self.scene.mesh(id)?.pick(ray)?;
                Some(PickResult::new(PickKind::Mesh, id.raw(), ray.at(t), t))
            })
            .fold(None, |best, hit| PickResult::nearest(best, Some(hit)))
    }

    /// Updates hover highlighting for a pointer at `pos`. A frustum under
    /// the pointer takes priority over meshes; returns what is hovered.
    pub fn pointer_move(&mut self, pos: Vec2) -> Option<PickResult> {
        let Some(ray) = self.screen_ray(pos) else {
            self.hover.clear(&mut self.scene);
            return None;
        };
        let grow = self.options.hover_grow;

        if let Some(hit) = self.pick_frustum(&ray) {
            self.hover.leave_mesh(&mut self.scene);
            self.hover
                .enter_frustum(&mut self.scene, NodeId::from_raw(hit.node), grow);
            return Some(hit);
        }
        self.hover.leave_frustum(&mut self.scene);

        if let Some(hit) = self.pick_mesh(&ray, false) {
            self.hover
                .enter_mesh(&mut self.scene, NodeId::from_raw(hit.node), grow);
            return Some(hit);
        }
        self.hover.leave_mesh(&mut self.scene);
        None
    }

    /// The pointer left the viewport. Only the frustum highlight is
    /// dropped; a highlighted mesh stays until the next move.
    pub fn pointer_leave(&mut self) {
        self.hover.leave_frustum(&mut self.scene);
    }

    /// Handles a double-click at `pos`. Stops auto-rotation, then
    /// transitions into a clicked frustum or, failing that, to the default
    /// view if any mesh (ground included) was hit.
    pub fn double_click(&mut self, pos: Vec2, now: Instant) -> DoubleClickAction {
        self.controls.auto_rotate = false;
        let Some(ray) = self.screen_ray(pos) else {
            return DoubleClickAction::None;
        };

        if let Some(hit) = self.pick_frustum(&ray) {
            let proxy = NodeId::from_raw(hit.node);
            if self.transition_to_frustum(proxy, now).is_some() {
                return DoubleClickAction::Frustum(proxy);
            }
        }

        if self.pick_mesh(&ray, true).is_some() {
            let target = self.model_center();
            self.transition_to_default_view(now);
            return DoubleClickAction::DefaultView { target };
        }
        DoubleClickAction::None
    }

    /// Handles a key press. Returns whether the key was used.
    pub fn key_down(&mut self, key: Key) -> bool {
        match key {
            Key::Space => {
                self.toggle_auto_rotate();
                true
            }
            Key::Other => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posescope_core::ViewerOptions;

    #[test]
    fn test_key_codes() {
        assert_eq!(Key::from_code("Space"), Key::Space);
        assert_eq!(Key::from_code("KeyA"), Key::Other);
    }

    #[test]
    fn test_space_toggles_auto_rotate() {
        let mut session = ViewerSession::new(ViewerOptions::default(), 800, 600);
        assert!(!session.controls().auto_rotate);
        assert!(session.key_down(Key::Space));
        assert!(session.controls().auto_rotate);
        assert!(!session.key_down(Key::Other));
        assert!(session.controls().auto_rotate);
    }

    #[test]
    fn test_center_ray_points_forward() {
        let session = ViewerSession::new(ViewerOptions::default(), 800, 600);
        let ray = session.screen_ray(Vec2::new(400.0, 300.0)).unwrap();
        assert!((ray.direction - session.camera().forward()).length() < 1e-4);
    }

    #[test]
    fn test_zero_viewport_has_no_ray() {
        let session = ViewerSession::new(ViewerOptions::default(), 0, 0);
        assert!(session.screen_ray(Vec2::ZERO).is_none());
    }

    #[test]
    fn test_ground_hit_on_double_click_resets_view() {
        let mut session = ViewerSession::new(ViewerOptions::default(), 800, 600);
        session.controls_mut().auto_rotate = true;
        // Straight down from the default pose lands on the ground plane.
        session.camera_mut().look_at(Vec3::new(0.0, -0.5, 0.0), Vec3::Y);
        let action = session.double_click(Vec2::new(400.0, 300.0), Instant::now());
        assert_eq!(
            action,
            DoubleClickAction::DefaultView {
                target: Vec3::new(0.0, 1.0, 0.0)
            }
        );
        assert!(!session.controls().auto_rotate);
        assert!(session.is_animating());
    }

    #[test]
    fn test_ground_is_not_hovered() {
        let mut session = ViewerSession::new(ViewerOptions::default(), 800, 600);
        session.camera_mut().look_at(Vec3::new(0.0, -0.5, 0.0), Vec3::Y);
        assert!(session.pointer_move(Vec2::new(400.0, 300.0)).is_none());
        assert_eq!(session.hover().hovered_mesh(), None);
    }
}
