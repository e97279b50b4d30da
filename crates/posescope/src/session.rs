//! The viewer session: everything one viewer instance owns.

use std::time::{Duration, Instant};

use glam::{Mat4, UVec3, Vec3};
use posescope_core::ViewerOptions;
use posescope_render::{
    Camera, CameraAnimator, CameraSnapshot, CameraTransition, OrbitControls, TransitionStatus,
    ViewOffset,
};
use posescope_structures::{MeshGeometry, MeshModel};

use crate::hover::HoverStack;
use crate::scene::{NodeContent, NodeId, NodeMeta, SceneGraph};

/// Side length of the ground plane.
pub const GROUND_SIZE: f32 = 10.0;

/// Extra delay after a default-view transition before the orbit target is
/// moved to the model centre.
const ORBIT_RESET_DELAY: Duration = Duration::from_millis(50);

/// Orbit target reset scheduled after a transition to the default view.
#[derive(Debug, Clone, Copy)]
struct OrbitReset {
    token: u64,
    at: Instant,
    end: CameraSnapshot,
    target: Vec3,
}

/// State of one viewer: scene, live camera, controls, and in-flight work.
///
/// Scene loads and camera transitions are each guarded by a token owned
/// here; see [`crate::loader`] and [`posescope_render::animation`].
#[derive(Debug)]
pub struct ViewerSession {
    pub(crate) options: ViewerOptions,
    pub(crate) scene: SceneGraph,
    pub(crate) camera: Camera,
    pub(crate) controls: OrbitControls,
    pub(crate) hover: HoverStack,
    animator: CameraAnimator,
    transition: Option<CameraTransition>,
    pending_reset: Option<OrbitReset>,
    pub(crate) frustums: Vec<NodeId>,
    pub(crate) current_model: Option<NodeId>,
    ground: NodeId,
    grid: NodeId,
    pub(crate) load_token: u64,
    viewport: (u32, u32),
    last_frame: Option<Instant>,
}

impl ViewerSession {
    /// Creates a session rendering into a `width × height` viewport.
    pub fn new(options: ViewerOptions, width: u32, height: u32) -> Self {
        let aspect = if height > 0 {
            width as f32 / height as f32
        } else {
            1.0
        };
        let view = options.default_view;
        let mut camera = Camera::new(view.fov_degrees, aspect, 0.1, 1000.0);
        camera.position = view.position;

        let mut controls = OrbitControls::new(view.target);
        controls.auto_rotate_speed = options.auto_rotate_speed;
        controls.update(&mut camera, 0.0);

        let mut scene = SceneGraph::new();
        let mut ground_mesh = MeshModel::new("ground", "", ground_geometry());
        ground_mesh
            .set_color(Vec3::ONE)
            .set_opacity(0.5)
            .set_transform(Mat4::from_translation(Vec3::Y * options.ground_height));
        let ground = scene.add_root("ground", NodeContent::Mesh(ground_mesh));
        scene.set_meta(
            ground,
            NodeMeta {
                ground: true,
                ..NodeMeta::default()
            },
        );
        let grid = scene.add_root(
            "grid",
            NodeContent::Grid {
                height: options.grid_height,
            },
        );

        Self {
            options,
            scene,
            camera,
            controls,
            hover: HoverStack::new(),
            animator: CameraAnimator::new(),
            transition: None,
            pending_reset: None,
            frustums: Vec::new(),
            current_model: None,
            ground,
            grid,
            load_token: 0,
            viewport: (width, height),
            last_frame: None,
        }
    }

    #[must_use]
    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    #[must_use]
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// The live camera.
    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    #[must_use]
    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut OrbitControls {
        &mut self.controls
    }

    #[must_use]
    pub fn hover(&self) -> &HoverStack {
        &self.hover
    }

    /// Pickable frustum proxies of the current scene, in load order.
    #[must_use]
    pub fn frustums(&self) -> &[NodeId] {
        &self.frustums
    }

    /// The current model: a mesh for single-object scenes, a group of
    /// meshes for multi-object scenes.
    #[must_use]
    pub fn current_model(&self) -> Option<NodeId> {
        self.current_model
    }

    /// Token of the most recent scene load.
    #[must_use]
    pub fn load_token(&self) -> u64 {
        self.load_token
    }

    /// Viewport size in pixels.
    #[must_use]
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    #[must_use]
    pub fn ground(&self) -> NodeId {
        self.ground
    }

    #[must_use]
    pub fn ground_height(&self) -> f32 {
        self.scene
            .mesh(self.ground)
            .map_or(self.options.ground_height, |mesh| mesh.transform().w_axis.y)
    }

    #[must_use]
    pub fn grid_height(&self) -> f32 {
        match self.scene.get(self.grid).map(|node| &node.content) {
            Some(NodeContent::Grid { height }) => *height,
            _ => self.options.grid_height,
        }
    }

    /// Whether a camera transition is in flight.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    /// Resizes the viewport; the live camera keeps its view offset.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        if height > 0 {
            self.camera.aspect_ratio = width as f32 / height as f32;
        }
    }

    /// Toggles auto-rotation and returns the new state.
    pub fn toggle_auto_rotate(&mut self) -> bool {
        let enabled = self.controls.toggle_auto_rotate();
        log::debug!("auto-rotate {}", if enabled { "on" } else { "off" });
        enabled
    }

    /// Moves ground and grid to match a scene scale.
    pub fn set_ground_scale(&mut self, scale: f32) {
        if let Some(ground) = self.scene.mesh_mut(self.ground) {
            ground.set_transform(Mat4::from_translation(
                Vec3::Y * (self.options.ground_height * scale),
            ));
        }
        if let Some(node) = self.scene.get_mut(self.grid) {
            node.content = NodeContent::Grid {
                height: self.options.grid_height * scale,
            };
        }
    }

    /// Centre of the current model's bounds, or the default orbit target
    /// when there is no model.
    #[must_use]
    pub fn model_center(&self) -> Vec3 {
        self.current_model
            .and_then(|model| self.scene.subtree_bounds(model))
            .map_or(self.options.default_view.target, |(lo, hi)| (lo + hi) * 0.5)
    }

    /// Starts a transition from the live camera to `end`, superseding any
    /// in-flight one. Returns its token.
    pub fn start_transition(
        &mut self,
        end: CameraSnapshot,
        target_view: Option<ViewOffset>,
        now: Instant,
    ) -> u64 {
        let live_size = (self.viewport.0 as f32, self.viewport.1 as f32);
        let transition = self.animator.start(
            self.camera.snapshot(),
            end,
            self.options.transition_duration,
            target_view,
            live_size,
            now,
        );
        let token = transition.token();
        self.transition = Some(transition);
        token
    }

    /// Transitions to the frozen pose of a frustum, reproducing its view
    /// offset. Returns `None` if `proxy` is not a frustum.
    pub fn transition_to_frustum(&mut self, proxy: NodeId, now: Instant) -> Option<u64> {
        let snapshot = *self.scene.frustum(proxy)?.snapshot();
        log::debug!("transition to frustum {}", proxy.raw());
        Some(self.start_transition(snapshot, snapshot.view, now))
    }

    /// Transitions to the default orbit pose looking at the model centre.
    /// Once the transition has had time to finish, the orbit target is
    /// moved to that centre.
    pub fn transition_to_default_view(&mut self, now: Instant) -> u64 {
        let view = self.options.default_view;
        let target = self.model_center();

        let mut aim = Camera::new(view.fov_degrees, self.camera.aspect_ratio, 0.1, 1000.0);
        aim.position = view.position;
        aim.look_at(target, Vec3::Y);
        let end = CameraSnapshot {
            view: None,
            ..aim.snapshot()
        };

        let token = self.start_transition(end, None, now);
        let duration = Duration::try_from_secs_f32(self.options.transition_duration).unwrap_or_default();
        self.pending_reset = Some(OrbitReset {
            token,
            at: now + duration + ORBIT_RESET_DELAY,
            end,
            target,
        });
        token
    }

    /// Advances the session to `now`: steps the camera transition, applies
    /// a due orbit reset, and updates the orbit controls.
    pub fn frame(&mut self, now: Instant) -> Option<TransitionStatus> {
        let dt = self
            .last_frame
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32());
        self.last_frame = Some(now);

        let status = self.transition.as_ref().map(|transition| {
            self.animator
                .tick(transition, now, &mut self.camera, &mut self.controls)
        });
        if !matches!(status, Some(TransitionStatus::Running(_)) | None) {
            self.transition = None;
        }

        if let Some(reset) = self.pending_reset {
            if reset.token != self.animator.current_token() {
                self.pending_reset = None;
            } else if now >= reset.at {
                self.camera.position = reset.end.position;
                self.camera.orientation = reset.end.orientation;
                self.camera.fov_degrees = reset.end.fov_degrees;
                self.controls.target = reset.target;
                self.controls.up = Vec3::Y;
                self.pending_reset = None;
            }
        }

        self.controls.update(&mut self.camera, dt);
        status
    }

    /// Removes the current model, all frustum proxies with their cameras
    /// and image planes, and any camera nodes left behind.
    pub(crate) fn clear_scene(&mut self) {
        self.hover.clear(&mut self.scene);
        self.hover.forget();

        if let Some(model) = self.current_model.take() {
            self.scene.remove(model);
        }
        for proxy in std::mem::take(&mut self.frustums) {
            self.scene.remove(proxy);
        }
        let loose: Vec<NodeId> = self
            .scene
            .iter()
            .filter(|(_, node)| {
                matches!(
                    node.content,
                    NodeContent::FrustumCamera { .. } | NodeContent::ImagePlane { .. }
                )
            })
            .map(|(id, _)| id)
            .collect();
        for id in loose {
            self.scene.remove(id);
        }
    }
}

/// A flat `GROUND_SIZE` square in the XZ plane.
fn ground_geometry() -> MeshGeometry {
    let h = GROUND_SIZE / 2.0;
    MeshGeometry::new(
        vec![
            Vec3::new(-h, 0.0, -h),
            Vec3::new(h, 0.0, -h),
            Vec3::new(h, 0.0, h),
            Vec3::new(-h, 0.0, h),
        ],
        vec![UVec3::new(0, 1, 2), UVec3::new(0, 2, 3)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_in_default_view() {
        let session = ViewerSession::new(ViewerOptions::default(), 800, 600);
        assert_eq!(session.camera().position, Vec3::new(3.0, 3.0, 3.0));
        let expected = (Vec3::new(0.0, 1.0, 0.0) - session.camera().position).normalize();
        assert!((session.camera().forward() - expected).length() < 1e-5);
        assert!((session.camera().aspect_ratio - 800.0 / 600.0).abs() < 1e-6);
        assert!((session.ground_height() - -0.5).abs() < 1e-6);
        assert!((session.grid_height() - -0.49).abs() < 1e-6);
        assert!(session.frustums().is_empty());
        assert_eq!(session.load_token(), 0);
    }

    #[test]
    fn test_resize_updates_aspect() {
        let mut session = ViewerSession::new(ViewerOptions::default(), 800, 600);
        session.resize(1000, 500);
        assert_eq!(session.viewport(), (1000, 500));
        assert_eq!(session.camera().aspect_ratio, 2.0);
        session.resize(1000, 0);
        assert_eq!(session.camera().aspect_ratio, 2.0);
    }

    #[test]
    fn test_ground_follows_scale() {
        let mut session = ViewerSession::new(ViewerOptions::default(), 800, 600);
        session.set_ground_scale(2.0);
        assert!((session.ground_height() - -1.0).abs() < 1e-6);
        assert!((session.grid_height() - -0.98).abs() < 1e-6);
    }

    #[test]
    fn test_default_view_transition_resets_orbit_target() {
        let mut session = ViewerSession::new(ViewerOptions::default(), 800, 600);
        session.camera_mut().position = Vec3::new(-4.0, 2.0, 1.0);
        let t0 = Instant::now();
        session.transition_to_default_view(t0);
        assert!(session.is_animating());

        session.frame(t0 + Duration::from_millis(400));
        assert!(session.is_animating());
        assert_eq!(
            session.frame(t0 + Duration::from_millis(820)),
            Some(TransitionStatus::Finished)
        );
        assert!(!session.is_animating());

        session.frame(t0 + Duration::from_millis(900));
        assert!((session.controls().target - session.model_center()).length() < 1e-5);
        assert!((session.camera().position - Vec3::new(3.0, 3.0, 3.0)).length() < 1e-4);
        assert_eq!(session.camera().fov_degrees, 75.0);
    }

    #[test]
    fn test_superseded_reset_is_dropped() {
        let mut session = ViewerSession::new(ViewerOptions::default(), 800, 600);
        let t0 = Instant::now();
        session.transition_to_default_view(t0);
        let end = CameraSnapshot {
            position: Vec3::new(0.0, 0.0, 8.0),
            ..session.camera().snapshot()
        };
        session.start_transition(end, None, t0 + Duration::from_millis(100));
        session.frame(t0 + Duration::from_secs(2));
        // The later transition's end state stands; no reset pulled it back.
        assert!((session.camera().position - Vec3::new(0.0, 0.0, 8.0)).length() < 1e-3);
    }
}
