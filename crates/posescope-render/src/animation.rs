//! Eased, cancellable camera transitions.
//!
//! A [`CameraAnimator`] owns a token counter. Every transition it starts
//! captures the token current at that moment; ticking a transition whose
//! token has since been superseded does nothing. Starting a new transition
//! is therefore the way to cancel the previous one.

use std::time::{Duration, Instant};

use glam::Vec3;

use crate::camera::{Camera, CameraSnapshot, ViewOffset};
use crate::controls::OrbitControls;

/// Ease-in-out cubic curve on `[0, 1]`.
#[must_use]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Result of advancing a transition by one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionStatus {
    /// A newer transition has started; nothing was touched.
    Stale,
    /// Still in flight, with the eased progress applied this frame.
    Running(f32),
    /// The camera was snapped to the end state.
    Finished,
}

/// One camera transition, also serving as the handle checked against the
/// animator's current token.
#[derive(Debug, Clone)]
pub struct CameraTransition {
    token: u64,
    start: CameraSnapshot,
    end: CameraSnapshot,
    duration: Duration,
    started_at: Instant,
    live_size: (f32, f32),
    mapped_target: Option<ViewOffset>,
}

impl CameraTransition {
    /// Token this transition was started with.
    #[must_use]
    pub fn token(&self) -> u64 {
        self.token
    }

    #[must_use]
    pub fn start_state(&self) -> &CameraSnapshot {
        &self.start
    }

    #[must_use]
    pub fn end_state(&self) -> &CameraSnapshot {
        &self.end
    }

    /// Target view offset rescaled into the live output size, if any.
    #[must_use]
    pub fn mapped_target_view(&self) -> Option<ViewOffset> {
        self.mapped_target
    }

    /// Raw progress in `[0, 1]` at `now`.
    #[must_use]
    pub fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    /// View offset the transition starts from: the camera's own, or a
    /// centred view of the live output.
    fn original_view(&self) -> ViewOffset {
        self.start
            .view
            .unwrap_or_else(|| ViewOffset::centered(self.live_size.0, self.live_size.1))
    }

    fn apply_view(camera: &mut Camera, view: ViewOffset) {
        if let Err(err) = camera.set_view_offset(view.rounded()) {
            log::debug!("ignoring view offset {view:?}: {err}");
        }
    }

    fn apply_pose(camera: &mut Camera, controls: &mut OrbitControls, state: &CameraSnapshot) {
        camera.position = state.position;
        camera.orientation = state.orientation;
        camera.fov_degrees = state.fov_degrees;
        controls.up = (state.orientation * Vec3::Y).normalize();
        controls.target = state.position + (state.orientation * Vec3::NEG_Z).normalize();
    }

    fn frame(&self, now: Instant, camera: &mut Camera, controls: &mut OrbitControls) -> TransitionStatus {
        let t = self.progress(now);
        if t >= 1.0 {
            self.finish(camera, controls);
            return TransitionStatus::Finished;
        }

        let eased = ease_in_out_cubic(t);
        let state = CameraSnapshot {
            position: self.start.position.lerp(self.end.position, eased),
            orientation: self.start.orientation.slerp(self.end.orientation, eased).normalize(),
            fov_degrees: lerp(self.start.fov_degrees, self.end.fov_degrees, eased),
            view: None,
        };
        Self::apply_pose(camera, controls, &state);

        if let Some(target) = self.mapped_target {
            let original = self.original_view();
            let view = ViewOffset::shifted(
                target.full_width,
                target.full_height,
                lerp(original.offset_x, target.offset_x, eased),
                lerp(original.offset_y, target.offset_y, eased),
            );
            Self::apply_view(camera, view);
        }
        TransitionStatus::Running(eased)
    }

    fn finish(&self, camera: &mut Camera, controls: &mut OrbitControls) {
        Self::apply_pose(camera, controls, &self.end);
        let view = self.mapped_target.unwrap_or_else(|| self.original_view());
        Self::apply_view(camera, view);
    }
}

/// Issues transitions and tracks which one is current.
#[derive(Debug, Default)]
pub struct CameraAnimator {
    current_token: u64,
}

impl CameraAnimator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Token of the most recently started transition.
    #[must_use]
    pub fn current_token(&self) -> u64 {
        self.current_token
    }

    /// Starts a transition, superseding any in-flight one.
    ///
    /// `target_view` is the stored view offset to reproduce at the end; it
    /// is remapped proportionally into `live_size` (the renderer's output
    /// size in pixels). Without a target the start view is restored when
    /// the transition finishes, or a centred view of `live_size` if the
    /// camera had none.
    pub fn start(
        &mut self,
        start: CameraSnapshot,
        end: CameraSnapshot,
        duration_secs: f32,
        target_view: Option<ViewOffset>,
        live_size: (f32, f32),
        now: Instant,
    ) -> CameraTransition {
        self.current_token += 1;
        let live_size = (live_size.0.round(), live_size.1.round());
        let mapped_target = target_view
            .filter(|view| view.full_width > 0.0 && view.full_height > 0.0)
            .map(|view| view.remap(live_size.0, live_size.1));
        CameraTransition {
            token: self.current_token,
            start,
            end,
            duration: Duration::try_from_secs_f32(duration_secs).unwrap_or(Duration::ZERO),
            started_at: now,
            live_size,
            mapped_target,
        }
    }

    /// Supersedes any in-flight transition without starting a new one.
    pub fn cancel(&mut self) {
        self.current_token += 1;
    }

    /// Whether `transition` is still the current one.
    #[must_use]
    pub fn is_current(&self, transition: &CameraTransition) -> bool {
        transition.token == self.current_token
    }

    /// Advances `transition` to `now`, writing into the camera and controls.
    pub fn tick(
        &self,
        transition: &CameraTransition,
        now: Instant,
        camera: &mut Camera,
        controls: &mut OrbitControls,
    ) -> TransitionStatus {
        if !self.is_current(transition) {
            return TransitionStatus::Stale;
        }
        transition.frame(now, camera, controls)
    }
}
