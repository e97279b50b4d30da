//! Orbit-style camera controls.

use glam::{Quat, Vec3};

use crate::camera::Camera;

/// Orbits a camera around a target point, constrained to an up direction.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    /// Point the camera orbits around and looks at.
    pub target: Vec3,
    /// Up vector used for orbiting and looking.
    pub up: Vec3,
    /// Whether the camera spins around the target on its own.
    pub auto_rotate: bool,
    /// Auto-rotation speed; a full turn takes `60 / speed` seconds.
    pub auto_rotate_speed: f32,
    /// Closest allowed distance to the target.
    pub min_distance: f32,
    /// Farthest allowed distance to the target.
    pub max_distance: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            up: Vec3::Y,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            min_distance: 1.0,
            max_distance: 100.0,
        }
    }
}

impl OrbitControls {
    /// Creates controls looking at `target`.
    #[must_use]
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// Toggles auto-rotation and returns the new state.
    pub fn toggle_auto_rotate(&mut self) -> bool {
        self.auto_rotate = !self.auto_rotate;
        self.auto_rotate
    }

    /// Advances the controls by `dt` seconds: applies auto-rotation, clamps
    /// the orbit distance, and points the camera at the target.
    pub fn update(&mut self, camera: &mut Camera, dt: f32) {
        if self.auto_rotate {
            let angle = std::f32::consts::TAU / 60.0 * self.auto_rotate_speed * dt;
            self.rotate_about_up(camera, angle);
        }

        let offset = camera.position - self.target;
        let distance = offset.length();
        if distance > 1e-6 {
            let clamped = distance.clamp(self.min_distance, self.max_distance);
            if (clamped - distance).abs() > f32::EPSILON {
                camera.position = self.target + offset / distance * clamped;
            }
        }
        camera.look_at(self.target, self.up);
    }

    /// Orbits the camera around the target.
    pub fn orbit(&mut self, camera: &mut Camera, delta_x: f32, delta_y: f32) {
        self.rotate_about_up(camera, -delta_x);

        let offset = camera.position - self.target;
        let up = self.up.normalize_or_zero();
        let right = offset.cross(up).normalize_or_zero();
        if right == Vec3::ZERO {
            return;
        }
        // Keep away from the poles so the up vector stays meaningful.
        let polar = offset.normalize().dot(up).clamp(-1.0, 1.0).acos();
        let new_polar = (polar - delta_y).clamp(0.01, std::f32::consts::PI - 0.01);
        let rotation = Quat::from_axis_angle(right, polar - new_polar);
        camera.position = self.target + rotation * offset;
    }

    /// Pans camera and target together.
    pub fn pan(&mut self, camera: &mut Camera, delta_x: f32, delta_y: f32) {
        let forward = (self.target - camera.position).normalize_or_zero();
        let right = forward.cross(self.up).normalize_or_zero();
        let offset = right * delta_x + self.up * delta_y;
        camera.position += offset;
        self.target += offset;
    }

    /// Moves the camera toward (positive) or away from the target.
    pub fn zoom(&mut self, camera: &mut Camera, delta: f32) {
        let offset = camera.position - self.target;
        let distance = offset.length();
        if distance < 1e-6 {
            return;
        }
        let new_distance = (distance - delta).clamp(self.min_distance, self.max_distance);
        camera.position = self.target + offset / distance * new_distance;
    }

    fn rotate_about_up(&self, camera: &mut Camera, angle: f32) {
        let axis = self.up.normalize_or_zero();
        if axis == Vec3::ZERO {
            return;
        }
        let offset = camera.position - self.target;
        camera.position = self.target + Quat::from_axis_angle(axis, angle) * offset;
    }
}
