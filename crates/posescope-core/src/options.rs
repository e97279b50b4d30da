//! Configuration options for the viewer.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Global configuration options for a viewer session.
///
/// Every field has a default, so a partial JSON document only overrides what
/// it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerOptions {
    /// Duration of a double-click camera transition, in seconds.
    pub transition_duration: f32,

    /// Side length used for the frustum when the reference photo fails to load.
    pub placeholder_image_size: u32,

    /// Near plane of a frustum camera.
    pub frustum_near: f32,

    /// Distance between a frustum camera's near and far planes.
    pub frustum_depth: f32,

    /// How far in front of the near plane the image plane sits.
    pub image_plane_epsilon: f32,

    /// Opacity of the image plane.
    pub image_plane_opacity: f32,

    /// Ray-to-line distance under which a frustum edge counts as hit.
    pub line_pick_threshold: f32,

    /// Orbit pose restored by double-clicking a mesh.
    pub default_view: DefaultView,

    /// Auto-rotation speed of the orbit controls (a full turn takes 60/speed seconds).
    pub auto_rotate_speed: f32,

    /// Ground plane height for a unit-scale scene.
    pub ground_height: f32,

    /// Grid helper height for a unit-scale scene.
    pub grid_height: f32,

    /// Scale multiplier applied to hovered frustums and meshes.
    pub hover_grow: f32,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            transition_duration: 0.8,
            placeholder_image_size: 1024,
            frustum_near: 0.5,
            frustum_depth: 1e-6,
            image_plane_epsilon: 1e-4,
            image_plane_opacity: 0.5,
            line_pick_threshold: 0.1,
            default_view: DefaultView::default(),
            auto_rotate_speed: 3.5,
            ground_height: -0.5,
            grid_height: -0.49,
            hover_grow: 1.06,
        }
    }
}

impl ViewerOptions {
    /// Parses options from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads options from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// The free-orbit pose the viewer starts in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultView {
    /// Camera position.
    pub position: Vec3,
    /// Orbit target used when no model is loaded.
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
}

impl Default for DefaultView {
    fn default() -> Self {
        Self {
            position: Vec3::new(3.0, 3.0, 3.0),
            target: Vec3::new(0.0, 1.0, 0.0),
            fov_degrees: 75.0,
        }
    }
}
