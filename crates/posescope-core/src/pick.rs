//! Picking results.

use glam::Vec3;

/// What kind of scene object a pick ray hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickKind {
    /// A frustum proxy.
    Frustum,
    /// A mesh of the current model.
    Mesh,
}

/// Result of a pick/selection operation.
#[derive(Debug, Clone, PartialEq)]
pub struct PickResult {
    /// The kind of object that was picked.
    pub kind: PickKind,

    /// Raw id of the picked scene node (the clickable owner, not a child).
    pub node: u64,

    /// The world position of the pick point.
    pub world_position: Vec3,

    /// Distance along the pick ray.
    pub depth: f32,
}

impl PickResult {
    /// Creates a new pick result.
    pub fn new(kind: PickKind, node: u64, world_position: Vec3, depth: f32) -> Self {
        Self {
            kind,
            node,
            world_position,
            depth,
        }
    }

    /// Keeps whichever of two optional hits is closer to the ray origin.
    pub fn nearest(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if b.depth < a.depth { b } else { a }),
            (a, b) => a.or(b),
        }
    }
}
