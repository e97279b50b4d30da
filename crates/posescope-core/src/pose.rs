//! Pose resolution: stored extrinsics to renderer camera-to-world transforms.
//!
//! Two layouts exist:
//!
//! - Single-object scenes store one world-to-camera extrinsic. The camera
//!   pose is its inverse, converted with [`opencv_c2w_to_gl`].
//! - Multi-object scenes store, per object, an `original` and a `new`
//!   extrinsic plus a scale on the original's translation. Object 0's camera
//!   becomes the scene's reference camera, and each object's mesh is placed
//!   relative to it.

use glam::{Mat4, Vec3};

use crate::convention::opencv_c2w_to_gl;
use crate::error::{PosescopeError, Result};
use crate::intrinsics::NormalizedIntrinsics;

const SINGULAR_EPSILON: f32 = 1e-10;

/// Inverts a transform, rejecting singular input.
pub fn checked_inverse(m: Mat4) -> Result<Mat4> {
    let det = m.determinant();
    if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
        return Err(PosescopeError::SingularTransform(det));
    }
    Ok(m.inverse())
}

/// Resolves a single-object scene's world-to-camera extrinsic into the
/// renderer-space camera-to-world transform.
pub fn resolve_single(extrinsic_w2c: Mat4) -> Result<Mat4> {
    let c2w = checked_inverse(extrinsic_w2c)?;
    Ok(opencv_c2w_to_gl(c2w))
}

/// Pose entry of one object in a multi-object scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectPose {
    /// Extrinsic of the object's own reconstruction.
    pub original_extrinsic: Mat4,
    /// Extrinsic aligning the object into the shared scene.
    pub new_extrinsic: Mat4,
    /// Scale applied to the original translation and to the mesh.
    pub scale: f32,
    /// Intrinsic of the shared camera, when present.
    pub new_intrinsic: Option<NormalizedIntrinsics>,
}

impl ObjectPose {
    /// The original extrinsic with its translation multiplied by `scale`.
    /// Rotation is left untouched.
    pub fn scaled_original(&self) -> Mat4 {
        let mut m = self.original_extrinsic;
        m.w_axis.x *= self.scale;
        m.w_axis.y *= self.scale;
        m.w_axis.z *= self.scale;
        m
    }

    /// Renderer-space camera-to-world transform implied by this object.
    pub fn camera_to_world(&self) -> Result<Mat4> {
        let combined = self.new_extrinsic * self.scaled_original();
        Ok(opencv_c2w_to_gl(checked_inverse(combined)?))
    }
}

/// Final placement of one object's mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectPlacement {
    /// Object index (matches `mesh{index}.glb`).
    pub index: usize,
    /// Model transform for the mesh.
    pub transform: Mat4,
    /// The object's scale.
    pub scale: f32,
}

/// Resolved multi-object scene.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiObjectLayout {
    /// Index of the object whose camera is the reference (normally 0).
    pub reference_index: usize,
    /// The scene's camera pose.
    pub reference_camera_to_world: Mat4,
    /// Scale of the reference object; drives ground placement.
    pub reference_scale: f32,
    /// Intrinsic of the reference object.
    pub reference_intrinsic: Option<NormalizedIntrinsics>,
    /// Placements of every present, resolvable object in index order.
    pub placements: Vec<ObjectPlacement>,
}

/// Resolves a multi-object scene.
///
/// For object `i` the placement is
/// `reference_c2w × inverse(object_i_c2w) × uniform_scale(scale_i)`, applied
/// right to left. Absent entries are skipped; an object whose transform is
/// singular is skipped with a warning.
pub fn resolve_multi(poses: &[Option<ObjectPose>]) -> Result<MultiObjectLayout> {
    let (reference_index, reference_pose) = poses
        .iter()
        .enumerate()
        .find_map(|(i, p)| p.as_ref().map(|p| (i, p)))
        .ok_or(PosescopeError::MissingPose(0))?;
    if reference_index != 0 {
        log::warn!("object 0 has no pose entry, using object {reference_index} as reference");
    }
    let reference_camera_to_world = reference_pose.camera_to_world()?;

    let mut placements = Vec::with_capacity(poses.len());
    for (index, pose) in poses.iter().enumerate() {
        let Some(pose) = pose else {
            log::debug!("object {index} has no pose entry, skipping");
            continue;
        };
        let object_c2w = if index == reference_index {
            reference_camera_to_world
        } else {
            match pose.camera_to_world() {
                Ok(c2w) => c2w,
                Err(e) => {
                    log::warn!("skipping object {index}: {e}");
                    continue;
                }
            }
        };
        let Ok(object_w2c) = checked_inverse(object_c2w) else {
            log::warn!("skipping object {index}: camera transform is singular");
            continue;
        };
        let transform =
            reference_camera_to_world * object_w2c * Mat4::from_scale(Vec3::splat(pose.scale));
        placements.push(ObjectPlacement {
            index,
            transform,
            scale: pose.scale,
        });
    }

    Ok(MultiObjectLayout {
        reference_index,
        reference_camera_to_world,
        reference_scale: reference_pose.scale,
        reference_intrinsic: reference_pose.new_intrinsic,
        placements,
    })
}
