//! Core abstractions for posescope-rs.
//!
//! This crate provides the math and data types the rest of the workspace
//! builds on:
//! - [`convention`] basis changes between OpenCV-style pose data and the renderer
//! - [`pose`] resolution of stored extrinsics into camera-to-world transforms
//! - [`intrinsics`] normalized pinhole intrinsics and their pixel-space form
//! - [`metadata`] and [`gallery`] for the on-disk scene layout
//! - Configuration options and the shared error type

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Pixel sizes are u32 and converted to f32 freely
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

pub mod convention;
pub mod error;
pub mod gallery;
pub mod intrinsics;
pub mod metadata;
pub mod options;
pub mod pick;
pub mod pose;

pub use convention::{
    gl_c2w_to_opencv, matrix_from_rows, opencv_c2w_to_gl, CAMERA_OPENCV_TO_GL, WORLD_OPENCV_TO_GL,
};
pub use error::{PosescopeError, Result};
pub use gallery::{GalleryItem, SceneAssets};
pub use intrinsics::{ImageSize, NormalizedIntrinsics, ResolvedIntrinsics};
pub use metadata::{SceneDescription, SceneMetadata};
pub use options::{DefaultView, ViewerOptions};
pub use pick::{PickKind, PickResult};
pub use pose::{resolve_multi, resolve_single, MultiObjectLayout, ObjectPlacement, ObjectPose};

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
