//! Camera model for posescope-rs.
//!
//! This crate provides the renderer-side camera state, including:
//! - Perspective projection with an off-center view offset
//! - Frozen camera snapshots used as transition endpoints
//! - Orbit controls with auto-rotation
//! - Eased, token-cancelled camera transitions

// Pixel sizes arrive as integers and are converted to f32 freely
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod animation;
pub mod camera;
pub mod controls;

pub use animation::{ease_in_out_cubic, CameraAnimator, CameraTransition, TransitionStatus};
pub use camera::{Camera, CameraSnapshot, ViewOffset};
pub use controls::OrbitControls;
