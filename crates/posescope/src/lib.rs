//! posescope-rs: a headless viewer model for recorded camera poses.
//!
//! A scene is a reconstructed mesh (or several) together with the camera
//! that photographed it. The viewer shows the camera as a frustum with an
//! image plane, and double-clicking the frustum flies the live camera into
//! the recorded pose, reproducing its off-center projection.
//!
//! # Quick Start
//!
//! ```no_run
//! use posescope_rs::*;
//! use std::cell::RefCell;
//!
//! init_logging();
//! let session = RefCell::new(ViewerSession::new(ViewerOptions::default(), 1280, 720));
//! let loader = FsAssetLoader::new("data").with_mesh_extension("obj");
//! let item = GalleryItem::new("scene_01/meta.json");
//! let outcome = pollster::block_on(load_scene(&session, &loader, &item));
//! println!("{outcome:?}, {} frustums", session.borrow().frustums().len());
//! ```
//!
//! # Pieces
//!
//! - [`ViewerSession`] owns the scene, live camera, orbit controls and the
//!   load and animation tokens
//! - [`load_scene`] drives an [`AssetLoader`] through a scene load
//! - [`RecordingViewer`] drives an external [`RecordingPlayer`] with an LRU
//!   [`RecordingCache`]

// Viewport sizes are u32 and converted to f32 freely
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod hover;
pub mod input;
pub mod loader;
pub mod recording;
pub mod scene;
pub mod session;

// Re-export core types
pub use posescope_core::{
    gallery::{gallery_from_json_file, gallery_from_json_str},
    DefaultView, GalleryItem, ImageSize, NormalizedIntrinsics, PickKind, PickResult,
    PosescopeError, Result, SceneAssets, SceneDescription, SceneMetadata, ViewerOptions, Mat4,
    Quat, Vec2, Vec3, Vec4,
};

// Re-export render types
pub use posescope_render::{
    Camera, CameraAnimator, CameraSnapshot, CameraTransition, OrbitControls, TransitionStatus,
    ViewOffset,
};

// Re-export structures
pub use posescope_structures::{FrustumView, ImagePlane, MeshGeometry, MeshModel, Ray};

pub use hover::HoverStack;
pub use input::{DoubleClickAction, Key};
pub use loader::{
    load_scene, AssetLoader, CommitOutcome, FsAssetLoader, ImageAsset, LoadTicket, MeshAsset,
    SceneLoadOutcome,
};
pub use recording::{
    recording_id, LoadOutcome, PlayerOptions, RecordingCache, RecordingEntry, RecordingPlayer,
    RecordingStatus, RecordingViewer, RecordingViewerConfig,
};
pub use scene::{NodeContent, NodeId, NodeMeta, SceneGraph, SceneNode};
pub use session::ViewerSession;

/// Installs `env_logger` as the `log` backend. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
