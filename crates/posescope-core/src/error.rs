//! Error types for posescope-rs.

use thiserror::Error;

/// The main error type for posescope-rs operations.
#[derive(Error, Debug)]
pub enum PosescopeError {
    /// The viewer session has not been initialized.
    #[error("viewer session not initialized")]
    NotInitialized,

    /// An intrinsic matrix could not be interpreted as 3x3.
    #[error("invalid intrinsic matrix: {0}")]
    InvalidIntrinsic(String),

    /// An extrinsic matrix could not be interpreted as 4x4.
    #[error("invalid extrinsic matrix: {0}")]
    InvalidExtrinsic(String),

    /// A transform that must be inverted is singular.
    #[error("transform is singular (determinant {0})")]
    SingularTransform(f32),

    /// The renderer rejected a view offset.
    #[error("invalid view offset: {0}")]
    InvalidViewOffset(String),

    /// The pose entry for an object index is absent.
    #[error("no pose entry for object {0}")]
    MissingPose(usize),

    /// Scene metadata is structurally unusable.
    #[error("invalid scene metadata: {0}")]
    InvalidMetadata(String),

    /// An asset (mesh, image, metadata document) failed to load.
    #[error("failed to load '{path}': {reason}")]
    AssetLoad { path: String, reason: String },

    /// The recording playback widget reported a failure.
    #[error("recording viewer error: {0}")]
    Recording(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PosescopeError {
    /// Builds an [`PosescopeError::AssetLoad`] from any displayable reason.
    pub fn asset_load(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::AssetLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// A specialized Result type for posescope-rs operations.
pub type Result<T> = std::result::Result<T, PosescopeError>;
