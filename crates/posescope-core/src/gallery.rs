//! Gallery configuration and the per-scene asset layout.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Mesh file of a single-object scene.
pub const SINGLE_MESH_FILE: &str = "mesh.glb";

/// Reference photo used to texture the frustum's image plane.
pub const REFERENCE_IMAGE_FILE: &str = "images_crop/input_no_mask.png";

/// One thumbnail in the scene gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryItem {
    /// Display label; see [`GalleryItem::display_label`].
    #[serde(default)]
    pub label: Option<String>,
    /// Thumbnail image URL.
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Path of the scene metadata document.
    #[serde(rename = "metadataPath", alias = "metadata_path")]
    pub metadata_path: String,
}

impl GalleryItem {
    pub fn new(metadata_path: impl Into<String>) -> Self {
        Self {
            label: None,
            thumbnail: None,
            metadata_path: metadata_path.into(),
        }
    }

    /// Label shown under the thumbnail, `Scene {n}` (1-based) when unset.
    pub fn display_label(&self, index: usize) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("Scene {}", index + 1))
    }

    /// Asset locations relative to the metadata document.
    pub fn assets(&self) -> SceneAssets {
        SceneAssets::for_metadata(&self.metadata_path)
    }
}

/// Reads an ordered gallery list from JSON.
pub fn gallery_from_json_str(json: &str) -> Result<Vec<GalleryItem>> {
    Ok(serde_json::from_str(json)?)
}

/// Reads an ordered gallery list from a JSON file.
pub fn gallery_from_json_file(path: &Path) -> Result<Vec<GalleryItem>> {
    gallery_from_json_str(&std::fs::read_to_string(path)?)
}

/// Asset paths of one scene directory.
///
/// Paths are `/`-joined so they work both as URLs and as relative file paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneAssets {
    parent_dir: String,
}

impl SceneAssets {
    /// Derives the scene directory from the metadata document's path.
    pub fn for_metadata(metadata_path: &str) -> Self {
        let parent_dir = metadata_path
            .rsplit_once('/')
            .map(|(dir, _)| dir.to_string())
            .unwrap_or_default();
        Self { parent_dir }
    }

    pub fn parent_dir(&self) -> &str {
        &self.parent_dir
    }

    /// Mesh of a single-object scene.
    pub fn single_mesh(&self) -> String {
        self.join(SINGLE_MESH_FILE)
    }

    /// Mesh of object `index` in a multi-object scene.
    pub fn object_mesh(&self, index: usize) -> String {
        self.join(&format!("mesh{index}.glb"))
    }

    /// Reference photo for the frustum image plane.
    pub fn reference_image(&self) -> String {
        self.join(REFERENCE_IMAGE_FILE)
    }

    fn join(&self, file: &str) -> String {
        if self.parent_dir.is_empty() {
            file.to_string()
        } else {
            format!("{}/{}", self.parent_dir, file)
        }
    }
}
