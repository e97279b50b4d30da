//! Scene metadata documents.
//!
//! Each gallery entry points at a JSON document describing either a
//! single-object scene (`intrinsic` + `extrinsic`, possibly batch-wrapped
//! under `pose`) or a multi-object scene (`glb_path` array plus a `pose` map
//! keyed by stringified object index).

use std::path::Path;

use glam::Mat4;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::convention::matrix_from_rows;
use crate::error::{PosescopeError, Result};
use crate::intrinsics::NormalizedIntrinsics;
use crate::pose::ObjectPose;

/// Raw scene metadata as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneMetadata {
    /// Mesh file list; present only for multi-object scenes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glb_path: Option<Vec<String>>,

    /// Either the per-object pose map or the single-object pose block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<Map<String, Value>>,

    /// Top-level fallback intrinsic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intrinsic: Option<Value>,

    /// Top-level fallback extrinsic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extrinsic: Option<Value>,
}

/// A scene description ready for pose resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneDescription {
    /// One mesh and one camera.
    Single {
        intrinsic: NormalizedIntrinsics,
        extrinsic: Mat4,
    },
    /// Several meshes sharing object 0's camera. Entries are `None` when the
    /// pose is absent or unusable.
    Multi { poses: Vec<Option<ObjectPose>> },
}

impl SceneMetadata {
    /// Parses a metadata document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a metadata document from disk.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Whether this is a multi-object scene.
    pub fn is_multi_object(&self) -> bool {
        self.glb_path.is_some()
    }

    /// Interprets the document.
    pub fn describe(&self) -> Result<SceneDescription> {
        match &self.glb_path {
            Some(meshes) => Ok(SceneDescription::Multi {
                poses: self.object_poses(meshes.len()),
            }),
            None => self.single_object(),
        }
    }

    fn object_poses(&self, count: usize) -> Vec<Option<ObjectPose>> {
        (0..count)
            .map(|i| {
                let entry = self.pose.as_ref()?.get(&i.to_string())?;
                match parse_object_pose(entry) {
                    Ok(pose) => Some(pose),
                    Err(e) => {
                        log::warn!("ignoring pose entry {i}: {e}");
                        None
                    }
                }
            })
            .collect()
    }

    fn single_object(&self) -> Result<SceneDescription> {
        let from_pose = |key: &str| {
            self.pose
                .as_ref()
                .and_then(|p| p.get(key))
                .filter(|v| !v.is_null())
        };
        let intrinsic = from_pose("intrinsic")
            .or(self.intrinsic.as_ref())
            .ok_or_else(|| PosescopeError::InvalidMetadata("missing intrinsic".into()))?;
        let extrinsic = from_pose("extrinsic")
            .or(self.extrinsic.as_ref())
            .ok_or_else(|| PosescopeError::InvalidMetadata("missing extrinsic".into()))?;

        Ok(SceneDescription::Single {
            intrinsic: NormalizedIntrinsics::from_json(peel_batch(intrinsic, 2))?,
            extrinsic: parse_extrinsic(extrinsic)?,
        })
    }
}

/// Parses a 4x4 (or 3x4) row-major extrinsic, peeling batch wrappers.
pub fn parse_extrinsic(value: &Value) -> Result<Mat4> {
    let rows = peel_batch(value, 2)
        .as_array()
        .ok_or_else(|| PosescopeError::InvalidExtrinsic("not an array".into()))?;
    if rows.len() != 3 && rows.len() != 4 {
        return Err(PosescopeError::InvalidExtrinsic(format!(
            "expected 3 or 4 rows, got {}",
            rows.len()
        )));
    }
    let mut m = [[0.0, 0.0, 0.0, 1.0]; 4];
    for (r, row) in rows.iter().enumerate() {
        let cols = row.as_array().filter(|c| c.len() == 4).ok_or_else(|| {
            PosescopeError::InvalidExtrinsic(format!("row {r} is not a 4-element array"))
        })?;
        for (c, entry) in cols.iter().enumerate() {
            m[r][c] = entry.as_f64().ok_or_else(|| {
                PosescopeError::InvalidExtrinsic(format!("entry ({r}, {c}) is not a number"))
            })? as f32;
        }
    }
    Ok(matrix_from_rows(m))
}

fn parse_object_pose(entry: &Value) -> Result<ObjectPose> {
    let field = |key: &str| {
        entry
            .get(key)
            .ok_or_else(|| PosescopeError::InvalidMetadata(format!("missing '{key}'")))
    };
    let scale = parse_scale(field("scale")?)?;
    let new_intrinsic = match entry.get("new_intrinsic") {
        Some(v) if !v.is_null() => Some(NormalizedIntrinsics::from_json(peel_batch(v, 2))?),
        _ => None,
    };
    Ok(ObjectPose {
        original_extrinsic: parse_extrinsic(field("original_extrinsic")?)?,
        new_extrinsic: parse_extrinsic(field("new_extrinsic")?)?,
        scale,
        new_intrinsic,
    })
}

/// Scales are written either as numbers or as numeric strings.
fn parse_scale(value: &Value) -> Result<f32> {
    let scale = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| PosescopeError::InvalidMetadata(format!("bad scale {value}")))?;
    Ok(scale as f32)
}

/// Takes the first element of leading batch dimensions until the value has
/// `rank` nested array levels.
fn peel_batch(value: &Value, rank: usize) -> &Value {
    let mut current = value;
    while array_rank(current) > rank {
        match current.as_array().and_then(|a| a.first()) {
            Some(first) => current = first,
            None => break,
        }
    }
    current
}

fn array_rank(value: &Value) -> usize {
    match value.as_array().and_then(|a| a.first()) {
        Some(first) => 1 + array_rank(first),
        None => usize::from(value.is_array()),
    }
}
