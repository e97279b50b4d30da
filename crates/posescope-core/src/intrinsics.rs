//! Pinhole intrinsics normalized to a square reference image.
//!
//! Stored intrinsics are expressed as fractions of `max_dim`, the side of the
//! square the source photo was padded into before the pose was estimated.
//! [`NormalizedIntrinsics::resolve`] undoes that padding for a concrete image
//! size.

use glam::{Mat3, Vec2};
use serde_json::Value;

use crate::error::{PosescopeError, Result};

/// Pixel dimensions of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A square placeholder used when the real image is unavailable.
    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Larger of the two dimensions.
    pub fn max_dim(self) -> u32 {
        self.width.max(self.height)
    }

    /// True when either side is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Focal lengths and principal point as fractions of the reference square.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedIntrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl NormalizedIntrinsics {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Reads the focal lengths and principal point out of a 3x3 `K` matrix.
    pub fn from_matrix(k: Mat3) -> Self {
        // K is row-major [[fx, s, cx], [0, fy, cy], [0, 0, 1]]; glam stores columns.
        Self {
            fx: k.x_axis.x,
            fy: k.y_axis.y,
            cx: k.z_axis.x,
            cy: k.z_axis.y,
        }
    }

    /// Parses a JSON intrinsic, unwrapping a `[1, 3, 3]` batch wrapper.
    ///
    /// Reading the wrapped form without unwrapping would pick up a row where
    /// a scalar is expected, so the unwrap is mandatory.
    pub fn from_json(value: &Value) -> Result<Self> {
        let rows = unwrap_batched_matrix(value)?;
        if rows.len() != 3 {
            return Err(PosescopeError::InvalidIntrinsic(format!(
                "expected 3 rows, got {}",
                rows.len()
            )));
        }
        let mut m = [[0.0f32; 3]; 3];
        for (r, row) in rows.iter().enumerate() {
            let cols = row.as_array().filter(|c| c.len() == 3).ok_or_else(|| {
                PosescopeError::InvalidIntrinsic(format!("row {r} is not a 3-element array"))
            })?;
            for (c, entry) in cols.iter().enumerate() {
                m[r][c] = entry.as_f64().ok_or_else(|| {
                    PosescopeError::InvalidIntrinsic(format!("entry ({r}, {c}) is not a number"))
                })? as f32;
            }
        }
        Ok(Self::from_matrix(Mat3::from_cols_array_2d(&m).transpose()))
    }

    /// Converts to pixel units for an image of the given size.
    pub fn resolve(&self, size: ImageSize) -> ResolvedIntrinsics {
        let max_dim = size.max_dim();
        let left = (max_dim - size.width) / 2;
        let top = (max_dim - size.height) / 2;
        let max_dim_f = max_dim as f32;

        let focal_x = self.fx * max_dim_f;
        let focal_y = self.fy * max_dim_f;
        let principal_point = Vec2::new(
            self.cx * max_dim_f - left as f32,
            self.cy * max_dim_f - top as f32,
        );

        let height = size.height as f32;
        let fov_degrees = (2.0 * (0.5 * height / focal_y).atan()).to_degrees();

        ResolvedIntrinsics {
            size,
            focal_x,
            focal_y,
            principal_point,
            fov_degrees,
            aspect_ratio: size.width as f32 / height,
        }
    }
}

/// Intrinsics expressed in native image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedIntrinsics {
    /// Native image size.
    pub size: ImageSize,
    pub focal_x: f32,
    pub focal_y: f32,
    /// Principal point in native image pixel coordinates.
    pub principal_point: Vec2,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Width / height.
    pub aspect_ratio: f32,
}

impl ResolvedIntrinsics {
    /// Deviation of the principal point from the image centre, in pixels
    /// (+x right, +y down).
    pub fn principal_offset(&self) -> Vec2 {
        let center = Vec2::new(self.size.width as f32, self.size.height as f32) * 0.5;
        self.principal_point - center
    }
}

fn unwrap_batched_matrix(value: &Value) -> Result<&Vec<Value>> {
    let rows = value
        .as_array()
        .ok_or_else(|| PosescopeError::InvalidIntrinsic("not an array".into()))?;
    // [[[...],[...],[...]]] -> [[...],[...],[...]]
    if rows.len() == 1 {
        if let Some(inner) = rows[0].as_array() {
            if inner.len() == 3 && inner.iter().all(|r| r.as_array().is_some_and(|c| c.len() == 3)) {
                return Ok(inner);
            }
        }
    }
    Ok(rows)
}
