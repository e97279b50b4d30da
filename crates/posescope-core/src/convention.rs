//! Coordinate convention conversion between OpenCV-style pose data and the
//! renderer.
//!
//! Pose data is produced by a pinhole pipeline that uses the OpenCV
//! convention: camera looks down +Z with +Y pointing down, and the world is
//! Y-down as well. The renderer is right-handed Y-up with cameras looking
//! down -Z. Two fixed change-of-basis matrices bridge the two:
//!
//! - [`WORLD_OPENCV_TO_GL`] re-expresses world coordinates (applied on the left).
//! - [`CAMERA_OPENCV_TO_GL`] re-expresses camera-local axes (applied on the right).

use glam::{Mat4, Vec4};

/// Camera-local basis change: flips the Y and Z axes.
pub const CAMERA_OPENCV_TO_GL: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, -1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, -1.0, 0.0),
    Vec4::new(0.0, 0.0, 0.0, 1.0),
);

/// World basis change: OpenCV Y-down world to renderer Y-up world.
///
/// Row-major this reads `[1,0,0,0] [0,0,1,0] [0,-1,0,0] [0,0,0,1]`.
pub const WORLD_OPENCV_TO_GL: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, -1.0, 0.0),
    Vec4::new(0.0, 1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 0.0, 1.0),
);

/// Converts an OpenCV camera-to-world transform into renderer convention.
///
/// Computes `WORLD × c2w × CAMERA`. The two factors do not commute with
/// `c2w`, so the order is fixed.
#[must_use]
pub fn opencv_c2w_to_gl(c2w: Mat4) -> Mat4 {
    WORLD_OPENCV_TO_GL * c2w * CAMERA_OPENCV_TO_GL
}

/// Undoes [`opencv_c2w_to_gl`].
#[must_use]
pub fn gl_c2w_to_opencv(c2w_gl: Mat4) -> Mat4 {
    // Both basis changes are orthonormal: inverse == transpose.
    WORLD_OPENCV_TO_GL.transpose() * c2w_gl * CAMERA_OPENCV_TO_GL.transpose()
}

/// Builds a matrix from row-major rows (the layout used in metadata JSON).
#[must_use]
pub fn matrix_from_rows(rows: [[f32; 4]; 4]) -> Mat4 {
    Mat4::from_cols_array_2d(&rows).transpose()
}

/// Returns the row-major rows of a matrix.
#[must_use]
pub fn matrix_to_rows(m: Mat4) -> [[f32; 4]; 4] {
    m.transpose().to_cols_array_2d()
}
