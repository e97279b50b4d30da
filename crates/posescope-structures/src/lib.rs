//! Structure implementations for posescope-rs.
//!
//! This crate provides the concrete scene content:
//! - Camera frustum proxies with image planes
//! - Placed mesh models
//! - Ray helpers used to pick both

// Pixel sizes are u32 and converted to f32 freely
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod frustum;
pub mod model;
pub mod ray;

pub use frustum::{FrustumView, ImagePlane};
pub use model::{union_bounds, MeshGeometry, MeshModel};
pub use ray::{ray_intersect_triangle, ray_segment_closest, Ray};
