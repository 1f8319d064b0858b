//! Geometry primitives shared by the glance crates.
//!
//! Everything here is plain math over `cgmath` types: axis-aligned boxes, rays,
//! triangles, a bounding volume hierarchy for nearest-hit ray queries, and the
//! spherical coordinates used by the orbit controllers.

mod aabb;
pub mod bvh;
mod ray;
mod spherical;
mod transform_ops;
mod triangle;

pub use aabb::Aabb;
pub use bvh::{Bvh, BvhHit, BvhOptions, SplitStrategy};
pub use ray::Ray;
pub use spherical::Spherical;
pub use transform_ops::{local_axis_y, local_axis_z, look_at_rotation, safe_normalize};
pub use triangle::Triangle;

/// Tolerance used for degenerate-geometry guards throughout the crate.
pub const EPSILON: f32 = 1e-6;
