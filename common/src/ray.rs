use cgmath::{InnerSpace, Matrix4, Point3, Vector3};

use crate::EPSILON;

/// Slack on the barycentric bounds so rays through a shared vertex or edge
/// still register a hit on at least one adjacent face.
const BARYCENTRIC_TOLERANCE: f32 = 1e-6;

/// A ray in 3D space with a unit direction and a cached reciprocal direction
/// for slab tests.
#[derive(Debug, Copy, Clone)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
    /// Componentwise `1 / direction`; near-zero components map to a signed infinity.
    pub inv_direction: Vector3<f32>,
}

fn reciprocal(d: f32) -> f32 {
    if d.abs() < EPSILON {
        f32::INFINITY.copysign(d)
    } else {
        1.0 / d
    }
}

fn reciprocal_direction(direction: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(
        reciprocal(direction.x),
        reciprocal(direction.y),
        reciprocal(direction.z),
    )
}

impl Ray {
    /// Creates a new ray; the direction is normalized.
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        let direction = direction.normalize();
        Self {
            origin,
            direction,
            inv_direction: reciprocal_direction(direction),
        }
    }

    /// Re-aims the ray in place, refreshing the cached reciprocal.
    pub fn set(&mut self, origin: Point3<f32>, direction: Vector3<f32>) {
        *self = Self::new(origin, direction);
    }

    /// Returns `origin + t * direction`.
    pub fn point_at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Transforms the ray by the given 4x4 matrix.
    ///
    /// The origin goes through as a point (w = 1) and the direction as a vector
    /// (w = 0), renormalized afterwards. Ray parameters are therefore not
    /// preserved under scaling.
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        let origin = Point3::from_homogeneous(matrix * self.origin.to_homogeneous());
        let direction = (matrix * self.direction.extend(0.0)).truncate();
        Self::new(origin, direction)
    }

    /// Double-sided Möller-Trumbore test.
    ///
    /// Returns `(t, u, v)` where `t` is the distance along the ray and `u`, `v`
    /// weight `v1` and `v2` (so `v0` carries `1 - u - v`). Hits behind the origin
    /// and rays parallel to the triangle plane return None.
    pub fn intersect_triangle(
        &self,
        v0: Point3<f32>,
        v1: Point3<f32>,
        v2: Point3<f32>,
    ) -> Option<(f32, f32, f32)> {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        // det is |edge1| |edge2| times the sine of the ray/plane angle, so the
        // parallel cutoff has to scale with the triangle.
        let h = self.direction.cross(edge2);
        let det = edge1.dot(h);
        if det.abs() <= EPSILON * edge1.magnitude() * edge2.magnitude() {
            return None;
        }
        let inv_det = 1.0 / det;

        let s = self.origin - v0;
        let u = inv_det * s.dot(h);
        if !(-BARYCENTRIC_TOLERANCE..=1.0 + BARYCENTRIC_TOLERANCE).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = inv_det * self.direction.dot(q);
        if v < -BARYCENTRIC_TOLERANCE || u + v > 1.0 + BARYCENTRIC_TOLERANCE {
            return None;
        }

        let t = inv_det * edge2.dot(q);
        if t < 0.0 {
            return None;
        }

        Some((t, u.clamp(0.0, 1.0), v.clamp(0.0, 1.0 - u.clamp(0.0, 1.0))))
    }
}
