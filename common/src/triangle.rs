use cgmath::{EuclideanSpace, InnerSpace, Point3, Vector3};

use crate::{Aabb, Ray};

/// A single triangle copied out of a mesh, tagged with its face index.
///
/// Vertices are owned so the hierarchy built over triangles never borrows the
/// mesh buffers it came from.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Triangle {
    pub id: usize,
    pub vertices: [Point3<f32>; 3],
    pub bounds: Aabb,
}

impl Triangle {
    pub fn new(id: usize, a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Self {
        let bounds = Aabb::empty().expand(a).expand(b).expand(c);
        Self {
            id,
            vertices: [a, b, c],
            bounds,
        }
    }

    pub fn centroid(&self) -> Point3<f32> {
        Point3::centroid(&self.vertices)
    }

    /// Unnormalized face normal following the winding `a -> b -> c`.
    pub fn normal(&self) -> Vector3<f32> {
        let [a, b, c] = self.vertices;
        (b - a).cross(c - a)
    }

    pub fn area(&self) -> f32 {
        self.normal().magnitude() * 0.5
    }

    /// Returns `(t, u, v)` for a hit; see [`Ray::intersect_triangle`].
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, f32, f32)> {
        let [a, b, c] = self.vertices;
        ray.intersect_triangle(a, b, c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EPSILON;

    fn sample() -> Triangle {
        Triangle::new(
            7,
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(0.0, 3.0, 1.0),
        )
    }

    #[test]
    fn test_bounds_are_tight() {
        let tri = sample();
        assert_eq!(tri.bounds.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(tri.bounds.max, Point3::new(3.0, 3.0, 1.0));
    }

    #[test]
    fn test_centroid() {
        let c = sample().centroid();
        assert!((c.x - 1.0).abs() < EPSILON);
        assert!((c.y - 1.0).abs() < EPSILON);
        assert!((c.z - 1.0 / 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_area_of_right_triangle() {
        let tri = Triangle::new(
            0,
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        );
        assert!((tri.area() - 2.0).abs() < EPSILON);
        assert!(tri.normal().z > 0.0);
    }

    #[test]
    fn test_intersect_delegates_to_ray() {
        let tri = sample();
        let n = tri.normal().normalize();
        let ray = Ray::new(tri.centroid() - n * 2.0, n);

        let (t, _, _) = tri.intersect(&ray).unwrap();
        assert!((t - 2.0).abs() < 1e-4);
    }
}
