use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3};

use super::{EPSILON, ray::Ray};

/// An axis-aligned bounding box (AABB) in 3D space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    /// Creates a new AABB from min and max points.
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Returns an inverted box that contains nothing.
    ///
    /// Merging anything into it yields that thing's bounds, which makes it the
    /// identity for [`Aabb::merge`] and [`Aabb::expand`].
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Creates an AABB that encompasses all the given points.
    /// Returns None if the points slice is empty.
    pub fn from_points(points: &[Point3<f32>]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        Some(points.iter().fold(Self::empty(), |acc, p| acc.expand(*p)))
    }

    /// True when no point can be inside (min exceeds max on some axis).
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Returns the 8 corner points of the AABB.
    pub fn corners(&self) -> [Point3<f32>; 8] {
        [
            Point3::new(self.min.x, self.min.y, self.min.z),
            Point3::new(self.max.x, self.min.y, self.min.z),
            Point3::new(self.min.x, self.max.y, self.min.z),
            Point3::new(self.max.x, self.max.y, self.min.z),
            Point3::new(self.min.x, self.min.y, self.max.z),
            Point3::new(self.max.x, self.min.y, self.max.z),
            Point3::new(self.min.x, self.max.y, self.max.z),
            Point3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    /// Transforms the AABB by the given 4x4 transformation matrix.
    /// This handles rotation/scaling/shearing by transforming all 8 corners
    /// and computing a new axis-aligned bounding box.
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        if self.is_empty() {
            return *self;
        }

        self.corners().iter().fold(Self::empty(), |acc, corner| {
            let homogeneous = matrix * corner.to_homogeneous();
            acc.expand(Point3::from_homogeneous(homogeneous))
        })
    }

    /// Slab test against the ray using its cached reciprocal direction.
    ///
    /// Returns the `(entry, exit)` ray parameters clipped to `t >= 0`, or None
    /// when the ray misses or the box lies entirely behind the origin. A ray
    /// starting inside the box reports an entry of 0.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32)> {
        if self.is_empty() {
            return None;
        }

        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if ray.direction[axis].abs() < EPSILON {
                // Parallel to the slab: inside it or never.
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }

            let inv_dir = ray.inv_direction[axis];
            let mut t1 = (lo - origin) * inv_dir;
            let mut t2 = (hi - origin) * inv_dir;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }

            tmin = tmin.max(t1);
            tmax = tmax.min(t2);
            if tmin > tmax {
                return None;
            }
        }

        if tmax < 0.0 {
            return None;
        }
        Some((tmin.max(0.0), tmax))
    }

    /// Expands the AABB to include the given point.
    pub fn expand(&self, point: Point3<f32>) -> Self {
        Self {
            min: Point3::new(
                self.min.x.min(point.x),
                self.min.y.min(point.y),
                self.min.z.min(point.z),
            ),
            max: Point3::new(
                self.max.x.max(point.x),
                self.max.y.max(point.y),
                self.max.z.max(point.z),
            ),
        }
    }

    /// Merges this AABB with another, returning the bounding box that encompasses both.
    pub fn merge(&self, other: &Aabb) -> Self {
        Self {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    /// Returns the center point of the AABB.
    pub fn center(&self) -> Point3<f32> {
        self.min.midpoint(self.max)
    }

    /// Returns the size (extents) of the AABB along each axis.
    pub fn size(&self) -> (f32, f32, f32) {
        (
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.max.z - self.min.z,
        )
    }

    /// Index (0 = x, 1 = y, 2 = z) of the axis with the greatest extent.
    pub fn longest_axis(&self) -> usize {
        let (x, y, z) = self.size();
        if x >= y && x >= z {
            0
        } else if y >= z {
            1
        } else {
            2
        }
    }

    /// Total area of the six faces; zero for empty boxes.
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let (x, y, z) = self.size();
        2.0 * (x * y + y * z + z * x)
    }

    /// Radius of the sphere centered on the box that passes through its corners.
    pub fn bounding_sphere_radius(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        (self.max - self.min).magnitude() * 0.5
    }

    /// Tests if a point is inside the AABB (inclusive of boundaries).
    pub fn contains_point(&self, point: Point3<f32>) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }
}
