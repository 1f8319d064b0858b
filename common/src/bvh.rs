//! Bounding volume hierarchy over triangles for nearest-hit ray queries.
//!
//! Nodes live in a flat array and reference each other by index. Leaves cover a
//! contiguous range of the hierarchy's own triangle array, which is reordered
//! during the build so every subtree is one slice.

use std::cmp::Ordering;

use cgmath::{Point3, Vector3};

use crate::{Aabb, Ray, Triangle, EPSILON};

/// Number of centroid bins evaluated by the surface-area split.
const SAH_BINS: usize = 16;

/// How an internal node's triangles are divided between its two children.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Split at the median centroid along the longest axis.
    #[default]
    Median,
    /// Binned surface-area heuristic; falls back to the median split when no bin
    /// boundary separates the triangles.
    SurfaceArea,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BvhOptions {
    /// Nodes with at most this many triangles become leaves.
    pub max_leaf_size: usize,
    pub strategy: SplitStrategy,
}

impl Default for BvhOptions {
    fn default() -> Self {
        Self {
            max_leaf_size: 4,
            strategy: SplitStrategy::Median,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BvhNode {
    Leaf { bounds: Aabb, start: usize, count: usize },
    Internal { bounds: Aabb, left: usize, right: usize },
}

impl BvhNode {
    pub fn bounds(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { bounds, .. } | BvhNode::Internal { bounds, .. } => bounds,
        }
    }
}

/// Closest hit reported by [`Bvh::intersect`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BvhHit {
    /// Ray parameter of the hit, in the units of the ray's space.
    pub distance: f32,
    pub point: Point3<f32>,
    /// Face id of the hit triangle.
    pub triangle: usize,
    /// Weights of the triangle's three vertices at the hit point; they sum to 1.
    pub barycentric: Vector3<f32>,
}

#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    triangles: Vec<Triangle>,
    depth: usize,
}

impl Bvh {
    /// Builds a hierarchy with the default options.
    pub fn build(triangles: Vec<Triangle>) -> Self {
        Self::build_with(triangles, BvhOptions::default())
    }

    /// Builds a hierarchy over `triangles`, taking ownership of them.
    ///
    /// An empty input produces a single empty leaf that never reports a hit.
    pub fn build_with(triangles: Vec<Triangle>, options: BvhOptions) -> Self {
        let mut bvh = Self {
            nodes: Vec::with_capacity((2 * triangles.len()).max(1)),
            triangles,
            depth: 0,
        };

        let max_leaf_size = options.max_leaf_size.max(1);
        let count = bvh.triangles.len();
        bvh.build_node(0, count, 1, max_leaf_size, options.strategy);

        log::debug!(
            "Built BVH over {} triangles: {} nodes, depth {}",
            bvh.triangles.len(),
            bvh.nodes.len(),
            bvh.depth
        );
        bvh
    }

    /// Appends the node covering `triangles[start..start + count]` and returns its index.
    fn build_node(
        &mut self,
        start: usize,
        count: usize,
        depth: usize,
        max_leaf_size: usize,
        strategy: SplitStrategy,
    ) -> usize {
        self.depth = self.depth.max(depth);

        let bounds = self.triangles[start..start + count]
            .iter()
            .fold(Aabb::empty(), |acc, tri| acc.merge(&tri.bounds));

        let index = self.nodes.len();
        self.nodes.push(BvhNode::Leaf { bounds, start, count });

        if count <= max_leaf_size {
            return index;
        }

        let axis = bounds.longest_axis();
        let slice = &mut self.triangles[start..start + count];
        let left_count = match strategy {
            SplitStrategy::Median => split_median(slice, axis),
            SplitStrategy::SurfaceArea => {
                split_surface_area(slice, axis).unwrap_or_else(|| split_median(slice, axis))
            }
        };

        let left = self.build_node(start, left_count, depth + 1, max_leaf_size, strategy);
        let right = self.build_node(
            start + left_count,
            count - left_count,
            depth + 1,
            max_leaf_size,
            strategy,
        );
        self.nodes[index] = BvhNode::Internal { bounds, left, right };
        index
    }

    /// Finds the closest triangle hit along `ray`.
    ///
    /// Children are visited near-to-far and any node whose entry distance is
    /// beyond the best hit so far is skipped. Equal distances keep the first
    /// triangle found.
    pub fn intersect(&self, ray: &Ray) -> Option<BvhHit> {
        if self.triangles.is_empty() {
            return None;
        }

        let (root_entry, _) = self.nodes[0].bounds().intersect_ray(ray)?;

        let mut best: Option<(f32, &Triangle, f32, f32)> = None;
        let mut best_t = f32::INFINITY;
        let mut stack: Vec<(usize, f32)> = Vec::with_capacity(self.depth * 2);
        stack.push((0, root_entry));

        while let Some((index, entry)) = stack.pop() {
            if entry > best_t {
                continue;
            }

            match self.nodes[index] {
                BvhNode::Leaf { start, count, .. } => {
                    for tri in &self.triangles[start..start + count] {
                        if let Some((t, u, v)) = tri.intersect(ray) {
                            if t < best_t {
                                best_t = t;
                                best = Some((t, tri, u, v));
                            }
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    let left_entry = self.entry_distance(left, ray);
                    let right_entry = self.entry_distance(right, ray);

                    // Push the far child first so the near one is popped next.
                    let (near, far) = if left_entry.map_or(f32::INFINITY, |(_, t)| t)
                        <= right_entry.map_or(f32::INFINITY, |(_, t)| t)
                    {
                        (left_entry, right_entry)
                    } else {
                        (right_entry, left_entry)
                    };

                    for child in [far, near].into_iter().flatten() {
                        if child.1 <= best_t {
                            stack.push(child);
                        }
                    }
                }
            }
        }

        best.map(|(t, tri, u, v)| BvhHit {
            distance: t,
            point: ray.point_at(t),
            triangle: tri.id,
            barycentric: Vector3::new(1.0 - u - v, u, v),
        })
    }

    fn entry_distance(&self, index: usize, ray: &Ray) -> Option<(usize, f32)> {
        self.nodes[index]
            .bounds()
            .intersect_ray(ray)
            .map(|(entry, _)| (index, entry))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of levels; a lone leaf has depth 1.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Bounds of the root node. Empty for a hierarchy without triangles.
    pub fn bounds(&self) -> Aabb {
        *self.nodes[0].bounds()
    }

    /// Triangles in hierarchy order (not face-id order).
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }
}

fn centroid_order(axis: usize) -> impl Fn(&Triangle, &Triangle) -> Ordering {
    move |a, b| {
        a.centroid()[axis]
            .partial_cmp(&b.centroid()[axis])
            .unwrap_or(Ordering::Equal)
    }
}

/// Partitions around the median centroid and returns the left count.
fn split_median(triangles: &mut [Triangle], axis: usize) -> usize {
    let mid = triangles.len() / 2;
    triangles.select_nth_unstable_by(mid, centroid_order(axis));
    mid
}

#[derive(Debug, Copy, Clone)]
struct Bin {
    bounds: Aabb,
    count: usize,
}

impl Default for Bin {
    fn default() -> Self {
        Self {
            bounds: Aabb::empty(),
            count: 0,
        }
    }
}

/// Binned SAH split along `axis`. Returns the left count, or None when every
/// centroid falls in one bin or the best cost leaves one side empty.
fn split_surface_area(triangles: &mut [Triangle], axis: usize) -> Option<usize> {
    let (lo, hi) = triangles.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), tri| {
        let c = tri.centroid()[axis];
        (lo.min(c), hi.max(c))
    });
    let extent = hi - lo;
    if extent < EPSILON {
        return None;
    }

    let scale = SAH_BINS as f32 / extent;
    let bin_of = |tri: &Triangle| (((tri.centroid()[axis] - lo) * scale) as usize).min(SAH_BINS - 1);

    let mut bins = [Bin::default(); SAH_BINS];
    for tri in triangles.iter() {
        let bin = &mut bins[bin_of(tri)];
        bin.count += 1;
        bin.bounds = bin.bounds.merge(&tri.bounds);
    }

    // Sweep from the right so each split plane knows the cost of its right side.
    let mut right_area = [0.0f32; SAH_BINS];
    let mut right_count = [0usize; SAH_BINS];
    let mut acc = Bin::default();
    for i in (1..SAH_BINS).rev() {
        acc.count += bins[i].count;
        acc.bounds = acc.bounds.merge(&bins[i].bounds);
        right_area[i] = acc.bounds.surface_area();
        right_count[i] = acc.count;
    }

    let mut best: Option<(usize, f32)> = None;
    let mut acc = Bin::default();
    for split in 0..SAH_BINS - 1 {
        acc.count += bins[split].count;
        acc.bounds = acc.bounds.merge(&bins[split].bounds);

        let right = split + 1;
        if acc.count == 0 || right_count[right] == 0 {
            continue;
        }

        let cost = acc.bounds.surface_area() * acc.count as f32
            + right_area[right] * right_count[right] as f32;
        if best.map_or(true, |(_, best_cost)| cost < best_cost) {
            best = Some((split, cost));
        }
    }
    let (split, _) = best?;

    let mut left = 0;
    for i in 0..triangles.len() {
        if bin_of(&triangles[i]) <= split {
            triangles.swap(i, left);
            left += 1;
        }
    }

    if left == 0 || left == triangles.len() {
        None
    } else {
        Some(left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    /// A `count` x `count` grid of unit quads in the z = 0 plane, two triangles each.
    fn quad_grid(count: usize) -> Vec<Triangle> {
        let mut triangles = Vec::new();
        for j in 0..count {
            for i in 0..count {
                let (x, y) = (i as f32, j as f32);
                let a = Point3::new(x, y, 0.0);
                let b = Point3::new(x + 1.0, y, 0.0);
                let c = Point3::new(x + 1.0, y + 1.0, 0.0);
                let d = Point3::new(x, y + 1.0, 0.0);
                let id = triangles.len();
                triangles.push(Triangle::new(id, a, b, c));
                triangles.push(Triangle::new(id + 1, a, c, d));
            }
        }
        triangles
    }

    /// Axis-aligned squares facing +Z, stacked along -Z at the given depths.
    fn stacked_squares(depths: &[f32]) -> Vec<Triangle> {
        depths
            .iter()
            .enumerate()
            .map(|(i, &z)| {
                Triangle::new(
                    i,
                    Point3::new(-1.0, -1.0, z),
                    Point3::new(3.0, -1.0, z),
                    Point3::new(-1.0, 3.0, z),
                )
            })
            .collect()
    }

    fn brute_force(triangles: &[Triangle], ray: &Ray) -> Option<(usize, f32)> {
        triangles
            .iter()
            .filter_map(|tri| tri.intersect(ray).map(|(t, _, _)| (tri.id, t)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
    }

    fn check_invariants(bvh: &Bvh, max_leaf_size: usize) {
        let mut seen = vec![false; bvh.triangle_count()];
        for node in bvh.nodes() {
            match *node {
                BvhNode::Leaf { bounds, start, count } => {
                    assert!(count <= max_leaf_size || bvh.node_count() == 1);
                    for tri in &bvh.triangles()[start..start + count] {
                        assert!(bounds.contains_point(tri.bounds.min));
                        assert!(bounds.contains_point(tri.bounds.max));
                        assert!(!seen[tri.id], "triangle {} in two leaves", tri.id);
                        seen[tri.id] = true;
                    }
                }
                BvhNode::Internal { bounds, left, right } => {
                    let union = bvh.nodes()[left].bounds().merge(bvh.nodes()[right].bounds());
                    assert_eq!(union, bounds);
                }
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    // ===== Build Tests =====

    #[test]
    fn test_empty_build() {
        let bvh = Bvh::build(Vec::new());

        assert_eq!(bvh.node_count(), 1);
        assert_eq!(bvh.depth(), 1);
        assert!(bvh.bounds().is_empty());

        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(bvh.intersect(&ray).is_none());
    }

    #[test]
    fn test_single_triangle_is_one_leaf() {
        let bvh = Bvh::build(stacked_squares(&[0.0]));

        assert_eq!(bvh.node_count(), 1);
        assert_eq!(bvh.triangle_count(), 1);
        assert!(matches!(bvh.nodes()[0], BvhNode::Leaf { count: 1, .. }));
    }

    #[test]
    fn test_median_build_invariants() {
        let bvh = Bvh::build(quad_grid(8));

        assert_eq!(bvh.triangle_count(), 128);
        assert!(bvh.node_count() > 1);
        // 128 triangles halved down to leaves of at most 4
        assert_eq!(bvh.depth(), 6);
        check_invariants(&bvh, 4);
    }

    #[test]
    fn test_sah_build_invariants() {
        let options = BvhOptions {
            max_leaf_size: 2,
            strategy: SplitStrategy::SurfaceArea,
        };
        let bvh = Bvh::build_with(quad_grid(6), options);

        check_invariants(&bvh, 2);
    }

    #[test]
    fn test_sah_falls_back_on_identical_centroids() {
        // Coincident triangles cannot be separated by any bin boundary
        let triangles: Vec<Triangle> = (0..9)
            .map(|id| {
                Triangle::new(
                    id,
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(1.0, 0.0, 0.0),
                    Point3::new(0.0, 1.0, 0.0),
                )
            })
            .collect();
        let options = BvhOptions {
            max_leaf_size: 2,
            strategy: SplitStrategy::SurfaceArea,
        };
        let bvh = Bvh::build_with(triangles, options);

        check_invariants(&bvh, 2);
    }

    // ===== Query Tests =====

    #[test]
    fn test_miss_all_boxes() {
        let bvh = Bvh::build(quad_grid(4));
        let ray = Ray::new(Point3::new(10.0, 10.0, 5.0), Vector3::new(0.0, 0.0, -1.0));

        assert!(bvh.intersect(&ray).is_none());
    }

    #[test]
    fn test_closest_of_several_hits() {
        let bvh = Bvh::build_with(
            stacked_squares(&[-6.0, 0.0, -2.0, -4.0, -8.0]),
            BvhOptions {
                max_leaf_size: 1,
                strategy: SplitStrategy::Median,
            },
        );
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));

        let hit = bvh.intersect(&ray).unwrap();
        assert_eq!(hit.triangle, 1);
        assert!((hit.distance - 5.0).abs() < 1e-4);
        assert!(hit.point.z.abs() < 1e-4);
    }

    #[test]
    fn test_single_triangle_analytic_distance() {
        let tri = Triangle::new(
            0,
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(0.0, 0.0, 3.0),
        );
        let normal = tri.normal().normalize();
        let ray = Ray::new(tri.centroid() + normal * 7.5, -normal);
        let bvh = Bvh::build(vec![tri]);

        let hit = bvh.intersect(&ray).unwrap();
        assert!((hit.distance - 7.5).abs() < 1e-4);
        for w in [hit.barycentric.x, hit.barycentric.y, hit.barycentric.z] {
            assert!((w - 1.0 / 3.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_submillimetre_triangles_hit() {
        // Quad grid scaled down to 0.1 mm cells
        let triangles: Vec<Triangle> = quad_grid(4)
            .into_iter()
            .map(|tri| {
                let [a, b, c] = tri.vertices.map(|p| Point3::new(p.x * 1e-4, p.y * 1e-4, p.z));
                Triangle::new(tri.id, a, b, c)
            })
            .collect();
        let target = triangles[5];
        let bvh = Bvh::build(triangles);

        let normal = target.normal().normalize();
        let ray = Ray::new(target.centroid() + normal, -normal);

        let hit = bvh.intersect(&ray).unwrap();
        assert_eq!(hit.triangle, 5);
        assert!((hit.distance - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_ray_through_shared_vertex_hits() {
        let bvh = Bvh::build(quad_grid(2));
        // (1, 1) is a corner shared by six triangles
        let ray = Ray::new(Point3::new(1.0, 1.0, 3.0), Vector3::new(0.0, 0.0, -1.0));

        let hit = bvh.intersect(&ray).unwrap();
        assert!((hit.distance - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_matches_brute_force() {
        let triangles = quad_grid(5);
        let bvh = Bvh::build_with(
            triangles.clone(),
            BvhOptions {
                max_leaf_size: 3,
                strategy: SplitStrategy::SurfaceArea,
            },
        );

        for (x, y) in [(0.3, 0.6), (2.7, 4.1), (4.9, 0.05), (1.5, 3.5)] {
            let ray = Ray::new(Point3::new(x, y, 2.0), Vector3::new(0.2, -0.1, -1.0));
            let expected = brute_force(&triangles, &ray);
            let hit = bvh.intersect(&ray);

            match (expected, hit) {
                (Some((_, t)), Some(hit)) => assert!((hit.distance - t).abs() < 1e-4),
                (None, None) => {}
                (expected, hit) => panic!("mismatch: {:?} vs {:?}", expected, hit),
            }
        }
    }

    #[test]
    fn test_origin_inside_bounds() {
        let bvh = Bvh::build(stacked_squares(&[0.0, -2.0]));
        let ray = Ray::new(Point3::new(0.0, 0.0, -1.0), Vector3::new(0.0, 0.0, -1.0));

        let hit = bvh.intersect(&ray).unwrap();
        assert_eq!(hit.triangle, 1);
        assert!((hit.distance - 1.0).abs() < 1e-4);
    }
}
