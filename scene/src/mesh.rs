use cgmath::{Point3, Vector3};
use thiserror::Error;

use crate::common::{Aabb, Bvh, BvhOptions, Ray, Triangle};

pub type MeshIndex = u32;

/// Geometry that cannot be split into triangles.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("Index buffer length {0} is not a multiple of 3")]
    IndexCountNotTriangles(usize),
    #[error("Vertex count {0} is not a multiple of 3 for a non-indexed mesh")]
    VertexCountNotTriangles(usize),
    #[error("Index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: MeshIndex, vertex_count: usize },
    #[error("Mesh has {normals} normals for {positions} positions")]
    NormalCountMismatch { positions: usize, normals: usize },
}

/// Result of a ray-mesh intersection test in local mesh space.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshHit {
    /// Distance along the ray to the hit point (in local space)
    pub distance: f32,
    /// Hit location in local mesh space
    pub hit_point: Point3<f32>,
    /// Index of the triangle that was hit (index into the mesh's index buffer / 3)
    pub triangle_index: usize,
    /// Weights of the hit triangle's three corners at the hit point
    pub barycentric: (f32, f32, f32),
}

/// Triangle geometry with an optional spatial index for ray queries.
///
/// Indexed meshes read triangles from the index buffer in triples; meshes
/// without indices read consecutive position triples. Editing geometry does not
/// refresh the spatial index: call [`Mesh::update_index`] after edits, otherwise
/// queries keep answering against the old triangles.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    positions: Vec<Point3<f32>>,
    normals: Option<Vec<Vector3<f32>>>,
    indices: Option<Vec<MeshIndex>>,
    spatial_index: Option<Bvh>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a non-indexed mesh where every three positions form a triangle.
    pub fn from_positions(positions: Vec<Point3<f32>>) -> Self {
        Self {
            positions,
            ..Self::default()
        }
    }

    /// Creates an indexed mesh.
    pub fn from_indexed(positions: Vec<Point3<f32>>, indices: Vec<MeshIndex>) -> Self {
        Self {
            positions,
            indices: Some(indices),
            ..Self::default()
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vector3<f32>>) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Creates a box mesh centered at the origin with outward-facing normals.
    ///
    /// # Arguments
    /// * `width` - Size along the X axis
    /// * `height` - Size along the Y axis
    /// * `depth` - Size along the Z axis
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        let hd = depth / 2.0;

        // (normal, corners counter-clockwise seen from outside)
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, 0.0, 1.0], [[-hw, -hh, hd], [hw, -hh, hd], [hw, hh, hd], [-hw, hh, hd]]),
            ([0.0, 0.0, -1.0], [[hw, -hh, -hd], [-hw, -hh, -hd], [-hw, hh, -hd], [hw, hh, -hd]]),
            ([0.0, 1.0, 0.0], [[-hw, hh, hd], [hw, hh, hd], [hw, hh, -hd], [-hw, hh, -hd]]),
            ([0.0, -1.0, 0.0], [[-hw, -hh, -hd], [hw, -hh, -hd], [hw, -hh, hd], [-hw, -hh, hd]]),
            ([1.0, 0.0, 0.0], [[hw, -hh, hd], [hw, -hh, -hd], [hw, hh, -hd], [hw, hh, hd]]),
            ([-1.0, 0.0, 0.0], [[-hw, -hh, -hd], [-hw, -hh, hd], [-hw, hh, hd], [-hw, hh, -hd]]),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, corners) in &faces {
            let base = positions.len() as MeshIndex;
            for corner in corners {
                positions.push(Point3::from(*corner));
                normals.push(Vector3::from(*normal));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::from_indexed(positions, indices).with_normals(normals)
    }

    /// Creates a quad in the XY plane centered at the origin, facing +Z.
    pub fn quad(width: f32, height: f32) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;

        let positions = vec![
            Point3::new(-hw, -hh, 0.0),
            Point3::new(hw, -hh, 0.0),
            Point3::new(hw, hh, 0.0),
            Point3::new(-hw, hh, 0.0),
        ];
        let normals = vec![Vector3::unit_z(); 4];

        Self::from_indexed(positions, vec![0, 1, 2, 0, 2, 3]).with_normals(normals)
    }

    // ========== Geometry ==========

    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    pub fn normals(&self) -> Option<&[Vector3<f32>]> {
        self.normals.as_deref()
    }

    pub fn indices(&self) -> Option<&[MeshIndex]> {
        self.indices.as_deref()
    }

    /// Replaces the positions. The spatial index is left as is.
    pub fn set_positions(&mut self, positions: Vec<Point3<f32>>) {
        self.positions = positions;
    }

    /// Replaces the normals. The spatial index is left as is.
    pub fn set_normals(&mut self, normals: Option<Vec<Vector3<f32>>>) {
        self.normals = normals;
    }

    /// Replaces the index buffer. The spatial index is left as is.
    pub fn set_indices(&mut self, indices: Option<Vec<MeshIndex>>) {
        self.indices = indices;
    }

    /// Splits the geometry into triangles tagged with their face index.
    ///
    /// # Errors
    /// Returns a [`MeshError`] when the buffers do not describe whole
    /// triangles, an index points past the vertex array, or the normals do not
    /// pair up with the positions.
    pub fn triangles(&self) -> Result<Vec<Triangle>, MeshError> {
        if let Some(normals) = &self.normals {
            if normals.len() != self.positions.len() {
                return Err(MeshError::NormalCountMismatch {
                    positions: self.positions.len(),
                    normals: normals.len(),
                });
            }
        }

        match &self.indices {
            Some(indices) => {
                if indices.len() % 3 != 0 {
                    return Err(MeshError::IndexCountNotTriangles(indices.len()));
                }

                indices
                    .chunks_exact(3)
                    .enumerate()
                    .map(|(id, tri)| {
                        let a = self.vertex(tri[0])?;
                        let b = self.vertex(tri[1])?;
                        let c = self.vertex(tri[2])?;
                        Ok(Triangle::new(id, a, b, c))
                    })
                    .collect()
            }
            None => {
                if self.positions.len() % 3 != 0 {
                    return Err(MeshError::VertexCountNotTriangles(self.positions.len()));
                }

                Ok(self
                    .positions
                    .chunks_exact(3)
                    .enumerate()
                    .map(|(id, tri)| Triangle::new(id, tri[0], tri[1], tri[2]))
                    .collect())
            }
        }
    }

    fn vertex(&self, index: MeshIndex) -> Result<Point3<f32>, MeshError> {
        self.positions
            .get(index as usize)
            .copied()
            .ok_or(MeshError::IndexOutOfRange {
                index,
                vertex_count: self.positions.len(),
            })
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    /// Computes the local-space axis-aligned bounding box.
    /// Returns None if the mesh has no vertices.
    pub fn bounding(&self) -> Option<Aabb> {
        Aabb::from_points(&self.positions)
    }

    // ========== Spatial index ==========

    /// Rebuilds the spatial index from the current geometry with default options.
    pub fn update_index(&mut self) -> Result<(), MeshError> {
        self.update_index_with(BvhOptions::default())
    }

    /// Rebuilds the spatial index from the current geometry.
    ///
    /// On error the previous index, if any, is kept.
    pub fn update_index_with(&mut self, options: BvhOptions) -> Result<(), MeshError> {
        let triangles = self.triangles()?;
        log::debug!(
            "Rebuilding mesh spatial index over {} triangles ({:?})",
            triangles.len(),
            options.strategy
        );
        self.spatial_index = Some(Bvh::build_with(triangles, options));
        Ok(())
    }

    pub fn has_spatial_index(&self) -> bool {
        self.spatial_index.is_some()
    }

    pub fn spatial_index(&self) -> Option<&Bvh> {
        self.spatial_index.as_ref()
    }

    /// Drops the spatial index; queries return None until the next rebuild.
    pub fn invalidate_index(&mut self) {
        self.spatial_index = None;
    }

    /// Finds the closest hit of a local-space ray.
    ///
    /// Returns None on a miss and when the spatial index has never been built.
    pub fn intersect(&self, ray: &Ray) -> Option<MeshHit> {
        let hit = self.spatial_index.as_ref()?.intersect(ray)?;
        Some(MeshHit {
            distance: hit.distance,
            hit_point: hit.point,
            triangle_index: hit.triangle,
            barycentric: (hit.barycentric.x, hit.barycentric.y, hit.barycentric.z),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down_ray(x: f32, y: f32) -> Ray {
        Ray::new(Point3::new(x, y, 5.0), Vector3::new(0.0, 0.0, -1.0))
    }

    // ===== Triangle Extraction Tests =====

    #[test]
    fn test_indexed_triangles() {
        let mesh = Mesh::quad(2.0, 2.0);
        let triangles = mesh.triangles().unwrap();

        assert_eq!(triangles.len(), 2);
        assert_eq!(triangles[1].id, 1);
        assert_eq!(triangles[1].vertices[2], Point3::new(-1.0, 1.0, 0.0));
    }

    #[test]
    fn test_flat_triangles() {
        let mesh = Mesh::from_positions(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]);
        assert_eq!(mesh.triangles().unwrap().len(), 1);
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_malformed_geometry() {
        let p = Point3::new(0.0, 0.0, 0.0);

        let partial_index = Mesh::from_indexed(vec![p; 3], vec![0, 1]);
        assert_eq!(partial_index.triangles(), Err(MeshError::IndexCountNotTriangles(2)));

        let partial_flat = Mesh::from_positions(vec![p; 4]);
        assert_eq!(partial_flat.triangles(), Err(MeshError::VertexCountNotTriangles(4)));

        let out_of_range = Mesh::from_indexed(vec![p; 3], vec![0, 1, 3]);
        assert_eq!(
            out_of_range.triangles(),
            Err(MeshError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            })
        );

        let bad_normals = Mesh::from_positions(vec![p; 3]).with_normals(vec![Vector3::unit_z()]);
        assert!(matches!(
            bad_normals.triangles(),
            Err(MeshError::NormalCountMismatch { positions: 3, normals: 1 })
        ));
    }

    #[test]
    fn test_cuboid_layout() {
        let mesh = Mesh::cuboid(2.0, 4.0, 6.0);
        assert_eq!(mesh.positions().len(), 24);
        assert_eq!(mesh.triangle_count(), 12);

        let bounds = mesh.bounding().unwrap();
        assert_eq!(bounds.min, Point3::new(-1.0, -2.0, -3.0));
        assert_eq!(bounds.max, Point3::new(1.0, 2.0, 3.0));
    }

    // ===== Spatial Index Tests =====

    #[test]
    fn test_intersect_without_index() {
        let mesh = Mesh::quad(2.0, 2.0);
        assert!(!mesh.has_spatial_index());
        assert!(mesh.intersect(&down_ray(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_intersect_quad() {
        let mut mesh = Mesh::quad(2.0, 2.0);
        mesh.update_index().unwrap();

        let hit = mesh.intersect(&down_ray(0.5, -0.5)).unwrap();
        assert!((hit.distance - 5.0).abs() < 1e-4);
        assert!((hit.hit_point.x - 0.5).abs() < 1e-4);
        assert_eq!(hit.triangle_index, 0);

        let (a, b, c) = hit.barycentric;
        assert!((a + b + c - 1.0).abs() < 1e-4);

        assert!(mesh.intersect(&down_ray(3.0, 0.0)).is_none());
    }

    #[test]
    fn test_failed_rebuild_keeps_old_index() {
        let mut mesh = Mesh::quad(2.0, 2.0);
        mesh.update_index().unwrap();

        mesh.set_indices(Some(vec![0, 1]));
        assert!(mesh.update_index().is_err());
        assert!(mesh.has_spatial_index());
        assert!(mesh.intersect(&down_ray(0.2, 0.1)).is_some());
    }

    #[test]
    fn test_stale_index_until_rebuild() {
        let mut mesh = Mesh::quad(2.0, 2.0);
        mesh.update_index().unwrap();

        // Move the quad out of the ray's path without rebuilding
        let moved = mesh
            .positions()
            .iter()
            .map(|p| Point3::new(p.x + 10.0, p.y, p.z))
            .collect();
        mesh.set_positions(moved);
        assert!(mesh.intersect(&down_ray(0.2, 0.1)).is_some());

        mesh.update_index().unwrap();
        assert!(mesh.intersect(&down_ray(0.2, 0.1)).is_none());
        assert!(mesh.intersect(&down_ray(10.2, 0.1)).is_some());
    }

    #[test]
    fn test_invalidate_index() {
        let mut mesh = Mesh::cuboid(1.0, 1.0, 1.0);
        mesh.update_index().unwrap();
        mesh.invalidate_index();

        assert!(!mesh.has_spatial_index());
        assert!(mesh.intersect(&down_ray(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_cuboid_front_face_hit() {
        let mut mesh = Mesh::cuboid(2.0, 2.0, 2.0);
        mesh.update_index().unwrap();

        let hit = mesh.intersect(&down_ray(0.25, 0.25)).unwrap();
        assert!((hit.distance - 4.0).abs() < 1e-4);
        assert!((hit.hit_point.z - 1.0).abs() < 1e-4);
    }
}
