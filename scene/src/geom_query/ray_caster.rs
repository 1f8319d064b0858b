use cgmath::{InnerSpace, Matrix4, Point2, Point3, SquareMatrix, Vector3, Vector4};

use crate::common::{safe_normalize, Ray};
use crate::scene::{ComponentLookup, EntityId};
use crate::{Camera, Mesh, Projection};

/// Hit of the caster's ray on a single mesh, in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshIntersection {
    /// Distance from the world ray origin to the hit point
    pub distance: f32,
    /// World-space hit location
    pub hit_point: Point3<f32>,
    /// Index of the triangle that was hit (index into the mesh's index buffer / 3)
    pub triangle_index: usize,
    /// Weights of the hit triangle's three corners at the hit point
    pub barycentric: (f32, f32, f32),
}

/// Hit of the caster's ray on an entity's drawable.
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    /// The entity that was hit
    pub entity: EntityId,
    /// Distance from the world ray origin to the hit point
    pub distance: f32,
    /// World-space hit location
    pub hit_point: Point3<f32>,
    /// Index of the triangle that was hit (index into the mesh's index buffer / 3)
    pub triangle_index: usize,
    /// Weights of the hit triangle's three corners at the hit point
    pub barycentric: (f32, f32, f32),
}

/// Holds a world-space ray and tests it against meshes.
///
/// The ray is usually built from a pointer position with
/// [`Raycaster::set_from_camera`]. Meshes are tested in their own local space
/// through their spatial index, so every mesh must have had
/// [`Mesh::update_index`] called; meshes without an index never report hits.
#[derive(Debug, Clone)]
pub struct Raycaster {
    ray: Ray,
}

impl Default for Raycaster {
    fn default() -> Self {
        Self::new(Ray::new(Point3::new(0.0, 0.0, 0.0), -Vector3::unit_z()))
    }
}

impl Raycaster {
    pub fn new(ray: Ray) -> Self {
        Self { ray }
    }

    pub fn ray(&self) -> &Ray {
        &self.ray
    }

    pub fn set_ray(&mut self, ray: Ray) {
        self.ray = ray;
    }

    /// Aims the ray through a pixel of the camera's viewport.
    ///
    /// `screen` is in pixels with the origin at the top-left corner and Y down.
    /// `camera_world` is the world matrix of the camera's transform node. A
    /// perspective camera casts from its world position; an orthographic one
    /// casts from the pixel's spot on the view plane along the view direction.
    ///
    /// Returns the new ray, or None (keeping the previous ray) when the viewport
    /// is empty or the projection cannot be inverted.
    pub fn set_from_camera(
        &mut self,
        screen: Point2<f32>,
        camera: &Camera,
        camera_world: &Matrix4<f32>,
    ) -> Option<Ray> {
        if camera.viewport_width == 0 || camera.viewport_height == 0 {
            return None;
        }

        // Screen: [0, width] × [0, height], Y-down
        // NDC: [-1, 1] × [-1, 1], Y-up
        let ndc_x = 2.0 * screen.x / camera.viewport_width as f32 - 1.0;
        let ndc_y = 1.0 - 2.0 * screen.y / camera.viewport_height as f32;

        let inv_projection = camera.projection_matrix()?.invert()?;
        let eye = inv_projection * Vector4::new(ndc_x, ndc_y, -1.0, 1.0);

        let ray = match camera.projection {
            Projection::Perspective => {
                let direction = (camera_world * Vector4::new(eye.x, eye.y, -1.0, 0.0)).truncate();
                let origin = Point3::from_homogeneous(camera_world.w);
                Ray::new(origin, safe_normalize(direction)?)
            }
            Projection::Orthographic { .. } => {
                let on_plane = camera_world * Vector4::new(eye.x / eye.w, eye.y / eye.w, 0.0, 1.0);
                let direction = (camera_world * Vector4::new(0.0, 0.0, -1.0, 0.0)).truncate();
                Ray::new(Point3::from_homogeneous(on_plane), safe_normalize(direction)?)
            }
        };

        if !(ray.origin.x.is_finite() && ray.origin.y.is_finite() && ray.origin.z.is_finite()) {
            return None;
        }

        self.ray = ray;
        Some(ray)
    }

    /// Tests the ray against one mesh placed by `model` (local to world).
    ///
    /// The reported distance is measured in world space, so hits on scaled
    /// meshes compare correctly against each other. Returns None on a miss,
    /// when the mesh has no spatial index, or when `model` is singular.
    pub fn intersect_mesh(&self, mesh: &Mesh, model: &Matrix4<f32>) -> Option<MeshIntersection> {
        let world_to_local = model.invert()?;
        let local_ray = self.ray.transform(&world_to_local);

        let hit = mesh.intersect(&local_ray)?;
        let hit_point = Point3::from_homogeneous(model * hit.hit_point.to_homogeneous());

        Some(MeshIntersection {
            distance: (hit_point - self.ray.origin).magnitude(),
            hit_point,
            triangle_index: hit.triangle_index,
            barycentric: hit.barycentric,
        })
    }

    /// Tests the ray against the given entities and returns hits nearest first.
    ///
    /// Entities without both a drawable and a transform are skipped.
    pub fn intersect_entities<L, I>(&self, lookup: &L, entities: I) -> Vec<Intersection>
    where
        L: ComponentLookup + ?Sized,
        I: IntoIterator<Item = EntityId>,
    {
        let mut results = Vec::new();

        for entity in entities {
            let (Some(mesh), Some(transform)) = (lookup.drawable(entity), lookup.transform(entity))
            else {
                log::trace!("Skipping entity {} during ray cast: missing drawable or transform", entity);
                continue;
            };

            if !mesh.has_spatial_index() {
                log::trace!("Skipping entity {} during ray cast: mesh has no spatial index", entity);
                continue;
            }

            if let Some(hit) = self.intersect_mesh(mesh, &transform.world_matrix()) {
                results.push(Intersection {
                    entity,
                    distance: hit.distance,
                    hit_point: hit.hit_point,
                    triangle_index: hit.triangle_index,
                    barycentric: hit.barycentric,
                });
            }
        }

        // Sort by distance (closest first)
        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        results
    }

    /// Tests the ray against every entity the lookup knows about.
    pub fn intersect_all<L: ComponentLookup + ?Sized>(&self, lookup: &L) -> Vec<Intersection> {
        self.intersect_entities(lookup, lookup.entity_ids())
    }
}
