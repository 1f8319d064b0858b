use std::collections::HashMap;

use cgmath::{Matrix4, Point2};
use thiserror::Error;

use crate::common::{Aabb, Ray};
use crate::geom_query::{Intersection, Raycaster};
use crate::{Camera, Mesh, MeshError, NodeId, TransformError, TransformNode, TransformTree};

pub type EntityId = u32;
pub type MeshId = u32;
pub type CameraId = u32;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Entity {0} not found in scene")]
    EntityNotFound(EntityId),
    #[error("Mesh {0} not found in scene")]
    MeshNotFound(MeshId),
    #[error("Camera {0} not found in scene")]
    CameraNotFound(CameraId),
    #[error("Entity {0} has no transform")]
    MissingTransform(EntityId),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Read access to the components the ray caster needs.
///
/// A missing component is reported as None and the entity is skipped by
/// queries, never treated as an error.
pub trait ComponentLookup {
    /// Every entity queries should consider, in a stable order.
    fn entity_ids(&self) -> Vec<EntityId>;

    /// The mesh drawn by `entity`, if any.
    fn drawable(&self, entity: EntityId) -> Option<&Mesh>;

    /// The transform node placing `entity`, if any.
    fn transform(&self, entity: EntityId) -> Option<&TransformNode>;
}

/// Component slots of one entity. Every slot is a handle into the owning [`Scene`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entity {
    pub name: Option<String>,
    pub transform: Option<NodeId>,
    pub drawable: Option<MeshId>,
    pub camera: Option<CameraId>,
}

/// Mutable view of a camera entity's projection and pose.
pub struct CameraRig<'a> {
    pub camera: &'a mut Camera,
    pub transform: &'a mut TransformNode,
}

/// A minimal entity container: a transform hierarchy plus mesh and camera
/// stores, with entities tying them together.
///
/// # Example
///
/// ```
/// use cgmath::{Point2, Point3};
/// use glance_scene::{Camera, Mesh, Scene};
///
/// let mut scene = Scene::new();
/// let cube = scene.add_mesh(Mesh::cuboid(2.0, 2.0, 2.0));
/// scene.update_spatial_indices().unwrap();
/// scene.add_drawable_entity(Some("cube".into()), cube, None).unwrap();
///
/// let camera = scene.add_camera(Camera::default());
/// let eye = scene
///     .add_camera_entity(None, camera, Point3::new(0.0, 0.0, 5.0))
///     .unwrap();
///
/// let hits = scene.pick(eye, Point2::new(400.0, 300.0));
/// assert_eq!(hits.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub transforms: TransformTree,
    pub meshes: HashMap<MeshId, Mesh>,
    pub cameras: HashMap<CameraId, Camera>,
    pub entities: HashMap<EntityId, Entity>,

    next_mesh_id: MeshId,
    next_camera_id: CameraId,
    next_entity_id: EntityId,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Mesh API ==========

    /// Adds a mesh to the scene and returns its ID.
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        let id = self.next_mesh_id;
        self.next_mesh_id += 1;
        self.meshes.insert(id, mesh);
        id
    }

    pub fn get_mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(&id)
    }

    pub fn get_mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.get_mut(&id)
    }

    /// Builds the spatial index of every mesh that lacks one.
    ///
    /// # Errors
    /// Stops at the first malformed mesh; meshes indexed before it keep their index.
    pub fn update_spatial_indices(&mut self) -> Result<(), SceneError> {
        let mut ids: Vec<MeshId> = self.meshes.keys().copied().collect();
        ids.sort_unstable();

        for id in ids {
            if let Some(mesh) = self.meshes.get_mut(&id) {
                if !mesh.has_spatial_index() {
                    mesh.update_index().inspect_err(|e| {
                        log::warn!("Cannot index mesh {}: {}", id, e);
                    })?;
                }
            }
        }
        Ok(())
    }

    // ========== Camera API ==========

    pub fn add_camera(&mut self, camera: Camera) -> CameraId {
        let id = self.next_camera_id;
        self.next_camera_id += 1;
        self.cameras.insert(id, camera);
        id
    }

    pub fn get_camera(&self, id: CameraId) -> Option<&Camera> {
        self.cameras.get(&id)
    }

    pub fn get_camera_mut(&mut self, id: CameraId) -> Option<&mut Camera> {
        self.cameras.get_mut(&id)
    }

    // ========== Entity API ==========

    /// Adds an entity with no components.
    pub fn add_entity(&mut self, name: Option<String>) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        self.entities.insert(
            id,
            Entity {
                name,
                ..Entity::default()
            },
        );
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Adds an entity drawing `mesh`, with a fresh transform node under `parent`.
    ///
    /// # Errors
    /// Fails if the mesh or the parent node doesn't exist.
    pub fn add_drawable_entity(
        &mut self,
        name: Option<String>,
        mesh: MeshId,
        parent: Option<NodeId>,
    ) -> Result<EntityId, SceneError> {
        if !self.meshes.contains_key(&mesh) {
            return Err(SceneError::MeshNotFound(mesh));
        }
        let node = self.transforms.add_node(parent)?;

        let id = self.add_entity(name);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.transform = Some(node);
            entity.drawable = Some(mesh);
        }
        Ok(id)
    }

    /// Adds a root-level camera entity at `position`, aimed at the camera's target.
    ///
    /// # Errors
    /// Fails if the camera doesn't exist.
    pub fn add_camera_entity(
        &mut self,
        name: Option<String>,
        camera: CameraId,
        position: cgmath::Point3<f32>,
    ) -> Result<EntityId, SceneError> {
        let target = self
            .cameras
            .get(&camera)
            .ok_or(SceneError::CameraNotFound(camera))?
            .target;
        let node = self.transforms.add_node(None)?;
        if let Some(transform) = self.transforms.get_mut(node) {
            transform.set_position(position);
            transform.look_at(target, cgmath::Vector3::unit_y());
        }

        let id = self.add_entity(name);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.transform = Some(node);
            entity.camera = Some(camera);
        }
        Ok(id)
    }

    fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, SceneError> {
        self.entities.get_mut(&id).ok_or(SceneError::EntityNotFound(id))
    }

    pub fn set_transform(&mut self, id: EntityId, node: Option<NodeId>) -> Result<(), SceneError> {
        if let Some(node) = node {
            if !self.transforms.contains(node) {
                return Err(TransformError::NodeNotFound(node).into());
            }
        }
        self.entity_mut(id)?.transform = node;
        Ok(())
    }

    pub fn set_drawable(&mut self, id: EntityId, mesh: Option<MeshId>) -> Result<(), SceneError> {
        if let Some(mesh) = mesh {
            if !self.meshes.contains_key(&mesh) {
                return Err(SceneError::MeshNotFound(mesh));
            }
        }
        self.entity_mut(id)?.drawable = mesh;
        Ok(())
    }

    pub fn set_camera(&mut self, id: EntityId, camera: Option<CameraId>) -> Result<(), SceneError> {
        if let Some(camera) = camera {
            if !self.cameras.contains_key(&camera) {
                return Err(SceneError::CameraNotFound(camera));
            }
        }
        self.entity_mut(id)?.camera = camera;
        Ok(())
    }

    /// Parents `child`'s transform under `parent`'s, or detaches it when `parent` is None.
    ///
    /// # Errors
    /// Fails if either entity is missing or has no transform, or if the link
    /// would make a node its own ancestor.
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> Result<(), SceneError> {
        let child_node = self.transform_id(child)?;
        let parent_node = parent.map(|p| self.transform_id(p)).transpose()?;

        self.transforms
            .set_parent(child_node, parent_node)
            .map_err(|e| {
                log::warn!("Rejected reparenting of entity {}: {}", child, e);
                e.into()
            })
    }

    fn transform_id(&self, id: EntityId) -> Result<NodeId, SceneError> {
        self.entities
            .get(&id)
            .ok_or(SceneError::EntityNotFound(id))?
            .transform
            .ok_or(SceneError::MissingTransform(id))
    }

    /// Removes an entity and, when it has one, its transform subtree.
    ///
    /// Entities placed by a removed node lose their transform slot. Meshes and
    /// cameras stay in their stores.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<Entity, SceneError> {
        let entity = self.entities.remove(&id).ok_or(SceneError::EntityNotFound(id))?;

        if let Some(node) = entity.transform {
            if let Ok(removed) = self.transforms.remove_node(node) {
                for other in self.entities.values_mut() {
                    if other.transform.is_some_and(|n| removed.contains(&n)) {
                        other.transform = None;
                    }
                }
            }
        }
        Ok(entity)
    }

    /// Gives simultaneous mutable access to a camera entity's camera and transform.
    pub fn camera_rig_mut(&mut self, id: EntityId) -> Option<CameraRig<'_>> {
        let entity = self.entities.get(&id)?;
        let (camera_id, node_id) = (entity.camera?, entity.transform?);

        Some(CameraRig {
            camera: self.cameras.get_mut(&camera_id)?,
            transform: self.transforms.get_mut(node_id)?,
        })
    }

    // ========== Frame update & queries ==========

    /// Refreshes world matrices; returns the number of nodes recomputed.
    pub fn update(&mut self) -> usize {
        self.transforms.update()
    }

    /// World matrix of an entity's transform as of the last update.
    pub fn world_matrix(&self, id: EntityId) -> Option<Matrix4<f32>> {
        self.transform(id).map(TransformNode::world_matrix)
    }

    /// World-space bounds of every drawable entity, using matrices from the last update.
    /// Returns None if nothing is drawn.
    pub fn bounding(&self) -> Option<Aabb> {
        self.entity_ids()
            .into_iter()
            .filter_map(|id| {
                let mesh = self.drawable(id)?;
                let world = self.transform(id)?.world_matrix();
                Some(mesh.bounding()?.transform(&world))
            })
            .reduce(|acc, b| acc.merge(&b))
    }

    /// Builds the world ray through a pixel of a camera entity's viewport.
    /// Uses matrices from the last update.
    pub fn camera_ray(&self, camera_entity: EntityId, screen: Point2<f32>) -> Option<Ray> {
        let entity = self.entities.get(&camera_entity)?;
        let camera = self.cameras.get(&entity.camera?)?;
        let world = self.transforms.get(entity.transform?)?.world_matrix();

        Raycaster::default().set_from_camera(screen, camera, &world)
    }

    /// Updates transforms, then casts through `screen` from the camera entity
    /// and returns every drawable hit, nearest first.
    ///
    /// Returns nothing when the entity lacks a camera or a transform.
    pub fn pick(&mut self, camera_entity: EntityId, screen: Point2<f32>) -> Vec<Intersection> {
        self.update();

        let Some(ray) = self.camera_ray(camera_entity, screen) else {
            log::trace!("Pick from entity {} ignored: not a usable camera", camera_entity);
            return Vec::new();
        };
        Raycaster::new(ray).intersect_all(self)
    }
}

impl ComponentLookup for Scene {
    fn entity_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn drawable(&self, entity: EntityId) -> Option<&Mesh> {
        self.meshes.get(&self.entities.get(&entity)?.drawable?)
    }

    fn transform(&self, entity: EntityId) -> Option<&TransformNode> {
        self.transforms.get(self.entities.get(&entity)?.transform?)
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
