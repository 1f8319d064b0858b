pub mod camera;
pub use glance_common as common;
pub mod geom_query;
pub mod mesh;
pub mod scene;
pub mod transform;

pub use camera::{Camera, Projection};
pub use geom_query::{Intersection, MeshIntersection, Raycaster};
pub use mesh::{Mesh, MeshError, MeshHit, MeshIndex};
pub use scene::{
    CameraId, CameraRig, ComponentLookup, Entity, EntityId, MeshId, Scene, SceneError,
};
pub use transform::{NodeId, TransformError, TransformNode, TransformTree};
