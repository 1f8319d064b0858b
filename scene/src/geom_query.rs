mod ray_caster;

pub use ray_caster::{Intersection, MeshIntersection, Raycaster};
