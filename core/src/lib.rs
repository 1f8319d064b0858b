//! Interactive camera control for a glance scene.
//!
//! The geometry and scene layers live in their own crates and are re-exported
//! here; this crate adds host-independent input types, the pan/zoom/orbit
//! controllers and the operators that route input to them.

pub mod controller;
pub mod input;
pub mod operator;
pub mod orbit_camera;

// `pub use ... as scene` makes crate::scene::* resolve to glance_scene::*
pub use glance_scene as scene;
pub use glance_scene::common;
pub use glance_scene::geom_query;

pub use controller::{CameraController, ControllerSettings, Gesture};
pub use input::{ElementState, InputEvent, MouseButton, MouseScrollDelta};
pub use operator::{NavigationOperator, Operator, OperatorId, OperatorManager};
pub use orbit_camera::OrbitCamera;
pub use glance_scene::{Camera, Projection, Scene};
