use crate::controller::{ControllerSettings, Gesture};
use crate::input::{ElementState, InputEvent, MouseButton};
use crate::operator::{Operator, OperatorId};
use crate::orbit_camera::OrbitCamera;
use crate::scene::{EntityId, Scene};

/// Operator for camera navigation via the mouse.
///
/// - Left mouse button + drag: Orbit camera around target
/// - Right or middle mouse button + drag: Pan camera perpendicular to view direction
/// - Mouse wheel: Zoom in/out (pixel deltas count 100 pixels per line)
///
/// Resize events update the camera viewport but are left for other operators.
pub struct NavigationOperator {
    id: OperatorId,
    camera: OrbitCamera,
    cursor: Option<(f32, f32)>,
}

impl NavigationOperator {
    /// Creates a navigation operator driving the given camera entity.
    pub fn new(id: OperatorId, camera_entity: EntityId) -> Self {
        Self::with_settings(id, camera_entity, ControllerSettings::default())
    }

    pub fn with_settings(id: OperatorId, camera_entity: EntityId, settings: ControllerSettings) -> Self {
        let mut camera = OrbitCamera::new(settings);
        camera.bind(camera_entity);
        Self {
            id,
            camera,
            cursor: None,
        }
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    fn handle_button(&mut self, state: ElementState, button: MouseButton) -> bool {
        match (state, button) {
            (ElementState::Pressed, MouseButton::Left) => {
                let Some((x, y)) = self.cursor else {
                    return false;
                };
                self.camera.start_orbit(x, y);
                true
            }
            (ElementState::Pressed, MouseButton::Right | MouseButton::Middle) => {
                let Some((x, y)) = self.cursor else {
                    return false;
                };
                self.camera.start_pan(x, y);
                true
            }
            (ElementState::Released, MouseButton::Left) if self.camera.gesture() == Gesture::Orbiting => {
                self.camera.stop_orbit();
                true
            }
            (ElementState::Released, MouseButton::Right | MouseButton::Middle)
                if self.camera.gesture() == Gesture::Panning =>
            {
                self.camera.stop_pan();
                true
            }
            _ => false,
        }
    }
}

impl Operator for NavigationOperator {
    fn id(&self) -> OperatorId {
        self.id
    }

    fn name(&self) -> &str {
        "Navigation"
    }

    fn handle_event(&mut self, event: &InputEvent, scene: &mut Scene) -> bool {
        match *event {
            InputEvent::CursorMoved { position } => {
                self.cursor = Some(position);
                let (x, y) = position;
                match self.camera.gesture() {
                    Gesture::Orbiting => {
                        self.camera.orbit(scene, x, y);
                        true
                    }
                    Gesture::Panning => {
                        self.camera.pan(scene, x, y);
                        true
                    }
                    Gesture::Idle => false,
                }
            }
            InputEvent::MouseInput { state, button } => self.handle_button(state, button),
            InputEvent::MouseWheel { delta } => {
                // Positive = zoom in, negative = zoom out
                self.camera.zoom(scene, delta.lines_y());
                true
            }
            InputEvent::Resized((width, height)) => {
                self.camera.controller_mut().resize(scene, width, height);
                false
            }
        }
    }
}
