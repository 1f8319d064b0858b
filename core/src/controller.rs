//! Pointer-driven pan, zoom and orbit for a camera entity.
//!
//! A [`CameraController`] is bound to one entity and drives that entity's
//! [`Camera`](crate::scene::Camera) and transform node through the
//! [`Scene`]. The camera node is expected to be a root node, so its local
//! position is its eye position in world space.
//!
//! Only one gesture is active at a time. `start_pan` and `start_orbit` switch
//! to their gesture and record the pointer; the matching stop call returns to
//! [`Gesture::Idle`]. Incremental calls outside their gesture are ignored.

use std::f32::consts::PI;

use cgmath::{Point2, Vector3};
use serde::{Deserialize, Serialize};

use crate::common::{local_axis_y, safe_normalize, Spherical, EPSILON};
use crate::scene::{CameraRig, EntityId, Projection, Scene};

/// Smallest orthographic half-height a zoom can reach.
const MIN_ORTHO_HALF_HEIGHT: f32 = 1e-3;

/// Margin kept between the default polar bounds and the poles.
const POLE_MARGIN: f32 = 0.01;

/// The gesture a controller is currently tracking.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Gesture {
    #[default]
    Idle,
    Panning,
    Orbiting,
}

/// Tuning for [`CameraController`].
///
/// Missing fields take their default when deserialized, so a host can load a
/// partial settings file.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// World units moved when the pointer crosses the whole viewport.
    pub pan_speed: f32,
    /// World units dollied (or half-height shrunk) per unit of zoom.
    pub zoom_speed: f32,
    /// Radians turned per pixel of pointer motion.
    pub orbit_speed: f32,
    /// Zoom amounts smaller than this are ignored.
    pub zoom_epsilon: f32,
    pub min_azimuth: f32,
    pub max_azimuth: f32,
    /// Lower polar bound; 0 would look straight down from the +Y pole.
    pub min_polar: f32,
    pub max_polar: f32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            pan_speed: 1.0,
            zoom_speed: 1.0,
            orbit_speed: 0.005,
            zoom_epsilon: 1e-6,
            min_azimuth: f32::NEG_INFINITY,
            max_azimuth: f32::INFINITY,
            min_polar: POLE_MARGIN,
            max_polar: PI - POLE_MARGIN,
        }
    }
}

/// Clamps without asserting `min <= max`, so bad settings degrade instead of panicking.
fn clamp_angle(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

/// Pan, zoom and orbit state machine for a camera entity.
///
/// Every operation takes the scene; when the controller is unbound, or the
/// bound entity lacks a camera or a transform, the call does nothing.
#[derive(Debug, Clone)]
pub struct CameraController {
    entity: Option<EntityId>,
    gesture: Gesture,
    last_pointer: Point2<f32>,
    settings: ControllerSettings,
}

impl Default for CameraController {
    fn default() -> Self {
        Self {
            entity: None,
            gesture: Gesture::default(),
            last_pointer: Point2::new(0.0, 0.0),
            settings: ControllerSettings::default(),
        }
    }
}

impl CameraController {
    pub fn new(settings: ControllerSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Attaches the controller to a camera entity and drops any gesture in progress.
    pub fn bind(&mut self, entity: EntityId) {
        self.entity = Some(entity);
        self.gesture = Gesture::Idle;
    }

    pub fn unbind(&mut self) {
        self.entity = None;
        self.gesture = Gesture::Idle;
    }

    pub fn entity(&self) -> Option<EntityId> {
        self.entity
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: ControllerSettings) {
        self.settings = settings;
    }

    /// Camera and pose of the bound entity, for operations that move the eye.
    ///
    /// Motion reads and writes the node's local position as the eye, which is
    /// only the world eye for a root node. Parented cameras are refused.
    pub(crate) fn rig<'a>(&self, scene: &'a mut Scene) -> Option<CameraRig<'a>> {
        let entity = self.entity?;
        let rig = scene.camera_rig_mut(entity)?;
        if let Some(parent) = rig.transform.parent() {
            log::warn!(
                "Camera entity {} is parented to node {}; controllers only drive root cameras",
                entity,
                parent
            );
            return None;
        }
        Some(rig)
    }

    // ========== Gesture state ==========

    pub fn start_pan(&mut self, x: f32, y: f32) {
        self.gesture = Gesture::Panning;
        self.last_pointer = Point2::new(x, y);
    }

    pub fn stop_pan(&mut self) {
        if self.gesture == Gesture::Panning {
            self.gesture = Gesture::Idle;
        }
    }

    pub fn start_orbit(&mut self, x: f32, y: f32) {
        self.gesture = Gesture::Orbiting;
        self.last_pointer = Point2::new(x, y);
    }

    pub fn stop_orbit(&mut self) {
        if self.gesture == Gesture::Orbiting {
            self.gesture = Gesture::Idle;
        }
    }

    /// Records a new pointer sample and returns the motion since the last one.
    fn advance_pointer(&mut self, x: f32, y: f32) -> Option<(f32, f32)> {
        let pointer = Point2::new(x, y);
        if pointer == self.last_pointer {
            return None;
        }
        let delta = pointer - self.last_pointer;
        self.last_pointer = pointer;
        Some((delta.x, delta.y))
    }

    // ========== Camera motion ==========

    /// Slides the eye and the target together across the view plane.
    ///
    /// The pointer delta is taken as a fraction of the viewport, so crossing
    /// the full width moves `pan_speed` world units.
    pub fn pan(&mut self, scene: &mut Scene, x: f32, y: f32) {
        if self.gesture != Gesture::Panning {
            log::trace!("Pan ignored: controller is {:?}", self.gesture);
            return;
        }
        let Some((dx, dy)) = self.advance_pointer(x, y) else {
            return;
        };
        let speed = self.settings.pan_speed;
        let Some(rig) = self.rig(scene) else {
            return;
        };

        let (width, height) = (rig.camera.viewport_width, rig.camera.viewport_height);
        if width == 0 || height == 0 {
            return;
        }
        let dx = dx / width as f32 * speed;
        let dy = dy / height as f32 * speed;

        let eye = rig.transform.position();
        let Some(forward) = safe_normalize(rig.camera.target - eye) else {
            return;
        };
        let up = local_axis_y(rig.transform.orientation());
        let side = up.cross(forward);

        let offset = side * dx - up * dy;
        rig.transform.translate(offset);
        rig.camera.target += offset;
    }

    /// Zooms by `amount`; positive values move closer.
    ///
    /// A perspective camera dollies toward its target and may pass through it.
    /// An orthographic camera keeps its position and narrows its half-height.
    pub fn zoom(&mut self, scene: &mut Scene, amount: f32) {
        if amount.abs() < self.settings.zoom_epsilon {
            return;
        }
        let step = amount * self.settings.zoom_speed;
        let Some(rig) = self.rig(scene) else {
            return;
        };

        match rig.camera.projection {
            Projection::Perspective => {
                let eye = rig.transform.position();
                if let Some(forward) = safe_normalize(rig.camera.target - eye) {
                    rig.transform.translate(forward * step);
                }
            }
            Projection::Orthographic { half_height } => {
                rig.camera.projection = Projection::Orthographic {
                    half_height: (half_height - step).max(MIN_ORTHO_HALF_HEIGHT),
                };
            }
        }
    }

    /// Swings the eye around the target on a sphere of fixed radius.
    ///
    /// Horizontal motion turns the azimuth and vertical motion the polar
    /// angle, each by `orbit_speed` radians per pixel and clamped to the
    /// configured bounds. The camera is re-aimed at the target with world +Y up.
    pub fn orbit(&mut self, scene: &mut Scene, x: f32, y: f32) {
        if self.gesture != Gesture::Orbiting {
            log::trace!("Orbit ignored: controller is {:?}", self.gesture);
            return;
        }
        let Some((dx, dy)) = self.advance_pointer(x, y) else {
            return;
        };
        let settings = self.settings;
        let Some(rig) = self.rig(scene) else {
            return;
        };

        let target = rig.camera.target;
        let mut spherical = Spherical::from_offset(rig.transform.position() - target);
        if spherical.radius < EPSILON {
            return;
        }

        spherical.azimuth = clamp_angle(
            spherical.azimuth - dx * settings.orbit_speed,
            settings.min_azimuth,
            settings.max_azimuth,
        );
        spherical.polar = clamp_angle(
            spherical.polar - dy * settings.orbit_speed,
            settings.min_polar,
            settings.max_polar,
        );
        let spherical = spherical.make_safe();

        rig.transform.set_position(target + spherical.to_offset());
        rig.transform.look_at(target, Vector3::unit_y());
    }

    /// Resizes the bound camera's viewport.
    pub fn resize(&mut self, scene: &mut Scene, width: u32, height: u32) {
        if let Some(rig) = self.entity.and_then(|entity| scene.camera_rig_mut(entity)) {
            rig.camera.set_viewport(width, height);
        }
    }
}
