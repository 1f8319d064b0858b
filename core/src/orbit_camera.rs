use cgmath::{InnerSpace, Point3, Vector3};

use crate::common::{safe_normalize, Aabb, EPSILON};
use crate::controller::{CameraController, ControllerSettings, Gesture};
use crate::scene::{EntityId, Projection, Scene};

/// Radius used when framing bounds that have no extent.
const DEFAULT_FRAME_RADIUS: f32 = 1.0;

/// A [`CameraController`] that never dollies through its target, plus helpers
/// to re-aim and frame the camera.
#[derive(Debug, Clone, Default)]
pub struct OrbitCamera {
    controller: CameraController,
}

impl OrbitCamera {
    pub fn new(settings: ControllerSettings) -> Self {
        Self {
            controller: CameraController::new(settings),
        }
    }

    pub fn controller(&self) -> &CameraController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut CameraController {
        &mut self.controller
    }

    pub fn bind(&mut self, entity: EntityId) {
        self.controller.bind(entity);
    }

    pub fn unbind(&mut self) {
        self.controller.unbind();
    }

    pub fn gesture(&self) -> Gesture {
        self.controller.gesture()
    }

    pub fn start_pan(&mut self, x: f32, y: f32) {
        self.controller.start_pan(x, y);
    }

    pub fn stop_pan(&mut self) {
        self.controller.stop_pan();
    }

    pub fn start_orbit(&mut self, x: f32, y: f32) {
        self.controller.start_orbit(x, y);
    }

    pub fn stop_orbit(&mut self) {
        self.controller.stop_orbit();
    }

    pub fn pan(&mut self, scene: &mut Scene, x: f32, y: f32) {
        self.controller.pan(scene, x, y);
    }

    pub fn orbit(&mut self, scene: &mut Scene, x: f32, y: f32) {
        self.controller.orbit(scene, x, y);
    }

    /// Zooms like [`CameraController::zoom`], except that a perspective dolly
    /// which would reach or pass the target is rejected.
    ///
    /// Returns whether the camera changed.
    pub fn zoom(&mut self, scene: &mut Scene, amount: f32) -> bool {
        let settings = *self.controller.settings();
        if amount.abs() < settings.zoom_epsilon {
            return false;
        }
        let Some(rig) = self.controller.rig(scene) else {
            return false;
        };

        if rig.camera.projection == Projection::Perspective {
            let eye = rig.transform.position();
            let target = rig.camera.target;
            let Some(forward) = safe_normalize(target - eye) else {
                return false;
            };

            let moved = eye + forward * (amount * settings.zoom_speed);
            if (target - moved).dot(forward) <= 0.0 {
                log::trace!("Zoom of {} rejected: would pass the orbit target", amount);
                return false;
            }
        }

        self.controller.zoom(scene, amount);
        true
    }

    /// Moves the orbit target and turns the camera to face it, keeping the eye in place.
    pub fn set_target(&mut self, scene: &mut Scene, target: Point3<f32>) {
        if let Some(rig) = self.controller.rig(scene) {
            rig.camera.target = target;
            rig.transform.look_at(target, Vector3::unit_y());
        }
    }

    /// Positions the camera so the whole of `bounds` is visible.
    ///
    /// The view direction is kept; the target moves to the center of the
    /// bounds and the eye backs off until the bounding sphere fits in the field
    /// of view. Clip planes are widened to enclose the sphere. Returns false if
    /// the bounds are empty or the controller has no camera.
    pub fn frame_bounds(&mut self, scene: &mut Scene, bounds: &Aabb) -> bool {
        if bounds.is_empty() {
            return false;
        }
        let Some(rig) = self.controller.rig(scene) else {
            return false;
        };

        let center = bounds.center();
        let radius = match bounds.bounding_sphere_radius() {
            r if r > EPSILON => r,
            _ => DEFAULT_FRAME_RADIUS,
        };

        let view_dir = safe_normalize(rig.camera.target - rig.transform.position())
            .unwrap_or(-Vector3::unit_z());

        let distance = match rig.camera.projection {
            Projection::Perspective => rig.camera.fit_distance(radius),
            Projection::Orthographic { .. } => {
                // Fit the narrower of the two extents around the sphere
                let aspect = rig.camera.aspect();
                let half_height = if aspect < 1.0 { radius / aspect } else { radius };
                rig.camera.projection = Projection::Orthographic { half_height };
                radius * 2.0
            }
        };

        rig.camera.target = center;
        rig.transform.set_position(center - view_dir * distance);
        rig.transform.look_at(center, Vector3::unit_y());

        rig.camera.znear = (distance * 0.001).max(0.001);
        rig.camera.zfar = (distance + radius) * 2.0;

        log::debug!(
            "Framed bounds centered at {:?} (radius {}) from distance {}",
            center,
            radius,
            distance
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Camera;
    use cgmath::MetricSpace;

    const TEST_EPSILON: f32 = 1e-4;

    fn orbit_scene() -> (Scene, EntityId, OrbitCamera) {
        let mut scene = Scene::new();
        let camera = scene.add_camera(Camera::default());
        let eye = scene
            .add_camera_entity(None, camera, Point3::new(0.0, 0.0, 5.0))
            .unwrap();

        let mut orbit = OrbitCamera::default();
        orbit.bind(eye);
        (scene, eye, orbit)
    }

    fn eye_position(scene: &mut Scene, entity: EntityId) -> Point3<f32> {
        scene.camera_rig_mut(entity).unwrap().transform.position()
    }

    // ===== Guarded Zoom Tests =====

    #[test]
    fn test_zoom_toward_target() {
        let (mut scene, eye, mut orbit) = orbit_scene();

        assert!(orbit.zoom(&mut scene, 4.0));
        assert!((eye_position(&mut scene, eye).z - 1.0).abs() < TEST_EPSILON);
    }

    #[test]
    fn test_zoom_through_target_rejected() {
        let (mut scene, eye, mut orbit) = orbit_scene();

        assert!(!orbit.zoom(&mut scene, 6.0));
        assert!((eye_position(&mut scene, eye).z - 5.0).abs() < EPSILON);

        // Landing exactly on the target is rejected too
        assert!(!orbit.zoom(&mut scene, 5.0));
        assert!((eye_position(&mut scene, eye).z - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_zoom_below_epsilon_is_noop() {
        let (mut scene, eye, mut orbit) = orbit_scene();

        assert!(!orbit.zoom(&mut scene, 0.0));
        assert!((eye_position(&mut scene, eye).z - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_zoom_out_always_allowed() {
        let (mut scene, eye, mut orbit) = orbit_scene();

        assert!(orbit.zoom(&mut scene, -10.0));
        assert!((eye_position(&mut scene, eye).z - 15.0).abs() < TEST_EPSILON);
    }

    #[test]
    fn test_zoom_unbound_reports_no_change() {
        let (mut scene, _eye, mut orbit) = orbit_scene();
        orbit.unbind();
        assert!(!orbit.zoom(&mut scene, 1.0));
    }

    // ===== Target & Framing Tests =====

    #[test]
    fn test_set_target_reaims() {
        let (mut scene, eye, mut orbit) = orbit_scene();

        orbit.set_target(&mut scene, Point3::new(5.0, 0.0, 5.0));

        let rig = scene.camera_rig_mut(eye).unwrap();
        assert!(rig.camera.target.distance(Point3::new(5.0, 0.0, 5.0)) < TEST_EPSILON);
        assert!(rig.transform.position().distance(Point3::new(0.0, 0.0, 5.0)) < TEST_EPSILON);

        // Local -Z now points down +X
        let forward = rig.transform.orientation() * -Vector3::unit_z();
        assert!((forward.x - 1.0).abs() < TEST_EPSILON);
    }

    #[test]
    fn test_frame_bounds_keeps_view_direction() {
        let (mut scene, eye, mut orbit) = orbit_scene();
        let camera = scene.entity(eye).unwrap().camera.unwrap();
        {
            let camera = scene.get_camera_mut(camera).unwrap();
            camera.fovy = 90.0;
            camera.set_viewport(100, 100);
        }

        let bounds = Aabb::new(Point3::new(2.0, -1.0, -1.0), Point3::new(4.0, 1.0, 1.0));
        assert!(orbit.frame_bounds(&mut scene, &bounds));

        // sqrt(3) / sin(45 degrees)
        let expected = 3.0f32.sqrt() * std::f32::consts::SQRT_2;
        let rig = scene.camera_rig_mut(eye).unwrap();
        assert!(rig.camera.target.distance(Point3::new(3.0, 0.0, 0.0)) < TEST_EPSILON);
        let position = rig.transform.position();
        assert!((position.x - 3.0).abs() < TEST_EPSILON);
        assert!((position.z - expected).abs() < TEST_EPSILON);
        assert!(rig.camera.zfar > expected + 3.0f32.sqrt());
    }

    #[test]
    fn test_frame_bounds_orthographic() {
        let (mut scene, eye, mut orbit) = orbit_scene();
        let camera = scene.entity(eye).unwrap().camera.unwrap();
        scene.get_camera_mut(camera).unwrap().projection =
            Projection::Orthographic { half_height: 10.0 };

        let bounds = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        assert!(orbit.frame_bounds(&mut scene, &bounds));

        let Projection::Orthographic { half_height } = scene.get_camera(camera).unwrap().projection
        else {
            panic!("projection kind changed");
        };
        assert!((half_height - 3.0f32.sqrt()).abs() < TEST_EPSILON);
    }

    #[test]
    fn test_frame_empty_bounds_rejected() {
        let (mut scene, _eye, mut orbit) = orbit_scene();
        assert!(!orbit.frame_bounds(&mut scene, &Aabb::empty()));
    }
}
