//! Orientation helpers shared by the transform hierarchy and camera controllers.
//!
//! Conventions: local +Y is up and the viewing direction of a node is local -Z,
//! matching the camera convention of the view matrix.

use cgmath::{InnerSpace, Matrix3, Point3, Quaternion, Rotation, Vector3};

use super::EPSILON;

// =============================================================================
// Axis Computation
// =============================================================================

/// Computes the local Y axis (up) for a given orientation.
///
/// # Arguments
/// * `rotation` - The orientation quaternion
///
/// # Returns
/// A unit vector representing the local Y axis in world space
pub fn local_axis_y(rotation: Quaternion<f32>) -> Vector3<f32> {
    rotation.rotate_vector(Vector3::unit_y())
}

/// Computes the local Z axis for a given orientation. The node looks down the
/// negation of this axis.
pub fn local_axis_z(rotation: Quaternion<f32>) -> Vector3<f32> {
    rotation.rotate_vector(Vector3::unit_z())
}

// =============================================================================
// Orientation
// =============================================================================

/// Normalizes `v`, or returns None when it is too short to carry a direction.
pub fn safe_normalize(v: Vector3<f32>) -> Option<Vector3<f32>> {
    let len2 = v.magnitude2();
    if len2 > EPSILON * EPSILON {
        Some(v / len2.sqrt())
    } else {
        None
    }
}

/// Builds the orientation whose local -Z points from `eye` toward `target`
/// with local +Y as close to `up` as possible.
///
/// # Arguments
/// * `eye` - Position of the oriented node
/// * `target` - Point to face
/// * `up` - Preferred up direction; replaced by another world axis when it is
///   parallel to the viewing direction
///
/// # Returns
/// The orientation, or None when `eye` and `target` coincide
pub fn look_at_rotation(
    eye: Point3<f32>,
    target: Point3<f32>,
    up: Vector3<f32>,
) -> Option<Quaternion<f32>> {
    let forward = safe_normalize(target - eye)?;

    let right = safe_normalize(forward.cross(up))
        .or_else(|| safe_normalize(forward.cross(Vector3::unit_z())))
        .or_else(|| safe_normalize(forward.cross(Vector3::unit_x())))?;
    let true_up = right.cross(forward);

    let basis = Matrix3::from_cols(right, true_up, -forward);
    Some(Quaternion::from(basis).normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, EuclideanSpace, Rotation3};

    const TEST_EPSILON: f32 = 1e-5;

    // ===== Axis Tests =====

    #[test]
    fn test_local_axes_identity() {
        let rotation = Quaternion::new(1.0, 0.0, 0.0, 0.0);

        assert!((local_axis_y(rotation).y - 1.0).abs() < TEST_EPSILON);
        assert!((local_axis_z(rotation).z - 1.0).abs() < TEST_EPSILON);
    }

    #[test]
    fn test_local_axes_90_deg_x_rotation() {
        let rotation = Quaternion::from_angle_x(Deg(90.0));

        // Y -> Z, Z -> -Y
        let up = local_axis_y(rotation);
        let back = local_axis_z(rotation);
        assert!((up.z - 1.0).abs() < TEST_EPSILON);
        assert!((back.y - -1.0).abs() < TEST_EPSILON);
    }

    // ===== safe_normalize Tests =====

    #[test]
    fn test_safe_normalize() {
        let n = safe_normalize(Vector3::new(0.0, 3.0, 4.0)).unwrap();
        assert!((n.magnitude() - 1.0).abs() < TEST_EPSILON);
        assert!(safe_normalize(Vector3::new(0.0, 0.0, 0.0)).is_none());
    }

    // ===== look_at_rotation Tests =====

    #[test]
    fn test_look_at_down_negative_z_is_identity() {
        let q = look_at_rotation(
            Point3::new(0.0, 0.0, 5.0),
            Point3::origin(),
            Vector3::unit_y(),
        )
        .unwrap();

        assert!((q.s.abs() - 1.0).abs() < TEST_EPSILON);
        assert!(q.v.magnitude() < TEST_EPSILON);
    }

    #[test]
    fn test_look_at_faces_target() {
        let eye = Point3::new(3.0, 2.0, -1.0);
        let target = Point3::new(-1.0, 0.5, 2.0);
        let q = look_at_rotation(eye, target, Vector3::unit_y()).unwrap();

        let facing = -local_axis_z(q);
        let expected = (target - eye).normalize();
        assert!((facing - expected).magnitude() < TEST_EPSILON);
        // Up stays in the upper hemisphere
        assert!(local_axis_y(q).y > 0.0);
    }

    #[test]
    fn test_look_at_straight_down_uses_fallback_up() {
        let q = look_at_rotation(
            Point3::new(0.0, 10.0, 0.0),
            Point3::origin(),
            Vector3::unit_y(),
        )
        .unwrap();

        let facing = -local_axis_z(q);
        assert!((facing.y - -1.0).abs() < TEST_EPSILON);
    }

    #[test]
    fn test_look_at_coincident_points() {
        let p = Point3::new(1.0, 1.0, 1.0);
        assert!(look_at_rotation(p, p, Vector3::unit_y()).is_none());
    }
}
