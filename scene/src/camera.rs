use cgmath::{Deg, Matrix4, Point3, SquareMatrix};

/// How view space is mapped to clip space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective,
    /// Parallel projection covering `half_height` world units above and below
    /// the view axis; the width follows from the aspect ratio.
    Orthographic { half_height: f32 },
}

/// Projection parameters of a camera entity.
///
/// The pose is not stored here: the camera looks down the local -Z axis of its
/// entity's transform node, and the view matrix is the inverse of that node's
/// world matrix. `target` is the pivot the controllers orbit, pan, and dolly
/// toward.
///
/// # Example
///
/// ```
/// use cgmath::Point3;
/// use glance_scene::{Camera, Projection};
///
/// let camera = Camera {
///     target: Point3::new(0.0, 0.0, 0.0),
///     fovy: 45.0,
///     znear: 0.1,
///     zfar: 100.0,
///     viewport_width: 1280,
///     viewport_height: 720,
///     projection: Projection::Perspective,
/// };
/// assert!((camera.aspect() - 16.0 / 9.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// The point the camera is looking at in world space.
    pub target: Point3<f32>,
    /// Vertical field of view in degrees (used for perspective projection).
    pub fovy: f32,
    /// Distance to the near clipping plane.
    pub znear: f32,
    /// Distance to the far clipping plane.
    pub zfar: f32,
    /// Viewport width in pixels.
    pub viewport_width: u32,
    /// Viewport height in pixels.
    pub viewport_height: u32,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            target: Point3::new(0.0, 0.0, 0.0),
            fovy: 45.0,
            znear: 0.1,
            zfar: 100.0,
            viewport_width: 800,
            viewport_height: 600,
            projection: Projection::Perspective,
        }
    }
}

impl Camera {
    /// Width over height of the viewport; 1 for an empty viewport.
    pub fn aspect(&self) -> f32 {
        if self.viewport_width == 0 || self.viewport_height == 0 {
            1.0
        } else {
            self.viewport_width as f32 / self.viewport_height as f32
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    pub fn is_orthographic(&self) -> bool {
        matches!(self.projection, Projection::Orthographic { .. })
    }

    /// Right-handed projection matrix with OpenGL clip depth in [-1, 1].
    ///
    /// Returns None for a degenerate frustum: clip planes not ordered, a
    /// perspective near plane at or behind the eye, a field of view outside
    /// (0, 180) degrees, or a non-positive orthographic height.
    pub fn projection_matrix(&self) -> Option<Matrix4<f32>> {
        if !(self.zfar > self.znear) {
            return None;
        }

        let aspect = self.aspect();
        match self.projection {
            Projection::Perspective => {
                if !(self.znear > 0.0 && self.fovy > 0.0 && self.fovy < 180.0) {
                    return None;
                }
                Some(cgmath::perspective(Deg(self.fovy), aspect, self.znear, self.zfar))
            }
            Projection::Orthographic { half_height } => {
                if !(half_height > 0.0) {
                    return None;
                }
                let half_width = half_height * aspect;
                Some(cgmath::ortho(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.znear,
                    self.zfar,
                ))
            }
        }
    }

    /// View matrix for a camera whose node has the given world matrix.
    /// Returns None if that matrix is not invertible.
    pub fn view_matrix(&self, camera_world: &Matrix4<f32>) -> Option<Matrix4<f32>> {
        camera_world.invert()
    }

    /// Combined view-projection matrix, world space to clip space.
    pub fn view_projection_matrix(&self, camera_world: &Matrix4<f32>) -> Option<Matrix4<f32>> {
        Some(self.projection_matrix()? * self.view_matrix(camera_world)?)
    }

    /// Projects a world-space point to pixel coordinates (Y down) plus NDC depth.
    pub fn project_point_screen(
        &self,
        world_point: Point3<f32>,
        camera_world: &Matrix4<f32>,
    ) -> Option<Point3<f32>> {
        let vp = self.view_projection_matrix(camera_world)?;
        let ndc = Point3::from_homogeneous(vp * world_point.to_homogeneous());

        // NDC: [-1, 1] × [-1, 1], Y-up
        // Screen: [0, width] × [0, height], Y-down
        let screen_x = (ndc.x + 1.0) * 0.5 * self.viewport_width as f32;
        let screen_y = (1.0 - ndc.y) * 0.5 * self.viewport_height as f32;
        Some(Point3::new(screen_x, screen_y, ndc.z))
    }

    /// Distance from the center of a sphere of `radius` at which the whole
    /// sphere fits in both the vertical and horizontal field of view.
    pub fn fit_distance(&self, radius: f32) -> f32 {
        let half_fov_rad = (self.fovy / 2.0).to_radians();
        let vertical_distance = radius / half_fov_rad.sin();

        let half_hfov_rad = (half_fov_rad.tan() * self.aspect()).atan();
        let horizontal_distance = radius / half_hfov_rad.sin();

        vertical_distance.max(horizontal_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;

    const EPSILON: f32 = 1e-5;

    // Helper function to create a basic test camera
    fn create_test_camera() -> Camera {
        Camera {
            viewport_width: 1600,
            viewport_height: 900,
            ..Camera::default()
        }
    }

    /// World matrix of a camera at (0, 0, 5) looking down -Z.
    fn camera_world() -> Matrix4<f32> {
        Matrix4::from_translation(Vector3::new(0.0, 0.0, 5.0))
    }

    #[test]
    fn test_aspect() {
        let camera = create_test_camera();
        assert!((camera.aspect() - 16.0 / 9.0).abs() < EPSILON);

        let empty = Camera {
            viewport_height: 0,
            ..create_test_camera()
        };
        assert_eq!(empty.aspect(), 1.0);
    }

    #[test]
    fn test_view_matrix_inverts_world() {
        let camera = create_test_camera();
        let view = camera.view_matrix(&camera_world()).unwrap();

        let p = view * Point3::new(0.0, 0.0, 0.0).to_homogeneous();
        assert!((p.z - -5.0).abs() < EPSILON);
    }

    #[test]
    fn test_view_matrix_singular() {
        let camera = create_test_camera();
        assert!(camera.view_matrix(&Matrix4::from_scale(0.0)).is_none());
    }

    #[test]
    fn test_project_target_to_screen_center() {
        let camera = create_test_camera();
        let screen = camera
            .project_point_screen(Point3::new(0.0, 0.0, 0.0), &camera_world())
            .unwrap();

        assert!((screen.x - 800.0).abs() < 1e-3);
        assert!((screen.y - 450.0).abs() < 1e-3);
        assert!(screen.z > -1.0 && screen.z < 1.0);
    }

    #[test]
    fn test_orthographic_extent() {
        let camera = Camera {
            projection: Projection::Orthographic { half_height: 2.0 },
            viewport_width: 400,
            viewport_height: 200,
            ..Camera::default()
        };
        assert!(camera.is_orthographic());

        // Top edge of the view volume maps to the top of the screen
        let screen = camera
            .project_point_screen(Point3::new(4.0, 2.0, 0.0), &camera_world())
            .unwrap();
        assert!((screen.x - 400.0).abs() < 1e-3);
        assert!(screen.y.abs() < 1e-3);
    }

    #[test]
    fn test_projection_fov_matters() {
        let narrow = create_test_camera();
        let wide = Camera {
            fovy: 90.0,
            ..create_test_camera()
        };

        let a = narrow.projection_matrix().unwrap();
        let b = wide.projection_matrix().unwrap();
        assert!((a.y.y - b.y.y).abs() > EPSILON);
    }

    #[test]
    fn test_degenerate_frustum() {
        let flat = Camera {
            znear: 1.0,
            zfar: 1.0,
            ..create_test_camera()
        };
        let closed = Camera {
            fovy: 0.0,
            ..create_test_camera()
        };
        let collapsed = Camera {
            projection: Projection::Orthographic { half_height: 0.0 },
            ..create_test_camera()
        };

        assert!(flat.projection_matrix().is_none());
        assert!(closed.projection_matrix().is_none());
        assert!(collapsed.projection_matrix().is_none());
    }

    #[test]
    fn test_fit_distance_covers_sphere() {
        let camera = Camera {
            fovy: 90.0,
            viewport_width: 100,
            viewport_height: 100,
            ..Camera::default()
        };

        // Half angle 45 degrees: radius / sin(45)
        let d = camera.fit_distance(1.0);
        assert!((d - std::f32::consts::SQRT_2).abs() < 1e-4);
    }
}
