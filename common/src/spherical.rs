use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector3};

use crate::EPSILON;

/// Spherical coordinates of an offset around +Y.
///
/// `azimuth` is measured in the XZ plane from +Z toward +X; `polar` is the angle
/// from +Y, so 0 looks straight down on the pivot and PI straight up at it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub azimuth: f32,
    pub polar: f32,
}

impl Spherical {
    pub fn new(radius: f32, azimuth: f32, polar: f32) -> Self {
        Self {
            radius,
            azimuth,
            polar,
        }
    }

    /// Reparametrizes an offset vector. The polar angle is clamped into
    /// `(EPSILON, PI - EPSILON)`; a zero offset yields radius 0 and the equator.
    pub fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius < EPSILON {
            return Self::new(0.0, 0.0, PI * 0.5);
        }

        let azimuth = f32::atan2(offset.x, offset.z);
        let polar = (offset.y / radius).clamp(-1.0, 1.0).acos();

        Self::new(radius, azimuth, polar).make_safe()
    }

    /// Inverse of [`Spherical::from_offset`].
    pub fn to_offset(&self) -> Vector3<f32> {
        let sin_polar = self.polar.sin();
        Vector3::new(
            self.radius * sin_polar * self.azimuth.sin(),
            self.radius * self.polar.cos(),
            self.radius * sin_polar * self.azimuth.cos(),
        )
    }

    /// Keeps the polar angle strictly off the poles.
    pub fn make_safe(mut self) -> Self {
        self.polar = self.polar.clamp(EPSILON, PI - EPSILON);
        self
    }
}
