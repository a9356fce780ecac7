// Planar pose and velocity types shared by the follower, controller and kinematics.
// Distances are meters, angles radians, angular rates rad/s.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Wrap an angle into [-pi, pi)
pub fn wrap_angle(angle: f64) -> f64 {
    input_modulus(angle, -PI, PI)
}

/// Wrap `value` into the half-open range [min, max)
pub fn input_modulus(value: f64, min: f64, max: f64) -> f64 {
    let modulus = max - min;
    (value - min).rem_euclid(modulus) + min
}

/// Field-frame pose estimate (x, y, heading)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.heading.is_finite()
    }

    /// Component-wise `self - target`, heading wrapped to [-pi, pi)
    pub fn error_from(&self, target: &Pose) -> Pose {
        Pose {
            x: self.x - target.x,
            y: self.y - target.y,
            heading: wrap_angle(self.heading - target.heading),
        }
    }

    /// Linear interpolation; the heading follows the shortest arc.
    pub fn interpolate(&self, end: &Pose, fraction: f64) -> Pose {
        Pose {
            x: lerp(self.x, end.x, fraction),
            y: lerp(self.y, end.y, fraction),
            heading: interpolate_angle(self.heading, end.heading, fraction),
        }
    }
}

/// Offset of an actuator from the platform's rotation center
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Translation {
    pub x: f64,
    pub y: f64,
}

impl Translation {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Body-frame velocity command (vx forward, vy left, omega counter-clockwise)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BodyVelocity {
    pub vx: f64,
    pub vy: f64,
    pub omega: f64,
}

impl BodyVelocity {
    pub fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self { vx, vy, omega }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0 && self.omega == 0.0
    }

    /// Rotate a field-relative velocity into the frame of a robot facing `robot_heading`.
    pub fn from_field_relative(vx: f64, vy: f64, omega: f64, robot_heading: f64) -> Self {
        let (sin, cos) = robot_heading.sin_cos();
        Self {
            vx: vx * cos + vy * sin,
            vy: -vx * sin + vy * cos,
            omega,
        }
    }
}

pub(crate) fn lerp(start: f64, end: f64, fraction: f64) -> f64 {
    start + (end - start) * fraction
}

pub(crate) fn interpolate_angle(start: f64, end: f64, fraction: f64) -> f64 {
    wrap_angle(start + wrap_angle(end - start) * fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(0.0)).abs() < EPS);
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < EPS);
        assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < EPS);
        // Upper bound is exclusive
        assert!((wrap_angle(PI) + PI).abs() < EPS);
    }

    #[test]
    fn test_error_wraps_heading() {
        let current = Pose::new(1.0, 2.0, PI - 0.1);
        let target = Pose::new(0.5, 2.5, -PI + 0.1);
        let error = current.error_from(&target);
        assert!((error.x - 0.5).abs() < EPS);
        assert!((error.y + 0.5).abs() < EPS);
        assert!((error.heading + 0.2).abs() < EPS);
    }

    #[test]
    fn test_interpolate_crosses_pi() {
        let start = Pose::new(0.0, 0.0, PI - 0.2);
        let end = Pose::new(2.0, 0.0, -PI + 0.2);
        let mid = start.interpolate(&end, 0.5);
        assert!((mid.x - 1.0).abs() < EPS);
        // Shortest arc passes through pi, not through zero
        assert!((mid.heading.abs() - PI).abs() < EPS);
    }

    #[test]
    fn test_field_relative_rotation() {
        // Robot facing +y; a field velocity along +y is straight ahead in the body frame
        let body = BodyVelocity::from_field_relative(0.0, 1.0, 0.5, PI / 2.0);
        assert!((body.vx - 1.0).abs() < EPS);
        assert!(body.vy.abs() < EPS);
        assert!((body.omega - 0.5).abs() < EPS);
    }
}
