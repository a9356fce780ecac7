// Holonomic inverse kinematics: body-frame velocity -> per-actuator commands
//
// Two chassis families are supported:
// - Swerve: steerable modules, each pointed along its local velocity
// - Omniwheel: fixed wheels driven along their mounting angle (LeKiwi base)

use serde::{Deserialize, Serialize};

use crate::geometry::{BodyVelocity, Translation};

/// LeKiwi base: distance from center to each wheel (meters)
pub const LEKIWI_BASE_RADIUS: f64 = 0.125;

/// LeKiwi wheel drive directions (degrees), mounting angles with -90° offset
/// Left wheel at 240°, Back wheel at 0°, Right wheel at 120°
pub const LEKIWI_WHEEL_ANGLES_DEG: [f64; 3] = [240.0 - 90.0, 0.0 - 90.0, 120.0 - 90.0];

/// Below this module speed the heading is meaningless and reported as zero
const HEADING_EPSILON: f64 = 1e-9;

/// Commanded speed (m/s) and heading (rad, body frame) of one actuator
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActuatorState {
    pub speed: f64,
    pub heading: f64,
}

/// One command per actuator, in the model's fixed actuator order
pub type ActuatorVelocitySet<const N: usize> = [ActuatorState; N];

/// Maps a body velocity onto `N` actuators. Must map zero to all-zero speeds.
pub trait KinematicModel<const N: usize> {
    fn to_actuator_states(&self, velocity: &BodyVelocity) -> ActuatorVelocitySet<N>;
}

/// Scale all speeds down uniformly if any exceeds `max_speed`
pub fn desaturate<const N: usize>(states: &mut ActuatorVelocitySet<N>, max_speed: f64) {
    let fastest = states
        .iter()
        .map(|s| s.speed.abs())
        .fold(0.0f64, f64::max);

    if fastest > max_speed {
        let scale = max_speed / fastest;
        for state in states.iter_mut() {
            state.speed *= scale;
        }
    }
}

/// Steerable-module chassis
#[derive(Debug, Clone)]
pub struct SwerveKinematics<const N: usize> {
    offsets: [Translation; N],
    max_speed: Option<f64>,
}

impl<const N: usize> SwerveKinematics<N> {
    /// `offsets` are module positions relative to the rotation center, in output order
    pub fn new(offsets: [Translation; N]) -> Self {
        Self {
            offsets,
            max_speed: None,
        }
    }

    pub fn with_max_speed(mut self, max_speed: f64) -> Self {
        self.max_speed = Some(max_speed);
        self
    }

    pub fn offsets(&self) -> &[Translation; N] {
        &self.offsets
    }
}

impl SwerveKinematics<4> {
    /// Rectangular four-module layout: front-left, front-right, back-left, back-right
    pub fn rectangle(half_length: f64, half_width: f64) -> Self {
        Self::new([
            Translation::new(half_length, half_width),
            Translation::new(half_length, -half_width),
            Translation::new(-half_length, half_width),
            Translation::new(-half_length, -half_width),
        ])
    }
}

impl<const N: usize> KinematicModel<N> for SwerveKinematics<N> {
    fn to_actuator_states(&self, velocity: &BodyVelocity) -> ActuatorVelocitySet<N> {
        let mut states = self.offsets.map(|offset| {
            // Rigid-body velocity at the module: v + omega x r
            let vx = velocity.vx - velocity.omega * offset.y;
            let vy = velocity.vy + velocity.omega * offset.x;
            let speed = vx.hypot(vy);
            let heading = if speed > HEADING_EPSILON {
                vy.atan2(vx)
            } else {
                0.0
            };
            ActuatorState { speed, heading }
        });

        if let Some(max_speed) = self.max_speed {
            desaturate(&mut states, max_speed);
        }
        states
    }
}

/// Fixed-angle omniwheel chassis
#[derive(Debug, Clone)]
pub struct OmniKinematics<const N: usize> {
    /// Drive direction of each wheel (rad)
    wheel_angles: [f64; N],
    base_radius: f64,
    max_speed: Option<f64>,
}

impl<const N: usize> OmniKinematics<N> {
    pub fn new(wheel_angles: [f64; N], base_radius: f64) -> Self {
        Self {
            wheel_angles,
            base_radius,
            max_speed: None,
        }
    }

    pub fn from_degrees(wheel_angles_deg: [f64; N], base_radius: f64) -> Self {
        Self::new(wheel_angles_deg.map(f64::to_radians), base_radius)
    }

    pub fn with_max_speed(mut self, max_speed: f64) -> Self {
        self.max_speed = Some(max_speed);
        self
    }
}

impl OmniKinematics<3> {
    /// LeKiwi three-wheel base, wheels ordered left, back, right
    pub fn lekiwi() -> Self {
        Self::from_degrees(LEKIWI_WHEEL_ANGLES_DEG, LEKIWI_BASE_RADIUS)
    }
}

impl<const N: usize> KinematicModel<N> for OmniKinematics<N> {
    fn to_actuator_states(&self, velocity: &BodyVelocity) -> ActuatorVelocitySet<N> {
        // Each row: [cos(angle), sin(angle), base_radius]
        let mut states = self.wheel_angles.map(|angle| {
            let (sin_a, cos_a) = angle.sin_cos();
            ActuatorState {
                speed: cos_a * velocity.vx + sin_a * velocity.vy + self.base_radius * velocity.omega,
                heading: angle,
            }
        });

        if let Some(max_speed) = self.max_speed {
            desaturate(&mut states, max_speed);
        }
        states
    }
}
