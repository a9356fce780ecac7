// Wire messages for the follower runtime
// Angles on the wire are degrees and deg/s, matching the base's teleop commands.

use serde::{Deserialize, Serialize};

use crate::drive::ActuatorState;
use crate::geometry::{BodyVelocity, Pose};

// Pose estimate from localization -> runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoseEstimate {
    pub x: f32,
    pub y: f32,
    pub theta: f32,
}

impl From<&PoseEstimate> for Pose {
    fn from(msg: &PoseEstimate) -> Self {
        Pose::new(
            msg.x as f64,
            msg.y as f64,
            (msg.theta as f64).to_radians(),
        )
    }
}

// Body velocity output from runtime -> lekiwi-hw
// Has default values so a stop can be sent without a command
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BaseActuation {
    pub x_vel: f32,
    pub y_vel: f32,
    pub theta_vel: f32,
}

impl From<&BodyVelocity> for BaseActuation {
    fn from(velocity: &BodyVelocity) -> Self {
        Self {
            x_vel: velocity.vx as f32,
            y_vel: velocity.vy as f32,
            theta_vel: velocity.omega.to_degrees() as f32,
        }
    }
}

// Per-actuator output from runtime -> lekiwi-hw, in kinematic model order
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WheelActuation {
    pub speeds: Vec<f32>,
    pub headings: Vec<f32>,
}

impl From<&[ActuatorState]> for WheelActuation {
    fn from(states: &[ActuatorState]) -> Self {
        Self {
            speeds: states.iter().map(|s| s.speed as f32).collect(),
            headings: states.iter().map(|s| s.heading.to_degrees() as f32).collect(),
        }
    }
}

/// Follower status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FollowerStatus {
    Running,
    Finished,
    Interrupted,
    Faulted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actuation_uses_degrees() {
        let actuation = BaseActuation::from(&BodyVelocity::new(0.1, -0.2, std::f64::consts::PI));
        assert!((actuation.x_vel - 0.1).abs() < 1e-6);
        assert!((actuation.y_vel + 0.2).abs() < 1e-6);
        assert!((actuation.theta_vel - 180.0).abs() < 1e-4);
    }

    #[test]
    fn test_pose_estimate_to_radians() {
        let pose = Pose::from(&PoseEstimate {
            x: 1.0,
            y: 2.0,
            theta: 90.0,
        });
        assert!((pose.heading - std::f64::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_wheel_actuation_keeps_order() {
        let states = [
            ActuatorState { speed: 0.5, heading: 0.0 },
            ActuatorState { speed: -0.25, heading: std::f64::consts::FRAC_PI_2 },
        ];
        let msg = WheelActuation::from(&states[..]);
        assert_eq!(msg.speeds, vec![0.5, -0.25]);
        assert!((msg.headings[1] - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_status_json() {
        assert_eq!(
            serde_json::to_string(&FollowerStatus::Interrupted).unwrap(),
            "\"interrupted\""
        );
    }
}
