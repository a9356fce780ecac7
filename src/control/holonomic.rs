// Feedforward + feedback controller for a holonomic chassis

use std::f64::consts::PI;

use crate::geometry::{BodyVelocity, Pose};
use crate::trajectory::TrajectoryState;

use super::pid::{PidController, PidGains};

/// Stateful correction engine: current pose + desired state -> body velocity
///
/// Owned by exactly one follower; `reset` is called each time that follower starts.
pub trait FeedbackController {
    fn correct(&mut self, current: &Pose, desired: &TrajectoryState) -> BodyVelocity;

    /// Drop accumulated state from a previous run
    fn reset(&mut self);
}

/// Trajectory feedforward plus independent x, y and rotation PID channels
#[derive(Debug, Clone)]
pub struct HolonomicDriveController {
    x: PidController,
    y: PidController,
    rotation: PidController,
}

impl HolonomicDriveController {
    /// The rotation channel is switched to continuous input over [-pi, pi).
    pub fn new(x: PidController, y: PidController, mut rotation: PidController) -> Self {
        rotation.enable_continuous_input(-PI, PI);
        Self { x, y, rotation }
    }

    /// Same translation gains on both axes
    pub fn with_gains(translation: PidGains, rotation: PidGains, period: f64) -> Self {
        Self::new(
            PidController::new(translation, period),
            PidController::new(translation, period),
            PidController::new(rotation, period),
        )
    }
}

impl FeedbackController for HolonomicDriveController {
    fn correct(&mut self, current: &Pose, desired: &TrajectoryState) -> BodyVelocity {
        let (sin, cos) = desired.pose.heading.sin_cos();
        let x_ff = desired.velocity * cos;
        let y_ff = desired.velocity * sin;
        let rotation_ff = desired.holonomic_angular_velocity;

        let x_feedback = self.x.calculate(current.x, desired.pose.x);
        let y_feedback = self.y.calculate(current.y, desired.pose.y);
        let rotation_feedback = self
            .rotation
            .calculate(current.heading, desired.holonomic_rotation);

        BodyVelocity::from_field_relative(
            x_ff + x_feedback,
            y_ff + y_feedback,
            rotation_ff + rotation_feedback,
            current.heading,
        )
    }

    fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
        self.rotation.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;
    const PERIOD: f64 = 0.02;

    fn desired(x: f64, y: f64, travel: f64, velocity: f64, rotation: f64) -> TrajectoryState {
        TrajectoryState {
            time: 0.0,
            velocity,
            acceleration: 0.0,
            pose: Pose::new(x, y, travel),
            holonomic_rotation: rotation,
            holonomic_angular_velocity: 0.3,
        }
    }

    fn controller() -> HolonomicDriveController {
        HolonomicDriveController::with_gains(
            PidGains::new(2.0, 0.0, 0.0),
            PidGains::new(1.5, 0.0, 0.0),
            PERIOD,
        )
    }

    #[test]
    fn test_on_track_is_pure_feedforward() {
        let mut controller = controller();
        let target = desired(1.0, 2.0, PI / 2.0, 0.8, 0.0);
        let out = controller.correct(&target.target_pose(), &target);
        // Travelling +y while facing +x: all of it is lateral body motion
        assert!(out.vx.abs() < EPS);
        assert!((out.vy - 0.8).abs() < EPS);
        assert!((out.omega - 0.3).abs() < EPS);
    }

    #[test]
    fn test_channels_are_independent() {
        let mut controller = controller();
        let target = desired(1.0, 0.0, 0.0, 0.0, 0.0);
        // Only x is off; y and rotation see no error
        let out = controller.correct(&Pose::new(0.5, 0.0, 0.0), &target);
        assert!((out.vx - 1.0).abs() < EPS);
        assert!(out.vy.abs() < EPS);
        assert!((out.omega - 0.3).abs() < EPS);
    }

    #[test]
    fn test_rotation_error_wraps() {
        let mut controller = controller();
        let target = desired(0.0, 0.0, 0.0, 0.0, PI - 0.05);
        let out = controller.correct(&Pose::new(0.0, 0.0, -PI + 0.05), &target);
        // Short way round is -0.1 rad
        assert!((out.omega - (0.3 - 0.15)).abs() < EPS);
    }

    #[test]
    fn test_output_is_body_frame() {
        let mut controller = controller();
        let target = desired(1.0, 0.0, 0.0, 0.0, PI / 2.0);
        // Robot faces +y and lags 0.5 m behind in field x
        let out = controller.correct(&Pose::new(0.5, 0.0, PI / 2.0), &target);
        // Field +x is the robot's right-hand side
        assert!(out.vx.abs() < EPS);
        assert!((out.vy + 1.0).abs() < EPS);
    }
}
