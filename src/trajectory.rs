// Precomputed, time-parametrized motion profile consumed by the follower.
//
// Trajectories are produced elsewhere (path planner, offline tooling) and
// loaded here as a list of timestamped states. The follower only reads them.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geometry::{Pose, interpolate_angle, lerp};

#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    #[error("Trajectory has no states")]
    Empty,

    #[error("State {index} has a non-finite field")]
    NotFinite { index: usize },

    #[error("State {index} has a negative timestamp ({time} s)")]
    NegativeTime { index: usize, time: f64 },

    #[error("State {index} is earlier than the state before it")]
    NonMonotonic { index: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Desired state at one instant of a trajectory
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrajectoryState {
    /// Seconds since the start of the trajectory
    pub time: f64,
    /// Speed along the direction of travel (m/s)
    pub velocity: f64,
    #[serde(default)]
    pub acceleration: f64,
    /// Position and direction of travel
    pub pose: Pose,
    /// Where the chassis should face, independent of the direction of travel
    pub holonomic_rotation: f64,
    #[serde(default)]
    pub holonomic_angular_velocity: f64,
}

impl TrajectoryState {
    /// Pose the chassis should be at: path position with the holonomic rotation.
    pub fn target_pose(&self) -> Pose {
        Pose::new(self.pose.x, self.pose.y, self.holonomic_rotation)
    }

    fn is_finite(&self) -> bool {
        self.time.is_finite()
            && self.velocity.is_finite()
            && self.acceleration.is_finite()
            && self.pose.is_finite()
            && self.holonomic_rotation.is_finite()
            && self.holonomic_angular_velocity.is_finite()
    }

    fn interpolate(&self, end: &TrajectoryState, fraction: f64) -> TrajectoryState {
        TrajectoryState {
            time: lerp(self.time, end.time, fraction),
            velocity: lerp(self.velocity, end.velocity, fraction),
            acceleration: lerp(self.acceleration, end.acceleration, fraction),
            pose: self.pose.interpolate(&end.pose, fraction),
            holonomic_rotation: interpolate_angle(
                self.holonomic_rotation,
                end.holonomic_rotation,
                fraction,
            ),
            holonomic_angular_velocity: lerp(
                self.holonomic_angular_velocity,
                end.holonomic_angular_velocity,
                fraction,
            ),
        }
    }
}

/// Read-only motion profile
///
/// Implementations must clamp: sampling past `total_time()` returns the
/// terminal state, sampling before zero returns the initial state.
pub trait Trajectory {
    fn sample(&self, time: f64) -> TrajectoryState;

    /// Total duration in seconds
    fn total_time(&self) -> f64;

    /// Poses for a visual trace of the whole trajectory
    fn trace(&self) -> Vec<Pose> {
        Vec::new()
    }
}

impl<T: Trajectory + ?Sized> Trajectory for Arc<T> {
    fn sample(&self, time: f64) -> TrajectoryState {
        (**self).sample(time)
    }

    fn total_time(&self) -> f64 {
        (**self).total_time()
    }

    fn trace(&self) -> Vec<Pose> {
        (**self).trace()
    }
}

/// On-disk layout of a trajectory file
#[derive(Debug, Serialize, Deserialize)]
struct TrajectoryFile {
    states: Vec<TrajectoryState>,
}

/// Trajectory backed by an ordered list of states, linearly interpolated
#[derive(Debug, Clone)]
pub struct SampledTrajectory {
    states: Vec<TrajectoryState>,
}

impl SampledTrajectory {
    pub fn new(states: Vec<TrajectoryState>) -> Result<Self, TrajectoryError> {
        if states.is_empty() {
            return Err(TrajectoryError::Empty);
        }

        for (index, state) in states.iter().enumerate() {
            if !state.is_finite() {
                return Err(TrajectoryError::NotFinite { index });
            }
            if state.time < 0.0 {
                return Err(TrajectoryError::NegativeTime {
                    index,
                    time: state.time,
                });
            }
            if index > 0 && state.time < states[index - 1].time {
                return Err(TrajectoryError::NonMonotonic { index });
            }
        }

        Ok(Self { states })
    }

    /// Parse a `{"states": [...]}` document
    pub fn from_json(json: &str) -> Result<Self, TrajectoryError> {
        let file: TrajectoryFile = serde_json::from_str(json)?;
        Self::new(file.states)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrajectoryError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn states(&self) -> &[TrajectoryState] {
        &self.states
    }

    pub fn initial_state(&self) -> &TrajectoryState {
        &self.states[0]
    }

    pub fn end_state(&self) -> &TrajectoryState {
        &self.states[self.states.len() - 1]
    }
}

impl Trajectory for SampledTrajectory {
    fn sample(&self, time: f64) -> TrajectoryState {
        let initial = self.initial_state();
        let end = self.end_state();
        if time <= initial.time {
            return *initial;
        }
        if time >= end.time {
            return *end;
        }

        // First state at or after `time`; never 0 because time > initial.time
        let upper = self.states.partition_point(|s| s.time < time);
        let next = &self.states[upper];
        let prev = &self.states[upper - 1];

        let span = next.time - prev.time;
        if next.time == time || span <= 0.0 {
            return *next;
        }
        prev.interpolate(next, (time - prev.time) / span)
    }

    fn total_time(&self) -> f64 {
        self.end_state().time
    }

    fn trace(&self) -> Vec<Pose> {
        self.states.iter().map(|s| s.pose).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn state(time: f64, x: f64, velocity: f64, rotation: f64) -> TrajectoryState {
        TrajectoryState {
            time,
            velocity,
            acceleration: 0.0,
            pose: Pose::new(x, 0.0, 0.0),
            holonomic_rotation: rotation,
            holonomic_angular_velocity: 0.0,
        }
    }

    fn straight_line() -> SampledTrajectory {
        SampledTrajectory::new(vec![
            state(0.0, 0.0, 0.0, 0.0),
            state(1.0, 0.5, 1.0, 0.2),
            state(2.0, 1.5, 1.0, 0.4),
        ])
        .unwrap()
    }

    #[test]
    fn test_total_time_is_last_timestamp() {
        assert!((straight_line().total_time() - 2.0).abs() < EPS);
    }

    #[test]
    fn test_sample_interpolates_between_states() {
        let sampled = straight_line().sample(1.5);
        assert!((sampled.time - 1.5).abs() < EPS);
        assert!((sampled.pose.x - 1.0).abs() < EPS);
        assert!((sampled.velocity - 1.0).abs() < EPS);
        assert!((sampled.holonomic_rotation - 0.3).abs() < EPS);
    }

    #[test]
    fn test_sample_hits_exact_state() {
        let trajectory = straight_line();
        assert_eq!(trajectory.sample(1.0), trajectory.states()[1]);
    }

    #[test]
    fn test_sample_clamps_past_end() {
        let trajectory = straight_line();
        let at_end = trajectory.sample(2.0);
        assert_eq!(trajectory.sample(2.02), at_end);
        assert_eq!(trajectory.sample(100.0), at_end);
    }

    #[test]
    fn test_sample_clamps_before_start() {
        let trajectory = straight_line();
        assert_eq!(trajectory.sample(-1.0), *trajectory.initial_state());
    }

    #[test]
    fn test_single_state_trajectory() {
        let trajectory = SampledTrajectory::new(vec![state(0.0, 3.0, 0.0, 0.0)]).unwrap();
        assert_eq!(trajectory.total_time(), 0.0);
        assert!((trajectory.sample(0.5).pose.x - 3.0).abs() < EPS);
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            SampledTrajectory::new(vec![]),
            Err(TrajectoryError::Empty)
        ));
    }

    #[test]
    fn test_rejects_out_of_order_states() {
        let result = SampledTrajectory::new(vec![
            state(0.0, 0.0, 0.0, 0.0),
            state(1.0, 0.0, 0.0, 0.0),
            state(0.5, 0.0, 0.0, 0.0),
        ]);
        assert!(matches!(result, Err(TrajectoryError::NonMonotonic { index: 2 })));
    }

    #[test]
    fn test_rejects_negative_and_nan() {
        assert!(matches!(
            SampledTrajectory::new(vec![state(-0.1, 0.0, 0.0, 0.0)]),
            Err(TrajectoryError::NegativeTime { index: 0, .. })
        ));
        assert!(matches!(
            SampledTrajectory::new(vec![state(0.0, f64::NAN, 0.0, 0.0)]),
            Err(TrajectoryError::NotFinite { index: 0 })
        ));
    }

    #[test]
    fn test_from_json_defaults_optional_fields() {
        let json = r#"{
            "states": [
                {"time": 0.0, "velocity": 0.0, "pose": {"x": 0.0, "y": 0.0, "heading": 0.0}, "holonomic_rotation": 0.0},
                {"time": 1.0, "velocity": 0.5, "pose": {"x": 0.25, "y": 0.0, "heading": 0.0}, "holonomic_rotation": 0.0}
            ]
        }"#;
        let trajectory = SampledTrajectory::from_json(json).unwrap();
        assert_eq!(trajectory.states().len(), 2);
        assert_eq!(trajectory.end_state().acceleration, 0.0);
        assert_eq!(trajectory.trace().len(), 2);
    }
}
