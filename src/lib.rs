// Trajectory follower for the LeKiwi holonomic base
//
// Follows a precomputed trajectory against live pose estimates and commands
// the base either with a body velocity or with per-actuator states.

pub mod config;
pub mod control;
pub mod drive;
pub mod error;
pub mod follower;
pub mod geometry;
pub mod messages;
pub mod runtime;
pub mod scheduler;
pub mod telemetry;
pub mod timer;
pub mod trajectory;

pub use error::{FollowerError, Result};
pub use follower::{FollowerBuilder, FollowerState, PoseSource, TrajectoryFollower};
