// Error types for the trajectory follower

use std::time::Duration;

use crate::geometry::Pose;

#[derive(Debug, thiserror::Error)]
pub enum FollowerError {
    #[error("Follower built without a {0}")]
    MissingCollaborator(&'static str),

    #[error("Trajectory duration must be finite and non-negative, got {0} s")]
    InvalidDuration(f64),

    #[error("Follower is not running")]
    NotRunning,

    #[error("Pose unavailable: {0}")]
    PoseUnavailable(String),

    #[error("Pose estimate is stale ({age:?} old)")]
    PoseStale { age: Duration },

    #[error("Pose estimate is not finite: {0:?}")]
    InvalidPose(Pose),

    #[error("Output sink rejected command: {0}")]
    SinkRejected(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FollowerError>;
