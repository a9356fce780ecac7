// Timeouts, topics, controller and drive configuration
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::control::PidGains;
use crate::drive::kinematics::{LEKIWI_BASE_RADIUS, LEKIWI_WHEEL_ANGLES_DEG};
use crate::error::{FollowerError, Result};

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Pose watchdog: an estimate older than this fails the tick
pub const POSE_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_POSE: &str = "lekiwi/state/pose"; // pose estimates in
pub const TOPIC_RT_BASE: &str = "lekiwi/rt/base"; // body velocity out
pub const TOPIC_RT_WHEELS: &str = "lekiwi/rt/wheels"; // per-actuator commands out
pub const TOPIC_STATUS: &str = "lekiwi/state/follower"; // follower status
pub const TOPIC_TELEMETRY: &str = "lekiwi/telemetry/follower"; // tracking error, trace

// Queues between the follower and the publishers
pub const ACTUATION_QUEUE: usize = 8;
pub const TELEMETRY_QUEUE: usize = 64;

// Resource the follower claims from the scheduler
pub const DRIVETRAIN: &str = "drivetrain";

// Default gains
pub const TRANSLATION_GAINS: PidGains = PidGains::new(1.5, 0.0, 0.0);
pub const ROTATION_GAINS: PidGains = PidGains::new(2.0, 0.0, 0.0);

// Default actuator speed limit (m/s)
pub const MAX_ACTUATOR_SPEED: f64 = 1.0;

// Default swerve geometry: module offsets from center (m)
pub const SWERVE_HALF_LENGTH: f64 = 0.3;
pub const SWERVE_HALF_WIDTH: f64 = 0.3;

/// Follower settings, loadable from JSON; missing fields take the defaults above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowerConfig {
    pub loop_hz: u64,
    pub pose_timeout_ms: u64,
    pub translation: PidGains,
    pub rotation: PidGains,
    pub max_actuator_speed: f64,
    pub swerve_half_length: f64,
    pub swerve_half_width: f64,
    pub omni_base_radius: f64,
    pub omni_wheel_angles_deg: Vec<f64>,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            loop_hz: LOOP_HZ,
            pose_timeout_ms: POSE_TIMEOUT.as_millis() as u64,
            translation: TRANSLATION_GAINS,
            rotation: ROTATION_GAINS,
            max_actuator_speed: MAX_ACTUATOR_SPEED,
            swerve_half_length: SWERVE_HALF_LENGTH,
            swerve_half_width: SWERVE_HALF_WIDTH,
            omni_base_radius: LEKIWI_BASE_RADIUS,
            omni_wheel_angles_deg: LEKIWI_WHEEL_ANGLES_DEG.to_vec(),
        }
    }
}

impl FollowerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.loop_hz == 0 {
            return Err(invalid("loop_hz must be positive"));
        }
        if !self.translation.is_finite() || !self.rotation.is_finite() {
            return Err(invalid("PID gains must be finite"));
        }
        for (name, value) in [
            ("max_actuator_speed", self.max_actuator_speed),
            ("swerve_half_length", self.swerve_half_length),
            ("swerve_half_width", self.swerve_half_width),
            ("omni_base_radius", self.omni_base_radius),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(&format!("{name} must be positive, got {value}")));
            }
        }
        if self.omni_wheel_angles_deg.len() != LEKIWI_WHEEL_ANGLES_DEG.len() {
            return Err(invalid(&format!(
                "omni base has {} wheels, got {} wheel angles",
                LEKIWI_WHEEL_ANGLES_DEG.len(),
                self.omni_wheel_angles_deg.len()
            )));
        }
        if self.omni_wheel_angles_deg.iter().any(|a| !a.is_finite()) {
            return Err(invalid("omni wheel angles must be finite"));
        }
        Ok(())
    }

    /// Control period in seconds
    pub fn period(&self) -> f64 {
        1.0 / self.loop_hz as f64
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_secs_f64(self.period())
    }

    pub fn pose_timeout(&self) -> Duration {
        Duration::from_millis(self.pose_timeout_ms)
    }

    /// Omni wheel angles as a fixed-size array; `validate` guarantees the length.
    pub fn omni_wheel_angles(&self) -> Result<[f64; 3]> {
        self.omni_wheel_angles_deg
            .as_slice()
            .try_into()
            .map_err(|_| invalid("omni base needs exactly 3 wheel angles"))
    }
}

fn invalid(reason: &str) -> FollowerError {
    FollowerError::InvalidConfig(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FollowerConfig::default();
        config.validate().unwrap();
        assert!((config.period() - 0.02).abs() < 1e-12);
        assert_eq!(config.pose_timeout(), POSE_TIMEOUT);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            FollowerConfig::from_json(r#"{"loop_hz": 100, "rotation": {"kp": 3.0}}"#).unwrap();
        assert_eq!(config.loop_hz, 100);
        assert_eq!(config.rotation, PidGains::new(3.0, 0.0, 0.0));
        assert_eq!(config.translation, TRANSLATION_GAINS);
        assert_eq!(config.omni_wheel_angles().unwrap(), LEKIWI_WHEEL_ANGLES_DEG);
    }

    #[test]
    fn test_rejects_wrong_wheel_count() {
        let result = FollowerConfig::from_json(r#"{"omni_wheel_angles_deg": [0.0, 90.0]}"#);
        assert!(matches!(result, Err(FollowerError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_rate_and_bad_geometry() {
        let config = FollowerConfig {
            loop_hz: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = FollowerConfig {
            swerve_half_width: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
