// Single-axis PID channel, stepped at a fixed period

use serde::{Deserialize, Serialize};

use crate::geometry::input_modulus;

/// Default bounds on the integral contribution (`ki * accumulated error`)
const DEFAULT_INTEGRATOR_RANGE: (f64, f64) = (-1.0, 1.0);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    #[serde(default)]
    pub ki: f64,
    #[serde(default)]
    pub kd: f64,
}

impl PidGains {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    pub fn is_finite(&self) -> bool {
        self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()
    }
}

#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    period: f64,
    continuous_range: Option<(f64, f64)>,
    integrator_range: (f64, f64),
    total_error: f64,
    prev_error: Option<f64>,
}

impl PidController {
    /// # Panics
    /// If `period` is not a positive, finite number of seconds.
    pub fn new(gains: PidGains, period: f64) -> Self {
        assert!(
            period.is_finite() && period > 0.0,
            "PID period must be positive, got {period}"
        );
        Self {
            gains,
            period,
            continuous_range: None,
            integrator_range: DEFAULT_INTEGRATOR_RANGE,
            total_error: 0.0,
            prev_error: None,
        }
    }

    /// Treat `min` and `max` as the same point (e.g. -pi and pi for headings).
    pub fn enable_continuous_input(&mut self, min: f64, max: f64) {
        self.continuous_range = Some((min, max));
    }

    pub fn set_integrator_range(&mut self, min: f64, max: f64) {
        self.integrator_range = (min, max);
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    /// Compute one control step and advance the integrator/derivative state.
    pub fn calculate(&mut self, measurement: f64, setpoint: f64) -> f64 {
        let mut error = setpoint - measurement;
        if let Some((min, max)) = self.continuous_range {
            let half = (max - min) / 2.0;
            error = input_modulus(error, -half, half);
        }

        if self.gains.ki != 0.0 {
            let (min, max) = self.integrator_range;
            let bound_a = min / self.gains.ki;
            let bound_b = max / self.gains.ki;
            self.total_error = (self.total_error + error * self.period)
                .clamp(bound_a.min(bound_b), bound_a.max(bound_b));
        }

        // No derivative kick on the first step after a reset
        let derivative = match self.prev_error {
            Some(prev) => (error - prev) / self.period,
            None => 0.0,
        };
        self.prev_error = Some(error);

        self.gains.kp * error + self.gains.ki * self.total_error + self.gains.kd * derivative
    }

    /// Clear accumulated integral and derivative history
    pub fn reset(&mut self) {
        self.total_error = 0.0;
        self.prev_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const EPS: f64 = 1e-9;
    const PERIOD: f64 = 0.02;

    #[test]
    fn test_proportional_only() {
        let mut pid = PidController::new(PidGains::new(2.0, 0.0, 0.0), PERIOD);
        assert!((pid.calculate(1.0, 1.5) - 1.0).abs() < EPS);
        assert!((pid.calculate(2.0, 1.5) + 1.0).abs() < EPS);
    }

    #[test]
    fn test_zero_error_gives_zero_output() {
        let mut pid = PidController::new(PidGains::new(2.0, 0.5, 0.1), PERIOD);
        for _ in 0..10 {
            assert_eq!(pid.calculate(0.7, 0.7), 0.0);
        }
    }

    #[test]
    fn test_integrator_accumulates_and_clamps() {
        let mut pid = PidController::new(PidGains::new(0.0, 1.0, 0.0), PERIOD);
        // 1.0 error * 0.02 s per step
        let first = pid.calculate(0.0, 1.0);
        assert!((first - 0.02).abs() < EPS);
        let second = pid.calculate(0.0, 1.0);
        assert!((second - 0.04).abs() < EPS);

        for _ in 0..200 {
            pid.calculate(0.0, 1.0);
        }
        // Integral contribution saturates at the default range
        assert!((pid.calculate(0.0, 1.0) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_derivative_skips_first_step() {
        let mut pid = PidController::new(PidGains::new(0.0, 0.0, 1.0), PERIOD);
        assert_eq!(pid.calculate(0.0, 1.0), 0.0);
        // Error went from 1.0 to 0.5 over one period
        assert!((pid.calculate(0.5, 1.0) + 25.0).abs() < EPS);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut pid = PidController::new(PidGains::new(0.0, 1.0, 1.0), PERIOD);
        pid.calculate(0.0, 1.0);
        pid.calculate(0.0, 2.0);
        pid.reset();
        // Fresh integrator, no derivative kick
        assert!((pid.calculate(0.0, 1.0) - 0.02).abs() < EPS);
    }

    #[test]
    fn test_continuous_input_takes_short_way() {
        let mut pid = PidController::new(PidGains::new(1.0, 0.0, 0.0), PERIOD);
        pid.enable_continuous_input(-PI, PI);
        let output = pid.calculate(-PI + 0.1, PI - 0.1);
        assert!((output + 0.2).abs() < EPS);
    }

    #[test]
    #[should_panic]
    fn test_rejects_zero_period() {
        PidController::new(PidGains::default(), 0.0);
    }
}
