// Tracking telemetry side-channel
//
// Observers are best-effort: the follower discards their errors and never
// lets them fail or delay a control tick.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::geometry::Pose;

pub type TelemetryResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// One tick's worth of tracking data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingSample {
    /// Elapsed trajectory time (s)
    pub time: f64,
    pub pose: Pose,
    /// Current pose minus desired pose
    pub error: Pose,
}

pub trait TelemetryObserver {
    /// Called once per start with the trajectory's visual trace
    fn on_start(&mut self, _trace: &[Pose]) -> TelemetryResult {
        Ok(())
    }

    /// Called once per tick
    fn on_tick(&mut self, _sample: &TrackingSample) -> TelemetryResult {
        Ok(())
    }
}

/// Default observer
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TelemetryObserver for NoopTelemetry {}

/// Writes tracking error into the log as structured fields
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl TelemetryObserver for TracingTelemetry {
    fn on_start(&mut self, trace: &[Pose]) -> TelemetryResult {
        debug!(points = trace.len(), "Trajectory trace");
        Ok(())
    }

    fn on_tick(&mut self, sample: &TrackingSample) -> TelemetryResult {
        debug!(
            t = sample.time,
            x_error = sample.error.x,
            y_error = sample.error.y,
            rotation_error = sample.error.heading,
            "Tracking"
        );
        Ok(())
    }
}

/// Fan out to two observers; both always run, the first error is reported.
impl<A: TelemetryObserver, B: TelemetryObserver> TelemetryObserver for (A, B) {
    fn on_start(&mut self, trace: &[Pose]) -> TelemetryResult {
        let first = self.0.on_start(trace);
        let second = self.1.on_start(trace);
        first.and(second)
    }

    fn on_tick(&mut self, sample: &TrackingSample) -> TelemetryResult {
        let first = self.0.on_tick(sample);
        let second = self.1.on_tick(sample);
        first.and(second)
    }
}

/// Telemetry queued for publication by the runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryEvent {
    Trace { poses: Vec<Pose> },
    Tracking(TrackingSample),
}

/// Forwards telemetry over a bounded channel without waiting
#[derive(Debug, Clone)]
pub struct ChannelTelemetry {
    tx: mpsc::Sender<TelemetryEvent>,
}

impl ChannelTelemetry {
    pub fn new(tx: mpsc::Sender<TelemetryEvent>) -> Self {
        Self { tx }
    }
}

impl TelemetryObserver for ChannelTelemetry {
    fn on_start(&mut self, trace: &[Pose]) -> TelemetryResult {
        self.tx.try_send(TelemetryEvent::Trace {
            poses: trace.to_vec(),
        })?;
        Ok(())
    }

    fn on_tick(&mut self, sample: &TrackingSample) -> TelemetryResult {
        self.tx.try_send(TelemetryEvent::Tracking(*sample))?;
        Ok(())
    }
}
