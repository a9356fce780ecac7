// Feedback control for trajectory tracking
//
// Provides:
// - Single-axis PID channel with clamped integrator and continuous input
// - Holonomic drive controller (feedforward + three independent PID channels)

mod holonomic;
pub mod pid;

pub use holonomic::{FeedbackController, HolonomicDriveController};
pub use pid::{PidController, PidGains};
