// Drive output for the holonomic base
//
// Provides:
// - Kinematic models (body velocity -> per-actuator speed and heading)
// - Output sink traits for body velocities and actuator sets
// - Channel-backed sink used by the zenoh runtime

pub mod kinematics;
mod sink;

pub use kinematics::{
    ActuatorState, ActuatorVelocitySet, KinematicModel, OmniKinematics, SwerveKinematics,
    desaturate,
};
pub use sink::{ActuatorSink, BodyVelocitySink, ChannelSink, DriveCommand};
