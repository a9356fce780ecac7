// Output sinks: where the follower's per-tick command goes

use tokio::sync::mpsc;

use crate::error::{FollowerError, Result};
use crate::geometry::BodyVelocity;

use super::kinematics::{ActuatorState, ActuatorVelocitySet};

/// Accepts a body-frame velocity. Must not block.
pub trait BodyVelocitySink {
    fn emit(&mut self, velocity: BodyVelocity) -> Result<()>;
}

/// Accepts one command per actuator. Must not block.
pub trait ActuatorSink<const N: usize> {
    fn emit(&mut self, states: ActuatorVelocitySet<N>) -> Result<()>;
}

impl<F> BodyVelocitySink for F
where
    F: FnMut(BodyVelocity) -> Result<()>,
{
    fn emit(&mut self, velocity: BodyVelocity) -> Result<()> {
        self(velocity)
    }
}

impl<const N: usize, F> ActuatorSink<N> for F
where
    F: FnMut(ActuatorVelocitySet<N>) -> Result<()>,
{
    fn emit(&mut self, states: ActuatorVelocitySet<N>) -> Result<()> {
        self(states)
    }
}

/// Command queued for publication by the runtime
#[derive(Debug, Clone, PartialEq)]
pub enum DriveCommand {
    Body(BodyVelocity),
    Actuators(Vec<ActuatorState>),
}

/// Non-blocking sink over a bounded channel; a full or closed queue rejects the command.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<DriveCommand>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<DriveCommand>) -> Self {
        Self { tx }
    }

    fn send(&self, command: DriveCommand) -> Result<()> {
        self.tx
            .try_send(command)
            .map_err(|e| FollowerError::SinkRejected(e.to_string()))
    }
}

impl BodyVelocitySink for ChannelSink {
    fn emit(&mut self, velocity: BodyVelocity) -> Result<()> {
        self.send(DriveCommand::Body(velocity))
    }
}

impl<const N: usize> ActuatorSink<N> for ChannelSink {
    fn emit(&mut self, states: ActuatorVelocitySet<N>) -> Result<()> {
        self.send(DriveCommand::Actuators(states.to_vec()))
    }
}
