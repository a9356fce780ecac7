// Cooperative command scheduling with exclusive resource ownership
//
// Commands declare the physical resources they need (drivetrain, arm, ...).
// The scheduler guarantees no two running commands share a resource: scheduling
// a command interrupts every running command it conflicts with.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{info, warn};

use crate::error::Result;

/// Opaque name of an exclusively owned resource
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Resource(String);

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet(BTreeSet<Resource>);

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource: Resource) -> bool {
        self.0.insert(resource)
    }

    pub fn contains(&self, resource: &Resource) -> bool {
        self.0.contains(resource)
    }

    pub fn conflicts_with(&self, other: &ResourceSet) -> bool {
        !self.0.is_disjoint(&other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Resource::new).collect())
    }
}

/// Unit of work driven by a host scheduler
///
/// Lifecycle: `start`, then `tick` once per period until `is_finished`, then
/// `stop(false)`. Preemption or a failed tick ends with `stop(true)` instead.
pub trait Schedulable {
    fn name(&self) -> &str;

    fn requirements(&self) -> &ResourceSet;

    fn start(&mut self) -> Result<()>;

    /// One bounded, non-blocking step
    fn tick(&mut self) -> Result<()>;

    fn is_finished(&self) -> bool;

    fn stop(&mut self, interrupted: bool) -> Result<()>;
}

/// Single-threaded scheduler; call `run_once` every loop period.
#[derive(Default)]
pub struct Scheduler {
    running: Vec<Box<dyn Schedulable>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `command`, interrupting every running command that shares a resource.
    ///
    /// Fails only if the new command fails to start; in that case it is not scheduled.
    pub fn schedule(&mut self, mut command: Box<dyn Schedulable>) -> Result<()> {
        let (conflicting, kept): (Vec<_>, Vec<_>) = self
            .running
            .drain(..)
            .partition(|running| running.requirements().conflicts_with(command.requirements()));
        self.running = kept;

        for mut preempted in conflicting {
            info!("Interrupting '{}' for '{}'", preempted.name(), command.name());
            if let Err(e) = preempted.stop(true) {
                warn!("Interrupted stop of '{}' failed: {}", preempted.name(), e);
            }
        }

        command.start()?;
        info!("Scheduled '{}'", command.name());
        self.running.push(command);
        Ok(())
    }

    /// Tick every running command once.
    ///
    /// Finished commands are stopped normally. A command whose tick fails is
    /// stopped as interrupted (best effort) and removed; the first tick error
    /// is returned after all commands have been serviced.
    pub fn run_once(&mut self) -> Result<()> {
        let mut first_error = None;
        let mut still_running = Vec::with_capacity(self.running.len());

        for mut command in self.running.drain(..) {
            if let Err(e) = command.tick() {
                warn!("'{}' failed: {}", command.name(), e);
                if let Err(stop_err) = command.stop(true) {
                    warn!("Safety stop of '{}' failed: {}", command.name(), stop_err);
                }
                first_error.get_or_insert(e);
                continue;
            }

            if command.is_finished() {
                if let Err(e) = command.stop(false) {
                    warn!("Stop of '{}' failed: {}", command.name(), e);
                    first_error.get_or_insert(e);
                }
                info!("'{}' finished", command.name());
                continue;
            }

            still_running.push(command);
        }

        self.running = still_running;
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Interrupt every running command
    pub fn cancel_all(&mut self) {
        for mut command in self.running.drain(..) {
            info!("Cancelling '{}'", command.name());
            if let Err(e) = command.stop(true) {
                warn!("Interrupted stop of '{}' failed: {}", command.name(), e);
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_empty()
    }

    pub fn is_scheduled(&self, name: &str) -> bool {
        self.running.iter().any(|c| c.name() == name)
    }

    /// Name of the running command that owns `resource`
    pub fn requiring(&self, resource: &Resource) -> Option<&str> {
        self.running
            .iter()
            .find(|c| c.requirements().contains(resource))
            .map(|c| c.name())
    }
}
