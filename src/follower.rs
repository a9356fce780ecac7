// Trajectory-following command for a holonomic base
//
// Each tick: read the stopwatch, sample the trajectory, read the pose,
// ask the feedback controller for a body velocity, and emit it either
// directly or decomposed into per-actuator commands.

use tracing::{debug, info, warn};

use crate::control::FeedbackController;
use crate::drive::{ActuatorSink, BodyVelocitySink, KinematicModel};
use crate::error::{FollowerError, Result};
use crate::geometry::{BodyVelocity, Pose};
use crate::scheduler::{ResourceSet, Schedulable};
use crate::telemetry::{NoopTelemetry, TelemetryObserver, TrackingSample};
use crate::timer::{Clock, MonotonicClock, Stopwatch};
use crate::trajectory::Trajectory;

/// Zero-argument pose query, called once per tick
pub trait PoseSource {
    fn current_pose(&self) -> Result<Pose>;
}

impl<F> PoseSource for F
where
    F: Fn() -> Result<Pose>,
{
    fn current_pose(&self) -> Result<Pose> {
        self()
    }
}

/// Kinematic model and actuator sink for the same actuator count
struct Decomposition<const N: usize> {
    kinematics: Box<dyn KinematicModel<N>>,
    sink: Box<dyn ActuatorSink<N>>,
}

trait DecomposedOutput {
    fn emit(&mut self, velocity: &BodyVelocity) -> Result<()>;
}

impl<const N: usize> DecomposedOutput for Decomposition<N> {
    fn emit(&mut self, velocity: &BodyVelocity) -> Result<()> {
        let states = self.kinematics.to_actuator_states(velocity);
        self.sink.emit(states)
    }
}

/// Output strategy, fixed when the follower is built
enum Output {
    Direct(Box<dyn BodyVelocitySink>),
    Decomposed(Box<dyn DecomposedOutput>),
}

impl Output {
    fn emit(&mut self, velocity: &BodyVelocity) -> Result<()> {
        match self {
            Output::Direct(sink) => sink.emit(*velocity),
            Output::Decomposed(decomposition) => decomposition.emit(velocity),
        }
    }

    fn mode(&self) -> &'static str {
        match self {
            Output::Direct(_) => "direct",
            Output::Decomposed(_) => "decomposed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerState {
    Idle,
    Running,
}

/// Follows a trajectory until its duration has elapsed.
pub struct TrajectoryFollower {
    name: String,
    trajectory: Box<dyn Trajectory>,
    pose_source: Box<dyn PoseSource>,
    controller: Box<dyn FeedbackController>,
    output: Output,
    requirements: ResourceSet,
    telemetry: Box<dyn TelemetryObserver>,
    timer: Stopwatch,
    state: FollowerState,
}

impl TrajectoryFollower {
    pub fn builder() -> FollowerBuilder {
        FollowerBuilder::default()
    }

    pub fn state(&self) -> FollowerState {
        self.state
    }

    /// Seconds since the last start (frozen after stop)
    pub fn elapsed(&self) -> f64 {
        self.timer.elapsed()
    }

    pub fn total_time(&self) -> f64 {
        self.trajectory.total_time()
    }

    pub fn start(&mut self) {
        self.controller.reset();
        self.timer.reset();
        self.timer.start();

        if let Err(e) = self.telemetry.on_start(&self.trajectory.trace()) {
            debug!("Dropped trajectory trace: {}", e);
        }

        self.state = FollowerState::Running;
        info!(
            "'{}' started: {:.2}s trajectory, {} output",
            self.name,
            self.trajectory.total_time(),
            self.output.mode()
        );
    }

    /// One control step. An error leaves the follower running; the host must
    /// treat it as an abnormal end and call `stop(true)`.
    pub fn tick(&mut self) -> Result<()> {
        if self.state != FollowerState::Running {
            return Err(FollowerError::NotRunning);
        }

        let time = self.timer.elapsed();
        let desired = self.trajectory.sample(time.min(self.trajectory.total_time()));

        let current = self.pose_source.current_pose()?;
        if !current.is_finite() {
            return Err(FollowerError::InvalidPose(current));
        }

        let sample = TrackingSample {
            time,
            pose: current,
            error: current.error_from(&desired.target_pose()),
        };
        if let Err(e) = self.telemetry.on_tick(&sample) {
            debug!("Dropped tracking sample: {}", e);
        }

        let velocity = self.controller.correct(&current, &desired);
        debug!(
            "t={:.3} cmd vx={:.3} vy={:.3} omega={:.3}",
            time, velocity.vx, velocity.vy, velocity.omega
        );
        self.output.emit(&velocity)
    }

    pub fn is_finished(&self) -> bool {
        self.timer.has_elapsed(self.trajectory.total_time())
    }

    /// End the run. When interrupted, a zero command is emitted so the base
    /// does not keep its last velocity. No-op while idle.
    pub fn stop(&mut self, interrupted: bool) -> Result<()> {
        if self.state == FollowerState::Idle {
            return Ok(());
        }
        self.timer.stop();
        self.state = FollowerState::Idle;

        if interrupted {
            warn!(
                "'{}' interrupted at {:.2}s, commanding zero velocity",
                self.name,
                self.timer.elapsed()
            );
            self.output.emit(&BodyVelocity::zero())
        } else {
            info!("'{}' completed in {:.2}s", self.name, self.timer.elapsed());
            Ok(())
        }
    }
}

impl Schedulable for TrajectoryFollower {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> &ResourceSet {
        &self.requirements
    }

    fn start(&mut self) -> Result<()> {
        TrajectoryFollower::start(self);
        Ok(())
    }

    fn tick(&mut self) -> Result<()> {
        TrajectoryFollower::tick(self)
    }

    fn is_finished(&self) -> bool {
        TrajectoryFollower::is_finished(self)
    }

    fn stop(&mut self, interrupted: bool) -> Result<()> {
        TrajectoryFollower::stop(self, interrupted)
    }
}

/// Collects collaborators; `build_direct` / `build_decomposed` pick the output mode.
pub struct FollowerBuilder {
    name: String,
    trajectory: Option<Box<dyn Trajectory>>,
    pose_source: Option<Box<dyn PoseSource>>,
    controller: Option<Box<dyn FeedbackController>>,
    requirements: ResourceSet,
    telemetry: Box<dyn TelemetryObserver>,
    clock: Option<Box<dyn Clock>>,
}

impl Default for FollowerBuilder {
    fn default() -> Self {
        Self {
            name: "trajectory_follower".to_string(),
            trajectory: None,
            pose_source: None,
            controller: None,
            requirements: ResourceSet::new(),
            telemetry: Box::new(NoopTelemetry),
            clock: None,
        }
    }
}

impl FollowerBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn trajectory(mut self, trajectory: impl Trajectory + 'static) -> Self {
        self.trajectory = Some(Box::new(trajectory));
        self
    }

    pub fn pose_source(mut self, source: impl PoseSource + 'static) -> Self {
        self.pose_source = Some(Box::new(source));
        self
    }

    pub fn controller(mut self, controller: impl FeedbackController + 'static) -> Self {
        self.controller = Some(Box::new(controller));
        self
    }

    /// Resources handed to the scheduler for mutual exclusion
    pub fn requirements(mut self, requirements: ResourceSet) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn telemetry(mut self, telemetry: impl TelemetryObserver + 'static) -> Self {
        self.telemetry = Box::new(telemetry);
        self
    }

    /// Defaults to `MonotonicClock`
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Emit body velocities as-is
    pub fn build_direct(self, sink: impl BodyVelocitySink + 'static) -> Result<TrajectoryFollower> {
        self.build(Output::Direct(Box::new(sink)))
    }

    /// Run every command through `kinematics` and emit one state per actuator
    pub fn build_decomposed<const N: usize>(
        self,
        kinematics: impl KinematicModel<N> + 'static,
        sink: impl ActuatorSink<N> + 'static,
    ) -> Result<TrajectoryFollower> {
        if N == 0 {
            return Err(FollowerError::InvalidConfig(
                "kinematic model has no actuators".to_string(),
            ));
        }
        self.build(Output::Decomposed(Box::new(Decomposition {
            kinematics: Box::new(kinematics),
            sink: Box::new(sink),
        })))
    }

    fn build(self, output: Output) -> Result<TrajectoryFollower> {
        let trajectory = self
            .trajectory
            .ok_or(FollowerError::MissingCollaborator("trajectory"))?;
        let pose_source = self
            .pose_source
            .ok_or(FollowerError::MissingCollaborator("pose source"))?;
        let controller = self
            .controller
            .ok_or(FollowerError::MissingCollaborator("feedback controller"))?;

        let duration = trajectory.total_time();
        if !duration.is_finite() || duration < 0.0 {
            return Err(FollowerError::InvalidDuration(duration));
        }

        let timer = match self.clock {
            Some(clock) => Stopwatch::from_boxed(clock),
            None => Stopwatch::new(MonotonicClock::new()),
        };

        Ok(TrajectoryFollower {
            name: self.name,
            trajectory,
            pose_source,
            controller,
            output,
            requirements: self.requirements,
            telemetry: self.telemetry,
            timer,
            state: FollowerState::Idle,
        })
    }
}
