// Trajectory-following runtime with pose watchdog
// Note: the pose watchdog fails a tick when localization goes quiet, so the
// scheduler interrupts the follower and the base is commanded to zero velocity
// instead of chasing the trajectory blind.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{error, info, warn};

// local imports
use crate::config::{
    ACTUATION_QUEUE, DRIVETRAIN, FollowerConfig, TELEMETRY_QUEUE, TOPIC_POSE, TOPIC_RT_BASE,
    TOPIC_RT_WHEELS, TOPIC_STATUS, TOPIC_TELEMETRY,
};
use crate::control::HolonomicDriveController;
use crate::drive::{ChannelSink, DriveCommand, OmniKinematics, SwerveKinematics};
use crate::error::{FollowerError, Result};
use crate::follower::{PoseSource, TrajectoryFollower};
use crate::geometry::Pose;
use crate::messages::{BaseActuation, FollowerStatus, PoseEstimate, WheelActuation};
use crate::scheduler::Scheduler;
use crate::telemetry::{ChannelTelemetry, TelemetryEvent, TracingTelemetry};
use crate::trajectory::{SampledTrajectory, Trajectory};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// How the follower's command reaches the base
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputMode {
    /// Body velocity on the base topic
    Body,
    /// Four swerve module states on the wheels topic
    Swerve,
    /// Three omniwheel speeds (LeKiwi) on the wheels topic
    Omni,
}

pub struct RunOptions {
    pub trajectory: PathBuf,
    pub output: OutputMode,
    pub config: FollowerConfig,
}

/// Most recent pose estimate and when it arrived
#[derive(Debug, Clone)]
pub struct LatestPose {
    latest: Arc<Mutex<Option<(Pose, Instant)>>>,
    timeout: Duration,
}

impl LatestPose {
    pub fn new(timeout: Duration) -> Self {
        Self {
            latest: Arc::new(Mutex::new(None)),
            timeout,
        }
    }

    pub fn update(&self, pose: Pose) {
        self.update_at(pose, Instant::now());
    }

    fn update_at(&self, pose: Pose, received_at: Instant) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some((pose, received_at));
        }
    }

    pub fn has_estimate(&self) -> bool {
        self.latest.lock().map(|l| l.is_some()).unwrap_or(false)
    }
}

impl PoseSource for LatestPose {
    fn current_pose(&self) -> Result<Pose> {
        let latest = self
            .latest
            .lock()
            .map_err(|_| FollowerError::PoseUnavailable("pose lock poisoned".to_string()))?;
        let (pose, received_at) = latest
            .ok_or_else(|| FollowerError::PoseUnavailable("no pose received yet".to_string()))?;

        let age = received_at.elapsed();
        if age > self.timeout {
            return Err(FollowerError::PoseStale { age });
        }
        Ok(pose)
    }
}

/// Wire a follower to the runtime's pose cell and output queues
pub fn build_follower(
    trajectory: SampledTrajectory,
    output: OutputMode,
    config: &FollowerConfig,
    pose: LatestPose,
    actuation_tx: mpsc::Sender<DriveCommand>,
    telemetry_tx: mpsc::Sender<TelemetryEvent>,
) -> Result<TrajectoryFollower> {
    config.validate()?;

    let controller =
        HolonomicDriveController::with_gains(config.translation, config.rotation, config.period());
    let builder = TrajectoryFollower::builder()
        .trajectory(trajectory)
        .pose_source(pose)
        .controller(controller)
        .requirements([DRIVETRAIN].into_iter().collect())
        .telemetry((TracingTelemetry, ChannelTelemetry::new(telemetry_tx)));
    let sink = ChannelSink::new(actuation_tx);

    match output {
        OutputMode::Body => builder.build_direct(sink),
        OutputMode::Swerve => {
            let kinematics =
                SwerveKinematics::rectangle(config.swerve_half_length, config.swerve_half_width)
                    .with_max_speed(config.max_actuator_speed);
            builder.build_decomposed(kinematics, sink)
        }
        OutputMode::Omni => {
            let kinematics =
                OmniKinematics::from_degrees(config.omni_wheel_angles()?, config.omni_base_radius)
                    .with_max_speed(config.max_actuator_speed);
            builder.build_decomposed(kinematics, sink)
        }
    }
}

async fn publish_actuation(
    rx: &mut mpsc::Receiver<DriveCommand>,
    pub_base: &zenoh::pubsub::Publisher<'_>,
    pub_wheels: &zenoh::pubsub::Publisher<'_>,
) -> std::result::Result<(), BoxError> {
    while let Ok(command) = rx.try_recv() {
        match command {
            DriveCommand::Body(velocity) => {
                let json = serde_json::to_string(&BaseActuation::from(&velocity))?;
                pub_base.put(json).await?;
            }
            DriveCommand::Actuators(states) => {
                let json = serde_json::to_string(&WheelActuation::from(states.as_slice()))?;
                pub_wheels.put(json).await?;
            }
        }
    }
    Ok(())
}

// Telemetry is best effort: failures are logged, never returned
async fn publish_telemetry(
    rx: &mut mpsc::Receiver<TelemetryEvent>,
    pub_telemetry: &zenoh::pubsub::Publisher<'_>,
) {
    while let Ok(event) = rx.try_recv() {
        match serde_json::to_string(&event) {
            Ok(json) => {
                if let Err(e) = pub_telemetry.put(json).await {
                    warn!("Failed to publish telemetry: {}", e);
                }
            }
            Err(e) => warn!("Failed to encode telemetry: {}", e),
        }
    }
}

async fn publish_status(
    pub_status: &zenoh::pubsub::Publisher<'_>,
    status: FollowerStatus,
) -> std::result::Result<(), BoxError> {
    pub_status.put(serde_json::to_string(&status)?).await?;
    Ok(())
}

pub async fn run(options: RunOptions) -> std::result::Result<(), BoxError> {
    let config = options.config;
    config.validate()?;

    let trajectory = SampledTrajectory::load(&options.trajectory)?;
    info!(
        "Loaded {}: {} states, {:.2}s",
        options.trajectory.display(),
        trajectory.states().len(),
        trajectory.total_time()
    );

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let pose_sub = session.declare_subscriber(TOPIC_POSE).await?;
    let pub_base = session.declare_publisher(TOPIC_RT_BASE).await?;
    let pub_wheels = session.declare_publisher(TOPIC_RT_WHEELS).await?;
    let pub_status = session.declare_publisher(TOPIC_STATUS).await?;
    let pub_telemetry = session.declare_publisher(TOPIC_TELEMETRY).await?;

    let pose = LatestPose::new(config.pose_timeout());
    let (actuation_tx, mut actuation_rx) = mpsc::channel(ACTUATION_QUEUE);
    let (telemetry_tx, mut telemetry_rx) = mpsc::channel(TELEMETRY_QUEUE);
    let follower = build_follower(
        trajectory,
        options.output,
        &config,
        pose.clone(),
        actuation_tx,
        telemetry_tx,
    )?;

    // Drain all pending pose estimates (non-blocking), keep latest
    let drain_poses = || {
        while let Ok(Some(sample)) = pose_sub.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<PoseEstimate>(&payload) {
                Ok(msg) => pose.update(Pose::from(&msg)),
                Err(e) => warn!("Failed to parse pose: {}", e),
            }
        }
    };

    let mut tick = interval(config.loop_interval());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!("Waiting for first pose on {}", TOPIC_POSE);
    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut ctrl_c => {
                info!("Cancelled before start");
                return Ok(());
            }
        }
        drain_poses();
        if pose.has_estimate() {
            break;
        }
    }

    let mut scheduler = Scheduler::new();
    scheduler.schedule(Box::new(follower))?;
    info!(
        "Following at {}Hz, {}ms pose timeout, output {:?}",
        config.loop_hz,
        config.pose_timeout_ms,
        options.output
    );

    let (status, failure) = loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut ctrl_c => {
                info!("Ctrl-C received, interrupting follower");
                scheduler.cancel_all();
                break (FollowerStatus::Interrupted, None);
            }
        }

        // 1. Latest pose
        drain_poses();

        // 2. One control step (includes watchdog via the pose source)
        let result = scheduler.run_once();

        // 3. Publish whatever the step emitted, safety stops included
        publish_actuation(&mut actuation_rx, &pub_base, &pub_wheels).await?;
        publish_telemetry(&mut telemetry_rx, &pub_telemetry).await;

        if let Err(e) = result {
            error!("Follower faulted: {}", e);
            break (FollowerStatus::Faulted, Some(e));
        }
        if scheduler.is_idle() {
            break (FollowerStatus::Finished, None);
        }

        // 4. Publish status
        publish_status(&pub_status, FollowerStatus::Running).await?;
    };

    publish_actuation(&mut actuation_rx, &pub_base, &pub_wheels).await?;
    publish_status(&pub_status, status).await?;
    info!("Follower {:?}", status);

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
