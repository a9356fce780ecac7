use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lekiwi_trajectory_follower::config::FollowerConfig;
use lekiwi_trajectory_follower::runtime::{self, OutputMode, RunOptions};

/// Follow a trajectory on the LeKiwi base using live pose estimates
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Trajectory JSON file ({"states": [...]})
    trajectory: PathBuf,

    /// Where the follower's commands go
    #[arg(long, value_enum, default_value_t = OutputMode::Body)]
    output: OutputMode,

    /// Follower config JSON (gains, geometry, loop rate)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => match FollowerConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error ({}): {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FollowerConfig::default(),
    };

    let options = RunOptions {
        trajectory: cli.trajectory,
        output: cli.output,
        config,
    };

    if let Err(e) = runtime::run(options).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
