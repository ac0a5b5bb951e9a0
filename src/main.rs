//! SimEngine - data-center power digital twin
//!
//! Load a rack topology, energize it, and rehearse outages against it.
//!
//! Features:
//! - Status of every asset after the feeds are applied
//! - Scripted scenarios with simulated clock advances
//! - Seeded random walks for reproducible fault rehearsal
//! - Recording and replay of operator sessions

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use simengine::recorder::{Recorder, RECORDING_FILE_EXTENSION};
use simengine::scenario::{random_walk, Scenario};
use simengine_core::{AssetRegistry, EventBus, SimClock, TopologySnapshot};

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Application name
pub const APP_NAME: &str = "simengine";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming the topology file
pub const TOPOLOGY_ENV_VAR: &str = "SIMENGINE_TOPOLOGY";

/// Default data directory for recordings
pub const DATA_DIR_DEFAULT: &str = "~/.simengine";

/// Sub-directory of the data directory holding recordings
pub const RECORDINGS_DIR_NAME: &str = "recordings";

// =============================================================================
// CLI
// =============================================================================

/// SimEngine - data-center power digital twin
#[derive(Parser, Debug)]
#[command(name = APP_NAME)]
#[command(about = "Rehearse power outages against a simulated rack")]
#[command(version)]
struct Cli {
    /// Topology JSON file (defaults to $SIMENGINE_TOPOLOGY)
    #[arg(short, long)]
    topology: Option<PathBuf>,

    /// Data directory for recordings
    #[arg(long, default_value = DATA_DIR_DEFAULT)]
    data_dir: String,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Energize the rack and print every asset
    Status,

    /// Run a scenario file
    Run {
        /// Scenario JSON file
        #[arg(long)]
        scenario: PathBuf,

        /// Save the session under this recording name
        #[arg(long)]
        record: Option<String>,
    },

    /// Replay a saved recording
    Replay {
        /// Recording name
        name: String,

        /// First action to replay
        #[arg(long)]
        from: Option<usize>,

        /// Replay up to (not including) this action
        #[arg(long)]
        to: Option<usize>,
    },

    /// Run a seeded random walk
    Random {
        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[arg(long, default_value_t = 20)]
        steps: usize,

        /// Save the session under this recording name
        #[arg(long)]
        record: Option<String>,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    tracing::info!("SimEngine v{}", APP_VERSION);

    let data_dir = PathBuf::from(shellexpand::tilde(&cli.data_dir).to_string());
    let recordings = data_dir.join(RECORDINGS_DIR_NAME);

    let topology_path = match cli.topology {
        Some(path) => path,
        None => std::env::var(TOPOLOGY_ENV_VAR)
            .map(PathBuf::from)
            .with_context(|| format!("no --topology given and {TOPOLOGY_ENV_VAR} is not set"))?,
    };
    let topology = TopologySnapshot::load(&topology_path)
        .await
        .with_context(|| format!("loading topology {}", topology_path.display()))?;

    let clock = SimClock::new().shared();
    let bus = EventBus::attach(&topology, &AssetRegistry::standard(), clock.clone())?;
    bus.energize().await?;

    match cli.command {
        Command::Status => {}
        Command::Run { scenario, record } => {
            let scenario = Scenario::load(&scenario)
                .await
                .with_context(|| format!("loading scenario {}", scenario.display()))?;
            run_scenario(&bus, &clock, &scenario, record.as_deref(), &recordings).await?;
        }
        Command::Replay { name, from, to } => {
            let path = recording_path(&recordings, &name);
            let recorder = Recorder::load(&path)
                .await
                .with_context(|| format!("loading recording {}", path.display()))?;
            let start = from.unwrap_or(0);
            let end = to.unwrap_or(recorder.len());
            let replayed = recorder.replay_range(start..end, &bus).await?;
            tracing::info!(name = %name, replayed, "replay finished");
        }
        Command::Random { seed, steps, record } => {
            let feeds: Vec<_> = topology
                .assets
                .iter()
                .filter(|a| a.input_voltage.is_some())
                .map(|a| a.key)
                .collect();
            let scenario = random_walk(seed, steps, &bus.keys(), &feeds);
            run_scenario(&bus, &clock, &scenario, record.as_deref(), &recordings).await?;
        }
    }

    print_status(&bus).await;
    Ok(())
}

async fn run_scenario(
    bus: &EventBus,
    clock: &Arc<SimClock>,
    scenario: &Scenario,
    record: Option<&str>,
    recordings: &Path,
) -> anyhow::Result<()> {
    let mut recorder = record.map(|_| Recorder::new());
    let report = scenario.run(bus, clock, recorder.as_mut()).await?;
    tracing::info!(
        scenario = %scenario.name,
        steps = report.steps,
        advanced_ms = report.advanced_ms,
        "scenario finished"
    );

    if let (Some(name), Some(recorder)) = (record, recorder) {
        recorder.save(&recording_path(recordings, name)).await?;
    }
    Ok(())
}

fn recording_path(recordings: &Path, name: &str) -> PathBuf {
    recordings.join(name).with_extension(RECORDING_FILE_EXTENSION)
}

async fn print_status(bus: &EventBus) {
    println!("{:>6}  {:<20} {:<5} {:>9} {:>12}", "key", "type", "state", "volts", "load (A)");
    for s in bus.snapshots().await {
        println!(
            "{:>6}  {:<20} {:<5} {:>9.1} {:>12.6}",
            s.key,
            s.asset_type.as_str(),
            s.status.to_string(),
            s.input_voltage,
            s.load_amps
        );
    }
}
