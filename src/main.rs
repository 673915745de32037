//! Lightwatch: Main Entry Point
//!
//! Hexagonal architecture on a single-threaded cooperative executor.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  DeviceRig            LogEventSink   FileConfigStore           │
//! │  (Camera+Light+Clock) (EventSink)    (ConfigPort)              │
//! │  LinearScorer         FileSnapshotStore / QueuedSnapshotStore  │
//! │  (Scorer)             (SnapshotStore)                          │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              ControlLoop (pure logic)                  │    │
//! │  │  SampleBuffer · TransitionDetector · InferenceAdapter  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  edge-executor: run_loop (paced) + snapshot writer task        │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lightwatch::adapters::background::{
    QueuedSnapshotStore, SnapshotQueue, drain_snapshot_queue, run_snapshot_writer,
};
use lightwatch::adapters::camera::{ReplayCamera, SyntheticCamera};
use lightwatch::adapters::config_file::FileConfigStore;
use lightwatch::adapters::file_store::FileSnapshotStore;
use lightwatch::adapters::light::{SimulatedLight, TimeoutLight};
use lightwatch::adapters::linear_model::LinearScorer;
use lightwatch::adapters::log_sink::LogEventSink;
use lightwatch::adapters::rig::DeviceRig;
use lightwatch::adapters::time::SystemClock;
use lightwatch::app::commands::LoopCommand;
use lightwatch::app::ports::{CameraPort, ConfigPort, Scorer, SnapshotStore};
use lightwatch::app::service::ControlLoop;
use lightwatch::config::{OperatingMode, SystemConfig};
use lightwatch::scheduler::{RunOptions, TickPacer, run_loop};

// ── CLI ───────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "lightwatch", version, about = "Camera + smart-light sampling service")]
struct Cli {
    /// JSON configuration file.
    #[arg(long, default_value = "lightwatch.json")]
    config: PathBuf,

    /// Never actuate; record every genuine light transition.
    #[arg(long)]
    observe_only: bool,

    /// Override the snapshot directory.
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Override the model file.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Stop after this many ticks (runs forever otherwise).
    #[arg(long)]
    ticks: Option<u64>,

    /// Simulated user: flip the light every N polls.
    #[arg(long, value_name = "N")]
    toggle_every: Option<u64>,

    /// Replay frames from a saved snapshot instead of the test pattern.
    #[arg(long, value_name = "SNAPSHOT")]
    replay: Option<PathBuf>,

    /// Export the buffer once more when the run ends.
    #[arg(long)]
    snapshot_on_exit: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default configuration to the config path.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    info!("╔══════════════════════════════════════╗");
    info!("║  Lightwatch v{:<24}║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config_store = FileConfigStore::new(&cli.config);

    if let Some(Command::InitConfig { force }) = cli.command {
        if config_store.path().exists() && !force {
            bail!(
                "{} already exists (use --force to overwrite)",
                config_store.path().display()
            );
        }
        config_store.save(&SystemConfig::default())?;
        info!("Wrote default config to {}", config_store.path().display());
        return Ok(());
    }

    // ── 2. Configuration ──────────────────────────────────────
    let mut config = config_store
        .load()
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if cli.observe_only {
        config.mode = OperatingMode::ObserveOnly;
    }
    if let Some(dir) = &cli.storage_dir {
        config.storage_dir = dir.display().to_string();
    }
    if let Some(model) = &cli.model {
        config.model_path = model.display().to_string();
    }
    config.validate().context("invalid configuration")?;

    // ── 3. Model (fatal only when it would be used) ───────────
    let scorer: Option<Box<dyn Scorer>> = match config.mode {
        OperatingMode::Autonomous => {
            let model = LinearScorer::load(&config.model_path)
                .with_context(|| format!("loading model {}", config.model_path))?;
            model.check_inputs(config.sequence_len, config.frame_channels)?;
            Some(Box::new(model))
        }
        OperatingMode::ObserveOnly => None,
    };
    let mut control = ControlLoop::new(&config, scorer)?;

    // ── 4. Devices ────────────────────────────────────────────
    let camera: Box<dyn CameraPort> = match &cli.replay {
        Some(path) => {
            let replay = ReplayCamera::open(path)
                .with_context(|| format!("opening replay {}", path.display()))?;
            if replay.shape() != config.frame_shape() {
                bail!(
                    "replay frames are {:?}, config expects {:?}",
                    replay.shape(),
                    config.frame_shape()
                );
            }
            Box::new(replay)
        }
        None => Box::new(SyntheticCamera::new(config.frame_shape())),
    };
    let mut light = SimulatedLight::default();
    if let Some(n) = cli.toggle_every {
        light = light.with_user_toggle(n);
    }
    let light = TimeoutLight::new(light, config.light_timeout());
    let mut rig = DeviceRig::new(camera, light, SystemClock::new());

    // ── 5. Storage + executor ─────────────────────────────────
    let queue = SnapshotQueue::new();
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    let mut store: Box<dyn SnapshotStore + '_> = if config.background_persistence {
        executor.spawn(run_snapshot_writer(&queue)).detach();
        Box::new(QueuedSnapshotStore::new(&queue, &config.storage_dir)?)
    } else {
        Box::new(FileSnapshotStore::new(&config.storage_dir)?)
    };

    let mut sink = LogEventSink::new();
    let mut pacer = TickPacer::new(config.tick_period());
    let options = RunOptions {
        max_ticks: cli.ticks,
        telemetry_every: config.telemetry_interval_ticks(),
    };

    // ── 6. Run ────────────────────────────────────────────────
    let ticks = futures_lite::future::block_on(executor.run(run_loop(
        &mut control,
        &mut rig,
        &mut store,
        &mut sink,
        &mut pacer,
        options,
    )));

    // ── 7. Shutdown ───────────────────────────────────────────
    if cli.snapshot_on_exit {
        let cmd = LoopCommand::SaveSnapshot { name: None };
        if let Some(Err(e)) = control.handle_command(cmd, &mut store, &mut sink) {
            warn!("Final snapshot failed: {}", e);
        }
    }
    drain_snapshot_queue(&queue);

    let c = control.counters();
    info!(
        "Stopped after {} ticks: {} transitions, {} snapshots, {} commands ({} failed)",
        ticks, c.transitions, c.snapshots_saved, c.commands_issued, c.command_failures
    );
    Ok(())
}
