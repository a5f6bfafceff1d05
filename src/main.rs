// src/main.rs

mod capture;
mod config;
mod control;
mod detection;
mod error;
mod imageops;
mod pipeline;
mod preview;
mod serial;
mod types;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use capture::open_source;
use control::{ControlLoop, WorkerHandle};
use detection::{Detector, GravityDetector, SteeringDetector, WallDetector};
use imageops::{ImageOps, NativeImageOps};
use pipeline::{PerceptionWorker, SharedPerceptionState, WorkerMetrics};
use serial::CommandLink;
use types::{Config, RetryConfig, SourceConfig, SteeringMode};

#[derive(Parser, Debug)]
#[command(name = "vision-steer", version, about = "Vision-guided steering controller")]
struct Args {
    /// YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override the configured steering source
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Never open preview windows
    #[arg(long)]
    headless: bool,

    /// Log commands instead of opening the serial port
    #[arg(long)]
    no_serial: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    LineDetect,
    Gravity,
}

impl From<ModeArg> for SteeringMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::LineDetect => SteeringMode::LineDetect,
            ModeArg::Gravity => SteeringMode::Gravity,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(mode) = args.mode {
        config.steering_mode = mode.into();
    }
    if args.headless {
        config.preview.enabled = false;
    }
    if args.no_serial {
        config.serial.enabled = false;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vision_steer={}", config.logging.level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🤖 Vision steering controller starting");
    info!("✓ Configuration loaded from {}", args.config.display());
    info!(
        "Steering mode: {}, threshold={:.1}px, stop={}ms, cooldown={}ms",
        config.steering_mode.as_str(),
        config.control.steering_threshold,
        config.control.stop_duration_ms,
        config.control.stop_cooldown_ms
    );

    let link = CommandLink::open(&config.serial);

    let state = Arc::new(SharedPerceptionState::new());
    let ops: Arc<dyn ImageOps> = Arc::new(NativeImageOps::new());
    let render = config.preview.enabled;

    let mut workers = Vec::new();
    match config.steering_mode {
        SteeringMode::LineDetect => workers.push(spawn_worker(
            SteeringDetector::new(
                Arc::clone(&ops),
                config.steering.clone(),
                config.angle_bands,
                render,
            ),
            config.steering.source.clone(),
            config.steering.target_hz,
            &config.retry,
            &state,
        )),
        SteeringMode::Gravity => workers.push(spawn_worker(
            GravityDetector::new(Arc::clone(&ops), config.gravity.clone(), render),
            config.gravity.source.clone(),
            config.gravity.target_hz,
            &config.retry,
            &state,
        )),
    }
    if config.wall.enabled {
        workers.push(spawn_worker(
            WallDetector::new(
                Arc::clone(&ops),
                config.wall.clone(),
                config.angle_bands,
                render,
            ),
            config.wall.source.clone(),
            config.wall.target_hz,
            &config.retry,
            &state,
        ));
    } else {
        info!("Wall detection disabled");
    }

    let preview = if render { preview::open_preview() } else { None };
    let control = ControlLoop::new(
        config.control.clone(),
        config.steering_mode,
        state,
        link,
        preview,
    );
    control.run(workers).await;

    info!("✓ Shutdown complete");
    Ok(())
}

fn spawn_worker<D: Detector + 'static>(
    detector: D,
    source: SourceConfig,
    target_hz: f64,
    retry: &RetryConfig,
    state: &Arc<SharedPerceptionState>,
) -> WorkerHandle {
    let name = detector.name();
    let metrics = WorkerMetrics::new(name);
    info!("[{}] source: {} @ {:.1} Hz", name, source.describe(), target_hz);

    let worker = PerceptionWorker::new(detector, Arc::clone(state), target_hz, retry, metrics.clone());
    let handle = tokio::task::spawn_blocking(move || worker.run(move || open_source(&source)));

    WorkerHandle {
        name,
        handle,
        metrics,
    }
}
