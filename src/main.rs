use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use marker_overlay::io::{load_marker_manifest, load_trace};
use marker_overlay::registry::MarkerRegistry;
use marker_overlay::scene::{AssetLoader, NoAssets, ObjAssetLoader};
use marker_overlay::sim::{ReplayConfig, ReplayRuntime, SimulatedRuntime, SimulationConfig};
use marker_overlay::system::{ArSession, SessionConfig, XrRuntime};
use marker_overlay::tracking::ActiveSummary;
use marker_overlay::ui::{LogUi, UiSync};
use marker_overlay::viz::RerunVisualizer;

/// Render loop rate.
const FRAME_RATE_HZ: f64 = 60.0;

/// Frames to run when neither `--frames` nor a trace bounds the run.
const DEFAULT_FRAMES: u64 = 600;

#[derive(Debug, Parser)]
#[command(name = "marker-overlay")]
#[command(about = "Keep one overlay object per image marker in sync with a tracking feed", long_about = None)]
#[command(version)]
struct Args {
    /// Replay a recorded tracking trace instead of the simulated feed
    #[arg(long, value_name = "CSV")]
    trace: Option<PathBuf>,

    /// Marker manifest (`name,src,estimated_real_world_width`)
    #[arg(long, value_name = "CSV")]
    markers: Option<PathBuf>,

    /// Directory of `<marker name>.obj` models
    #[arg(long, value_name = "DIR")]
    assets: Option<PathBuf>,

    /// Number of render frames to run
    #[arg(long)]
    frames: Option<u64>,

    /// Seed for the simulated feed
    #[arg(long)]
    seed: Option<u64>,

    /// Stream the scene to a rerun viewer
    #[arg(long)]
    viz: bool,
}

/// Where status text and the marker grid end up.
enum Frontend {
    Log(LogUi),
    Rerun(RerunVisualizer),
}

impl UiSync for Frontend {
    fn publish(&mut self, summary: &ActiveSummary) {
        match self {
            Frontend::Log(ui) => ui.publish(summary),
            Frontend::Rerun(viz) => viz.publish(summary),
        }
    }

    fn status(&mut self, message: &str, is_error: bool) {
        match self {
            Frontend::Log(ui) => ui.status(message, is_error),
            Frontend::Rerun(viz) => viz.status(message, is_error),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let registry = match &args.markers {
        Some(path) => MarkerRegistry::from_specs(load_marker_manifest(path)?)
            .with_context(|| format!("invalid marker manifest {}", path.display()))?,
        None => MarkerRegistry::default(),
    };
    info!("Registered {} markers", registry.len());

    let assets: Box<dyn AssetLoader> = match &args.assets {
        Some(dir) => Box::new(ObjAssetLoader::new(dir)),
        None => Box::new(NoAssets),
    };

    let replaying = args.trace.is_some();
    let mut runtime: Box<dyn XrRuntime> = match &args.trace {
        Some(path) => {
            let entries = load_trace(path)?;
            info!("Replaying {} tracking events from {}", entries.len(), path.display());
            Box::new(ReplayRuntime::new(entries, ReplayConfig::default()))
        }
        None => Box::new(SimulatedRuntime::new(SimulationConfig {
            seed: args.seed,
            ..Default::default()
        })),
    };

    let ui = if args.viz {
        match RerunVisualizer::new("marker-overlay") {
            Ok(viz) => Frontend::Rerun(viz),
            Err(e) => {
                warn!("Visualization unavailable, logging instead: {:#}", e);
                Frontend::Log(LogUi::new())
            }
        }
    } else {
        Frontend::Log(LogUi::new())
    };

    let mut session = ArSession::start(
        runtime.as_mut(),
        registry,
        assets.as_ref(),
        &SessionConfig::default(),
        ui,
    )?;

    let frames = args.frames.unwrap_or(if replaying { u64::MAX } else { DEFAULT_FRAMES });
    let frame_interval = Duration::from_secs_f64(1.0 / FRAME_RATE_HZ);
    let start = Instant::now();
    let mut last = start;

    for frame in 0..frames {
        let now = Instant::now();
        session.tick((now - last).as_secs_f64());
        last = now;

        if let (Frontend::Rerun(viz), pool) = session.ui_and_pool() {
            viz.log_frame((now - start).as_secs_f64(), pool);
        }

        if replaying && session.feed_exhausted() {
            info!("Trace finished after {} frames", frame + 1);
            break;
        }

        let next = start + frame_interval.mul_f64((frame + 1) as f64);
        if let Some(wait) = next.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }
    }

    let stats = session.stats().clone();
    session.shutdown();
    info!(
        "Processed {} events: {} shown, {} hidden, {} poses, {} ignored while hidden, {} invalid, {} unknown",
        stats.events,
        stats.shown,
        stats.hidden,
        stats.poses_applied,
        stats.ignored_while_hidden,
        stats.invalid_poses,
        stats.unknown_markers
    );

    Ok(())
}
