//! Desktop mirror of the handscape compositor.
//!
//! Opens a window, feeds the compositor from a synthetic hand tracker and two
//! fake desktop windows, and renders until Escape or close.
//!
//! Usage: `handscape-studio [config.json]`

mod runtime;
mod scene;
mod synthetic;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use handscape_engine::config::CompositorConfig;
use handscape_engine::device::GpuInit;
use handscape_engine::hand::{spawn_listener, FrameQueue};
use handscape_engine::logging::{init_logging, LoggingConfig};

use crate::runtime::{Runtime, RuntimeConfig};
use crate::synthetic::SyntheticHands;

/// Tracker frame rate of the synthetic source.
const TRACKER_RATE_HZ: f32 = 90.0;

fn load_config(path: &Path) -> Result<CompositorConfig> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file)).with_context(|| format!("invalid config {}", path.display()))
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = match std::env::args_os().nth(1) {
        Some(path) => load_config(Path::new(&path))?,
        None => CompositorConfig::default(),
    };
    log::info!("eye layout {:?}, passthrough {}", config.eye_layout, config.passthrough.enabled);

    let frames = FrameQueue::new();
    // Detached: the thread ends with the process.
    let _tracker = spawn_listener(SyntheticHands::new(TRACKER_RATE_HZ), frames.clone())
        .context("failed to start tracker thread")?;

    let window = RuntimeConfig {
        title: "handscape studio".to_string(),
        ..RuntimeConfig::default()
    };
    Runtime::run(window, GpuInit::default(), config, frames)
}
