//! # Pledge Demo
//!
//! Runs a handful of promise chains on the cooperative event loop and prints
//! one JSON report per chain.
//!
//! Usage: `pledge-demo [--verbose] [CONFIG.json]`

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use pledge_runtime::{EventLoop, LoopConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod scenarios;

/// Run promise chains on the cooperative event loop.
#[derive(Debug, Parser)]
#[command(name = "pledge-demo", version, about)]
struct Options {
    /// Log every settlement and scheduled task.
    #[arg(short, long)]
    verbose: bool,

    /// JSON loop configuration; defaults apply when omitted.
    config: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<LoopConfig> {
    let Some(path) = path else {
        return Ok(LoopConfig::default());
    };

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    LoopConfig::from_json(&json).with_context(|| format!("parsing config {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let options = Options::parse();

    // Initialize tracing
    let level = if options.verbose { Level::TRACE } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let event_loop = EventLoop::new(load_config(options.config.as_ref())?);
    let config = event_loop.config();
    info!(
        "🚀 Pledge demo starting (task budget {}, clock at {}ms)",
        config.max_tasks, config.start_time_ms
    );

    for report in scenarios::run_all(&event_loop)? {
        println!("{}", serde_json::to_string(&report)?);
    }

    Ok(())
}
