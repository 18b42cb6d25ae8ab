//! Offline reconciliation planner.
//!
//! Runs the full engine against a JSON fleet snapshot instead of the live
//! platforms: the same filtering, resolution, and reconciliation paths the
//! site wiring drives, with outcomes printed as JSON. Useful for reviewing
//! what a run would do to a captured environment.

use anyhow::{Context, Result};
use backup_reconciler::platform::{FleetSnapshot, SnapshotPlatform};
use backup_reconciler::{services, AppConfig, RunContext};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the fleet snapshot JSON
    #[arg(short, long, value_name = "FILE")]
    snapshot: PathBuf,

    /// Fixed RNG seed for reproducible schedule and server picks
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for the failure ledger (overrides env)
    #[arg(long, value_name = "DIR")]
    ledger_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = AppConfig::from_env();
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(dir) = args.ledger_dir {
        config.ledger_dir = dir;
    }

    tracing::info!(
        "Starting backup-reconciler v{} (snapshot: {})",
        env!("CARGO_PKG_VERSION"),
        args.snapshot.display()
    );

    let raw = std::fs::read_to_string(&args.snapshot)
        .with_context(|| format!("reading snapshot {}", args.snapshot.display()))?;
    let snapshot: FleetSnapshot =
        serde_json::from_str(&raw).context("parsing fleet snapshot")?;

    let platform = Arc::new(SnapshotPlatform::new(snapshot));
    let ctx = RunContext::new(
        platform.clone(),
        platform.clone(),
        platform.clone(),
        config,
    )?;

    let report = services::runner::run(&ctx).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    let notifications = platform.notifications().await;
    for (machine, reason) in &notifications {
        tracing::info!(machine = %machine, reason = %reason, "Notification emitted");
    }

    if !report.failed.is_empty() {
        tracing::warn!(
            failed = report.failed.len(),
            run_id = %report.run_id,
            "Run completed with failures, see ledger"
        );
    }

    Ok(())
}
