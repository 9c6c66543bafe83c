// Main entrypoint for the physical-design advisor.

mod app;
mod buffer;
mod catalog;
mod config;
mod cost;
mod design;
mod error;
mod estimator;
mod histogram;
mod search;
mod shared;
mod workload;

use crate::config::CostConfig;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Physical-design advisor: searches shard key / index / denormalization
/// choices for a minimal-cost design.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Catalog input (JSON): collections and per-field statistics.
    #[arg(long, value_name = "FILE")]
    catalog: PathBuf,

    /// Workload input (JSON): recorded sessions of typed operations.
    #[arg(long, value_name = "FILE")]
    workload: PathBuf,

    /// Cluster/cost config (YAML).
    #[arg(long, value_name = "FILE")]
    cost_config: PathBuf,

    /// Search timeout in seconds. Overrides no config field — the core
    /// spec has no config-level timeout, so this is CLI-only.
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Where to write the resulting Design as JSON. Prints to stdout if
    /// omitted.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Number of outer-parallel search workers (§5). `0` auto-sizes to
    /// the number of logical CPUs; `1` (the default) runs a single
    /// synchronous search with no thread pool.
    #[arg(long, default_value_t = 1)]
    workers: usize,

    #[arg(short, long)]
    verbose: bool,
}

/// Configures structured logging, mirroring the teacher's
/// `configure_logger`: JSON in prod, pretty console otherwise.
fn configure_logger(cfg: &CostConfig, verbose: bool) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if cfg.is_prod() {
        tracing_subscriber::registry().with(filter).with(fmt::layer().json()).init();
    } else {
        tracing_subscriber::registry().with(filter).with(fmt::layer().pretty()).init();
    }
}

fn load_catalog(path: &PathBuf) -> Result<catalog::Catalog> {
    let data = std::fs::read_to_string(path).with_context(|| format!("read catalog {path:?}"))?;
    catalog::Catalog::from_json(&data).with_context(|| format!("parse catalog {path:?}"))
}

fn load_workload(path: &PathBuf) -> Result<workload::Workload> {
    let data = std::fs::read_to_string(path).with_context(|| format!("read workload {path:?}"))?;
    workload::Workload::from_json(&data).with_context(|| format!("parse workload {path:?}"))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let cost_config = CostConfig::load(&args.cost_config).with_context(|| format!("load cost config {:?}", args.cost_config))?;
    configure_logger(&cost_config, args.verbose);

    info!(component = "config", event = "load_success", path = ?args.cost_config, "cost config loaded");

    let catalog = load_catalog(&args.catalog)?;
    let workload = load_workload(&args.workload)?;

    let terminated = Arc::new(AtomicBool::new(false));
    let terminated_handler = terminated.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        warn!(component = "main", event = "interrupt_received", "stopping search after current node");
        terminated_handler.store(true, Ordering::Relaxed);
    }) {
        warn!(component = "main", event = "signal_handler_failed", error = %e, "failed to install Ctrl+C handler");
    }

    let workers = if args.workers == 0 { search::default_worker_count() } else { args.workers };
    let advisor = app::App::new(catalog, workload, cost_config, Duration::from_secs(args.timeout_secs)).with_workers(workers);
    let report = advisor.run(Some(terminated));

    let mut output = serde_json::json!({
        "design": report.design.to_output(),
        "cost": report.cost,
        "nodes_explored": report.nodes_explored,
        "backtracks": report.backtracks,
        "leaves": report.leaves,
        "status": format!("{:?}", report.status),
        "duration_ms": report.duration.as_millis() as u64,
    });
    if args.verbose {
        let (hits, misses) = report.cache_diagnostics;
        output["cache_diagnostics"] = serde_json::json!({ "hits": hits, "misses": misses });
    }
    let rendered = serde_json::to_string_pretty(&output).context("serialize report")?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &rendered).with_context(|| format!("write output {path:?}"))?;
            info!(component = "main", event = "report_written", path = ?path, "wrote report");
        }
        None => println!("{rendered}"),
    }

    if matches!(report.status, search::Status::TimedOut) {
        warn!(component = "main", event = "search_timed_out", "search returned its best design before completing");
    } else if matches!(report.status, search::Status::UserTerminated) {
        error!(component = "main", event = "search_cancelled", "search was cancelled by the user");
    }

    Ok(())
}
