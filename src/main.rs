// SPDX-License-Identifier: MIT
#![deny(warnings)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mangotap::hub::MetricsHub;
use mangotap::hud::connection::ConnectionManager;
use mangotap::hud::endpoint::{
    AbstractSocketConnector, DEFAULT_REGISTRY, EndpointLocator, SOCKET_PREFIX,
};
use mangotap::sensor::{FieldSensor, MetricSource};

#[derive(Parser)]
#[command(
    name = "mangotap",
    about = "mangotap: MangoHud FPS socket reader and frame statistics"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the metrics feed and print one status row per interval
    Watch {
        /// Poll interval in milliseconds
        #[arg(short, long, default_value = "1000")]
        interval: u64,
        /// Socket name prefix the producer uses
        #[arg(long, default_value = SOCKET_PREFIX)]
        prefix: String,
        /// Socket registry to scan
        #[arg(long, default_value = DEFAULT_REGISTRY)]
        registry: PathBuf,
    },
    /// Scan the socket registry once and report any producer found
    Probe {
        #[arg(long, default_value = SOCKET_PREFIX)]
        prefix: String,
        #[arg(long, default_value = DEFAULT_REGISTRY)]
        registry: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            interval,
            prefix,
            registry,
        } => cmd_watch(interval, &prefix, &registry),
        Commands::Probe { prefix, registry } => {
            cmd_probe(&prefix, &registry);
            Ok(())
        }
    }
}

fn install_signal_handler() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))
        .context("failed to register SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))
        .context("failed to register SIGTERM handler")?;
    Ok(shutdown)
}

fn cmd_watch(interval_ms: u64, prefix: &str, registry: &Path) -> Result<()> {
    let shutdown = install_signal_handler()?;

    let conn = ConnectionManager::new(
        EndpointLocator::with_registry(registry, prefix),
        Box::new(AbstractSocketConnector::with_prefix(prefix)),
    );
    let hub = MetricsHub::with_connection(conn).into_shared();

    let fps = FieldSensor::fps(&hub);
    let fps_avg = FieldSensor::fps_avg(&hub);
    let low_1 = FieldSensor::one_percent_low(&hub);
    let low_01 = FieldSensor::zero_one_percent_low(&hub);

    let interval = Duration::from_millis(interval_ms);
    let start = Instant::now();

    eprintln!(
        "Watching for a producer (socket prefix {prefix}, registry {}) ...",
        registry.display()
    );
    eprintln!(
        "{:>6} | {:>12} | {:>4} | {:>4} | {:>4} | {:>4}",
        "t", "status", "fps", "avg", "1%", "0.1%"
    );

    while !shutdown.load(Ordering::Relaxed) {
        // text() drives discovery, the drain read, and the statistics.
        let row = format!(
            "{:>4} | {:>4} | {:>4} | {:>4}",
            fps.text(),
            fps_avg.text(),
            low_1.text(),
            low_01.text()
        );
        let status = fps
            .producer_id()
            .map_or_else(|| "scanning".to_string(), |pid| format!("PID {pid}"));

        eprintln!("{:>5}s | {status:>12} | {row}", start.elapsed().as_secs());

        std::thread::sleep(interval);
    }

    eprintln!("Stopped.");
    Ok(())
}

fn cmd_probe(prefix: &str, registry: &Path) {
    let locator = EndpointLocator::with_registry(registry, prefix);
    match locator.find_producer() {
        Some(pid) => eprintln!("producer found: pid {pid} (socket @{prefix}{pid})"),
        None => eprintln!("no producer found in {}", registry.display()),
    }
}
