use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use opentelemetry::KeyValue;
use tracing::info;

use trafik_analytics::{route_stats, speed_stats};
use trafik_config::{ConfigError, TrafikConfig};
use trafik_core::routes::RouteTable;
use trafik_core::vehicle::VehicleKind;
use trafik_engine::{EngineStatus, SimulationRuntime};
use trafik_telemetry::EventLogger;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the live simulation until interrupted
    Run(RunArgs),
    /// Run a fixed number of ticks deterministically and print the run digest
    Simulate(SimulateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Configuration file to load instead of the default chain
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Synthesized vehicles to backfill before starting
    #[arg(long, default_value_t = 0)]
    pub backfill_vehicles: usize,
    /// Minutes of history to backfill before starting
    #[arg(long, default_value_t = 0)]
    pub backfill_minutes: u64,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Configuration file to load instead of the default chain
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 100)]
    pub ticks: u64,
    /// Seed override for the run
    #[arg(long)]
    pub seed: Option<u64>,
    /// Expected run digest; a mismatch fails the command
    #[arg(long)]
    pub validate_hash: Option<String>,
}

fn load_config(path: Option<&Path>) -> Result<TrafikConfig, ConfigError> {
    match path {
        Some(path) => TrafikConfig::load_from_path(path),
        None => TrafikConfig::load(),
    }
}

pub async fn run_live_mode(args: RunArgs) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = load_config(args.config.as_deref())?;
    let runtime = SimulationRuntime::new(config);

    if args.backfill_vehicles > 0 && args.backfill_minutes > 0 {
        runtime
            .backfill(args.backfill_vehicles, args.backfill_minutes)
            .await?;
    }

    let mut handle = runtime.run_live()?;
    handle.ready().await;
    EventLogger::log_event(
        "engine_started",
        vec![KeyValue::new("routes", handle.routes().len().to_string())],
    )
    .await;
    info!("Simulation running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    let status = handle.status();
    let routes = handle.routes();
    handle.stop().await?;

    shutdown_summary(&runtime, &routes, &status);
    Ok(())
}

pub async fn run_simulation_mode(
    args: SimulateArgs,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.engine.seed = Some(seed);
    }

    let runtime = SimulationRuntime::new(config);
    let digest = runtime.run_ticks(args.ticks).await?;
    println!("{digest}");

    if let Some(expected) = args.validate_hash.as_deref() {
        runtime.validate_state_hash(expected, &digest)?;
    }
    Ok(())
}

fn shutdown_summary(runtime: &SimulationRuntime, routes: &RouteTable, status: &EngineStatus) {
    let records = runtime.store().recent_vehicles(usize::MAX);
    let speeds = speed_stats(&records);
    let per_route = route_stats(routes, &records);

    println!(
        "Run stopped at tick {} with {} live vehicles",
        status.tick, status.live_vehicles
    );
    for (kind, count) in VehicleKind::ALL.iter().zip(status.by_kind) {
        println!("  {kind:<12} {count}");
    }
    println!(
        "Stored records: {} (mean speed {:.1} m/s)",
        speeds.overall.count, speeds.overall.mean
    );
    println!("Route statistics:");
    for stats in &per_route {
        println!(
            "  {:<18} {:>6.0} m  records: {:>6}  vehicles: {:>4}  mean: {:>5.1} m/s",
            stats.name, stats.length, stats.record_count, stats.distinct_vehicles, stats.mean_speed
        );
    }
}
