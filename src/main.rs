use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use fleet_sim::driver::{self, TickDriver};
use fleet_sim::engine::StageTable;
use fleet_sim::sim::{self, BenchParams};
use fleet_sim::{Fleet, FleetSettings, SimConfig, SystemClock, api, logging};

#[derive(Debug, Parser)]
#[command(name = "fleet_sim", version, about = "Delivery robot fleet simulator")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the polling API and run the tick loops (default)
    Serve(ServeArgs),
    /// Run a scripted three-robot scenario and print a summary
    Demo,
    /// Run accelerated ticks on a synthetic clock and print one CSV row
    Bench(BenchArgs),
}

/// Overrides for values otherwise read from the environment.
#[derive(Debug, Default, Args)]
struct ServeArgs {
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    fleet_size: Option<usize>,
    #[arg(long)]
    batch_size: Option<usize>,
}

#[derive(Debug, Args)]
struct BenchArgs {
    #[arg(long, default_value_t = 100)]
    fleet_size: usize,
    #[arg(long, default_value_t = 2)]
    batch_size: usize,
    /// Advancement ticks to run
    #[arg(long, default_value_t = 1_000)]
    ticks: usize,
    /// Simulated seconds per advancement tick
    #[arg(long, default_value_t = 10)]
    advance_secs: u64,
    /// Simulated seconds per creation tick
    #[arg(long, default_value_t = 60)]
    creation_secs: u64,
    /// Audit fleet invariants after every tick
    #[arg(long)]
    validate: bool,
    /// Cancel a busy robot every seventh tick
    #[arg(long)]
    cancel: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(logging::DEFAULT_FILTER);

    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => serve(args).await,
        Command::Demo => {
            let report = sim::run_demo();
            sim::print_demo(&report);
            Ok(())
        }
        Command::Bench(args) => bench(args),
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = SimConfig::from_env().context("failed to load configuration")?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(size) = args.fleet_size {
        config.fleet.fleet_size = size;
    }
    if let Some(batch) = args.batch_size {
        config.fleet.batch_size = batch;
    }
    if config.fleet.fleet_size == 0 {
        bail!("fleet size must be > 0");
    }

    let fleet = Arc::new(Fleet::new(config.fleet, Arc::new(SystemClock)));
    let shutdown = CancellationToken::new();
    let ticks = TickDriver::new(
        Arc::clone(&fleet),
        config.creation_interval,
        config.advance_interval,
    )
    .spawn(shutdown.clone());

    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(
        addr = %bind_addr,
        fleet_size = config.fleet.fleet_size,
        batch_size = config.fleet.batch_size,
        "fleet simulator listening"
    );

    axum::serve(listener, api::router(fleet))
        .with_graceful_shutdown(driver::wait_for_shutdown(
            tokio::signal::ctrl_c(),
            shutdown.clone(),
        ))
        .await
        .context("http server failed")?;
    ticks.stop().await;
    info!("fleet simulator stopped");
    Ok(())
}

fn bench(args: BenchArgs) -> anyhow::Result<()> {
    if args.fleet_size == 0 {
        bail!("bench: fleet size must be > 0");
    }
    if args.ticks == 0 {
        bail!("bench: ticks must be > 0");
    }
    if args.advance_secs == 0 || args.creation_secs == 0 {
        bail!("bench: tick intervals must be > 0");
    }
    let params = BenchParams {
        fleet: FleetSettings {
            fleet_size: args.fleet_size,
            batch_size: args.batch_size,
            stages: StageTable::default(),
        },
        ticks: args.ticks,
        advance_interval: Duration::from_secs(args.advance_secs),
        creation_interval: Duration::from_secs(args.creation_secs),
        validate: args.validate,
        cancel: args.cancel,
    };
    sim::run_benchmark(&params);
    Ok(())
}
