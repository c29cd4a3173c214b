//! JobHarvest - scrape worker entry point
//!
//! `run` and `dispatch` execute once and print JSON; `serve` runs the worker
//! and the dispatch loop until Ctrl+C.

mod app;
mod settings;

use anyhow::Result;
use app::App;
use clap::{Parser, Subcommand};
use jobharvest_core::application::worker::shutdown_channel;
use settings::{LogFormat, WorkerSettings};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "jobharvest")]
#[command(about = "Job-posting scrape worker", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one adapter now and print the run result
    Run {
        /// Adapter slug (see `jobharvest adapters`)
        adapter: String,

        /// Correlation id (generated if omitted)
        #[arg(long)]
        run_id: Option<String>,
    },

    /// Evaluate cadences once and enqueue due adapters
    Dispatch,

    /// Run the worker and the dispatch loop until Ctrl+C
    Serve,

    /// List registered adapters
    Adapters,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = WorkerSettings::load()?;

    init_logging(settings.log_format)?;

    match cli.command {
        Commands::Adapters => list_adapters(),
        Commands::Run { adapter, run_id } => {
            let app = App::build(settings).await?;
            let result = app.scrape_service().run_adapter(&adapter, run_id).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Commands::Dispatch => {
            let app = App::build(settings).await?;
            let summary = app.dispatch_loop().run_once().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Commands::Serve => serve(App::build(settings).await?).await,
    }
}

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("jobharvest=info"))?;

    match format {
        LogFormat::Json => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

fn list_adapters() -> Result<()> {
    let registry = jobharvest_adapters::builtin_registry();
    for adapter in registry.iter() {
        println!(
            "{:<20} {:<24} {:>4}/min",
            adapter.slug(),
            adapter.display_name(),
            adapter.rate_limit_per_minute()
        );
    }
    Ok(())
}

async fn serve(app: App) -> Result<()> {
    info!("JobHarvest worker v{} starting...", VERSION);
    info!(adapters = app.registry.len(), queue = %app.settings.scrape_queue_name, "Adapters registered");

    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    let worker = app.worker();
    let worker_shutdown = shutdown_rx.clone();
    let worker_handle = tokio::spawn(async move {
        if let Err(e) = worker.run(worker_shutdown).await {
            error!(error = ?e, "Worker failed");
        }
    });

    let dispatch_loop = app.dispatch_loop();
    let dispatch_handle = tokio::spawn(dispatch_loop.run(shutdown_rx));

    info!("System ready. Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");
    shutdown_tx.shutdown();
    let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, worker_handle).await;
    let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, dispatch_handle).await;

    info!("Shutdown complete.");
    Ok(())
}
