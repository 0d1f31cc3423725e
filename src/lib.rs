pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod models;
pub mod platforms;
pub mod services;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use domain::WorkType;
pub use config::Config;
use services::{Refreshable, Scheduler};
use state::AppState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::Init)) {
        if Config::create_default_if_missing()? {
            println!("✓ Config file created. Edit config.toml and run again.");
        } else {
            println!("Config file already exists.");
        }
        return Ok(());
    }

    let config = Config::load()?;
    config.validate()?;

    init_tracing(&config);

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    if let Commands::Daemon = command {
        return run_daemon(config).await;
    }

    let state = AppState::from_config(config)?;

    match command {
        Commands::Refresh { platforms } => cli::cmd_refresh(&state, &platforms).await,
        Commands::Lookup { work_type, title } => {
            cli::cmd_lookup(&state, work_type, &title.join(" ")).await
        }
        Commands::Platforms => cli::cmd_platforms(&state).await,
        Commands::Search { movie, query } => {
            let work_type = if movie { WorkType::Movie } else { WorkType::Drama };
            cli::cmd_search(&state, work_type, &query.join(" ")).await
        }
        Commands::Season { work_id, season } => cli::cmd_season(&state, work_id, season).await,
        Commands::Ingest { work_id, actor } => {
            cli::cmd_ingest(&state, work_id, actor.as_deref()).await
        }
        Commands::IngestMovie { work_id } => cli::cmd_ingest_movie(&state, work_id).await,
        Commands::Daemon | Commands::Init => Ok(()),
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.general.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_daemon(config: Config) -> anyhow::Result<()> {
    info!(
        "dramawatch v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Prometheus metrics available at http://{addr}/metrics");
    }

    let state = AppState::from_config(config)?;
    let job: Arc<dyn Refreshable> = state.availability.clone();
    let scheduler = Arc::new(Scheduler::new(job, state.config.scheduler.clone()));

    let scheduler_handle = {
        let sched = Arc::clone(&scheduler);
        tokio::spawn(async move {
            if let Err(e) = sched.start().await {
                error!("Scheduler error: {}", e);
            }
        })
    };

    info!(
        platforms = state.registry.len(),
        "Daemon running. Press Ctrl+C to stop."
    );

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    scheduler.stop().await;
    if let Err(e) = scheduler_handle.await {
        error!("Scheduler task ended abnormally: {}", e);
    }
    info!("Daemon stopped");

    Ok(())
}
