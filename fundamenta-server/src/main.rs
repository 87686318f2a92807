//! Fundamenta Server - Headless Daemon
//!
//! Watches the third-party APIs the Fundamenta app depends on and serves
//! their health and rate-limit state:
//! - /api/health, /api/health/:apiName, /api/health/:apiName/check
//! - /api/rate-limits and per-API report/acquire endpoints
//! - /health, /healthz, /version for liveness
//!
//! Access via: http://localhost:8046

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

mod api;
mod cli;
mod commands;
mod router;
mod server_utils;
mod state;

#[cfg(test)]
mod test_helpers;

use cli::{Cli, Commands, ConfigCommands};
use fundamenta_core::modules::{config as core_config, logger};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    if let Err(e) = logger::init_logger(&cli.log_level) {
        eprintln!("Logging disabled: {}", e);
    }

    let command = cli.command.take();
    // The file being replaced may not load, so init runs before loading.
    if let Some(Commands::Config(ConfigCommands::Init { force })) = command {
        return commands::init_config(cli.config.as_deref(), force);
    }

    let config = core_config::load_config(cli.config.as_deref())?;

    match command {
        None | Some(Commands::Serve) => serve(&cli, config).await,
        Some(Commands::Check { json }) => commands::handle_check(config, json).await,
        Some(Commands::Config(cmd)) => {
            commands::handle_config_command(cmd, &config, cli.config.as_deref())
        }
    }
}

async fn serve(cli: &Cli, config: fundamenta_types::MonitorConfig) -> Result<()> {
    info!("Fundamenta Server starting on {}:{}...", cli.bind, cli.port);

    let state = AppState::from_config(config);
    let listener = server_utils::create_listener(cli.bind, cli.port)?;
    let addr = listener.local_addr()?;

    state.start().await;
    if state.registry().monitored_apis().is_empty() {
        warn!("No APIs are being monitored; set an API key or configure endpoints");
    }

    let app = router::build_router(state.clone());

    info!("Server listening on http://{}", addr);
    info!("Health API available at http://{}/api/health", addr);

    axum::serve(listener, app).with_graceful_shutdown(server_utils::shutdown_signal()).await?;

    state.shutdown();
    info!("Server stopped");
    Ok(())
}
