use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use fundamenta_core::modules::config as core_config;
use fundamenta_types::MonitorConfig;

use crate::cli::ConfigCommands;
use crate::state::AppState;

/// One-shot check: run every first probe, print, tear down.
pub async fn handle_check(config: MonitorConfig, json: bool) -> Result<()> {
    let state = AppState::from_config(config);
    state.start().await;

    let health = state.registry().snapshots();
    let limits = state.monitors().statuses();
    state.shutdown();

    if json {
        let report = serde_json::json!({ "apis": health, "rateLimits": limits });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["API", "Status", "Retries", "Rate limited until"]);

    let mut names: Vec<&String> = health.keys().chain(limits.keys()).collect();
    names.sort();
    names.dedup();

    for name in names {
        let status = match health.get(name) {
            Some(s) if s.is_healthy() => Cell::new("healthy").fg(Color::Green),
            Some(_) => Cell::new("unhealthy").fg(Color::Red),
            None => Cell::new("not monitored").fg(Color::Yellow),
        };
        let retries = health
            .get(name)
            .map_or_else(|| "-".to_string(), |s| s.retry_attempts.to_string());
        let reset = limits
            .get(name)
            .and_then(|l| l.rate_limit_reset_time)
            .map_or_else(|| "-".to_string(), |t| t.to_rfc3339());

        table.add_row(vec![Cell::new(name), status, Cell::new(retries), Cell::new(reset)]);
    }

    println!("{table}");
    let healthy = health.values().filter(|s| s.is_healthy()).count();
    println!("\n{} of {} monitored APIs healthy", healthy, health.len());
    Ok(())
}

pub fn handle_config_command(
    cmd: ConfigCommands,
    config: &MonitorConfig,
    path: Option<&Path>,
) -> Result<()> {
    match cmd {
        ConfigCommands::Show { json } => show_config(config, path, json),
        ConfigCommands::Validate => {
            core_config::validate_config(config)?;
            println!("{}", "Configuration is valid".green());
            Ok(())
        }
        ConfigCommands::Init { force } => init_config(path, force),
    }
}

/// Write the default configuration, refusing to clobber an existing file
/// unless forced.
pub fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let Some(path) = path else {
        anyhow::bail!("config init needs --config <PATH> or FUNDAMENTA_CONFIG");
    };
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    core_config::save_config(&MonitorConfig::default(), path)?;
    println!("{} {}", "Wrote default configuration to".green(), path.display());
    Ok(())
}

fn show_config(config: &MonitorConfig, path: Option<&Path>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    let source = path.map_or_else(|| "defaults".to_string(), |p| p.display().to_string());
    println!("{}", "Monitor Configuration:".cyan().bold());
    println!("  Source: {}", source);
    println!("  Check interval: {}s", config.check_interval_secs);
    println!("  Probe timeout: {}s", config.probe_timeout_secs);
    println!("  Max retries: {}", config.max_retries);
    println!("  Default rate-limit window: {}s", config.default_rate_limit_secs);
    for (profile, base) in &config.base_urls {
        println!("  Base URL override: {} -> {}", profile, base);
    }
    println!("  Keyless endpoints:");
    for endpoint in &config.endpoints {
        println!("    {} {}", endpoint.name.bold(), endpoint.url);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test assertions")]

    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("monitor.json");

        init_config(Some(&path), false).unwrap();
        assert_eq!(core_config::load_config(Some(&path)).unwrap(), MonitorConfig::default());
    }

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("monitor.json");
        std::fs::write(&path, r#"{"check_interval_secs": 60}"#).unwrap();

        let err = init_config(Some(&path), false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert!(std::fs::read_to_string(&path).unwrap().contains("60"));

        init_config(Some(&path), true).unwrap();
        assert_eq!(core_config::load_config(Some(&path)).unwrap(), MonitorConfig::default());
    }

    #[test]
    fn test_init_needs_a_path() {
        assert!(init_config(None, false).is_err());
    }
}
