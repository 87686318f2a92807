use std::fs;
use std::path::Path;

use fundamenta_types::{ConfigError, MonitorConfig};
use url::Url;

use crate::error::AppResult;

/// Load the monitor configuration.
///
/// No path, or a path that does not exist, yields the defaults. A file that
/// exists must parse and validate.
pub fn load_config(path: Option<&Path>) -> AppResult<MonitorConfig> {
    let Some(path) = path else {
        return Ok(MonitorConfig::default());
    };

    if !path.exists() {
        tracing::info!("Config file {} not found, using defaults", path.display());
        return Ok(MonitorConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::from_io_error(path.display().to_string(), &e))?;
    let config: MonitorConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))?;

    validate_config(&config)?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Save the configuration as pretty JSON.
pub fn save_config(config: &MonitorConfig, path: &Path) -> AppResult<()> {
    let content =
        serde_json::to_string_pretty(config).map_err(|e| ConfigError::from_json_error(&e))?;

    // Atomic write
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content)
        .map_err(|e| ConfigError::from_io_error(temp_path.display().to_string(), &e))?;
    fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::from_io_error(path.display().to_string(), &e))?;
    Ok(())
}

/// Structural checks plus URL syntax for endpoints and base URL overrides.
pub fn validate_config(config: &MonitorConfig) -> AppResult<()> {
    config.validate()?;

    for endpoint in &config.endpoints {
        check_http_url(&format!("endpoints.{}.url", endpoint.name), &endpoint.url)?;
    }
    for (profile, base) in &config.base_urls {
        check_http_url(&format!("base_urls.{}", profile), base)?;
    }
    Ok(())
}

fn check_http_url(field: &str, raw: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(raw).map_err(|e| ConfigError::validation(field, e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::validation(
            field,
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }
    Ok(())
}
