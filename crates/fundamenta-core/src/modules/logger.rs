//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` is used as the filter
/// directive (e.g. `info`, `fundamenta_core=debug`).
pub fn init_logger(level: &str) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| AppError::Logging(format!("invalid log filter '{}': {}", level, e)))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))
}
