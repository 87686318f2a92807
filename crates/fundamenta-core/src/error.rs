//! Unified error types for Fundamenta Core.

use fundamenta_types::ConfigError;
use serde::Serialize;
use thiserror::Error;

/// Main error type for core operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Configuration loading, validation or saving failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logging subscriber could not be installed.
    #[error("Logging error: {0}")]
    Logging(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for core operations.
pub type AppResult<T> = Result<T, AppError>;
