//! Monitoring-related errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the health registry and the per-API monitors.
///
/// None of these escape as panics; the HTTP layer renders them as JSON with
/// an explicit `status` field.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum MonitorError {
    /// No registry entry exists for this name
    #[error("API {api} is not being monitored")]
    NotMonitored { api: String },

    /// No per-API (rate-limit aware) monitor exists for this name
    #[error("API {api} has no rate limit monitor")]
    UnknownApi { api: String },

    /// Upstream quota is exhausted until the reset time
    #[error("API {api} is rate limited{}", retry_after_secs.map(|s| format!(", retry after {}s", s)).unwrap_or_default())]
    RateLimited {
        api: String,
        retry_after_secs: Option<u64>,
    },

    /// Credential env var is unset or empty
    #[error("No API key configured for {api} (set {env_var})")]
    MissingCredential { api: String, env_var: String },
}

impl MonitorError {
    /// HTTP status code this error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotMonitored { .. } | Self::UnknownApi { .. } => 404,
            Self::RateLimited { .. } => 429,
            Self::MissingCredential { .. } => 503,
        }
    }

    /// Name of the API the error refers to.
    pub fn api(&self) -> &str {
        match self {
            Self::NotMonitored { api }
            | Self::UnknownApi { api }
            | Self::RateLimited { api, .. }
            | Self::MissingCredential { api, .. } => api,
        }
    }
}
