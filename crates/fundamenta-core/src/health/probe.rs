//! Health probes.
//!
//! A probe is a single health-check attempt against an upstream. The registry
//! owns scheduling and the timeout; a probe only answers "is it healthy right
//! now".

use async_trait::async_trait;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Client-side deadline for the default HTTP probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid probe URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Probe timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

impl ProbeError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// A health-check strategy for one upstream.
///
/// `Ok(false)` means "reachable but unhealthy"; `Err` means the probe itself
/// failed. The registry treats both as unhealthy.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self) -> Result<bool, ProbeError>;
}

/// Default probe: GET the URL, any 2xx is healthy.
pub struct HttpProbe {
    client: Client,
    url: String,
}

impl HttpProbe {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn check(&self) -> Result<bool, ProbeError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %self.url, status = %status, "Health endpoint returned non-2xx");
        }
        Ok(status.is_success())
    }
}

/// Adapter turning an async closure into a probe.
pub struct FnProbe<F> {
    check_fn: F,
}

/// Wrap an async closure as a [`HealthProbe`].
pub fn probe_fn<F, Fut>(check_fn: F) -> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, ProbeError>> + Send,
{
    FnProbe { check_fn }
}

#[async_trait]
impl<F, Fut> HealthProbe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, ProbeError>> + Send,
{
    async fn check(&self) -> Result<bool, ProbeError> {
        (self.check_fn)().await
    }
}

/// HTTP client used by probes, with the probe deadline baked in.
pub fn build_probe_client(timeout: Duration) -> Client {
    Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to build probe client, using defaults");
            Client::new()
        })
}
