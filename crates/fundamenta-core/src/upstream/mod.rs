//! Upstream-specific monitoring on top of the health registry.
//!
//! Metered APIs get an [`ApiMonitor`] with quota tracking; keyless endpoints
//! from the configuration are registered with the plain HTTP probe.

mod monitor;
mod profile;


pub use monitor::{credential_from_env, ApiMonitor, ApiMonitorSet};
pub use profile::{ApiProfile, CredentialPlacement};

use fundamenta_types::MonitorConfig;
use futures::future::join_all;
use std::sync::Arc;
use tracing::info;

use crate::health::ApiHealthMonitor;

/// Register every configured keyless endpoint. Returns how many came up
/// healthy on the first probe.
pub async fn start_keyless_endpoints(
    registry: &Arc<ApiHealthMonitor>,
    config: &MonitorConfig,
) -> usize {
    let fallback = config.check_interval();
    let starts = config.endpoints.iter().map(|endpoint| {
        registry.start_monitoring(&endpoint.name, &endpoint.url, endpoint.interval(fallback))
    });

    let healthy = join_all(starts).await.into_iter().filter(|ok| *ok).count();
    info!(
        "Keyless endpoints registered: {} total, {} healthy",
        config.endpoints.len(),
        healthy
    );
    healthy
}
