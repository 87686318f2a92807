//! Application State
//!
//! Holds the health registry, the per-API monitors and the loaded config.

use std::sync::Arc;

use fundamenta_core::{
    start_keyless_endpoints, ApiHealthMonitor, ApiMonitor, ApiMonitorSet, RegistryConfig,
};
use fundamenta_types::MonitorConfig;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub(crate) inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub registry: Arc<ApiHealthMonitor>,
    pub monitors: ApiMonitorSet,
    pub config: MonitorConfig,
}

impl AppState {
    /// Build the registry and one monitor per built-in profile, credentials
    /// from the environment. Nothing is probed yet; see [`Self::start`].
    pub fn from_config(config: MonitorConfig) -> Self {
        let registry = ApiHealthMonitor::with_config(RegistryConfig::from(&config));
        let monitors = ApiMonitorSet::from_config(&registry, &config);
        Self::new_with_components(registry, monitors, config)
    }

    pub fn new_with_components(
        registry: Arc<ApiHealthMonitor>,
        monitors: ApiMonitorSet,
        config: MonitorConfig,
    ) -> Self {
        Self { inner: Arc::new(AppStateInner { registry, monitors, config }) }
    }

    /// Register keyless endpoints and start every keyed monitor. Each start
    /// awaits its first probe.
    pub async fn start(&self) {
        let keyless_healthy =
            start_keyless_endpoints(&self.inner.registry, &self.inner.config).await;
        let started = self.inner.monitors.start_all().await;
        info!(
            "Monitoring {} APIs ({} keyless healthy, keyed monitors started: {:?})",
            self.inner.registry.monitored_apis().len(),
            keyless_healthy,
            started
        );
    }

    /// Stop every timer. Safe to call more than once.
    pub fn shutdown(&self) {
        self.inner.monitors.stop_all();
        self.inner.registry.shutdown();
    }

    pub fn registry(&self) -> &Arc<ApiHealthMonitor> {
        &self.inner.registry
    }

    pub fn monitors(&self) -> &ApiMonitorSet {
        &self.inner.monitors
    }

    pub fn monitor(&self, api_name: &str) -> Option<&Arc<ApiMonitor>> {
        self.inner.monitors.get(api_name)
    }
}
