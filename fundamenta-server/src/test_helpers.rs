//! Test helpers for fundamenta-server unit tests.

use std::sync::Arc;

use axum_test::TestServer;
use fundamenta_core::{ApiHealthMonitor, ApiMonitor, ApiMonitorSet, ApiProfile};
use fundamenta_types::MonitorConfig;

use crate::router::build_router;
use crate::state::AppState;

/// Config with no keyless endpoints, so nothing reaches the network unless a
/// test registers it.
pub fn quiet_config() -> MonitorConfig {
    MonitorConfig { endpoints: Vec::new(), ..Default::default() }
}

/// `AppState` with a fresh registry and the given per-API monitors.
pub fn test_app_state(
    build_monitors: impl FnOnce(&Arc<ApiHealthMonitor>, &MonitorConfig) -> Vec<ApiMonitor>,
) -> AppState {
    let config = quiet_config();
    let registry = ApiHealthMonitor::new();
    let monitors = ApiMonitorSet::from_monitors(build_monitors(&registry, &config));
    AppState::new_with_components(registry, monitors, config)
}

/// A keyless OpenAI monitor plus a keyed Spoonacular monitor pointed at `base_url`.
pub fn default_monitors(
    base_url: &str,
) -> impl FnOnce(&Arc<ApiHealthMonitor>, &MonitorConfig) -> Vec<ApiMonitor> + '_ {
    move |registry: &Arc<ApiHealthMonitor>, config: &MonitorConfig| {
        vec![
            ApiMonitor::new(Arc::clone(registry), ApiProfile::openai(), None, config),
            ApiMonitor::new(
                Arc::clone(registry),
                ApiProfile::spoonacular().with_base_url(base_url),
                Some("test-key".to_string()),
                config,
            ),
        ]
    }
}

#[allow(clippy::expect_used, reason = "test setup")]
pub fn test_server(state: AppState) -> TestServer {
    TestServer::new(build_router(state)).expect("failed to build test server")
}
