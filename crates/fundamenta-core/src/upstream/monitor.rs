//! Per-API monitor: a registry entry plus local quota state for one metered
//! upstream.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fundamenta_types::{ApiMonitorStatus, MonitorConfig, MonitorError};
use parking_lot::RwLock;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::profile::{ApiProfile, CredentialPlacement};
use crate::health::{ApiHealthMonitor, HealthProbe, ProbeError};
use crate::rate_limit::{classify_response, RateLimitTracker, ResponseVerdict};

/// State shared between the monitor and the probe it installs.
struct MonitorShared {
    profile: ApiProfile,
    api_key: RwLock<Option<String>>,
    rate_limit: RateLimitTracker,
    client: Client,
}

/// Cheap authenticated query that also feeds the quota tracker.
struct QuotaProbe {
    shared: Arc<MonitorShared>,
}

#[async_trait]
impl HealthProbe for QuotaProbe {
    async fn check(&self) -> Result<bool, ProbeError> {
        let shared = &self.shared;
        let name = shared.profile.name;

        if shared.rate_limit.should_throttle_request() {
            debug!(api = %name, "Rate limited, skipping probe request");
            return Ok(false);
        }

        let Some(api_key) = shared.api_key.read().clone() else {
            return Err(ProbeError::other(format!("no API key configured for {}", name)));
        };

        let url = shared.profile.probe_url(&api_key)?;
        let mut request = shared.client.get(url);
        if shared.profile.credential == CredentialPlacement::Bearer {
            request = request.bearer_auth(&api_key);
        }

        let response = request.send().await.map_err(redact_transport_error)?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        // The body only matters for quota detection; a read failure leaves the
        // status code to decide.
        let body = response.text().await.unwrap_or_default();

        match classify_response(status, retry_after.as_deref(), &body, Utc::now()) {
            ResponseVerdict::Healthy => Ok(true),
            ResponseVerdict::Unhealthy => {
                debug!(api = %name, status, "Probe returned unhealthy status");
                Ok(false)
            }
            ResponseVerdict::RateLimited { retry_after_secs } => {
                let reset = shared.rate_limit.handle_rate_limit_error(retry_after_secs);
                warn!(api = %name, status, reset = %reset, "Quota exhausted during health probe");
                Ok(false)
            }
        }
    }
}

/// Drop the request URL from a transport error; it can carry the credential.
pub(super) fn redact_transport_error(err: reqwest::Error) -> ProbeError {
    ProbeError::Http(err.without_url())
}

/// Read a credential from the environment. Blank values count as unset.
pub fn credential_from_env(env_var: &str) -> Option<String> {
    std::env::var(env_var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Health and quota tracking for one metered upstream.
pub struct ApiMonitor {
    registry: Arc<ApiHealthMonitor>,
    shared: Arc<MonitorShared>,
    interval: Duration,
}

impl ApiMonitor {
    pub fn new(
        registry: Arc<ApiHealthMonitor>,
        profile: ApiProfile,
        api_key: Option<String>,
        config: &MonitorConfig,
    ) -> Self {
        let client = registry.client().clone();
        Self {
            shared: Arc::new(MonitorShared {
                profile,
                api_key: RwLock::new(api_key.filter(|k| !k.trim().is_empty())),
                rate_limit: RateLimitTracker::new(config.default_rate_limit()),
                client,
            }),
            registry,
            interval: config.check_interval(),
        }
    }

    pub fn name(&self) -> &str {
        self.shared.profile.name
    }

    pub fn profile(&self) -> &ApiProfile {
        &self.shared.profile
    }

    pub fn has_api_key(&self) -> bool {
        self.shared.api_key.read().is_some()
    }

    /// Register with the registry. Without a credential this logs a warning
    /// and leaves the registry untouched.
    pub async fn start(&self) -> bool {
        let name = self.name();
        if !self.has_api_key() {
            warn!(
                api = %name,
                "No API key configured (set {}), monitoring disabled",
                self.shared.profile.env_var
            );
            return false;
        }

        let probe = Arc::new(QuotaProbe { shared: Arc::clone(&self.shared) });
        let healthy = self.registry.start_monitoring_with(name, self.interval, probe).await;
        info!(api = %name, healthy, "API monitor started");
        true
    }

    pub fn stop(&self) -> bool {
        self.registry.stop_monitoring(self.name())
    }

    /// Record a quota error reported by any caller of this upstream.
    pub fn handle_rate_limit_error(&self, retry_after_secs: Option<u64>) -> DateTime<Utc> {
        let reset = self.shared.rate_limit.handle_rate_limit_error(retry_after_secs);
        warn!(api = %self.name(), reset = %reset, "API rate limited");
        reset
    }

    pub fn should_throttle_request(&self) -> bool {
        self.shared.rate_limit.should_throttle_request()
    }

    pub fn is_api_rate_limited(&self) -> bool {
        self.should_throttle_request()
    }

    pub fn remaining_wait_secs(&self) -> u64 {
        self.shared.rate_limit.remaining_wait_secs()
    }

    /// Gate for callers about to hit the upstream.
    pub fn ensure_available(&self) -> Result<(), MonitorError> {
        if self.should_throttle_request() {
            return Err(MonitorError::RateLimited {
                api: self.name().to_string(),
                retry_after_secs: Some(self.remaining_wait_secs()),
            });
        }
        if !self.has_api_key() {
            return Err(MonitorError::MissingCredential {
                api: self.name().to_string(),
                env_var: self.shared.profile.env_var.to_string(),
            });
        }
        Ok(())
    }

    pub fn get_status(&self) -> ApiMonitorStatus {
        let name = self.name();
        let quota = self.shared.rate_limit.snapshot();
        ApiMonitorStatus {
            api_name: name.to_string(),
            is_healthy: self.registry.is_healthy(name),
            last_checked: self.registry.last_checked(name),
            is_rate_limited: quota.is_rate_limited,
            rate_limit_reset_time: quota.rate_limit_reset_time,
        }
    }

    /// Swap the credential and restart monitoring with it. A quota window
    /// belongs to the old key, so it is cleared.
    pub async fn update_api_key(&self, new_key: impl Into<String>) -> bool {
        let new_key = new_key.into();
        *self.shared.api_key.write() = Some(new_key).filter(|k| !k.trim().is_empty());
        self.shared.rate_limit.clear();
        info!(api = %self.name(), "API key updated, restarting monitor");

        self.stop();
        self.start().await
    }
}

/// All per-API monitors, keyed by profile name.
#[derive(Default)]
pub struct ApiMonitorSet {
    monitors: BTreeMap<String, Arc<ApiMonitor>>,
}

impl ApiMonitorSet {
    /// One monitor per built-in profile, credentials from the environment.
    pub fn from_config(registry: &Arc<ApiHealthMonitor>, config: &MonitorConfig) -> Self {
        Self::from_config_with(registry, config, credential_from_env)
    }

    pub fn from_config_with<F>(
        registry: &Arc<ApiHealthMonitor>,
        config: &MonitorConfig,
        lookup_key: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let monitors = ApiProfile::builtin().into_iter().map(|profile| {
            let profile = match config.base_url_for(profile.name) {
                Some(base) => profile.with_base_url(base),
                None => profile,
            };
            let api_key = lookup_key(profile.env_var);
            ApiMonitor::new(Arc::clone(registry), profile, api_key, config)
        });
        Self::from_monitors(monitors)
    }

    pub fn from_monitors(monitors: impl IntoIterator<Item = ApiMonitor>) -> Self {
        Self {
            monitors: monitors
                .into_iter()
                .map(|m| (m.name().to_string(), Arc::new(m)))
                .collect(),
        }
    }

    /// Start every monitor that has a credential. Returns the names started.
    pub async fn start_all(&self) -> Vec<String> {
        let mut started = Vec::new();
        for (name, monitor) in &self.monitors {
            if monitor.start().await {
                started.push(name.clone());
            }
        }
        started
    }

    pub fn stop_all(&self) {
        for monitor in self.monitors.values() {
            monitor.stop();
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ApiMonitor>> {
        self.monitors.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.monitors.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn statuses(&self) -> BTreeMap<String, ApiMonitorStatus> {
        self.monitors
            .iter()
            .map(|(name, monitor)| (name.clone(), monitor.get_status()))
            .collect()
    }
}
