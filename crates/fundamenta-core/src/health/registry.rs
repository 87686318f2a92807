//! API Health Registry
//!
//! Tracks the health of named third-party APIs by probing each one on its
//! own timer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ApiHealthMonitor                                             │
//! │  ├── apis: DashMap<String, Arc<MonitoredApi>>                 │
//! │  │     ├── probe: Arc<dyn HealthProbe>                        │
//! │  │     ├── status (is_healthy, last_checked, retry_attempts)  │
//! │  │     ├── timer task (tokio interval)                        │
//! │  │     └── shutdown: watch channel (cancels in-flight probe)  │
//! │  └── listeners: DashMap<String, Vec<(ListenerId, Listener)>>  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry is an explicit context object: construct it once, share the
//! `Arc`, and call [`ApiHealthMonitor::shutdown`] (or drop it) to stop every
//! timer.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fundamenta_types::{
    ApiHealthSnapshot, HealthState, HealthStatus, MonitorConfig, MAX_PERIOD_SECS,
};
use parking_lot::Mutex;
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::listener::{notify_all, ListenerId, StatusListener, Subscription};
use super::probe::{
    build_probe_client, HealthProbe, HttpProbe, ProbeError, DEFAULT_PROBE_TIMEOUT,
};

/// Default probe period (5 minutes).
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(300);

/// Longest accepted probe period. Longer requests are clamped.
pub const MAX_CHECK_INTERVAL: Duration = Duration::from_secs(MAX_PERIOD_SECS);

/// Consecutive failures that still produce an "attempting recovery" log line.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Registry tuning.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub default_interval: Duration,
    /// Applied to every probe, custom ones included
    pub probe_timeout: Duration,
    pub max_retries: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_interval: DEFAULT_CHECK_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl From<&MonitorConfig> for RegistryConfig {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            default_interval: config.check_interval(),
            probe_timeout: config.probe_timeout(),
            max_retries: config.max_retries,
        }
    }
}

#[derive(Debug, Default)]
struct ProbeStatus {
    is_healthy: bool,
    last_checked: Option<DateTime<Utc>>,
    retry_attempts: u32,
    /// Set once the first probe result has been applied
    probed: bool,
}

/// Bookkeeping for one monitored API.
struct MonitoredApi {
    name: String,
    target: Option<String>,
    interval: Duration,
    probe: Arc<dyn HealthProbe>,
    status: Mutex<ProbeStatus>,
    /// Serializes timer probes and forced probes for this name
    probe_lock: tokio::sync::Mutex<()>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MonitoredApi {
    fn new(
        name: &str,
        target: Option<String>,
        interval: Duration,
        probe: Arc<dyn HealthProbe>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            name: name.to_string(),
            target,
            interval,
            probe,
            status: Mutex::new(ProbeStatus::default()),
            probe_lock: tokio::sync::Mutex::new(()),
            shutdown_tx,
            task: Mutex::new(None),
        }
    }

    fn is_stopped(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Cancel the timer and any probe still in flight.
    fn stop(&self) {
        self.shutdown_tx.send_replace(true);
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }

    fn is_healthy(&self) -> bool {
        self.status.lock().is_healthy
    }

    fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.status.lock().last_checked
    }

    fn retry_attempts(&self) -> u32 {
        self.status.lock().retry_attempts
    }

    fn health_state(&self) -> HealthState {
        let status = self.status.lock();
        match (status.probed, status.is_healthy) {
            (false, _) => HealthState::Unknown,
            (true, true) => HealthState::Healthy,
            (true, false) => HealthState::Unhealthy,
        }
    }

    fn snapshot(&self) -> ApiHealthSnapshot {
        let status = self.status.lock();
        ApiHealthSnapshot {
            status: HealthStatus::from_healthy(status.is_healthy),
            last_checked: status.last_checked,
            retry_attempts: status.retry_attempts,
        }
    }
}

/// Registry of monitored APIs.
pub struct ApiHealthMonitor {
    apis: DashMap<String, Arc<MonitoredApi>>,
    /// Keyed by API name, independent of monitoring so subscribers survive a restart
    listeners: DashMap<String, Vec<(ListenerId, StatusListener)>>,
    next_listener_id: AtomicU64,
    config: RegistryConfig,
    client: Client,
}

impl ApiHealthMonitor {
    /// Create a registry with default configuration
    pub fn new() -> Arc<Self> {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Arc<Self> {
        let client = build_probe_client(config.probe_timeout);
        Arc::new(Self {
            apis: DashMap::new(),
            listeners: DashMap::new(),
            next_listener_id: AtomicU64::new(1),
            config,
            client,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// HTTP client shared by the default probes.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Start probing `health_check_url` with the default GET probe.
    ///
    /// See [`Self::start_monitoring_with`] for the lifecycle.
    pub async fn start_monitoring(
        self: &Arc<Self>,
        api_name: &str,
        health_check_url: &str,
        interval: Duration,
    ) -> bool {
        let probe = Arc::new(HttpProbe::new(self.client.clone(), health_check_url));
        self.install(api_name, Some(health_check_url.to_string()), interval, probe).await
    }

    /// Start probing with a custom probe.
    ///
    /// Replaces any existing monitor for the name (its timer and in-flight
    /// probe are cancelled and its counters reset), runs one probe
    /// immediately, then schedules the recurring timer. Returns the result of
    /// that first probe.
    pub async fn start_monitoring_with(
        self: &Arc<Self>,
        api_name: &str,
        interval: Duration,
        probe: Arc<dyn HealthProbe>,
    ) -> bool {
        self.install(api_name, None, interval, probe).await
    }

    async fn install(
        self: &Arc<Self>,
        api_name: &str,
        target: Option<String>,
        interval: Duration,
        probe: Arc<dyn HealthProbe>,
    ) -> bool {
        let interval = if interval.is_zero() {
            warn!(api = %api_name, "Zero check interval requested, using default");
            self.config.default_interval.min(MAX_CHECK_INTERVAL)
        } else if interval > MAX_CHECK_INTERVAL {
            warn!(
                api = %api_name,
                requested_secs = interval.as_secs(),
                max_secs = MAX_PERIOD_SECS,
                "Check interval too long, clamping"
            );
            MAX_CHECK_INTERVAL
        } else {
            interval
        };

        let entry = Arc::new(MonitoredApi::new(api_name, target, interval, probe));
        if let Some(previous) = self.apis.insert(api_name.to_string(), Arc::clone(&entry)) {
            self.retire(&previous);
            debug!(api = %api_name, "Replaced existing health monitor");
        }

        info!(
            api = %api_name,
            target = entry.target.as_deref().unwrap_or("custom probe"),
            interval_secs = interval.as_secs(),
            "Started API health monitoring"
        );

        let healthy = self.check_api_health(&entry).await;

        // Checked under the task lock so a concurrent stop() always sees the handle.
        let mut task = entry.task.lock();
        if !entry.is_stopped() {
            *task = Some(self.spawn_timer(&entry));
        }

        healthy
    }

    fn spawn_timer(self: &Arc<Self>, entry: &Arc<MonitoredApi>) -> JoinHandle<()> {
        let monitor = Arc::downgrade(self);
        let entry = Arc::clone(entry);
        let mut shutdown_rx = entry.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let period = entry.interval;
            let now = Instant::now();
            let mut ticker = interval_at(now.checked_add(period).unwrap_or(now), period);
            // A probe that overruns its period delays the next tick instead of bursting.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }

                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                monitor.check_api_health(&entry).await;
            }

            debug!(api = %entry.name, "Health check timer stopped");
        })
    }

    /// Run one probe and apply its result. Never fails: errors and timeouts
    /// count as unhealthy.
    async fn check_api_health(&self, entry: &MonitoredApi) -> bool {
        let _serial = entry.probe_lock.lock().await;

        let mut shutdown_rx = entry.shutdown_tx.subscribe();
        if *shutdown_rx.borrow_and_update() {
            return false;
        }

        entry.status.lock().last_checked = Some(Utc::now());

        let outcome = tokio::select! {
            _ = shutdown_rx.changed() => {
                debug!(api = %entry.name, "Health probe cancelled");
                return false;
            }
            outcome = tokio::time::timeout(self.config.probe_timeout, entry.probe.check()) => outcome,
        };

        let outcome =
            outcome.unwrap_or_else(|_| Err(ProbeError::Timeout(self.config.probe_timeout)));
        let result = match outcome {
            Ok(healthy) => healthy,
            Err(e) => {
                debug!(api = %entry.name, error = %e, "Health probe failed");
                false
            }
        };

        self.apply_result(entry, result)
    }

    fn apply_result(&self, entry: &MonitoredApi, result: bool) -> bool {
        let (previous, was_probed, retry_attempts) = {
            let mut status = entry.status.lock();
            // Checked under the status lock so retire() cannot interleave.
            if entry.is_stopped() {
                debug!(api = %entry.name, "Discarding probe result for stopped monitor");
                return result;
            }
            let previous = status.is_healthy;
            let was_probed = status.probed;
            status.is_healthy = result;
            status.probed = true;
            if result {
                status.retry_attempts = 0;
            } else {
                status.retry_attempts = status.retry_attempts.saturating_add(1);
            }
            (previous, was_probed, status.retry_attempts)
        };

        if result {
            if !previous && was_probed {
                info!(api = %entry.name, "API recovered");
            } else if !was_probed {
                info!(api = %entry.name, "API healthy");
            }
        } else if retry_attempts <= self.config.max_retries {
            warn!(
                api = %entry.name,
                attempt = retry_attempts,
                max_retries = self.config.max_retries,
                "API unhealthy, attempting recovery"
            );
        } else {
            debug!(api = %entry.name, attempt = retry_attempts, "API still unhealthy");
        }

        if previous != result {
            self.notify(&entry.name, result);
        }

        result
    }

    /// Stop an entry leaving the map. Listeners that last saw it healthy are
    /// told it is down, so the next entry for the name starts from `false` on
    /// both sides.
    fn retire(&self, entry: &MonitoredApi) {
        entry.stop();
        let was_healthy = std::mem::take(&mut entry.status.lock().is_healthy);
        if was_healthy {
            self.notify(&entry.name, false);
        }
    }

    fn notify(&self, api_name: &str, is_healthy: bool) {
        let listeners: Vec<StatusListener> = match self.listeners.get(api_name) {
            Some(entries) => entries.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return,
        };
        notify_all(api_name, &listeners, is_healthy);
    }

    /// Cancel the timer and any in-flight probe, and forget the API.
    /// Returns false if the name was not monitored.
    pub fn stop_monitoring(&self, api_name: &str) -> bool {
        match self.apis.remove(api_name) {
            Some((_, entry)) => {
                self.retire(&entry);
                info!(api = %api_name, "Stopped API health monitoring");
                true
            }
            None => {
                debug!(api = %api_name, "stop_monitoring on unmonitored API");
                false
            }
        }
    }

    /// Stop every monitored API.
    pub fn shutdown(&self) {
        let names: Vec<String> = self.apis.iter().map(|e| e.key().clone()).collect();
        for name in names {
            self.stop_monitoring(&name);
        }
    }

    /// Last observed health. False for unmonitored and never-checked names.
    pub fn is_healthy(&self, api_name: &str) -> bool {
        self.apis.get(api_name).is_some_and(|e| e.is_healthy())
    }

    /// Distinguishes "unknown" from "known unhealthy".
    pub fn health_state(&self, api_name: &str) -> HealthState {
        self.apis.get(api_name).map_or(HealthState::Unknown, |e| e.health_state())
    }

    pub fn last_checked(&self, api_name: &str) -> Option<DateTime<Utc>> {
        self.apis.get(api_name).and_then(|e| e.last_checked())
    }

    pub fn retry_attempts(&self, api_name: &str) -> Option<u32> {
        self.apis.get(api_name).map(|e| e.retry_attempts())
    }

    pub fn is_monitored(&self, api_name: &str) -> bool {
        self.apis.contains_key(api_name)
    }

    /// Monitored API names, sorted.
    pub fn monitored_apis(&self) -> Vec<String> {
        let mut names: Vec<String> = self.apis.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn snapshot(&self, api_name: &str) -> Option<ApiHealthSnapshot> {
        self.apis.get(api_name).map(|e| e.snapshot())
    }

    pub fn snapshots(&self) -> BTreeMap<String, ApiHealthSnapshot> {
        self.apis.iter().map(|e| (e.key().clone(), e.value().snapshot())).collect()
    }

    /// Register a listener and immediately call it once with the current
    /// status. Afterwards it fires on every health transition for the name.
    pub fn on_status_change<F>(self: &Arc<Self>, api_name: &str, listener: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        let listener: StatusListener = Arc::new(listener);

        self.listeners
            .entry(api_name.to_string())
            .or_default()
            .push((id, Arc::clone(&listener)));

        notify_all(api_name, &[listener], self.is_healthy(api_name));

        Subscription::new(Arc::downgrade(self), api_name.to_string(), id)
    }

    /// Returns false if no such listener was registered.
    pub fn remove_listener(&self, api_name: &str, id: ListenerId) -> bool {
        let removed = match self.listeners.get_mut(api_name) {
            Some(mut entries) => {
                let before = entries.len();
                entries.retain(|(existing, _)| *existing != id);
                entries.len() != before
            }
            None => false,
        };
        self.listeners.remove_if(api_name, |_, entries| entries.is_empty());
        removed
    }

    pub fn listener_count(&self, api_name: &str) -> usize {
        self.listeners.get(api_name).map_or(0, |entries| entries.len())
    }

    /// Probe now, outside the timer, and return the fresh result.
    /// False if the name is not monitored.
    pub async fn force_check(&self, api_name: &str) -> bool {
        let entry = match self.apis.get(api_name) {
            Some(entry) => Arc::clone(entry.value()),
            None => {
                warn!(api = %api_name, "force_check on unmonitored API");
                return false;
            }
        };
        self.check_api_health(&entry).await
    }
}

impl Drop for ApiHealthMonitor {
    fn drop(&mut self) {
        for entry in &self.apis {
            entry.value().stop();
        }
    }
}
