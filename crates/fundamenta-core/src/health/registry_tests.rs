#![allow(clippy::unwrap_used, reason = "test assertions")]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fundamenta_types::{HealthState, HealthStatus};
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::probe::{probe_fn, HealthProbe, ProbeError};
use super::registry::{ApiHealthMonitor, RegistryConfig, MAX_CHECK_INTERVAL};

const LONG_INTERVAL: Duration = Duration::from_secs(3600);

/// Replays a fixed list of outcomes, then keeps answering healthy.
struct ScriptedProbe {
    outcomes: Mutex<VecDeque<Result<bool, &'static str>>>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    fn new(outcomes: impl IntoIterator<Item = Result<bool, &'static str>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn check(&self) -> Result<bool, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcomes.lock().pop_front() {
            Some(Ok(healthy)) => Ok(healthy),
            Some(Err(message)) => Err(ProbeError::other(message)),
            None => Ok(true),
        }
    }
}

fn recorder(monitor: &Arc<ApiHealthMonitor>, api: &str) -> Arc<Mutex<Vec<bool>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = monitor.on_status_change(api, move |healthy| sink.lock().push(healthy));
    seen
}

#[tokio::test]
async fn test_start_with_healthy_probe_is_immediately_healthy() {
    let monitor = ApiHealthMonitor::new();

    let first = monitor
        .start_monitoring_with("x", Duration::from_millis(1000), Arc::new(probe_fn(|| async {
            Ok::<bool, ProbeError>(true)
        })))
        .await;

    assert!(first);
    assert!(monitor.is_healthy("x"));
    assert_eq!(monitor.retry_attempts("x"), Some(0));
    assert!(monitor.last_checked("x").is_some());
    assert_eq!(monitor.health_state("x"), HealthState::Healthy);
}

#[tokio::test]
async fn test_start_with_failing_probe_counts_one_retry() {
    let monitor = ApiHealthMonitor::new();

    let first = monitor
        .start_monitoring_with("x", Duration::from_millis(1000), Arc::new(probe_fn(|| async {
            Err::<bool, ProbeError>(ProbeError::other("upstream exploded"))
        })))
        .await;

    assert!(!first);
    assert!(!monitor.is_healthy("x"));
    assert_eq!(monitor.retry_attempts("x"), Some(1));
    assert!(monitor.last_checked("x").is_some(), "last_checked is recorded even on error");
    assert_eq!(monitor.health_state("x"), HealthState::Unhealthy);
}

#[tokio::test]
async fn test_unmonitored_names_are_soft_failures() {
    let monitor = ApiHealthMonitor::new();

    assert!(!monitor.is_healthy("nope"));
    assert!(monitor.last_checked("nope").is_none());
    assert!(monitor.retry_attempts("nope").is_none());
    assert!(monitor.snapshot("nope").is_none());
    assert_eq!(monitor.health_state("nope"), HealthState::Unknown);
    assert!(!monitor.force_check("nope").await);
    assert!(!monitor.stop_monitoring("nope"));
}

#[tokio::test]
async fn test_stop_monitoring_twice_is_idempotent() {
    let monitor = ApiHealthMonitor::new();
    monitor.start_monitoring_with("x", LONG_INTERVAL, ScriptedProbe::new([])).await;

    assert!(monitor.stop_monitoring("x"));
    let after_first = monitor.snapshots();

    assert!(!monitor.stop_monitoring("x"));
    assert_eq!(monitor.snapshots(), after_first);
    assert!(!monitor.is_monitored("x"));
    assert!(monitor.monitored_apis().is_empty());
}

#[tokio::test]
async fn test_retry_attempts_follow_probe_results() {
    let monitor = ApiHealthMonitor::new();
    let probe = ScriptedProbe::new([Ok(false), Err("timeout"), Ok(true), Ok(false)]);

    monitor.start_monitoring_with("x", LONG_INTERVAL, probe.clone()).await;
    assert_eq!(monitor.retry_attempts("x"), Some(1));

    assert!(!monitor.force_check("x").await);
    assert_eq!(monitor.retry_attempts("x"), Some(2));

    assert!(monitor.force_check("x").await);
    assert_eq!(monitor.retry_attempts("x"), Some(0));

    assert!(!monitor.force_check("x").await);
    assert_eq!(monitor.retry_attempts("x"), Some(1));

    assert_eq!(probe.calls(), 4);
}

#[tokio::test]
async fn test_retries_keep_counting_past_max_retries() {
    let monitor = ApiHealthMonitor::with_config(RegistryConfig {
        max_retries: 1,
        ..Default::default()
    });
    let probe = ScriptedProbe::new([Ok(false), Ok(false), Ok(false), Ok(false)]);

    monitor.start_monitoring_with("x", LONG_INTERVAL, probe).await;
    for _ in 0..3 {
        monitor.force_check("x").await;
    }

    assert_eq!(monitor.retry_attempts("x"), Some(4));
}

#[tokio::test]
async fn test_listeners_fire_only_on_transitions() {
    let monitor = ApiHealthMonitor::new();
    let seen = recorder(&monitor, "x");
    assert_eq!(*seen.lock(), vec![false], "initial value delivered on subscribe");

    let probe = ScriptedProbe::new([Ok(true), Ok(true), Ok(false), Ok(false), Ok(true)]);
    monitor.start_monitoring_with("x", LONG_INTERVAL, probe).await;
    for _ in 0..4 {
        monitor.force_check("x").await;
    }

    assert_eq!(*seen.lock(), vec![false, true, false, true]);
}

#[tokio::test]
async fn test_first_probe_false_is_not_a_transition() {
    let monitor = ApiHealthMonitor::new();
    let seen = recorder(&monitor, "x");

    monitor.start_monitoring_with("x", LONG_INTERVAL, ScriptedProbe::new([Ok(false)])).await;

    assert_eq!(*seen.lock(), vec![false]);
}

#[tokio::test]
async fn test_subscribe_delivers_current_status() {
    let monitor = ApiHealthMonitor::new();
    monitor.start_monitoring_with("x", LONG_INTERVAL, ScriptedProbe::new([Ok(true)])).await;

    let seen = recorder(&monitor, "x");
    assert_eq!(*seen.lock(), vec![true]);
}

#[tokio::test]
async fn test_panicking_listener_is_isolated() {
    let monitor = ApiHealthMonitor::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let _bad = monitor.on_status_change("x", |healthy| {
        if healthy {
            panic!("listener bug");
        }
    });
    let counter = Arc::clone(&calls);
    let _good = monitor.on_status_change("x", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let healthy = monitor.start_monitoring_with("x", LONG_INTERVAL, ScriptedProbe::new([Ok(true)])).await;

    assert!(healthy, "probe result is unaffected by the panicking listener");
    assert!(monitor.is_healthy("x"));
    // One initial call plus one transition.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unsubscribe_stops_notifications() {
    let monitor = ApiHealthMonitor::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let subscription = monitor.on_status_change("x", move |healthy| sink.lock().push(healthy));
    assert_eq!(monitor.listener_count("x"), 1);
    assert!(subscription.unsubscribe());
    assert_eq!(monitor.listener_count("x"), 0);

    monitor.start_monitoring_with("x", LONG_INTERVAL, ScriptedProbe::new([Ok(true)])).await;
    assert_eq!(*seen.lock(), vec![false]);
}

#[tokio::test]
async fn test_remove_listener_by_id() {
    let monitor = ApiHealthMonitor::new();
    let subscription = monitor.on_status_change("x", |_| {});
    let id = subscription.id();

    assert!(monitor.remove_listener("x", id));
    assert!(!monitor.remove_listener("x", id));
    assert!(!subscription.unsubscribe());
}

#[tokio::test]
async fn test_restart_resets_counters() {
    let monitor = ApiHealthMonitor::new();
    monitor
        .start_monitoring_with("x", LONG_INTERVAL, ScriptedProbe::new([Ok(false), Ok(false)]))
        .await;
    monitor.force_check("x").await;
    assert_eq!(monitor.retry_attempts("x"), Some(2));

    monitor.start_monitoring_with("x", LONG_INTERVAL, ScriptedProbe::new([Ok(false)])).await;
    assert_eq!(monitor.retry_attempts("x"), Some(1));
    assert_eq!(monitor.monitored_apis(), vec!["x".to_string()]);
}

#[tokio::test]
async fn test_listeners_survive_restart() {
    let monitor = ApiHealthMonitor::new();
    let seen = recorder(&monitor, "x");

    monitor.start_monitoring_with("x", LONG_INTERVAL, ScriptedProbe::new([Ok(true)])).await;
    monitor.stop_monitoring("x");
    monitor.start_monitoring_with("x", LONG_INTERVAL, ScriptedProbe::new([Ok(true)])).await;

    // Stopping a healthy API reports it down; the new entry then recovers.
    assert_eq!(*seen.lock(), vec![false, true, false, true]);
}

#[tokio::test]
async fn test_replacing_healthy_entry_with_failing_one_notifies_down() {
    let monitor = ApiHealthMonitor::new();
    monitor.start_monitoring_with("x", LONG_INTERVAL, ScriptedProbe::new([Ok(true)])).await;
    let seen = recorder(&monitor, "x");

    let healthy =
        monitor.start_monitoring_with("x", LONG_INTERVAL, ScriptedProbe::new([Ok(false)])).await;

    assert!(!healthy);
    assert_eq!(*seen.lock(), vec![true, false]);
    assert_eq!(seen.lock().last().copied(), Some(monitor.is_healthy("x")));
}

#[tokio::test]
async fn test_stopping_unhealthy_api_is_silent() {
    let monitor = ApiHealthMonitor::new();
    monitor.start_monitoring_with("x", LONG_INTERVAL, ScriptedProbe::new([Ok(false)])).await;
    let seen = recorder(&monitor, "x");

    monitor.stop_monitoring("x");
    assert_eq!(*seen.lock(), vec![false]);
}

#[tokio::test(start_paused = true)]
async fn test_timer_probes_periodically() {
    let monitor = ApiHealthMonitor::new();
    let probe = ScriptedProbe::new([]);

    monitor.start_monitoring_with("x", Duration::from_secs(10), probe.clone()).await;
    assert_eq!(probe.calls(), 1);

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(probe.calls(), 3);

    monitor.stop_monitoring("x");
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(probe.calls(), 3, "no probes after stop");
}

#[tokio::test(start_paused = true)]
async fn test_registry_timeout_applies_to_custom_probes() {
    let monitor = ApiHealthMonitor::with_config(RegistryConfig {
        probe_timeout: Duration::from_secs(5),
        ..Default::default()
    });

    let healthy = monitor
        .start_monitoring_with("slow", LONG_INTERVAL, Arc::new(probe_fn(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<bool, ProbeError>(true)
        })))
        .await;

    assert!(!healthy);
    assert_eq!(monitor.retry_attempts("slow"), Some(1));
}

/// First call answers at once; later calls hang until cancelled.
struct HangingProbe {
    calls: AtomicUsize,
    never: Notify,
}

#[async_trait]
impl HealthProbe for HangingProbe {
    async fn check(&self) -> Result<bool, ProbeError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(true);
        }
        self.never.notified().await;
        Ok(false)
    }
}

#[tokio::test]
async fn test_stop_cancels_in_flight_probe() {
    let monitor = ApiHealthMonitor::with_config(RegistryConfig {
        probe_timeout: Duration::from_secs(60),
        ..Default::default()
    });
    let probe = Arc::new(HangingProbe { calls: AtomicUsize::new(0), never: Notify::new() });
    monitor.start_monitoring_with("x", LONG_INTERVAL, probe).await;
    let seen = recorder(&monitor, "x");

    let background = Arc::clone(&monitor);
    let in_flight = tokio::spawn(async move { background.force_check("x").await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(monitor.stop_monitoring("x"));
    let result = tokio::time::timeout(Duration::from_secs(1), in_flight).await;

    assert!(!result.unwrap().unwrap());
    // Stop reports the API down; the cancelled probe adds nothing after that.
    assert_eq!(*seen.lock(), vec![true, false]);
}

#[tokio::test]
async fn test_shutdown_stops_everything() {
    let monitor = ApiHealthMonitor::new();
    for name in ["a", "b", "c"] {
        monitor.start_monitoring_with(name, LONG_INTERVAL, ScriptedProbe::new([])).await;
    }
    assert_eq!(monitor.monitored_apis().len(), 3);

    monitor.shutdown();
    assert!(monitor.monitored_apis().is_empty());
}

#[tokio::test]
async fn test_snapshots_report_every_api() {
    let monitor = ApiHealthMonitor::new();
    monitor.start_monitoring_with("up", LONG_INTERVAL, ScriptedProbe::new([Ok(true)])).await;
    monitor.start_monitoring_with("down", LONG_INTERVAL, ScriptedProbe::new([Ok(false)])).await;

    let snapshots = monitor.snapshots();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots["up"].status, HealthStatus::Healthy);
    assert_eq!(snapshots["down"].status, HealthStatus::Unhealthy);
    assert_eq!(snapshots["down"].retry_attempts, 1);
}

#[tokio::test]
async fn test_default_http_probe_gets_target() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/api/vehicles/getallmakes"))
        .respond_with(wiremock::ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let monitor = ApiHealthMonitor::new();
    let url = format!("{}/api/vehicles/getallmakes", server.uri());

    assert!(monitor.start_monitoring("nhtsa", &url, LONG_INTERVAL).await);
    assert_eq!(monitor.health_state("nhtsa"), HealthState::Healthy);
}

#[tokio::test(start_paused = true)]
async fn test_oversized_interval_is_clamped() {
    let monitor = ApiHealthMonitor::new();
    let probe = ScriptedProbe::new([]);

    monitor.start_monitoring_with("x", Duration::MAX, probe.clone()).await;
    assert_eq!(probe.calls(), 1);

    tokio::time::sleep(MAX_CHECK_INTERVAL + Duration::from_secs(1)).await;
    assert_eq!(probe.calls(), 2, "timer still fires at the clamped period");
}
