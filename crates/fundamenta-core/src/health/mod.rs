//! API health monitoring: probes, the registry, and status listeners.

mod listener;
mod probe;
mod registry;

#[cfg(test)]
mod registry_tests;

pub use listener::{ListenerId, StatusListener, Subscription};
pub use probe::{
    build_probe_client, probe_fn, FnProbe, HealthProbe, HttpProbe, ProbeError,
    DEFAULT_PROBE_TIMEOUT,
};
pub use registry::{
    ApiHealthMonitor, RegistryConfig, DEFAULT_CHECK_INTERVAL, DEFAULT_MAX_RETRIES,
    MAX_CHECK_INTERVAL,
};
