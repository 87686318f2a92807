//! Shared data structures for the health registry, the per-API monitors and
//! their configuration.

mod config;
mod health;
mod rate_limit;

pub use config::{EndpointConfig, MonitorConfig, MAX_PERIOD_SECS, NHTSA_HEALTH_URL};
pub use health::{ApiHealthSnapshot, HealthState, HealthStatus};
pub use rate_limit::ApiMonitorStatus;
