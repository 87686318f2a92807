//! # Fundamenta Types
//!
//! Core types, models, and error definitions for the Fundamenta API health
//! monitor.
//!
//! - **`error`** - Typed errors for monitoring and configuration
//! - **`models`** - Health snapshots, rate-limit status, monitor configuration
//!
//! ## Architecture Role
//!
//! ```text
//!        fundamenta-types (this crate)
//!                 │
//!                 ▼
//!          fundamenta-core
//!                 │
//!                 ▼
//!         fundamenta-server
//! ```
//!
//! Everything here is serde-serializable so the server can hand it straight
//! to the HTTP layer.

pub mod error;
pub mod models;

pub use error::{ConfigError, MonitorError};

pub use models::{
    ApiHealthSnapshot, ApiMonitorStatus, EndpointConfig, HealthState, HealthStatus,
    MonitorConfig, MAX_PERIOD_SECS, NHTSA_HEALTH_URL,
};
