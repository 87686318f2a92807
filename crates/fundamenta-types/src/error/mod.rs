//! Typed error definitions for Fundamenta.
//!
//! All errors are:
//!
//! - **Serializable** for API responses via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for error handling logic via enum variants

mod config;
mod monitor;

pub use config::ConfigError;
pub use monitor::MonitorError;
