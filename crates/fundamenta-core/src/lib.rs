//! # Fundamenta Core
//!
//! Health monitoring for the third-party APIs the Fundamenta app depends on.
//!
//! ```text
//! fundamenta-core/src/
//! ├── health/       # ApiHealthMonitor registry, probes, listeners
//! ├── rate_limit/   # Quota window tracking, Retry-After parsing
//! ├── upstream/     # Per-API monitors (Spoonacular, USDA, OpenAI), keyless endpoints
//! ├── modules/      # Config file loading, logger setup
//! └── error.rs      # AppError
//! ```

#![allow(
    clippy::significant_drop_tightening,
    reason = "Short parking_lot critical sections read more clearly inline"
)]
#![allow(
    clippy::redundant_else,
    reason = "Explicit else blocks improve readability in complex control flow"
)]
// Test-only lints: allow panic!, println!, etc. in test code
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::needless_collect,
        clippy::assertions_on_result_states
    )
)]

pub mod error;
pub mod health;
pub mod modules;
pub mod rate_limit;
pub mod upstream;

// Re-export commonly used types
pub use error::{AppError, AppResult};
pub use health::{ApiHealthMonitor, HealthProbe, ProbeError, RegistryConfig, Subscription};
pub use rate_limit::RateLimitTracker;
pub use upstream::{start_keyless_endpoints, ApiMonitor, ApiMonitorSet, ApiProfile};
