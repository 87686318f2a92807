//! Monitor configuration.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::error::ConfigError;

/// NHTSA vPIC make listing, keyless and cheap.
pub const NHTSA_HEALTH_URL: &str = "https://vpic.nhtsa.dot.gov/api/vehicles/getallmakes?format=json";

/// Upper bound for every configured period or window (7 days).
pub const MAX_PERIOD_SECS: u64 = 7 * 24 * 60 * 60;

fn check_period(field: &str, secs: u64) -> Result<(), ConfigError> {
    if secs == 0 {
        return Err(ConfigError::validation(field, "must be greater than 0"));
    }
    if secs > MAX_PERIOD_SECS {
        return Err(ConfigError::validation(
            field,
            format!("must be at most {} seconds", MAX_PERIOD_SECS),
        ));
    }
    Ok(())
}

/// Full monitor configuration, loaded from JSON. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Probe period for every monitored API, in seconds
    pub check_interval_secs: u64,
    /// Deadline applied by the registry to each probe, in seconds
    pub probe_timeout_secs: u64,
    /// Consecutive failures logged as "attempting recovery"; probing continues past it
    pub max_retries: u32,
    /// Rate-limit window when the upstream gives no retry hint, in seconds
    pub default_rate_limit_secs: u64,
    /// Base URL overrides for the built-in profiles, keyed by profile name
    pub base_urls: HashMap<String, String>,
    /// Keyless endpoints probed with a plain GET
    pub endpoints: Vec<EndpointConfig>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 300,
            probe_timeout_secs: 5,
            max_retries: 3,
            default_rate_limit_secs: 24 * 60 * 60,
            base_urls: HashMap::new(),
            endpoints: vec![EndpointConfig {
                name: "nhtsa".to_string(),
                url: NHTSA_HEALTH_URL.to_string(),
                interval_secs: None,
            }],
        }
    }
}

impl MonitorConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn default_rate_limit(&self) -> Duration {
        Duration::from_secs(self.default_rate_limit_secs)
    }

    /// Base URL override for a profile, if configured.
    pub fn base_url_for(&self, profile: &str) -> Option<&str> {
        self.base_urls.get(profile).map(String::as_str)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_period("check_interval_secs", self.check_interval_secs)?;
        check_period("probe_timeout_secs", self.probe_timeout_secs)?;
        check_period("default_rate_limit_secs", self.default_rate_limit_secs)?;

        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            if endpoint.name.trim().is_empty() {
                return Err(ConfigError::validation("endpoints.name", "must not be empty"));
            }
            if !seen.insert(endpoint.name.as_str()) {
                return Err(ConfigError::validation(
                    "endpoints.name",
                    format!("duplicate endpoint '{}'", endpoint.name),
                ));
            }
            if let Some(secs) = endpoint.interval_secs {
                check_period(&format!("endpoints.{}.interval_secs", endpoint.name), secs)?;
            }
        }

        Ok(())
    }
}

/// A keyless upstream watched with the default HTTP probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    pub name: String,
    pub url: String,
    /// Overrides `check_interval_secs` for this endpoint
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

impl EndpointConfig {
    pub fn interval(&self, fallback: Duration) -> Duration {
        self.interval_secs.map_or(fallback, Duration::from_secs)
    }
}
