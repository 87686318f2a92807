//! Health status models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary health as reported over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn from_healthy(is_healthy: bool) -> Self {
        if is_healthy {
            Self::Healthy
        } else {
            Self::Unhealthy
        }
    }

    pub fn is_healthy(self) -> bool {
        self == Self::Healthy
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Tri-state view of an API's health.
///
/// `Unknown` covers both an unmonitored name and a monitored name whose first
/// probe has not completed; the boolean accessors collapse it to `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Unknown,
    Healthy,
    Unhealthy,
}

impl HealthState {
    pub fn is_healthy(self) -> bool {
        self == Self::Healthy
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Unknown => write!(f, "unknown"),
            HealthState::Healthy => write!(f, "healthy"),
            HealthState::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Point-in-time view of one monitored API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealthSnapshot {
    pub status: HealthStatus,
    pub last_checked: Option<DateTime<Utc>>,
    pub retry_attempts: u32,
}

impl ApiHealthSnapshot {
    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_uses_camel_case_fields() {
        let snapshot = ApiHealthSnapshot {
            status: HealthStatus::Unhealthy,
            last_checked: None,
            retry_attempts: 2,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["status"], "unhealthy");
        assert!(json["lastChecked"].is_null());
        assert_eq!(json["retryAttempts"], 2);
    }

    #[test]
    fn test_health_state_display() {
        assert_eq!(HealthState::Unknown.to_string(), "unknown");
        assert!(!HealthState::Unknown.is_healthy());
        assert!(HealthState::Healthy.is_healthy());
    }
}
