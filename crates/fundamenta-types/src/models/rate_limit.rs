use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Combined view of a per-API monitor: registry health plus local quota state.
///
/// The two flags are independent. An API can be unhealthy from a failed probe
/// and rate limited from an earlier quota error at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMonitorStatus {
    pub api_name: String,
    pub is_healthy: bool,
    pub last_checked: Option<DateTime<Utc>>,
    pub is_rate_limited: bool,
    pub rate_limit_reset_time: Option<DateTime<Utc>>,
}

impl ApiMonitorStatus {
    /// Whether a caller should attempt a request right now.
    pub fn is_usable(&self) -> bool {
        self.is_healthy && !self.is_rate_limited
    }
}
