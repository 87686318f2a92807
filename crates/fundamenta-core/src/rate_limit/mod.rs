pub mod parser;


pub use parser::{
    classify_response, is_quota_status, is_soft_quota_failure, parse_retry_after,
    parse_retry_time_from_body, ResponseVerdict,
};

use chrono::{DateTime, TimeDelta, Utc};
use fundamenta_types::MAX_PERIOD_SECS;
use parking_lot::Mutex;
use std::time::Duration;

/// Window applied when an upstream gives no retry hint.
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on an upstream-provided hint. Anything larger is treated as bogus.
pub const MAX_RETRY_HINT_SECS: u64 = MAX_PERIOD_SECS;

fn duration_to_secs_ceil(d: TimeDelta) -> u64 {
    let millis = d.num_milliseconds().max(0) as u64;
    millis.div_ceil(1000)
}

/// Point-in-time view of a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    pub is_rate_limited: bool,
    pub rate_limit_reset_time: Option<DateTime<Utc>>,
}

/// Quota state for a single upstream API.
///
/// Expiry is lazy: nothing runs when the window elapses, the next query
/// simply observes `now >= reset` and clears the flag.
pub struct RateLimitTracker {
    default_window: Duration,
    reset_at: Mutex<Option<DateTime<Utc>>>,
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT_WINDOW)
    }
}

impl RateLimitTracker {
    /// Windows longer than [`MAX_RETRY_HINT_SECS`] are clamped.
    pub fn new(default_window: Duration) -> Self {
        let cap = Duration::from_secs(MAX_RETRY_HINT_SECS);
        if default_window > cap {
            tracing::warn!(
                "Default rate-limit window of {}s is above the {}s cap, clamping",
                default_window.as_secs(),
                MAX_RETRY_HINT_SECS
            );
        }
        let default_window = default_window.min(cap);
        Self {
            default_window,
            reset_at: Mutex::new(None),
        }
    }

    pub fn default_window(&self) -> Duration {
        self.default_window
    }

    /// Record a quota error. Returns the reset time.
    pub fn handle_rate_limit_error(&self, retry_after_secs: Option<u64>) -> DateTime<Utc> {
        self.handle_rate_limit_error_at(retry_after_secs, Utc::now())
    }

    pub fn handle_rate_limit_error_at(
        &self,
        retry_after_secs: Option<u64>,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let window = match retry_after_secs {
            Some(secs) if secs <= MAX_RETRY_HINT_SECS => Duration::from_secs(secs),
            Some(secs) => {
                tracing::warn!(
                    "Ignoring retry hint of {}s (above {}s cap), using default window",
                    secs,
                    MAX_RETRY_HINT_SECS
                );
                self.default_window
            }
            None => self.default_window,
        };

        let window = TimeDelta::from_std(window).unwrap_or(TimeDelta::days(1));
        let reset = now.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC);
        *self.reset_at.lock() = Some(reset);
        reset
    }

    /// Whether callers should hold off. Clears an elapsed window as a side effect.
    pub fn should_throttle_request(&self) -> bool {
        self.should_throttle_at(Utc::now())
    }

    pub fn should_throttle_at(&self, now: DateTime<Utc>) -> bool {
        let mut reset_at = self.reset_at.lock();
        match *reset_at {
            Some(reset) if now < reset => true,
            Some(_) => {
                *reset_at = None;
                tracing::debug!("Rate limit window elapsed");
                false
            }
            None => false,
        }
    }

    /// Seconds until the window closes, rounded up. Zero when not limited.
    pub fn remaining_wait_secs(&self) -> u64 {
        self.remaining_wait_secs_at(Utc::now())
    }

    pub fn remaining_wait_secs_at(&self, now: DateTime<Utc>) -> u64 {
        if !self.should_throttle_at(now) {
            return 0;
        }
        self.reset_at
            .lock()
            .map_or(0, |reset| duration_to_secs_ceil(reset - now))
    }

    pub fn snapshot(&self) -> RateLimitState {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> RateLimitState {
        let is_rate_limited = self.should_throttle_at(now);
        RateLimitState {
            is_rate_limited,
            rate_limit_reset_time: if is_rate_limited { *self.reset_at.lock() } else { None },
        }
    }

    /// Drop any active window.
    pub fn clear(&self) {
        if self.reset_at.lock().take().is_some() {
            tracing::debug!("Rate limit state cleared");
        }
    }
}
