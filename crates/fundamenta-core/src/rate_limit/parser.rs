//! Quota-error detection for upstream responses.
//!
//! Upstreams signal an exhausted quota either with HTTP 402/429 or, in
//! Spoonacular's case, with a 200 whose JSON body reads
//! `{"status": "failure", "code": 402, ...}`.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

static RETRY_AFTER_REGEX: OnceLock<Regex> = OnceLock::new();
static TRY_AGAIN_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_retry_after_regex() -> &'static Regex {
    RETRY_AFTER_REGEX.get_or_init(|| {
        Regex::new(r"(?i)retry after (\d+) second").expect("Retry after regex is valid")
    })
}

fn get_try_again_regex() -> &'static Regex {
    TRY_AGAIN_REGEX.get_or_init(|| {
        Regex::new(r"(?i)try again in (\d+)\s*s").expect("Try again regex is valid")
    })
}

/// How a probe response should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseVerdict {
    Healthy,
    Unhealthy,
    /// Quota exhausted; distinct from an ordinary failure
    RateLimited { retry_after_secs: Option<u64> },
}

pub fn is_quota_status(status: u16) -> bool {
    matches!(status, 402 | 429)
}

/// A 2xx body that actually reports a quota failure.
pub fn is_soft_quota_failure(body: &str) -> bool {
    let trimmed = body.trim();
    if !trimmed.starts_with('{') {
        return false;
    }
    let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return false;
    };

    let failed = json
        .get("status")
        .and_then(|s| s.as_str())
        .is_some_and(|s| s.eq_ignore_ascii_case("failure"));
    let code = json.get("code").and_then(|c| {
        c.as_u64().or_else(|| c.as_str().and_then(|s| s.parse::<u64>().ok()))
    });

    failed && matches!(code, Some(402 | 429))
}

/// Parse a `Retry-After` header: delay-seconds or an HTTP date.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<u64> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(secs);
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    let secs = (at - now).num_seconds();
    Some(u64::try_from(secs).unwrap_or(0))
}

/// Retry hint embedded in an error body, if any.
pub fn parse_retry_time_from_body(body: &str) -> Option<u64> {
    let trimmed = body.trim();
    if trimmed.starts_with('{') {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
            let hint = ["retry_after", "retryAfter"].iter().find_map(|key| {
                json.get(key)
                    .or_else(|| json.get("error").and_then(|e| e.get(key)))
                    .and_then(|v| v.as_u64())
            });
            if hint.is_some() {
                return hint;
            }
        }
    }

    if let Some(caps) = get_retry_after_regex().captures(body) {
        if let Ok(s) = caps[1].parse::<u64>() {
            return Some(s);
        }
    }

    if let Some(caps) = get_try_again_regex().captures(body) {
        if let Ok(s) = caps[1].parse::<u64>() {
            return Some(s);
        }
    }

    None
}

/// Classify a probe response. The header hint wins over a body hint.
pub fn classify_response(
    status: u16,
    retry_after_header: Option<&str>,
    body: &str,
    now: DateTime<Utc>,
) -> ResponseVerdict {
    let quota_hit = is_quota_status(status)
        || ((200..300).contains(&status) && is_soft_quota_failure(body));

    if quota_hit {
        let retry_after_secs = retry_after_header
            .and_then(|v| parse_retry_after(v, now))
            .or_else(|| parse_retry_time_from_body(body));
        return ResponseVerdict::RateLimited { retry_after_secs };
    }

    if (200..300).contains(&status) {
        ResponseVerdict::Healthy
    } else {
        ResponseVerdict::Unhealthy
    }
}
