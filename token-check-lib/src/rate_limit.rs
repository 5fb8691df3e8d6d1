//! Rate-limit back-pressure decisions.
//!
//! The endpoint signals exhausted quota with `403 Forbidden`, a
//! `X-RateLimit-Remaining: 0` header and an `X-RateLimit-Reset` epoch
//! timestamp. The decision is a pure function of status, headers and the
//! current time so it can be tested without any I/O.

use crate::transport::ProbeResponse;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Header carrying the remaining request quota.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Header carrying the quota reset time (seconds since the Unix epoch).
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Status code used by the endpoint for quota exhaustion.
pub const RATE_LIMIT_STATUS: u16 = 403;

/// What the checker should do with a response before classifying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Classify the response as-is
    Proceed,
    /// Sleep for the given duration, then re-issue the request once
    PauseAndRetry(Duration),
}

/// Decide whether `response` is a rate-limit signal worth waiting out.
///
/// `now_epoch_secs` is the current Unix time; the wait is
/// `max(0, reset - now) + 1` seconds. Anything other than a 403 with zero
/// remaining quota and a parseable reset header proceeds to classification.
pub fn evaluate(response: &ProbeResponse, now_epoch_secs: u64) -> RateLimitDecision {
    if response.status != RATE_LIMIT_STATUS {
        return RateLimitDecision::Proceed;
    }

    let remaining = response
        .header(REMAINING_HEADER)
        .and_then(|v| v.parse::<u64>().ok());
    if remaining != Some(0) {
        return RateLimitDecision::Proceed;
    }

    match response
        .header(RESET_HEADER)
        .and_then(|v| v.parse::<u64>().ok())
    {
        Some(reset) => {
            let wait = reset.saturating_sub(now_epoch_secs) + 1;
            RateLimitDecision::PauseAndRetry(Duration::from_secs(wait))
        }
        None => RateLimitDecision::Proceed,
    }
}

/// Current Unix time in whole seconds.
pub fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
