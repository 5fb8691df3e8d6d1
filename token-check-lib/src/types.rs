//! Core data types for token validation.
//!
//! This module defines the check policy that drives the engine and the
//! per-token result record handed to formatters and writers.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default endpoint used when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "https://api.github.com/user";

/// Status codes the transport retries on by default.
pub const DEFAULT_RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Outcome of validating one credential.
///
/// Exactly one `TokenResult` is produced per input token. Results are created
/// by the checker and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResult {
    /// Token as it should appear in human-readable output (masked or full)
    pub display_value: String,

    /// Full token, kept for valid-token export regardless of masking
    pub raw_value: String,

    /// Whether the token authenticated and carried every required scope
    pub is_valid: bool,

    /// Principal identifier reported by the endpoint (successful checks only)
    pub principal_id: Option<String>,

    /// Principal login/name reported by the endpoint (successful checks only)
    pub principal_name: Option<String>,

    /// Scopes granted to the token, in header order; empty if unknown
    pub granted_scopes: Vec<String>,

    /// Reason for failure or insufficient scopes; `None` on clean success
    pub message: Option<String>,
}

impl TokenResult {
    /// Field names in serialization order, used for columnar output headers.
    pub const FIELD_NAMES: [&'static str; 7] = [
        "display_value",
        "raw_value",
        "is_valid",
        "principal_id",
        "principal_name",
        "granted_scopes",
        "message",
    ];

    /// Build a failed result carrying only a message.
    pub fn failed(display_value: String, raw_value: String, message: impl Into<String>) -> Self {
        Self {
            display_value,
            raw_value,
            is_valid: false,
            principal_id: None,
            principal_name: None,
            granted_scopes: Vec::new(),
            message: Some(message.into()),
        }
    }

    /// Granted scopes joined with commas, or `"none"`.
    pub fn scopes_label(&self) -> String {
        if self.granted_scopes.is_empty() {
            "none".to_string()
        } else {
            self.granted_scopes.join(",")
        }
    }
}

/// Configuration for a validation run.
///
/// Covers both the per-request policy (endpoint, scopes, pacing, masking) and
/// the transport and pool knobs that shape how requests are issued.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckPolicy {
    /// Authorization-check URL every token is sent to
    pub endpoint: String,

    /// Minimum spacing between successive requests issued by one worker
    /// Default: 1 second
    pub per_worker_delay: Duration,

    /// Scopes that must all be granted for a token to count as valid
    pub required_scopes: Vec<String>,

    /// Redact tokens in `display_value`
    pub mask_output: bool,

    /// Transport-level retry budget for forcelisted statuses
    /// Default: 2
    pub retry_count: u32,

    /// Number of concurrent workers
    /// Default: 2, Range: 1-100
    pub workers: usize,

    /// Hard wall-clock timeout for a single request attempt
    /// Default: 10 seconds
    pub request_timeout: Duration,

    /// Status codes the transport retries with backoff
    pub retry_statuses: Vec<u16>,

    /// Base factor for exponential backoff between transport retries
    /// Default: 500ms
    pub backoff_factor: Duration,

    /// Authorization scheme placed before the token (`token`, `Bearer`, ...)
    pub auth_scheme: String,

    /// Accept header sent with every check
    pub accept: String,

    /// User-Agent header sent with every check
    pub user_agent: String,
}

impl Default for CheckPolicy {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            per_worker_delay: Duration::from_secs(1),
            required_scopes: Vec::new(),
            mask_output: false,
            retry_count: 2,
            workers: 2,
            request_timeout: Duration::from_secs(10),
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
            backoff_factor: Duration::from_millis(500),
            auth_scheme: "token".to_string(),
            accept: "application/vnd.github.v3+json".to_string(),
            user_agent: format!("token-check/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CheckPolicy {
    /// Set the check endpoint.
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the per-worker pacing delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.per_worker_delay = delay;
        self
    }

    /// Set the scopes every valid token must carry.
    pub fn with_required_scopes(mut self, scopes: Vec<String>) -> Self {
        self.required_scopes = scopes;
        self
    }

    /// Enable or disable token masking in display values.
    pub fn with_mask(mut self, mask: bool) -> Self {
        self.mask_output = mask;
        self
    }

    /// Set the transport retry budget.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retry_count = retries;
        self
    }

    /// Set the worker count.
    ///
    /// Automatically caps workers at 100 to prevent resource exhaustion.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, 100);
        self
    }

    /// Set the per-attempt request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the exponential backoff base factor.
    pub fn with_backoff_factor(mut self, factor: Duration) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Set the authorization scheme.
    pub fn with_auth_scheme<S: Into<String>>(mut self, scheme: S) -> Self {
        self.auth_scheme = scheme.into();
        self
    }
}

/// Output format for the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable table of valid tokens plus a summary
    #[default]
    Text,

    /// Pretty-printed JSON array of every result
    Json,

    /// Comma-separated values with a header row
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!(
                "Invalid output format '{}'. Use one of: text, json, csv",
                other
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
