//! HTTP transport for the authorization-check endpoint.
//!
//! The checker only talks to the [`Transport`] trait so tests can swap the
//! network for a scripted fake. [`HttpTransport`] is the production
//! implementation: a pooled `reqwest::Client` plus a retry loop for transient
//! server statuses with exponential backoff.

use crate::error::TokenCheckError;
use crate::types::CheckPolicy;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Upper bound for a single backoff sleep.
pub const BACKOFF_MAX: Duration = Duration::from_secs(120);

/// Boxed future returned by [`Transport::probe`].
pub type ProbeFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ProbeResponse, TokenCheckError>> + Send + 'a>>;

/// A fully read response from the check endpoint.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as text
    pub body: String,
}

impl ProbeResponse {
    /// Create a response with no headers.
    pub fn new<B: Into<String>>(status: u16, body: B) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Add a header; invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Read a header as a trimmed string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    }
}

/// Issues one authenticated check request for a token.
///
/// Implementations must be safe to share across workers.
pub trait Transport: Send + Sync {
    /// Send the check for `token` and return the final response after any
    /// transport-level retries.
    fn probe<'a>(&'a self, token: &'a str) -> ProbeFuture<'a>;
}

/// Production transport over a pooled `reqwest::Client`.
#[derive(Clone)]
pub struct HttpTransport {
    /// Shared HTTP client; cloning shares the connection pool
    http_client: reqwest::Client,
    /// Target URL
    endpoint: String,
    /// `Authorization` scheme prefix
    auth_scheme: String,
    /// `Accept` header value
    accept: String,
    /// Retries after the first attempt
    retry_count: u32,
    /// Statuses that trigger a retry
    retry_statuses: Vec<u16>,
    /// Backoff base factor
    backoff_factor: Duration,
    /// Per-attempt timeout
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport from a check policy.
    pub fn from_policy(policy: &CheckPolicy) -> Result<Self, TokenCheckError> {
        reqwest::Url::parse(&policy.endpoint).map_err(|e| {
            TokenCheckError::config(format!("Invalid endpoint '{}': {}", policy.endpoint, e))
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(policy.request_timeout)
            .pool_max_idle_per_host(policy.workers.max(1))
            .user_agent(policy.user_agent.clone())
            .build()
            .map_err(|e| {
                TokenCheckError::network_with_source("Failed to create HTTP client", e.to_string())
            })?;

        Ok(Self {
            http_client,
            endpoint: policy.endpoint.clone(),
            auth_scheme: policy.auth_scheme.clone(),
            accept: policy.accept.clone(),
            retry_count: policy.retry_count,
            retry_statuses: policy.retry_statuses.clone(),
            backoff_factor: policy.backoff_factor,
            timeout: policy.request_timeout,
        })
    }

    async fn send_with_retries(&self, token: &str) -> Result<ProbeResponse, TokenCheckError> {
        let mut attempt: u32 = 0;

        loop {
            let sent = self
                .http_client
                .get(&self.endpoint)
                .header(AUTHORIZATION, format!("{} {}", self.auth_scheme, token))
                .header(ACCEPT, &self.accept)
                .send()
                .await
                .map_err(|e| TokenCheckError::from_reqwest(e, self.timeout));

            let retries_left = attempt < self.retry_count;

            match sent {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if retries_left && self.retry_statuses.contains(&status) {
                        let wait = retry_after(response.headers())
                            .unwrap_or_else(|| backoff_delay(self.backoff_factor, attempt));
                        tracing::debug!(
                            status,
                            attempt = attempt + 1,
                            wait_ms = wait.as_millis() as u64,
                            "retrying transient status"
                        );
                        tokio::time::sleep(wait).await;
                        attempt += 1;
                        continue;
                    }
                    return read_response(response, self.timeout).await;
                }
                Err(err) if retries_left && err.is_retryable() => {
                    let wait = backoff_delay(self.backoff_factor, attempt);
                    tracing::debug!(
                        error = %err,
                        attempt = attempt + 1,
                        wait_ms = wait.as_millis() as u64,
                        "retrying after transport failure"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Transport for HttpTransport {
    fn probe<'a>(&'a self, token: &'a str) -> ProbeFuture<'a> {
        Box::pin(self.send_with_retries(token))
    }
}

async fn read_response(
    response: reqwest::Response,
    timeout: Duration,
) -> Result<ProbeResponse, TokenCheckError> {
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let body = response
        .text()
        .await
        .map_err(|e| TokenCheckError::from_reqwest(e, timeout))?;

    Ok(ProbeResponse {
        status,
        headers,
        body,
    })
}

/// Backoff before retry number `attempt + 1`: `factor * 2^attempt`, capped.
pub fn backoff_delay(factor: Duration, attempt: u32) -> Duration {
    let multiplier = 2u32.saturating_pow(attempt.min(16));
    factor.saturating_mul(multiplier).min(BACKOFF_MAX)
}

/// Numeric `Retry-After` header in seconds, if present.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .map(|d| d.min(BACKOFF_MAX))
}
