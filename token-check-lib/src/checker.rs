//! Main token checker implementation.
//!
//! This module provides the primary `TokenChecker` struct that validates one
//! credential at a time against the check endpoint and fans a whole batch out
//! over the worker pool.

use crate::concurrent::{CancelToken, WorkerPool};
use crate::error::TokenCheckError;
use crate::rate_limit::{self, RateLimitDecision};
use crate::report::{Aggregator, ProgressSink, Report};
use crate::transport::{HttpTransport, ProbeResponse, Transport};
use crate::types::{CheckPolicy, TokenResult};
use crate::utils::{mask_token, parse_scope_list, truncate_chars};
use futures_util::stream::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;

/// Header listing the scopes granted to the presented token.
pub const SCOPES_HEADER: &str = "x-oauth-scopes";

/// Maximum number of body characters quoted in an unexpected-status message.
pub const BODY_EXCERPT_CHARS: usize = 80;

/// Validates tokens against the configured endpoint.
///
/// Cloning is cheap: the policy and transport are shared, so every worker
/// reuses the same connection pool.
///
/// # Example
///
/// ```rust,no_run
/// use token_check_lib::{CheckPolicy, TokenChecker};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let checker = TokenChecker::new(CheckPolicy::default())?;
///     let result = checker.check_token("ghp_example").await;
///     println!("valid: {}", result.is_valid);
///     Ok(())
/// }
/// ```
pub struct TokenChecker<T: Transport = HttpTransport> {
    /// Policy shared by every check
    policy: Arc<CheckPolicy>,
    /// Transport shared by every worker
    transport: Arc<T>,
}

impl<T: Transport> Clone for TokenChecker<T> {
    fn clone(&self) -> Self {
        Self {
            policy: Arc::clone(&self.policy),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl TokenChecker<HttpTransport> {
    /// Create a checker backed by the HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns `TokenCheckError` if the endpoint is not a valid URL or the
    /// HTTP client cannot be built.
    pub fn new(policy: CheckPolicy) -> Result<Self, TokenCheckError> {
        let transport = HttpTransport::from_policy(&policy)?;
        Ok(Self::with_transport(policy, transport))
    }
}

impl<T: Transport> TokenChecker<T> {
    /// Create a checker over any transport (used by tests to inject fakes).
    pub fn with_transport(policy: CheckPolicy, transport: T) -> Self {
        Self {
            policy: Arc::new(policy),
            transport: Arc::new(transport),
        }
    }

    /// Get the policy for this checker.
    pub fn policy(&self) -> &CheckPolicy {
        &self.policy
    }

    /// Validate a single token.
    ///
    /// Never fails: transport errors, unexpected statuses and malformed
    /// bodies all become a `TokenResult` with `is_valid == false`.
    ///
    /// The checking process:
    /// 1. Send the token through the transport
    /// 2. If the endpoint reports exhausted quota, wait for the reset and retry once
    /// 3. Sleep the per-worker pacing delay, whatever the outcome
    /// 4. Classify the final response
    pub async fn check_token(&self, token: &str) -> TokenResult {
        let token = token.trim();
        let display_value = mask_token(token, self.policy.mask_output);

        let outcome = self.probe_with_backpressure(token, &display_value).await;

        if !self.policy.per_worker_delay.is_zero() {
            tokio::time::sleep(self.policy.per_worker_delay).await;
        }

        classify(token, display_value, &self.policy, outcome)
    }

    async fn probe_with_backpressure(
        &self,
        token: &str,
        display_value: &str,
    ) -> Result<ProbeResponse, TokenCheckError> {
        let response = self.transport.probe(token).await?;

        match rate_limit::evaluate(&response, rate_limit::now_epoch_secs()) {
            RateLimitDecision::Proceed => Ok(response),
            RateLimitDecision::PauseAndRetry(wait) => {
                tracing::warn!(
                    token = %display_value,
                    wait_secs = wait.as_secs(),
                    "rate limit reached, sleeping before retry"
                );
                tokio::time::sleep(wait).await;
                self.transport.probe(token).await
            }
        }
    }
}

impl<T: Transport + 'static> TokenChecker<T> {
    /// Check tokens and return results as a stream, in completion order.
    ///
    /// Exactly `policy.workers` workers drain the token list. Cancelling
    /// `cancel` stops dispatch and ends the stream once workers exit.
    pub fn check_tokens_stream(
        &self,
        tokens: Vec<String>,
        cancel: CancelToken,
    ) -> Pin<Box<dyn Stream<Item = TokenResult> + Send>> {
        let receiver = WorkerPool::new(self.clone(), self.policy.workers).spawn(tokens, cancel);

        let stream = futures_util::stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|result| (result, receiver))
        });

        Box::pin(stream)
    }

    /// Check every token and aggregate the results.
    ///
    /// `sink` is told about each result as it lands. If `cancel` fires the
    /// returned report is partial and marked as cancelled.
    ///
    /// # Errors
    ///
    /// Returns `TokenCheckError::EmptyInput` if `tokens` is empty; nothing is
    /// sent in that case.
    pub async fn check_tokens<S: ProgressSink + ?Sized>(
        &self,
        tokens: Vec<String>,
        cancel: &CancelToken,
        sink: &S,
    ) -> Result<Report, TokenCheckError> {
        if tokens.is_empty() {
            return Err(TokenCheckError::empty_input("token list"));
        }

        let total = tokens.len();
        let mut aggregator = Aggregator::new(total);
        let mut stream = self.check_tokens_stream(tokens, cancel.clone());

        while let Some(result) = stream.next().await {
            sink.on_result(aggregator.completed() + 1, total, &result);
            aggregator.push(result);
        }

        Ok(aggregator.finish(cancel.is_cancelled()))
    }
}

/// Turn a transport outcome into a result record.
pub fn classify(
    token: &str,
    display_value: String,
    policy: &CheckPolicy,
    outcome: Result<ProbeResponse, TokenCheckError>,
) -> TokenResult {
    let raw_value = token.to_string();

    let response = match outcome {
        Ok(response) => response,
        Err(e) => return TokenResult::failed(display_value, raw_value, format!("Error: {}", e)),
    };

    match response.status {
        200 => {
            let body: serde_json::Value = match serde_json::from_str(&response.body) {
                Ok(body) => body,
                Err(e) => {
                    let err = TokenCheckError::from(e);
                    return TokenResult::failed(display_value, raw_value, format!("Error: {}", err));
                }
            };

            let granted_scopes = parse_scope_list(response.header(SCOPES_HEADER).unwrap_or(""));
            let (principal_id, principal_name) = extract_principal(&body);

            let missing_scope = policy
                .required_scopes
                .iter()
                .any(|required| !granted_scopes.contains(required));

            let mut result = TokenResult {
                display_value,
                raw_value,
                is_valid: true,
                principal_id,
                principal_name,
                granted_scopes,
                message: None,
            };
            if missing_scope {
                result.is_valid = false;
                result.message = Some(format!("Insufficient scopes: {}", result.scopes_label()));
            }
            result
        }
        401 => TokenResult::failed(display_value, raw_value, "Unauthorized / invalid"),
        status => TokenResult::failed(
            display_value,
            raw_value,
            format!(
                "HTTP {}: {}",
                status,
                truncate_chars(&response.body, BODY_EXCERPT_CHARS)
            ),
        ),
    }
}

/// Extract principal identity from a success body.
///
/// The id may be a number or a string; the name comes from `login`,
/// falling back to `name`.
pub fn extract_principal(body: &serde_json::Value) -> (Option<String>, Option<String>) {
    let id = body.get("id").and_then(|id| match id {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) => Some(s.clone()),
        _ => None,
    });

    let name = body
        .get("login")
        .and_then(|v| v.as_str())
        .or_else(|| body.get("name").and_then(|v| v.as_str()))
        .map(String::from);

    (id, name)
}
