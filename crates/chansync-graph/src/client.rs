//! Microsoft Graph API client
//!
//! Wraps `reqwest::Client` with bearer authentication, endpoint
//! construction, and the request gate: every call is retried with
//! exponential backoff on transient failures, honors `Retry-After` on
//! HTTP 429, performs one transparent re-authentication on 401, and
//! surfaces non-retryable client errors immediately.
//!
//! Throttling and backoff sleep only the task driving the affected request;
//! other in-flight requests through the same client are unaffected.

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, warn};

use chansync_core::ports::TokenSource;

use crate::gate::{parse_retry_after, RetryPolicy, DEFAULT_RETRY_AFTER};
use crate::GraphError;

/// Base URL for Microsoft Graph API v1.0
const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// HTTP client for Microsoft Graph API calls.
///
/// Cheap to share via `Arc`; all mutable state lives in the token lease.
pub struct GraphClient {
    /// The underlying HTTP client
    http: Client,
    /// Base URL for API requests
    base_url: String,
    /// Credential lease supplying bearer tokens
    tokens: Arc<dyn TokenSource>,
    /// Retry/backoff policy applied to every request
    retry: RetryPolicy,
}

impl GraphClient {
    /// Creates a new client against the production Graph endpoint.
    pub fn new(tokens: Arc<dyn TokenSource>) -> Self {
        Self::with_base_url(tokens, GRAPH_BASE_URL)
    }

    /// Creates a client with a custom base URL (useful for testing).
    pub fn with_base_url(tokens: Arc<dyn TokenSource>, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            tokens,
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the configured retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Builds an absolute URL for an API path relative to the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Returns the underlying HTTP client.
    ///
    /// Upload sessions use absolute, pre-authenticated URLs and bypass the
    /// bearer header, so they talk to the raw client directly.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Executes a request through the gate.
    ///
    /// `build` is invoked once per attempt so the request body is rebuilt
    /// rather than reused. Classification:
    /// - 2xx → returned to the caller
    /// - 429 → sleep the server-specified duration, retry the same request
    /// - 401 → invalidate the lease and retry once with a fresh token
    /// - 403 → [`GraphError::Forbidden`], never retried
    /// - 404 / 409 → surfaced for the caller to handle
    /// - 5xx and transport errors → exponential backoff until attempts are
    ///   exhausted
    pub async fn send_with_retry<F>(
        &self,
        context: &str,
        build: F,
    ) -> Result<Response, GraphError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut reauthenticated = false;
        let mut attempt: u32 = 0;

        loop {
            let token = self
                .tokens
                .access_token()
                .await
                .map_err(|e| GraphError::CredentialLease(format!("{e:#}")))?;

            let result = build(&self.http).bearer_auth(&token).send().await;

            let response = match result {
                Ok(response) => response,
                Err(err) => {
                    if attempt + 1 >= self.retry.max_attempts {
                        warn!(context, attempts = attempt + 1, "request failed, retries exhausted");
                        return Err(GraphError::Network(err));
                    }
                    let delay = self.retry.backoff_delay(attempt);
                    debug!(
                        context,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transport error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
            };

            let status = response.status();

            if status.is_success() {
                if attempt > 0 {
                    info!(context, attempt, "request succeeded after retry");
                }
                return Ok(response);
            }

            match status {
                StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                        .unwrap_or(DEFAULT_RETRY_AFTER);

                    if attempt + 1 >= self.retry.max_attempts {
                        warn!(context, attempts = attempt + 1, "429 retry limit exhausted");
                        return Err(GraphError::TooManyRequests { retry_after });
                    }

                    info!(
                        context,
                        attempt,
                        retry_after_ms = retry_after.as_millis() as u64,
                        "received 429, honoring Retry-After"
                    );
                    tokio::time::sleep(retry_after).await;
                    attempt += 1;
                }
                StatusCode::UNAUTHORIZED => {
                    if reauthenticated {
                        let detail = error_detail(response).await;
                        return Err(GraphError::Unauthorized(detail));
                    }
                    // One transparent renewal; does not consume an attempt.
                    reauthenticated = true;
                    self.tokens.invalidate(&token).await;
                    debug!(context, "401 received, renewing credential lease");
                }
                StatusCode::FORBIDDEN => {
                    let detail = error_detail(response).await;
                    return Err(GraphError::Forbidden(detail));
                }
                StatusCode::NOT_FOUND => {
                    let detail = error_detail(response).await;
                    return Err(GraphError::NotFound(detail));
                }
                StatusCode::CONFLICT => {
                    let detail = error_detail(response).await;
                    return Err(GraphError::Conflict(detail));
                }
                s if s.is_server_error() => {
                    if attempt + 1 >= self.retry.max_attempts {
                        let detail = error_detail(response).await;
                        warn!(context, attempts = attempt + 1, "server error, retries exhausted");
                        return Err(GraphError::ServerError(format!("{s}: {detail}")));
                    }
                    let delay = self.retry.backoff_delay(attempt);
                    debug!(
                        context,
                        attempt,
                        status = s.as_u16(),
                        delay_ms = delay.as_millis() as u64,
                        "server error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                s => {
                    let detail = error_detail(response).await;
                    return Err(GraphError::RequestFailed {
                        status: s.as_u16(),
                        detail,
                    });
                }
            }
        }
    }
}

/// Extracts a short diagnostic string from an error response body.
async fn error_detail(response: Response) -> String {
    match response.text().await {
        Ok(body) if !body.is_empty() => {
            const MAX: usize = 512;
            if body.len() > MAX {
                // Truncate on a char boundary.
                let mut end = MAX;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}…", &body[..end])
            } else {
                body
            }
        }
        _ => "no response body".to_string(),
    }
}
