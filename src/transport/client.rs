//! HTTP client wrapper with automatic retry.
//!
//! This module provides the [`HttpClient`] struct: one reqwest connection pool
//! plus an immutable [`RetryPolicy`], shared by the listing and download paths.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use tracing::{debug, instrument, warn};
use url::Url;

use super::error::TransportError;
use super::retry::{RetryDecision, RetryPolicy, classify_error, retry_after_delay};
use crate::cancel::CancelSignal;
use crate::user_agent;

/// HTTP client with bounded automatic retry.
///
/// Designed to be created once and reused for every request of a run, taking
/// advantage of connection pooling. Cloning is cheap and shares the pool.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use yadloader_core::CancelSignal;
/// use yadloader_core::transport::{HttpClient, RetryPolicy};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new(RetryPolicy::default(), Duration::from_secs(10))?;
/// let body = client
///     .get_bytes("https://cloud-api.yandex.net/v1/disk/public/resources", &CancelSignal::new())
///     .await?;
/// println!("{} bytes", body.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry_policy: RetryPolicy,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a client whose connect, idle-read and per-request deadlines equal `timeout`.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error when the TLS backend or resolver cannot be initialized.
    #[instrument(level = "debug", skip(retry_policy), fields(max_retries = retry_policy.max_retries()))]
    pub fn new(retry_policy: RetryPolicy, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()?;
        Ok(Self {
            client,
            retry_policy,
            timeout,
        })
    }

    /// Returns the retry policy applied to every request.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Performs a GET and returns the fully buffered body.
    ///
    /// The whole request, body included, must finish within the configured
    /// timeout; failures are retried per the [`RetryPolicy`].
    ///
    /// # Errors
    ///
    /// Returns the last [`TransportError`] once retries are exhausted, the first
    /// permanent error, or [`TransportError::Cancelled`].
    #[instrument(skip(self, cancel), fields(url = %url))]
    pub async fn get_bytes(
        &self,
        url: &str,
        cancel: &CancelSignal,
    ) -> Result<Vec<u8>, TransportError> {
        validate_url(url)?;
        self.with_retry(url, cancel, move || async move {
            let response = self.send(url, true).await?;
            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError::network(url, e))?;
            Ok(body.to_vec())
        })
        .await
    }

    /// Performs a GET and returns the response once a success status arrives.
    ///
    /// Only the request up to the response headers is retried; the caller
    /// streams the body. No total deadline applies, only the idle read timeout,
    /// so large bodies are not cut off.
    ///
    /// # Errors
    ///
    /// Same as [`get_bytes`](Self::get_bytes).
    #[instrument(skip(self, cancel), fields(url = %url))]
    pub async fn get_stream(
        &self,
        url: &str,
        cancel: &CancelSignal,
    ) -> Result<reqwest::Response, TransportError> {
        validate_url(url)?;
        self.with_retry(url, cancel, move || self.send(url, false)).await
    }

    async fn send(
        &self,
        url: &str,
        with_deadline: bool,
    ) -> Result<reqwest::Response, TransportError> {
        let mut request = self.client.get(url);
        if with_deadline {
            request = request.timeout(self.timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(std::string::ToString::to_string);
            return Err(TransportError::http_status_with_retry_after(
                url,
                status.as_u16(),
                retry_after,
            ));
        }

        Ok(response)
    }

    /// Runs `operation` until it succeeds, fails permanently, or retries run out.
    async fn with_retry<T, F, Fut>(
        &self,
        url: &str,
        cancel: &CancelSignal,
        mut operation: F,
    ) -> Result<T, TransportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, "sending request");

            let Some(result) = cancel.run(operation()).await else {
                return Err(TransportError::cancelled(url));
            };

            let error = match result {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            match self.retry_policy.should_retry(classify_error(&error), attempt) {
                RetryDecision::Retry {
                    delay: backoff_delay,
                    attempt: next_attempt,
                } => {
                    let server_delay = retry_after_delay(&error);
                    let delay = server_delay.unwrap_or(backoff_delay);
                    warn!(
                        url = %url,
                        attempt = next_attempt,
                        max_attempts = self.retry_policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        using_retry_after = server_delay.is_some(),
                        error = %error,
                        "retrying request"
                    );
                    if !cancel.sleep(delay).await {
                        return Err(TransportError::cancelled(url));
                    }
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url = %url, attempts = attempt, %reason, "giving up on request");
                    return Err(error);
                }
            }
        }
    }
}

fn validate_url(url: &str) -> Result<(), TransportError> {
    let parsed = Url::parse(url).map_err(|_| TransportError::invalid_url(url))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(TransportError::invalid_url(url));
    }
    Ok(())
}
