//! Retry logic with configurable backoff for transient request failures.
//!
//! This module provides the [`RetryPolicy`] and [`FailureType`] types for
//! classifying transport errors and determining retry behavior.
//!
//! # Overview
//!
//! When a request fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - Temporary failures that may succeed on retry
//! - [`FailureType::Permanent`] - Failures that won't succeed regardless of retries
//! - [`FailureType::RateLimited`] - Server rate limiting (retries, honoring Retry-After)
//!
//! The [`RetryPolicy`] then decides whether another attempt is allowed and how
//! long to wait, using either exponential or fixed backoff.
//!
//! # Example
//!
//! ```
//! use yadloader_core::transport::{
//!     FailureType, RetryDecision, RetryPolicy, TransportError, classify_error,
//! };
//!
//! let policy = RetryPolicy::default();
//! let error = TransportError::http_status("https://example.com/file.bin", 503);
//! let failure_type = classify_error(&error);
//!
//! match policy.should_retry(failure_type, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument, warn};

use super::TransportError;
use super::constants::{
    DEFAULT_MAX_JITTER, DEFAULT_RETRY_WAIT_MAX, DEFAULT_RETRY_WAIT_MIN, MAX_RETRY_AFTER,
};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Classification of request failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: network timeout, 5xx server errors, connection refused.
    Transient,

    /// Permanent failure that won't succeed regardless of retries.
    ///
    /// Examples: 404 Not Found, 400 Bad Request, invalid URL, cancellation.
    Permanent,

    /// Server rate limiting (HTTP 429).
    RateLimited,
}

/// How the wait between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffStrategy {
    /// `min_wait * 2^(attempt - 1)`, capped at `max_wait`.
    #[default]
    Exponential,
    /// Always `min_wait`.
    Fixed,
}

impl BackoffStrategy {
    /// Parses the configuration label (`exponential` or `fixed`).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "exponential" | "exp" => Some(Self::Exponential),
            "fixed" | "constant" => Some(Self::Fixed),
            _ => None,
        }
    }

    /// Returns the stable label used in config files and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exponential => "exponential",
            Self::Fixed => "fixed",
        }
    }
}

/// Decision on whether to retry a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the request after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry the request.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior.
///
/// # Default Values
///
/// - `max_retries`: 3 (so at most 4 requests)
/// - `min_wait`: 5 seconds
/// - `max_wait`: 30 seconds
/// - `backoff`: exponential (doubling)
/// - `max_jitter`: 500 milliseconds
///
/// # Delay Calculation
///
/// ```text
/// exponential: delay = min(min_wait * 2^(attempt - 1), max_wait) + jitter
/// fixed:       delay = min_wait + jitter
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt.
    max_retries: u32,

    /// Wait before the first retry, and the fixed wait for [`BackoffStrategy::Fixed`].
    min_wait: Duration,

    /// Cap for exponential growth.
    max_wait: Duration,

    /// Backoff growth strategy.
    backoff: BackoffStrategy,

    /// Upper bound of the random jitter added to every wait.
    max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            min_wait: DEFAULT_RETRY_WAIT_MIN,
            max_wait: DEFAULT_RETRY_WAIT_MAX,
            backoff: BackoffStrategy::Exponential,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with custom settings and the default jitter.
    ///
    /// `max_wait` is raised to `min_wait` when smaller.
    #[must_use]
    pub fn new(
        max_retries: u32,
        min_wait: Duration,
        max_wait: Duration,
        backoff: BackoffStrategy,
    ) -> Self {
        Self {
            max_retries,
            min_wait,
            max_wait: max_wait.max(min_wait),
            backoff,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }

    /// Creates a policy with a custom retry count, using defaults for other settings.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Creates a policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::with_max_retries(0)
    }

    /// Replaces the jitter bound (use `Duration::ZERO` for deterministic waits).
    #[must_use]
    pub fn with_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Returns the number of retries allowed after the first attempt.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the total number of attempts, including the initial one.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Returns the minimum wait between attempts.
    #[must_use]
    pub fn min_wait(&self) -> Duration {
        self.min_wait
    }

    /// Returns the wait cap.
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Returns the backoff strategy.
    #[must_use]
    pub fn backoff(&self) -> BackoffStrategy {
        self.backoff
    }

    /// Determines whether to retry a failed request.
    ///
    /// `attempt` is the attempt number that just failed (1-indexed).
    #[instrument(level = "trace", skip(self), fields(max_retries = self.max_retries))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts() {
            debug!(attempt, max_retries = self.max_retries, "retries exhausted");
            return RetryDecision::DoNotRetry {
                reason: format!("max retries ({}) exhausted", self.max_retries),
            };
        }

        let delay = self.calculate_delay(attempt);

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Calculates the wait before the retry that follows `attempt`, including jitter.
    fn calculate_delay(&self, attempt: u32) -> Duration {
        self.base_delay(attempt) + self.calculate_jitter()
    }

    /// Wait without jitter.
    fn base_delay(&self, attempt: u32) -> Duration {
        match self.backoff {
            BackoffStrategy::Fixed => self.min_wait,
            BackoffStrategy::Exponential => {
                let exponent = attempt.saturating_sub(1);
                2u32.checked_pow(exponent)
                    .and_then(|factor| self.min_wait.checked_mul(factor))
                    .map_or(self.max_wait, |delay| delay.min(self.max_wait))
            }
        }
    }

    /// Generates random jitter between 0 and the configured bound.
    #[allow(clippy::cast_possible_truncation)]
    fn calculate_jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=max_ms);
        Duration::from_millis(jitter_ms)
    }
}

/// Classifies a transport error into a failure type for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | HTTP 408, 5xx | Transient |
/// | HTTP 429 | RateLimited |
/// | other HTTP 4xx | Permanent |
/// | Timeout | Transient |
/// | Network (non-TLS) | Transient |
/// | Network (TLS) | Permanent |
/// | InvalidUrl, Cancelled | Permanent |
#[instrument(level = "trace")]
pub fn classify_error(error: &TransportError) -> FailureType {
    match error {
        TransportError::HttpStatus { status, .. } => classify_http_status(*status),
        TransportError::Timeout { .. } => FailureType::Transient,
        TransportError::Network { source, .. } => {
            if is_tls_error(source) {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }
        TransportError::InvalidUrl { .. } | TransportError::Cancelled { .. } => {
            FailureType::Permanent
        }
    }
}

#[allow(clippy::match_same_arms)]
fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 => FailureType::Transient,   // Request Timeout
        429 => FailureType::RateLimited, // Too Many Requests
        status if (400..500).contains(&status) => FailureType::Permanent,
        status if (500..600).contains(&status) => FailureType::Transient,
        // 1xx/3xx surfacing as errors means redirects were exhausted
        _ => FailureType::Permanent,
    }
}

fn is_tls_error(error: &reqwest::Error) -> bool {
    let error_string = error.to_string().to_lowercase();
    error_string.contains("certificate")
        || error_string.contains("tls")
        || error_string.contains("ssl")
        || error_string.contains("handshake")
}

/// Returns the server-mandated wait carried by a 429/503 response, if any.
#[must_use]
pub fn retry_after_delay(error: &TransportError) -> Option<Duration> {
    match error {
        TransportError::HttpStatus {
            status: 429 | 503,
            retry_after: Some(value),
            ..
        } => parse_retry_after(value),
        _ => None,
    }
}

/// Parses a Retry-After header value into a Duration.
///
/// Supports two formats as per RFC 7231:
/// - Integer seconds: `Retry-After: 120`
/// - HTTP-date: `Retry-After: Wed, 21 Oct 2025 07:28:00 GMT`
///
/// Returns `None` if the value cannot be parsed or lies in the past. Caps
/// excessive values at 1 hour.
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        let Ok(seconds) = u64::try_from(seconds) else {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        };
        return Some(cap_retry_after(Duration::from_secs(seconds)));
    }

    let datetime = httpdate::parse_http_date(header_value).ok()?;
    match datetime.duration_since(std::time::SystemTime::now()) {
        Ok(duration) => Some(cap_retry_after(duration)),
        Err(_) => {
            debug!(header_value, "Retry-After date is in the past, ignoring");
            None
        }
    }
}

fn cap_retry_after(duration: Duration) -> Duration {
    if duration > MAX_RETRY_AFTER {
        warn!(
            delay_secs = duration.as_secs(),
            max_secs = MAX_RETRY_AFTER.as_secs(),
            "Retry-After exceeds maximum, capping at 1 hour"
        );
        return MAX_RETRY_AFTER;
    }
    duration
}
