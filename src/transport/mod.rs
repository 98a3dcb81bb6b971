//! Retrying HTTP transport shared by the listing and download paths.
//!
//! Every request goes through one [`HttpClient`]: a single connection pool, a
//! fixed User-Agent and a bounded [`RetryPolicy`]. Failures are classified as
//! transient, rate limited or permanent; only the first two are retried.
//!
//! # Example
//!
//! ```
//! use yadloader_core::transport::{FailureType, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! match policy.should_retry(FailureType::Transient, 1) {
//!     RetryDecision::Retry { attempt, .. } => assert_eq!(attempt, 2),
//!     RetryDecision::DoNotRetry { reason } => panic!("unexpected: {reason}"),
//! }
//! ```

mod client;
pub mod constants;
mod error;
mod retry;

pub use client::HttpClient;
pub use error::TransportError;
pub use retry::{
    BackoffStrategy, DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy,
    classify_error, parse_retry_after, retry_after_delay,
};
