//! Typed client settings and their validation.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::download::DEFAULT_CHUNK_SIZE;
use crate::listing::WalkLimits;
use crate::transport::RetryPolicy;
use crate::transport::constants::DEFAULT_TIMEOUT;

/// Public API host.
pub const DEFAULT_API_BASE: &str = "https://cloud-api.yandex.net";

/// Path of the public resources endpoint below the API base.
pub const RESOURCES_PATH: &str = "v1/disk/public/resources";

/// Default page size.
pub const DEFAULT_LIMIT: u32 = 100;

/// Largest page size accepted.
pub const MAX_LIMIT: u32 = 1000;

/// Default pause between successive pages of one directory.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(5);

/// Invalid client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting is out of range.
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    /// The API base is not an absolute http(s) URL.
    #[error("invalid API base URL: {url}")]
    InvalidApiBase { url: String },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Settings shared by every request of a [`PublicDiskClient`](crate::PublicDiskClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme and host of the API, e.g. `https://cloud-api.yandex.net`.
    pub api_base: String,
    /// Items requested per listing page.
    pub limit: u32,
    /// Connect/idle timeout, and total deadline of listing requests.
    pub timeout: Duration,
    /// Pause between successive pages of the same directory.
    pub page_delay: Duration,
    pub retry: RetryPolicy,
    /// Download buffer size; no sink write exceeds it.
    pub chunk_size: usize,
    pub limits: WalkLimits,
    /// Check size and SHA-256 of every download.
    pub verify_checksums: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            limit: DEFAULT_LIMIT,
            timeout: DEFAULT_TIMEOUT,
            page_delay: DEFAULT_PAGE_DELAY,
            retry: RetryPolicy::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            limits: WalkLimits::default(),
            verify_checksums: false,
        }
    }
}

impl ClientConfig {
    /// Checks every setting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(ConfigError::InvalidValue {
                field: "limit",
                reason: format!("{} is outside 1..={MAX_LIMIT}", self.limit),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "chunk_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.retry.min_wait() > self.retry.max_wait() {
            return Err(ConfigError::InvalidValue {
                field: "retry",
                reason: "minimum wait exceeds maximum wait".to_string(),
            });
        }
        self.listing_endpoint().map(|_| ())
    }

    /// Full URL of the public resources endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiBase`] when `api_base` is not an
    /// absolute http(s) URL.
    pub fn listing_endpoint(&self) -> Result<Url, ConfigError> {
        let invalid = || ConfigError::InvalidApiBase {
            url: self.api_base.clone(),
        };
        let base = Url::parse(&self.api_base).map_err(|_| invalid())?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(invalid());
        }
        let joined = format!("{}/{RESOURCES_PATH}", self.api_base.trim_end_matches('/'));
        Url::parse(&joined).map_err(|_| invalid())
    }
}
