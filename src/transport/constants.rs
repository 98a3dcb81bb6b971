//! Constants for the transport module (timeouts, retry waits).

use std::time::Duration;

/// Default per-request timeout (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default minimum wait between retry attempts (5 seconds, same as the inter-page delay).
pub const DEFAULT_RETRY_WAIT_MIN: Duration = Duration::from_secs(5);

/// Default cap for exponential retry waits (30 seconds).
pub const DEFAULT_RETRY_WAIT_MAX: Duration = Duration::from_secs(30);

/// Default upper bound for random jitter added to retry waits.
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(500);

/// Maximum Retry-After header value (1 hour) to prevent excessive delays.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);
