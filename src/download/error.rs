//! Error types for the download module.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors that can occur while downloading one file.
///
/// A download error is scoped to a single file; the caller decides whether
/// the remaining files are still attempted.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The request failed after retries, or the body stream broke mid-transfer.
    #[error(transparent)]
    Transport(TransportError),

    /// The sink rejected a write or flush.
    #[error("failed writing {path}: {source}")]
    Sink {
        /// Remote path of the file being written.
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Downloaded content does not match the listing metadata.
    #[error("integrity check failed for {path}: expected {check} {expected}, got {actual}")]
    Integrity {
        /// Remote path of the file.
        path: String,
        /// Which check failed (`size` or `sha256`).
        check: &'static str,
        expected: String,
        actual: String,
    },

    /// Cancellation was requested.
    #[error("download of {path} cancelled")]
    Cancelled {
        /// Remote path of the file.
        path: String,
    },
}

impl DownloadError {
    /// Creates a sink error for `path`.
    pub fn sink(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Sink {
            path: path.into(),
            source,
        }
    }

    /// Wraps a transport error, mapping transport cancellation to [`DownloadError::Cancelled`].
    pub fn transport(path: impl Into<String>, error: TransportError) -> Self {
        if error.is_cancelled() {
            Self::Cancelled { path: path.into() }
        } else {
            Self::Transport(error)
        }
    }

    /// Returns true when the download stopped because of cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
