//! Error types for listing and tree traversal.

use thiserror::Error;

use crate::transport::TransportError;

/// A listing response that cannot be turned into a page.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Body is not valid JSON or does not have the resource shape.
    #[error("malformed listing response for {path}: {source}")]
    Json {
        /// Directory whose listing failed to decode.
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The start path names a file, not a directory.
    #[error("{path} is not a directory")]
    NotADirectory { path: String },

    /// A file item lacks a field required to download it.
    #[error("file {path} is missing required field `{field}`")]
    MissingField { path: String, field: &'static str },

    /// The server returned the same page twice for successive offsets.
    #[error("pagination of {path} stalled at offset {offset}: page repeats the previous one")]
    StalledPagination { path: String, offset: u64 },

    /// A directory lists itself or one of its ancestors as a child.
    #[error("directory {path} lists its ancestor {ancestor}")]
    CyclicListing { path: String, ancestor: String },
}

/// Errors that abort a tree walk.
#[derive(Debug, Error)]
pub enum WalkError {
    /// A listing request failed after retries.
    #[error(transparent)]
    Transport(TransportError),

    /// A listing response could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Cancellation was requested.
    #[error("walk cancelled")]
    Cancelled,

    /// A directory deeper than the configured maximum was found.
    #[error("{path} exceeds the maximum depth of {max_depth}")]
    DepthLimitExceeded { path: String, max_depth: usize },

    /// More files than the configured maximum were found.
    #[error("share contains more than {max_files} files")]
    FileLimitExceeded { max_files: usize },
}

impl From<TransportError> for WalkError {
    fn from(error: TransportError) -> Self {
        if error.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Transport(error)
        }
    }
}

impl WalkError {
    /// Returns true when the walk stopped because of cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
