//! yadloader core library
//!
//! Reconstructs the file tree of a Yandex.Disk public share from its
//! page-limited listing API and streams the files it finds to local sinks.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`transport`] - HTTP GET with bounded automatic retry
//! - [`listing`] - Paginated listing and the depth-first tree walk
//! - [`download`] - Chunked streaming of one file into an async sink
//! - [`client`] - [`PublicDiskClient`], the entry point tying the above together
//! - [`mirror`] - Local folder-tree mirroring with a per-file failure policy
//! - [`config`] - Validated client settings
//! - [`cancel`] - Cooperative cancellation shared by every request

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cancel;
pub mod client;
pub mod config;
pub mod download;
pub mod listing;
pub mod mirror;
#[cfg(test)]
pub(crate) mod test_support;
pub mod transport;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use cancel::CancelSignal;
pub use client::PublicDiskClient;
pub use config::{ClientConfig, ConfigError};
pub use download::{DEFAULT_CHUNK_SIZE, DownloadError, DownloadReport};
pub use listing::{
    DecodeError, Entry, FileResult, Page, ProgressCallback, WalkError, WalkLimits, WalkProgress,
};
pub use mirror::{FailurePolicy, Mirror, MirrorError, MirrorEvent, MirrorStats, destination_for};
pub use transport::{
    BackoffStrategy, DEFAULT_MAX_RETRIES, FailureType, HttpClient, RetryDecision, RetryPolicy,
    TransportError, classify_error,
};
