//! Streaming downloads of listed files.
//!
//! [`Downloader`] issues one GET per file through the shared transport and
//! copies the body into any [`tokio::io::AsyncWrite`] sink through a
//! fixed-size buffer, optionally verifying size and SHA-256 on the fly.

mod downloader;
mod error;
mod verify;

pub use downloader::{DEFAULT_CHUNK_SIZE, DownloadReport, Downloader, copy_chunked};
pub use error::DownloadError;
pub use verify::Verifier;
