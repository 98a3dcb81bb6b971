//! On-the-fly integrity checks for downloaded content.

use sha2::{Digest, Sha256};

use super::error::DownloadError;
use crate::listing::FileResult;

/// Accumulates the byte count and SHA-256 of a download as it streams.
#[derive(Debug, Default, Clone)]
pub struct Verifier {
    hasher: Sha256,
    bytes: u64,
}

impl Verifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next slice of downloaded bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.bytes += data.len() as u64;
    }

    /// Bytes seen so far.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Compares the streamed content with the listing's size and SHA-256.
    ///
    /// The hash comparison is case-insensitive. An empty expected hash skips
    /// the hash check.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Integrity`] naming the first failed check.
    pub fn finish(self, file: &FileResult) -> Result<(), DownloadError> {
        if self.bytes != file.size {
            return Err(DownloadError::Integrity {
                path: file.path.clone(),
                check: "size",
                expected: file.size.to_string(),
                actual: self.bytes.to_string(),
            });
        }

        let actual = format!("{:x}", self.hasher.finalize());
        if !file.sha256.is_empty() && !actual.eq_ignore_ascii_case(&file.sha256) {
            return Err(DownloadError::Integrity {
                path: file.path.clone(),
                check: "sha256",
                expected: file.sha256.clone(),
                actual,
            });
        }
        Ok(())
    }
}
