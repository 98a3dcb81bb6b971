//! Mirrors listed files into a local folder tree.
//!
//! Each file lands at `<output root>/<remote folder>/<name>`. Remote paths
//! come from the server and are treated as untrusted: parent-directory
//! components are rejected so nothing is written outside the output root.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::client::PublicDiskClient;
use crate::download::{DownloadError, DownloadReport};
use crate::listing::FileResult;

/// What to do when one file fails to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure, remove the partial file and go on with the next file.
    #[default]
    Continue,
    /// Remove the partial file and stop the mirror.
    Abort,
}

/// Errors that stop a mirror run.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// The remote path cannot be mapped below the output root.
    #[error("refusing remote path {path}: {reason}")]
    InvalidRemotePath { path: String, reason: &'static str },

    /// A local directory or file could not be created.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A download failed under [`FailurePolicy::Abort`].
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Cancellation was requested.
    #[error("mirror cancelled")]
    Cancelled,
}

impl MirrorError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Counters of a finished mirror run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MirrorStats {
    pub completed: usize,
    pub failed: usize,
    /// Bytes written by completed downloads.
    pub bytes: u64,
}

impl MirrorStats {
    /// Files attempted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed + self.failed
    }
}

/// Per-file notifications emitted by [`Mirror::run`].
#[derive(Debug)]
pub enum MirrorEvent<'a> {
    Started {
        file: &'a FileResult,
        destination: &'a Path,
    },
    Completed {
        file: &'a FileResult,
        report: DownloadReport,
    },
    Failed {
        file: &'a FileResult,
        error: &'a dyn std::error::Error,
    },
}

/// Maps `file` to its local destination below `output_root`.
///
/// The folder part is the remote path with the file name segment removed; when
/// the last segment differs from the name, it is the parent of the last
/// segment. A `disk:` prefix, leading slashes, empty and `.` components are
/// dropped.
///
/// # Errors
///
/// Returns [`MirrorError::InvalidRemotePath`] for `..` components, names
/// containing separators, or an empty name.
pub fn destination_for(output_root: &Path, file: &FileResult) -> Result<PathBuf, MirrorError> {
    let invalid = |reason| MirrorError::InvalidRemotePath {
        path: file.path.clone(),
        reason,
    };

    let name = file.name.as_str();
    if name.is_empty() || name == "." || name == ".." {
        return Err(invalid("empty or reserved file name"));
    }
    if name.contains(['/', '\\']) {
        return Err(invalid("file name contains a path separator"));
    }

    let remote = file.path.strip_prefix("disk:").unwrap_or(&file.path);
    let folder = remote
        .strip_suffix(name)
        .filter(|parent| parent.is_empty() || parent.ends_with('/'))
        .or_else(|| remote.rsplit_once('/').map(|(parent, _)| parent))
        .unwrap_or("");

    let mut destination = output_root.to_path_buf();
    for component in folder.split('/') {
        match component {
            "" | "." => {}
            ".." => return Err(invalid("parent directory component")),
            c if c.contains('\\') => return Err(invalid("folder contains a backslash")),
            c => destination.push(c),
        }
    }
    destination.push(name);
    Ok(destination)
}

/// Downloads listed files into a local tree.
#[derive(Debug, Clone)]
pub struct Mirror {
    output_root: PathBuf,
    policy: FailurePolicy,
}

impl Mirror {
    #[must_use]
    pub fn new(output_root: impl Into<PathBuf>, policy: FailurePolicy) -> Self {
        Self {
            output_root: output_root.into(),
            policy,
        }
    }

    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    #[must_use]
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Downloads `files` in order, creating folders as needed.
    ///
    /// A failed download's partial file is removed. Under
    /// [`FailurePolicy::Continue`] the failure is counted and the run goes
    /// on; under [`FailurePolicy::Abort`] it ends the run.
    ///
    /// # Errors
    ///
    /// Directory or file creation failures and cancellation always stop the
    /// run; download failures and invalid remote paths stop it under
    /// [`FailurePolicy::Abort`].
    #[instrument(skip_all, fields(root = %self.output_root.display(), files = files.len()))]
    pub async fn run(
        &self,
        client: &PublicDiskClient,
        files: &[FileResult],
        mut on_event: impl FnMut(MirrorEvent<'_>),
    ) -> Result<MirrorStats, MirrorError> {
        let cancel = client.cancel_signal();
        let mut stats = MirrorStats::default();

        tokio::fs::create_dir_all(&self.output_root)
            .await
            .map_err(|e| MirrorError::io(&self.output_root, e))?;

        for file in files {
            if cancel.is_cancelled() {
                return Err(MirrorError::Cancelled);
            }

            let destination = match destination_for(&self.output_root, file) {
                Ok(destination) => destination,
                Err(error) => {
                    on_event(MirrorEvent::Failed {
                        file,
                        error: &error,
                    });
                    if self.policy == FailurePolicy::Abort {
                        return Err(error);
                    }
                    warn!(path = %file.path, error = %error, "skipping file");
                    stats.failed += 1;
                    continue;
                }
            };

            if let Some(parent) = destination.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| MirrorError::io(parent, e))?;
            }

            on_event(MirrorEvent::Started {
                file,
                destination: &destination,
            });

            let mut sink = tokio::fs::File::create(&destination)
                .await
                .map_err(|e| MirrorError::io(&destination, e))?;
            let result = client.download_file(file, &mut sink).await;
            drop(sink);

            match result {
                Ok(report) => {
                    debug!(
                        path = %file.path,
                        bytes = report.bytes_written,
                        verified = report.verified,
                        "file mirrored"
                    );
                    stats.completed += 1;
                    stats.bytes += report.bytes_written;
                    on_event(MirrorEvent::Completed { file, report });
                }
                Err(error) => {
                    remove_partial(&destination).await;
                    if error.is_cancelled() {
                        return Err(MirrorError::Cancelled);
                    }
                    on_event(MirrorEvent::Failed {
                        file,
                        error: &error,
                    });
                    if self.policy == FailurePolicy::Abort {
                        return Err(MirrorError::Download(error));
                    }
                    warn!(path = %file.path, error = %error, "download failed, continuing");
                    stats.failed += 1;
                }
            }
        }

        info!(
            completed = stats.completed,
            failed = stats.failed,
            bytes = stats.bytes,
            "mirror finished"
        );
        Ok(stats)
    }
}

async fn remove_partial(path: &Path) {
    if let Err(error) = tokio::fs::remove_file(path).await
        && error.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %error, "could not remove partial file");
    }
}
