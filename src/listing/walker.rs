//! Depth-first traversal of a public share.
//!
//! The walk keeps an explicit stack of directory frames instead of recursing,
//! so tree depth costs heap, not call stack. A frame is popped only after its
//! directory has returned an empty page; a subdirectory frame sits on top of
//! its parent until fully resolved, which yields depth-first ordering.
//! Since the stack holds exactly the ancestors of the current directory, a
//! listing that points back at one of them is rejected instead of looping.

use std::time::Duration;

use tracing::{debug, info, instrument};
use url::Url;

use super::error::{DecodeError, WalkError};
use super::model::{Entry, FileResult};
use super::paginator::Paginator;
use crate::cancel::CancelSignal;
use crate::transport::HttpClient;

/// Snapshot passed to the progress callback after every file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WalkProgress {
    /// Files found so far.
    pub files: u64,
    /// Sum of their sizes in bytes.
    pub bytes: u64,
}

/// Progress callback, invoked synchronously before the next entry is handled.
pub type ProgressCallback<'a> = &'a mut (dyn FnMut(WalkProgress) + Send);

/// Optional bounds for pathological trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WalkLimits {
    /// Deepest directory level allowed below the start path.
    pub max_depth: Option<usize>,
    /// Most files a walk may return.
    pub max_files: Option<usize>,
}

/// Walks a share from a start path and flattens it into file results.
#[derive(Debug)]
pub struct TreeWalker<'a> {
    http: &'a HttpClient,
    endpoint: &'a Url,
    limit: u32,
    page_delay: Duration,
    limits: WalkLimits,
    cancel: &'a CancelSignal,
}

struct Frame {
    path: String,
    depth: usize,
    next_offset: u64,
    pending: std::vec::IntoIter<Entry>,
    previous_page: Option<Vec<String>>,
    pages_fetched: u64,
}

impl Frame {
    fn new(path: String, depth: usize) -> Self {
        Self {
            path,
            depth,
            next_offset: 0,
            pending: Vec::new().into_iter(),
            previous_page: None,
            pages_fetched: 0,
        }
    }
}

#[derive(Default)]
struct WalkState {
    files: Vec<FileResult>,
    progress: WalkProgress,
}

impl WalkState {
    fn record(
        &mut self,
        file: FileResult,
        limits: WalkLimits,
        callback: &mut Option<ProgressCallback<'_>>,
    ) -> Result<(), WalkError> {
        if let Some(max_files) = limits.max_files
            && self.files.len() >= max_files
        {
            return Err(WalkError::FileLimitExceeded { max_files });
        }

        self.progress.files += 1;
        self.progress.bytes = self.progress.bytes.saturating_add(file.size);
        self.files.push(file);

        if let Some(callback) = callback.as_deref_mut() {
            callback(self.progress);
        }
        Ok(())
    }
}

impl<'a> TreeWalker<'a> {
    /// Creates a walker.
    ///
    /// `limit` is the page size, `page_delay` the pause between successive
    /// pages of the same directory.
    #[must_use]
    pub fn new(
        http: &'a HttpClient,
        endpoint: &'a Url,
        limit: u32,
        page_delay: Duration,
        limits: WalkLimits,
        cancel: &'a CancelSignal,
    ) -> Self {
        Self {
            http,
            endpoint,
            limit,
            page_delay,
            limits,
            cancel,
        }
    }

    /// Lists every file below `start_path` of the share `link`.
    ///
    /// An empty `start_path` means the share root. Results are in depth-first
    /// order. The walk is all-or-nothing: any failure discards what was found.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError`] on the first transport or decode failure, on
    /// cancellation, or when a [`WalkLimits`] bound is exceeded.
    #[instrument(skip(self, link, progress), fields(limit = self.limit))]
    pub async fn walk(
        &self,
        link: &str,
        start_path: &str,
        mut progress: Option<ProgressCallback<'_>>,
    ) -> Result<Vec<FileResult>, WalkError> {
        let start_path = if start_path.is_empty() { "/" } else { start_path };
        let paginator = Paginator::new(self.http, self.endpoint, link, self.limit);
        let mut state = WalkState::default();
        let mut stack = vec![Frame::new(start_path.to_string(), 0)];

        while let Some(frame) = stack.last_mut() {
            if let Some(entry) = frame.pending.next() {
                match entry {
                    Entry::File(file) => state.record(file, self.limits, &mut progress)?,
                    Entry::Directory { path, .. } => {
                        let depth = frame.depth + 1;
                        let parent = frame.path.clone();
                        if let Some(ancestor) =
                            stack.iter().find(|f| same_directory(&f.path, &path))
                        {
                            return Err(DecodeError::CyclicListing {
                                path: parent,
                                ancestor: ancestor.path.clone(),
                            }
                            .into());
                        }
                        if let Some(max_depth) = self.limits.max_depth
                            && depth > max_depth
                        {
                            return Err(WalkError::DepthLimitExceeded { path, max_depth });
                        }
                        stack.push(Frame::new(path, depth));
                    }
                }
                continue;
            }

            if frame.pages_fetched > 0
                && !self.page_delay.is_zero()
                && !self.cancel.sleep(self.page_delay).await
            {
                return Err(WalkError::Cancelled);
            }

            let expect_directory = frame.depth == 0 && frame.pages_fetched == 0;
            let page = paginator
                .fetch_page(&frame.path, frame.next_offset, expect_directory, self.cancel)
                .await?;

            if page.is_empty() {
                debug!(path = %frame.path, pages = frame.pages_fetched, "directory listed");
                stack.pop();
                continue;
            }

            let fingerprint: Vec<String> =
                page.entries.iter().map(|e| e.path().to_string()).collect();
            if frame.previous_page.as_ref() == Some(&fingerprint) {
                return Err(DecodeError::StalledPagination {
                    path: frame.path.clone(),
                    offset: frame.next_offset,
                }
                .into());
            }

            frame.previous_page = Some(fingerprint);
            frame.next_offset += u64::from(self.limit);
            frame.pages_fetched += 1;
            frame.pending = page.entries.into_iter();
        }

        info!(
            files = state.progress.files,
            bytes = state.progress.bytes,
            "walk complete"
        );
        Ok(state.files)
    }
}

/// Compares directory paths ignoring a trailing slash.
fn same_directory(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}
