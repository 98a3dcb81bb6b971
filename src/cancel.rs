//! Cooperative cancellation shared by the walker, transport and downloader.
//!
//! A [`CancelSignal`] is cheap to clone; every clone observes the same flag.
//! Requests and sleeps race against [`CancelSignal::cancelled`] so an
//! interrupt aborts in-flight work instead of waiting for the next check.

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
}

impl CancelSignal {
    /// Creates a signal in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once [`cancel`](Self::cancel) has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when cancellation is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Runs `future` unless cancellation wins the race first.
    ///
    /// Returns `None` when cancelled.
    pub async fn run<F: Future>(&self, future: F) -> Option<F::Output> {
        if self.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            () = self.token.cancelled() => None,
            output = future => Some(output),
        }
    }

    /// Sleeps for `duration`; returns `false` when cancelled before it elapsed.
    pub async fn sleep(&self, duration: std::time::Duration) -> bool {
        self.run(tokio::time::sleep(duration)).await.is_some()
    }
}
