//! High-level client for one public share API.

use tokio::io::AsyncWrite;
use tracing::instrument;
use url::Url;

use crate::cancel::CancelSignal;
use crate::config::{ClientConfig, ConfigError};
use crate::download::{DownloadError, DownloadReport, Downloader};
use crate::listing::{FileResult, ProgressCallback, TreeWalker, WalkError};
use crate::transport::HttpClient;

/// Lists and downloads the contents of public shares.
///
/// Construct once and reuse: the connection pool and retry policy are shared
/// by every call and by clones, as is the [`CancelSignal`].
///
/// # Example
///
/// ```no_run
/// use yadloader_core::{ClientConfig, PublicDiskClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = PublicDiskClient::new(ClientConfig::default())?;
/// let files = client.get_tree("https://yadi.sk/d/abc", "/", None).await?;
/// for file in &files {
///     println!("{} {}", file.path, file.file);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PublicDiskClient {
    http: HttpClient,
    endpoint: Url,
    config: ClientConfig,
    cancel: CancelSignal,
}

impl PublicDiskClient {
    /// Validates `config` and builds the shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid settings or when the HTTP client
    /// cannot be initialized.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let endpoint = config.listing_endpoint()?;
        let http =
            HttpClient::new(config.retry.clone(), config.timeout).map_err(ConfigError::HttpClient)?;
        Ok(Self {
            http,
            endpoint,
            config,
            cancel: CancelSignal::new(),
        })
    }

    /// Settings this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Signal that aborts in-flight walks and downloads of this client.
    #[must_use]
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Lists every file below `path` of the share `link`, depth-first.
    ///
    /// `progress` is called after each file with the running count and byte total.
    ///
    /// # Errors
    ///
    /// Any listing failure aborts the walk; see [`WalkError`].
    #[instrument(skip(self, progress))]
    pub async fn get_tree(
        &self,
        link: &str,
        path: &str,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<Vec<FileResult>, WalkError> {
        TreeWalker::new(
            &self.http,
            &self.endpoint,
            self.config.limit,
            self.config.page_delay,
            self.config.limits,
            &self.cancel,
        )
        .walk(link, path, progress)
        .await
    }

    /// Streams one listed file into `sink`.
    ///
    /// # Errors
    ///
    /// See [`DownloadError`]. Partial content is left in the sink.
    pub async fn download_file<W>(
        &self,
        file: &FileResult,
        sink: &mut W,
    ) -> Result<DownloadReport, DownloadError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        Downloader::new(
            &self.http,
            self.config.chunk_size,
            self.config.verify_checksums,
            &self.cancel,
        )
        .download_file(file, sink)
        .await
    }
}
