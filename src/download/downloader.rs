//! Chunked streaming of one remote file into an async sink.

use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument};

use super::error::DownloadError;
use super::verify::Verifier;
use crate::cancel::CancelSignal;
use crate::listing::FileResult;
use crate::transport::{HttpClient, TransportError};

/// Default intermediate buffer size (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Outcome of a successful download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadReport {
    /// Bytes written to the sink.
    pub bytes_written: u64,
    /// True when size and SHA-256 were checked against the listing.
    pub verified: bool,
}

/// Downloads files through the shared transport.
#[derive(Debug)]
pub struct Downloader<'a> {
    http: &'a HttpClient,
    chunk_size: usize,
    verify: bool,
    cancel: &'a CancelSignal,
}

impl<'a> Downloader<'a> {
    #[must_use]
    pub fn new(
        http: &'a HttpClient,
        chunk_size: usize,
        verify: bool,
        cancel: &'a CancelSignal,
    ) -> Self {
        Self {
            http,
            chunk_size,
            verify,
            cancel,
        }
    }

    /// Streams `file` into `sink`.
    ///
    /// The request is retried per the transport policy up to the response
    /// headers; a failure while streaming the body is not retried.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] on transport, sink, integrity failure or
    /// cancellation. Bytes already written stay in the sink.
    #[instrument(skip(self, file, sink), fields(path = %file.path, size = file.size))]
    pub async fn download_file<W>(
        &self,
        file: &FileResult,
        sink: &mut W,
    ) -> Result<DownloadReport, DownloadError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let response = self
            .http
            .get_stream(&file.file, self.cancel)
            .await
            .map_err(|e| DownloadError::transport(&file.path, e))?;

        let url = file.file.as_str();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::network(url, e)));

        let mut verifier = self.verify.then(Verifier::new);
        let bytes_written = copy_chunked(
            body,
            sink,
            self.chunk_size,
            verifier.as_mut(),
            self.cancel,
            &file.path,
        )
        .await?;

        if let Some(verifier) = verifier {
            verifier.finish(file)?;
        }

        debug!(bytes_written, verified = self.verify, "download complete");
        Ok(DownloadReport {
            bytes_written,
            verified: self.verify,
        })
    }
}

/// Copies `stream` into `sink` through a buffer of `chunk_size` bytes.
///
/// The sink never receives a write larger than `chunk_size`; the buffer is
/// the only allocation that grows with the copy. The sink is flushed at the end.
///
/// # Errors
///
/// Stream errors become [`DownloadError::Transport`], sink errors
/// [`DownloadError::Sink`]; `path` labels both.
pub async fn copy_chunked<S, B, W>(
    stream: S,
    sink: &mut W,
    chunk_size: usize,
    mut verifier: Option<&mut Verifier>,
    cancel: &CancelSignal,
    path: &str,
) -> Result<u64, DownloadError>
where
    S: Stream<Item = Result<B, TransportError>>,
    B: AsRef<[u8]>,
    W: AsyncWrite + Unpin + ?Sized,
{
    let chunk_size = chunk_size.max(1);
    let mut stream = std::pin::pin!(stream);
    let mut buffer: Vec<u8> = Vec::with_capacity(chunk_size);
    let mut total: u64 = 0;

    loop {
        let Some(next) = cancel.run(stream.next()).await else {
            return Err(DownloadError::Cancelled {
                path: path.to_string(),
            });
        };
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(|e| DownloadError::transport(path, e))?;
        let mut rest = chunk.as_ref();

        if let Some(verifier) = verifier.as_deref_mut() {
            verifier.update(rest);
        }

        while !rest.is_empty() {
            let take = (chunk_size - buffer.len()).min(rest.len());
            buffer.extend_from_slice(&rest[..take]);
            rest = &rest[take..];

            if buffer.len() == chunk_size {
                write_buffer(sink, &buffer, path).await?;
                total += buffer.len() as u64;
                buffer.clear();
            }
        }
    }

    if !buffer.is_empty() {
        write_buffer(sink, &buffer, path).await?;
        total += buffer.len() as u64;
    }

    sink.flush().await.map_err(|e| DownloadError::sink(path, e))?;

    Ok(total)
}

async fn write_buffer<W>(sink: &mut W, buffer: &[u8], path: &str) -> Result<(), DownloadError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    sink.write_all(buffer).await.map_err(|e| DownloadError::sink(path, e))
}
