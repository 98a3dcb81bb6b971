//! Single-page listing requests against the public resources endpoint.

use tracing::{debug, instrument};
use url::Url;

use super::error::{DecodeError, WalkError};
use super::model::{Page, Resource, ResourceType, entry_from_resource};
use crate::cancel::CancelSignal;
use crate::transport::HttpClient;

/// Fetches and decodes listing pages of one public share.
#[derive(Debug)]
pub struct Paginator<'a> {
    http: &'a HttpClient,
    endpoint: &'a Url,
    link: &'a str,
    limit: u32,
}

impl<'a> Paginator<'a> {
    /// Creates a paginator for the share identified by `link`.
    ///
    /// `endpoint` is the full resources URL, e.g.
    /// `https://cloud-api.yandex.net/v1/disk/public/resources`.
    #[must_use]
    pub fn new(http: &'a HttpClient, endpoint: &'a Url, link: &'a str, limit: u32) -> Self {
        Self {
            http,
            endpoint,
            link,
            limit,
        }
    }

    /// Page size requested from the server.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Builds the listing URL for `path` at `offset`.
    #[must_use]
    pub fn page_url(&self, path: &str, offset: u64) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("path", path)
            .append_pair("limit", &self.limit.to_string())
            .append_pair("offset", &offset.to_string())
            .append_pair("public_key", self.link);
        url
    }

    /// Issues exactly one listing request and decodes the result.
    ///
    /// `expect_directory` is set for the start path only: a file there fails
    /// with [`DecodeError::NotADirectory`].
    ///
    /// # Errors
    ///
    /// Transport failures (after retries) and decode failures.
    #[instrument(level = "debug", skip(self, cancel))]
    pub async fn fetch_page(
        &self,
        path: &str,
        offset: u64,
        expect_directory: bool,
        cancel: &CancelSignal,
    ) -> Result<Page, WalkError> {
        let url = self.page_url(path, offset);
        let body = self.http.get_bytes(url.as_str(), cancel).await?;
        let page = decode_page(path, offset, self.limit, &body, expect_directory)?;
        debug!(entries = page.entries.len(), total = ?page.total, "listing page decoded");
        Ok(page)
    }
}

/// Decodes a listing response body into a [`Page`] of `path`.
///
/// A missing `_embedded` block or item list yields an empty page.
///
/// # Errors
///
/// Returns [`DecodeError`] for malformed bodies, a file start path, or file
/// items lacking download fields.
pub fn decode_page(
    path: &str,
    offset: u64,
    limit: u32,
    body: &[u8],
    expect_directory: bool,
) -> Result<Page, DecodeError> {
    let resource: Resource = serde_json::from_slice(body).map_err(|source| DecodeError::Json {
        path: path.to_string(),
        source,
    })?;

    if expect_directory && resource.resource_type == ResourceType::File {
        return Err(DecodeError::NotADirectory {
            path: path.to_string(),
        });
    }

    let embedded = resource.embedded.unwrap_or_default();
    let mut entries = Vec::new();
    for item in embedded.items.unwrap_or_default() {
        let item_path = item.path.clone();
        match entry_from_resource(item)? {
            Some(entry) => entries.push(entry),
            None => debug!(path = %item_path, "skipping resource of unknown type"),
        }
    }

    Ok(Page {
        path: path.to_string(),
        limit: if embedded.limit == 0 {
            u64::from(limit)
        } else {
            embedded.limit
        },
        offset,
        total: embedded.total,
        entries,
    })
}
