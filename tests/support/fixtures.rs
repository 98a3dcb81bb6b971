//! Listing payloads, mock mounting and sinks shared by integration tests.

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWrite;
use wiremock::matchers::{method, path as request_path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yadloader_core::{BackoffStrategy, ClientConfig, FileResult, RetryPolicy};

pub const LINK: &str = "https://yadi.sk/d/test-share";
pub const RESOURCES_PATH: &str = "/v1/disk/public/resources";

/// Client settings pointed at `server` with no page delay and fast retries.
pub fn test_config(server: &MockServer, limit: u32) -> ClientConfig {
    ClientConfig {
        api_base: server.uri(),
        limit,
        timeout: Duration::from_secs(5),
        page_delay: Duration::ZERO,
        retry: RetryPolicy::new(
            2,
            Duration::from_millis(10),
            Duration::from_millis(20),
            BackoffStrategy::Fixed,
        )
        .with_jitter(Duration::ZERO),
        ..ClientConfig::default()
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// A listed file item whose download URL points at `server`.
pub fn file_item(server: &MockServer, remote_path: &str, content: &[u8]) -> Value {
    let name = remote_path.rsplit('/').next().unwrap_or_default();
    json!({
        "path": remote_path,
        "type": "file",
        "name": name,
        "created": "2021-03-01T10:00:00+00:00",
        "modified": "2021-03-02T10:00:00+00:00",
        "size": content.len(),
        "md5": "d41d8cd98f00b204e9800998ecf8427e",
        "sha256": sha256_hex(content),
        "media_type": "document",
        "file": download_url(server, remote_path),
        "public_key": LINK,
        "resource_id": format!("id:{remote_path}")
    })
}

pub fn dir_item(remote_path: &str) -> Value {
    let name = remote_path.rsplit('/').next().unwrap_or_default();
    json!({
        "path": remote_path,
        "type": "dir",
        "name": name,
        "created": "2021-03-01T10:00:00+00:00",
        "modified": "2021-03-01T10:00:00+00:00",
        "public_key": LINK
    })
}

/// A directory resource carrying one page of `items`.
pub fn listing(dir: &str, offset: u64, limit: u32, items: Vec<Value>) -> Value {
    json!({
        "path": dir,
        "type": "dir",
        "name": dir.rsplit('/').next().unwrap_or_default(),
        "public_key": LINK,
        "_embedded": {
            "path": dir,
            "limit": limit,
            "offset": offset,
            "sort": "",
            "total": 9999,
            "items": items
        }
    })
}

pub fn download_url(server: &MockServer, remote_path: &str) -> String {
    format!("{}/download{remote_path}", server.uri())
}

/// Serves `body` as the listing of `dir` at `offset`, expecting exactly one request.
pub async fn mount_page(server: &MockServer, dir: &str, offset: u64, limit: u32, body: Value) {
    Mock::given(method("GET"))
        .and(request_path(RESOURCES_PATH))
        .and(query_param("path", dir))
        .and(query_param("offset", offset.to_string()))
        .and(query_param("limit", limit.to_string()))
        .and(query_param("public_key", LINK))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

/// Serves `content` at the download URL of `remote_path`.
pub async fn mount_download(server: &MockServer, remote_path: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(request_path(format!("/download{remote_path}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}

pub fn file_result(server: &MockServer, remote_path: &str, content: &[u8]) -> FileResult {
    FileResult {
        name: remote_path.rsplit('/').next().unwrap_or_default().to_string(),
        path: remote_path.to_string(),
        size: content.len() as u64,
        file: download_url(server, remote_path),
        md5: String::new(),
        sha256: sha256_hex(content),
        created: String::new(),
        modified: String::new(),
        media_type: None,
    }
}

/// Deterministic test content of `len` bytes.
pub fn content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 256) as u8).collect()
}

/// Sink recording the bytes and the largest single write it received.
#[derive(Default)]
pub struct RecordingSink {
    pub data: Vec<u8>,
    pub largest_write: usize,
}

impl AsyncWrite for RecordingSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.largest_write = this.largest_write.max(buf.len());
        this.data.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
