//! Wire model of the public resources API and the flattened file results.

use serde::{Deserialize, Serialize};

use super::error::DecodeError;

/// Kind of a listed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    File,
    Dir,
    /// Any kind this client does not understand; skipped by the walker.
    #[serde(other)]
    Unknown,
}

/// One resource object exactly as returned by the API.
///
/// Only `path` and `type` are required; everything else defaults so that a
/// sparse directory object still decodes. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    pub path: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub modified: String,
    pub size: Option<u64>,
    pub md5: Option<String>,
    pub sha256: Option<String>,
    pub media_type: Option<String>,
    /// Direct download URL (files only).
    pub file: Option<String>,
    pub public_key: Option<String>,
    pub resource_id: Option<String>,
    #[serde(rename = "_embedded")]
    pub embedded: Option<Embedded>,
}

/// The `_embedded` listing block of a directory resource.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Embedded {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub sort: String,
    /// Informational only; never used to decide when a listing ends.
    pub total: Option<u64>,
    pub items: Option<Vec<Resource>>,
}

/// A file found in the share, with everything needed to download it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResult {
    pub name: String,
    /// Full remote path, e.g. `/photos/2021/a.jpg`.
    pub path: String,
    pub size: u64,
    /// Direct download URL.
    pub file: String,
    pub md5: String,
    pub sha256: String,
    pub created: String,
    pub modified: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// A child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    File(FileResult),
    /// A subdirectory; its children are fetched when it is visited.
    Directory { name: String, path: String },
}

impl Entry {
    /// Remote path of the entry.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Entry::File(file) => &file.path,
            Entry::Directory { path, .. } => path,
        }
    }
}

/// One decoded listing page of a single directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Directory the page belongs to.
    pub path: String,
    pub limit: u64,
    pub offset: u64,
    pub total: Option<u64>,
    pub entries: Vec<Entry>,
}

impl Page {
    /// An empty page is the only end-of-listing signal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Converts one listed item into an [`Entry`].
///
/// Returns `Ok(None)` for resource kinds the walker does not handle.
///
/// # Errors
///
/// Returns [`DecodeError::MissingField`] when a file item lacks `size`,
/// `file`, `md5` or `sha256`.
pub(crate) fn entry_from_resource(resource: Resource) -> Result<Option<Entry>, DecodeError> {
    match resource.resource_type {
        ResourceType::Dir => Ok(Some(Entry::Directory {
            name: resource.name,
            path: resource.path,
        })),
        ResourceType::File => {
            let path = resource.path;
            let missing = |field: &'static str| DecodeError::MissingField {
                path: path.clone(),
                field,
            };
            let size = resource.size.ok_or_else(|| missing("size"))?;
            let file = resource.file.ok_or_else(|| missing("file"))?;
            let md5 = resource.md5.ok_or_else(|| missing("md5"))?;
            let sha256 = resource.sha256.ok_or_else(|| missing("sha256"))?;
            Ok(Some(Entry::File(FileResult {
                name: resource.name,
                path,
                size,
                file,
                md5,
                sha256,
                created: resource.created,
                modified: resource.modified,
                media_type: resource.media_type,
            })))
        }
        ResourceType::Unknown => Ok(None),
    }
}
