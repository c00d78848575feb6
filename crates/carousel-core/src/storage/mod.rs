//! Object store abstraction for project documents and binary assets.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use url::Url;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Signed URL expired: {0}")]
    Expired(String),
    #[error("Invalid URL or path: {0}")]
    InvalidUrl(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Full path inside the store.
    pub path: String,
    /// Name relative to the listed prefix.
    pub name: String,
    pub size: u64,
}

/// Trait for object store backends.
///
/// Paths are `/`-separated and relative; `list` returns the direct children
/// of a prefix sorted by name.
pub trait ObjectStore: Send + Sync {
    /// Read an object.
    fn get(&self, path: &str) -> BoxFuture<'_, StorageResult<Vec<u8>>>;

    /// Create or replace an object.
    fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str)
    -> BoxFuture<'_, StorageResult<()>>;

    /// List the objects directly under a prefix.
    fn list(&self, prefix: &str) -> BoxFuture<'_, StorageResult<Vec<ObjectEntry>>>;

    /// Issue a URL for an object that stops working after `ttl`.
    fn signed_url(&self, path: &str, ttl: Duration) -> BoxFuture<'_, StorageResult<String>>;

    /// Download through a URL previously issued by [`ObjectStore::signed_url`].
    fn fetch(&self, url: &str) -> BoxFuture<'_, StorageResult<Vec<u8>>>;
}

/// Validate and normalize an object path.
pub fn normalize_path(path: &str) -> StorageResult<String> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.contains('\\') {
        return Err(StorageError::InvalidUrl(path.to_string()));
    }
    let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
    if segments.iter().any(|s| *s == ".." || *s == ".") {
        return Err(StorageError::InvalidUrl(path.to_string()));
    }
    Ok(segments.join("/"))
}

/// Normalize a listing prefix so it ends with `/` (or is empty).
pub(crate) fn normalize_prefix(prefix: &str) -> StorageResult<String> {
    if prefix.trim_matches('/').is_empty() {
        return Ok(String::new());
    }
    Ok(format!("{}/", normalize_path(prefix)?))
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Add an `expires` parameter to a store URL.
pub(crate) fn sign(mut url: Url, ttl: Duration) -> String {
    let expires = unix_now().saturating_add(ttl.as_secs());
    url.query_pairs_mut()
        .clear()
        .append_pair("expires", &expires.to_string());
    url.to_string()
}

/// Parse a signed URL, checking its scheme and expiry.
pub(crate) fn verify(url: &str, scheme: &str, now: u64) -> StorageResult<Url> {
    let parsed = Url::parse(url).map_err(|e| StorageError::InvalidUrl(format!("{url}: {e}")))?;
    if parsed.scheme() != scheme {
        return Err(StorageError::InvalidUrl(format!(
            "{url}: unsupported scheme {}",
            parsed.scheme()
        )));
    }
    let expires = parsed
        .query_pairs()
        .find(|(k, _)| k == "expires")
        .and_then(|(_, v)| v.parse::<u64>().ok())
        .ok_or_else(|| StorageError::InvalidUrl(format!("{url}: missing expiry")))?;
    if now > expires {
        return Err(StorageError::Expired(url.to_string()));
    }
    Ok(parsed)
}

/// Content type for a stored file name.
pub fn content_type_for(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".json") {
        "application/json"
    } else if lower.ends_with(".zip") {
        "application/zip"
    } else {
        "application/octet-stream"
    }
}
