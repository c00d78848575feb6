//! In-memory object store.

use super::{
    BoxFuture, ObjectEntry, ObjectStore, StorageError, StorageResult, normalize_path,
    normalize_prefix, sign, unix_now, verify,
};
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::Duration;
use url::Url;

const SCHEME: &str = "memory";

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// In-memory store for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    /// Every successful write, in completion order.
    writes: RwLock<Vec<String>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths written so far, oldest first.
    pub fn write_log(&self) -> Vec<String> {
        self.writes.read().map(|w| w.clone()).unwrap_or_default()
    }

    /// Content type recorded for a path.
    pub fn content_type(&self, path: &str) -> Option<String> {
        let objects = self.objects.read().ok()?;
        objects.get(path).map(|o| o.content_type.clone())
    }

    fn lock_error(e: impl std::fmt::Display) -> StorageError {
        StorageError::Other(format!("Lock error: {}", e))
    }
}

impl ObjectStore for MemoryStore {
    fn get(&self, path: &str) -> BoxFuture<'_, StorageResult<Vec<u8>>> {
        let path = normalize_path(path);
        Box::pin(async move {
            let path = path?;
            let objects = self.objects.read().map_err(Self::lock_error)?;
            objects
                .get(&path)
                .map(|o| o.bytes.clone())
                .ok_or(StorageError::NotFound(path))
        })
    }

    fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> BoxFuture<'_, StorageResult<()>> {
        let path = normalize_path(path);
        let content_type = content_type.to_string();
        Box::pin(async move {
            let path = path?;
            {
                let mut objects = self.objects.write().map_err(Self::lock_error)?;
                objects.insert(path.clone(), StoredObject { bytes, content_type });
            }
            let mut writes = self.writes.write().map_err(Self::lock_error)?;
            writes.push(path);
            Ok(())
        })
    }

    fn list(&self, prefix: &str) -> BoxFuture<'_, StorageResult<Vec<ObjectEntry>>> {
        let prefix = normalize_prefix(prefix);
        Box::pin(async move {
            let prefix = prefix?;
            let objects = self.objects.read().map_err(Self::lock_error)?;
            Ok(objects
                .range(prefix.clone()..)
                .take_while(|(path, _)| path.starts_with(&prefix))
                .filter_map(|(path, object)| {
                    let name = &path[prefix.len()..];
                    (!name.contains('/')).then(|| ObjectEntry {
                        path: path.clone(),
                        name: name.to_string(),
                        size: object.bytes.len() as u64,
                    })
                })
                .collect())
        })
    }

    fn signed_url(&self, path: &str, ttl: Duration) -> BoxFuture<'_, StorageResult<String>> {
        let path = normalize_path(path);
        Box::pin(async move {
            let path = path?;
            let exists = self
                .objects
                .read()
                .map_err(Self::lock_error)?
                .contains_key(&path);
            if !exists {
                return Err(StorageError::NotFound(path));
            }
            let url = Url::parse(&format!("{SCHEME}:///{path}"))
                .map_err(|e| StorageError::InvalidUrl(format!("{path}: {e}")))?;
            Ok(sign(url, ttl))
        })
    }

    fn fetch(&self, url: &str) -> BoxFuture<'_, StorageResult<Vec<u8>>> {
        let parsed = verify(url, SCHEME, unix_now());
        Box::pin(async move {
            let parsed = parsed?;
            self.get(parsed.path()).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;

    #[test]
    fn test_put_and_get() {
        let store = MemoryStore::new();
        block_on(store.put("u/p/style.json", b"{}".to_vec(), "application/json")).unwrap();
        assert_eq!(block_on(store.get("u/p/style.json")).unwrap(), b"{}");
        assert_eq!(store.content_type("u/p/style.json").as_deref(), Some("application/json"));
    }

    #[test]
    fn test_put_is_upsert() {
        let store = MemoryStore::new();
        block_on(store.put("a.txt", b"one".to_vec(), "text/plain")).unwrap();
        block_on(store.put("a.txt", b"two".to_vec(), "text/plain")).unwrap();
        assert_eq!(block_on(store.get("a.txt")).unwrap(), b"two");
        assert_eq!(store.write_log(), ["a.txt", "a.txt"]);
    }

    #[test]
    fn test_not_found() {
        let store = MemoryStore::new();
        let result = block_on(store.get("missing"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_list_direct_children_sorted() {
        let store = MemoryStore::new();
        let paths = [
            "u/p/images/b.png",
            "u/p/images/a.png",
            "u/p/images/nested/c.png",
            "u/p/style.json",
        ];
        for path in paths {
            block_on(store.put(path, vec![1], "image/png")).unwrap();
        }
        let names: Vec<_> = block_on(store.list("u/p/images"))
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["a.png", "b.png"]);
    }

    #[test]
    fn test_signed_url_round_trip() {
        let store = MemoryStore::new();
        block_on(store.put("u/p/images/hero.png", vec![7, 8], "image/png")).unwrap();
        let url =
            block_on(store.signed_url("u/p/images/hero.png", Duration::from_secs(3600))).unwrap();
        assert!(url.starts_with("memory:///u/p/images/hero.png?expires="));
        assert_eq!(block_on(store.fetch(&url)).unwrap(), vec![7, 8]);
    }

    #[test]
    fn test_fetch_rejects_expired_and_foreign() {
        let store = MemoryStore::new();
        block_on(store.put("a.png", vec![1], "image/png")).unwrap();
        assert!(matches!(
            block_on(store.fetch("memory:///a.png?expires=1")),
            Err(StorageError::Expired(_))
        ));
        assert!(matches!(
            block_on(store.fetch("https://example.com/a.png")),
            Err(StorageError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_signed_url_requires_object() {
        let store = MemoryStore::new();
        let result = block_on(store.signed_url("nope.png", Duration::from_secs(60)));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
