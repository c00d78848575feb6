//! Directory-backed object store.

use super::{
    BoxFuture, ObjectEntry, ObjectStore, StorageError, StorageResult, normalize_path,
    normalize_prefix, sign, unix_now, verify,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Stores each object as a file below a root directory.
///
/// Content types are not recorded; they are derived from file names when
/// needed.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: PathBuf) -> StorageResult<Self> {
        fs::create_dir_all(&root).map_err(|e| {
            StorageError::Io(format!("Failed to create storage directory: {}", e))
        })?;
        let root = root
            .canonicalize()
            .map_err(|e| StorageError::Io(format!("Failed to resolve {}: {}", root.display(), e)))?;
        Ok(Self { root })
    }

    /// Create a store in the default location.
    ///
    /// On Unix: `~/.local/share/carousel/objects/`
    /// On Windows: `%LOCALAPPDATA%\carousel\objects\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("carousel").join("objects"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, path: &str) -> StorageResult<PathBuf> {
        let path = normalize_path(path)?;
        Ok(path.split('/').fold(self.root.clone(), |acc, seg| acc.join(seg)))
    }

    fn relative_path(&self, file: &Path) -> StorageResult<String> {
        let relative = file
            .strip_prefix(&self.root)
            .map_err(|_| StorageError::InvalidUrl(file.display().to_string()))?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        normalize_path(&segments.join("/"))
    }
}

impl ObjectStore for FileStore {
    fn get(&self, path: &str) -> BoxFuture<'_, StorageResult<Vec<u8>>> {
        let file = self.object_path(path);
        let path = path.to_string();
        Box::pin(async move {
            let file = file?;
            if !file.is_file() {
                return Err(StorageError::NotFound(path));
            }
            fs::read(&file)
                .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", file.display(), e)))
        })
    }

    fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> BoxFuture<'_, StorageResult<()>> {
        let file = self.object_path(path);
        Box::pin(async move {
            let file = file?;
            if let Some(parent) = file.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Io(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
            fs::write(&file, bytes)
                .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", file.display(), e)))
        })
    }

    fn list(&self, prefix: &str) -> BoxFuture<'_, StorageResult<Vec<ObjectEntry>>> {
        let prefix = normalize_prefix(prefix);
        Box::pin(async move {
            let prefix = prefix?;
            let dir = prefix
                .split('/')
                .filter(|s| !s.is_empty())
                .fold(self.root.clone(), |acc, seg| acc.join(seg));
            if !dir.is_dir() {
                return Ok(vec![]);
            }

            let entries = fs::read_dir(&dir)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;
            let mut listed = Vec::new();
            for entry in entries.flatten() {
                let Ok(meta) = entry.metadata() else { continue };
                if !meta.is_file() {
                    continue;
                }
                if let Some(name) = entry.file_name().to_str() {
                    listed.push(ObjectEntry {
                        path: format!("{prefix}{name}"),
                        name: name.to_string(),
                        size: meta.len(),
                    });
                }
            }
            listed.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(listed)
        })
    }

    fn signed_url(&self, path: &str, ttl: Duration) -> BoxFuture<'_, StorageResult<String>> {
        let file = self.object_path(path);
        let path = path.to_string();
        Box::pin(async move {
            let file = file?;
            if !file.is_file() {
                return Err(StorageError::NotFound(path));
            }
            let url = Url::from_file_path(&file)
                .map_err(|_| StorageError::InvalidUrl(file.display().to_string()))?;
            Ok(sign(url, ttl))
        })
    }

    fn fetch(&self, url: &str) -> BoxFuture<'_, StorageResult<Vec<u8>>> {
        let parsed = verify(url, "file", unix_now());
        Box::pin(async move {
            let parsed = parsed?;
            let file = parsed
                .to_file_path()
                .map_err(|_| StorageError::InvalidUrl(parsed.to_string()))?;
            let relative = self.relative_path(&file)?;
            self.get(&relative).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_put_get() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        block_on(store.put("u/p/result.json", b"[]".to_vec(), "application/json")).unwrap();
        assert_eq!(block_on(store.get("u/p/result.json")).unwrap(), b"[]");
        assert!(store.root().join("u").join("p").join("result.json").is_file());
    }

    #[test]
    fn test_file_store_not_found() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let result = block_on(store.get("u/p/style.json"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_file_store_rejects_escape() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let result = block_on(store.put("../outside.txt", vec![1], "text/plain"));
        assert!(matches!(result, Err(StorageError::InvalidUrl(_))));
    }

    #[test]
    fn test_file_store_list() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        block_on(store.put("u/p/slides/slide_1.png", vec![1, 2], "image/png")).unwrap();
        block_on(store.put("u/p/slides/slide_0.png", vec![1], "image/png")).unwrap();

        let listed = block_on(store.list("u/p/slides/")).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "slide_0.png");
        assert_eq!(listed[0].path, "u/p/slides/slide_0.png");
        assert_eq!(listed[1].size, 2);

        assert!(block_on(store.list("u/other")).unwrap().is_empty());
    }

    #[test]
    fn test_file_store_signed_fetch() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        block_on(store.put("u/p/images/logo.png", vec![9, 9, 9], "image/png")).unwrap();

        let url =
            block_on(store.signed_url("u/p/images/logo.png", Duration::from_secs(60))).unwrap();
        assert!(url.starts_with("file://"));
        assert_eq!(block_on(store.fetch(&url)).unwrap(), vec![9, 9, 9]);
    }
}
