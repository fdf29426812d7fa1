use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use folio_types::Value;
use tracing::{debug, warn};

use crate::error::{CacheError, CacheResult};

/// Key/value storage behind the cache layer.
///
/// Keys are the flat strings produced by [`crate::CacheKey::storage_key`].
/// Implementations never evict on their own. [`crate::Cache`] removes the
/// previous key of an entry when it stores one for a newer fingerprint.
pub trait CacheBackend: Send + Sync {
    /// Read a cached value. `Ok(None)` is a miss.
    fn get(&self, key: &str) -> CacheResult<Option<Value>>;

    /// Store a value, replacing any previous one under `key`.
    fn put(&self, key: &str, value: &Value) -> CacheResult<()>;

    /// Drop one entry. Returns `true` if it existed.
    fn remove(&self, key: &str) -> CacheResult<bool>;

    /// Drop every entry.
    fn clear(&self) -> CacheResult<()>;
}

/// HashMap-backed cache for tests and single-process use.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        Ok(self.entries.read().expect("lock poisoned").get(key).cloned())
    }

    fn put(&self, key: &str, value: &Value) -> CacheResult<()> {
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> CacheResult<bool> {
        Ok(self
            .entries
            .write()
            .expect("lock poisoned")
            .remove(key)
            .is_some())
    }

    fn clear(&self) -> CacheResult<()> {
        self.entries.write().expect("lock poisoned").clear();
        Ok(())
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.len())
            .finish()
    }
}

/// On-disk cache: one JSON file per key under `<dir>/<k[..2]>/<k[2..]>.json`.
///
/// Files are published with write-temp-then-rename, so a concurrent reader
/// sees either the previous file or the complete new one. A file that fails
/// to parse is logged and treated as a miss.
#[derive(Clone, Debug)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let (shard, rest) = key.split_at(key.len().min(2));
        self.dir.join(shard).join(format!("{rest}.json"))
    }
}

impl CacheBackend for FileCache {
    fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable cache file");
                Ok(None)
            }
        }
    }

    fn put(&self, key: &str, value: &Value) -> CacheResult<()> {
        let path = self.path_for(key);
        let bytes =
            serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        folio_store::write_atomic(&path, &bytes)?;
        debug!(path = %path.display(), len = bytes.len(), "cache file written");
        Ok(())
    }

    fn remove(&self, key: &str) -> CacheResult<bool> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> CacheResult<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn exercise(backend: &dyn CacheBackend) {
        assert!(backend.get("abcdef").unwrap().is_none());
        backend.put("abcdef", &json!({"title": "Foo"})).unwrap();
        assert_eq!(backend.get("abcdef").unwrap(), Some(json!({"title": "Foo"})));
        backend.put("abcdef", &json!({"title": "Bar"})).unwrap();
        assert_eq!(backend.get("abcdef").unwrap(), Some(json!({"title": "Bar"})));
        assert!(backend.remove("abcdef").unwrap());
        assert!(!backend.remove("abcdef").unwrap());
        backend.put("one", &json!(1)).unwrap();
        backend.clear().unwrap();
        assert!(backend.get("one").unwrap().is_none());
    }

    #[test]
    fn memory_backend_contract() {
        exercise(&MemoryCache::new());
    }

    #[test]
    fn file_backend_contract() {
        let dir = TempDir::new().unwrap();
        exercise(&FileCache::new(dir.path().join("cache")));
    }

    #[test]
    fn corrupt_cache_file_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        cache.put("ffee01", &json!("ok")).unwrap();
        fs::write(cache.path_for("ffee01"), b"{not json").unwrap();
        assert!(cache.get("ffee01").unwrap().is_none());
    }

    #[test]
    fn files_are_sharded_by_key_prefix() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        cache.put("ab1234", &json!(true)).unwrap();
        assert!(dir.path().join("ab").join("1234.json").exists());
    }
}
