use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use folio_store::FileStamp;
use folio_types::{EntryId, Value};
use tracing::debug;

use crate::backend::{CacheBackend, MemoryCache};
use crate::error::CacheResult;
use crate::fingerprint::{Fingerprint, Fingerprinter};
use crate::key::{CacheKey, OperationKind};

/// Counters for observing cache effectiveness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    /// Stale entries dropped because a newer fingerprint was stored.
    pub evictions: u64,
}

/// Fingerprint-keyed cache in front of fetch results.
///
/// Disabling the cache makes every lookup miss and every store a no-op;
/// callers recompute, so output never depends on the flag.
///
/// The layer remembers the last key it stored per `(id, kind)` and removes
/// it from the backend when a newer fingerprint replaces it. Entries left
/// by an earlier process are not tracked and stay until [`Cache::clear`].
pub struct Cache {
    enabled: AtomicBool,
    backend: Box<dyn CacheBackend>,
    latest: Mutex<HashMap<(EntryId, OperationKind), String>>,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    evictions: AtomicU64,
}

impl Cache {
    pub fn new(enabled: bool, backend: Box<dyn CacheBackend>) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            backend,
            latest: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// An in-memory cache that starts enabled.
    pub fn in_memory() -> Self {
        Self::new(true, Box::new(MemoryCache::new()))
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(false, Box::new(MemoryCache::new()))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Fingerprint for an entry's current file stamp.
    ///
    /// `None` when caching is disabled or the document does not exist.
    pub fn fingerprint(&self, id: &EntryId, stamp: Option<&FileStamp>) -> Option<Fingerprint> {
        if !self.is_enabled() {
            return None;
        }
        stamp.map(|s| Fingerprinter::ENTRY.entry(id, s))
    }

    /// Printable cache id: 32 hex characters, or empty when disabled.
    pub fn cache_id(&self, id: &EntryId, stamp: Option<&FileStamp>) -> String {
        self.fingerprint(id, stamp)
            .map(|fp| fp.to_hex())
            .unwrap_or_default()
    }

    /// Build the key for `(id, kind)` at the given stamp.
    pub fn key(
        &self,
        id: &EntryId,
        kind: OperationKind,
        stamp: Option<&FileStamp>,
    ) -> Option<CacheKey> {
        self.fingerprint(id, stamp)
            .map(|fp| CacheKey::new(id.clone(), kind, fp))
    }

    pub fn get(&self, key: &CacheKey) -> CacheResult<Option<Value>> {
        if !self.is_enabled() {
            return Ok(None);
        }
        let found = self.backend.get(&key.storage_key())?;
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(id = %key.id, kind = %key.kind, "cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(id = %key.id, kind = %key.kind, "cache miss");
        }
        Ok(found)
    }

    pub fn put(&self, key: &CacheKey, value: &Value) -> CacheResult<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let storage_key = key.storage_key();
        self.backend.put(&storage_key, value)?;
        self.writes.fetch_add(1, Ordering::Relaxed);

        let previous = self
            .latest
            .lock()
            .expect("lock poisoned")
            .insert((key.id.clone(), key.kind.clone()), storage_key.clone());
        if let Some(stale) = previous.filter(|p| *p != storage_key) {
            if self.backend.remove(&stale)? {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(id = %key.id, kind = %key.kind, "evicted stale cache entry");
            }
        }
        Ok(())
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// With no key (cache disabled or nothing to fingerprint) `compute`
    /// always runs.
    pub fn get_or_compute<E, F>(&self, key: Option<&CacheKey>, compute: F) -> Result<Value, E>
    where
        F: FnOnce() -> Result<Value, E>,
        E: From<crate::CacheError>,
    {
        let Some(key) = key else {
            return compute();
        };
        if let Some(hit) = self.get(key)? {
            return Ok(hit);
        }
        let value = compute()?;
        self.put(key, &value)?;
        Ok(value)
    }

    /// Drop everything the backend holds.
    pub fn clear(&self) -> CacheResult<()> {
        self.latest.lock().expect("lock poisoned").clear();
        self.backend.clear()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("enabled", &self.is_enabled())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use serde_json::json;
    use std::time::{Duration, SystemTime};

    fn stamp(nanos: u64) -> FileStamp {
        FileStamp {
            modified: SystemTime::UNIX_EPOCH + Duration::from_nanos(nanos),
            len: 10,
        }
    }

    fn id() -> EntryId {
        EntryId::new("foo").unwrap()
    }

    #[test]
    fn disabled_cache_has_empty_id_and_never_hits() {
        let cache = Cache::disabled();
        assert_eq!(cache.cache_id(&id(), Some(&stamp(1))), "");
        assert!(cache.key(&id(), OperationKind::Document, Some(&stamp(1))).is_none());

        let key = CacheKey::new(id(), OperationKind::Document, Fingerprinter::ENTRY.entry(&id(), &stamp(1)));
        cache.put(&key, &json!(1)).unwrap();
        assert!(cache.get(&key).unwrap().is_none());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn enabled_cache_id_is_stable_and_tracks_changes() {
        let cache = Cache::in_memory();
        let a = cache.cache_id(&id(), Some(&stamp(1)));
        assert_eq!(a.len(), 32);
        assert_eq!(a, cache.cache_id(&id(), Some(&stamp(1))));
        assert_ne!(a, cache.cache_id(&id(), Some(&stamp(2))));
        assert_eq!(cache.cache_id(&id(), None), "");
    }

    #[test]
    fn get_or_compute_runs_once_per_fingerprint() {
        let cache = Cache::in_memory();
        let key = cache.key(&id(), OperationKind::Document, Some(&stamp(1)));
        let mut calls = 0;
        for _ in 0..3 {
            let v: Result<Value, CacheError> = cache.get_or_compute(key.as_ref(), || {
                calls += 1;
                Ok(json!({"title": "Foo"}))
            });
            assert_eq!(v.unwrap(), json!({"title": "Foo"}));
        }
        assert_eq!(calls, 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 2,
                misses: 1,
                writes: 1,
                evictions: 0
            }
        );
    }

    #[test]
    fn newer_fingerprint_replaces_the_stale_entry() {
        let backend = std::sync::Arc::new(MemoryCache::new());
        let cache = Cache::new(true, Box::new(SharedBackend(backend.clone())));
        let old = cache.key(&id(), OperationKind::Document, Some(&stamp(1))).unwrap();
        let new = cache.key(&id(), OperationKind::Document, Some(&stamp(2))).unwrap();
        let other = cache
            .key(&EntryId::new("bar").unwrap(), OperationKind::Document, Some(&stamp(1)))
            .unwrap();

        cache.put(&old, &json!("v1")).unwrap();
        cache.put(&other, &json!("bar")).unwrap();
        cache.put(&old, &json!("v1 again")).unwrap();
        assert_eq!(backend.len(), 2);

        cache.put(&new, &json!("v2")).unwrap();
        assert_eq!(backend.len(), 2);
        assert!(cache.get(&old).unwrap().is_none());
        assert_eq!(cache.get(&new).unwrap(), Some(json!("v2")));
        assert_eq!(cache.get(&other).unwrap(), Some(json!("bar")));
        assert_eq!(cache.stats().evictions, 1);
    }

    struct SharedBackend(std::sync::Arc<MemoryCache>);

    impl CacheBackend for SharedBackend {
        fn get(&self, key: &str) -> CacheResult<Option<Value>> {
            self.0.get(key)
        }
        fn put(&self, key: &str, value: &Value) -> CacheResult<()> {
            self.0.put(key, value)
        }
        fn remove(&self, key: &str) -> CacheResult<bool> {
            self.0.remove(key)
        }
        fn clear(&self) -> CacheResult<()> {
            self.0.clear()
        }
    }

    #[test]
    fn toggling_off_bypasses_existing_entries() {
        let cache = Cache::in_memory();
        let key = cache.key(&id(), OperationKind::Document, Some(&stamp(1))).unwrap();
        cache.put(&key, &json!("cached")).unwrap();
        cache.set_enabled(false);
        assert!(cache.get(&key).unwrap().is_none());
        cache.set_enabled(true);
        assert_eq!(cache.get(&key).unwrap(), Some(json!("cached")));
    }
}
