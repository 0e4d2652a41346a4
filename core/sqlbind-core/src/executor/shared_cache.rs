//! Cross-session shared result cache.
//!
//! One LRU per statement namespace, held in a concurrent pool shared by
//! every session's caching decorator. Any write statement in a namespace
//! clears that namespace wholesale.

use super::CacheKey;
use crate::error::{SqlBindError, SqlBindResult};
use crate::types::Row;
use dashmap::DashMap;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const DEFAULT_NAMESPACE_CAPACITY: NonZeroUsize = NonZeroUsize::new(1024).unwrap();

type NamespaceCache = Arc<Mutex<LruCache<CacheKey, Arc<Vec<Row>>>>>;

/// Namespace → LRU pool with hit/miss accounting.
#[derive(Debug)]
pub struct SharedCachePool {
    namespaces: DashMap<String, NamespaceCache>,
    capacity: NonZeroUsize,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl SharedCachePool {
    /// Fails with a configuration error on a zero capacity — a malformed
    /// setting, not a request for the default.
    pub fn new(capacity_per_namespace: usize) -> SqlBindResult<Self> {
        match NonZeroUsize::new(capacity_per_namespace) {
            Some(capacity) => Ok(Self::with_capacity(capacity)),
            None => Err(SqlBindError::Configuration(
                "shared cache capacity must be at least 1".to_string(),
            )),
        }
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            namespaces: DashMap::new(),
            capacity,
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::with_capacity(DEFAULT_NAMESPACE_CAPACITY)
    }

    fn namespace(&self, namespace: &str) -> NamespaceCache {
        self.namespaces
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(LruCache::new(self.capacity))))
            .clone()
    }

    pub fn get(&self, namespace: &str, key: &CacheKey) -> Option<Arc<Vec<Row>>> {
        let cache = self.namespace(namespace);
        let mut cache = cache.lock();
        match cache.get(key) {
            Some(rows) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Some(rows.clone())
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, namespace: &str, key: CacheKey, rows: Arc<Vec<Row>>) {
        let cache = self.namespace(namespace);
        cache.lock().put(key, rows);
    }

    /// Drop every entry in one namespace. Called on any write statement
    /// sharing that namespace.
    pub fn invalidate_namespace(&self, namespace: &str) {
        if let Some(cache) = self.namespaces.get(namespace) {
            cache.lock().clear();
        }
    }

    /// Drop everything.
    pub fn clear(&self) {
        for entry in self.namespaces.iter() {
            entry.value().lock().clear();
        }
        self.hit_count.store(0, Ordering::Relaxed);
        self.miss_count.store(0, Ordering::Relaxed);
    }

    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hit_count.load(Ordering::Relaxed);
        let misses = self.miss_count.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            hit_ratio: self.hit_ratio(),
        }
    }
}

/// Shared-cache hit/miss counters.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_ratio: f64,
}
