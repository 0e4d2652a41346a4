//! Session-local result cache.
//!
//! Lives inside the execution primitive and is consulted before every
//! backend read, regardless of the statement's shared-cache eligibility.
//! Cleared on commit, rollback, close, explicit clear, and — under
//! `Statement` scope — after every query.

use super::CacheKey;
use crate::types::Row;
use ahash::AHashMap;
use std::sync::Arc;

/// How long entries in the local cache survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalCacheScope {
    /// Entries survive until a transaction boundary event.
    #[default]
    Session,
    /// Entries are dropped whenever any statement executes; effectively
    /// disables cross-call reuse.
    Statement,
}

/// Plain map — the session owns the executor exclusively, so no lock.
#[derive(Debug, Default)]
pub struct LocalCache {
    entries: AHashMap<CacheKey, Arc<Vec<Row>>>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Vec<Row>>> {
        self.entries.get(key).cloned()
    }

    pub fn put(&mut self, key: CacheKey, rows: Arc<Vec<Row>>) {
        self.entries.insert(key, rows);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
