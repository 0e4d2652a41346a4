//! Shared-cache decorator.
//!
//! Wraps the executor chain when global caching is enabled. Per call it is
//! active only for cache-eligible statements: reads consult the shared
//! per-namespace cache before delegating, and every write invalidates its
//! statement's namespace. Streaming and cursor reads bypass the shared
//! cache — their results are never materialized here.

use super::backend::BackendCursor;
use super::shared_cache::SharedCachePool;
use super::{CacheKey, Executor};
use crate::error::SqlBindResult;
use crate::param::Parameter;
use crate::registry::StatementDefinition;
use crate::types::{ResultHandler, Row, RowBounds};
use std::sync::Arc;
use tracing::trace;

pub struct CachingExecutor {
    inner: Box<dyn Executor>,
    pool: Arc<SharedCachePool>,
}

impl CachingExecutor {
    pub fn new(inner: Box<dyn Executor>, pool: Arc<SharedCachePool>) -> Self {
        Self { inner, pool }
    }
}

impl Executor for CachingExecutor {
    fn query(
        &mut self,
        def: &StatementDefinition,
        param: &Parameter,
        bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
    ) -> SqlBindResult<Vec<Row>> {
        if handler.is_some() || !def.use_cache() {
            return self.inner.query(def, param, bounds, handler);
        }

        let key = CacheKey::new(def, param, bounds);
        if let Some(rows) = self.pool.get(def.namespace(), &key) {
            trace!(statement = def.id(), "shared cache hit");
            return Ok((*rows).clone());
        }

        let rows = self.inner.query(def, param, bounds, None)?;
        self.pool
            .put(def.namespace(), key, Arc::new(rows.clone()));
        Ok(rows)
    }

    fn query_cursor(
        &mut self,
        def: &StatementDefinition,
        param: &Parameter,
        bounds: RowBounds,
    ) -> SqlBindResult<Box<dyn BackendCursor>> {
        self.inner.query_cursor(def, param, bounds)
    }

    fn update(&mut self, def: &StatementDefinition, param: &Parameter) -> SqlBindResult<u64> {
        if def.kind().is_write() {
            trace!(namespace = def.namespace(), "invalidating shared cache namespace");
            self.pool.invalidate_namespace(def.namespace());
        }
        self.inner.update(def, param)
    }

    fn flush(&mut self) -> SqlBindResult<()> {
        self.inner.flush()
    }

    fn commit(&mut self, required: bool) -> SqlBindResult<()> {
        self.inner.commit(required)
    }

    fn rollback(&mut self, required: bool) -> SqlBindResult<()> {
        self.inner.rollback(required)
    }

    fn close(&mut self, force_rollback: bool) -> SqlBindResult<()> {
        self.inner.close(force_rollback)
    }

    fn clear_local_cache(&mut self) {
        self.inner.clear_local_cache();
    }
}
