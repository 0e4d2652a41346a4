//! The raw execution primitive.
//!
//! Owns the backend connection for one session, consults the local result
//! cache before every read, and runs every row through the materializer.

use super::backend::{Backend, BackendCursor, RowMaterializer};
use super::local_cache::{LocalCache, LocalCacheScope};
use super::{CacheKey, Executor};
use crate::error::{SqlBindError, SqlBindResult};
use crate::param::Parameter;
use crate::registry::StatementDefinition;
use crate::types::{ResultHandler, Row, RowBounds};
use std::sync::Arc;
use tracing::{debug, trace};

pub struct SimpleExecutor {
    backend: Box<dyn Backend>,
    materializer: Arc<dyn RowMaterializer>,
    local_cache: LocalCache,
    scope: LocalCacheScope,
    closed: bool,
}

impl SimpleExecutor {
    pub fn new(
        backend: Box<dyn Backend>,
        materializer: Arc<dyn RowMaterializer>,
        scope: LocalCacheScope,
    ) -> Self {
        Self {
            backend,
            materializer,
            local_cache: LocalCache::new(),
            scope,
            closed: false,
        }
    }

    fn check_open(&self) -> SqlBindResult<()> {
        if self.closed {
            Err(SqlBindError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn materialize_all(
        &self,
        def: &StatementDefinition,
        raw: Vec<Row>,
    ) -> SqlBindResult<Vec<Row>> {
        raw.into_iter()
            .map(|row| self.materializer.materialize(def, row))
            .collect()
    }

    /// Stream rows straight to the handler through a backend cursor; the
    /// result set is never materialized as a whole.
    fn query_streaming(
        &mut self,
        def: &StatementDefinition,
        param: &Parameter,
        bounds: RowBounds,
        handler: &mut dyn ResultHandler,
    ) -> SqlBindResult<()> {
        let pushdown = self.backend.supports_bounds_pushdown();
        let backend_bounds = pushdown.then_some(bounds);
        let mut cursor = self.backend.open_cursor(def, param, backend_bounds)?;

        let mut skipped = 0usize;
        let mut yielded = 0usize;
        let result = loop {
            match cursor.next_row() {
                Ok(Some(raw)) => {
                    if !pushdown {
                        if skipped < bounds.offset {
                            skipped += 1;
                            continue;
                        }
                        if yielded >= bounds.limit {
                            break Ok(());
                        }
                    }
                    let row = match self.materializer.materialize(def, raw) {
                        Ok(row) => row,
                        Err(e) => break Err(e),
                    };
                    if let Err(e) = handler.handle_row(row) {
                        break Err(e);
                    }
                    yielded += 1;
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        // Release the cursor even when the handler or backend failed.
        let close_result = cursor.close();
        result.and(close_result)
    }
}

impl Executor for SimpleExecutor {
    fn query(
        &mut self,
        def: &StatementDefinition,
        param: &Parameter,
        bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
    ) -> SqlBindResult<Vec<Row>> {
        self.check_open()?;
        debug!(statement = def.id(), "executing query");

        if let Some(handler) = handler {
            self.query_streaming(def, param, bounds, handler)?;
            if self.scope == LocalCacheScope::Statement {
                self.local_cache.clear();
            }
            return Ok(Vec::new());
        }

        let key = CacheKey::new(def, param, bounds);
        // Local cache is consulted first on every read, regardless of the
        // statement's shared-cache eligibility.
        if let Some(rows) = self.local_cache.get(&key) {
            trace!(statement = def.id(), "local cache hit");
            let rows = (*rows).clone();
            if self.scope == LocalCacheScope::Statement {
                self.local_cache.clear();
            }
            return Ok(rows);
        }

        let pushdown = self.backend.supports_bounds_pushdown();
        let backend_bounds = pushdown.then_some(bounds);
        let raw = self.backend.query(def, param, backend_bounds)?;
        let mut rows = self.materialize_all(def, raw)?;
        if !pushdown && !bounds.is_default() {
            rows = rows
                .into_iter()
                .skip(bounds.offset)
                .take(bounds.limit)
                .collect();
        }

        match self.scope {
            LocalCacheScope::Session => {
                self.local_cache.put(key, Arc::new(rows.clone()));
            }
            LocalCacheScope::Statement => {
                self.local_cache.clear();
            }
        }
        Ok(rows)
    }

    fn query_cursor(
        &mut self,
        def: &StatementDefinition,
        param: &Parameter,
        bounds: RowBounds,
    ) -> SqlBindResult<Box<dyn BackendCursor>> {
        self.check_open()?;
        debug!(statement = def.id(), "opening cursor");

        let pushdown = self.backend.supports_bounds_pushdown();
        let backend_bounds = pushdown.then_some(bounds);
        let inner = self.backend.open_cursor(def, param, backend_bounds)?;
        let effective = if pushdown { RowBounds::DEFAULT } else { bounds };
        Ok(Box::new(MaterializingCursor {
            inner,
            def: def.clone(),
            materializer: self.materializer.clone(),
            to_skip: effective.offset,
            remaining: effective.limit,
        }))
    }

    fn update(&mut self, def: &StatementDefinition, param: &Parameter) -> SqlBindResult<u64> {
        self.check_open()?;
        debug!(statement = def.id(), "executing update");
        // Any write invalidates everything this session has cached locally.
        self.local_cache.clear();
        self.backend.update(def, param)
    }

    fn flush(&mut self) -> SqlBindResult<()> {
        self.check_open()?;
        // Nothing is deferred by the simple executor.
        Ok(())
    }

    fn commit(&mut self, required: bool) -> SqlBindResult<()> {
        self.check_open()?;
        self.local_cache.clear();
        if required {
            debug!("committing transaction");
            self.backend.commit()?;
        }
        Ok(())
    }

    fn rollback(&mut self, required: bool) -> SqlBindResult<()> {
        self.check_open()?;
        self.local_cache.clear();
        if required {
            debug!("rolling back transaction");
            self.backend.rollback()?;
        }
        Ok(())
    }

    fn close(&mut self, force_rollback: bool) -> SqlBindResult<()> {
        if self.closed {
            return Ok(());
        }
        let rollback_result = if force_rollback {
            self.backend.rollback()
        } else {
            Ok(())
        };
        self.local_cache.clear();
        self.closed = true;
        // The connection is released even when the rollback failed.
        let close_result = self.backend.close();
        rollback_result.and(close_result)
    }

    fn clear_local_cache(&mut self) {
        self.local_cache.clear();
    }
}

/// Cursor wrapper that applies the row window and runs every row through
/// the materializer before it reaches the caller.
struct MaterializingCursor {
    inner: Box<dyn BackendCursor>,
    def: StatementDefinition,
    materializer: Arc<dyn RowMaterializer>,
    to_skip: usize,
    remaining: usize,
}

impl BackendCursor for MaterializingCursor {
    fn next_row(&mut self) -> SqlBindResult<Option<Row>> {
        loop {
            if self.remaining == 0 {
                return Ok(None);
            }
            match self.inner.next_row()? {
                Some(raw) => {
                    if self.to_skip > 0 {
                        self.to_skip -= 1;
                        continue;
                    }
                    self.remaining -= 1;
                    return Ok(Some(self.materializer.materialize(&self.def, raw)?));
                }
                None => return Ok(None),
            }
        }
    }

    fn close(&mut self) -> SqlBindResult<()> {
        self.inner.close()
    }
}
