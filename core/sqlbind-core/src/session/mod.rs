//! The unit-of-work session.
//!
//! A session is the per-caller facade over one executor chain: every
//! statement execution, transaction boundary, and cursor passes through it.
//! Sessions are short-lived and single-threaded by contract — open one per
//! logical request, close it on every exit path, never share it across
//! threads.

pub mod cursor;
pub mod factory;

pub use cursor::Cursor;
pub use factory::SessionFactory;

use crate::config::Configuration;
use crate::error::{SqlBindError, SqlBindResult};
use crate::executor::error_context::ErrorContext;
use crate::executor::Executor;
use crate::param::Parameter;
use crate::registry::StatementDefinition;
use crate::types::{ResultHandler, Row, RowBounds};
use cursor::CursorHandle;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Per-transaction facade for statement execution. Not thread-safe; confine
/// each session to one logical unit of work.
pub struct Session {
    config: Arc<Configuration>,
    executor: Box<dyn Executor>,
    auto_commit: bool,
    dirty: bool,
    closed: bool,
    cursors: SmallVec<[CursorHandle; 4]>,
}

impl Session {
    pub(crate) fn new(
        config: Arc<Configuration>,
        executor: Box<dyn Executor>,
        auto_commit: bool,
    ) -> Self {
        Self {
            config,
            executor,
            auto_commit,
            dirty: false,
            closed: false,
            cursors: SmallVec::new(),
        }
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.config
    }

    /// True once a write has executed without a commit or rollback since.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_open(&self) -> SqlBindResult<()> {
        if self.closed {
            Err(SqlBindError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn definition(&self, statement: &str) -> SqlBindResult<StatementDefinition> {
        // Cloned so the executor can borrow &mut self while the definition
        // is in flight.
        Ok(self.config.registry().lookup(statement)?.clone())
    }

    fn commit_required(&self, force: bool) -> bool {
        (!self.auto_commit && self.dirty) || force
    }

    /// Expect at most one row; `None` on an empty result, error on more
    /// than one.
    pub fn select_one(
        &mut self,
        statement: &str,
        param: impl Into<Parameter>,
    ) -> SqlBindResult<Option<Row>> {
        let mut rows = self.select_list(statement, param)?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(Some(rows.remove(0))),
            found => Err(SqlBindError::TooManyResults { found }),
        }
    }

    pub fn select_list(
        &mut self,
        statement: &str,
        param: impl Into<Parameter>,
    ) -> SqlBindResult<Vec<Row>> {
        self.select_list_with(statement, param, RowBounds::DEFAULT)
    }

    /// Eagerly materialized select with a row window.
    pub fn select_list_with(
        &mut self,
        statement: &str,
        param: impl Into<Parameter>,
        bounds: RowBounds,
    ) -> SqlBindResult<Vec<Row>> {
        self.check_open()?;
        let _guard = ErrorContext::enter(statement, "query");
        let def = self.definition(statement)?;
        let param = param.into().wrap_collections();
        self.executor
            .query(&def, &param, bounds, None)
            .map_err(|e| SqlBindError::execution(statement, "query", e))
    }

    pub fn select_map(
        &mut self,
        statement: &str,
        param: impl Into<Parameter>,
        map_key: &str,
    ) -> SqlBindResult<BTreeMap<String, Row>> {
        self.select_map_with(statement, param, map_key, RowBounds::DEFAULT)
    }

    /// Select, then re-key rows by the named field. On key collision the
    /// last row in result order wins.
    pub fn select_map_with(
        &mut self,
        statement: &str,
        param: impl Into<Parameter>,
        map_key: &str,
        bounds: RowBounds,
    ) -> SqlBindResult<BTreeMap<String, Row>> {
        let rows = self.select_list_with(statement, param, bounds)?;
        let mut keyed = BTreeMap::new();
        for row in rows {
            let key = map_key_string(row.get(map_key).unwrap_or(&Value::Null));
            keyed.insert(key, row);
        }
        Ok(keyed)
    }

    pub fn select_cursor(
        &mut self,
        statement: &str,
        param: impl Into<Parameter>,
    ) -> SqlBindResult<Cursor> {
        self.select_cursor_with(statement, param, RowBounds::DEFAULT)
    }

    /// Lazy, forward-only, single-pass select. The session tracks the
    /// cursor so `close()` releases it even if the caller forgets.
    pub fn select_cursor_with(
        &mut self,
        statement: &str,
        param: impl Into<Parameter>,
        bounds: RowBounds,
    ) -> SqlBindResult<Cursor> {
        self.check_open()?;
        let _guard = ErrorContext::enter(statement, "query cursor");
        let def = self.definition(statement)?;
        let param = param.into().wrap_collections();
        let backend = self
            .executor
            .query_cursor(&def, &param, bounds)
            .map_err(|e| SqlBindError::execution(statement, "query cursor", e))?;
        let (cursor, handle) = Cursor::new(statement.to_string(), backend);
        self.cursors.push(handle);
        Ok(cursor)
    }

    pub fn select(
        &mut self,
        statement: &str,
        param: impl Into<Parameter>,
        handler: &mut dyn ResultHandler,
    ) -> SqlBindResult<()> {
        self.select_with(statement, param, RowBounds::DEFAULT, handler)
    }

    /// Streaming select: rows are pushed to the handler as they arrive and
    /// never materialized as a whole.
    pub fn select_with(
        &mut self,
        statement: &str,
        param: impl Into<Parameter>,
        bounds: RowBounds,
        handler: &mut dyn ResultHandler,
    ) -> SqlBindResult<()> {
        self.check_open()?;
        let _guard = ErrorContext::enter(statement, "query");
        let def = self.definition(statement)?;
        let param = param.into().wrap_collections();
        self.executor
            .query(&def, &param, bounds, Some(handler))
            .map(|_| ())
            .map_err(|e| SqlBindError::execution(statement, "query", e))
    }

    pub fn insert(&mut self, statement: &str, param: impl Into<Parameter>) -> SqlBindResult<u64> {
        self.update(statement, param)
    }

    pub fn delete(&mut self, statement: &str, param: impl Into<Parameter>) -> SqlBindResult<u64> {
        self.update(statement, param)
    }

    /// All mutations route through one primitive, distinguished only by the
    /// statement's command kind. Returns the affected-row count.
    pub fn update(&mut self, statement: &str, param: impl Into<Parameter>) -> SqlBindResult<u64> {
        self.check_open()?;
        let _guard = ErrorContext::enter(statement, "update");
        self.dirty = true;
        let def = self.definition(statement)?;
        let param = param.into().wrap_collections();
        self.executor
            .update(&def, &param)
            .map_err(|e| SqlBindError::execution(statement, "update", e))
    }

    /// Drain any deferred statements through the chain.
    pub fn flush_statements(&mut self) -> SqlBindResult<()> {
        self.check_open()?;
        let _guard = ErrorContext::enter("<transaction>", "flush");
        self.executor
            .flush()
            .map_err(|e| SqlBindError::execution("<transaction>", "flush", e))
    }

    /// Finalize the transaction if the session is dirty or `force` is set;
    /// clears the dirty flag and the local result cache.
    pub fn commit(&mut self, force: bool) -> SqlBindResult<()> {
        self.check_open()?;
        let _guard = ErrorContext::enter("<transaction>", "commit");
        debug!(force, dirty = self.dirty, "committing session");
        self.executor
            .commit(self.commit_required(force))
            .map_err(|e| SqlBindError::execution("<transaction>", "commit", e))?;
        self.dirty = false;
        Ok(())
    }

    /// Roll back under the same force rule as [`Session::commit`].
    pub fn rollback(&mut self, force: bool) -> SqlBindResult<()> {
        self.check_open()?;
        let _guard = ErrorContext::enter("<transaction>", "rollback");
        debug!(force, dirty = self.dirty, "rolling back session");
        self.executor
            .rollback(self.commit_required(force))
            .map_err(|e| SqlBindError::execution("<transaction>", "rollback", e))?;
        self.dirty = false;
        Ok(())
    }

    /// Drop every session-local cached result.
    pub fn clear_cache(&mut self) {
        self.executor.clear_local_cache();
    }

    /// Finalize the transaction (rollback under the force rule), release
    /// every tracked cursor, then clear local state. Safe to call once;
    /// later operations fail fast. Every cursor close is attempted even
    /// after an earlier one fails; the first failure is re-raised.
    pub fn close(&mut self) -> SqlBindResult<()> {
        if self.closed {
            return Ok(());
        }
        let _guard = ErrorContext::enter("<transaction>", "close");
        self.closed = true;
        let rollback_required = self.commit_required(false);
        let executor_result = self.executor.close(rollback_required);

        let mut first_failure = None;
        for handle in self.cursors.drain(..) {
            if let Err(e) = handle.lock().close() {
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
        }
        self.dirty = false;

        match first_failure {
            Some(e) => Err(e),
            None => executor_result,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// String form of a row field used as a `select_map` key. Strings map to
/// themselves; everything else uses its JSON rendering.
fn map_key_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
