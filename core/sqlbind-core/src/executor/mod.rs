//! Statement execution pipeline.
//!
//! A session owns one executor chain, assembled once at open time:
//!
//! ```text
//! interceptor 1 → … → interceptor N → caching decorator → primitive → backend
//! ```
//!
//! [`SimpleExecutor`] is the raw primitive: it talks to the opaque
//! [`Backend`], consults the session-local result cache, and materializes
//! rows. [`CachingExecutor`] adds the cross-session shared cache, and
//! [`InterceptedExecutor`] wraps the chain with caller-supplied plugins.

pub mod backend;
pub mod caching;
pub mod error_context;
pub mod interceptor;
pub mod local_cache;
pub mod shared_cache;
pub mod simple;

pub use backend::{Backend, BackendCursor, BackendProvider, DirectMaterializer, RowMaterializer};
pub use caching::CachingExecutor;
pub use error_context::ErrorContext;
pub use interceptor::{Interceptor, InterceptedExecutor, Invocation, InterceptorProperties};
pub use local_cache::LocalCacheScope;
pub use shared_cache::{CacheStats, SharedCachePool};
pub use simple::SimpleExecutor;

use crate::error::SqlBindResult;
use crate::param::Parameter;
use crate::registry::StatementDefinition;
use crate::types::{ResultHandler, Row, RowBounds};

/// One statement execution capability. Implemented by the primitive and by
/// every decorator so the chain composes uniformly.
///
/// Session-confined: methods take `&mut self` and implementations are not
/// required to be thread-safe.
pub trait Executor {
    /// Run a read statement. When `handler` is supplied, rows stream to it
    /// and the returned vector is empty; otherwise rows are materialized
    /// eagerly.
    fn query(
        &mut self,
        def: &StatementDefinition,
        param: &Parameter,
        bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
    ) -> SqlBindResult<Vec<Row>>;

    /// Open a lazy backend cursor for a read statement.
    fn query_cursor(
        &mut self,
        def: &StatementDefinition,
        param: &Parameter,
        bounds: RowBounds,
    ) -> SqlBindResult<Box<dyn BackendCursor>>;

    /// Run a write statement; returns the affected-row count.
    fn update(&mut self, def: &StatementDefinition, param: &Parameter) -> SqlBindResult<u64>;

    /// Drain any deferred work. The simple executor defers nothing.
    fn flush(&mut self) -> SqlBindResult<()>;

    /// Finalize the transaction iff `required`.
    fn commit(&mut self, required: bool) -> SqlBindResult<()>;

    /// Roll the transaction back iff `required`.
    fn rollback(&mut self, required: bool) -> SqlBindResult<()>;

    /// Release the underlying connection, rolling back first when
    /// `force_rollback` is set. The executor is unusable afterwards.
    fn close(&mut self, force_rollback: bool) -> SqlBindResult<()>;

    /// Drop every session-local cached result.
    fn clear_local_cache(&mut self);
}

/// Key for both the local and the shared result cache:
/// statement identifier + parameter snapshot + row window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    statement: String,
    fingerprint: String,
    offset: usize,
    limit: usize,
}

impl CacheKey {
    pub fn new(def: &StatementDefinition, param: &Parameter, bounds: RowBounds) -> Self {
        Self {
            statement: def.id().to_string(),
            fingerprint: serde_json::to_string(param)
                .unwrap_or_else(|_| "<unserializable>".to_string()),
            offset: bounds.offset,
            limit: bounds.limit,
        }
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CommandKind, StatementDefinition};
    use serde_json::json;

    fn def(id: &str) -> StatementDefinition {
        StatementDefinition::new(id, CommandKind::Select, "SELECT 1")
    }

    #[test]
    fn same_inputs_produce_equal_keys() {
        let d = def("M.find");
        let p = Parameter::Value(json!({"id": 1}));
        let a = CacheKey::new(&d, &p, RowBounds::DEFAULT);
        let b = CacheKey::new(&d, &p, RowBounds::DEFAULT);
        assert_eq!(a, b);
    }

    #[test]
    fn keys_differ_by_parameter_and_bounds() {
        let d = def("M.find");
        let base = CacheKey::new(&d, &Parameter::from(1i64), RowBounds::DEFAULT);
        let other_param = CacheKey::new(&d, &Parameter::from(2i64), RowBounds::DEFAULT);
        let other_bounds = CacheKey::new(&d, &Parameter::from(1i64), RowBounds::new(5, 10));
        assert_ne!(base, other_param);
        assert_ne!(base, other_bounds);
    }
}
