//! Cross-cutting interceptors.
//!
//! Interceptors are composed as nested wrappers around the executor chain:
//! the first interceptor registered sees a call first, and its `proceed`
//! continuation reaches the next interceptor, then the caching decorator,
//! then the primitive. Each interceptor may observe the invocation, rewrite
//! its parameter or bounds, or substitute the outcome without proceeding at
//! all. Interceptors receive free-form string properties at assembly time.

use super::backend::BackendCursor;
use super::Executor;
use crate::error::SqlBindResult;
use crate::param::Parameter;
use crate::registry::StatementDefinition;
use crate::types::{ResultHandler, Row, RowBounds};
use std::collections::HashMap;
use std::sync::Arc;

/// Assembly-time interceptor configuration.
pub type InterceptorProperties = HashMap<String, String>;

/// One intercepted data-path call. The parameter and bounds are owned so an
/// interceptor can rewrite them before proceeding.
pub struct Invocation<'a> {
    pub statement: &'a StatementDefinition,
    pub parameter: Parameter,
    pub bounds: RowBounds,
}

/// A cross-cutting plugin on the execution pipeline.
///
/// Every hook defaults to pass-through, so implementations override only
/// the calls they care about. Transaction finalization is observable but
/// not replaceable.
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &str {
        "interceptor"
    }

    /// Called once at assembly with the configured properties.
    fn configure(&mut self, _properties: &InterceptorProperties) {}

    fn intercept_query(
        &self,
        invocation: Invocation<'_>,
        proceed: &mut dyn FnMut(Invocation<'_>) -> SqlBindResult<Vec<Row>>,
    ) -> SqlBindResult<Vec<Row>> {
        proceed(invocation)
    }

    fn intercept_query_cursor(
        &self,
        invocation: Invocation<'_>,
        proceed: &mut dyn FnMut(Invocation<'_>) -> SqlBindResult<Box<dyn BackendCursor>>,
    ) -> SqlBindResult<Box<dyn BackendCursor>> {
        proceed(invocation)
    }

    fn intercept_update(
        &self,
        invocation: Invocation<'_>,
        proceed: &mut dyn FnMut(Invocation<'_>) -> SqlBindResult<u64>,
    ) -> SqlBindResult<u64> {
        proceed(invocation)
    }

    fn on_commit(&self, _required: bool) {}

    fn on_rollback(&self, _required: bool) {}
}

/// Executor wrapper applying one interceptor; chains nest one wrapper per
/// interceptor, built once at session open.
pub struct InterceptedExecutor {
    interceptor: Arc<dyn Interceptor>,
    inner: Box<dyn Executor>,
}

impl InterceptedExecutor {
    pub fn new(interceptor: Arc<dyn Interceptor>, inner: Box<dyn Executor>) -> Self {
        Self { interceptor, inner }
    }
}

impl Executor for InterceptedExecutor {
    fn query(
        &mut self,
        def: &StatementDefinition,
        param: &Parameter,
        bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
    ) -> SqlBindResult<Vec<Row>> {
        let interceptor = Arc::clone(&self.interceptor);
        let inner = &mut self.inner;
        let mut handler = handler;
        let mut proceed = |inv: Invocation<'_>| {
            // The handler is handed off by value; the chain proceeds at most
            // once, so a second call streams nowhere.
            inner.query(inv.statement, &inv.parameter, inv.bounds, handler.take())
        };
        interceptor.intercept_query(
            Invocation {
                statement: def,
                parameter: param.clone(),
                bounds,
            },
            &mut proceed,
        )
    }

    fn query_cursor(
        &mut self,
        def: &StatementDefinition,
        param: &Parameter,
        bounds: RowBounds,
    ) -> SqlBindResult<Box<dyn BackendCursor>> {
        let interceptor = Arc::clone(&self.interceptor);
        let inner = &mut self.inner;
        let mut proceed =
            |inv: Invocation<'_>| inner.query_cursor(inv.statement, &inv.parameter, inv.bounds);
        interceptor.intercept_query_cursor(
            Invocation {
                statement: def,
                parameter: param.clone(),
                bounds,
            },
            &mut proceed,
        )
    }

    fn update(&mut self, def: &StatementDefinition, param: &Parameter) -> SqlBindResult<u64> {
        let interceptor = Arc::clone(&self.interceptor);
        let inner = &mut self.inner;
        let mut proceed =
            |inv: Invocation<'_>| inner.update(inv.statement, &inv.parameter);
        interceptor.intercept_update(
            Invocation {
                statement: def,
                parameter: param.clone(),
                bounds: RowBounds::DEFAULT,
            },
            &mut proceed,
        )
    }

    fn flush(&mut self) -> SqlBindResult<()> {
        self.inner.flush()
    }

    fn commit(&mut self, required: bool) -> SqlBindResult<()> {
        self.interceptor.on_commit(required);
        self.inner.commit(required)
    }

    fn rollback(&mut self, required: bool) -> SqlBindResult<()> {
        self.interceptor.on_rollback(required);
        self.inner.rollback(required)
    }

    fn close(&mut self, force_rollback: bool) -> SqlBindResult<()> {
        self.inner.close(force_rollback)
    }

    fn clear_local_cache(&mut self) {
        self.inner.clear_local_cache();
    }
}
