//! The opaque backend seam.
//!
//! The runtime never talks to a wire protocol itself. Everything physical —
//! connections, transactions, driver-level statement execution — sits behind
//! [`Backend`], and row→typed-object conversion sits behind
//! [`RowMaterializer`]. Both are supplied at assembly time.

use crate::error::SqlBindResult;
use crate::param::Parameter;
use crate::registry::StatementDefinition;
use crate::types::{Row, RowBounds};

/// Transaction-scoped execution capability, one per session.
///
/// `bounds` is `Some` only when the backend reported it can push the row
/// window down (see [`Backend::supports_bounds_pushdown`]); otherwise the
/// execution layer applies the window itself and the backend sees the full
/// statement.
pub trait Backend: Send {
    /// Run a read statement, returning raw rows.
    fn query(
        &mut self,
        def: &StatementDefinition,
        param: &Parameter,
        bounds: Option<RowBounds>,
    ) -> SqlBindResult<Vec<Row>>;

    /// Run a write statement, returning the affected-row count.
    fn update(&mut self, def: &StatementDefinition, param: &Parameter) -> SqlBindResult<u64>;

    /// Open a streaming cursor over a read statement.
    fn open_cursor(
        &mut self,
        def: &StatementDefinition,
        param: &Parameter,
        bounds: Option<RowBounds>,
    ) -> SqlBindResult<Box<dyn BackendCursor>>;

    /// Whether this backend applies `RowBounds` itself.
    fn supports_bounds_pushdown(&self) -> bool {
        false
    }

    fn commit(&mut self) -> SqlBindResult<()>;

    fn rollback(&mut self) -> SqlBindResult<()>;

    /// Release the underlying connection.
    fn close(&mut self) -> SqlBindResult<()>;
}

/// A forward-only stream of raw rows held open against the backend.
pub trait BackendCursor: Send {
    /// Fetch the next row, or `None` once exhausted.
    fn next_row(&mut self) -> SqlBindResult<Option<Row>>;

    /// Release the backend resources behind this cursor.
    fn close(&mut self) -> SqlBindResult<()>;
}

/// Hands out one backend connection per session.
pub trait BackendProvider: Send + Sync {
    fn connect(&self) -> SqlBindResult<Box<dyn Backend>>;
}

/// Row → typed-object conversion capability, invoked by the execution
/// primitive on every row before it reaches a cache or the caller. The
/// runtime orchestrates when conversion happens, not how.
pub trait RowMaterializer: Send + Sync {
    fn materialize(&self, def: &StatementDefinition, raw: Row) -> SqlBindResult<Row>;
}

/// Pass-through materializer: backend rows are already in their final shape.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectMaterializer;

impl RowMaterializer for DirectMaterializer {
    fn materialize(&self, _def: &StatementDefinition, raw: Row) -> SqlBindResult<Row> {
        Ok(raw)
    }
}
