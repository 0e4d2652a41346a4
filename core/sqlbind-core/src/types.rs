//! Shared value types — rows, row windows, and streaming handlers.

use crate::error::SqlBindResult;

/// A single materialized result row. Backends produce JSON objects; the
/// result materializer may reshape them before they reach the caller.
pub type Row = serde_json::Value;

/// A window over a result set: skip `offset` rows, then yield at most
/// `limit` rows. Applied by the execution layer unless the backend opts
/// into pushing bounds down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowBounds {
    pub offset: usize,
    pub limit: usize,
}

impl RowBounds {
    /// No offset, unlimited rows.
    pub const DEFAULT: RowBounds = RowBounds {
        offset: 0,
        limit: usize::MAX,
    };

    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// True when this window does not constrain the result set.
    pub fn is_default(&self) -> bool {
        self.offset == 0 && self.limit == usize::MAX
    }
}

impl Default for RowBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Receives rows one at a time from a streaming `select`. The full result
/// set is never materialized on this path.
pub trait ResultHandler {
    fn handle_row(&mut self, row: Row) -> SqlBindResult<()>;
}

/// Handler that appends every row into a caller-owned vector. Convenience
/// for tests and for callers that want streaming semantics with a simple
/// sink.
pub struct VecHandler<'a> {
    rows: &'a mut Vec<Row>,
}

impl<'a> VecHandler<'a> {
    pub fn new(rows: &'a mut Vec<Row>) -> Self {
        Self { rows }
    }
}

impl ResultHandler for VecHandler<'_> {
    fn handle_row(&mut self, row: Row) -> SqlBindResult<()> {
        self.rows.push(row);
        Ok(())
    }
}
