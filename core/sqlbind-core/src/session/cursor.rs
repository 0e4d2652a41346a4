//! Lazy, forward-only result cursors.
//!
//! A cursor keeps a backend cursor open and yields rows one at a time; it is
//! single-pass and never rewinds. The session that produced a cursor keeps a
//! handle to it so `close()` can release every open cursor even when the
//! caller forgot to.

use crate::error::{SqlBindError, SqlBindResult};
use crate::executor::backend::BackendCursor;
use crate::types::Row;
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared cursor state: the session holds one clone for cleanup, the
/// caller's [`Cursor`] holds the other.
pub(crate) type CursorHandle = Arc<Mutex<CursorState>>;

pub(crate) struct CursorState {
    backend: Option<Box<dyn BackendCursor>>,
}

impl CursorState {
    pub(crate) fn close(&mut self) -> SqlBindResult<()> {
        match self.backend.take() {
            Some(mut cursor) => cursor.close(),
            None => Ok(()),
        }
    }
}

/// Caller-facing lazy result stream.
pub struct Cursor {
    statement: String,
    handle: CursorHandle,
}

impl Cursor {
    pub(crate) fn new(statement: String, backend: Box<dyn BackendCursor>) -> (Self, CursorHandle) {
        let handle = Arc::new(Mutex::new(CursorState {
            backend: Some(backend),
        }));
        (
            Self {
                statement,
                handle: handle.clone(),
            },
            handle,
        )
    }

    /// The statement this cursor was opened for.
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Fetch the next row. Fails with [`SqlBindError::CursorClosed`] once
    /// the cursor has been closed.
    pub fn next_row(&mut self) -> SqlBindResult<Option<Row>> {
        let mut state = self.handle.lock();
        match state.backend.as_mut() {
            Some(cursor) => cursor.next_row(),
            None => Err(SqlBindError::CursorClosed),
        }
    }

    /// Release the backend resources early. Idempotent.
    pub fn close(&mut self) -> SqlBindResult<()> {
        self.handle.lock().close()
    }

    pub fn is_closed(&self) -> bool {
        self.handle.lock().backend.is_none()
    }
}

impl Iterator for Cursor {
    type Item = SqlBindResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        // Session close still covers cursors the caller leaked without
        // dropping; this handles the common early-drop path.
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct CountingCursor {
        rows: std::vec::IntoIter<Row>,
        closed: Arc<std::sync::atomic::AtomicBool>,
    }

    impl BackendCursor for CountingCursor {
        fn next_row(&mut self) -> SqlBindResult<Option<Row>> {
            Ok(self.rows.next())
        }
        fn close(&mut self) -> SqlBindResult<()> {
            self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    fn cursor(rows: Vec<Row>) -> (Cursor, CursorHandle, Arc<std::sync::atomic::AtomicBool>) {
        let closed = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let backend = Box::new(CountingCursor {
            rows: rows.into_iter(),
            closed: closed.clone(),
        });
        let (cursor, handle) = Cursor::new("M.scan".to_string(), backend);
        (cursor, handle, closed)
    }

    #[test]
    fn iterates_rows_in_order() {
        let (cursor, _, _) = cursor(vec![json!(1), json!(2), json!(3)]);
        let rows: Vec<Row> = cursor.map(Result::unwrap).collect();
        assert_eq!(rows, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn read_after_close_fails() {
        let (mut cursor, _, closed) = cursor(vec![json!(1)]);
        cursor.close().unwrap();
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
        assert!(matches!(
            cursor.next_row(),
            Err(SqlBindError::CursorClosed)
        ));
    }

    #[test]
    fn close_through_session_handle_closes_caller_cursor() {
        let (mut cursor, handle, closed) = cursor(vec![json!(1)]);
        handle.lock().close().unwrap();
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
        assert!(cursor.is_closed());
        assert!(matches!(
            cursor.next_row(),
            Err(SqlBindError::CursorClosed)
        ));
    }

    #[test]
    fn drop_releases_backend_cursor() {
        let (cursor, _, closed) = cursor(vec![json!(1)]);
        drop(cursor);
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
    }
}
