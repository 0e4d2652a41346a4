//! Shared in-memory mock backend for integration tests.
//!
//! Rows are canned per statement identifier; every backend call is tallied
//! in shared state so tests can assert exactly what reached the "database".
//! Individual cursors can be rigged to fail on close.

#![allow(dead_code)]

use parking_lot::Mutex;
use sqlbind_core::error::{SqlBindError, SqlBindResult};
use sqlbind_core::executor::{Backend, BackendCursor, BackendProvider};
use sqlbind_core::param::Parameter;
use sqlbind_core::registry::StatementDefinition;
use sqlbind_core::types::{Row, RowBounds};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Default)]
pub struct BackendState {
    pub rows: HashMap<String, Vec<Row>>,
    pub update_result: u64,
    pub query_count: usize,
    pub update_count: usize,
    pub commit_count: usize,
    pub rollback_count: usize,
    pub close_count: usize,
    pub cursors_opened: usize,
    /// Cursor indexes (by open order) whose close call fails.
    pub failing_cursor_closes: HashSet<usize>,
    /// Cursor indexes whose close was attempted.
    pub cursor_close_attempts: Vec<usize>,
    /// Cursor indexes whose close succeeded.
    pub cursors_closed: Vec<usize>,
}

pub type SharedState = Arc<Mutex<BackendState>>;

pub struct MockBackend {
    state: SharedState,
}

pub struct MockCursor {
    rows: std::vec::IntoIter<Row>,
    index: usize,
    state: SharedState,
}

impl BackendCursor for MockCursor {
    fn next_row(&mut self) -> SqlBindResult<Option<Row>> {
        Ok(self.rows.next())
    }

    fn close(&mut self) -> SqlBindResult<()> {
        let mut state = self.state.lock();
        if state.cursor_close_attempts.contains(&self.index) {
            return Ok(()); // already closed
        }
        state.cursor_close_attempts.push(self.index);
        if state.failing_cursor_closes.contains(&self.index) {
            return Err(SqlBindError::Backend(format!(
                "cursor {} failed to close",
                self.index
            )));
        }
        state.cursors_closed.push(self.index);
        Ok(())
    }
}

impl Backend for MockBackend {
    fn query(
        &mut self,
        def: &StatementDefinition,
        _param: &Parameter,
        _bounds: Option<RowBounds>,
    ) -> SqlBindResult<Vec<Row>> {
        let mut state = self.state.lock();
        state.query_count += 1;
        Ok(state.rows.get(def.id()).cloned().unwrap_or_default())
    }

    fn update(&mut self, _def: &StatementDefinition, _param: &Parameter) -> SqlBindResult<u64> {
        let mut state = self.state.lock();
        state.update_count += 1;
        Ok(state.update_result)
    }

    fn open_cursor(
        &mut self,
        def: &StatementDefinition,
        _param: &Parameter,
        _bounds: Option<RowBounds>,
    ) -> SqlBindResult<Box<dyn BackendCursor>> {
        let mut state = self.state.lock();
        let index = state.cursors_opened;
        state.cursors_opened += 1;
        let rows = state.rows.get(def.id()).cloned().unwrap_or_default();
        Ok(Box::new(MockCursor {
            rows: rows.into_iter(),
            index,
            state: self.state.clone(),
        }))
    }

    fn commit(&mut self) -> SqlBindResult<()> {
        self.state.lock().commit_count += 1;
        Ok(())
    }

    fn rollback(&mut self) -> SqlBindResult<()> {
        self.state.lock().rollback_count += 1;
        Ok(())
    }

    fn close(&mut self) -> SqlBindResult<()> {
        self.state.lock().close_count += 1;
        Ok(())
    }
}

pub struct MockProvider {
    state: SharedState,
}

impl BackendProvider for MockProvider {
    fn connect(&self) -> SqlBindResult<Box<dyn Backend>> {
        Ok(Box::new(MockBackend {
            state: self.state.clone(),
        }))
    }
}

/// Build a provider whose backend serves the given rows per statement.
pub fn mock_provider(rows: &[(&str, Vec<Row>)]) -> (Arc<MockProvider>, SharedState) {
    let state: SharedState = Arc::new(Mutex::new(BackendState {
        rows: rows
            .iter()
            .map(|(id, rows)| (id.to_string(), rows.clone()))
            .collect(),
        update_result: 1,
        ..BackendState::default()
    }));
    (
        Arc::new(MockProvider {
            state: state.clone(),
        }),
        state,
    )
}
