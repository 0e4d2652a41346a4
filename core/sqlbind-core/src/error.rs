//! Error types for the sqlbind runtime.
//!
//! All public APIs return `SqlBindResult<T>` — no panics in library code.

use thiserror::Error;

/// Unified error type for all sqlbind operations.
#[derive(Debug, Error)]
pub enum SqlBindError {
    /// Malformed settings or invalid assembly-time input
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A statement identifier was registered twice
    #[error("statement '{0}' already registered")]
    DuplicateStatement(String),

    /// No statement exists under the requested identifier
    #[error("statement '{0}' not found")]
    UnknownStatement(String),

    /// An interface method could not be resolved to a statement
    #[error("binding error for method '{method}': {message}")]
    Binding { method: String, message: String },

    /// A statement run failed; carries the failing statement and the cause
    #[error("error executing statement '{statement}' during {activity}: {source}")]
    Execution {
        statement: String,
        activity: String,
        #[source]
        source: Box<SqlBindError>,
    },

    /// Failure reported by the backend connection
    #[error("backend error: {0}")]
    Backend(String),

    /// `select_one` produced more than one row
    #[error("expected one result (or none), but found {found}")]
    TooManyResults { found: usize },

    /// A SQL template referenced a wrapped-parameter key that does not exist
    #[error("parameter '{key}' not found; available parameters are {available:?}")]
    ParameterNotFound {
        key: String,
        available: Vec<String>,
    },

    /// Operation attempted on a closed session
    #[error("session is closed")]
    SessionClosed,

    /// Cursor was read after being closed or fully consumed
    #[error("cursor is closed")]
    CursorClosed,

    /// Typed result materialization failed
    #[error("result deserialization error: {source}")]
    Deserialize {
        #[from]
        source: serde_json::Error,
    },
}

/// Result type alias for all sqlbind operations.
pub type SqlBindResult<T> = Result<T, SqlBindError>;

impl SqlBindError {
    /// Wrap a lower-layer failure with the statement and activity that
    /// produced it. Used at the session boundary so every executor error
    /// surfaces with its context attached.
    pub fn execution(statement: impl Into<String>, activity: impl Into<String>, source: SqlBindError) -> Self {
        SqlBindError::Execution {
            statement: statement.into(),
            activity: activity.into(),
            source: Box::new(source),
        }
    }
}
