//! Statement registry — the immutable catalog of executable statements.
//!
//! Built once during configuration assembly via [`RegistryBuilder`], then
//! frozen into a [`StatementRegistry`] and shared by reference across every
//! session. Reads after construction never block or mutate shared state.

use crate::error::{SqlBindError, SqlBindResult};
use ahash::AHashMap;

/// What a statement does when executed. Insert/update/delete all route
/// through the same underlying update primitive; the kind records intent and
/// drives cache invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl CommandKind {
    /// True for statements that mutate the backend.
    pub fn is_write(&self) -> bool {
        !matches!(self, CommandKind::Select)
    }
}

/// Declared shape of the parameter a statement accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParameterShape {
    /// Anything, including none.
    #[default]
    Any,
    /// A single scalar value.
    Scalar,
    /// Named fields; the listed keys are expected to be present.
    Named(Vec<String>),
}

/// Declared shape of the rows a statement produces, as a hint for the
/// result materializer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResultShape {
    /// Rows pass through the materializer unannotated.
    #[default]
    Row,
    /// Rows materialize into the named logical type.
    Typed(String),
    /// A single affected-row count, no rows.
    AffectedCount,
}

/// One registered, executable statement. Immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementDefinition {
    id: String,
    kind: CommandKind,
    sql: String,
    use_cache: bool,
    parameter_shape: ParameterShape,
    result_shape: ResultShape,
}

impl StatementDefinition {
    pub fn new(id: impl Into<String>, kind: CommandKind, sql: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            sql: sql.into(),
            // Selects are cache-eligible by default; writes never are.
            use_cache: kind == CommandKind::Select,
            parameter_shape: ParameterShape::default(),
            result_shape: ResultShape::default(),
        }
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_parameter_shape(mut self, shape: ParameterShape) -> Self {
        self.parameter_shape = shape;
        self
    }

    pub fn with_result_shape(mut self, shape: ResultShape) -> Self {
        self.result_shape = shape;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    pub fn parameter_shape(&self) -> &ParameterShape {
        &self.parameter_shape
    }

    pub fn result_shape(&self) -> &ResultShape {
        &self.result_shape
    }

    /// Cache namespace: the identifier prefix before the final `.`, i.e.
    /// the bound interface name under the namespacing convention. Statements
    /// without a dot form their own namespace.
    pub fn namespace(&self) -> &str {
        match self.id.rfind('.') {
            Some(idx) => &self.id[..idx],
            None => &self.id,
        }
    }
}

/// One-time, batched statement registration.
///
/// Duplicate identifiers fail immediately; there is no removal operation.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    statements: AHashMap<String, StatementDefinition>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one statement. Fails with
    /// [`SqlBindError::DuplicateStatement`] if the identifier already exists.
    pub fn register(&mut self, definition: StatementDefinition) -> SqlBindResult<&mut Self> {
        let id = definition.id().to_string();
        if self.statements.contains_key(&id) {
            return Err(SqlBindError::DuplicateStatement(id));
        }
        self.statements.insert(id, definition);
        Ok(self)
    }

    /// Freeze into a read-only registry.
    pub fn build(self) -> StatementRegistry {
        StatementRegistry {
            statements: self.statements,
        }
    }
}

/// Immutable identifier → definition catalog, shared across all sessions.
///
/// Construction happens-before every share, so unsynchronized concurrent
/// reads are safe; there is no interior mutability.
#[derive(Debug)]
pub struct StatementRegistry {
    statements: AHashMap<String, StatementDefinition>,
}

impl StatementRegistry {
    /// Look up a statement by identifier. Fails with
    /// [`SqlBindError::UnknownStatement`] carrying the offending identifier.
    pub fn lookup(&self, id: &str) -> SqlBindResult<&StatementDefinition> {
        self.statements
            .get(id)
            .ok_or_else(|| SqlBindError::UnknownStatement(id.to_string()))
    }

    pub fn has_statement(&self, id: &str) -> bool {
        self.statements.contains_key(id)
    }

    /// All registered identifiers, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.statements.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
