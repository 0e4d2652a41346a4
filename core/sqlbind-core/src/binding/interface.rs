//! Mapper interface descriptors.
//!
//! Rust has no runtime proxy generation, so a bound interface is described
//! explicitly: a qualified name plus one [`MethodSpec`] per method. Abstract
//! methods route to a registered statement derived from
//! `"{interface}.{method}"`; provided methods carry their own body and never
//! touch the statement registry. Method names must be unique within one
//! interface — overloading is rejected at build time.

use super::proxy::MapperResult;
use crate::error::{SqlBindError, SqlBindResult};
use crate::param::Parameter;
use crate::session::Session;
use ahash::AHashMap;
use std::fmt;
use std::sync::Arc;

/// Body of a provided (non-abstract) interface method.
pub type ProvidedBody =
    Arc<dyn Fn(&mut Session, Vec<Parameter>) -> SqlBindResult<MapperResult> + Send + Sync>;

/// How a method's return value is shaped from its statement's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnShape {
    /// At most one row.
    One,
    /// An eagerly materialized ordered sequence.
    Many,
    /// Rows re-keyed by the named field, last row wins per key.
    KeyedBy(String),
    /// A lazy single-pass cursor.
    Cursor,
    /// Rows pushed to a caller-supplied handler; nothing returned.
    Stream,
    /// Affected-row count of a write.
    Affected,
    /// A write whose count the caller discards.
    Unit,
}

/// Abstract methods dispatch to a statement; provided methods run their own
/// body. Decided once per method and cached.
#[derive(Clone)]
pub enum MethodKind {
    Abstract,
    Provided(ProvidedBody),
}

impl fmt::Debug for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodKind::Abstract => f.write_str("Abstract"),
            MethodKind::Provided(_) => f.write_str("Provided(..)"),
        }
    }
}

/// One interface method signature.
#[derive(Debug, Clone)]
pub struct MethodSpec {
    name: String,
    param_names: Vec<String>,
    shape: ReturnShape,
    kind: MethodKind,
}

impl MethodSpec {
    fn abstract_method(name: impl Into<String>, shape: ReturnShape) -> Self {
        Self {
            name: name.into(),
            param_names: Vec::new(),
            shape,
            kind: MethodKind::Abstract,
        }
    }

    /// Single-row select.
    pub fn one(name: impl Into<String>) -> Self {
        Self::abstract_method(name, ReturnShape::One)
    }

    /// List select.
    pub fn many(name: impl Into<String>) -> Self {
        Self::abstract_method(name, ReturnShape::Many)
    }

    /// Keyed-map select; `key_field` names the row field used as map key.
    pub fn keyed_by(name: impl Into<String>, key_field: impl Into<String>) -> Self {
        Self::abstract_method(name, ReturnShape::KeyedBy(key_field.into()))
    }

    /// Cursor select.
    pub fn cursor(name: impl Into<String>) -> Self {
        Self::abstract_method(name, ReturnShape::Cursor)
    }

    /// Streaming select taking a trailing row handler.
    pub fn streaming(name: impl Into<String>) -> Self {
        Self::abstract_method(name, ReturnShape::Stream)
    }

    /// Write returning its affected-row count.
    pub fn affected(name: impl Into<String>) -> Self {
        Self::abstract_method(name, ReturnShape::Affected)
    }

    /// Write whose count is discarded.
    pub fn unit(name: impl Into<String>) -> Self {
        Self::abstract_method(name, ReturnShape::Unit)
    }

    /// Method with a default body, executed directly and never routed
    /// through the statement registry.
    pub fn provided<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut Session, Vec<Parameter>) -> SqlBindResult<MapperResult> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            param_names: Vec::new(),
            shape: ReturnShape::One,
            kind: MethodKind::Provided(Arc::new(body)),
        }
    }

    /// Declare parameter names used when multiple arguments collapse into a
    /// named map. Unnamed positions fall back to `arg0`, `arg1`, …
    pub fn with_param_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.param_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn shape(&self) -> &ReturnShape {
        &self.shape
    }

    pub fn kind(&self) -> &MethodKind {
        &self.kind
    }
}

/// A fully described interface, ready to be bound through a proxy factory.
#[derive(Debug)]
pub struct MapperInterface {
    name: String,
    methods: AHashMap<String, Arc<MethodSpec>>,
}

impl MapperInterface {
    pub fn builder(name: impl Into<String>) -> InterfaceBuilder {
        InterfaceBuilder {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self, name: &str) -> Option<&Arc<MethodSpec>> {
        self.methods.get(name)
    }

    /// Derived statement identifier for one of this interface's methods.
    pub fn statement_id(&self, method: &str) -> String {
        format!("{}.{}", self.name, method)
    }
}

/// Collects method specs and validates them as a set.
pub struct InterfaceBuilder {
    name: String,
    methods: Vec<MethodSpec>,
}

impl InterfaceBuilder {
    pub fn method(mut self, spec: MethodSpec) -> Self {
        self.methods.push(spec);
        self
    }

    /// Fails with a configuration error on duplicate method names —
    /// overloaded methods would make the derived statement identifier
    /// ambiguous.
    pub fn build(self) -> SqlBindResult<MapperInterface> {
        let mut methods = AHashMap::with_capacity(self.methods.len());
        for spec in self.methods {
            let name = spec.name().to_string();
            if methods.insert(name.clone(), Arc::new(spec)).is_some() {
                return Err(SqlBindError::Configuration(format!(
                    "duplicate method '{}' on interface '{}'; method names must be unique",
                    name, self.name
                )));
            }
        }
        Ok(MapperInterface {
            name: self.name,
            methods,
        })
    }
}
