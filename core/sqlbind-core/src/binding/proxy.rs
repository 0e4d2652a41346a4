//! Mapper proxies — calls on a described interface become session
//! operations.
//!
//! A [`MapperProxyFactory`] is built once per interface and shared; it owns
//! the method→dispatch cache, which is populated lazily on first invocation
//! of each method and tolerates concurrent population (the winning entry is
//! resolved exactly once). Creating a proxy never fails; unresolvable
//! methods surface a binding error at first call.

use super::interface::{MapperInterface, MethodKind, MethodSpec, ProvidedBody, ReturnShape};
use crate::error::{SqlBindError, SqlBindResult};
use crate::param::{Parameter, StrictMap};
use crate::registry::StatementRegistry;
use crate::session::{Cursor, Session};
use crate::types::{ResultHandler, Row};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Cached outcome of resolving one interface method: either a statement
/// route or a provided body. Decided once, then reused by every proxy from
/// the same factory.
#[derive(Clone)]
enum MethodDispatch {
    Statement {
        spec: Arc<MethodSpec>,
        statement_id: String,
    },
    Provided {
        body: ProvidedBody,
    },
}

/// Creates proxies for one interface and owns their shared method cache.
pub struct MapperProxyFactory {
    interface: Arc<MapperInterface>,
    method_cache: DashMap<String, MethodDispatch>,
    resolutions: AtomicU64,
    next_proxy_id: AtomicU64,
}

impl MapperProxyFactory {
    pub fn new(interface: MapperInterface) -> Self {
        Self {
            interface: Arc::new(interface),
            method_cache: DashMap::new(),
            resolutions: AtomicU64::new(0),
            next_proxy_id: AtomicU64::new(0),
        }
    }

    pub fn interface(&self) -> &MapperInterface {
        &self.interface
    }

    /// How many method resolutions have actually run. Concurrent first
    /// calls for the same method must not inflate this past one per method.
    pub fn resolution_count(&self) -> u64 {
        self.resolutions.load(Ordering::SeqCst)
    }

    /// Create a call-through proxy bound to one session. Never fails —
    /// method resolution is deferred to first invocation.
    pub fn create_proxy<'a>(&'a self, session: &'a mut Session) -> MapperProxy<'a> {
        MapperProxy {
            factory: self,
            session,
            id: self.next_proxy_id.fetch_add(1, Ordering::Relaxed),
        }
    }

    fn dispatch_for(
        &self,
        method: &str,
        registry: &StatementRegistry,
    ) -> SqlBindResult<MethodDispatch> {
        if let Some(cached) = self.method_cache.get(method) {
            return Ok(cached.clone());
        }
        // The entry holds its shard lock while vacant, so a racing first
        // call resolves exactly once; losers read the winner's entry.
        match self.method_cache.entry(method.to_string()) {
            Entry::Occupied(occupied) => Ok(occupied.get().clone()),
            Entry::Vacant(vacant) => {
                let dispatch = self.resolve(method, registry)?;
                vacant.insert(dispatch.clone());
                Ok(dispatch)
            }
        }
    }

    fn resolve(&self, method: &str, registry: &StatementRegistry) -> SqlBindResult<MethodDispatch> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        let signature = self.signature(method);
        debug!(method = %signature, "resolving method binding");

        let spec = self.interface.method(method).ok_or_else(|| SqlBindError::Binding {
            method: signature.clone(),
            message: format!(
                "interface '{}' declares no method '{}'",
                self.interface.name(),
                method
            ),
        })?;

        match spec.kind() {
            MethodKind::Provided(body) => Ok(MethodDispatch::Provided { body: body.clone() }),
            MethodKind::Abstract => {
                let statement_id = self.interface.statement_id(method);
                if !registry.has_statement(&statement_id) {
                    return Err(SqlBindError::Binding {
                        method: signature,
                        message: format!("no statement registered under '{statement_id}'"),
                    });
                }
                Ok(MethodDispatch::Statement {
                    spec: spec.clone(),
                    statement_id,
                })
            }
        }
    }

    fn signature(&self, method: &str) -> String {
        format!("{}::{}", self.interface.name(), method)
    }
}

/// Call-through object for one interface, bound to one session.
///
/// Object identity is the proxy's own: `PartialEq`/`Eq`/`Hash` compare the
/// owning factory and the proxy instance, never a statement — a registered
/// statement named `equals` or `hash` cannot shadow them.
pub struct MapperProxy<'a> {
    factory: &'a MapperProxyFactory,
    session: &'a mut Session,
    id: u64,
}

impl MapperProxy<'_> {
    /// Invoke an interface method with positional arguments.
    pub fn invoke(&mut self, method: &str, args: Vec<Parameter>) -> SqlBindResult<MapperResult> {
        let dispatch = self
            .factory
            .dispatch_for(method, self.session.configuration().registry())?;
        let signature = self.factory.signature(method);

        match dispatch {
            MethodDispatch::Provided { body } => body(self.session, args),
            MethodDispatch::Statement { spec, statement_id } => {
                let param = collapse_args(&spec, args);
                let result = match spec.shape() {
                    ReturnShape::One => self
                        .session
                        .select_one(&statement_id, param)
                        .map(MapperResult::One),
                    ReturnShape::Many => self
                        .session
                        .select_list(&statement_id, param)
                        .map(MapperResult::Many),
                    ReturnShape::KeyedBy(field) => self
                        .session
                        .select_map(&statement_id, param, field)
                        .map(MapperResult::Keyed),
                    ReturnShape::Cursor => self
                        .session
                        .select_cursor(&statement_id, param)
                        .map(MapperResult::Cursor),
                    ReturnShape::Affected => self
                        .session
                        .update(&statement_id, param)
                        .map(MapperResult::Affected),
                    ReturnShape::Unit => self
                        .session
                        .update(&statement_id, param)
                        .map(|_| MapperResult::Unit),
                    ReturnShape::Stream => Err(SqlBindError::Binding {
                        method: signature.clone(),
                        message: "streaming method requires a row handler; call invoke_streaming"
                            .to_string(),
                    }),
                };
                result.map_err(|e| annotate_with_method(e, &signature))
            }
        }
    }

    /// Invoke a streaming method, pushing each row to the supplied handler.
    pub fn invoke_streaming(
        &mut self,
        method: &str,
        args: Vec<Parameter>,
        handler: &mut dyn ResultHandler,
    ) -> SqlBindResult<()> {
        let dispatch = self
            .factory
            .dispatch_for(method, self.session.configuration().registry())?;
        let signature = self.factory.signature(method);

        match dispatch {
            MethodDispatch::Provided { .. } => Err(SqlBindError::Binding {
                method: signature,
                message: "provided methods cannot stream through a row handler".to_string(),
            }),
            MethodDispatch::Statement { spec, statement_id } => {
                if spec.shape() != &ReturnShape::Stream {
                    return Err(SqlBindError::Binding {
                        method: signature,
                        message: "method is not declared as streaming".to_string(),
                    });
                }
                let param = collapse_args(&spec, args);
                self.session
                    .select(&statement_id, param, handler)
                    .map_err(|e| annotate_with_method(e, &signature))
            }
        }
    }

    /// Session the proxy routes through, for provided-body composition.
    pub fn session(&mut self) -> &mut Session {
        self.session
    }
}

impl PartialEq for MapperProxy<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.factory, other.factory) && self.id == other.id
    }
}

impl Eq for MapperProxy<'_> {}

impl Hash for MapperProxy<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.factory as *const MapperProxyFactory as usize).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for MapperProxy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperProxy")
            .field("interface", &self.factory.interface.name())
            .field("id", &self.id)
            .finish()
    }
}

/// Shaped result of a proxy invocation, with typed accessors.
pub enum MapperResult {
    One(Option<Row>),
    Many(Vec<Row>),
    Keyed(BTreeMap<String, Row>),
    Cursor(Cursor),
    Affected(u64),
    Unit,
}

impl MapperResult {
    pub fn into_one(self) -> SqlBindResult<Option<Row>> {
        match self {
            MapperResult::One(row) => Ok(row),
            other => Err(shape_mismatch("single row", &other)),
        }
    }

    pub fn into_many(self) -> SqlBindResult<Vec<Row>> {
        match self {
            MapperResult::Many(rows) => Ok(rows),
            other => Err(shape_mismatch("row list", &other)),
        }
    }

    pub fn into_keyed(self) -> SqlBindResult<BTreeMap<String, Row>> {
        match self {
            MapperResult::Keyed(map) => Ok(map),
            other => Err(shape_mismatch("keyed map", &other)),
        }
    }

    pub fn into_cursor(self) -> SqlBindResult<Cursor> {
        match self {
            MapperResult::Cursor(cursor) => Ok(cursor),
            other => Err(shape_mismatch("cursor", &other)),
        }
    }

    pub fn affected(self) -> SqlBindResult<u64> {
        match self {
            MapperResult::Affected(count) => Ok(count),
            MapperResult::Unit => Ok(0),
            other => Err(shape_mismatch("affected count", &other)),
        }
    }

    /// Deserialize the single row into a typed object.
    pub fn one_as<T: DeserializeOwned>(self) -> SqlBindResult<Option<T>> {
        match self.into_one()? {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    /// Deserialize every row into a typed object.
    pub fn many_as<T: DeserializeOwned>(self) -> SqlBindResult<Vec<T>> {
        self.into_many()?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(Into::into))
            .collect()
    }

    fn shape_name(&self) -> &'static str {
        match self {
            MapperResult::One(_) => "single row",
            MapperResult::Many(_) => "row list",
            MapperResult::Keyed(_) => "keyed map",
            MapperResult::Cursor(_) => "cursor",
            MapperResult::Affected(_) => "affected count",
            MapperResult::Unit => "unit",
        }
    }
}

impl fmt::Debug for MapperResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.shape_name())
    }
}

fn shape_mismatch(expected: &str, actual: &MapperResult) -> SqlBindError {
    SqlBindError::Configuration(format!(
        "expected {expected} result, got {}",
        actual.shape_name()
    ))
}

/// Collapse positional arguments into a single parameter object: zero args
/// is no parameter, one arg passes through unchanged, several collapse into
/// a named map under the declared parameter names (falling back to
/// positional `arg{N}` placeholders).
fn collapse_args(spec: &MethodSpec, args: Vec<Parameter>) -> Parameter {
    let mut args = args;
    match args.len() {
        0 => Parameter::Null,
        1 => args.remove(0),
        _ => {
            let mut map = StrictMap::new();
            for (i, arg) in args.into_iter().enumerate() {
                let name = spec
                    .param_names()
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("arg{i}"));
                map.insert(name, arg.into_value());
            }
            Parameter::Strict(map)
        }
    }
}

/// Keep the error variant, but note the invoking method in its context so
/// callers can still match on the original failure kind.
fn annotate_with_method(error: SqlBindError, signature: &str) -> SqlBindError {
    match error {
        SqlBindError::Execution {
            statement,
            activity,
            source,
        } => SqlBindError::Execution {
            statement,
            activity: format!("{activity} [{signature}]"),
            source,
        },
        other => other,
    }
}
