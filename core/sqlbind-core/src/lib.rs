//! # sqlbind — SQL-Mapping Execution Runtime
//!
//! sqlbind lets client code invoke plain interface methods and have each
//! call resolve to a named, externally-declared SQL statement, executed
//! against a relational backend, with results converted back into typed
//! objects.
//!
//! ## Architecture
//!
//! ```text
//! proxy call → Session → interceptors → shared cache → primitive → backend
//!                 ↑                                        ↑
//!          statement registry                      local result cache
//! ```
//!
//! - [`registry`] — immutable statement catalog, built once and shared
//! - [`executor`] — execution primitive plus caching/interceptor decorators
//! - [`session`] — the per-transaction unit-of-work facade
//! - [`binding`] — interface → statement dispatch without implementations
//!
//! The physical database driver, the statement-source parser, and the
//! row→object conversion logic stay outside this crate, consumed through
//! the [`executor::Backend`] and [`executor::RowMaterializer`] traits.
//!
//! ## Quick start
//!
//! ```rust
//! use sqlbind_core::binding::{MapperInterface, MapperProxyFactory, MethodSpec};
//! use sqlbind_core::config::Configuration;
//! use sqlbind_core::param::Parameter;
//! use sqlbind_core::registry::{CommandKind, RegistryBuilder, StatementDefinition};
//! use sqlbind_core::session::SessionFactory;
//! use std::sync::Arc;
//! # use sqlbind_core::executor::{Backend, BackendCursor, BackendProvider};
//! # use sqlbind_core::types::{Row, RowBounds};
//! # use sqlbind_core::SqlBindResult;
//! # struct Mem;
//! # impl Backend for Mem {
//! #     fn query(
//! #         &mut self,
//! #         _def: &StatementDefinition,
//! #         _param: &Parameter,
//! #         _bounds: Option<RowBounds>,
//! #     ) -> SqlBindResult<Vec<Row>> {
//! #         Ok(vec![serde_json::json!({"id": 42, "name": "Alice"})])
//! #     }
//! #     fn update(&mut self, _def: &StatementDefinition, _param: &Parameter) -> SqlBindResult<u64> {
//! #         Ok(1)
//! #     }
//! #     fn open_cursor(
//! #         &mut self,
//! #         _def: &StatementDefinition,
//! #         _param: &Parameter,
//! #         _bounds: Option<RowBounds>,
//! #     ) -> SqlBindResult<Box<dyn BackendCursor>> {
//! #         unimplemented!()
//! #     }
//! #     fn commit(&mut self) -> SqlBindResult<()> { Ok(()) }
//! #     fn rollback(&mut self) -> SqlBindResult<()> { Ok(()) }
//! #     fn close(&mut self) -> SqlBindResult<()> { Ok(()) }
//! # }
//! # struct MemProvider;
//! # impl BackendProvider for MemProvider {
//! #     fn connect(&self) -> SqlBindResult<Box<dyn Backend>> { Ok(Box::new(Mem)) }
//! # }
//!
//! # fn main() -> sqlbind_core::SqlBindResult<()> {
//! // Register statements once at assembly time
//! let mut registry = RegistryBuilder::new();
//! registry.register(StatementDefinition::new(
//!     "UserMapper.find_by_id",
//!     CommandKind::Select,
//!     "SELECT id, name FROM users WHERE id = ?",
//! ))?;
//!
//! let factory = SessionFactory::new(
//!     Configuration::new(registry.build()),
//!     Arc::new(MemProvider),
//! );
//!
//! // Describe the interface once; proxies share the method cache
//! let interface = MapperInterface::builder("UserMapper")
//!     .method(MethodSpec::one("find_by_id"))
//!     .build()?;
//! let mappers = MapperProxyFactory::new(interface);
//!
//! let mut session = factory.open_session()?;
//! let mut users = mappers.create_proxy(&mut session);
//! let row = users
//!     .invoke("find_by_id", vec![Parameter::from(42i64)])?
//!     .into_one()?;
//! assert_eq!(row.unwrap()["name"], "Alice");
//! session.close()?;
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod executor;
pub mod param;
pub mod registry;
pub mod session;
pub mod types;

// Logging utilities
pub mod logging;

// Re-export commonly used types
pub use config::{Configuration, Settings};
pub use error::{SqlBindError, SqlBindResult};
pub use param::Parameter;
pub use session::{Cursor, Session, SessionFactory};
pub use types::{ResultHandler, Row, RowBounds};
