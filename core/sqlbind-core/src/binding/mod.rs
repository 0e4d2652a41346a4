//! Interface binding — plain interface methods resolved to registered
//! statements.
//!
//! There is no implementing class and no code generation: an interface is
//! described once ([`MapperInterface`]), a [`MapperProxyFactory`] is built
//! from it, and every proxy call routes through the factory's cached
//! method→statement dispatch table into a session operation.

pub mod interface;
pub mod proxy;

pub use interface::{
    InterfaceBuilder, MapperInterface, MethodKind, MethodSpec, ProvidedBody, ReturnShape,
};
pub use proxy::{MapperProxy, MapperProxyFactory, MapperResult};
