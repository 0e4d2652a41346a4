//! End-to-end interface binding: lazy method resolution, the shared method
//! cache under concurrency, return shaping, and provided method bodies.

mod common;

use common::mock_provider;
use serde_json::json;
use sqlbind_core::binding::{MapperInterface, MapperProxyFactory, MapperResult, MethodSpec};
use sqlbind_core::config::Configuration;
use sqlbind_core::error::SqlBindError;
use sqlbind_core::param::Parameter;
use sqlbind_core::registry::{CommandKind, RegistryBuilder, StatementDefinition};
use sqlbind_core::session::SessionFactory;
use sqlbind_core::types::{Row, VecHandler};
use std::sync::Barrier;

fn user_registry() -> RegistryBuilder {
    let mut builder = RegistryBuilder::new();
    for (method, kind, sql) in [
        ("find_by_id", CommandKind::Select, "SELECT * FROM users WHERE id = ?"),
        ("find_all", CommandKind::Select, "SELECT * FROM users"),
        ("by_region", CommandKind::Select, "SELECT * FROM users ORDER BY region"),
        ("scan", CommandKind::Select, "SELECT * FROM users"),
        ("export", CommandKind::Select, "SELECT * FROM users"),
        ("rename", CommandKind::Update, "UPDATE users SET name = ? WHERE id = ?"),
        ("purge", CommandKind::Delete, "DELETE FROM users"),
    ] {
        builder
            .register(StatementDefinition::new(
                format!("UserMapper.{method}"),
                kind,
                sql,
            ))
            .unwrap();
    }
    builder
}

fn user_interface() -> MapperInterface {
    MapperInterface::builder("UserMapper")
        .method(MethodSpec::one("find_by_id").with_param_names(["id"]))
        .method(MethodSpec::many("find_all"))
        .method(MethodSpec::keyed_by("by_region", "region"))
        .method(MethodSpec::cursor("scan"))
        .method(MethodSpec::streaming("export"))
        .method(
            MethodSpec::affected("rename").with_param_names(["id", "name"]),
        )
        .method(MethodSpec::unit("purge"))
        .build()
        .unwrap()
}

fn user_rows() -> Vec<Row> {
    vec![
        json!({"id": 1, "name": "Alice", "region": "east"}),
        json!({"id": 2, "name": "Bob", "region": "west"}),
    ]
}

fn user_factory(rows: &[(&str, Vec<Row>)]) -> (SessionFactory, common::SharedState) {
    let (provider, state) = mock_provider(rows);
    let config = Configuration::new(user_registry().build());
    (SessionFactory::new(config, provider), state)
}

#[test]
fn proxy_call_dispatches_to_registered_statement() {
    let (factory, _state) = user_factory(&[(
        "UserMapper.find_by_id",
        vec![json!({"id": 1, "name": "Alice"})],
    )]);
    let mappers = MapperProxyFactory::new(user_interface());

    let mut session = factory.open_session().unwrap();
    let mut users = mappers.create_proxy(&mut session);
    let row = users
        .invoke("find_by_id", vec![Parameter::from(1i64)])
        .unwrap()
        .into_one()
        .unwrap();
    assert_eq!(row.unwrap()["name"], "Alice");

    session.close().unwrap();
}

#[test]
fn unresolvable_method_fails_at_call_time_not_creation() {
    let (provider, _state) = mock_provider(&[]);
    // Empty registry: nothing for the interface to bind to.
    let config = Configuration::new(RegistryBuilder::new().build());
    let factory = SessionFactory::new(config, provider);
    let mappers = MapperProxyFactory::new(user_interface());

    let mut session = factory.open_session().unwrap();
    // Creation succeeds regardless of the registry's contents.
    let mut users = mappers.create_proxy(&mut session);

    let err = users.invoke("find_all", vec![]).unwrap_err();
    assert!(matches!(
        err,
        SqlBindError::Binding { ref method, ref message }
            if method == "UserMapper::find_all"
                && message.contains("UserMapper.find_all")
    ));

    // Methods the interface never declared are binding errors too.
    let err = users.invoke("nonexistent", vec![]).unwrap_err();
    assert!(matches!(err, SqlBindError::Binding { .. }));

    session.close().unwrap();
}

#[test]
fn binding_failures_are_not_cached() {
    let (provider, _state) = mock_provider(&[]);
    let config = Configuration::new(RegistryBuilder::new().build());
    let factory = SessionFactory::new(config, provider);
    let mappers = MapperProxyFactory::new(user_interface());

    let mut session = factory.open_session().unwrap();
    let mut users = mappers.create_proxy(&mut session);
    users.invoke("find_all", vec![]).unwrap_err();
    users.invoke("find_all", vec![]).unwrap_err();
    // Each failed call re-attempts resolution.
    assert_eq!(mappers.resolution_count(), 2);

    session.close().unwrap();
}

#[test]
fn concurrent_first_calls_resolve_each_method_once() {
    let (factory, _state) = user_factory(&[(
        "UserMapper.find_by_id",
        vec![json!({"id": 1, "name": "Alice"})],
    )]);
    let mappers = MapperProxyFactory::new(user_interface());
    let barrier = Barrier::new(8);

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let mut session = factory.open_session().unwrap();
                barrier.wait();
                let mut users = mappers.create_proxy(&mut session);
                let row = users
                    .invoke("find_by_id", vec![Parameter::from(1i64)])
                    .unwrap()
                    .into_one()
                    .unwrap();
                assert!(row.is_some());
                session.close().unwrap();
            });
        }
    });

    assert_eq!(mappers.resolution_count(), 1);
}

#[test]
fn return_shapes_map_to_session_operations() {
    let (factory, state) = user_factory(&[
        ("UserMapper.find_all", user_rows()),
        ("UserMapper.by_region", user_rows()),
        ("UserMapper.scan", user_rows()),
    ]);
    state.lock().update_result = 3;
    let mappers = MapperProxyFactory::new(user_interface());

    let mut session = factory.open_session().unwrap();
    let mut users = mappers.create_proxy(&mut session);

    let all = users.invoke("find_all", vec![]).unwrap().into_many().unwrap();
    assert_eq!(all.len(), 2);

    let by_region = users
        .invoke("by_region", vec![])
        .unwrap()
        .into_keyed()
        .unwrap();
    assert_eq!(by_region["east"]["name"], "Alice");
    assert_eq!(by_region["west"]["name"], "Bob");

    let cursor = users.invoke("scan", vec![]).unwrap().into_cursor().unwrap();
    let scanned: Vec<Row> = cursor.map(Result::unwrap).collect();
    assert_eq!(scanned.len(), 2);

    let affected = users
        .invoke(
            "rename",
            vec![Parameter::from(1i64), Parameter::from("Carol")],
        )
        .unwrap()
        .affected()
        .unwrap();
    assert_eq!(affected, 3);

    assert!(matches!(
        users.invoke("purge", vec![]).unwrap(),
        MapperResult::Unit
    ));

    session.commit(false).unwrap();
    session.close().unwrap();
}

#[test]
fn streaming_method_requires_the_streaming_entry_point() {
    let (factory, _state) = user_factory(&[("UserMapper.export", user_rows())]);
    let mappers = MapperProxyFactory::new(user_interface());

    let mut session = factory.open_session().unwrap();
    let mut users = mappers.create_proxy(&mut session);

    let err = users.invoke("export", vec![]).unwrap_err();
    assert!(matches!(err, SqlBindError::Binding { .. }));

    let mut rows = Vec::new();
    users
        .invoke_streaming("export", vec![], &mut VecHandler::new(&mut rows))
        .unwrap();
    assert_eq!(rows.len(), 2);

    // Non-streaming methods reject the streaming entry point.
    let err = users
        .invoke_streaming("find_all", vec![], &mut VecHandler::new(&mut rows))
        .unwrap_err();
    assert!(matches!(err, SqlBindError::Binding { .. }));

    session.close().unwrap();
}

#[test]
fn provided_method_composes_other_session_operations() {
    let interface = MapperInterface::builder("UserMapper")
        .method(MethodSpec::many("find_all"))
        .method(MethodSpec::provided("count_all", |session, _args| {
            let rows = session.select_list("UserMapper.find_all", Parameter::Null)?;
            Ok(MapperResult::Affected(rows.len() as u64))
        }))
        .build()
        .unwrap();
    let (factory, _state) = user_factory(&[("UserMapper.find_all", user_rows())]);
    let mappers = MapperProxyFactory::new(interface);

    let mut session = factory.open_session().unwrap();
    let mut users = mappers.create_proxy(&mut session);
    let count = users.invoke("count_all", vec![]).unwrap().affected().unwrap();
    assert_eq!(count, 2);

    session.close().unwrap();
}

#[test]
fn typed_results_deserialize_through_serde() {
    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct User {
        id: i64,
        name: String,
        region: String,
    }

    let (factory, _state) = user_factory(&[("UserMapper.find_all", user_rows())]);
    let mappers = MapperProxyFactory::new(user_interface());

    let mut session = factory.open_session().unwrap();
    let mut users = mappers.create_proxy(&mut session);
    let typed: Vec<User> = users.invoke("find_all", vec![]).unwrap().many_as().unwrap();
    assert_eq!(typed[0].name, "Alice");
    assert_eq!(typed[1].region, "west");

    session.close().unwrap();
}

#[test]
fn cardinality_failures_keep_their_variant_through_the_proxy() {
    let (factory, _state) = user_factory(&[(
        "UserMapper.find_all",
        vec![json!({"id": 1}), json!({"id": 2})],
    )]);
    let interface = MapperInterface::builder("UserMapper")
        .method(MethodSpec::one("find_all"))
        .build()
        .unwrap();
    let mappers = MapperProxyFactory::new(interface);

    let mut session = factory.open_session().unwrap();
    let mut users = mappers.create_proxy(&mut session);

    // Two rows through a single-row method: the cardinality error keeps its
    // variant so callers can still match on it.
    let err = users.invoke("find_all", vec![]).unwrap_err();
    assert!(matches!(err, SqlBindError::TooManyResults { found: 2 }));

    session.close().unwrap();
}

#[test]
fn proxy_identity_is_per_instance() {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let (factory, _state) = user_factory(&[]);
    let mappers = MapperProxyFactory::new(user_interface());

    let mut s1 = factory.open_session().unwrap();
    let mut s2 = factory.open_session().unwrap();
    let p1 = mappers.create_proxy(&mut s1);
    let p2 = mappers.create_proxy(&mut s2);

    assert_ne!(p1, p2);
    assert_eq!(p1, p1);

    let mut h1 = DefaultHasher::new();
    let mut h2 = DefaultHasher::new();
    p1.hash(&mut h1);
    p2.hash(&mut h2);
    assert_ne!(h1.finish(), h2.finish());

    drop(p1);
    drop(p2);
    s1.close().unwrap();
    s2.close().unwrap();
}
