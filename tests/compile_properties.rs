//! Compilation properties that hold on every engine: push-down, naming,
//! idempotence and error reporting.

mod common;

use common::{schema_of, session};
use tabula::prelude::*;
use tabula::{Compiler, SqlBackend};

fn sql(session: &Session, expr: &Expr, names: &[&str]) -> Vec<String> {
    session
        .compile(expr, &schema_of(names))
        .unwrap()
        .sql_columns()
        .unwrap()
}

#[test]
fn pushdown_ops_commute_with_over() {
    let session = session(Engine::DuckDb);
    let ns = session.namespace();
    let running = ns.col("a").cum_sum(false);
    let outer = ((running.clone() + 1).abs() * ns.col("b")).over_columns(&["g"], &["i"]);
    let inner = (running.over_columns(&["g"], &["i"]) + 1).abs() * ns.col("b");
    let names = ["a", "b", "g", "i"];
    assert_eq!(sql(&session, &outer, &names), sql(&session, &inner, &names));
}

#[test]
fn over_is_idempotent() {
    let ns = session(Engine::SparkSql).namespace();
    let once = ns.col("a").rank(RankMethod::Dense, false).over_columns(&["g"], &[]);
    let twice = once.over_columns(&["g"], &[]);
    assert_eq!(once, twice);
}

#[test]
fn alias_transforms_apply_in_call_order() {
    let session = session(Engine::DuckDb);
    let ns = session.namespace();
    let schema = schema_of(&["a", "b"]);
    let upper_then_prefix = ns.cols(["a", "b"]).name_to_uppercase().name_prefix("x_");
    let prefix_then_upper = ns.cols(["a", "b"]).name_prefix("x_").name_to_uppercase();
    assert_eq!(
        session.compile(&upper_then_prefix, &schema).unwrap().names(),
        ["x_A", "x_B"]
    );
    assert_eq!(
        session.compile(&prefix_then_upper, &schema).unwrap().names(),
        ["X_A", "X_B"]
    );
}

#[test]
fn alias_on_multiple_outputs_is_a_user_error() {
    let session = session(Engine::DuckDb);
    let e = session.namespace().cols(["a", "b"]).alias("c");
    let err = session.compile(&e, &schema_of(&["a", "b"])).unwrap_err();
    assert!(matches!(err, EngineError::User(_)), "{err}");
}

#[test]
fn rolling_ddof_error_names_function_and_value() {
    let session = session(Engine::DuckDb);
    let e = session
        .namespace()
        .col("a")
        .rolling_std(3, None, false, 2)
        .over_columns(&[], &["i"]);
    let err = session.compile(&e, &schema_of(&["a", "i"])).unwrap_err();
    assert!(matches!(err, EngineError::InvalidParameter { .. }));
    let message = err.to_string();
    assert!(message.contains("rolling_std"), "{message}");
    assert!(message.contains("ddof=2"), "{message}");
}

#[test]
fn order_dependent_op_needs_over() {
    let session = session(Engine::DataFusion);
    let e = session.namespace().col("a").cum_sum(false);
    let err = session.compile(&e, &schema_of(&["a"])).unwrap_err();
    assert!(matches!(err, EngineError::User(ref m) if m.contains("cum_sum")), "{err}");
}

#[test]
fn capabilities_are_checked_before_columns_resolve() {
    let session = session(Engine::DuckDb);
    let ns = session.namespace();
    let e = ns.col("a").arg_max() + ns.col("missing");
    let err = session.compile(&e, &schema_of(&["a"])).unwrap_err();
    assert_eq!(err, EngineError::unsupported("arg_max", "duckdb"));
}

#[test]
fn missing_columns_are_reported_unless_validation_is_off() {
    let strict = session(Engine::DuckDb);
    let e = strict.namespace().col("missing");
    assert!(matches!(
        strict.compile(&e, &schema_of(&["a"])),
        Err(EngineError::NotFound(_))
    ));
    let lax = Session::builder()
        .engine(Engine::DuckDb)
        .validate_column_names(false)
        .get_or_create();
    assert_eq!(sql(&lax, &e, &["a"]), ["\"missing\" AS \"missing\""]);
}

#[test]
fn engine_mismatch_is_a_user_error() {
    let polars_expr = session(Engine::Polars).namespace().col("a");
    let backend = SqlBackend::new(Dialect::DuckDb);
    let schema = schema_of(&["a"]);
    let config = TabulaConfig::default();
    let err = Compiler::new(&backend, &schema, &config)
        .compile(&polars_expr)
        .unwrap_err();
    assert!(matches!(err, EngineError::User(_)));
}

#[test]
fn partitioned_rank_null_placement_follows_config() {
    let default = session(Engine::DuckDb);
    let e = default
        .namespace()
        .col("a")
        .rank(RankMethod::Ordinal, false)
        .over_columns(&[], &["b"]);
    let names = ["a", "b"];
    let out = sql(&default, &e, &names).remove(0);
    assert!(out.contains("ORDER BY \"a\" ASC NULLS LAST, \"b\" ASC NULLS FIRST"), "{out}");

    let shimmed = Session::builder()
        .engine(Engine::DuckDb)
        .partitioned_rank_nulls_last(true)
        .get_or_create();
    let out = sql(&shimmed, &e, &names).remove(0);
    assert!(out.contains("ORDER BY \"a\" ASC NULLS LAST, \"b\" ASC NULLS LAST"), "{out}");
}

#[test]
fn session_config_from_json() {
    let config =
        TabulaConfig::from_json(r#"{"default_engine": "sparksql", "validate_column_names": false}"#)
            .unwrap();
    let session = Session::builder().config(config).get_or_create();
    let e = session.namespace().col("x").shift(2).over_columns(&["g"], &["t"]);
    let out = sql(&session, &e, &["g", "t"]);
    assert_eq!(
        out,
        ["lag(`x`, 2) OVER (PARTITION BY `g` ORDER BY `t` ASC NULLS FIRST) AS `x`"]
    );
}
