//! Shared helpers for integration tests (sessions, Polars frames, DataFusion batches).
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use datafusion::arrow::array::{Array, ArrayRef, Float64Array, Int64Array};
use datafusion::arrow::compute::cast;
use datafusion::arrow::datatypes::DataType as ArrowDataType;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use polars::prelude::{DataFrame, DataType, IntoLazy};
use tabula::prelude::*;
use tracing_subscriber::EnvFilter;

/// Test-writer subscriber filtered by `RUST_LOG` (warnings by default).
/// Later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Session whose default namespace targets `engine`.
pub fn session(engine: Engine) -> Session {
    init_tracing();
    Session::builder().engine(engine).get_or_create()
}

pub fn schema_of(names: &[&str]) -> StructType {
    StructType::from_names(names.iter().copied())
}

/// Compile `exprs` for Polars and run them as one `select` over `frame`.
pub fn run_polars(frame: DataFrame, exprs: &[Expr]) -> DataFrame {
    let session = session(Engine::Polars);
    let schema = StructType::from_names(
        frame
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string()),
    );
    let natives = session
        .compile_all(exprs, &schema)
        .unwrap()
        .into_polars()
        .unwrap();
    frame.lazy().select(natives).collect().unwrap()
}

/// Column values cast to f64 (booleans become 0.0 / 1.0).
pub fn polars_floats(frame: &DataFrame, name: &str) -> Vec<Option<f64>> {
    frame
        .column(name)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

/// Record batch of nullable Int64 columns.
pub fn int_batch(columns: &[(&str, Vec<Option<i64>>)]) -> RecordBatch {
    RecordBatch::try_from_iter(
        columns
            .iter()
            .map(|(name, values)| (*name, Arc::new(Int64Array::from(values.clone())) as ArrayRef)),
    )
    .unwrap()
}

/// Compile `exprs` for DataFusion, register `batch` as table `t`, execute the
/// query ordered by the `i` column and return every output column as f64.
///
/// `batch` must carry an `i` column holding the row position.
pub async fn run_datafusion(
    batch: RecordBatch,
    exprs: &[Expr],
) -> HashMap<String, Vec<Option<f64>>> {
    let session = session(Engine::DataFusion);
    let ns = session.namespace();
    let names: Vec<String> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let schema = StructType::from_names(names);
    let mut projection = vec![ns.col("i")];
    projection.extend(exprs.iter().cloned());
    let sql = session
        .compile_all(&projection, &schema)
        .unwrap()
        .to_sql("t")
        .unwrap();
    let sql = format!("{sql} ORDER BY \"i\"");

    let ctx = SessionContext::new();
    ctx.register_batch("t", batch).unwrap();
    let batches = ctx
        .sql(&sql)
        .await
        .unwrap_or_else(|e| panic!("{sql}: {e}"))
        .collect()
        .await
        .unwrap_or_else(|e| panic!("{sql}: {e}"));

    let mut out: HashMap<String, Vec<Option<f64>>> = HashMap::new();
    for b in &batches {
        for (idx, field) in b.schema().fields().iter().enumerate() {
            let array = cast(b.column(idx), &ArrowDataType::Float64).unwrap();
            let array = array.as_any().downcast_ref::<Float64Array>().unwrap();
            out.entry(field.name().clone())
                .or_default()
                .extend((0..array.len()).map(|r| array.is_valid(r).then(|| array.value(r))));
        }
    }
    out
}

/// Element-wise comparison with a small tolerance for float results.
pub fn assert_close(actual: &[Option<f64>], expected: &[Option<f64>]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        match (a, e) {
            (Some(a), Some(e)) => assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}"),
            (None, None) => {}
            _ => panic!("{actual:?} vs {expected:?}"),
        }
    }
}
