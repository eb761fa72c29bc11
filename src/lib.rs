//! tabula - backend-agnostic expression compilation with window push-down.
//!
//! Build expressions once through a [`Namespace`], then compile them for
//! Polars or for a SQL engine (DuckDB, Spark SQL, DataFusion). Window
//! operations (`cum_sum`, `rolling_mean`, `rank`, ...) become window
//! expressions over the keys given to [`Expr::over`] on every engine.
//!
//! ```
//! use tabula::prelude::*;
//!
//! let session = Session::builder().engine(Engine::DuckDb).get_or_create();
//! let ns = session.namespace();
//! let running = ns.col("amount").cum_sum(false).over_columns(&["account"], &["ts"]);
//! let schema = StructType::from_names(["account", "ts", "amount"]);
//! let sql = session.compile(&running, &schema).unwrap().to_sql("ledger").unwrap();
//! assert!(sql.contains("OVER (PARTITION BY \"account\" ORDER BY \"ts\""));
//! ```

pub mod namespace;
pub mod prelude;
pub mod registry;
pub mod session;

pub use namespace::Namespace;
pub use registry::{Registry, Resolved};
pub use session::{Compiled, Session, SessionBuilder};

pub use tabula_core::{
    Backend, Capability, Compiler, Engine, EngineError, Expr, LiteralValue, Operand, Operation,
    RankMethod, Result, StructField, StructType, TabulaConfig, Version,
};
pub use tabula_polars::PolarsBackend;
pub use tabula_sql::{Dialect, SqlBackend, SqlExpr};
