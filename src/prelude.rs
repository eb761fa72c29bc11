//! One-stop prelude for application code.
//!
//! Use `use tabula::prelude::*` to get the session, namespace and expression
//! types. Backend internals live in the `tabula-core`, `tabula-sql` and
//! `tabula-polars` crates.

pub use crate::namespace::Namespace;
pub use crate::session::{Compiled, Session, SessionBuilder};
pub use tabula_core::{
    DataType, Engine, EngineError, Expr, LiteralValue, Operand, RankMethod, Result, StructField,
    StructType, TabulaConfig, Version,
};
pub use tabula_sql::Dialect;
