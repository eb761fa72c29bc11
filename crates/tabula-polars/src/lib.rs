//! Polars engine for tabula: lowers expression nodes into polars lazy
//! expressions to be used in `LazyFrame::select` / `with_columns`.

pub mod backend;
pub mod error;

pub use backend::PolarsBackend;
pub use error::polars_to_core_error;
