//! Engine error type for embedders (Polars conversion in this crate).

use polars::error::PolarsError;

pub use tabula_core::EngineError;

/// Map PolarsError to core EngineError at the backend boundary.
pub fn polars_to_core_error(e: PolarsError) -> EngineError {
    let msg = e.to_string();
    match &e {
        PolarsError::ColumnNotFound(_) => EngineError::NotFound(msg),
        PolarsError::InvalidOperation(_) | PolarsError::SchemaMismatch(_) => {
            EngineError::User(msg)
        }
        _ => EngineError::Internal(msg),
    }
}
