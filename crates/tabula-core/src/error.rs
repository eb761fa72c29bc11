//! Engine error type shared by every tabula backend.
//!
//! Backends map their native errors into [`EngineError`] (see
//! `tabula_polars::error::polars_to_core_error`) so callers only ever handle
//! one error type at the compilation boundary.

use thiserror::Error;

/// Unified error type for tabula compilation.
///
/// Every variant is raised while an expression tree is compiled against a
/// concrete schema and backend; nothing is deferred to native execution.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// The operation has no implementation for the active backend.
    #[error("`{operation}` is not supported by the {backend} backend")]
    Unsupported {
        operation: String,
        backend: String,
    },
    /// A parameter value is outside what the function accepts.
    #[error("invalid parameter for `{function}`: {message}")]
    InvalidParameter { function: String, message: String },
    /// User-facing error (invalid input, misuse of an operation).
    #[error("user error: {0}")]
    User(String),
    /// Resource not found (column missing from the schema).
    #[error("not found: {0}")]
    NotFound(String),
    /// Internal / native engine error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn unsupported(operation: impl Into<String>, backend: impl Into<String>) -> Self {
        EngineError::Unsupported {
            operation: operation.into(),
            backend: backend.into(),
        }
    }

    pub fn invalid_parameter(function: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            function: function.into(),
            message: message.into(),
        }
    }

    /// True for capability errors, which callers may want to fall back on.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, EngineError::Unsupported { .. })
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Internal(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
