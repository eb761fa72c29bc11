//! tabula core: expression nodes, window inputs, the backend adapter trait and
//! the generic window algorithms (no engine dependency).

pub mod backend;
pub mod compile;
pub mod config;
pub mod engine;
pub mod error;
pub mod expr;
pub mod lower;
pub mod schema;
pub mod window;

#[cfg(test)]
mod test_backend;

pub use backend::{Backend, Capability, Operation};
pub use compile::Compiler;
pub use config::TabulaConfig;
pub use engine::{Engine, Version};
pub use error::{EngineError, Result};
pub use expr::{Call, Expr, LiteralValue, Operand, RankMethod, WindowFunction};
pub use schema::{DataType, StructField, StructType};
pub use window::{RankSpec, WindowInputs, WindowSpec};
