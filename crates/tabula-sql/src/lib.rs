//! SQL-text engines for tabula.
//!
//! Expressions lower into [`SqlExpr`] trees, rendered per [`Dialect`]. The
//! caller owns query assembly; [`SqlBackend::select_sql`] covers the common
//! projection case.

pub mod ast;
pub mod backend;
pub mod dialect;

pub use ast::{Frame, OrderKey, SqlExpr, WindowClause};
pub use backend::SqlBackend;
pub use dialect::{Dialect, Spelling};
