//! Expression constructors bound to one engine and API version.

use tabula_core::expr::{HorizontalOp, Selection};
use tabula_core::{Engine, Expr, LiteralValue, Result, Version};

/// Entry point for building [`Expr`] nodes. Every node created here carries
/// the namespace's engine and version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Namespace {
    engine: Engine,
    version: Version,
}

impl Namespace {
    pub fn new(engine: Engine, version: Version) -> Self {
        Namespace { engine, version }
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Reference a single column by name.
    pub fn col(&self, name: &str) -> Expr {
        Expr::columns([name], self.engine, self.version)
    }

    /// Reference several columns; the node has one output per name.
    pub fn cols<I, S>(&self, names: I) -> Expr
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Expr::columns(names, self.engine, self.version)
    }

    /// Every column of the input schema, in schema order.
    pub fn all(&self) -> Expr {
        Expr::selection(Selection::All, self.engine, self.version)
    }

    /// Every column except the named ones.
    pub fn exclude<I, S>(&self, names: I) -> Expr
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Expr::selection(
            Selection::Exclude(names.into_iter().map(Into::into).collect()),
            self.engine,
            self.version,
        )
    }

    /// Columns by position; negative indices count from the end.
    pub fn nth(&self, indices: impl IntoIterator<Item = i64>) -> Expr {
        Expr::selection(
            Selection::Indices(indices.into_iter().collect()),
            self.engine,
            self.version,
        )
    }

    pub fn lit(&self, value: impl Into<LiteralValue>) -> Expr {
        Expr::literal(value, self.engine, self.version)
    }

    pub fn sum_horizontal(&self, exprs: Vec<Expr>) -> Result<Expr> {
        Expr::from_elementwise_horizontal_op(HorizontalOp::Sum, exprs)
    }

    pub fn mean_horizontal(&self, exprs: Vec<Expr>) -> Result<Expr> {
        Expr::from_elementwise_horizontal_op(HorizontalOp::Mean, exprs)
    }

    pub fn min_horizontal(&self, exprs: Vec<Expr>) -> Result<Expr> {
        Expr::from_elementwise_horizontal_op(HorizontalOp::Min, exprs)
    }

    pub fn max_horizontal(&self, exprs: Vec<Expr>) -> Result<Expr> {
        Expr::from_elementwise_horizontal_op(HorizontalOp::Max, exprs)
    }

    pub fn all_horizontal(&self, exprs: Vec<Expr>) -> Result<Expr> {
        Expr::from_elementwise_horizontal_op(HorizontalOp::All, exprs)
    }

    pub fn any_horizontal(&self, exprs: Vec<Expr>) -> Result<Expr> {
        Expr::from_elementwise_horizontal_op(HorizontalOp::Any, exprs)
    }

    /// First non-null value across the inputs, row by row.
    pub fn coalesce(&self, exprs: Vec<Expr>) -> Result<Expr> {
        Expr::from_elementwise_horizontal_op(HorizontalOp::Coalesce, exprs)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Namespace::new(Engine::default(), Version::default())
    }
}
