//! Backend adapter surface: what a concrete engine provides to the generic
//! lowering and window algorithms.

use std::fmt::Debug;

use crate::engine::Engine;
use crate::error::Result;
use crate::expr::{
    BinaryOp, CallableOp, CumulativeOp, ElementwiseOp, HorizontalOp, LiteralValue, ReduceKind,
    RollingOp, RollingSpec, UnaryOp, WindowOp,
};
use crate::lower;
use crate::window::{self, RankSpec, WindowInputs, WindowSpec};

/// Capability key: every operation a node tree can ask a backend for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Binary(BinaryOp),
    Abs,
    Sqrt,
    Exp,
    Log,
    Round,
    Clip,
    FillNull,
    NullCheck,
    Not,
    Negate,
    CustomFunction,
    Sum,
    Mean,
    Median,
    Min,
    Max,
    Count,
    All,
    Any,
    Std,
    Var,
    NUnique,
    CustomAggregate,
    ArgMax,
    ArgMin,
    Head,
    Tail,
    Sort,
    Unique,
    DropNulls,
    Horizontal(HorizontalOp),
    Cumulative(CumulativeOp),
    Rolling(RollingOp),
    Rank,
    Shift,
    Diff,
    IsFirstDistinct,
    IsLastDistinct,
    IsUnique,
    Over,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Binary(op) => op.name(),
            Operation::Abs => "abs",
            Operation::Sqrt => "sqrt",
            Operation::Exp => "exp",
            Operation::Log => "log",
            Operation::Round => "round",
            Operation::Clip => "clip",
            Operation::FillNull => "fill_null",
            Operation::NullCheck => "is_null",
            Operation::Not => "not",
            Operation::Negate => "negate",
            Operation::CustomFunction => "function",
            Operation::Sum => "sum",
            Operation::Mean => "mean",
            Operation::Median => "median",
            Operation::Min => "min",
            Operation::Max => "max",
            Operation::Count => "count",
            Operation::All => "all",
            Operation::Any => "any",
            Operation::Std => "std",
            Operation::Var => "var",
            Operation::NUnique => "n_unique",
            Operation::CustomAggregate => "aggregate",
            Operation::ArgMax => "arg_max",
            Operation::ArgMin => "arg_min",
            Operation::Head => "head",
            Operation::Tail => "tail",
            Operation::Sort => "sort",
            Operation::Unique => "unique",
            Operation::DropNulls => "drop_nulls",
            Operation::Horizontal(op) => op.name(),
            Operation::Cumulative(CumulativeOp::Sum) => "cum_sum",
            Operation::Cumulative(CumulativeOp::Max) => "cum_max",
            Operation::Cumulative(CumulativeOp::Min) => "cum_min",
            Operation::Cumulative(CumulativeOp::Count) => "cum_count",
            Operation::Cumulative(CumulativeOp::Product) => "cum_prod",
            Operation::Rolling(op) => op.name(),
            Operation::Rank => "rank",
            Operation::Shift => "shift",
            Operation::Diff => "diff",
            Operation::IsFirstDistinct => "is_first_distinct",
            Operation::IsLastDistinct => "is_last_distinct",
            Operation::IsUnique => "is_unique",
            Operation::Over => "over",
        }
    }
}

impl From<&ElementwiseOp> for Operation {
    fn from(op: &ElementwiseOp) -> Self {
        match op {
            ElementwiseOp::Abs => Operation::Abs,
            ElementwiseOp::Sqrt => Operation::Sqrt,
            ElementwiseOp::Exp => Operation::Exp,
            ElementwiseOp::Log { .. } => Operation::Log,
            ElementwiseOp::Round { .. } => Operation::Round,
            ElementwiseOp::IsNull | ElementwiseOp::IsNotNull => Operation::NullCheck,
            ElementwiseOp::Not => Operation::Not,
            ElementwiseOp::Negate => Operation::Negate,
            ElementwiseOp::ClipLower | ElementwiseOp::ClipUpper | ElementwiseOp::Clip => {
                Operation::Clip
            }
            ElementwiseOp::FillNull => Operation::FillNull,
            ElementwiseOp::Function(_) => Operation::CustomFunction,
        }
    }
}

impl From<&CallableOp> for Operation {
    fn from(op: &CallableOp) -> Self {
        match op {
            CallableOp::Sum => Operation::Sum,
            CallableOp::Mean => Operation::Mean,
            CallableOp::Median => Operation::Median,
            CallableOp::Min => Operation::Min,
            CallableOp::Max => Operation::Max,
            CallableOp::Count => Operation::Count,
            CallableOp::All => Operation::All,
            CallableOp::Any => Operation::Any,
            CallableOp::Std { .. } => Operation::Std,
            CallableOp::Var { .. } => Operation::Var,
            CallableOp::NUnique => Operation::NUnique,
            CallableOp::Rank { .. } => Operation::Rank,
            CallableOp::IsUnique => Operation::IsUnique,
            CallableOp::ArgMax => Operation::ArgMax,
            CallableOp::ArgMin => Operation::ArgMin,
            CallableOp::Head(_) => Operation::Head,
            CallableOp::Tail(_) => Operation::Tail,
            CallableOp::Sort { .. } => Operation::Sort,
            CallableOp::Unique => Operation::Unique,
            CallableOp::DropNulls => Operation::DropNulls,
            CallableOp::Aggregate(_) => Operation::CustomAggregate,
        }
    }
}

impl From<&WindowOp> for Operation {
    fn from(op: &WindowOp) -> Self {
        match op {
            WindowOp::Reduce(ReduceKind::Sum) => Operation::Sum,
            WindowOp::Reduce(ReduceKind::All) => Operation::All,
            WindowOp::Reduce(ReduceKind::Any) => Operation::Any,
            WindowOp::Cumulative { op, .. } => Operation::Cumulative(*op),
            WindowOp::Rolling(spec) => Operation::Rolling(spec.op),
            WindowOp::Rank { .. } => Operation::Rank,
            WindowOp::Shift(_) => Operation::Shift,
            WindowOp::Diff => Operation::Diff,
            WindowOp::FirstDistinct => Operation::IsFirstDistinct,
            WindowOp::LastDistinct => Operation::IsLastDistinct,
            WindowOp::IsUnique => Operation::IsUnique,
        }
    }
}

/// Answer to a capability query, checked before anything is lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Supported,
    /// Carries the name of the operation that has no implementation.
    Unsupported(&'static str),
}

impl Capability {
    pub fn is_supported(self) -> bool {
        matches!(self, Capability::Supported)
    }
}

/// Contract a concrete engine fulfills to receive compiled expressions.
///
/// The required methods are the native vocabulary. The provided methods run
/// the generic algorithms in [`crate::lower`] and [`crate::window`] on top of
/// it; an engine with a native construct for one of them overrides it.
pub trait Backend {
    type Native: Clone + Debug + PartialEq;

    fn engine(&self) -> Engine;

    fn column(&self, name: &str) -> Self::Native;

    /// Named scalar or aggregate function. Names outside the engine's
    /// vocabulary are a capability error.
    fn function(&self, name: &str, args: Vec<Self::Native>) -> Result<Self::Native>;

    fn lit(&self, value: &LiteralValue) -> Self::Native;

    fn coalesce(&self, exprs: Vec<Self::Native>) -> Self::Native;

    /// `CASE WHEN condition THEN then [ELSE otherwise] END`; null when no
    /// `otherwise` is given.
    fn when(
        &self,
        condition: Self::Native,
        then: Self::Native,
        otherwise: Option<Self::Native>,
    ) -> Self::Native;

    fn window_expression(
        &self,
        expr: Self::Native,
        spec: &WindowSpec<Self::Native>,
    ) -> Result<Self::Native>;

    fn count_star(&self) -> Self::Native;

    fn alias_native(&self, expr: Self::Native, name: &str) -> Self::Native;

    fn binary(&self, op: BinaryOp, left: Self::Native, right: Self::Native) -> Self::Native;

    fn unary(&self, op: UnaryOp, expr: Self::Native) -> Self::Native;

    fn capability(&self, _operation: Operation) -> Capability {
        Capability::Supported
    }

    // ---------- provided: lowering ----------

    fn elementwise(
        &self,
        op: &ElementwiseOp,
        expr: Self::Native,
        args: Vec<Self::Native>,
    ) -> Result<Self::Native> {
        lower::elementwise(self, op, expr, args)
    }

    fn aggregate(&self, op: &CallableOp, expr: Self::Native) -> Result<Self::Native> {
        lower::aggregate(self, op, expr)
    }

    /// Whole-column operation broadcast over each partition.
    fn window_aggregate(
        &self,
        op: &CallableOp,
        expr: Self::Native,
        partition_by: &[Self::Native],
    ) -> Result<Self::Native> {
        lower::window_aggregate(self, op, expr, partition_by)
    }

    fn horizontal(&self, op: HorizontalOp, exprs: Vec<Self::Native>) -> Result<Self::Native> {
        lower::horizontal(self, op, exprs)
    }

    // ---------- provided: window algorithms ----------

    fn window_reduce(
        &self,
        kind: ReduceKind,
        expr: Self::Native,
        inputs: &WindowInputs<Self::Native>,
    ) -> Result<Self::Native> {
        window::window_reduce(self, kind, expr, inputs)
    }

    fn cumulative(
        &self,
        op: CumulativeOp,
        reverse: bool,
        expr: Self::Native,
        inputs: &WindowInputs<Self::Native>,
    ) -> Result<Self::Native> {
        window::cumulative(self, op, reverse, expr, inputs)
    }

    fn rolling(
        &self,
        spec: &RollingSpec,
        expr: Self::Native,
        inputs: &WindowInputs<Self::Native>,
    ) -> Result<Self::Native> {
        window::rolling(self, spec, expr, inputs)
    }

    /// `inputs` is `None` on the plain (unpartitioned) path.
    fn rank(
        &self,
        expr: Self::Native,
        spec: &RankSpec,
        inputs: Option<&WindowInputs<Self::Native>>,
    ) -> Result<Self::Native> {
        window::rank(self, expr, spec, inputs)
    }

    fn shift(
        &self,
        expr: Self::Native,
        n: i64,
        inputs: &WindowInputs<Self::Native>,
    ) -> Result<Self::Native> {
        window::shift(self, expr, n, inputs)
    }

    fn diff(&self, expr: Self::Native, inputs: &WindowInputs<Self::Native>) -> Result<Self::Native> {
        window::diff(self, expr, inputs)
    }

    fn is_first_distinct(
        &self,
        expr: Self::Native,
        inputs: &WindowInputs<Self::Native>,
    ) -> Result<Self::Native> {
        window::is_first_distinct(self, expr, inputs)
    }

    fn is_last_distinct(
        &self,
        expr: Self::Native,
        inputs: &WindowInputs<Self::Native>,
    ) -> Result<Self::Native> {
        window::is_last_distinct(self, expr, inputs)
    }

    fn is_unique(
        &self,
        expr: Self::Native,
        partition_by: &[Self::Native],
    ) -> Result<Self::Native> {
        window::is_unique(self, expr, partition_by)
    }
}
