//! Operations carried as data by expression nodes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Literal value in an expression (engine-agnostic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    I64(i64),
    F64(f64),
    Str(String),
    Bool(bool),
    Null,
}

impl From<i64> for LiteralValue {
    fn from(v: i64) -> Self {
        LiteralValue::I64(v)
    }
}

impl From<i32> for LiteralValue {
    fn from(v: i32) -> Self {
        LiteralValue::I64(v as i64)
    }
}

impl From<f64> for LiteralValue {
    fn from(v: f64) -> Self {
        LiteralValue::F64(v)
    }
}

impl From<bool> for LiteralValue {
    fn from(v: bool) -> Self {
        LiteralValue::Bool(v)
    }
}

impl From<&str> for LiteralValue {
    fn from(v: &str) -> Self {
        LiteralValue::Str(v.to_string())
    }
}

impl From<String> for LiteralValue {
    fn from(v: String) -> Self {
        LiteralValue::Str(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    TrueDiv,
    FloorDiv,
    Mod,
    Pow,
    And,
    Or,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Eq => "eq",
            BinaryOp::NotEq => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::LtEq => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::GtEq => "ge",
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::TrueDiv => "truediv",
            BinaryOp::FloorDiv => "floordiv",
            BinaryOp::Mod => "mod",
            BinaryOp::Pow => "pow",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Not,
    Negate,
    IsNull,
    IsNotNull,
}

/// Row-wise operation with no cross-row dependency; safe to push below a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementwiseOp {
    Abs,
    Sqrt,
    Exp,
    Log { base: f64 },
    Round { decimals: u32 },
    IsNull,
    IsNotNull,
    Not,
    Negate,
    /// `args[0]` is the lower bound.
    ClipLower,
    /// `args[0]` is the upper bound.
    ClipUpper,
    /// `args[0]` is the lower bound, `args[1]` the upper bound.
    Clip,
    /// `args[0]` replaces nulls.
    FillNull,
    /// Named native function applied as `name(expr, *args)`.
    Function(String),
}

impl ElementwiseOp {
    pub fn name(&self) -> &str {
        match self {
            ElementwiseOp::Abs => "abs",
            ElementwiseOp::Sqrt => "sqrt",
            ElementwiseOp::Exp => "exp",
            ElementwiseOp::Log { .. } => "log",
            ElementwiseOp::Round { .. } => "round",
            ElementwiseOp::IsNull => "is_null",
            ElementwiseOp::IsNotNull => "is_not_null",
            ElementwiseOp::Not => "not",
            ElementwiseOp::Negate => "negate",
            ElementwiseOp::ClipLower | ElementwiseOp::ClipUpper | ElementwiseOp::Clip => "clip",
            ElementwiseOp::FillNull => "fill_null",
            ElementwiseOp::Function(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMethod {
    Average,
    Min,
    Max,
    Dense,
    Ordinal,
}

impl RankMethod {
    pub fn name(self) -> &'static str {
        match self {
            RankMethod::Average => "average",
            RankMethod::Min => "min",
            RankMethod::Max => "max",
            RankMethod::Dense => "dense",
            RankMethod::Ordinal => "ordinal",
        }
    }
}

impl fmt::Display for RankMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RankMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "average" => Ok(RankMethod::Average),
            "min" => Ok(RankMethod::Min),
            "max" => Ok(RankMethod::Max),
            "dense" => Ok(RankMethod::Dense),
            "ordinal" => Ok(RankMethod::Ordinal),
            other => Err(EngineError::invalid_parameter(
                "rank",
                format!(
                    "ranking method must be one of {{'average', 'min', 'max', 'dense', 'ordinal'}}, found '{other}'"
                ),
            )),
        }
    }
}

/// Whole-column operation applied to each output without a bespoke
/// partition-aware form (unless paired with a [`WindowOp`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallableOp {
    Sum,
    Mean,
    Median,
    Min,
    Max,
    Count,
    All,
    Any,
    Std { ddof: i64 },
    Var { ddof: i64 },
    NUnique,
    Rank { method: RankMethod, descending: bool },
    IsUnique,
    ArgMax,
    ArgMin,
    Head(usize),
    Tail(usize),
    Sort { descending: bool, nulls_last: bool },
    Unique,
    DropNulls,
    /// Named native aggregate applied as `name(expr)`.
    Aggregate(String),
}

/// Aggregations with a bespoke partitioned form (coalesced to their identity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReduceKind {
    Sum,
    All,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CumulativeOp {
    Sum,
    Max,
    Min,
    Count,
    Product,
}

impl CumulativeOp {
    /// Aggregate evaluated over the cumulative frame.
    pub fn function_name(self) -> &'static str {
        match self {
            CumulativeOp::Sum => "sum",
            CumulativeOp::Max => "max",
            CumulativeOp::Min => "min",
            CumulativeOp::Count => "count",
            CumulativeOp::Product => "product",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollingOp {
    Sum,
    Mean,
    Var,
    Std,
}

impl RollingOp {
    pub fn name(self) -> &'static str {
        match self {
            RollingOp::Sum => "rolling_sum",
            RollingOp::Mean => "rolling_mean",
            RollingOp::Var => "rolling_var",
            RollingOp::Std => "rolling_std",
        }
    }
}

/// Parameters of a fixed-size rolling statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RollingSpec {
    pub op: RollingOp,
    pub window_size: usize,
    pub min_samples: usize,
    pub center: bool,
    /// Only meaningful for `Var` and `Std`.
    pub ddof: i64,
}

impl RollingSpec {
    /// Check sizes and return the aggregate evaluated over the frame.
    pub fn function_name(&self) -> Result<&'static str, EngineError> {
        self.validate()?;
        match (self.op, self.ddof) {
            (RollingOp::Sum, _) => Ok("sum"),
            (RollingOp::Mean, _) => Ok("mean"),
            (RollingOp::Var, 0) => Ok("var_pop"),
            (RollingOp::Var, 1) => Ok("var_samp"),
            (RollingOp::Std, 0) => Ok("stddev_pop"),
            (RollingOp::Std, 1) => Ok("stddev_samp"),
            (op, ddof) => Err(EngineError::invalid_parameter(
                op.name(),
                format!("only ddof=0 and ddof=1 are supported, got ddof={ddof}"),
            )),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.window_size < 1 {
            return Err(EngineError::invalid_parameter(
                self.op.name(),
                "window_size must be greater or equal than 1",
            ));
        }
        if self.min_samples < 1 {
            return Err(EngineError::invalid_parameter(
                self.op.name(),
                "min_samples must be greater or equal than 1",
            ));
        }
        self.offset("window_size", self.window_size)?;
        if self.min_samples > self.window_size {
            return Err(EngineError::invalid_parameter(
                self.op.name(),
                format!(
                    "min_samples ({}) must be less or equal than window_size ({})",
                    self.min_samples, self.window_size
                ),
            ));
        }
        Ok(())
    }

    /// Row offsets `(start, end)` of the frame relative to the current row.
    pub fn bounds(&self) -> Result<(i64, i64), EngineError> {
        let w = self.offset("window_size", self.window_size)?;
        Ok(if self.center {
            let half = (w - 1) / 2;
            let remainder = (w - 1) % 2;
            (-(half + remainder), half)
        } else {
            (-(w - 1), 0)
        })
    }

    /// `min_samples` as the frame count a row needs to be reported.
    pub fn min_count(&self) -> Result<i64, EngineError> {
        self.offset("min_samples", self.min_samples)
    }

    fn offset(&self, what: &str, value: usize) -> Result<i64, EngineError> {
        i64::try_from(value).map_err(|_| {
            EngineError::invalid_parameter(
                self.op.name(),
                format!("{what} ({value}) does not fit a 64-bit row offset"),
            )
        })
    }
}

/// Horizontal (row-wise, N columns to 1) reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalOp {
    Sum,
    Mean,
    Min,
    Max,
    All,
    Any,
    Coalesce,
}

impl HorizontalOp {
    pub fn name(self) -> &'static str {
        match self {
            HorizontalOp::Sum => "sum_horizontal",
            HorizontalOp::Mean => "mean_horizontal",
            HorizontalOp::Min => "min_horizontal",
            HorizontalOp::Max => "max_horizontal",
            HorizontalOp::All => "all_horizontal",
            HorizontalOp::Any => "any_horizontal",
            HorizontalOp::Coalesce => "coalesce",
        }
    }
}

/// Partition-aware evaluation installed by `Expr::with_window_function`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowOp {
    Reduce(ReduceKind),
    Cumulative { op: CumulativeOp, reverse: bool },
    Rolling(RollingSpec),
    Rank { method: RankMethod, descending: bool },
    Shift(i64),
    Diff,
    FirstDistinct,
    LastDistinct,
    IsUnique,
}
