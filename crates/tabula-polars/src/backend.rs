//! [`Backend`] implementation producing polars lazy expressions.
//!
//! Polars windows are `expr.over(partition_by)` with no frame clause, so the
//! order-dependent algorithms are overridden with native constructs
//! (`cum_sum`, `rolling_mean`, `rank`, `shift`, ...). Ordering keys are
//! honored by sorting inside the group, evaluating, and restoring the
//! original row order.

use polars::prelude::{
    self as pl, Expr, Operator, RankOptions, RollingFnParams, RollingOptionsFixedWindow,
    RollingVarParams, SortMultipleOptions, SortOptions, NULL,
};
use tabula_core::backend::Backend;
use tabula_core::expr::{
    BinaryOp, CallableOp, CumulativeOp, ElementwiseOp, LiteralValue, RankMethod, RollingOp,
    RollingSpec, UnaryOp,
};
use tabula_core::lower;
use tabula_core::{Engine, EngineError, RankSpec, Result, WindowInputs, WindowSpec};
use tracing::trace;

use crate::error::polars_to_core_error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolarsBackend;

impl PolarsBackend {
    pub fn new() -> Self {
        PolarsBackend
    }

    /// `f` evaluated within each partition after sorting by `order_by`, with
    /// the results put back in input row order.
    fn ordered(
        &self,
        expr: Expr,
        inputs: &WindowInputs<Expr>,
        nulls_last: bool,
        f: impl FnOnce(Expr) -> Expr,
    ) -> Expr {
        let result = if inputs.order_by.is_empty() {
            f(expr)
        } else {
            let options = SortMultipleOptions {
                nulls_last: vec![nulls_last; inputs.order_by.len()],
                maintain_order: true,
                ..Default::default()
            };
            let sorted = f(expr.sort_by(&inputs.order_by, options.clone()));
            let restore = pl::int_range(pl::lit(0i64), pl::len(), 1, pl::DataType::Int64)
                .sort_by(&inputs.order_by, options)
                .arg_sort(SortOptions::default());
            sorted.gather(restore)
        };
        over(result, &inputs.partition_by)
    }
}

fn over(expr: Expr, partition_by: &[Expr]) -> Expr {
    if partition_by.is_empty() {
        expr
    } else {
        expr.over(partition_by)
    }
}

fn ddof_u8(function: &str, ddof: i64) -> Result<u8> {
    u8::try_from(ddof).map_err(|_| {
        EngineError::invalid_parameter(function, format!("ddof must be in 0..=255, got ddof={ddof}"))
    })
}

fn single(name: &str, args: Vec<Expr>) -> Result<Expr> {
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(e), None) => Ok(e),
        _ => Err(EngineError::invalid_parameter(name, "expected exactly one argument")),
    }
}

fn pair(name: &str, args: Vec<Expr>) -> Result<(Expr, Option<Expr>)> {
    let mut args = args.into_iter();
    match (args.next(), args.next(), args.next()) {
        (Some(a), b, None) => Ok((a, b)),
        _ => Err(EngineError::invalid_parameter(name, "expected one or two arguments")),
    }
}

fn to_polars_rank(method: RankMethod) -> pl::RankMethod {
    match method {
        RankMethod::Average => pl::RankMethod::Average,
        RankMethod::Min => pl::RankMethod::Min,
        RankMethod::Max => pl::RankMethod::Max,
        RankMethod::Dense => pl::RankMethod::Dense,
        RankMethod::Ordinal => pl::RankMethod::Ordinal,
    }
}

impl Backend for PolarsBackend {
    type Native = Expr;

    fn engine(&self) -> Engine {
        Engine::Polars
    }

    fn column(&self, name: &str) -> Expr {
        pl::col(name)
    }

    fn function(&self, name: &str, args: Vec<Expr>) -> Result<Expr> {
        let e = match name {
            "greatest" => return pl::max_horizontal(args).map_err(polars_to_core_error),
            "least" => return pl::min_horizontal(args).map_err(polars_to_core_error),
            "power" => {
                let (base, exponent) = pair(name, args)?;
                let exponent = exponent.ok_or_else(|| {
                    EngineError::invalid_parameter(name, "missing exponent")
                })?;
                return Ok(base.pow(exponent));
            }
            "lag" | "lead" => {
                let (e, n) = pair(name, args)?;
                let n = n.unwrap_or_else(|| pl::lit(1i64));
                let n = if name == "lead" { pl::lit(0i64) - n } else { n };
                return Ok(e.shift(n));
            }
            _ => single(name, args)?,
        };
        Ok(match name {
            "abs" => e.abs(),
            "sqrt" => e.sqrt(),
            "exp" => e.exp(),
            "ln" => e.log(std::f64::consts::E),
            "floor" => e.floor(),
            "ceil" => e.ceil(),
            "sum" => e.sum(),
            "mean" => e.mean(),
            "median" => e.median(),
            "min" => e.min(),
            "max" => e.max(),
            "count" => e.count(),
            "product" => e.product(),
            "bool_and" => e.all(true),
            "bool_or" => e.any(true),
            "count_distinct" => e.drop_nulls().n_unique(),
            "stddev_pop" => e.std(0),
            "stddev_samp" => e.std(1),
            "var_pop" => e.var(0),
            "var_samp" => e.var(1),
            other => return Err(EngineError::unsupported(other, Engine::Polars.name())),
        })
    }

    fn lit(&self, value: &LiteralValue) -> Expr {
        match value {
            LiteralValue::I64(v) => pl::lit(*v),
            LiteralValue::F64(v) => pl::lit(*v),
            LiteralValue::Str(s) => pl::lit(s.clone()),
            LiteralValue::Bool(b) => pl::lit(*b),
            LiteralValue::Null => pl::lit(NULL),
        }
    }

    fn coalesce(&self, exprs: Vec<Expr>) -> Expr {
        pl::coalesce(&exprs)
    }

    fn when(&self, condition: Expr, then: Expr, otherwise: Option<Expr>) -> Expr {
        pl::when(condition)
            .then(then)
            .otherwise(otherwise.unwrap_or_else(|| pl::lit(NULL)))
    }

    fn window_expression(&self, expr: Expr, spec: &WindowSpec<Expr>) -> Result<Expr> {
        if spec.has_frame() {
            return Err(EngineError::unsupported(
                "window frame bounds",
                Engine::Polars.name(),
            ));
        }
        if !spec.order_by.is_empty() {
            return Err(EngineError::unsupported(
                "ordered window expression",
                Engine::Polars.name(),
            ));
        }
        Ok(over(expr, &spec.partition_by))
    }

    fn count_star(&self) -> Expr {
        pl::len()
    }

    fn alias_native(&self, expr: Expr, name: &str) -> Expr {
        expr.alias(name)
    }

    fn binary(&self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        match op {
            BinaryOp::Eq => left.eq(right),
            BinaryOp::NotEq => left.neq(right),
            BinaryOp::Lt => left.lt(right),
            BinaryOp::LtEq => left.lt_eq(right),
            BinaryOp::Gt => left.gt(right),
            BinaryOp::GtEq => left.gt_eq(right),
            BinaryOp::Add => left + right,
            BinaryOp::Sub => left - right,
            BinaryOp::Mul => left * right,
            BinaryOp::TrueDiv => pl::binary_expr(left, Operator::TrueDivide, right),
            BinaryOp::FloorDiv => pl::binary_expr(left, Operator::FloorDivide, right),
            BinaryOp::Mod => pl::binary_expr(left, Operator::Modulus, right),
            BinaryOp::Pow => left.pow(right),
            BinaryOp::And => left.and(right),
            BinaryOp::Or => left.or(right),
        }
    }

    fn unary(&self, op: UnaryOp, expr: Expr) -> Expr {
        match op {
            UnaryOp::Not => expr.not(),
            UnaryOp::Negate => pl::lit(0i64) - expr,
            UnaryOp::IsNull => expr.is_null(),
            UnaryOp::IsNotNull => expr.is_not_null(),
        }
    }

    fn elementwise(&self, op: &ElementwiseOp, expr: Expr, args: Vec<Expr>) -> Result<Expr> {
        match op {
            ElementwiseOp::Round { decimals } => Ok(expr.round(*decimals)),
            _ => lower::elementwise(self, op, expr, args),
        }
    }

    fn aggregate(&self, op: &CallableOp, expr: Expr) -> Result<Expr> {
        Ok(match op {
            CallableOp::NUnique => expr.n_unique(),
            CallableOp::Std { ddof } => expr.std(ddof_u8("std", *ddof)?),
            CallableOp::Var { ddof } => expr.var(ddof_u8("var", *ddof)?),
            CallableOp::ArgMax => expr.arg_max(),
            CallableOp::ArgMin => expr.arg_min(),
            CallableOp::Head(n) => expr.head(Some(*n)),
            CallableOp::Tail(n) => expr.tail(Some(*n)),
            CallableOp::Sort {
                descending,
                nulls_last,
            } => expr.sort(SortOptions {
                descending: *descending,
                nulls_last: *nulls_last,
                maintain_order: true,
                ..Default::default()
            }),
            CallableOp::Unique => expr.unique_stable(),
            CallableOp::DropNulls => expr.drop_nulls(),
            _ => return lower::aggregate(self, op, expr),
        })
    }

    fn window_aggregate(&self, op: &CallableOp, expr: Expr, partition_by: &[Expr]) -> Result<Expr> {
        Ok(over(self.aggregate(op, expr)?, partition_by))
    }

    fn cumulative(
        &self,
        op: CumulativeOp,
        reverse: bool,
        expr: Expr,
        inputs: &WindowInputs<Expr>,
    ) -> Result<Expr> {
        trace!(?op, reverse, "native cumulative");
        // Null rows carry the running value; rows before the first non-null
        // stay null.
        Ok(self.ordered(expr, inputs, false, |e| {
            let running = match op {
                CumulativeOp::Count => return e.cum_count(reverse),
                CumulativeOp::Sum => e.clone().fill_null(pl::lit(0i64)).cum_sum(reverse),
                CumulativeOp::Product => e.clone().fill_null(pl::lit(1i64)).cum_prod(reverse),
                CumulativeOp::Max => e.clone().fill_null(e.clone().min()).cum_max(reverse),
                CumulativeOp::Min => e.clone().fill_null(e.clone().max()).cum_min(reverse),
            };
            pl::when(e.cum_count(reverse).gt(pl::lit(0i64)))
                .then(running)
                .otherwise(pl::lit(NULL))
        }))
    }

    fn rolling(&self, spec: &RollingSpec, expr: Expr, inputs: &WindowInputs<Expr>) -> Result<Expr> {
        spec.function_name()?;
        let fn_params = match spec.op {
            RollingOp::Var | RollingOp::Std => Some(RollingFnParams::Var(RollingVarParams {
                ddof: ddof_u8(spec.op.name(), spec.ddof)?,
            })),
            RollingOp::Sum | RollingOp::Mean => None,
        };
        let options = RollingOptionsFixedWindow {
            window_size: spec.window_size,
            min_periods: spec.min_samples,
            center: spec.center,
            fn_params,
            ..Default::default()
        };
        let op = spec.op;
        Ok(self.ordered(expr, inputs, false, move |e| match op {
            RollingOp::Sum => e.rolling_sum(options),
            RollingOp::Mean => e.rolling_mean(options),
            RollingOp::Var => e.rolling_var(options),
            RollingOp::Std => e.rolling_std(options),
        }))
    }

    fn rank(
        &self,
        expr: Expr,
        spec: &RankSpec,
        inputs: Option<&WindowInputs<Expr>>,
    ) -> Result<Expr> {
        let options = RankOptions {
            method: to_polars_rank(spec.method),
            descending: spec.descending,
        };
        Ok(match inputs {
            None => expr.rank(options, None),
            Some(w) => self.ordered(expr, w, spec.partition_nulls_last, |e| {
                e.rank(options, None)
            }),
        })
    }

    fn shift(&self, expr: Expr, n: i64, inputs: &WindowInputs<Expr>) -> Result<Expr> {
        Ok(self.ordered(expr, inputs, false, |e| e.shift(pl::lit(n))))
    }

    fn diff(&self, expr: Expr, inputs: &WindowInputs<Expr>) -> Result<Expr> {
        Ok(self.ordered(expr, inputs, false, |e| {
            e.clone() - e.shift(pl::lit(1i64))
        }))
    }

    fn is_first_distinct(&self, expr: Expr, inputs: &WindowInputs<Expr>) -> Result<Expr> {
        Ok(self.ordered(expr, inputs, false, |e| e.is_first_distinct()))
    }

    fn is_last_distinct(&self, expr: Expr, inputs: &WindowInputs<Expr>) -> Result<Expr> {
        Ok(self.ordered(expr, inputs, false, |e| e.is_last_distinct()))
    }

    fn is_unique(&self, expr: Expr, partition_by: &[Expr]) -> Result<Expr> {
        Ok(over(expr.is_unique(), partition_by))
    }
}
