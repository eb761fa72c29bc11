//! Generic lowering of elementwise, aggregate and horizontal operations onto
//! a backend's native vocabulary.

use crate::backend::{Backend, Operation};
use crate::error::{EngineError, Result};
use crate::expr::{
    BinaryOp, CallableOp, ElementwiseOp, HorizontalOp, LiteralValue, ReduceKind, UnaryOp,
};
use crate::window::{RankSpec, WindowInputs, WindowSpec};

fn arg<N>(op: &ElementwiseOp, args: &mut std::vec::IntoIter<N>) -> Result<N> {
    args.next().ok_or_else(|| {
        EngineError::invalid_parameter(op.name(), "missing argument")
    })
}

pub fn elementwise<B: Backend + ?Sized>(
    backend: &B,
    op: &ElementwiseOp,
    expr: B::Native,
    args: Vec<B::Native>,
) -> Result<B::Native> {
    let mut args = args.into_iter();
    let nan = || backend.lit(&LiteralValue::F64(f64::NAN));
    let zero = || backend.lit(&LiteralValue::I64(0));
    Ok(match op {
        ElementwiseOp::Abs => backend.function("abs", vec![expr])?,
        ElementwiseOp::Sqrt => backend.when(
            backend.binary(BinaryOp::Lt, expr.clone(), zero()),
            nan(),
            Some(backend.function("sqrt", vec![expr])?),
        ),
        ElementwiseOp::Exp => backend.function("exp", vec![expr])?,
        ElementwiseOp::Log { base } => {
            let log = backend.binary(
                BinaryOp::TrueDiv,
                backend.function("ln", vec![expr.clone()])?,
                backend.function("ln", vec![backend.lit(&LiteralValue::F64(*base))])?,
            );
            let at_zero = backend.when(
                backend.binary(BinaryOp::Eq, expr.clone(), zero()),
                backend.lit(&LiteralValue::F64(f64::NEG_INFINITY)),
                Some(log),
            );
            backend.when(
                backend.binary(BinaryOp::Lt, expr, zero()),
                nan(),
                Some(at_zero),
            )
        }
        ElementwiseOp::Round { decimals } => backend.function(
            "round",
            vec![expr, backend.lit(&LiteralValue::I64(i64::from(*decimals)))],
        )?,
        ElementwiseOp::IsNull => backend.unary(UnaryOp::IsNull, expr),
        ElementwiseOp::IsNotNull => backend.unary(UnaryOp::IsNotNull, expr),
        ElementwiseOp::Not => backend.unary(UnaryOp::Not, expr),
        ElementwiseOp::Negate => backend.unary(UnaryOp::Negate, expr),
        ElementwiseOp::ClipLower => {
            backend.function("greatest", vec![expr, arg(op, &mut args)?])?
        }
        ElementwiseOp::ClipUpper => backend.function("least", vec![expr, arg(op, &mut args)?])?,
        ElementwiseOp::Clip => {
            let lower = arg(op, &mut args)?;
            let upper = arg(op, &mut args)?;
            let floored = backend.function("greatest", vec![expr, lower])?;
            backend.function("least", vec![floored, upper])?
        }
        ElementwiseOp::FillNull => backend.coalesce(vec![expr, arg(op, &mut args)?]),
        ElementwiseOp::Function(name) => {
            let mut call_args = vec![expr];
            call_args.extend(args);
            backend.function(name, call_args)?
        }
    })
}

/// Whole-column operation on one output.
pub fn aggregate<B: Backend + ?Sized>(
    backend: &B,
    op: &CallableOp,
    expr: B::Native,
) -> Result<B::Native> {
    let lit = |v: LiteralValue| backend.lit(&v);
    Ok(match op {
        CallableOp::Sum => backend.coalesce(vec![
            backend.function("sum", vec![expr])?,
            lit(LiteralValue::I64(0)),
        ]),
        CallableOp::All => backend.coalesce(vec![
            backend.function("bool_and", vec![expr])?,
            lit(LiteralValue::Bool(true)),
        ]),
        CallableOp::Any => backend.coalesce(vec![
            backend.function("bool_or", vec![expr])?,
            lit(LiteralValue::Bool(false)),
        ]),
        CallableOp::Mean => backend.function("mean", vec![expr])?,
        CallableOp::Median => backend.function("median", vec![expr])?,
        CallableOp::Min => backend.function("min", vec![expr])?,
        CallableOp::Max => backend.function("max", vec![expr])?,
        CallableOp::Count => backend.function("count", vec![expr])?,
        CallableOp::Std { ddof } => dispersion(backend, expr, *ddof, true, Ok)?,
        CallableOp::Var { ddof } => dispersion(backend, expr, *ddof, false, Ok)?,
        CallableOp::NUnique => {
            let has_null = backend.when(
                backend.unary(UnaryOp::IsNull, expr.clone()),
                lit(LiteralValue::I64(1)),
                Some(lit(LiteralValue::I64(0))),
            );
            backend.binary(
                BinaryOp::Add,
                backend.function("count_distinct", vec![expr])?,
                backend.function("max", vec![has_null])?,
            )
        }
        CallableOp::Rank { method, descending } => {
            backend.rank(expr, &RankSpec::new(*method, *descending), None)?
        }
        CallableOp::IsUnique => backend.is_unique(expr, &[])?,
        CallableOp::Aggregate(name) => backend.function(name, vec![expr])?,
        CallableOp::ArgMax
        | CallableOp::ArgMin
        | CallableOp::Head(_)
        | CallableOp::Tail(_)
        | CallableOp::Sort { .. }
        | CallableOp::Unique
        | CallableOp::DropNulls => {
            return Err(EngineError::unsupported(
                Operation::from(op).name(),
                backend.engine().name(),
            ));
        }
    })
}

/// Whole-column operation evaluated over each partition and broadcast back
/// to its rows. Aggregates built from several calls get one window per call.
pub fn window_aggregate<B: Backend + ?Sized>(
    backend: &B,
    op: &CallableOp,
    expr: B::Native,
    partition_by: &[B::Native],
) -> Result<B::Native> {
    let partition = || WindowSpec::new(partition_by.to_vec());
    let windowed = |e: B::Native| backend.window_expression(e, &partition());
    let reduce = |kind: ReduceKind, expr: B::Native| {
        let inputs = WindowInputs::new(partition_by.to_vec(), Vec::new());
        backend.window_reduce(kind, expr, &inputs)
    };
    match op {
        CallableOp::Sum => reduce(ReduceKind::Sum, expr),
        CallableOp::All => reduce(ReduceKind::All, expr),
        CallableOp::Any => reduce(ReduceKind::Any, expr),
        CallableOp::Std { ddof } => dispersion(backend, expr, *ddof, true, windowed),
        CallableOp::Var { ddof } => dispersion(backend, expr, *ddof, false, windowed),
        CallableOp::NUnique => {
            // Ascending and descending dense ranks of a value add up to the
            // distinct count plus one. Null sorts as its own value.
            let dense_rank = |descending: bool| {
                backend.window_expression(
                    backend.function("dense_rank", vec![])?,
                    &partition()
                        .order_by(vec![expr.clone()])
                        .descending(vec![descending])
                        .nulls_last(vec![!descending]),
                )
            };
            Ok(backend.binary(
                BinaryOp::Sub,
                backend.binary(BinaryOp::Add, dense_rank(false)?, dense_rank(true)?),
                backend.lit(&LiteralValue::I64(1)),
            ))
        }
        CallableOp::Rank { method, descending } => backend.rank(
            expr,
            &RankSpec::new(*method, *descending),
            Some(&WindowInputs::new(partition_by.to_vec(), Vec::new())),
        ),
        CallableOp::IsUnique => backend.is_unique(expr, partition_by),
        _ => windowed(backend.aggregate(op, expr)?),
    }
}

/// Standard deviation or variance with any `ddof`. ddof 0 and 1 map to the
/// population and sample functions; other values rescale the population one
/// by `n / (n - ddof)`. `wrap` is applied to every inner aggregate call.
fn dispersion<B: Backend + ?Sized>(
    backend: &B,
    expr: B::Native,
    ddof: i64,
    std: bool,
    wrap: impl Fn(B::Native) -> Result<B::Native>,
) -> Result<B::Native> {
    let (population, sample) = if std {
        ("stddev_pop", "stddev_samp")
    } else {
        ("var_pop", "var_samp")
    };
    match ddof {
        0 => wrap(backend.function(population, vec![expr])?),
        1 => wrap(backend.function(sample, vec![expr])?),
        _ => {
            let n = wrap(backend.function("count", vec![expr.clone()])?)?;
            let factor = backend.binary(
                BinaryOp::TrueDiv,
                n.clone(),
                backend.binary(BinaryOp::Sub, n, backend.lit(&LiteralValue::I64(ddof))),
            );
            let factor = if std {
                backend.function("sqrt", vec![factor])?
            } else {
                factor
            };
            Ok(backend.binary(
                BinaryOp::Mul,
                wrap(backend.function(population, vec![expr])?)?,
                factor,
            ))
        }
    }
}

fn fold<B: Backend + ?Sized>(
    backend: &B,
    op: BinaryOp,
    exprs: impl IntoIterator<Item = B::Native>,
) -> Option<B::Native> {
    exprs
        .into_iter()
        .reduce(|acc, e| backend.binary(op, acc, e))
}

/// N columns to one, row by row.
pub fn horizontal<B: Backend + ?Sized>(
    backend: &B,
    op: HorizontalOp,
    exprs: Vec<B::Native>,
) -> Result<B::Native> {
    if exprs.is_empty() {
        return Err(EngineError::User(format!(
            "`{}` needs at least one column",
            op.name()
        )));
    }
    let zero = || backend.lit(&LiteralValue::I64(0));
    let filled_sum = |exprs: &[B::Native]| {
        fold(
            backend,
            BinaryOp::Add,
            exprs
                .iter()
                .map(|e| backend.coalesce(vec![e.clone(), zero()])),
        )
    };
    let result = match op {
        HorizontalOp::Sum => filled_sum(&exprs),
        HorizontalOp::Mean => {
            let present = exprs.iter().map(|e| {
                backend.when(
                    backend.unary(UnaryOp::IsNotNull, e.clone()),
                    backend.lit(&LiteralValue::I64(1)),
                    Some(zero()),
                )
            });
            let count = fold(backend, BinaryOp::Add, present);
            filled_sum(&exprs)
                .zip(count)
                .map(|(sum, count)| backend.binary(BinaryOp::TrueDiv, sum, count))
        }
        HorizontalOp::Min => Some(backend.function("least", exprs)?),
        HorizontalOp::Max => Some(backend.function("greatest", exprs)?),
        HorizontalOp::All => fold(backend, BinaryOp::And, exprs),
        HorizontalOp::Any => fold(backend, BinaryOp::Or, exprs),
        HorizontalOp::Coalesce => Some(backend.coalesce(exprs)),
    };
    result.ok_or_else(|| EngineError::Internal(format!("`{}` produced no column", op.name())))
}
