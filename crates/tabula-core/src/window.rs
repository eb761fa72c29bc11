//! Window inputs and the generic window algorithms.
//!
//! Every algorithm here is a composition of [`Backend::window_expression`]
//! with the rest of the native vocabulary. Tie-break and null ordering are
//! part of each algorithm's contract and must not drift between engines.

use std::iter;

use crate::backend::Backend;
use crate::error::Result;
use crate::expr::{BinaryOp, CumulativeOp, LiteralValue, RankMethod, ReduceKind, RollingSpec, UnaryOp};

/// Partition and ordering keys of a windowed evaluation, already lowered to
/// native expressions. Key order is preserved into the emitted window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInputs<N> {
    pub partition_by: Vec<N>,
    pub order_by: Vec<N>,
}

impl<N> WindowInputs<N> {
    pub fn new(partition_by: Vec<N>, order_by: Vec<N>) -> Self {
        WindowInputs {
            partition_by,
            order_by,
        }
    }

    /// Whole-frame window with no ordering.
    pub fn unpartitioned() -> Self {
        WindowInputs::new(Vec::new(), Vec::new())
    }
}

/// Everything a backend needs to emit one window expression.
///
/// Frame offsets are in rows relative to the current row: negative is
/// preceding, zero is the current row, positive is following. `None` means
/// unbounded on that side; with both `None` no frame clause is emitted.
/// Missing `descending` / `nulls_last` entries default to ascending with
/// nulls first.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec<N> {
    pub partition_by: Vec<N>,
    pub order_by: Vec<N>,
    pub rows_start: Option<i64>,
    pub rows_end: Option<i64>,
    pub descending: Vec<bool>,
    pub nulls_last: Vec<bool>,
}

impl<N> WindowSpec<N> {
    pub fn new(partition_by: Vec<N>) -> Self {
        WindowSpec {
            partition_by,
            order_by: Vec::new(),
            rows_start: None,
            rows_end: None,
            descending: Vec::new(),
            nulls_last: Vec::new(),
        }
    }

    pub fn order_by(mut self, order_by: Vec<N>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn rows(mut self, start: Option<i64>, end: Option<i64>) -> Self {
        self.rows_start = start;
        self.rows_end = end;
        self
    }

    pub fn descending(mut self, descending: Vec<bool>) -> Self {
        self.descending = descending;
        self
    }

    pub fn nulls_last(mut self, nulls_last: Vec<bool>) -> Self {
        self.nulls_last = nulls_last;
        self
    }

    pub fn has_frame(&self) -> bool {
        self.rows_start.is_some() || self.rows_end.is_some()
    }

    pub fn is_descending(&self, i: usize) -> bool {
        self.descending.get(i).copied().unwrap_or(false)
    }

    pub fn is_nulls_last(&self, i: usize) -> bool {
        self.nulls_last.get(i).copied().unwrap_or(false)
    }
}

/// Parameters of a rank evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankSpec {
    pub method: RankMethod,
    pub descending: bool,
    /// Null placement of the caller's extra ordering keys when ranking inside
    /// a window. The ranked expression itself always sorts nulls last.
    pub partition_nulls_last: bool,
}

impl RankSpec {
    pub fn new(method: RankMethod, descending: bool) -> Self {
        RankSpec {
            method,
            descending,
            partition_nulls_last: false,
        }
    }
}

/// Partition-only reduction coalesced to its identity (0, true, false).
pub fn window_reduce<B: Backend + ?Sized>(
    backend: &B,
    kind: ReduceKind,
    expr: B::Native,
    inputs: &WindowInputs<B::Native>,
) -> Result<B::Native> {
    let (function, identity) = match kind {
        ReduceKind::Sum => ("sum", LiteralValue::I64(0)),
        ReduceKind::All => ("bool_and", LiteralValue::Bool(true)),
        ReduceKind::Any => ("bool_or", LiteralValue::Bool(false)),
    };
    if kind != ReduceKind::Sum {
        assert!(
            inputs.order_by.is_empty(),
            "partition-level `{function}` takes no order_by"
        );
    }
    let agg = backend.function(function, vec![expr])?;
    let windowed =
        backend.window_expression(agg, &WindowSpec::new(inputs.partition_by.clone()))?;
    Ok(backend.coalesce(vec![windowed, backend.lit(&identity)]))
}

/// Running aggregate up to the current row; `reverse` flips both the
/// direction and the null placement of every ordering key.
pub fn cumulative<B: Backend + ?Sized>(
    backend: &B,
    op: CumulativeOp,
    reverse: bool,
    expr: B::Native,
    inputs: &WindowInputs<B::Native>,
) -> Result<B::Native> {
    let n = inputs.order_by.len();
    let agg = backend.function(op.function_name(), vec![expr])?;
    let spec = WindowSpec::new(inputs.partition_by.clone())
        .order_by(inputs.order_by.clone())
        .rows(None, Some(0))
        .descending(vec![reverse; n])
        .nulls_last(vec![reverse; n]);
    backend.window_expression(agg, &spec)
}

/// Fixed-size rolling statistic, null where the frame holds fewer than
/// `min_samples` non-null values.
pub fn rolling<B: Backend + ?Sized>(
    backend: &B,
    spec: &RollingSpec,
    expr: B::Native,
    inputs: &WindowInputs<B::Native>,
) -> Result<B::Native> {
    let function = spec.function_name()?;
    let (start, end) = spec.bounds()?;
    let frame = WindowSpec::new(inputs.partition_by.clone())
        .order_by(inputs.order_by.clone())
        .rows(Some(start), Some(end));
    let stat = backend.window_expression(backend.function(function, vec![expr.clone()])?, &frame)?;
    let count = backend.window_expression(backend.function("count", vec![expr])?, &frame)?;
    let enough = backend.binary(
        BinaryOp::GtEq,
        count,
        backend.lit(&LiteralValue::I64(spec.min_count()?)),
    );
    Ok(backend.when(enough, stat, None))
}

pub fn rank<B: Backend + ?Sized>(
    backend: &B,
    expr: B::Native,
    spec: &RankSpec,
    inputs: Option<&WindowInputs<B::Native>>,
) -> Result<B::Native> {
    let (partition_by, order_by) = match inputs {
        Some(w) => (w.partition_by.clone(), w.order_by.clone()),
        None => (Vec::new(), Vec::new()),
    };
    let extra = order_by.len();
    let descending = iter::once(spec.descending)
        .chain(iter::repeat_n(false, extra))
        .collect();
    let nulls_last = iter::once(true)
        .chain(iter::repeat_n(spec.partition_nulls_last, extra))
        .collect();

    let function = match spec.method {
        RankMethod::Dense => "dense_rank",
        RankMethod::Ordinal => "row_number",
        RankMethod::Min | RankMethod::Max | RankMethod::Average => "rank",
    };
    let keys = iter::once(expr.clone()).chain(order_by).collect();
    let base = backend.window_expression(
        backend.function(function, vec![])?,
        &WindowSpec::new(partition_by.clone())
            .order_by(keys)
            .descending(descending)
            .nulls_last(nulls_last),
    )?;

    let ranked = match spec.method {
        RankMethod::Max | RankMethod::Average => {
            let tie_keys = partition_by.into_iter().chain(iter::once(expr.clone())).collect();
            let tie_size =
                backend.window_expression(backend.count_star(), &WindowSpec::new(tie_keys))?;
            let ties = backend.binary(BinaryOp::Sub, tie_size, backend.lit(&LiteralValue::I64(1)));
            let offset = if spec.method == RankMethod::Average {
                backend.binary(BinaryOp::TrueDiv, ties, backend.lit(&LiteralValue::F64(2.0)))
            } else {
                ties
            };
            backend.binary(BinaryOp::Add, base, offset)
        }
        RankMethod::Min | RankMethod::Dense | RankMethod::Ordinal => base,
    };
    let present = backend.unary(UnaryOp::Not, backend.unary(UnaryOp::IsNull, expr));
    Ok(backend.when(present, ranked, None))
}

/// `lag(expr, n)`, or `lead(expr, -n)` for negative `n`.
pub fn shift<B: Backend + ?Sized>(
    backend: &B,
    expr: B::Native,
    n: i64,
    inputs: &WindowInputs<B::Native>,
) -> Result<B::Native> {
    let shifted = if n >= 0 {
        backend.function("lag", vec![expr, backend.lit(&LiteralValue::I64(n))])?
    } else {
        backend.function("lead", vec![expr, backend.lit(&LiteralValue::I64(-n))])?
    };
    backend.window_expression(
        shifted,
        &WindowSpec::new(inputs.partition_by.clone()).order_by(inputs.order_by.clone()),
    )
}

pub fn diff<B: Backend + ?Sized>(
    backend: &B,
    expr: B::Native,
    inputs: &WindowInputs<B::Native>,
) -> Result<B::Native> {
    let previous = backend.window_expression(
        backend.function("lag", vec![expr.clone()])?,
        &WindowSpec::new(inputs.partition_by.clone()).order_by(inputs.order_by.clone()),
    )?;
    Ok(backend.binary(BinaryOp::Sub, expr, previous))
}

fn distinct_row_number<B: Backend + ?Sized>(
    backend: &B,
    expr: B::Native,
    inputs: &WindowInputs<B::Native>,
    last: bool,
) -> Result<B::Native> {
    let n = inputs.order_by.len();
    let keys = inputs
        .partition_by
        .iter()
        .cloned()
        .chain(iter::once(expr))
        .collect();
    let row_number = backend.window_expression(
        backend.function("row_number", vec![])?,
        &WindowSpec::new(keys)
            .order_by(inputs.order_by.clone())
            .descending(vec![last; n])
            .nulls_last(vec![last; n]),
    )?;
    Ok(backend.binary(
        BinaryOp::Eq,
        row_number,
        backend.lit(&LiteralValue::I64(1)),
    ))
}

pub fn is_first_distinct<B: Backend + ?Sized>(
    backend: &B,
    expr: B::Native,
    inputs: &WindowInputs<B::Native>,
) -> Result<B::Native> {
    distinct_row_number(backend, expr, inputs, false)
}

pub fn is_last_distinct<B: Backend + ?Sized>(
    backend: &B,
    expr: B::Native,
    inputs: &WindowInputs<B::Native>,
) -> Result<B::Native> {
    distinct_row_number(backend, expr, inputs, true)
}

/// True where the value occurs exactly once within its partition.
pub fn is_unique<B: Backend + ?Sized>(
    backend: &B,
    expr: B::Native,
    partition_by: &[B::Native],
) -> Result<B::Native> {
    let keys = iter::once(expr).chain(partition_by.iter().cloned()).collect();
    let count = backend.window_expression(backend.count_star(), &WindowSpec::new(keys))?;
    Ok(backend.binary(BinaryOp::Eq, count, backend.lit(&LiteralValue::I64(1))))
}
