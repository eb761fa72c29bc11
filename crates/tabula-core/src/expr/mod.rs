//! Engine-agnostic expression nodes.
//!
//! An [`Expr`] describes how to derive N output columns from an input frame.
//! Nodes are immutable; every combinator returns a new node that shares its
//! children through `Arc`. Nothing is lowered until a [`crate::Compiler`] is
//! given a schema and a backend.

pub mod names;
pub mod ops;

use std::ops::{Add, BitAnd, BitOr, Div, Mul, Neg, Not, Rem, Sub};
use std::sync::Arc;

use crate::backend::Operation;
use crate::engine::{Engine, Version};
use crate::error::{EngineError, Result};

pub use names::{AliasNames, AliasOp, OutputNames, Selection};
pub use ops::{
    BinaryOp, CallableOp, CumulativeOp, ElementwiseOp, HorizontalOp, LiteralValue, RankMethod,
    ReduceKind, RollingOp, RollingSpec, UnaryOp, WindowOp,
};

/// Plain (not window-aware) evaluation of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Select(Selection),
    Literal(LiteralValue),
    Elementwise {
        input: Expr,
        op: ElementwiseOp,
        args: Vec<Operand>,
    },
    /// `left op right`, or `right op left` when `reflected`.
    Binary {
        left: Expr,
        op: BinaryOp,
        right: Operand,
        reflected: bool,
    },
    Callable {
        input: Expr,
        op: CallableOp,
    },
    Horizontal {
        inputs: Vec<Expr>,
        op: HorizontalOp,
    },
    /// Needs a row order; only the windowed path is defined.
    OrderDependent {
        input: Expr,
        operation: Operation,
    },
    /// Window evaluation of `input` materialized into a plain call.
    Over {
        input: Expr,
        partition_by: Vec<Expr>,
        order_by: Vec<Expr>,
    },
}

impl Call {
    /// Single upstream node, for calls that transform exactly one input.
    pub fn input(&self) -> Option<&Expr> {
        match self {
            Call::Elementwise { input, .. }
            | Call::Callable { input, .. }
            | Call::OrderDependent { input, .. }
            | Call::Over { input, .. } => Some(input),
            Call::Binary { left, .. } => Some(left),
            Call::Select(_) | Call::Literal(_) | Call::Horizontal { .. } => None,
        }
    }
}

/// Window-aware evaluation of a node. Absent means the default wrapper:
/// the plain outputs evaluated over the partition, with no ordering allowed.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowFunction {
    /// Evaluate the operands windowed and apply this node's own call on top.
    PushDown,
    /// Partition-aware algorithm applied to the plain outputs of the call's input.
    Apply(WindowOp),
}

/// Right-hand side of a binary op or an extra argument of an elementwise op.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Expr(Expr),
    Lit(LiteralValue),
}

impl From<Expr> for Operand {
    fn from(e: Expr) -> Self {
        Operand::Expr(e)
    }
}

impl From<&Expr> for Operand {
    fn from(e: &Expr) -> Self {
        Operand::Expr(e.clone())
    }
}

impl From<LiteralValue> for Operand {
    fn from(v: LiteralValue) -> Self {
        Operand::Lit(v)
    }
}

macro_rules! operand_from_literal {
    ($($t:ty),*) => {
        $(impl From<$t> for Operand {
            fn from(v: $t) -> Self {
                Operand::Lit(LiteralValue::from(v))
            }
        })*
    };
}

operand_from_literal!(i64, i32, f64, bool, &str, String);

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    call: Arc<Call>,
    window_function: Option<Arc<WindowFunction>>,
    output_names: OutputNames,
    alias_output_names: Option<AliasNames>,
    engine: Engine,
    version: Version,
}

impl Expr {
    pub fn selection(selection: Selection, engine: Engine, version: Version) -> Expr {
        Expr {
            call: Arc::new(Call::Select(selection.clone())),
            window_function: Some(Arc::new(WindowFunction::PushDown)),
            output_names: OutputNames::Selection(selection),
            alias_output_names: None,
            engine,
            version,
        }
    }

    pub fn columns<I, S>(names: I, engine: Engine, version: Version) -> Expr
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Expr::selection(
            Selection::Names(names.into_iter().map(Into::into).collect()),
            engine,
            version,
        )
    }

    pub fn literal(value: impl Into<LiteralValue>, engine: Engine, version: Version) -> Expr {
        Expr {
            call: Arc::new(Call::Literal(value.into())),
            window_function: Some(Arc::new(WindowFunction::PushDown)),
            output_names: OutputNames::Literal,
            alias_output_names: None,
            engine,
            version,
        }
    }

    /// Combine N nodes into a single output column.
    ///
    /// The result is named after the first output of the first node and
    /// inherits that node's alias transform.
    pub fn from_elementwise_horizontal_op(op: HorizontalOp, exprs: Vec<Expr>) -> Result<Expr> {
        let first = exprs.first().ok_or_else(|| {
            EngineError::User(format!("`{}` needs at least one expression", op.name()))
        })?;
        if let Some(other) = exprs.iter().find(|e| e.engine != first.engine) {
            return Err(EngineError::User(format!(
                "cannot combine {} and {} expressions in `{}`",
                first.engine,
                other.engine,
                op.name()
            )));
        }
        let alias_output_names = first
            .alias_output_names
            .as_ref()
            .map(|a| a.then(&AliasOp::First.into()));
        Ok(Expr {
            call: Arc::new(Call::Horizontal {
                inputs: exprs.clone(),
                op,
            }),
            window_function: Some(Arc::new(WindowFunction::PushDown)),
            output_names: OutputNames::First(Box::new(first.output_names.clone())),
            alias_output_names,
            engine: first.engine,
            version: first.version,
        })
    }

    pub fn call(&self) -> &Call {
        &self.call
    }

    pub fn window_function(&self) -> Option<&WindowFunction> {
        self.window_function.as_deref()
    }

    pub fn output_names(&self) -> &OutputNames {
        &self.output_names
    }

    pub fn alias_output_names(&self) -> Option<&AliasNames> {
        self.alias_output_names.as_ref()
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn version(&self) -> Version {
        self.version
    }

    fn derive(&self, call: Call, window_function: Option<WindowFunction>) -> Expr {
        Expr {
            call: Arc::new(call),
            window_function: window_function.map(Arc::new),
            output_names: self.output_names.clone(),
            alias_output_names: self.alias_output_names.clone(),
            engine: self.engine,
            version: self.version,
        }
    }

    // ---------- combinators ----------

    /// Apply a whole-column operation to each output. The windowed path falls
    /// back to the default wrapper.
    pub fn with_callable(&self, op: CallableOp) -> Expr {
        self.derive(
            Call::Callable {
                input: self.clone(),
                op,
            },
            None,
        )
    }

    /// Apply a row-wise operation to each output. Only valid for operations
    /// with no cross-row dependency: the windowed path pushes the window
    /// below `op`.
    pub fn with_elementwise(&self, op: ElementwiseOp, args: Vec<Operand>) -> Expr {
        self.derive(
            Call::Elementwise {
                input: self.clone(),
                op,
                args,
            },
            Some(WindowFunction::PushDown),
        )
    }

    pub fn with_binary(&self, op: BinaryOp, other: impl Into<Operand>, reflected: bool) -> Expr {
        self.derive(
            Call::Binary {
                left: self.clone(),
                op,
                right: other.into(),
                reflected,
            },
            Some(WindowFunction::PushDown),
        )
    }

    /// `None` clears the alias transform; otherwise `alias` runs after the
    /// existing one.
    pub fn with_alias_output_names(&self, alias: Option<AliasNames>) -> Expr {
        let alias_output_names = match (alias, &self.alias_output_names) {
            (None, _) => None,
            (Some(new), None) => Some(new),
            (Some(new), Some(current)) => Some(current.then(&new)),
        };
        Expr {
            alias_output_names,
            ..self.clone()
        }
    }

    /// Install a partition-aware algorithm evaluated on the plain outputs of
    /// this node's input.
    pub fn with_window_function(&self, op: WindowOp) -> Expr {
        Expr {
            window_function: Some(Arc::new(WindowFunction::Apply(op))),
            ..self.clone()
        }
    }

    fn order_dependent(&self, operation: Operation, op: WindowOp) -> Expr {
        self.derive(
            Call::OrderDependent {
                input: self.clone(),
                operation,
            },
            None,
        )
        .with_window_function(op)
    }

    // ---------- binary ----------

    pub fn eq(&self, other: impl Into<Operand>) -> Expr {
        self.with_binary(BinaryOp::Eq, other, false)
    }

    pub fn neq(&self, other: impl Into<Operand>) -> Expr {
        self.with_binary(BinaryOp::NotEq, other, false)
    }

    pub fn lt(&self, other: impl Into<Operand>) -> Expr {
        self.with_binary(BinaryOp::Lt, other, false)
    }

    pub fn lt_eq(&self, other: impl Into<Operand>) -> Expr {
        self.with_binary(BinaryOp::LtEq, other, false)
    }

    pub fn gt(&self, other: impl Into<Operand>) -> Expr {
        self.with_binary(BinaryOp::Gt, other, false)
    }

    pub fn gt_eq(&self, other: impl Into<Operand>) -> Expr {
        self.with_binary(BinaryOp::GtEq, other, false)
    }

    pub fn add(&self, other: impl Into<Operand>) -> Expr {
        self.with_binary(BinaryOp::Add, other, false)
    }

    pub fn sub(&self, other: impl Into<Operand>) -> Expr {
        self.with_binary(BinaryOp::Sub, other, false)
    }

    pub fn mul(&self, other: impl Into<Operand>) -> Expr {
        self.with_binary(BinaryOp::Mul, other, false)
    }

    pub fn truediv(&self, other: impl Into<Operand>) -> Expr {
        self.with_binary(BinaryOp::TrueDiv, other, false)
    }

    pub fn floordiv(&self, other: impl Into<Operand>) -> Expr {
        self.with_binary(BinaryOp::FloorDiv, other, false)
    }

    pub fn modulo(&self, other: impl Into<Operand>) -> Expr {
        self.with_binary(BinaryOp::Mod, other, false)
    }

    pub fn pow(&self, other: impl Into<Operand>) -> Expr {
        self.with_binary(BinaryOp::Pow, other, false)
    }

    pub fn and(&self, other: impl Into<Operand>) -> Expr {
        self.with_binary(BinaryOp::And, other, false)
    }

    pub fn or(&self, other: impl Into<Operand>) -> Expr {
        self.with_binary(BinaryOp::Or, other, false)
    }

    fn reflected(&self, op: BinaryOp, other: impl Into<Operand>) -> Expr {
        self.with_binary(op, other, true).alias("literal")
    }

    /// `other + self`, named `literal`.
    pub fn radd(&self, other: impl Into<Operand>) -> Expr {
        self.reflected(BinaryOp::Add, other)
    }

    pub fn rsub(&self, other: impl Into<Operand>) -> Expr {
        self.reflected(BinaryOp::Sub, other)
    }

    pub fn rmul(&self, other: impl Into<Operand>) -> Expr {
        self.reflected(BinaryOp::Mul, other)
    }

    pub fn rtruediv(&self, other: impl Into<Operand>) -> Expr {
        self.reflected(BinaryOp::TrueDiv, other)
    }

    pub fn rfloordiv(&self, other: impl Into<Operand>) -> Expr {
        self.reflected(BinaryOp::FloorDiv, other)
    }

    pub fn rmod(&self, other: impl Into<Operand>) -> Expr {
        self.reflected(BinaryOp::Mod, other)
    }

    pub fn rpow(&self, other: impl Into<Operand>) -> Expr {
        self.reflected(BinaryOp::Pow, other)
    }

    // ---------- elementwise ----------

    pub fn abs(&self) -> Expr {
        self.with_elementwise(ElementwiseOp::Abs, vec![])
    }

    /// Square root; NaN for negative input.
    pub fn sqrt(&self) -> Expr {
        self.with_elementwise(ElementwiseOp::Sqrt, vec![])
    }

    pub fn exp(&self) -> Expr {
        self.with_elementwise(ElementwiseOp::Exp, vec![])
    }

    /// Logarithm in `base`; NaN for negative input and -inf for zero.
    pub fn log(&self, base: f64) -> Expr {
        self.with_elementwise(ElementwiseOp::Log { base }, vec![])
    }

    pub fn round(&self, decimals: u32) -> Expr {
        self.with_elementwise(ElementwiseOp::Round { decimals }, vec![])
    }

    pub fn is_null(&self) -> Expr {
        self.with_elementwise(ElementwiseOp::IsNull, vec![])
    }

    pub fn is_not_null(&self) -> Expr {
        self.with_elementwise(ElementwiseOp::IsNotNull, vec![])
    }

    pub fn not(&self) -> Expr {
        self.with_elementwise(ElementwiseOp::Not, vec![])
    }

    pub fn negate(&self) -> Expr {
        self.with_elementwise(ElementwiseOp::Negate, vec![])
    }

    pub fn clip(&self, lower: Option<Operand>, upper: Option<Operand>) -> Expr {
        match (lower, upper) {
            (Some(lo), Some(hi)) => self.with_elementwise(ElementwiseOp::Clip, vec![lo, hi]),
            (Some(lo), None) => self.with_elementwise(ElementwiseOp::ClipLower, vec![lo]),
            (None, Some(hi)) => self.with_elementwise(ElementwiseOp::ClipUpper, vec![hi]),
            (None, None) => self.clone(),
        }
    }

    pub fn fill_null(&self, value: impl Into<Operand>) -> Expr {
        self.with_elementwise(ElementwiseOp::FillNull, vec![value.into()])
    }

    /// Named native function applied row-wise as `name(self, *args)`.
    pub fn function(&self, name: impl Into<String>, args: Vec<Operand>) -> Expr {
        self.with_elementwise(ElementwiseOp::Function(name.into()), args)
    }

    // ---------- aggregations ----------

    pub fn sum(&self) -> Expr {
        self.with_callable(CallableOp::Sum)
            .with_window_function(WindowOp::Reduce(ReduceKind::Sum))
    }

    pub fn all(&self) -> Expr {
        self.with_callable(CallableOp::All)
            .with_window_function(WindowOp::Reduce(ReduceKind::All))
    }

    pub fn any(&self) -> Expr {
        self.with_callable(CallableOp::Any)
            .with_window_function(WindowOp::Reduce(ReduceKind::Any))
    }

    pub fn mean(&self) -> Expr {
        self.with_callable(CallableOp::Mean)
    }

    pub fn median(&self) -> Expr {
        self.with_callable(CallableOp::Median)
    }

    pub fn min(&self) -> Expr {
        self.with_callable(CallableOp::Min)
    }

    pub fn max(&self) -> Expr {
        self.with_callable(CallableOp::Max)
    }

    pub fn count(&self) -> Expr {
        self.with_callable(CallableOp::Count)
    }

    pub fn std(&self, ddof: i64) -> Expr {
        self.with_callable(CallableOp::Std { ddof })
    }

    pub fn var(&self, ddof: i64) -> Expr {
        self.with_callable(CallableOp::Var { ddof })
    }

    /// Distinct values, counting null as one value.
    pub fn n_unique(&self) -> Expr {
        self.with_callable(CallableOp::NUnique)
    }

    /// Named native aggregate applied as `name(self)`.
    pub fn aggregate(&self, name: impl Into<String>) -> Expr {
        self.with_callable(CallableOp::Aggregate(name.into()))
    }

    pub fn arg_max(&self) -> Expr {
        self.with_callable(CallableOp::ArgMax)
    }

    pub fn arg_min(&self) -> Expr {
        self.with_callable(CallableOp::ArgMin)
    }

    pub fn head(&self, n: usize) -> Expr {
        self.with_callable(CallableOp::Head(n))
    }

    pub fn tail(&self, n: usize) -> Expr {
        self.with_callable(CallableOp::Tail(n))
    }

    pub fn sort(&self, descending: bool, nulls_last: bool) -> Expr {
        self.with_callable(CallableOp::Sort {
            descending,
            nulls_last,
        })
    }

    pub fn unique(&self) -> Expr {
        self.with_callable(CallableOp::Unique)
    }

    pub fn drop_nulls(&self) -> Expr {
        self.with_callable(CallableOp::DropNulls)
    }

    // ---------- window ----------

    pub fn cum_sum(&self, reverse: bool) -> Expr {
        self.cumulative(CumulativeOp::Sum, reverse)
    }

    pub fn cum_max(&self, reverse: bool) -> Expr {
        self.cumulative(CumulativeOp::Max, reverse)
    }

    pub fn cum_min(&self, reverse: bool) -> Expr {
        self.cumulative(CumulativeOp::Min, reverse)
    }

    pub fn cum_count(&self, reverse: bool) -> Expr {
        self.cumulative(CumulativeOp::Count, reverse)
    }

    pub fn cum_prod(&self, reverse: bool) -> Expr {
        self.cumulative(CumulativeOp::Product, reverse)
    }

    fn cumulative(&self, op: CumulativeOp, reverse: bool) -> Expr {
        self.order_dependent(
            Operation::Cumulative(op),
            WindowOp::Cumulative { op, reverse },
        )
    }

    /// `min_samples` defaults to `window_size`.
    pub fn rolling_sum(&self, window_size: usize, min_samples: Option<usize>, center: bool) -> Expr {
        self.rolling(RollingOp::Sum, window_size, min_samples, center, 1)
    }

    pub fn rolling_mean(&self, window_size: usize, min_samples: Option<usize>, center: bool) -> Expr {
        self.rolling(RollingOp::Mean, window_size, min_samples, center, 1)
    }

    pub fn rolling_var(
        &self,
        window_size: usize,
        min_samples: Option<usize>,
        center: bool,
        ddof: i64,
    ) -> Expr {
        self.rolling(RollingOp::Var, window_size, min_samples, center, ddof)
    }

    pub fn rolling_std(
        &self,
        window_size: usize,
        min_samples: Option<usize>,
        center: bool,
        ddof: i64,
    ) -> Expr {
        self.rolling(RollingOp::Std, window_size, min_samples, center, ddof)
    }

    fn rolling(
        &self,
        op: RollingOp,
        window_size: usize,
        min_samples: Option<usize>,
        center: bool,
        ddof: i64,
    ) -> Expr {
        let spec = RollingSpec {
            op,
            window_size,
            min_samples: min_samples.unwrap_or(window_size),
            center,
            ddof,
        };
        self.order_dependent(Operation::Rolling(op), WindowOp::Rolling(spec))
    }

    /// Rank of each value; null input ranks as null.
    pub fn rank(&self, method: RankMethod, descending: bool) -> Expr {
        self.with_callable(CallableOp::Rank { method, descending })
            .with_window_function(WindowOp::Rank { method, descending })
    }

    /// Value `n` rows earlier within the window order (later for negative `n`).
    pub fn shift(&self, n: i64) -> Expr {
        self.order_dependent(Operation::Shift, WindowOp::Shift(n))
    }

    pub fn diff(&self) -> Expr {
        self.order_dependent(Operation::Diff, WindowOp::Diff)
    }

    pub fn is_first_distinct(&self) -> Expr {
        self.order_dependent(Operation::IsFirstDistinct, WindowOp::FirstDistinct)
    }

    pub fn is_last_distinct(&self) -> Expr {
        self.order_dependent(Operation::IsLastDistinct, WindowOp::LastDistinct)
    }

    pub fn is_unique(&self) -> Expr {
        self.with_callable(CallableOp::IsUnique)
            .with_window_function(WindowOp::IsUnique)
    }

    /// Materialize the window evaluation of this node over the given keys.
    ///
    /// Applying the same keys to a node that is already materialized with
    /// them returns it unchanged.
    pub fn over(&self, partition_by: Vec<Expr>, order_by: Vec<Expr>) -> Expr {
        if let Call::Over {
            partition_by: p,
            order_by: o,
            ..
        } = self.call()
        {
            if *p == partition_by && *o == order_by {
                return self.clone();
            }
        }
        self.derive(
            Call::Over {
                input: self.clone(),
                partition_by,
                order_by,
            },
            Some(WindowFunction::PushDown),
        )
    }

    /// [`Expr::over`] with column names as keys.
    pub fn over_columns(&self, partition_by: &[&str], order_by: &[&str]) -> Expr {
        let key = |name: &&str| Expr::columns([*name], self.engine, self.version);
        self.over(
            partition_by.iter().map(key).collect(),
            order_by.iter().map(key).collect(),
        )
    }

    // ---------- naming ----------

    pub fn alias(&self, name: impl Into<String>) -> Expr {
        self.with_alias_output_names(Some(AliasOp::Name(name.into()).into()))
    }

    /// Drop every alias transform and keep the root names.
    pub fn name_keep(&self) -> Expr {
        self.with_alias_output_names(None)
    }

    pub fn name_prefix(&self, prefix: impl Into<String>) -> Expr {
        self.with_alias_output_names(Some(AliasOp::Prefix(prefix.into()).into()))
    }

    pub fn name_suffix(&self, suffix: impl Into<String>) -> Expr {
        self.with_alias_output_names(Some(AliasOp::Suffix(suffix.into()).into()))
    }

    pub fn name_to_uppercase(&self) -> Expr {
        self.with_alias_output_names(Some(AliasOp::ToUppercase.into()))
    }

    pub fn name_to_lowercase(&self) -> Expr {
        self.with_alias_output_names(Some(AliasOp::ToLowercase.into()))
    }
}

macro_rules! binary_operator {
    ($($trait:ident :: $method:ident => $op:ident),*) => {
        $(impl<T: Into<Operand>> $trait<T> for Expr {
            type Output = Expr;

            fn $method(self, rhs: T) -> Expr {
                self.with_binary(BinaryOp::$op, rhs, false)
            }
        })*
    };
}

binary_operator!(
    Add::add => Add,
    Sub::sub => Sub,
    Mul::mul => Mul,
    Div::div => TrueDiv,
    Rem::rem => Mod,
    BitAnd::bitand => And,
    BitOr::bitor => Or
);

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::not(&self)
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        self.negate()
    }
}
