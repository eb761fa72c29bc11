//! Lowering of expression trees against one schema and one backend.

use tracing::{debug, trace};

use crate::backend::{Backend, Capability, Operation};
use crate::config::TabulaConfig;
use crate::error::{EngineError, Result};
use crate::expr::{BinaryOp, Call, Expr, Operand, WindowFunction, WindowOp};
use crate::schema::StructType;
use crate::window::{RankSpec, WindowInputs, WindowSpec};

/// Binds a backend, an input schema and the session config.
pub struct Compiler<'a, B: Backend + ?Sized> {
    backend: &'a B,
    schema: &'a StructType,
    config: &'a TabulaConfig,
}

impl<'a, B: Backend + ?Sized> Compiler<'a, B> {
    pub fn new(backend: &'a B, schema: &'a StructType, config: &'a TabulaConfig) -> Self {
        Compiler {
            backend,
            schema,
            config,
        }
    }

    pub fn backend(&self) -> &B {
        self.backend
    }

    /// Names of the outputs after alias transforms.
    pub fn output_names(&self, expr: &Expr) -> Result<Vec<String>> {
        let names = expr
            .output_names()
            .resolve(self.schema, self.config.validate_column_names)?;
        match expr.alias_output_names() {
            Some(alias) => alias.apply(names),
            None => Ok(names),
        }
    }

    /// Check capabilities, then lower `expr` into `(name, native)` pairs with
    /// each native aliased to its output name.
    pub fn compile(&self, expr: &Expr) -> Result<Vec<(String, B::Native)>> {
        let engine = self.backend.engine();
        if expr.engine() != engine {
            return Err(EngineError::User(format!(
                "expression was built for the {} engine but is being compiled by the {engine} backend",
                expr.engine()
            )));
        }
        self.check_capabilities(expr)?;
        let natives = self.evaluate(expr)?;
        let names = self.output_names(expr)?;
        if names.len() != natives.len() {
            return Err(EngineError::Internal(format!(
                "{} output names for {} columns",
                names.len(),
                natives.len()
            )));
        }
        debug!(engine = %engine, outputs = natives.len(), "compiled expression");
        Ok(names
            .into_iter()
            .zip(natives)
            .map(|(name, native)| {
                let aliased = self.backend.alias_native(native, &name);
                (name, aliased)
            })
            .collect())
    }

    pub fn check_capabilities(&self, expr: &Expr) -> Result<()> {
        let mut operations = Vec::new();
        collect_operations(expr, &mut operations);
        for operation in operations {
            if let Capability::Unsupported(name) = self.backend.capability(operation) {
                return Err(EngineError::unsupported(name, self.backend.engine().name()));
            }
        }
        Ok(())
    }

    /// Plain evaluation: one native expression per output.
    pub fn evaluate(&self, expr: &Expr) -> Result<Vec<B::Native>> {
        let backend = self.backend;
        match expr.call() {
            Call::Select(selection) => Ok(selection
                .resolve(self.schema, self.config.validate_column_names)?
                .iter()
                .map(|name| backend.column(name))
                .collect()),
            Call::Literal(value) => Ok(vec![backend.lit(value)]),
            Call::Elementwise { input, op, args } => {
                let args = self.operands(args, None)?;
                self.evaluate(input)?
                    .into_iter()
                    .map(|e| backend.elementwise(op, e, args.clone()))
                    .collect()
            }
            Call::Binary {
                left,
                op,
                right,
                reflected,
            } => {
                let right = self.operand(right, None)?;
                Ok(self
                    .evaluate(left)?
                    .into_iter()
                    .map(|l| binary(backend, *op, l, right.clone(), *reflected))
                    .collect())
            }
            Call::Callable { input, op } => self
                .evaluate(input)?
                .into_iter()
                .map(|e| backend.aggregate(op, e))
                .collect(),
            Call::Horizontal { inputs, op } => {
                let mut natives = Vec::new();
                for input in inputs {
                    natives.extend(self.evaluate(input)?);
                }
                Ok(vec![backend.horizontal(*op, natives)?])
            }
            Call::OrderDependent { operation, .. } => Err(EngineError::User(format!(
                "`{}` depends on row order; apply it through `over` with order_by keys",
                operation.name()
            ))),
            Call::Over {
                input,
                partition_by,
                order_by,
            } => {
                let inputs = WindowInputs::new(self.keys(partition_by)?, self.keys(order_by)?);
                self.window_evaluate(input, &inputs)
            }
        }
    }

    /// Window-aware evaluation against already-lowered keys.
    pub fn window_evaluate(
        &self,
        expr: &Expr,
        inputs: &WindowInputs<B::Native>,
    ) -> Result<Vec<B::Native>> {
        let backend = self.backend;
        match expr.window_function() {
            None => self.default_window(expr, inputs),
            Some(WindowFunction::Apply(op)) => {
                let base = expr.call().input().ok_or_else(|| {
                    EngineError::Internal(format!(
                        "window function {op:?} installed on a node without input"
                    ))
                })?;
                trace!(?op, "applying window function");
                self.evaluate(base)?
                    .into_iter()
                    .map(|e| self.apply_window_op(op, e, inputs))
                    .collect()
            }
            Some(WindowFunction::PushDown) => match expr.call() {
                Call::Select(_) | Call::Literal(_) => self.evaluate(expr),
                Call::Over {
                    partition_by,
                    order_by,
                    ..
                } => {
                    let rewindowed =
                        !inputs.partition_by.is_empty() || !inputs.order_by.is_empty();
                    let own = WindowInputs::new(self.keys(partition_by)?, self.keys(order_by)?);
                    if rewindowed && own != *inputs {
                        return Err(EngineError::User(
                            "expression is already windowed over different keys".into(),
                        ));
                    }
                    self.evaluate(expr)
                }
                Call::Elementwise { input, op, args } => {
                    let args = self.operands(args, Some(inputs))?;
                    self.window_evaluate(input, inputs)?
                        .into_iter()
                        .map(|e| backend.elementwise(op, e, args.clone()))
                        .collect()
                }
                Call::Binary {
                    left,
                    op,
                    right,
                    reflected,
                } => {
                    let right = self.operand(right, Some(inputs))?;
                    Ok(self
                        .window_evaluate(left, inputs)?
                        .into_iter()
                        .map(|l| binary(backend, *op, l, right.clone(), *reflected))
                        .collect())
                }
                Call::Horizontal { inputs: exprs, op } => {
                    let mut natives = Vec::new();
                    for e in exprs {
                        natives.extend(self.window_evaluate(e, inputs)?);
                    }
                    Ok(vec![backend.horizontal(*op, natives)?])
                }
                Call::Callable { .. } | Call::OrderDependent { .. } => {
                    self.default_window(expr, inputs)
                }
            },
        }
    }

    /// Plain outputs evaluated over the partition. Ordering keys are a
    /// contract violation here.
    fn default_window(
        &self,
        expr: &Expr,
        inputs: &WindowInputs<B::Native>,
    ) -> Result<Vec<B::Native>> {
        assert!(
            inputs.order_by.is_empty(),
            "default window function takes no order_by"
        );
        if let Call::Callable { input, op } = expr.call() {
            trace!(operation = Operation::from(op).name(), "partition aggregate");
            return self
                .evaluate(input)?
                .into_iter()
                .map(|e| self.backend.window_aggregate(op, e, &inputs.partition_by))
                .collect();
        }
        let spec = WindowSpec::new(inputs.partition_by.clone());
        self.evaluate(expr)?
            .into_iter()
            .map(|e| self.backend.window_expression(e, &spec))
            .collect()
    }

    fn apply_window_op(
        &self,
        op: &WindowOp,
        expr: B::Native,
        inputs: &WindowInputs<B::Native>,
    ) -> Result<B::Native> {
        let backend = self.backend;
        match op {
            WindowOp::Reduce(kind) => backend.window_reduce(*kind, expr, inputs),
            WindowOp::Cumulative { op, reverse } => backend.cumulative(*op, *reverse, expr, inputs),
            WindowOp::Rolling(spec) => backend.rolling(spec, expr, inputs),
            WindowOp::Rank { method, descending } => {
                let spec = RankSpec {
                    partition_nulls_last: self.config.partitioned_rank_nulls_last,
                    ..RankSpec::new(*method, *descending)
                };
                backend.rank(expr, &spec, Some(inputs))
            }
            WindowOp::Shift(n) => backend.shift(expr, *n, inputs),
            WindowOp::Diff => backend.diff(expr, inputs),
            WindowOp::FirstDistinct => backend.is_first_distinct(expr, inputs),
            WindowOp::LastDistinct => backend.is_last_distinct(expr, inputs),
            WindowOp::IsUnique => {
                assert!(
                    inputs.order_by.is_empty(),
                    "partition-level `is_unique` takes no order_by"
                );
                backend.is_unique(expr, &inputs.partition_by)
            }
        }
    }

    /// Window keys may be any expressions; their outputs are flattened in order.
    fn keys(&self, exprs: &[Expr]) -> Result<Vec<B::Native>> {
        let mut keys = Vec::new();
        for e in exprs {
            keys.extend(self.evaluate(e)?);
        }
        Ok(keys)
    }

    fn operand(
        &self,
        operand: &Operand,
        inputs: Option<&WindowInputs<B::Native>>,
    ) -> Result<B::Native> {
        match operand {
            Operand::Lit(value) => Ok(self.backend.lit(value)),
            Operand::Expr(e) => {
                let mut natives = match inputs {
                    Some(w) => self.window_evaluate(e, w)?,
                    None => self.evaluate(e)?,
                };
                if natives.len() != 1 {
                    return Err(EngineError::User(format!(
                        "operand must produce exactly one column, got {}",
                        natives.len()
                    )));
                }
                Ok(natives.remove(0))
            }
        }
    }

    fn operands(
        &self,
        operands: &[Operand],
        inputs: Option<&WindowInputs<B::Native>>,
    ) -> Result<Vec<B::Native>> {
        operands.iter().map(|o| self.operand(o, inputs)).collect()
    }
}

fn binary<B: Backend + ?Sized>(
    backend: &B,
    op: BinaryOp,
    left: B::Native,
    right: B::Native,
    reflected: bool,
) -> B::Native {
    if reflected {
        backend.binary(op, right, left)
    } else {
        backend.binary(op, left, right)
    }
}

/// Every operation the tree (window keys and operands included) asks for.
pub fn collect_operations(expr: &Expr, out: &mut Vec<Operation>) {
    if let Some(WindowFunction::Apply(op)) = expr.window_function() {
        out.push(Operation::from(op));
    }
    let operand = |o: &Operand, out: &mut Vec<Operation>| {
        if let Operand::Expr(e) = o {
            collect_operations(e, out);
        }
    };
    match expr.call() {
        Call::Select(_) | Call::Literal(_) => {}
        Call::Elementwise { input, op, args } => {
            out.push(Operation::from(op));
            collect_operations(input, out);
            for a in args {
                operand(a, out);
            }
        }
        Call::Binary { left, op, right, .. } => {
            out.push(Operation::Binary(*op));
            collect_operations(left, out);
            operand(right, out);
        }
        Call::Callable { input, op } => {
            out.push(Operation::from(op));
            collect_operations(input, out);
        }
        Call::Horizontal { inputs, op } => {
            out.push(Operation::Horizontal(*op));
            for e in inputs {
                collect_operations(e, out);
            }
        }
        Call::OrderDependent { input, operation } => {
            out.push(*operation);
            collect_operations(input, out);
        }
        Call::Over {
            input,
            partition_by,
            order_by,
        } => {
            out.push(Operation::Over);
            collect_operations(input, out);
            for key in partition_by.iter().chain(order_by) {
                collect_operations(key, out);
            }
        }
    }
}
