//! [`Backend`] implementation producing [`SqlExpr`] trees.

use tabula_core::backend::{Backend, Capability, Operation};
use tabula_core::expr::{BinaryOp, CumulativeOp, LiteralValue, UnaryOp};
use tabula_core::{Engine, EngineError, Result, WindowSpec};
use tracing::debug;

use crate::ast::{Frame, OrderKey, SqlExpr, WindowClause};
use crate::dialect::{Dialect, Spelling};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlBackend {
    dialect: Dialect,
}

impl SqlBackend {
    pub fn new(dialect: Dialect) -> Self {
        SqlBackend { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn render(&self, expr: &SqlExpr) -> String {
        expr.to_sql(self.dialect)
    }

    /// `SELECT <columns> FROM <table>` for compiled, already aliased columns.
    pub fn select_sql(&self, table: &str, columns: &[(String, SqlExpr)]) -> String {
        let list: Vec<String> = columns.iter().map(|(_, e)| self.render(e)).collect();
        format!(
            "SELECT {} FROM {}",
            list.join(", "),
            self.dialect.quote_identifier(table)
        )
    }
}

impl Backend for SqlBackend {
    type Native = SqlExpr;

    fn engine(&self) -> Engine {
        self.dialect.engine()
    }

    fn column(&self, name: &str) -> SqlExpr {
        SqlExpr::Column(name.to_string())
    }

    fn function(&self, name: &str, args: Vec<SqlExpr>) -> Result<SqlExpr> {
        match self.dialect.spelling(name) {
            Some(Spelling::Plain(sql_name)) => Ok(SqlExpr::function(sql_name, args)),
            Some(Spelling::Distinct(sql_name)) => Ok(SqlExpr::Function {
                name: sql_name.to_string(),
                args,
                distinct: true,
            }),
            None => {
                debug!(dialect = ?self.dialect, function = name, "function outside dialect vocabulary");
                Err(EngineError::unsupported(name, self.engine().name()))
            }
        }
    }

    fn lit(&self, value: &LiteralValue) -> SqlExpr {
        SqlExpr::Literal(value.clone())
    }

    fn coalesce(&self, exprs: Vec<SqlExpr>) -> SqlExpr {
        SqlExpr::Coalesce(exprs)
    }

    fn when(&self, condition: SqlExpr, then: SqlExpr, otherwise: Option<SqlExpr>) -> SqlExpr {
        SqlExpr::Case {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: otherwise.map(Box::new),
        }
    }

    fn window_expression(&self, expr: SqlExpr, spec: &WindowSpec<SqlExpr>) -> Result<SqlExpr> {
        let order_by = spec
            .order_by
            .iter()
            .enumerate()
            .map(|(i, key)| OrderKey {
                expr: key.clone(),
                descending: spec.is_descending(i),
                nulls_last: spec.is_nulls_last(i),
            })
            .collect();
        let frame = spec.has_frame().then_some(Frame {
            start: spec.rows_start,
            end: spec.rows_end,
        });
        Ok(SqlExpr::Window {
            function: Box::new(expr),
            window: WindowClause {
                partition_by: spec.partition_by.clone(),
                order_by,
                frame,
            },
        })
    }

    fn count_star(&self) -> SqlExpr {
        SqlExpr::CountStar
    }

    fn alias_native(&self, expr: SqlExpr, name: &str) -> SqlExpr {
        SqlExpr::Alias {
            expr: Box::new(expr),
            name: name.to_string(),
        }
    }

    fn binary(&self, op: BinaryOp, left: SqlExpr, right: SqlExpr) -> SqlExpr {
        SqlExpr::binary(op, left, right)
    }

    fn unary(&self, op: UnaryOp, expr: SqlExpr) -> SqlExpr {
        SqlExpr::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    fn capability(&self, operation: Operation) -> Capability {
        match operation {
            Operation::ArgMax
            | Operation::ArgMin
            | Operation::Head
            | Operation::Tail
            | Operation::Sort
            | Operation::Unique
            | Operation::DropNulls => Capability::Unsupported(operation.name()),
            Operation::Cumulative(CumulativeOp::Product)
                if self.dialect.spelling("product").is_none() =>
            {
                Capability::Unsupported(operation.name())
            }
            _ => Capability::Supported,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::expr::RankMethod;
    use tabula_core::{Compiler, Expr, StructType, TabulaConfig, Version};

    fn compile(dialect: Dialect, expr: &Expr) -> Result<Vec<String>> {
        let backend = SqlBackend::new(dialect);
        let schema = StructType::from_names(["a", "b", "g", "i"]);
        let config = TabulaConfig::default();
        let compiled = Compiler::new(&backend, &schema, &config).compile(expr)?;
        Ok(compiled.iter().map(|(_, e)| backend.render(e)).collect())
    }

    fn col(engine: Engine, name: &str) -> Expr {
        Expr::columns([name], engine, Version::Main)
    }

    #[test]
    fn cumulative_sum_renders_running_frame() {
        let e = col(Engine::DuckDb, "a")
            .cum_sum(false)
            .over_columns(&["g"], &["i"]);
        assert_eq!(
            compile(Dialect::DuckDb, &e).unwrap(),
            ["sum(\"a\") OVER (PARTITION BY \"g\" ORDER BY \"i\" ASC NULLS FIRST \
              ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW) AS \"a\""]
        );
    }

    #[test]
    fn rolling_std_uses_sample_function_on_spark() {
        let e = col(Engine::SparkSql, "a")
            .rolling_std(3, Some(2), true, 1)
            .over_columns(&[], &["i"]);
        let sql = compile(Dialect::SparkSql, &e).unwrap().remove(0);
        assert!(sql.contains("stddev_samp(`a`) OVER (ORDER BY `i` ASC NULLS FIRST ROWS BETWEEN 1 PRECEDING AND 1 FOLLOWING)"), "{sql}");
        assert!(sql.starts_with("CASE WHEN (count(`a`) OVER"), "{sql}");
    }

    #[test]
    fn rank_is_null_guarded() {
        let e = col(Engine::DataFusion, "a").rank(RankMethod::Dense, true);
        assert_eq!(
            compile(Dialect::DataFusion, &e).unwrap(),
            ["CASE WHEN (NOT (\"a\" IS NULL)) THEN dense_rank() OVER (ORDER BY \"a\" DESC NULLS LAST) END AS \"a\""]
        );
    }

    #[test]
    fn order_sensitive_whole_column_ops_are_capability_errors() {
        let err = compile(Dialect::DuckDb, &col(Engine::DuckDb, "a").arg_max()).unwrap_err();
        assert_eq!(err, EngineError::unsupported("arg_max", "duckdb"));
        let err = compile(
            Dialect::DataFusion,
            &col(Engine::DataFusion, "a").cum_prod(false).over_columns(&[], &["i"]),
        )
        .unwrap_err();
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("cum_prod"));
    }

    #[test]
    fn unknown_function_is_a_capability_error() {
        let e = col(Engine::DuckDb, "a").function("frobnicate", vec![]);
        let err = compile(Dialect::DuckDb, &e).unwrap_err();
        assert_eq!(err, EngineError::unsupported("frobnicate", "duckdb"));
    }

    #[test]
    fn mean_is_renamed_for_datafusion() {
        let e = col(Engine::DataFusion, "a").mean().over_columns(&["g"], &[]);
        assert_eq!(
            compile(Dialect::DataFusion, &e).unwrap(),
            ["avg(\"a\") OVER (PARTITION BY \"g\") AS \"a\""]
        );
    }

    #[test]
    fn select_sql_lists_aliased_columns() {
        let backend = SqlBackend::new(Dialect::DuckDb);
        let schema = StructType::from_names(["a", "b"]);
        let config = TabulaConfig::default();
        let e = (col(Engine::DuckDb, "a") + col(Engine::DuckDb, "b")).alias("total");
        let columns = Compiler::new(&backend, &schema, &config).compile(&e).unwrap();
        assert_eq!(
            backend.select_sql("t", &columns),
            "SELECT (\"a\" + \"b\") AS \"total\" FROM \"t\""
        );
    }
}
