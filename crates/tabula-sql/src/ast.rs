//! A small SQL expression tree and its per-dialect rendering.

use serde::Serialize;
use tabula_core::expr::{BinaryOp, LiteralValue, UnaryOp};

use crate::dialect::Dialect;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlExpr {
    Column(String),
    Literal(LiteralValue),
    Function {
        name: String,
        args: Vec<SqlExpr>,
        distinct: bool,
    },
    CountStar,
    Binary {
        op: BinaryOp,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<SqlExpr>,
    },
    Coalesce(Vec<SqlExpr>),
    Case {
        condition: Box<SqlExpr>,
        then: Box<SqlExpr>,
        otherwise: Option<Box<SqlExpr>>,
    },
    Window {
        function: Box<SqlExpr>,
        window: WindowClause,
    },
    Alias {
        expr: Box<SqlExpr>,
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderKey {
    pub expr: SqlExpr,
    pub descending: bool,
    pub nulls_last: bool,
}

/// `ROWS BETWEEN start AND end`; `None` is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowClause {
    pub partition_by: Vec<SqlExpr>,
    pub order_by: Vec<OrderKey>,
    pub frame: Option<Frame>,
}

impl SqlExpr {
    pub fn function(name: impl Into<String>, args: Vec<SqlExpr>) -> SqlExpr {
        SqlExpr::Function {
            name: name.into(),
            args,
            distinct: false,
        }
    }

    pub fn binary(op: BinaryOp, left: SqlExpr, right: SqlExpr) -> SqlExpr {
        SqlExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let render = |e: &SqlExpr| e.to_sql(dialect);
        let list = |es: &[SqlExpr]| es.iter().map(render).collect::<Vec<_>>().join(", ");
        match self {
            SqlExpr::Column(name) => dialect.quote_identifier(name),
            SqlExpr::Literal(value) => literal(value),
            SqlExpr::Function {
                name,
                args,
                distinct,
            } => {
                let prefix = if *distinct { "DISTINCT " } else { "" };
                format!("{name}({prefix}{})", list(args))
            }
            SqlExpr::CountStar => "count(*)".to_string(),
            SqlExpr::Binary { op, left, right } => binary(dialect, *op, left, right),
            SqlExpr::Unary { op, expr } => {
                let e = render(expr);
                match op {
                    UnaryOp::Not => format!("(NOT {e})"),
                    UnaryOp::Negate => format!("(-{e})"),
                    UnaryOp::IsNull => format!("({e} IS NULL)"),
                    UnaryOp::IsNotNull => format!("({e} IS NOT NULL)"),
                }
            }
            SqlExpr::Coalesce(exprs) => format!("coalesce({})", list(exprs)),
            SqlExpr::Case {
                condition,
                then,
                otherwise,
            } => match otherwise {
                Some(o) => format!(
                    "CASE WHEN {} THEN {} ELSE {} END",
                    render(condition),
                    render(then),
                    render(o)
                ),
                None => format!("CASE WHEN {} THEN {} END", render(condition), render(then)),
            },
            SqlExpr::Window { function, window } => {
                format!("{} OVER ({})", render(function), window.to_sql(dialect))
            }
            SqlExpr::Alias { expr, name } => {
                format!("{} AS {}", render(expr), dialect.quote_identifier(name))
            }
        }
    }
}

impl WindowClause {
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut parts = Vec::new();
        if !self.partition_by.is_empty() {
            let keys: Vec<String> = self.partition_by.iter().map(|e| e.to_sql(dialect)).collect();
            parts.push(format!("PARTITION BY {}", keys.join(", ")));
        }
        if !self.order_by.is_empty() {
            let keys: Vec<String> = self
                .order_by
                .iter()
                .map(|k| {
                    format!(
                        "{} {} NULLS {}",
                        k.expr.to_sql(dialect),
                        if k.descending { "DESC" } else { "ASC" },
                        if k.nulls_last { "LAST" } else { "FIRST" }
                    )
                })
                .collect();
            parts.push(format!("ORDER BY {}", keys.join(", ")));
        }
        if let Some(frame) = self.frame {
            parts.push(format!(
                "ROWS BETWEEN {} AND {}",
                bound(frame.start, "UNBOUNDED PRECEDING"),
                bound(frame.end, "UNBOUNDED FOLLOWING")
            ));
        }
        parts.join(" ")
    }
}

fn bound(offset: Option<i64>, unbounded: &str) -> String {
    match offset {
        None => unbounded.to_string(),
        Some(0) => "CURRENT ROW".to_string(),
        Some(n) if n < 0 => format!("{} PRECEDING", -n),
        Some(n) => format!("{n} FOLLOWING"),
    }
}

fn literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::I64(v) => v.to_string(),
        LiteralValue::F64(v) if v.is_nan() => "CAST('NaN' AS DOUBLE)".to_string(),
        LiteralValue::F64(v) if v.is_infinite() => {
            let sign = if *v < 0.0 { "-" } else { "" };
            format!("CAST('{sign}Infinity' AS DOUBLE)")
        }
        LiteralValue::F64(v) => format!("{v:?}"),
        LiteralValue::Str(s) => format!("'{}'", s.replace('\'', "''")),
        LiteralValue::Bool(true) => "TRUE".to_string(),
        LiteralValue::Bool(false) => "FALSE".to_string(),
        LiteralValue::Null => "NULL".to_string(),
    }
}

fn binary(dialect: Dialect, op: BinaryOp, left: &SqlExpr, right: &SqlExpr) -> String {
    let l = left.to_sql(dialect);
    let r = right.to_sql(dialect);
    let symbol = match op {
        BinaryOp::Eq => "=",
        BinaryOp::NotEq => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::LtEq => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::GtEq => ">=",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Mod => "%",
        BinaryOp::And => "AND",
        BinaryOp::Or => "OR",
        BinaryOp::TrueDiv if dialect.integer_division_truncates() => {
            return format!("(CAST({l} AS DOUBLE) / {r})");
        }
        BinaryOp::TrueDiv => "/",
        BinaryOp::FloorDiv => {
            let quotient = binary(dialect, BinaryOp::TrueDiv, left, right);
            return format!("floor({quotient})");
        }
        BinaryOp::Pow => return format!("power({l}, {r})"),
    };
    format!("({l} {symbol} {r})")
}
