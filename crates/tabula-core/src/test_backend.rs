//! Minimal text backend for unit tests: renders native expressions as
//! strings with no dialect rules.

use crate::backend::Backend;
use crate::engine::Engine;
use crate::error::Result;
use crate::expr::{BinaryOp, LiteralValue, UnaryOp};
use crate::window::WindowSpec;

pub(crate) struct TextBackend;

impl Backend for TextBackend {
    type Native = String;

    fn engine(&self) -> Engine {
        Engine::DuckDb
    }

    fn column(&self, name: &str) -> String {
        name.to_string()
    }

    fn function(&self, name: &str, args: Vec<String>) -> Result<String> {
        Ok(format!("{name}({})", args.join(", ")))
    }

    fn lit(&self, value: &LiteralValue) -> String {
        match value {
            LiteralValue::I64(v) => v.to_string(),
            LiteralValue::F64(v) => format!("{v:?}"),
            LiteralValue::Str(s) => format!("'{s}'"),
            LiteralValue::Bool(b) => b.to_string(),
            LiteralValue::Null => "NULL".to_string(),
        }
    }

    fn coalesce(&self, exprs: Vec<String>) -> String {
        format!("coalesce({})", exprs.join(", "))
    }

    fn when(&self, condition: String, then: String, otherwise: Option<String>) -> String {
        match otherwise {
            Some(o) => format!("CASE WHEN {condition} THEN {then} ELSE {o} END"),
            None => format!("CASE WHEN {condition} THEN {then} END"),
        }
    }

    fn window_expression(&self, expr: String, spec: &WindowSpec<String>) -> Result<String> {
        let mut parts = Vec::new();
        if !spec.partition_by.is_empty() {
            parts.push(format!("PARTITION BY {}", spec.partition_by.join(", ")));
        }
        if !spec.order_by.is_empty() {
            let keys: Vec<String> = spec
                .order_by
                .iter()
                .enumerate()
                .map(|(i, k)| {
                    let dir = if spec.is_descending(i) { "DESC" } else { "ASC" };
                    let nulls = if spec.is_nulls_last(i) { "LAST" } else { "FIRST" };
                    format!("{k} {dir} NULLS {nulls}")
                })
                .collect();
            parts.push(format!("ORDER BY {}", keys.join(", ")));
        }
        if spec.has_frame() {
            let bound = |b: Option<i64>| b.map_or("UNBOUNDED".to_string(), |v| v.to_string());
            parts.push(format!(
                "ROWS {}..{}",
                bound(spec.rows_start),
                bound(spec.rows_end)
            ));
        }
        Ok(format!("{expr} OVER ({})", parts.join(" ")))
    }

    fn count_star(&self) -> String {
        "count(*)".to_string()
    }

    fn alias_native(&self, expr: String, name: &str) -> String {
        format!("{expr} AS {name}")
    }

    fn binary(&self, op: BinaryOp, left: String, right: String) -> String {
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
            BinaryOp::TrueDiv => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        };
        format!("({left} {symbol} {right})")
    }

    fn unary(&self, op: UnaryOp, expr: String) -> String {
        match op {
            UnaryOp::Not => format!("(NOT {expr})"),
            UnaryOp::Negate => format!("(-{expr})"),
            UnaryOp::IsNull => format!("({expr} IS NULL)"),
            UnaryOp::IsNotNull => format!("({expr} IS NOT NULL)"),
        }
    }
}
