//! SQL dialects: identifier quoting, function vocabulary and operator quirks.

use serde::{Deserialize, Serialize};
use tabula_core::Engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    DuckDb,
    SparkSql,
    DataFusion,
}

/// How a logical function name is spelled in a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spelling {
    Plain(&'static str),
    /// Aggregate over distinct values, `name(DISTINCT ...)`.
    Distinct(&'static str),
}

/// Functions every dialect spells the same way.
const COMMON: &[&str] = &[
    "abs",
    "sqrt",
    "exp",
    "ln",
    "round",
    "floor",
    "ceil",
    "sign",
    "power",
    "lower",
    "upper",
    "length",
    "trim",
    "concat",
    "sum",
    "median",
    "min",
    "max",
    "count",
    "bool_and",
    "bool_or",
    "stddev_pop",
    "stddev_samp",
    "var_pop",
    "var_samp",
    "greatest",
    "least",
    "lag",
    "lead",
    "row_number",
    "rank",
    "dense_rank",
];

impl Dialect {
    pub fn engine(self) -> Engine {
        match self {
            Dialect::DuckDb => Engine::DuckDb,
            Dialect::SparkSql => Engine::SparkSql,
            Dialect::DataFusion => Engine::DataFusion,
        }
    }

    pub fn from_engine(engine: Engine) -> Option<Dialect> {
        match engine {
            Engine::DuckDb => Some(Dialect::DuckDb),
            Engine::SparkSql => Some(Dialect::SparkSql),
            Engine::DataFusion => Some(Dialect::DataFusion),
            Engine::Polars => None,
        }
    }

    pub fn quote_identifier(self, name: &str) -> String {
        match self {
            Dialect::SparkSql => format!("`{}`", name.replace('`', "``")),
            Dialect::DuckDb | Dialect::DataFusion => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Spelling of a logical function name, `None` outside the vocabulary.
    pub fn spelling(self, name: &str) -> Option<Spelling> {
        match (self, name) {
            (_, "count_distinct") => Some(Spelling::Distinct("count")),
            (Dialect::DataFusion, "mean") => Some(Spelling::Plain("avg")),
            (Dialect::DuckDb | Dialect::SparkSql, "mean") => Some(Spelling::Plain("mean")),
            (Dialect::DuckDb | Dialect::SparkSql, "product") => Some(Spelling::Plain("product")),
            (Dialect::DataFusion, "product") => None,
            (_, other) => COMMON
                .iter()
                .find(|f| **f == other)
                .copied()
                .map(Spelling::Plain),
        }
    }

    /// Integer division truncates unless an operand is cast to a float first.
    pub fn integer_division_truncates(self) -> bool {
        matches!(self, Dialect::DataFusion)
    }
}
