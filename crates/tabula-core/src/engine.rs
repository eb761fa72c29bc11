//! Engine identity: the fixed set of backends an expression can be bound to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Which concrete backend vocabulary an expression is compiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// In-memory columnar engine (polars lazy expressions).
    #[default]
    Polars,
    DuckDb,
    SparkSql,
    DataFusion,
}

impl Engine {
    pub const ALL: [Engine; 4] = [
        Engine::Polars,
        Engine::DuckDb,
        Engine::SparkSql,
        Engine::DataFusion,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Engine::Polars => "polars",
            Engine::DuckDb => "duckdb",
            Engine::SparkSql => "sparksql",
            Engine::DataFusion => "datafusion",
        }
    }

    /// Engines compiled to SQL text rather than a native expression object.
    pub fn is_sql(self) -> bool {
        !matches!(self, Engine::Polars)
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Engine {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polars" => Ok(Engine::Polars),
            "duckdb" => Ok(Engine::DuckDb),
            "sparksql" | "spark" | "pyspark" => Ok(Engine::SparkSql),
            "datafusion" => Ok(Engine::DataFusion),
            other => Err(EngineError::User(format!(
                "unknown engine '{other}'; expected one of polars, duckdb, sparksql, datafusion"
            ))),
        }
    }
}

/// API version an expression was built under. Carried unchanged through
/// every combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Version {
    V1,
    #[default]
    Main,
}
