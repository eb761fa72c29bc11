//! Configuration for tabula compilation sessions.
//!
//! Build a [`TabulaConfig`] from code, from environment variables or from
//! JSON, then hand it to a session builder.

use std::env;

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::EngineError;

pub const ENV_ENGINE: &str = "TABULA_ENGINE";
pub const ENV_VALIDATE_COLUMNS: &str = "TABULA_VALIDATE_COLUMNS";
pub const ENV_RANK_NULLS_LAST: &str = "TABULA_RANK_NULLS_LAST";

/// Compilation settings shared by every backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabulaConfig {
    /// Engine used when a namespace is created without an explicit engine.
    pub default_engine: Engine,
    /// Fail with `NotFound` when a selected column is missing from the schema.
    pub validate_column_names: bool,
    /// Sort the extra ordering keys of a partitioned rank with nulls last
    /// instead of nulls first. Off by default, which matches the ordering of
    /// an unpartitioned sort.
    pub partitioned_rank_nulls_last: bool,
}

impl Default for TabulaConfig {
    fn default() -> Self {
        TabulaConfig {
            default_engine: Engine::default(),
            validate_column_names: true,
            partitioned_rank_nulls_last: false,
        }
    }
}

impl TabulaConfig {
    pub fn with_default_engine(mut self, engine: Engine) -> Self {
        self.default_engine = engine;
        self
    }

    pub fn with_validate_column_names(mut self, validate: bool) -> Self {
        self.validate_column_names = validate;
        self
    }

    pub fn with_partitioned_rank_nulls_last(mut self, nulls_last: bool) -> Self {
        self.partitioned_rank_nulls_last = nulls_last;
        self
    }

    /// Read overrides from `TABULA_*` environment variables on top of the defaults.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`TabulaConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let mut config = TabulaConfig::default();
        if let Some(engine) = lookup(ENV_ENGINE) {
            config.default_engine = engine.parse()?;
        }
        if let Some(v) = lookup(ENV_VALIDATE_COLUMNS) {
            config.validate_column_names = parse_flag(ENV_VALIDATE_COLUMNS, &v)?;
        }
        if let Some(v) = lookup(ENV_RANK_NULLS_LAST) {
            config.partitioned_rank_nulls_last = parse_flag(ENV_RANK_NULLS_LAST, &v)?;
        }
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, EngineError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(EngineError::User(format!(
            "{key} must be a boolean flag, got '{other}'"
        ))),
    }
}
