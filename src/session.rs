use polars::prelude::Expr as PlExpr;
use tabula_core::{Compiler, Engine, EngineError, Expr, Result, StructType, TabulaConfig, Version};
use tabula_sql::{Dialect, SqlBackend, SqlExpr};
use tracing::debug;

use crate::namespace::Namespace;
use crate::registry::{Registry, Resolved};

pub struct SessionBuilder {
    config: TabulaConfig,
    version: Version,
}

impl SessionBuilder {
    pub fn new() -> Self {
        SessionBuilder {
            config: TabulaConfig::default(),
            version: Version::default(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: TabulaConfig) -> Self {
        self.config = config;
        self
    }

    /// Start from `TABULA_*` environment variables.
    pub fn from_env(self) -> Result<Self> {
        Ok(self.config(TabulaConfig::from_env()?))
    }

    pub fn engine(mut self, engine: Engine) -> Self {
        self.config.default_engine = engine;
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn validate_column_names(mut self, validate: bool) -> Self {
        self.config.validate_column_names = validate;
        self
    }

    pub fn partitioned_rank_nulls_last(mut self, nulls_last: bool) -> Self {
        self.config.partitioned_rank_nulls_last = nulls_last;
        self
    }

    pub fn get_or_create(self) -> Session {
        debug!(engine = %self.config.default_engine, "creating tabula session");
        Session {
            config: self.config,
            version: self.version,
            registry: Registry::new(),
        }
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the configuration and one backend per engine; compiles expressions
/// for whichever engine they were built for.
pub struct Session {
    config: TabulaConfig,
    version: Version,
    registry: Registry,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn config(&self) -> &TabulaConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Namespace for the configured default engine.
    pub fn namespace(&self) -> Namespace {
        self.namespace_for(self.config.default_engine)
    }

    pub fn namespace_for(&self, engine: Engine) -> Namespace {
        Namespace::new(engine, self.version)
    }

    /// Compile one expression into `(output name, native expression)` pairs.
    pub fn compile(&self, expr: &Expr, schema: &StructType) -> Result<Compiled> {
        Ok(match self.registry.resolve(expr.engine()) {
            Resolved::Sql(backend) => Compiled::Sql {
                dialect: backend.dialect(),
                columns: Compiler::new(backend, schema, &self.config).compile(expr)?,
            },
            Resolved::Polars(backend) => {
                Compiled::Polars(Compiler::new(backend, schema, &self.config).compile(expr)?)
            }
        })
    }

    /// Compile a projection list; every expression must target the same engine.
    pub fn compile_all(&self, exprs: &[Expr], schema: &StructType) -> Result<Compiled> {
        let mut exprs = exprs.iter();
        let first = exprs
            .next()
            .ok_or_else(|| EngineError::User("nothing to compile".into()))?;
        let mut compiled = self.compile(first, schema)?;
        for expr in exprs {
            compiled.extend(self.compile(expr, schema)?)?;
        }
        Ok(compiled)
    }
}

/// Compiled outputs in the native form of the target engine.
#[derive(Debug, Clone)]
pub enum Compiled {
    Sql {
        dialect: Dialect,
        columns: Vec<(String, SqlExpr)>,
    },
    Polars(Vec<(String, PlExpr)>),
}

impl Compiled {
    pub fn names(&self) -> Vec<&str> {
        match self {
            Compiled::Sql { columns, .. } => columns.iter().map(|(n, _)| n.as_str()).collect(),
            Compiled::Polars(columns) => columns.iter().map(|(n, _)| n.as_str()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Compiled::Sql { columns, .. } => columns.len(),
            Compiled::Polars(columns) => columns.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rendered SQL of each output column, aliased. `None` for Polars.
    pub fn sql_columns(&self) -> Option<Vec<String>> {
        match self {
            Compiled::Sql { dialect, columns } => {
                let backend = SqlBackend::new(*dialect);
                Some(columns.iter().map(|(_, e)| backend.render(e)).collect())
            }
            Compiled::Polars(_) => None,
        }
    }

    /// `SELECT <outputs> FROM <table>`. `None` for Polars.
    pub fn to_sql(&self, table: &str) -> Option<String> {
        match self {
            Compiled::Sql { dialect, columns } => {
                Some(SqlBackend::new(*dialect).select_sql(table, columns))
            }
            Compiled::Polars(_) => None,
        }
    }

    /// Aliased polars expressions for `LazyFrame::select`. `None` for SQL.
    pub fn into_polars(self) -> Option<Vec<PlExpr>> {
        match self {
            Compiled::Polars(columns) => Some(columns.into_iter().map(|(_, e)| e).collect()),
            Compiled::Sql { .. } => None,
        }
    }

    fn extend(&mut self, other: Compiled) -> Result<()> {
        match (self, other) {
            (Compiled::Sql { dialect, columns }, Compiled::Sql { dialect: d, columns: more })
                if *dialect == d =>
            {
                columns.extend(more);
                Ok(())
            }
            (Compiled::Polars(columns), Compiled::Polars(more)) => {
                columns.extend(more);
                Ok(())
            }
            _ => Err(EngineError::User(
                "cannot mix expressions from different engines in one projection".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_config() {
        let session = Session::builder()
            .engine(Engine::SparkSql)
            .partitioned_rank_nulls_last(true)
            .get_or_create();
        assert_eq!(session.namespace().engine(), Engine::SparkSql);
        assert!(session.config().partitioned_rank_nulls_last);
        assert!(session.config().validate_column_names);
    }

    #[test]
    fn compile_dispatches_on_expression_engine() {
        let session = Session::builder().engine(Engine::DuckDb).get_or_create();
        let schema = StructType::from_names(["a"]);
        let sql = session.compile(&session.namespace().col("a"), &schema).unwrap();
        assert_eq!(sql.to_sql("t").unwrap(), "SELECT \"a\" AS \"a\" FROM \"t\"");
        let polars = session
            .compile(&session.namespace_for(Engine::Polars).col("a"), &schema)
            .unwrap();
        assert!(polars.to_sql("t").is_none());
        assert_eq!(polars.names(), ["a"]);
    }

    #[test]
    fn compile_all_rejects_mixed_engines() {
        let session = Session::builder().get_or_create();
        let schema = StructType::from_names(["a"]);
        let exprs = [
            session.namespace_for(Engine::DuckDb).col("a"),
            session.namespace_for(Engine::SparkSql).col("a"),
        ];
        let err = session.compile_all(&exprs, &schema).unwrap_err();
        assert!(matches!(err, EngineError::User(_)));
    }
}
