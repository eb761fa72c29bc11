//! Engine to backend dispatch.

use tabula_core::Engine;
use tabula_polars::PolarsBackend;
use tabula_sql::{Dialect, SqlBackend};

/// Backend resolved for one engine.
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'a> {
    Sql(&'a SqlBackend),
    Polars(&'a PolarsBackend),
}

/// One stateless backend instance per engine, owned by a session.
#[derive(Debug, Clone)]
pub struct Registry {
    polars: PolarsBackend,
    duckdb: SqlBackend,
    spark: SqlBackend,
    datafusion: SqlBackend,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            polars: PolarsBackend::new(),
            duckdb: SqlBackend::new(Dialect::DuckDb),
            spark: SqlBackend::new(Dialect::SparkSql),
            datafusion: SqlBackend::new(Dialect::DataFusion),
        }
    }

    pub fn resolve(&self, engine: Engine) -> Resolved<'_> {
        match engine {
            Engine::Polars => Resolved::Polars(&self.polars),
            Engine::DuckDb => Resolved::Sql(&self.duckdb),
            Engine::SparkSql => Resolved::Sql(&self.spark),
            Engine::DataFusion => Resolved::Sql(&self.datafusion),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::Backend;

    #[test]
    fn every_engine_resolves_to_its_backend() {
        let registry = Registry::new();
        for engine in Engine::ALL {
            let resolved_engine = match registry.resolve(engine) {
                Resolved::Sql(b) => b.engine(),
                Resolved::Polars(b) => b.engine(),
            };
            assert_eq!(resolved_engine, engine);
        }
    }
}
