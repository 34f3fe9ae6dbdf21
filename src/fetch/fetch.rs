//! Materializing expressions through an executor

use serde_json::Value;
use tracing::debug;

use super::errors::{FetchError, FetchResult};
use super::executor::{Executor, Row};
use crate::config::EngineConfig;
use crate::expression::{Projection, QueryExpression};

impl QueryExpression {
    /// Every attribute of every row
    pub fn fetch(&self, executor: &impl Executor) -> FetchResult<Vec<Row>> {
        self.fetch_with(executor, &EngineConfig::default())
    }

    pub fn fetch_with(
        &self,
        executor: &impl Executor,
        config: &EngineConfig,
    ) -> FetchResult<Vec<Row>> {
        run(executor, &self.to_sql_with(config))
    }

    /// Primary-key values of every row
    pub fn fetch_keys(&self, executor: &impl Executor) -> FetchResult<Vec<Row>> {
        let keys = self.proj(&Projection::new())?;
        keys.fetch(executor)
    }

    /// Number of rows
    pub fn count(&self, executor: &impl Executor) -> FetchResult<u64> {
        self.count_with(executor, &EngineConfig::default())
    }

    pub fn count_with(&self, executor: &impl Executor, config: &EngineConfig) -> FetchResult<u64> {
        let rows = run(executor, &self.count_sql_with(config))?;
        let value = rows
            .first()
            .and_then(|row| row.values().next())
            .ok_or_else(|| FetchError::UnexpectedResult("count returned no rows".to_string()))?;
        let count = match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        };
        count.ok_or_else(|| FetchError::UnexpectedResult(format!("count returned {}", value)))
    }

    /// True when the expression has at least one row
    pub fn exists(&self, executor: &impl Executor) -> FetchResult<bool> {
        Ok(self.count(executor)? > 0)
    }
}

fn run(executor: &impl Executor, sql: &str) -> FetchResult<Vec<Row>> {
    let rows = executor.query(sql).map_err(FetchError::Backend)?;
    debug!(rows = rows.len(), "query returned");
    Ok(rows)
}
