//! # Executor Trait

use serde_json::{Map, Value};

use super::errors::BoxError;

/// A result row, keyed by column name
pub type Row = Map<String, Value>;

/// Runs SQL against the backing engine.
///
/// Connection handling, transactions and retries belong to the
/// implementation; the algebra only needs rows back.
pub trait Executor: Send + Sync {
    fn query(&self, sql: &str) -> Result<Vec<Row>, BoxError>;
}
