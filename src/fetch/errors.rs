//! # Fetch Errors

use thiserror::Error;

use crate::errors::AlgebraError;

/// Error type returned by an executor backend
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors while materializing an expression
#[derive(Debug, Error)]
pub enum FetchError {
    /// Expression could not be turned into a query
    #[error(transparent)]
    Algebra(#[from] AlgebraError),

    /// Backend failed to run the query; passed through untouched
    #[error("Query execution failed: {0}")]
    Backend(#[source] BoxError),

    /// Backend returned rows of an unexpected shape
    #[error("Unexpected result: {0}")]
    UnexpectedResult(String),
}
