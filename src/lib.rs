//! relalg - relational algebra over lineage-aware table headings
//!
//! Query expressions are built from base tables by restriction, projection,
//! join, aggregation and union. Every operation computes the primary key of
//! its result and refuses joins whose matched attributes do not share
//! lineage. Expressions render to a single SQL statement and are fetched
//! through an `Executor` supplied by the caller.

pub mod catalog;
pub mod cli;
pub mod condition;
pub mod config;
pub mod errors;
pub mod expression;
pub mod fetch;
pub mod heading;

pub use catalog::{Catalog, CatalogError};
pub use condition::Condition;
pub use config::EngineConfig;
pub use errors::{AlgebraError, AlgebraErrorCode, AlgebraResult};
pub use expression::{Projection, QueryExpression, TableRef, UniversalSet};
pub use fetch::{Executor, FetchError};
pub use heading::{Attribute, Heading, Lineage};
