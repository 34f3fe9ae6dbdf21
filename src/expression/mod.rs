//! Query expressions
//!
//! Immutable relational expressions over base tables, the algebra operators
//! that combine them, backprojection, and SQL emission.
//!
//! Operators never modify their inputs. When an operand cannot be merged into
//! the FROM clause of the result it is promoted to a derived table first.

mod aggregate;
#[allow(clippy::module_inception)]
mod expression;
mod finalize;
mod join;
mod project;
mod restrict;
mod semantic;
mod source;
mod sql;
mod top;
mod union;
mod universal;

pub use expression::{ExpressionKind, JoinStep, QueryExpression};
pub use project::{Projection, ALL_SECONDARY};
pub use source::{HeadingProvider, Source, TableRef};
pub use top::{OrderBy, Top, KEY_ORDER};
pub use universal::UniversalSet;
