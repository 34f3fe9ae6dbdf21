//! Condition subsystem
//!
//! A restriction on an expression is a conjunction (`AndList`) of terms. Each
//! term is one of: equality mapping, predicate string, subquery (semijoin),
//! conjunction, disjunction, negation.

#[allow(clippy::module_inception)]
mod condition;
mod identifiers;
mod literal;

pub use condition::{AndList, Condition, Subquery};
pub use identifiers::{extract_identifiers, referenced_names};
pub use literal::render_literal;

pub(crate) use literal::check_scalar;
