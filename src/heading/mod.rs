//! Heading subsystem
//!
//! Attributes carry lineage as explicit data, assigned when a base-table
//! heading is declared and propagated by every operator:
//!
//! - native key attribute: lineage `(schema, table, attribute)`
//! - attribute inherited through a foreign key: lineage of its origin
//! - native secondary attribute, computed attribute: no lineage
//! - renamed attribute: lineage of its source

mod attribute;
#[allow(clippy::module_inception)]
mod heading;

pub use attribute::{Attribute, AttributeExpression, Lineage};
pub use heading::Heading;
