//! Catalog subsystem
//!
//! Supplies base-table headings to the algebra. Table definitions are JSON
//! documents; resolution walks the foreign-key graph parents-first and
//! assigns lineage:
//!
//! - natively declared key attributes: `(schema, table, attribute)`
//! - attributes inherited through a foreign key: the origin's lineage
//! - natively declared secondary attributes: none

#[allow(clippy::module_inception)]
mod catalog;
mod definition;
mod errors;
mod graph;

pub use catalog::Catalog;
pub use definition::{AttributeDefinition, DefinitionItem, ForeignKeyDefinition, TableDefinition};
pub use errors::{CatalogError, CatalogResult};
pub use graph::DependencyGraph;
