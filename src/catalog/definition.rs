//! Table definitions
//!
//! JSON documents of the form:
//!
//! ```json
//! {
//!   "schema": "lab",
//!   "table": "session",
//!   "primary_key": [
//!     {"foreign_key": {"references": "lab.subject"}},
//!     {"attribute": {"name": "session_idx", "type": "int"}}
//!   ],
//!   "secondary": [
//!     {"attribute": {"name": "session_date", "type": "date"}}
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::expression::TableRef;

/// Declaration of one base table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub comment: String,
    pub primary_key: Vec<DefinitionItem>,
    #[serde(default)]
    pub secondary: Vec<DefinitionItem>,
}

impl TableDefinition {
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.schema, &self.table)
    }

    /// Every foreign key of the table, key section first
    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKeyDefinition> {
        self.primary_key
            .iter()
            .chain(&self.secondary)
            .filter_map(|item| match item {
                DefinitionItem::ForeignKey(fk) => Some(fk),
                DefinitionItem::Attribute(_) => None,
            })
    }
}

/// A line of a table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionItem {
    Attribute(AttributeDefinition),
    ForeignKey(ForeignKeyDefinition),
}

/// Natively declared attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub comment: String,
}

/// Reference to the primary key of another table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDefinition {
    /// `schema.table`
    pub references: String,
    /// New name -> referenced key attribute
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    #[serde(default)]
    pub nullable: bool,
}

impl ForeignKeyDefinition {
    /// Local name of a referenced key attribute
    pub fn local_name<'a>(&'a self, referenced: &'a str) -> &'a str {
        self.rename
            .iter()
            .find(|(_, old)| old.as_str() == referenced)
            .map_or(referenced, |(new, _)| new.as_str())
    }
}
