//! # Catalog Errors
//!
//! Errors raised while loading table definitions and resolving headings.

use thiserror::Error;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Table definition and resolution errors
#[derive(Debug, Error)]
pub enum CatalogError {
    // ==================
    // Loading Errors
    // ==================
    /// Definition file or directory could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Definition file is not a valid table definition
    #[error("Invalid table definition in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Same table defined twice
    #[error("Table {0} is defined more than once")]
    DuplicateTable(String),

    // ==================
    // Resolution Errors
    // ==================
    /// Foreign key references a table that is not defined
    #[error("Table {table} referenced by {referenced_by} is not defined")]
    UnknownTable { table: String, referenced_by: String },

    /// Foreign keys form a cycle
    #[error("Foreign key cycle through table {0}")]
    Cycle(String),

    /// Two attributes of different origin share a name
    #[error("Attribute {attribute} is declared more than once in {table}")]
    DuplicateAttribute { table: String, attribute: String },

    /// Table has no primary key attribute
    #[error("Table {0} has an empty primary key")]
    EmptyPrimaryKey(String),

    /// Definition is structurally invalid
    #[error("Invalid definition of {table}: {reason}")]
    InvalidDefinition { table: String, reason: String },
}
