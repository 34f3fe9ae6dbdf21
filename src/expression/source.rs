//! FROM-clause sources and base-table lookup

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::QueryExpression;
use crate::config::EngineConfig;
use crate::errors::AlgebraError;
use crate::heading::Heading;

/// Identity of a base table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Fully qualified, quoted table name
    pub fn to_sql(&self, config: &EngineConfig) -> String {
        format!("{}.{}", config.quote(&self.schema), config.quote(&self.table))
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

impl FromStr for TableRef {
    type Err = AlgebraError;

    /// Parses `schema.table`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((schema, table))
                if !schema.is_empty() && !table.is_empty() && !table.contains('.') =>
            {
                Ok(TableRef::new(schema, table))
            }
            _ => Err(AlgebraError::unknown_table(s)),
        }
    }
}

/// One entry of an expression's FROM clause
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Base table
    Table(TableRef),
    /// Derived table
    Query(Arc<QueryExpression>),
}

/// Supplies base-table headings, keyed by table identity.
pub trait HeadingProvider {
    fn heading(&self, table: &TableRef) -> Option<Heading>;
}

impl HeadingProvider for HashMap<TableRef, Heading> {
    fn heading(&self, table: &TableRef) -> Option<Heading> {
        self.get(table).cloned()
    }
}

impl HeadingProvider for BTreeMap<TableRef, Heading> {
    fn heading(&self, table: &TableRef) -> Option<Heading> {
        self.get(table).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_ref() {
        let t: TableRef = "lab.session".parse().unwrap();
        assert_eq!(t, TableRef::new("lab", "session"));
        assert_eq!(t.to_string(), "lab.session");
    }

    #[test]
    fn test_parse_rejects_unqualified() {
        assert!("session".parse::<TableRef>().is_err());
        assert!(".session".parse::<TableRef>().is_err());
        assert!("a.b.c".parse::<TableRef>().is_err());
    }

    #[test]
    fn test_table_sql() {
        let t = TableRef::new("lab", "session");
        assert_eq!(t.to_sql(&EngineConfig::default()), "`lab`.`session`");
        assert_eq!(t.to_sql(&EngineConfig::ansi()), "\"lab\".\"session\"");
    }
}
