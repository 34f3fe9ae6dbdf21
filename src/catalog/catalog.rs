//! Catalog of base-table headings
//!
//! Definitions are registered in memory or loaded from a directory of JSON
//! files, then resolved into headings in foreign-key order so that inherited
//! attributes carry the lineage of their origin through any number of hops.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use super::definition::{AttributeDefinition, DefinitionItem, ForeignKeyDefinition, TableDefinition};
use super::errors::{CatalogError, CatalogResult};
use super::graph::DependencyGraph;
use crate::errors::AlgebraResult;
use crate::expression::{HeadingProvider, QueryExpression, TableRef};
use crate::heading::{Attribute, Heading, Lineage};

/// Table definitions and their resolved headings
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    definitions: BTreeMap<TableRef, TableDefinition>,
    headings: BTreeMap<TableRef, Heading>,
    graph: DependencyGraph,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.json` file in `dir` and resolves the result.
    pub fn load_dir(dir: &Path) -> CatalogResult<Self> {
        let io_error = |source| CatalogError::Io {
            path: dir.display().to_string(),
            source,
        };
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            // Skip non-JSON files
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut catalog = Self::new();
        for path in &paths {
            catalog.load_file(path)?;
        }
        catalog.resolve()?;
        Ok(catalog)
    }

    /// Registers the definition stored in a single file.
    pub fn load_file(&mut self, path: &Path) -> CatalogResult<()> {
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let definition: TableDefinition =
            serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        self.register(definition)
    }

    /// Registers a definition. Headings are stale until `resolve` runs.
    pub fn register(&mut self, definition: TableDefinition) -> CatalogResult<()> {
        let table = definition.table_ref();
        if self.definitions.contains_key(&table) {
            return Err(CatalogError::DuplicateTable(table.to_string()));
        }
        if definition.primary_key.is_empty() {
            return Err(CatalogError::EmptyPrimaryKey(table.to_string()));
        }
        self.definitions.insert(table, definition);
        Ok(())
    }

    /// Rebuilds the dependency graph and every heading.
    pub fn resolve(&mut self) -> CatalogResult<()> {
        let mut graph = DependencyGraph::new();
        for (table, definition) in &self.definitions {
            graph.add_table(table);
            for fk in definition.foreign_keys() {
                let parent = self.referenced_table(table, fk)?;
                graph.add_dependency(table, &parent);
            }
        }

        let mut headings = BTreeMap::new();
        for table in graph.topological_order()? {
            if let Some(definition) = self.definitions.get(&table) {
                let heading = self.resolve_table(definition, &headings)?;
                debug!(
                    table = %table,
                    attributes = heading.len(),
                    key = ?heading.primary_key(),
                    "resolved table heading"
                );
                headings.insert(table, heading);
            }
        }
        self.graph = graph;
        self.headings = headings;
        Ok(())
    }

    fn referenced_table(
        &self,
        table: &TableRef,
        fk: &ForeignKeyDefinition,
    ) -> CatalogResult<TableRef> {
        let unknown = || CatalogError::UnknownTable {
            table: fk.references.clone(),
            referenced_by: table.to_string(),
        };
        let parent: TableRef = fk.references.parse().map_err(|_| unknown())?;
        if !self.definitions.contains_key(&parent) {
            return Err(unknown());
        }
        Ok(parent)
    }

    fn resolve_table(
        &self,
        definition: &TableDefinition,
        resolved: &BTreeMap<TableRef, Heading>,
    ) -> CatalogResult<Heading> {
        let table = definition.table_ref();
        let mut attributes: Vec<Attribute> = Vec::new();
        let sections = [(&definition.primary_key, true), (&definition.secondary, false)];
        for (items, in_key) in sections {
            for item in items {
                let declared = match item {
                    DefinitionItem::Attribute(attr) => {
                        vec![native_attribute(definition, attr, in_key)?]
                    }
                    DefinitionItem::ForeignKey(fk) => {
                        let parent = self.referenced_table(&table, fk)?;
                        let parent_heading = resolved.get(&parent).ok_or_else(|| {
                            CatalogError::UnknownTable {
                                table: parent.to_string(),
                                referenced_by: table.to_string(),
                            }
                        })?;
                        inherited_attributes(&table, fk, parent_heading, in_key)?
                    }
                };
                for attr in declared {
                    push_attribute(&table, &mut attributes, attr)?;
                }
            }
        }

        if !attributes.iter().any(|a| a.in_key) {
            return Err(CatalogError::EmptyPrimaryKey(table.to_string()));
        }
        Heading::new(attributes).map_err(|e| CatalogError::InvalidDefinition {
            table: table.to_string(),
            reason: e.message().to_string(),
        })
    }

    pub fn heading(&self, table: &TableRef) -> Option<&Heading> {
        self.headings.get(table)
    }

    pub fn definition(&self, table: &TableRef) -> Option<&TableDefinition> {
        self.definitions.get(table)
    }

    /// Resolved tables, sorted
    pub fn tables(&self) -> impl Iterator<Item = &TableRef> {
        self.headings.keys()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Base-table expression for `schema.table`
    pub fn expression(&self, name: &str) -> AlgebraResult<QueryExpression> {
        QueryExpression::table(self, name)
    }
}

impl HeadingProvider for Catalog {
    fn heading(&self, table: &TableRef) -> Option<Heading> {
        self.headings.get(table).cloned()
    }
}

fn native_attribute(
    definition: &TableDefinition,
    attr: &AttributeDefinition,
    in_key: bool,
) -> CatalogResult<Attribute> {
    if in_key && attr.nullable {
        return Err(CatalogError::InvalidDefinition {
            table: definition.table_ref().to_string(),
            reason: format!("primary key attribute `{}` cannot be nullable", attr.name),
        });
    }
    Ok(Attribute {
        name: attr.name.clone(),
        attribute_type: attr.attribute_type.clone(),
        in_key,
        nullable: attr.nullable,
        default: attr.default.clone(),
        comment: attr.comment.clone(),
        lineage: in_key.then(|| Lineage::new(&definition.schema, &definition.table, &attr.name)),
        expression: None,
    })
}

/// Copies of the parent's key attributes, keeping their origin lineage
fn inherited_attributes(
    table: &TableRef,
    fk: &ForeignKeyDefinition,
    parent: &Heading,
    in_key: bool,
) -> CatalogResult<Vec<Attribute>> {
    if in_key && fk.nullable {
        return Err(CatalogError::InvalidDefinition {
            table: table.to_string(),
            reason: format!(
                "foreign key to {} in the primary key cannot be nullable",
                fk.references
            ),
        });
    }
    let parent_key = parent.primary_key();
    if let Some((_, old)) = fk.rename.iter().find(|(_, old)| !parent_key.contains(&old.as_str())) {
        return Err(CatalogError::InvalidDefinition {
            table: table.to_string(),
            reason: format!("`{}` is not a primary key attribute of {}", old, fk.references),
        });
    }
    Ok(parent
        .attributes()
        .iter()
        .filter(|a| a.in_key)
        .map(|a| Attribute {
            name: fk.local_name(&a.name).to_string(),
            in_key,
            nullable: fk.nullable,
            default: None,
            expression: None,
            ..a.clone()
        })
        .collect())
}

/// Adds an attribute; a homologous namesake (diamond inheritance) is merged.
fn push_attribute(
    table: &TableRef,
    attributes: &mut Vec<Attribute>,
    attr: Attribute,
) -> CatalogResult<()> {
    match attributes.iter().find(|a| a.name == attr.name) {
        Some(existing) if existing.is_homologous(&attr) => Ok(()),
        Some(_) => Err(CatalogError::DuplicateAttribute {
            table: table.to_string(),
            attribute: attr.name,
        }),
        None => {
            attributes.push(attr);
            Ok(())
        }
    }
}
