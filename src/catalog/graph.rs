//! Foreign-key dependency graph
//!
//! Edges point from the referenced (parent) table to the referencing (child)
//! table, so a topological order resolves parents before children.

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use super::errors::{CatalogError, CatalogResult};
use crate::expression::TableRef;

/// Tables and the foreign keys between them
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<TableRef, ()>,
    node_indices: HashMap<TableRef, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table if not present.
    pub fn add_table(&mut self, table: &TableRef) -> NodeIndex {
        if let Some(&index) = self.node_indices.get(table) {
            return index;
        }
        let index = self.graph.add_node(table.clone());
        self.node_indices.insert(table.clone(), index);
        index
    }

    /// `child` has a foreign key to `parent`.
    pub fn add_dependency(&mut self, child: &TableRef, parent: &TableRef) {
        let child = self.add_table(child);
        let parent = self.add_table(parent);
        if !self.graph.contains_edge(parent, child) {
            self.graph.add_edge(parent, child, ());
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, table: &TableRef) -> bool {
        self.node_indices.contains_key(table)
    }

    /// Parents before children; fails on a cycle.
    pub fn topological_order(&self) -> CatalogResult<Vec<TableRef>> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|i| self.graph[i].clone()).collect())
            .map_err(|cycle| CatalogError::Cycle(self.graph[cycle.node_id()].to_string()))
    }

    /// Tables `table` references directly
    pub fn parents(&self, table: &TableRef) -> Vec<TableRef> {
        self.neighbors(table, Direction::Incoming)
    }

    /// Tables referencing `table` directly
    pub fn children(&self, table: &TableRef) -> Vec<TableRef> {
        self.neighbors(table, Direction::Outgoing)
    }

    /// Every table `table` depends on, through any number of hops
    pub fn ancestors(&self, table: &TableRef) -> BTreeSet<TableRef> {
        let mut seen = BTreeSet::new();
        let mut stack = self.parents(table);
        while let Some(next) = stack.pop() {
            if seen.insert(next.clone()) {
                stack.extend(self.parents(&next));
            }
        }
        seen
    }

    fn neighbors(&self, table: &TableRef, direction: Direction) -> Vec<TableRef> {
        let Some(&index) = self.node_indices.get(table) else {
            return Vec::new();
        };
        let mut out: Vec<TableRef> = self
            .graph
            .neighbors_directed(index, direction)
            .map(|i| self.graph[i].clone())
            .collect();
        out.sort();
        out
    }
}
