//! The query expression node
//!
//! An expression is `{heading, restriction, support}` plus the bookkeeping the
//! SQL generator needs. Nodes are never mutated once built: every operator
//! clones what it keeps and returns a new node, and derived tables are shared
//! through `Arc`.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use super::source::{HeadingProvider, Source, TableRef};
use super::top::Top;
use crate::condition::AndList;
use crate::errors::{AlgebraError, AlgebraResult};
use crate::heading::Heading;

/// One join step between consecutive supports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStep {
    /// Left outer join
    pub left: bool,
    /// Matched attribute names (USING list)
    pub attributes: Vec<String>,
}

/// What the node computes over its supports
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// SELECT ... FROM ... WHERE restriction
    Select,
    /// SELECT ... FROM ... WHERE pre_restriction GROUP BY group_by HAVING restriction
    Aggregation {
        group_by: Vec<String>,
        pre_restriction: AndList,
    },
    /// Set union of the supports
    Union,
}

/// Immutable relational expression
#[derive(Debug, Clone, PartialEq)]
pub struct QueryExpression {
    pub(crate) heading: Heading,
    pub(crate) restriction: AndList,
    pub(crate) restriction_attributes: BTreeSet<String>,
    pub(crate) support: Vec<Source>,
    pub(crate) joins: Vec<JoinStep>,
    /// Column names visible in the FROM clause
    pub(crate) from_names: BTreeSet<String>,
    pub(crate) kind: ExpressionKind,
    pub(crate) distinct: bool,
    pub(crate) top: Option<Top>,
}

impl QueryExpression {
    /// Expression over a single base table with the given heading
    pub fn from_table(table: TableRef, heading: Heading) -> Self {
        let from_names = heading.names().into_iter().map(str::to_string).collect();
        Self {
            heading,
            restriction: AndList::new(),
            restriction_attributes: BTreeSet::new(),
            support: vec![Source::Table(table)],
            joins: Vec::new(),
            from_names,
            kind: ExpressionKind::Select,
            distinct: false,
            top: None,
        }
    }

    /// Looks up `schema.table` in the provider.
    pub fn table(provider: &impl HeadingProvider, name: &str) -> AlgebraResult<Self> {
        let table: TableRef = name.parse()?;
        let heading = provider
            .heading(&table)
            .ok_or_else(|| AlgebraError::unknown_table(name))?;
        Ok(Self::from_table(table, heading))
    }

    pub fn heading(&self) -> &Heading {
        &self.heading
    }

    pub fn primary_key(&self) -> Vec<&str> {
        self.heading.primary_key()
    }

    pub fn restriction(&self) -> &AndList {
        &self.restriction
    }

    pub fn support(&self) -> &[Source] {
        &self.support
    }

    pub fn joins(&self) -> &[JoinStep] {
        &self.joins
    }

    pub fn kind(&self) -> &ExpressionKind {
        &self.kind
    }

    pub fn is_aggregation(&self) -> bool {
        matches!(self.kind, ExpressionKind::Aggregation { .. })
    }

    pub fn is_union(&self) -> bool {
        matches!(self.kind, ExpressionKind::Union)
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn top_clause(&self) -> Option<&Top> {
        self.top.as_ref()
    }

    /// Wraps this expression as a derived table. The new heading exposes
    /// every attribute as a plain column.
    pub fn make_subquery(&self) -> QueryExpression {
        let heading = self.heading.make_subquery_heading();
        let from_names = heading.names().into_iter().map(str::to_string).collect();
        QueryExpression {
            heading,
            restriction: AndList::new(),
            restriction_attributes: BTreeSet::new(),
            support: vec![Source::Query(Arc::new(self.clone()))],
            joins: Vec::new(),
            from_names,
            kind: ExpressionKind::Select,
            distinct: false,
            top: None,
        }
    }

    pub(crate) fn subquery_if(&self, needed: bool, reason: &str) -> QueryExpression {
        if needed {
            debug!(reason, "promoting expression to subquery");
            self.make_subquery()
        } else {
            self.clone()
        }
    }

    /// True when the node cannot be merged into an enclosing FROM clause
    pub(crate) fn needs_own_select(&self) -> bool {
        !matches!(self.kind, ExpressionKind::Select) || self.top.is_some() || self.distinct
    }

    /// Single base table, unrestricted, no derived attributes
    pub(crate) fn is_plain_table(&self) -> bool {
        self.support.len() == 1
            && matches!(self.support[0], Source::Table(_))
            && self.restriction.is_empty()
            && self.heading.new_attributes().is_empty()
            && !self.needs_own_select()
    }

    /// Applies ORDER BY / LIMIT / OFFSET. An expression that already has one
    /// is wrapped first.
    pub fn top(&self, top: Top) -> AlgebraResult<QueryExpression> {
        let resolved = top.resolve(&self.heading)?;
        let mut result = self.subquery_if(
            self.top.is_some() || self.is_union(),
            "expression already limited or is a union",
        );
        result.top = Some(resolved);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::OrderBy;
    use crate::heading::{Attribute, Lineage};
    use std::collections::HashMap;

    fn provider() -> HashMap<TableRef, Heading> {
        let mut map = HashMap::new();
        map.insert(
            TableRef::new("lab", "subject"),
            Heading::new(vec![
                Attribute::key("subject_id", "int")
                    .with_lineage(Lineage::new("lab", "subject", "subject_id")),
                Attribute::secondary("sex", "char(1)"),
            ])
            .unwrap(),
        );
        map
    }

    #[test]
    fn test_table_lookup() {
        let expr = QueryExpression::table(&provider(), "lab.subject").unwrap();
        assert_eq!(expr.primary_key(), vec!["subject_id"]);
        assert!(expr.restriction().is_empty());
        assert_eq!(expr.support().len(), 1);
    }

    #[test]
    fn test_unknown_table() {
        let err = QueryExpression::table(&provider(), "lab.nothing").unwrap_err();
        assert_eq!(err.code(), crate::errors::AlgebraErrorCode::UnknownTable);
    }

    #[test]
    fn test_make_subquery_preserves_heading_names() {
        let expr = QueryExpression::table(&provider(), "lab.subject").unwrap();
        let sub = expr.make_subquery();
        assert_eq!(sub.heading().names(), expr.heading().names());
        assert_eq!(sub.primary_key(), expr.primary_key());
        assert!(matches!(sub.support()[0], Source::Query(_)));
    }

    #[test]
    fn test_second_top_wraps() {
        let expr = QueryExpression::table(&provider(), "lab.subject").unwrap();
        let once = expr.top(Top::new().limit(10)).unwrap();
        assert!(matches!(once.support()[0], Source::Table(_)));
        let twice = once.top(Top::new().order_by(OrderBy::asc("sex")).limit(3)).unwrap();
        assert!(matches!(twice.support()[0], Source::Query(_)));
        assert_eq!(twice.top_clause().unwrap().limit, Some(3));
    }
}
