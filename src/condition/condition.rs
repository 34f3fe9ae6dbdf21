//! Restriction conditions
//!
//! A closed set of variants; the SQL generator matches on all of them.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::expression::QueryExpression;

/// Semijoin against another expression.
///
/// `attributes` are the shared names the semijoin matches on. They are bound
/// when the condition is applied to an expression; an unbound subquery built
/// by the caller carries none.
#[derive(Debug, Clone, PartialEq)]
pub struct Subquery {
    expression: Arc<QueryExpression>,
    attributes: Vec<String>,
}

impl Subquery {
    pub fn new(expression: impl Into<Arc<QueryExpression>>) -> Self {
        Self {
            expression: expression.into(),
            attributes: Vec::new(),
        }
    }

    pub(crate) fn bound(expression: Arc<QueryExpression>, attributes: Vec<String>) -> Self {
        Self {
            expression,
            attributes,
        }
    }

    pub fn expression(&self) -> &QueryExpression {
        &self.expression
    }

    pub(crate) fn expression_arc(&self) -> &Arc<QueryExpression> {
        &self.expression
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }
}

/// A restriction term
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Attribute equals value, for every entry
    Equality(BTreeMap<String, Value>),
    /// Free-form SQL predicate
    Predicate(String),
    /// Rows matching some row of another expression
    Subquery(Subquery),
    /// All terms hold; empty means all rows
    And(Vec<Condition>),
    /// Any term holds; empty means no rows
    Or(Vec<Condition>),
    /// Term does not hold
    Not(Box<Condition>),
}

impl Condition {
    /// Single-attribute equality
    pub fn eq(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(attribute.into(), value.into());
        Condition::Equality(map)
    }

    /// Equality mapping from pairs
    pub fn equality<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Condition::Equality(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn predicate(sql: impl Into<String>) -> Self {
        Condition::Predicate(sql.into())
    }

    pub fn subquery(expression: impl Into<Arc<QueryExpression>>) -> Self {
        Condition::Subquery(Subquery::new(expression))
    }

    pub fn and(terms: impl IntoIterator<Item = Condition>) -> Self {
        Condition::And(terms.into_iter().collect())
    }

    pub fn or(terms: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Or(terms.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(term: Condition) -> Self {
        Condition::Not(Box::new(term))
    }

    /// True for an empty conjunction, which restricts nothing
    pub fn is_trivially_true(&self) -> bool {
        matches!(self, Condition::And(terms) if terms.iter().all(Condition::is_trivially_true))
    }
}

impl From<&str> for Condition {
    fn from(sql: &str) -> Self {
        Condition::Predicate(sql.to_string())
    }
}

impl From<String> for Condition {
    fn from(sql: String) -> Self {
        Condition::Predicate(sql)
    }
}

impl From<QueryExpression> for Condition {
    fn from(expression: QueryExpression) -> Self {
        Condition::subquery(expression)
    }
}

impl From<&QueryExpression> for Condition {
    fn from(expression: &QueryExpression) -> Self {
        Condition::subquery(expression.clone())
    }
}

impl From<serde_json::Map<String, Value>> for Condition {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Condition::Equality(map.into_iter().collect())
    }
}

impl From<BTreeMap<String, Value>> for Condition {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Condition::Equality(map)
    }
}

/// A list of conditions that must all hold
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AndList(Vec<Condition>);

impl AndList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a term; nested conjunctions are flattened and empty ones dropped.
    pub fn push(&mut self, condition: Condition) {
        match condition {
            Condition::And(terms) => {
                for term in terms {
                    self.push(term);
                }
            }
            other => self.0.push(other),
        }
    }

    pub fn extend(&mut self, other: &AndList) {
        for term in &other.0 {
            self.push(term.clone());
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Condition> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a AndList {
    type Item = &'a Condition;
    type IntoIter = std::slice::Iter<'a, Condition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
