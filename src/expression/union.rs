//! Union (`+`)
//!
//! Operands must share the primary key (as homologous namesakes) and have no
//! secondary attribute in common. Without secondary attributes the union is a
//! plain UNION of the keys and nested unrestricted unions are flattened. With
//! secondary attributes it is the union of the left joins in both directions,
//! i.e. an outer join on the shared key.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::expression::ExpressionKind;
use super::semantic::match_namesakes;
use super::source::Source;
use super::QueryExpression;
use crate::condition::AndList;
use crate::errors::{AlgebraError, AlgebraResult};
use crate::heading::Heading;

impl QueryExpression {
    /// `self + other`
    pub fn union(&self, other: &QueryExpression) -> AlgebraResult<QueryExpression> {
        let left_key: BTreeSet<&str> = self.primary_key().into_iter().collect();
        let right_key: BTreeSet<&str> = other.primary_key().into_iter().collect();
        if left_key != right_key {
            return Err(AlgebraError::incompatible_union(format!(
                "Operands of a union must share the primary key: ({}) vs ({})",
                self.primary_key().join(", "),
                other.primary_key().join(", ")
            )));
        }
        let right_secondary = other.heading.secondary_attributes();
        if let Some(shared) = self
            .heading
            .secondary_attributes()
            .into_iter()
            .find(|a| right_secondary.contains(a))
        {
            return Err(AlgebraError::incompatible_union(format!(
                "Operands of a union must not share secondary attribute `{}`",
                shared
            )));
        }
        match_namesakes(&self.heading, &other.heading, true)?;

        let mut heading = self.heading.join(&other.heading, false, false);
        let key_only = heading.secondary_attributes().is_empty();
        let operands = if key_only {
            let mut operands = union_operands(self);
            operands.extend(union_operands(other));
            operands
        } else {
            heading = mark_secondary_nullable(&heading);
            vec![
                Source::Query(Arc::new(self.join_impl(other, false, true, false)?)),
                Source::Query(Arc::new(other.join_impl(self, false, true, false)?)),
            ]
        };

        let from_names = heading.names().into_iter().map(str::to_string).collect();
        Ok(QueryExpression {
            heading,
            restriction: AndList::new(),
            restriction_attributes: BTreeSet::new(),
            support: operands,
            joins: Vec::new(),
            from_names,
            kind: ExpressionKind::Union,
            distinct: false,
            top: None,
        })
    }
}

/// A key-only union operand contributes its own operands.
fn union_operands(expr: &QueryExpression) -> Vec<Source> {
    if expr.is_union() && expr.heading.secondary_attributes().is_empty() {
        expr.support.clone()
    } else {
        vec![Source::Query(Arc::new(expr.clone()))]
    }
}

fn mark_secondary_nullable(heading: &Heading) -> Heading {
    let attributes = heading
        .attributes()
        .iter()
        .map(|a| {
            let mut a = a.clone();
            if !a.in_key {
                a.nullable = true;
            }
            a
        })
        .collect();
    Heading::key_first(attributes)
}
