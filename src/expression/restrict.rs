//! Restriction (`&`) and anti-restriction (`-`)
//!
//! The heading, key and support are unchanged; the condition is appended to
//! the restriction. A condition reading a renamed or computed attribute
//! cannot sit in the WHERE clause of the same SELECT, so such an expression is
//! wrapped first. Aggregations take the condition into HAVING instead.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use super::semantic::match_namesakes;
use super::QueryExpression;
use crate::condition::{check_scalar, referenced_names, Condition, Subquery};
use crate::config::EngineConfig;
use crate::errors::{AlgebraError, AlgebraResult};
use crate::heading::Heading;

impl QueryExpression {
    /// `self & condition`
    pub fn restrict(&self, condition: impl Into<Condition>) -> AlgebraResult<QueryExpression> {
        self.restrict_with(condition, true)
    }

    /// `self - condition`, i.e. `self & NOT condition`
    pub fn exclude(&self, condition: impl Into<Condition>) -> AlgebraResult<QueryExpression> {
        self.restrict_with(Condition::not(condition.into()), true)
    }

    /// Restriction using the config's default for the lineage check
    pub fn restrict_in(
        &self,
        condition: impl Into<Condition>,
        config: &EngineConfig,
    ) -> AlgebraResult<QueryExpression> {
        self.restrict_with(condition, config.semantic_check)
    }

    /// Restriction with the namesake lineage check for subquery conditions
    /// turned on or off.
    pub fn restrict_with(
        &self,
        condition: impl Into<Condition>,
        semantic_check: bool,
    ) -> AlgebraResult<QueryExpression> {
        let mut attributes = BTreeSet::new();
        let condition =
            bind_condition(condition.into(), &self.heading, semantic_check, &mut attributes)?;
        if condition.is_trivially_true() {
            return Ok(self.clone());
        }

        let reads_new_attribute = !self.is_aggregation()
            && attributes.iter().any(|a| self.heading.is_new_attribute(a));
        let mut result = self.subquery_if(
            self.is_union() || self.top.is_some() || reads_new_attribute,
            "restriction reads a derived attribute or applies after LIMIT/UNION",
        );
        result.restriction.push(condition);
        result.restriction_attributes.extend(attributes);
        Ok(result)
    }
}

/// Resolves a caller-built condition against `heading`: checks names,
/// binds subquery match attributes, and collects every attribute read.
pub(crate) fn bind_condition(
    condition: Condition,
    heading: &Heading,
    semantic_check: bool,
    attributes: &mut BTreeSet<String>,
) -> AlgebraResult<Condition> {
    match condition {
        Condition::Equality(map) => {
            for (name, value) in &map {
                if !heading.contains(name) {
                    return Err(AlgebraError::unresolvable(name));
                }
                check_scalar(name, value)?;
            }
            if map.is_empty() {
                return Ok(Condition::And(Vec::new()));
            }
            attributes.extend(map.keys().cloned());
            Ok(Condition::Equality(map))
        }
        Condition::Predicate(sql) => {
            attributes.extend(referenced_names(&sql, heading.names()));
            Ok(Condition::Predicate(sql))
        }
        Condition::Subquery(subquery) => {
            let inner = subquery.expression();
            let matched = match_namesakes(heading, inner.heading(), semantic_check)?;
            let expression = if inner.needs_own_select() {
                debug!("semijoin operand is an aggregation, union or limited; wrapping");
                Arc::new(inner.make_subquery())
            } else {
                Arc::clone(subquery.expression_arc())
            };
            attributes.extend(matched.iter().cloned());
            Ok(Condition::Subquery(Subquery::bound(expression, matched)))
        }
        Condition::And(terms) => {
            let mut bound = Vec::with_capacity(terms.len());
            for term in terms {
                let term = bind_condition(term, heading, semantic_check, attributes)?;
                if !term.is_trivially_true() {
                    bound.push(term);
                }
            }
            Ok(Condition::And(bound))
        }
        Condition::Or(terms) => {
            let mut bound = Vec::with_capacity(terms.len());
            for term in terms {
                let term = bind_condition(term, heading, semantic_check, attributes)?;
                if term.is_trivially_true() {
                    return Ok(Condition::And(Vec::new()));
                }
                bound.push(term);
            }
            Ok(Condition::Or(bound))
        }
        Condition::Not(term) => {
            let term = bind_condition(*term, heading, semantic_check, attributes)?;
            if term.is_trivially_true() {
                return Ok(Condition::Or(Vec::new()));
            }
            Ok(Condition::Not(Box::new(term)))
        }
    }
}
