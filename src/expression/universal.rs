//! The universal set
//!
//! `U(attrs)` stands for every possible combination of values of `attrs`. It
//! matches any namesake regardless of lineage and only serves to make `attrs`
//! the primary key of a restriction or an aggregation. It has no heading of
//! its own and cannot be materialized, joined, or used in a negation.

use std::collections::BTreeSet;

use tracing::debug;

use super::aggregate::aggregate_over;
use super::project::Projection;
use super::QueryExpression;
use crate::errors::{AlgebraError, AlgebraResult};

/// Universal set over a list of attribute names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniversalSet {
    attributes: Vec<String>,
}

impl UniversalSet {
    pub fn new<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    fn check_not_empty(&self) -> AlgebraResult<()> {
        if self.attributes.is_empty() {
            return Err(AlgebraError::invalid_primary_key(
                "The universal set needs at least one attribute to form a primary key",
            ));
        }
        Ok(())
    }

    /// `U(attrs) & expr`: the distinct values of `attrs` in `expr`, keyed by
    /// `attrs`.
    pub fn restrict(&self, expr: &QueryExpression) -> AlgebraResult<QueryExpression> {
        self.check_not_empty()?;
        if let Some(missing) = self.attributes.iter().find(|a| !expr.heading.contains(a)) {
            return Err(AlgebraError::unresolvable(missing));
        }
        let mut result = expr.subquery_if(
            expr.needs_own_select(),
            "universal set restricts an aggregation, union or limited expression",
        );
        let names: BTreeSet<String> = self.attributes.iter().cloned().collect();
        result.heading = result.heading.set_primary_key(&self.attributes).retain(&names);
        result.distinct = true;
        debug!(key = ?self.attributes, "promoting attributes to primary key");
        Ok(result)
    }

    /// `U(attrs).aggr(group, ...)`: groups `group` by `attrs`.
    pub fn aggr(
        &self,
        group: &QueryExpression,
        projection: &Projection,
    ) -> AlgebraResult<QueryExpression> {
        self.aggr_with(group, projection, false)
    }

    /// Aggregation with an explicit `keep_all_rows`. The universal set has
    /// no rows of its own to keep, so `true` is rejected.
    pub fn aggr_with(
        &self,
        group: &QueryExpression,
        projection: &Projection,
        keep_all_rows: bool,
    ) -> AlgebraResult<QueryExpression> {
        if keep_all_rows {
            return Err(AlgebraError::invalid_operand(
                "keep_all_rows cannot be used when aggregating over the universal set",
            ));
        }
        self.check_not_empty()?;
        if let Some(missing) = self.attributes.iter().find(|a| !group.heading.contains(a)) {
            return Err(AlgebraError::aggregation_key(missing.as_str()));
        }
        let grouped = group.subquery_if(
            group.needs_own_select() || !group.heading.new_attributes().is_empty(),
            "grouped expression has derived attributes or its own SELECT",
        );
        debug!(group_by = ?self.attributes, "aggregating over universal set");
        aggregate_over(grouped, self.attributes.clone()).proj(projection)
    }

    /// Joining with the universal set is undefined.
    pub fn join(&self, _other: &QueryExpression) -> AlgebraResult<QueryExpression> {
        Err(AlgebraError::invalid_operand(
            "The universal set cannot be a join operand; use restriction or aggregation",
        ))
    }

    /// The complement of an expression within the universal set is undefined.
    pub fn exclude(&self, _other: &QueryExpression) -> AlgebraResult<QueryExpression> {
        Err(AlgebraError::invalid_operand(
            "The universal set cannot be restricted by a negation",
        ))
    }
}

impl QueryExpression {
    /// `expr & U(attrs)` keeps every row; the attributes must exist.
    pub fn restrict_universal(&self, universe: &UniversalSet) -> AlgebraResult<QueryExpression> {
        if let Some(missing) = universe
            .attributes()
            .iter()
            .find(|a| !self.heading.contains(a))
        {
            return Err(AlgebraError::unresolvable(missing));
        }
        Ok(self.clone())
    }

    /// `expr - U(attrs)` would always be empty and is rejected.
    pub fn exclude_universal(&self, _universe: &UniversalSet) -> AlgebraResult<QueryExpression> {
        Err(AlgebraError::invalid_operand(
            "Cannot exclude the universal set",
        ))
    }
}
