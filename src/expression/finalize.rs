//! Backprojection
//!
//! Before SQL is emitted every derived table is pruned to the attributes its
//! parent reads: the parent's SELECT list, conditions, USING lists and GROUP BY.
//! Each pruned node keeps its own primary key and ORDER BY attributes, and a
//! DISTINCT node keeps its whole heading, so row sets are unchanged.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::expression::ExpressionKind;
use super::source::Source;
use super::QueryExpression;
use crate::condition::{referenced_names, AndList, Condition, Subquery};
use crate::heading::{AttributeExpression, Heading};

impl QueryExpression {
    /// Prunes unused attributes from every derived table, recursively.
    /// The top-level heading is kept whole.
    pub fn finalize(&self) -> QueryExpression {
        self.pruned(None)
    }

    fn pruned(&self, required: Option<&BTreeSet<String>>) -> QueryExpression {
        let mut keep: BTreeSet<String> = match required {
            Some(names) if !self.distinct => names.clone(),
            _ => self.heading.names().into_iter().map(str::to_string).collect(),
        };
        keep.extend(self.primary_key().into_iter().map(str::to_string));
        if let Some(top) = &self.top {
            keep.extend(top.attributes().map(str::to_string));
        }
        if self.is_aggregation() {
            // HAVING reads result columns
            keep.extend(self.restriction_attributes.iter().cloned());
        }
        let heading = self.heading.retain(&keep);

        let (support, kind) = match &self.kind {
            ExpressionKind::Union => {
                let names: BTreeSet<String> =
                    heading.names().into_iter().map(str::to_string).collect();
                (prune_sources(&self.support, &names), ExpressionKind::Union)
            }
            ExpressionKind::Select => {
                let used = self.used_names(&heading);
                (prune_sources(&self.support, &used), ExpressionKind::Select)
            }
            ExpressionKind::Aggregation {
                group_by,
                pre_restriction,
            } => {
                let used = self.used_names(&heading);
                (
                    prune_sources(&self.support, &used),
                    ExpressionKind::Aggregation {
                        group_by: group_by.clone(),
                        pre_restriction: prune_conditions(pre_restriction),
                    },
                )
            }
        };

        QueryExpression {
            heading,
            restriction: prune_conditions(&self.restriction),
            restriction_attributes: self.restriction_attributes.clone(),
            support,
            joins: self.joins.clone(),
            from_names: self.from_names.clone(),
            kind,
            distinct: self.distinct,
            top: self.top.clone(),
        }
    }

    /// FROM-clause names read by this node given its pruned heading.
    fn used_names(&self, heading: &Heading) -> BTreeSet<String> {
        let from = || self.from_names.iter().map(String::as_str);
        let mut used = BTreeSet::new();
        for attr in heading.attributes() {
            match &attr.expression {
                None => {
                    used.insert(attr.name.clone());
                }
                Some(AttributeExpression::Column(old)) => {
                    used.insert(old.clone());
                }
                Some(AttributeExpression::Computed(sql)) => {
                    used.extend(referenced_names(sql, from()));
                }
            }
        }
        for condition in &self.restriction {
            condition_names(condition, &self.from_names, &mut used);
        }
        if let ExpressionKind::Aggregation {
            group_by,
            pre_restriction,
        } = &self.kind
        {
            used.extend(group_by.iter().cloned());
            for condition in pre_restriction {
                condition_names(condition, &self.from_names, &mut used);
            }
        }
        for step in &self.joins {
            used.extend(step.attributes.iter().cloned());
        }
        used
    }
}

fn prune_sources(sources: &[Source], required: &BTreeSet<String>) -> Vec<Source> {
    sources
        .iter()
        .map(|source| match source {
            Source::Table(table) => Source::Table(table.clone()),
            Source::Query(query) => Source::Query(Arc::new(query.pruned(Some(required)))),
        })
        .collect()
}

fn prune_conditions(list: &AndList) -> AndList {
    let mut out = AndList::new();
    for condition in list {
        out.push(prune_condition(condition));
    }
    out
}

fn prune_condition(condition: &Condition) -> Condition {
    match condition {
        Condition::Subquery(subquery) => {
            let required: BTreeSet<String> = subquery.attributes().iter().cloned().collect();
            Condition::Subquery(Subquery::bound(
                Arc::new(subquery.expression().pruned(Some(&required))),
                subquery.attributes().to_vec(),
            ))
        }
        Condition::And(terms) => Condition::And(terms.iter().map(prune_condition).collect()),
        Condition::Or(terms) => Condition::Or(terms.iter().map(prune_condition).collect()),
        Condition::Not(term) => Condition::Not(Box::new(prune_condition(term))),
        other => other.clone(),
    }
}

fn condition_names(
    condition: &Condition,
    from_names: &BTreeSet<String>,
    used: &mut BTreeSet<String>,
) {
    match condition {
        Condition::Equality(map) => used.extend(map.keys().cloned()),
        Condition::Predicate(sql) => {
            used.extend(referenced_names(sql, from_names.iter().map(String::as_str)))
        }
        Condition::Subquery(subquery) => used.extend(subquery.attributes().iter().cloned()),
        Condition::And(terms) | Condition::Or(terms) => {
            for term in terms {
                condition_names(term, from_names, used);
            }
        }
        Condition::Not(term) => condition_names(term, from_names, used),
    }
}
