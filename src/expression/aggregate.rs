//! Aggregation
//!
//! `A.aggr(B, ...)` groups `A * B` (a left join with `keep_all_rows`) by the
//! key of `A` and projects the key of `A` plus aggregate expressions over B.
//! `B` must carry the whole key of `A` as homologous namesakes. The result key
//! is always the key of `A`: GROUP BY restores it even when the internal
//! left join would not.

use tracing::debug;

use super::expression::ExpressionKind;
use super::project::Projection;
use super::semantic::match_namesakes;
use super::QueryExpression;
use crate::condition::AndList;
use crate::errors::{AlgebraError, AlgebraResult};

impl QueryExpression {
    /// Aggregates `group` per row of `self`.
    pub fn aggr(
        &self,
        group: &QueryExpression,
        projection: &Projection,
        keep_all_rows: bool,
    ) -> AlgebraResult<QueryExpression> {
        let matched = match_namesakes(&self.heading, group.heading(), true)?;
        if let Some(missing) = self
            .primary_key()
            .into_iter()
            .find(|k| !matched.iter().any(|m| m == k))
        {
            return Err(AlgebraError::aggregation_key(missing));
        }

        let grouping = self.subquery_if(
            !self.heading.new_attributes().is_empty(),
            "grouping expression has derived attributes",
        );
        let grouped = group.subquery_if(
            !group.heading.new_attributes().is_empty()
                || (keep_all_rows && group.support.len() > 1),
            "grouped expression has derived attributes or several supports",
        );

        let joined = grouping.join_impl(&grouped, true, keep_all_rows, false)?;
        let key: Vec<String> = self.primary_key().into_iter().map(str::to_string).collect();
        debug!(group_by = ?key, keep_all_rows, "aggregating");
        aggregate_over(joined, key).proj(projection)
    }
}

/// Turns a joined or plain select into an aggregation grouped by `key`.
/// WHERE conditions of the input stay ahead of GROUP BY.
pub(crate) fn aggregate_over(input: QueryExpression, key: Vec<String>) -> QueryExpression {
    let heading = input.heading.set_primary_key(&key);
    QueryExpression {
        heading,
        restriction: AndList::new(),
        restriction_attributes: Default::default(),
        support: input.support,
        joins: input.joins,
        from_names: input.from_names,
        kind: ExpressionKind::Aggregation {
            group_by: key,
            pre_restriction: input.restriction,
        },
        distinct: false,
        top: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::errors::AlgebraErrorCode;
    use crate::expression::{Source, TableRef};
    use crate::heading::{Attribute, Heading, Lineage};

    fn lin(table: &str, attr: &str) -> Lineage {
        Lineage::new("lab", table, attr)
    }

    fn session() -> QueryExpression {
        QueryExpression::from_table(
            TableRef::new("lab", "session"),
            Heading::new(vec![
                Attribute::key("subject_id", "int").with_lineage(lin("subject", "subject_id")),
                Attribute::key("session_idx", "int").with_lineage(lin("session", "session_idx")),
                Attribute::secondary("session_date", "date"),
            ])
            .unwrap(),
        )
    }

    fn trial() -> QueryExpression {
        QueryExpression::from_table(
            TableRef::new("lab", "trial"),
            Heading::new(vec![
                Attribute::key("subject_id", "int").with_lineage(lin("subject", "subject_id")),
                Attribute::key("session_idx", "int").with_lineage(lin("session", "session_idx")),
                Attribute::key("trial_idx", "int").with_lineage(lin("trial", "trial_idx")),
                Attribute::secondary("duration", "float"),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_aggr_key_is_grouping_key() {
        let result = session()
            .aggr(&trial(), &Projection::new().compute("n", "count(*)"), false)
            .unwrap();
        assert_eq!(result.primary_key(), vec!["subject_id", "session_idx"]);
        assert_eq!(result.heading().names(), vec!["subject_id", "session_idx", "n"]);
        assert!(result.is_aggregation());
    }

    #[test]
    fn test_aggr_missing_key_attribute() {
        let subjectless = trial()
            .proj(&Projection::new().demote("subject_id").exclude("subject_id"))
            .unwrap();
        let err = session()
            .aggr(&subjectless, &Projection::new().compute("n", "count(*)"), false)
            .unwrap_err();
        assert_eq!(err.code(), AlgebraErrorCode::AggregationKeyViolation);
        assert_eq!(err.attribute(), Some("subject_id"));
    }

    #[test]
    fn test_keep_all_rows_uses_left_join() {
        let result = session()
            .aggr(&trial(), &Projection::new().compute("n", "count(trial_idx)"), true)
            .unwrap();
        assert!(result.joins()[0].left);
        assert_eq!(result.primary_key(), vec!["subject_id", "session_idx"]);
    }

    #[test]
    fn test_restrictions_split_between_where_and_having() {
        let restricted_trials = trial().restrict("duration > 1").unwrap();
        let result = session()
            .aggr(&restricted_trials, &Projection::new().compute("n", "count(*)"), false)
            .unwrap()
            .restrict("n > 3")
            .unwrap();
        match result.kind() {
            ExpressionKind::Aggregation {
                pre_restriction, ..
            } => assert_eq!(pre_restriction.len(), 1),
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(result.restriction().len(), 1);
        assert!(matches!(result.support()[0], Source::Table(_)));
    }

    #[test]
    fn test_join_with_aggregation_wraps_it() {
        let counts = session()
            .aggr(&trial(), &Projection::new().compute("n", "count(*)"), false)
            .unwrap();
        let joined = session().join(&counts).unwrap();
        assert!(matches!(joined.support()[1], Source::Query(_)));
    }

    #[test]
    fn test_semijoin_by_aggregation_wraps_it() {
        let counts = session()
            .aggr(&trial(), &Projection::new().compute("n", "count(*)"), false)
            .unwrap()
            .restrict("n > 10")
            .unwrap();
        let restricted = session().restrict(&counts).unwrap();
        match restricted.restriction().iter().next() {
            Some(Condition::Subquery(sq)) => {
                assert!(!sq.expression().is_aggregation());
                assert_eq!(sq.attributes(), ["subject_id", "session_idx"]);
            }
            other => panic!("unexpected condition {:?}", other),
        }
    }
}
