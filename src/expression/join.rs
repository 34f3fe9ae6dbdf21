//! Join (`*`) and left join
//!
//! Equality join on homologous namesakes. The result key follows from which
//! operand determines the other (see `Heading::join`).
//!
//! An operand is wrapped as a derived table when:
//! - it is an aggregation, union, DISTINCT or limited expression
//! - a matched attribute is renamed or computed in it
//! - the two FROM clauses share a column name that is not matched
//! - it is the right side and joins several tables, so its USING lists stay
//!   with the tables that carry them
//! - it is the right side and reads a base table the left side also reads
//! - it is the right side of a left join and is not a plain base table

use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::expression::{ExpressionKind, JoinStep};
use super::semantic::match_namesakes;
use super::source::Source;
use super::QueryExpression;
use crate::config::EngineConfig;
use crate::errors::{AlgebraError, AlgebraResult};

impl QueryExpression {
    /// `self * other`
    pub fn join(&self, other: &QueryExpression) -> AlgebraResult<QueryExpression> {
        self.join_with(other, true)
    }

    /// Join with the namesake lineage check turned on or off. With the check
    /// off every namesake is matched.
    pub fn join_with(
        &self,
        other: &QueryExpression,
        semantic_check: bool,
    ) -> AlgebraResult<QueryExpression> {
        self.join_impl(other, semantic_check, false, false)
    }

    /// Join using the config's default for the lineage check
    pub fn join_in(
        &self,
        other: &QueryExpression,
        config: &EngineConfig,
    ) -> AlgebraResult<QueryExpression> {
        self.join_with(other, config.semantic_check)
    }

    /// Left outer join. Requires `self -> other`; with `allow_nullable_pk`
    /// the key becomes the union of both keys and the caller must restore a
    /// valid key downstream.
    pub fn left_join(
        &self,
        other: &QueryExpression,
        allow_nullable_pk: bool,
    ) -> AlgebraResult<QueryExpression> {
        let determines = self.heading.determines(&other.heading);
        if !determines && !allow_nullable_pk {
            return Err(AlgebraError::invalid_primary_key(format!(
                "Left join requires the left operand to determine the right operand; \
                 missing key attributes: {}",
                other
                    .primary_key()
                    .into_iter()
                    .filter(|k| !self.heading.contains(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        if !determines {
            warn!("left join without determination; result key may contain NULLs");
        }
        self.join_impl(other, true, true, !determines)
    }

    pub(crate) fn join_impl(
        &self,
        other: &QueryExpression,
        semantic_check: bool,
        left: bool,
        nullable_pk: bool,
    ) -> AlgebraResult<QueryExpression> {
        let attributes = match_namesakes(&self.heading, &other.heading, semantic_check)?;

        let hidden_collision = self
            .from_names
            .intersection(&other.from_names)
            .any(|n| !attributes.contains(n));

        let lhs = self.subquery_if(
            hidden_collision
                || self.needs_own_select()
                || attributes.iter().any(|a| self.heading.is_new_attribute(a)),
            "left join operand cannot be merged into the FROM clause",
        );
        let rhs = other.subquery_if(
            hidden_collision
                || other.needs_own_select()
                || attributes.iter().any(|a| other.heading.is_new_attribute(a))
                || other.support.len() > 1
                || shares_base_table(self, other)
                || (left && !other.is_plain_table()),
            "right join operand cannot be merged into the FROM clause",
        );

        debug!(
            matched = ?attributes,
            left,
            "joining expressions"
        );

        let mut support = lhs.support.clone();
        support.extend(rhs.support.iter().cloned());
        let mut joins = lhs.joins.clone();
        joins.push(JoinStep { left, attributes });
        joins.extend(rhs.joins.iter().cloned());

        let mut restriction = lhs.restriction.clone();
        restriction.extend(&rhs.restriction);
        let restriction_attributes: BTreeSet<String> = lhs
            .restriction_attributes
            .union(&rhs.restriction_attributes)
            .cloned()
            .collect();
        let from_names: BTreeSet<String> = lhs.from_names.union(&rhs.from_names).cloned().collect();

        Ok(QueryExpression {
            heading: lhs.heading.join(&rhs.heading, left, nullable_pk),
            restriction,
            restriction_attributes,
            support,
            joins,
            from_names,
            kind: ExpressionKind::Select,
            distinct: false,
            top: None,
        })
    }
}

/// Same base table in both FROM clauses; it would appear twice unaliased.
fn shares_base_table(lhs: &QueryExpression, rhs: &QueryExpression) -> bool {
    rhs.support.iter().any(|source| match source {
        Source::Table(table) => lhs
            .support
            .iter()
            .any(|s| matches!(s, Source::Table(t) if t == table)),
        Source::Query(_) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::errors::AlgebraErrorCode;
    use crate::expression::{Projection, Source, TableRef};
    use crate::heading::{Attribute, Heading, Lineage};

    fn lin(table: &str, attr: &str) -> Lineage {
        Lineage::new("lab", table, attr)
    }

    fn subject() -> QueryExpression {
        QueryExpression::from_table(
            TableRef::new("lab", "subject"),
            Heading::new(vec![
                Attribute::key("subject_id", "int").with_lineage(lin("subject", "subject_id")),
                Attribute::secondary("sex", "char(1)"),
            ])
            .unwrap(),
        )
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

    #[test]
    fn test_join_flattens_plain_tables() {
        let joined = session().join(&subject()).unwrap();
        assert_eq!(joined.support().len(), 2);
        assert_eq!(joined.joins().len(), 1);
        assert_eq!(joined.joins()[0].attributes, vec!["subject_id"]);
        assert!(!joined.joins()[0].left);
        assert_eq!(joined.primary_key(), vec!["subject_id", "session_idx"]);
    }

    #[test]
    fn test_join_collects_both_restrictions() {
        let a = session().restrict(Condition::eq("session_idx", 1)).unwrap();
        let b = subject().restrict(Condition::eq("sex", "F")).unwrap();
        let joined = a.join(&b).unwrap();
        assert_eq!(joined.restriction().len(), 2);
    }

    #[test]
    fn test_hidden_namesake_forces_subqueries() {
        // session_date is projected away on the left but still in its FROM clause
        let left = session().proj(&Projection::new()).unwrap();
        let right = QueryExpression::from_table(
            TableRef::new("lab", "calendar"),
            Heading::new(vec![
                Attribute::key("day", "int").with_lineage(lin("calendar", "day")),
                Attribute::secondary("session_date", "date"),
            ])
            .unwrap(),
        );
        let joined = left.join(&right).unwrap();
        assert!(matches!(joined.support()[0], Source::Query(_)));
        assert!(matches!(joined.support()[1], Source::Query(_)));
    }

    #[test]
    fn test_join_on_renamed_attribute_wraps() {
        let renamed = subject()
            .proj(&Projection::new().rename("animal_id", "subject_id"))
            .unwrap();
        let other = session()
            .proj(&Projection::new().rename("animal_id", "subject_id"))
            .unwrap();
        let joined = other.join(&renamed).unwrap();
        assert!(matches!(joined.support()[0], Source::Query(_)));
        assert!(matches!(joined.support()[1], Source::Query(_)));
        assert_eq!(joined.joins()[0].attributes, vec!["animal_id"]);
    }

    #[test]
    fn test_left_join_requires_determination() {
        let err = subject().left_join(&session(), false).unwrap_err();
        assert_eq!(err.code(), AlgebraErrorCode::InvalidPrimaryKey);
        let ok = session().left_join(&subject(), false).unwrap();
        assert!(ok.joins()[0].left);
        assert_eq!(ok.primary_key(), vec!["subject_id", "session_idx"]);
    }

    #[test]
    fn test_left_join_override_unions_keys() {
        let joined = subject().left_join(&session(), true).unwrap();
        assert_eq!(joined.primary_key(), vec!["subject_id", "session_idx"]);
        assert!(joined.heading().get("session_idx").unwrap().nullable);
    }

    #[test]
    fn test_left_join_wraps_restricted_right() {
        let right = subject().restrict(Condition::eq("sex", "F")).unwrap();
        let joined = session().left_join(&right, false).unwrap();
        assert!(matches!(joined.support()[1], Source::Query(_)));
        // the right side's restriction stays inside the derived table
        assert!(joined.restriction().is_empty());
    }

    fn rig() -> QueryExpression {
        QueryExpression::from_table(
            TableRef::new("lab", "rig"),
            Heading::new(vec![
                Attribute::key("rig_id", "int").with_lineage(lin("rig", "rig_id")),
                Attribute::secondary("room", "varchar(16)"),
            ])
            .unwrap(),
        )
    }

    fn scan() -> QueryExpression {
        QueryExpression::from_table(
            TableRef::new("lab", "scan"),
            Heading::new(vec![
                Attribute::key("scan_id", "int").with_lineage(lin("scan", "scan_id")),
                Attribute::secondary("rig_id", "int").with_lineage(lin("rig", "rig_id")),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_right_join_of_several_tables_is_wrapped() {
        // rig_id lives in scan only; it must not be matched against subject
        let right = subject().join(&scan()).unwrap();
        let joined = rig().join(&right).unwrap();
        assert_eq!(joined.support().len(), 2);
        assert!(matches!(joined.support()[1], Source::Query(_)));
        assert_eq!(joined.primary_key(), vec!["subject_id", "scan_id"]);
        assert_eq!(
            joined.to_sql(),
            "SELECT `subject_id`,`scan_id`,`rig_id`,`room`,`sex` FROM `lab`.`rig` \
             JOIN (SELECT `subject_id`,`scan_id`,`sex`,`rig_id` FROM `lab`.`subject` \
             CROSS JOIN `lab`.`scan`) AS `$1` USING (`rig_id`)"
        );
    }

    #[test]
    fn test_self_join_aliases_right_side() {
        let lookup = QueryExpression::from_table(
            TableRef::new("lab", "lookup"),
            Heading::new(vec![Attribute::key("k", "int").with_lineage(lin("lookup", "k"))])
                .unwrap(),
        );
        assert_eq!(
            lookup.join(&lookup).unwrap().to_sql(),
            "SELECT `k` FROM `lab`.`lookup` JOIN (SELECT `k` FROM `lab`.`lookup`) AS `$1` \
             USING (`k`)"
        );

        let one = lookup.restrict(Condition::eq("k", 1)).unwrap();
        assert_eq!(
            lookup.join(&one).unwrap().to_sql(),
            "SELECT `k` FROM `lab`.`lookup` \
             JOIN (SELECT `k` FROM `lab`.`lookup` WHERE `k`=1) AS `$1` USING (`k`)"
        );
    }

    #[test]
    fn test_join_in_follows_config() {
        let a = QueryExpression::from_table(
            TableRef::new("s", "a"),
            Heading::new(vec![Attribute::key("id", "int"), Attribute::secondary("note", "text")])
                .unwrap(),
        );
        let b = QueryExpression::from_table(
            TableRef::new("s", "b"),
            Heading::new(vec![Attribute::key("k", "int"), Attribute::secondary("note", "text")])
                .unwrap(),
        );
        assert!(a.join_in(&b, &EngineConfig::default()).is_err());
        let lenient = EngineConfig {
            semantic_check: false,
            ..EngineConfig::default()
        };
        assert_eq!(a.join_in(&b, &lenient).unwrap().joins()[0].attributes, vec!["note"]);
    }

    #[test]
    fn test_semantic_check_opt_out() {
        let a = QueryExpression::from_table(
            TableRef::new("s", "a"),
            Heading::new(vec![Attribute::key("id", "int"), Attribute::secondary("note", "text")])
                .unwrap(),
        );
        let b = QueryExpression::from_table(
            TableRef::new("s", "b"),
            Heading::new(vec![Attribute::key("k", "int"), Attribute::secondary("note", "text")])
                .unwrap(),
        );
        assert!(a.join(&b).is_err());
        let joined = a.join_with(&b, false).unwrap();
        assert_eq!(joined.joins()[0].attributes, vec!["note"]);
    }
}
