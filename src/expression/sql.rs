//! SQL emission
//!
//! Emission always runs on a finalized tree. Derived-table aliases are numbered
//! per statement in the order they are written, so the output is a pure
//! function of the expression and the config.

use tracing::trace;

use super::expression::ExpressionKind;
use super::source::Source;
use super::top::Top;
use super::QueryExpression;
use crate::condition::{render_literal, AndList, Condition};
use crate::config::EngineConfig;

/// Largest LIMIT, used when only an OFFSET is given
const NO_LIMIT: u64 = u64::MAX;

pub(crate) struct SqlWriter<'a> {
    config: &'a EngineConfig,
    next_alias: usize,
}

impl<'a> SqlWriter<'a> {
    pub(crate) fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            next_alias: 0,
        }
    }

    fn alias(&mut self) -> String {
        self.next_alias += 1;
        self.config
            .quote(&format!("{}{}", self.config.subquery_alias_prefix, self.next_alias))
    }

    fn quote_list<S: AsRef<str>>(&self, names: &[S]) -> String {
        names
            .iter()
            .map(|n| self.config.quote(n.as_ref()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl QueryExpression {
    /// SQL with the default config
    pub fn to_sql(&self) -> String {
        self.to_sql_with(&EngineConfig::default())
    }

    pub fn to_sql_with(&self, config: &EngineConfig) -> String {
        let mut writer = SqlWriter::new(config);
        let sql = self.finalize().make_sql(None, &mut writer);
        trace!(sql = %sql, "emitting query");
        sql
    }

    /// `SELECT count(*)` over this expression
    pub fn count_sql_with(&self, config: &EngineConfig) -> String {
        let mut writer = SqlWriter::new(config);
        let inner = self.finalize().make_sql(None, &mut writer);
        let sql = format!("SELECT count(*) FROM ({}) AS {}", inner, writer.alias());
        trace!(sql = %sql, "emitting count");
        sql
    }

    /// Renders the node selecting `fields`, or its whole heading.
    pub(crate) fn make_sql(&self, fields: Option<&[String]>, w: &mut SqlWriter<'_>) -> String {
        let names: Vec<&str> = match fields {
            Some(fields) => fields.iter().map(String::as_str).collect(),
            None => self.heading.names(),
        };
        match &self.kind {
            ExpressionKind::Union => self.union_sql(&names, w),
            ExpressionKind::Select => {
                let mut sql = self.select_head(&names, self.distinct, w);
                push_where(&mut sql, " WHERE ", &self.restriction, w);
                push_top(&mut sql, self.top.as_ref(), w.config);
                sql
            }
            ExpressionKind::Aggregation {
                group_by,
                pre_restriction,
            } => {
                let distinct = self.distinct || self.heading.secondary_attributes().is_empty();
                let mut sql = self.select_head(&names, distinct, w);
                push_where(&mut sql, " WHERE ", pre_restriction, w);
                sql.push_str(" GROUP BY ");
                sql.push_str(&w.quote_list(group_by));
                push_where(&mut sql, " HAVING ", &self.restriction, w);
                push_top(&mut sql, self.top.as_ref(), w.config);
                sql
            }
        }
    }

    fn select_head(&self, names: &[&str], distinct: bool, w: &mut SqlWriter<'_>) -> String {
        let mut sql = String::from("SELECT ");
        if distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&self.heading.as_sql(names, w.config));
        sql.push_str(" FROM ");
        let from = self.from_clause(w);
        sql.push_str(&from);
        sql
    }

    fn from_clause(&self, w: &mut SqlWriter<'_>) -> String {
        let Some((first, rest)) = self.support.split_first() else {
            return String::new();
        };
        let mut sql = render_source(first, w);
        for (source, step) in rest.iter().zip(&self.joins) {
            let source = render_source(source, w);
            match (step.left, step.attributes.is_empty()) {
                (false, true) => sql.push_str(&format!(" CROSS JOIN {}", source)),
                (true, true) => sql.push_str(&format!(" LEFT JOIN {} ON TRUE", source)),
                (left, false) => sql.push_str(&format!(
                    " {}JOIN {} USING ({})",
                    if left { "LEFT " } else { "" },
                    source,
                    w.quote_list(&step.attributes)
                )),
            }
        }
        sql
    }

    /// Operands are joined bare with UNION; a limited operand is wrapped,
    /// since its ORDER BY / LIMIT would otherwise apply to the whole union.
    fn union_sql(&self, names: &[&str], w: &mut SqlWriter<'_>) -> String {
        let fields: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let operands: Vec<String> = self
            .support
            .iter()
            .map(|source| match source {
                Source::Query(query) if query.top.is_some() => {
                    let inner = query.make_sql(Some(&fields), w);
                    format!("SELECT {} FROM ({}) AS {}", w.quote_list(&fields), inner, w.alias())
                }
                Source::Query(query) => query.make_sql(Some(&fields), w),
                Source::Table(table) => {
                    format!("SELECT {} FROM {}", w.quote_list(&fields), table.to_sql(w.config))
                }
            })
            .collect();
        let alias = w.alias();
        format!(
            "SELECT {} FROM ({}) AS {}",
            w.quote_list(&fields),
            operands.join(" UNION "),
            alias
        )
    }
}

fn render_source(source: &Source, w: &mut SqlWriter<'_>) -> String {
    match source {
        Source::Table(table) => table.to_sql(w.config),
        Source::Query(query) => {
            let sql = query.make_sql(None, w);
            format!("({}) AS {}", sql, w.alias())
        }
    }
}

fn push_where(sql: &mut String, keyword: &str, list: &AndList, w: &mut SqlWriter<'_>) {
    if list.is_empty() {
        return;
    }
    let terms: Vec<String> = list.iter().map(|c| render_condition(c, w)).collect();
    sql.push_str(keyword);
    sql.push_str(&terms.join(" AND "));
}

fn push_top(sql: &mut String, top: Option<&Top>, config: &EngineConfig) {
    let Some(top) = top else {
        return;
    };
    if !top.order_by.is_empty() {
        let terms: Vec<String> = top
            .order_by
            .iter()
            .map(|o| {
                if o.descending {
                    format!("{} DESC", config.quote(&o.attribute))
                } else {
                    config.quote(&o.attribute)
                }
            })
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&terms.join(","));
    }
    match (top.limit, top.offset) {
        (Some(limit), 0) => sql.push_str(&format!(" LIMIT {}", limit)),
        (Some(limit), offset) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
        (None, 0) => {}
        (None, offset) => sql.push_str(&format!(" LIMIT {} OFFSET {}", NO_LIMIT, offset)),
    }
}

/// Renders a condition so it can stand as an operand of AND.
fn render_condition(condition: &Condition, w: &mut SqlWriter<'_>) -> String {
    match condition {
        Condition::Equality(map) if map.is_empty() => "TRUE".to_string(),
        Condition::Equality(map) => map
            .iter()
            .map(|(name, value)| {
                if value.is_null() {
                    format!("{} IS NULL", w.config.quote(name))
                } else {
                    format!("{}={}", w.config.quote(name), render_literal(value))
                }
            })
            .collect::<Vec<_>>()
            .join(" AND "),
        Condition::Predicate(sql) => format!("({})", sql),
        Condition::Subquery(subquery) if subquery.attributes().is_empty() => {
            format!("EXISTS ({})", subquery.expression().make_sql(None, w))
        }
        Condition::Subquery(subquery) => {
            let attributes = subquery.attributes();
            let inner = subquery.expression().make_sql(Some(attributes), w);
            format!("({}) IN ({})", w.quote_list(attributes), inner)
        }
        Condition::And(terms) if terms.is_empty() => "TRUE".to_string(),
        Condition::And(terms) => terms
            .iter()
            .map(|t| render_condition(t, w))
            .collect::<Vec<_>>()
            .join(" AND "),
        Condition::Or(terms) if terms.is_empty() => "FALSE".to_string(),
        Condition::Or(terms) => format!(
            "({})",
            terms
                .iter()
                .map(|t| render_condition(t, w))
                .collect::<Vec<_>>()
                .join(" OR ")
        ),
        Condition::Not(term) => format!("NOT ({})", render_condition(term, w)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{OrderBy, Projection, TableRef, UniversalSet};
    use crate::heading::{Attribute, Heading, Lineage};
    use serde_json::Value;

    fn lin(table: &str, attr: &str) -> Lineage {
        Lineage::new("lab", table, attr)
    }

    fn subject() -> QueryExpression {
        QueryExpression::from_table(
            TableRef::new("lab", "subject"),
            Heading::new(vec![
                Attribute::key("subject_id", "int").with_lineage(lin("subject", "subject_id")),
                Attribute::secondary("sex", "char(1)"),
                Attribute::secondary("weight", "float"),
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
    fn test_restricted_table() {
        let sql = subject().restrict(Condition::eq("sex", "F")).unwrap().to_sql();
        assert_eq!(
            sql,
            "SELECT `subject_id`,`sex`,`weight` FROM `lab`.`subject` WHERE `sex`='F'"
        );
    }

    #[test]
    fn test_null_equality() {
        let sql = subject()
            .restrict(Condition::eq("sex", Value::Null))
            .unwrap()
            .to_sql();
        assert!(sql.ends_with("WHERE `sex` IS NULL"));
    }

    #[test]
    fn test_join_using() {
        let sql = session().join(&subject()).unwrap().to_sql();
        assert_eq!(
            sql,
            "SELECT `subject_id`,`session_idx`,`session_date`,`sex`,`weight` \
             FROM `lab`.`session` JOIN `lab`.`subject` USING (`subject_id`)"
        );
    }

    #[test]
    fn test_join_without_matches() {
        let rig = QueryExpression::from_table(
            TableRef::new("lab", "rig"),
            Heading::new(vec![Attribute::key("rig", "varchar(8)").with_lineage(lin("rig", "rig"))])
                .unwrap(),
        );
        let sql = subject().proj(&Projection::new()).unwrap().join(&rig).unwrap().to_sql();
        assert_eq!(
            sql,
            "SELECT `subject_id`,`rig` FROM `lab`.`subject` CROSS JOIN `lab`.`rig`"
        );
    }

    #[test]
    fn test_rename_renders_alias() {
        let sql = subject()
            .proj(&Projection::new().rename("animal", "subject_id"))
            .unwrap()
            .to_sql();
        assert_eq!(sql, "SELECT `subject_id` AS `animal` FROM `lab`.`subject`");
    }

    #[test]
    fn test_aggregation_where_group_having() {
        let sql = session()
            .aggr(
                &trial().restrict("duration > 1").unwrap(),
                &Projection::new().compute("n", "count(*)"),
                false,
            )
            .unwrap()
            .restrict("n > 3")
            .unwrap()
            .to_sql();
        assert_eq!(
            sql,
            "SELECT `subject_id`,`session_idx`,count(*) AS `n` FROM `lab`.`session` \
             JOIN `lab`.`trial` USING (`subject_id`,`session_idx`) WHERE (duration > 1) \
             GROUP BY `subject_id`,`session_idx` HAVING (n > 3)"
        );
    }

    #[test]
    fn test_left_join_for_keep_all_rows() {
        let sql = session()
            .aggr(&trial(), &Projection::new().compute("n", "count(trial_idx)"), true)
            .unwrap()
            .to_sql();
        assert!(sql.contains("LEFT JOIN `lab`.`trial` USING (`subject_id`,`session_idx`)"));
    }

    #[test]
    fn test_semijoin_sql() {
        let females = subject().restrict(Condition::eq("sex", "F")).unwrap();
        let sql = session().restrict(&females).unwrap().to_sql();
        assert_eq!(
            sql,
            "SELECT `subject_id`,`session_idx`,`session_date` FROM `lab`.`session` \
             WHERE (`subject_id`) IN (SELECT `subject_id` FROM `lab`.`subject` WHERE `sex`='F')"
        );
    }

    #[test]
    fn test_derived_table_alias_and_pruning() {
        let sql = subject()
            .top(Top::new().limit(3))
            .unwrap()
            .restrict(Condition::eq("sex", "F"))
            .unwrap()
            .proj(&Projection::new())
            .unwrap()
            .to_sql();
        assert_eq!(
            sql,
            "SELECT `subject_id` FROM (SELECT `subject_id`,`sex` FROM `lab`.`subject` LIMIT 3) \
             AS `$1` WHERE `sex`='F'"
        );
    }

    #[test]
    fn test_order_limit_offset() {
        let top = Top::new().order_by(OrderBy::desc("weight")).limit(5).offset(10);
        let sql = subject().top(top).unwrap().to_sql();
        assert_eq!(
            sql,
            "SELECT `subject_id`,`sex`,`weight` FROM `lab`.`subject` \
             ORDER BY `weight` DESC LIMIT 5 OFFSET 10"
        );
        let sql = subject().top(Top::new().offset(2)).unwrap().to_sql();
        assert!(sql.ends_with("LIMIT 18446744073709551615 OFFSET 2"));
    }

    #[test]
    fn test_boolean_structure() {
        let sql = subject()
            .exclude(Condition::or(vec![
                Condition::eq("sex", "F"),
                Condition::predicate("weight > 3"),
            ]))
            .unwrap()
            .to_sql();
        assert!(sql.ends_with("WHERE NOT ((`sex`='F' OR (weight > 3)))"));

        let sql = subject().exclude(Condition::and(vec![])).unwrap().to_sql();
        assert!(sql.ends_with("WHERE FALSE"));
    }

    #[test]
    fn test_key_only_union() {
        let a = subject().proj(&Projection::new()).unwrap();
        let b = session()
            .proj(&Projection::new().demote("session_idx").exclude("session_idx"))
            .unwrap();
        let sql = a.union(&b).unwrap().to_sql();
        assert_eq!(
            sql,
            "SELECT `subject_id` FROM (SELECT `subject_id` FROM `lab`.`subject` UNION \
             SELECT `subject_id` FROM `lab`.`session`) AS `$1`"
        );
    }

    #[test]
    fn test_universal_set_restriction_is_distinct() {
        let sql = UniversalSet::new(["session_date"])
            .restrict(&session())
            .unwrap()
            .to_sql();
        assert_eq!(sql, "SELECT DISTINCT `session_date` FROM `lab`.`session`");
    }

    #[test]
    fn test_count_and_ansi_config() {
        let config = EngineConfig {
            subquery_alias_prefix: "q".to_string(),
            ..EngineConfig::ansi()
        };
        let sql = subject().count_sql_with(&config);
        assert_eq!(
            sql,
            "SELECT count(*) FROM (SELECT \"subject_id\",\"sex\",\"weight\" \
             FROM \"lab\".\"subject\") AS \"q1\""
        );
    }

    #[test]
    fn test_emission_is_deterministic() {
        let expr = subject()
            .top(Top::new().limit(3))
            .unwrap()
            .join(&session().top(Top::new().limit(4)).unwrap())
            .unwrap();
        let sql = expr.to_sql();
        assert_eq!(sql, expr.to_sql());
        assert!(sql.contains("AS `$1`"));
        assert!(sql.contains("AS `$2`"));
    }
}
