//! Projection
//!
//! Keeps, renames, duplicates and computes attributes. Key attributes are
//! always kept unless renamed; removing one from the key takes an explicit
//! `demote`. Renamed attributes keep their lineage, computed ones get none.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::QueryExpression;
use crate::condition::referenced_names;
use crate::errors::{AlgebraError, AlgebraResult};

/// Keep every secondary attribute
pub const ALL_SECONDARY: &str = "...";

/// SQL constants that look like identifiers but are values
const CONSTANT_LITERALS: &[&str] = &[
    "NULL",
    "TRUE",
    "FALSE",
    "CURRENT_TIMESTAMP",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "UNKNOWN",
];

static RENAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z_]\w*)\s*$").expect("valid rename pattern"));

static DUPLICATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\(\s*([A-Za-z_]\w*)\s*\)\s*$").expect("valid duplicate pattern")
});

fn is_constant(name: &str) -> bool {
    CONSTANT_LITERALS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(name))
}

/// Projection directives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    keep: Vec<String>,
    all_secondary: bool,
    exclude: Vec<String>,
    rename: Vec<(String, String)>,
    duplicate: Vec<(String, String)>,
    compute: Vec<(String, String)>,
    promote: Vec<String>,
    demote: Vec<String>,
}

impl Projection {
    /// Key only
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses textual directives.
    ///
    /// `names`: `attr` keeps, `-attr` excludes, `...` keeps all secondary
    /// attributes. `named` pairs `(new, definition)`: an identifier renames,
    /// a parenthesized identifier duplicates, anything else computes.
    pub fn parse(names: &[&str], named: &[(&str, &str)]) -> AlgebraResult<Self> {
        let mut projection = Self::new();
        for name in names {
            let name = name.trim();
            if name == ALL_SECONDARY {
                projection.all_secondary = true;
            } else if let Some(excluded) = name.strip_prefix('-') {
                projection.exclude.push(excluded.trim().to_string());
            } else if name.is_empty() {
                return Err(AlgebraError::invalid_projection("Empty attribute name"));
            } else {
                projection.keep.push(name.to_string());
            }
        }
        for (new, definition) in named {
            let new = new.trim();
            if !RENAME_PATTERN.is_match(new) {
                return Err(AlgebraError::invalid_projection(format!(
                    "`{}` is not a valid attribute name",
                    new
                )));
            }
            let source = |pattern: &Regex| {
                pattern
                    .captures(definition)
                    .map(|c| c[1].to_string())
                    .filter(|name| !is_constant(name))
            };
            if let Some(old) = source(&DUPLICATE_PATTERN) {
                projection.duplicate.push((new.to_string(), old));
            } else if let Some(old) = source(&RENAME_PATTERN) {
                projection.rename.push((new.to_string(), old));
            } else {
                projection
                    .compute
                    .push((new.to_string(), definition.trim().to_string()));
            }
        }
        Ok(projection)
    }

    pub fn keep(mut self, name: impl Into<String>) -> Self {
        self.keep.push(name.into());
        self
    }

    pub fn all_secondary(mut self) -> Self {
        self.all_secondary = true;
        self
    }

    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.exclude.push(name.into());
        self
    }

    /// `new = old`
    pub fn rename(mut self, new: impl Into<String>, old: impl Into<String>) -> Self {
        self.rename.push((new.into(), old.into()));
        self
    }

    /// `new = (old)`: keeps `old` and adds a secondary copy named `new`
    pub fn duplicate(mut self, new: impl Into<String>, old: impl Into<String>) -> Self {
        self.duplicate.push((new.into(), old.into()));
        self
    }

    /// `new = expression`
    pub fn compute(mut self, new: impl Into<String>, expression: impl Into<String>) -> Self {
        self.compute.push((new.into(), expression.into()));
        self
    }

    /// Moves a result attribute into the key
    pub fn promote(mut self, name: impl Into<String>) -> Self {
        self.promote.push(name.into());
        self
    }

    /// Moves a key attribute out of the key
    pub fn demote(mut self, name: impl Into<String>) -> Self {
        self.demote.push(name.into());
        self
    }

    fn target_names(&self) -> impl Iterator<Item = &String> {
        self.rename
            .iter()
            .chain(&self.duplicate)
            .chain(&self.compute)
            .map(|(new, _)| new)
    }
}

impl QueryExpression {
    /// Projection; the key is unchanged unless promoted or demoted.
    pub fn proj(&self, projection: &Projection) -> AlgebraResult<QueryExpression> {
        let heading = &self.heading;
        let key: Vec<&str> = heading.primary_key();

        // every referenced source name must exist
        for name in projection
            .keep
            .iter()
            .chain(&projection.exclude)
            .chain(&projection.demote)
            .chain(projection.rename.iter().map(|(_, old)| old))
            .chain(projection.duplicate.iter().map(|(_, old)| old))
        {
            if !heading.contains(name) {
                return Err(AlgebraError::unresolvable(name));
            }
        }
        for name in &projection.demote {
            if !key.contains(&name.as_str()) {
                return Err(AlgebraError::invalid_projection(format!(
                    "Cannot demote `{}`: not a primary key attribute",
                    name
                )));
            }
        }
        for name in &projection.exclude {
            if key.contains(&name.as_str()) && !projection.demote.contains(name) {
                return Err(AlgebraError::key_attribute_excluded(name));
            }
        }
        let mut sources = BTreeSet::new();
        for (_, old) in &projection.rename {
            if !sources.insert(old.as_str()) {
                return Err(AlgebraError::invalid_projection(format!(
                    "Attribute `{}` is renamed more than once",
                    old
                )));
            }
        }

        let renamed_away: BTreeSet<&str> = sources;
        let mut keep: BTreeSet<String> = key
            .iter()
            .filter(|k| !renamed_away.contains(*k))
            .map(|k| k.to_string())
            .collect();
        keep.extend(projection.keep.iter().cloned());
        if projection.all_secondary {
            keep.extend(heading.secondary_attributes().into_iter().map(str::to_string));
        }
        keep.extend(projection.duplicate.iter().map(|(_, old)| old.clone()));
        for name in &projection.exclude {
            keep.remove(name);
        }

        let mut targets = BTreeSet::new();
        for new in projection.target_names() {
            if !targets.insert(new.as_str()) || keep.contains(new) {
                return Err(AlgebraError::duplicate_attribute(new));
            }
        }

        let new_attributes = heading.new_attributes();
        let computes_from_new = projection
            .compute
            .iter()
            .any(|(_, expr)| !referenced_names(expr, new_attributes.iter().copied()).is_empty());
        let restricts_new = new_attributes
            .iter()
            .any(|a| self.restriction_attributes.contains(*a));
        // a new name could shadow an ORDER BY attribute of a limited expression
        let renames_under_top = self.top.is_some() && projection.target_names().next().is_some();
        let base = self.subquery_if(
            self.is_union() || computes_from_new || restricts_new || renames_under_top,
            "projection computes from a derived attribute, drops a restricted one, \
             or names attributes of a limited expression",
        );

        let mut renames: Vec<(String, String, bool)> = projection
            .rename
            .iter()
            .map(|(new, old)| {
                let as_key = base.heading.get(old).map_or(false, |a| a.in_key)
                    && !projection.demote.contains(old);
                (new.clone(), old.clone(), as_key)
            })
            .collect();
        renames.extend(
            projection
                .duplicate
                .iter()
                .map(|(new, old)| (new.clone(), old.clone(), false)),
        );
        let mut selected = base.heading.select(&keep, &renames, &projection.compute);

        if !projection.promote.is_empty() || !projection.demote.is_empty() {
            let mut new_key: Vec<String> = selected
                .primary_key()
                .into_iter()
                .filter(|k| !projection.demote.iter().any(|d| d == k))
                .map(str::to_string)
                .collect();
            for name in &projection.promote {
                if !selected.contains(name) {
                    return Err(AlgebraError::unresolvable(name));
                }
                if !new_key.contains(name) {
                    new_key.push(name.clone());
                }
            }
            if new_key.is_empty() {
                return Err(AlgebraError::invalid_primary_key(
                    "Projection would leave the primary key empty",
                ));
            }
            selected = selected.set_primary_key(&new_key);
        }

        let mut result = base;
        result.heading = selected;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AlgebraErrorCode;
    use crate::expression::{OrderBy, Source, TableRef, Top};
    use crate::heading::{Attribute, AttributeExpression, Heading, Lineage};

    fn session() -> QueryExpression {
        QueryExpression::from_table(
            TableRef::new("lab", "session"),
            Heading::new(vec![
                Attribute::key("subject_id", "int")
                    .with_lineage(Lineage::new("lab", "subject", "subject_id")),
                Attribute::key("session_idx", "int")
                    .with_lineage(Lineage::new("lab", "session", "session_idx")),
                Attribute::secondary("session_date", "date"),
                Attribute::secondary("duration", "float"),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_parse_classifies_directives() {
        let p = Projection::parse(
            &["session_date", "-duration", "..."],
            &[
                ("animal", "subject_id"),
                ("date_copy", "(session_date)"),
                ("minutes", "duration * 60"),
                ("nothing", "NULL"),
            ],
        )
        .unwrap();
        assert_eq!(p.keep, vec!["session_date"]);
        assert_eq!(p.exclude, vec!["duration"]);
        assert!(p.all_secondary);
        assert_eq!(p.rename, vec![("animal".to_string(), "subject_id".to_string())]);
        assert_eq!(
            p.duplicate,
            vec![("date_copy".to_string(), "session_date".to_string())]
        );
        assert_eq!(p.compute.len(), 2);
        assert_eq!(p.compute[1], ("nothing".to_string(), "NULL".to_string()));
    }

    #[test]
    fn test_parse_rejects_bad_target_name() {
        assert!(Projection::parse(&[], &[("two words", "x")]).is_err());
    }

    #[test]
    fn test_empty_projection_keeps_key() {
        let projected = session().proj(&Projection::new()).unwrap();
        assert_eq!(projected.heading().names(), vec!["subject_id", "session_idx"]);
    }

    #[test]
    fn test_rename_key_attribute_keeps_key_identity() {
        let projected = session()
            .proj(&Projection::new().rename("animal_id", "subject_id"))
            .unwrap();
        assert_eq!(projected.primary_key(), vec!["animal_id", "session_idx"]);
        let attr = projected.heading().get("animal_id").unwrap();
        assert_eq!(attr.lineage, Some(Lineage::new("lab", "subject", "subject_id")));
        assert!(!projected.heading().contains("subject_id"));
    }

    #[test]
    fn test_computed_has_no_lineage() {
        let projected = session()
            .proj(&Projection::new().compute("minutes", "duration * 60"))
            .unwrap();
        let attr = projected.heading().get("minutes").unwrap();
        assert!(attr.lineage.is_none());
        assert!(!attr.in_key);
        assert_eq!(
            attr.expression,
            Some(AttributeExpression::Computed("duration * 60".into()))
        );
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let err = session()
            .proj(&Projection::new().compute("x", "1").compute("x", "2"))
            .unwrap_err();
        assert_eq!(err.code(), AlgebraErrorCode::InvalidProjection);
        let err = session()
            .proj(&Projection::new().compute("session_idx", "1"))
            .unwrap_err();
        assert_eq!(err.code(), AlgebraErrorCode::InvalidProjection);
    }

    #[test]
    fn test_exclude_key_requires_demote() {
        let err = session()
            .proj(&Projection::new().exclude("session_idx"))
            .unwrap_err();
        assert_eq!(err.code(), AlgebraErrorCode::InvalidPrimaryKey);

        let projected = session()
            .proj(&Projection::new().demote("session_idx").exclude("session_idx"))
            .unwrap();
        assert_eq!(projected.primary_key(), vec!["subject_id"]);
    }

    #[test]
    fn test_demote_everything_rejected() {
        let err = session()
            .proj(&Projection::new().demote("subject_id").demote("session_idx"))
            .unwrap_err();
        assert_eq!(err.code(), AlgebraErrorCode::InvalidPrimaryKey);
    }

    #[test]
    fn test_promote_secondary() {
        let projected = session()
            .proj(&Projection::new().keep("session_date").promote("session_date"))
            .unwrap();
        assert_eq!(
            projected.primary_key(),
            vec!["subject_id", "session_idx", "session_date"]
        );
    }

    #[test]
    fn test_unknown_attribute() {
        let err = session().proj(&Projection::new().keep("weight")).unwrap_err();
        assert_eq!(err.code(), AlgebraErrorCode::UnresolvableAttribute);
    }

    #[test]
    fn test_compute_over_computed_wraps() {
        let first = session()
            .proj(&Projection::new().compute("minutes", "duration * 60"))
            .unwrap();
        let second = first
            .proj(&Projection::new().compute("hours", "minutes / 60"))
            .unwrap();
        assert!(matches!(second.support()[0], Source::Query(_)));
        assert!(!second.heading().contains("minutes"));
    }

    #[test]
    fn test_duplicate_keeps_original() {
        let projected = session()
            .proj(&Projection::new().duplicate("idx_copy", "session_idx"))
            .unwrap();
        assert_eq!(projected.primary_key(), vec!["subject_id", "session_idx"]);
        assert!(!projected.heading().get("idx_copy").unwrap().in_key);
    }

    #[test]
    fn test_compute_over_limited_expression_wraps() {
        let longest = session()
            .top(Top::new().order_by(OrderBy::desc("duration")).limit(3))
            .unwrap();
        let projected = longest
            .proj(&Projection::new().compute("duration", "0"))
            .unwrap();
        assert!(projected.top_clause().is_none());
        assert!(matches!(projected.support()[0], Source::Query(_)));
        assert_eq!(
            projected.to_sql(),
            "SELECT `subject_id`,`session_idx`,0 AS `duration` FROM \
             (SELECT `subject_id`,`session_idx`,`duration` FROM `lab`.`session` \
             ORDER BY `duration` DESC LIMIT 3) AS `$1`"
        );
    }

    #[test]
    fn test_keep_over_limited_expression_is_inline() {
        let limited = session().top(Top::new().limit(3)).unwrap();
        let projected = limited.proj(&Projection::new().keep("session_date")).unwrap();
        assert!(projected.top_clause().is_some());
        assert!(matches!(projected.support()[0], Source::Table(_)));
    }
}
