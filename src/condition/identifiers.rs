//! Identifier extraction from free-form SQL fragments
//!
//! Predicate strings and computed attribute expressions are opaque SQL. To
//! know which columns they read, names are scanned out of the text after
//! string literals are blanked; callers intersect the result with a heading.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

static STRING_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"'(?:[^'\\]|\\.|'')*'|"(?:[^"\\]|\\.)*""#).expect("valid literal pattern")
});

static QUOTED_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid quoted identifier pattern"));

static BARE_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\b").expect("valid identifier pattern")
});

/// Every identifier-like token in `sql`, outside string literals.
pub fn extract_identifiers(sql: &str) -> BTreeSet<String> {
    let blanked = STRING_LITERAL.replace_all(sql, " ");
    let mut names: BTreeSet<String> = QUOTED_IDENTIFIER
        .captures_iter(&blanked)
        .map(|c| c[1].to_string())
        .collect();
    names.extend(
        BARE_IDENTIFIER
            .captures_iter(&blanked)
            .map(|c| c[1].to_string()),
    );
    names
}

/// Identifiers of `sql` that are among `known`.
pub fn referenced_names<'a>(
    sql: &str,
    known: impl IntoIterator<Item = &'a str>,
) -> BTreeSet<String> {
    let found = extract_identifiers(sql);
    known
        .into_iter()
        .filter(|n| found.contains(*n))
        .map(str::to_string)
        .collect()
}
