//! Heading: ordered attribute set partitioned into key and secondary groups
//!
//! Invariants:
//! - attribute names are unique
//! - key attributes precede secondary attributes, and every operator keeps
//!   the relative order of each group
//! - a heading produced by an operator has at least one key attribute

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::attribute::{Attribute, AttributeExpression};
use crate::config::EngineConfig;
use crate::errors::{AlgebraError, AlgebraResult};

/// Ordered set of attributes with a primary key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    attributes: Vec<Attribute>,
}

impl Heading {
    /// Builds a heading, moving key attributes ahead of secondary ones.
    pub fn new(attributes: Vec<Attribute>) -> AlgebraResult<Self> {
        let mut seen = BTreeSet::new();
        for attr in &attributes {
            if !seen.insert(attr.name.as_str()) {
                return Err(AlgebraError::duplicate_attribute(&attr.name));
            }
        }
        let heading = Self::key_first(attributes);
        if heading.primary_key().is_empty() {
            return Err(AlgebraError::invalid_primary_key(
                "A heading must have at least one primary key attribute",
            ));
        }
        Ok(heading)
    }

    /// Stable partition: key attributes first. Names must already be unique.
    pub(crate) fn key_first(attributes: Vec<Attribute>) -> Self {
        let (mut key, secondary): (Vec<_>, Vec<_>) =
            attributes.into_iter().partition(|a| a.in_key);
        key.extend(secondary);
        Self { attributes: key }
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn primary_key(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.in_key)
            .map(|a| a.name.as_str())
            .collect()
    }

    pub fn secondary_attributes(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| !a.in_key)
            .map(|a| a.name.as_str())
            .collect()
    }

    /// Names of renamed or computed attributes
    pub fn new_attributes(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.is_derived())
            .map(|a| a.name.as_str())
            .collect()
    }

    pub fn is_new_attribute(&self, name: &str) -> bool {
        self.get(name).map_or(false, Attribute::is_derived)
    }

    /// `self -> other`: every key attribute of `other` is present in `self`.
    pub fn determines(&self, other: &Heading) -> bool {
        other
            .attributes
            .iter()
            .filter(|a| a.in_key)
            .all(|a| self.contains(&a.name))
    }

    /// Projection of the heading: kept attributes in heading order, each
    /// followed by its renamed copies, then computed attributes.
    ///
    /// `renames` are `(new, old, as_key)`; a copy that is not `as_key` lands
    /// in the secondary group.
    pub(crate) fn select(
        &self,
        keep: &BTreeSet<String>,
        renames: &[(String, String, bool)],
        computes: &[(String, String)],
    ) -> Heading {
        let mut out = Vec::with_capacity(keep.len() + renames.len() + computes.len());
        for attr in &self.attributes {
            if keep.contains(&attr.name) {
                out.push(attr.clone());
            }
            for (new, _, as_key) in renames.iter().filter(|(_, old, _)| *old == attr.name) {
                let mut copy = attr.renamed(new.clone());
                copy.in_key = *as_key;
                out.push(copy);
            }
        }
        out.extend(
            computes
                .iter()
                .map(|(name, expr)| Attribute::computed(name.clone(), expr.clone())),
        );
        Self::key_first(out)
    }

    /// Same attributes with the given names, in the given order, as the key.
    pub(crate) fn set_primary_key(&self, key: &[String]) -> Heading {
        let mut out = Vec::with_capacity(self.attributes.len());
        for name in key {
            if let Some(attr) = self.get(name) {
                let mut attr = attr.clone();
                attr.in_key = true;
                out.push(attr);
            }
        }
        out.extend(
            self.attributes
                .iter()
                .filter(|a| !key.contains(&a.name))
                .map(|a| {
                    let mut a = a.clone();
                    a.in_key = false;
                    a
                }),
        );
        Self { attributes: out }
    }

    /// Heading of this expression seen from an enclosing query: every
    /// attribute becomes a plain column, lineage is kept.
    pub(crate) fn make_subquery_heading(&self) -> Heading {
        Self {
            attributes: self
                .attributes
                .iter()
                .map(|a| Attribute {
                    expression: None,
                    ..a.clone()
                })
                .collect(),
        }
    }

    /// Keeps only the named attributes, in heading order.
    pub(crate) fn retain(&self, names: &BTreeSet<String>) -> Heading {
        Self {
            attributes: self
                .attributes
                .iter()
                .filter(|a| names.contains(&a.name))
                .cloned()
                .collect(),
        }
    }

    /// Join heading with primary-key determination.
    ///
    /// - `self -> other` (including mutual determination): key of `self`
    /// - only `other -> self`: key of `other`
    /// - neither, or `nullable_pk`: key of `self` followed by the remaining
    ///   key attributes of `other`
    ///
    /// Non-key attributes follow in operand order, left then right. Right-hand
    /// attributes of a left join become nullable.
    pub(crate) fn join(&self, other: &Heading, left: bool, nullable_pk: bool) -> Heading {
        let self_key = self.primary_key();
        let other_key = other.primary_key();

        let (key, key_from_other): (Vec<&str>, bool) =
            if !nullable_pk && self.determines(other) {
                (self_key, false)
            } else if !nullable_pk && other.determines(self) {
                (other_key, true)
            } else {
                let mut key = self_key;
                key.extend(
                    other_key
                        .into_iter()
                        .filter(|n| !self.get(n).map_or(false, |a| a.in_key)),
                );
                (key, false)
            };

        let mut out: Vec<Attribute> = Vec::with_capacity(self.len() + other.len());
        for name in &key {
            let attr = if key_from_other {
                other.get(name)
            } else {
                self.get(name).filter(|a| a.in_key).or_else(|| other.get(name))
            };
            if let Some(attr) = attr {
                let mut attr = attr.clone();
                attr.in_key = true;
                if left && !self.contains(name) {
                    attr.nullable = true;
                }
                out.push(attr);
            }
        }
        for attr in &self.attributes {
            if !key.contains(&attr.name.as_str()) {
                let mut attr = attr.clone();
                attr.in_key = false;
                out.push(attr);
            }
        }
        for attr in &other.attributes {
            if !key.contains(&attr.name.as_str()) && !self.contains(&attr.name) {
                let mut attr = attr.clone();
                attr.in_key = false;
                if left {
                    attr.nullable = true;
                }
                out.push(attr);
            }
        }
        Self { attributes: out }
    }

    /// SELECT list for the given names.
    pub fn as_sql(&self, fields: &[&str], config: &EngineConfig) -> String {
        fields
            .iter()
            .map(|name| match self.get(name).and_then(|a| a.expression.as_ref()) {
                Some(AttributeExpression::Column(old)) => {
                    format!("{} AS {}", config.quote(old), config.quote(name))
                }
                Some(AttributeExpression::Computed(expr)) => {
                    format!("{} AS {}", expr, config.quote(name))
                }
                None => config.quote(name),
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Table-definition style description, one attribute per line.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let mut in_key = true;
        for attr in &self.attributes {
            if in_key && !attr.in_key {
                out.push_str("---\n");
                in_key = false;
            }
            let ty = match &attr.expression {
                Some(AttributeExpression::Computed(expr)) => format!("= {}", expr),
                Some(AttributeExpression::Column(old)) => format!("-> {}", old),
                None if attr.nullable => format!("{}  # nullable", attr.attribute_type),
                None => attr.attribute_type.clone(),
            };
            let _ = write!(out, "{:<24}: {}", attr.name, ty);
            if let Some(default) = &attr.default {
                let _ = write!(out, " = {}", default);
            }
            if !attr.comment.is_empty() {
                let _ = write!(out, "  # {}", attr.comment);
            }
            if let Some(lineage) = &attr.lineage {
                let _ = write!(out, "  # lineage: {}", lineage);
            }
            out.push('\n');
        }
        if in_key {
            out.push_str("---\n");
        }
        out
    }
}
