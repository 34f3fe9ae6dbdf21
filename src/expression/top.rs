//! ORDER BY / LIMIT / OFFSET

use crate::errors::{AlgebraError, AlgebraResult};
use crate::heading::Heading;

/// Ordering token that expands to the primary key
pub const KEY_ORDER: &str = "KEY";

/// A single ordering term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub attribute: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            descending: false,
        }
    }

    pub fn desc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            descending: true,
        }
    }

    /// Parses `name`, `name ASC` or `name DESC`
    pub fn parse(text: &str) -> AlgebraResult<Self> {
        let mut parts = text.split_whitespace();
        let attribute = parts
            .next()
            .ok_or_else(|| AlgebraError::invalid_operand("Empty ordering term"))?;
        let descending = match parts.next().map(|s| s.to_ascii_uppercase()) {
            None => false,
            Some(ref d) if d == "ASC" => false,
            Some(ref d) if d == "DESC" => true,
            Some(other) => {
                return Err(AlgebraError::invalid_operand(format!(
                    "Invalid ordering direction `{}`",
                    other
                )))
            }
        };
        if parts.next().is_some() {
            return Err(AlgebraError::invalid_operand(format!(
                "Invalid ordering term `{}`",
                text
            )));
        }
        Ok(Self {
            attribute: attribute.to_string(),
            descending,
        })
    }
}

/// Limit, offset and ordering applied to an expression
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Top {
    pub limit: Option<u64>,
    pub order_by: Vec<OrderBy>,
    pub offset: u64,
}

impl Top {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn order_by(mut self, term: OrderBy) -> Self {
        self.order_by.push(term);
        self
    }

    /// Expands `KEY` and checks every ordering attribute against `heading`.
    pub(crate) fn resolve(&self, heading: &Heading) -> AlgebraResult<Top> {
        let mut order_by = Vec::with_capacity(self.order_by.len());
        for term in &self.order_by {
            if term.attribute == KEY_ORDER {
                order_by.extend(heading.primary_key().into_iter().map(|name| OrderBy {
                    attribute: name.to_string(),
                    descending: term.descending,
                }));
            } else if heading.contains(&term.attribute) {
                order_by.push(term.clone());
            } else {
                return Err(AlgebraError::unresolvable(&term.attribute));
            }
        }
        Ok(Top {
            limit: self.limit,
            order_by,
            offset: self.offset,
        })
    }

    pub(crate) fn attributes(&self) -> impl Iterator<Item = &str> {
        self.order_by.iter().map(|o| o.attribute.as_str())
    }
}
