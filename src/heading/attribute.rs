//! Attribute and lineage definitions
//!
//! Lineage names the (schema, table, attribute) an attribute traces back to
//! through foreign-key inheritance. Two namesakes are homologous when their
//! lineages are equal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Origin of an attribute through foreign-key inheritance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Lineage {
    pub schema: String,
    pub table: String,
    pub attribute: String,
}

impl Lineage {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.schema, self.table, self.attribute)
    }
}

/// How an attribute is produced from the FROM clause of its expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttributeExpression {
    /// Alias of another column (rename)
    Column(String),
    /// Free-form SQL expression
    Computed(String),
}

/// A single attribute of a heading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: String,
    #[serde(default)]
    pub in_key: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage: Option<Lineage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<AttributeExpression>,
}

impl Attribute {
    fn plain(name: impl Into<String>, attribute_type: impl Into<String>, in_key: bool) -> Self {
        Self {
            name: name.into(),
            attribute_type: attribute_type.into(),
            in_key,
            nullable: false,
            default: None,
            comment: String::new(),
            lineage: None,
            expression: None,
        }
    }

    /// Primary-key attribute with no lineage yet
    pub fn key(name: impl Into<String>, attribute_type: impl Into<String>) -> Self {
        Self::plain(name, attribute_type, true)
    }

    /// Secondary attribute
    pub fn secondary(name: impl Into<String>, attribute_type: impl Into<String>) -> Self {
        Self::plain(name, attribute_type, false)
    }

    /// Computed attribute: never in the key, never carries lineage
    pub fn computed(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            expression: Some(AttributeExpression::Computed(expression.into())),
            ..Self::plain(name, "", false)
        }
    }

    pub fn with_lineage(mut self, lineage: Lineage) -> Self {
        self.lineage = Some(lineage);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// True for renamed or computed attributes
    pub fn is_derived(&self) -> bool {
        self.expression.is_some()
    }

    /// Copy of this attribute under a new name, aliasing the original column.
    /// Lineage is preserved.
    pub fn renamed(&self, new_name: impl Into<String>) -> Self {
        let expression = match &self.expression {
            Some(expr) => expr.clone(),
            None => AttributeExpression::Column(self.name.clone()),
        };
        Self {
            name: new_name.into(),
            expression: Some(expression),
            ..self.clone()
        }
    }

    /// True when both sides trace to the same origin
    pub fn is_homologous(&self, other: &Attribute) -> bool {
        matches!((&self.lineage, &other.lineage), (Some(a), Some(b)) if a == b)
    }
}
