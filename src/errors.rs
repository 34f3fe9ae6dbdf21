//! Algebra error types
//!
//! Every error here is raised while an expression is being constructed, never
//! while it executes. Backend failures are a separate concern (see `fetch`).
//!
//! Error codes:
//! - RELALG_SEMANTIC_MISMATCH
//! - RELALG_UNRESOLVABLE_ATTRIBUTE
//! - RELALG_INVALID_PRIMARY_KEY
//! - RELALG_INCOMPATIBLE_UNION
//! - RELALG_AGGREGATION_KEY_VIOLATION
//! - RELALG_UNKNOWN_TABLE
//! - RELALG_INVALID_PROJECTION
//! - RELALG_INVALID_OPERAND
//! - RELALG_INVALID_CONDITION

use std::fmt;

use thiserror::Error;

/// Algebra error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgebraErrorCode {
    /// Namesake attributes with conflicting or absent lineage
    SemanticMismatch,
    /// Reference to a name not present in the relevant heading
    UnresolvableAttribute,
    /// Operator would produce an empty or ambiguous primary key
    InvalidPrimaryKey,
    /// Mismatched primary keys or overlapping secondary attributes in a union
    IncompatibleUnion,
    /// Grouped operand lacks part of the grouping operand's primary key
    AggregationKeyViolation,
    /// Base table not known to the heading provider
    UnknownTable,
    /// Malformed or conflicting projection directives
    InvalidProjection,
    /// Operand not allowed for this operator
    InvalidOperand,
    /// Condition that cannot be expressed
    InvalidCondition,
}

impl AlgebraErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            AlgebraErrorCode::SemanticMismatch => "RELALG_SEMANTIC_MISMATCH",
            AlgebraErrorCode::UnresolvableAttribute => "RELALG_UNRESOLVABLE_ATTRIBUTE",
            AlgebraErrorCode::InvalidPrimaryKey => "RELALG_INVALID_PRIMARY_KEY",
            AlgebraErrorCode::IncompatibleUnion => "RELALG_INCOMPATIBLE_UNION",
            AlgebraErrorCode::AggregationKeyViolation => "RELALG_AGGREGATION_KEY_VIOLATION",
            AlgebraErrorCode::UnknownTable => "RELALG_UNKNOWN_TABLE",
            AlgebraErrorCode::InvalidProjection => "RELALG_INVALID_PROJECTION",
            AlgebraErrorCode::InvalidOperand => "RELALG_INVALID_OPERAND",
            AlgebraErrorCode::InvalidCondition => "RELALG_INVALID_CONDITION",
        }
    }
}

impl fmt::Display for AlgebraErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Algebra error with full context
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct AlgebraError {
    code: AlgebraErrorCode,
    message: String,
    attribute: Option<String>,
}

impl AlgebraError {
    fn new(code: AlgebraErrorCode, message: String, attribute: Option<String>) -> Self {
        Self {
            code,
            message,
            attribute,
        }
    }

    /// Namesakes whose lineages differ
    pub fn lineage_conflict(name: &str, left: impl fmt::Display, right: impl fmt::Display) -> Self {
        Self::new(
            AlgebraErrorCode::SemanticMismatch,
            format!(
                "Cannot match attribute `{}`: lineage `{}` differs from `{}`",
                name, left, right
            ),
            Some(name.to_string()),
        )
    }

    /// Namesakes where one or both sides carry no lineage
    pub fn missing_lineage(name: &str) -> Self {
        Self::new(
            AlgebraErrorCode::SemanticMismatch,
            format!(
                "Cannot match attribute `{}`: namesakes without a common lineage. \
                 Rename one side with a projection.",
                name
            ),
            Some(name.to_string()),
        )
    }

    /// Unknown attribute name
    pub fn unresolvable(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            AlgebraErrorCode::UnresolvableAttribute,
            format!("Attribute `{}` not found", name),
            Some(name),
        )
    }

    /// Primary key would be empty or ambiguous
    pub fn invalid_primary_key(reason: impl Into<String>) -> Self {
        Self::new(AlgebraErrorCode::InvalidPrimaryKey, reason.into(), None)
    }

    /// Excluding a key attribute without demoting it first
    pub fn key_attribute_excluded(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            AlgebraErrorCode::InvalidPrimaryKey,
            format!("Cannot exclude primary key attribute `{}`", name),
            Some(name),
        )
    }

    /// Union operands that disagree
    pub fn incompatible_union(reason: impl Into<String>) -> Self {
        Self::new(AlgebraErrorCode::IncompatibleUnion, reason.into(), None)
    }

    /// Grouped operand lacks a key attribute of the grouping operand
    pub fn aggregation_key(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            AlgebraErrorCode::AggregationKeyViolation,
            format!(
                "Grouped expression does not carry primary key attribute `{}`",
                name
            ),
            Some(name),
        )
    }

    /// Unknown base table
    pub fn unknown_table(table: impl Into<String>) -> Self {
        Self::new(
            AlgebraErrorCode::UnknownTable,
            format!("Table `{}` is not defined", table.into()),
            None,
        )
    }

    /// Malformed projection
    pub fn invalid_projection(reason: impl Into<String>) -> Self {
        Self::new(AlgebraErrorCode::InvalidProjection, reason.into(), None)
    }

    /// Target name used twice in a projection
    pub fn duplicate_attribute(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            AlgebraErrorCode::InvalidProjection,
            format!("Attribute `{}` already exists", name),
            Some(name),
        )
    }

    /// Operand not allowed here
    pub fn invalid_operand(reason: impl Into<String>) -> Self {
        Self::new(AlgebraErrorCode::InvalidOperand, reason.into(), None)
    }

    /// Condition that cannot be rendered
    pub fn invalid_condition(reason: impl Into<String>) -> Self {
        Self::new(AlgebraErrorCode::InvalidCondition, reason.into(), None)
    }

    /// Returns the error code
    pub fn code(&self) -> AlgebraErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending attribute name if applicable
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }
}

/// Result type for algebra operations
pub type AlgebraResult<T> = Result<T, AlgebraError>;
