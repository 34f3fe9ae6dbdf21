//! Literal values in equality restrictions
//!
//! Values are `serde_json::Value` scalars. Arrays and objects are rejected
//! when the restriction is applied, so rendering never fails.

use serde_json::Value;

use crate::errors::{AlgebraError, AlgebraResult};

/// Rejects values that have no SQL literal form.
pub(crate) fn check_scalar(attribute: &str, value: &Value) -> AlgebraResult<()> {
    match value {
        Value::Array(_) | Value::Object(_) => Err(AlgebraError::invalid_condition(format!(
            "Value for `{}` must be a scalar, got {}",
            attribute, value
        ))),
        _ => Ok(()),
    }
}

/// SQL literal for a scalar value.
pub fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_string(s),
        other => quote_string(&other.to_string()),
    }
}

fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_scalars() {
        assert_eq!(render_literal(&json!(3)), "3");
        assert_eq!(render_literal(&json!(2.5)), "2.5");
        assert_eq!(render_literal(&json!(true)), "TRUE");
        assert_eq!(render_literal(&json!(null)), "NULL");
        assert_eq!(render_literal(&json!("abc")), "'abc'");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(render_literal(&json!("O'Brien")), "'O''Brien'");
        assert_eq!(render_literal(&json!("a\\b")), "'a\\\\b'");
    }

    #[test]
    fn test_non_scalar_rejected() {
        assert!(check_scalar("x", &json!([1, 2])).is_err());
        assert!(check_scalar("x", &json!({"a": 1})).is_err());
        assert!(check_scalar("x", &json!("ok")).is_ok());
    }
}
