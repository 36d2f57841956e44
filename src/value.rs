//! `ValueType`: the runtime type descriptor channels validate updates against.
//!
//! Channel elements are `serde_json::Value` — the same dynamically-typed
//! payload convention this codebase already uses for tool arguments and
//! store values. Rust has no reflective generics, so where the source engine
//! carries a runtime class token per channel, this engine carries an explicit
//! `ValueType` recorded at channel construction (see SPEC_FULL.md §9).

use serde_json::Value;

/// Declared shape of the elements a channel accepts.
///
/// `Any` disables the check entirely — used for auto-created channels whose
/// element type could not be inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
    Any,
}

impl ValueType {
    /// True if `value` is assignable to a channel declared with this type.
    /// `Value::Null` is always assignable; variant-specific null handling
    /// (skip vs. reject) happens in the channel, not here.
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            ValueType::Any => true,
            ValueType::Null => value.is_null(),
            ValueType::Bool => value.is_boolean(),
            ValueType::Number => value.is_number(),
            ValueType::String => value.is_string(),
            ValueType::Array => value.is_array(),
            ValueType::Object => value.is_object(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
            ValueType::Any => "any",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// **Scenario**: String type accepts strings and null, rejects numbers.
    #[test]
    fn string_type_accepts_strings_and_null_rejects_numbers() {
        assert!(ValueType::String.accepts(&json!("hi")));
        assert!(ValueType::String.accepts(&Value::Null));
        assert!(!ValueType::String.accepts(&json!(42)));
    }

    /// **Scenario**: Any type accepts everything.
    #[test]
    fn any_type_accepts_everything() {
        assert!(ValueType::Any.accepts(&json!(42)));
        assert!(ValueType::Any.accepts(&json!("s")));
        assert!(ValueType::Any.accepts(&json!([1, 2])));
        assert!(ValueType::Any.accepts(&json!({"k": "v"})));
    }
}
