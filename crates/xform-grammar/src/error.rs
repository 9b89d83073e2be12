//! Error types for the value grammar

/// Errors raised while parsing shared value types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    /// String is neither a numeric literal nor a well-formed expression
    #[error("malformed expression '{0}'")]
    MalformedExpression(String),

    /// NaN or infinity
    #[error("number must be finite")]
    NonFinite,

    /// JSON value of the wrong kind
    #[error("expected {expected}, found {found}")]
    UnexpectedType {
        /// What the grammar accepts here
        expected: &'static str,
        /// JSON kind that was supplied
        found: &'static str,
    },

    /// Color is neither hex nor a named color
    #[error("invalid color '{0}': expected 6 or 8 hex digits or a color name")]
    InvalidColor(String),

    /// Background value does not match any background variant
    #[error("invalid background: {0}")]
    InvalidBackground(String),
}

impl GrammarError {
    /// Create a type mismatch error for a JSON value
    #[inline]
    #[must_use]
    pub fn unexpected(expected: &'static str, found: &serde_json::Value) -> Self {
        Self::UnexpectedType {
            expected,
            found: json_kind(found),
        }
    }
}

/// Human-readable JSON kind, used in error messages
#[must_use]
pub fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
