//! Raw parameter access
//!
//! [`RawParams`] wraps the JSON object proposed for one step. It is first
//! intersected with the operation's accepted field set (extra keys are
//! dropped, since plan generators over-generate), after which every typed
//! accessor is strict: a present value of the wrong shape is an error, an
//! absent or `null` value is `None`.

use crate::error::ValidationError;
use crate::kind::OperationKind;
use serde_json::{Map, Value};
use std::ops::RangeInclusive;
use xform_grammar::{json_kind, Background, Color, GrammarError, Scalar};

/// Closed string enumeration accepted by a field
pub trait Choice: Sized + Copy {
    /// Accepted spellings, in canonical form
    const NAMES: &'static [&'static str];

    /// Parse a canonical name
    fn from_name(name: &str) -> Option<Self>;

    /// Canonical name
    fn as_str(self) -> &'static str;
}

/// Define a [`Choice`] enum from variant/name pairs
#[macro_export]
macro_rules! choice {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $crate::params::Choice for $name {
            const NAMES: &'static [&'static str] = &[$($text),+];

            fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $text => Some(Self::$variant), )+
                    _ => None,
                }
            }

            fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::params::Choice::as_str(*self))
            }
        }
    };
}

/// A field that is either a boolean switch or a settings object
#[derive(Debug)]
pub enum Toggle {
    /// `true`: enable with service defaults
    Enabled,
    /// Object with explicit settings
    Configured(RawParams),
}

/// Parameter mapping for one operation step
#[derive(Debug, Clone)]
pub struct RawParams {
    operation: OperationKind,
    prefix: Option<String>,
    map: Map<String, Value>,
}

impl RawParams {
    /// Wrap a mapping without filtering
    #[inline]
    #[must_use]
    pub fn new(operation: OperationKind, map: Map<String, Value>) -> Self {
        Self {
            operation,
            prefix: None,
            map,
        }
    }

    /// Keep only the accepted fields, dropping everything else
    #[must_use]
    pub fn intersect(operation: OperationKind, raw: &Map<String, Value>, accepted: &[&str]) -> Self {
        let mut map = Map::new();
        for (key, value) in raw {
            if accepted.contains(&key.as_str()) {
                map.insert(key.clone(), value.clone());
            } else {
                tracing::debug!(%operation, field = %key, "dropping unrecognized parameter");
            }
        }
        Self::new(operation, map)
    }

    /// Drop every field outside `accepted`
    #[must_use]
    pub fn retain_fields(mut self, accepted: &[&str]) -> Self {
        let operation = self.operation;
        let prefix = self.prefix.clone();
        self.map.retain(|key, _| {
            let keep = accepted.contains(&key.as_str());
            if !keep {
                tracing::debug!(%operation, field = %key, ?prefix, "dropping unrecognized parameter");
            }
            keep
        });
        self
    }

    /// Operation these parameters belong to
    #[inline]
    #[must_use]
    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    /// Whether no non-null values are present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.values().all(Value::is_null)
    }

    /// Whether a non-null value is present
    #[inline]
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.raw(field).is_some()
    }

    /// Non-null raw value
    #[inline]
    #[must_use]
    pub fn raw(&self, field: &str) -> Option<&Value> {
        self.map.get(field).filter(|v| !v.is_null())
    }

    /// Dotted path of a field, for error messages
    #[must_use]
    pub fn path(&self, field: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}.{field}"),
            None => field.to_string(),
        }
    }

    /// Optional boolean
    pub fn bool(&self, field: &str) -> Result<Option<bool>, ValidationError> {
        match self.raw(field) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.invalid_type(field, "boolean", other)),
        }
    }

    /// Boolean switch, absent meaning off
    pub fn flag(&self, field: &str) -> Result<bool, ValidationError> {
        Ok(self.bool(field)?.unwrap_or(false))
    }

    /// Optional non-empty string, trimmed
    pub fn string(&self, field: &str) -> Result<Option<String>, ValidationError> {
        match self.raw(field) {
            None => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
            Some(other) => Err(self.invalid_type(field, "string", other)),
        }
    }

    /// Required non-empty string
    pub fn required_string(&self, field: &str) -> Result<String, ValidationError> {
        self.string(field)?.ok_or_else(|| self.missing(field))
    }

    /// Required string that is not blank, kept exactly as given
    pub fn required_text(&self, field: &str) -> Result<String, ValidationError> {
        match self.raw(field) {
            Some(Value::String(s)) if s.trim().is_empty() => Err(self.missing(field)),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(self.invalid_type(field, "string", other)),
            None => Err(self.missing(field)),
        }
    }

    /// Optional scalar of any sign
    pub fn scalar(&self, field: &str) -> Result<Option<Scalar>, ValidationError> {
        self.raw(field)
            .map(|value| Scalar::from_json(value).map_err(|e| self.grammar(field, e)))
            .transpose()
    }

    /// Optional scalar that must be positive when numeric
    pub fn positive_scalar(&self, field: &str) -> Result<Option<Scalar>, ValidationError> {
        let scalar = self.scalar(field)?;
        match scalar {
            Some(ref s) if !s.is_positive_or_symbolic() => {
                Err(self.out_of_range(field, "must be greater than 0"))
            }
            _ => Ok(scalar),
        }
    }

    /// Optional scalar that must be zero or positive when numeric
    pub fn non_negative_scalar(&self, field: &str) -> Result<Option<Scalar>, ValidationError> {
        let scalar = self.scalar(field)?;
        match scalar {
            Some(ref s) if !s.is_non_negative_or_symbolic() => {
                Err(self.out_of_range(field, "must not be negative"))
            }
            _ => Ok(scalar),
        }
    }

    /// Optional integer within an inclusive range
    pub fn integer_in(
        &self,
        field: &str,
        range: RangeInclusive<i64>,
    ) -> Result<Option<i64>, ValidationError> {
        let Some(value) = self.raw(field) else {
            return Ok(None);
        };
        let number = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
        .ok_or_else(|| self.invalid_type(field, "integer", value))?;

        if range.contains(&number) {
            Ok(Some(number))
        } else {
            Err(self.out_of_range(
                field,
                format!("{number} not in {}..={}", range.start(), range.end()),
            ))
        }
    }

    /// Optional finite number within an inclusive range
    pub fn number_in(
        &self,
        field: &str,
        range: RangeInclusive<f64>,
    ) -> Result<Option<f64>, ValidationError> {
        let Some(value) = self.raw(field) else {
            return Ok(None);
        };
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|n| n.is_finite())
        .ok_or_else(|| self.invalid_type(field, "number", value))?;

        if range.contains(&number) {
            Ok(Some(number))
        } else {
            Err(self.out_of_range(
                field,
                format!("{number} not in {}..={}", range.start(), range.end()),
            ))
        }
    }

    /// Optional number strictly greater than zero
    pub fn positive_number(&self, field: &str) -> Result<Option<f64>, ValidationError> {
        match self.number_in(field, f64::MIN..=f64::MAX)? {
            Some(n) if n <= 0.0 => Err(self.out_of_range(field, "must be greater than 0")),
            other => Ok(other),
        }
    }

    /// Optional enumeration value
    pub fn choice<T: Choice>(&self, field: &str) -> Result<Option<T>, ValidationError> {
        let Some(text) = self.string(field)? else {
            return Ok(None);
        };
        T::from_name(&text.to_ascii_lowercase())
            .map(Some)
            .ok_or_else(|| self.not_allowed(field, &text, T::NAMES))
    }

    /// Optional color
    pub fn color(&self, field: &str) -> Result<Option<Color>, ValidationError> {
        self.raw(field)
            .map(|value| Color::from_json(value).map_err(|e| self.grammar(field, e)))
            .transpose()
    }

    /// Optional background
    pub fn background(&self, field: &str) -> Result<Option<Background>, ValidationError> {
        self.raw(field)
            .map(|value| Background::from_json(value).map_err(|e| self.grammar(field, e)))
            .transpose()
    }

    /// Optional nested object, with field paths prefixed for error messages
    pub fn nested(&self, field: &str) -> Result<Option<Self>, ValidationError> {
        match self.raw(field) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(self.child(field, map.clone()))),
            Some(other) => Err(self.invalid_type(field, "object", other)),
        }
    }

    /// Optional switch-or-object field; `false` counts as absent
    pub fn toggle(&self, field: &str) -> Result<Option<Toggle>, ValidationError> {
        match self.raw(field) {
            None | Some(Value::Bool(false)) => Ok(None),
            Some(Value::Bool(true)) => Ok(Some(Toggle::Enabled)),
            Some(Value::Object(map)) => Ok(Some(Toggle::Configured(self.child(field, map.clone())))),
            Some(other) => Err(self.invalid_type(field, "boolean or object", other)),
        }
    }

    /// Parameters nested under `field`, sharing its path prefix
    pub(crate) fn child(&self, field: &str, map: Map<String, Value>) -> Self {
        Self {
            operation: self.operation,
            prefix: Some(self.path(field)),
            map,
        }
    }

    /// Fail when both fields are set
    pub fn exclusive(&self, field: &str, other: &str) -> Result<(), ValidationError> {
        if self.contains(field) && self.contains(other) {
            Err(self.conflict(field, other))
        } else {
            Ok(())
        }
    }

    // Error constructors

    /// Missing required field
    #[must_use]
    pub fn missing(&self, field: &str) -> ValidationError {
        ValidationError::MissingField {
            operation: self.operation,
            field: self.path(field),
        }
    }

    /// Wrong JSON type
    #[must_use]
    pub fn invalid_type(&self, field: &str, expected: &'static str, found: &Value) -> ValidationError {
        ValidationError::InvalidType {
            operation: self.operation,
            field: self.path(field),
            expected,
            found: json_kind(found),
        }
    }

    /// Value outside an enumeration
    #[must_use]
    pub fn not_allowed(&self, field: &str, value: &str, allowed: &[&str]) -> ValidationError {
        ValidationError::NotAllowed {
            operation: self.operation,
            field: self.path(field),
            value: value.to_string(),
            allowed: allowed.join(", "),
        }
    }

    /// Value outside its numeric range
    #[must_use]
    pub fn out_of_range(&self, field: &str, constraint: impl Into<String>) -> ValidationError {
        ValidationError::OutOfRange {
            operation: self.operation,
            field: self.path(field),
            constraint: constraint.into(),
        }
    }

    /// Two fields set together
    #[must_use]
    pub fn conflict(&self, field: &str, other: &str) -> ValidationError {
        ValidationError::Conflict {
            operation: self.operation,
            field: self.path(field),
            other: self.path(other),
        }
    }

    /// Prerequisite missing
    #[must_use]
    pub fn requires(&self, field: &str, requirement: impl Into<String>) -> ValidationError {
        ValidationError::Requires {
            operation: self.operation,
            field: self.path(field),
            requirement: requirement.into(),
        }
    }

    /// Grammar failure on a field
    #[must_use]
    pub fn grammar(&self, field: &str, source: GrammarError) -> ValidationError {
        ValidationError::Grammar {
            operation: self.operation,
            field: self.path(field),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    crate::choice! {
        enum Mode {
            Fast => "fast",
            Slow => "slow",
        }
    }

    fn params(value: Value) -> RawParams {
        match value {
            Value::Object(map) => RawParams::new(OperationKind::EffectsAndEnhancement, map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn intersect_drops_unknown_keys() {
        let raw = json!({"blur": 10, "sepia": true});
        let Value::Object(map) = raw else { unreachable!() };
        let params = RawParams::intersect(OperationKind::EffectsAndEnhancement, &map, &["blur"]);
        assert!(params.contains("blur"));
        assert!(!params.contains("sepia"));
    }

    #[test]
    fn null_counts_as_absent() {
        let p = params(json!({"blur": null}));
        assert!(p.is_empty());
        assert_eq!(p.integer_in("blur", 1..=100).unwrap(), None);
    }

    #[test]
    fn ranges_and_types_are_strict() {
        let p = params(json!({"blur": 101, "flag": "yes", "mode": "FAST"}));
        assert!(matches!(p.integer_in("blur", 1..=100), Err(ValidationError::OutOfRange { .. })));
        assert!(matches!(p.bool("flag"), Err(ValidationError::InvalidType { .. })));
        assert_eq!(p.choice::<Mode>("mode").unwrap(), Some(Mode::Fast));
    }

    #[test]
    fn nested_paths_are_dotted() {
        let p = params(json!({"shadow": {"blur": 99}}));
        let Some(Toggle::Configured(shadow)) = p.toggle("shadow").unwrap() else {
            panic!("expected configured shadow");
        };
        let err = shadow.integer_in("blur", 0..=15).unwrap_err();
        assert_eq!(err.field(), "shadow.blur");
    }
}
