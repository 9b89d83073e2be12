//! Small value types shared by several operations

use crate::error::ValidationError;
use crate::params::RawParams;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use xform_grammar::{Color, DirectiveValue, Scalar};

static PADDING_SHORTHAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[1-9][0-9]*(?:_[1-9][0-9]*){0,3}$").expect("padding regex must compile")
});

crate::choice! {
    /// Mirror direction
    pub enum Flip {
        Horizontal => "h",
        Vertical => "v",
        Both => "h_v",
    }
}

impl Flip {
    /// Read a flip field, accepting `v_h` as a spelling of `h_v`
    pub fn read(params: &RawParams, field: &str) -> Result<Option<Self>, ValidationError> {
        if params.string(field)?.as_deref() == Some("v_h") {
            return Ok(Some(Self::Both));
        }
        params.choice(field)
    }
}

/// Corner radius
#[derive(Debug, Clone, PartialEq)]
pub enum Radius {
    /// Fully rounded
    Max,
    /// Explicit radius
    Value(Scalar),
}

impl Radius {
    /// Read a radius field: non-negative scalar or `max`
    pub fn read(params: &RawParams, field: &str) -> Result<Option<Self>, ValidationError> {
        if params.string(field).ok().flatten().as_deref() == Some("max") {
            return Ok(Some(Self::Max));
        }
        Ok(params.non_negative_scalar(field)?.map(Self::Value))
    }
}

impl fmt::Display for Radius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Max => f.write_str("max"),
            Self::Value(scalar) => write!(f, "{scalar}"),
        }
    }
}

/// Rotation angle
#[derive(Debug, Clone, PartialEq)]
pub enum Rotation {
    /// Rotate according to EXIF orientation
    Auto,
    /// Explicit degrees; negative means counter-clockwise
    Degrees(Scalar),
}

impl Rotation {
    /// Read a rotation field; `allow_auto` enables the `auto` keyword
    pub fn read(
        params: &RawParams,
        field: &str,
        allow_auto: bool,
    ) -> Result<Option<Self>, ValidationError> {
        if allow_auto && params.string(field).ok().flatten().as_deref() == Some("auto") {
            return Ok(Some(Self::Auto));
        }
        Ok(params.scalar(field)?.map(Self::Degrees))
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Degrees(scalar) => write!(f, "{scalar}"),
        }
    }
}

/// Device pixel ratio
#[derive(Debug, Clone, PartialEq)]
pub enum Dpr {
    /// Derived from client hints
    Auto,
    /// Explicit ratio
    Ratio(Scalar),
}

impl Dpr {
    /// Read a positive ratio or `auto`
    pub fn read(params: &RawParams, field: &str) -> Result<Option<Self>, ValidationError> {
        if params.string(field).ok().flatten().as_deref() == Some("auto") {
            return Ok(Some(Self::Auto));
        }
        Ok(params.positive_scalar(field)?.map(Self::Ratio))
    }
}

impl fmt::Display for Dpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Ratio(scalar) => write!(f, "{scalar}"),
        }
    }
}

/// Edge trimming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trim {
    /// Trim with the default threshold
    Default,
    /// Trim with an explicit threshold, 1-99
    Threshold(u8),
}

impl Trim {
    /// Read `true` or a threshold; `false` counts as absent
    pub fn read(params: &RawParams, field: &str) -> Result<Option<Self>, ValidationError> {
        match params.raw(field) {
            None | Some(Value::Bool(false)) => Ok(None),
            Some(Value::Bool(true)) => Ok(Some(Self::Default)),
            Some(_) => {
                let threshold = params.integer_in(field, 1..=99)?;
                Ok(threshold.and_then(|t| u8::try_from(t).ok()).map(Self::Threshold))
            }
        }
    }
}

impl From<Trim> for DirectiveValue {
    fn from(value: Trim) -> Self {
        match value {
            Trim::Default => Self::Bool(true),
            Trim::Threshold(t) => Self::from(t),
        }
    }
}

/// Border around the image or layer
#[derive(Debug, Clone, PartialEq)]
pub struct Border {
    /// Border width
    pub width: Scalar,
    /// Border color
    pub color: Color,
}

impl Border {
    /// Read `{"border_width": .., "color": ..}` or the `"{width}_{color}"` shorthand
    pub fn read(params: &RawParams, field: &str) -> Result<Option<Self>, ValidationError> {
        match params.raw(field) {
            None => Ok(None),
            Some(Value::String(text)) => {
                let (width, color) = text
                    .rsplit_once('_')
                    .ok_or_else(|| params.out_of_range(field, "expected '{width}_{color}'"))?;
                let width = Scalar::parse(width).map_err(|e| params.grammar(field, e))?;
                let color = Color::parse(color).map_err(|e| params.grammar(field, e))?;
                Self::checked(params, field, width, color).map(Some)
            }
            Some(Value::Object(_)) => {
                let Some(nested) = params.nested(field)? else {
                    return Ok(None);
                };
                let width_field = if nested.contains("border_width") { "border_width" } else { "width" };
                let width = nested.scalar(width_field)?.ok_or_else(|| nested.missing("border_width"))?;
                let color = nested.color("color")?.ok_or_else(|| nested.missing("color"))?;
                Self::checked(&nested, width_field, width, color).map(Some)
            }
            Some(other) => Err(params.invalid_type(field, "border string or object", other)),
        }
    }

    fn checked(
        params: &RawParams,
        field: &str,
        width: Scalar,
        color: Color,
    ) -> Result<Self, ValidationError> {
        if width.is_positive_or_symbolic() {
            Ok(Self { width, color })
        } else {
            Err(params.out_of_range(field, "border width must be greater than 0"))
        }
    }
}

impl fmt::Display for Border {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.width, self.color)
    }
}

/// Read a padding field: positive integer, expression, or 1-4 underscore-separated sides
pub fn read_padding(params: &RawParams, field: &str) -> Result<Option<String>, ValidationError> {
    match params.raw(field) {
        None => Ok(None),
        Some(Value::Number(_)) => {
            let padding = params.integer_in(field, 1..=i64::MAX)?;
            Ok(padding.map(|p| p.to_string()))
        }
        Some(Value::String(text)) => {
            let text = text.trim();
            if PADDING_SHORTHAND.is_match(text) {
                return Ok(Some(text.to_string()));
            }
            match Scalar::parse(text) {
                Ok(scalar @ Scalar::Expression(_)) if scalar.is_positive_or_symbolic() => Ok(Some(scalar.to_string())),
                _ => Err(params.out_of_range(
                    field,
                    "expected a positive integer, an expression, or 1-4 underscore-separated sides",
                )),
            }
        }
        Some(other) => Err(params.invalid_type(field, "integer or string", other)),
    }
}
