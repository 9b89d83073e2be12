//! Color values

use crate::error::GrammarError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#?([0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$").expect("hex color regex must compile")
});

static NAMED_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{3,20}$").expect("named color regex must compile"));

/// Validated color
///
/// Hex colors (`RRGGBB` or `RRGGBBAA`) are normalized to upper case without a
/// leading `#`; named colors are kept lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Color(String);

impl Color {
    /// Parse a color from text
    pub fn parse(raw: &str) -> Result<Self, GrammarError> {
        let trimmed = raw.trim();
        if let Some(caps) = HEX_COLOR.captures(trimmed) {
            return Ok(Self(caps[1].to_ascii_uppercase()));
        }
        if NAMED_COLOR.is_match(trimmed) {
            return Ok(Self(trimmed.to_ascii_lowercase()));
        }
        Err(GrammarError::InvalidColor(raw.to_string()))
    }

    /// Convert a JSON string into a color
    pub fn from_json(value: &serde_json::Value) -> Result<Self, GrammarError> {
        match value {
            serde_json::Value::String(s) => Self::parse(s),
            other => Err(GrammarError::unexpected("color string", other)),
        }
    }

    /// Normalized text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the color carries an alpha channel
    #[inline]
    #[must_use]
    pub fn has_alpha(&self) -> bool {
        self.0.len() == 8 && self.0.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
