//! Validated directives: ordered short-key mappings
//!
//! A [`Directive`] is one atomic transformation unit in the delivery
//! service's short-key grammar. Key order is significant and preserved.

use crate::background::Background;
use crate::color::Color;
use crate::scalar::Scalar;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Value stored under a short key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DirectiveValue {
    /// Flag such as `e-grayscale`
    Bool(bool),
    /// Plain integer such as an opacity
    Integer(i64),
    /// Rendered text: scalars, enumerations, composite effect tokens
    Text(String),
    /// Nested layer owned by an overlay
    Layer(Box<Directive>),
}

impl DirectiveValue {
    /// Borrow the text payload
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the nested layer
    #[inline]
    #[must_use]
    pub fn as_layer(&self) -> Option<&Directive> {
        match self {
            Self::Layer(layer) => Some(layer),
            _ => None,
        }
    }
}

impl From<bool> for DirectiveValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for DirectiveValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u8> for DirectiveValue {
    fn from(value: u8) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for DirectiveValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for DirectiveValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DirectiveValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&Scalar> for DirectiveValue {
    fn from(value: &Scalar) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<&Color> for DirectiveValue {
    fn from(value: &Color) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<&Background> for DirectiveValue {
    fn from(value: &Background) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Directive> for DirectiveValue {
    fn from(value: Directive) -> Self {
        Self::Layer(Box::new(value))
    }
}

/// Ordered short-key to value mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Directive {
    entries: IndexMap<String, DirectiveValue>,
}

impl Directive {
    /// Create an empty directive
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<DirectiveValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a key, keeping its original position on replace
    #[inline]
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DirectiveValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Insert when a value is present
    #[inline]
    pub fn insert_opt<V: Into<DirectiveValue>>(&mut self, key: &str, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    /// Look up a key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&DirectiveValue> {
        self.entries.get(key)
    }

    /// Whether the key is present
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DirectiveValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directive has no keys
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the directive describes an overlay layer
    #[inline]
    #[must_use]
    pub fn is_layer(&self) -> bool {
        self.entries.contains_key(LAYER_KEY)
    }
}

impl FromIterator<(String, DirectiveValue)> for Directive {
    fn from_iter<I: IntoIterator<Item = (String, DirectiveValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Directive {
    type Item = (&'a String, &'a DirectiveValue);
    type IntoIter = indexmap::map::Iter<'a, String, DirectiveValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Key naming the layer type of an overlay directive
pub const LAYER_KEY: &str = "l";

/// Key holding an overlay's nested child layer
pub const CHILD_LAYER_KEY: &str = "overlay";

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn serializes_in_insertion_order() {
        let directive = Directive::new()
            .with("w", &Scalar::Integer(300))
            .with("cm", "extract")
            .with("e-grayscale", true)
            .with("o", 50_i64);
        let rendered = serde_json::to_string(&directive).unwrap();
        assert_eq!(rendered, r#"{"w":"300","cm":"extract","e-grayscale":true,"o":50}"#);
    }

    #[test]
    fn nested_layer_serializes_inline() {
        let child = Directive::new().with(LAYER_KEY, "image").with("i", "b.png");
        let parent = Directive::new()
            .with(LAYER_KEY, "image")
            .with("i", "a.png")
            .with(CHILD_LAYER_KEY, child);
        assert!(parent.is_layer());
        assert_eq!(
            serde_json::to_value(&parent).unwrap(),
            json!({"l": "image", "i": "a.png", "overlay": {"l": "image", "i": "b.png"}})
        );
    }

    #[test]
    fn replace_keeps_position() {
        let mut directive = Directive::new().with("w", "1").with("h", "2");
        directive.insert("w", "3");
        assert_eq!(directive.keys().collect::<Vec<_>>(), vec!["w", "h"]);
    }
}
