//! Font selection for text layers
//!
//! A font is either one of the service's built-in families or a custom
//! font file previously uploaded to the media library. Custom paths are
//! checked against a [`FontCatalog`] before they are accepted.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Built-in font families
pub const BUILTIN_FONTS: &[&str] = &[
    "AbrilFatFace",
    "Amaranth",
    "Arvo",
    "Audiowide",
    "Chivo",
    "Crimson Text",
    "exo",
    "Fredoka One",
    "Gravitas One",
    "Kanit",
    "Lato",
    "Lobster",
    "Lora",
    "Monoton",
    "Montserrat",
    "PT Mono",
    "PT_Serif",
    "Open Sans",
    "Roboto",
    "Old Standard",
    "Ubuntu",
    "Vollkorn",
];

/// Path separator used by the delivery grammar inside layer parameters
pub const PATH_SEPARATOR: &str = "@@";

static FONT_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^/?(?:[A-Za-z0-9._-]+/)*[A-Za-z0-9._-]+\.(?:ttf|otf|woff|woff2)$")
        .expect("font file regex must compile")
});

/// Transport-level failure of the font service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("font service unavailable: {message}")]
pub struct FontLookupError {
    /// Transport diagnostic
    pub message: String,
}

impl FontLookupError {
    /// Create a lookup error
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Font-existence collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FontCatalog: Send + Sync {
    /// Whether a custom font file exists at `path` (slash-separated, no leading slash)
    async fn font_exists(&self, path: &str) -> Result<bool, FontLookupError>;
}

/// Validated font reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Font {
    /// Built-in family, canonical spelling
    Builtin(&'static str),
    /// Custom font file, slash-separated without a leading slash
    Custom(String),
}

impl Font {
    /// Classify a font name; `None` when it is neither built in nor a font path
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if let Some(builtin) = BUILTIN_FONTS
            .iter()
            .copied()
            .find(|name| name.eq_ignore_ascii_case(trimmed))
        {
            return Some(Self::Builtin(builtin));
        }

        let slashed = trimmed.replace(PATH_SEPARATOR, "/");
        let traverses = slashed.split('/').any(|segment| segment == ".." || segment == ".");
        if FONT_FILE.is_match(&slashed) && !traverses {
            return Some(Self::Custom(slashed.trim_start_matches('/').to_string()));
        }
        None
    }

    /// Whether the font needs an existence check
    #[inline]
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for Font {
    /// Delivery form: built-in name or `@@`-separated path
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(name) => f.write_str(name),
            Self::Custom(path) => f.write_str(&path.replace('/', PATH_SEPARATOR)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_is_case_insensitive() {
        assert_eq!(Font::parse("open sans"), Some(Font::Builtin("Open Sans")));
    }

    #[test]
    fn custom_paths_normalize() {
        let font = Font::parse("/fonts/Poppins-Bold.TTF").unwrap();
        assert_eq!(font, Font::Custom("fonts/Poppins-Bold.TTF".to_string()));
        assert_eq!(font.to_string(), "fonts@@Poppins-Bold.TTF");
        assert_eq!(Font::parse("fonts@@Poppins.woff2"), Some(Font::Custom("fonts/Poppins.woff2".to_string())));
    }

    #[test]
    fn unknown_fonts_rejected() {
        assert_eq!(Font::parse("Comic Sans"), None);
        assert_eq!(Font::parse("fonts/evil.exe"), None);
        assert_eq!(Font::parse("../fonts/x.ttf"), None);
    }
}
