//! Text layers

use crate::error::{OperationError, ValidationError};
use crate::font::{Font, FontCatalog};
use crate::kind::OperationKind;
use crate::params::RawParams;
use crate::values::{read_padding, Flip, Radius, Rotation};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use xform_grammar::{Background, Color, Directive, Scalar, LAYER_KEY};

/// Accepted raw fields
pub const FIELDS: &[&str] = &[
    "text",
    "layer_x",
    "layer_y",
    "width",
    "font_size",
    "font_family",
    "color",
    "inner_alignment",
    "padding",
    "alpha",
    "typography",
    "background",
    "corner_radius",
    "rotation",
    "flip",
    "line_height",
    "layer_mode",
];

/// Longest text the service accepts verbatim
pub const MAX_PLAIN_TEXT: usize = 2000;
/// Longest base64 text the service accepts
pub const MAX_ENCODED_TEXT: usize = 2500;

crate::choice! {
    /// Alignment inside the text box
    pub enum InnerAlignment {
        Left => "left",
        Center => "center",
        Right => "right",
    }
}

crate::choice! {
    /// Font style combination
    pub enum Typography {
        Bold => "b",
        Italic => "i",
        Strikethrough => "strikethrough",
        BoldItalic => "b_i",
        BoldStrikethrough => "b_strikethrough",
        ItalicStrikethrough => "i_strikethrough",
        BoldItalicStrikethrough => "b_i_strikethrough",
    }
}

crate::choice! {
    /// Blending of a text layer
    pub enum TextLayerMode {
        Multiply => "multiply",
        Cutout => "cutout",
        Cutter => "cutter",
    }
}

/// Layer text and its wire form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerText {
    /// Sent verbatim under `i`
    Plain(String),
    /// Sent base64-encoded under `ie`
    Encoded(String),
}

impl LayerText {
    fn is_plain(text: &str) -> bool {
        text.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '-' | '_'))
    }

    fn classify(params: &RawParams, text: String) -> Result<Self, ValidationError> {
        if Self::is_plain(&text) {
            if text.chars().count() > MAX_PLAIN_TEXT {
                return Err(params.out_of_range("text", format!("at most {MAX_PLAIN_TEXT} characters")));
            }
            return Ok(Self::Plain(text));
        }
        let encoded = STANDARD.encode(text.as_bytes());
        if encoded.len() > MAX_ENCODED_TEXT {
            return Err(params.out_of_range(
                "text",
                format!("encoded form must be at most {MAX_ENCODED_TEXT} characters"),
            ));
        }
        Ok(Self::Encoded(encoded))
    }

    fn entry(&self) -> (&'static str, &str) {
        match self {
            Self::Plain(text) => ("i", text),
            Self::Encoded(text) => ("ie", text),
        }
    }
}

/// Validated text layer
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    pub text: LayerText,
    pub x_position: Option<Scalar>,
    pub y_position: Option<Scalar>,
    pub width: Option<Scalar>,
    pub font_size: Option<Scalar>,
    pub font: Option<Font>,
    pub color: Option<Color>,
    pub alignment: Option<InnerAlignment>,
    pub padding: Option<String>,
    pub alpha: Option<i64>,
    pub typography: Option<Typography>,
    pub background: Option<Background>,
    pub radius: Option<Radius>,
    pub rotation: Option<Rotation>,
    pub flip: Option<Flip>,
    pub line_height: Option<Scalar>,
    pub layer_mode: Option<TextLayerMode>,
}

impl TextOverlay {
    /// Validate a raw parameter set; custom fonts still need [`Self::verify_font`]
    pub fn validate(params: &RawParams) -> Result<Self, ValidationError> {
        let text = params.required_text("text")?;
        let font = match params.string("font_family")? {
            None => None,
            Some(name) => Some(Font::parse(&name).ok_or_else(|| {
                params.out_of_range(
                    "font_family",
                    format!("'{name}' is neither a built-in font nor a .ttf/.otf/.woff/.woff2 path"),
                )
            })?),
        };

        Ok(Self {
            text: LayerText::classify(params, text)?,
            x_position: params.scalar("layer_x")?,
            y_position: params.scalar("layer_y")?,
            width: params.positive_scalar("width")?,
            font_size: params.positive_scalar("font_size")?,
            font,
            color: params.color("color")?,
            alignment: params.choice("inner_alignment")?,
            padding: read_padding(params, "padding")?,
            alpha: params.integer_in("alpha", 1..=9)?,
            typography: params.choice("typography")?,
            background: params.background("background")?,
            radius: Radius::read(params, "corner_radius")?,
            rotation: Rotation::read(params, "rotation", false)?,
            flip: Flip::read(params, "flip")?,
            line_height: params.positive_scalar("line_height")?,
            layer_mode: params.choice("layer_mode")?,
        })
    }

    /// Confirm a custom font exists with the font service
    pub async fn verify_font(&self, fonts: &dyn FontCatalog) -> Result<(), OperationError> {
        let Some(Font::Custom(path)) = &self.font else {
            return Ok(());
        };
        let exists = fonts
            .font_exists(path)
            .await
            .map_err(|source| OperationError::FontLookup {
                operation: OperationKind::TextOverlay,
                source,
            })?;
        if exists {
            tracing::debug!(font = %path, "custom font found");
            Ok(())
        } else {
            Err(ValidationError::FontNotFound {
                operation: OperationKind::TextOverlay,
                path: path.clone(),
            }
            .into())
        }
    }

    /// Render the layer
    #[must_use]
    pub fn to_directive(&self) -> Directive {
        let (text_key, text) = self.text.entry();
        let mut d = Directive::new().with(LAYER_KEY, "text").with(text_key, text);

        d.insert_opt("lx", self.x_position.as_ref());
        d.insert_opt("ly", self.y_position.as_ref());
        d.insert_opt("w", self.width.as_ref());
        d.insert_opt("fs", self.font_size.as_ref());
        d.insert_opt("ff", self.font.as_ref().map(ToString::to_string));
        d.insert_opt("co", self.color.as_ref());
        d.insert_opt("ia", self.alignment.map(|a| a.to_string()));
        d.insert_opt("pa", self.padding.clone());
        d.insert_opt("al", self.alpha);
        d.insert_opt("tg", self.typography.map(|t| t.to_string()));
        d.insert_opt("bg", self.background.as_ref());
        d.insert_opt("r", self.radius.as_ref().map(ToString::to_string));
        d.insert_opt("rt", self.rotation.as_ref().map(ToString::to_string));
        d.insert_opt("fl", self.flip.map(|f| f.to_string()));
        d.insert_opt("lh", self.line_height.as_ref());
        d.insert_opt("lm", self.layer_mode.map(|m| m.to_string()));
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{FontLookupError, MockFontCatalog};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn validate(value: Value) -> Result<TextOverlay, ValidationError> {
        let Value::Object(map) = value else { unreachable!() };
        let params = RawParams::intersect(OperationKind::TextOverlay, &map, FIELDS);
        TextOverlay::validate(&params)
    }

    fn rendered(value: Value) -> Value {
        serde_json::to_value(validate(value).unwrap().to_directive()).unwrap()
    }

    #[test]
    fn plain_and_encoded_text() {
        assert_eq!(
            rendered(json!({"text": "SALE_50-off@now"})),
            json!({"l": "text", "i": "SALE_50-off@now"})
        );
        assert_eq!(
            rendered(json!({"text": "Hello World"})),
            json!({"l": "text", "ie": "SGVsbG8gV29ybGQ="})
        );
    }

    #[test]
    fn text_length_limits() {
        assert!(validate(json!({"text": "a".repeat(MAX_PLAIN_TEXT)})).is_ok());
        assert!(validate(json!({"text": "a".repeat(MAX_PLAIN_TEXT + 1)})).is_err());
        // 1875 bytes encode to exactly 2500 characters
        assert!(validate(json!({"text": "~".repeat(1875)})).is_ok());
        assert!(validate(json!({"text": "~".repeat(1876)})).is_err());
    }

    #[test]
    fn surrounding_spaces_are_kept() {
        // "  Hi  " in base64
        assert_eq!(rendered(json!({"text": "  Hi  "}))["ie"], "ICBIaSAg");
    }

    #[test]
    fn fields_map_to_short_keys() {
        assert_eq!(
            rendered(json!({
                "text": "Hi",
                "layer_x": -20,
                "font_size": 48,
                "font_family": "lato",
                "color": "#ffffff",
                "padding": "10_20",
                "alpha": 5,
                "typography": "b_i",
                "corner_radius": "max",
                "rotation": -15,
                "layer_mode": "cutter"
            })),
            json!({
                "l": "text", "i": "Hi", "lx": "N20", "fs": "48", "ff": "Lato", "co": "FFFFFF",
                "pa": "10_20", "al": 5, "tg": "b_i", "r": "max", "rt": "N15", "lm": "cutter"
            })
        );
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(validate(json!({"text": "x", "alpha": 10})).is_err());
        assert!(validate(json!({"text": "x", "typography": "underline"})).is_err());
        assert!(validate(json!({"text": "x", "font_family": "Comic Sans"})).is_err());
        assert!(validate(json!({"text": "x", "layer_mode": "displace"})).is_err());
        assert_eq!(validate(json!({"text": "  "})).unwrap_err().field(), "text");
    }

    #[tokio::test]
    async fn custom_font_is_checked() {
        let overlay = validate(json!({"text": "x", "font_family": "fonts@@Brand.ttf"})).unwrap();
        let mut fonts = MockFontCatalog::new();
        fonts
            .expect_font_exists()
            .withf(|path| path == "fonts/Brand.ttf")
            .times(1)
            .returning(|_| Ok(true));
        overlay.verify_font(&fonts).await.unwrap();
        assert_eq!(rendered(json!({"text": "x", "font_family": "/fonts/Brand.ttf"}))["ff"], "fonts@@Brand.ttf");
    }

    #[tokio::test]
    async fn missing_font_and_lookup_failure() {
        let overlay = validate(json!({"text": "x", "font_family": "fonts/Missing.otf"})).unwrap();

        let mut absent = MockFontCatalog::new();
        absent.expect_font_exists().returning(|_| Ok(false));
        let err = overlay.verify_font(&absent).await.unwrap_err();
        assert!(matches!(err, OperationError::Invalid(ValidationError::FontNotFound { .. })));

        let mut down = MockFontCatalog::new();
        down.expect_font_exists()
            .returning(|_| Err(FontLookupError::new("timeout")));
        let err = overlay.verify_font(&down).await.unwrap_err();
        assert!(err.is_collaborator_failure());
    }

    #[tokio::test]
    async fn builtin_font_skips_lookup() {
        let overlay = validate(json!({"text": "x", "font_family": "Roboto"})).unwrap();
        let fonts = MockFontCatalog::new();
        overlay.verify_font(&fonts).await.unwrap();
    }
}
