//! Background variants shared by every background-style field
//!
//! Accepted input forms:
//! - a color string (`"FF0000"`, `"red"`)
//! - a keyword string (`"dominant"`, `"blurred"`, `"blurred_25_N30"`,
//!   `"gradient_dominant_4"`)
//! - a tagged object (`{"type": "blurred", "intensity": 25, "brightness": -30}`)

use crate::color::Color;
use crate::error::GrammarError;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Brightness limit for blurred backgrounds
pub const MAX_BRIGHTNESS: i32 = 255;

/// Blur strength of a blurred background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlurIntensity {
    /// Let the service pick
    Auto,
    /// Explicit level, 0-100
    Level(u8),
}

impl fmt::Display for BlurIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Level(level) => write!(f, "{level}"),
        }
    }
}

/// Background fill
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Background {
    /// Solid color
    Solid(Color),
    /// Dominant color of the image
    Dominant,
    /// Blurred copy of the image
    Blurred {
        /// Blur strength
        intensity: Option<BlurIntensity>,
        /// Brightness shift, -255..=255; requires an intensity
        brightness: Option<i32>,
    },
    /// Gradient built from the dominant colors
    DominantGradient {
        /// Number of palette colors, 2 or 4
        palette_size: Option<u8>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BackgroundSpec {
    Solid {
        color: String,
    },
    Dominant,
    Blurred {
        #[serde(default, alias = "blur_intensity")]
        intensity: Option<serde_json::Value>,
        #[serde(default)]
        brightness: Option<i64>,
    },
    Gradient {
        #[serde(default)]
        mode: Option<String>,
        #[serde(default, alias = "pallete_size")]
        palette_size: Option<u8>,
    },
}

impl Background {
    /// Parse a background from its keyword or color text
    pub fn parse(raw: &str) -> Result<Self, GrammarError> {
        let text = raw.trim();
        let invalid = |reason: &str| GrammarError::InvalidBackground(format!("'{raw}': {reason}"));

        if text.eq_ignore_ascii_case("dominant") {
            return Ok(Self::Dominant);
        }

        if let Some(rest) = strip_keyword(text, "gradient_dominant") {
            let palette_size = match rest {
                None => None,
                Some(size) => Some(size.parse::<u8>().map_err(|_| invalid("palette size must be 2 or 4"))?),
            };
            return Self::gradient(palette_size).map_err(|reason| invalid(reason.as_str()));
        }

        if let Some(rest) = strip_keyword(text, "blurred") {
            let mut parts = rest.map(|r| r.split('_')).into_iter().flatten();
            let intensity = match parts.next() {
                None => None,
                Some("auto") => Some(BlurIntensity::Auto),
                Some(level) => Some(BlurIntensity::Level(
                    level.parse().map_err(|_| invalid("blur intensity must be 0-100 or auto"))?,
                )),
            };
            let brightness = match parts.next() {
                None => None,
                Some(token) => {
                    let value = match token.strip_prefix('N') {
                        Some(magnitude) => magnitude.parse::<i32>().map(|v| -v),
                        None => token.parse::<i32>(),
                    };
                    Some(value.map_err(|_| invalid("brightness must be an integer"))?)
                }
            };
            if parts.next().is_some() {
                return Err(invalid("too many segments"));
            }
            return Self::blurred(intensity, brightness).map_err(|reason| invalid(reason.as_str()));
        }

        Color::parse(text).map(Self::Solid)
    }

    /// Convert a JSON string or tagged object into a background
    pub fn from_json(value: &serde_json::Value) -> Result<Self, GrammarError> {
        match value {
            serde_json::Value::String(s) => Self::parse(s),
            serde_json::Value::Object(_) => {
                let spec: BackgroundSpec = serde_json::from_value(value.clone())
                    .map_err(|e| GrammarError::InvalidBackground(e.to_string()))?;
                Self::from_spec(spec)
            }
            other => Err(GrammarError::unexpected("background string or object", other)),
        }
    }

    fn from_spec(spec: BackgroundSpec) -> Result<Self, GrammarError> {
        match spec {
            BackgroundSpec::Solid { color } => Color::parse(&color).map(Self::Solid),
            BackgroundSpec::Dominant => Ok(Self::Dominant),
            BackgroundSpec::Blurred {
                intensity,
                brightness,
            } => {
                let intensity = match intensity {
                    None | Some(serde_json::Value::Null) => None,
                    Some(serde_json::Value::String(s)) if s == "auto" => Some(BlurIntensity::Auto),
                    Some(serde_json::Value::Number(n)) => Some(BlurIntensity::Level(
                        n.as_u64()
                            .and_then(|v| u8::try_from(v).ok())
                            .ok_or_else(|| {
                                GrammarError::InvalidBackground(format!(
                                    "blur intensity {n} must be 0-100"
                                ))
                            })?,
                    )),
                    Some(other) => {
                        return Err(GrammarError::unexpected("blur intensity or \"auto\"", &other))
                    }
                };
                let brightness = brightness
                    .map(|b| {
                        i32::try_from(b).map_err(|_| {
                            GrammarError::InvalidBackground(format!("brightness {b} out of range"))
                        })
                    })
                    .transpose()?;
                Self::blurred(intensity, brightness).map_err(GrammarError::InvalidBackground)
            }
            BackgroundSpec::Gradient { mode, palette_size } => {
                if let Some(mode) = mode.filter(|m| m != "dominant") {
                    return Err(GrammarError::InvalidBackground(format!(
                        "unsupported gradient mode '{mode}'"
                    )));
                }
                Self::gradient(palette_size).map_err(GrammarError::InvalidBackground)
            }
        }
    }

    fn blurred(intensity: Option<BlurIntensity>, brightness: Option<i32>) -> Result<Self, String> {
        if let Some(BlurIntensity::Level(level)) = intensity {
            if level > 100 {
                return Err(format!("blur intensity {level} must be 0-100"));
            }
        }
        if let Some(b) = brightness {
            if !(-MAX_BRIGHTNESS..=MAX_BRIGHTNESS).contains(&b) {
                return Err(format!("brightness {b} must be between -255 and 255"));
            }
            if intensity.is_none() {
                return Err("brightness requires a blur intensity".to_string());
            }
        }
        Ok(Self::Blurred {
            intensity,
            brightness,
        })
    }

    fn gradient(palette_size: Option<u8>) -> Result<Self, String> {
        match palette_size {
            None | Some(2 | 4) => Ok(Self::DominantGradient { palette_size }),
            Some(other) => Err(format!("palette size {other} must be 2 or 4")),
        }
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solid(color) => write!(f, "{color}"),
            Self::Dominant => f.write_str("dominant"),
            Self::Blurred {
                intensity,
                brightness,
            } => {
                f.write_str("blurred")?;
                if let Some(intensity) = intensity {
                    write!(f, "_{intensity}")?;
                }
                match brightness {
                    Some(b) if *b < 0 => write!(f, "_N{}", b.unsigned_abs()),
                    Some(b) => write!(f, "_{b}"),
                    None => Ok(()),
                }
            }
            Self::DominantGradient { palette_size } => {
                f.write_str("gradient_dominant")?;
                match palette_size {
                    Some(size) => write!(f, "_{size}"),
                    None => Ok(()),
                }
            }
        }
    }
}

impl Serialize for Background {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Match `keyword` or `keyword_<rest>`, returning the optional rest
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<Option<&'a str>> {
    let rest = text.strip_prefix(keyword)?;
    if rest.is_empty() {
        Some(None)
    } else {
        rest.strip_prefix('_').map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keyword_forms_round_trip() {
        for text in [
            "dominant",
            "blurred",
            "blurred_auto",
            "blurred_25_N30",
            "blurred_auto_40",
            "gradient_dominant",
            "gradient_dominant_4",
            "FF0000",
        ] {
            assert_eq!(Background::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn object_forms() {
        let bg = Background::from_json(&json!({"type": "blurred", "blur_intensity": 10, "brightness": -5}))
            .unwrap();
        assert_eq!(bg.to_string(), "blurred_10_N5");

        let bg = Background::from_json(&json!({"type": "gradient", "mode": "dominant", "pallete_size": 2}))
            .unwrap();
        assert_eq!(bg.to_string(), "gradient_dominant_2");
    }

    #[test]
    fn out_of_range_rejected() {
        assert!(Background::parse("blurred_101").is_err());
        assert!(Background::parse("blurred_10_300").is_err());
        assert!(Background::parse("gradient_dominant_3").is_err());
        assert!(Background::from_json(&json!({"type": "blurred", "brightness": 10})).is_err());
        assert!(Background::from_json(&json!(12)).is_err());
    }
}
