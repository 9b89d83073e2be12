//! Sub-effects shared by image layers and the effects operation
//!
//! Each sub-effect is read from its own nested object and rendered as one
//! composite token, e.g. `{"blur": 12, "y_offset": -4}` becomes
//! `bl-12_y-N4` under the `e-shadow` key.

use crate::error::ValidationError;
use crate::params::{RawParams, Toggle};
use serde_json::Value;
use std::fmt;
use xform_grammar::{Color, DirectiveValue, Scalar};

/// Short key of the sharpen effect
pub const SHARPEN_KEY: &str = "e-sharpen";
/// Short key of the unsharp mask effect
pub const USM_KEY: &str = "e-usm";
/// Short key of the shadow effect
pub const SHADOW_KEY: &str = "e-shadow";
/// Short key of the gradient effect
pub const GRADIENT_KEY: &str = "e-gradient";
/// Short key of the distort effect
pub const DISTORT_KEY: &str = "e-distort";
/// Short key of the contrast stretch effect
pub const CONTRAST_KEY: &str = "e-contrast";
/// Short key of the grayscale effect
pub const GRAYSCALE_KEY: &str = "e-grayscale";

/// Sharpening
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sharpen {
    /// Service default strength
    Default,
    /// Explicit strength
    Amount(u32),
}

impl Sharpen {
    /// Read `true` or a non-negative integer; `false` counts as absent
    pub fn read(params: &RawParams, field: &str) -> Result<Option<Self>, ValidationError> {
        match params.raw(field) {
            None | Some(Value::Bool(false)) => Ok(None),
            Some(Value::Bool(true)) => Ok(Some(Self::Default)),
            Some(_) => {
                let amount = params.integer_in(field, 0..=i64::from(u32::MAX))?;
                Ok(amount.and_then(|a| u32::try_from(a).ok()).map(Self::Amount))
            }
        }
    }
}

impl From<Sharpen> for DirectiveValue {
    fn from(value: Sharpen) -> Self {
        match value {
            Sharpen::Default => Self::Bool(true),
            Sharpen::Amount(amount) => Self::from(amount),
        }
    }
}

/// Unsharp mask
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsharpMask {
    /// Gaussian radius
    pub radius: f64,
    /// Gaussian sigma
    pub sigma: f64,
    /// Difference multiplier
    pub amount: f64,
    /// Difference threshold
    pub threshold: f64,
}

impl UnsharpMask {
    /// Read `{radius, sigma, amount, threshold}`, all required and greater than 0
    pub fn read(params: &RawParams, field: &str) -> Result<Option<Self>, ValidationError> {
        let Some(usm) = params.nested(field)? else {
            return Ok(None);
        };
        let required = |name: &str| -> Result<f64, ValidationError> {
            usm.positive_number(name)?.ok_or_else(|| usm.missing(name))
        };
        Ok(Some(Self {
            radius: required("radius")?,
            sigma: required("sigma")?,
            amount: required("amount")?,
            threshold: required("threshold")?,
        }))
    }
}

impl fmt::Display for UnsharpMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.radius, self.sigma, self.amount, self.threshold
        )
    }
}

/// Drop shadow under a non-transparent image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shadow {
    /// Blur, 0-15
    pub blur: Option<i64>,
    /// Saturation, 0-100
    pub saturation: Option<i64>,
    /// Horizontal offset
    pub x_offset: Option<Scalar>,
    /// Vertical offset
    pub y_offset: Option<Scalar>,
}

impl Shadow {
    /// Read `true` or `{blur, saturation, x_offset, y_offset}`
    pub fn read(params: &RawParams, field: &str) -> Result<Option<Self>, ValidationError> {
        match params.toggle(field)? {
            None => Ok(None),
            Some(Toggle::Enabled) => Ok(Some(Self::default())),
            Some(Toggle::Configured(shadow)) => Ok(Some(Self {
                blur: shadow.integer_in("blur", 0..=15)?,
                saturation: shadow.integer_in("saturation", 0..=100)?,
                x_offset: shadow.scalar("x_offset")?,
                y_offset: shadow.scalar("y_offset")?,
            })),
        }
    }

    fn tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        if let Some(blur) = self.blur {
            tokens.push(format!("bl-{blur}"));
        }
        if let Some(saturation) = self.saturation {
            tokens.push(format!("st-{saturation}"));
        }
        if let Some(x) = &self.x_offset {
            tokens.push(format!("x-{x}"));
        }
        if let Some(y) = &self.y_offset {
            tokens.push(format!("y-{y}"));
        }
        tokens
    }
}

impl From<&Shadow> for DirectiveValue {
    fn from(value: &Shadow) -> Self {
        composite(value.tokens())
    }
}

/// Direction of a linear gradient
#[derive(Debug, Clone, PartialEq)]
pub enum GradientDirection {
    /// Angle in degrees, 0-360
    Degrees(i64),
    /// Side or corner keyword
    Named(&'static str),
}

const GRADIENT_SIDES: &[&str] = &[
    "top",
    "bottom",
    "left",
    "right",
    "top_left",
    "top_right",
    "bottom_left",
    "bottom_right",
];

/// Linear gradient overlay
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gradient {
    /// Direction
    pub direction: Option<GradientDirection>,
    /// Start color
    pub from: Option<Color>,
    /// End color
    pub to: Option<Color>,
    /// Stop point
    pub stop_point: Option<Scalar>,
}

impl Gradient {
    /// Read `true` or `{linear_direction, from_color, to_color, stop_point}`
    pub fn read(params: &RawParams, field: &str) -> Result<Option<Self>, ValidationError> {
        let gradient = match params.toggle(field)? {
            None => return Ok(None),
            Some(Toggle::Enabled) => return Ok(Some(Self::default())),
            Some(Toggle::Configured(gradient)) => gradient,
        };

        let direction = match gradient.raw("linear_direction") {
            None => None,
            Some(Value::String(name)) => {
                let name = name.trim().to_ascii_lowercase();
                let side = GRADIENT_SIDES
                    .iter()
                    .copied()
                    .find(|side| *side == name)
                    .ok_or_else(|| gradient.not_allowed("linear_direction", &name, GRADIENT_SIDES))?;
                Some(GradientDirection::Named(side))
            }
            Some(_) => gradient
                .integer_in("linear_direction", 0..=360)?
                .map(GradientDirection::Degrees),
        };

        Ok(Some(Self {
            direction,
            from: gradient.color("from_color")?,
            to: gradient.color("to_color")?,
            stop_point: gradient.positive_scalar("stop_point")?,
        }))
    }

    fn tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        match &self.direction {
            Some(GradientDirection::Degrees(deg)) => tokens.push(format!("ld-{deg}")),
            Some(GradientDirection::Named(side)) => tokens.push(format!("ld-{side}")),
            None => {}
        }
        if let Some(from) = &self.from {
            tokens.push(format!("from-{from}"));
        }
        if let Some(to) = &self.to {
            tokens.push(format!("to-{to}"));
        }
        if let Some(sp) = &self.stop_point {
            tokens.push(format!("sp-{sp}"));
        }
        tokens
    }
}

impl From<&Gradient> for DirectiveValue {
    fn from(value: &Gradient) -> Self {
        composite(value.tokens())
    }
}

/// Geometric distortion
#[derive(Debug, Clone, PartialEq)]
pub enum Distort {
    /// Four corner points, clockwise from top left
    Perspective([Scalar; 8]),
    /// Arc bend in degrees
    Arc(Scalar),
}

const CORNER_FIELDS: [&str; 8] = ["x1", "y1", "x2", "y2", "x3", "y3", "x4", "y4"];

impl Distort {
    /// Read a perspective object `{x1, y1, .., x4, y4}`
    pub fn read_perspective(params: &RawParams, field: &str) -> Result<Option<Self>, ValidationError> {
        let Some(corners) = params.nested(field)? else {
            return Ok(None);
        };
        Self::perspective_from(&corners).map(Some)
    }

    /// Read an arc object `{degrees}` (also accepts `arc_degree`)
    pub fn read_arc(params: &RawParams, field: &str) -> Result<Option<Self>, ValidationError> {
        let Some(arc) = params.nested(field)? else {
            return Ok(None);
        };
        Self::arc_from(&arc).map(Some)
    }

    /// Read a tagged object `{"type": "perspective" | "arc", ..}`
    pub fn read_tagged(params: &RawParams, field: &str) -> Result<Option<Self>, ValidationError> {
        let Some(distort) = params.nested(field)? else {
            return Ok(None);
        };
        match distort.required_string("type")?.as_str() {
            "perspective" => Self::perspective_from(&distort).map(Some),
            "arc" => Self::arc_from(&distort).map(Some),
            other => Err(distort.not_allowed("type", other, &["perspective", "arc"])),
        }
    }

    fn perspective_from(corners: &RawParams) -> Result<Self, ValidationError> {
        let mut points = Vec::with_capacity(CORNER_FIELDS.len());
        for name in CORNER_FIELDS {
            points.push(corners.scalar(name)?.ok_or_else(|| corners.missing(name))?);
        }
        let points: [Scalar; 8] = points
            .try_into()
            .map_err(|_| corners.missing("y4"))?;
        Ok(Self::Perspective(points))
    }

    fn arc_from(arc: &RawParams) -> Result<Self, ValidationError> {
        let field = if arc.contains("arc_degree") { "arc_degree" } else { "degrees" };
        let degrees = arc.scalar(field)?.ok_or_else(|| arc.missing("degrees"))?;
        if degrees.numeric_value() == Some(0.0) {
            return Err(arc.out_of_range(field, "arc must not be 0 degrees"));
        }
        Ok(Self::Arc(degrees))
    }
}

impl fmt::Display for Distort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Perspective(points) => {
                f.write_str("p-")?;
                for (i, point) in points.iter().enumerate() {
                    if i > 0 {
                        f.write_str("_")?;
                    }
                    write!(f, "{point}")?;
                }
                Ok(())
            }
            Self::Arc(degrees) => write!(f, "a-{degrees}"),
        }
    }
}

/// Join tokens with `_`, or a bare flag when there are none
fn composite(tokens: Vec<String>) -> DirectiveValue {
    if tokens.is_empty() {
        DirectiveValue::Bool(true)
    } else {
        DirectiveValue::Text(tokens.join("_"))
    }
}
