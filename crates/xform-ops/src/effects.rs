//! Effects and enhancements on the base image
//!
//! All requested effects of one step are rendered into a single directive.

use crate::effect::{
    Distort, Gradient, Sharpen, Shadow, UnsharpMask, CONTRAST_KEY, DISTORT_KEY, GRADIENT_KEY,
    GRAYSCALE_KEY, SHADOW_KEY, SHARPEN_KEY, USM_KEY,
};
use crate::error::ValidationError;
use crate::params::RawParams;
use crate::values::{Border, Flip, Radius, Rotation, Trim};
use std::fmt;
use xform_grammar::{Background, Color, Directive, DirectiveValue};

/// Accepted raw fields
pub const FIELDS: &[&str] = &[
    "contrast",
    "sharpen",
    "grayscale",
    "unsharp_mask",
    "shadow",
    "gradient",
    "perspective_distort",
    "arc_distort",
    "color_replace",
    "blur",
    "trim",
    "border",
    "rotate",
    "flip",
    "radius",
    "background",
    "opacity",
];

/// Default color-replace tolerance
pub const DEFAULT_TOLERANCE: i64 = 35;

/// Replace one color with another
#[derive(Debug, Clone, PartialEq)]
pub struct ColorReplace {
    pub to: Color,
    /// 0-100
    pub tolerance: i64,
    /// Color to replace; the dominant color when absent
    pub from: Option<Color>,
}

impl ColorReplace {
    fn read(params: &RawParams, field: &str) -> Result<Option<Self>, ValidationError> {
        let Some(replace) = params.nested(field)? else {
            return Ok(None);
        };
        Ok(Some(Self {
            to: replace.color("to_color")?.ok_or_else(|| replace.missing("to_color"))?,
            tolerance: replace.integer_in("tolerance", 0..=100)?.unwrap_or(DEFAULT_TOLERANCE),
            from: replace.color("from_color")?,
        }))
    }
}

impl fmt::Display for ColorReplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.to, self.tolerance)?;
        if let Some(from) = &self.from {
            write!(f, "_{from}")?;
        }
        Ok(())
    }
}

/// Validated effects step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    pub contrast: bool,
    pub sharpen: Option<Sharpen>,
    pub grayscale: bool,
    pub unsharp_mask: Option<UnsharpMask>,
    pub shadow: Option<Shadow>,
    pub gradient: Option<Gradient>,
    pub distort: Option<Distort>,
    pub color_replace: Option<ColorReplace>,
    pub blur: Option<i64>,
    pub trim: Option<Trim>,
    pub border: Option<Border>,
    pub rotation: Option<Rotation>,
    pub flip: Option<Flip>,
    pub radius: Option<Radius>,
    pub background: Option<Background>,
    pub opacity: Option<i64>,
}

impl Effects {
    /// Validate a raw parameter set
    pub fn validate(params: &RawParams) -> Result<Self, ValidationError> {
        params.exclusive("perspective_distort", "arc_distort")?;
        let distort = match Distort::read_perspective(params, "perspective_distort")? {
            Some(distort) => Some(distort),
            None => Distort::read_arc(params, "arc_distort")?,
        };

        Ok(Self {
            contrast: params.flag("contrast")?,
            sharpen: Sharpen::read(params, "sharpen")?,
            grayscale: params.flag("grayscale")?,
            unsharp_mask: UnsharpMask::read(params, "unsharp_mask")?,
            shadow: Shadow::read(params, "shadow")?,
            gradient: Gradient::read(params, "gradient")?,
            distort,
            color_replace: ColorReplace::read(params, "color_replace")?,
            blur: params.integer_in("blur", 1..=100)?,
            trim: Trim::read(params, "trim")?,
            border: Border::read(params, "border")?,
            rotation: Rotation::read(params, "rotate", true)?,
            flip: Flip::read(params, "flip")?,
            radius: Radius::read(params, "radius")?,
            background: params.background("background")?,
            opacity: params.integer_in("opacity", 0..=100)?,
        })
    }

    /// Render as one directive, or none when nothing was requested
    #[must_use]
    pub fn to_directives(&self) -> Vec<Directive> {
        let mut d = Directive::new();
        if self.contrast {
            d.insert(CONTRAST_KEY, true);
        }
        d.insert_opt(SHARPEN_KEY, self.sharpen);
        if self.grayscale {
            d.insert(GRAYSCALE_KEY, true);
        }
        d.insert_opt(USM_KEY, self.unsharp_mask.map(|usm| usm.to_string()));
        d.insert_opt(SHADOW_KEY, self.shadow.as_ref().map(DirectiveValue::from));
        d.insert_opt(GRADIENT_KEY, self.gradient.as_ref().map(DirectiveValue::from));
        d.insert_opt(DISTORT_KEY, self.distort.as_ref().map(ToString::to_string));
        d.insert_opt("cr", self.color_replace.as_ref().map(ToString::to_string));
        d.insert_opt("bl", self.blur);
        d.insert_opt("t", self.trim);
        d.insert_opt("b", self.border.as_ref().map(ToString::to_string));
        d.insert_opt("rt", self.rotation.as_ref().map(ToString::to_string));
        d.insert_opt("fl", self.flip.map(|f| f.to_string()));
        d.insert_opt("r", self.radius.as_ref().map(ToString::to_string));
        d.insert_opt("bg", self.background.as_ref());
        d.insert_opt("o", self.opacity);

        if d.is_empty() {
            Vec::new()
        } else {
            vec![d]
        }
    }
}
