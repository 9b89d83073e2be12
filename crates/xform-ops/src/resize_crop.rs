//! Resize, crop and focus
//!
//! Focus legality depends jointly on `crop` and `crop_mode`:
//!
//! | focus value                         | allowed when                                         |
//! |-------------------------------------|------------------------------------------------------|
//! | `auto`, `face`, object classes      | any focus-compatible context                         |
//! | `left`, `right`, `top`, `bottom`    | `crop_mode` is `pad_resize`, `extract`, `pad_extract` |
//! | `center` and corner anchors         | `crop_mode` is `extract` or `pad_extract`            |
//! | `custom`                            | effective crop `maintain_ratio`, or extract modes    |
//!
//! A context is focus-compatible when `crop_mode` is set or the effective
//! crop is `maintain_ratio` (the service default when `crop` is absent).
//! `crop = force` forbids both `focus` and `zoom`.

use crate::error::ValidationError;
use crate::params::RawParams;
use crate::values::Dpr;
use once_cell::sync::Lazy;
use regex::Regex;
use xform_grammar::{Background, Directive, Scalar};

/// Accepted raw fields
pub const FIELDS: &[&str] = &[
    "width",
    "height",
    "aspect_ratio",
    "crop",
    "crop_mode",
    "focus",
    "zoom",
    "x",
    "y",
    "x_center",
    "y_center",
    "dpr",
    "background",
];

/// Object classes usable as intelligent focus targets
pub const OBJECT_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic_light", "fire_hydrant", "stop_sign", "parking_meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports_ball", "kite",
    "baseball_bat", "baseball_glove", "skateboard", "surfboard", "tennis_racket", "bottle",
    "wine_glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot_dog", "pizza", "donut", "cake", "chair", "couch", "potted_plant",
    "bed", "dining_table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell_phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy_bear", "hair_drier", "toothbrush",
];

const EDGE_ANCHORS: &[&str] = &["left", "right", "top", "bottom"];
const RELATIVE_ANCHORS: &[&str] = &["center", "top_left", "top_right", "bottom_left", "bottom_right"];

static ASPECT_RATIO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]+(?:\.[0-9]+)?-[0-9]+(?:\.[0-9]+)?$").expect("aspect ratio regex must compile")
});

crate::choice! {
    /// Crop strategy
    pub enum Crop {
        Force => "force",
        AtMax => "at_max",
        AtMaxEnlarge => "at_max_enlarge",
        AtLeast => "at_least",
        MaintainRatio => "maintain_ratio",
    }
}

crate::choice! {
    /// Crop mode
    pub enum CropMode {
        PadResize => "pad_resize",
        PadExtract => "pad_extract",
        Extract => "extract",
    }
}

impl CropMode {
    #[inline]
    fn is_extract(self) -> bool {
        matches!(self, Self::Extract | Self::PadExtract)
    }
}

/// Focus target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Focus {
    /// `auto`, `face` or an object class
    Intelligent(String),
    /// User-defined focus region stored with the asset
    Custom,
    /// Padding side under pad-resize, anchor side under extract
    Edge(&'static str),
    /// Center or corner anchor for extract crops
    Relative(&'static str),
}

impl Focus {
    fn classify(value: &str) -> Option<Self> {
        if value == "custom" {
            return Some(Self::Custom);
        }
        if value == "auto" || value == "face" || OBJECT_CLASSES.contains(&value) {
            return Some(Self::Intelligent(value.to_string()));
        }
        if let Some(edge) = EDGE_ANCHORS.iter().copied().find(|a| *a == value) {
            return Some(Self::Edge(edge));
        }
        RELATIVE_ANCHORS
            .iter()
            .copied()
            .find(|a| *a == value)
            .map(Self::Relative)
    }

    /// Delivery form
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Intelligent(name) => name.as_str(),
            Self::Custom => "custom",
            Self::Edge(name) | Self::Relative(name) => name,
        }
    }
}

/// Position of an extract crop
#[derive(Debug, Clone, PartialEq)]
pub enum Offset {
    /// Top-left corner
    Absolute {
        x: Option<Scalar>,
        y: Option<Scalar>,
    },
    /// Center point
    Center {
        x: Option<Scalar>,
        y: Option<Scalar>,
    },
}

/// Validated resize/crop parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResizeCrop {
    pub width: Option<Scalar>,
    pub height: Option<Scalar>,
    pub aspect_ratio: Option<String>,
    pub crop: Option<Crop>,
    pub crop_mode: Option<CropMode>,
    pub focus: Option<Focus>,
    pub zoom: Option<Scalar>,
    pub offset: Option<Offset>,
    pub dpr: Option<Dpr>,
    pub background: Option<Background>,
}

impl ResizeCrop {
    /// Validate a raw parameter set
    pub fn validate(params: &RawParams) -> Result<Self, ValidationError> {
        let crop: Option<Crop> = params.choice("crop")?;
        let crop_mode: Option<CropMode> = params.choice("crop_mode")?;

        let aspect_ratio = match params.string("aspect_ratio")? {
            None => None,
            Some(ar) if ASPECT_RATIO.is_match(&ar) => Some(ar),
            Some(ar) => Some(
                Scalar::parse(&ar)
                    .map_err(|e| params.grammar("aspect_ratio", e))?
                    .to_string(),
            ),
        };

        let mut resize = Self {
            width: params.positive_scalar("width")?,
            height: params.positive_scalar("height")?,
            aspect_ratio,
            crop,
            crop_mode,
            focus: None,
            zoom: params.positive_scalar("zoom")?,
            offset: None,
            dpr: Dpr::read(params, "dpr")?,
            background: params.background("background")?,
        };

        if crop == Some(Crop::Force) {
            for field in ["focus", "zoom"] {
                if params.contains(field) {
                    return Err(params.conflict(field, "crop"));
                }
            }
        }

        if let Some(raw_focus) = params.string("focus")? {
            resize.focus = Some(Self::validate_focus(params, &raw_focus, crop, crop_mode)?);
        }

        resize.offset = Self::validate_offset(params, crop_mode)?;

        if resize.background.is_some() && crop_mode != Some(CropMode::PadResize) {
            return Err(params.requires("background", "crop_mode 'pad_resize'"));
        }

        Ok(resize)
    }

    fn validate_focus(
        params: &RawParams,
        raw: &str,
        crop: Option<Crop>,
        crop_mode: Option<CropMode>,
    ) -> Result<Focus, ValidationError> {
        let value = raw.to_ascii_lowercase();
        let maintain_ratio = crop.unwrap_or(Crop::MaintainRatio) == Crop::MaintainRatio;
        let extract = crop_mode.is_some_and(CropMode::is_extract);
        let pad_resize = crop_mode == Some(CropMode::PadResize);

        if !(pad_resize || maintain_ratio || extract) {
            return Err(params.requires(
                "focus",
                "crop_mode 'pad_resize', 'extract' or 'pad_extract', or crop 'maintain_ratio'",
            ));
        }

        let focus = Focus::classify(&value).ok_or_else(|| {
            let mut allowed = vec!["auto", "face", "custom", "<object class>"];
            allowed.extend_from_slice(EDGE_ANCHORS);
            allowed.extend_from_slice(RELATIVE_ANCHORS);
            params.not_allowed("focus", raw, &allowed)
        })?;

        match &focus {
            Focus::Intelligent(_) => {}
            Focus::Custom if maintain_ratio || extract => {}
            Focus::Custom => {
                return Err(params.requires("focus", "crop 'maintain_ratio' or an extract crop_mode"))
            }
            Focus::Edge(_) if pad_resize || extract => {}
            Focus::Edge(_) => {
                return Err(params.requires(
                    "focus",
                    "crop_mode 'pad_resize', 'extract' or 'pad_extract' for edge anchors",
                ))
            }
            Focus::Relative(_) if extract => {}
            Focus::Relative(_) => {
                return Err(params.requires("focus", "crop_mode 'extract' or 'pad_extract' for anchors"))
            }
        }
        Ok(focus)
    }

    fn validate_offset(
        params: &RawParams,
        crop_mode: Option<CropMode>,
    ) -> Result<Option<Offset>, ValidationError> {
        params.exclusive("x", "x_center")?;
        params.exclusive("y", "y_center")?;
        params.exclusive("x", "y_center")?;
        params.exclusive("y", "x_center")?;

        let absolute = (params.scalar("x")?, params.scalar("y")?);
        let center = (params.scalar("x_center")?, params.scalar("y_center")?);
        let offset = match (absolute, center) {
            ((None, None), (None, None)) => return Ok(None),
            ((x, y), (None, None)) => (Offset::Absolute { x, y }, "x"),
            (_, (x, y)) => (Offset::Center { x, y }, "x_center"),
        };

        if !crop_mode.is_some_and(CropMode::is_extract) {
            let field = if params.contains(offset.1) {
                offset.1
            } else if offset.1 == "x" {
                "y"
            } else {
                "y_center"
            };
            return Err(params.requires(field, "crop_mode 'extract' or 'pad_extract'"));
        }
        Ok(Some(offset.0))
    }

    /// Render as one directive; empty when nothing was requested
    #[must_use]
    pub fn to_directives(&self) -> Vec<Directive> {
        let mut d = Directive::new();
        d.insert_opt("w", self.width.as_ref());
        d.insert_opt("h", self.height.as_ref());
        d.insert_opt("ar", self.aspect_ratio.clone());
        d.insert_opt("c", self.crop.map(|c| c.to_string()));
        d.insert_opt("cm", self.crop_mode.map(|c| c.to_string()));
        d.insert_opt("fo", self.focus.as_ref().map(Focus::as_str));
        d.insert_opt("z", self.zoom.as_ref());
        match &self.offset {
            Some(Offset::Absolute { x, y }) => {
                d.insert_opt("x", x.as_ref());
                d.insert_opt("y", y.as_ref());
            }
            Some(Offset::Center { x, y }) => {
                d.insert_opt("xc", x.as_ref());
                d.insert_opt("yc", y.as_ref());
            }
            None => {}
        }
        d.insert_opt("dpr", self.dpr.as_ref().map(ToString::to_string));
        d.insert_opt("bg", self.background.as_ref());

        if d.is_empty() {
            Vec::new()
        } else {
            vec![d]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::OperationKind;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn validate(value: Value) -> Result<Vec<Directive>, ValidationError> {
        let Value::Object(map) = value else { unreachable!() };
        let params = RawParams::intersect(OperationKind::ResizeAndCrop, &map, FIELDS);
        ResizeCrop::validate(&params).map(|r| r.to_directives())
    }

    fn rendered(value: Value) -> Value {
        let directives = validate(value).unwrap();
        assert_eq!(directives.len(), 1);
        serde_json::to_value(&directives[0]).unwrap()
    }

    #[test]
    fn extract_with_offsets() {
        assert_eq!(
            rendered(json!({"width": 300, "height": 300, "crop_mode": "extract", "x": 10, "y": 10})),
            json!({"w": "300", "h": "300", "cm": "extract", "x": "10", "y": "10"})
        );
    }

    #[test]
    fn edge_focus_depends_on_context() {
        assert_eq!(
            rendered(json!({"width": 400, "crop_mode": "pad_resize", "focus": "left"})),
            json!({"w": "400", "cm": "pad_resize", "fo": "left"})
        );
        let err = validate(json!({"width": 400, "crop": "force", "focus": "left"})).unwrap_err();
        assert!(matches!(err, ValidationError::Conflict { .. }));
        assert_eq!(err.field(), "focus");

        // default crop is maintain_ratio, which has no notion of edges
        assert!(validate(json!({"width": 400, "focus": "left"})).is_err());
    }

    #[test]
    fn relative_anchor_needs_extract() {
        assert!(validate(json!({"crop_mode": "pad_resize", "focus": "top_left"})).is_err());
        assert_eq!(
            rendered(json!({"crop_mode": "pad_extract", "focus": "top_left"})),
            json!({"cm": "pad_extract", "fo": "top_left"})
        );
    }

    #[test]
    fn intelligent_and_custom_focus() {
        assert_eq!(
            rendered(json!({"width": 200, "height": 200, "focus": "face", "zoom": 0.8})),
            json!({"w": "200", "h": "200", "fo": "face", "z": "0.8"})
        );
        assert_eq!(rendered(json!({"focus": "dog"}))["fo"], "dog");
        assert!(validate(json!({"crop": "at_least", "focus": "custom"})).is_err());
        assert!(validate(json!({"focus": "nowhere"})).is_err());
    }

    #[test]
    fn zoom_forbidden_with_force() {
        let err = validate(json!({"crop": "force", "zoom": 2})).unwrap_err();
        assert_eq!(err.field(), "zoom");
    }

    #[test]
    fn offsets_are_exclusive_and_need_extract() {
        let err = validate(json!({"crop_mode": "extract", "x": 1, "x_center": 2})).unwrap_err();
        assert!(matches!(err, ValidationError::Conflict { .. }));

        let err = validate(json!({"y_center": 5})).unwrap_err();
        assert_eq!(err.field(), "y_center");

        assert_eq!(
            rendered(json!({"crop_mode": "extract", "x_center": "iw_div_2"})),
            json!({"cm": "extract", "xc": "iw_div_2"})
        );
    }

    #[test]
    fn dimensions_must_be_positive() {
        assert!(validate(json!({"width": 0})).is_err());
        assert!(validate(json!({"height": -20})).is_err());
        assert!(validate(json!({"dpr": 0})).is_err());
        assert_eq!(rendered(json!({"width": "iw_div_2", "dpr": "auto"})), json!({"w": "iw_div_2", "dpr": "auto"}));
    }

    #[test]
    fn aspect_ratio_and_background() {
        assert_eq!(
            rendered(json!({"width": 500, "aspect_ratio": "16-9", "crop_mode": "pad_resize", "background": "blurred_auto"})),
            json!({"w": "500", "ar": "16-9", "cm": "pad_resize", "bg": "blurred_auto"})
        );
        assert!(validate(json!({"aspect_ratio": "wide"})).is_err());
        assert!(validate(json!({"background": "FF0000"})).is_err());
    }

    #[test]
    fn empty_and_extra_params_emit_nothing() {
        assert!(validate(json!({"sepia": true})).unwrap().is_empty());
    }
}
