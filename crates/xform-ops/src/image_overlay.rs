//! Image layers
//!
//! Fields use the delivery service's short names (`w`, `lx`, `cm`, ...).
//! A layer may own at most one nested child layer, which is validated with
//! the same rules and rendered inside its parent.

use crate::effect::{
    Distort, Gradient, Sharpen, Shadow, UnsharpMask, CONTRAST_KEY, DISTORT_KEY, GRADIENT_KEY,
    GRAYSCALE_KEY, SHADOW_KEY, SHARPEN_KEY, USM_KEY,
};
use crate::error::ValidationError;
use crate::params::RawParams;
use crate::values::{Border, Dpr, Flip, Radius, Rotation, Trim};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use xform_grammar::{Background, Directive, DirectiveValue, Scalar, CHILD_LAYER_KEY, LAYER_KEY};

/// Accepted raw fields
pub const FIELDS: &[&str] = &[
    "image_path",
    "encoded",
    "w",
    "h",
    "ar",
    "c",
    "cm",
    "fo",
    "z",
    "x",
    "y",
    "xc",
    "yc",
    "lx",
    "ly",
    "lfo",
    "lm",
    "bg",
    "b",
    "o",
    "r",
    "rt",
    "fl",
    "q",
    "bl",
    "dpr",
    "t",
    "e_grayscale",
    "e_contrast",
    "e_sharpen",
    "e_usm",
    "e_shadow",
    "e_gradient",
    "e_distort",
    "child",
];

/// Path that requests a solid-color canvas instead of an image
pub const CANVAS_PATH: &str = "ik_canvas";

crate::choice! {
    /// Crop strategy of a layer
    pub enum LayerCrop {
        Force => "force",
        AtMax => "at_max",
        AtLeast => "at_least",
    }
}

crate::choice! {
    /// Crop mode of a layer
    pub enum LayerCropMode {
        Extract => "extract",
        PadResize => "pad_resize",
    }
}

crate::choice! {
    /// Focus of a layer crop
    pub enum LayerFocus {
        Face => "face",
        Center => "center",
        Top => "top",
        Bottom => "bottom",
        Left => "left",
        Right => "right",
        TopLeft => "top_left",
        TopRight => "top_right",
        BottomLeft => "bottom_left",
        BottomRight => "bottom_right",
    }
}

crate::choice! {
    /// Anchor of the layer on its parent
    pub enum LayerAnchor {
        Center => "center",
        Top => "top",
        Bottom => "bottom",
        Left => "left",
        Right => "right",
        TopLeft => "top_left",
        TopRight => "top_right",
        BottomLeft => "bottom_left",
        BottomRight => "bottom_right",
    }
}

crate::choice! {
    /// Blending of a layer with its parent
    pub enum LayerMode {
        Multiply => "multiply",
        Cutout => "cutout",
        Cutter => "cutter",
        Displace => "displace",
    }
}

/// Validated image layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageOverlay {
    pub image_path: String,
    pub encoded: bool,
    pub x_position: Option<Scalar>,
    pub y_position: Option<Scalar>,
    pub anchor: Option<LayerAnchor>,
    pub layer_mode: Option<LayerMode>,
    pub width: Option<Scalar>,
    pub height: Option<Scalar>,
    pub aspect_ratio: Option<Scalar>,
    pub crop: Option<LayerCrop>,
    pub crop_mode: Option<LayerCropMode>,
    pub focus: Option<LayerFocus>,
    pub zoom: Option<Scalar>,
    pub x: Option<Scalar>,
    pub y: Option<Scalar>,
    pub x_center: Option<Scalar>,
    pub y_center: Option<Scalar>,
    pub background: Option<Background>,
    pub border: Option<Border>,
    pub opacity: Option<i64>,
    pub radius: Option<Radius>,
    pub rotation: Option<Rotation>,
    pub flip: Option<Flip>,
    pub quality: Option<i64>,
    pub blur: Option<i64>,
    pub dpr: Option<Dpr>,
    pub trim: Option<Trim>,
    pub grayscale: bool,
    pub contrast: bool,
    pub sharpen: Option<Sharpen>,
    pub unsharp_mask: Option<UnsharpMask>,
    pub shadow: Option<Shadow>,
    pub gradient: Option<Gradient>,
    pub distort: Option<Distort>,
    pub child: Option<Box<ImageOverlay>>,
}

impl ImageOverlay {
    /// Validate a raw parameter set, including the nested child
    pub fn validate(params: &RawParams) -> Result<Self, ValidationError> {
        let overlay = Self {
            image_path: params.required_string("image_path")?,
            encoded: params.flag("encoded")?,
            x_position: params.scalar("lx")?,
            y_position: params.scalar("ly")?,
            anchor: params.choice("lfo")?,
            layer_mode: params.choice("lm")?,
            width: params.positive_scalar("w")?,
            height: params.positive_scalar("h")?,
            aspect_ratio: params.positive_scalar("ar")?,
            crop: params.choice("c")?,
            crop_mode: params.choice("cm")?,
            focus: params.choice("fo")?,
            zoom: params.positive_scalar("z")?,
            x: params.scalar("x")?,
            y: params.scalar("y")?,
            x_center: params.scalar("xc")?,
            y_center: params.scalar("yc")?,
            background: params.background("bg")?,
            border: Border::read(params, "b")?,
            opacity: params.integer_in("o", 0..=100)?,
            radius: Radius::read(params, "r")?,
            rotation: Rotation::read(params, "rt", false)?,
            flip: Flip::read(params, "fl")?,
            quality: params.integer_in("q", 1..=100)?,
            blur: params.integer_in("bl", 1..=100)?,
            dpr: Dpr::read(params, "dpr")?,
            trim: Trim::read(params, "t")?,
            grayscale: params.flag("e_grayscale")?,
            contrast: params.flag("e_contrast")?,
            sharpen: Sharpen::read(params, "e_sharpen")?,
            unsharp_mask: Self::optional_object(params, "e_usm", UnsharpMask::read)?,
            shadow: Shadow::read(params, "e_shadow")?,
            gradient: Gradient::read(params, "e_gradient")?,
            distort: Self::optional_object(params, "e_distort", Distort::read_tagged)?,
            child: Self::validate_child(params)?,
        };
        overlay.check_context(params)?;
        Ok(overlay)
    }

    /// Objects that the original schema also allowed as a bare `false`
    fn optional_object<T>(
        params: &RawParams,
        field: &str,
        read: fn(&RawParams, &str) -> Result<Option<T>, ValidationError>,
    ) -> Result<Option<T>, ValidationError> {
        match params.raw(field) {
            Some(Value::Bool(false)) => Ok(None),
            Some(Value::Bool(true)) => Err(params.invalid_type(field, "object", &Value::Bool(true))),
            _ => read(params, field),
        }
    }

    fn validate_child(params: &RawParams) -> Result<Option<Box<Self>>, ValidationError> {
        let child = match params.raw("child") {
            None => return Ok(None),
            Some(Value::Array(items)) if items.len() > 1 => {
                return Err(ValidationError::TooManyChildren {
                    operation: params.operation(),
                    field: params.path("child"),
                });
            }
            Some(Value::Array(items)) => match items.first() {
                None => return Ok(None),
                Some(Value::Object(map)) => params.child("child", map.clone()),
                Some(other) => return Err(params.invalid_type("child", "object", other)),
            },
            Some(Value::Object(_)) => match params.nested("child")? {
                Some(nested) => nested,
                None => return Ok(None),
            },
            Some(other) => return Err(params.invalid_type("child", "object", other)),
        };
        let child = child.retain_fields(FIELDS);
        Self::validate(&child).map(|c| Some(Box::new(c)))
    }

    fn check_context(&self, params: &RawParams) -> Result<(), ValidationError> {
        if self.image_path == CANVAS_PATH {
            for (field, present) in [
                ("w", self.width.is_some()),
                ("h", self.height.is_some()),
                ("bg", self.background.is_some()),
            ] {
                if !present {
                    return Err(params.requires("image_path", format!("'{field}' for a '{CANVAS_PATH}' layer")));
                }
            }
        }

        if self.zoom.is_some() && self.focus != Some(LayerFocus::Face) {
            return Err(params.requires("z", "fo 'face'"));
        }

        params.exclusive("x", "xc")?;
        params.exclusive("y", "yc")?;
        let displaced = self.layer_mode == Some(LayerMode::Displace);
        let extract = self.crop_mode == Some(LayerCropMode::Extract);
        if !(extract || displaced) {
            if let Some(field) = ["x", "y", "xc", "yc"].into_iter().find(|f| params.contains(f)) {
                return Err(params.requires(field, "cm 'extract' or lm 'displace'"));
            }
        }

        if self.dpr.is_some() && self.width.is_none() && self.height.is_none() {
            return Err(params.requires("dpr", "'w' or 'h'"));
        }

        if self.grayscale && self.contrast {
            return Err(params.conflict("e_grayscale", "e_contrast"));
        }
        Ok(())
    }

    /// Render the layer, with any child nested inside it
    #[must_use]
    pub fn to_directive(&self) -> Directive {
        let mut d = Directive::new().with(LAYER_KEY, "image");
        if self.encoded {
            d.insert("ie", STANDARD.encode(self.image_path.as_bytes()));
        } else {
            d.insert("i", self.image_path.as_str());
        }

        d.insert_opt("lx", self.x_position.as_ref());
        d.insert_opt("ly", self.y_position.as_ref());
        d.insert_opt("lfo", self.anchor.map(|a| a.to_string()));
        d.insert_opt("lm", self.layer_mode.map(|m| m.to_string()));

        d.insert_opt("w", self.width.as_ref());
        d.insert_opt("h", self.height.as_ref());
        d.insert_opt("ar", self.aspect_ratio.as_ref());
        d.insert_opt("c", self.crop.map(|c| c.to_string()));
        d.insert_opt("cm", self.crop_mode.map(|c| c.to_string()));
        d.insert_opt("fo", self.focus.map(|f| f.to_string()));
        d.insert_opt("z", self.zoom.as_ref());
        d.insert_opt("x", self.x.as_ref());
        d.insert_opt("y", self.y.as_ref());
        d.insert_opt("xc", self.x_center.as_ref());
        d.insert_opt("yc", self.y_center.as_ref());
        d.insert_opt("bg", self.background.as_ref());
        d.insert_opt("b", self.border.as_ref().map(ToString::to_string));
        d.insert_opt("o", self.opacity);
        d.insert_opt("r", self.radius.as_ref().map(ToString::to_string));
        d.insert_opt("rt", self.rotation.as_ref().map(ToString::to_string));
        d.insert_opt("fl", self.flip.map(|f| f.to_string()));
        d.insert_opt("q", self.quality);
        d.insert_opt("bl", self.blur);
        d.insert_opt("dpr", self.dpr.as_ref().map(ToString::to_string));
        d.insert_opt("t", self.trim);

        if self.grayscale {
            d.insert(GRAYSCALE_KEY, true);
        }
        if self.contrast {
            d.insert(CONTRAST_KEY, true);
        }
        d.insert_opt(SHARPEN_KEY, self.sharpen);
        d.insert_opt(USM_KEY, self.unsharp_mask.map(|usm| usm.to_string()));
        d.insert_opt(SHADOW_KEY, self.shadow.as_ref().map(DirectiveValue::from));
        d.insert_opt(GRADIENT_KEY, self.gradient.as_ref().map(DirectiveValue::from));
        d.insert_opt(DISTORT_KEY, self.distort.as_ref().map(ToString::to_string));

        if let Some(child) = &self.child {
            d.insert(CHILD_LAYER_KEY, child.to_directive());
        }
        d
    }

    /// Nesting depth, counting this layer
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.child.as_ref().map_or(0, |c| c.depth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::OperationKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn validate(value: Value) -> Result<ImageOverlay, ValidationError> {
        let Value::Object(map) = value else { unreachable!() };
        let params = RawParams::intersect(OperationKind::ImageOverlay, &map, FIELDS);
        ImageOverlay::validate(&params)
    }

    fn rendered(value: Value) -> Value {
        serde_json::to_value(validate(value).unwrap().to_directive()).unwrap()
    }

    #[test]
    fn positioned_logo() {
        assert_eq!(
            rendered(json!({"image_path": "logo.png", "w": 200, "lx": "bw_mul_0.05", "ly": 10, "e_shadow": true, "o": 80})),
            json!({"l": "image", "i": "logo.png", "lx": "bw_mul_0.05", "ly": "10", "w": "200", "o": 80, "e-shadow": true})
        );
    }

    #[test]
    fn image_path_required() {
        let err = validate(json!({"w": 100})).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { .. }));
    }

    #[test]
    fn encoded_path() {
        let d = rendered(json!({"image_path": "a b.png", "encoded": true}));
        assert_eq!(d["ie"], "YSBiLnBuZw==");
    }

    #[test]
    fn canvas_needs_size_and_color() {
        assert!(validate(json!({"image_path": "ik_canvas", "w": 100, "h": 50})).is_err());
        assert_eq!(
            rendered(json!({"image_path": "ik_canvas", "w": 100, "h": 50, "bg": "ff000080"})),
            json!({"l": "image", "i": "ik_canvas", "w": "100", "h": "50", "bg": "FF000080"})
        );
    }

    #[test]
    fn zoom_requires_face_focus() {
        assert!(validate(json!({"image_path": "a.png", "z": 1.5, "fo": "center"})).is_err());
        assert!(validate(json!({"image_path": "a.png", "z": 1.5, "fo": "face"})).is_ok());
    }

    #[test]
    fn crop_coordinates_need_extract_or_displace() {
        let err = validate(json!({"image_path": "a.png", "x": 10})).unwrap_err();
        assert_eq!(err.field(), "x");
        assert!(validate(json!({"image_path": "a.png", "cm": "extract", "x": 10, "y": 20})).is_ok());
        assert!(validate(json!({"image_path": "a.png", "lm": "displace", "x": 10})).is_ok());
        assert!(validate(json!({"image_path": "a.png", "cm": "extract", "x": 10, "xc": 5})).is_err());
    }

    #[test]
    fn dpr_needs_dimension() {
        assert!(validate(json!({"image_path": "a.png", "dpr": 2})).is_err());
        assert!(validate(json!({"image_path": "a.png", "dpr": 2, "h": 40})).is_ok());
    }

    #[test]
    fn grayscale_and_contrast_exclusive() {
        let err = validate(json!({"image_path": "a.png", "e_grayscale": true, "e_contrast": true})).unwrap_err();
        assert!(matches!(err, ValidationError::Conflict { .. }));
    }

    #[test]
    fn single_child_nests() {
        let overlay = validate(json!({
            "image_path": "frame.png",
            "child": {"image_path": "badge.png", "w": 40, "unknown": 1}
        }))
        .unwrap();
        assert_eq!(overlay.depth(), 2);
        assert_eq!(
            serde_json::to_value(overlay.to_directive()).unwrap(),
            json!({"l": "image", "i": "frame.png", "overlay": {"l": "image", "i": "badge.png", "w": "40"}})
        );
    }

    #[test]
    fn multiple_children_rejected() {
        let err = validate(json!({
            "image_path": "frame.png",
            "child": [{"image_path": "a.png"}, {"image_path": "b.png"}]
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::TooManyChildren { .. }));
    }

    #[test]
    fn child_errors_carry_path() {
        let err = validate(json!({
            "image_path": "frame.png",
            "child": {"image_path": "a.png", "o": 101}
        }))
        .unwrap_err();
        assert_eq!(err.field(), "child.o");

        let err = validate(json!({
            "image_path": "frame.png",
            "child": [{"image_path": "a.png", "o": 101}]
        }))
        .unwrap_err();
        assert_eq!(err.field(), "child.o");
    }

    #[test]
    fn effects_render_as_composite_tokens() {
        let d = rendered(json!({
            "image_path": "a.png",
            "e_sharpen": 5,
            "e_usm": {"radius": 2, "sigma": 2, "amount": 0.8, "threshold": 0.024},
            "e_distort": {"type": "arc", "arc_degree": 60}
        }));
        assert_eq!(d["e-sharpen"], 5);
        assert_eq!(d["e-usm"], "2-2-0.8-0.024");
        assert_eq!(d["e-distort"], "a-60");
    }
}
