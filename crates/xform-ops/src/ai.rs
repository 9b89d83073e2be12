//! AI-assisted transformations
//!
//! Every enabled toggle becomes its own directive, since the delivery
//! service requires AI steps to be chained rather than combined. Steps are
//! emitted in a fixed order so that background removal always precedes the
//! drop shadow that depends on it.

use crate::error::ValidationError;
use crate::params::RawParams;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use xform_grammar::{Directive, Scalar};

/// Accepted raw fields
pub const FIELDS: &[&str] = &[
    "ai_background_removal_external",
    "ai_remove_background",
    "ai_edit",
    "ai_changebg",
    "ai_bg_genfill",
    "ai_drop_shadow",
    "ai_retouch",
    "ai_upscale",
    "ai_variation",
    "az",
    "el",
    "st",
    "prompt",
    "encoded",
    "height",
    "width",
    "crop_mode",
];

/// Native background removal key
pub const BG_REMOVE_KEY: &str = "e-bgremove";
/// External background removal key
pub const BG_REMOVE_EXTERNAL_KEY: &str = "e-removedotbg";
/// Drop shadow key
pub const DROP_SHADOW_KEY: &str = "e-dropshadow";

crate::choice! {
    /// Crop modes accepted alongside generative fill
    pub enum AiCropMode {
        PadResize => "pad_resize",
        PadExtract => "pad_extract",
    }
}

/// Text prompt for edit and background change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    /// Send base64-encoded (`...-prompte` keys)
    pub encoded: bool,
}

impl Prompt {
    fn entry(&self, base_key: &str) -> (String, String) {
        if self.encoded {
            (format!("{base_key}e"), STANDARD.encode(self.text.as_bytes()))
        } else {
            (base_key.to_string(), self.text.clone())
        }
    }
}

/// Generative fill canvas
#[derive(Debug, Clone, PartialEq)]
pub struct GenerativeFill {
    pub width: Scalar,
    pub height: Scalar,
    /// Optional guidance for the generated fill
    pub prompt: Option<Prompt>,
}

impl GenerativeFill {
    fn background(&self) -> String {
        match &self.prompt {
            None => "genfill".to_string(),
            Some(prompt) => {
                let (key, value) = prompt.entry("prompt");
                format!("genfill-{key}-{value}")
            }
        }
    }
}

/// Drop shadow light settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropShadow {
    /// Light azimuth, 0-360
    pub azimuth: Option<i64>,
    /// Light elevation, 0-90
    pub elevation: Option<i64>,
    /// Shadow saturation, 0-100
    pub saturation: Option<i64>,
}

impl DropShadow {
    fn value(self) -> xform_grammar::DirectiveValue {
        let tokens: Vec<String> = [("az", self.azimuth), ("el", self.elevation), ("st", self.saturation)]
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| format!("{key}-{v}")))
            .collect();
        if tokens.is_empty() {
            true.into()
        } else {
            tokens.join("_").into()
        }
    }
}

/// Validated AI toggles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiTransform {
    pub retouch: bool,
    pub upscale: bool,
    pub variation: bool,
    pub remove_background_external: bool,
    pub remove_background: bool,
    pub edit: Option<Prompt>,
    pub change_background: Option<Prompt>,
    pub generative_fill: Option<GenerativeFill>,
    pub drop_shadow: Option<DropShadow>,
}

impl AiTransform {
    /// Validate a raw parameter set
    pub fn validate(params: &RawParams) -> Result<Self, ValidationError> {
        let prompt = params.string("prompt")?;
        let encoded = params.flag("encoded")?;
        let prompt_for = |toggle: &str| -> Result<Option<Prompt>, ValidationError> {
            if !params.flag(toggle)? {
                return Ok(None);
            }
            let text = prompt
                .clone()
                .ok_or_else(|| params.requires(toggle, "a non-empty 'prompt'"))?;
            Ok(Some(Prompt { text, encoded }))
        };

        let mut ai = Self {
            retouch: params.flag("ai_retouch")?,
            upscale: params.flag("ai_upscale")?,
            variation: params.flag("ai_variation")?,
            remove_background_external: params.flag("ai_background_removal_external")?,
            remove_background: params.flag("ai_remove_background")?,
            edit: prompt_for("ai_edit")?,
            change_background: prompt_for("ai_changebg")?,
            generative_fill: None,
            drop_shadow: None,
        };

        let width = params.positive_scalar("width")?;
        let height = params.positive_scalar("height")?;
        let crop_mode: Option<AiCropMode> = params.choice("crop_mode")?;
        if params.flag("ai_bg_genfill")? {
            if crop_mode.is_some_and(|cm| cm != AiCropMode::PadResize) {
                return Err(params.requires("ai_bg_genfill", "crop_mode 'pad_resize'"));
            }
            let width = width.ok_or_else(|| params.requires("ai_bg_genfill", "'width'"))?;
            let height = height.ok_or_else(|| params.requires("ai_bg_genfill", "'height'"))?;
            let prompt = prompt.clone().map(|text| Prompt { text, encoded });
            ai.generative_fill = Some(GenerativeFill { width, height, prompt });
        }

        let shadow = DropShadow {
            azimuth: params.integer_in("az", 0..=360)?,
            elevation: params.integer_in("el", 0..=90)?,
            saturation: params.integer_in("st", 0..=100)?,
        };
        if params.flag("ai_drop_shadow")? {
            ai.drop_shadow = Some(shadow);
        } else if let Some(field) = ["az", "el", "st"].into_iter().find(|f| params.contains(f)) {
            return Err(params.requires(field, "'ai_drop_shadow'"));
        }

        Ok(ai)
    }

    /// Render as chained directives
    #[must_use]
    pub fn to_directives(&self) -> Vec<Directive> {
        let mut steps = Vec::new();
        let mut flag = |enabled: bool, key: &str| {
            if enabled {
                steps.push(Directive::new().with(key, true));
            }
        };
        flag(self.retouch, "e-retouch");
        flag(self.upscale, "e-upscale");
        flag(self.variation, "e-genvar");
        flag(self.remove_background_external, BG_REMOVE_EXTERNAL_KEY);
        flag(self.remove_background, BG_REMOVE_KEY);

        for (prompt, key) in [
            (&self.edit, "e-edit-prompt"),
            (&self.change_background, "e-changebg-prompt"),
        ] {
            if let Some(prompt) = prompt {
                let (key, value) = prompt.entry(key);
                steps.push(Directive::new().with(key, value));
            }
        }

        if let Some(fill) = &self.generative_fill {
            steps.push(
                Directive::new()
                    .with("bg", fill.background())
                    .with("cm", "pad_resize")
                    .with("h", &fill.height)
                    .with("w", &fill.width),
            );
        }

        if let Some(shadow) = self.drop_shadow {
            if !self.remove_background && !self.remove_background_external {
                steps.push(Directive::new().with(BG_REMOVE_KEY, true));
            }
            steps.push(Directive::new().with(DROP_SHADOW_KEY, shadow.value()));
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::OperationKind;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn validate(value: Value) -> Result<Vec<Value>, ValidationError> {
        let Value::Object(map) = value else { unreachable!() };
        let params = RawParams::intersect(OperationKind::AiTransform, &map, FIELDS);
        AiTransform::validate(&params).map(|ai| {
            ai.to_directives()
                .iter()
                .map(|d| serde_json::to_value(d).unwrap())
                .collect()
        })
    }

    #[test]
    fn drop_shadow_injects_background_removal() {
        assert_eq!(
            validate(json!({"ai_drop_shadow": true})).unwrap(),
            vec![json!({"e-bgremove": true}), json!({"e-dropshadow": true})]
        );
    }

    #[test]
    fn drop_shadow_reuses_existing_removal() {
        assert_eq!(
            validate(json!({"ai_drop_shadow": true, "ai_background_removal_external": true, "az": 90, "st": 40})).unwrap(),
            vec![json!({"e-removedotbg": true}), json!({"e-dropshadow": "az-90_st-40"})]
        );
    }

    #[test]
    fn shadow_settings_need_toggle_and_range() {
        assert!(validate(json!({"az": 90})).is_err());
        assert!(validate(json!({"ai_drop_shadow": true, "el": 91})).is_err());
    }

    #[test]
    fn prompts_are_required_and_encodable() {
        let err = validate(json!({"ai_edit": true})).unwrap_err();
        assert_eq!(err.field(), "ai_edit");
        assert!(validate(json!({"ai_changebg": true, "prompt": "   "})).is_err());

        assert_eq!(
            validate(json!({"ai_changebg": true, "prompt": "snowy street", "encoded": true})).unwrap(),
            vec![json!({"e-changebg-prompte": "c25vd3kgc3RyZWV0"})]
        );
        assert_eq!(
            validate(json!({"ai_edit": true, "prompt": "add a hat"})).unwrap(),
            vec![json!({"e-edit-prompt": "add a hat"})]
        );
    }

    #[test]
    fn generative_fill_requirements() {
        assert!(validate(json!({"ai_bg_genfill": true, "width": 800})).is_err());
        assert!(validate(json!({"ai_bg_genfill": true, "width": 800, "height": 600, "crop_mode": "pad_extract"})).is_err());
        assert_eq!(
            validate(json!({"ai_bg_genfill": true, "width": 800, "height": 600})).unwrap(),
            vec![json!({"bg": "genfill", "cm": "pad_resize", "h": "600", "w": "800"})]
        );
        assert_eq!(
            validate(json!({"ai_bg_genfill": true, "width": 800, "height": 600, "prompt": "beach"})).unwrap(),
            vec![json!({"bg": "genfill-prompt-beach", "cm": "pad_resize", "h": "600", "w": "800"})]
        );
    }

    #[test]
    fn steps_keep_fixed_order() {
        let steps = validate(json!({"ai_upscale": true, "ai_retouch": true, "ai_remove_background": true, "ai_variation": true})).unwrap();
        assert_eq!(
            steps,
            vec![
                json!({"e-retouch": true}),
                json!({"e-upscale": true}),
                json!({"e-genvar": true}),
                json!({"e-bgremove": true}),
            ]
        );
    }

    #[test]
    fn nothing_enabled_emits_nothing() {
        assert!(validate(json!({"prompt": "unused"})).unwrap().is_empty());
    }
}
