//! Long-form parameter names to short keys
//!
//! Documentation and SDKs spell transformation parameters out in full
//! (`background color`, `aspectRatio`, `x-center`); directives use the
//! short-key grammar. Lookups go through [`normalize_long_name`] first.

use once_cell::sync::Lazy;
use std::collections::HashMap;

const TABLE: &[(&str, &str)] = &[
    ("width", "w"),
    ("height", "h"),
    ("aspect_ratio", "ar"),
    ("quality", "q"),
    ("crop", "c"),
    ("crop_mode", "cm"),
    ("focus", "fo"),
    ("zoom", "z"),
    ("x", "x"),
    ("y", "y"),
    ("x_center", "xc"),
    ("y_center", "yc"),
    ("format", "f"),
    ("radius", "r"),
    ("corner_radius", "r"),
    ("background", "bg"),
    ("background_color", "bg"),
    ("border", "b"),
    ("rotation", "rt"),
    ("rotate", "rt"),
    ("blur", "bl"),
    ("named", "n"),
    ("named_transformation", "n"),
    ("progressive", "pr"),
    ("lossless", "lo"),
    ("trim", "t"),
    ("metadata", "md"),
    ("color_profile", "cp"),
    ("default_image", "di"),
    ("dpr", "dpr"),
    ("device_pixel_ratio", "dpr"),
    ("flip", "fl"),
    ("opacity", "o"),
    ("page", "pg"),
    ("original", "orig"),
    ("color_replace", "cr"),
    ("sharpen", "e-sharpen"),
    ("effect_sharpen", "e-sharpen"),
    ("unsharp_mask", "e-usm"),
    ("effect_usm", "e-usm"),
    ("contrast", "e-contrast"),
    ("contrast_stretch", "e-contrast"),
    ("effect_contrast", "e-contrast"),
    ("grayscale", "e-grayscale"),
    ("effect_gray", "e-grayscale"),
    ("shadow", "e-shadow"),
    ("effect_shadow", "e-shadow"),
    ("gradient", "e-gradient"),
    ("effect_gradient", "e-gradient"),
    ("distort", "e-distort"),
    ("background_removal", "e-bgremove"),
    ("remove_background", "e-bgremove"),
    ("upscale", "e-upscale"),
    ("retouch", "e-retouch"),
    ("generative_variation", "e-genvar"),
    ("drop_shadow", "e-dropshadow"),
    ("layer_x", "lx"),
    ("layer_y", "ly"),
    ("layer_focus", "lfo"),
    ("layer_mode", "lm"),
    ("font_size", "fs"),
    ("font_family", "ff"),
    ("font_color", "co"),
    ("inner_alignment", "ia"),
    ("padding", "pa"),
    ("alpha", "al"),
    ("typography", "tg"),
    ("line_height", "lh"),
];

static SHORT_KEYS: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| TABLE.iter().copied().collect());

/// Canonical spelling of a long name: snake case, lower case
///
/// `"Background Color"`, `"background-color"` and `"backgroundColor"` all
/// become `"background_color"`.
#[must_use]
pub fn normalize_long_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut previous_lower = false;
    for c in name.trim().chars() {
        match c {
            ' ' | '-' | '_' => {
                if !out.ends_with('_') {
                    out.push('_');
                }
                previous_lower = false;
            }
            c if c.is_ascii_uppercase() => {
                if previous_lower {
                    out.push('_');
                }
                out.push(c.to_ascii_lowercase());
                previous_lower = false;
            }
            c => {
                out.push(c);
                previous_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            }
        }
    }
    out
}

/// Short key for a long-form name, if the name is known
#[must_use]
pub fn short_key(long_name: &str) -> Option<&'static str> {
    SHORT_KEYS.get(normalize_long_name(long_name).as_str()).copied()
}

/// Number of known long names
#[must_use]
pub fn known_names() -> usize {
    SHORT_KEYS.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spellings_normalize() {
        assert_eq!(normalize_long_name("Background Color"), "background_color");
        assert_eq!(normalize_long_name("background-color"), "background_color");
        assert_eq!(normalize_long_name("backgroundColor"), "background_color");
        assert_eq!(normalize_long_name("  x  center "), "x_center");
    }

    #[test]
    fn lookups() {
        assert_eq!(short_key("background color"), Some("bg"));
        assert_eq!(short_key("aspectRatio"), Some("ar"));
        assert_eq!(short_key("Effect Sharpen"), Some("e-sharpen"));
        assert_eq!(short_key("sepia"), None);
        assert_eq!(short_key(""), None);
    }

    #[test]
    fn every_short_key_is_unique_per_name() {
        assert_eq!(known_names(), TABLE.len());
    }
}
