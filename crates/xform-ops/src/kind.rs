//! Operation kinds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of transformation operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Resize, crop and focus
    ResizeAndCrop,
    /// Generative and AI-assisted edits
    AiTransform,
    /// Image layer composited on top of the base image
    ImageOverlay,
    /// Text layer composited on top of the base image
    TextOverlay,
    /// Visual effects and enhancements
    EffectsAndEnhancement,
}

impl OperationKind {
    /// Every operation, in manifest order
    pub const ALL: [Self; 5] = [
        Self::ResizeAndCrop,
        Self::AiTransform,
        Self::ImageOverlay,
        Self::TextOverlay,
        Self::EffectsAndEnhancement,
    ];

    /// Manifest name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResizeAndCrop => "resize_and_crop",
            Self::AiTransform => "ai_transform",
            Self::ImageOverlay => "image_overlay",
            Self::TextOverlay => "text_overlay",
            Self::EffectsAndEnhancement => "effects_and_enhancement",
        }
    }

    /// Look up an operation by manifest name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Raw parameter names this operation's validator accepts
    #[must_use]
    pub fn accepted_fields(self) -> &'static [&'static str] {
        match self {
            Self::ResizeAndCrop => crate::resize_crop::FIELDS,
            Self::AiTransform => crate::ai::FIELDS,
            Self::ImageOverlay => crate::image_overlay::FIELDS,
            Self::TextOverlay => crate::text_overlay::FIELDS,
            Self::EffectsAndEnhancement => crate::effects::FIELDS,
        }
    }

    /// Whether directives of this kind are overlay layers
    #[inline]
    #[must_use]
    pub const fn is_overlay(self) -> bool {
        match self {
            Self::ImageOverlay | Self::TextOverlay => true,
            Self::ResizeAndCrop | Self::AiTransform | Self::EffectsAndEnhancement => false,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown operation name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation '{0}'")]
pub struct UnknownOperation(pub String);

impl FromStr for OperationKind {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownOperation(s.to_string()))
    }
}
