//! The closed set of validated operations

use crate::ai::AiTransform;
use crate::effects::Effects;
use crate::error::{OperationError, ValidationError};
use crate::font::FontCatalog;
use crate::image_overlay::ImageOverlay;
use crate::kind::OperationKind;
use crate::params::RawParams;
use crate::resize_crop::ResizeCrop;
use crate::text_overlay::TextOverlay;
use serde_json::{Map, Value};
use xform_grammar::Directive;

/// One validated plan step
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// `resize_and_crop`
    ResizeAndCrop(ResizeCrop),
    /// `ai_transform`
    AiTransform(AiTransform),
    /// `image_overlay`
    ImageOverlay(ImageOverlay),
    /// `text_overlay`
    TextOverlay(TextOverlay),
    /// `effects_and_enhancement`
    EffectsAndEnhancement(Effects),
}

impl Operation {
    /// Intersect raw parameters with the operation's fields, then validate
    pub fn from_step(kind: OperationKind, raw: &Map<String, Value>) -> Result<Self, ValidationError> {
        let params = RawParams::intersect(kind, raw, kind.accepted_fields());
        Ok(match kind {
            OperationKind::ResizeAndCrop => Self::ResizeAndCrop(ResizeCrop::validate(&params)?),
            OperationKind::AiTransform => Self::AiTransform(AiTransform::validate(&params)?),
            OperationKind::ImageOverlay => Self::ImageOverlay(ImageOverlay::validate(&params)?),
            OperationKind::TextOverlay => Self::TextOverlay(TextOverlay::validate(&params)?),
            OperationKind::EffectsAndEnhancement => {
                Self::EffectsAndEnhancement(Effects::validate(&params)?)
            }
        })
    }

    /// Kind of this step
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::ResizeAndCrop(_) => OperationKind::ResizeAndCrop,
            Self::AiTransform(_) => OperationKind::AiTransform,
            Self::ImageOverlay(_) => OperationKind::ImageOverlay,
            Self::TextOverlay(_) => OperationKind::TextOverlay,
            Self::EffectsAndEnhancement(_) => OperationKind::EffectsAndEnhancement,
        }
    }

    /// Run collaborator checks and render the step's directives
    pub async fn into_directives(self, fonts: &dyn FontCatalog) -> Result<Vec<Directive>, OperationError> {
        Ok(match self {
            Self::ResizeAndCrop(resize) => resize.to_directives(),
            Self::AiTransform(ai) => ai.to_directives(),
            Self::ImageOverlay(overlay) => vec![overlay.to_directive()],
            Self::TextOverlay(overlay) => {
                overlay.verify_font(fonts).await?;
                vec![overlay.to_directive()]
            }
            Self::EffectsAndEnhancement(effects) => effects.to_directives(),
        })
    }
}

/// Validate and normalize one raw step
pub async fn normalize_step(
    kind: OperationKind,
    raw: &Map<String, Value>,
    fonts: &dyn FontCatalog,
) -> Result<Vec<Directive>, OperationError> {
    let operation = Operation::from_step(kind, raw)?;
    let directives = operation.into_directives(fonts).await?;
    tracing::debug!(%kind, directives = directives.len(), "step normalized");
    Ok(directives)
}
