//! Structured plan generation and step validation

use crate::error::{PlanError, ResolveError, Service};
use crate::manifest::ManifestEntry;
use crate::prompts;
use crate::services::{strip_code_fence, ReasoningRequest, ReasoningService, ReasoningTask};
use futures::future::try_join_all;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::sync::Arc;
use xform_grammar::Directive;
use xform_ops::{Operation, OperationError, OperationKind, FontCatalog};

/// One step of a structured plan, before validation
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredStep {
    /// Operation the step invokes
    pub operation: OperationKind,
    /// Raw parameters as proposed
    pub params: Map<String, Value>,
}

impl StructuredStep {
    /// Create a step
    #[inline]
    #[must_use]
    pub fn new(operation: OperationKind, params: Map<String, Value>) -> Self {
        Self { operation, params }
    }
}

/// A step that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedStep {
    /// Operation of the source step
    pub kind: OperationKind,
    /// Directives in emission order
    pub directives: Vec<Directive>,
}

#[derive(Debug, Deserialize)]
struct PlanReply {
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    #[serde(alias = "method")]
    operation: String,
    #[serde(default, alias = "parameters", deserialize_with = "null_as_empty")]
    params: Map<String, Value>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Map<String, Value>, D::Error> {
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a plan reply, allowing only operations in `allowed`
pub fn parse_plan(reply: &str, allowed: &[OperationKind]) -> Result<Vec<StructuredStep>, PlanError> {
    let parsed: PlanReply =
        serde_json::from_str(strip_code_fence(reply)).map_err(|e| PlanError::Unparsable(e.to_string()))?;

    parsed
        .steps
        .into_iter()
        .enumerate()
        .map(|(step, raw)| {
            let operation = OperationKind::from_name(raw.operation.trim())
                .filter(|kind| allowed.contains(kind))
                .ok_or(PlanError::OutsideCandidates {
                    step,
                    operation: raw.operation,
                })?;
            Ok(StructuredStep::new(operation, raw.params))
        })
        .collect()
}

/// Turns a query and filtered manifest rows into a structured plan
pub struct PlanGenerator {
    reasoning: Arc<dyn ReasoningService>,
    model: String,
}

impl PlanGenerator {
    /// Create a generator using `model`
    #[must_use]
    pub fn new(reasoning: Arc<dyn ReasoningService>, model: impl Into<String>) -> Self {
        Self {
            reasoning,
            model: model.into(),
        }
    }

    /// Generate a plan over `rows`
    ///
    /// An empty plan means no deterministic plan is possible. Steps may carry
    /// parameters their validator does not accept; those are dropped later.
    pub async fn generate(&self, query: &str, rows: &[&ManifestEntry]) -> Result<Vec<StructuredStep>, ResolveError> {
        let request = ReasoningRequest::new(ReasoningTask::Planning, self.model.clone(), prompts::planning(query, rows));
        let reply = self
            .reasoning
            .complete(request)
            .await
            .map_err(|e| ResolveError::unavailable(Service::Reasoning, e))?;

        let allowed: Vec<OperationKind> = rows.iter().map(|row| row.operation).collect();
        let steps = parse_plan(&reply, &allowed)?;
        tracing::info!(steps = steps.len(), "generated structured plan");
        Ok(steps)
    }
}

impl std::fmt::Debug for PlanGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanGenerator")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Validate and normalize every step of a plan
///
/// Steps are checked synchronously in order first, so the first invalid step
/// is the one reported. Collaborator checks then run concurrently; output
/// keeps step order.
pub async fn validate_plan(
    steps: &[StructuredStep],
    fonts: &dyn FontCatalog,
) -> Result<Vec<ValidatedStep>, ResolveError> {
    let operations = steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            Operation::from_step(step.operation, &step.params)
                .map(|op| (index, op))
                .map_err(|source| ResolveError::Validation { step: index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let rendered = operations.into_iter().map(|(index, operation)| async move {
        let kind = operation.kind();
        match operation.into_directives(fonts).await {
            Ok(directives) => Ok(ValidatedStep { kind, directives }),
            Err(OperationError::Invalid(source)) => Err(ResolveError::Validation { step: index, source }),
            Err(OperationError::FontLookup { source, .. }) => Err(ResolveError::unavailable(Service::Fonts, source)),
        }
    });

    let validated = try_join_all(rendered).await?;
    tracing::info!(
        steps = validated.len(),
        directives = validated.iter().map(|s| s.directives.len()).sum::<usize>(),
        "validated structured plan"
    );
    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use xform_ops::{FontLookupError, ValidationError};

    struct Fonts(Result<bool, ()>);

    #[async_trait]
    impl FontCatalog for Fonts {
        async fn font_exists(&self, _path: &str) -> Result<bool, FontLookupError> {
            self.0.map_err(|()| FontLookupError::new("font service down"))
        }
    }

    fn step(operation: OperationKind, params: Value) -> StructuredStep {
        let Value::Object(params) = params else { panic!("object expected") };
        StructuredStep::new(operation, params)
    }

    #[test]
    fn parses_steps_in_order() {
        let reply = r#"{"steps": [
            {"operation": "resize_and_crop", "params": {"width": 300}},
            {"method": "ai_transform", "params": {"ai_upscale": true}}
        ]}"#;
        let steps = parse_plan(reply, &OperationKind::ALL).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].operation, OperationKind::ResizeAndCrop);
        assert_eq!(steps[1].operation, OperationKind::AiTransform);
        assert_eq!(steps[0].params["width"], json!(300));
    }

    #[test]
    fn null_or_missing_params_are_empty() {
        let reply = r#"{"steps": [
            {"operation": "effects_and_enhancement", "params": null},
            {"operation": "ai_transform"}
        ]}"#;
        let steps = parse_plan(reply, &OperationKind::ALL).unwrap();
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|s| s.params.is_empty()));
    }

    #[test]
    fn empty_plan_is_valid() {
        assert!(parse_plan(r#"{"steps": []}"#, &OperationKind::ALL).unwrap().is_empty());
    }

    #[test]
    fn rejects_operation_outside_candidates() {
        let reply = r#"{"steps": [{"operation": "text_overlay", "params": {"text": "hi"}}]}"#;
        let err = parse_plan(reply, &[OperationKind::ResizeAndCrop]).unwrap_err();
        assert!(matches!(err, PlanError::OutsideCandidates { step: 0, ref operation } if operation == "text_overlay"));
    }

    #[test]
    fn rejects_malformed_reply() {
        assert!(matches!(parse_plan("[]", &OperationKind::ALL), Err(PlanError::Unparsable(_))));
    }

    #[tokio::test]
    async fn validates_steps_in_order() {
        let steps = vec![
            step(OperationKind::ResizeAndCrop, json!({"width": 300, "height": 300})),
            step(OperationKind::AiTransform, json!({"ai_drop_shadow": true})),
        ];
        let validated = validate_plan(&steps, &Fonts(Ok(true))).await.unwrap();
        assert_eq!(validated.len(), 2);
        assert_eq!(validated[0].kind, OperationKind::ResizeAndCrop);
        assert_eq!(validated[1].directives.len(), 2);
    }

    #[tokio::test]
    async fn first_invalid_step_fails_the_plan() {
        let steps = vec![
            step(OperationKind::ResizeAndCrop, json!({"width": 300})),
            step(OperationKind::TextOverlay, json!({"font_size": 20})),
            step(OperationKind::EffectsAndEnhancement, json!({"blur": 500})),
        ];
        let err = validate_plan(&steps, &Fonts(Ok(true))).await.unwrap_err();
        match err {
            ResolveError::Validation { step, source } => {
                assert_eq!(step, 1);
                assert!(matches!(source, ValidationError::MissingField { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn font_service_failure_is_collaborator_failure() {
        let steps = vec![step(
            OperationKind::TextOverlay,
            json!({"text": "Sale", "font_family": "fonts/brand.ttf"}),
        )];
        let err = validate_plan(&steps, &Fonts(Err(()))).await.unwrap_err();
        assert!(err.is_collaborator_failure());
    }

    #[tokio::test]
    async fn missing_custom_font_is_validation_failure() {
        let steps = vec![step(
            OperationKind::TextOverlay,
            json!({"text": "Sale", "font_family": "fonts/brand.ttf"}),
        )];
        let err = validate_plan(&steps, &Fonts(Ok(false))).await.unwrap_err();
        assert_eq!(err.failed_operation(), Some(OperationKind::TextOverlay));
    }
}
