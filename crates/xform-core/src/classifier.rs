//! Intent classifier

use crate::error::{ClassificationError, ResolveError, Service};
use crate::manifest::Manifest;
use crate::prompts;
use crate::services::{strip_code_fence, ReasoningRequest, ReasoningService, ReasoningTask};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use xform_ops::OperationKind;

/// Operations a query may need, plus what none of them can do
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    /// Candidate operations; empty means unconstrained
    pub operations: BTreeSet<OperationKind>,
    /// Part of the request no operation covers
    pub unresolved_intent: Option<String>,
}

impl CandidateSet {
    /// Whether the classifier reported unresolved intent
    #[inline]
    #[must_use]
    pub fn has_unresolved_intent(&self) -> bool {
        self.unresolved_intent.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct ClassificationReply {
    #[serde(alias = "methods")]
    operations: Vec<String>,
    #[serde(default)]
    unresolved_intent: Option<String>,
}

/// Parse a classifier reply against the manifest
pub fn parse_classification(reply: &str, manifest: &Manifest) -> Result<CandidateSet, ClassificationError> {
    let parsed: ClassificationReply = serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| ClassificationError::Unparsable(e.to_string()))?;

    let mut operations = BTreeSet::new();
    for name in parsed.operations {
        let entry = manifest
            .lookup(&name)
            .ok_or_else(|| ClassificationError::OutOfManifest(name.clone()))?;
        operations.insert(entry.operation);
    }

    let unresolved_intent = parsed
        .unresolved_intent
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(CandidateSet {
        operations,
        unresolved_intent,
    })
}

/// Narrows the manifest to candidate operations for a query
pub struct IntentClassifier {
    reasoning: Arc<dyn ReasoningService>,
    model: String,
}

impl IntentClassifier {
    /// Create a classifier using `model`
    #[must_use]
    pub fn new(reasoning: Arc<dyn ReasoningService>, model: impl Into<String>) -> Self {
        Self {
            reasoning,
            model: model.into(),
        }
    }

    /// Classify a query
    pub async fn classify(&self, query: &str, manifest: &Manifest) -> Result<CandidateSet, ResolveError> {
        let request = ReasoningRequest::new(
            ReasoningTask::Classification,
            self.model.clone(),
            prompts::classification(query, manifest),
        );
        let reply = self
            .reasoning
            .complete(request)
            .await
            .map_err(|e| ResolveError::unavailable(Service::Reasoning, e))?;

        let candidates = parse_classification(&reply, manifest)?;
        tracing::info!(
            operations = ?candidates.operations,
            unresolved = candidates.has_unresolved_intent(),
            "classified query"
        );
        Ok(candidates)
    }
}

impl std::fmt::Debug for IntentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentClassifier")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockReasoningService;

    fn manifest() -> &'static Manifest {
        Manifest::builtin().unwrap()
    }

    #[test]
    fn parses_operations_and_intent() {
        let set = parse_classification(
            r#"{"operations": ["resize_and_crop", "ai_transform"], "unresolved_intent": "make it sepia"}"#,
            manifest(),
        )
        .unwrap();
        assert_eq!(
            set.operations,
            BTreeSet::from([OperationKind::ResizeAndCrop, OperationKind::AiTransform])
        );
        assert_eq!(set.unresolved_intent.as_deref(), Some("make it sepia"));
    }

    #[test]
    fn blank_intent_is_none() {
        let set = parse_classification(r#"{"operations": [], "unresolved_intent": "  "}"#, manifest()).unwrap();
        assert!(set.operations.is_empty());
        assert!(!set.has_unresolved_intent());
    }

    #[test]
    fn out_of_manifest_is_an_error() {
        let err = parse_classification(r#"{"operations": ["video_trim"]}"#, manifest()).unwrap_err();
        assert!(matches!(err, ClassificationError::OutOfManifest(name) if name == "video_trim"));
    }

    #[test]
    fn malformed_reply_is_an_error() {
        assert!(matches!(
            parse_classification("resize_and_crop", manifest()),
            Err(ClassificationError::Unparsable(_))
        ));
        assert!(matches!(
            parse_classification(r#"{"unresolved_intent": null}"#, manifest()),
            Err(ClassificationError::Unparsable(_))
        ));
    }

    #[tokio::test]
    async fn classify_sends_classification_request() {
        let mut reasoning = MockReasoningService::new();
        reasoning
            .expect_complete()
            .withf(|request| request.task == ReasoningTask::Classification && request.model == "small")
            .times(1)
            .returning(|_| Ok(r#"{"operations": ["effects_and_enhancement"], "unresolved_intent": null}"#.into()));

        let classifier = IntentClassifier::new(Arc::new(reasoning), "small");
        let set = classifier.classify("blur it", manifest()).await.unwrap();
        assert_eq!(set.operations, BTreeSet::from([OperationKind::EffectsAndEnhancement]));
    }

    #[tokio::test]
    async fn transport_failure_is_collaborator_failure() {
        let mut reasoning = MockReasoningService::new();
        reasoning
            .expect_complete()
            .returning(|_| Err(crate::error::ServiceError::new("timeout")));

        let classifier = IntentClassifier::new(Arc::new(reasoning), "small");
        let err = classifier.classify("blur it", manifest()).await.unwrap_err();
        assert!(err.is_collaborator_failure());
    }

    #[test]
    fn fenced_reply_accepted() {
        let set = parse_classification("```json\n{\"operations\": [\"text_overlay\"]}\n```", manifest()).unwrap();
        assert!(set.operations.contains(&OperationKind::TextOverlay));
    }
}
