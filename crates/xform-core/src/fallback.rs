//! Documentation fallback extractor
//!
//! When no deterministic plan covers a request, relevant documentation is
//! retrieved and an extraction pass lists only the parameter/value pairs
//! that appear in it. The result is advisory: it never overrides a
//! structured directive and any failure to parse it degrades to an empty
//! set.
//!
//! # Workflow
//! 1. Pick documentation sources from the query's wording
//! 2. Embed and normalize the query, then run a hybrid search
//! 3. Group passages by source document, preserving reading order
//! 4. Ask the reasoning service for long-name/value pairs found in the text

use crate::config::RetrievalConfig;
use crate::error::{ExtractionParseError, ResolveError, Service};
use crate::prompts;
use crate::services::{
    strip_code_fence, DocPassage, DocSource, ReasoningRequest, ReasoningService, ReasoningTask, RetrievalService,
    SearchRequest,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

static SDK_TERMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:sdks?|language|python|javascript|java|php|ruby|react-native|react|angular|vue|vuejs|ios|android|nextjs)\b",
    )
    .expect("sdk term regex must compile")
});

static API_TERMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:api|endpoints?|rest|request|response|payload|parameters?|query param|headers?|https?|status code|authentication|public key|private key|signature|webhooks?|paginate|api key|purge)\b",
    )
    .expect("api term regex must compile")
});

/// Documentation sources to search for a query
///
/// The configured defaults are always included; SDK docs and the API
/// reference are added when the query mentions them.
#[must_use]
pub fn detect_sources(query: &str, defaults: &[DocSource]) -> Vec<DocSource> {
    let mut sources = defaults.to_vec();
    let mut add = |source| {
        if !sources.contains(&source) {
            sources.push(source);
        }
    };
    if SDK_TERMS.is_match(query) {
        add(DocSource::Sdk);
    }
    if API_TERMS.is_match(query) {
        add(DocSource::ApiReference);
    }
    sources
}

/// L2-normalize an embedding and round each component to 5 decimals
///
/// A zero vector is returned unchanged.
#[must_use]
pub fn normalize_vector(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return vector;
    }
    for v in &mut vector {
        *v = (*v / norm * 100_000.0).round() / 100_000.0;
    }
    vector
}

/// Passages of one source document
#[derive(Debug, Clone, PartialEq)]
pub struct DocGroup {
    /// Document URL
    pub source_url: String,
    /// Page title, taken from the first passage seen
    pub page_title: String,
    /// Page description, taken from the first passage seen
    pub page_description: String,
    /// Passages in document order
    pub passages: Vec<DocPassage>,
    best_score: f64,
}

impl DocGroup {
    /// Highest relevance score among the group's passages
    #[inline]
    #[must_use]
    pub fn best_score(&self) -> f64 {
        self.best_score
    }
}

/// Group passages by source document
///
/// Groups are ordered by their best score (ties keep first appearance);
/// passages inside a group by position. Passages without a URL are skipped.
#[must_use]
pub fn group_passages(passages: Vec<DocPassage>) -> Vec<DocGroup> {
    let mut groups: Vec<DocGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for passage in passages {
        if passage.source_url.trim().is_empty() {
            continue;
        }
        let slot = *index.entry(passage.source_url.clone()).or_insert_with(|| {
            groups.push(DocGroup {
                source_url: passage.source_url.clone(),
                page_title: passage.page_title.clone(),
                page_description: passage.page_description.clone(),
                passages: Vec::new(),
                best_score: f64::NEG_INFINITY,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.best_score = group.best_score.max(passage.score);
        group.passages.push(passage);
    }

    for group in &mut groups {
        group.passages.sort_by_key(|p| p.position);
    }
    // Stable sort keeps first appearance on ties
    groups.sort_by(|a, b| b.best_score.total_cmp(&a.best_score));
    groups
}

fn or_placeholder<'a>(text: &'a str, placeholder: &'a str) -> &'a str {
    let text = text.trim();
    if text.is_empty() {
        placeholder
    } else {
        text
    }
}

/// Render grouped passages as the extraction context
#[must_use]
pub fn render_context(groups: &[DocGroup]) -> String {
    groups
        .iter()
        .map(|group| {
            let content: String = group
                .passages
                .iter()
                .map(|p| {
                    let breadcrumb = p
                        .breadcrumb
                        .iter()
                        .map(|s| s.trim())
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>()
                        .join(" > ");
                    format!(
                        "\n## {}\n**Summary:** {}\n\n{}\n---\n",
                        or_placeholder(&breadcrumb, "(No Section Title)"),
                        or_placeholder(&p.summary, "(No summary)"),
                        p.content.trim(),
                    )
                })
                .collect();
            format!(
                "SOURCE: {}\nTITLE: {}\nDESCRIPTION: {}\n\nCONTENT:\n{}",
                group.source_url,
                group.page_title,
                group.page_description,
                content.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Long-name parameters extracted from documentation
///
/// Only scalar values are kept: nulls, empty strings, arrays and objects are
/// discarded on construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvisoryParams {
    params: Map<String, Value>,
}

impl AdvisoryParams {
    /// Empty advisory set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a long-name mapping, discarding non-scalar values
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        let params = map
            .into_iter()
            .filter(|(name, value)| {
                let keep = !name.trim().is_empty() && is_advisory_scalar(value);
                if !keep {
                    tracing::debug!(%name, "discarding non-scalar advisory value");
                }
                keep
            })
            .collect();
        Self { params }
    }

    /// Parse an extraction reply of the form `{"params": {...}}`
    pub fn from_reply(reply: &str) -> Result<Self, ExtractionParseError> {
        let value: Value =
            serde_json::from_str(strip_code_fence(reply)).map_err(|e| ExtractionParseError(e.to_string()))?;
        let Value::Object(mut object) = value else {
            return Err(ExtractionParseError("reply is not a JSON object".into()));
        };
        match object.remove("params") {
            None | Some(Value::Null) => Ok(Self::new()),
            Some(Value::Object(params)) => Ok(Self::from_map(params)),
            Some(_) => Err(ExtractionParseError("'params' is not an object".into())),
        }
    }

    /// Whether nothing was extracted
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of extracted parameters
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Extracted pairs in reply order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn is_advisory_scalar(value: &Value) -> bool {
    match value {
        Value::Bool(_) | Value::Number(_) => true,
        Value::String(s) => !s.trim().is_empty(),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

/// Retrieves documentation and extracts advisory parameters
pub struct FallbackExtractor {
    reasoning: Arc<dyn ReasoningService>,
    retrieval: Arc<dyn RetrievalService>,
    model: String,
    config: RetrievalConfig,
}

impl FallbackExtractor {
    /// Create an extractor
    #[must_use]
    pub fn new(
        reasoning: Arc<dyn ReasoningService>,
        retrieval: Arc<dyn RetrievalService>,
        model: impl Into<String>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            reasoning,
            retrieval,
            model: model.into(),
            config,
        }
    }

    /// Retrieve passages for `query`, grouped by document
    pub async fn retrieve(&self, query: &str) -> Result<Vec<DocGroup>, ResolveError> {
        let sources = detect_sources(query, &self.config.sources);
        let vector = self
            .retrieval
            .embed(query)
            .await
            .map_err(|e| ResolveError::unavailable(Service::Retrieval, e))?;

        let request = SearchRequest {
            query: query.to_string(),
            vector: normalize_vector(vector),
            sources,
            limit: self.config.limit,
        };
        tracing::debug!(sources = ?request.sources, limit = request.limit, "searching documentation");
        let passages = self
            .retrieval
            .search(&request)
            .await
            .map_err(|e| ResolveError::unavailable(Service::Retrieval, e))?;

        let groups = group_passages(passages);
        tracing::info!(documents = groups.len(), "retrieved documentation");
        Ok(groups)
    }

    /// Extract advisory parameters for `query`
    ///
    /// Transport failures are hard errors. An unusable extraction reply is
    /// logged and yields an empty set.
    pub async fn extract(&self, query: &str) -> Result<AdvisoryParams, ResolveError> {
        let groups = self.retrieve(query).await?;
        if groups.is_empty() {
            tracing::info!("no documentation found, skipping extraction");
            return Ok(AdvisoryParams::new());
        }

        let request = ReasoningRequest::new(
            ReasoningTask::Extraction,
            self.model.clone(),
            prompts::extraction(query, &render_context(&groups)),
        );
        let reply = self
            .reasoning
            .complete(request)
            .await
            .map_err(|e| ResolveError::unavailable(Service::Reasoning, e))?;

        match AdvisoryParams::from_reply(&reply) {
            Ok(params) => {
                tracing::info!(params = params.len(), "extracted advisory parameters");
                Ok(params)
            }
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unusable advisory extraction");
                Ok(AdvisoryParams::new())
            }
        }
    }
}

impl std::fmt::Debug for FallbackExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackExtractor")
            .field("model", &self.model)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::services::{MockReasoningService, MockRetrievalService};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn passage(url: &str, score: f64, position: u64, content: &str) -> DocPassage {
        DocPassage {
            source_url: url.into(),
            page_title: format!("title of {url}"),
            content: content.into(),
            score,
            position,
            ..DocPassage::default()
        }
    }

    #[test]
    fn defaults_always_searched() {
        let defaults = [DocSource::Guides, DocSource::Community];
        assert_eq!(detect_sources("make it blurry", &defaults), defaults.to_vec());
        assert_eq!(
            detect_sources("blur via the python sdk", &defaults),
            vec![DocSource::Guides, DocSource::Community, DocSource::Sdk]
        );
        assert_eq!(
            detect_sources("which API header sets blur", &defaults),
            vec![DocSource::Guides, DocSource::Community, DocSource::ApiReference]
        );
    }

    #[test]
    fn keywords_match_whole_words() {
        assert!(detect_sources("an interesting rapid edit", &[]).is_empty());
    }

    #[test]
    fn vector_is_unit_length_and_rounded() {
        let v = normalize_vector(vec![3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6 && (v[1] - 0.8).abs() < 1e-6);
        let v = normalize_vector(vec![1.0, 1.0, 1.0]);
        assert!(v.iter().all(|x| (*x - 0.57735).abs() < 1e-6));
    }

    #[test]
    fn zero_vector_unchanged() {
        assert_eq!(normalize_vector(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn groups_by_best_score_then_position() {
        let groups = group_passages(vec![
            passage("https://docs/a", 0.4, 7, "a-late"),
            passage("https://docs/b", 0.9, 3, "b-only"),
            passage("", 1.0, 0, "orphan"),
            passage("https://docs/a", 0.2, 1, "a-early"),
        ]);
        let urls: Vec<_> = groups.iter().map(|g| g.source_url.as_str()).collect();
        assert_eq!(urls, vec!["https://docs/b", "https://docs/a"]);
        let a: Vec<_> = groups[1].passages.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(a, vec!["a-early", "a-late"]);
        assert!((groups[1].best_score() - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn context_renders_blocks() {
        let mut p = passage("https://docs/a", 1.0, 0, "Use bg-FF0000.");
        p.breadcrumb = vec!["Resize".into(), "Padding".into()];
        p.summary = "Pad color".into();
        let context = render_context(&group_passages(vec![p, passage("https://docs/b", 0.5, 0, "other")]));
        assert!(context.starts_with("SOURCE: https://docs/a\nTITLE: title of https://docs/a"));
        assert!(context.contains("## Resize > Padding\n**Summary:** Pad color\n\nUse bg-FF0000.\n---"));
        assert!(context.contains("## (No Section Title)\n**Summary:** (No summary)"));
        assert!(context.contains("\n\n---\n\nSOURCE: https://docs/b"));
    }

    #[test]
    fn advisory_keeps_only_scalars() {
        let params = AdvisoryParams::from_reply(
            &json!({"params": {
                "background color": "FF0000",
                "width": 300,
                "grayscale": false,
                "height": null,
                "text": "",
                "border": {"width": 5},
                "flip": ["h"]
            }})
            .to_string(),
        )
        .unwrap();
        let names: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["background color", "width", "grayscale"]);
    }

    #[test]
    fn advisory_reply_shapes() {
        assert!(AdvisoryParams::from_reply("{}").unwrap().is_empty());
        assert!(AdvisoryParams::from_reply(r#"{"params": null}"#).unwrap().is_empty());
        assert!(AdvisoryParams::from_reply("not json").is_err());
        assert!(AdvisoryParams::from_reply(r#"{"params": [1]}"#).is_err());
        assert!(AdvisoryParams::from_reply("[]").is_err());
    }

    fn extractor(reasoning: MockReasoningService, retrieval: MockRetrievalService) -> FallbackExtractor {
        FallbackExtractor::new(Arc::new(reasoning), Arc::new(retrieval), "big", RetrievalConfig::default())
    }

    #[tokio::test]
    async fn no_passages_skips_extraction() {
        let mut retrieval = MockRetrievalService::new();
        retrieval.expect_embed().returning(|_| Ok(vec![1.0, 0.0]));
        retrieval.expect_search().times(1).returning(|_| Ok(vec![]));
        let mut reasoning = MockReasoningService::new();
        reasoning.expect_complete().never();

        let params = extractor(reasoning, retrieval).extract("sepia").await.unwrap();
        assert!(params.is_empty());
    }

    #[tokio::test]
    async fn search_uses_normalized_vector_and_limit() {
        let mut retrieval = MockRetrievalService::new();
        retrieval.expect_embed().returning(|_| Ok(vec![0.0, 2.0]));
        retrieval
            .expect_search()
            .withf(|request| request.vector == vec![0.0, 1.0] && request.limit == 10 && request.query == "pad color")
            .returning(|_| Ok(vec![passage("https://docs/pad", 1.0, 0, "bg-FF0000")]));
        let mut reasoning = MockReasoningService::new();
        reasoning
            .expect_complete()
            .withf(|request| request.task == ReasoningTask::Extraction && request.prompt.contains("bg-FF0000"))
            .returning(|_| Ok(r#"{"params": {"background color": "FF0000"}}"#.into()));

        let params = extractor(reasoning, retrieval).extract("pad color").await.unwrap();
        assert_eq!(params.len(), 1);
    }

    #[tokio::test]
    async fn unusable_reply_degrades_to_empty() {
        let mut retrieval = MockRetrievalService::new();
        retrieval.expect_embed().returning(|_| Ok(vec![1.0]));
        retrieval
            .expect_search()
            .returning(|_| Ok(vec![passage("https://docs/a", 1.0, 0, "text")]));
        let mut reasoning = MockReasoningService::new();
        reasoning.expect_complete().returning(|_| Ok("I could not find anything".into()));

        let params = extractor(reasoning, retrieval).extract("sepia").await.unwrap();
        assert!(params.is_empty());
    }

    #[tokio::test]
    async fn retrieval_failure_is_hard() {
        let mut retrieval = MockRetrievalService::new();
        retrieval
            .expect_embed()
            .returning(|_| Err(ServiceError::new("connection refused")));
        let err = extractor(MockReasoningService::new(), retrieval)
            .extract("sepia")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::CollaboratorUnavailable {
                service: Service::Retrieval,
                ..
            }
        ));
    }
}
