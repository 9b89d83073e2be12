//! External collaborators
//!
//! The engine never talks to a network itself. Reasoning (classification,
//! planning, extraction) and documentation retrieval are reached through
//! these traits; font checks go through [`xform_ops::FontCatalog`].

use crate::error::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// System instruction sent with every reasoning request
pub const JSON_ONLY_INSTRUCTION: &str = "You output JSON only.";

/// What a reasoning request is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningTask {
    /// Narrow the manifest to candidate operations
    Classification,
    /// Produce the structured plan
    Planning,
    /// Extract advisory parameters from documentation
    Extraction,
}

impl fmt::Display for ReasoningTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Classification => "classification",
            Self::Planning => "planning",
            Self::Extraction => "extraction",
        })
    }
}

/// One reasoning call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReasoningRequest {
    /// Task kind
    pub task: ReasoningTask,
    /// Configured model identifier
    pub model: String,
    /// System instruction
    pub system: &'static str,
    /// Rendered prompt
    pub prompt: String,
}

impl ReasoningRequest {
    /// Create a request with the JSON-only instruction
    #[inline]
    #[must_use]
    pub fn new(task: ReasoningTask, model: impl Into<String>, prompt: String) -> Self {
        Self {
            task,
            model: model.into(),
            system: JSON_ONLY_INSTRUCTION,
            prompt,
        }
    }
}

/// Reasoning collaborator
///
/// Returns the raw reply text, expected to hold exactly one JSON object.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Run one request
    async fn complete(&self, request: ReasoningRequest) -> Result<String, ServiceError>;
}

/// Documentation collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocSource {
    /// Product guides
    Guides,
    /// Community forum answers
    Community,
    /// REST API reference
    ApiReference,
    /// SDK documentation
    Sdk,
}

impl DocSource {
    /// Wire name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guides => "guides",
            Self::Community => "community",
            Self::ApiReference => "api_reference",
            Self::Sdk => "sdk",
        }
    }
}

impl fmt::Display for DocSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hybrid (lexical + semantic) search request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    /// Query text for the lexical half
    pub query: String,
    /// Normalized query embedding for the semantic half
    pub vector: Vec<f32>,
    /// Collections to search
    pub sources: Vec<DocSource>,
    /// Maximum passages
    pub limit: usize,
}

/// One ranked documentation passage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocPassage {
    /// Source document URL
    pub source_url: String,
    /// Page title
    pub page_title: String,
    /// Page description
    pub page_description: String,
    /// Section headings, outermost first
    pub breadcrumb: Vec<String>,
    /// Section summary
    pub summary: String,
    /// Section text
    pub content: String,
    /// Fused relevance score, higher is better
    pub score: f64,
    /// Position of the section in its document
    pub position: u64,
}

/// Retrieval collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RetrievalService: Send + Sync {
    /// Embed a query
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;

    /// Run a hybrid search
    async fn search(&self, request: &SearchRequest) -> Result<Vec<DocPassage>, ServiceError>;
}

/// Strip a surrounding Markdown code fence from a reply
#[must_use]
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_suffix("```").unwrap_or(body);
    // Drop a language tag such as `json`
    match body.split_once('\n') {
        Some((tag, rest)) if !tag.trim_start().starts_with('{') => rest.trim(),
        _ => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```{\"a\": 1}```"), "{\"a\": 1}");
    }

    #[test]
    fn sources_use_snake_case() {
        assert_eq!(serde_json::to_value(DocSource::ApiReference).unwrap(), "api_reference");
        assert_eq!(DocSource::Sdk.to_string(), "sdk");
    }

    #[test]
    fn requests_carry_json_instruction() {
        let request = ReasoningRequest::new(ReasoningTask::Planning, "m", "p".into());
        assert_eq!(request.system, JSON_ONLY_INSTRUCTION);
    }
}
