//! Resolver configuration
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! fallback = "on_empty_plan"
//!
//! [models]
//! planner = "gpt-4.1"
//!
//! [retrieval]
//! limit = 5
//! sources = ["guides", "sdk"]
//! ```

use crate::error::ConfigError;
use crate::services::DocSource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// When the documentation fallback runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackTrigger {
    /// Plan is empty, or the classifier reported unresolved intent
    #[default]
    OnEmptyOrUnresolved,
    /// Only when the plan is empty
    OnEmptyPlan,
}

impl FallbackTrigger {
    /// Whether the fallback should run for this request
    #[inline]
    #[must_use]
    pub fn should_run(self, plan_is_empty: bool, has_unresolved_intent: bool) -> bool {
        match self {
            Self::OnEmptyOrUnresolved => plan_is_empty || has_unresolved_intent,
            Self::OnEmptyPlan => plan_is_empty,
        }
    }
}

/// Model identifiers passed to the reasoning service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Intent classification
    pub classifier: String,
    /// Structured plan generation
    pub planner: String,
    /// Advisory parameter extraction
    pub extractor: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            classifier: "gpt-4.1-mini".to_string(),
            planner: "gpt-4.1".to_string(),
            extractor: "gpt-4.1".to_string(),
        }
    }
}

/// Documentation retrieval settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Passages requested per search
    pub limit: usize,
    /// Sources always searched
    pub sources: Vec<DocSource>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            sources: vec![DocSource::Guides, DocSource::Community],
        }
    }
}

/// Resolver configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Fallback trigger
    pub fallback: FallbackTrigger,
    /// Manifest file replacing the built-in manifest
    pub manifest_path: Option<PathBuf>,
    /// Reasoning models
    pub models: ModelConfig,
    /// Documentation retrieval
    pub retrieval: RetrievalConfig,
}

impl ResolverConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded resolver config");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.retrieval.limit == 0 {
            return Err(ConfigError::Invalid {
                field: "retrieval.limit",
                reason: "must be at least 1".to_string(),
            });
        }
        for (field, model) in [
            ("models.classifier", &self.models.classifier),
            ("models.planner", &self.models.planner),
            ("models.extractor", &self.models.extractor),
        ] {
            if model.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// With fallback trigger
    #[inline]
    #[must_use]
    pub fn with_fallback(mut self, fallback: FallbackTrigger) -> Self {
        self.fallback = fallback;
        self
    }

    /// With retrieval limit
    #[inline]
    #[must_use]
    pub fn with_retrieval_limit(mut self, limit: usize) -> Self {
        self.retrieval.limit = limit;
        self
    }

    /// With default documentation sources
    #[inline]
    #[must_use]
    pub fn with_sources(mut self, sources: Vec<DocSource>) -> Self {
        self.retrieval.sources = sources;
        self
    }

    /// With manifest file
    #[inline]
    #[must_use]
    pub fn with_manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = Some(path.into());
        self
    }

    /// With reasoning models
    #[inline]
    #[must_use]
    pub fn with_models(mut self, models: ModelConfig) -> Self {
        self.models = models;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(ResolverConfig::from_toml_str("").unwrap(), ResolverConfig::default());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = ResolverConfig::from_toml_str(
            r#"
            fallback = "on_empty_plan"

            [retrieval]
            sources = ["sdk"]
            "#,
        )
        .unwrap();
        assert_eq!(config.fallback, FallbackTrigger::OnEmptyPlan);
        assert_eq!(config.retrieval.sources, vec![DocSource::Sdk]);
        assert_eq!(config.retrieval.limit, 10);
        assert_eq!(config.models, ModelConfig::default());
    }

    #[test]
    fn rejects_unknown_and_invalid_values() {
        assert!(ResolverConfig::from_toml_str("colour = 1").is_err());
        assert!(ResolverConfig::from_toml_str("[retrieval]\nlimit = 0").is_err());
        assert!(ResolverConfig::from_toml_str("[models]\nplanner = \" \"").is_err());
    }

    #[test]
    fn trigger_policy() {
        assert!(FallbackTrigger::OnEmptyOrUnresolved.should_run(false, true));
        assert!(!FallbackTrigger::OnEmptyPlan.should_run(false, true));
        assert!(FallbackTrigger::OnEmptyPlan.should_run(true, false));
        assert!(!FallbackTrigger::OnEmptyOrUnresolved.should_run(false, false));
    }

    #[test]
    fn effective_config_renders_as_toml() {
        let config = ResolverConfig::new().with_manifest_path("ops.yaml");
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(rendered.contains("fallback = \"on_empty_or_unresolved\""));
        assert_eq!(ResolverConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[tokio::test]
    async fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xform.toml");
        tokio::fs::write(&path, "[models]\nclassifier = \"small\"\n").await.unwrap();
        let config = ResolverConfig::load(&path).await.unwrap();
        assert_eq!(config.models.classifier, "small");

        let missing = ResolverConfig::load(dir.path().join("absent.toml")).await;
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
