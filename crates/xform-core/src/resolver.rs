//! Resolution entry point

use crate::classifier::IntentClassifier;
use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::fallback::{AdvisoryParams, FallbackExtractor};
use crate::manifest::Manifest;
use crate::merge::PlanMerger;
use crate::planner::{validate_plan, PlanGenerator, ValidatedStep};
use crate::services::{ReasoningService, RetrievalService};
use std::sync::Arc;
use tracing::Instrument;
use xform_grammar::Directive;
use xform_ops::FontCatalog;

/// External services a resolver depends on
#[derive(Clone)]
pub struct Collaborators {
    /// Classification, planning and extraction
    pub reasoning: Arc<dyn ReasoningService>,
    /// Documentation search
    pub retrieval: Arc<dyn RetrievalService>,
    /// Custom font existence checks
    pub fonts: Arc<dyn FontCatalog>,
}

impl Collaborators {
    /// Bundle collaborators
    #[must_use]
    pub fn new(
        reasoning: Arc<dyn ReasoningService>,
        retrieval: Arc<dyn RetrievalService>,
        fonts: Arc<dyn FontCatalog>,
    ) -> Self {
        Self {
            reasoning,
            retrieval,
            fonts,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Turns free-text image-editing requests into ordered directives
///
/// Holds only immutable state, so one resolver can serve any number of
/// concurrent requests.
pub struct Resolver {
    config: ResolverConfig,
    manifest: Arc<Manifest>,
    classifier: IntentClassifier,
    planner: PlanGenerator,
    extractor: FallbackExtractor,
    merger: PlanMerger,
    fonts: Arc<dyn FontCatalog>,
}

impl Resolver {
    /// Create a resolver over an already loaded manifest
    #[must_use]
    pub fn new(config: ResolverConfig, manifest: Arc<Manifest>, collaborators: Collaborators) -> Self {
        let Collaborators {
            reasoning,
            retrieval,
            fonts,
        } = collaborators;
        Self {
            classifier: IntentClassifier::new(Arc::clone(&reasoning), config.models.classifier.clone()),
            planner: PlanGenerator::new(Arc::clone(&reasoning), config.models.planner.clone()),
            extractor: FallbackExtractor::new(
                reasoning,
                retrieval,
                config.models.extractor.clone(),
                config.retrieval.clone(),
            ),
            merger: PlanMerger::new(),
            fonts,
            manifest,
            config,
        }
    }

    /// Create a resolver, loading the configured manifest or the built-in one
    pub async fn from_config(config: ResolverConfig, collaborators: Collaborators) -> Result<Self, ResolveError> {
        let manifest = match &config.manifest_path {
            Some(path) => Manifest::load(path).await?,
            None => Manifest::builtin()?.clone(),
        };
        Ok(Self::new(config, Arc::new(manifest), collaborators))
    }

    /// Capability manifest in use
    #[inline]
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a free-text request into ordered directives
    ///
    /// # Workflow
    /// 1. Classify the query into candidate operations
    /// 2. Filter the manifest to those operations
    /// 3. Generate a structured plan and validate every step
    /// 4. Extract advisory parameters from documentation when the plan is
    ///    empty or (by default) intent was left unresolved
    /// 5. Merge, with structured directives taking precedence
    ///
    /// # Errors
    /// Classification, plan and validation failures abort the request, as do
    /// transport failures of any collaborator. An unusable extraction reply
    /// only empties the advisory set.
    pub async fn resolve(&self, query: &str) -> Result<Vec<Directive>, ResolveError> {
        let span = tracing::info_span!("resolve", query_len = query.len());
        self.resolve_inner(query).instrument(span).await
    }

    async fn resolve_inner(&self, query: &str) -> Result<Vec<Directive>, ResolveError> {
        tracing::info!("resolving transformation request");

        let candidates = self.classifier.classify(query, &self.manifest).await?;
        let rows = self.manifest.filter(&candidates);
        tracing::info!(rows = rows.len(), "filtered capability manifest");

        let structured: Vec<ValidatedStep> = if rows.is_empty() {
            Vec::new()
        } else {
            let steps = self.planner.generate(query, &rows).await?;
            validate_plan(&steps, self.fonts.as_ref()).await?
        };

        let plan_is_empty = structured.is_empty();
        let advisory = if self
            .config
            .fallback
            .should_run(plan_is_empty, candidates.has_unresolved_intent())
        {
            let search_query = candidates.unresolved_intent.as_deref().unwrap_or(query);
            tracing::info!(
                plan_is_empty,
                unresolved = candidates.has_unresolved_intent(),
                "falling back to documentation"
            );
            self.extractor.extract(search_query).await?
        } else {
            AdvisoryParams::new()
        };

        let directives = self.merger.merge(structured, &advisory);
        tracing::info!(directives = directives.len(), "resolved transformation request");
        Ok(directives)
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("config", &self.config)
            .field("operations", &self.manifest.len())
            .finish_non_exhaustive()
    }
}
