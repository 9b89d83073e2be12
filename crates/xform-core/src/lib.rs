//! xform core - the transformation resolution engine
//!
//! Turns a free-text image-editing request into a validated, ordered list of
//! short-key directives.
//!
//! # Architecture
//!
//! ```text
//! query -> IntentClassifier -> Manifest::filter -> PlanGenerator
//!       -> validators (xform-ops) -> [FallbackExtractor] -> PlanMerger
//! ```
//!
//! Reasoning and retrieval are reached through [`ReasoningService`] and
//! [`RetrievalService`]; custom fonts through [`xform_ops::FontCatalog`].
//!
//! # Example
//!
//! ```rust,ignore
//! use xform_core::{Collaborators, Resolver, ResolverConfig};
//!
//! let resolver = Resolver::from_config(ResolverConfig::new(), collaborators).await?;
//! let directives = resolver.resolve("crop to a square around the face").await?;
//! println!("{}", serde_json::to_string(&directives)?);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod classifier;
pub mod config;
pub mod error;
pub mod fallback;
pub mod manifest;
pub mod merge;
pub mod planner;
pub mod prompts;
pub mod resolver;
pub mod services;

pub use classifier::{CandidateSet, IntentClassifier};
pub use config::{FallbackTrigger, ModelConfig, ResolverConfig, RetrievalConfig};
pub use error::{
    ClassificationError, ConfigError, ExtractionParseError, ManifestError, PlanError, ResolveError, Service,
    ServiceError,
};
pub use fallback::{AdvisoryParams, FallbackExtractor};
pub use manifest::{Manifest, ManifestEntry, ParameterDoc};
pub use merge::PlanMerger;
pub use planner::{parse_plan, validate_plan, PlanGenerator, StructuredStep, ValidatedStep};
pub use resolver::{Collaborators, Resolver};
pub use services::{
    DocPassage, DocSource, ReasoningRequest, ReasoningService, ReasoningTask, RetrievalService, SearchRequest,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for resolving requests
    pub use crate::error::ResolveError;
    pub use crate::resolver::{Collaborators, Resolver};
    pub use crate::services::{ReasoningService, RetrievalService};
    pub use crate::config::ResolverConfig;
    pub use xform_grammar::{Directive, DirectiveValue};
    pub use xform_ops::FontCatalog;
}
