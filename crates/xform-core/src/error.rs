//! Error types for the resolution engine
//!
//! Provides error handling for:
//! - Classifier and plan replies that cannot be used
//! - Step validation failures
//! - Collaborator transport failures
//! - Manifest and configuration loading

use std::fmt;
use std::path::PathBuf;
use xform_ops::{OperationKind, ValidationError};

/// Failure of one resolution
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Classifier reply unusable
    #[error("classification failed: {0}")]
    Classification(#[from] ClassificationError),

    /// Plan reply unusable
    #[error("plan generation failed: {0}")]
    Plan(#[from] PlanError),

    /// A plan step violates its operation's constraints
    #[error("step {step} is invalid: {source}")]
    Validation {
        /// Zero-based index of the step in the plan
        step: usize,
        /// The violated constraint
        #[source]
        source: ValidationError,
    },

    /// An external service failed at the transport level
    #[error("{service} service unavailable: {message}")]
    CollaboratorUnavailable {
        /// Which collaborator failed
        service: Service,
        /// Transport error description
        message: String,
    },

    /// Capability manifest could not be loaded
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),
}

impl ResolveError {
    /// Wrap a collaborator transport failure
    #[inline]
    pub fn unavailable(service: Service, error: impl fmt::Display) -> Self {
        Self::CollaboratorUnavailable {
            service,
            message: error.to_string(),
        }
    }

    /// Check if the failure came from an external service
    #[inline]
    #[must_use]
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(self, Self::CollaboratorUnavailable { .. })
    }

    /// Operation whose step failed validation, if any
    #[must_use]
    pub fn failed_operation(&self) -> Option<OperationKind> {
        match self {
            Self::Validation { source, .. } => Some(source.operation()),
            _ => None,
        }
    }
}

/// External collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Classification, planning and extraction
    Reasoning,
    /// Documentation search and embeddings
    Retrieval,
    /// Custom font existence checks
    Fonts,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reasoning => "reasoning",
            Self::Retrieval => "retrieval",
            Self::Fonts => "font",
        })
    }
}

/// Transport-level failure reported by a collaborator implementation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ServiceError {
    /// Description of the failure
    pub message: String,
}

impl ServiceError {
    /// Create from a message
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Classifier reply errors
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    /// Reply is not the expected JSON object
    #[error("unparsable classifier reply: {0}")]
    Unparsable(String),

    /// Reply names an operation the manifest does not declare
    #[error("classifier returned unknown operation '{0}'")]
    OutOfManifest(String),
}

/// Plan reply errors
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Reply is not the expected JSON object
    #[error("unparsable plan reply: {0}")]
    Unparsable(String),

    /// A step names an operation outside the filtered candidates
    #[error("step {step} uses operation '{operation}' outside the candidate set")]
    OutsideCandidates {
        /// Zero-based step index
        step: usize,
        /// Operation name as returned
        operation: String,
    },
}

/// Advisory extraction reply is not usable
///
/// Never surfaced to callers: advisory output degrades to an empty set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unparsable extraction reply: {0}")]
pub struct ExtractionParseError(pub String);

/// Capability manifest errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Manifest file could not be read
    #[error("failed to read manifest {path}: {source}")]
    Io {
        /// Manifest path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Manifest is not valid YAML of the expected shape
    #[error("invalid manifest: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Manifest declares no operations
    #[error("manifest declares no operations")]
    Empty,

    /// Entry names an operation with no validator
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// Operation declared twice
    #[error("operation '{0}' declared more than once")]
    Duplicate(OperationKind),

    /// Declared parameter is not accepted by the operation's validator
    #[error("operation '{operation}' declares parameter '{parameter}' its validator does not accept")]
    UnknownParameter {
        /// Operation
        operation: OperationKind,
        /// Parameter name
        parameter: String,
    },
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration is not valid TOML of the expected shape
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its allowed range
    #[error("invalid config value for '{field}': {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_failures_are_flagged() {
        let err = ResolveError::unavailable(Service::Retrieval, ServiceError::new("connection reset"));
        assert!(err.is_collaborator_failure());
        assert_eq!(err.to_string(), "retrieval service unavailable: connection reset");
    }

    #[test]
    fn validation_failure_names_operation() {
        let err = ResolveError::Validation {
            step: 1,
            source: ValidationError::MissingField {
                operation: OperationKind::TextOverlay,
                field: "text".into(),
            },
        };
        assert_eq!(err.failed_operation(), Some(OperationKind::TextOverlay));
        assert!(err.to_string().contains("text_overlay"));
    }
}
