//! Error types for operation validation
//!
//! Every [`ValidationError`] names the operation and the offending field
//! (dotted for nested objects, e.g. `shadow.blur`) together with the
//! violated constraint.

use crate::font::FontLookupError;
use crate::kind::OperationKind;
use xform_grammar::GrammarError;

/// A raw parameter set violates its operation's constraints
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Required field absent or empty
    #[error("{operation}: missing required field '{field}'")]
    MissingField {
        operation: OperationKind,
        field: String,
    },

    /// Field has the wrong JSON type
    #[error("{operation}: field '{field}' expected {expected}, found {found}")]
    InvalidType {
        operation: OperationKind,
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Value outside an enumeration
    #[error("{operation}: field '{field}' must be one of [{allowed}], got '{value}'")]
    NotAllowed {
        operation: OperationKind,
        field: String,
        value: String,
        allowed: String,
    },

    /// Numeric value outside its range
    #[error("{operation}: field '{field}' out of range: {constraint}")]
    OutOfRange {
        operation: OperationKind,
        field: String,
        constraint: String,
    },

    /// Two mutually exclusive fields are both set
    #[error("{operation}: fields '{field}' and '{other}' are mutually exclusive")]
    Conflict {
        operation: OperationKind,
        field: String,
        other: String,
    },

    /// Field set without its prerequisite
    #[error("{operation}: field '{field}' requires {requirement}")]
    Requires {
        operation: OperationKind,
        field: String,
        requirement: String,
    },

    /// Malformed scalar, color or background
    #[error("{operation}: field '{field}': {source}")]
    Grammar {
        operation: OperationKind,
        field: String,
        #[source]
        source: GrammarError,
    },

    /// More than one nested overlay supplied
    #[error("{operation}: field '{field}' accepts exactly one nested overlay")]
    TooManyChildren {
        operation: OperationKind,
        field: String,
    },

    /// Custom font path is not known to the font service
    #[error("{operation}: font '{path}' does not exist")]
    FontNotFound {
        operation: OperationKind,
        path: String,
    },
}

impl ValidationError {
    /// Operation whose constraints were violated
    #[must_use]
    pub fn operation(&self) -> OperationKind {
        match self {
            Self::MissingField { operation, .. }
            | Self::InvalidType { operation, .. }
            | Self::NotAllowed { operation, .. }
            | Self::OutOfRange { operation, .. }
            | Self::Conflict { operation, .. }
            | Self::Requires { operation, .. }
            | Self::Grammar { operation, .. }
            | Self::TooManyChildren { operation, .. }
            | Self::FontNotFound { operation, .. } => *operation,
        }
    }

    /// Offending field name
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field, .. }
            | Self::InvalidType { field, .. }
            | Self::NotAllowed { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::Conflict { field, .. }
            | Self::Requires { field, .. }
            | Self::Grammar { field, .. }
            | Self::TooManyChildren { field, .. } => field,
            Self::FontNotFound { .. } => "font_family",
        }
    }
}

/// Failure while validating and normalizing one step
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// Step violates its constraints
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The font service could not be reached
    #[error("{operation}: font lookup failed: {source}")]
    FontLookup {
        operation: OperationKind,
        #[source]
        source: FontLookupError,
    },
}

impl OperationError {
    /// Whether the failure came from an external collaborator
    #[inline]
    #[must_use]
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(self, Self::FontLookup { .. })
    }
}
