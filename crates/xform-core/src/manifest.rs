//! Capability manifest and metadata filter
//!
//! The manifest is read once per process and never mutated. Every entry is
//! checked against its validator's accepted field set at load time, so the
//! plan generator is never shown a parameter the validator would drop.

use crate::classifier::CandidateSet;
use crate::error::ManifestError;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use xform_ops::OperationKind;

const BUILTIN_MANIFEST: &str = include_str!("manifest.yaml");

static BUILTIN: OnceCell<Manifest> = OnceCell::new();

/// Documented parameter of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterDoc {
    /// Raw field name
    pub name: String,
    /// Shown to the plan generator
    #[serde(default)]
    pub description: String,
}

/// One manifest row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    /// Operation
    pub operation: OperationKind,
    /// Short description
    pub description: String,
    /// Classification tags
    pub tags: Vec<String>,
    /// Declared parameters
    pub parameters: Vec<ParameterDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    parameters: Vec<ParameterDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    operations: Vec<RawEntry>,
}

/// Immutable table of plannable operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Built-in manifest, parsed on first use
    pub fn builtin() -> Result<&'static Self, ManifestError> {
        BUILTIN.get_or_try_init(|| Self::from_yaml_str(BUILTIN_MANIFEST))
    }

    /// Parse and check a YAML manifest
    pub fn from_yaml_str(text: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest = serde_yaml::from_str(text)?;
        if raw.operations.is_empty() {
            return Err(ManifestError::Empty);
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(raw.operations.len());
        for entry in raw.operations {
            let operation = OperationKind::from_name(entry.name.trim())
                .ok_or_else(|| ManifestError::UnknownOperation(entry.name.clone()))?;
            if !seen.insert(operation) {
                return Err(ManifestError::Duplicate(operation));
            }
            let accepted = operation.accepted_fields();
            if let Some(unknown) = entry
                .parameters
                .iter()
                .find(|p| !accepted.contains(&p.name.as_str()))
            {
                return Err(ManifestError::UnknownParameter {
                    operation,
                    parameter: unknown.name.clone(),
                });
            }
            entries.push(ManifestEntry {
                operation,
                description: entry.description,
                tags: entry.tags,
                parameters: entry.parameters,
            });
        }
        Ok(Self { entries })
    }

    /// Read and check a YAML manifest file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let manifest = Self::from_yaml_str(&text)?;
        tracing::info!(path = %path.display(), operations = manifest.len(), "loaded capability manifest");
        Ok(manifest)
    }

    /// All rows, in declaration order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Number of operations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Row for an operation
    #[must_use]
    pub fn get(&self, operation: OperationKind) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.operation == operation)
    }

    /// Row for an operation name
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ManifestEntry> {
        OperationKind::from_name(name.trim()).and_then(|op| self.get(op))
    }

    /// Metadata filter: rows named by the candidate set, or every row when it is empty
    #[must_use]
    pub fn filter(&self, candidates: &CandidateSet) -> Vec<&ManifestEntry> {
        if candidates.operations.is_empty() {
            return self.entries.iter().collect();
        }
        self.entries
            .iter()
            .filter(|e| candidates.operations.contains(&e.operation))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn builtin_covers_every_operation() {
        let manifest = Manifest::builtin().unwrap();
        for kind in OperationKind::ALL {
            let entry = manifest.get(kind).unwrap();
            assert!(!entry.parameters.is_empty(), "{kind}");
        }
    }

    #[test]
    fn builtin_is_shared() {
        let a = Manifest::builtin().unwrap();
        let b = Manifest::builtin().unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn unknown_parameter_rejected() {
        let yaml = "operations:\n  - name: effects_and_enhancement\n    parameters:\n      - name: sepia\n";
        assert!(matches!(
            Manifest::from_yaml_str(yaml),
            Err(ManifestError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn unknown_and_duplicate_operations_rejected() {
        assert!(matches!(
            Manifest::from_yaml_str("operations:\n  - name: video_trim\n"),
            Err(ManifestError::UnknownOperation(_))
        ));
        assert!(matches!(
            Manifest::from_yaml_str("operations:\n  - name: ai_transform\n  - name: ai_transform\n"),
            Err(ManifestError::Duplicate(OperationKind::AiTransform))
        ));
        assert!(matches!(
            Manifest::from_yaml_str("operations: []\n"),
            Err(ManifestError::Empty)
        ));
    }

    #[test]
    fn filter_keeps_named_rows() {
        let manifest = Manifest::builtin().unwrap();
        let candidates = CandidateSet {
            operations: BTreeSet::from([OperationKind::TextOverlay, OperationKind::ResizeAndCrop]),
            unresolved_intent: None,
        };
        let rows: Vec<_> = manifest.filter(&candidates).iter().map(|e| e.operation).collect();
        assert_eq!(rows, vec![OperationKind::ResizeAndCrop, OperationKind::TextOverlay]);
    }

    #[test]
    fn empty_candidates_mean_unconstrained() {
        let manifest = Manifest::builtin().unwrap();
        assert_eq!(manifest.filter(&CandidateSet::default()).len(), manifest.len());
    }
}
