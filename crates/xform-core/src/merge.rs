//! Plan merger
//!
//! Structured directives are authoritative. Advisory parameters are
//! translated to short keys and appended as one extra directive, keeping
//! only keys no structured directive already sets.

use crate::fallback::AdvisoryParams;
use crate::planner::ValidatedStep;
use serde_json::Value;
use std::collections::HashSet;
use xform_grammar::{Directive, DirectiveValue};
use xform_ops::short_key;

/// Combines validated steps with advisory parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanMerger;

impl PlanMerger {
    /// Create a merger
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Merge structured steps and advisory parameters into the final directives
    ///
    /// Every structured directive is kept as its own entry, in step order.
    /// The translated advisory directive, if non-empty, comes last.
    #[must_use]
    pub fn merge(&self, structured: Vec<ValidatedStep>, advisory: &AdvisoryParams) -> Vec<Directive> {
        let mut directives: Vec<Directive> = structured.into_iter().flat_map(|step| step.directives).collect();

        let taken: HashSet<&str> = directives.iter().flat_map(Directive::keys).collect();
        let extra = translate_advisory(advisory, &taken);
        if !extra.is_empty() {
            tracing::info!(keys = extra.len(), "appending advisory directive");
            directives.push(extra);
        }
        directives
    }
}

/// Translate advisory long names to short keys, skipping keys in `taken`
///
/// Unknown names are dropped. When two names map to the same short key the
/// first one wins.
#[must_use]
pub fn translate_advisory(advisory: &AdvisoryParams, taken: &HashSet<&str>) -> Directive {
    let mut directive = Directive::new();
    for (name, value) in advisory.iter() {
        let Some(key) = short_key(name) else {
            tracing::debug!(%name, "dropping advisory parameter with no short key");
            continue;
        };
        if taken.contains(key) {
            tracing::debug!(%name, key, "advisory parameter overridden by structured plan");
            continue;
        }
        if directive.contains_key(key) {
            continue;
        }
        if let Some(value) = advisory_value(value) {
            directive.insert(key, value);
        }
    }
    directive
}

fn advisory_value(value: &Value) -> Option<DirectiveValue> {
    match value {
        Value::Bool(b) => Some(DirectiveValue::Bool(*b)),
        Value::Number(n) => Some(
            n.as_i64()
                .map_or_else(|| DirectiveValue::Text(n.to_string()), DirectiveValue::Integer),
        ),
        Value::String(s) => Some(DirectiveValue::Text(s.trim().to_string())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
