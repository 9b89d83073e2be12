//! Property tests for plan merging

use proptest::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashSet;
use xform_core::{AdvisoryParams, PlanMerger, ValidatedStep};
use xform_grammar::Directive;
use xform_ops::{short_key, OperationKind};

const LONG_NAMES: &[&str] = &[
    "width",
    "height",
    "background color",
    "background",
    "blur",
    "opacity",
    "rotation",
    "flip",
    "Aspect Ratio",
    "crop-mode",
    "focus",
    "grayscale",
    "radius",
    "quality",
];

fn structured_step() -> impl Strategy<Value = ValidatedStep> {
    prop::collection::vec((prop::sample::select(LONG_NAMES), "[a-z0-9]{1,6}"), 1..5).prop_map(|pairs| {
        let mut directive = Directive::new();
        for (name, value) in pairs {
            if let Some(key) = short_key(name) {
                directive.insert(key, value);
            }
        }
        ValidatedStep {
            kind: OperationKind::ResizeAndCrop,
            directives: vec![directive],
        }
    })
}

fn advisory() -> impl Strategy<Value = AdvisoryParams> {
    prop::collection::vec((prop::sample::select(LONG_NAMES), any::<i32>()), 0..8).prop_map(|pairs| {
        let map: Map<String, Value> = pairs
            .into_iter()
            .map(|(name, value)| (name.to_string(), Value::from(value)))
            .collect();
        AdvisoryParams::from_map(map)
    })
}

proptest! {
    #[test]
    fn structured_values_always_win(
        steps in prop::collection::vec(structured_step(), 0..4),
        advisory in advisory(),
    ) {
        let structured: Vec<Directive> = steps.iter().flat_map(|s| s.directives.clone()).collect();
        let merged = PlanMerger::new().merge(steps, &advisory);

        // Structured directives come first and are untouched
        prop_assert!(merged.len() >= structured.len());
        prop_assert!(merged.len() <= structured.len() + 1);
        prop_assert_eq!(&merged[..structured.len()], &structured[..]);

        let taken: HashSet<&str> = structured.iter().flat_map(Directive::keys).collect();
        if let Some(extra) = merged.get(structured.len()) {
            prop_assert!(!extra.is_empty());
            for key in extra.keys() {
                prop_assert!(!taken.contains(key), "advisory key {} shadows a structured key", key);
            }
        }
    }

    #[test]
    fn advisory_only_output_is_translated(advisory in advisory()) {
        let merged = PlanMerger::new().merge(Vec::new(), &advisory);
        prop_assert_eq!(merged.len(), usize::from(!advisory.is_empty()));
        if let Some(directive) = merged.first() {
            for key in directive.keys() {
                prop_assert!(LONG_NAMES.iter().any(|name| short_key(name) == Some(key)));
            }
        }
    }
}
