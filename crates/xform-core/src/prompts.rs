//! Prompt rendering for the reasoning service

use crate::manifest::{Manifest, ManifestEntry};
use serde_json::json;

/// Classification prompt: the query plus every operation's name, description and tags
#[must_use]
pub fn classification(query: &str, manifest: &Manifest) -> String {
    let operations: Vec<_> = manifest
        .entries()
        .iter()
        .map(|e| {
            json!({
                "operation": e.operation.as_str(),
                "description": e.description,
                "tags": e.tags,
            })
        })
        .collect();
    let operations = serde_json::to_string_pretty(&operations).unwrap_or_default();

    format!(
        r#"Classify an image transformation request.

Pick every operation below that is needed to satisfy the request. Use only
the operation names listed. If part of the request cannot be satisfied by
any listed operation, describe that part in "unresolved_intent"; otherwise
set it to null.

Operations:
{operations}

Request: "{query}"

Reply with one JSON object:
{{"operations": ["<operation>", ...], "unresolved_intent": "<text>" | null}}"#
    )
}

/// Planning prompt: the query plus the filtered rows with full parameter documentation
#[must_use]
pub fn planning(query: &str, rows: &[&ManifestEntry]) -> String {
    let rows = serde_json::to_string_pretty(rows).unwrap_or_default();

    format!(
        r#"Plan an image transformation.

Produce the ordered steps that carry out the request using only the
operations and parameters documented below. Respect every constraint in the
parameter descriptions. Only set parameters the request asks for; do not
add defaults. If the request cannot be expressed with these operations,
return an empty list of steps.

Operations:
{rows}

Request: "{query}"

Reply with one JSON object:
{{"steps": [{{"operation": "<operation>", "params": {{"<parameter>": <value>}}}}]}}"#
    )
}

/// Extraction prompt: the query plus the grouped documentation context
#[must_use]
pub fn extraction(query: &str, context: &str) -> String {
    format!(
        r#"Extract image transformation parameters from documentation.

Using only the documentation below, list the transformation parameters and
values that satisfy the request. Use the parameter names as the
documentation writes them out in full (for example "background color",
"width"). Every value must appear in the documentation or in the request.
Never invent parameters, defaults or placeholder values; leave out any
parameter whose value you cannot find.

Documentation:
{context}

Request: "{query}"

Reply with one JSON object:
{{"params": {{"<parameter name>": <value>}}}}"#
    )
}
