//! Reference resolution - expands `$ref` chains into concrete schemas.
//!
//! Resolution is shallow by construction: references and array `items` are
//! expanded, object properties are left for the projector to expand lazily.
//! Expanded fragments are annotated with the name of the reference that
//! produced them (`x-apideps-ref`), and references cut by the cycle guard
//! are annotated with `x-apideps-cyclic`.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::diagnostics::{Diagnostic, Stage};
use crate::store::SchemaStore;
use crate::types::{json_type_name, schema_type, CYCLIC_KEY, REF_ORIGIN_KEY};

/// A recoverable problem met while resolving a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveIssue {
    #[error("reference to unknown schema \"{name}\"")]
    UnknownReference { name: String },

    #[error("unsupported reference \"{reference}\"")]
    UnsupportedReference { reference: String },

    #[error("cyclic reference to \"{name}\" left unexpanded")]
    CyclicReference { name: String },
}

impl ResolveIssue {
    /// Convert into a diagnostic located at `location`.
    pub fn to_diagnostic(&self, location: impl Into<String>) -> Diagnostic {
        let diag = Diagnostic::new(Stage::Resolve, location, self.to_string());
        match self {
            ResolveIssue::UnknownReference { name } | ResolveIssue::CyclicReference { name } => {
                diag.with_reference(name.clone())
            }
            ResolveIssue::UnsupportedReference { reference } => {
                diag.with_reference(reference.clone())
            }
        }
    }
}

/// Result of resolving a single fragment.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub schema: Value,
    pub issues: Vec<ResolveIssue>,
}

/// Resolve a fragment with a fresh cycle guard.
pub fn resolve(fragment: &Value, store: &SchemaStore) -> Resolution {
    let mut seen = BTreeSet::new();
    let mut issues = Vec::new();
    let schema = resolve_fragment(fragment, store, &mut seen, &mut issues);
    Resolution { schema, issues }
}

/// Resolve a fragment against `store`.
///
/// `seen` holds the reference names being expanded on the current path; a
/// reference already in it is returned annotated as cyclic. Problems are
/// appended to `issues` and the offending fragment is returned unchanged.
/// Resolving an already-resolved fragment returns it unchanged.
pub fn resolve_fragment(
    fragment: &Value,
    store: &SchemaStore,
    seen: &mut BTreeSet<String>,
    issues: &mut Vec<ResolveIssue>,
) -> Value {
    let Value::Object(map) = fragment else {
        return fragment.clone();
    };

    if is_cyclic(fragment) {
        return fragment.clone();
    }

    if let Some(reference) = map.get("$ref") {
        return match reference.as_str() {
            Some(reference) => resolve_reference(fragment, reference, store, seen, issues),
            None => {
                issues.push(ResolveIssue::UnsupportedReference {
                    reference: format!("<{}>", json_type_name(reference)),
                });
                fragment.clone()
            }
        };
    }

    if schema_type(fragment) == Some("array") {
        if let Some(items) = map.get("items").filter(|items| items.is_object()) {
            let resolved_items = resolve_fragment(items, store, seen, issues);
            let mut result = map.clone();
            result.insert("items".to_string(), resolved_items);
            return Value::Object(result);
        }
    }

    // Objects and primitives pass through unchanged
    fragment.clone()
}

fn resolve_reference(
    fragment: &Value,
    reference: &str,
    store: &SchemaStore,
    seen: &mut BTreeSet<String>,
    issues: &mut Vec<ResolveIssue>,
) -> Value {
    let Some(name) = SchemaStore::ref_name(reference) else {
        issues.push(ResolveIssue::UnsupportedReference {
            reference: reference.to_string(),
        });
        return fragment.clone();
    };

    if seen.contains(name) {
        issues.push(ResolveIssue::CyclicReference {
            name: name.to_string(),
        });
        return mark_cyclic(fragment);
    }

    let Some(target) = store.get(name) else {
        issues.push(ResolveIssue::UnknownReference {
            name: name.to_string(),
        });
        return fragment.clone();
    };

    seen.insert(name.to_string());
    let mut resolved = resolve_fragment(target, store, seen, issues);
    seen.remove(name);

    if !is_cyclic(&resolved) {
        if let Value::Object(map) = &mut resolved {
            map.insert(REF_ORIGIN_KEY.to_string(), Value::String(name.to_string()));
        }
    }
    resolved
}

fn mark_cyclic(fragment: &Value) -> Value {
    let mut map = fragment.as_object().cloned().unwrap_or_else(Map::new);
    map.insert(CYCLIC_KEY.to_string(), Value::Bool(true));
    Value::Object(map)
}

/// Returns true if the fragment was cut by the cycle guard.
pub fn is_cyclic(fragment: &Value) -> bool {
    fragment
        .get(CYCLIC_KEY)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Returns the reference name a fragment was expanded from, if any.
pub fn ref_origin(fragment: &Value) -> Option<&str> {
    fragment.get(REF_ORIGIN_KEY).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(schemas: Value) -> SchemaStore {
        SchemaStore::from_description(&json!({ "components": { "schemas": schemas } }))
    }

    #[test]
    fn resolves_named_reference() {
        let store = store(json!({
            "Project": {
                "type": "object",
                "properties": { "id": { "type": "integer" } }
            }
        }));
        let res = resolve(&json!({ "$ref": "#/components/schemas/Project" }), &store);

        assert!(res.issues.is_empty());
        assert_eq!(res.schema["type"], "object");
        assert_eq!(res.schema["properties"]["id"]["type"], "integer");
        assert_eq!(ref_origin(&res.schema), Some("Project"));
    }

    #[test]
    fn resolves_chains_transitively() {
        let store = store(json!({
            "Alias": { "$ref": "#/components/schemas/Project" },
            "Project": { "type": "object", "properties": {} }
        }));
        let res = resolve(&json!({ "$ref": "#/components/schemas/Alias" }), &store);

        assert!(res.issues.is_empty());
        assert_eq!(res.schema["type"], "object");
        // The outermost name is what the operation referenced.
        assert_eq!(ref_origin(&res.schema), Some("Alias"));
    }

    #[test]
    fn unknown_reference_returns_original() {
        let fragment = json!({ "$ref": "#/components/schemas/Missing" });
        let res = resolve(&fragment, &SchemaStore::default());

        assert_eq!(res.schema, fragment);
        assert_eq!(
            res.issues,
            vec![ResolveIssue::UnknownReference {
                name: "Missing".into()
            }]
        );
    }

    #[test]
    fn unsupported_reference_returns_original() {
        let fragment = json!({ "$ref": "#/components/parameters/Id" });
        let res = resolve(&fragment, &SchemaStore::default());

        assert_eq!(res.schema, fragment);
        assert!(matches!(
            res.issues[0],
            ResolveIssue::UnsupportedReference { .. }
        ));
    }

    #[test]
    fn mutual_cycle_terminates() {
        let store = store(json!({
            "A": { "$ref": "#/components/schemas/B" },
            "B": { "$ref": "#/components/schemas/A" }
        }));
        let res = resolve(&json!({ "$ref": "#/components/schemas/A" }), &store);

        assert!(is_cyclic(&res.schema));
        assert_eq!(
            res.issues,
            vec![ResolveIssue::CyclicReference { name: "A".into() }]
        );
    }

    #[test]
    fn self_referencing_array_terminates() {
        let store = store(json!({
            "Tree": { "type": "array", "items": { "$ref": "#/components/schemas/Tree" } }
        }));
        let res = resolve(&json!({ "$ref": "#/components/schemas/Tree" }), &store);

        assert_eq!(res.schema["type"], "array");
        assert!(is_cyclic(&res.schema["items"]));
        assert_eq!(res.issues.len(), 1);
    }

    #[test]
    fn array_items_resolved() {
        let store = store(json!({
            "Job": { "type": "object", "properties": { "id": { "type": "integer" } } }
        }));
        let res = resolve(
            &json!({ "type": "array", "items": { "$ref": "#/components/schemas/Job" } }),
            &store,
        );

        assert_eq!(res.schema["type"], "array");
        assert_eq!(res.schema["items"]["type"], "object");
        assert_eq!(ref_origin(&res.schema["items"]), Some("Job"));
    }

    #[test]
    fn object_properties_left_lazy() {
        let store = store(json!({ "User": { "type": "object" } }));
        let fragment = json!({
            "type": "object",
            "properties": { "owner": { "$ref": "#/components/schemas/User" } }
        });
        let res = resolve(&fragment, &store);

        assert_eq!(res.schema, fragment);
    }

    #[test]
    fn resolution_is_idempotent() {
        let store = store(json!({
            "Tree": { "type": "array", "items": { "$ref": "#/components/schemas/Tree" } },
            "Job": { "type": "object", "properties": { "id": { "type": "integer" } } }
        }));
        for name in ["Tree", "Job"] {
            let once = resolve(&json!({ "$ref": format!("#/components/schemas/{name}") }), &store);
            let twice = resolve(&once.schema, &store);
            assert_eq!(once.schema, twice.schema);
            assert!(twice.issues.is_empty());
        }
    }

    #[test]
    fn issue_to_diagnostic_carries_reference() {
        let diag = ResolveIssue::UnknownReference { name: "Foo".into() }
            .to_diagnostic("/responses/200");
        assert_eq!(diag.stage, Stage::Resolve);
        assert_eq!(diag.reference.as_deref(), Some("Foo"));
        assert_eq!(diag.location, "/responses/200");
    }
}
