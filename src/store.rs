//! Reusable schema dictionary (`components.schemas`).

use std::collections::BTreeMap;

use serde_json::Value;

use crate::types::SCHEMA_REF_PREFIX;

/// Lookup table of named schema definitions, immutable after load.
#[derive(Debug, Clone, Default)]
pub struct SchemaStore {
    schemas: BTreeMap<String, Value>,
}

impl SchemaStore {
    /// Build the store from a parsed API description.
    ///
    /// A description without `components.schemas` yields an empty store;
    /// whether `components` itself is mandatory is decided by the caller.
    pub fn from_description(description: &Value) -> Self {
        let schemas = description
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(Value::as_object)
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        Self { schemas }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Extract the schema name from a `$ref` string.
    ///
    /// Only `#/components/schemas/<Name>` references are supported.
    pub fn ref_name(reference: &str) -> Option<&str> {
        reference
            .strip_prefix(SCHEMA_REF_PREFIX)
            .filter(|name| !name.is_empty() && !name.contains('/'))
    }
}

impl FromIterator<(String, Value)> for SchemaStore {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            schemas: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn loads_component_schemas() {
        let doc = json!({
            "components": {
                "schemas": {
                    "Project": { "type": "object" },
                    "Job": { "type": "object" }
                }
            }
        });
        let store = SchemaStore::from_description(&doc);
        assert_eq!(store.len(), 2);
        assert!(store.contains("Project"));
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["Job", "Project"]);
    }

    #[test]
    fn missing_components_is_empty() {
        let store = SchemaStore::from_description(&json!({ "paths": {} }));
        assert!(store.is_empty());
    }

    #[test]
    fn ref_name_parsing() {
        assert_eq!(
            SchemaStore::ref_name("#/components/schemas/API_Entities_Project"),
            Some("API_Entities_Project")
        );
        assert_eq!(SchemaStore::ref_name("#/components/parameters/Id"), None);
        assert_eq!(SchemaStore::ref_name("#/components/schemas/"), None);
        assert_eq!(SchemaStore::ref_name("other.yaml#/Foo"), None);
    }
}
