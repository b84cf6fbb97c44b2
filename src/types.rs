//! Core types shared by extraction, projection and matching.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of references that point into the reusable schema dictionary.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Annotation added to a fragment expanded from a named reference.
pub const REF_ORIGIN_KEY: &str = "x-apideps-ref";

/// Annotation added to a reference cut short by the cycle guard.
pub const CYCLIC_KEY: &str = "x-apideps-cyclic";

/// Media types searched, in order, for a success response schema.
pub const RESPONSE_MEDIA_TYPES: &[&str] = &[
    "application/json",
    "application/vnd.gitlab+json",
    "application/json; charset=utf-8",
];

/// Media types searched, in order, for a request body schema.
pub const REQUEST_MEDIA_TYPES: &[&str] = &["application/json", "application/vnd.gitlab+json"];

/// Returns the JSON type name for diagnostic messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns the declared `type` of a schema fragment, if any.
pub fn schema_type(schema: &Value) -> Option<&str> {
    schema.get("type").and_then(Value::as_str)
}

/// HTTP methods considered when extracting operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    /// All methods, in the order they are looked up in a path item.
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    /// Key used for this method inside an OpenAPI path item.
    pub fn path_item_key(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an input field is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
}

impl ParamLocation {
    /// Parse the `in` value of a parameter object.
    ///
    /// Returns `None` for unknown locations (caller records a diagnostic).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(ParamLocation::Path),
            "query" => Some(ParamLocation::Query),
            "header" => Some(ParamLocation::Header),
            "cookie" => Some(ParamLocation::Cookie),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_keys_round_trip_display() {
        assert_eq!(HttpMethod::Delete.path_item_key(), "delete");
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
        assert_eq!(HttpMethod::ALL.len(), 7);
    }

    #[test]
    fn param_location_parse() {
        assert_eq!(ParamLocation::parse("path"), Some(ParamLocation::Path));
        assert_eq!(ParamLocation::parse("query"), Some(ParamLocation::Query));
        assert_eq!(ParamLocation::parse("body"), None);
        assert_eq!(ParamLocation::parse("formData"), None);
    }

    #[test]
    fn schema_type_reads_declared_type() {
        assert_eq!(schema_type(&json!({"type": "integer"})), Some("integer"));
        assert_eq!(schema_type(&json!({"$ref": "#/components/schemas/A"})), None);
        assert_eq!(schema_type(&json!("string")), None);
    }
}
