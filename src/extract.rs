//! Operation extraction - turns an API description into `Operation` records.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::diagnostics::{Diagnostic, Stage};
use crate::error::LoadError;
use crate::resolver::resolve;
use crate::store::SchemaStore;
use crate::types::{
    json_type_name, HttpMethod, ParamLocation, REQUEST_MEDIA_TYPES, RESPONSE_MEDIA_TYPES,
};

/// Top-level sections every description must carry.
pub const REQUIRED_SECTIONS: &[&str] = &["openapi", "paths", "components"];

/// Operations keyed by "METHOD /path".
pub type Operations = BTreeMap<String, Operation>;

/// One HTTP method + path entry of the description.
#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    pub key: String,
    pub method: HttpMethod,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags declared in the description.
    pub tags: Vec<String>,
    /// Coarse business identifiers derived from the path; the first is primary.
    pub business_tags: Vec<String>,
    /// Status code of the success response the output was taken from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_status: Option<String>,

    #[serde(skip)]
    pub parameters: Vec<Value>,
    #[serde(skip)]
    pub request_body: Option<Value>,
    #[serde(skip)]
    pub output: Option<Value>,

    /// Parameters as listed by the `operations` subcommand.
    #[serde(rename = "parameters")]
    pub parameters_resolved: Vec<Parameter>,
    #[serde(skip)]
    pub request_body_resolved: Option<Value>,
    #[serde(skip)]
    pub output_resolved: Option<Value>,
}

/// A parameter after resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParamLocation,
    pub schema: Value,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, location: ParamLocation, schema: Value) -> Self {
        Self {
            name: name.into(),
            location,
            schema,
            required: location == ParamLocation::Path,
            description: None,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

impl Operation {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            key: format!("{} {}", method, path),
            method,
            path,
            operation_id: None,
            summary: None,
            description: None,
            tags: Vec::new(),
            business_tags: Vec::new(),
            success_status: None,
            parameters: Vec::new(),
            request_body: None,
            output: None,
            parameters_resolved: Vec::new(),
            request_body_resolved: None,
            output_resolved: None,
        }
    }

    pub fn primary_tag(&self) -> Option<&str> {
        self.business_tags.first().map(String::as_str)
    }

    /// Resolve the output, request body and parameter schemas against `store`.
    ///
    /// Malformed parameters are dropped; every problem is returned as a
    /// diagnostic tagged with this operation's key.
    pub fn resolve(&mut self, store: &SchemaStore) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        if let Some(output) = &self.output {
            let location = format!(
                "/responses/{}",
                self.success_status.as_deref().unwrap_or("2XX")
            );
            let res = resolve(output, store);
            diagnostics.extend(res.issues.iter().map(|i| i.to_diagnostic(location.as_str())));
            self.output_resolved = Some(res.schema);
        }

        if let Some(body) = &self.request_body {
            let res = resolve(body, store);
            diagnostics.extend(res.issues.iter().map(|i| i.to_diagnostic("/requestBody")));
            self.request_body_resolved = Some(res.schema);
        }

        let mut resolved_params = Vec::new();
        for (i, raw) in self.parameters.iter().enumerate() {
            let location = format!("/parameters/{}", i);
            match parse_parameter(raw) {
                Ok(mut param) => {
                    let res = resolve(&param.schema, store);
                    diagnostics.extend(
                        res.issues
                            .iter()
                            .map(|issue| issue.to_diagnostic(format!("{}/schema", location))),
                    );
                    param.schema = res.schema;
                    resolved_params.push(param);
                }
                Err(message) => {
                    diagnostics.push(Diagnostic::new(Stage::Resolve, location, message));
                }
            }
        }
        self.parameters_resolved = resolved_params;

        for diag in &mut diagnostics {
            diag.operation = Some(self.key.clone());
        }
        diagnostics
    }
}

fn parse_parameter(raw: &Value) -> Result<Parameter, String> {
    let Some(obj) = raw.as_object() else {
        return Err(format!(
            "parameter must be an object, got {}",
            json_type_name(raw)
        ));
    };
    if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
        return Err(format!("unsupported parameter reference \"{}\"", reference));
    }
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| "parameter has no name".to_string())?;
    let location_str = obj.get("in").and_then(Value::as_str).unwrap_or("");
    let location = ParamLocation::parse(location_str)
        .ok_or_else(|| format!("parameter \"{}\" has unknown location \"{}\"", name, location_str))?;
    let schema = match obj.get("schema") {
        None => Value::Object(Map::new()),
        Some(schema) if schema.is_object() => schema.clone(),
        Some(other) => {
            return Err(format!(
                "parameter \"{}\" schema must be an object, got {}",
                name,
                json_type_name(other)
            ))
        }
    };
    let required = obj.get("required").and_then(Value::as_bool).unwrap_or(false);
    Ok(Parameter {
        name: name.to_string(),
        location,
        schema,
        required,
        description: obj.get("description").and_then(Value::as_str).map(String::from),
    })
}

/// Result of extracting operations from a description.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub operations: Operations,
    pub diagnostics: Vec<Diagnostic>,
}

/// Check that the description carries the sections extraction relies on.
///
/// # Errors
///
/// Returns `LoadError::InvalidDescription` for a non-object root or
/// `LoadError::MissingSection` for the first absent section.
pub fn validate_structure(description: &Value) -> Result<(), LoadError> {
    let Some(root) = description.as_object() else {
        return Err(LoadError::InvalidDescription {
            message: format!(
                "root must be an object, got {}",
                json_type_name(description)
            ),
        });
    };
    for section in REQUIRED_SECTIONS {
        if !root.contains_key(*section) {
            return Err(LoadError::MissingSection {
                section: section.to_string(),
            });
        }
    }
    if !root["paths"].is_object() {
        return Err(LoadError::InvalidDescription {
            message: format!(
                "\"paths\" must be an object, got {}",
                json_type_name(&root["paths"])
            ),
        });
    }
    Ok(())
}

/// Extract every supported operation from `description`.
///
/// Structure is assumed to have been checked with [`validate_structure`];
/// anything malformed below `paths` becomes a diagnostic.
pub fn extract_operations(description: &Value, config: &AnalysisConfig) -> Extraction {
    let mut extraction = Extraction::default();
    let Some(paths) = description.get("paths").and_then(Value::as_object) else {
        return extraction;
    };

    for (path, path_item) in paths {
        let Some(path_item) = path_item.as_object() else {
            extraction.diagnostics.push(Diagnostic::new(
                Stage::Extract,
                format!("/paths/{}", path),
                format!("path item must be an object, got {}", json_type_name(path_item)),
            ));
            continue;
        };

        let tags = business_tags(path, config);
        let shared_params = parameter_list(
            path_item.get("parameters"),
            &format!("/paths/{}/parameters", path),
            &mut extraction.diagnostics,
        );

        for method in HttpMethod::ALL {
            let Some(op_config) = path_item.get(method.path_item_key()) else {
                continue;
            };
            let mut op = Operation::new(method, path.as_str());
            op.business_tags = tags.clone();

            let mut diagnostics = Vec::new();
            fill_operation(&mut op, op_config, &shared_params, &mut diagnostics);
            for mut diag in diagnostics {
                diag.operation = Some(op.key.clone());
                extraction.diagnostics.push(diag);
            }

            debug!(
                operation = %op.key,
                business_tags = ?op.business_tags,
                has_output = op.output.is_some(),
                "extracted operation"
            );
            extraction.operations.insert(op.key.clone(), op);
        }
    }

    info!(
        operations = extraction.operations.len(),
        "extracted operations"
    );
    extraction
}

fn fill_operation(
    op: &mut Operation,
    op_config: &Value,
    shared_params: &[Value],
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(obj) = op_config.as_object() else {
        diagnostics.push(Diagnostic::new(
            Stage::Extract,
            "/",
            format!("operation must be an object, got {}", json_type_name(op_config)),
        ));
        return;
    };

    op.operation_id = obj.get("operationId").and_then(Value::as_str).map(String::from);
    op.summary = obj.get("summary").and_then(Value::as_str).map(String::from);
    op.description = obj.get("description").and_then(Value::as_str).map(String::from);
    op.tags = obj
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let own_params = parameter_list(obj.get("parameters"), "/parameters", diagnostics);
    op.parameters = merge_parameters(shared_params, own_params);
    op.request_body = request_body_schema(obj.get("requestBody"), diagnostics);

    match obj.get("responses") {
        None => {}
        Some(Value::Object(responses)) => {
            let success = responses
                .iter()
                .find(|(status, _)| status.starts_with('2'));
            match success {
                Some((status, response)) => {
                    op.success_status = Some(status.clone());
                    op.output = response_schema(status, response, diagnostics);
                }
                None => debug!(operation = %op.key, "no 2xx response"),
            }
        }
        Some(other) => diagnostics.push(Diagnostic::new(
            Stage::Extract,
            "/responses",
            format!("responses must be an object, got {}", json_type_name(other)),
        )),
    }
}

fn parameter_list(
    value: Option<&Value>,
    location: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Value> {
    match value {
        None => Vec::new(),
        Some(Value::Array(params)) => params.clone(),
        Some(other) => {
            diagnostics.push(Diagnostic::new(
                Stage::Extract,
                location,
                format!("parameters must be an array, got {}", json_type_name(other)),
            ));
            Vec::new()
        }
    }
}

/// Operation-level parameters override path-level ones with the same
/// `(name, in)` pair.
fn merge_parameters(shared: &[Value], own: Vec<Value>) -> Vec<Value> {
    fn identity(param: &Value) -> Option<(&str, &str)> {
        Some((
            param.get("name")?.as_str()?,
            param.get("in")?.as_str()?,
        ))
    }

    let mut merged = shared.to_vec();
    for param in own {
        let existing = identity(&param)
            .and_then(|id| merged.iter().position(|p| identity(p) == Some(id)));
        match existing {
            Some(idx) => merged[idx] = param,
            None => merged.push(param),
        }
    }
    merged
}

fn request_body_schema(body: Option<&Value>, diagnostics: &mut Vec<Diagnostic>) -> Option<Value> {
    let body = body?;
    if let Some(reference) = body.get("$ref").and_then(Value::as_str) {
        diagnostics.push(Diagnostic::new(
            Stage::Extract,
            "/requestBody",
            format!("unsupported request body reference \"{}\"", reference),
        ));
        return None;
    }
    let content = body.get("content").and_then(Value::as_object)?;
    let schema = REQUEST_MEDIA_TYPES
        .iter()
        .find_map(|media| content.get(*media))
        .and_then(|media| media.get("schema"))?;
    object_schema(schema, "/requestBody", diagnostics)
}

fn response_schema(
    status: &str,
    response: &Value,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Value> {
    let location = format!("/responses/{}", status);
    if let Some(reference) = response.get("$ref").and_then(Value::as_str) {
        diagnostics.push(Diagnostic::new(
            Stage::Extract,
            location,
            format!("unsupported response reference \"{}\"", reference),
        ));
        return None;
    }
    let content = response.get("content").and_then(Value::as_object)?;
    let schema = RESPONSE_MEDIA_TYPES
        .iter()
        .find_map(|media| content.get(*media))
        .and_then(|media| media.get("schema"))?;
    object_schema(schema, &location, diagnostics)
}

fn object_schema(
    schema: &Value,
    location: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Value> {
    if schema.is_object() {
        Some(schema.clone())
    } else {
        diagnostics.push(Diagnostic::new(
            Stage::Extract,
            location,
            format!("schema must be an object, got {}", json_type_name(schema)),
        ));
        None
    }
}

/// Derive the business tags of a path.
///
/// Every configured resource contained in the path contributes its tag,
/// ordered by where it occurs. When several match, generic parent tags are
/// dropped. If nothing is left, the last non-parameter segment is used,
/// mapped through the resource table when possible.
pub fn business_tags(path: &str, config: &AnalysisConfig) -> Vec<String> {
    let mut matched: Vec<(usize, &str)> = config
        .resource_tags
        .iter()
        .filter_map(|(resource, tag)| path.find(resource.as_str()).map(|pos| (pos, tag.as_str())))
        .collect();
    matched.sort();

    let mut tags: Vec<String> = Vec::new();
    for (_, tag) in matched {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }

    if tags.len() > 1 {
        tags.retain(|tag| !config.is_generic_tag(tag));
    }

    if tags.is_empty() {
        let last_segment = path
            .split('/')
            .filter(|seg| !seg.is_empty() && !seg.starts_with('{'))
            .last();
        if let Some(segment) = last_segment {
            let tag = config
                .resource_tags
                .get(segment)
                .cloned()
                .unwrap_or_else(|| segment.to_string());
            tags.push(tag);
        }
    }

    tags
}
