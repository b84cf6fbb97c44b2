//! Field projection - flattens resolved schemas into field descriptors.
//!
//! The output side describes what an operation returns, the input side what
//! it needs. Property references are expanded here, lazily, with the same
//! cycle guard as the resolver; `AnalysisConfig::max_depth` bounds how deep
//! nested objects are described.
//!
//! Output field tags follow a fixed priority: field-name convention
//! (`<tag>` / `<tag>_id`), then the tag inferred from the enclosing
//! reference name, then the operation's primary tag. Changing this order
//! changes which dependencies are discovered.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use crate::config::AnalysisConfig;
use crate::extract::Operation;
use crate::resolver::{ref_origin, resolve_fragment, ResolveIssue};
use crate::store::SchemaStore;
use crate::types::{schema_type, ParamLocation};

/// Field name → descriptor, ordered by name.
pub type FieldMap = BTreeMap<String, FieldDescriptor>;

/// One field of an operation's output or input side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_tag: Option<String>,
    /// Where an input field is supplied; `None` on the output side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<ParamLocation>,
    #[serde(skip)]
    pub schema: Value,
    /// Fields of an object-typed field.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub nested: FieldMap,
}

impl FieldDescriptor {
    pub fn new(field_type: Option<&str>) -> Self {
        Self {
            field_type: field_type.map(String::from),
            example: None,
            description: None,
            business_tag: None,
            location: None,
            schema: Value::Null,
            nested: FieldMap::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.business_tag = Some(tag.into());
        self
    }

    pub fn with_location(mut self, location: ParamLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_nested(mut self, nested: FieldMap) -> Self {
        self.nested = nested;
        self
    }

    pub fn is_object(&self) -> bool {
        self.field_type.as_deref() == Some("object")
    }
}

/// Fields of one side of an operation plus the resolution problems met.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    pub fields: FieldMap,
    pub issues: Vec<ResolveIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Output,
    Input,
}

/// Project the fields an operation produces.
///
/// Arrays project their items; objects one descriptor per property; any
/// other shape yields no fields.
pub fn project_output(op: &Operation, store: &SchemaStore, config: &AnalysisConfig) -> Projection {
    let mut projector = Projector::new(op, store, config);
    let mut fields = FieldMap::new();
    if let Some(schema) = &op.output_resolved {
        let mut seen = BTreeSet::new();
        projector.collect_output(schema, None, &mut seen, 0, &mut fields);
    }
    Projection {
        fields,
        issues: projector.issues,
    }
}

/// Project the fields an operation consumes: its parameters plus the
/// properties of an object request body.
pub fn project_input(op: &Operation, store: &SchemaStore, config: &AnalysisConfig) -> Projection {
    let mut projector = Projector::new(op, store, config);
    let mut fields = FieldMap::new();
    let primary = op.primary_tag().map(String::from);

    for param in &op.parameters_resolved {
        let tag = match param.location {
            ParamLocation::Path => {
                path_param_tag(&op.path, &param.name, config).or_else(|| primary.clone())
            }
            _ => None,
        };
        let mut seen = BTreeSet::new();
        let descriptor = projector
            .describe(&param.schema, tag, Side::Input, &mut seen, 0)
            .with_location(param.location);
        fields.insert(param.name.clone(), descriptor);
    }

    if let Some(body) = &op.request_body_resolved {
        let mut seen = BTreeSet::new();
        let body = projector.expand(body, &mut seen);
        if is_object_schema(&body) {
            for (name, prop) in properties(&body) {
                let descriptor = projector
                    .describe(prop, primary.clone(), Side::Input, &mut seen, 0)
                    .with_location(ParamLocation::Body);
                fields.insert(name.clone(), descriptor);
            }
        }
    }

    Projection {
        fields,
        issues: projector.issues,
    }
}

/// Tag of a path parameter: the path-parameter table entry for the nearest
/// literal segment before `{name}`.
pub fn path_param_tag(path: &str, name: &str, config: &AnalysisConfig) -> Option<String> {
    let placeholder = format!("{{{}}}", name);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let idx = segments.iter().position(|s| *s == placeholder)?;
    segments[..idx]
        .iter()
        .rev()
        .find(|s| !s.starts_with('{'))
        .and_then(|segment| config.path_param_tags.get(*segment))
        .cloned()
}

struct Projector<'a> {
    store: &'a SchemaStore,
    config: &'a AnalysisConfig,
    op_tags: &'a [String],
    issues: Vec<ResolveIssue>,
}

impl<'a> Projector<'a> {
    fn new(op: &'a Operation, store: &'a SchemaStore, config: &'a AnalysisConfig) -> Self {
        Self {
            store,
            config,
            op_tags: &op.business_tags,
            issues: Vec::new(),
        }
    }

    fn expand(&mut self, schema: &Value, seen: &mut BTreeSet<String>) -> Value {
        resolve_fragment(schema, self.store, seen, &mut self.issues)
    }

    /// First operation tag contained in the enclosing reference name.
    fn reference_tag(&self, schema: &Value) -> Option<String> {
        let name = ref_origin(schema)?.to_lowercase();
        self.op_tags
            .iter()
            .find(|tag| name.contains(tag.as_str()))
            .cloned()
    }

    fn collect_output(
        &mut self,
        schema: &Value,
        enclosing_tag: Option<String>,
        seen: &mut BTreeSet<String>,
        depth: usize,
        out: &mut FieldMap,
    ) {
        if depth > self.config.max_depth {
            return;
        }
        let schema = self.expand(schema, seen);
        let guard = enter(&schema, seen);

        if schema_type(&schema) == Some("array") {
            if let Some(items) = schema.get("items") {
                self.collect_output(items, enclosing_tag, seen, depth + 1, out);
            }
        } else if is_object_schema(&schema) {
            let enclosing = self.reference_tag(&schema).or(enclosing_tag);
            for (name, prop) in properties(&schema) {
                let tag = self
                    .config
                    .tag_for_field_name(name)
                    .map(String::from)
                    .or_else(|| enclosing.clone())
                    .or_else(|| self.op_tags.first().cloned());
                let descriptor = self.describe(prop, tag, Side::Output, seen, depth);
                out.insert(name.clone(), descriptor);
            }
        }

        leave(guard, seen);
    }

    fn describe(
        &mut self,
        prop: &Value,
        tag: Option<String>,
        side: Side,
        seen: &mut BTreeSet<String>,
        depth: usize,
    ) -> FieldDescriptor {
        let resolved = self.expand(prop, seen);
        let mut descriptor = FieldDescriptor::new(schema_type(&resolved));
        descriptor.example = prop
            .get("example")
            .or_else(|| resolved.get("example"))
            .cloned();
        descriptor.description = prop
            .get("description")
            .or_else(|| resolved.get("description"))
            .and_then(Value::as_str)
            .map(String::from);
        descriptor.business_tag = tag;

        if descriptor.is_object() && depth < self.config.max_depth {
            let mut nested = FieldMap::new();
            match side {
                Side::Output => self.collect_output(
                    &resolved,
                    descriptor.business_tag.clone(),
                    seen,
                    depth + 1,
                    &mut nested,
                ),
                Side::Input => {
                    let guard = enter(&resolved, seen);
                    for (name, child) in properties(&resolved) {
                        let child = self.describe(
                            child,
                            descriptor.business_tag.clone(),
                            Side::Input,
                            seen,
                            depth + 1,
                        );
                        nested.insert(name.clone(), child);
                    }
                    leave(guard, seen);
                }
            }
            descriptor.nested = nested;
        }

        descriptor.schema = resolved;
        descriptor
    }
}

/// Mark the reference a schema was expanded from as active on the current
/// path. Returns the name to release, if this call inserted it.
fn enter(schema: &Value, seen: &mut BTreeSet<String>) -> Option<String> {
    let name = ref_origin(schema)?;
    seen.insert(name.to_string()).then(|| name.to_string())
}

fn leave(guard: Option<String>, seen: &mut BTreeSet<String>) {
    if let Some(name) = guard {
        seen.remove(&name);
    }
}

fn is_object_schema(schema: &Value) -> bool {
    match schema_type(schema) {
        Some(t) => t == "object",
        None => schema.get("properties").is_some_and(Value::is_object),
    }
}

fn properties(schema: &Value) -> impl Iterator<Item = (&String, &Value)> {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|props| props.iter())
        .filter(|(_, prop)| prop.is_object())
}
