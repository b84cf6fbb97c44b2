//! API Dependency Inference
//!
//! Infers producer/consumer dependencies between the operations of an
//! OpenAPI description: an edge `A -> B` means the fields returned by `A`
//! can plausibly supply every input field of `B`.
//!
//! # Example
//!
//! ```
//! use apideps::{analyze, AnalysisConfig};
//! use serde_json::json;
//!
//! let description = json!({
//!     "openapi": "3.0.0",
//!     "components": { "schemas": {} },
//!     "paths": {
//!         "/projects/{id}": {
//!             "get": {
//!                 "responses": {
//!                     "200": {
//!                         "content": {
//!                             "application/json": {
//!                                 "schema": {
//!                                     "type": "object",
//!                                     "properties": {
//!                                         "id": { "type": "integer" },
//!                                         "name": { "type": "string" }
//!                                     }
//!                                 }
//!                             }
//!                         }
//!                     }
//!                 }
//!             }
//!         },
//!         "/projects/{project_id}": {
//!             "delete": {
//!                 "parameters": [
//!                     { "name": "project_id", "in": "path", "schema": { "type": "integer" } }
//!                 ],
//!                 "responses": { "204": { "description": "deleted" } }
//!             }
//!         }
//!     }
//! });
//!
//! let analysis = analyze(&description, &AnalysisConfig::default()).unwrap();
//! assert_eq!(analysis.edges.len(), 1);
//! assert_eq!(analysis.edges[0].producer, "GET /projects/{id}");
//! assert_eq!(analysis.edges[0].consumer, "DELETE /projects/{project_id}");
//! ```
//!
//! # Matching Rules
//!
//! For every input field of the consumer, in order:
//!
//! | Rule | Passes when |
//! |------|-------------|
//! | Name | the output has the same name, or the alias from `field_aliases` |
//! | Type | types are equal, or integer vs number; a missing type passes |
//! | Business tag | both sides carry the same non-empty tag |
//! | Structure | for two objects, the nested fields pass the same rules |
//!
//! A consumer with no input fields never matches.

mod analysis;
mod config;
mod diagnostics;
mod error;
mod extract;
mod graph;
mod loader;
mod matcher;
mod projector;
mod report;
mod resolver;
mod store;
mod types;

pub use analysis::{analyze, prepare, Analysis};
pub use config::AnalysisConfig;
pub use diagnostics::{Diagnostic, Stage};
pub use error::LoadError;
pub use extract::{
    business_tags, extract_operations, validate_structure, Extraction, Operation, Operations,
    Parameter,
};
pub use graph::{build_graph, DependencyGraph, Edge};
pub use loader::{is_url, load_description, load_description_auto, load_description_str};
pub use matcher::{check_compatibility, is_compatible, types_compatible, Mismatch};
pub use projector::{
    path_param_tag, project_input, project_output, FieldDescriptor, FieldMap, Projection,
};
pub use report::{render_diagnostics, render_text, Summary};
pub use resolver::{is_cyclic, ref_origin, resolve, resolve_fragment, Resolution, ResolveIssue};
pub use store::SchemaStore;
pub use types::{HttpMethod, ParamLocation};

#[cfg(feature = "remote")]
pub use loader::load_description_url;
