//! End-to-end analysis pass.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::diagnostics::{Diagnostic, Stage};
use crate::error::LoadError;
use crate::extract::{extract_operations, validate_structure, Extraction};
use crate::graph::{build_graph, Edge};
use crate::store::SchemaStore;

/// Outcome of analyzing one description.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Analysis {
    pub operations: usize,
    pub producers: usize,
    pub consumers: usize,
    pub edges: Vec<Edge>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Validate, extract and resolve: everything up to the pair evaluation.
///
/// # Errors
///
/// Returns `LoadError` if the description lacks a required section.
pub fn prepare(
    description: &Value,
    config: &AnalysisConfig,
) -> Result<(SchemaStore, Extraction), LoadError> {
    validate_structure(description)?;

    let store = SchemaStore::from_description(description);
    info!(schemas = store.len(), "loaded reusable schemas");

    let mut extraction = extract_operations(description, config);
    for op in extraction.operations.values_mut() {
        let diagnostics = op.resolve(&store);
        extraction.diagnostics.extend(diagnostics);
    }
    Ok((store, extraction))
}

/// Infer the producer/consumer dependencies of an API description.
///
/// Only structural problems are errors; everything else ends up in
/// `Analysis::diagnostics`.
///
/// # Errors
///
/// Returns `LoadError` if the description lacks a required section.
pub fn analyze(description: &Value, config: &AnalysisConfig) -> Result<Analysis, LoadError> {
    let (store, extraction) = prepare(description, config)?;
    let graph = build_graph(&extraction.operations, &store, config);

    let mut diagnostics = extraction.diagnostics;
    diagnostics.extend(graph.diagnostics);
    let diagnostics = dedup_diagnostics(diagnostics);
    for diag in &diagnostics {
        debug!(%diag, "diagnostic");
    }

    info!(
        operations = extraction.operations.len(),
        edges = graph.edges.len(),
        diagnostics = diagnostics.len(),
        "analysis complete"
    );

    Ok(Analysis {
        operations: extraction.operations.len(),
        producers: graph.producers,
        consumers: graph.consumers,
        edges: graph.edges,
        diagnostics,
    })
}

/// Projection re-expands unresolved references, so it repeats problems the
/// resolution stage already reported at their fragment location. Extraction
/// and resolution diagnostics are all kept; a projection diagnostic survives
/// only when it adds something new.
fn dedup_diagnostics(diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let resolved: HashSet<_> = diagnostics
        .iter()
        .filter(|d| d.stage == Stage::Resolve)
        .map(|d| (d.operation.clone(), d.reference.clone(), d.message.clone()))
        .collect();

    let mut projected = HashSet::new();
    diagnostics
        .into_iter()
        .filter(|d| {
            if d.stage != Stage::Project {
                return true;
            }
            let key = (d.operation.clone(), d.reference.clone(), d.message.clone());
            !resolved.contains(&key) && projected.insert((key, d.location.clone()))
        })
        .collect()
}
