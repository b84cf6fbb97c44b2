//! Dependency graph construction over all ordered operation pairs.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::config::AnalysisConfig;
use crate::diagnostics::{Diagnostic, Stage};
use crate::extract::{Operation, Operations};
use crate::matcher::check_compatibility;
use crate::projector::{project_input, project_output, FieldMap, Projection};
use crate::store::SchemaStore;

/// "Consumer's input can plausibly be supplied by producer's output."
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    pub producer: String,
    pub consumer: String,
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.producer, self.consumer)
    }
}

/// Edges plus the counts and diagnostics gathered while building them.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Ordered by producer key, then consumer key.
    pub edges: Vec<Edge>,
    /// Operations with at least one output field.
    pub producers: usize,
    /// Operations with at least one input field.
    pub consumers: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build the dependency graph of resolved operations.
///
/// Each operation is projected once per side. Producers are evaluated on the
/// rayon pool when `config.parallel` is set; the result is identical to a
/// sequential run.
pub fn build_graph(
    operations: &Operations,
    store: &SchemaStore,
    config: &AnalysisConfig,
) -> DependencyGraph {
    let ops: Vec<&Operation> = operations.values().collect();
    let mut diagnostics = Vec::new();

    let mut outputs = Vec::with_capacity(ops.len());
    let mut inputs = Vec::with_capacity(ops.len());
    for op in &ops {
        let output = project_output(op, store, config);
        let input = project_input(op, store, config);
        collect_issues(op, "/output", &output, &mut diagnostics);
        collect_issues(op, "/input", &input, &mut diagnostics);
        outputs.push(output.fields);
        inputs.push(input.fields);
    }

    let producers: Vec<usize> = (0..ops.len()).filter(|&i| !outputs[i].is_empty()).collect();
    let consumers: Vec<usize> = (0..ops.len()).filter(|&i| !inputs[i].is_empty()).collect();
    info!(
        producers = producers.len(),
        consumers = consumers.len(),
        "evaluating operation pairs"
    );

    let evaluate = |&p: &usize| -> Vec<Edge> {
        let producer = &ops[p].key;
        let edges: Vec<Edge> = consumers
            .iter()
            .filter(|&&c| c != p)
            .filter(|&&c| matches(producer, &outputs[p], &ops[c].key, &inputs[c], config))
            .map(|&c| Edge {
                producer: producer.clone(),
                consumer: ops[c].key.clone(),
            })
            .collect();
        debug!(producer = %producer, edges = edges.len(), "evaluated producer");
        edges
    };

    let per_producer: Vec<Vec<Edge>> = if config.parallel {
        producers.par_iter().map(evaluate).collect()
    } else {
        producers.iter().map(evaluate).collect()
    };
    let edges: Vec<Edge> = per_producer.into_iter().flatten().collect();

    info!(edges = edges.len(), "dependency graph built");
    DependencyGraph {
        edges,
        producers: producers.len(),
        consumers: consumers.len(),
        diagnostics,
    }
}

fn matches(
    producer: &str,
    output: &FieldMap,
    consumer: &str,
    input: &FieldMap,
    config: &AnalysisConfig,
) -> bool {
    match check_compatibility(output, input, config) {
        Ok(()) => true,
        Err(reason) => {
            trace!(producer, consumer, %reason, "pair rejected");
            false
        }
    }
}

fn collect_issues(
    op: &Operation,
    location: &str,
    projection: &Projection,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for issue in &projection.issues {
        let mut diag = issue.to_diagnostic(location).for_operation(op.key.clone());
        diag.stage = Stage::Project;
        diagnostics.push(diag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Parameter;
    use crate::types::{HttpMethod, ParamLocation};
    use serde_json::json;

    fn producer() -> Operation {
        let mut op = Operation::new(HttpMethod::Get, "/projects/{id}");
        op.business_tags = vec!["project".into()];
        op.output_resolved = Some(json!({
            "type": "object",
            "properties": {
                "id": { "type": "integer" },
                "name": { "type": "string" }
            }
        }));
        op
    }

    fn consumer() -> Operation {
        let mut op = Operation::new(HttpMethod::Delete, "/projects/{project_id}");
        op.business_tags = vec!["project".into()];
        op.parameters_resolved = vec![Parameter::new(
            "project_id",
            ParamLocation::Path,
            json!({ "type": "integer" }),
        )];
        op
    }

    fn operations(ops: Vec<Operation>) -> Operations {
        ops.into_iter().map(|op| (op.key.clone(), op)).collect()
    }

    #[test]
    fn producer_consumer_single_edge() {
        let ops = operations(vec![producer(), consumer()]);
        let graph = build_graph(&ops, &SchemaStore::default(), &AnalysisConfig::default());

        assert_eq!(
            graph.edges,
            vec![Edge {
                producer: "GET /projects/{id}".into(),
                consumer: "DELETE /projects/{project_id}".into(),
            }]
        );
        assert_eq!(graph.producers, 1);
        assert_eq!(graph.consumers, 1);
        assert!(graph.diagnostics.is_empty());
    }

    #[test]
    fn self_pairs_excluded() {
        // Produces "id" and consumes "id": it would match itself.
        let mut op = producer();
        op.parameters_resolved = vec![Parameter::new(
            "id",
            ParamLocation::Path,
            json!({ "type": "integer" }),
        )];
        let ops = operations(vec![op]);
        let graph = build_graph(&ops, &SchemaStore::default(), &AnalysisConfig::default());
        assert!(graph.edges.is_empty());
        assert_eq!(graph.producers, 1);
        assert_eq!(graph.consumers, 1);
    }

    #[test]
    fn empty_operations_no_edges() {
        let graph = build_graph(
            &Operations::new(),
            &SchemaStore::default(),
            &AnalysisConfig::default(),
        );
        assert!(graph.edges.is_empty());
        assert_eq!(graph.producers, 0);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let mut ops = vec![producer(), consumer()];
        for path in ["/projects/{project_id}/archive", "/projects/{project_id}/star"] {
            let mut op = consumer();
            op.method = HttpMethod::Post;
            op.path = path.into();
            op.key = format!("POST {}", path);
            ops.push(op);
        }
        let ops = operations(ops);
        let store = SchemaStore::default();

        let parallel = build_graph(&ops, &store, &AnalysisConfig::default());
        let sequential = build_graph(&ops, &store, &AnalysisConfig::default().parallel(false));
        assert_eq!(parallel.edges, sequential.edges);
        assert_eq!(parallel.edges.len(), 3);
    }

    #[test]
    fn projection_issues_reported() {
        let mut op = producer();
        op.output_resolved = Some(json!({ "$ref": "#/components/schemas/Gone" }));
        let ops = operations(vec![op]);
        let graph = build_graph(&ops, &SchemaStore::default(), &AnalysisConfig::default());

        assert_eq!(graph.producers, 0);
        assert_eq!(graph.diagnostics.len(), 1);
        assert_eq!(graph.diagnostics[0].stage, Stage::Project);
        assert_eq!(graph.diagnostics[0].location, "/output");
        assert_eq!(
            graph.diagnostics[0].operation.as_deref(),
            Some("GET /projects/{id}")
        );
    }
}
