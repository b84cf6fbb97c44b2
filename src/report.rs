//! Human-readable rendering of an analysis.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use serde::Serialize;

use crate::analysis::Analysis;

const RULE_WIDTH: usize = 60;

/// Aggregate figures of an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub operations: usize,
    pub producers: usize,
    pub consumers: usize,
    pub edges: usize,
    /// Distinct producers appearing in at least one edge.
    pub linked_producers: usize,
    /// Distinct consumers appearing in at least one edge.
    pub linked_consumers: usize,
    /// Producer with the most dependents and its dependent count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_producer: Option<(String, usize)>,
    pub diagnostics: usize,
}

impl Summary {
    pub fn from_analysis(analysis: &Analysis) -> Self {
        let mut dependents: BTreeMap<&str, usize> = BTreeMap::new();
        let mut consumers = BTreeSet::new();
        for edge in &analysis.edges {
            *dependents.entry(edge.producer.as_str()).or_default() += 1;
            consumers.insert(edge.consumer.as_str());
        }
        // Ties go to the first producer in key order.
        let top_producer = dependents
            .iter()
            .fold(None, |best: Option<(&str, usize)>, (&name, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((name, count)),
            })
            .map(|(name, count)| (name.to_string(), count));

        Self {
            operations: analysis.operations,
            producers: analysis.producers,
            consumers: analysis.consumers,
            edges: analysis.edges.len(),
            linked_producers: dependents.len(),
            linked_consumers: consumers.len(),
            top_producer,
            diagnostics: analysis.diagnostics.len(),
        }
    }
}

/// Render the summary followed by the full edge list.
pub fn render_text(analysis: &Analysis) -> String {
    let summary = Summary::from_analysis(analysis);
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    // Writing to a String can't fail.
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Operation dependency summary");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "  operations:        {}", summary.operations);
    let _ = writeln!(out, "  producers:         {}", summary.producers);
    let _ = writeln!(out, "  consumers:         {}", summary.consumers);
    let _ = writeln!(out, "  diagnostics:       {}", summary.diagnostics);
    let _ = writeln!(out, "  dependencies:      {}", summary.edges);

    if analysis.edges.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "No dependencies found. Possible causes:");
        let _ = writeln!(
            out,
            "  1. input and output field names don't overlap (extend field_aliases)"
        );
        let _ = writeln!(
            out,
            "  2. array outputs whose items carry no object fields"
        );
        let _ = writeln!(
            out,
            "  3. business tags disagree (check resource_tags / path_param_tags)"
        );
        let _ = writeln!(
            out,
            "  4. operations without a 2xx response or JSON content"
        );
        return out;
    }

    let _ = writeln!(out, "  linked producers:  {}", summary.linked_producers);
    let _ = writeln!(out, "  linked consumers:  {}", summary.linked_consumers);
    if let Some((name, count)) = &summary.top_producer {
        let _ = writeln!(out, "  top producer:      {} ({} dependents)", name, count);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Dependencies (producer -> consumer):");
    let width = analysis.edges.len().to_string().len();
    for (i, edge) in analysis.edges.iter().enumerate() {
        let _ = writeln!(out, "  {:>width$}. {}", i + 1, edge, width = width);
    }
    out
}

/// Render diagnostics one per line.
pub fn render_diagnostics(analysis: &Analysis) -> String {
    let mut out = String::new();
    for diag in &analysis.diagnostics {
        let _ = writeln!(out, "{}", diag);
    }
    out
}
