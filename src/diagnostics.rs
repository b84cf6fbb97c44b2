//! Structured diagnostics collected during an analysis pass.
//!
//! Nothing here is fatal: a diagnostic means some branch of the description
//! was skipped or only partially understood.

use serde::Serialize;

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extract,
    Resolve,
    Project,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Extract => "extract",
            Stage::Resolve => "resolve",
            Stage::Project => "project",
        })
    }
}

/// A single non-fatal problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    /// Operation key ("METHOD /path"), when the problem belongs to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// JSON path of the fragment inside the operation (e.g. "/responses/200").
    pub location: String,
    pub message: String,
    /// Reference name involved, for resolution problems.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Diagnostic {
    pub fn new(stage: Stage, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            operation: None,
            location: location.into(),
            message: message.into(),
            reference: None,
        }
    }

    pub fn for_operation(mut self, key: impl Into<String>) -> Self {
        self.operation = Some(key.into());
        self
    }

    pub fn with_reference(mut self, name: impl Into<String>) -> Self {
        self.reference = Some(name.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.stage)?;
        if let Some(op) = &self.operation {
            write!(f, " {}", op)?;
        }
        write!(f, " {}: {}", self.location, self.message)
    }
}
