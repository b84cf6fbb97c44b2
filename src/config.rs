//! Analysis configuration.
//!
//! The business-tag tables drive every heuristic in the engine. They default
//! to the tables tuned for the GitLab REST API and can be replaced from a
//! YAML or JSON file:
//!
//! ```yaml
//! resource_tags:
//!   repositories: repository
//!   issues: issue
//! path_param_tags:
//!   repositories: repository
//! field_aliases:
//!   repository_id: id
//! generic_tags: [repository]
//! max_depth: 4
//! ```
//!
//! Keys missing from the file keep their default value.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

const DEFAULT_MAX_DEPTH: usize = 8;

/// Tables and limits used by extraction, projection and matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Input field name → output field name tried when the name is absent.
    pub field_aliases: BTreeMap<String, String>,
    /// Path resource (substring) → business tag.
    pub resource_tags: BTreeMap<String, String>,
    /// Path segment preceding a path parameter → business tag.
    pub path_param_tags: BTreeMap<String, String>,
    /// Parent-resource tags dropped when a more specific tag also matched.
    pub generic_tags: Vec<String>,
    /// Maximum nesting depth projected for object-typed fields.
    pub max_depth: usize,
    /// Evaluate producers on the rayon thread pool.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            field_aliases: table(&[
                ("project_id", "id"),
                ("user_id", "id"),
                ("group_id", "id"),
                ("badge_id", "id"),
                ("alert_iid", "id"),
                ("cluster_id", "id"),
                ("import_id", "id"),
                ("job_id", "id"),
                ("branch", "name"),
                ("key", "id"),
            ]),
            resource_tags: table(&[
                ("projects", "project"),
                ("jobs", "job"),
                ("broadcast_messages", "broadcast"),
                ("groups", "group"),
                ("badges", "badge"),
                ("clusters", "cluster"),
                ("applications", "application"),
                ("batched_background_migrations", "batched_bg_migration"),
            ]),
            path_param_tags: table(&[
                ("batched_background_migrations", "batched_bg_migration"),
                ("broadcast_messages", "broadcast"),
                ("jobs", "job"),
                ("projects", "project"),
            ]),
            generic_tags: vec!["project".to_string(), "group".to_string()],
            max_depth: DEFAULT_MAX_DEPTH,
            parallel: true,
        }
    }
}

fn table(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl AnalysisConfig {
    /// Load a configuration file (YAML or JSON).
    ///
    /// # Errors
    ///
    /// Returns `LoadError::FileNotFound`/`ReadError` for IO failures and
    /// `LoadError::InvalidConfig` if the content doesn't match the schema.
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_text(&content)
    }

    /// Parse a configuration from YAML or JSON text.
    pub fn from_text(content: &str) -> Result<Self, LoadError> {
        // An empty file is valid YAML for "no overrides".
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| LoadError::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// Add or replace a field alias.
    pub fn with_alias(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.field_aliases.insert(input.into(), output.into());
        self
    }

    /// Add or replace a resource tag, used both for path matching and
    /// field-name conventions.
    pub fn with_resource_tag(mut self, resource: impl Into<String>, tag: impl Into<String>) -> Self {
        self.resource_tags.insert(resource.into(), tag.into());
        self
    }

    /// Add or replace a path-parameter tag.
    pub fn with_path_param_tag(
        mut self,
        segment: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        self.path_param_tags.insert(segment.into(), tag.into());
        self
    }

    /// Set the maximum nested projection depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Enable or disable parallel pair evaluation.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Returns the tag for an output field named by convention
    /// (`<tag>` or `<tag>_id`).
    pub fn tag_for_field_name(&self, field: &str) -> Option<&str> {
        self.resource_tags
            .values()
            .find(|tag| field == tag.as_str() || field.strip_suffix("_id") == Some(tag.as_str()))
            .map(String::as_str)
    }

    pub fn is_generic_tag(&self, tag: &str) -> bool {
        self.generic_tags.iter().any(|g| g == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_cover_gitlab_resources() {
        let config = AnalysisConfig::default();
        assert_eq!(config.field_aliases["project_id"], "id");
        assert_eq!(config.field_aliases["branch"], "name");
        assert_eq!(config.resource_tags["projects"], "project");
        assert_eq!(config.path_param_tags["jobs"], "job");
        assert!(config.is_generic_tag("group"));
        assert!(!config.is_generic_tag("job"));
    }

    #[test]
    fn tag_for_field_name_conventions() {
        let config = AnalysisConfig::default();
        assert_eq!(config.tag_for_field_name("project_id"), Some("project"));
        assert_eq!(config.tag_for_field_name("job"), Some("job"));
        assert_eq!(config.tag_for_field_name("id"), None);
        assert_eq!(config.tag_for_field_name("projects"), None);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AnalysisConfig::from_text("max_depth: 3\nparallel: false\n").unwrap();
        assert_eq!(config.max_depth, 3);
        assert!(!config.parallel);
        assert_eq!(config.resource_tags, AnalysisConfig::default().resource_tags);
    }

    #[test]
    fn override_replaces_whole_table() {
        let config =
            AnalysisConfig::from_text(r#"{"resource_tags": {"issues": "issue"}}"#).unwrap();
        assert_eq!(config.resource_tags.len(), 1);
        assert_eq!(config.resource_tags["issues"], "issue");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = AnalysisConfig::from_text("resource_tag: {}").unwrap_err();
        assert!(matches!(err, LoadError::InvalidConfig { .. }));
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(AnalysisConfig::from_text("  \n").unwrap(), AnalysisConfig::default());
    }

    #[test]
    fn builder_setters() {
        let config = AnalysisConfig::default()
            .with_alias("issue_iid", "iid")
            .with_resource_tag("issues", "issue")
            .with_path_param_tag("issues", "issue")
            .max_depth(2)
            .parallel(false);
        assert_eq!(config.field_aliases["issue_iid"], "iid");
        assert_eq!(config.resource_tags["issues"], "issue");
        assert_eq!(config.path_param_tags["issues"], "issue");
        assert_eq!(config.max_depth, 2);
        assert!(!config.parallel);
    }
}
