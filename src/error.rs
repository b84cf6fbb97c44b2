//! Error types for loading and analyzing API descriptions.
//!
//! Only failures that stop a run before extraction are errors. Problems
//! confined to one operation or one reference are reported as
//! [`Diagnostic`](crate::Diagnostic) records instead.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors while loading a description or configuration.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },

    // Structural errors (exit code 2)
    #[error("API description is missing required section \"{section}\"")]
    MissingSection { section: String },

    #[error("invalid API description: {message}")]
    InvalidDescription { message: String },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}
