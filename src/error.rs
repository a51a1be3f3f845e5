//! Error types for configuration loading and manifest annotation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while building the run configuration.
///
/// All of these abort the run before any file is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing domain (use --domain, config 'domain:', or env YAML_SCHEMA_DOMAIN/DOMAIN)")]
    MissingDomain,

    #[error("cannot read config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config file must be a mapping/object: {path}")]
    ConfigNotMapping { path: PathBuf },

    #[error("config 'overrides' must be a list")]
    OverridesNotList,

    #[error("invalid override #{index}: {message}")]
    InvalidOverride { index: usize, message: String },

    #[error("invalid regex \"{pattern}\" in override #{index}: {source}")]
    InvalidRegex {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl ConfigError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors while interpolating a schema URL template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template references missing key '{name}': {template}")]
    UnknownPlaceholder { name: String, template: String },

    #[error("unbalanced brace in template: {template}")]
    UnbalancedBrace { template: String },
}

/// Errors that abort processing of a single file.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("failed reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed writing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl AnnotateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors from a structured-query engine.
///
/// The rule matcher treats these as a non-match rather than a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("invalid query \"{expression}\": {message}")]
    Compile { expression: String, message: String },

    #[error("query \"{expression}\" failed: {message}")]
    Evaluate { expression: String, message: String },
}
