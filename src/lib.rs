//! Kubernetes YAML schema directives
//!
//! Annotates multi-document Kubernetes manifests with
//! `# yaml-language-server: $schema=<url>` directives so editors can validate
//! each resource against its JSON Schema.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use k8s_yaml_schema::{Annotator, Config};
//!
//! let config = Config::new("https://schemas.example.com/");
//! let text = "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n";
//!
//! let outcome = Annotator::new(&config)
//!     .annotate_text(text, Path::new("apps/web.yaml"))
//!     .unwrap();
//!
//! assert!(outcome.changed);
//! assert!(outcome.text.starts_with(
//!     "# yaml-language-server: $schema=https://schemas.example.com/apps/deployment_v1.json\n"
//! ));
//! ```
//!
//! # Schema Resolution
//!
//! | Step | Source |
//! |------|--------|
//! | 1 | First override rule whose `match` holds and whose `schema` is non-empty |
//! | 2 | `schema_template` (default `https://{domain}/{apiGroup}/{kind_lowercase}_{apiVersion}.json`) |
//!
//! Template variables: `domain`, `apiGroup`, `apiVersion`, `apiVersionFull`,
//! `kind`, `kind_lower`, `kind_lowercase`, `file`.
//!
//! Core resources (`apiVersion: v1`) are left alone unless `include_core` is set.

mod annotator;
mod config;
mod directive;
mod document;
mod error;
mod query;
mod resource;
mod rules;
mod schema;
mod template;

pub use annotator::{
    normalize_path, Annotator, Diagnostic, FileReport, FileStatus, RunReport, RunStatus,
    TextOutcome,
};
pub use config::{
    normalize_domain, Config, ConfigArgs, ConfigFile, DEFAULT_CONFIG_PATH, DEFAULT_CORE_GROUP,
    DOMAIN_ENV_VARS,
};
pub use directive::{directive_line, parse_directive, reconcile, DIRECTIVE_PREFIX};
pub use document::{join_documents, split_documents, Document};
pub use error::{AnnotateError, ConfigError, QueryError, TemplateError};
pub use query::{JmespathEngine, QueryEngine};
pub use resource::{classify, parse_document, Classification, Resource};
pub use rules::{first_match, parse_overrides, FieldCondition, OverrideRule, QueryCondition, RuleMatch};
pub use schema::{is_schema_template, resolve_schema, TemplateVars, DEFAULT_SCHEMA_TEMPLATE};
pub use template::render;
