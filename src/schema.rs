//! Schema URL resolution for a resource.

use crate::config::Config;
use crate::error::TemplateError;
use crate::query::QueryEngine;
use crate::resource::Resource;
use crate::rules::first_match;
use crate::template::render;

/// Default template for schema URLs.
pub const DEFAULT_SCHEMA_TEMPLATE: &str =
    "https://{domain}/{apiGroup}/{kind_lowercase}_{apiVersion}.json";

/// Substrings that mark an override schema as a template.
///
/// Override schemas without any of these are used verbatim.
const OVERRIDE_PLACEHOLDER_HINTS: &[&str] = &["{domain}", "{apiGroup}", "{kind", "{apiVersion"];

/// Variables available to schema templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateVars<'a> {
    pub domain: &'a str,
    pub api_group: &'a str,
    pub api_version: &'a str,
    pub api_version_full: &'a str,
    pub kind: &'a str,
    pub kind_lower: &'a str,
    pub file: &'a str,
}

impl<'a> TemplateVars<'a> {
    pub fn new(domain: &'a str, resource: &'a Resource, file: &'a str) -> Self {
        Self {
            domain,
            api_group: &resource.api_group,
            api_version: &resource.api_version,
            api_version_full: &resource.api_version_full,
            kind: &resource.kind,
            kind_lower: &resource.kind_lower,
            file,
        }
    }

    /// Look up a placeholder by its template name.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        match name {
            "domain" => Some(self.domain),
            "apiGroup" => Some(self.api_group),
            "apiVersion" => Some(self.api_version),
            "apiVersionFull" => Some(self.api_version_full),
            "kind" => Some(self.kind),
            "kind_lower" | "kind_lowercase" => Some(self.kind_lower),
            "file" => Some(self.file),
            _ => None,
        }
    }

    /// Interpolate `template` with these variables.
    pub fn render(&self, template: &str) -> Result<String, TemplateError> {
        render(template, |name| self.get(name))
    }
}

/// Returns true if an override schema should be interpolated.
pub fn is_schema_template(schema: &str) -> bool {
    OVERRIDE_PLACEHOLDER_HINTS.iter().any(|hint| schema.contains(hint))
}

/// Resolve the schema URL for `resource` found in `file`.
///
/// The first matching override wins; otherwise the configured default
/// template is used. `file` must use forward slashes.
pub fn resolve_schema(
    config: &Config,
    resource: &Resource,
    file: &str,
    engine: &dyn QueryEngine,
) -> Result<String, TemplateError> {
    let vars = TemplateVars::new(&config.domain, resource, file);

    match first_match(&config.overrides, resource, file, engine) {
        Some((index, schema)) => {
            tracing::debug!(index, kind = %resource.kind, "override matched");
            if is_schema_template(schema) {
                vars.render(schema)
            } else {
                Ok(schema.to_string())
            }
        }
        None => vars.render(&config.schema_template),
    }
}
