//! Classification of parsed YAML documents as Kubernetes resources.

use serde_json::{Map, Number, Value};
use serde_yaml::Value as YamlValue;

use crate::config::Config;

/// A document recognised as a Kubernetes resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// The parsed document, used for structured queries.
    pub tree: Value,
    /// Group part of `apiVersion`, or the configured core group.
    pub api_group: String,
    /// Version part of `apiVersion` (e.g. `v1` for `apps/v1`).
    pub api_version: String,
    /// `apiVersion` exactly as written.
    pub api_version_full: String,
    pub kind: String,
    pub kind_lower: String,
}

impl Resource {
    /// Build a resource from a parsed tree.
    ///
    /// Returns `None` unless the tree is a mapping with non-empty
    /// `apiVersion` and `kind` fields.
    pub fn from_tree(tree: Value, core_group: &str) -> Option<Self> {
        let map = tree.as_object()?;
        let api_version_field = map.get("apiVersion").filter(|v| is_truthy(v))?;
        let kind_field = map.get("kind").filter(|v| is_truthy(v))?;

        let api_version_full = scalar_string(api_version_field);
        let kind = scalar_string(kind_field);
        let (api_group, api_version) = match api_version_full.split_once('/') {
            Some((group, version)) => (group.to_string(), version.to_string()),
            None => (core_group.to_string(), api_version_full.clone()),
        };
        let kind_lower = kind.to_lowercase();

        Some(Self {
            tree,
            api_group,
            api_version,
            api_version_full,
            kind,
            kind_lower,
        })
    }

    /// Core API resources have no group prefix (`v1` rather than `apps/v1`).
    pub fn is_core(&self) -> bool {
        !self.api_version_full.trim().contains('/')
    }
}

/// Outcome of classifying one document body.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// A resource that should carry a schema directive.
    Resource(Resource),
    /// Anything else; the body is carried through untouched.
    Passthrough,
}

/// Parse a document body into a JSON-compatible tree.
///
/// Returns `Ok(None)` for documents with no content (empty or comments only).
pub fn parse_document(body: &str) -> Result<Option<Value>, serde_yaml::Error> {
    let yaml: YamlValue = serde_yaml::from_str(body)?;
    Ok(match yaml {
        YamlValue::Null => None,
        other => Some(yaml_to_json(other)),
    })
}

/// Classify a document body.
///
/// Parse failures are reported unless the body is entirely whitespace.
/// Core resources are passed through unless `include_core` is set.
pub fn classify(body: &str, config: &Config) -> Result<Classification, serde_yaml::Error> {
    let tree = match parse_document(body) {
        Ok(Some(tree)) => tree,
        Ok(None) => return Ok(Classification::Passthrough),
        Err(_) if body.trim().is_empty() => return Ok(Classification::Passthrough),
        Err(e) => return Err(e),
    };

    let Some(resource) = Resource::from_tree(tree, &config.core_group) else {
        return Ok(Classification::Passthrough);
    };

    if resource.is_core() && !config.include_core {
        tracing::debug!(kind = %resource.kind, "skipping core resource");
        return Ok(Classification::Passthrough);
    }

    Ok(Classification::Resource(resource))
}

/// Convert a YAML tree into a JSON tree.
///
/// Non-string mapping keys are rendered as strings and tags are dropped.
pub fn yaml_to_json(value: YamlValue) -> Value {
    match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => yaml_number_to_json(&n),
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, val) in mapping {
                map.insert(yaml_key_string(&key), yaml_to_json(val));
            }
            Value::Object(map)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_number_to_json(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        Value::Number(u.into())
    } else {
        n.as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn yaml_key_string(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.clone(),
        YamlValue::Null => "null".to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Tagged(tagged) => yaml_key_string(&tagged.value),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// String form of a value for equality tests and template variables.
///
/// Strings are used as-is; everything else is rendered as compact JSON.
pub fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
