//! Override rules and first-match evaluation.
//!
//! Rules are checked in configuration order; the first rule whose predicate
//! holds and whose schema is non-empty wins.
//!
//! # Rule Format
//!
//! ```yaml
//! overrides:
//!   - match:
//!       file_regex: "^kubernetes/apps/"
//!       kind: [HelmRelease, Kustomization]
//!       apiGroup: helm.toolkit.fluxcd.io
//!       jmespath: spec.chart.spec.chart
//!       equals: app-template
//!     schema: "https://{domain}/app-template/helmrelease-helm-v2.json"
//! ```
//!
//! Every condition present in `match` (or its alias `when`) must hold.

use regex::Regex;
use serde_json::Value;

use crate::error::ConfigError;
use crate::query::QueryEngine;
use crate::resource::{is_truthy, scalar_string, Resource};

/// Equality test against one resource attribute.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldCondition {
    /// No condition given.
    #[default]
    Any,
    /// Attribute must equal this string.
    Equals(String),
    /// Attribute must equal one of these strings.
    OneOf(Vec<String>),
}

impl FieldCondition {
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => FieldCondition::Any,
            Some(Value::Array(items)) => {
                FieldCondition::OneOf(items.iter().map(scalar_string).collect())
            }
            Some(other) => FieldCondition::Equals(scalar_string(other)),
        }
    }

    pub fn matches(&self, actual: &str) -> bool {
        match self {
            FieldCondition::Any => true,
            FieldCondition::Equals(expected) => actual == expected,
            FieldCondition::OneOf(options) => options.iter().any(|o| o == actual),
        }
    }
}

/// Structured-query condition block.
///
/// All sub-conditions that are present must hold for the same query result.
#[derive(Debug, Clone)]
pub struct QueryCondition {
    pub expression: String,
    pub exists: Option<bool>,
    pub equals: Option<Value>,
    /// Kept raw: a non-list here makes the condition fail instead of erroring.
    pub one_of: Option<Value>,
    pub match_regex: Option<Regex>,
}

impl QueryCondition {
    /// Check the sub-conditions against a query result.
    pub fn holds(&self, value: Option<&Value>) -> bool {
        if let Some(want) = self.exists {
            if want != value.is_some() {
                return false;
            }
        }

        let actual = value.unwrap_or(&Value::Null);

        if let Some(expected) = &self.equals {
            if !values_equal(actual, expected) {
                return false;
            }
        }

        if let Some(options) = &self.one_of {
            let Value::Array(options) = options else {
                return false;
            };
            if !options.iter().any(|o| values_equal(actual, o)) {
                return false;
            }
        }

        if let Some(re) = &self.match_regex {
            match value {
                Some(v) if re.is_match(&scalar_string(v)) => {}
                _ => return false,
            }
        }

        true
    }
}

/// Predicate of an override rule.
#[derive(Debug, Clone, Default)]
pub struct RuleMatch {
    pub file_regex: Option<Regex>,
    pub kind: FieldCondition,
    pub api_group: FieldCondition,
    pub api_version: FieldCondition,
    pub api_version_full: FieldCondition,
    pub query: Option<QueryCondition>,
}

impl RuleMatch {
    /// Evaluate the predicate; `file` must use forward slashes.
    pub fn matches(&self, resource: &Resource, file: &str, engine: &dyn QueryEngine) -> bool {
        if let Some(re) = &self.file_regex {
            if !re.is_match(file) {
                return false;
            }
        }

        if !self.kind.matches(&resource.kind)
            || !self.api_group.matches(&resource.api_group)
            || !self.api_version.matches(&resource.api_version)
            || !self.api_version_full.matches(&resource.api_version_full)
        {
            return false;
        }

        let Some(query) = &self.query else {
            return true;
        };

        match engine.evaluate(&query.expression, &resource.tree) {
            Ok(value) => query.holds(value.as_ref()),
            Err(e) => {
                tracing::warn!(error = %e, "structured query failed; rule skipped");
                false
            }
        }
    }
}

/// One entry of the `overrides` list.
#[derive(Debug, Clone)]
pub struct OverrideRule {
    /// `None` when the configured predicate is unusable; such a rule never matches.
    pub predicate: Option<RuleMatch>,
    /// Schema URL or template, trimmed. Empty schemas never win.
    pub schema: String,
}

impl OverrideRule {
    /// Build a rule from its configuration value.
    ///
    /// `index` is the rule's position in the list, used in error messages.
    pub fn from_value(index: usize, value: &Value) -> Result<Self, ConfigError> {
        let Value::Object(rule) = value else {
            return Err(ConfigError::InvalidOverride {
                index,
                message: "override must be a mapping".to_string(),
            });
        };

        let schema = match rule.get("schema") {
            None | Some(Value::Null) => String::new(),
            Some(v) => scalar_string(v).trim().to_string(),
        };

        // An empty `match` falls back to `when`, then to match-everything.
        let truthy = |key: &str| rule.get(key).filter(|v| is_truthy(v));
        let predicate = match truthy("match").or_else(|| truthy("when")) {
            None => Some(RuleMatch::default()),
            Some(Value::Object(fields)) => Some(parse_match(index, fields)?),
            Some(_) => {
                tracing::warn!(index, "override predicate is not a mapping; rule ignored");
                None
            }
        };

        Ok(Self { predicate, schema })
    }

    /// Returns true if this rule applies to `resource`.
    pub fn matches(&self, resource: &Resource, file: &str, engine: &dyn QueryEngine) -> bool {
        self.predicate
            .as_ref()
            .map(|p| p.matches(resource, file, engine))
            .unwrap_or(false)
    }
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn parse_match(index: usize, fields: &serde_json::Map<String, Value>) -> Result<RuleMatch, ConfigError> {
    let compile = |pattern: &Value| {
        let pattern = scalar_string(pattern);
        Regex::new(&pattern).map_err(|source| ConfigError::InvalidRegex {
            index,
            pattern,
            source,
        })
    };

    let file_regex = non_null(fields.get("file_regex")).map(compile).transpose()?;

    let query = match non_null(fields.get("jmespath")) {
        Some(expression) => Some(QueryCondition {
            expression: scalar_string(expression),
            exists: fields.get("exists").map(is_truthy),
            equals: fields.get("equals").cloned(),
            one_of: fields.get("one_of").cloned(),
            match_regex: non_null(fields.get("match_regex")).map(compile).transpose()?,
        }),
        None => None,
    };

    Ok(RuleMatch {
        file_regex,
        kind: FieldCondition::from_value(fields.get("kind")),
        api_group: FieldCondition::from_value(fields.get("apiGroup")),
        api_version: FieldCondition::from_value(fields.get("apiVersion")),
        api_version_full: FieldCondition::from_value(fields.get("apiVersionFull")),
        query,
    })
}

/// Parse an `overrides` list.
pub fn parse_overrides(values: &[Value]) -> Result<Vec<OverrideRule>, ConfigError> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| OverrideRule::from_value(i, v))
        .collect()
}

/// Find the first rule that applies to `resource` and has a usable schema.
///
/// Returns the rule's index and schema string.
pub fn first_match<'a>(
    rules: &'a [OverrideRule],
    resource: &Resource,
    file: &str,
    engine: &dyn QueryEngine,
) -> Option<(usize, &'a str)> {
    rules.iter().enumerate().find_map(|(i, rule)| {
        if rule.schema.is_empty() || !rule.matches(resource, file, engine) {
            return None;
        }
        Some((i, rule.schema.as_str()))
    })
}

/// Compare two values, treating numerically equal numbers as equal.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).map(|y| values_equal(x, y)).unwrap_or(false))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::JmespathEngine;
    use serde_json::json;

    fn helm_release() -> Resource {
        Resource::from_tree(
            json!({
                "apiVersion": "helm.toolkit.fluxcd.io/v2",
                "kind": "HelmRelease",
                "spec": {
                    "chart": { "spec": { "chart": "app-template", "version": "3.5.1" } },
                    "replicas": 3
                }
            }),
            "core",
        )
        .unwrap()
    }

    fn rule(value: Value) -> OverrideRule {
        OverrideRule::from_value(0, &value).unwrap()
    }

    fn applies(value: Value) -> bool {
        rule(value).matches(&helm_release(), "kubernetes/apps/media/helmrelease.yaml", &JmespathEngine)
    }

    #[test]
    fn empty_predicate_matches_everything() {
        assert!(applies(json!({ "schema": "x" })));
        assert!(applies(json!({ "match": {}, "schema": "x" })));
    }

    #[test]
    fn when_is_an_alias_for_match() {
        assert!(applies(json!({ "when": { "kind": "HelmRelease" }, "schema": "x" })));
        assert!(!applies(json!({ "when": { "kind": "Kustomization" }, "schema": "x" })));
    }

    #[test]
    fn empty_match_falls_back_to_when() {
        assert!(!applies(json!({ "match": {}, "when": { "kind": "Kustomization" }, "schema": "x" })));
        assert!(!applies(json!({ "match": "", "when": { "kind": "Kustomization" }, "schema": "x" })));
        assert!(applies(json!({ "match": {}, "when": { "kind": "HelmRelease" }, "schema": "x" })));
        assert!(applies(json!({ "match": {}, "when": {}, "schema": "x" })));
    }

    #[test]
    fn non_mapping_predicate_never_matches() {
        let r = rule(json!({ "match": "HelmRelease", "schema": "x" }));
        assert!(r.predicate.is_none());
        assert!(!r.matches(&helm_release(), "a.yaml", &JmespathEngine));
    }

    #[test]
    fn non_mapping_rule_is_config_error() {
        let err = OverrideRule::from_value(4, &json!(["kind"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { index: 4, .. }));
    }

    #[test]
    fn field_conditions_scalar_and_list() {
        assert!(applies(json!({ "match": { "kind": "HelmRelease" } })));
        assert!(!applies(json!({ "match": { "kind": "helmrelease" } })));
        assert!(applies(json!({ "match": { "kind": ["Kustomization", "HelmRelease"] } })));
        assert!(applies(json!({ "match": { "apiGroup": "helm.toolkit.fluxcd.io" } })));
        assert!(applies(json!({ "match": { "apiVersion": "v2" } })));
        assert!(!applies(json!({ "match": { "apiVersion": "v2beta1" } })));
        assert!(applies(json!({ "match": { "apiVersionFull": ["helm.toolkit.fluxcd.io/v2"] } })));
    }

    #[test]
    fn all_conditions_must_hold() {
        assert!(!applies(json!({
            "match": { "kind": "HelmRelease", "apiVersion": "v1" }
        })));
    }

    #[test]
    fn file_regex_searches_anywhere_in_path() {
        assert!(applies(json!({ "match": { "file_regex": "apps/media" } })));
        assert!(applies(json!({ "match": { "file_regex": "\\.yaml$" } })));
        assert!(!applies(json!({ "match": { "file_regex": "^apps/" } })));
    }

    #[test]
    fn invalid_regex_is_config_error() {
        let err = OverrideRule::from_value(2, &json!({ "match": { "file_regex": "(" } }))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegex { index: 2, .. }));
    }

    #[test]
    fn query_exists() {
        assert!(applies(json!({ "match": { "jmespath": "spec.chart", "exists": true } })));
        assert!(!applies(json!({ "match": { "jmespath": "spec.nope", "exists": true } })));
        assert!(applies(json!({ "match": { "jmespath": "spec.nope", "exists": false } })));
    }

    #[test]
    fn query_equals() {
        assert!(applies(json!({
            "match": { "jmespath": "spec.chart.spec.chart", "equals": "app-template" }
        })));
        assert!(!applies(json!({
            "match": { "jmespath": "spec.chart.spec.chart", "equals": "other" }
        })));
        assert!(applies(json!({ "match": { "jmespath": "spec.replicas", "equals": 3.0 } })));
    }

    #[test]
    fn query_one_of() {
        assert!(applies(json!({
            "match": { "jmespath": "spec.chart.spec.chart", "one_of": ["x", "app-template"] }
        })));
        assert!(!applies(json!({
            "match": { "jmespath": "spec.chart.spec.chart", "one_of": ["x"] }
        })));
        // a non-list is a non-match, not an error
        assert!(!applies(json!({
            "match": { "jmespath": "spec.chart.spec.chart", "one_of": "app-template" }
        })));
    }

    #[test]
    fn query_match_regex() {
        assert!(applies(json!({
            "match": { "jmespath": "spec.chart.spec.version", "match_regex": "^3\\." }
        })));
        assert!(applies(json!({ "match": { "jmespath": "spec.replicas", "match_regex": "3" } })));
        assert!(!applies(json!({ "match": { "jmespath": "spec.nope", "match_regex": ".*" } })));
    }

    #[test]
    fn query_sub_conditions_are_conjunctive() {
        assert!(!applies(json!({
            "match": {
                "jmespath": "spec.chart.spec.chart",
                "exists": true,
                "equals": "app-template",
                "match_regex": "^other"
            }
        })));
    }

    #[test]
    fn broken_query_is_non_match() {
        assert!(!applies(json!({ "match": { "jmespath": "spec.[", "exists": false } })));
    }

    #[test]
    fn first_match_wins_and_order_matters() {
        let a = json!({ "match": { "kind": "HelmRelease" }, "schema": "https://a/x.json" });
        let b = json!({ "match": { "apiVersion": "v2" }, "schema": "https://b/x.json" });
        let res = helm_release();

        let rules = parse_overrides(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(
            first_match(&rules, &res, "f.yaml", &JmespathEngine),
            Some((0, "https://a/x.json"))
        );

        let rules = parse_overrides(&[b, a]).unwrap();
        assert_eq!(
            first_match(&rules, &res, "f.yaml", &JmespathEngine),
            Some((0, "https://b/x.json"))
        );
    }

    #[test]
    fn blank_schema_falls_through_to_next_rule() {
        let rules = parse_overrides(&[
            json!({ "match": { "kind": "HelmRelease" }, "schema": "   " }),
            json!({ "match": { "kind": "HelmRelease" } }),
            json!({ "match": { "kind": "HelmRelease" }, "schema": " https://c/x.json " }),
        ])
        .unwrap();
        assert_eq!(
            first_match(&rules, &helm_release(), "f.yaml", &JmespathEngine),
            Some((2, "https://c/x.json"))
        );
    }

    #[test]
    fn no_rule_matches() {
        let rules = parse_overrides(&[json!({ "match": { "kind": "Pod" }, "schema": "x" })]).unwrap();
        assert_eq!(first_match(&rules, &helm_release(), "f.yaml", &JmespathEngine), None);
    }
}
