//! Run configuration.
//!
//! Settings come from command-line arguments, a YAML config file and the
//! environment, in that order of precedence:
//!
//! | Setting | Sources |
//! |---------|---------|
//! | `domain` | `--domain`, `domain:`, `$YAML_SCHEMA_DOMAIN`, `$DOMAIN` |
//! | `core_group` | `--core-group`, `core_group:`, `"core"` |
//! | `schema_template` | `--schema-template`, `schema_template:`, [`DEFAULT_SCHEMA_TEMPLATE`] |
//! | `include_core` | `--include-core`/`--no-include-core`, `include_core:`, `false` |
//! | `overrides` | `overrides:` |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use serde_yaml::Value as YamlValue;

use crate::error::ConfigError;
use crate::resource::{is_truthy, yaml_to_json};
use crate::rules::{parse_overrides, OverrideRule};
use crate::schema::DEFAULT_SCHEMA_TEMPLATE;

/// Config file read when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = ".k8s-schema-hook.yaml";

/// Group name used for core API resources unless configured otherwise.
pub const DEFAULT_CORE_GROUP: &str = "core";

/// Environment variables consulted for the domain, in order.
pub const DOMAIN_ENV_VARS: &[&str] = &["YAML_SCHEMA_DOMAIN", "DOMAIN"];

/// Immutable settings for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Schema host, without scheme or trailing slash.
    pub domain: String,
    /// `{apiGroup}` value for core resources.
    pub core_group: String,
    pub schema_template: String,
    /// Whether core resources (`apiVersion: v1`) get a directive.
    pub include_core: bool,
    pub overrides: Vec<OverrideRule>,
}

impl Config {
    /// Create a config with defaults for everything but the domain.
    pub fn new(domain: &str) -> Self {
        Self {
            domain: normalize_domain(domain),
            core_group: DEFAULT_CORE_GROUP.to_string(),
            schema_template: DEFAULT_SCHEMA_TEMPLATE.to_string(),
            include_core: false,
            overrides: Vec::new(),
        }
    }

    /// Load the config file named by `args` and merge all sources.
    pub fn load(args: &ConfigArgs) -> Result<Self, ConfigError> {
        let file = ConfigFile::load(&args.config_path)?;
        Self::from_sources(args, file, |name| std::env::var(name).ok())
    }

    /// Merge command-line arguments, a parsed config file and the environment.
    pub fn from_sources<E>(args: &ConfigArgs, file: ConfigFile, env: E) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let domain = non_empty(args.domain.clone())
            .or_else(|| non_empty(file.domain.clone()))
            .or_else(|| DOMAIN_ENV_VARS.iter().find_map(|name| non_empty(env(name))))
            .ok_or(ConfigError::MissingDomain)?;

        let core_group = non_empty(args.core_group.clone())
            .or_else(|| non_empty(file.core_group.clone()))
            .unwrap_or_else(|| DEFAULT_CORE_GROUP.to_string());

        let schema_template = non_empty(args.schema_template.clone())
            .or_else(|| non_empty(file.schema_template.clone()))
            .unwrap_or_else(|| DEFAULT_SCHEMA_TEMPLATE.to_string());

        let include_core = args
            .include_core
            .or(file.include_core)
            .unwrap_or(false);

        let overrides = match file.overrides {
            None | Some(YamlValue::Null) => Vec::new(),
            Some(YamlValue::Sequence(items)) => {
                let items: Vec<_> = items.into_iter().map(yaml_to_json).collect();
                parse_overrides(&items)?
            }
            Some(_) => return Err(ConfigError::OverridesNotList),
        };

        Ok(Self {
            domain: normalize_domain(&domain),
            core_group,
            schema_template,
            include_core,
            overrides,
        })
    }
}

/// Settings supplied on the command line.
#[derive(Debug, Clone)]
pub struct ConfigArgs {
    pub config_path: PathBuf,
    pub domain: Option<String>,
    pub core_group: Option<String>,
    pub schema_template: Option<String>,
    pub include_core: Option<bool>,
}

impl Default for ConfigArgs {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            domain: None,
            core_group: None,
            schema_template: None,
            include_core: None,
        }
    }
}

/// Contents of the YAML config file.
///
/// Scalars are accepted loosely: `domain: 123` reads as `"123"` and
/// `include_core: "yes"` as true.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default, deserialize_with = "lenient_string")]
    pub domain: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub core_group: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub schema_template: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub include_core: Option<bool>,
    /// Validated when merged; a non-list is rejected there.
    pub overrides: Option<YamlValue>,
}

impl ConfigFile {
    /// Read a config file. A missing or empty file yields an empty config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content, path)
    }

    /// Parse config file text; `path` is only used in errors.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let parse_error = |source| ConfigError::ParseConfig {
            path: path.to_path_buf(),
            source,
        };

        let value: YamlValue = serde_yaml::from_str(content).map_err(parse_error)?;
        match value {
            YamlValue::Null => Ok(Self::default()),
            YamlValue::Mapping(_) => serde_yaml::from_value(value).map_err(parse_error),
            _ => Err(ConfigError::ConfigNotMapping {
                path: path.to_path_buf(),
            }),
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = YamlValue::deserialize(deserializer)?;
    Ok(match value {
        YamlValue::Null => None,
        YamlValue::String(s) => Some(s),
        YamlValue::Bool(b) => Some(b.to_string()),
        YamlValue::Number(n) => Some(n.to_string()),
        other => Some(
            serde_yaml::to_string(&other)
                .map_err(serde::de::Error::custom)?
                .trim()
                .to_string(),
        ),
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(match YamlValue::deserialize(deserializer)? {
        YamlValue::Null => None,
        value => Some(is_truthy(&yaml_to_json(value))),
    })
}

/// Strip a leading `http://` or `https://` and trailing slashes.
pub fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim();
    let domain = domain
        .strip_prefix("https://")
        .or_else(|| domain.strip_prefix("http://"))
        .unwrap_or(domain);
    domain.trim_end_matches('/').to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn file(yaml: &str) -> ConfigFile {
        ConfigFile::parse(yaml, Path::new("test.yaml")).unwrap()
    }

    #[test]
    fn normalizes_domain() {
        assert_eq!(normalize_domain("example.com"), "example.com");
        assert_eq!(normalize_domain(" https://example.com/ "), "example.com");
        assert_eq!(normalize_domain("http://example.com/schemas//"), "example.com/schemas");
    }

    #[test]
    fn missing_domain_is_error() {
        let err = Config::from_sources(&ConfigArgs::default(), ConfigFile::default(), no_env)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingDomain));
    }

    #[test]
    fn defaults_apply() {
        let args = ConfigArgs {
            domain: Some("https://schemas.example.com/".into()),
            ..ConfigArgs::default()
        };
        let config = Config::from_sources(&args, ConfigFile::default(), no_env).unwrap();
        assert_eq!(config.domain, "schemas.example.com");
        assert_eq!(config.core_group, "core");
        assert_eq!(config.schema_template, DEFAULT_SCHEMA_TEMPLATE);
        assert!(!config.include_core);
        assert!(config.overrides.is_empty());
    }

    #[test]
    fn cli_beats_file_beats_env() {
        let env: HashMap<&str, &str> =
            [("YAML_SCHEMA_DOMAIN", "env.example"), ("DOMAIN", "fallback.example")].into();
        let lookup = |name: &str| env.get(name).map(|v| v.to_string());

        let cfg_file = || file("domain: file.example\ncore_group: legacy\ninclude_core: true\n");

        let args = ConfigArgs {
            domain: Some("cli.example".into()),
            include_core: Some(false),
            ..ConfigArgs::default()
        };
        let config = Config::from_sources(&args, cfg_file(), lookup).unwrap();
        assert_eq!(config.domain, "cli.example");
        assert_eq!(config.core_group, "legacy");
        assert!(!config.include_core);

        let config = Config::from_sources(&ConfigArgs::default(), cfg_file(), lookup).unwrap();
        assert_eq!(config.domain, "file.example");
        assert!(config.include_core);

        let config =
            Config::from_sources(&ConfigArgs::default(), ConfigFile::default(), lookup).unwrap();
        assert_eq!(config.domain, "env.example");
    }

    #[test]
    fn domain_env_fallback_order() {
        let lookup = |name: &str| (name == "DOMAIN").then(|| "fallback.example".to_string());
        let config =
            Config::from_sources(&ConfigArgs::default(), ConfigFile::default(), lookup).unwrap();
        assert_eq!(config.domain, "fallback.example");
    }

    #[test]
    fn empty_file_is_empty_config() {
        let cfg = file("");
        assert!(cfg.domain.is_none());
        let cfg = file("# just a comment\n");
        assert!(cfg.overrides.is_none());
    }

    #[test]
    fn non_mapping_file_is_error() {
        let err = ConfigFile::parse("- a\n- b\n", Path::new("c.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigNotMapping { .. }));
    }

    #[test]
    fn overrides_are_parsed_in_order() {
        let cfg = file(
            r#"
domain: example.com
overrides:
  - match:
      kind: HelmRelease
    schema: "https://a/{kind}.json"
  - when:
      file_regex: "^infra/"
    schema: https://b/x.json
"#,
        );
        let config = Config::from_sources(&ConfigArgs::default(), cfg, no_env).unwrap();
        assert_eq!(config.overrides.len(), 2);
        assert_eq!(config.overrides[0].schema, "https://a/{kind}.json");
        assert_eq!(config.overrides[1].schema, "https://b/x.json");
    }

    #[test]
    fn overrides_must_be_a_list() {
        let cfg = file("domain: example.com\noverrides:\n  kind: Pod\n");
        let err = Config::from_sources(&ConfigArgs::default(), cfg, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::OverridesNotList));
    }

    #[test]
    fn missing_config_file_is_empty() {
        let cfg = ConfigFile::load(Path::new("/nonexistent/k8s-schema-hook.yaml")).unwrap();
        assert!(cfg.domain.is_none());
    }

    #[test]
    fn scalar_fields_are_read_loosely() {
        let cfg = file("domain: 123
core_group: true
include_core: \"yes\"
");
        assert_eq!(cfg.domain.as_deref(), Some("123"));
        assert_eq!(cfg.core_group.as_deref(), Some("true"));
        assert_eq!(cfg.include_core, Some(true));

        let config = Config::from_sources(&ConfigArgs::default(), cfg, no_env).unwrap();
        assert_eq!(config.domain, "123");
        assert!(config.include_core);
    }

    #[test]
    fn include_core_falsy_values() {
        for yaml in ["include_core: 0", "include_core: \"\"", "include_core: []"] {
            assert_eq!(file(yaml).include_core, Some(false), "{yaml}");
        }
        assert_eq!(file("include_core: 1").include_core, Some(true));
        assert_eq!(file("include_core:").include_core, None);
    }
}
