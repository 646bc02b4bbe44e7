//! Configuration structures and types for schema-publisher
//!
//! This module provides type-safe configuration management with serde support.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Registry name used when none is given
pub const DEFAULT_REGISTRY_NAME: &str = "default";

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublisherConfig {
    /// Schema version (required)
    pub version: String,

    /// Publisher identity settings (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<PublisherSettings>,

    /// Registry definitions keyed by registry name
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub registries: HashMap<String, RegistryOptions>,

    /// Publish behaviour (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishSettings>,
}

/// Publisher identity settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PublisherSettings {
    /// Value stamped as `publisherId` (default: random UUID)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Registry used when a command does not name one
    #[serde(skip_serializing_if = "Option::is_none", rename = "defaultRegistry")]
    pub default_registry: Option<String>,
}

/// Identity and backend options of one discovery registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistryOptions {
    /// Registry name; handles and registrations are keyed on it
    #[serde(default = "default_registry_name")]
    pub name: String,

    /// Address announced to other registry participants (optional)
    #[serde(skip_serializing_if = "Option::is_none", rename = "announceAddress")]
    pub announce_address: Option<String>,

    /// Backend settings (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendConfig>,
}

fn default_registry_name() -> String {
    DEFAULT_REGISTRY_NAME.to_string()
}

impl RegistryOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            announce_address: None,
            backend: None,
        }
    }
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self::named(DEFAULT_REGISTRY_NAME)
    }
}

/// Registry backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    /// Backend implementation name
    pub name: String,

    /// Backend-specific values (`${VAR}` references are expanded on load)
    #[serde(default)]
    pub config: HashMap<String, String>,
}

/// Registry backends the publisher can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// In-process registry
    Local,
}

impl BackendKind {
    pub const ALL: &'static [BackendKind] = &[BackendKind::Local];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
        }
    }

    /// Parse a configured backend name, `None` if unsupported
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Comma separated list of supported names, for messages
    pub fn supported_names() -> String {
        Self::ALL
            .iter()
            .map(|kind| kind.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Publish behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishSettings {
    /// Maximum concurrent publishes within one batch (default: unbounded)
    #[serde(skip_serializing_if = "Option::is_none", rename = "maxConcurrency")]
    pub max_concurrency: Option<usize>,

    /// Timeout applied by callers around a whole batch (default: 30)
    #[serde(skip_serializing_if = "Option::is_none", rename = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            timeout_secs: Some(30),
        }
    }
}

impl PublisherConfig {
    /// Resolve the options for a registry, falling back to bare options with that name
    pub fn registry_options(&self, name: &str) -> RegistryOptions {
        self.registries
            .get(name)
            .cloned()
            .map(|mut options| {
                options.name = name.to_string();
                options
            })
            .unwrap_or_else(|| RegistryOptions::named(name))
    }

    /// Name of the registry to use when none was requested
    pub fn default_registry(&self) -> &str {
        self.publisher
            .as_ref()
            .and_then(|p| p.default_registry.as_deref())
            .unwrap_or(DEFAULT_REGISTRY_NAME)
    }
}

/// Default configuration values
impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            publisher: None,
            registries: HashMap::new(),
            publish: Some(PublishSettings::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PublisherConfig::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.default_registry(), DEFAULT_REGISTRY_NAME);
        assert_eq!(config.publish.unwrap().timeout_secs, Some(30));
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
version: "1.0"
publisher:
  id: billing-service
  defaultRegistry: primary
registries:
  primary:
    announceAddress: schemas.primary
    backend:
      name: local
      config:
        token: "${REGISTRY_TOKEN}"
publish:
  maxConcurrency: 4
"#;
        let config: PublisherConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.default_registry(), "primary");

        let primary = config.registry_options("primary");
        assert_eq!(primary.name, "primary");
        assert_eq!(primary.announce_address.as_deref(), Some("schemas.primary"));
        assert_eq!(primary.backend.unwrap().config["token"], "${REGISTRY_TOKEN}");
        assert_eq!(config.publish.unwrap().max_concurrency, Some(4));
    }

    #[test]
    fn test_unknown_registry_gets_bare_options() {
        let config = PublisherConfig::default();
        let options = config.registry_options("secondary");
        assert_eq!(options, RegistryOptions::named("secondary"));
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!(BackendKind::parse("local"), Some(BackendKind::Local));
        assert_eq!(BackendKind::parse(" Local "), Some(BackendKind::Local));
        assert_eq!(BackendKind::parse("consul"), None);
        assert_eq!(BackendKind::supported_names(), "local");
    }

    #[test]
    fn test_serialize_config() {
        let config = PublisherConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("version: '1.0'"));
        assert!(yaml.contains("timeoutSecs: 30"));
    }
}
