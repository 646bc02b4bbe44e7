//! Configuration file loader for schema-publisher
//!
//! This module provides configuration loading, validation, and merging capabilities.

use super::config::*;
use crate::core::error::PublishError;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".schema-publisher.yaml";

lazy_static! {
    /// Environment variable reference (${VAR_NAME})
    static ref ENV_VAR_REGEX: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Project path to load config from
    pub project_path: PathBuf,

    /// Home directory holding the global config (skipped when `None`)
    pub home_dir: Option<PathBuf>,

    /// CLI arguments (highest priority)
    pub cli_args: Option<PublisherConfig>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

/// Configuration validation result
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationResult {
    /// Is configuration valid?
    pub valid: bool,

    /// Validation errors
    pub errors: Vec<ConfigValidationError>,

    /// Validation warnings
    pub warnings: Vec<ConfigValidationWarning>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Field path (e.g., "registries.primary.backend.name")
    pub field: String,

    /// Error message
    pub message: String,
}

/// Configuration validation warning
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationWarning {
    /// Field path
    pub field: String,

    /// Warning message
    pub message: String,

    /// Suggestion
    pub suggestion: Option<String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Project config (./.schema-publisher.yaml)
    /// 4. Global config (~/.schema-publisher.yaml)
    /// 5. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<PublisherConfig, PublishError> {
        let mut configs: Vec<PublisherConfig> = vec![PublisherConfig::default()];

        if let Some(home_dir) = &options.home_dir
            && let Some(global_config) = Self::load_config_file(&home_dir.join(CONFIG_FILENAME)).await?
        {
            configs.push(global_config);
        }

        let project_config_path = options.project_path.join(CONFIG_FILENAME);
        if let Some(project_config) = Self::load_config_file(&project_config_path).await? {
            configs.push(project_config);
        }

        if let Some(env_config) = Self::load_env_config(&options.env) {
            configs.push(env_config);
        }

        if let Some(cli_config) = options.cli_args {
            configs.push(cli_config);
        }

        let merged_config = Self::merge_configs(configs);

        Ok(Self::expand_env_vars(merged_config, &options.env))
    }

    /// Build the CLI layer from command-line flags, `None` if no flag was given
    pub fn cli_overrides(
        default_registry: Option<String>,
        max_concurrency: Option<usize>,
    ) -> Option<PublisherConfig> {
        if default_registry.is_none() && max_concurrency.is_none() {
            return None;
        }

        Some(PublisherConfig {
            publisher: default_registry.map(|name| PublisherSettings {
                id: None,
                default_registry: Some(name),
            }),
            publish: max_concurrency.map(|max| PublishSettings {
                max_concurrency: Some(max),
                timeout_secs: None,
            }),
            ..Default::default()
        })
    }

    /// Load configuration from a YAML file, `None` if it does not exist
    pub async fn load_config_file(file_path: &Path) -> Result<Option<PublisherConfig>, PublishError> {
        if !file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(file_path).await.map_err(|e| {
            PublishError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: PublisherConfig = serde_yaml::from_str(&content).map_err(|e| {
            PublishError::ConfigError(format!("Failed to parse YAML config: {}", e))
        })?;

        debug!(path = %file_path.display(), "loaded configuration file");
        Ok(Some(config))
    }

    /// Load configuration from environment variables
    fn load_env_config(env: &HashMap<String, String>) -> Option<PublisherConfig> {
        let mut config = PublisherConfig {
            publish: None,
            ..Default::default()
        };
        let mut has_changes = false;

        // SCHEMA_PUBLISHER_ID -> publisher.id
        if let Some(id) = env.get("SCHEMA_PUBLISHER_ID") {
            config.publisher.get_or_insert_with(Default::default).id = Some(id.clone());
            has_changes = true;
        }

        // SCHEMA_PUBLISHER_REGISTRY -> publisher.defaultRegistry
        if let Some(registry) = env.get("SCHEMA_PUBLISHER_REGISTRY") {
            config.publisher.get_or_insert_with(Default::default).default_registry =
                Some(registry.clone());
            has_changes = true;
        }

        // SCHEMA_PUBLISHER_MAX_CONCURRENCY -> publish.maxConcurrency
        if let Some(value) = env.get("SCHEMA_PUBLISHER_MAX_CONCURRENCY") {
            match value.parse::<usize>() {
                Ok(max) => {
                    config.publish = Some(PublishSettings {
                        max_concurrency: Some(max),
                        timeout_secs: None,
                    });
                    has_changes = true;
                }
                Err(_) => warn!(value = %value, "ignoring invalid SCHEMA_PUBLISHER_MAX_CONCURRENCY"),
            }
        }

        if has_changes { Some(config) } else { None }
    }

    /// Merge multiple configurations with priority
    fn merge_configs(configs: Vec<PublisherConfig>) -> PublisherConfig {
        let mut result = PublisherConfig::default();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    /// Merge source config into target
    fn merge_into(target: &mut PublisherConfig, source: PublisherConfig) {
        if !source.version.is_empty() {
            target.version = source.version;
        }

        if let Some(source_publisher) = source.publisher {
            let target_publisher = target.publisher.get_or_insert_with(Default::default);
            if source_publisher.id.is_some() {
                target_publisher.id = source_publisher.id;
            }
            if source_publisher.default_registry.is_some() {
                target_publisher.default_registry = source_publisher.default_registry;
            }
        }

        // Registries are replaced per name
        target.registries.extend(source.registries);

        if let Some(source_publish) = source.publish {
            let target_publish = target.publish.get_or_insert_with(Default::default);
            if source_publish.max_concurrency.is_some() {
                target_publish.max_concurrency = source_publish.max_concurrency;
            }
            if source_publish.timeout_secs.is_some() {
                target_publish.timeout_secs = source_publish.timeout_secs;
            }
        }
    }

    /// Expand `${VAR}` references in registry backend configuration
    fn expand_env_vars(mut config: PublisherConfig, env: &HashMap<String, String>) -> PublisherConfig {
        for options in config.registries.values_mut() {
            if let Some(backend) = &mut options.backend {
                for value in backend.config.values_mut() {
                    *value = Self::expand_string(value, env);
                }
            }
        }

        config
    }

    /// Expand environment variables in a single string
    fn expand_string(input: &str, env: &HashMap<String, String>) -> String {
        let mut result = input.to_string();
        for cap in ENV_VAR_REGEX.captures_iter(input) {
            let var_name = &cap[1];

            if let Some(value) = env.get(var_name) {
                result = result.replace(&format!("${{{}}}", var_name), value);
            } else {
                warn!(variable = var_name, "environment variable not found");
            }
        }

        result
    }

    /// Validate configuration
    pub fn validate(config: &PublisherConfig) -> ConfigValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if config.version.is_empty() {
            errors.push(ConfigValidationError {
                field: "version".to_string(),
                message: "Version is required".to_string(),
            });
        } else if config.version != "1.0" {
            warnings.push(ConfigValidationWarning {
                field: "version".to_string(),
                message: format!("Unknown version: {}", config.version),
                suggestion: Some("Currently supported version is \"1.0\" only".to_string()),
            });
        }

        if let Some(publisher) = &config.publisher {
            if publisher.id.as_deref().is_some_and(|id| id.trim().is_empty()) {
                errors.push(ConfigValidationError {
                    field: "publisher.id".to_string(),
                    message: "publisher id must not be blank".to_string(),
                });
            }
            if let Some(default_registry) = &publisher.default_registry
                && !config.registries.is_empty()
                && !config.registries.contains_key(default_registry)
            {
                warnings.push(ConfigValidationWarning {
                    field: "publisher.defaultRegistry".to_string(),
                    message: format!("Registry '{}' is not defined under registries", default_registry),
                    suggestion: Some("Add it to registries or fix the name".to_string()),
                });
            }
        }

        for (name, options) in &config.registries {
            if name.trim().is_empty() {
                errors.push(ConfigValidationError {
                    field: "registries".to_string(),
                    message: "registry names must not be blank".to_string(),
                });
            }
            if let Some(backend) = &options.backend {
                if backend.name.trim().is_empty() {
                    errors.push(ConfigValidationError {
                        field: format!("registries.{}.backend.name", name),
                        message: "backend name is required".to_string(),
                    });
                } else if BackendKind::parse(&backend.name).is_none() {
                    errors.push(ConfigValidationError {
                        field: format!("registries.{}.backend.name", name),
                        message: format!(
                            "unknown backend '{}' (supported: {})",
                            backend.name,
                            BackendKind::supported_names()
                        ),
                    });
                }
            }
        }

        if let Some(publish) = &config.publish {
            if publish.max_concurrency == Some(0) {
                errors.push(ConfigValidationError {
                    field: "publish.maxConcurrency".to_string(),
                    message: "maxConcurrency must be at least 1".to_string(),
                });
            }
            if publish.timeout_secs == Some(0) {
                errors.push(ConfigValidationError {
                    field: "publish.timeoutSecs".to_string(),
                    message: "timeoutSecs must be at least 1".to_string(),
                });
            }
        }

        ConfigValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Format validation result as human-readable string
    pub fn format_validation_result(result: &ConfigValidationResult) -> String {
        let mut lines = Vec::new();

        if result.valid {
            lines.push("✅ Configuration validation succeeded".to_string());
        } else {
            lines.push("❌ Configuration has errors".to_string());
        }

        if !result.errors.is_empty() {
            lines.push("\n🔴 Errors:".to_string());
            for error in &result.errors {
                lines.push(format!("  - [{}] {}", error.field, error.message));
            }
        }

        if !result.warnings.is_empty() {
            lines.push("\n🟡 Warnings:".to_string());
            for warning in &result.warnings {
                lines.push(format!("  - [{}] {}", warning.field, warning.message));
                if let Some(suggestion) = &warning.suggestion {
                    lines.push(format!("    Suggestion: {}", suggestion));
                }
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_env_config() {
        let mut env = HashMap::new();
        env.insert("SCHEMA_PUBLISHER_ID".to_string(), "orders-service".to_string());
        env.insert("SCHEMA_PUBLISHER_REGISTRY".to_string(), "primary".to_string());
        env.insert("SCHEMA_PUBLISHER_MAX_CONCURRENCY".to_string(), "8".to_string());

        let config = ConfigLoader::load_env_config(&env).unwrap();
        let publisher = config.publisher.unwrap();

        assert_eq!(publisher.id.as_deref(), Some("orders-service"));
        assert_eq!(publisher.default_registry.as_deref(), Some("primary"));
        assert_eq!(config.publish.unwrap().max_concurrency, Some(8));
    }

    #[test]
    fn test_load_env_config_without_variables() {
        assert!(ConfigLoader::load_env_config(&HashMap::new()).is_none());
    }

    #[test]
    fn test_expand_string() {
        let mut env = HashMap::new();
        env.insert("REGISTRY_TOKEN".to_string(), "secret123".to_string());

        let result = ConfigLoader::expand_string("Bearer ${REGISTRY_TOKEN} ${MISSING}", &env);

        assert_eq!(result, "Bearer secret123 ${MISSING}");
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let base = PublisherConfig {
            publisher: Some(PublisherSettings {
                id: Some("base-id".to_string()),
                default_registry: Some("primary".to_string()),
            }),
            ..Default::default()
        };
        let overlay = PublisherConfig {
            publisher: Some(PublisherSettings {
                id: None,
                default_registry: Some("secondary".to_string()),
            }),
            publish: Some(PublishSettings {
                max_concurrency: Some(2),
                timeout_secs: None,
            }),
            ..Default::default()
        };

        let merged = ConfigLoader::merge_configs(vec![base, overlay]);
        let publisher = merged.publisher.unwrap();
        let publish = merged.publish.unwrap();

        assert_eq!(publisher.id.as_deref(), Some("base-id"));
        assert_eq!(publisher.default_registry.as_deref(), Some("secondary"));
        assert_eq!(publish.max_concurrency, Some(2));
        assert_eq!(publish.timeout_secs, Some(30));
    }

    #[tokio::test]
    async fn test_load_project_file_with_env_priority() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = r#"
version: "1.0"
publisher:
  id: from-file
registries:
  primary:
    backend:
      name: local
      config:
        token: "${REGISTRY_TOKEN}"
"#;
        std::fs::write(dir.path().join(CONFIG_FILENAME), yaml).unwrap();

        let mut env = HashMap::new();
        env.insert("SCHEMA_PUBLISHER_ID".to_string(), "from-env".to_string());
        env.insert("REGISTRY_TOKEN".to_string(), "t0k3n".to_string());

        let config = ConfigLoader::load(ConfigLoadOptions {
            project_path: dir.path().to_path_buf(),
            env,
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(config.publisher.unwrap().id.as_deref(), Some("from-env"));
        let backend = config.registries["primary"].backend.clone().unwrap();
        assert_eq!(backend.config["token"], "t0k3n");
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "registries: [not, a, map").unwrap();

        let result = ConfigLoader::load(ConfigLoadOptions {
            project_path: dir.path().to_path_buf(),
            ..Default::default()
        })
        .await;

        assert!(matches!(result, Err(PublishError::ConfigError(_))));
    }

    #[test]
    fn test_validate_version_required() {
        let config = PublisherConfig {
            version: String::new(),
            ..Default::default()
        };

        let result = ConfigLoader::validate(&config);

        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "version");
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let config = PublisherConfig {
            publish: Some(PublishSettings {
                max_concurrency: Some(0),
                timeout_secs: Some(10),
            }),
            ..Default::default()
        };

        let result = ConfigLoader::validate(&config);

        assert!(!result.valid);
        assert_eq!(result.errors[0].field, "publish.maxConcurrency");
    }

    #[test]
    fn test_validate_unknown_default_registry_warning() {
        let mut config = PublisherConfig {
            publisher: Some(PublisherSettings {
                id: None,
                default_registry: Some("tertiary".to_string()),
            }),
            ..Default::default()
        };
        config
            .registries
            .insert("primary".to_string(), RegistryOptions::named("primary"));

        let result = ConfigLoader::validate(&config);

        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].field, "publisher.defaultRegistry");
    }

    #[test]
    fn test_validate_unknown_backend() {
        let mut config = PublisherConfig::default();
        let mut primary = RegistryOptions::named("primary");
        primary.backend = Some(BackendConfig {
            name: "consul".to_string(),
            config: HashMap::new(),
        });
        config.registries.insert("primary".to_string(), primary);

        let result = ConfigLoader::validate(&config);

        assert!(!result.valid);
        assert_eq!(result.errors[0].field, "registries.primary.backend.name");
        assert!(result.errors[0].message.contains("consul"));
    }

    #[tokio::test]
    async fn test_cli_overrides_win_over_env() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = HashMap::new();
        env.insert("SCHEMA_PUBLISHER_REGISTRY".to_string(), "secondary".to_string());
        env.insert("SCHEMA_PUBLISHER_MAX_CONCURRENCY".to_string(), "8".to_string());

        let config = ConfigLoader::load(ConfigLoadOptions {
            project_path: dir.path().to_path_buf(),
            cli_args: ConfigLoader::cli_overrides(Some("primary".to_string()), Some(2)),
            env,
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(config.default_registry(), "primary");
        let publish = config.publish.unwrap();
        assert_eq!(publish.max_concurrency, Some(2));
        assert_eq!(publish.timeout_secs, Some(30));
    }

    #[test]
    fn test_cli_overrides_without_flags() {
        assert!(ConfigLoader::cli_overrides(None, None).is_none());
    }

    #[test]
    fn test_format_validation_result() {
        let result = ConfigValidationResult {
            valid: false,
            errors: vec![ConfigValidationError {
                field: "version".to_string(),
                message: "Version is required".to_string(),
            }],
            warnings: vec![ConfigValidationWarning {
                field: "publisher.defaultRegistry".to_string(),
                message: "Registry 'x' is not defined under registries".to_string(),
                suggestion: Some("Add it to registries or fix the name".to_string()),
            }],
        };

        let formatted = ConfigLoader::format_validation_result(&result);

        assert!(formatted.contains("❌ Configuration has errors"));
        assert!(formatted.contains("[version]"));
        assert!(formatted.contains("🟡 Warnings:"));
        assert!(formatted.contains("Suggestion: Add it to registries"));
    }
}
