//! Error handling for schema publishing
//!
//! This module provides the error types surfaced by the publish and unpublish
//! orchestration, with recovery guidance, using the thiserror crate.

use std::fmt;
use thiserror::Error;

/// A failure tied to one schema inside a batch operation
#[derive(Debug)]
pub struct ArtifactFailure {
    /// Canonical name of the schema that failed
    pub schema_name: String,

    /// Registry the operation targeted
    pub registry: String,

    /// The underlying error for this schema
    pub error: PublishError,
}

impl fmt::Display for ArtifactFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}: {}", self.schema_name, self.registry, self.error)
    }
}

/// Main error type for schema publishing operations
#[derive(Error, Debug)]
pub enum PublishError {
    // Local validation errors
    #[error("Invalid argument '{field}': {message}")]
    InvalidArgument { field: &'static str, message: String },

    #[error("Nothing to publish. No schema definitions provided")]
    NothingToPublish,

    #[error("[{registry}] Schema '{schema}' was already published")]
    DuplicatePublish { registry: String, schema: String },

    #[error("Schema registrar is closed")]
    RegistrarClosed,

    // Remote errors
    #[error("[{registry}] Registry operation failed for schema '{schema}': {source}")]
    RemoteFailure {
        registry: String,
        schema: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("[{registry}] Publish task for schema '{schema}' did not complete: {message}")]
    TaskFailed {
        registry: String,
        schema: String,
        message: String,
    },

    // Aggregate errors
    #[error(
        "[{registry}] Published {} of {requested} schemas; failed: {}",
        .requested - .failures.len(),
        join_failures(.failures)
    )]
    PartialPublish {
        registry: String,
        requested: usize,
        failures: Vec<ArtifactFailure>,
    },

    #[error(
        "Unpublished {} of {requested} schemas; failed: {}",
        .requested - .failures.len(),
        join_failures(.failures)
    )]
    PartialUnpublish {
        requested: usize,
        failures: Vec<ArtifactFailure>,
    },

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

fn join_failures(failures: &[ArtifactFailure]) -> String {
    failures
        .iter()
        .map(|f| f.schema_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PublishError {
    /// Get the registry name associated with this error, if any
    pub fn registry(&self) -> Option<&str> {
        match self {
            Self::DuplicatePublish { registry, .. }
            | Self::RemoteFailure { registry, .. }
            | Self::TaskFailed { registry, .. }
            | Self::PartialPublish { registry, .. } => Some(registry),
            Self::InvalidArgument { .. }
            | Self::NothingToPublish
            | Self::RegistrarClosed
            | Self::PartialUnpublish { .. }
            | Self::ConfigError(_) => None,
        }
    }

    /// Per-schema failures carried by an aggregate error
    pub fn failures(&self) -> &[ArtifactFailure] {
        match self {
            Self::PartialPublish { failures, .. } | Self::PartialUnpublish { failures, .. } => {
                failures
            }
            _ => &[],
        }
    }

    /// Check if retrying the same operation may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::RemoteFailure { .. } | Self::TaskFailed { .. } => true,
            Self::PartialPublish { failures, .. } | Self::PartialUnpublish { failures, .. } => {
                failures.iter().any(|f| f.error.is_recoverable())
            }
            Self::InvalidArgument { .. }
            | Self::NothingToPublish
            | Self::DuplicatePublish { .. }
            | Self::RegistrarClosed
            | Self::ConfigError(_) => false,
        }
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidArgument { .. } => {
                vec!["Provide a non-empty registry name and schema name"]
            }
            Self::NothingToPublish => vec!["Pass at least one schema to publish"],
            Self::DuplicatePublish { .. } => vec![
                "Unpublish the existing registration first",
                "Publish to a different registry",
            ],
            Self::RegistrarClosed => {
                vec!["Create a new publisher; a closed registrar cannot be reused"]
            }
            Self::RemoteFailure { .. } => vec![
                "Check that the registry is reachable",
                "Retry the operation",
            ],
            Self::TaskFailed { .. } => vec!["Check the logs for a panic in the registry client"],
            Self::PartialPublish { .. } => vec![
                "Inspect the per-schema failures",
                "Retry only the failed schemas; succeeded schemas remain published",
            ],
            Self::PartialUnpublish { .. } => vec![
                "Inspect the per-schema failures",
                "Remove the remaining records from the registry manually",
            ],
            Self::ConfigError(_) => vec!["Check .schema-publisher.yaml"],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::NothingToPublish => "NOTHING_TO_PUBLISH",
            Self::DuplicatePublish { .. } => "DUPLICATE_PUBLISH",
            Self::RegistrarClosed => "REGISTRAR_CLOSED",
            Self::RemoteFailure { .. } => "REMOTE_FAILURE",
            Self::TaskFailed { .. } => "TASK_FAILED",
            Self::PartialPublish { .. } => "PARTIAL_PUBLISH",
            Self::PartialUnpublish { .. } => "PARTIAL_UNPUBLISH",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(schema: &str) -> PublishError {
        PublishError::RemoteFailure {
            registry: "primary".to_string(),
            schema: schema.to_string(),
            source: anyhow::anyhow!("connection refused"),
        }
    }

    #[test]
    fn test_duplicate_publish_error() {
        let error = PublishError::DuplicatePublish {
            registry: "primary".to_string(),
            schema: "Orders".to_string(),
        };

        assert_eq!(error.registry(), Some("primary"));
        assert!(!error.is_recoverable());
        assert_eq!(error.code(), "DUPLICATE_PUBLISH");
        assert!(error.to_string().contains("'Orders' was already published"));
    }

    #[test]
    fn test_remote_failure_preserves_source() {
        let error = remote("Orders");

        assert!(error.is_recoverable());
        assert_eq!(error.code(), "REMOTE_FAILURE");
        let source = std::error::Error::source(&error).unwrap();
        assert_eq!(source.to_string(), "connection refused");
    }

    #[test]
    fn test_partial_publish_lists_failed_schemas() {
        let error = PublishError::PartialPublish {
            registry: "primary".to_string(),
            requested: 3,
            failures: vec![
                ArtifactFailure {
                    schema_name: "Orders".to_string(),
                    registry: "primary".to_string(),
                    error: remote("Orders"),
                },
                ArtifactFailure {
                    schema_name: "Invoices".to_string(),
                    registry: "primary".to_string(),
                    error: remote("Invoices"),
                },
            ],
        };

        let display = error.to_string();
        assert!(display.contains("Published 1 of 3"));
        assert!(display.contains("Orders, Invoices"));
        assert_eq!(error.failures().len(), 2);
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_local_errors_are_not_recoverable() {
        let errors = [
            PublishError::NothingToPublish,
            PublishError::RegistrarClosed,
            PublishError::InvalidArgument {
                field: "registry",
                message: "must not be empty".to_string(),
            },
        ];

        for error in errors {
            assert!(!error.is_recoverable(), "{} should not be recoverable", error.code());
            assert!(error.registry().is_none());
            assert!(!error.suggested_actions().is_empty());
        }
    }

    #[test]
    fn test_artifact_failure_display() {
        let failure = ArtifactFailure {
            schema_name: "Orders".to_string(),
            registry: "secondary".to_string(),
            error: PublishError::RegistrarClosed,
        };

        assert_eq!(failure.to_string(), "Orders@secondary: Schema registrar is closed");
    }
}
