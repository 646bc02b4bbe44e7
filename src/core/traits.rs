//! Core traits and types for schema publishing
//!
//! This module defines the seams between the publish orchestration and the
//! outside world: the registry client that performs the network side of a
//! publish, and the listener notified about registration lifecycle changes.

use crate::core::registrar::RegistryHandle;
use crate::core::registration::SchemaRegistration;
use crate::core::schema::{SchemaDefinition, SchemaMetadata};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// Publishing
// ============================================================================

/// Record returned by a registry client for one successful publish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRecord {
    /// Registry-assigned id of the published record
    pub registration_id: String,

    /// Name the record was published under
    pub name: String,

    /// Location of the published schema, if the registry exposes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Metadata exactly as it was published
    pub metadata: SchemaMetadata,
}

// ============================================================================
// Registry Client Trait
// ============================================================================

/// Network side of publishing a single schema
///
/// Implementations only talk to the registry. They never touch the
/// registrar; the orchestration records the outcome once a call succeeds.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Publish one schema through the given registry handle
    async fn publish(
        &self,
        handle: &RegistryHandle,
        definition: &SchemaDefinition,
    ) -> anyhow::Result<PublishRecord>;

    /// Remove a previously published schema from its registry
    async fn unpublish(&self, registration: &SchemaRegistration) -> anyhow::Result<()>;
}

// ============================================================================
// Lifecycle Listener Trait
// ============================================================================

/// Notified when a registration becomes live or is removed
///
/// Each method is called at most once per registration. Both default to
/// doing nothing.
pub trait RegistrationListener: Send + Sync {
    fn on_published(&self, _registration: &SchemaRegistration) {}

    fn on_unpublished(&self, _registration: &SchemaRegistration) {}
}

/// Listener that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl RegistrationListener for NoopListener {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_record_serialization() {
        let mut metadata = SchemaMetadata::new();
        metadata.put("publisherId", "p-1");

        let record = PublishRecord {
            registration_id: "r-1".to_string(),
            name: "Orders".to_string(),
            location: None,
            metadata,
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"registration_id\":\"r-1\""));
        assert!(!json.contains("location"));

        let deserialized: PublishRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, record);
    }
}
