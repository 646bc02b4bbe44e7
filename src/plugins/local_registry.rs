//! Local registry - in-process discovery backend
//!
//! Keeps published records in memory, keyed by registry name. Useful as the
//! default backend of the CLI and for exercising the publish orchestration
//! without a remote registry.

use crate::core::registrar::RegistryHandle;
use crate::core::registration::SchemaRegistration;
use crate::core::schema::SchemaDefinition;
use crate::core::traits::{PublishRecord, RegistryClient};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// Backend option replacing the `local://<address>` location prefix
pub const BASE_URL_KEY: &str = "baseUrl";

/// In-memory registry client
#[derive(Default)]
pub struct LocalRegistry {
    /// (registry name, registration id) -> published record
    records: DashMap<(String, String), PublishRecord>,
    base_url: Option<String>,
}

impl LocalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a local registry from `registries.<name>.backend.config`
    pub fn from_config(config: &HashMap<String, String>) -> Self {
        for key in config.keys().filter(|key| key.as_str() != BASE_URL_KEY) {
            warn!(option = %key, "ignoring unknown local backend option");
        }

        Self {
            base_url: config
                .get(BASE_URL_KEY)
                .map(|url| url.trim_end_matches('/').to_string()),
            ..Self::default()
        }
    }

    /// Records currently published to a registry, ordered by name
    pub fn records(&self, registry_name: &str) -> Vec<PublishRecord> {
        let mut records: Vec<PublishRecord> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == registry_name)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RegistryClient for LocalRegistry {
    async fn publish(
        &self,
        handle: &RegistryHandle,
        definition: &SchemaDefinition,
    ) -> anyhow::Result<PublishRecord> {
        if handle.is_closed() {
            anyhow::bail!("registry handle '{}' is closed", handle.name());
        }

        let registration_id = Uuid::new_v4().to_string();
        let location = match &self.base_url {
            Some(base_url) => format!("{}/{}", base_url, definition.schema_name()),
            None => {
                let address = handle
                    .options()
                    .announce_address
                    .as_deref()
                    .unwrap_or(handle.name());
                format!("local://{}/{}", address, definition.schema_name())
            }
        };
        let record = PublishRecord {
            registration_id: registration_id.clone(),
            name: definition.schema_name().to_string(),
            location: Some(location),
            metadata: definition.metadata().clone(),
        };

        self.records
            .insert((handle.name().to_string(), registration_id), record.clone());
        debug!(registry = %handle.name(), schema = %record.name, "local record stored");

        Ok(record)
    }

    async fn unpublish(&self, registration: &SchemaRegistration) -> anyhow::Result<()> {
        let key = (
            registration.registry_name().to_string(),
            registration.record().registration_id.clone(),
        );

        match self.records.remove(&key) {
            Some(_) => Ok(()),
            None => anyhow::bail!(
                "record '{}' not found in registry '{}'",
                key.1,
                key.0
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RegistryOptions;
    use crate::core::schema::Schema;
    use crate::core::traits::NoopListener;
    use std::sync::Arc;

    fn definition(name: &str) -> SchemaDefinition {
        SchemaDefinition::from(Schema::new(name, "type Query { ok: Boolean }"))
    }

    #[tokio::test]
    async fn test_publish_uses_announce_address_for_location() {
        let registry = LocalRegistry::new();
        let mut options = RegistryOptions::named("primary");
        options.announce_address = Some("schemas.internal".to_string());
        let handle = RegistryHandle::new(options);

        let record = registry.publish(&handle, &definition("Orders")).await.unwrap();

        assert_eq!(record.location.as_deref(), Some("local://schemas.internal/Orders"));
        assert_eq!(registry.records("primary"), vec![record]);
        assert!(registry.records("secondary").is_empty());
    }

    #[tokio::test]
    async fn test_base_url_from_config() {
        let config = HashMap::from([(BASE_URL_KEY.to_string(), "https://schemas.internal/".to_string())]);
        let registry = LocalRegistry::from_config(&config);
        let handle = RegistryHandle::new(RegistryOptions::named("primary"));

        let record = registry.publish(&handle, &definition("Orders")).await.unwrap();

        assert_eq!(record.location.as_deref(), Some("https://schemas.internal/Orders"));
    }

    #[tokio::test]
    async fn test_publish_through_closed_handle_fails() {
        let registry = LocalRegistry::new();
        let handle = RegistryHandle::new(RegistryOptions::named("primary"));
        handle.close();

        let result = registry.publish(&handle, &definition("Orders")).await;

        assert!(result.unwrap_err().to_string().contains("is closed"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_unpublish_removes_record_once() {
        let registry = LocalRegistry::new();
        let handle = Arc::new(RegistryHandle::new(RegistryOptions::named("primary")));
        let record = registry.publish(&handle, &definition("Orders")).await.unwrap();
        let registration = SchemaRegistration::new(
            record,
            "Orders".to_string(),
            "p-1".to_string(),
            handle,
            Arc::new(NoopListener),
        );

        registry.unpublish(&registration).await.unwrap();
        let second = registry.unpublish(&registration).await;

        assert!(registry.is_empty());
        assert!(second.unwrap_err().to_string().contains("not found"));
    }
}
