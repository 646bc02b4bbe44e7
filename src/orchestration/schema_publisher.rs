//! Schema Publisher - Publishes schemas to discovery registries
//!
//! Features:
//! - Single and batch publishing with duplicate detection
//! - Batch publishing runs every schema concurrently and reports partial failure
//! - Unpublishing of individual registrations
//! - Bulk teardown that always releases registry handles
//!
//! The publisher holds no bookkeeping of its own; everything it knows about
//! live schemas lives in the shared [`SchemaRegistrar`].

use crate::core::config::RegistryOptions;
use crate::core::error::{ArtifactFailure, PublishError};
use crate::core::registrar::{RegistryHandle, SchemaRegistrar};
use crate::core::registration::SchemaRegistration;
use crate::core::schema::{Schema, SchemaDefinition, SchemaMetadata};
use crate::core::traits::{NoopListener, RegistrationListener, RegistryClient};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Batch publishing options
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Maximum concurrent publishes within one batch (default: unbounded)
    pub max_concurrency: Option<usize>,
}

/// SchemaPublisher - publish orchestration over a registrar and a registry client
#[derive(Clone)]
pub struct SchemaPublisher {
    registrar: Arc<SchemaRegistrar>,
    client: Arc<dyn RegistryClient>,
    listener: Arc<dyn RegistrationListener>,
    batch_options: BatchOptions,
}

impl SchemaPublisher {
    /// Create a new SchemaPublisher
    ///
    /// # Arguments
    ///
    /// * `registrar` - Registrar holding registrations and registry handles
    /// * `client` - Client performing the registry calls
    pub fn new(registrar: Arc<SchemaRegistrar>, client: Arc<dyn RegistryClient>) -> Self {
        Self {
            registrar,
            client,
            listener: Arc::new(NoopListener),
            batch_options: BatchOptions::default(),
        }
    }

    /// Set the listener notified when registrations are published or unpublished
    pub fn with_listener(mut self, listener: Arc<dyn RegistrationListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn with_batch_options(mut self, batch_options: BatchOptions) -> Self {
        self.batch_options = batch_options;
        self
    }

    pub fn registrar(&self) -> &Arc<SchemaRegistrar> {
        &self.registrar
    }

    /// Id stamped as `publisherId` into every published schema
    pub fn publisher_id(&self) -> &str {
        self.registrar.publisher_id()
    }

    /// Publish a schema with empty metadata
    pub async fn publish(
        &self,
        options: &RegistryOptions,
        schema: Schema,
    ) -> Result<SchemaRegistration, PublishError> {
        self.publish_with_metadata(options, schema, SchemaMetadata::default())
            .await
    }

    /// Publish a schema together with metadata
    pub async fn publish_with_metadata(
        &self,
        options: &RegistryOptions,
        schema: Schema,
        metadata: SchemaMetadata,
    ) -> Result<SchemaRegistration, PublishError> {
        self.publish_definition(options, SchemaDefinition::new(schema, metadata))
            .await
    }

    /// Publish a single schema definition
    ///
    /// The registry call is only made when no registration exists (or is in
    /// flight) for the same registry and schema name. The registration is
    /// recorded only after the registry call succeeded.
    pub async fn publish_definition(
        &self,
        options: &RegistryOptions,
        mut definition: SchemaDefinition,
    ) -> Result<SchemaRegistration, PublishError> {
        let options = &canonical_registry(options)?;
        let schema_name = definition.schema_name().to_string();
        if schema_name.is_empty() {
            return Err(PublishError::InvalidArgument {
                field: "schema",
                message: "schema name must not be empty".to_string(),
            });
        }

        let reservation = self.registrar.reserve(&options.name, &schema_name)?;

        definition.stamp_publisher(self.registrar.publisher_id());
        let handle = self.registrar.get_or_create_handle(options);

        debug!(registry = %options.name, schema = %schema_name, "publishing schema");
        match self.client.publish(&handle, &definition).await {
            Ok(record) => {
                let registration = self.registrar.register(
                    reservation,
                    record,
                    handle,
                    Arc::clone(&self.listener),
                );
                info!(
                    registry = %options.name,
                    schema = %schema_name,
                    registration_id = %registration.record().registration_id,
                    "schema published"
                );
                registration.notify_published();
                Ok(registration)
            }
            Err(source) => {
                warn!(registry = %options.name, schema = %schema_name, error = %source, "schema publish failed");
                Err(PublishError::RemoteFailure {
                    registry: options.name.clone(),
                    schema: schema_name,
                    source,
                })
            }
        }
    }

    /// Publish several schemas with empty metadata
    pub async fn publish_all(
        &self,
        options: &RegistryOptions,
        schemas: Vec<Schema>,
    ) -> Result<Vec<SchemaRegistration>, PublishError> {
        let definitions = schemas.into_iter().map(SchemaDefinition::from).collect();
        self.publish_all_definitions(options, definitions).await
    }

    /// Publish several schema definitions concurrently
    ///
    /// Every schema gets its own publish attempt; a failure never stops the
    /// others. Registrations come back in completion order. If any schema
    /// failed the result is `PartialPublish` with one entry per failed schema,
    /// and the schemas that did publish stay registered.
    pub async fn publish_all_definitions(
        &self,
        options: &RegistryOptions,
        definitions: Vec<SchemaDefinition>,
    ) -> Result<Vec<SchemaRegistration>, PublishError> {
        if definitions.is_empty() {
            return Err(PublishError::NothingToPublish);
        }
        let options = &canonical_registry(options)?;

        let requested = definitions.len();
        let semaphore = self
            .batch_options
            .max_concurrency
            .map(|max| Arc::new(Semaphore::new(max.max(1))));

        info!(registry = %options.name, schemas = requested, "publishing schema batch");

        let mut pending = FuturesUnordered::new();
        for definition in definitions {
            let publisher = self.clone();
            let options = options.clone();
            let semaphore = semaphore.clone();
            let schema_name = definition.schema_name().to_string();

            let task = tokio::spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => Some(semaphore.acquire_owned().await),
                    None => None,
                };
                publisher.publish_definition(&options, definition).await
            });

            pending.push(async move { (schema_name, task.await) });
        }

        let mut published = Vec::with_capacity(requested);
        let mut failures = Vec::new();
        while let Some((schema_name, joined)) = pending.next().await {
            let error = match joined {
                Ok(Ok(registration)) => {
                    published.push(registration);
                    continue;
                }
                Ok(Err(error)) => error,
                Err(join_error) => PublishError::TaskFailed {
                    registry: options.name.clone(),
                    schema: schema_name.clone(),
                    message: join_error.to_string(),
                },
            };
            failures.push(ArtifactFailure {
                schema_name,
                registry: options.name.clone(),
                error,
            });
        }

        if published.len() == requested {
            Ok(published)
        } else {
            warn!(
                registry = %options.name,
                published = published.len(),
                failed = failures.len(),
                "schema batch partially failed"
            );
            Err(PublishError::PartialPublish {
                registry: options.name.clone(),
                requested,
                failures,
            })
        }
    }

    /// Unpublish a schema from its registry
    ///
    /// The registration is removed only once the registry call succeeded; on
    /// failure it stays live and the error is returned. No retry is attempted.
    pub async fn unpublish(&self, registration: &SchemaRegistration) -> Result<(), PublishError> {
        debug!(
            registry = %registration.registry_name(),
            schema = %registration.schema_name(),
            "unpublishing schema"
        );

        match self.client.unpublish(registration).await {
            Ok(()) => {
                self.registrar.unregister(registration);
                info!(
                    registry = %registration.registry_name(),
                    schema = %registration.schema_name(),
                    "schema unpublished"
                );
                registration.notify_unpublished();
                Ok(())
            }
            Err(source) => {
                warn!(
                    registry = %registration.registry_name(),
                    schema = %registration.schema_name(),
                    error = %source,
                    "schema unpublish failed"
                );
                Err(PublishError::RemoteFailure {
                    registry: registration.registry_name().to_string(),
                    schema: registration.schema_name().to_string(),
                    source,
                })
            }
        }
    }

    /// Unpublish every registered schema and release all registry handles
    pub async fn close(&self) -> Result<(), PublishError> {
        let publisher = self;
        self.registrar
            .close(move |registration| async move { publisher.unpublish(&registration).await })
            .await
    }

    /// Snapshot of the schemas registered with this publisher
    pub fn registered_schemas(&self) -> Vec<SchemaRegistration> {
        self.registrar.registrations()
    }

    pub fn find_registration(&self, registry_name: &str, schema_name: &str) -> Option<SchemaRegistration> {
        self.registrar.find_registration(registry_name, schema_name)
    }

    /// Handle of a managed registry; `None` selects the default registry
    pub fn get_discovery(&self, registry_name: Option<&str>) -> Option<Arc<RegistryHandle>> {
        self.registrar.get_handle(registry_name)
    }

    /// Names of the registries this publisher is currently publishing to
    pub fn managed_discoveries(&self) -> Vec<String> {
        self.registrar.registry_names()
    }
}

/// Registry options with a trimmed, non-empty name
fn canonical_registry(options: &RegistryOptions) -> Result<RegistryOptions, PublishError> {
    let name = options.name.trim();
    if name.is_empty() {
        return Err(PublishError::InvalidArgument {
            field: "registry",
            message: "registry name must not be empty".to_string(),
        });
    }
    Ok(RegistryOptions {
        name: name.to_string(),
        ..options.clone()
    })
}
