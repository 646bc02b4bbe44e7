//! Registration records for published schemas

use crate::core::registrar::RegistryHandle;
use crate::core::traits::{PublishRecord, RegistrationListener};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Proof that a schema is currently live in a registry
///
/// Cloning is cheap and every clone refers to the same record, so the
/// lifecycle notifications stay at-most-once no matter which clone triggers
/// them.
#[derive(Clone)]
pub struct SchemaRegistration {
    inner: Arc<Inner>,
}

struct Inner {
    registry_name: String,
    schema_name: String,
    publisher_id: String,
    record: PublishRecord,
    handle: Arc<RegistryHandle>,
    published_at: DateTime<Utc>,
    listener: Arc<dyn RegistrationListener>,
    published_notified: AtomicBool,
    unpublished_notified: AtomicBool,
}

impl SchemaRegistration {
    pub(crate) fn new(
        record: PublishRecord,
        schema_name: String,
        publisher_id: String,
        handle: Arc<RegistryHandle>,
        listener: Arc<dyn RegistrationListener>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry_name: handle.name().to_string(),
                schema_name,
                publisher_id,
                record,
                handle,
                published_at: Utc::now(),
                listener,
                published_notified: AtomicBool::new(false),
                unpublished_notified: AtomicBool::new(false),
            }),
        }
    }

    pub fn registry_name(&self) -> &str {
        &self.inner.registry_name
    }

    pub fn schema_name(&self) -> &str {
        &self.inner.schema_name
    }

    pub fn publisher_id(&self) -> &str {
        &self.inner.publisher_id
    }

    /// The record returned by the registry client when the schema was published
    pub fn record(&self) -> &PublishRecord {
        &self.inner.record
    }

    /// Handle of the registry the schema was published through
    pub fn handle(&self) -> &Arc<RegistryHandle> {
        &self.inner.handle
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.inner.published_at
    }

    /// (registry, schema) pair identifying this registration
    pub fn key(&self) -> (&str, &str) {
        (&self.inner.registry_name, &self.inner.schema_name)
    }

    pub(crate) fn notify_published(&self) {
        if !self.inner.published_notified.swap(true, Ordering::AcqRel) {
            self.inner.listener.on_published(self);
        }
    }

    pub(crate) fn notify_unpublished(&self) {
        if !self.inner.unpublished_notified.swap(true, Ordering::AcqRel) {
            self.inner.listener.on_unpublished(self);
        }
    }
}

impl PartialEq for SchemaRegistration {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
            && self.inner.record.registration_id == other.inner.record.registration_id
    }
}

impl Eq for SchemaRegistration {}

impl fmt::Debug for SchemaRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistration")
            .field("registry", &self.inner.registry_name)
            .field("schema", &self.inner.schema_name)
            .field("registration_id", &self.inner.record.registration_id)
            .field("publisher_id", &self.inner.publisher_id)
            .field("published_at", &self.inner.published_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RegistryOptions;
    use crate::core::schema::SchemaMetadata;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl RegistrationListener for Recorder {
        fn on_published(&self, registration: &SchemaRegistration) {
            self.events
                .lock()
                .unwrap()
                .push(format!("published:{}", registration.schema_name()));
        }

        fn on_unpublished(&self, registration: &SchemaRegistration) {
            self.events
                .lock()
                .unwrap()
                .push(format!("unpublished:{}", registration.schema_name()));
        }
    }

    fn registration(listener: Arc<Recorder>) -> SchemaRegistration {
        let handle = Arc::new(RegistryHandle::new(RegistryOptions::named("primary")));
        let record = PublishRecord {
            registration_id: "r-1".to_string(),
            name: "Orders".to_string(),
            location: None,
            metadata: SchemaMetadata::new(),
        };
        SchemaRegistration::new(record, "Orders".to_string(), "p-1".to_string(), handle, listener)
    }

    #[test]
    fn test_registration_accessors() {
        let registration = registration(Arc::new(Recorder::default()));

        assert_eq!(registration.key(), ("primary", "Orders"));
        assert_eq!(registration.publisher_id(), "p-1");
        assert_eq!(registration.record().registration_id, "r-1");
        assert_eq!(registration.handle().name(), "primary");
    }

    #[test]
    fn test_notifications_fire_once_across_clones() {
        let recorder = Arc::new(Recorder::default());
        let registration = registration(recorder.clone());
        let clone = registration.clone();

        registration.notify_published();
        clone.notify_published();
        clone.notify_unpublished();
        registration.notify_unpublished();

        let events = recorder.events.lock().unwrap();
        assert_eq!(*events, vec!["published:Orders", "unpublished:Orders"]);
    }
}
