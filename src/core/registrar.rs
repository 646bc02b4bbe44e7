//! Schema registrar - bookkeeping of live registrations and registry handles
//!
//! The registrar is the only shared mutable state of a publisher. Every
//! mutation goes through an atomic primitive:
//! - reserve: create-if-absent on the (registry, schema) key
//! - register / unregister: commit or remove a live registration
//! - get_or_create_handle: create-if-absent on the registry name
//! - close: wait for publishes in flight, drain all registrations, then
//!   release every handle

use crate::core::config::{DEFAULT_REGISTRY_NAME, RegistryOptions};
use crate::core::error::{ArtifactFailure, PublishError};
use crate::core::registration::SchemaRegistration;
use crate::core::traits::{PublishRecord, RegistrationListener};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use uuid::Uuid;

type RegistrationKey = (String, String);

/// Per-registry resource shared by every publish to that registry
#[derive(Debug)]
pub struct RegistryHandle {
    id: Uuid,
    options: RegistryOptions,
    created_at: DateTime<Utc>,
    closed: AtomicBool,
}

impl RegistryHandle {
    pub fn new(options: RegistryOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            options,
            created_at: Utc::now(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Number of reservations not yet dropped
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    async fn wait_idle(&self) {
        loop {
            // registered before the check so a concurrent drop cannot be missed
            let idle = self.idle.notified();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            idle.await;
        }
    }
}

struct InFlightGuard(Arc<InFlight>);

impl InFlightGuard {
    fn enter(in_flight: &Arc<InFlight>) -> Self {
        in_flight.count.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(in_flight))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

enum Slot {
    /// A publish for this key is in flight
    Reserved,
    Live(SchemaRegistration),
}

/// Exclusive claim on a (registry, schema) key while its publish is in flight
///
/// Dropping an uncommitted reservation frees the key again. The registrar
/// does not start its teardown while any reservation is alive.
pub struct Reservation {
    key: RegistrationKey,
    registrations: Arc<DashMap<RegistrationKey, Slot>>,
    committed: bool,
    // dropped after the slot cleanup in `Drop::drop`
    _in_flight: InFlightGuard,
}

impl Reservation {
    pub fn registry_name(&self) -> &str {
        &self.key.0
    }

    pub fn schema_name(&self) -> &str {
        &self.key.1
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.committed {
            self.registrations
                .remove_if(&self.key, |_, slot| matches!(slot, Slot::Reserved));
        }
    }
}

/// Owner of all live registrations and registry handles of one publisher
pub struct SchemaRegistrar {
    publisher_id: String,
    registrations: Arc<DashMap<RegistrationKey, Slot>>,
    handles: DashMap<String, Arc<RegistryHandle>>,
    in_flight: Arc<InFlight>,
    closed: AtomicBool,
}

impl Default for SchemaRegistrar {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistrar {
    /// Create a registrar with a random publisher id
    pub fn new() -> Self {
        Self::with_publisher_id(Uuid::new_v4().to_string())
    }

    pub fn with_publisher_id(publisher_id: impl Into<String>) -> Self {
        Self {
            publisher_id: publisher_id.into(),
            registrations: Arc::new(DashMap::new()),
            handles: DashMap::new(),
            in_flight: Arc::new(InFlight::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Id stamped into the metadata of every schema published through this registrar
    pub fn publisher_id(&self) -> &str {
        &self.publisher_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Look up the live registration of a schema in a registry
    pub fn find_registration(&self, registry_name: &str, schema_name: &str) -> Option<SchemaRegistration> {
        let key = (registry_name.trim().to_string(), schema_name.trim().to_string());
        match self.registrations.get(&key).as_deref() {
            Some(Slot::Live(registration)) => Some(registration.clone()),
            _ => None,
        }
    }

    /// Claim a key for an upcoming publish
    ///
    /// Fails with `DuplicatePublish` if the key is live or already claimed by
    /// a publish in flight.
    pub fn reserve(&self, registry_name: &str, schema_name: &str) -> Result<Reservation, PublishError> {
        // counted before the closed check, so close() either sees this
        // reservation or we see the closed flag
        let in_flight = InFlightGuard::enter(&self.in_flight);
        if self.is_closed() {
            return Err(PublishError::RegistrarClosed);
        }

        let key = (registry_name.trim().to_string(), schema_name.trim().to_string());
        match self.registrations.entry(key.clone()) {
            Entry::Occupied(_) => Err(PublishError::DuplicatePublish {
                registry: key.0,
                schema: key.1,
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Reserved);
                Ok(Reservation {
                    key,
                    registrations: Arc::clone(&self.registrations),
                    committed: false,
                    _in_flight: in_flight,
                })
            }
        }
    }

    /// Get the handle for a registry, creating it on first use
    pub fn get_or_create_handle(&self, options: &RegistryOptions) -> Arc<RegistryHandle> {
        self.handles
            .entry(options.name.clone())
            .or_insert_with(|| {
                debug!(registry = %options.name, "creating registry handle");
                Arc::new(RegistryHandle::new(options.clone()))
            })
            .clone()
    }

    /// Get the handle of a managed registry; `None` selects the default registry
    pub fn get_handle(&self, registry_name: Option<&str>) -> Option<Arc<RegistryHandle>> {
        let name = registry_name.map(str::trim).unwrap_or(DEFAULT_REGISTRY_NAME);
        self.handles.get(name).map(|handle| Arc::clone(&handle))
    }

    /// Names of the registries this registrar currently holds handles for
    pub fn registry_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handles.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Turn a reservation into a live registration
    pub fn register(
        &self,
        mut reservation: Reservation,
        record: PublishRecord,
        handle: Arc<RegistryHandle>,
        listener: Arc<dyn RegistrationListener>,
    ) -> SchemaRegistration {
        let registration = SchemaRegistration::new(
            record,
            reservation.key.1.clone(),
            self.publisher_id.clone(),
            handle,
            listener,
        );

        self.registrations
            .insert(reservation.key.clone(), Slot::Live(registration.clone()));
        reservation.committed = true;

        debug!(
            registry = %registration.registry_name(),
            schema = %registration.schema_name(),
            "registration stored"
        );
        registration
    }

    /// Remove a registration; returns whether it was still present
    pub fn unregister(&self, registration: &SchemaRegistration) -> bool {
        let key = (
            registration.registry_name().to_string(),
            registration.schema_name().to_string(),
        );
        let removed = self
            .registrations
            .remove_if(&key, |_, slot| matches!(slot, Slot::Live(live) if live == registration))
            .is_some();

        debug!(registry = %key.0, schema = %key.1, removed, "registration removed");
        removed
    }

    /// Snapshot of all live registrations, ordered by (registry, schema)
    pub fn registrations(&self) -> Vec<SchemaRegistration> {
        let mut registrations: Vec<SchemaRegistration> = self
            .registrations
            .iter()
            .filter_map(|entry| match entry.value() {
                Slot::Live(registration) => Some(registration.clone()),
                Slot::Reserved => None,
            })
            .collect();
        registrations.sort_by(|a, b| a.key().cmp(&b.key()));
        registrations
    }

    /// Unpublish every live registration, then release all handles
    ///
    /// New reservations are refused from the start; publishes already holding
    /// a reservation are awaited so their registrations are part of the
    /// teardown. Handles are released even when some unpublish calls fail;
    /// those failures are reported as `PartialUnpublish`. Closing an already
    /// closed registrar does nothing.
    pub async fn close<F, Fut>(&self, unpublish: F) -> Result<(), PublishError>
    where
        F: Fn(SchemaRegistration) -> Fut,
        Fut: Future<Output = Result<(), PublishError>>,
    {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let pending = self.in_flight.count.load(Ordering::SeqCst);
        if pending > 0 {
            debug!(pending, "waiting for publishes in flight");
        }
        self.in_flight.wait_idle().await;

        let snapshot = self.registrations();
        let requested = snapshot.len();
        info!(registrations = requested, "closing schema registrar");

        let outcomes = join_all(snapshot.into_iter().map(|registration| {
            let pending = unpublish(registration.clone());
            async move { (registration, pending.await) }
        }))
        .await;

        let failures: Vec<ArtifactFailure> = outcomes
            .into_iter()
            .filter_map(|(registration, outcome)| {
                outcome.err().map(|error| ArtifactFailure {
                    schema_name: registration.schema_name().to_string(),
                    registry: registration.registry_name().to_string(),
                    error,
                })
            })
            .collect();

        self.release();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PublishError::PartialUnpublish { requested, failures })
        }
    }

    fn release(&self) {
        for entry in self.registrations.iter() {
            if let Slot::Live(registration) = entry.value() {
                warn!(
                    registry = %registration.registry_name(),
                    schema = %registration.schema_name(),
                    "dropping registration that could not be unpublished"
                );
            }
        }
        self.registrations.clear();

        for entry in self.handles.iter() {
            entry.value().close();
            debug!(registry = %entry.key(), "registry handle closed");
        }
        self.handles.clear();
    }
}
