//! Registry loader - selects the registry client for a configured backend

use crate::core::config::{BackendKind, RegistryOptions};
use crate::core::error::PublishError;
use crate::core::traits::RegistryClient;
use crate::plugins::local_registry::LocalRegistry;
use std::sync::Arc;
use tracing::debug;

/// Load the client for `registries.<name>.backend`
///
/// Registries without a backend section use the local registry. Unknown
/// backend names are a configuration error.
pub fn load_client(options: &RegistryOptions) -> Result<Arc<dyn RegistryClient>, PublishError> {
    let Some(backend) = &options.backend else {
        debug!(registry = %options.name, "no backend configured, using local registry");
        return Ok(Arc::new(LocalRegistry::new()));
    };

    match BackendKind::parse(&backend.name) {
        Some(BackendKind::Local) => {
            debug!(registry = %options.name, backend = %backend.name, "loading registry backend");
            Ok(Arc::new(LocalRegistry::from_config(&backend.config)))
        }
        None => Err(PublishError::ConfigError(format!(
            "registry '{}' uses unknown backend '{}' (supported: {})",
            options.name,
            backend.name,
            BackendKind::supported_names()
        ))),
    }
}
