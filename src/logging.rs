//! Structured logging setup for the schema-publisher binary
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the application.

use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize console logging
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects `debug` over `info`.
pub fn init_logging(verbose: bool) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let default_level = if verbose { "debug" } else { "info" };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("schema_publisher={}", default_level)));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        );

        // Another subscriber may already be installed by an embedding application
        if subscriber.try_init().is_err() {
            tracing::debug!("global tracing subscriber already initialized");
        }
    });
}
