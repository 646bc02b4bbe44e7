pub mod config;
pub mod config_loader;
pub mod error;
pub mod registrar;
pub mod registration;
pub mod schema;
pub mod traits;

pub use config::*;
pub use config_loader::{ConfigLoadOptions, ConfigLoader, ConfigValidationResult};
pub use error::*;
pub use registrar::{RegistryHandle, Reservation, SchemaRegistrar};
pub use registration::SchemaRegistration;
pub use schema::*;
pub use traits::*;
