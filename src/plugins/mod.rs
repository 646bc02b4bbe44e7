pub mod local_registry;
pub mod registry_loader;

pub use local_registry::LocalRegistry;
pub use registry_loader::load_client;
