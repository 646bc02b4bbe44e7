pub mod core;
pub mod logging;
pub mod orchestration;
pub mod plugins;

pub use crate::core::*;
pub use crate::orchestration::{BatchOptions, SchemaPublisher};
pub use crate::plugins::LocalRegistry;
