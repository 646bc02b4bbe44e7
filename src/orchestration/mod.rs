//! Orchestration layer for schema publishing
//!
//! This module provides the publish, unpublish and teardown workflows that
//! run on top of the registrar and a registry client.

pub mod schema_publisher;

// Re-export main types for convenience
pub use schema_publisher::{BatchOptions, SchemaPublisher};
