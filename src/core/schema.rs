//! Schema artifacts and their publication metadata

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key stamped with the id of the publishing process
pub const PUBLISHER_ID_KEY: &str = "publisherId";

/// A named schema document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub document: String,
}

impl Schema {
    pub fn new(name: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            document: document.into(),
        }
    }
}

/// Key/value metadata attached to a published schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaMetadata(HashMap<String, serde_json::Value>);

impl SchemaMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value under the same key
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }
}

impl From<HashMap<String, serde_json::Value>> for SchemaMetadata {
    fn from(map: HashMap<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

/// A schema together with the metadata it is published with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    schema: Schema,
    metadata: SchemaMetadata,
}

impl SchemaDefinition {
    pub fn new(schema: Schema, metadata: SchemaMetadata) -> Self {
        Self { schema, metadata }
    }

    /// The canonical name registrations are keyed on
    pub fn schema_name(&self) -> &str {
        self.schema.name.trim()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn metadata(&self) -> &SchemaMetadata {
        &self.metadata
    }

    /// Stamp the publisher id into the metadata, overwriting any previous value
    pub fn stamp_publisher(&mut self, publisher_id: &str) {
        self.metadata.put(PUBLISHER_ID_KEY, publisher_id);
    }

    pub fn publisher_id(&self) -> Option<&str> {
        self.metadata.get(PUBLISHER_ID_KEY).and_then(|v| v.as_str())
    }
}

impl From<Schema> for SchemaDefinition {
    fn from(schema: Schema) -> Self {
        Self::new(schema, SchemaMetadata::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_name_is_trimmed() {
        let definition = SchemaDefinition::from(Schema::new("  Orders \n", "type Query { a: Int }"));
        assert_eq!(definition.schema_name(), "Orders");
    }

    #[test]
    fn test_stamp_publisher_overwrites() {
        let mut metadata = SchemaMetadata::new();
        metadata.put(PUBLISHER_ID_KEY, "someone-else");
        metadata.put("team", "billing");

        let mut definition = SchemaDefinition::new(Schema::new("Orders", ""), metadata);
        definition.stamp_publisher("publisher-1");

        assert_eq!(definition.publisher_id(), Some("publisher-1"));
        assert_eq!(definition.metadata().len(), 2);
        assert_eq!(
            definition.metadata().get("team"),
            Some(&serde_json::Value::from("billing"))
        );
    }

    #[test]
    fn test_metadata_serializes_as_plain_map() {
        let mut metadata = SchemaMetadata::new();
        metadata.put("version", 3);

        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"version":3}"#);
    }
}
