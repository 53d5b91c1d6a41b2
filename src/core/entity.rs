//! Entity trait - common interface for stored entity types

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};

/// Common trait for entities persisted as individual YAML files
pub trait Entity: Serialize + DeserializeOwned {
    /// The entity type prefix
    const PREFIX: EntityPrefix;

    /// Get the entity's unique ID
    fn id(&self) -> &EntityId;

    /// Get the entity's display title (part type name, lot description)
    fn title(&self) -> &str;

    /// Get the creation timestamp
    fn created(&self) -> DateTime<Utc>;

    /// Get the user who created the entity
    fn author(&self) -> &str;

    /// File name used when the entity is written to disk
    fn file_name(&self) -> String {
        format!("{}.ilt.yaml", self.id())
    }
}
