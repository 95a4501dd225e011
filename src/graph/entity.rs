//! Entity record implementation

use super::types::{Address, EntityId, TypeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A typed, versioned record in the graph
///
/// Entities carry:
/// - An id unique within their type (not globally)
/// - A primary `value` string
/// - A free-form `context` string (used as an optional read filter)
/// - String key/value properties
/// - An optimistic version counter, starting at 1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Identifier within the entity's type
    pub id: EntityId,

    /// Registered type of this entity
    pub type_id: TypeId,

    /// Primary value
    pub value: String,

    /// Context tag, empty when unset
    pub context: String,

    /// Properties associated with this entity
    pub properties: HashMap<String, String>,

    /// Optimistic concurrency version
    pub version: u64,
}

impl Entity {
    /// Create a new entity at version 1; the store assigns the final id
    pub fn new(type_id: TypeId, value: impl Into<String>) -> Self {
        Entity {
            id: EntityId::new(0),
            type_id,
            value: value.into(),
            context: String::new(),
            properties: HashMap::new(),
            version: 1,
        }
    }

    /// Builder-style context setter
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Builder-style property setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The `(type, id)` address of this entity
    pub fn address(&self) -> Address {
        Address::new(self.type_id, self.id)
    }

    pub fn get_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.properties.insert(key.into(), value.into())
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.id == other.id
    }
}

impl Eq for Entity {}

impl std::hash::Hash for Entity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.id.hash(state);
    }
}
