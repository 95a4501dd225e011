//! Relation record implementation

use super::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A directed, typed, versioned edge between two entity addresses
///
/// Relations are identified by their ordered endpoint pair; at most one
/// relation exists per `(source, target)`. The reverse index keeps a presence
/// marker for every forward relation, never a second copy of the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    /// Source endpoint (the relation goes FROM here)
    pub source: Address,

    /// Target endpoint (the relation goes TO here)
    pub target: Address,

    /// Context tag, empty when unset
    pub context: String,

    /// Properties associated with this relation
    pub properties: HashMap<String, String>,

    /// Optimistic concurrency version
    pub version: u64,
}

impl Relation {
    /// Create a new relation at version 1
    pub fn new(source: Address, target: Address) -> Self {
        Relation {
            source,
            target,
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
}

impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.target == other.target
    }
}

impl Eq for Relation {}
