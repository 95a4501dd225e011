//! Transport result tree
//!
//! The external result shape: value copies of matched entities, each carrying
//! the relation trees assembled by joins and traversal. Nothing in a transport
//! aliases store-internal state, so callers may retain and mutate results
//! freely.

use crate::graph::entity::Entity;
use crate::graph::relation::Relation;
use crate::graph::types::{Address, EntityId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Query result: surviving entities plus the final surviving count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transport {
    pub entities: Vec<TransportEntity>,
    pub amount: usize,
}

impl Transport {
    pub fn empty() -> Self {
        Transport {
            entities: Vec::new(),
            amount: 0,
        }
    }

    /// A mutation result carrying only the affected count
    pub fn amount_only(amount: usize) -> Self {
        Transport {
            entities: Vec::new(),
            amount,
        }
    }
}

/// A value-copied entity inside a result tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportEntity {
    pub type_name: String,
    pub id: EntityId,
    pub value: String,
    pub context: String,
    pub properties: HashMap<String, String>,
    pub version: u64,
    pub child_relations: Vec<TransportRelation>,
    pub parent_relations: Vec<TransportRelation>,
}

impl TransportEntity {
    /// Copy a stored record into the transport shape, without relations
    pub fn from_entity(entity: &Entity, type_name: impl Into<String>) -> Self {
        TransportEntity {
            type_name: type_name.into(),
            id: entity.id,
            value: entity.value.clone(),
            context: entity.context.clone(),
            properties: entity.properties.clone(),
            version: entity.version,
            child_relations: Vec::new(),
            parent_relations: Vec::new(),
        }
    }
}

/// A relation wrapped around the nested entity it leads to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportRelation {
    pub source: Address,
    pub target: Address,
    pub context: String,
    pub properties: HashMap<String, String>,
    pub version: u64,
    /// The far endpoint of this relation, itself carrying nested relations
    pub entity: TransportEntity,
}

impl TransportRelation {
    pub fn new(relation: &Relation, entity: TransportEntity) -> Self {
        TransportRelation {
            source: relation.source,
            target: relation.target,
            context: relation.context.clone(),
            properties: relation.properties.clone(),
            version: relation.version,
            entity,
        }
    }
}
