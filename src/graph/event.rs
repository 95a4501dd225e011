//! Persistence events emitted on every store mutation
//!
//! The store pushes these onto an optional outbound channel, fire-and-forget;
//! a host that wants durability drains the channel into its own write-ahead
//! log. With no sink configured nothing is emitted and behavior is unchanged.

use super::entity::Entity;
use super::relation::Relation;
use super::types::TypeId;
use serde::{Deserialize, Serialize};

/// Which mutation produced the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

/// Ordered payload describing one committed store mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PersistenceEvent {
    Entity {
        method: MutationKind,
        type_name: String,
        entity: Entity,
    },
    Relation {
        method: MutationKind,
        relation: Relation,
    },
    TypeRegistered {
        id: TypeId,
        name: String,
    },
}
