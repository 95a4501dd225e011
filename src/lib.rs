//! Filament
//!
//! An embeddable, in-memory graph data store: typed entities connected by
//! directed, typed relations, accessed through a composable query API with
//! filtered reads, joins/traversal, updates, deletes, linking/unlinking,
//! ordering and limiting. No external database process, no network protocol;
//! durability is delegated to the host via an outbound event channel.
//!
//! # Architecture
//!
//! - Type registry: bidirectional name <-> dense id mapping
//! - Entity store: per-type maps with id allocators and optimistic versions
//! - Relation store: forward index plus reverse presence index
//! - Condition model: AND/OR match trees evaluated per entity
//! - Query executor: recursive join resolution with required/optional gating,
//!   cycle-safe bounded traversal, link/unlink set algebra, sorting
//! - Lock coordinator: shared/exclusive guards per method, fixed global order
//!
//! # Example Usage
//!
//! ```rust
//! use filament::{Entity, IdHint, Operator, Query, Storage};
//!
//! let storage = Storage::new();
//!
//! // Register types and create entities
//! let person = storage.register_type("Person");
//! storage
//!     .create_entity(Entity::new(person, "Alice"), IdHint::ForceCreate)
//!     .unwrap();
//! storage
//!     .create_entity(Entity::new(person, "Bob"), IdHint::ForceCreate)
//!     .unwrap();
//!
//! // Query by condition
//! let result = storage
//!     .execute(&Query::read(&["Person"]).filter("Value", Operator::Eq, "Alice"))
//!     .unwrap();
//! assert_eq!(result.amount, 1);
//! assert_eq!(result.entities[0].value, "Alice");
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod graph;
pub mod query;

// Re-export main types for convenience
pub use error::{StorageError, StorageResult};

pub use graph::{
    Address, Direction, Entity, EntityId, EntitySpec, IdHint, MutationKind, PersistenceEvent,
    Relation, RelationSpec, Storage, StorageStats, TypeId, TypeRegistry, ValueMatchMode,
};

pub use query::{
    Condition, Field, GroupOp, Method, Operator, Query, QueryExecutor, SortDirection, SortMode,
    SortSpec, Transport, TransportEntity, TransportRelation,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
