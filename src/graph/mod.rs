//! Core graph storage implementation
//!
//! Typed entities connected by directed, typed relations:
//! - Type registry with dense, never-reused ids
//! - Per-type entity maps with optimistic versioning
//! - Forward/reverse relation indices kept mutually consistent
//! - Outbound persistence event channel (fire-and-forget)

pub mod entities;
pub mod entity;
pub mod event;
pub mod import;
pub mod registry;
pub mod relation;
pub mod relations;
pub mod store;
pub mod types;

// Re-export main types
pub use entity::Entity;
pub use event::{MutationKind, PersistenceEvent};
pub use import::{EntitySpec, RelationSpec};
pub use registry::TypeRegistry;
pub use relation::Relation;
pub use store::{Storage, StorageStats};
pub use types::{Address, Direction, EntityId, IdHint, TypeId, ValueMatchMode};
