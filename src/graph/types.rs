//! Core type definitions for the graph store

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense identifier for a registered entity type
///
/// Allocated by the [`TypeRegistry`](crate::graph::registry::TypeRegistry);
/// 0 is never handed out and marks an invalid/absent type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    pub fn new(id: u32) -> Self {
        TypeId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Whether this id could have been allocated by a registry
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

impl From<u32> for TypeId {
    fn from(id: u32) -> Self {
        TypeId(id)
    }
}

/// Identifier for an entity, unique within its type (not globally)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    pub fn new(id: u64) -> Self {
        EntityId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        EntityId(id)
    }
}

/// Lightweight reference to a located entity: `(type, id)` without the payload
///
/// The currency of the query executor; passed around instead of full records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Address {
    pub type_id: TypeId,
    pub id: EntityId,
}

impl Address {
    pub fn new(type_id: TypeId, id: EntityId) -> Self {
        Address { type_id, id }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.type_id.0, self.id.0)
    }
}

/// Direction of a relation walk relative to some entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward targets of outgoing relations
    Child,
    /// Toward sources of incoming relations
    Parent,
}

/// Id hint controlling entity creation behavior
///
/// The bulk-import surface encodes these as sentinel integers: negative for
/// [`IdHint::ForceCreate`], zero for [`IdHint::IfNotExists`], positive for
/// [`IdHint::Existing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdHint {
    /// Always allocate a fresh id
    ForceCreate,
    /// Reuse an existing entity with the same type, value and context if present
    IfNotExists,
    /// Reference an already-stored entity; no creation happens
    Existing(EntityId),
}

impl From<i64> for IdHint {
    fn from(raw: i64) -> Self {
        match raw {
            n if n < 0 => IdHint::ForceCreate,
            0 => IdHint::IfNotExists,
            n => IdHint::Existing(EntityId::new(n as u64)),
        }
    }
}

/// Matching mode for value-based entity lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueMatchMode {
    /// Exact equality
    Match,
    /// Value starts with the needle
    Prefix,
    /// Value ends with the needle
    Suffix,
    /// Value contains the needle
    Contain,
    /// Needle is a regular expression
    Regex,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_id() {
        let id = TypeId::new(7);
        assert_eq!(id.as_u32(), 7);
        assert!(id.is_valid());
        assert!(!TypeId::new(0).is_valid());
        assert_eq!(format!("{}", id), "TypeId(7)");
    }

    #[test]
    fn test_entity_id() {
        let id = EntityId::new(42);
        assert_eq!(id.as_u64(), 42);
        assert_eq!(format!("{}", id), "EntityId(42)");

        let id2: EntityId = 100.into();
        assert_eq!(id2.as_u64(), 100);
    }

    #[test]
    fn test_address_ordering() {
        let a = Address::new(TypeId::new(1), EntityId::new(5));
        let b = Address::new(TypeId::new(1), EntityId::new(6));
        let c = Address::new(TypeId::new(2), EntityId::new(1));
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_id_hint_sentinels() {
        assert_eq!(IdHint::from(-1), IdHint::ForceCreate);
        assert_eq!(IdHint::from(0), IdHint::IfNotExists);
        assert_eq!(IdHint::from(9), IdHint::Existing(EntityId::new(9)));
    }
}
