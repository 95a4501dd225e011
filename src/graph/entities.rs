//! Per-type entity pool
//!
//! The lock-free core of the entity store: per-type id allocators and record
//! maps. [`Storage`](crate::graph::store::Storage) wraps every operation in the
//! appropriate lock; the query executor calls in under an already-held guard.

use super::entity::Entity;
use super::types::{Address, EntityId, IdHint, TypeId, ValueMatchMode};
use crate::error::{StorageError, StorageResult};
use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

/// Entity records and id allocators, one submap per registered type
#[derive(Debug, Default)]
pub struct EntityPool {
    by_type: FxHashMap<TypeId, FxHashMap<EntityId, Entity>>,
    next_id: FxHashMap<TypeId, u64>,
}

impl EntityPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the submap for a freshly registered type
    pub fn allocate_type(&mut self, type_id: TypeId) {
        self.by_type.entry(type_id).or_default();
        self.next_id.entry(type_id).or_insert(1);
    }

    pub fn has_type(&self, type_id: TypeId) -> bool {
        self.by_type.contains_key(&type_id)
    }

    /// Create or resolve an entity according to the id hint
    ///
    /// Returns the resolved id and whether a record was actually created.
    /// `ForceCreate` always allocates; `IfNotExists` dedupes on value+context;
    /// `Existing` only verifies the referenced record is present.
    pub fn create(&mut self, mut entity: Entity, hint: IdHint) -> StorageResult<(EntityId, bool)> {
        if !self.has_type(entity.type_id) {
            return Err(StorageError::InvalidType(entity.type_id));
        }

        match hint {
            IdHint::Existing(id) => {
                let address = Address::new(entity.type_id, id);
                if self.get(entity.type_id, id).is_none() {
                    return Err(StorageError::EntityNotFound(address));
                }
                Ok((id, false))
            }
            IdHint::IfNotExists => {
                let existing = self
                    .by_type
                    .get(&entity.type_id)
                    .and_then(|records| {
                        records
                            .values()
                            .find(|e| e.value == entity.value && e.context == entity.context)
                    })
                    .map(|e| e.id);
                match existing {
                    Some(id) => Ok((id, false)),
                    None => Ok((self.insert_new(entity), true)),
                }
            }
            IdHint::ForceCreate => {
                entity.version = 1;
                Ok((self.insert_new(entity), true))
            }
        }
    }

    fn insert_new(&mut self, mut entity: Entity) -> EntityId {
        let counter = self.next_id.entry(entity.type_id).or_insert(1);
        let id = EntityId::new(*counter);
        *counter += 1;

        entity.id = id;
        entity.version = 1;
        debug!(type_id = entity.type_id.as_u32(), id = id.as_u64(), "created entity");
        self.by_type.entry(entity.type_id).or_default().insert(id, entity);
        id
    }

    /// Borrow a live record; executor-internal, never handed to callers
    pub fn get(&self, type_id: TypeId, id: EntityId) -> Option<&Entity> {
        self.by_type.get(&type_id).and_then(|records| records.get(&id))
    }

    /// Fetch a deep copy by address, with an optional context filter
    pub fn get_by_address(
        &self,
        type_id: TypeId,
        id: EntityId,
        context: &str,
    ) -> StorageResult<Entity> {
        let address = Address::new(type_id, id);
        let entity = self
            .get(type_id, id)
            .ok_or(StorageError::EntityNotFound(address))?;
        if !context.is_empty() && entity.context != context {
            return Err(StorageError::EntityNotFound(address));
        }
        Ok(entity.clone())
    }

    /// Deep copies of every entity of a type, optionally filtered by context
    pub fn get_by_type(&self, type_id: TypeId, context: &str) -> Vec<Entity> {
        self.by_type
            .get(&type_id)
            .map(|records| {
                records
                    .values()
                    .filter(|e| context.is_empty() || e.context == context)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Deep copies of every entity (any type) whose value matches in the given mode
    pub fn get_by_value(&self, value: &str, mode: ValueMatchMode, context: &str) -> Vec<Entity> {
        let pattern = match mode {
            ValueMatchMode::Regex => match Regex::new(value) {
                Ok(re) => Some(re),
                Err(err) => {
                    // Malformed pattern matches nothing rather than erroring.
                    warn!(%err, "invalid regex in value lookup");
                    return Vec::new();
                }
            },
            _ => None,
        };

        let mut results = Vec::new();
        for records in self.by_type.values() {
            for entity in records.values() {
                if !context.is_empty() && entity.context != context {
                    continue;
                }
                let hit = match mode {
                    ValueMatchMode::Match => entity.value == value,
                    ValueMatchMode::Prefix => entity.value.starts_with(value),
                    ValueMatchMode::Suffix => entity.value.ends_with(value),
                    ValueMatchMode::Contain => entity.value.contains(value),
                    ValueMatchMode::Regex => {
                        pattern.as_ref().is_some_and(|re| re.is_match(&entity.value))
                    }
                };
                if hit {
                    results.push(entity.clone());
                }
            }
        }
        results
    }

    /// Version-checked replacement of a stored record
    ///
    /// The supplied entity must carry the version it was read at; on success
    /// the stored record is replaced and its version incremented by one.
    pub fn update(&mut self, entity: &Entity) -> StorageResult<Entity> {
        let address = entity.address();
        let stored = self
            .by_type
            .get_mut(&entity.type_id)
            .and_then(|records| records.get_mut(&entity.id))
            .ok_or(StorageError::EntityNotFound(address))?;

        if stored.version != entity.version {
            return Err(StorageError::VersionConflict {
                expected: entity.version,
                found: stored.version,
            });
        }

        let mut updated = entity.clone();
        updated.version += 1;
        *stored = updated.clone();
        debug!(
            type_id = entity.type_id.as_u32(),
            id = entity.id.as_u64(),
            version = updated.version,
            "updated entity"
        );
        Ok(updated)
    }

    /// Remove a record, returning it if present
    ///
    /// Relation cascade is the caller's responsibility (same lock episode).
    pub fn delete(&mut self, type_id: TypeId, id: EntityId) -> Option<Entity> {
        let removed = self.by_type.get_mut(&type_id)?.remove(&id);
        if removed.is_some() {
            debug!(type_id = type_id.as_u32(), id = id.as_u64(), "deleted entity");
        }
        removed
    }

    /// Iterate live records of one type (executor scan path)
    pub fn iter_type(&self, type_id: TypeId) -> impl Iterator<Item = &Entity> {
        self.by_type.get(&type_id).into_iter().flat_map(|records| records.values())
    }

    pub fn count(&self) -> usize {
        self.by_type.values().map(FxHashMap::len).sum()
    }
}
