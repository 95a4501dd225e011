//! The owning storage instance
//!
//! [`Storage`] holds the type registry, entity pool and relation pool behind
//! three independently lockable `RwLock`s, plus the optional persistence event
//! sender. Every public method here is the lock-acquiring variant of a pool
//! primitive: it takes its own short-lived lock in the fixed global order
//! (type -> entity -> relation) and releases it before returning. Whole-query
//! lock episodes are handled by the query layer's
//! [`LockSet`](crate::query::locks::LockSet) instead.

use super::entities::EntityPool;
use super::entity::Entity;
use super::event::{MutationKind, PersistenceEvent};
use super::registry::TypeRegistry;
use super::relation::Relation;
use super::relations::RelationPool;
use super::types::{Address, EntityId, IdHint, TypeId, ValueMatchMode};
use crate::error::{StorageError, StorageResult};
use crate::query::ast::Query;
use crate::query::executor::QueryExecutor;
use crate::query::transport::Transport;
use std::sync::RwLock;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{error, info};

/// Counts of live records, for monitoring hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    pub types: usize,
    pub entities: usize,
    pub relations: usize,
}

/// An independent in-memory graph store instance
#[derive(Debug)]
pub struct Storage {
    pub(crate) types: RwLock<TypeRegistry>,
    pub(crate) entities: RwLock<EntityPool>,
    pub(crate) relations: RwLock<RelationPool>,
    events: Option<UnboundedSender<PersistenceEvent>>,
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage {
    /// Create an empty store with persistence disabled
    pub fn new() -> Self {
        Storage {
            types: RwLock::new(TypeRegistry::new()),
            entities: RwLock::new(EntityPool::new()),
            relations: RwLock::new(RelationPool::new()),
            events: None,
        }
    }

    /// Create an empty store that emits a [`PersistenceEvent`] per mutation
    ///
    /// The receiver is handed to the host's durability layer; the store never
    /// blocks on it.
    pub fn with_event_sink() -> (Self, UnboundedReceiver<PersistenceEvent>) {
        let (tx, rx) = unbounded_channel();
        let mut storage = Self::new();
        storage.events = Some(tx);
        (storage, rx)
    }

    /// Fire-and-forget event emission
    pub(crate) fn emit(&self, event: PersistenceEvent) {
        if let Some(sender) = &self.events {
            if sender.send(event).is_err() {
                // The host dropped the receiver; durability is gone and we
                // must not pretend otherwise.
                error!("persistence event sink disconnected");
            }
        }
    }

    // ------------------------------------------------------------------
    // Type registry
    // ------------------------------------------------------------------

    /// Register a type name, returning its id (idempotent)
    ///
    /// First registration allocates the entity-pool submap for the new id.
    pub fn register_type(&self, name: &str) -> TypeId {
        let mut types = self.types.write().unwrap();
        let mut entities = self.entities.write().unwrap();

        let (id, created) = types.register(name);
        if created {
            entities.allocate_type(id);
            info!(type_name = name, type_id = id.as_u32(), "registered type");
            self.emit(PersistenceEvent::TypeRegistered {
                id,
                name: name.to_string(),
            });
        }
        id
    }

    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.types.read().unwrap().id_of(name)
    }

    pub fn type_name(&self, id: TypeId) -> Option<String> {
        self.types.read().unwrap().name_of(id).map(str::to_string)
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Create or resolve an entity according to the id hint
    pub fn create_entity(&self, entity: Entity, hint: IdHint) -> StorageResult<EntityId> {
        let types = self.types.read().unwrap();
        let mut entities = self.entities.write().unwrap();

        let type_id = entity.type_id;
        let type_name = types
            .name_of(type_id)
            .ok_or(StorageError::InvalidType(type_id))?
            .to_string();

        let (id, created) = entities.create(entity, hint)?;
        if created {
            // Re-read so the event carries the stored record with its assigned id
            if let Some(stored) = entities.get(type_id, id) {
                self.emit(PersistenceEvent::Entity {
                    method: MutationKind::Create,
                    type_name,
                    entity: stored.clone(),
                });
            }
        }
        Ok(id)
    }

    /// Fetch a deep copy by `(type, id)`, with an optional context filter
    pub fn get_entity(&self, type_id: TypeId, id: EntityId, context: &str) -> StorageResult<Entity> {
        self.entities.read().unwrap().get_by_address(type_id, id, context)
    }

    /// Deep copies of every entity of a type
    pub fn get_entities_by_type(&self, type_id: TypeId, context: &str) -> Vec<Entity> {
        self.entities.read().unwrap().get_by_type(type_id, context)
    }

    /// Deep copies of every entity (any type) matching a value in the given mode
    pub fn get_entities_by_value(
        &self,
        value: &str,
        mode: ValueMatchMode,
        context: &str,
    ) -> Vec<Entity> {
        self.entities.read().unwrap().get_by_value(value, mode, context)
    }

    /// Version-checked update; returns the stored record at its new version
    pub fn update_entity(&self, entity: &Entity) -> StorageResult<Entity> {
        let types = self.types.read().unwrap();
        let mut entities = self.entities.write().unwrap();

        let type_name = types
            .name_of(entity.type_id)
            .ok_or(StorageError::InvalidType(entity.type_id))?
            .to_string();
        let updated = entities.update(entity)?;
        self.emit(PersistenceEvent::Entity {
            method: MutationKind::Update,
            type_name,
            entity: updated.clone(),
        });
        Ok(updated)
    }

    /// Delete an entity and cascade to every relation touching it
    pub fn delete_entity(&self, type_id: TypeId, id: EntityId) -> StorageResult<()> {
        let types = self.types.read().unwrap();
        let mut entities = self.entities.write().unwrap();
        let mut relations = self.relations.write().unwrap();

        let address = Address::new(type_id, id);
        let type_name = types
            .name_of(type_id)
            .ok_or(StorageError::InvalidType(type_id))?
            .to_string();
        let removed = entities
            .delete(type_id, id)
            .ok_or(StorageError::EntityNotFound(address))?;

        for relation in relations.cascade_delete(address) {
            self.emit(PersistenceEvent::Relation {
                method: MutationKind::Delete,
                relation,
            });
        }
        self.emit(PersistenceEvent::Entity {
            method: MutationKind::Delete,
            type_name,
            entity: removed,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------

    pub fn relation_exists(&self, source: Address, target: Address) -> bool {
        self.relations.read().unwrap().exists(source, target)
    }

    /// Insert a relation; both endpoint types must be registered
    pub fn create_relation(&self, relation: Relation) -> StorageResult<()> {
        let types = self.types.read().unwrap();
        let mut relations = self.relations.write().unwrap();

        for endpoint in [relation.source.type_id, relation.target.type_id] {
            if !types.contains(endpoint) {
                return Err(StorageError::InvalidType(endpoint));
            }
        }

        relations.create(relation.clone());
        self.emit(PersistenceEvent::Relation {
            method: MutationKind::Create,
            relation,
        });
        Ok(())
    }

    pub fn get_relation(&self, source: Address, target: Address) -> StorageResult<Relation> {
        self.relations
            .read()
            .unwrap()
            .get(source, target)
            .cloned()
            .ok_or(StorageError::RelationNotFound { src: source, target })
    }

    /// All relations leaving `source`, optionally filtered by relation context
    pub fn get_child_relations(&self, source: Address, context: &str) -> Vec<Relation> {
        self.relations.read().unwrap().children_of(source, context)
    }

    /// All relations arriving at `target`, optionally filtered by relation context
    pub fn get_parent_relations(&self, target: Address, context: &str) -> Vec<Relation> {
        self.relations.read().unwrap().parents_of(target, context)
    }

    /// Remove one relation (both index sides, one lock scope)
    pub fn delete_relation(&self, source: Address, target: Address) -> StorageResult<Relation> {
        let mut relations = self.relations.write().unwrap();
        let removed = relations
            .delete(source, target)
            .ok_or(StorageError::RelationNotFound { src: source, target })?;
        self.emit(PersistenceEvent::Relation {
            method: MutationKind::Delete,
            relation: removed.clone(),
        });
        Ok(removed)
    }

    /// Version-checked update of a relation's context and properties
    pub fn update_relation(&self, relation: &Relation) -> StorageResult<Relation> {
        let mut relations = self.relations.write().unwrap();
        let updated = relations.update(relation)?;
        self.emit(PersistenceEvent::Relation {
            method: MutationKind::Update,
            relation: updated.clone(),
        });
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Queries & monitoring
    // ------------------------------------------------------------------

    /// Execute a query against this store
    pub fn execute(&self, query: &Query) -> StorageResult<Transport> {
        QueryExecutor::new(self).execute(query)
    }

    pub fn stats(&self) -> StorageStats {
        let types = self.types.read().unwrap();
        let entities = self.entities.read().unwrap();
        let relations = self.relations.read().unwrap();
        StorageStats {
            types: types.len(),
            entities: entities.count(),
            relations: relations.count(),
        }
    }
}
