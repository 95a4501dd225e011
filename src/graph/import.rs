//! Recursive bulk import of partially-existing graph structures
//!
//! Callers submit a tree of entity specs; each node carries a sentinel id
//! (negative: force-create, zero: upsert by value+context, positive: reference
//! an existing id) plus nested child/parent relation specs. The walk is
//! depth-first: a node is created/resolved first, then each nested entity, and
//! the connecting relation is created only if that exact relation does not
//! already exist. Submitting the same tree twice is therefore a no-op.

use super::entity::Entity;
use super::relation::Relation;
use super::store::Storage;
use super::types::{Address, EntityId, IdHint};
use crate::error::StorageResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// One node of an import tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySpec {
    /// Sentinel id: negative force-create, zero upsert, positive existing
    #[serde(default)]
    pub id: i64,

    #[serde(rename = "type")]
    pub type_name: String,

    pub value: String,

    #[serde(default)]
    pub context: String,

    #[serde(default)]
    pub properties: HashMap<String, String>,

    /// Relations from this node toward nested child entities
    #[serde(default)]
    pub children: Vec<RelationSpec>,

    /// Relations from nested parent entities toward this node
    #[serde(default)]
    pub parents: Vec<RelationSpec>,
}

impl EntitySpec {
    pub fn new(type_name: impl Into<String>, value: impl Into<String>) -> Self {
        EntitySpec {
            id: 0,
            type_name: type_name.into(),
            value: value.into(),
            context: String::new(),
            properties: HashMap::new(),
            children: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_child(mut self, spec: RelationSpec) -> Self {
        self.children.push(spec);
        self
    }

    pub fn with_parent(mut self, spec: RelationSpec) -> Self {
        self.parents.push(spec);
        self
    }
}

/// A relation hanging off an import-tree node, wrapping the nested entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationSpec {
    #[serde(default)]
    pub context: String,

    #[serde(default)]
    pub properties: HashMap<String, String>,

    pub entity: EntitySpec,
}

impl RelationSpec {
    pub fn to(entity: EntitySpec) -> Self {
        RelationSpec {
            context: String::new(),
            properties: HashMap::new(),
            entity,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

impl Storage {
    /// Import a spec tree, returning the id of the tree's root entity
    pub fn import(&self, spec: &EntitySpec) -> StorageResult<EntityId> {
        let address = self.import_node(spec)?;
        Ok(address.id)
    }

    fn import_node(&self, spec: &EntitySpec) -> StorageResult<Address> {
        let type_id = self.register_type(&spec.type_name);

        let mut entity = Entity::new(type_id, spec.value.clone()).with_context(spec.context.clone());
        entity.properties = spec.properties.clone();
        let id = self.create_entity(entity, IdHint::from(spec.id))?;
        let address = Address::new(type_id, id);
        debug!(%address, value = spec.value.as_str(), "resolved import node");

        for child in &spec.children {
            let child_address = self.import_node(&child.entity)?;
            self.link_if_absent(address, child_address, child)?;
        }
        for parent in &spec.parents {
            let parent_address = self.import_node(&parent.entity)?;
            self.link_if_absent(parent_address, address, parent)?;
        }

        Ok(address)
    }

    fn link_if_absent(
        &self,
        source: Address,
        target: Address,
        spec: &RelationSpec,
    ) -> StorageResult<()> {
        if self.relation_exists(source, target) {
            return Ok(());
        }
        let mut relation = Relation::new(source, target).with_context(spec.context.clone());
        relation.properties = spec.properties.clone();
        self.create_relation(relation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_builds_tree_and_is_idempotent() {
        let storage = Storage::new();

        let tree = EntitySpec::new("Band", "Seeed")
            .with_child(RelationSpec::to(EntitySpec::new("Album", "New Dubby Conquerors")))
            .with_child(RelationSpec::to(EntitySpec::new("Album", "Music Monks")));

        let root = storage.import(&tree).unwrap();
        let band_type = storage.type_id("Band").unwrap();
        let album_type = storage.type_id("Album").unwrap();

        assert_eq!(storage.get_entities_by_type(album_type, "").len(), 2);
        let children =
            storage.get_child_relations(Address::new(band_type, root), "");
        assert_eq!(children.len(), 2);

        // Second submission resolves the same records and adds nothing
        let root_again = storage.import(&tree).unwrap();
        assert_eq!(root, root_again);
        assert_eq!(storage.stats().entities, 3);
        assert_eq!(storage.stats().relations, 2);
    }

    #[test]
    fn test_import_parent_direction_and_existing_reference() {
        let storage = Storage::new();
        let city_type = storage.register_type("City");
        let city = storage
            .create_entity(Entity::new(city_type, "Berlin"), IdHint::ForceCreate)
            .unwrap();

        let tree = EntitySpec::new("Venue", "SO36").with_parent(RelationSpec::to(
            EntitySpec::new("City", "Berlin").with_id(city.as_u64() as i64),
        ));
        let venue = storage.import(&tree).unwrap();

        let venue_type = storage.type_id("Venue").unwrap();
        let parents =
            storage.get_parent_relations(Address::new(venue_type, venue), "");
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].source, Address::new(city_type, city));
        // The positive sentinel referenced the existing record, no duplicate
        assert_eq!(storage.get_entities_by_type(city_type, "").len(), 1);
    }
}
