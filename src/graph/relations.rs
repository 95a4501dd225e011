//! Relation pool: forward index plus reverse presence index
//!
//! Forward: source address -> target address -> relation record.
//! Reverse: target address -> set of source addresses (presence markers only,
//! never duplicate records). Both sides are kept consistent inside every
//! mutating call; callers hold the relation lock around compound operations.

use super::relation::Relation;
use super::types::Address;
use crate::error::{StorageError, StorageResult};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

#[derive(Debug, Default)]
pub struct RelationPool {
    forward: FxHashMap<Address, FxHashMap<Address, Relation>>,
    reverse: FxHashMap<Address, FxHashSet<Address>>,
}

impl RelationPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, source: Address, target: Address) -> bool {
        self.forward
            .get(&source)
            .is_some_and(|targets| targets.contains_key(&target))
    }

    /// Insert a relation at version 1, maintaining the reverse marker
    ///
    /// Overwrites an existing record for the same endpoint pair; the link
    /// path checks [`exists`](Self::exists) first to keep linking idempotent.
    pub fn create(&mut self, mut relation: Relation) {
        relation.version = 1;
        let (source, target) = (relation.source, relation.target);

        self.forward.entry(source).or_default().insert(target, relation);
        self.reverse.entry(target).or_default().insert(source);
        debug!(%source, %target, "created relation");
    }

    pub fn get(&self, source: Address, target: Address) -> Option<&Relation> {
        self.forward.get(&source).and_then(|targets| targets.get(&target))
    }

    /// Deep copies of all relations leaving `source`, optionally context-filtered
    pub fn children_of(&self, source: Address, context: &str) -> Vec<Relation> {
        self.forward
            .get(&source)
            .map(|targets| {
                targets
                    .values()
                    .filter(|r| context.is_empty() || r.context == context)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Deep copies of all relations arriving at `target`, optionally context-filtered
    ///
    /// Resolved through the reverse presence index back into the forward map,
    /// so the records returned are the canonical ones.
    pub fn parents_of(&self, target: Address, context: &str) -> Vec<Relation> {
        self.reverse
            .get(&target)
            .map(|sources| {
                sources
                    .iter()
                    .filter_map(|source| self.get(*source, target))
                    .filter(|r| context.is_empty() || r.context == context)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove one relation, both index sides, returning the forward record
    pub fn delete(&mut self, source: Address, target: Address) -> Option<Relation> {
        let removed = self.forward.get_mut(&source)?.remove(&target)?;
        if self.forward.get(&source).is_some_and(FxHashMap::is_empty) {
            self.forward.remove(&source);
        }
        if let Some(sources) = self.reverse.get_mut(&target) {
            sources.remove(&source);
            if sources.is_empty() {
                self.reverse.remove(&target);
            }
        }
        debug!(%source, %target, "deleted relation");
        Some(removed)
    }

    /// Version-checked update of context and properties
    pub fn update(&mut self, relation: &Relation) -> StorageResult<Relation> {
        let stored = self
            .forward
            .get_mut(&relation.source)
            .and_then(|targets| targets.get_mut(&relation.target))
            .ok_or(StorageError::RelationNotFound {
                src: relation.source,
                target: relation.target,
            })?;

        if stored.version != relation.version {
            return Err(StorageError::VersionConflict {
                expected: relation.version,
                found: stored.version,
            });
        }

        stored.context = relation.context.clone();
        stored.properties = relation.properties.clone();
        stored.version += 1;
        Ok(stored.clone())
    }

    /// Remove every relation touching `address` as source or target
    ///
    /// The cascade arm of entity deletion; returns the removed records so the
    /// store can emit persistence events for each.
    pub fn cascade_delete(&mut self, address: Address) -> Vec<Relation> {
        let mut removed = Vec::new();

        let targets: Vec<Address> = self
            .forward
            .get(&address)
            .map(|targets| targets.keys().copied().collect())
            .unwrap_or_default();
        for target in targets {
            if let Some(relation) = self.delete(address, target) {
                removed.push(relation);
            }
        }

        let sources: Vec<Address> = self
            .reverse
            .get(&address)
            .map(|sources| sources.iter().copied().collect())
            .unwrap_or_default();
        for source in sources {
            if let Some(relation) = self.delete(source, address) {
                removed.push(relation);
            }
        }

        removed
    }

    pub fn count(&self) -> usize {
        self.forward.values().map(FxHashMap::len).sum()
    }
}
