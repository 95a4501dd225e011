//! Query execution engine
//!
//! Interprets a [`Query`] against a [`Storage`] instance: filters base
//! candidates, recursively resolves nested joins with required/optional
//! gating, performs traversal enrichment, applies the mutating methods and
//! finally sorts/limits the outermost result list. The whole execution runs
//! under one lock episode acquired by [`LockSet`].

use super::ast::{Method, Query, SortDirection, SortMode, SortSpec, SubQuery};
use super::condition::Field;
use super::locks::LockSet;
use super::transport::{Transport, TransportEntity, TransportRelation};
use crate::error::StorageResult;
use crate::graph::entity::Entity;
use crate::graph::event::{MutationKind, PersistenceEvent};
use crate::graph::relation::Relation;
use crate::graph::store::Storage;
use crate::graph::types::{Address, Direction, TypeId};
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use tracing::debug;

/// Executes queries against one storage instance
pub struct QueryExecutor<'a> {
    storage: &'a Storage,
}

/// A base candidate that survived its join gating
struct Resolved {
    entity: Entity,
    children: Vec<TransportRelation>,
    parents: Vec<TransportRelation>,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        QueryExecutor { storage }
    }

    /// Execute a query, returning the transport result
    pub fn execute(&self, query: &Query) -> StorageResult<Transport> {
        // An empty pool is a no-op contract, not an error
        if query.pool.is_empty() {
            return Ok(Transport::empty());
        }

        let wants_relations = matches!(query.method, Method::Link | Method::Unlink)
            || !query.sub_queries.is_empty()
            || query.traversal.is_some();
        let mut locks = LockSet::acquire(self.storage, query.method, wants_relations);
        self.run(query, &mut locks)
    }

    fn run(&self, query: &Query, locks: &mut LockSet<'_>) -> StorageResult<Transport> {
        let pool_ids = resolve_pool(&query.pool, locks);
        if pool_ids.is_empty() {
            return Ok(Transport::empty());
        }

        let candidates = scan_candidates(query, &pool_ids, locks);
        debug!(
            method = ?query.method,
            pool = ?query.pool,
            candidates = candidates.len(),
            "base candidate scan"
        );

        if matches!(query.method, Method::Link | Method::Unlink) {
            return self.apply_link_unlink(query, candidates, locks);
        }

        // Depth-first join resolution; required sub-queries with zero matches
        // reject the candidate and the rejection propagates upward.
        let mut resolved = Vec::new();
        for entity in candidates {
            if let Some((children, parents)) =
                self.resolve_sub_queries(&entity, &query.sub_queries, locks)
            {
                resolved.push(Resolved {
                    entity,
                    children,
                    parents,
                });
            }
        }

        if let Some(sort) = &query.sort {
            resolved.sort_by(|a, b| {
                compare_field_values(sort.field.get(&a.entity), sort.field.get(&b.entity), sort)
            });
        }
        if let Some(limit) = query.limit {
            resolved.truncate(limit);
        }

        match query.method {
            Method::Read => Ok(self.assemble_read(query, resolved, locks)),
            Method::Reduce | Method::Find => Ok(Transport::amount_only(resolved.len())),
            Method::Update => self.apply_update(query, resolved, locks),
            Method::Delete => Ok(self.apply_delete(resolved, locks)),
            Method::Link | Method::Unlink => unreachable!("handled above"),
        }
    }

    /// Resolve all nested sub-queries at one candidate
    ///
    /// `None` means a required sub-query had zero matches and the candidate
    /// branch is rejected.
    fn resolve_sub_queries(
        &self,
        entity: &Entity,
        subs: &[SubQuery],
        locks: &LockSet<'_>,
    ) -> Option<(Vec<TransportRelation>, Vec<TransportRelation>)> {
        let mut children = Vec::new();
        let mut parents = Vec::new();

        for sub in subs {
            let sub_pool = resolve_pool(&sub.query.pool, locks);
            let condition = sub.query.condition();
            let address = entity.address();

            let relations = match sub.direction {
                Direction::Child => locks.relations().children_of(address, ""),
                Direction::Parent => locks.relations().parents_of(address, ""),
            };

            let mut matched = 0usize;
            for relation in relations {
                let counterpart_address = match sub.direction {
                    Direction::Child => relation.target,
                    Direction::Parent => relation.source,
                };
                if !sub_pool.contains(&counterpart_address.type_id) {
                    continue;
                }
                let counterpart = match locks
                    .entities
                    .get(counterpart_address.type_id, counterpart_address.id)
                {
                    Some(found) => found.clone(),
                    None => continue,
                };
                if let Some(condition) = &condition {
                    if !condition.evaluate(&counterpart) {
                        continue;
                    }
                }
                // The counterpart must satisfy its own required sub-queries
                let Some((sub_children, sub_parents)) =
                    self.resolve_sub_queries(&counterpart, &sub.query.sub_queries, locks)
                else {
                    continue;
                };
                matched += 1;

                // Reduce (and Find) gate candidacy but contribute no data
                if sub.query.method != Method::Read {
                    continue;
                }

                let mut transport = self.materialize(&counterpart, locks);
                transport.child_relations = sub_children;
                transport.parent_relations = sub_parents;
                if let Some(traversal) = sub.query.traversal {
                    let mut visited = FxHashSet::default();
                    visited.insert(counterpart_address);
                    self.enrich(
                        &mut transport,
                        counterpart_address,
                        traversal.direction,
                        traversal.depth,
                        &mut visited,
                        locks,
                    );
                }
                let wrapped = TransportRelation::new(&relation, transport);
                match sub.direction {
                    Direction::Child => children.push(wrapped),
                    Direction::Parent => parents.push(wrapped),
                }
            }

            if sub.required && matched == 0 {
                return None;
            }
        }

        Some((children, parents))
    }

    /// Post-match recursive expansion of a node's relation tree
    ///
    /// Walks the relation index directly without re-running conditions. The
    /// visited set prevents re-descending into an already expanded node, so
    /// recursion is bounded by `depth` regardless of graph cycles.
    fn enrich(
        &self,
        node: &mut TransportEntity,
        address: Address,
        direction: Direction,
        depth: u32,
        visited: &mut FxHashSet<Address>,
        locks: &LockSet<'_>,
    ) {
        if depth == 0 {
            return;
        }
        let relations = match direction {
            Direction::Child => locks.relations().children_of(address, ""),
            Direction::Parent => locks.relations().parents_of(address, ""),
        };
        for relation in relations {
            let next_address = match direction {
                Direction::Child => relation.target,
                Direction::Parent => relation.source,
            };
            if !visited.insert(next_address) {
                continue;
            }
            let next = match locks.entities.get(next_address.type_id, next_address.id) {
                Some(found) => found.clone(),
                None => continue,
            };
            let mut transport = self.materialize(&next, locks);
            self.enrich(&mut transport, next_address, direction, depth - 1, visited, locks);
            let wrapped = TransportRelation::new(&relation, transport);
            match direction {
                Direction::Child => node.child_relations.push(wrapped),
                Direction::Parent => node.parent_relations.push(wrapped),
            }
        }
    }

    fn materialize(&self, entity: &Entity, locks: &LockSet<'_>) -> TransportEntity {
        let type_name = locks
            .types
            .name_of(entity.type_id)
            .unwrap_or_default()
            .to_string();
        TransportEntity::from_entity(entity, type_name)
    }

    fn assemble_read(
        &self,
        query: &Query,
        resolved: Vec<Resolved>,
        locks: &LockSet<'_>,
    ) -> Transport {
        let mut entities = Vec::with_capacity(resolved.len());
        for item in resolved {
            let address = item.entity.address();
            let mut transport = self.materialize(&item.entity, locks);
            transport.child_relations = item.children;
            transport.parent_relations = item.parents;
            if let Some(traversal) = query.traversal {
                let mut visited = FxHashSet::default();
                visited.insert(address);
                self.enrich(
                    &mut transport,
                    address,
                    traversal.direction,
                    traversal.depth,
                    &mut visited,
                    locks,
                );
            }
            entities.push(transport);
        }
        let amount = entities.len();
        Transport { entities, amount }
    }

    fn apply_update(
        &self,
        query: &Query,
        resolved: Vec<Resolved>,
        locks: &mut LockSet<'_>,
    ) -> StorageResult<Transport> {
        let mut amount = 0usize;
        for item in resolved {
            let mut entity = item.entity;
            for (field, value) in &query.assignments {
                match field {
                    Field::Value => entity.value = value.clone(),
                    Field::Context => entity.context = value.clone(),
                    Field::Property(name) => {
                        entity.properties.insert(name.clone(), value.clone());
                    }
                    // Ids are immutable
                    Field::Id => {}
                }
            }
            let type_name = locks
                .types
                .name_of(entity.type_id)
                .unwrap_or_default()
                .to_string();
            // The snapshot was taken under this same exclusive lock, so the
            // version check cannot race another query here.
            let updated = locks.entities.exclusive().update(&entity)?;
            self.storage.emit(PersistenceEvent::Entity {
                method: MutationKind::Update,
                type_name,
                entity: updated,
            });
            amount += 1;
        }
        Ok(Transport::amount_only(amount))
    }

    fn apply_delete(&self, resolved: Vec<Resolved>, locks: &mut LockSet<'_>) -> Transport {
        let mut amount = 0usize;
        for item in resolved {
            let address = item.entity.address();
            let type_name = locks
                .types
                .name_of(address.type_id)
                .unwrap_or_default()
                .to_string();
            let Some(removed) = locks.entities.exclusive().delete(address.type_id, address.id)
            else {
                continue;
            };
            for relation in locks.relations_mut().cascade_delete(address) {
                self.storage.emit(PersistenceEvent::Relation {
                    method: MutationKind::Delete,
                    relation,
                });
            }
            self.storage.emit(PersistenceEvent::Entity {
                method: MutationKind::Delete,
                type_name,
                entity: removed,
            });
            amount += 1;
        }
        Transport::amount_only(amount)
    }

    /// Link/Unlink: the pool selects sources; each sub-query independently
    /// selects targets and never gates the sources
    fn apply_link_unlink(
        &self,
        query: &Query,
        sources: Vec<Entity>,
        locks: &mut LockSet<'_>,
    ) -> StorageResult<Transport> {
        let source_addresses: Vec<Address> = sources.iter().map(Entity::address).collect();
        let mut amount = 0usize;

        for sub in &query.sub_queries {
            let targets = self.resolve_selector(&sub.query, locks);
            for &source in &source_addresses {
                for &target in &targets {
                    let (from, to) = match sub.direction {
                        Direction::Child => (source, target),
                        Direction::Parent => (target, source),
                    };
                    match query.method {
                        Method::Link => {
                            // Existing pairs are not recreated or duplicated
                            if locks.relations().exists(from, to) {
                                continue;
                            }
                            let relation = Relation::new(from, to);
                            locks.relations_mut().create(relation.clone());
                            self.storage.emit(PersistenceEvent::Relation {
                                method: MutationKind::Create,
                                relation,
                            });
                            amount += 1;
                        }
                        Method::Unlink => {
                            if let Some(removed) = locks.relations_mut().delete(from, to) {
                                self.storage.emit(PersistenceEvent::Relation {
                                    method: MutationKind::Delete,
                                    relation: removed,
                                });
                                amount += 1;
                            }
                        }
                        _ => unreachable!("only Link/Unlink reach this path"),
                    }
                }
            }
        }

        Ok(Transport::amount_only(amount))
    }

    /// Resolve a target-selector query to the addresses it matches
    ///
    /// The selector's own nested sub-queries still gate its candidates, but
    /// nothing about it is required from the source side.
    fn resolve_selector(&self, query: &Query, locks: &LockSet<'_>) -> Vec<Address> {
        let pool_ids = resolve_pool(&query.pool, locks);
        let candidates = scan_candidates(query, &pool_ids, locks);
        candidates
            .into_iter()
            .filter(|entity| {
                self.resolve_sub_queries(entity, &query.sub_queries, locks)
                    .is_some()
            })
            .map(|entity| entity.address())
            .collect()
    }
}

/// Resolve pool names to known type ids; unknown names are skipped
///
/// Duplicate names collapse to one id so a repeated pool entry never scans
/// (or mutates) the same entities twice.
fn resolve_pool(pool: &[String], locks: &LockSet<'_>) -> Vec<TypeId> {
    let mut seen = FxHashSet::default();
    pool.iter()
        .filter_map(|name| locks.types.id_of(name))
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Scan the pool's entity maps, keeping entities matching the condition tree
fn scan_candidates(query: &Query, pool_ids: &[TypeId], locks: &LockSet<'_>) -> Vec<Entity> {
    let condition = query.condition();
    let mut candidates = Vec::new();
    for &type_id in pool_ids {
        for entity in locks.entities.iter_type(type_id) {
            let hit = condition
                .as_ref()
                .map_or(true, |condition| condition.evaluate(entity));
            if hit {
                candidates.push(entity.clone());
            }
        }
    }
    candidates
}

/// Compare two sort-field readings under the given spec
///
/// Entities missing the field sort last in either direction. In numeric mode
/// unparseable values also sort after all parseable ones.
fn compare_field_values(a: Option<String>, b: Option<String>, spec: &SortSpec) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ordering = match spec.mode {
                SortMode::Numeric => match (a.parse::<i64>(), b.parse::<i64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    // Unparseable values stay after parseable ones regardless
                    // of direction, like the missing-field arms above.
                    (Ok(_), Err(_)) => return Ordering::Less,
                    (Err(_), Ok(_)) => return Ordering::Greater,
                    (Err(_), Err(_)) => return Ordering::Equal,
                },
                SortMode::Alphabetic => {
                    // Case-insensitive primary ordering, literal tie-break
                    a.to_lowercase()
                        .cmp(&b.to_lowercase())
                        .then_with(|| a.cmp(&b))
                }
            };
            match spec.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(direction: SortDirection, mode: SortMode) -> SortSpec {
        SortSpec {
            field: Field::Value,
            direction,
            mode,
        }
    }

    fn sorted(values: &[&str], direction: SortDirection, mode: SortMode) -> Vec<String> {
        let mut values: Vec<String> = values.iter().map(|s| s.to_string()).collect();
        let spec = spec(direction, mode);
        values.sort_by(|a, b| compare_field_values(Some(a.clone()), Some(b.clone()), &spec));
        values
    }

    #[test]
    fn test_numeric_sort_parses_values() {
        assert_eq!(
            sorted(&["2", "333", "1"], SortDirection::Ascending, SortMode::Numeric),
            vec!["1", "2", "333"]
        );
        assert_eq!(
            sorted(&["2", "333", "1"], SortDirection::Descending, SortMode::Numeric),
            vec!["333", "2", "1"]
        );
    }

    #[test]
    fn test_numeric_sort_puts_unparseable_last() {
        assert_eq!(
            sorted(&["12", "oops", "3"], SortDirection::Ascending, SortMode::Numeric),
            vec!["3", "12", "oops"]
        );
        // Direction reverses the numbers only, not the unparseable tail
        assert_eq!(
            sorted(&["12", "oops", "3"], SortDirection::Descending, SortMode::Numeric),
            vec!["12", "3", "oops"]
        );
    }

    #[test]
    fn test_alphabetic_sort_is_case_insensitive() {
        assert_eq!(
            sorted(
                &["Das", "Zebra", "auch"],
                SortDirection::Ascending,
                SortMode::Alphabetic
            ),
            vec!["auch", "Das", "Zebra"]
        );
    }

    #[test]
    fn test_missing_field_sorts_last() {
        let spec = spec(SortDirection::Ascending, SortMode::Alphabetic);
        assert_eq!(
            compare_field_values(None, Some("a".to_string()), &spec),
            Ordering::Greater
        );
        assert_eq!(
            compare_field_values(Some("a".to_string()), None, &spec),
            Ordering::Less
        );
    }
}
