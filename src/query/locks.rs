//! Lock coordination for whole-query execution
//!
//! A query executes under one lock-acquisition episode: guards are taken in
//! the fixed global order (type -> entity -> relation) before the executor
//! touches any map and are dropped together when the [`LockSet`] goes out of
//! scope at the end of `execute`. No lock is upgraded mid-query.

use crate::graph::entities::EntityPool;
use crate::graph::registry::TypeRegistry;
use crate::graph::relations::RelationPool;
use crate::graph::store::Storage;
use crate::query::ast::Method;
use std::ops::Deref;
use std::sync::{RwLockReadGuard, RwLockWriteGuard};

/// A held read or write guard over one shared map
pub(crate) enum MapGuard<'a, T> {
    Shared(RwLockReadGuard<'a, T>),
    Exclusive(RwLockWriteGuard<'a, T>),
}

impl<T> Deref for MapGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            MapGuard::Shared(guard) => guard,
            MapGuard::Exclusive(guard) => guard,
        }
    }
}

impl<T> MapGuard<'_, T> {
    /// Mutable access; only called on paths where acquisition was exclusive
    pub(crate) fn exclusive(&mut self) -> &mut T {
        match self {
            MapGuard::Exclusive(guard) => guard,
            MapGuard::Shared(_) => {
                unreachable!("mutating methods acquire exclusive guards")
            }
        }
    }
}

/// The guards held for one query execution
pub(crate) struct LockSet<'a> {
    pub types: MapGuard<'a, TypeRegistry>,
    pub entities: MapGuard<'a, EntityPool>,
    pub relations: Option<MapGuard<'a, RelationPool>>,
}

impl<'a> LockSet<'a> {
    /// Acquire the guard set for `method`
    ///
    /// `wants_relations` reports whether the query touches the relation index
    /// at all (joins or traversal); read-side methods skip the relation lock
    /// entirely when it is false. Delete always takes the relation lock
    /// exclusively: the cascade mutates the index.
    pub fn acquire(storage: &'a Storage, method: Method, wants_relations: bool) -> Self {
        match method {
            Method::Read | Method::Reduce | Method::Find => LockSet {
                types: MapGuard::Shared(storage.types.read().unwrap()),
                entities: MapGuard::Shared(storage.entities.read().unwrap()),
                relations: wants_relations
                    .then(|| MapGuard::Shared(storage.relations.read().unwrap())),
            },
            Method::Update => LockSet {
                types: MapGuard::Exclusive(storage.types.write().unwrap()),
                entities: MapGuard::Exclusive(storage.entities.write().unwrap()),
                relations: wants_relations
                    .then(|| MapGuard::Shared(storage.relations.read().unwrap())),
            },
            Method::Delete | Method::Link | Method::Unlink => LockSet {
                types: MapGuard::Exclusive(storage.types.write().unwrap()),
                entities: MapGuard::Exclusive(storage.entities.write().unwrap()),
                relations: Some(MapGuard::Exclusive(storage.relations.write().unwrap())),
            },
        }
    }

    /// The relation guard, for paths that verified it was acquired
    pub fn relations(&self) -> &RelationPool {
        match &self.relations {
            Some(guard) => guard,
            None => {
                unreachable!("relation access requires a lock set acquired with wants_relations")
            }
        }
    }

    pub fn relations_mut(&mut self) -> &mut RelationPool {
        match &mut self.relations {
            Some(guard) => guard.exclusive(),
            None => {
                unreachable!("relation access requires a lock set acquired with wants_relations")
            }
        }
    }
}
