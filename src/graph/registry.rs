//! Bidirectional type name registry
//!
//! Foundation for every other index: maps type names to dense integer ids and
//! back. The mapping is a bijection and ids are never reused.

use super::types::TypeId;
use rustc_hash::FxHashMap;

/// Name <-> id registry with dense id allocation
#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_name: FxHashMap<String, TypeId>,
    by_id: FxHashMap<TypeId, String>,
    next_id: u32,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry {
            by_name: FxHashMap::default(),
            by_id: FxHashMap::default(),
            // 0 is reserved as the invalid id
            next_id: 1,
        }
    }

    /// Register a type name, returning its id
    ///
    /// Idempotent: registering an existing name returns the id allocated the
    /// first time. The boolean is true when the name was newly registered.
    pub fn register(&mut self, name: &str) -> (TypeId, bool) {
        if let Some(id) = self.by_name.get(name) {
            return (*id, false);
        }
        let id = TypeId::new(self.next_id);
        self.next_id += 1;
        self.by_name.insert(name.to_string(), id);
        self.by_id.insert(id, name.to_string());
        (id, true)
    }

    pub fn id_of(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: TypeId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// All registered `(id, name)` pairs, unordered
    pub fn entries(&self) -> impl Iterator<Item = (TypeId, &str)> {
        self.by_id.iter().map(|(id, name)| (*id, name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = TypeRegistry::new();
        let (first, created) = registry.register("Person");
        assert!(created);
        let (second, created) = registry.register("Person");
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_ids_are_dense_and_never_zero() {
        let mut registry = TypeRegistry::new();
        let (a, _) = registry.register("A");
        let (b, _) = registry.register("B");
        assert_eq!(a.as_u32(), 1);
        assert_eq!(b.as_u32(), 2);
        assert!(a.is_valid());
    }

    #[test]
    fn test_entries_lists_every_registration() {
        let mut registry = TypeRegistry::new();
        let (a, _) = registry.register("A");
        let (b, _) = registry.register("B");

        let mut entries: Vec<(TypeId, String)> = registry
            .entries()
            .map(|(id, name)| (id, name.to_string()))
            .collect();
        entries.sort_by_key(|(id, _)| id.as_u32());
        assert_eq!(entries, vec![(a, "A".to_string()), (b, "B".to_string())]);
    }

    #[test]
    fn test_bidirectional_lookup() {
        let mut registry = TypeRegistry::new();
        let (id, _) = registry.register("Device");

        assert_eq!(registry.id_of("Device"), Some(id));
        assert_eq!(registry.name_of(id), Some("Device"));
        assert_eq!(registry.id_of("Unknown"), None);
        assert_eq!(registry.name_of(TypeId::new(99)), None);
    }
}
