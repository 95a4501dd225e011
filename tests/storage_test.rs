//! Store-level integration tests: registry, entity/relation primitives,
//! optimistic versioning, cascade deletion, events and bulk import.

use filament::*;

fn addr(type_id: TypeId, id: EntityId) -> Address {
    Address::new(type_id, id)
}

#[test]
fn test_type_registration_is_idempotent() {
    let storage = Storage::new();
    let first = storage.register_type("Person");
    let second = storage.register_type("Person");

    assert_eq!(first, second);
    assert_eq!(storage.type_id("Person"), Some(first));
    assert_eq!(storage.type_name(first).as_deref(), Some("Person"));
    assert_eq!(storage.type_id("Ghost"), None);
    assert_eq!(storage.stats().types, 1);
}

#[test]
fn test_if_not_exists_vs_force_create() {
    let storage = Storage::new();
    let t = storage.register_type("Tag");

    let a = storage
        .create_entity(Entity::new(t, "rust").with_context("lang"), IdHint::IfNotExists)
        .unwrap();
    let b = storage
        .create_entity(Entity::new(t, "rust").with_context("lang"), IdHint::IfNotExists)
        .unwrap();
    assert_eq!(a, b);

    let c = storage
        .create_entity(Entity::new(t, "rust").with_context("lang"), IdHint::ForceCreate)
        .unwrap();
    let d = storage
        .create_entity(Entity::new(t, "rust").with_context("lang"), IdHint::ForceCreate)
        .unwrap();
    assert_ne!(c, d);
}

#[test]
fn test_stale_update_is_rejected_and_leaves_record_unchanged() {
    let storage = Storage::new();
    let t = storage.register_type("Doc");
    let id = storage
        .create_entity(Entity::new(t, "v1"), IdHint::ForceCreate)
        .unwrap();

    let mut copy_one = storage.get_entity(t, id, "").unwrap();
    let mut copy_two = copy_one.clone();

    copy_one.value = "v2".to_string();
    assert_eq!(storage.update_entity(&copy_one).unwrap().version, 2);

    // copy_two still carries version 1
    copy_two.value = "lost update".to_string();
    let conflict = storage.update_entity(&copy_two);
    assert!(matches!(
        conflict,
        Err(StorageError::VersionConflict { expected: 1, found: 2 })
    ));

    let stored = storage.get_entity(t, id, "").unwrap();
    assert_eq!(stored.value, "v2");
    assert_eq!(stored.version, 2);
}

#[test]
fn test_delete_cascades_to_all_touching_relations() {
    let storage = Storage::new();
    let person = storage.register_type("Person");
    let city = storage.register_type("City");

    let alice = storage
        .create_entity(Entity::new(person, "Alice"), IdHint::ForceCreate)
        .unwrap();
    let bob = storage
        .create_entity(Entity::new(person, "Bob"), IdHint::ForceCreate)
        .unwrap();
    let berlin = storage
        .create_entity(Entity::new(city, "Berlin"), IdHint::ForceCreate)
        .unwrap();

    storage
        .create_relation(Relation::new(addr(person, alice), addr(city, berlin)))
        .unwrap();
    storage
        .create_relation(Relation::new(addr(person, bob), addr(city, berlin)))
        .unwrap();
    storage
        .create_relation(Relation::new(addr(city, berlin), addr(person, alice)))
        .unwrap();
    assert_eq!(storage.stats().relations, 3);

    storage.delete_entity(city, berlin).unwrap();

    assert!(storage.get_entity(city, berlin, "").is_err());
    // Both endpoints observe the cascade
    assert!(storage.get_child_relations(addr(person, alice), "").is_empty());
    assert!(storage.get_child_relations(addr(person, bob), "").is_empty());
    assert!(storage.get_parent_relations(addr(person, alice), "").is_empty());
    assert_eq!(storage.stats().relations, 0);
}

#[test]
fn test_relation_create_requires_registered_types() {
    let storage = Storage::new();
    let known = storage.register_type("Known");
    let id = storage
        .create_entity(Entity::new(known, "x"), IdHint::ForceCreate)
        .unwrap();

    let bogus = TypeId::new(42);
    let result = storage.create_relation(Relation::new(
        addr(known, id),
        addr(bogus, EntityId::new(1)),
    ));
    assert_eq!(result, Err(StorageError::InvalidType(bogus)));
}

#[test]
fn test_relation_update_is_version_checked() {
    let storage = Storage::new();
    let t = storage.register_type("Node");
    let a = storage
        .create_entity(Entity::new(t, "a"), IdHint::ForceCreate)
        .unwrap();
    let b = storage
        .create_entity(Entity::new(t, "b"), IdHint::ForceCreate)
        .unwrap();
    storage
        .create_relation(Relation::new(addr(t, a), addr(t, b)).with_context("old"))
        .unwrap();

    let mut relation = storage.get_relation(addr(t, a), addr(t, b)).unwrap();
    relation.context = "new".to_string();
    assert_eq!(storage.update_relation(&relation).unwrap().version, 2);

    // Same snapshot again is stale now
    let conflict = storage.update_relation(&relation);
    assert!(matches!(conflict, Err(StorageError::VersionConflict { .. })));
}

#[test]
fn test_missing_relation_lookup_reports_both_endpoints() {
    let storage = Storage::new();
    let t = storage.register_type("Node");
    let a = storage
        .create_entity(Entity::new(t, "a"), IdHint::ForceCreate)
        .unwrap();
    let b = storage
        .create_entity(Entity::new(t, "b"), IdHint::ForceCreate)
        .unwrap();

    let missing = storage.get_relation(addr(t, a), addr(t, b));
    assert_eq!(
        missing,
        Err(StorageError::RelationNotFound {
            src: addr(t, a),
            target: addr(t, b),
        })
    );
    assert!(matches!(
        storage.delete_relation(addr(t, a), addr(t, b)),
        Err(StorageError::RelationNotFound { .. })
    ));
}

#[test]
fn test_value_lookup_modes_and_context_filter() {
    let storage = Storage::new();
    let t = storage.register_type("Word");
    for (value, context) in [("light", "a"), ("lighthouse", "a"), ("daylight", "b")] {
        storage
            .create_entity(Entity::new(t, value).with_context(context), IdHint::ForceCreate)
            .unwrap();
    }

    assert_eq!(
        storage.get_entities_by_value("light", ValueMatchMode::Match, "").len(),
        1
    );
    assert_eq!(
        storage.get_entities_by_value("light", ValueMatchMode::Prefix, "").len(),
        2
    );
    assert_eq!(
        storage.get_entities_by_value("light", ValueMatchMode::Suffix, "").len(),
        2
    );
    assert_eq!(
        storage.get_entities_by_value("light", ValueMatchMode::Contain, "").len(),
        3
    );
    assert_eq!(
        storage
            .get_entities_by_value("^.*light$", ValueMatchMode::Regex, "")
            .len(),
        2
    );
    // Context narrows every mode
    assert_eq!(
        storage
            .get_entities_by_value("light", ValueMatchMode::Contain, "b")
            .len(),
        1
    );
}

#[test]
fn test_event_sink_receives_ordered_mutations() {
    let (storage, mut events) = Storage::with_event_sink();
    let t = storage.register_type("Thing");
    let id = storage
        .create_entity(Entity::new(t, "one"), IdHint::ForceCreate)
        .unwrap();
    let mut read = storage.get_entity(t, id, "").unwrap();
    read.value = "two".to_string();
    storage.update_entity(&read).unwrap();
    storage.delete_entity(t, id).unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(match event {
            PersistenceEvent::TypeRegistered { .. } => "type",
            PersistenceEvent::Entity { method: MutationKind::Create, .. } => "create",
            PersistenceEvent::Entity { method: MutationKind::Update, .. } => "update",
            PersistenceEvent::Entity { method: MutationKind::Delete, .. } => "delete",
            PersistenceEvent::Relation { .. } => "relation",
        });
    }
    assert_eq!(kinds, vec!["type", "create", "update", "delete"]);
}

#[test]
fn test_store_works_identically_without_event_sink() {
    let storage = Storage::new();
    let t = storage.register_type("Silent");
    let id = storage
        .create_entity(Entity::new(t, "x"), IdHint::ForceCreate)
        .unwrap();
    storage.delete_entity(t, id).unwrap();
    assert_eq!(storage.stats().entities, 0);
}

#[test]
fn test_import_spec_from_json() {
    let storage = Storage::new();
    let spec: EntitySpec = serde_json::from_str(
        r#"{
            "type": "Band",
            "value": "Seeed",
            "children": [
                { "context": "released", "entity": { "type": "Album", "value": "Next!" } }
            ]
        }"#,
    )
    .unwrap();

    let root = storage.import(&spec).unwrap();
    let band = storage.type_id("Band").unwrap();
    let children = storage.get_child_relations(Address::new(band, root), "released");
    assert_eq!(children.len(), 1);

    // Idempotent resubmission
    let again = storage.import(&spec).unwrap();
    assert_eq!(root, again);
    assert_eq!(storage.stats().entities, 2);
    assert_eq!(storage.stats().relations, 1);
}
