//! QA tests for the on-disk document: round trips, migration and backfill.
//!
//! Run with: `cargo test -p ties-core --test qa_persistence`

use std::fs;
use ties_core::model::Document;
use ties_core::{
    migrate_store, FileStore, LoadReport, PersonId, Repository, SchemaVersion, StoreBackend,
};
use tempfile::TempDir;

fn store_in(temp_dir: &TempDir) -> FileStore {
    FileStore::new(temp_dir.path().join("data.json"))
}

fn read_json(store: &FileStore) -> serde_json::Value {
    let bytes = store.read().expect("store should be readable");
    serde_json::from_slice(&bytes).expect("store should hold JSON")
}

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn test_created_person_survives_reload() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let (mut repo, report) = Repository::load(store_in(&temp_dir));
    assert_eq!(report, LoadReport::Fresh);
    let alice = repo
        .create_person("Alice", "met at work", vec!["work".to_string()])
        .expect("create should succeed");
    let bob = repo
        .create_person("Bob", "", Vec::new())
        .expect("create should succeed");
    assert_ne!(alice.id, bob.id);
    assert!(!alice.id.as_str().is_empty());

    let (reloaded, report) = Repository::load(store_in(&temp_dir));
    assert_eq!(report, LoadReport::Loaded { backfilled: 0 });
    assert_eq!(reloaded.person(&alice.id), Some(&alice));
    assert_eq!(reloaded.person(&bob.id), Some(&bob));
}

#[test]
fn test_empty_store_then_create_alice() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let (mut repo, _) = Repository::load(store_in(&temp_dir));
    repo.create_person("Alice", "", Vec::new())
        .expect("create should succeed");

    let json = read_json(&store_in(&temp_dir));
    let people = json["people"].as_array().expect("people array");
    assert_eq!(people.len(), 1);
    assert_eq!(people[0]["name"], "Alice");
    assert_eq!(people[0]["tags"], serde_json::json!([]));
    assert!(!people[0]["id"].as_str().unwrap_or_default().is_empty());
    assert_eq!(json["version"], "1.0.0");
}

#[test]
fn test_strength_clamped_on_disk() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let (mut repo, _) = Repository::load(store_in(&temp_dir));
    let alice = repo.create_person("Alice", "", Vec::new()).expect("create");
    let bob = repo.create_person("Bob", "", Vec::new()).expect("create");

    let rel = repo
        .create_relation(&alice.id, &bob.id, 9, "friend")
        .expect("create should succeed")
        .expect("relation should be accepted");
    assert_eq!(read_json(&store_in(&temp_dir))["relations"][0]["strength"], 5);

    repo.update_relation(&rel.id, -3, "acquaintance")
        .expect("update should succeed");
    let json = read_json(&store_in(&temp_dir));
    assert_eq!(json["relations"][0]["strength"], 1);
    assert_eq!(json["relations"][0]["description"], "acquaintance");
}

#[test]
fn test_cascade_delete_on_disk() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let (mut repo, _) = Repository::load(store_in(&temp_dir));
    let alice = repo.create_person("Alice", "", Vec::new()).expect("create");
    let bob = repo.create_person("Bob", "", Vec::new()).expect("create");
    repo.create_relation(&alice.id, &bob.id, 3, "friend")
        .expect("create");

    assert!(repo.delete_person(&alice.id).expect("delete should succeed"));

    let (reloaded, _) = Repository::load(store_in(&temp_dir));
    assert!(reloaded.people().iter().all(|p| p.name != "Alice"));
    assert!(reloaded.relations().is_empty());
}

#[test]
fn test_unknown_ids_do_not_write() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let (mut repo, _) = Repository::load(store_in(&temp_dir));
    repo.create_person("Alice", "", Vec::new()).expect("create");
    let before = fs::read(temp_dir.path().join("data.json")).expect("read");

    let ghost = PersonId::from("ghost");
    assert!(!repo.update_person(&ghost, "X", "", Vec::new()).expect("update"));
    assert!(!repo.delete_person(&ghost).expect("delete"));

    let after = fs::read(temp_dir.path().join("data.json")).expect("read");
    assert_eq!(before, after);
}

// =============================================================================
// Migration and backfill
// =============================================================================

const LEGACY: &str = r#"{
    "version": "0.0.1",
    "people": [
        {"id": "a", "name": "Alice", "notes": ""},
        {"id": "b", "name": "Bob", "notes": ""}
    ],
    "relations": [
        {"from_id": "a", "to_id": "b", "strength": 4, "description": "friend"}
    ]
}"#;

#[test]
fn test_startup_sequence_on_legacy_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("data.json");
    fs::write(&path, LEGACY).expect("seed legacy file");

    let mut store = FileStore::new(&path);
    let report = migrate_store(&mut store).expect("migration should succeed");
    assert_eq!(report.steps.len(), 1);
    assert_eq!(report.steps[0].to, SchemaVersion::CURRENT);

    let migrated: Document =
        serde_json::from_slice(&fs::read(&path).expect("read")).expect("current schema");
    assert_eq!(migrated.version, "1.0.0");
    assert!(migrated.people.iter().all(|p| p.tags.is_empty()));

    // Relation id is backfilled by the first load only
    let (repo, report) = Repository::load(FileStore::new(&path));
    assert_eq!(report, LoadReport::Loaded { backfilled: 1 });
    let assigned = repo.relations()[0].id.clone();
    assert!(!assigned.is_blank());
    let after_backfill = fs::read(&path).expect("read");

    let (repo, report) = Repository::load(FileStore::new(&path));
    assert_eq!(report, LoadReport::Loaded { backfilled: 0 });
    assert_eq!(repo.relations()[0].id, assigned);
    assert_eq!(fs::read(&path).expect("read"), after_backfill);
}

#[test]
fn test_migration_is_idempotent_on_disk() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("data.json");
    fs::write(&path, LEGACY).expect("seed legacy file");

    let mut store = FileStore::new(&path);
    migrate_store(&mut store).expect("first migration");
    let once = fs::read(&path).expect("read");

    let report = migrate_store(&mut store).expect("second migration");
    assert!(!report.rewrote());
    assert_eq!(fs::read(&path).expect("read"), once);
}

#[test]
fn test_unrecognized_schema_is_left_as_stored() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("data.json");
    let newer = r#"{"version": "1.0.1", "people": [{"id": "a", "name": "Alice", "notes": "", "tags": []}], "relations": []}"#;
    fs::write(&path, newer).expect("seed file");

    let report = migrate_store(&mut FileStore::new(&path)).expect("migration should succeed");
    assert!(!report.rewrote());
    assert_eq!(fs::read_to_string(&path).expect("read"), newer);

    let (mut repo, report) = Repository::load(FileStore::new(&path));
    assert_eq!(report, LoadReport::Loaded { backfilled: 0 });
    assert_eq!(repo.people()[0].name, "Alice");

    repo.create_person("Bob", "", Vec::new())
        .expect("create should succeed");
    let json = read_json(&FileStore::new(&path));
    assert_eq!(json["version"], "1.0.1");
    let names: Vec<_> = json["people"]
        .as_array()
        .expect("people array")
        .iter()
        .map(|p| p["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["Alice", "Bob"]);
}

#[test]
fn test_null_lists_from_older_writers() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("data.json");
    let written = r#"{"version":"1.0.0","people":[{"id":"a","name":"A","notes":"","tags":null}],"relations":null}"#;
    fs::write(&path, written).expect("seed file");

    let report = migrate_store(&mut FileStore::new(&path)).expect("migration should succeed");
    assert!(!report.rewrote());

    let (repo, report) = Repository::load(FileStore::new(&path));
    assert_eq!(report, LoadReport::Loaded { backfilled: 0 });
    assert_eq!(repo.people().len(), 1);
    assert!(repo.people()[0].tags.is_empty());
    assert!(repo.relations().is_empty());
}

#[test]
fn test_corrupt_file_is_reported_not_overwritten() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("data.json");
    fs::write(&path, "{ this is not json").expect("seed file");

    let (repo, report) = Repository::load(FileStore::new(&path));
    assert!(matches!(report, LoadReport::Recovered { .. }));
    assert!(repo.people().is_empty());
    assert_eq!(
        fs::read_to_string(&path).expect("read"),
        "{ this is not json"
    );
}
