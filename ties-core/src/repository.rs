//! In-memory people and relations, persisted after every mutation.
//!
//! The repository owns the [`Document`]. Each mutation is applied in memory
//! first and then the whole document is written through the store backend, so
//! the store never holds a mix of two edits. A failed write keeps the
//! in-memory change, marks the repository dirty and is reported to the caller,
//! who can retry with [`Repository::flush`].

use crate::migrate::{migrate_document, VersionedDocument};
use crate::model::{
    clamp_strength, Document, Person, PersonId, Relation, RelationEntry, RelationId,
};
use crate::store::{StoreBackend, StoreError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Name shown for a relation endpoint that no longer exists.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Errors from writing the document.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How the document was obtained on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadReport {
    /// Nothing stored yet; starting empty.
    Fresh,
    /// Document read; `backfilled` relations received a new id.
    Loaded { backfilled: usize },
    /// A document exists but could not be read; starting empty.
    Recovered { reason: String },
}

/// Owner of the in-memory document.
pub struct Repository<S: StoreBackend> {
    store: S,
    document: Document,
    dirty: bool,
}

impl<S: StoreBackend> Repository<S> {
    /// Load the document from `store`.
    ///
    /// Never fails: an absent or unreadable document yields an empty one.
    /// Relations without an id get one, and the document is written back once
    /// if that happened.
    pub fn load(store: S) -> (Self, LoadReport) {
        let (document, report) = match read_document(&store) {
            Ok(Some(document)) => (document, LoadReport::Loaded { backfilled: 0 }),
            Ok(None) => {
                info!("No document at {}, starting empty", store.describe());
                (Document::empty(), LoadReport::Fresh)
            }
            Err(reason) => {
                warn!(
                    "Could not read document at {}: {reason}; starting empty",
                    store.describe()
                );
                (Document::empty(), LoadReport::Recovered { reason })
            }
        };

        let mut repo = Self {
            store,
            document,
            dirty: false,
        };

        let backfilled = repo.backfill_relation_ids();
        if backfilled > 0 {
            info!("Assigned ids to {backfilled} relation(s)");
            // Failure leaves the repository dirty; the next write retries.
            if let Err(e) = repo.persist() {
                warn!(
                    "Could not save backfilled relation ids to {}: {e}",
                    repo.store.describe()
                );
            }
        }

        let report = match report {
            LoadReport::Loaded { .. } => LoadReport::Loaded { backfilled },
            other => other,
        };
        (repo, report)
    }

    fn backfill_relation_ids(&mut self) -> usize {
        let mut count = 0;
        for relation in self.document.relations.iter_mut() {
            if relation.id.is_blank() {
                relation.id = RelationId::new();
                count += 1;
            }
        }
        count
    }

    fn persist(&mut self) -> Result<(), PersistError> {
        let bytes = self.document.to_json()?;
        match self.store.write(&bytes) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                self.dirty = true;
                error!("Failed to write {}: {e}", self.store.describe());
                Err(e.into())
            }
        }
    }

    /// Retry a failed write. Returns whether anything was written.
    pub fn flush(&mut self) -> Result<bool, PersistError> {
        if !self.dirty {
            return Ok(false);
        }
        self.persist()?;
        info!("Flushed pending changes to {}", self.store.describe());
        Ok(true)
    }

    /// Whether the store is behind the in-memory document.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn people(&self) -> &[Person] {
        &self.document.people
    }

    pub fn relations(&self) -> &[Relation] {
        &self.document.relations
    }

    pub fn person(&self, id: &PersonId) -> Option<&Person> {
        self.document.person(id)
    }

    pub fn relation(&self, id: &RelationId) -> Option<&Relation> {
        self.document.relation(id)
    }

    pub fn person_name(&self, id: &PersonId) -> Option<&str> {
        self.person(id).map(|p| p.name.as_str())
    }

    // ========================================================================
    // People
    // ========================================================================

    /// Add a new person with a fresh id.
    pub fn create_person(
        &mut self,
        name: impl Into<String>,
        notes: impl Into<String>,
        tags: Vec<String>,
    ) -> Result<Person, PersistError> {
        let person = Person::new(name, notes, tags);
        debug!("Creating person {}", person.id);
        self.document.people.push(person.clone());
        self.persist()?;
        Ok(person)
    }

    /// Overwrite a person's fields. Unknown ids are ignored.
    ///
    /// Returns whether the person existed.
    pub fn update_person(
        &mut self,
        id: &PersonId,
        name: impl Into<String>,
        notes: impl Into<String>,
        tags: Vec<String>,
    ) -> Result<bool, PersistError> {
        let Some(person) = self.document.people.iter_mut().find(|p| &p.id == id) else {
            debug!("Update for unknown person {id} ignored");
            return Ok(false);
        };
        person.name = name.into();
        person.notes = notes.into();
        person.tags = tags;
        self.persist()?;
        Ok(true)
    }

    /// Remove a person and every relation naming them.
    ///
    /// Returns whether the person existed.
    pub fn delete_person(&mut self, id: &PersonId) -> Result<bool, PersistError> {
        let before = self.document.people.len();
        self.document.people.retain(|p| &p.id != id);
        if self.document.people.len() == before {
            debug!("Delete for unknown person {id} ignored");
            return Ok(false);
        }

        let relations_before = self.document.relations.len();
        self.document.relations.retain(|r| !r.touches(id));
        debug!(
            "Deleted person {id} and {} relation(s)",
            relations_before - self.document.relations.len()
        );
        self.persist()?;
        Ok(true)
    }

    // ========================================================================
    // Relations
    // ========================================================================

    /// Connect two people.
    ///
    /// Self-relations and relations to unknown people are rejected with
    /// `Ok(None)`. Strength is clamped into range.
    pub fn create_relation(
        &mut self,
        from: &PersonId,
        to: &PersonId,
        strength: i32,
        description: impl Into<String>,
    ) -> Result<Option<Relation>, PersistError> {
        if from == to {
            debug!("Rejected self-relation for {from}");
            return Ok(None);
        }
        if self.person(from).is_none() || self.person(to).is_none() {
            debug!("Rejected relation {from} -> {to}: unknown endpoint");
            return Ok(None);
        }

        let relation = Relation {
            id: RelationId::new(),
            from_id: from.clone(),
            to_id: to.clone(),
            strength: clamp_strength(strength),
            description: description.into(),
        };
        self.document.relations.push(relation.clone());
        self.persist()?;
        Ok(Some(relation))
    }

    /// Overwrite a relation's strength (clamped) and description.
    ///
    /// Returns whether the relation existed.
    pub fn update_relation(
        &mut self,
        id: &RelationId,
        strength: i32,
        description: impl Into<String>,
    ) -> Result<bool, PersistError> {
        let Some(relation) = self.document.relations.iter_mut().find(|r| &r.id == id) else {
            debug!("Update for unknown relation {id} ignored");
            return Ok(false);
        };
        relation.strength = clamp_strength(strength);
        relation.description = description.into();
        self.persist()?;
        Ok(true)
    }

    /// Remove a single relation. Returns whether it existed.
    pub fn delete_relation(&mut self, id: &RelationId) -> Result<bool, PersistError> {
        let before = self.document.relations.len();
        self.document.relations.retain(|r| &r.id != id);
        if self.document.relations.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Every relation touching `person`, with the other party's name and the
    /// direction seen from `person`, in document order.
    pub fn relations_for(&self, person: &PersonId) -> Vec<RelationEntry> {
        self.document
            .relations
            .iter()
            .filter(|r| r.touches(person))
            .map(|r| {
                let (other, direction) = r.other_end(person);
                RelationEntry {
                    relation: r.clone(),
                    other_name: self.person_name(other).unwrap_or(UNKNOWN_NAME).to_string(),
                    direction,
                }
            })
            .collect()
    }
}

/// Read and parse the stored document, upgrading older schemas in memory.
///
/// `Ok(None)` means nothing is stored (or only whitespace); `Err` carries a description of why a
/// stored document could not be used.
fn read_document(store: &impl StoreBackend) -> Result<Option<Document>, String> {
    let bytes = match store.read() {
        Ok(bytes) => bytes,
        Err(StoreError::NotFound) => return Ok(None),
        Err(e) => return Err(e.to_string()),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let versioned = VersionedDocument::parse(&bytes).map_err(|e| e.to_string())?;
    let (document, _) = migrate_document(versioned).map_err(|e| e.to_string())?;
    Ok(Some(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Direction;
    use crate::store::MemoryStore;

    fn repo() -> (Repository<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        let (repo, report) = Repository::load(store.clone());
        assert_eq!(report, LoadReport::Fresh);
        (repo, store)
    }

    #[test]
    fn test_create_person_persists() {
        let (mut repo, store) = repo();
        let alice = repo
            .create_person("Alice", "", Vec::new())
            .expect("create should succeed");

        let json = store.json().expect("document written");
        assert_eq!(json["people"][0]["name"], "Alice");
        assert_eq!(json["people"][0]["id"], alice.id.as_str());
        assert_eq!(json["people"][0]["tags"], serde_json::json!([]));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_update_unknown_person_is_noop() {
        let (mut repo, store) = repo();
        let updated = repo
            .update_person(&PersonId::from("missing"), "X", "", Vec::new())
            .expect("no error");
        assert!(!updated);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_update_person_in_place() {
        let (mut repo, _store) = repo();
        let alice = repo.create_person("Alice", "", Vec::new()).unwrap();
        repo.create_person("Bob", "", Vec::new()).unwrap();

        assert!(repo
            .update_person(&alice.id, "Alicia", "notes", vec!["work".into()])
            .unwrap());

        let updated = repo.person(&alice.id).unwrap();
        assert_eq!(updated.name, "Alicia");
        assert_eq!(updated.notes, "notes");
        assert_eq!(updated.tags, vec!["work".to_string()]);
        // Position kept
        assert_eq!(repo.people()[0].id, alice.id);
    }

    #[test]
    fn test_strength_clamped_on_create_and_update() {
        let (mut repo, _store) = repo();
        let alice = repo.create_person("Alice", "", Vec::new()).unwrap();
        let bob = repo.create_person("Bob", "", Vec::new()).unwrap();

        let rel = repo
            .create_relation(&alice.id, &bob.id, 9, "friend")
            .unwrap()
            .expect("relation created");
        assert_eq!(rel.strength, 5);

        repo.update_relation(&rel.id, -3, "acquaintance").unwrap();
        let stored = repo.relation(&rel.id).unwrap();
        assert_eq!(stored.strength, 1);
        assert_eq!(stored.description, "acquaintance");
    }

    #[test]
    fn test_self_relation_rejected() {
        let (mut repo, store) = repo();
        let alice = repo.create_person("Alice", "", Vec::new()).unwrap();
        let writes = store.write_count();

        let rel = repo.create_relation(&alice.id, &alice.id, 3, "me").unwrap();
        assert!(rel.is_none());
        assert!(repo.relations().is_empty());
        assert_eq!(store.write_count(), writes);
    }

    #[test]
    fn test_relation_to_unknown_person_rejected() {
        let (mut repo, _store) = repo();
        let alice = repo.create_person("Alice", "", Vec::new()).unwrap();
        let rel = repo
            .create_relation(&alice.id, &PersonId::from("ghost"), 3, "")
            .unwrap();
        assert!(rel.is_none());
    }

    #[test]
    fn test_delete_person_cascades() {
        let (mut repo, store) = repo();
        let alice = repo.create_person("Alice", "", Vec::new()).unwrap();
        let bob = repo.create_person("Bob", "", Vec::new()).unwrap();
        let carol = repo.create_person("Carol", "", Vec::new()).unwrap();
        repo.create_relation(&alice.id, &bob.id, 3, "").unwrap();
        repo.create_relation(&carol.id, &alice.id, 3, "").unwrap();
        let kept = repo.create_relation(&bob.id, &carol.id, 3, "").unwrap().unwrap();
        let writes = store.write_count();

        assert!(repo.delete_person(&alice.id).unwrap());
        assert_eq!(store.write_count(), writes + 1);
        assert!(repo.relations().iter().all(|r| !r.touches(&alice.id)));
        assert_eq!(repo.relations().len(), 1);
        assert_eq!(repo.relations()[0].id, kept.id);
    }

    #[test]
    fn test_delete_relation() {
        let (mut repo, _store) = repo();
        let alice = repo.create_person("Alice", "", Vec::new()).unwrap();
        let bob = repo.create_person("Bob", "", Vec::new()).unwrap();
        let rel = repo.create_relation(&alice.id, &bob.id, 3, "").unwrap().unwrap();

        assert!(repo.delete_relation(&rel.id).unwrap());
        assert!(!repo.delete_relation(&rel.id).unwrap());
        assert!(repo.relations().is_empty());
    }

    #[test]
    fn test_relations_for_direction_and_names() {
        let (mut repo, _store) = repo();
        let alice = repo.create_person("Alice", "", Vec::new()).unwrap();
        let bob = repo.create_person("Bob", "", Vec::new()).unwrap();
        let carol = repo.create_person("Carol", "", Vec::new()).unwrap();
        repo.create_relation(&alice.id, &bob.id, 4, "colleague").unwrap();
        repo.create_relation(&carol.id, &alice.id, 2, "neighbour").unwrap();

        let entries = repo.relations_for(&alice.id);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].other_name, "Bob");
        assert_eq!(entries[0].direction, Direction::Outgoing);
        assert_eq!(entries[1].other_name, "Carol");
        assert_eq!(entries[1].direction, Direction::Incoming);

        assert_eq!(repo.relations_for(&bob.id)[0].direction, Direction::Incoming);
    }

    #[test]
    fn test_load_backfills_relation_ids_once() {
        let store = MemoryStore::with_contents(
            r#"{"version": "1.0.0",
                "people": [{"id": "a", "name": "A", "notes": "", "tags": []},
                           {"id": "b", "name": "B", "notes": "", "tags": []}],
                "relations": [{"from_id": "a", "to_id": "b", "strength": 3, "description": ""}]}"#,
        );

        let (repo, report) = Repository::load(store.clone());
        assert_eq!(report, LoadReport::Loaded { backfilled: 1 });
        assert!(!repo.relations()[0].id.is_blank());
        assert_eq!(store.write_count(), 1);

        let (again, report) = Repository::load(store.clone());
        assert_eq!(report, LoadReport::Loaded { backfilled: 0 });
        assert_eq!(store.write_count(), 1);
        assert_eq!(again.relations()[0].id, repo.relations()[0].id);
    }

    #[test]
    fn test_backfill_write_failure_leaves_dirty() {
        let store = MemoryStore::with_contents(
            r#"{"version": "1.0.0",
                "people": [{"id": "a", "name": "A", "notes": "", "tags": []},
                           {"id": "b", "name": "B", "notes": "", "tags": []}],
                "relations": [{"from_id": "a", "to_id": "b", "strength": 3, "description": ""}]}"#,
        );
        store.set_fail_writes(true);

        let (mut repo, report) = Repository::load(store.clone());
        assert_eq!(report, LoadReport::Loaded { backfilled: 1 });
        assert!(repo.is_dirty());
        assert_eq!(store.write_count(), 0);
        assert!(store.json().unwrap()["relations"][0].get("id").is_none());

        store.set_fail_writes(false);
        assert!(repo.flush().expect("flush should succeed"));
        assert_eq!(
            store.json().unwrap()["relations"][0]["id"],
            repo.relations()[0].id.as_str()
        );
    }

    #[test]
    fn test_unknown_version_loads_as_stored() {
        let store = MemoryStore::with_contents(
            r#"{"version": "1.0.1",
                "people": [{"id": "a", "name": "A", "notes": "", "tags": ["x"]}],
                "relations": []}"#,
        );
        let (mut repo, report) = Repository::load(store.clone());
        assert_eq!(report, LoadReport::Loaded { backfilled: 0 });
        assert_eq!(repo.document().version, "1.0.1");
        assert_eq!(repo.people().len(), 1);
        assert_eq!(store.write_count(), 0);

        repo.create_person("B", "", Vec::new())
            .expect("create should succeed");
        let json = store.json().expect("document written");
        assert_eq!(json["version"], "1.0.1");
        assert_eq!(json["people"][0]["name"], "A");
        assert_eq!(json["people"][0]["tags"], serde_json::json!(["x"]));
        assert_eq!(json["people"][1]["name"], "B");
    }

    #[test]
    fn test_null_lists_load() {
        let store = MemoryStore::with_contents(
            r#"{"version":"1.0.0","people":[{"id":"a","name":"A","notes":"","tags":null}],"relations":null}"#,
        );
        let (repo, report) = Repository::load(store);
        assert_eq!(report, LoadReport::Loaded { backfilled: 0 });
        assert_eq!(repo.people().len(), 1);
        assert!(repo.people()[0].tags.is_empty());
    }

    #[test]
    fn test_corrupt_document_recovers_empty() {
        let store = MemoryStore::with_contents("{ definitely not json");
        let (repo, report) = Repository::load(store.clone());
        assert!(matches!(report, LoadReport::Recovered { .. }));
        assert!(repo.people().is_empty());
        assert_eq!(repo.document().version, "1.0.0");
        // Nothing is overwritten until the first mutation
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_legacy_document_upgraded_in_memory() {
        let store = MemoryStore::with_contents(
            r#"{"version": "0.0.1", "people": [{"id": "a", "name": "A", "notes": ""}], "relations": []}"#,
        );
        let (repo, report) = Repository::load(store);
        assert_eq!(report, LoadReport::Loaded { backfilled: 0 });
        assert_eq!(repo.document().version, "1.0.0");
        assert!(repo.people()[0].tags.is_empty());
    }

    #[test]
    fn test_failed_write_marks_dirty_and_flush_retries() {
        let (mut repo, store) = repo();
        store.set_fail_writes(true);

        let result = repo.create_person("Alice", "", Vec::new());
        assert!(result.is_err());
        assert!(repo.is_dirty());
        // In-memory change is kept
        assert_eq!(repo.people().len(), 1);

        assert!(repo.flush().is_err());
        store.set_fail_writes(false);
        assert!(repo.flush().expect("flush should succeed"));
        assert!(!repo.is_dirty());
        assert_eq!(store.json().unwrap()["people"][0]["name"], "Alice");
        assert!(!repo.flush().unwrap());
    }
}
