//! Core of a terminal tracker for people and the ties between them.
//!
//! This crate provides:
//! - The persisted document model (people, directed weighted relations)
//! - Forward-only schema migration of stored documents
//! - A repository that persists every mutation to a pluggable store
//! - The tag index used for tag completion
//! - The interactive session state machine driven by abstract inputs
//!
//! # Quick Start
//!
//! ```no_run
//! use ties_core::{migrate_store, FileStore, Input, Session};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut store = FileStore::new("data.json");
//!     migrate_store(&mut store)?;
//!
//!     let mut session = Session::open(store);
//!     session.handle(Input::New);
//!     for c in "Alice".chars() {
//!         session.handle(Input::Char(c));
//!     }
//!     session.handle(Input::Commit);
//!     session.handle(Input::Commit);
//!     Ok(())
//! }
//! ```

pub mod migrate;
pub mod model;
pub mod repository;
pub mod session;
pub mod store;
pub mod tags;
pub mod testing;

// Primary public API
pub use migrate::{migrate_bytes, migrate_store, MigrationError, MigrationReport, SchemaVersion};
pub use model::{Direction, Document, Person, PersonId, Relation, RelationEntry, RelationId};
pub use repository::{LoadReport, PersistError, Repository};
pub use session::{
    FormMode, Input, Outcome, PeopleFilter, PersonField, RelationField, Session, View,
};
pub use store::{FileStore, MemoryStore, StoreBackend, StoreError};
pub use testing::TestHarness;
