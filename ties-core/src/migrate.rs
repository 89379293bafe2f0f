//! Schema migration for the persisted document.
//!
//! Every schema version has its own typed document shape. A stored document is
//! parsed into [`VersionedDocument`] by peeking at its `version` field, then
//! upgraded one version at a time until no transform starts from its version.
//! Migrations only ever move forward. A version no transform knows about is
//! read in the current shape and left exactly as stored.

use crate::model::{Document, Person, PersonId, Relation, CURRENT_VERSION};
use crate::store::{StoreBackend, StoreError};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from migration. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Known schema versions, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SchemaVersion {
    /// People have no tags.
    V0_0_1,
    /// People carry a tag list.
    V1_0_0,
}

impl SchemaVersion {
    pub const OLDEST: SchemaVersion = SchemaVersion::V0_0_1;
    pub const CURRENT: SchemaVersion = SchemaVersion::V1_0_0;

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVersion::V0_0_1 => "0.0.1",
            SchemaVersion::V1_0_0 => CURRENT_VERSION,
        }
    }

    pub fn parse(version: &str) -> Option<SchemaVersion> {
        match version {
            "0.0.1" => Some(SchemaVersion::V0_0_1),
            CURRENT_VERSION => Some(SchemaVersion::V1_0_0),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document shapes of retired schema versions.
pub mod legacy {
    use super::*;
    use crate::model::null_as_empty;

    #[derive(Debug, Deserialize)]
    pub struct PersonV0_0_1 {
        pub id: PersonId,
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub notes: String,
        // Hand-edited files sometimes carry tags before the bump.
        #[serde(default)]
        pub tags: Option<Vec<String>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct DocumentV0_0_1 {
        #[serde(default, deserialize_with = "null_as_empty")]
        pub people: Vec<PersonV0_0_1>,
        #[serde(default, deserialize_with = "null_as_empty")]
        pub relations: Vec<Relation>,
    }
}

use legacy::DocumentV0_0_1;

/// A stored document tagged with the schema it was written in.
#[derive(Debug)]
pub enum VersionedDocument {
    V0_0_1(DocumentV0_0_1),
    V1_0_0(Document),
    /// A version no transform starts from, keeping its declared version.
    Unrecognized(Document),
}

/// Result of offering a document to the transform table.
enum Upgrade {
    Next(MigrationStep, VersionedDocument),
    Done(Document),
}

/// One applied version transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStep {
    pub from: SchemaVersion,
    pub to: SchemaVersion,
}

/// What a store migration did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Transforms applied, in order.
    pub steps: Vec<MigrationStep>,
    /// The store had no document yet.
    pub skipped: bool,
}

impl MigrationReport {
    /// Whether the store was rewritten.
    pub fn rewrote(&self) -> bool {
        !self.steps.is_empty()
    }
}

impl VersionedDocument {
    /// Parse raw bytes, dispatching on the declared `version`.
    ///
    /// A missing version means the oldest known schema. Any other version
    /// string without a transform is read in the current shape.
    pub fn parse(bytes: &[u8]) -> Result<Self, MigrationError> {
        #[derive(Deserialize)]
        struct Header {
            #[serde(default)]
            version: Option<String>,
        }

        let header: Header = serde_json::from_slice(bytes)?;
        let version = match header.version {
            None => SchemaVersion::OLDEST,
            Some(v) => match SchemaVersion::parse(&v) {
                Some(known) => known,
                None => {
                    warn!("No migration starts from schema version {v}; leaving document as is");
                    return Ok(VersionedDocument::Unrecognized(serde_json::from_slice(bytes)?));
                }
            },
        };

        Ok(match version {
            SchemaVersion::V0_0_1 => VersionedDocument::V0_0_1(serde_json::from_slice(bytes)?),
            SchemaVersion::V1_0_0 => VersionedDocument::V1_0_0(serde_json::from_slice(bytes)?),
        })
    }

    /// The known schema this document is in, if any.
    pub fn version(&self) -> Option<SchemaVersion> {
        match self {
            VersionedDocument::V0_0_1(_) => Some(SchemaVersion::V0_0_1),
            VersionedDocument::V1_0_0(_) => Some(SchemaVersion::V1_0_0),
            VersionedDocument::Unrecognized(_) => None,
        }
    }

    /// Apply the single transform whose source is this document's version.
    fn upgrade(self) -> Result<Upgrade, MigrationError> {
        match self {
            VersionedDocument::V0_0_1(doc) => Ok(Upgrade::Next(
                MigrationStep {
                    from: SchemaVersion::V0_0_1,
                    to: SchemaVersion::V1_0_0,
                },
                VersionedDocument::V1_0_0(upgrade_0_0_1(doc)?),
            )),
            VersionedDocument::V1_0_0(doc) | VersionedDocument::Unrecognized(doc) => {
                Ok(Upgrade::Done(doc))
            }
        }
    }
}

/// 0.0.1 -> 1.0.0: every person gets a tag list.
fn upgrade_0_0_1(doc: DocumentV0_0_1) -> Result<Document, MigrationError> {
    let people = doc
        .people
        .into_iter()
        .map(|p| Person {
            id: p.id,
            name: p.name,
            notes: p.notes,
            tags: p.tags.unwrap_or_default(),
        })
        .collect();

    Ok(Document {
        version: SchemaVersion::V1_0_0.as_str().to_string(),
        people,
        relations: doc.relations,
    })
}

/// Upgrade a parsed document to the current schema.
pub fn migrate_document(
    doc: VersionedDocument,
) -> Result<(Document, Vec<MigrationStep>), MigrationError> {
    let mut steps = Vec::new();
    let mut current = doc;

    loop {
        match current.upgrade()? {
            Upgrade::Next(step, next) => {
                info!("Migrating document from {} to {}", step.from, step.to);
                steps.push(step);
                current = next;
            }
            Upgrade::Done(done) => return Ok((done, steps)),
        }
    }
}

fn migrate_with_steps(bytes: &[u8]) -> Result<Option<(Vec<u8>, Vec<MigrationStep>)>, MigrationError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let (document, steps) = migrate_document(VersionedDocument::parse(bytes)?)?;
    if steps.is_empty() {
        return Ok(None);
    }
    Ok(Some((document.to_json()?, steps)))
}

/// Migrate raw document bytes.
///
/// Returns `None` when no transform applied (already current, or empty input),
/// otherwise the rewritten document.
pub fn migrate_bytes(bytes: &[u8]) -> Result<Option<Vec<u8>>, MigrationError> {
    Ok(migrate_with_steps(bytes)?.map(|(out, _)| out))
}

/// Migrate the document held by `store` in place.
///
/// A store with no document is skipped. The store is only written when at
/// least one transform applied, and never when any transform fails.
pub fn migrate_store(store: &mut impl StoreBackend) -> Result<MigrationReport, MigrationError> {
    let bytes = match store.read() {
        Ok(bytes) => bytes,
        Err(StoreError::NotFound) => {
            debug!("No document at {}, skipping migration", store.describe());
            return Ok(MigrationReport {
                steps: Vec::new(),
                skipped: true,
            });
        }
        Err(e) => return Err(e.into()),
    };

    match migrate_with_steps(&bytes)? {
        Some((out, steps)) => {
            store.write(&out)?;
            info!(
                "Migrated {} to schema {} ({} step(s))",
                store.describe(),
                SchemaVersion::CURRENT,
                steps.len()
            );
            Ok(MigrationReport {
                steps,
                skipped: false,
            })
        }
        None => Ok(MigrationReport::default()),
    }
}
