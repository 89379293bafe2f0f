//! People, relations and the persisted document.
//!
//! These are the current-schema types. Older schema shapes live in
//! [`crate::migrate`] and are upgraded into these before loading.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Schema version written by this build.
pub const CURRENT_VERSION: &str = "1.0.0";

/// Lowest relation strength accepted at commit time.
pub const MIN_STRENGTH: i32 = 1;

/// Highest relation strength accepted at commit time.
pub const MAX_STRENGTH: i32 = 5;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for people.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PersonId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for PersonId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for relations.
///
/// Legacy documents may carry an empty id; [`RelationId::is_blank`] detects
/// those so the repository can backfill them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationId(String);

impl RelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Records
// ============================================================================

/// A person in the address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub notes: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
}

impl Person {
    /// Create a person with a freshly generated id.
    pub fn new(name: impl Into<String>, notes: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            id: PersonId::new(),
            name: name.into(),
            notes: notes.into(),
            tags,
        }
    }
}

/// A directed, weighted connection between two people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(default)]
    pub id: RelationId,
    pub from_id: PersonId,
    pub to_id: PersonId,
    pub strength: i32,
    pub description: String,
}

impl Relation {
    /// Whether either endpoint is `person`.
    pub fn touches(&self, person: &PersonId) -> bool {
        &self.from_id == person || &self.to_id == person
    }

    /// The endpoint opposite to `person`, viewed from `person`.
    pub fn other_end(&self, person: &PersonId) -> (&PersonId, Direction) {
        if &self.from_id == person {
            (&self.to_id, Direction::Outgoing)
        } else {
            (&self.from_id, Direction::Incoming)
        }
    }
}

/// Read a list that may be written as `null`.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Clamp a strength into the accepted range.
pub fn clamp_strength(strength: i32) -> i32 {
    strength.clamp(MIN_STRENGTH, MAX_STRENGTH)
}

/// Direction of a relation as seen from one of its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Outgoing,
    Incoming,
}

impl Direction {
    /// Arrow used when listing relations.
    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::Outgoing => "->",
            Direction::Incoming => "<-",
        }
    }
}

/// A relation as listed on a person's detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEntry {
    pub relation: Relation,
    pub other_name: String,
    pub direction: Direction,
}

// ============================================================================
// Document
// ============================================================================

/// The persisted aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub version: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub people: Vec<Person>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub relations: Vec<Relation>,
}

impl Document {
    /// An empty document at the current schema version.
    pub fn empty() -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            people: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Serialize as pretty-printed JSON, the on-disk format.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    pub fn person(&self, id: &PersonId) -> Option<&Person> {
        self.people.iter().find(|p| &p.id == id)
    }

    pub fn relation(&self, id: &RelationId) -> Option<&Relation> {
        self.relations.iter().find(|r| &r.id == id)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}
