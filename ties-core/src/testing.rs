//! Testing utilities for the session.
//!
//! This module provides tools for integration testing:
//! - `TestHarness` for scripted session scenarios over an in-memory store
//! - Assertion helpers for verifying session and document state

use crate::model::{Person, RelationEntry};
use crate::session::{Input, Outcome, Session, View};
use crate::store::MemoryStore;

/// Test harness driving a [`Session`] over a [`MemoryStore`].
///
/// The harness keeps a handle to the store so tests can inspect what was
/// written or make writes fail.
pub struct TestHarness {
    /// The session under test.
    pub session: Session<MemoryStore>,
    /// Shared handle to the session's store.
    pub store: MemoryStore,
}

impl TestHarness {
    /// Create a harness on an empty store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    /// Create a harness whose store already holds `json`.
    pub fn with_document(json: &str) -> Self {
        Self::with_store(MemoryStore::with_contents(json))
    }

    fn with_store(store: MemoryStore) -> Self {
        let session = Session::open(store.clone());
        Self { session, store }
    }

    /// Send one input.
    pub fn press(&mut self, input: Input) -> Outcome {
        self.session.handle(input)
    }

    /// Send a sequence of inputs.
    pub fn press_all(&mut self, inputs: &[Input]) -> &mut Self {
        for input in inputs {
            self.session.handle(*input);
        }
        self
    }

    /// Type text into the focused field, one character at a time.
    pub fn type_text(&mut self, text: &str) -> &mut Self {
        for c in text.chars() {
            self.session.handle(Input::Char(c));
        }
        self
    }

    /// Create a person from the people list and return to it.
    pub fn add_person(&mut self, name: &str, notes: &str) -> &mut Self {
        self.press(Input::New);
        self.type_text(name);
        self.press(Input::Commit);
        self.type_text(notes);
        self.press(Input::Commit);
        self
    }

    /// Move the people cursor to `name` and open the detail view.
    ///
    /// Must be called from the people list.
    pub fn open_person(&mut self, name: &str) -> &mut Self {
        let index = self
            .session
            .visible_people()
            .iter()
            .position(|p| p.name == name)
            .unwrap_or_else(|| panic!("no person named '{name}'"));
        self.move_cursor_to(index, self.session.people_cursor());
        self.press(Input::Select);
        self
    }

    /// Narrow the list on screen to names containing `query`.
    pub fn filter(&mut self, query: &str) -> &mut Self {
        self.press(Input::Filter);
        self.type_text(query);
        self.press(Input::Commit);
        self
    }

    /// Connect the selected person to `target` from the detail view.
    pub fn add_relation(&mut self, target: &str, strength: &str, description: &str) -> &mut Self {
        self.press(Input::NewRelation);
        let index = self
            .session
            .visible_people()
            .iter()
            .position(|p| p.name == target)
            .unwrap_or_else(|| panic!("no person named '{target}'"));
        self.move_cursor_to(index, self.session.target_cursor());
        self.press(Input::Select);
        self.type_text(strength);
        self.press(Input::Commit);
        self.type_text(description);
        self.press(Input::Commit);
        self
    }

    fn move_cursor_to(&mut self, index: usize, current: usize) {
        for _ in index..current {
            self.press(Input::Up);
        }
        for _ in current..index {
            self.press(Input::Down);
        }
    }

    /// Current view.
    pub fn view(&self) -> View {
        self.session.view()
    }

    /// Person by name.
    pub fn person(&self, name: &str) -> Option<&Person> {
        self.session.people().iter().find(|p| p.name == name)
    }

    /// Names of all people in document order.
    pub fn names(&self) -> Vec<String> {
        self.session.people().iter().map(|p| p.name.clone()).collect()
    }

    /// Relations listed on the current detail view.
    pub fn relations(&self) -> Vec<RelationEntry> {
        self.session.relations()
    }

    /// Parsed document last written to the store.
    pub fn saved(&self) -> Option<serde_json::Value> {
        self.store.json()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the session is in `view`.
#[track_caller]
pub fn assert_view(harness: &TestHarness, view: View) {
    assert_eq!(
        harness.view(),
        view,
        "Expected view {view:?}, got {:?}",
        harness.view()
    );
}

/// Assert a person with `name` exists.
#[track_caller]
pub fn assert_has_person(harness: &TestHarness, name: &str) {
    assert!(
        harness.person(name).is_some(),
        "Expected person '{name}' to exist"
    );
}

/// Assert no person with `name` exists.
#[track_caller]
pub fn assert_no_person(harness: &TestHarness, name: &str) {
    assert!(
        harness.person(name).is_none(),
        "Expected person '{name}' to NOT exist"
    );
}

/// Assert every in-memory change reached the store.
#[track_caller]
pub fn assert_saved(harness: &TestHarness) {
    assert!(
        !harness.session.has_unsaved_changes(),
        "Expected no unsaved changes"
    );
}
