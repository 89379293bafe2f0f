//! Interactive session state machine.
//!
//! A [`Session`] owns the [`Repository`] and a current [`View`]. Each
//! [`Input`] is handled completely (state read, mutation, persistence, next
//! view) before the next one is accepted. The session never holds references
//! into the document: the selected person, relation and relation target are
//! kept as ids and looked up again on every access.

use crate::model::{Person, PersonId, Relation, RelationEntry, RelationId};
use crate::repository::{LoadReport, PersistError, Repository, UNKNOWN_NAME};
use crate::store::StoreBackend;
use crate::tags;
use tracing::{debug, warn};

/// Longest text accepted in the strength field.
const STRENGTH_MAX_CHARS: usize = 3;

/// Whether a form creates a new record or edits the selected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Creating,
    Editing,
}

/// Focused field of the person form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonField {
    Name,
    Notes,
}

/// Focused field of the relation form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationField {
    Strength,
    Description,
}

/// The views of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    ListPeople,
    Detail,
    PersonForm {
        mode: FormMode,
        field: PersonField,
    },
    /// Tag assignment for the person form opened in `mode`.
    TagSelect {
        mode: FormMode,
    },
    RelationTargetSelect,
    RelationForm {
        mode: FormMode,
        field: RelationField,
    },
    ConfirmDeletePerson,
    ConfirmDeleteRelation,
}

/// Abstract input events. Key bindings are the host's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    New,
    Select,
    Back,
    EditPerson,
    ManageTags,
    DeletePerson,
    NewRelation,
    EditRelation,
    DeleteRelation,
    Cancel,
    Commit,
    ToggleFocus,
    Yes,
    No,
    Up,
    Down,
    Char(char),
    Backspace,
    RemoveTag,
    /// Start typing a name filter in a people list.
    Filter,
    Retry,
}

/// Result of handling an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The input meant nothing in the current view.
    Ignored,
    /// Session state changed.
    Updated,
}

/// Uncommitted person fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonDraft {
    pub name: String,
    pub notes: String,
    pub tags: Vec<String>,
}

impl PersonDraft {
    fn from_person(person: &Person) -> Self {
        Self {
            name: person.name.clone(),
            notes: person.notes.clone(),
            tags: person.tags.clone(),
        }
    }
}

/// Uncommitted relation fields. Strength stays text until commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationDraft {
    pub strength: String,
    pub description: String,
}

impl RelationDraft {
    fn from_relation(relation: &Relation) -> Self {
        Self {
            strength: relation.strength.to_string(),
            description: relation.description.clone(),
        }
    }

    /// Strength to commit. Unparseable text counts as 0 and is clamped by
    /// the repository.
    pub fn parsed_strength(&self) -> i32 {
        self.strength.trim().parse().unwrap_or(0)
    }
}

/// Name filter over a people list.
///
/// While `editing`, typed characters go to the query. Once committed the
/// query keeps narrowing the list until it is cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeopleFilter {
    pub query: String,
    pub editing: bool,
}

impl PeopleFilter {
    /// Whether the list is narrowed or a query is being typed.
    pub fn is_active(&self) -> bool {
        self.editing || !self.query.trim().is_empty()
    }

    /// People whose name matches the query, in document order.
    pub fn apply<'a>(&self, people: &'a [Person]) -> Vec<&'a Person> {
        people
            .iter()
            .filter(|p| tags::matches(&p.name, &self.query))
            .collect()
    }

    fn clear(&mut self) {
        self.query.clear();
        self.editing = false;
    }

    /// Consume a filter input. `None` leaves the input to the list view.
    fn handle(&mut self, input: Input) -> Option<Outcome> {
        if !self.editing {
            return match input {
                Input::Filter => {
                    self.editing = true;
                    Some(Outcome::Updated)
                }
                Input::Cancel | Input::Back if self.is_active() => {
                    self.clear();
                    Some(Outcome::Updated)
                }
                _ => None,
            };
        }

        match input {
            Input::Char(c) => self.query.push(c),
            Input::Backspace => {
                self.query.pop();
            }
            Input::Commit | Input::Select => self.editing = false,
            Input::Cancel | Input::Back => self.clear(),
            Input::Up | Input::Down => return None,
            _ => return Some(Outcome::Ignored),
        }
        Some(Outcome::Updated)
    }
}

/// The interactive session.
pub struct Session<S: StoreBackend> {
    repo: Repository<S>,
    view: View,

    // Selections, by id
    selected_person: Option<PersonId>,
    selected_relation: Option<RelationId>,
    target_person: Option<PersonId>,

    // Edit buffers
    person_draft: PersonDraft,
    relation_draft: RelationDraft,
    tag_query: String,
    people_filter: PeopleFilter,
    target_filter: PeopleFilter,

    // List cursors
    people_cursor: usize,
    relation_cursor: usize,
    target_cursor: usize,
    tag_cursor: usize,

    status: Option<String>,
}

impl<S: StoreBackend> Session<S> {
    /// Start a session on a loaded repository.
    pub fn new(repo: Repository<S>, report: &LoadReport) -> Self {
        let status = match report {
            LoadReport::Recovered { reason } => Some(format!(
                "Could not read saved data ({reason}); starting empty"
            )),
            LoadReport::Loaded { backfilled } if *backfilled > 0 && repo.is_dirty() => Some(
                "Repaired relation ids but could not save them".to_string(),
            ),
            _ => None,
        };

        Self {
            repo,
            view: View::ListPeople,
            selected_person: None,
            selected_relation: None,
            target_person: None,
            person_draft: PersonDraft::default(),
            relation_draft: RelationDraft::default(),
            tag_query: String::new(),
            people_filter: PeopleFilter::default(),
            target_filter: PeopleFilter::default(),
            people_cursor: 0,
            relation_cursor: 0,
            target_cursor: 0,
            tag_cursor: 0,
            status,
        }
    }

    /// Load `store` and start a session on it.
    pub fn open(store: S) -> Self {
        let (repo, report) = Repository::load(store);
        Self::new(repo, &report)
    }

    // ========================================================================
    // View model
    // ========================================================================

    pub fn view(&self) -> View {
        self.view
    }

    pub fn repository(&self) -> &Repository<S> {
        &self.repo
    }

    pub fn people(&self) -> &[Person] {
        self.repo.people()
    }

    /// The name filter of the list on screen: the target list while picking
    /// a relation target, otherwise the people list.
    pub fn people_filter(&self) -> &PeopleFilter {
        match self.view {
            View::RelationTargetSelect => &self.target_filter,
            _ => &self.people_filter,
        }
    }

    /// People passing [`Session::people_filter`]. List cursors index into this.
    pub fn visible_people(&self) -> Vec<&Person> {
        self.people_filter().apply(self.repo.people())
    }

    pub fn selected_person(&self) -> Option<&Person> {
        self.selected_person
            .as_ref()
            .and_then(|id| self.repo.person(id))
    }

    pub fn selected_relation(&self) -> Option<&Relation> {
        self.selected_relation
            .as_ref()
            .and_then(|id| self.repo.relation(id))
    }

    pub fn target_person(&self) -> Option<&Person> {
        self.target_person.as_ref().and_then(|id| self.repo.person(id))
    }

    /// Relations of the selected person, recomputed on every call.
    pub fn relations(&self) -> Vec<RelationEntry> {
        match &self.selected_person {
            Some(id) => self.repo.relations_for(id),
            None => Vec::new(),
        }
    }

    /// Name of the other party in the relation form.
    pub fn relation_counterpart_name(&self) -> String {
        let other = match self.view {
            View::RelationForm {
                mode: FormMode::Editing,
                ..
            } => match (self.selected_relation(), &self.selected_person) {
                (Some(rel), Some(me)) => self.repo.person_name(rel.other_end(me).0),
                _ => None,
            },
            _ => self.target_person().map(|p| p.name.as_str()),
        };
        other.unwrap_or(UNKNOWN_NAME).to_string()
    }

    pub fn person_draft(&self) -> &PersonDraft {
        &self.person_draft
    }

    pub fn relation_draft(&self) -> &RelationDraft {
        &self.relation_draft
    }

    pub fn tag_query(&self) -> &str {
        &self.tag_query
    }

    /// Known and pending tags matching the query, ascending.
    pub fn tag_candidates(&self) -> Vec<String> {
        let pool = tags::candidates(self.repo.people(), &self.person_draft.tags);
        tags::filter(&pool, &self.tag_query)
    }

    /// The highlighted tag in the tag view, if the list is not empty.
    pub fn highlighted_tag(&self) -> Option<String> {
        self.tag_candidates().into_iter().nth(self.tag_cursor)
    }

    pub fn people_cursor(&self) -> usize {
        self.people_cursor
    }

    pub fn relation_cursor(&self) -> usize {
        self.relation_cursor
    }

    pub fn target_cursor(&self) -> usize {
        self.target_cursor
    }

    pub fn tag_cursor(&self) -> usize {
        self.tag_cursor
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Whether some change has not reached the store.
    pub fn has_unsaved_changes(&self) -> bool {
        self.repo.is_dirty()
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Handle one input in the current view.
    pub fn handle(&mut self, input: Input) -> Outcome {
        if input == Input::Retry {
            return self.retry_save();
        }

        let outcome = match self.view {
            View::ListPeople => self.on_list_people(input),
            View::Detail => self.on_detail(input),
            View::PersonForm { mode, field } => self.on_person_form(mode, field, input),
            View::TagSelect { mode } => self.on_tag_select(mode, input),
            View::RelationTargetSelect => self.on_relation_target(input),
            View::RelationForm { mode, field } => self.on_relation_form(mode, field, input),
            View::ConfirmDeletePerson => self.on_confirm_delete_person(input),
            View::ConfirmDeleteRelation => self.on_confirm_delete_relation(input),
        };

        if outcome == Outcome::Updated {
            debug!(?input, view = ?self.view, "Handled input");
        }
        outcome
    }

    fn go(&mut self, view: View) -> Outcome {
        self.view = view;
        Outcome::Updated
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    fn report_persist(&mut self, result: Result<(), PersistError>) {
        match result {
            Ok(()) => self.status = None,
            Err(e) => {
                warn!("Change kept in memory only: {e}");
                self.set_status(format!("Save failed: {e}; changes kept in memory"));
            }
        }
    }

    fn retry_save(&mut self) -> Outcome {
        match self.repo.flush() {
            Ok(true) => self.set_status("Saved"),
            Ok(false) => self.set_status("Nothing to save"),
            Err(e) => self.set_status(format!("Save failed: {e}; changes kept in memory")),
        }
        Outcome::Updated
    }

    /// Keep every cursor inside its list after a mutation.
    fn clamp_cursors(&mut self) {
        let people = self.people_filter.apply(self.repo.people()).len();
        self.people_cursor = self.people_cursor.min(people.saturating_sub(1));
        let targets = self.target_filter.apply(self.repo.people()).len();
        self.target_cursor = self.target_cursor.min(targets.saturating_sub(1));
        let relations = self.relations().len();
        self.relation_cursor = self.relation_cursor.min(relations.saturating_sub(1));
        let tags = self.tag_candidates().len();
        self.tag_cursor = self.tag_cursor.min(tags.saturating_sub(1));
    }

    /// Leave for the people list when the selected person has vanished.
    fn require_selected_person(&mut self) -> Option<PersonId> {
        let id = self.selected_person().map(|p| p.id.clone());
        if id.is_none() {
            self.selected_person = None;
            self.selected_relation = None;
            self.view = View::ListPeople;
        }
        id
    }

    // ========================================================================
    // People list
    // ========================================================================

    fn on_list_people(&mut self, input: Input) -> Outcome {
        let query = self.people_filter.query.clone();
        if let Some(outcome) = self.people_filter.handle(input) {
            if self.people_filter.query != query {
                self.people_cursor = 0;
            }
            return outcome;
        }

        match input {
            Input::New => {
                self.person_draft = PersonDraft::default();
                self.go(View::PersonForm {
                    mode: FormMode::Creating,
                    field: PersonField::Name,
                })
            }
            Input::Select => {
                let Some(id) = self
                    .visible_people()
                    .get(self.people_cursor)
                    .map(|p| p.id.clone())
                else {
                    return Outcome::Ignored;
                };
                self.selected_person = Some(id);
                self.selected_relation = None;
                self.relation_cursor = 0;
                self.go(View::Detail)
            }
            Input::Up => step_up(&mut self.people_cursor),
            Input::Down => {
                let len = self.visible_people().len();
                step_down(&mut self.people_cursor, len)
            }
            _ => Outcome::Ignored,
        }
    }

    // ========================================================================
    // Detail
    // ========================================================================

    fn on_detail(&mut self, input: Input) -> Outcome {
        let Some(person_id) = self.require_selected_person() else {
            return Outcome::Updated;
        };

        match input {
            Input::Back => {
                self.selected_person = None;
                self.selected_relation = None;
                self.go(View::ListPeople)
            }
            Input::EditPerson => {
                self.seed_person_draft(&person_id);
                self.go(View::PersonForm {
                    mode: FormMode::Editing,
                    field: PersonField::Name,
                })
            }
            Input::ManageTags => {
                self.seed_person_draft(&person_id);
                self.open_tag_select(FormMode::Editing)
            }
            Input::DeletePerson => self.go(View::ConfirmDeletePerson),
            Input::NewRelation => {
                self.target_cursor = 0;
                self.target_filter.clear();
                self.target_person = None;
                self.go(View::RelationTargetSelect)
            }
            Input::EditRelation => {
                let Some(entry) = self.relations().into_iter().nth(self.relation_cursor) else {
                    return Outcome::Ignored;
                };
                self.relation_draft = RelationDraft::from_relation(&entry.relation);
                self.selected_relation = Some(entry.relation.id);
                self.go(View::RelationForm {
                    mode: FormMode::Editing,
                    field: RelationField::Strength,
                })
            }
            Input::DeleteRelation => {
                let Some(entry) = self.relations().into_iter().nth(self.relation_cursor) else {
                    return Outcome::Ignored;
                };
                self.selected_relation = Some(entry.relation.id);
                self.go(View::ConfirmDeleteRelation)
            }
            Input::Up => step_up(&mut self.relation_cursor),
            Input::Down => {
                let len = self.relations().len();
                step_down(&mut self.relation_cursor, len)
            }
            _ => Outcome::Ignored,
        }
    }

    fn seed_person_draft(&mut self, id: &PersonId) {
        if let Some(person) = self.repo.person(id) {
            self.person_draft = PersonDraft::from_person(person);
        }
    }

    fn open_tag_select(&mut self, mode: FormMode) -> Outcome {
        self.tag_query.clear();
        self.tag_cursor = 0;
        self.go(View::TagSelect { mode })
    }

    // ========================================================================
    // Person form
    // ========================================================================

    fn on_person_form(&mut self, mode: FormMode, field: PersonField, input: Input) -> Outcome {
        match input {
            Input::Cancel => {
                self.person_draft = PersonDraft::default();
                self.leave_person_form(mode)
            }
            Input::ManageTags => self.open_tag_select(mode),
            Input::ToggleFocus => {
                let field = match field {
                    PersonField::Name => PersonField::Notes,
                    PersonField::Notes => PersonField::Name,
                };
                self.go(View::PersonForm { mode, field })
            }
            Input::Commit => match field {
                PersonField::Name => self.go(View::PersonForm {
                    mode,
                    field: PersonField::Notes,
                }),
                PersonField::Notes => self.commit_person(mode),
            },
            Input::Char(c) => {
                match field {
                    PersonField::Name => self.person_draft.name.push(c),
                    PersonField::Notes => self.person_draft.notes.push(c),
                }
                Outcome::Updated
            }
            Input::Backspace => {
                match field {
                    PersonField::Name => self.person_draft.name.pop(),
                    PersonField::Notes => self.person_draft.notes.pop(),
                };
                Outcome::Updated
            }
            _ => Outcome::Ignored,
        }
    }

    fn commit_person(&mut self, mode: FormMode) -> Outcome {
        let draft = std::mem::take(&mut self.person_draft);
        match mode {
            FormMode::Creating => {
                let result = self.repo.create_person(draft.name, draft.notes, draft.tags);
                // The new person is appended; drop a filter that would hide them
                if let Some(last) = self.repo.people().last() {
                    if !tags::matches(&last.name, &self.people_filter.query) {
                        self.people_filter.clear();
                    }
                }
                self.people_cursor = self
                    .people_filter
                    .apply(self.repo.people())
                    .len()
                    .saturating_sub(1);
                self.report_persist(result.map(|_| ()));
            }
            FormMode::Editing => {
                let Some(id) = self.selected_person.clone() else {
                    return self.go(View::ListPeople);
                };
                let result = self
                    .repo
                    .update_person(&id, draft.name, draft.notes, draft.tags);
                self.report_persist(result.map(|_| ()));
            }
        }
        self.clamp_cursors();
        self.leave_person_form(mode)
    }

    fn leave_person_form(&mut self, mode: FormMode) -> Outcome {
        match mode {
            FormMode::Editing if self.selected_person().is_some() => self.go(View::Detail),
            _ => self.go(View::ListPeople),
        }
    }

    // ========================================================================
    // Tag selection
    // ========================================================================

    fn on_tag_select(&mut self, mode: FormMode, input: Input) -> Outcome {
        let back = View::PersonForm {
            mode,
            field: PersonField::Name,
        };

        match input {
            Input::Cancel => self.go(back),
            Input::Commit => {
                // A highlighted entry wins over the typed text
                let chosen = self
                    .highlighted_tag()
                    .unwrap_or_else(|| self.tag_query.trim().to_string());
                tags::add_tag(&mut self.person_draft.tags, &chosen);
                self.tag_query.clear();
                self.go(back)
            }
            Input::RemoveTag => {
                let Some(tag) = self.highlighted_tag() else {
                    return Outcome::Ignored;
                };
                if !tags::remove_tag(&mut self.person_draft.tags, &tag) {
                    return Outcome::Ignored;
                }
                self.clamp_cursors();
                Outcome::Updated
            }
            Input::Up => step_up(&mut self.tag_cursor),
            Input::Down => {
                let len = self.tag_candidates().len();
                step_down(&mut self.tag_cursor, len)
            }
            Input::Char(c) => {
                self.tag_query.push(c);
                self.tag_cursor = 0;
                Outcome::Updated
            }
            Input::Backspace => {
                self.tag_query.pop();
                self.tag_cursor = 0;
                Outcome::Updated
            }
            _ => Outcome::Ignored,
        }
    }

    // ========================================================================
    // Relations
    // ========================================================================

    fn on_relation_target(&mut self, input: Input) -> Outcome {
        let Some(me) = self.require_selected_person() else {
            return Outcome::Updated;
        };

        let query = self.target_filter.query.clone();
        if let Some(outcome) = self.target_filter.handle(input) {
            if self.target_filter.query != query {
                self.target_cursor = 0;
            }
            return outcome;
        }

        match input {
            Input::Cancel => {
                self.status = None;
                self.go(View::Detail)
            }
            Input::Select => {
                let Some(target) = self
                    .visible_people()
                    .get(self.target_cursor)
                    .map(|p| p.id.clone())
                else {
                    return Outcome::Ignored;
                };
                if target == me {
                    self.set_status("A person cannot be connected to themselves");
                    return Outcome::Updated;
                }
                self.target_person = Some(target);
                self.target_filter.clear();
                self.relation_draft = RelationDraft::default();
                self.status = None;
                self.go(View::RelationForm {
                    mode: FormMode::Creating,
                    field: RelationField::Strength,
                })
            }
            Input::Up => step_up(&mut self.target_cursor),
            Input::Down => {
                let len = self.visible_people().len();
                step_down(&mut self.target_cursor, len)
            }
            _ => Outcome::Ignored,
        }
    }

    fn on_relation_form(&mut self, mode: FormMode, field: RelationField, input: Input) -> Outcome {
        match input {
            Input::Cancel => {
                self.relation_draft = RelationDraft::default();
                self.go(View::Detail)
            }
            Input::ToggleFocus => {
                let field = match field {
                    RelationField::Strength => RelationField::Description,
                    RelationField::Description => RelationField::Strength,
                };
                self.go(View::RelationForm { mode, field })
            }
            Input::Commit => match field {
                RelationField::Strength => self.go(View::RelationForm {
                    mode,
                    field: RelationField::Description,
                }),
                RelationField::Description => self.commit_relation(mode),
            },
            Input::Char(c) => match field {
                RelationField::Strength => {
                    let accepted = c.is_ascii_digit()
                        || (c == '-' && self.relation_draft.strength.is_empty());
                    if !accepted || self.relation_draft.strength.chars().count() >= STRENGTH_MAX_CHARS
                    {
                        return Outcome::Ignored;
                    }
                    self.relation_draft.strength.push(c);
                    Outcome::Updated
                }
                RelationField::Description => {
                    self.relation_draft.description.push(c);
                    Outcome::Updated
                }
            },
            Input::Backspace => {
                match field {
                    RelationField::Strength => self.relation_draft.strength.pop(),
                    RelationField::Description => self.relation_draft.description.pop(),
                };
                Outcome::Updated
            }
            _ => Outcome::Ignored,
        }
    }

    fn commit_relation(&mut self, mode: FormMode) -> Outcome {
        let draft = std::mem::take(&mut self.relation_draft);
        let strength = draft.parsed_strength();

        let result = match mode {
            FormMode::Creating => match (self.selected_person.clone(), self.target_person.take()) {
                (Some(from), Some(to)) => {
                    let result = self
                        .repo
                        .create_relation(&from, &to, strength, draft.description);
                    // The new relation is listed last
                    self.relation_cursor = self.relations().len().saturating_sub(1);
                    result.map(|_| ())
                }
                _ => Ok(()),
            },
            FormMode::Editing => match self.selected_relation.clone() {
                Some(id) => self
                    .repo
                    .update_relation(&id, strength, draft.description)
                    .map(|_| ()),
                None => Ok(()),
            },
        };

        self.report_persist(result);
        self.clamp_cursors();
        self.go(View::Detail)
    }

    // ========================================================================
    // Confirmations
    // ========================================================================

    fn on_confirm_delete_person(&mut self, input: Input) -> Outcome {
        match input {
            Input::Yes => {
                if let Some(id) = self.selected_person.take() {
                    let result = self.repo.delete_person(&id).map(|_| ());
                    self.report_persist(result);
                }
                self.selected_relation = None;
                self.clamp_cursors();
                self.go(View::ListPeople)
            }
            Input::No | Input::Cancel => self.go(View::Detail),
            _ => Outcome::Ignored,
        }
    }

    fn on_confirm_delete_relation(&mut self, input: Input) -> Outcome {
        match input {
            Input::Yes => {
                if let Some(id) = self.selected_relation.take() {
                    let result = self.repo.delete_relation(&id).map(|_| ());
                    self.report_persist(result);
                }
                self.clamp_cursors();
                self.go(View::Detail)
            }
            Input::No | Input::Cancel => self.go(View::Detail),
            _ => Outcome::Ignored,
        }
    }
}

fn step_up(cursor: &mut usize) -> Outcome {
    if *cursor == 0 {
        return Outcome::Ignored;
    }
    *cursor -= 1;
    Outcome::Updated
}

fn step_down(cursor: &mut usize, len: usize) -> Outcome {
    if *cursor + 1 >= len {
        return Outcome::Ignored;
    }
    *cursor += 1;
    Outcome::Updated
}
