//! Event handling for the ties TUI

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use ties_core::{Input, Outcome, StoreBackend, View};

use crate::app::App;

/// Result of handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
    NeedsRedraw,
}

/// Handle a terminal event
pub fn handle_event<S: StoreBackend>(app: &mut App<S>, event: Event) -> EventResult {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key_event(app, key),
        Event::Resize(_, _) => EventResult::NeedsRedraw,
        _ => EventResult::Continue,
    }
}

/// Handle a key event
fn handle_key_event<S: StoreBackend>(app: &mut App<S>, key: KeyEvent) -> EventResult {
    let view = app.session.view();
    let filtering = app.session.people_filter().editing;
    if is_quit(view, filtering, key) {
        return EventResult::Quit;
    }

    let input = if filtering {
        filter_key(key)
    } else {
        key_to_input(view, key)
    };
    match input {
        Some(input) => match app.session.handle(input) {
            Outcome::Updated => EventResult::NeedsRedraw,
            Outcome::Ignored => EventResult::Continue,
        },
        None => EventResult::Continue,
    }
}

fn ctrl(key: KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Ctrl+C anywhere, `q` only where no text is being typed.
fn is_quit(view: View, filtering: bool, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('c') if ctrl(key) => true,
        KeyCode::Char('q') if !ctrl(key) => view == View::ListPeople && !filtering,
        _ => false,
    }
}

/// Translate a key into a session input for the current view
pub fn key_to_input(view: View, key: KeyEvent) -> Option<Input> {
    // Global shortcuts
    if let (KeyCode::Char('s'), true) = (key.code, ctrl(key)) {
        return Some(Input::Retry);
    }

    match view {
        View::ListPeople => list_people_key(key),
        View::Detail => detail_key(key),
        View::PersonForm { .. } => person_form_key(key),
        View::TagSelect { .. } => tag_select_key(key),
        View::RelationTargetSelect => target_select_key(key),
        View::RelationForm { .. } => relation_form_key(key),
        View::ConfirmDeletePerson | View::ConfirmDeleteRelation => confirm_key(key),
    }
}

/// Keys while a people filter is being typed
pub fn filter_key(key: KeyEvent) -> Option<Input> {
    match key.code {
        KeyCode::Char('s') if ctrl(key) => Some(Input::Retry),
        KeyCode::Esc => Some(Input::Cancel),
        KeyCode::Enter => Some(Input::Commit),
        KeyCode::Up => Some(Input::Up),
        KeyCode::Down => Some(Input::Down),
        _ => text_entry(key),
    }
}

fn navigation(key: KeyEvent) -> Option<Input> {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Input::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Input::Down),
        _ => None,
    }
}

/// Typed characters, minus anything chorded with Ctrl or Alt
fn text_entry(key: KeyEvent) -> Option<Input> {
    match key.code {
        KeyCode::Backspace => Some(Input::Backspace),
        KeyCode::Char(c) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
            Some(Input::Char(c))
        }
        _ => None,
    }
}

fn list_people_key(key: KeyEvent) -> Option<Input> {
    match key.code {
        KeyCode::Char('n') => Some(Input::New),
        KeyCode::Char('/') => Some(Input::Filter),
        KeyCode::Esc => Some(Input::Cancel),
        KeyCode::Enter => Some(Input::Select),
        _ => navigation(key),
    }
}

fn detail_key(key: KeyEvent) -> Option<Input> {
    match key.code {
        KeyCode::Esc | KeyCode::Backspace => Some(Input::Back),
        KeyCode::Char('g') if ctrl(key) => Some(Input::ManageTags),
        KeyCode::Char('E') => Some(Input::EditPerson),
        KeyCode::Char('D') => Some(Input::DeletePerson),
        KeyCode::Char('n') => Some(Input::NewRelation),
        KeyCode::Char('e') => Some(Input::EditRelation),
        KeyCode::Char('d') => Some(Input::DeleteRelation),
        _ => navigation(key),
    }
}

fn person_form_key(key: KeyEvent) -> Option<Input> {
    match key.code {
        KeyCode::Esc => Some(Input::Cancel),
        KeyCode::Tab | KeyCode::BackTab => Some(Input::ToggleFocus),
        KeyCode::Enter => Some(Input::Commit),
        KeyCode::Char('g') if ctrl(key) => Some(Input::ManageTags),
        _ => text_entry(key),
    }
}

fn tag_select_key(key: KeyEvent) -> Option<Input> {
    match key.code {
        KeyCode::Esc => Some(Input::Cancel),
        KeyCode::Enter => Some(Input::Commit),
        KeyCode::Up => Some(Input::Up),
        KeyCode::Down => Some(Input::Down),
        KeyCode::Char('d') if ctrl(key) => Some(Input::RemoveTag),
        _ => text_entry(key),
    }
}

fn target_select_key(key: KeyEvent) -> Option<Input> {
    match key.code {
        KeyCode::Esc => Some(Input::Cancel),
        KeyCode::Char('/') => Some(Input::Filter),
        KeyCode::Enter => Some(Input::Select),
        _ => navigation(key),
    }
}

fn relation_form_key(key: KeyEvent) -> Option<Input> {
    match key.code {
        KeyCode::Esc => Some(Input::Cancel),
        KeyCode::Tab | KeyCode::BackTab => Some(Input::ToggleFocus),
        KeyCode::Enter => Some(Input::Commit),
        _ => text_entry(key),
    }
}

fn confirm_key(key: KeyEvent) -> Option<Input> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => Some(Input::Yes),
        KeyCode::Char('n') | KeyCode::Char('N') => Some(Input::No),
        KeyCode::Esc => Some(Input::Cancel),
        _ => None,
    }
}
