//! Render orchestration for the ties TUI

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use ties_core::session::{FormMode, PersonField, RelationField};
use ties_core::{Person, StoreBackend, View};

use crate::app::App;
use crate::ui::theme::Theme;
use crate::ui::widgets::{InputWidget, RelationListWidget};

/// Main render function
pub fn render<S: StoreBackend>(frame: &mut Frame, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);

    let body = chunks[1];
    match app.session.view() {
        View::ListPeople => render_people(frame, app, body, " People "),
        View::RelationTargetSelect => {
            let title = match app.session.selected_person() {
                Some(p) => format!(" Connect {} with... ", p.name),
                None => " Connect with... ".to_string(),
            };
            render_people(frame, app, body, &title)
        }
        View::Detail => render_detail(frame, app, body),
        View::PersonForm { mode, field } => render_person_form(frame, app, body, mode, field),
        View::TagSelect { .. } => render_tag_select(frame, app, body),
        View::RelationForm { field, .. } => render_relation_form(frame, app, body, field),
        View::ConfirmDeletePerson => {
            render_detail(frame, app, body);
            render_confirm(
                frame,
                &app.theme,
                body,
                "WARNING",
                "Do you really want to delete this person?",
            );
        }
        View::ConfirmDeleteRelation => {
            render_detail(frame, app, body);
            render_confirm(
                frame,
                &app.theme,
                body,
                "DELETE CONNECTION",
                "Do you really want to delete this connection?",
            );
        }
    }

    render_status_bar(frame, app, chunks[2]);
    render_hotkey_bar(frame, app, chunks[3]);
}

/// Render the title bar
fn render_title_bar<S: StoreBackend>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let mut spans = vec![
        Span::styled(" Ties ", app.theme.title_style()),
        Span::styled(format!("| {} ", app.store_label), app.theme.info_style()),
    ];
    if app.session.has_unsaved_changes() {
        spans.push(Span::styled("[unsaved]", app.theme.warning_style()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the status line
fn render_status_bar<S: StoreBackend>(frame: &mut Frame, app: &App<S>, area: Rect) {
    if let Some(message) = app.session.status() {
        let line = Line::from(Span::styled(format!(" {message}"), app.theme.warning_style()));
        frame.render_widget(Paragraph::new(line), area);
    }
}

/// Render the hotkey bar
fn render_hotkey_bar<S: StoreBackend>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let view = app.session.view();
    let filtering = matches!(view, View::ListPeople | View::RelationTargetSelect)
        && app.session.people_filter().editing;
    let hints = match view {
        _ if filtering => "Enter: Apply Filter | Up/Down: Move | Esc: Clear Filter",
        View::ListPeople => "n: New Person | Enter: Open | /: Filter | j/k: Move | q: Quit",
        View::Detail => {
            "E: Edit Person | D: Delete Person | Ctrl+g: Tags | n: New Rel | e: Edit Rel | d: Del Rel | Esc: Back"
        }
        View::PersonForm { .. } => {
            "Enter on Notes to Save | Tab: Switch Field | Ctrl+g: Manage Tags | Esc: Cancel"
        }
        View::TagSelect { .. } => "Enter: Add Tag | Ctrl+d: Remove Tag | Esc: Back",
        View::RelationTargetSelect => "Enter: Choose | /: Filter | j/k: Move | Esc: Cancel",
        View::RelationForm { .. } => "Enter on Description to Save | Tab: Switch Field | Esc: Cancel",
        View::ConfirmDeletePerson | View::ConfirmDeleteRelation => "y: Yes | n: No",
    };
    let line = Line::from(Span::styled(
        format!(" {hints} | Ctrl+s: Retry Save"),
        app.theme.info_style(),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

fn person_item<'a>(person: &'a Person, theme: &Theme) -> ListItem<'a> {
    let notes = person.notes.lines().next().unwrap_or_default();
    ListItem::new(vec![
        Line::from(Span::styled(person.name.as_str(), theme.text_style())),
        Line::from(Span::styled(format!("  {notes}"), theme.info_style())),
    ])
}

/// Render the people list, also used to pick a relation target
fn render_people<S: StoreBackend>(frame: &mut Frame, app: &App<S>, area: Rect, title: &str) {
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));

    if app.session.people().is_empty() {
        let hint = Paragraph::new(Span::styled(
            "(Nobody here yet - press n to add a person)",
            app.theme.info_style(),
        ))
        .block(block);
        frame.render_widget(hint, area);
        return;
    }

    let filter = app.session.people_filter();
    let area = if filter.is_active() {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(1)])
            .split(area);
        let query = InputWidget::new("Filter", &filter.query, &app.theme)
            .placeholder("Type a name...")
            .active(filter.editing);
        frame.render_widget(query, chunks[0]);
        chunks[1]
    } else {
        area
    };

    let people = app.session.visible_people();
    if people.is_empty() {
        let hint = Paragraph::new(Span::styled("(No matches)", app.theme.info_style())).block(block);
        frame.render_widget(hint, area);
        return;
    }

    let cursor = match app.session.view() {
        View::RelationTargetSelect => app.session.target_cursor(),
        _ => app.session.people_cursor(),
    };

    let items: Vec<ListItem> = people.into_iter().map(|p| person_item(p, &app.theme)).collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(app.theme.highlight_style())
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(Some(cursor));
    frame.render_stateful_widget(list, area, &mut state);
}

fn tag_line<'a>(tags: &'a [String], theme: &Theme, empty_hint: &'a str) -> Line<'a> {
    if tags.is_empty() {
        return Line::from(Span::styled(empty_hint, theme.info_style()));
    }
    let spans: Vec<Span> = tags
        .iter()
        .map(|t| Span::styled(format!("#{t} "), theme.tag_style()))
        .collect();
    Line::from(spans)
}

/// Render the detail view of the selected person
fn render_detail<S: StoreBackend>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let Some(person) = app.session.selected_person() else {
        frame.render_widget(Paragraph::new("No person selected."), area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(3)])
        .split(area);

    let mut lines = vec![Line::from(Span::styled(
        person.name.as_str(),
        app.theme.title_style(),
    ))];
    lines.extend(
        person
            .notes
            .lines()
            .map(|l| Line::from(Span::styled(l, app.theme.info_style()))),
    );
    lines.push(tag_line(&person.tags, &app.theme, ""));

    let header = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).border_style(app.theme.border_style(false)))
        .wrap(Wrap { trim: false });
    frame.render_widget(header, chunks[0]);

    let relations = app.session.relations();
    let list = RelationListWidget::new(&relations, &app.theme).selected(app.session.relation_cursor());
    frame.render_widget(list, chunks[1]);
}

/// Render the person form
fn render_person_form<S: StoreBackend>(
    frame: &mut Frame,
    app: &App<S>,
    area: Rect,
    mode: FormMode,
    field: PersonField,
) {
    let title = match mode {
        FormMode::Creating => " Create New Person ",
        FormMode::Editing => " Edit Person ",
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let draft = app.session.person_draft();
    let name = InputWidget::new("Name", &draft.name, &app.theme)
        .placeholder("Name")
        .active(field == PersonField::Name);
    frame.render_widget(name, chunks[0]);

    let notes = InputWidget::new("Notes", &draft.notes, &app.theme)
        .placeholder("Notes")
        .active(field == PersonField::Notes);
    frame.render_widget(notes, chunks[1]);

    let tags = tag_line(&draft.tags, &app.theme, "(No tags - Press Ctrl+g to add)");
    frame.render_widget(Paragraph::new(tags), chunks[2]);
}

/// Render tag selection
fn render_tag_select<S: StoreBackend>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let block = Block::default()
        .title(" Manage Tags ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let query = InputWidget::new("Tag", app.session.tag_query(), &app.theme)
        .placeholder("Type to filter or create...")
        .active(true);
    frame.render_widget(query, chunks[0]);

    let pending = &app.session.person_draft().tags;
    frame.render_widget(
        Paragraph::new(tag_line(pending, &app.theme, "(No tags yet)")),
        chunks[1],
    );

    let candidates = app.session.tag_candidates();
    if candidates.is_empty() {
        let hint = Paragraph::new(Span::styled(
            "(No existing tags found - Type to create new)",
            app.theme.info_style(),
        ));
        frame.render_widget(hint, chunks[2]);
        return;
    }

    let items: Vec<ListItem> = candidates
        .iter()
        .map(|tag| {
            let mark = if pending.contains(tag) { "[x] " } else { "[ ] " };
            ListItem::new(Line::from(vec![
                Span::styled(mark, app.theme.info_style()),
                Span::styled(tag.as_str(), app.theme.tag_style()),
            ]))
        })
        .collect();
    let list = List::new(items)
        .highlight_style(app.theme.highlight_style())
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(Some(app.session.tag_cursor()));
    frame.render_stateful_widget(list, chunks[2], &mut state);
}

/// Render the relation form
fn render_relation_form<S: StoreBackend>(
    frame: &mut Frame,
    app: &App<S>,
    area: Rect,
    field: RelationField,
) {
    let block = Block::default()
        .title(format!(" Connection with {} ", app.session.relation_counterpart_name()))
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3), Constraint::Min(0)])
        .split(inner);

    let draft = app.session.relation_draft();
    let strength = InputWidget::new("Strength (1-5)", &draft.strength, &app.theme)
        .placeholder("3")
        .active(field == RelationField::Strength);
    frame.render_widget(strength, chunks[0]);

    let description = InputWidget::new("Description", &draft.description, &app.theme)
        .placeholder("How do they know each other?")
        .active(field == RelationField::Description);
    frame.render_widget(description, chunks[1]);
}

/// Render a yes/no confirmation popup
fn render_confirm(frame: &mut Frame, theme: &Theme, area: Rect, heading: &str, question: &str) {
    let popup = centered_rect(50, 7, area);
    frame.render_widget(Clear, popup);

    let text = vec![
        Line::from(Span::styled(heading.to_string(), theme.warning_style())),
        Line::from(""),
        Line::from(question.to_string()),
        Line::from(""),
        Line::from(Span::styled("(y/n)", theme.info_style())),
    ];
    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.warning)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, popup);
}

/// A rect of at most `width` x `height` centered in `area`
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use ties_core::{Input, MemoryStore, Session};

    fn screen(app: &App<MemoryStore>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).expect("terminal");
        terminal.draw(|f| render(f, app)).expect("draw");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn type_text(app: &mut App<MemoryStore>, text: &str) {
        for c in text.chars() {
            app.session.handle(Input::Char(c));
        }
    }

    fn app_with_pair() -> App<MemoryStore> {
        let mut app = App::new(Session::open(MemoryStore::new()));
        for name in ["Alice", "Bob"] {
            app.session.handle(Input::New);
            type_text(&mut app, name);
            app.session.handle(Input::Commit);
            app.session.handle(Input::Commit);
        }
        app
    }

    #[test]
    fn test_empty_list_shows_hint() {
        let app = App::new(Session::open(MemoryStore::new()));
        assert!(screen(&app).contains("Nobody here yet"));
    }

    #[test]
    fn test_detail_lists_relations() {
        let mut app = app_with_pair();
        app.session.handle(Input::Up);
        app.session.handle(Input::Select);
        app.session.handle(Input::NewRelation);
        app.session.handle(Input::Down);
        app.session.handle(Input::Select);
        type_text(&mut app, "4");
        app.session.handle(Input::Commit);
        type_text(&mut app, "colleague");
        app.session.handle(Input::Commit);

        let text = screen(&app);
        assert!(text.contains("Alice"));
        assert!(text.contains("-> Bob (4/5)"));
        assert!(text.contains("colleague"));
    }

    #[test]
    fn test_filter_query_and_matches_shown() {
        let mut app = app_with_pair();
        app.session.handle(Input::Filter);
        type_text(&mut app, "bo");

        let text = screen(&app);
        assert!(text.contains("Filter"));
        assert!(text.contains("Bob"));
        assert!(!text.contains("Alice"));
        assert!(text.contains("Esc: Clear Filter"));

        type_text(&mut app, "x");
        assert!(screen(&app).contains("(No matches)"));
    }

    #[test]
    fn test_confirm_popup() {
        let mut app = app_with_pair();
        app.session.handle(Input::Select);
        app.session.handle(Input::DeletePerson);
        assert!(screen(&app).contains("Do you really want to delete this person?"));
    }

    #[test]
    fn test_unsaved_marker() {
        let store = MemoryStore::new();
        let mut app = App::new(Session::open(store.clone()));
        store.set_fail_writes(true);
        app.session.handle(Input::New);
        type_text(&mut app, "Alice");
        app.session.handle(Input::Commit);
        app.session.handle(Input::Commit);
        assert!(screen(&app).contains("[unsaved]"));
    }

    #[test]
    fn test_centered_rect_fits_small_area() {
        let area = Rect::new(0, 0, 20, 4);
        let rect = centered_rect(50, 7, area);
        assert_eq!(rect, Rect::new(0, 0, 20, 4));
    }
}
