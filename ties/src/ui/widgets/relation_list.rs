//! Relation list for the detail view

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, StatefulWidget, Widget},
};

use ties_core::model::{RelationEntry, MAX_STRENGTH};

use crate::ui::theme::Theme;

/// Marker drawn in the strength color
const STRENGTH_MARKER: &str = "●";

/// Relations of one person, with direction and strength
pub struct RelationListWidget<'a> {
    entries: &'a [RelationEntry],
    selected: usize,
    theme: &'a Theme,
}

impl<'a> RelationListWidget<'a> {
    pub fn new(entries: &'a [RelationEntry], theme: &'a Theme) -> Self {
        Self {
            entries,
            selected: 0,
            theme,
        }
    }

    pub fn selected(mut self, index: usize) -> Self {
        self.selected = index;
        self
    }

    fn item(&self, entry: &'a RelationEntry) -> ListItem<'a> {
        let strength = entry.relation.strength;
        let title = Line::from(vec![
            Span::styled(STRENGTH_MARKER, self.theme.strength_style(strength)),
            Span::raw(format!(
                " {} {} ({strength}/{MAX_STRENGTH})",
                entry.direction.arrow(),
                entry.other_name
            )),
        ]);

        let mut lines = vec![title];
        if !entry.relation.description.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("    {}", entry.relation.description),
                self.theme.info_style(),
            )));
        }
        ListItem::new(lines)
    }
}

impl Widget for RelationListWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Connections ")
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(true));

        if self.entries.is_empty() {
            Paragraph::new(Span::styled(
                "(No connections yet - press n to add one)",
                self.theme.info_style(),
            ))
            .block(block)
            .render(area, buf);
            return;
        }

        let items: Vec<ListItem> = self.entries.iter().map(|e| self.item(e)).collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(self.theme.highlight_style())
            .highlight_symbol("> ");

        let mut state = ListState::default().with_selected(Some(self.selected));
        StatefulWidget::render(list, area, buf, &mut state);
    }
}
