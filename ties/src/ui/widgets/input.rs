//! Labelled text field widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::ui::theme::Theme;

/// Single text field with a bordered label
pub struct InputWidget<'a> {
    label: &'a str,
    content: &'a str,
    theme: &'a Theme,
    placeholder: &'a str,
    is_active: bool,
}

impl<'a> InputWidget<'a> {
    pub fn new(label: &'a str, content: &'a str, theme: &'a Theme) -> Self {
        Self {
            label,
            content,
            theme,
            placeholder: "",
            is_active: false,
        }
    }

    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }
}

impl Widget for InputWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(format!(" {} ", self.label))
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.is_active));

        let inner = block.inner(area);
        block.render(area, buf);

        let mut spans = Vec::new();
        if self.content.is_empty() && !self.placeholder.is_empty() {
            spans.push(Span::styled(
                self.placeholder,
                Style::default().add_modifier(Modifier::DIM),
            ));
        } else {
            spans.push(Span::styled(self.content, self.theme.text_style()));
        }

        // Block cursor at the end of the active field
        if self.is_active {
            spans.push(Span::styled(
                " ",
                Style::default().add_modifier(Modifier::REVERSED),
            ));
        }

        Paragraph::new(Line::from(spans))
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}
