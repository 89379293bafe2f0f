//! Color theme and styling for the ties TUI

use ratatui::style::{Color, Modifier, Style};
use ties_core::model::{MAX_STRENGTH, MIN_STRENGTH};

/// UI color theme, handed to every widget that draws.
#[derive(Debug, Clone)]
pub struct Theme {
    // Base colors
    pub foreground: Color,
    pub border: Color,
    pub border_focused: Color,

    // Text colors
    pub title: Color,
    pub info: Color,
    pub warning: Color,
    pub tag: Color,
    pub highlight_bg: Color,

    /// Relation strength colors, weakest first
    pub strength: [Color; 5],
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            foreground: Color::White,
            border: Color::DarkGray,
            border_focused: Color::Cyan,

            title: Color::Magenta,
            info: Color::Gray,
            warning: Color::Red,
            tag: Color::LightBlue,
            highlight_bg: Color::Blue,

            strength: [
                Color::White,
                Color::Blue,
                Color::Green,
                Color::Yellow,
                Color::Red,
            ],
        }
    }
}

impl Theme {
    /// Get style for normal text
    pub fn text_style(&self) -> Style {
        Style::default().fg(self.foreground)
    }

    /// Get style for headings and names
    pub fn title_style(&self) -> Style {
        Style::default().fg(self.title).add_modifier(Modifier::BOLD)
    }

    /// Get style for secondary text and hints
    pub fn info_style(&self) -> Style {
        Style::default().fg(self.info)
    }

    pub fn warning_style(&self) -> Style {
        Style::default()
            .fg(self.warning)
            .add_modifier(Modifier::BOLD)
    }

    pub fn tag_style(&self) -> Style {
        Style::default().fg(self.tag)
    }

    /// Get style for the highlighted list entry
    pub fn highlight_style(&self) -> Style {
        Style::default().bg(self.highlight_bg).fg(self.foreground)
    }

    /// Get border style
    pub fn border_style(&self, focused: bool) -> Style {
        Style::default().fg(if focused {
            self.border_focused
        } else {
            self.border
        })
    }

    /// Get marker color for a relation strength
    pub fn strength_color(&self, strength: i32) -> Color {
        let index = strength.clamp(MIN_STRENGTH, MAX_STRENGTH) - MIN_STRENGTH;
        self.strength[index as usize]
    }

    pub fn strength_style(&self, strength: i32) -> Style {
        Style::default().fg(self.strength_color(strength))
    }
}
