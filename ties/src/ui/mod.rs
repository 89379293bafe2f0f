//! UI module for the ties TUI

pub mod render;
pub mod theme;
pub mod widgets;
