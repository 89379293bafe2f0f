//! TUI widgets for ties

pub mod input;
pub mod relation_list;

pub use input::InputWidget;
pub use relation_list::RelationListWidget;
