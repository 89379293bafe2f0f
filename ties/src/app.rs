//! Main application state

use ties_core::{Session, StoreBackend};

use crate::ui::theme::Theme;

/// Main application state
pub struct App<S: StoreBackend> {
    pub session: Session<S>,
    pub theme: Theme,
    /// Shown in the title bar
    pub store_label: String,
}

impl<S: StoreBackend> App<S> {
    pub fn new(session: Session<S>) -> Self {
        Self::with_theme(session, Theme::default())
    }

    pub fn with_theme(session: Session<S>, theme: Theme) -> Self {
        let store_label = session.repository().store().describe();
        Self {
            session,
            theme,
            store_label,
        }
    }
}
