//! AppState: shared read-only data passed to all components during render/event.
//!
//! The App event-loop is the only thing that writes to AppState.

use std::sync::Arc;

use bookrec_core::catalog::OptionCatalog;
use bookrec_core::selection::Field;
use bookrec_core::session::Session;

use crate::widgets::status_bar::InputMode;

pub struct AppState {
    /// Latest session snapshot from the state manager.
    pub session: Session,
    pub catalog: Arc<OptionCatalog>,
    pub input_mode: InputMode,
}

impl AppState {
    pub fn new(session: Session, catalog: Arc<OptionCatalog>) -> Self {
        Self {
            session,
            catalog,
            input_mode: InputMode::Normal,
        }
    }

    pub fn loading(&self) -> bool {
        self.session.loading()
    }

    /// Options the picker offers for `field`. Moods depend on the current
    /// genre; with no genre chosen there are none.
    pub fn options_for(&self, field: Field) -> &[String] {
        match field {
            Field::Genre => self.catalog.genres(),
            Field::Mood => self
                .catalog
                .available_moods(&self.session.selection().genre),
            Field::Level => self.catalog.levels(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mood_options_follow_genre() {
        let catalog = Arc::new(OptionCatalog::builtin().unwrap());
        let mut session = Session::new();
        let mut state = AppState::new(session.clone(), Arc::clone(&catalog));
        assert!(state.options_for(Field::Mood).is_empty());
        assert_eq!(state.options_for(Field::Genre), catalog.genres());

        session.select(Field::Genre, Some("Fantasy".into()));
        state.session = session;
        assert!(state
            .options_for(Field::Mood)
            .iter()
            .any(|m| m == "Adventurous"));
        assert_eq!(state.options_for(Field::Level).len(), 3);
    }
}
