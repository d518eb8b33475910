//! SubmitButton: sends the current selection off for recommendations.

use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_muted, C_LOADING, C_PRIMARY, C_READY},
    widgets::{pane_chrome::pane_chrome, toast::spinner_frame},
};

pub const IDLE_LABEL: &str = "Get Recommendations";
pub const LOADING_LABEL: &str = "Searching for books...";

pub struct SubmitButton {
    number_key: char,
    frame: usize,
}

impl SubmitButton {
    pub fn new(number_key: char) -> Self {
        Self {
            number_key,
            frame: 0,
        }
    }

    pub fn label(state: &AppState) -> &'static str {
        if state.loading() {
            LOADING_LABEL
        } else {
            IDLE_LABEL
        }
    }
}

impl Component for SubmitButton {
    fn id(&self) -> ComponentId {
        ComponentId::SubmitButton
    }

    // Pressing while loading still submits; the session turns it away.
    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => vec![Action::Submit],
            KeyCode::Down | KeyCode::Char('j') => vec![Action::FocusNext],
            KeyCode::Up | KeyCode::Char('k') => vec![Action::FocusPrev],
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, _state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => vec![Action::Submit],
            _ => vec![],
        }
    }

    fn tick(&mut self, state: &AppState) -> Vec<Action> {
        if state.loading() {
            self.frame = self.frame.wrapping_add(1);
        } else {
            self.frame = 0;
        }
        vec![]
    }

    fn on_action(&mut self, _action: &Action, _state: &AppState) -> Vec<Action> {
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let block = pane_chrome("Submit", Some(self.number_key), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let selection = state.session.selection();
        let line = if state.loading() {
            Line::from(vec![
                Span::styled(
                    format!("{} ", spinner_frame(self.frame)),
                    Style::default().fg(C_LOADING),
                ),
                Span::styled(
                    Self::label(state),
                    Style::default().fg(C_LOADING).add_modifier(Modifier::BOLD),
                ),
            ])
        } else if selection.is_complete() {
            let style = if focused {
                Style::default()
                    .fg(C_READY)
                    .add_modifier(Modifier::BOLD | Modifier::REVERSED)
            } else {
                Style::default().fg(C_READY).add_modifier(Modifier::BOLD)
            };
            Line::from(Span::styled(format!(" {} ", IDLE_LABEL), style))
        } else {
            let missing: Vec<&str> = selection.missing().iter().map(|f| f.as_str()).collect();
            Line::from(vec![
                Span::styled(
                    format!(" {} ", IDLE_LABEL),
                    Style::default().fg(C_PRIMARY),
                ),
                Span::styled(format!("  (missing: {})", missing.join(", ")), style_muted()),
            ])
        };
        frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookrec_core::catalog::OptionCatalog;
    use bookrec_core::selection::Field;
    use bookrec_core::session::Session;
    use ratatui::crossterm::event::KeyModifiers;
    use std::sync::Arc;

    fn state(loading: bool) -> AppState {
        let mut session = Session::new();
        session.select(Field::Genre, Some("Fantasy".into()));
        session.select(Field::Mood, Some("Epic".into()));
        session.select(Field::Level, Some("Expert".into()));
        if loading {
            session.begin_submit().unwrap();
        }
        AppState::new(session, Arc::new(OptionCatalog::builtin().unwrap()))
    }

    #[test]
    fn test_label_tracks_loading() {
        assert_eq!(SubmitButton::label(&state(false)), "Get Recommendations");
        assert_eq!(SubmitButton::label(&state(true)), "Searching for books...");
    }

    #[test]
    fn test_enter_submits_even_while_loading() {
        let mut b = SubmitButton::new('4');
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(b.handle_key(enter, &state(false)), vec![Action::Submit]);
        assert_eq!(b.handle_key(enter, &state(true)), vec![Action::Submit]);
    }
}
