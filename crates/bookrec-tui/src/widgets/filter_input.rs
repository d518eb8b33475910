//! FilterInput: wraps tui-input for the type-to-filter line of the picker.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_FILTER_BG, C_FILTER_FG, C_MUTED};

#[derive(Debug, PartialEq)]
pub enum FilterAction {
    Changed(String),
    Confirmed,
    Cancelled,
}

pub struct FilterInput {
    input: Input,
    placeholder: String,
}

impl FilterInput {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            placeholder: placeholder.into(),
        }
    }

    pub fn clear(&mut self) {
        self.input = Input::default();
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    /// Esc clears the text first and cancels only when already empty.
    pub fn handle_key(&mut self, key: KeyEvent) -> FilterAction {
        match key.code {
            KeyCode::Esc => {
                if self.input.value().is_empty() {
                    FilterAction::Cancelled
                } else {
                    self.clear();
                    FilterAction::Changed(String::new())
                }
            }
            KeyCode::Enter => FilterAction::Confirmed,
            _ => {
                self.input.handle_event(&Event::Key(key));
                FilterAction::Changed(self.input.value().to_string())
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        if area.width < 4 {
            return;
        }
        let scroll = self.input.visual_scroll(area.width.saturating_sub(4) as usize);
        let value = self.input.value();
        let display = if value.is_empty() {
            Span::styled(
                format!("/ {}", self.placeholder),
                Style::default().fg(C_MUTED),
            )
        } else {
            let shown: String = value.chars().skip(scroll).collect();
            Span::styled(format!("/ {}", shown), Style::default().fg(C_FILTER_FG))
        };

        frame.render_widget(
            Paragraph::new(Line::from(display)).style(Style::default().bg(C_FILTER_BG)),
            area,
        );

        let cursor_x = area.x + 2 + self.input.visual_cursor().saturating_sub(scroll) as u16;
        frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_then_escape_twice() {
        let mut f = FilterInput::new("type to filter");
        assert_eq!(
            f.handle_key(key(KeyCode::Char('m'))),
            FilterAction::Changed("m".into())
        );
        assert_eq!(
            f.handle_key(key(KeyCode::Char('y'))),
            FilterAction::Changed("my".into())
        );
        assert_eq!(f.handle_key(key(KeyCode::Esc)), FilterAction::Changed(String::new()));
        assert_eq!(f.text(), "");
        assert_eq!(f.handle_key(key(KeyCode::Esc)), FilterAction::Cancelled);
    }

    #[test]
    fn test_enter_confirms() {
        let mut f = FilterInput::new("");
        assert_eq!(f.handle_key(key(KeyCode::Enter)), FilterAction::Confirmed);
    }
}
