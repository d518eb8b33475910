//! Status bar: bottom line with mode, request state and keybindings.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::action::ComponentId;
use crate::theme::{C_LOADING, C_MODE_NORMAL, C_MODE_PICKER, C_MUTED, C_READY};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    /// An option picker popup has the keyboard.
    Picker,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Picker => "PICK",
        }
    }

    pub fn color(self) -> ratatui::style::Color {
        match self {
            Self::Normal => C_MODE_NORMAL,
            Self::Picker => C_MODE_PICKER,
        }
    }
}

/// Key hints for the current mode and focused pane.
pub fn key_hints(mode: InputMode, focused: Option<ComponentId>) -> &'static str {
    match mode {
        InputMode::Picker => " type to filter  ↑↓ move  Enter choose  Esc clear/close",
        InputMode::Normal => match focused {
            Some(ComponentId::GenreField | ComponentId::MoodField | ComponentId::LevelField) => {
                " Enter pick  ←→ cycle  x clear  s submit  Tab/1-5 panes  K keys  ? help  q quit"
            }
            Some(ComponentId::SubmitButton) => {
                " Enter submit  Tab/1-5 panes  K keys  ? help  q quit"
            }
            Some(ComponentId::HistoryPanel) => {
                " ↑↓/jk move  Enter expand  e/E all  y copy  s submit  Tab/1-5 panes  ? help  q quit"
            }
            _ => " Tab/1-5 panes  s submit  K keys  ? help  q quit",
        },
    }
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(
    frame: &mut Frame,
    area: Rect,
    mode: InputMode,
    focused: Option<ComponentId>,
    loading: bool,
) {
    let bulb = if loading { C_LOADING } else { C_READY };
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default()
                .fg(mode.color())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("●", Style::default().fg(bulb).add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::styled(key_hints(mode, focused), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
