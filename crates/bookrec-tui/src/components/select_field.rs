//! SelectField: one of the genre / mood / level choosers, with a filterable
//! option picker popup.

use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use bookrec_core::selection::Field;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{
        style_default, style_muted, style_selected_focused, C_LOADING, C_PANEL_BORDER_FOCUSED,
        C_POPUP_BG, C_SECONDARY,
    },
    widgets::{
        filter_input::{FilterAction, FilterInput},
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::ScrollableList,
    },
};

pub fn field_title(field: Field) -> &'static str {
    match field {
        Field::Genre => "Genre",
        Field::Mood => "Mood",
        Field::Level => "Reading Level",
    }
}

fn placeholder(field: Field, state: &AppState) -> &'static str {
    match field {
        Field::Genre => "Select a genre",
        Field::Mood if state.session.selection().genre.is_empty() => "Select a genre first",
        Field::Mood => "Select a mood",
        Field::Level => "Select a level",
    }
}

struct Picker {
    list: ScrollableList<String>,
    filter: FilterInput,
}

pub struct SelectField {
    field: Field,
    number_key: char,
    picker: Option<Picker>,
    /// Last rendered popup rect, for mouse hits.
    popup_area: Rect,
}

impl SelectField {
    pub fn new(field: Field, number_key: char) -> Self {
        Self {
            field,
            number_key,
            picker: None,
            popup_area: Rect::default(),
        }
    }

    pub fn is_picking(&self) -> bool {
        self.picker.is_some()
    }

    fn open_picker(&mut self, state: &AppState) -> Vec<Action> {
        let mut list = ScrollableList::new(|item: &String, q: &str| {
            item.to_lowercase().contains(&q.to_lowercase())
        });
        let options = state.options_for(self.field).to_vec();
        let current = state.session.selection().get(self.field);
        let current_idx = options.iter().position(|o| o == current);
        list.set_items(options);
        if let Some(i) = current_idx {
            list.set_selected_by_original(i);
        }
        self.picker = Some(Picker {
            list,
            filter: FilterInput::new("type to filter"),
        });
        vec![Action::OpenPicker]
    }

    fn close_picker(&mut self) -> Vec<Action> {
        self.picker = None;
        vec![Action::ClosePicker]
    }

    /// Step to the neighbouring option without opening the picker.
    fn cycle(&self, forward: bool, state: &AppState) -> Vec<Action> {
        let options = state.options_for(self.field);
        if options.is_empty() {
            return vec![];
        }
        let current = state.session.selection().get(self.field);
        let next = match options.iter().position(|o| o == current) {
            Some(i) if forward => (i + 1) % options.len(),
            Some(i) => (i + options.len() - 1) % options.len(),
            None if forward => 0,
            None => options.len() - 1,
        };
        vec![Action::Select(self.field, options[next].clone())]
    }

    fn handle_picker_key(&mut self, key: KeyEvent) -> Vec<Action> {
        let Some(picker) = self.picker.as_mut() else {
            return vec![];
        };
        match key.code {
            KeyCode::Up => {
                picker.list.select_up(1);
                return vec![];
            }
            KeyCode::Down => {
                picker.list.select_down(1);
                return vec![];
            }
            KeyCode::PageUp => {
                picker.list.select_up(10);
                return vec![];
            }
            KeyCode::PageDown => {
                picker.list.select_down(10);
                return vec![];
            }
            _ => {}
        }
        match picker.filter.handle_key(key) {
            FilterAction::Changed(q) => {
                picker.list.set_filter(&q);
                vec![]
            }
            FilterAction::Confirmed => {
                let chosen = picker.list.selected_item().cloned();
                let mut actions = self.close_picker();
                if let Some(value) = chosen {
                    actions.push(Action::Select(self.field, value));
                }
                actions
            }
            FilterAction::Cancelled => self.close_picker(),
        }
    }

    /// Draw the picker popup over `area` (the whole frame). No-op when closed.
    pub fn draw_picker(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        let field = self.field;
        let Some(picker) = self.picker.as_mut() else {
            self.popup_area = Rect::default();
            return;
        };

        let rows = picker.list.len().clamp(1, 12) as u16;
        let popup = centered_rect(40, rows + 3, area);
        self.popup_area = popup;
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(C_PANEL_BORDER_FOCUSED))
            .title(Span::styled(
                format!(" {} ", field_title(field)),
                Style::default().add_modifier(Modifier::BOLD),
            ))
            .style(Style::default().bg(C_POPUP_BG));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(inner);
        picker.filter.draw(frame, parts[0]);

        let list_area = parts[1];
        let height = list_area.height as usize;
        if picker.list.is_empty() {
            let hint = if state.options_for(field).is_empty() {
                placeholder(field, state)
            } else {
                "no matches"
            };
            frame.render_widget(
                Paragraph::new(Span::styled(format!(" {}", hint), style_muted())),
                list_area,
            );
            return;
        }

        picker.list.ensure_visible(height);
        let current = state.session.selection().get(field);
        let selected_row = picker.list.selected_in_view();
        let lines: Vec<Line> = picker
            .list
            .visible_items(height)
            .into_iter()
            .enumerate()
            .map(|(row, (_, option))| {
                let marker = if option == current { "● " } else { "  " };
                let style = if row == selected_row {
                    style_selected_focused()
                } else {
                    style_default()
                };
                Line::from(Span::styled(format!(" {}{}", marker, option), style))
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), list_area);
    }

    /// Mouse events while the popup is open. Clicking an option chooses it;
    /// clicking outside closes the popup.
    pub fn handle_picker_mouse(&mut self, event: MouseEvent) -> Vec<Action> {
        let area = self.popup_area;
        let Some(picker) = self.picker.as_mut() else {
            return vec![];
        };
        match event.kind {
            MouseEventKind::ScrollUp => picker.list.select_up(1),
            MouseEventKind::ScrollDown => picker.list.select_down(1),
            MouseEventKind::Down(MouseButton::Left) => {
                let inside = event.column >= area.x
                    && event.column < area.x + area.width
                    && event.row >= area.y
                    && event.row < area.y + area.height;
                if !inside {
                    return self.close_picker();
                }
                // Border row + filter row precede the list.
                let rel = event.row.saturating_sub(area.y + 2) as usize;
                if event.row >= area.y + 2 && picker.list.handle_click(rel) {
                    let chosen = picker.list.selected_item().cloned();
                    let mut actions = self.close_picker();
                    if let Some(value) = chosen {
                        actions.push(Action::Select(self.field, value));
                    }
                    return actions;
                }
            }
            _ => {}
        }
        vec![]
    }
}

impl Component for SelectField {
    fn id(&self) -> ComponentId {
        ComponentId::for_field(self.field)
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        if self.picker.is_some() {
            return self.handle_picker_key(key);
        }
        match key.code {
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('/') => self.open_picker(state),
            KeyCode::Right | KeyCode::Char('l') => self.cycle(true, state),
            KeyCode::Left | KeyCode::Char('h') => self.cycle(false, state),
            KeyCode::Down | KeyCode::Char('j') => vec![Action::FocusNext],
            KeyCode::Up | KeyCode::Char('k') => vec![Action::FocusPrev],
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => self.open_picker(state),
            MouseEventKind::ScrollUp => self.cycle(false, state),
            MouseEventKind::ScrollDown => self.cycle(true, state),
            _ => vec![],
        }
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        match action {
            // Focus moved away: drop the popup.
            Action::FocusPane(id) if *id != self.id() && self.picker.is_some() => {
                self.close_picker()
            }
            Action::FocusNext | Action::FocusPrev if self.picker.is_some() => self.close_picker(),
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let value = state.session.selection().get(self.field);
        let badge = if value.is_empty() {
            Some(Badge {
                text: "required",
                color: C_LOADING,
            })
        } else {
            None
        };
        let block = pane_chrome(field_title(self.field), Some(self.number_key), focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let line = if value.is_empty() {
            Line::from(Span::styled(
                format!(" {}", placeholder(self.field, state)),
                style_muted(),
            ))
        } else {
            Line::from(vec![
                Span::styled(format!(" {}", value), style_default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    if focused { "  ◂ ▸" } else { "" },
                    Style::default().fg(C_SECONDARY),
                ),
            ])
        };
        frame.render_widget(Paragraph::new(line), inner);
    }
}

pub fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookrec_core::catalog::OptionCatalog;
    use bookrec_core::session::Session;
    use ratatui::crossterm::event::KeyModifiers;
    use std::sync::Arc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state_with(genre: Option<&str>) -> AppState {
        let mut session = Session::new();
        if let Some(g) = genre {
            session.select(Field::Genre, Some(g.to_string()));
        }
        AppState::new(session, Arc::new(OptionCatalog::builtin().unwrap()))
    }

    #[test]
    fn test_pick_by_filter_and_enter() {
        let state = state_with(None);
        let mut f = SelectField::new(Field::Genre, '1');
        assert_eq!(f.handle_key(key(KeyCode::Enter), &state), vec![Action::OpenPicker]);
        assert!(f.is_picking());

        for c in "myst".chars() {
            assert!(f.handle_key(key(KeyCode::Char(c)), &state).is_empty());
        }
        assert_eq!(
            f.handle_key(key(KeyCode::Enter), &state),
            vec![
                Action::ClosePicker,
                Action::Select(Field::Genre, "Mystery".into())
            ]
        );
        assert!(!f.is_picking());
    }

    #[test]
    fn test_escape_closes_without_selecting() {
        let state = state_with(None);
        let mut f = SelectField::new(Field::Level, '3');
        f.handle_key(key(KeyCode::Enter), &state);
        assert_eq!(f.handle_key(key(KeyCode::Esc), &state), vec![Action::ClosePicker]);
    }

    #[test]
    fn test_mood_picker_without_genre_has_nothing_to_choose() {
        let state = state_with(None);
        let mut f = SelectField::new(Field::Mood, '2');
        f.handle_key(key(KeyCode::Enter), &state);
        assert_eq!(f.handle_key(key(KeyCode::Enter), &state), vec![Action::ClosePicker]);
        assert!(f.handle_key(key(KeyCode::Right), &state).is_empty());
    }

    #[test]
    fn test_cycle_wraps_through_levels() {
        let state = state_with(None);
        let f = SelectField::new(Field::Level, '3');
        assert_eq!(
            f.cycle(true, &state),
            vec![Action::Select(Field::Level, "Beginner".into())]
        );
        assert_eq!(
            f.cycle(false, &state),
            vec![Action::Select(Field::Level, "Expert".into())]
        );
    }

    #[test]
    fn test_mood_cycle_uses_genre_moods() {
        let state = state_with(Some("Fantasy"));
        let f = SelectField::new(Field::Mood, '2');
        let first = state.options_for(Field::Mood)[0].clone();
        assert_eq!(f.cycle(true, &state), vec![Action::Select(Field::Mood, first)]);
    }

    #[test]
    fn test_focus_change_closes_picker() {
        let state = state_with(None);
        let mut f = SelectField::new(Field::Genre, '1');
        f.handle_key(key(KeyCode::Enter), &state);
        assert_eq!(
            f.on_action(&Action::FocusPane(ComponentId::HistoryPanel), &state),
            vec![Action::ClosePicker]
        );
        assert!(!f.is_picking());
    }
}
