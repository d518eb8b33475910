//! HistoryPanel: past recommendations, newest first, each one expandable.

use std::collections::HashSet;

use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthChar;

use bookrec_core::history::ResponseHistory;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_default, style_muted, style_secondary, style_selected_focused, C_SELECTION_BG, C_TAG},
    widgets::pane_chrome::{pane_chrome, Badge},
};

const TEXT_INDENT: usize = 4;

pub struct HistoryPanel {
    number_key: char,
    /// Index into the history (0 = newest).
    selected: usize,
    /// Request ids of expanded entries. Ids are stable as entries get prepended.
    expanded: HashSet<u64>,
    scroll: usize,
    /// Bring the selected header into view on the next draw.
    follow: bool,
    /// Entry index for each rendered row of the last frame.
    row_owner: Vec<Option<usize>>,
}

impl HistoryPanel {
    pub fn new(number_key: char) -> Self {
        Self {
            number_key,
            selected: 0,
            expanded: HashSet::new(),
            scroll: 0,
            follow: true,
            row_owner: Vec::new(),
        }
    }

    pub fn is_expanded(&self, id: u64) -> bool {
        self.expanded.contains(&id)
    }

    fn select(&mut self, index: usize, history: &ResponseHistory) {
        self.selected = index.min(history.len().saturating_sub(1));
        self.follow = true;
    }

    fn toggle_selected(&mut self, history: &ResponseHistory) {
        if let Some(entry) = history.get(self.selected) {
            if !self.expanded.remove(&entry.id) {
                self.expanded.insert(entry.id);
            }
            self.follow = true;
        }
    }

    /// Rendered rows (and the entry each belongs to) for `width` columns.
    fn build_lines(&self, history: &ResponseHistory, width: usize) -> (Vec<Line<'static>>, Vec<Option<usize>>) {
        let mut lines = Vec::new();
        let mut owners = Vec::new();
        for (i, entry) in history.iter().enumerate() {
            let open = self.is_expanded(entry.id);
            let is_sel = i == self.selected;
            let header_style = if is_sel {
                style_selected_focused()
            } else {
                style_default().add_modifier(Modifier::BOLD)
            };
            let bg = if is_sel {
                Style::default().bg(C_SELECTION_BG)
            } else {
                Style::default()
            };
            let sel = &entry.selection;
            lines.push(Line::from(vec![
                Span::styled(if open { " ▾ " } else { " ▸ " }, header_style),
                Span::styled(history.label(i), header_style),
                Span::styled(
                    format!("  {} · {} · {}", sel.genre, sel.mood, sel.level),
                    bg.fg(C_TAG),
                ),
                Span::styled(
                    format!("  {}", entry.received_at.format("%H:%M")),
                    style_muted(),
                ),
            ]));
            owners.push(Some(i));

            if open {
                let indent = " ".repeat(TEXT_INDENT);
                for row in wrap_text(&entry.text, width.saturating_sub(TEXT_INDENT + 1)) {
                    lines.push(Line::from(Span::styled(
                        format!("{}{}", indent, row),
                        style_secondary(),
                    )));
                    owners.push(Some(i));
                }
                lines.push(Line::from(""));
                owners.push(None);
            }
        }
        (lines, owners)
    }
}

impl Component for HistoryPanel {
    fn id(&self) -> ComponentId {
        ComponentId::HistoryPanel
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        let history = state.session.history();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.select(self.selected.saturating_sub(1), history),
            KeyCode::Down | KeyCode::Char('j') => self.select(self.selected + 1, history),
            KeyCode::Home | KeyCode::Char('g') => self.select(0, history),
            KeyCode::End | KeyCode::Char('G') => self.select(usize::MAX, history),
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
                self.follow = false;
            }
            KeyCode::PageDown => {
                self.scroll += 10;
                self.follow = false;
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.toggle_selected(history),
            KeyCode::Char('e') => {
                self.expanded = history.iter().map(|e| e.id).collect();
                self.follow = true;
            }
            KeyCode::Char('E') => {
                self.expanded.clear();
                self.follow = true;
            }
            KeyCode::Char('y') => {
                if let Some(entry) = history.get(self.selected) {
                    return vec![Action::CopyToClipboard(entry.text.clone())];
                }
            }
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::ScrollUp => {
                self.scroll = self.scroll.saturating_sub(3);
                self.follow = false;
            }
            MouseEventKind::ScrollDown => {
                self.scroll += 3;
                self.follow = false;
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if event.row <= area.y {
                    return vec![];
                }
                let row = (event.row - area.y - 1) as usize + self.scroll;
                if let Some(Some(idx)) = self.row_owner.get(row).copied() {
                    if idx == self.selected {
                        self.toggle_selected(state.session.history());
                    } else {
                        self.select(idx, state.session.history());
                    }
                }
            }
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if let Action::NewRecommendation(id) = action {
            // Newest lands on top, opened.
            self.expanded.insert(*id);
            self.selected = 0;
            self.scroll = 0;
            self.follow = true;
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let history = state.session.history();
        let count = history.len().to_string();
        let badge = (!history.is_empty()).then(|| Badge {
            text: &count,
            color: C_TAG,
        });
        let block = pane_chrome("Recommendations", Some(self.number_key), focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        if history.is_empty() {
            self.row_owner.clear();
            frame.render_widget(
                Paragraph::new(vec![
                    Line::from(""),
                    Line::from(Span::styled(
                        "  No recommendations yet.",
                        style_secondary(),
                    )),
                    Line::from(Span::styled(
                        "  Pick a genre, mood and reading level, then press s.",
                        style_muted(),
                    )),
                ]),
                inner,
            );
            return;
        }

        self.selected = self.selected.min(history.len() - 1);
        let (lines, owners) = self.build_lines(history, inner.width as usize);
        let height = inner.height as usize;

        if self.follow {
            if let Some(header) = owners.iter().position(|o| *o == Some(self.selected)) {
                let last = owners.iter().rposition(|o| *o == Some(self.selected)).unwrap_or(header);
                if header < self.scroll {
                    self.scroll = header;
                } else if last >= self.scroll + height {
                    // Show as much of the entry as fits, header first.
                    self.scroll = (last + 1).saturating_sub(height).min(header);
                }
            }
            self.follow = false;
        }
        self.scroll = self.scroll.min(lines.len().saturating_sub(height));

        let visible: Vec<Line> = lines.into_iter().skip(self.scroll).take(height).collect();
        self.row_owner = owners;
        frame.render_widget(Paragraph::new(visible), inner);
    }

    fn min_height(&self) -> u16 {
        5
    }
}

/// Greedy word wrap by display width. Newlines are kept; words wider than
/// `width` are broken.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for para in text.lines() {
        let mut line = String::new();
        let mut line_w = 0usize;
        for word in para.split_whitespace() {
            let word_w: usize = word.chars().map(|c| c.width().unwrap_or(0)).sum();
            let sep = usize::from(line_w > 0);
            if line_w + sep + word_w <= width {
                if sep == 1 {
                    line.push(' ');
                }
                line.push_str(word);
                line_w += sep + word_w;
                continue;
            }
            if line_w > 0 {
                out.push(std::mem::take(&mut line));
                line_w = 0;
            }
            for c in word.chars() {
                let cw = c.width().unwrap_or(0);
                if line_w + cw > width && line_w > 0 {
                    out.push(std::mem::take(&mut line));
                    line_w = 0;
                }
                line.push(c);
                line_w += cw;
            }
        }
        out.push(line);
    }
    out
}
