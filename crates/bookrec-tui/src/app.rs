//! App: component-based event loop.
//!
//! - `App` owns all components and `AppState` (the read-only view components
//!   render from).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background
//!   tasks: terminal input and the session broadcast.
//! - Components return `Vec<Action>`; App dispatches each Action.
//! - Intents to the session flow out through `intent_tx`.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use bookrec_core::catalog::OptionCatalog;
use bookrec_core::protocol::{BroadcastMessage, Intent, Submission};
use bookrec_core::selection::Field;
use bookrec_core::session::Session;
use bookrec_core::state::StateManager;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::{
        help_overlay::HelpOverlay, history_panel::HistoryPanel, select_field::SelectField,
        submit_button::{SubmitButton, LOADING_LABEL},
    },
    core::SessionEvent,
    focus::FocusRing,
    theme::{C_ACCENT, C_BG, C_SECONDARY},
    widgets::{
        status_bar::{self, InputMode},
        toast::{Severity, ToastManager},
    },
};

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    StateUpdated(Session),
    Submission(Submission),
}

/// Screen areas from the last draw, for mouse hit-testing.
#[derive(Default, Clone)]
struct PaneAreas {
    fields: [Rect; 3],
    submit: Rect,
    history: Rect,
}

pub struct App {
    state: AppState,
    state_manager: Arc<StateManager>,
    intent_tx: mpsc::Sender<SessionEvent>,

    fields: [SelectField; 3],
    submit: SubmitButton,
    history: HistoryPanel,
    help_overlay: HelpOverlay,

    focus: FocusRing,
    toast: ToastManager,
    show_keys_bar: bool,
    pane_areas: PaneAreas,
    should_quit: bool,
}

impl App {
    pub fn new(
        intent_tx: mpsc::Sender<SessionEvent>,
        state_manager: Arc<StateManager>,
        catalog: Arc<OptionCatalog>,
        show_keys_bar: bool,
    ) -> Self {
        Self {
            state: AppState::new(Session::new(), catalog),
            state_manager,
            intent_tx,
            fields: [
                SelectField::new(Field::Genre, '1'),
                SelectField::new(Field::Mood, '2'),
                SelectField::new(Field::Level, '3'),
            ],
            submit: SubmitButton::new('4'),
            history: HistoryPanel::new('5'),
            help_overlay: HelpOverlay::new(),
            focus: FocusRing::default(),
            toast: ToastManager::new(),
            show_keys_bar,
            pane_areas: PaneAreas::default(),
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self, mut broadcast_rx: broadcast::Receiver<BroadcastMessage>) -> anyhow::Result<()> {
        self.state.session = self.state_manager.snapshot().await;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal ready, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: session broadcast → AppMessage ───────────────────
        let bc_tx = tx.clone();
        let bc_state_manager = Arc::clone(&self.state_manager);
        tokio::spawn(async move {
            loop {
                let app_msg = match broadcast_rx.recv().await {
                    Ok(BroadcastMessage::StateUpdated) => {
                        AppMessage::StateUpdated(bc_state_manager.snapshot().await)
                    }
                    Ok(BroadcastMessage::Submission(s)) => AppMessage::Submission(s),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("broadcast receiver lagged by {} messages", n);
                        AppMessage::StateUpdated(bc_state_manager.snapshot().await)
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if bc_tx.send(app_msg).await.is_err() {
                    break;
                }
            }
        });

        // Toast expiry + spinner animation.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    needs_redraw = self.handle_message(msg).await;
                    // Drain whatever else is queued before the next frame.
                    while let Ok(next) = rx.try_recv() {
                        needs_redraw |= self.handle_message(next).await;
                    }
                }

                _ = ui_tick.tick() => {
                    self.toast.tick();
                    let actions = self.submit.tick(&self.state);
                    for action in actions {
                        self.dispatch(action).await;
                    }
                    needs_redraw = self.state.loading() || !self.toast.is_empty();
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        info!("tui exited");

        Ok(())
    }

    /// Returns true when a redraw is needed.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                if key.kind == KeyEventKind::Release {
                    return false;
                }
                for action in self.handle_key(key) {
                    self.dispatch(action).await;
                }
                true
            }
            AppMessage::Event(Event::Mouse(mouse)) => {
                for action in self.handle_mouse(mouse) {
                    self.dispatch(action).await;
                }
                true
            }
            AppMessage::Event(Event::Resize(_, _)) => true,
            AppMessage::Event(_) => false,
            AppMessage::StateUpdated(session) => {
                self.on_state_updated(session).await;
                true
            }
            AppMessage::Submission(notice) => {
                self.on_submission(notice);
                true
            }
        }
    }

    async fn on_state_updated(&mut self, session: Session) {
        let newest_before = self.state.session.history().newest().map(|e| e.id);
        self.state.session = session;
        let newest = self.state.session.history().newest().map(|e| e.id);
        if let Some(id) = newest.filter(|id| Some(*id) != newest_before) {
            self.dispatch(Action::NewRecommendation(id)).await;
        }
    }

    /// Submission alerts. Rejections are warnings; failures are errors.
    fn on_submission(&mut self, notice: Submission) {
        match notice {
            Submission::Started { id } => self.toast.spinner(id, LOADING_LABEL),
            Submission::Succeeded { id, entries } => self.toast.resolve_spinner(
                id,
                Severity::Success,
                format!("Recommendation List {} ready", entries),
                Duration::from_secs(3),
            ),
            Submission::Failed { id, error } => {
                warn!("request {} failed: {}", id, error);
                self.toast.resolve_spinner(
                    id,
                    Severity::Error,
                    error.user_message(),
                    Duration::from_secs(6),
                );
            }
            Submission::Rejected { error } => self.toast.warning(error.user_message()),
        }
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return vec![Action::Quit];
        }

        if self.help_overlay.visible {
            return self.help_overlay.handle_key(key, &self.state);
        }

        // The open picker owns the keyboard except for focus cycling.
        if self.state.input_mode == InputMode::Picker {
            match key.code {
                KeyCode::Tab => return vec![Action::FocusNext],
                KeyCode::BackTab => return vec![Action::FocusPrev],
                _ => return self.dispatch_key_to_focused(key),
            }
        }

        match key.code {
            KeyCode::Char('q') => return vec![Action::Quit],
            KeyCode::Char('?') => return vec![Action::ToggleHelp],
            KeyCode::Char('K') => return vec![Action::ToggleKeys],
            KeyCode::Char('s') => return vec![Action::Submit],
            KeyCode::Tab => return vec![Action::FocusNext],
            KeyCode::BackTab => return vec![Action::FocusPrev],
            KeyCode::Char(c @ '1'..='5') => {
                let pos = c as usize - '1' as usize;
                return match self.focus.set_by_position(pos) {
                    Some(id) => vec![Action::FocusPane(id)],
                    None => vec![],
                };
            }
            KeyCode::Char('x') | KeyCode::Delete | KeyCode::Backspace => {
                if let Some(field) = self.focus.current().and_then(ComponentId::field) {
                    return vec![Action::ClearField(field)];
                }
            }
            _ => {}
        }

        self.dispatch_key_to_focused(key)
    }

    fn dispatch_key_to_focused(&mut self, key: KeyEvent) -> Vec<Action> {
        let s = &self.state;
        match self.focus.current() {
            Some(ComponentId::SubmitButton) => self.submit.handle_key(key, s),
            Some(ComponentId::HistoryPanel) => self.history.handle_key(key, s),
            Some(id) => match id.field() {
                Some(field) => self.fields[field_slot(field)].handle_key(key, s),
                None => vec![],
            },
            None => vec![],
        }
    }

    // ── Mouse handling ────────────────────────────────────────────────────────

    fn handle_mouse(&mut self, event: MouseEvent) -> Vec<Action> {
        if self.help_overlay.visible {
            return vec![];
        }
        // An open picker takes every click (outside closes it).
        if let Some(picker) = self.fields.iter_mut().find(|f| f.is_picking()) {
            return picker.handle_picker_mouse(event);
        }
        if !matches!(
            event.kind,
            MouseEventKind::Down(_) | MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
        ) {
            return vec![];
        }

        fn hit(r: Rect, col: u16, row: u16) -> bool {
            r.width > 0
                && r.height > 0
                && col >= r.x
                && col < r.x + r.width
                && row >= r.y
                && row < r.y + r.height
        }

        let (col, row) = (event.column, event.row);
        let areas = self.pane_areas.clone();
        let s = &self.state;

        let (id, mut actions) = if let Some(slot) = (0..3).find(|&i| hit(areas.fields[i], col, row)) {
            let f = &mut self.fields[slot];
            (f.id(), f.handle_mouse(event, areas.fields[slot], s))
        } else if hit(areas.submit, col, row) {
            (ComponentId::SubmitButton, self.submit.handle_mouse(event, areas.submit, s))
        } else if hit(areas.history, col, row) {
            (ComponentId::HistoryPanel, self.history.handle_mouse(event, areas.history, s))
        } else {
            return vec![];
        };

        // Focus follows the click.
        if !self.focus.is_focused(id) {
            actions.insert(0, Action::FocusPane(id));
        }
        actions
    }

    // ── Action dispatcher ─────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        // Let every component see the action first.
        let secondary: Vec<Action> = {
            let s = &self.state;
            let mut out = Vec::new();
            for f in self.fields.iter_mut() {
                out.extend(f.on_action(&action, s));
            }
            out.extend(self.submit.on_action(&action, s));
            out.extend(self.history.on_action(&action, s));
            out.extend(self.help_overlay.on_action(&action, s));
            out
        };

        self.apply_action(action).await;

        // Depth-limited to one level.
        for a in secondary {
            self.apply_action(a).await;
        }
    }

    async fn apply_action(&mut self, action: Action) {
        if action != Action::Noop {
            debug!("apply_action: {:?}", action);
        }
        match action {
            // ── Selection ─────────────────────────────────────────────────────
            Action::Select(field, value) => {
                self.send_intent(Intent::Select {
                    field,
                    value: Some(value),
                })
                .await;
            }
            Action::ClearField(field) => {
                self.send_intent(Intent::Select { field, value: None }).await;
            }
            Action::Submit => self.send_intent(Intent::Submit).await,

            // ── Navigation ────────────────────────────────────────────────────
            Action::FocusNext => {
                self.focus.next();
            }
            Action::FocusPrev => {
                self.focus.prev();
            }
            Action::FocusPane(id) => self.focus.set(id),

            // ── Picker mode ───────────────────────────────────────────────────
            Action::OpenPicker => self.state.input_mode = InputMode::Picker,
            Action::ClosePicker => self.state.input_mode = InputMode::Normal,

            // ── UI toggles ────────────────────────────────────────────────────
            Action::ToggleKeys => self.show_keys_bar = !self.show_keys_bar,
            Action::CopyToClipboard(text) => {
                match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.clone())) {
                    Ok(()) => self.toast.success(format!(
                        "copied {} characters",
                        text.chars().count()
                    )),
                    Err(e) => {
                        warn!("clipboard error: {}", e);
                        self.toast.error(format!("clipboard error: {}", e));
                    }
                }
            }

            Action::Quit => self.should_quit = true,

            // Handled at component level.
            Action::ToggleHelp | Action::NewRecommendation(_) | Action::Noop => {}
        }
    }

    async fn send_intent(&self, intent: Intent) {
        if self.intent_tx.send(SessionEvent::Intent(intent)).await.is_err() {
            warn!("session loop is gone; intent dropped");
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        let status_h = u16::from(self.show_keys_bar);
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(self.fields[0].min_height()),
                Constraint::Length(self.submit.min_height()),
                Constraint::Min(self.history.min_height()),
                Constraint::Length(status_h),
            ])
            .split(area);

        // ── Header ────────────────────────────────────────────────────────────
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(
                    " bookrec ",
                    Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    "· book recommendations by genre, mood and reading level",
                    Style::default().fg(C_SECONDARY),
                ),
            ])),
            outer[0],
        );

        // ── Selection row ─────────────────────────────────────────────────────
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(34),
                Constraint::Percentage(33),
                Constraint::Percentage(33),
            ])
            .split(outer[1]);
        for (slot, field) in self.fields.iter_mut().enumerate() {
            let focused = self.focus.is_focused(field.id());
            field.draw(frame, cols[slot], focused, &self.state);
            self.pane_areas.fields[slot] = cols[slot];
        }

        // ── Submit + history ──────────────────────────────────────────────────
        let focused = self.focus.is_focused(ComponentId::SubmitButton);
        self.submit.draw(frame, outer[2], focused, &self.state);
        self.pane_areas.submit = outer[2];

        let focused = self.focus.is_focused(ComponentId::HistoryPanel);
        self.history.draw(frame, outer[3], focused, &self.state);
        self.pane_areas.history = outer[3];

        if self.show_keys_bar {
            status_bar::draw_keys_bar(
                frame,
                outer[4],
                self.state.input_mode,
                self.focus.current(),
                self.state.loading(),
            );
        }

        // ── Overlays ──────────────────────────────────────────────────────────
        for field in self.fields.iter_mut() {
            field.draw_picker(frame, area, &self.state);
        }
        self.help_overlay.draw(frame, area, false, &self.state);
        self.toast.draw(frame, area);
    }
}

fn field_slot(field: Field) -> usize {
    match field {
        Field::Genre => 0,
        Field::Mood => 1,
        Field::Level => 2,
    }
}
