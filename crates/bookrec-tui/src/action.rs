//! Action enum: all user-initiated intents and internal events.

use bookrec_core::selection::Field;

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    GenreField,
    MoodField,
    LevelField,
    SubmitButton,
    HistoryPanel,
    HelpOverlay,
}

impl ComponentId {
    /// Panes in focus order. The help overlay is not part of the ring.
    pub const PANES: [ComponentId; 5] = [
        ComponentId::GenreField,
        ComponentId::MoodField,
        ComponentId::LevelField,
        ComponentId::SubmitButton,
        ComponentId::HistoryPanel,
    ];

    pub fn for_field(field: Field) -> Self {
        match field {
            Field::Genre => ComponentId::GenreField,
            Field::Mood => ComponentId::MoodField,
            Field::Level => ComponentId::LevelField,
        }
    }

    pub fn field(self) -> Option<Field> {
        match self {
            ComponentId::GenreField => Some(Field::Genre),
            ComponentId::MoodField => Some(Field::Mood),
            ComponentId::LevelField => Some(Field::Level),
            _ => None,
        }
    }
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Selection ────────────────────────────────────────────────────────────
    Select(Field, String),
    ClearField(Field),
    Submit,

    // ── Navigation ───────────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,
    FocusPane(ComponentId),

    // ── Option picker ────────────────────────────────────────────────────────
    OpenPicker,
    ClosePicker,

    // ── History ──────────────────────────────────────────────────────────────
    /// A new recommendation (by request id) landed at the top of the history.
    NewRecommendation(u64),

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleHelp,
    ToggleKeys,
    CopyToClipboard(String),

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
    Noop,
}
