use serde::{Deserialize, Serialize};

use crate::orchestrator::SubmitError;
use crate::selection::Field;

/// User intents accepted from the presentation layer (TUI or HTTP API).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// Set or clear (`value: None`) one selection.
    Select { field: Field, value: Option<String> },
    Submit,
}

/// Notifications fanned out to every listener.
#[derive(Debug, Clone)]
pub enum BroadcastMessage {
    /// The session changed; listeners should take a fresh snapshot.
    StateUpdated,
    /// Submission lifecycle, used for user-visible alerts.
    Submission(Submission),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Submission {
    Started { id: u64 },
    Succeeded { id: u64, entries: usize },
    Failed { id: u64, error: SubmitError },
    /// Turned away before anything was sent.
    Rejected { error: SubmitError },
}
