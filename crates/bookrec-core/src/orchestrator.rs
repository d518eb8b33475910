//! Request orchestration: validate → mark loading → one remote call →
//! interpret → record.
//!
//! The only suspension point is the network call in [`Orchestrator::dispatch`];
//! the session lock is never held across it.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::gemini::GeminiClient;
use crate::protocol::{BroadcastMessage, Submission};
use crate::selection::{Field, Selection};
use crate::state::StateManager;

/// How many books every prompt asks for.
pub const RECOMMENDATION_COUNT: usize = 6;

pub fn build_prompt(selection: &Selection) -> String {
    format!(
        "Recommend {} books for a {} {} reader feeling {}. Explain why.",
        RECOMMENDATION_COUNT, selection.level, selection.genre, selection.mood
    )
}

/// Token for the request currently in flight. Not `Clone`: resolving it
/// consumes it, so one submission resolves at most once.
#[derive(Debug)]
pub struct PendingRequest {
    pub id: u64,
    pub prompt: String,
    pub selection: Selection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmitError {
    /// One or more selections unset. Nothing was sent.
    #[serde(rename = "validation")]
    #[error("missing selection: {}", join_fields(.missing))]
    Incomplete { missing: Vec<Field> },
    /// Another request is still outstanding. Nothing was sent.
    #[serde(rename = "busy")]
    #[error("a request is already in flight")]
    InFlight,
    /// Network error, non-success status or unreadable body.
    #[error("transport failure: {message}")]
    Transport { message: String },
    /// The reply arrived but carried no recommendation text.
    #[error("response contained no recommendation text")]
    Semantic,
}

impl SubmitError {
    pub fn kind(&self) -> &'static str {
        match self {
            SubmitError::Incomplete { .. } => "validation",
            SubmitError::InFlight => "busy",
            SubmitError::Transport { .. } => "transport",
            SubmitError::Semantic => "semantic",
        }
    }

    /// Text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Incomplete { missing } => {
                format!("Please fill in all selections! (missing: {})", join_fields(missing))
            }
            SubmitError::InFlight => "Still searching for books, please wait".to_string(),
            SubmitError::Transport { .. } | SubmitError::Semantic => {
                "Failed to get recommendations. Check your API key or connection.".to_string()
            }
        }
    }

    /// True when the submission was turned away before anything was sent.
    pub fn is_rejection(&self) -> bool {
        matches!(self, SubmitError::Incomplete { .. } | SubmitError::InFlight)
    }
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Runs submissions against the shared session. Cheap to clone.
#[derive(Clone)]
pub struct Orchestrator {
    state: Arc<StateManager>,
    client: Arc<GeminiClient>,
    notify: broadcast::Sender<BroadcastMessage>,
}

impl Orchestrator {
    pub fn new(
        state: Arc<StateManager>,
        client: Arc<GeminiClient>,
        notify: broadcast::Sender<BroadcastMessage>,
    ) -> Self {
        Self {
            state,
            client,
            notify,
        }
    }

    pub fn state_manager(&self) -> Arc<StateManager> {
        Arc::clone(&self.state)
    }

    /// Submit the current selection and wait for the outcome.
    ///
    /// Returns the recommendation text on success. Every call publishes
    /// exactly one terminal `Submission` notice (`Rejected`, `Succeeded` or
    /// `Failed`), and the session is never left loading.
    pub async fn submit(&self) -> Result<String, SubmitError> {
        let pending = self.begin().await?;
        self.run(pending).await
    }

    /// Validate the selection and mark the session loading.
    ///
    /// The returned request is built from the selection as it is at this
    /// call; later selection changes do not reach it. Publishes `Rejected`
    /// on error, `Started` otherwise.
    pub async fn begin(&self) -> Result<PendingRequest, SubmitError> {
        let pending = match self.state.begin_submit().await {
            Ok(p) => p,
            Err(error) => {
                info!("submit rejected: {}", error);
                self.publish(BroadcastMessage::Submission(Submission::Rejected {
                    error: error.clone(),
                }));
                return Err(error);
            }
        };

        info!(
            "request {}: genre={:?} mood={:?} level={:?}",
            pending.id, pending.selection.genre, pending.selection.mood, pending.selection.level
        );
        self.publish(BroadcastMessage::StateUpdated);
        self.publish(BroadcastMessage::Submission(Submission::Started { id: pending.id }));
        Ok(pending)
    }

    /// Send `pending`, record the outcome and clear the loading flag.
    pub async fn run(&self, pending: PendingRequest) -> Result<String, SubmitError> {
        let id = pending.id;
        let result = self.dispatch(&pending).await;
        let outcome = self.state.finish_submit(pending, result).await;
        self.publish(BroadcastMessage::StateUpdated);

        match outcome {
            Ok((entry, entries)) => {
                info!("request {}: recommendation stored ({} total)", id, entries);
                self.publish(BroadcastMessage::Submission(Submission::Succeeded {
                    id,
                    entries,
                }));
                Ok(entry.text)
            }
            Err(error) => {
                self.publish(BroadcastMessage::Submission(Submission::Failed {
                    id,
                    error: error.clone(),
                }));
                Err(error)
            }
        }
    }

    /// Issue the remote call for `pending` and interpret the reply.
    pub async fn dispatch(&self, pending: &PendingRequest) -> Result<String, SubmitError> {
        debug!(
            "request {}: POST {} ({} byte prompt)",
            pending.id,
            self.client.endpoint(),
            pending.prompt.len()
        );
        match self.client.generate_content(&pending.prompt).await {
            Ok(response) => match response.candidate_text() {
                Some(text) => Ok(text.to_string()),
                None => {
                    warn!(
                        "request {}: reply had no candidate text (blockReason={:?}, finishReason={:?})",
                        pending.id,
                        response.block_reason(),
                        response.finish_reason()
                    );
                    Err(SubmitError::Semantic)
                }
            },
            Err(e) => {
                warn!("request {}: {}", pending.id, e);
                Err(SubmitError::Transport {
                    message: e.to_string(),
                })
            }
        }
    }

    fn publish(&self, msg: BroadcastMessage) {
        // No subscribers is fine (e.g. headless tests).
        let _ = self.notify.send(msg);
    }
}
