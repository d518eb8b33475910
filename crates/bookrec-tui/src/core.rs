//! SessionCore: single-owner event loop for user intents.
//!
//! The TUI and the HTTP API both send `SessionEvent`s here, and they are
//! handled strictly in arrival order. Selection intents are applied through
//! the `StateManager` and followed by a `BroadcastMessage::StateUpdated`. A
//! submit intent is validated and marked loading inside the loop, so it sees
//! exactly the selections queued before it; only the network call and its
//! outcome run on a separate task.
use std::sync::Arc;

use bookrec_core::catalog::OptionCatalog;
use bookrec_core::orchestrator::Orchestrator;
use bookrec_core::protocol::{BroadcastMessage, Intent};
use bookrec_core::selection::{Field, Selection};
use bookrec_core::state::StateManager;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A value that the catalog does not offer for a field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {field}")]
pub struct UnknownOption {
    pub field: Field,
    pub value: String,
}

/// All inputs into the SessionCore loop.
#[derive(Debug)]
pub enum SessionEvent {
    Intent(Intent),
    /// Catalog-checked selection change; the sender waits for the result.
    SelectAndReply {
        field: Field,
        value: Option<String>,
        reply: oneshot::Sender<Result<Selection, UnknownOption>>,
    },
    Shutdown,
}

pub struct SessionCore {
    state_manager: Arc<StateManager>,
    catalog: Arc<OptionCatalog>,
    orchestrator: Orchestrator,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
    /// Submissions still running; drained on shutdown.
    submissions: Vec<JoinHandle<()>>,
}

impl SessionCore {
    pub fn new(
        orchestrator: Orchestrator,
        catalog: Arc<OptionCatalog>,
        broadcast_tx: broadcast::Sender<BroadcastMessage>,
    ) -> Self {
        Self {
            state_manager: orchestrator.state_manager(),
            catalog,
            orchestrator,
            broadcast_tx,
            submissions: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn state_manager(&self) -> Arc<StateManager> {
        Arc::clone(&self.state_manager)
    }

    /// Run until `Shutdown` or until every sender is gone.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<SessionEvent>) -> anyhow::Result<()> {
        info!("SessionCore: starting event loop");
        loop {
            match event_rx.recv().await {
                None => {
                    info!("SessionCore: event channel closed, shutting down");
                    break;
                }
                Some(SessionEvent::Shutdown) => {
                    info!("SessionCore: shutdown requested");
                    break;
                }
                Some(SessionEvent::Intent(intent)) => self.handle_intent(intent).await,
                Some(SessionEvent::SelectAndReply {
                    field,
                    value,
                    reply,
                }) => {
                    let result = self.apply_checked_select(field, value).await;
                    let _ = reply.send(result);
                }
            }
        }

        for handle in self.submissions.drain(..) {
            handle.abort();
        }
        Ok(())
    }

    async fn handle_intent(&mut self, intent: Intent) {
        debug!("SessionCore: intent {:?}", intent);
        match intent {
            Intent::Select { field, value } => {
                self.apply_select(field, value).await;
            }
            Intent::Submit => {
                // Rejections are reported through the broadcast channel.
                let Ok(pending) = self.orchestrator.begin().await else {
                    return;
                };
                self.submissions.retain(|h| !h.is_finished());
                let orchestrator = self.orchestrator.clone();
                self.submissions.push(tokio::spawn(async move {
                    let _ = orchestrator.run(pending).await;
                }));
            }
        }
    }

    async fn apply_select(&self, field: Field, value: Option<String>) -> Selection {
        let selection = self.state_manager.select(field, value).await;
        let _ = self.broadcast_tx.send(BroadcastMessage::StateUpdated);
        selection
    }

    /// Check `value` against the catalog and the selection as it stands now,
    /// then apply it. A mood is checked against the current genre.
    async fn apply_checked_select(
        &self,
        field: Field,
        value: Option<String>,
    ) -> Result<Selection, UnknownOption> {
        let value = value.filter(|v| !v.is_empty());
        if let Some(v) = &value {
            let known = match field {
                Field::Genre => self.catalog.contains_genre(v),
                Field::Level => self.catalog.levels().contains(v),
                Field::Mood => {
                    let genre = self.state_manager.selection().await.genre;
                    self.catalog.available_moods(&genre).contains(v)
                }
            };
            if !known {
                return Err(UnknownOption {
                    field,
                    value: v.clone(),
                });
            }
        }
        Ok(self.apply_select(field, value).await)
    }
}
