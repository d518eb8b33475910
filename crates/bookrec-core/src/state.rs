use crate::history::Recommendation;
use crate::orchestrator::{PendingRequest, SubmitError};
use crate::selection::{Field, Selection};
use crate::session::Session;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared handle to the session. Every mutation takes the write lock, so the
/// in-flight check and the loading flip in `begin_submit` are one step.
pub struct StateManager {
    session: Arc<RwLock<Session>>,
}

impl StateManager {
    pub fn new() -> Self {
        Self::from_session(Session::new())
    }

    pub fn from_session(session: Session) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
        }
    }

    /// Full copy of the session, for rendering.
    pub async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }

    pub async fn selection(&self) -> Selection {
        self.session.read().await.selection().clone()
    }

    pub async fn loading(&self) -> bool {
        self.session.read().await.loading()
    }

    pub async fn select(&self, field: Field, value: Option<String>) -> Selection {
        let mut session = self.session.write().await;
        session.select(field, value).clone()
    }

    pub async fn begin_submit(&self) -> Result<PendingRequest, SubmitError> {
        self.session.write().await.begin_submit()
    }

    /// Resolve `pending`; on success returns the stored entry and the new
    /// history length.
    pub async fn finish_submit(
        &self,
        pending: PendingRequest,
        result: Result<String, SubmitError>,
    ) -> Result<(Recommendation, usize), SubmitError> {
        let mut session = self.session.write().await;
        let entry = session.finish_submit(pending, result)?;
        Ok((entry, session.history().len()))
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}
