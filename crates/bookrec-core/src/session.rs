//! Session: the single state container for selection, request status and
//! history.
//!
//! ```text
//!  Idle ──begin_submit──► InFlight ──finish_submit(Ok)──► Idle (+1 entry)
//!   │  ▲                                 └──(Err)──────► Idle (error reported)
//!   └──┘ rejected (incomplete / already in flight): nothing changes
//! ```

use chrono::Local;
use tracing::{debug, warn};

use crate::history::{Recommendation, ResponseHistory};
use crate::orchestrator::{build_prompt, PendingRequest, SubmitError};
use crate::selection::{Field, Selection};

#[derive(Debug, Clone, Default)]
pub struct Session {
    selection: Selection,
    history: ResponseHistory,
    /// Id of the outstanding request; `loading` is derived from this.
    in_flight: Option<u64>,
    last_request_id: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn history(&self) -> &ResponseHistory {
        &self.history
    }

    pub fn loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    /// Apply one selection change. Allowed while a request is in flight; the
    /// outstanding request keeps the snapshot it was started with.
    pub fn select(&mut self, field: Field, value: Option<String>) -> &Selection {
        let next = self.selection.transition(field, value);
        debug!("select {}: {:?} -> {:?}", field, self.selection, next);
        self.selection = next;
        &self.selection
    }

    /// Accept a submission: requires all three selections and no request in
    /// flight. On success the session is loading until `finish_submit`.
    pub fn begin_submit(&mut self) -> Result<PendingRequest, SubmitError> {
        let missing = self.selection.missing();
        if !missing.is_empty() {
            return Err(SubmitError::Incomplete { missing });
        }
        if self.in_flight.is_some() {
            return Err(SubmitError::InFlight);
        }

        self.last_request_id += 1;
        let id = self.last_request_id;
        self.in_flight = Some(id);
        Ok(PendingRequest {
            id,
            prompt: build_prompt(&self.selection),
            selection: self.selection.clone(),
        })
    }

    /// Resolve the in-flight request. Loading always ends; history grows by
    /// one entry only when `result` carries non-empty text.
    pub fn finish_submit(
        &mut self,
        pending: PendingRequest,
        result: Result<String, SubmitError>,
    ) -> Result<Recommendation, SubmitError> {
        if self.in_flight != Some(pending.id) {
            warn!(
                "finishing request {} but in-flight is {:?}",
                pending.id, self.in_flight
            );
        }
        self.in_flight = None;

        let text = match result {
            Ok(text) if text.is_empty() => return Err(SubmitError::Semantic),
            Ok(text) => text,
            Err(e) => return Err(e),
        };

        let entry = Recommendation {
            id: pending.id,
            text,
            selection: pending.selection,
            received_at: Local::now(),
        };
        self.history.prepend(entry.clone());
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> Session {
        let mut s = Session::new();
        s.select(Field::Genre, Some("Fantasy".into()));
        s.select(Field::Mood, Some("Adventurous".into()));
        s.select(Field::Level, Some("Beginner".into()));
        s
    }

    #[test]
    fn test_new_session_is_idle_and_unset() {
        let s = Session::new();
        assert!(!s.loading());
        assert!(s.history().is_empty());
        assert_eq!(s.selection(), &Selection::default());
    }

    #[test]
    fn test_genre_select_resets_mood_in_session() {
        let mut s = ready();
        s.select(Field::Genre, Some("Mystery".into()));
        assert_eq!(s.selection().mood, "");
        assert_eq!(s.selection().level, "Beginner");
    }

    #[test]
    fn test_incomplete_submit_changes_nothing() {
        for field in Field::ALL {
            let mut s = ready();
            s.select(field, None);
            let before = s.selection().clone();
            let err = s.begin_submit().unwrap_err();
            assert_eq!(err.kind(), "validation");
            assert!(!s.loading());
            assert!(s.history().is_empty());
            assert_eq!(s.selection(), &before);
        }
    }

    #[test]
    fn test_success_prepends_and_clears_loading() {
        let mut s = ready();
        let pending = s.begin_submit().unwrap();
        assert!(s.loading());
        assert!(pending.prompt.contains("Beginner Fantasy"));

        let entry = s
            .finish_submit(pending, Ok("Book A, Book B...".into()))
            .unwrap();
        assert_eq!(entry.text, "Book A, Book B...");
        assert!(!s.loading());
        assert_eq!(s.history().texts().collect::<Vec<_>>(), ["Book A, Book B..."]);
    }

    #[test]
    fn test_second_submit_while_in_flight_is_rejected() {
        let mut s = ready();
        let first = s.begin_submit().unwrap();
        assert_eq!(s.begin_submit().unwrap_err(), SubmitError::InFlight);
        assert_eq!(s.in_flight(), Some(first.id));

        s.finish_submit(first, Ok("x".into())).unwrap();
        let second = s.begin_submit().unwrap();
        assert!(second.id > 1);
    }

    #[test]
    fn test_failures_clear_loading_without_history() {
        for failure in [
            SubmitError::Semantic,
            SubmitError::Transport {
                message: "connection refused".into(),
            },
        ] {
            let mut s = ready();
            let pending = s.begin_submit().unwrap();
            assert_eq!(s.finish_submit(pending, Err(failure.clone())).unwrap_err(), failure);
            assert!(!s.loading());
            assert!(s.history().is_empty());
            assert!(s.selection().is_complete());
        }
    }

    #[test]
    fn test_empty_text_is_semantic_failure() {
        let mut s = ready();
        let pending = s.begin_submit().unwrap();
        assert_eq!(
            s.finish_submit(pending, Ok(String::new())).unwrap_err(),
            SubmitError::Semantic
        );
        assert!(s.history().is_empty());
        assert!(!s.loading());
    }

    #[test]
    fn test_history_follows_submission_order() {
        let mut s = ready();
        for i in 1..=4 {
            let p = s.begin_submit().unwrap();
            s.finish_submit(p, Ok(format!("answer {i}"))).unwrap();
        }
        assert_eq!(s.history().len(), 4);
        assert_eq!(
            s.history().texts().collect::<Vec<_>>(),
            ["answer 4", "answer 3", "answer 2", "answer 1"]
        );
    }

    #[test]
    fn test_selection_change_mid_flight_keeps_request_snapshot() {
        let mut s = ready();
        let pending = s.begin_submit().unwrap();
        s.select(Field::Genre, Some("Horror".into()));
        let entry = s.finish_submit(pending, Ok("spooky".into())).unwrap();
        assert_eq!(entry.selection.genre, "Fantasy");
        assert_eq!(s.selection().genre, "Horror");
        assert_eq!(s.selection().mood, "");
    }
}
