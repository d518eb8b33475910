//! Response history: completed recommendations, newest first.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::selection::Selection;

/// One successful answer. `text` is stored exactly as the service returned it.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub id: u64,
    pub text: String,
    /// Selection the request was built from.
    pub selection: Selection,
    pub received_at: DateTime<Local>,
}

/// Prepend-only list. Entries are never removed or reordered.
#[derive(Debug, Clone, Default)]
pub struct ResponseHistory {
    entries: VecDeque<Recommendation>,
}

impl ResponseHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend(&mut self, entry: Recommendation) {
        self.entries.push_front(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Recommendation> {
        self.entries.get(index)
    }

    pub fn newest(&self) -> Option<&Recommendation> {
        self.entries.front()
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Recommendation> {
        self.entries.iter()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.text.as_str())
    }

    /// Display number of the entry at `index`: the newest entry carries the
    /// highest number.
    pub fn display_number(&self, index: usize) -> usize {
        self.entries.len().saturating_sub(index)
    }

    pub fn label(&self, index: usize) -> String {
        format!("Recommendation List {}", self.display_number(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, text: &str) -> Recommendation {
        Recommendation {
            id,
            text: text.to_string(),
            selection: Selection::default(),
            received_at: Local::now(),
        }
    }

    #[test]
    fn test_prepend_is_newest_first() {
        let mut h = ResponseHistory::new();
        assert!(h.is_empty());
        h.prepend(entry(1, "first"));
        h.prepend(entry(2, "second"));
        h.prepend(entry(3, "third"));
        assert_eq!(h.len(), 3);
        assert_eq!(h.texts().collect::<Vec<_>>(), ["third", "second", "first"]);
        assert_eq!(h.newest().map(|e| e.id), Some(3));
        // stable across re-reads
        assert_eq!(h.texts().collect::<Vec<_>>(), ["third", "second", "first"]);
    }

    #[test]
    fn test_labels_count_down_from_newest() {
        let mut h = ResponseHistory::new();
        for i in 1..=3 {
            h.prepend(entry(i, "x"));
        }
        assert_eq!(h.label(0), "Recommendation List 3");
        assert_eq!(h.label(2), "Recommendation List 1");
    }

    #[test]
    fn test_text_is_kept_verbatim() {
        let mut h = ResponseHistory::new();
        let raw = "  1. **Book A**\n\n2. Book B  \n";
        h.prepend(entry(1, raw));
        assert_eq!(h.get(0).map(|e| e.text.as_str()), Some(raw));
    }
}
