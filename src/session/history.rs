use std::collections::VecDeque;

use chrono::{DateTime, Utc};

/// One buffer mutation. Applied-suggestion metadata references entries by id
/// so an application can be traced back to the edit that performed it.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: String,
    pub at: DateTime<Utc>,
    pub label: String,
}

/// Bounded log of buffer mutations, oldest entries dropped first.
#[derive(Debug)]
pub struct EditHistory {
    entries: VecDeque<HistoryEntry>,
    max_entries: usize,
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new(200)
    }
}

impl EditHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(64)),
            max_entries: max_entries.max(1),
        }
    }

    /// Record a mutation and return the new entry's id.
    pub fn push(&mut self, label: String) -> String {
        while self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }

        let entry = HistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            at: Utc::now(),
            label,
        };
        let id = entry.id.clone();
        self.entries.push_back(entry);
        id
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_latest() {
        let mut history = EditHistory::new(10);
        let id = history.push("edit".to_string());
        assert_eq!(history.latest().unwrap().id, id);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_capacity_limit() {
        let mut history = EditHistory::new(2);
        history.push("one".to_string());
        history.push("two".to_string());
        history.push("three".to_string());

        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().unwrap().label, "three");
    }

    #[test]
    fn test_ids_are_unique() {
        let mut history = EditHistory::new(10);
        let a = history.push("a".to_string());
        let b = history.push("b".to_string());
        assert_ne!(a, b);
    }
}
