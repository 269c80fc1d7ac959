//! Per-suggestion state machine: `pending → applied` and `pending →
//! rejected`, both terminal. Absence from the map means pending.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::suggestion::SuggestionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuggestionState {
    #[default]
    Pending,
    Applied,
    Rejected,
}

/// Metadata recorded when a suggestion is applied; survives reloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedSuggestion {
    pub id: SuggestionId,
    pub applied_at: DateTime<Utc>,
    /// Edit-history entry that performed the application, when known.
    #[serde(default)]
    pub history_entry: Option<String>,
}

#[derive(Debug, Default)]
pub struct LifecycleTracker {
    states: HashMap<SuggestionId, SuggestionState>,
    applied: Vec<AppliedSuggestion>,
}

impl LifecycleTracker {
    /// Rebuild the tracker from persisted state on document load.
    pub fn restore(rejected: &[SuggestionId], applied: &[AppliedSuggestion]) -> Self {
        let mut states = HashMap::new();
        for id in rejected {
            states.insert(id.clone(), SuggestionState::Rejected);
        }
        for entry in applied {
            states.insert(entry.id.clone(), SuggestionState::Applied);
        }
        Self {
            states,
            applied: applied.to_vec(),
        }
    }

    pub fn state_of(&self, id: &SuggestionId) -> SuggestionState {
        self.states.get(id).copied().unwrap_or_default()
    }

    pub fn is_pending(&self, id: &SuggestionId) -> bool {
        self.state_of(id) == SuggestionState::Pending
    }

    /// `pending → applied`. Returns false without effect when the suggestion
    /// already reached a terminal state.
    pub fn mark_applied(&mut self, id: SuggestionId, history_entry: Option<String>) -> bool {
        if self.state_of(&id) != SuggestionState::Pending {
            return false;
        }
        self.states.insert(id.clone(), SuggestionState::Applied);
        self.applied.push(AppliedSuggestion {
            id,
            applied_at: Utc::now(),
            history_entry,
        });
        true
    }

    /// `pending → rejected`. The id is remembered so the same issue is not
    /// re-shown when the analysis regenerates it.
    pub fn mark_rejected(&mut self, id: SuggestionId) -> bool {
        if self.state_of(&id) != SuggestionState::Pending {
            return false;
        }
        self.states.insert(id, SuggestionState::Rejected);
        true
    }

    pub fn rejected_ids(&self) -> Vec<SuggestionId> {
        self.states
            .iter()
            .filter(|(_, state)| **state == SuggestionState::Rejected)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn applied_metadata(&self) -> &[AppliedSuggestion] {
        &self.applied
    }

    /// Garbage-collect rejections for issues a fresh analysis no longer
    /// reports; they cannot recur, so the memory is released. Returns the
    /// number of ids pruned.
    pub fn prune_rejected(&mut self, fresh_ids: &HashSet<SuggestionId>) -> usize {
        let before = self.states.len();
        self.states
            .retain(|id, state| *state != SuggestionState::Rejected || fresh_ids.contains(id));
        let pruned = before - self.states.len();
        if pruned > 0 {
            debug!(pruned, "pruned stale rejections");
        }
        pruned
    }
}
