use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::anchor;
use crate::api::{SavePayload, SaveService};
use crate::batch;
use crate::config::Config;
use crate::conflict;
use crate::error::ApplyError;
use crate::paragraph::ParagraphCache;
use crate::suggestion::{Suggestion, SuggestionId};
use crate::validate::is_safe_replacement;

use super::debounce::Debouncer;
use super::history::EditHistory;
use super::lifecycle::LifecycleTracker;

/// What the analysis pipeline is currently doing, for the status surface.
/// Rate-limit retry windows stay in `Analyzing`, not `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnalysisPhase {
    #[default]
    Idle,
    Analyzing,
    Failed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub applied: usize,
    pub skipped: usize,
}

/// One editing session: the document buffer and every piece of mutable state
/// the suggestion pipeline needs. Owned by a single editor instance; all
/// core functions take the session explicitly, no process-wide state.
pub struct EditorSession {
    pub(super) document: String,
    pub(super) last_analyzed_text: String,
    pub(super) program_context: Option<String>,
    pub(super) last_program_context: Option<String>,
    pub(super) suggestions: Vec<Suggestion>,
    pub(super) overall_feedback: Option<String>,
    pub(super) lifecycle: LifecycleTracker,
    pub(super) cache: ParagraphCache,
    pub(super) history: EditHistory,
    pub(super) analysis_debounce: Debouncer,
    pub(super) autosave_debounce: Debouncer,
    pub(super) phase: AnalysisPhase,
    pub(super) current_request: Option<u64>,
    pub(super) force_next_analysis: bool,
    pub(super) last_save_error: Option<String>,
    pub(super) config: Config,
}

impl EditorSession {
    pub fn new(config: Config) -> Self {
        let cache = ParagraphCache::new(
            Duration::from_secs(config.cache_ttl_secs),
            config.cache_capacity,
        );
        Self {
            document: String::new(),
            last_analyzed_text: String::new(),
            program_context: None,
            last_program_context: None,
            suggestions: Vec::new(),
            overall_feedback: None,
            lifecycle: LifecycleTracker::default(),
            cache,
            history: EditHistory::default(),
            analysis_debounce: Debouncer::new(Duration::from_millis(config.analysis_debounce_ms)),
            autosave_debounce: Debouncer::new(Duration::from_millis(config.autosave_debounce_ms)),
            phase: AnalysisPhase::Idle,
            current_request: None,
            force_next_analysis: false,
            last_save_error: None,
            config,
        }
    }

    /// Rebuild a session from persisted state so rejections and applied
    /// metadata survive reloads.
    pub fn restore(config: Config, saved: &SavePayload) -> Self {
        let mut session = Self::new(config);
        session.document = saved.content.clone();
        session.lifecycle = LifecycleTracker::restore(&saved.rejected_ids, &saved.applied);
        session
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn phase(&self) -> &AnalysisPhase {
        &self.phase
    }

    pub fn overall_feedback(&self) -> Option<&str> {
        self.overall_feedback.as_deref()
    }

    pub fn last_save_error(&self) -> Option<&str> {
        self.last_save_error.as_deref()
    }

    pub fn set_program_context(&mut self, program: Option<String>) {
        self.program_context = program;
    }

    /// Replace the buffer with the editor's current text and restart both
    /// quiet-period timers.
    pub fn edit(&mut self, new_text: String, now: Instant) {
        if new_text == self.document {
            return;
        }
        self.document = new_text;
        self.history.push("edit".to_string());
        self.analysis_debounce.note_edit(now);
        self.autosave_debounce.note_edit(now);
    }

    /// Suggestions still awaiting a user decision. Applied and rejected ones
    /// are excluded from display and from every downstream pass.
    pub fn active_suggestions(&self) -> Vec<&Suggestion> {
        self.suggestions
            .iter()
            .filter(|s| self.lifecycle.is_pending(&s.id))
            .collect()
    }

    /// Conflict adjacency over the active suggestions, for highlighting.
    pub fn conflicts(&self) -> HashMap<SuggestionId, HashSet<SuggestionId>> {
        let active: Vec<Suggestion> = self.active_suggestions().into_iter().cloned().collect();
        conflict::detect_conflicts(&active)
    }

    /// Advisory only: the active suggestion set was computed against text
    /// that no longer matches the buffer. Individual applications still
    /// re-verify through the anchor locator regardless of this flag.
    pub fn is_stale(&self) -> bool {
        self.document != self.last_analyzed_text
    }

    /// True once per quiet period when analysis should run.
    pub fn analysis_due(&mut self, now: Instant) -> bool {
        self.analysis_debounce.fire(now)
    }

    /// True once per quiet period when auto-save should run.
    pub fn autosave_due(&mut self, now: Instant) -> bool {
        self.autosave_debounce.fire(now)
    }

    /// Whether the next analysis must skip the content short-circuit.
    pub fn reanalysis_forced(&self) -> bool {
        self.force_next_analysis
    }

    /// Apply one suggestion: relocate its span in the current buffer,
    /// validate the replacement against the located slice, then mutate.
    /// One logically atomic sequence with no suspension points.
    pub fn accept(&mut self, id: &SuggestionId, now: Instant) -> Result<(), ApplyError> {
        let suggestion = self
            .suggestions
            .iter()
            .find(|s| &s.id == id)
            .cloned()
            .ok_or(ApplyError::UnknownSuggestion)?;

        if !self.lifecycle.is_pending(id) {
            return Err(ApplyError::NotActionable);
        }

        let replacement = match suggestion.replacement.as_deref() {
            Some(r) if !r.trim().is_empty() => r.to_string(),
            _ => return Err(ApplyError::NotActionable),
        };

        let hint = suggestion.highlight_range.ok_or(ApplyError::NotActionable)?;

        // A degenerate or out-of-bounds hint is corrupt input: drop the
        // suggestion and ask for fresh results instead of throwing.
        if hint.start >= hint.end || hint.end > self.document.len() {
            warn!(id = %suggestion.id, "dropping suggestion with corrupt range");
            self.suggestions.retain(|s| &s.id != id);
            self.request_reanalysis(now);
            return Err(ApplyError::RangeOutOfBounds);
        }

        let located = match anchor::locate(&self.document, &suggestion.anchor()) {
            Some(located) => located,
            None => {
                // Never apply at a stale offset.
                self.request_reanalysis(now);
                return Err(ApplyError::PositionLost);
            }
        };

        let slice = self.document[located.range.start..located.range.end].to_string();
        if !is_safe_replacement(&slice, &replacement) {
            return Err(ApplyError::UnsafeReplacement);
        }

        self.document
            .replace_range(located.range.start..located.range.end, &replacement);
        let delta = replacement.len() as isize - located.range.len() as isize;

        let history_id = self.history.push(format!("apply {}", suggestion.category));
        self.suggestions.retain(|s| &s.id != id);
        for s in &mut self.suggestions {
            if let Some(range) = s.highlight_range {
                if range.start >= located.range.end {
                    s.highlight_range = Some(range.shifted(delta));
                }
            }
        }
        self.lifecycle.mark_applied(id.clone(), Some(history_id));

        // The mutation counts as an edit for both timers.
        self.analysis_debounce.note_edit(now);
        self.autosave_debounce.note_edit(now);
        Ok(())
    }

    /// Dismiss a suggestion. Terminal; the id is persisted so the issue is
    /// not re-shown if the analysis regenerates it.
    pub fn reject(&mut self, id: &SuggestionId) -> Result<(), ApplyError> {
        if !self.suggestions.iter().any(|s| &s.id == id) {
            return Err(ApplyError::UnknownSuggestion);
        }
        if !self.lifecycle.mark_rejected(id.clone()) {
            return Err(ApplyError::NotActionable);
        }
        Ok(())
    }

    /// Apply every safely applicable suggestion in one pass: greedy
    /// non-conflicting selection, then right-to-left substitution. Members
    /// failing validation at apply time are skipped, not fatal.
    pub fn accept_all(&mut self, now: Instant) -> BatchReport {
        let active: Vec<Suggestion> = self.active_suggestions().into_iter().cloned().collect();
        let chosen = batch::select_non_conflicting(&active);
        if chosen.is_empty() {
            return BatchReport::default();
        }

        let outcome = batch::apply_batch(&self.document, &chosen);
        if outcome.applied.is_empty() {
            debug!(skipped = outcome.skipped.len(), "batch applied nothing");
            return BatchReport {
                applied: 0,
                skipped: outcome.skipped.len(),
            };
        }

        self.document = outcome.text;
        let history_id = self
            .history
            .push(format!("apply {} suggestions", outcome.applied.len()));

        let applied_ids: HashSet<SuggestionId> =
            outcome.applied.iter().map(|e| e.id.clone()).collect();
        for edit in &outcome.applied {
            self.lifecycle
                .mark_applied(edit.id.clone(), Some(history_id.clone()));
        }
        self.suggestions.retain(|s| !applied_ids.contains(&s.id));

        // Shift surviving ranges past the applied edits. Ranges overlapping
        // an applied edit belonged to conflicting suggestions; they keep
        // their stale hint and re-anchor on their own accept.
        for s in &mut self.suggestions {
            if let Some(range) = s.highlight_range {
                let shift: isize = outcome
                    .applied
                    .iter()
                    .filter(|e| e.range.end <= range.start)
                    .map(|e| e.delta)
                    .sum();
                if shift != 0 {
                    s.highlight_range = Some(range.shifted(shift));
                }
            }
        }

        self.analysis_debounce.note_edit(now);
        self.autosave_debounce.note_edit(now);

        BatchReport {
            applied: outcome.applied.len(),
            skipped: outcome.skipped.len(),
        }
    }

    /// Everything the persistence layer needs to restore this session.
    pub fn save_payload(&self) -> SavePayload {
        SavePayload {
            content: self.document.clone(),
            rejected_ids: self.lifecycle.rejected_ids(),
            applied: self.lifecycle.applied_metadata().to_vec(),
        }
    }

    /// Fire-and-forget auto-save; failures are surfaced as status only and
    /// never block editing.
    pub async fn autosave(&mut self, service: &dyn SaveService) {
        let payload = self.save_payload();
        match service.save(&payload).await {
            Ok(()) => {
                self.last_save_error = None;
            }
            Err(e) => {
                warn!(error = %e, "auto-save failed");
                self.last_save_error = Some(e.to_string());
            }
        }
    }

    pub(super) fn request_reanalysis(&mut self, now: Instant) {
        self.force_next_analysis = true;
        self.analysis_debounce.trigger(now);
    }
}
