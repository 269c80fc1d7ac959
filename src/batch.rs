//! One-click application of many suggestions: greedy selection of a
//! non-conflicting subset, then right-to-left substitution over a single
//! mutable copy of the document.

use std::collections::HashSet;

use tracing::debug;

use crate::conflict::detect_conflicts;
use crate::suggestion::{Severity, Suggestion, SuggestionId, TextRange};
use crate::validate::is_safe_replacement;

/// One substitution that actually happened during a batch apply.
#[derive(Debug, Clone)]
pub struct AppliedEdit {
    pub id: SuggestionId,
    /// The replaced range, in pre-batch document coordinates.
    pub range: TextRange,
    /// Length change introduced by this edit.
    pub delta: isize,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub text: String,
    pub applied: Vec<AppliedEdit>,
    pub skipped: Vec<SuggestionId>,
}

/// Greedy interval-scheduling selection: filter to actionable suggestions,
/// sort by severity rank descending with earlier document position breaking
/// ties, then sweep the list skipping anything that conflicts with an
/// already-selected suggestion.
///
/// Deliberately not the optimal weighted-interval DP. The greedy output
/// defines the user-visible "safe to apply" count, so changing the
/// algorithm changes behavior, not just performance.
pub fn select_non_conflicting(suggestions: &[Suggestion]) -> Vec<Suggestion> {
    let actionable: Vec<Suggestion> = suggestions
        .iter()
        .filter(|s| s.is_actionable() && s.severity != Severity::Success)
        .cloned()
        .collect();

    let conflicts = detect_conflicts(&actionable);

    let mut ordered: Vec<&Suggestion> = actionable.iter().collect();
    ordered.sort_by(|a, b| {
        b.severity
            .rank()
            .cmp(&a.severity.rank())
            .then_with(|| range_start(a).cmp(&range_start(b)))
    });

    let mut unavailable: HashSet<SuggestionId> = HashSet::new();
    let mut chosen = Vec::new();

    for s in ordered {
        if unavailable.contains(&s.id) {
            continue;
        }
        if let Some(neighbors) = conflicts.get(&s.id) {
            unavailable.extend(neighbors.iter().cloned());
        }
        chosen.push(s.clone());
    }

    chosen
}

/// Apply the chosen suggestions right-to-left so a substitution never shifts
/// the ranges of the still-unapplied ones before it. Each member passes the
/// safety validator against the slice it would replace; a failing member is
/// skipped and counted, never fatal to the batch.
pub fn apply_batch(document: &str, chosen: &[Suggestion]) -> BatchOutcome {
    let mut ordered: Vec<&Suggestion> = chosen.iter().collect();
    ordered.sort_by(|a, b| range_start(b).cmp(&range_start(a)));

    let mut text = document.to_string();
    let mut applied = Vec::new();
    let mut skipped = Vec::new();

    for s in ordered {
        let (range, replacement) = match (s.highlight_range, s.replacement.as_deref()) {
            (Some(r), Some(repl)) if !repl.trim().is_empty() => (r, repl),
            _ => {
                skipped.push(s.id.clone());
                continue;
            }
        };

        if !range.is_valid_for(&text) {
            debug!(id = %s.id, "batch member skipped: corrupt range");
            skipped.push(s.id.clone());
            continue;
        }

        let slice = &text[range.start..range.end];
        if !is_safe_replacement(slice, replacement) {
            debug!(id = %s.id, "batch member skipped: failed validation");
            skipped.push(s.id.clone());
            continue;
        }

        text.replace_range(range.start..range.end, replacement);
        applied.push(AppliedEdit {
            id: s.id.clone(),
            range,
            delta: replacement.len() as isize - range.len() as isize,
        });
    }

    BatchOutcome {
        text,
        applied,
        skipped,
    }
}

fn range_start(s: &Suggestion) -> usize {
    s.highlight_range.map(|r| r.start).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestion::SuggestionKind;

    fn suggestion(
        id: &str,
        severity: Severity,
        start: usize,
        end: usize,
        original: &str,
        replacement: &str,
    ) -> Suggestion {
        Suggestion {
            id: id.into(),
            kind: SuggestionKind::Objective,
            category: "grammar".to_string(),
            severity,
            message: String::new(),
            original_text: original.to_string(),
            context_before: None,
            context_after: None,
            replacement: Some(replacement.to_string()),
            highlight_range: Some(TextRange::new(start, end)),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_selection_has_no_overlaps() {
        let suggestions = vec![
            suggestion("a", Severity::Warning, 0, 10, "x", "y"),
            suggestion("b", Severity::Critical, 5, 15, "x", "y"),
            suggestion("c", Severity::Info, 12, 20, "x", "y"),
            suggestion("d", Severity::Info, 30, 40, "x", "y"),
        ];
        let chosen = select_non_conflicting(&suggestions);

        for i in 0..chosen.len() {
            for j in (i + 1)..chosen.len() {
                let a = chosen[i].highlight_range.unwrap();
                let b = chosen[j].highlight_range.unwrap();
                assert!(!a.overlaps(&b), "selected suggestions overlap");
            }
        }
    }

    #[test]
    fn test_non_conflicting_lower_severity_is_never_excluded() {
        let suggestions = vec![
            suggestion("critical", Severity::Critical, 0, 5, "x", "y"),
            suggestion("info", Severity::Info, 10, 15, "x", "y"),
        ];
        let chosen = select_non_conflicting(&suggestions);
        assert_eq!(chosen.len(), 2);
    }

    #[test]
    fn test_conflicting_pair_keeps_higher_severity() {
        let suggestions = vec![
            suggestion("low", Severity::Info, 0, 10, "x", "y"),
            suggestion("high", Severity::Critical, 5, 15, "x", "y"),
        ];
        let chosen = select_non_conflicting(&suggestions);
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].id.as_str(), "high");
    }

    #[test]
    fn test_equal_severity_tie_breaks_earlier_position() {
        let suggestions = vec![
            suggestion("late", Severity::Critical, 5, 15, "x", "y"),
            suggestion("early", Severity::Critical, 0, 10, "x", "y"),
        ];
        let chosen = select_non_conflicting(&suggestions);
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].id.as_str(), "early");
    }

    #[test]
    fn test_success_suggestions_never_selected() {
        let suggestions = vec![suggestion("praise", Severity::Success, 0, 5, "x", "y")];
        assert!(select_non_conflicting(&suggestions).is_empty());
    }

    #[test]
    fn test_apply_batch_right_to_left() {
        let doc = "one two three four";
        let chosen = vec![
            suggestion("first", Severity::Warning, 0, 7, "one two", "one 2"),
            suggestion("second", Severity::Warning, 8, 18, "three four", "three 4"),
        ];
        let outcome = apply_batch(doc, &chosen);
        assert_eq!(outcome.text, "one 2 three 4");
        assert_eq!(outcome.applied.len(), 2);
        assert!(outcome.skipped.is_empty());
        // Later-in-document edit must have been applied first.
        assert_eq!(outcome.applied[0].id.as_str(), "second");
    }

    #[test]
    fn test_apply_batch_skips_unsafe_member() {
        let doc = "it is what it is when it is in here";
        let chosen = vec![
            // Fails the word-count floor at apply time.
            suggestion("unsafe", Severity::Warning, 0, 27, "it is what it is when it is", "it is"),
            suggestion("safe", Severity::Warning, 28, 35, "in here", "in there"),
        ];
        let outcome = apply_batch(doc, &chosen);
        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(outcome.applied[0].id.as_str(), "safe");
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].as_str(), "unsafe");
        assert_eq!(outcome.text, "it is what it is when it is in there");
    }

    #[test]
    fn test_apply_batch_skips_corrupt_range() {
        let doc = "short";
        let chosen = vec![suggestion("broken", Severity::Warning, 2, 99, "x", "y")];
        let outcome = apply_batch(doc, &chosen);
        assert!(outcome.applied.is_empty());
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.text, doc);
    }
}
