//! Pairwise overlap between suggestion spans over the current document.
//!
//! The relation is symmetric, not transitive, and purely derived; it is
//! recomputed per pass rather than maintained incrementally. O(n²) over the
//! ranged suggestions, which stay at editor scale.

use std::collections::{HashMap, HashSet};

use crate::suggestion::{Suggestion, SuggestionId};

/// Symmetric adjacency map over suggestion ids. Suggestions without a
/// highlight range are excluded entirely: they never conflict and never
/// block others. Every ranged suggestion gets an entry, possibly empty.
pub fn detect_conflicts(
    suggestions: &[Suggestion],
) -> HashMap<SuggestionId, HashSet<SuggestionId>> {
    let ranged: Vec<(&SuggestionId, crate::suggestion::TextRange)> = suggestions
        .iter()
        .filter_map(|s| s.highlight_range.map(|r| (&s.id, r)))
        .collect();

    let mut conflicts: HashMap<SuggestionId, HashSet<SuggestionId>> = ranged
        .iter()
        .map(|(id, _)| ((*id).clone(), HashSet::new()))
        .collect();

    for i in 0..ranged.len() {
        for j in (i + 1)..ranged.len() {
            let (a_id, a_range) = ranged[i];
            let (b_id, b_range) = ranged[j];
            if a_range.overlaps(&b_range) {
                if let Some(set) = conflicts.get_mut(a_id) {
                    set.insert(b_id.clone());
                }
                if let Some(set) = conflicts.get_mut(b_id) {
                    set.insert(a_id.clone());
                }
            }
        }
    }

    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestion::{Severity, SuggestionKind, TextRange};

    fn ranged(id: &str, start: usize, end: usize) -> Suggestion {
        Suggestion {
            id: id.into(),
            kind: SuggestionKind::Objective,
            category: "grammar".to_string(),
            severity: Severity::Warning,
            message: String::new(),
            original_text: "x".to_string(),
            context_before: None,
            context_after: None,
            replacement: Some("y".to_string()),
            highlight_range: Some(TextRange::new(start, end)),
            confidence: 0.9,
        }
    }

    fn rangeless(id: &str) -> Suggestion {
        let mut s = ranged(id, 0, 0);
        s.highlight_range = None;
        s
    }

    fn id(s: &str) -> SuggestionId {
        s.into()
    }

    #[test]
    fn test_overlapping_pair_is_symmetric() {
        let suggestions = vec![ranged("a", 0, 10), ranged("b", 5, 15), ranged("c", 20, 25)];
        let conflicts = detect_conflicts(&suggestions);

        assert!(conflicts[&id("a")].contains(&id("b")));
        assert!(conflicts[&id("b")].contains(&id("a")));
        assert!(conflicts[&id("c")].is_empty());
    }

    #[test]
    fn test_touching_boundaries_do_not_conflict() {
        let suggestions = vec![ranged("a", 0, 5), ranged("b", 5, 10)];
        let conflicts = detect_conflicts(&suggestions);
        assert!(conflicts[&id("a")].is_empty());
        assert!(conflicts[&id("b")].is_empty());
    }

    #[test]
    fn test_rangeless_excluded() {
        let suggestions = vec![ranged("a", 0, 5), rangeless("b")];
        let conflicts = detect_conflicts(&suggestions);
        assert!(!conflicts.contains_key(&id("b")));
        assert!(conflicts[&id("a")].is_empty());
    }

    #[test]
    fn test_not_transitive() {
        // a overlaps b, b overlaps c, a does not overlap c.
        let suggestions = vec![ranged("a", 0, 6), ranged("b", 4, 12), ranged("c", 10, 16)];
        let conflicts = detect_conflicts(&suggestions);
        assert!(conflicts[&id("a")].contains(&id("b")));
        assert!(conflicts[&id("b")].contains(&id("c")));
        assert!(!conflicts[&id("a")].contains(&id("c")));
    }
}
