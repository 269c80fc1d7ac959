//! Re-locating a suggestion's target span inside a document that may have
//! been edited since the suggestion was generated.
//!
//! The strategy is ordered from strict to loose and the first stage that
//! produces evidence wins. No stage guesses: a candidate that does not clear
//! its stage's bar falls through, and exhausting every stage means the
//! position is lost, not approximated.

use tracing::debug;

use crate::similarity::similarity;
use crate::suggestion::TextRange;

/// The triple captured at analysis time and used to find the span again.
#[derive(Debug, Clone, Copy)]
pub struct Anchor<'a> {
    pub original_text: &'a str,
    pub context_before: Option<&'a str>,
    pub context_after: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub range: TextRange,
    pub confidence: Confidence,
}

/// Minimum similarity for a fuzzy window to count as a candidate.
const FUZZY_THRESHOLD: f64 = 0.7;

/// Ranking bonus per context field that still matches around a fuzzy hit.
const CONTEXT_BONUS: f64 = 0.1;

/// Extra bytes inspected around a span when loosely checking context.
const CONTEXT_SLACK: usize = 8;

/// Find the best span for `anchor` in `document`, or `None` when the
/// position is lost. An empty `original_text` never matches.
pub fn locate(document: &str, anchor: &Anchor) -> Option<Located> {
    let needle = anchor.original_text;
    if needle.is_empty() {
        return None;
    }

    // Stage 1: the exact sandwich context_before + original + context_after.
    if let (Some(before), Some(after)) = (anchor.context_before, anchor.context_after) {
        if !before.is_empty() && !after.is_empty() {
            let sandwich = format!("{before}{needle}{after}");
            if let Some(pos) = document.find(&sandwich) {
                let start = pos + before.len();
                return Some(Located {
                    range: TextRange::new(start, start + needle.len()),
                    confidence: Confidence::Exact,
                });
            }
        }
    }

    // Stage 2: literal occurrences, first one whose surroundings agree with
    // whatever context we have. No context at all accepts the bare match.
    for (pos, _) in document.match_indices(needle) {
        let end = pos + needle.len();
        if context_agrees(document, pos, end, anchor) {
            return Some(Located {
                range: TextRange::new(pos, end),
                confidence: Confidence::Exact,
            });
        }
    }

    // Stage 3: case-insensitive literal search.
    let lower_doc = document.to_lowercase();
    let lower_needle = needle.to_lowercase();
    if let Some(pos) = lower_doc.find(&lower_needle) {
        let end = pos + needle.len();
        // Lowercasing can shift byte offsets for non-ASCII text; only trust
        // positions that still land on boundaries in the original.
        if end <= document.len()
            && document.is_char_boundary(pos)
            && document.is_char_boundary(end)
        {
            return Some(Located {
                range: TextRange::new(pos, end),
                confidence: Confidence::Fuzzy,
            });
        }
    }

    // Stage 4: fuzzy scan anchored on the first word of the original.
    fuzzy_scan(document, &lower_doc, needle, &lower_needle, anchor)
}

/// Scan windows of `needle.len()` starting at each occurrence of the
/// original's first word and keep the best-scoring candidate above the
/// threshold. Ties break toward the earliest position.
fn fuzzy_scan(
    document: &str,
    lower_doc: &str,
    needle: &str,
    lower_needle: &str,
    anchor: &Anchor,
) -> Option<Located> {
    let first_word = lower_needle
        .split(|c: char| !c.is_alphanumeric())
        .find(|w| !w.is_empty())?;

    let window_len = needle.len();
    let mut best: Option<(f64, TextRange)> = None;

    for (pos, _) in lower_doc.match_indices(first_word) {
        let end = pos + window_len;
        if end > document.len()
            || !document.is_char_boundary(pos)
            || !document.is_char_boundary(end)
        {
            continue;
        }

        let window = &document[pos..end];
        let base = similarity(lower_needle, &window.to_lowercase());
        if base < FUZZY_THRESHOLD {
            continue;
        }

        let mut score = base;
        if let Some(before) = anchor.context_before {
            if !before.trim().is_empty() && region_before(document, pos).contains(before.trim()) {
                score += CONTEXT_BONUS;
            }
        }
        if let Some(after) = anchor.context_after {
            if !after.trim().is_empty() && region_after(document, end).contains(after.trim()) {
                score += CONTEXT_BONUS;
            }
        }

        // Strict greater keeps the earliest position on ties.
        if best.map(|(s, _)| score > s).unwrap_or(true) {
            best = Some((score, TextRange::new(pos, end)));
        }
    }

    best.map(|(score, range)| {
        debug!(start = range.start, score, "fuzzy anchor match");
        Located {
            range,
            confidence: Confidence::Fuzzy,
        }
    })
}

/// Loose containment check, not full equality: the trimmed context just has
/// to appear in a small region next to the candidate span.
fn context_agrees(document: &str, start: usize, end: usize, anchor: &Anchor) -> bool {
    let before_ok = match anchor.context_before.map(str::trim) {
        Some(ctx) if !ctx.is_empty() => region_before(document, start).contains(ctx),
        _ => true,
    };
    let after_ok = match anchor.context_after.map(str::trim) {
        Some(ctx) if !ctx.is_empty() => region_after(document, end).contains(ctx),
        _ => true,
    };
    before_ok && after_ok
}

/// Context snippets are short by contract; a fixed window plus slack covers
/// them without rescanning the document.
const CONTEXT_WINDOW: usize = 64 + CONTEXT_SLACK;

fn region_before(document: &str, start: usize) -> &str {
    let mut from = start.saturating_sub(CONTEXT_WINDOW);
    while from > 0 && !document.is_char_boundary(from) {
        from -= 1;
    }
    &document[from..start]
}

fn region_after(document: &str, end: usize) -> &str {
    let mut to = std::cmp::min(document.len(), end + CONTEXT_WINDOW);
    while to < document.len() && !document.is_char_boundary(to) {
        to += 1;
    }
    &document[end..to]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor<'a>(original: &'a str) -> Anchor<'a> {
        Anchor {
            original_text: original,
            context_before: None,
            context_after: None,
        }
    }

    fn anchor_with<'a>(original: &'a str, before: &'a str, after: &'a str) -> Anchor<'a> {
        Anchor {
            original_text: original,
            context_before: Some(before),
            context_after: Some(after),
        }
    }

    #[test]
    fn test_exact_round_trip_with_context() {
        let doc = "I am very passionate about this topic.";
        let found = locate(doc, &anchor_with("passionate", "very ", " about")).unwrap();
        assert_eq!(found.range, TextRange::new(10, 20));
        assert_eq!(found.confidence, Confidence::Exact);
        assert_eq!(&doc[found.range.start..found.range.end], "passionate");
    }

    #[test]
    fn test_bare_exact_match() {
        let doc = "one two three";
        let found = locate(doc, &anchor("two")).unwrap();
        assert_eq!(found.range, TextRange::new(4, 7));
        assert_eq!(found.confidence, Confidence::Exact);
    }

    #[test]
    fn test_context_disambiguates_repeated_occurrence() {
        let doc = "the cat sat. later the cat ran.";
        let found = locate(
            doc,
            &Anchor {
                original_text: "the cat",
                context_before: Some("later "),
                context_after: Some(" ran"),
            },
        )
        .unwrap();
        assert_eq!(&doc[found.range.start..found.range.end], "the cat");
        assert_eq!(found.range.start, 19);
        assert_eq!(found.confidence, Confidence::Exact);
    }

    #[test]
    fn test_no_context_picks_first_occurrence() {
        let doc = "abc abc abc";
        let found = locate(doc, &anchor("abc")).unwrap();
        assert_eq!(found.range.start, 0);
    }

    #[test]
    fn test_case_insensitive_fallback() {
        let doc = "The Quick Brown Fox";
        let found = locate(doc, &anchor("quick brown")).unwrap();
        assert_eq!(found.range, TextRange::new(4, 15));
        assert_eq!(found.confidence, Confidence::Fuzzy);
    }

    #[test]
    fn test_fuzzy_match_after_small_edit() {
        // Document drifted from "passionate about" to "passionate abuot".
        let doc = "I am passionate abuot science.";
        let found = locate(doc, &anchor("passionate about")).unwrap();
        assert_eq!(found.confidence, Confidence::Fuzzy);
        assert_eq!(found.range.start, 5);
    }

    #[test]
    fn test_position_lost_when_target_deleted() {
        let doc = "an entirely unrelated sentence.";
        assert!(locate(doc, &anchor("quarterly revenue projections")).is_none());
    }

    #[test]
    fn test_empty_original_never_matches() {
        assert!(locate("anything", &anchor("")).is_none());
    }

    #[test]
    fn test_fuzzy_tie_breaks_earliest() {
        let doc = "alpha beta. alpha beta.";
        let found = locate(doc, &anchor("alpha beta")).unwrap();
        assert_eq!(found.range.start, 0);
    }

    #[test]
    fn test_stage_two_skips_occurrence_with_wrong_context() {
        let doc = "good word here. bad word there.";
        let found = locate(
            doc,
            &Anchor {
                original_text: "word",
                context_before: Some("bad "),
                context_after: None,
            },
        )
        .unwrap();
        assert_eq!(found.range.start, 20);
    }
}
