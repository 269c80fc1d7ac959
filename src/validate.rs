//! Last line of defense before any text mutation: policy gates deciding
//! whether a proposed replacement may substitute for the located original.

use tracing::{debug, warn};

use crate::similarity::token_overlap;

/// Replacements must keep at least this share of the original's vocabulary.
const MIN_TOKEN_OVERLAP: f64 = 0.5;

/// Originals at or above this word count get the deletion floor applied.
const WORD_FLOOR_MIN_WORDS: usize = 6;

/// Pure policy check, invoked for every single-suggestion and every
/// batch-member application. Diagnostics go to tracing; there are no other
/// side effects.
pub fn is_safe_replacement(original: &str, replacement: &str) -> bool {
    let original = original.trim();
    let replacement = replacement.trim();

    // No-op edits are trivially safe; the gates below never run for them.
    if original == replacement {
        return true;
    }

    if replacement.is_empty() {
        debug!("rejected replacement: blank");
        return false;
    }

    let overlap = token_overlap(original, replacement);
    if overlap < MIN_TOKEN_OVERLAP {
        debug!(overlap, "rejected replacement: token overlap below floor");
        return false;
    }

    // Independent of the similarity score: a long original shrinking to a
    // fraction of its word count looks like content deletion, not a fix.
    let original_words = original.split_whitespace().count();
    if original_words >= WORD_FLOOR_MIN_WORDS {
        let replacement_words = replacement.split_whitespace().count();
        if (replacement_words as f64) < 0.5 * original_words as f64 {
            debug!(
                original_words,
                replacement_words, "rejected replacement: word count floor"
            );
            return false;
        }
    }

    // Warn-only: sentence merges are legitimate, but worth a trace.
    if ends_sentence(original) && !ends_sentence(replacement) {
        warn!("replacement drops sentence-terminal punctuation");
    }

    true
}

fn ends_sentence(s: &str) -> bool {
    matches!(s.chars().last(), Some('.') | Some('!') | Some('?'))
}
