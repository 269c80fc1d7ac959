//! String-distance and token-overlap primitives used by the anchor locator
//! and the replacement validator.

use std::collections::HashSet;

/// Classic dynamic-programming edit distance over chars, no transposition.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut matrix = vec![vec![0usize; b_len + 1]; a_len + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b_len {
        matrix[0][j] = j;
    }

    for i in 1..=a_len {
        for j in 1..=b_len {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            matrix[i][j] = std::cmp::min(
                std::cmp::min(
                    matrix[i - 1][j] + 1, // deletion
                    matrix[i][j - 1] + 1, // insertion
                ),
                matrix[i - 1][j - 1] + cost, // substitution
            );
        }
    }

    matrix[a_len][b_len]
}

/// Normalized similarity in `[0, 1]`. Two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let max_len = std::cmp::max(a_len, b_len);

    if max_len == 0 {
        return 1.0;
    }

    (max_len - levenshtein_distance(a, b)) as f64 / max_len as f64
}

/// Share of the original's vocabulary that survives into the replacement.
///
/// Deliberately asymmetric: a replacement that drops most content words
/// scores low, while reordering or adding words keeps the score high.
pub fn token_overlap(original: &str, replacement: &str) -> f64 {
    let original_tokens = tokens(original);
    let replacement_tokens = tokens(replacement);

    if original_tokens.is_empty() && replacement_tokens.is_empty() {
        return 1.0;
    }
    if original_tokens.is_empty() || replacement_tokens.is_empty() {
        return 0.0;
    }

    let shared = original_tokens.intersection(&replacement_tokens).count();
    shared as f64 / original_tokens.len() as f64
}

fn tokens(s: &str) -> HashSet<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
