use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::anchor::{self, Anchor};

/// Opaque unique identifier for a suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionId(pub String);

impl SuggestionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SuggestionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Severity level for a suggestion; doubles as the batch-priority key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    #[default]
    Warning,
    Info,
    /// Informational praise; never auto-applied.
    Success,
}

impl Severity {
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 3,
            Severity::Warning => 2,
            Severity::Info => 1,
            Severity::Success => 0,
        }
    }
}

/// Broad bucket a category string falls into. Decided once at ingestion,
/// never re-derived downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    /// Mechanical fixes: grammar, spelling, punctuation, clarity.
    #[default]
    Objective,
    /// Content-level advice: tone, structure, argument.
    Strategic,
}

impl SuggestionKind {
    pub fn from_category(category: &str) -> Self {
        match category.to_lowercase().as_str() {
            "grammar" | "spelling" | "punctuation" | "typo" | "clarity" | "conciseness"
            | "word-choice" => SuggestionKind::Objective,
            _ => SuggestionKind::Strategic,
        }
    }
}

/// Half-open `[start, end)` byte-offset interval into the document string.
/// Valid at analysis time only; any edit that shifts length before `start`
/// invalidates it, so it is a hint, never ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Half-open overlap; touching boundaries do not overlap.
    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.end > other.start && self.start < other.end
    }

    /// Usable against `document`: non-degenerate, in bounds, and on char
    /// boundaries. Anything else is treated as corrupt input.
    pub fn is_valid_for(&self, document: &str) -> bool {
        self.start < self.end
            && self.end <= document.len()
            && document.is_char_boundary(self.start)
            && document.is_char_boundary(self.end)
    }

    pub fn shifted(&self, delta: isize) -> Self {
        Self {
            start: (self.start as isize + delta) as usize,
            end: (self.end as isize + delta) as usize,
        }
    }
}

/// One proposed edit, produced externally by the analysis service.
/// Immutable once ingested; lifecycle state lives in the session, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: SuggestionId,
    pub kind: SuggestionKind,
    pub category: String,
    pub severity: Severity,
    pub message: String,
    pub original_text: String,
    #[serde(default)]
    pub context_before: Option<String>,
    #[serde(default)]
    pub context_after: Option<String>,
    #[serde(default)]
    pub replacement: Option<String>,
    #[serde(default)]
    pub highlight_range: Option<TextRange>,
    /// 0..1 score from the service, display-only.
    #[serde(default)]
    pub confidence: f32,
}

impl Suggestion {
    pub fn anchor(&self) -> Anchor<'_> {
        Anchor {
            original_text: &self.original_text,
            context_before: self.context_before.as_deref(),
            context_after: self.context_after.as_deref(),
        }
    }

    /// Auto-applicable: has a highlight range and a non-blank replacement.
    pub fn is_actionable(&self) -> bool {
        self.highlight_range.is_some()
            && self
                .replacement
                .as_deref()
                .map(|r| !r.trim().is_empty())
                .unwrap_or(false)
    }
}

/// Suggestion shape as the analysis service emits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireSuggestion {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub message: String,
    pub original_text: String,
    #[serde(default)]
    pub context_before: Option<String>,
    #[serde(default)]
    pub context_after: Option<String>,
    #[serde(default)]
    pub replacement: Option<String>,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireAnalysis {
    #[serde(default)]
    pub suggestions: Vec<WireSuggestion>,
    #[serde(default)]
    pub overall_feedback: Option<String>,
}

/// Convert a wire response into suggestion records, resolving each span
/// against the text that was analyzed. Unusable entries are dropped here so
/// the session never sees them.
pub fn ingest(analyzed_text: &str, wire: WireAnalysis) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    for w in wire.suggestions {
        if w.original_text.is_empty() {
            continue;
        }

        // A replacement must be a real change, not blank and not a no-op.
        if let Some(ref repl) = w.replacement {
            if repl.trim().is_empty() || repl == &w.original_text {
                continue;
            }
        }

        let located = anchor::locate(
            analyzed_text,
            &Anchor {
                original_text: &w.original_text,
                context_before: w.context_before.as_deref(),
                context_after: w.context_after.as_deref(),
            },
        );
        let highlight_range = located.map(|l| l.range);

        // A proposed edit with no locatable target is noise; comment-only
        // suggestions are kept even without a span.
        if highlight_range.is_none() && w.replacement.is_some() {
            continue;
        }

        let id = w
            .id
            .clone()
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| stable_id(&w));

        suggestions.push(Suggestion {
            id: SuggestionId(id),
            kind: SuggestionKind::from_category(&w.category),
            category: w.category,
            severity: w.severity,
            message: w.message,
            original_text: w.original_text,
            context_before: w.context_before,
            context_after: w.context_after,
            replacement: w.replacement,
            highlight_range,
            confidence: w.confidence,
        });
    }

    suggestions.sort_by_key(|s| s.highlight_range.map(|r| r.start).unwrap_or(usize::MAX));
    suggestions
}

/// A regenerated issue must keep its identity across analyses so a rejection
/// sticks. When the service sends no id, hash the stable parts.
fn stable_id(w: &WireSuggestion) -> String {
    let mut hasher = DefaultHasher::new();
    w.category.hash(&mut hasher);
    w.original_text.hash(&mut hasher);
    w.replacement.hash(&mut hasher);
    w.message.hash(&mut hasher);
    format!("s-{:016x}", hasher.finish())
}
