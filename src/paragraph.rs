//! Paragraph change detection and the per-paragraph suggestion cache.
//!
//! Paragraph identity across analyses is content-hash equality, not
//! position, so an unchanged paragraph that moved because of an edit above
//! it still hits the cache. Cached suggestions store paragraph-relative
//! ranges and are re-absolutized against the paragraph's current position at
//! merge time.
//!
//! The cache is a hint structure, never a source of truth: an expired or
//! evicted entry means "re-analyze this paragraph," never a fabricated empty
//! result.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::suggestion::{Suggestion, TextRange};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_CAPACITY: usize = 100;

/// A contiguous slice of the document between blank-line boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub text: String,
    pub hash: u64,
    /// Position of `text` in the document this paragraph was split from.
    pub range: TextRange,
}

/// Split on blank-line boundaries (lines that are empty after trimming).
/// Whitespace-only documents produce no paragraphs.
pub fn split_paragraphs(document: &str) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut para_start: Option<usize> = None;
    let mut para_end = 0usize;
    let mut offset = 0usize;

    for line in document.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        if content.trim().is_empty() {
            if let Some(start) = para_start.take() {
                paragraphs.push(make_paragraph(document, start, para_end));
            }
        } else {
            if para_start.is_none() {
                para_start = Some(offset);
            }
            para_end = offset + content.len();
        }
        offset += line.len();
    }

    if let Some(start) = para_start {
        paragraphs.push(make_paragraph(document, start, para_end));
    }

    paragraphs
}

fn make_paragraph(document: &str, start: usize, end: usize) -> Paragraph {
    let text = document[start..end].to_string();
    Paragraph {
        hash: hash_paragraph(&text),
        text,
        range: TextRange::new(start, end),
    }
}

pub fn hash_paragraph(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Shift a document-absolute suggestion into paragraph-relative coordinates.
pub fn rebase_to_paragraph(suggestion: &Suggestion, paragraph: &Paragraph) -> Suggestion {
    let mut s = suggestion.clone();
    if let Some(range) = s.highlight_range {
        s.highlight_range = Some(TextRange::new(
            range.start.saturating_sub(paragraph.range.start),
            range.end.saturating_sub(paragraph.range.start),
        ));
    }
    s
}

/// Shift a paragraph-relative suggestion to the paragraph's current document
/// position.
pub fn rebase_to_document(suggestion: &Suggestion, paragraph: &Paragraph) -> Suggestion {
    let mut s = suggestion.clone();
    if let Some(range) = s.highlight_range {
        s.highlight_range = Some(TextRange::new(
            range.start + paragraph.range.start,
            range.end + paragraph.range.start,
        ));
    }
    s
}

#[derive(Debug, Clone)]
struct CacheEntry {
    /// Suggestions in paragraph-relative coordinates.
    suggestions: Vec<Suggestion>,
    cached_at: Instant,
}

/// Bounded, TTL-expiring map from paragraph hash to that paragraph's last
/// known suggestions. Least-recently-used entries are evicted first.
#[derive(Debug)]
pub struct ParagraphCache {
    entries: HashMap<u64, CacheEntry>,
    order: VecDeque<u64>,
    ttl: Duration,
    capacity: usize,
}

impl Default for ParagraphCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

impl ParagraphCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::with_capacity(capacity),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Paragraph-relative suggestions for `hash`, or `None` on miss. A hit
    /// refreshes recency; an expired entry is removed and reported as a miss.
    pub fn get(&mut self, now: Instant, hash: u64) -> Option<Vec<Suggestion>> {
        let expired = match self.entries.get(&hash) {
            Some(entry) => now.duration_since(entry.cached_at) >= self.ttl,
            None => return None,
        };

        if expired {
            debug!(hash, "paragraph cache entry expired");
            self.remove(hash);
            return None;
        }

        self.order.retain(|h| *h != hash);
        self.order.push_back(hash);
        self.entries.get(&hash).map(|e| e.suggestions.clone())
    }

    /// Store a paragraph's suggestions, evicting the least recently used
    /// entries once over capacity.
    pub fn insert(&mut self, now: Instant, hash: u64, suggestions: Vec<Suggestion>) {
        self.order.retain(|h| *h != hash);
        self.order.push_back(hash);
        self.entries.insert(
            hash,
            CacheEntry {
                suggestions,
                cached_at: now,
            },
        );

        while self.entries.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    debug!(hash = oldest, "paragraph cache evicting LRU entry");
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn remove(&mut self, hash: u64) {
        self.entries.remove(&hash);
        self.order.retain(|h| *h != hash);
    }
}

/// Current paragraphs split by cache state. `unchanged` carries the cached
/// paragraph-relative suggestions so the caller does not re-query.
#[derive(Debug)]
pub struct Partition {
    pub changed: Vec<usize>,
    pub unchanged: Vec<(usize, Vec<Suggestion>)>,
}

pub fn partition(
    now: Instant,
    paragraphs: &[Paragraph],
    cache: &mut ParagraphCache,
) -> Partition {
    let mut changed = Vec::new();
    let mut unchanged = Vec::new();

    for (idx, paragraph) in paragraphs.iter().enumerate() {
        match cache.get(now, paragraph.hash) {
            Some(cached) => unchanged.push((idx, cached)),
            None => changed.push(idx),
        }
    }

    Partition { changed, unchanged }
}
