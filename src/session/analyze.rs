//! Analysis orchestration: deciding what to send to the analysis service,
//! merging the response with cached paragraph results, and retrying through
//! rate limits.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::api::{self, AnalysisOutcome, AnalysisService};
use crate::error::AnalysisError;
use crate::paragraph::{self, Paragraph, Partition};
use crate::suggestion::{Suggestion, SuggestionId, TextRange};

use super::state::{AnalysisPhase, EditorSession};

pub const MAX_ANALYSIS_ATTEMPTS: u32 = 3;
pub const RATE_LIMIT_FALLBACK: Duration = Duration::from_secs(30);

impl EditorSession {
    /// Run one analysis round against the current buffer.
    ///
    /// Skips the call entirely when the content and program context are
    /// unchanged since the last completed round, unless forced. When the
    /// paragraph cache can prove only a strict subset of paragraphs changed,
    /// only those paragraphs are sent and the rest come from cache; the
    /// cache is a latency optimization only and never changes which
    /// suggestions exist.
    pub async fn analyze(
        &mut self,
        service: &dyn AnalysisService,
        force: bool,
    ) -> Result<(), AnalysisError> {
        let force = force || self.force_next_analysis;
        let content = self.document.clone();

        if content.trim().is_empty() {
            self.suggestions.clear();
            self.overall_feedback = None;
            self.last_analyzed_text = content;
            self.phase = AnalysisPhase::Idle;
            self.force_next_analysis = false;
            return Ok(());
        }

        if !force
            && content == self.last_analyzed_text
            && self.program_context == self.last_program_context
        {
            debug!("analysis skipped: content unchanged since last round");
            return Ok(());
        }

        let request_id = api::next_request_id();
        self.current_request = Some(request_id);
        self.phase = AnalysisPhase::Analyzing;
        self.force_next_analysis = false;

        let now = Instant::now();
        let paragraphs = paragraph::split_paragraphs(&content);
        let partition = if self.config.cache_enabled {
            Some(paragraph::partition(now, &paragraphs, &mut self.cache))
        } else {
            None
        };

        // Partial only when changed is a non-empty strict subset; anything
        // else (cache off, cold cache, nothing cached) is a full round.
        let result = match partition {
            Some(p) if !p.changed.is_empty() && !p.unchanged.is_empty() => {
                self.analyze_partial(service, &paragraphs, p).await
            }
            _ => self.analyze_full(service, &content, &paragraphs).await,
        };

        // A newer explicit trigger supersedes this round; drop the result.
        if self.current_request != Some(request_id) {
            debug!(request_id, "discarding superseded analysis result");
            return Ok(());
        }
        self.current_request = None;

        match result {
            Ok((merged, feedback)) => {
                let fresh_ids: HashSet<SuggestionId> =
                    merged.iter().map(|s| s.id.clone()).collect();
                self.lifecycle.prune_rejected(&fresh_ids);

                self.suggestions = merged;
                self.overall_feedback = feedback;
                self.last_analyzed_text = content;
                self.last_program_context = self.program_context.clone();
                self.phase = AnalysisPhase::Idle;
                Ok(())
            }
            Err(e) => {
                // Stale suggestions are worse than none.
                self.suggestions.clear();
                self.overall_feedback = None;
                self.phase = AnalysisPhase::Failed(e.to_string());
                Err(e)
            }
        }
    }

    async fn analyze_full(
        &mut self,
        service: &dyn AnalysisService,
        content: &str,
        paragraphs: &[Paragraph],
    ) -> Result<(Vec<Suggestion>, Option<String>), AnalysisError> {
        let outcome =
            request_with_retry(service, content, self.program_context.as_deref()).await?;

        if self.config.cache_enabled {
            // Every paragraph gets an entry, empty buckets included, so the
            // next partial round can tell clean from never-analyzed.
            let now = Instant::now();
            let mut buckets: Vec<Vec<Suggestion>> = vec![Vec::new(); paragraphs.len()];
            for s in &outcome.suggestions {
                if let Some(idx) = owning_paragraph(paragraphs, s) {
                    buckets[idx].push(paragraph::rebase_to_paragraph(s, &paragraphs[idx]));
                }
            }
            for (p, bucket) in paragraphs.iter().zip(buckets) {
                self.cache.insert(now, p.hash, bucket);
            }
        }

        Ok((outcome.suggestions, outcome.overall_feedback))
    }

    async fn analyze_partial(
        &mut self,
        service: &dyn AnalysisService,
        paragraphs: &[Paragraph],
        partition: Partition,
    ) -> Result<(Vec<Suggestion>, Option<String>), AnalysisError> {
        // The slice sent out is the changed paragraphs joined with blank
        // lines; track where each starts so spans can be mapped back.
        let mut joined = String::new();
        let mut joined_starts: Vec<(usize, usize)> = Vec::new();
        for &idx in &partition.changed {
            if !joined.is_empty() {
                joined.push_str("\n\n");
            }
            joined_starts.push((idx, joined.len()));
            joined.push_str(&paragraphs[idx].text);
        }

        debug!(
            changed = partition.changed.len(),
            total = paragraphs.len(),
            "partial analysis round"
        );

        let outcome =
            request_with_retry(service, &joined, self.program_context.as_deref()).await?;

        // Re-home each fresh suggestion in its owning changed paragraph,
        // paragraph-relative, so the cache entry stays position-independent.
        let now = Instant::now();
        let mut buckets: HashMap<usize, Vec<Suggestion>> =
            partition.changed.iter().map(|&i| (i, Vec::new())).collect();
        let mut extras: Vec<Suggestion> = Vec::new();

        for s in outcome.suggestions {
            match owning_changed_paragraph(&joined_starts, paragraphs, &s) {
                Some((idx, joined_start)) => {
                    let mut relative = s;
                    if let Some(r) = relative.highlight_range {
                        relative.highlight_range =
                            Some(TextRange::new(r.start - joined_start, r.end - joined_start));
                    }
                    if let Some(bucket) = buckets.get_mut(&idx) {
                        bucket.push(relative);
                    }
                }
                None => {
                    // No owning paragraph: keep informational suggestions
                    // visible this round (span stripped, slice coordinates
                    // mean nothing in the document), drop proposed edits.
                    if s.replacement.is_none() {
                        let mut stripped = s;
                        stripped.highlight_range = None;
                        extras.push(stripped);
                    }
                }
            }
        }

        for (&idx, bucket) in &buckets {
            self.cache.insert(now, paragraphs[idx].hash, bucket.clone());
        }

        // Merge fresh and cached buckets in document order, re-absolutized
        // against each paragraph's current position.
        let mut per_paragraph = buckets;
        for (idx, cached) in partition.unchanged {
            per_paragraph.insert(idx, cached);
        }

        let mut merged = Vec::new();
        for (idx, p) in paragraphs.iter().enumerate() {
            if let Some(bucket) = per_paragraph.remove(&idx) {
                merged.extend(bucket.iter().map(|s| paragraph::rebase_to_document(s, p)));
            }
        }
        merged.extend(extras);
        merged.sort_by_key(|s| s.highlight_range.map(|r| r.start).unwrap_or(usize::MAX));

        // Feedback from a partial round covers only the changed slice; keep
        // the previous document-level feedback when the round has none.
        let feedback = outcome
            .overall_feedback
            .or_else(|| self.overall_feedback.clone());

        Ok((merged, feedback))
    }
}

/// Call the analysis service, sleeping through rate limits. The wait comes
/// from the error's hint when present, a fixed fallback otherwise; attempts
/// are bounded so a persistently throttling service eventually surfaces.
async fn request_with_retry(
    service: &dyn AnalysisService,
    text: &str,
    program_context: Option<&str>,
) -> Result<AnalysisOutcome, AnalysisError> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match service.analyze(text, program_context).await {
            Ok(outcome) => return Ok(outcome),
            Err(AnalysisError::RateLimited { retry_after }) if attempt < MAX_ANALYSIS_ATTEMPTS => {
                let wait = retry_after.unwrap_or(RATE_LIMIT_FALLBACK);
                debug!(attempt, ?wait, "rate limited, retrying after wait");
                tokio::time::sleep(wait).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn owning_paragraph(paragraphs: &[Paragraph], s: &Suggestion) -> Option<usize> {
    if let Some(range) = s.highlight_range {
        return paragraphs
            .iter()
            .position(|p| range.start >= p.range.start && range.start < p.range.end);
    }
    paragraphs
        .iter()
        .position(|p| p.text.contains(&s.original_text))
}

fn owning_changed_paragraph(
    joined_starts: &[(usize, usize)],
    paragraphs: &[Paragraph],
    s: &Suggestion,
) -> Option<(usize, usize)> {
    if let Some(range) = s.highlight_range {
        return joined_starts.iter().copied().find(|&(idx, joined_start)| {
            range.start >= joined_start && range.start < joined_start + paragraphs[idx].text.len()
        });
    }
    joined_starts
        .iter()
        .copied()
        .find(|&(idx, _)| paragraphs[idx].text.contains(&s.original_text))
}
