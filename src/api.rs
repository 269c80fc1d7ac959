//! Service seams the session depends on, plus the reqwest-backed analysis
//! client. The session only sees the traits; transports are swappable and
//! tests use in-memory mocks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::{ApiProvider, Config};
use crate::error::{AnalysisError, SaveError};
use crate::session::lifecycle::AppliedSuggestion;
use crate::suggestion::{self, Suggestion, SuggestionId, WireAnalysis};

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn next_request_id() -> u64 {
    REQUEST_COUNTER.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    pub suggestions: Vec<Suggestion>,
    pub overall_feedback: Option<String>,
}

/// The external analysis call. One outstanding request per explicit
/// trigger; idempotent for the same content and program context.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(
        &self,
        text: &str,
        program_context: Option<&str>,
    ) -> Result<AnalysisOutcome, AnalysisError>;
}

/// Everything the persistence layer needs to restore a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavePayload {
    pub content: String,
    pub rejected_ids: Vec<SuggestionId>,
    pub applied: Vec<AppliedSuggestion>,
}

/// Auto-save endpoint. Fire-and-forget from the session's perspective;
/// failures surface as status only and never block editing.
#[async_trait]
pub trait SaveService: Send + Sync {
    async fn save(&self, payload: &SavePayload) -> Result<(), SaveError>;
}

const SYSTEM_PROMPT: &str = r#"You are a writing advisor reviewing a student's application draft.
Identify concrete, span-level improvements. For every issue report the exact
substring you are commenting on, copied precisely from the input, plus up to
40 characters of surrounding text on each side.

Return ONLY valid JSON with this exact schema:
{
  "suggestions": [
    {
      "category": "grammar|spelling|punctuation|clarity|tone|structure|content",
      "severity": "critical|warning|info|success",
      "message": "explanation of the issue",
      "original_text": "exact substring from the input",
      "context_before": "text immediately before original_text",
      "context_after": "text immediately after original_text",
      "replacement": "proposed substitute text or null",
      "confidence": 0.0
    }
  ],
  "overall_feedback": "one short paragraph or null"
}

Rules:
- "original_text" must be copied exactly, including spacing.
- Leave "replacement" null when you have a comment but no concrete edit.
- Do not rewrite passages that are already correct and clear.
If there is nothing to report, return {"suggestions": []}."#;

/// OpenAI-compatible chat-completions client.
pub struct HttpAnalysisClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    provider: ApiProvider,
}

impl HttpAnalysisClient {
    pub fn new(config: &Config) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AnalysisError::Failed(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key_for_provider(&config.provider),
            model: config.model.clone(),
            provider: config.provider.clone(),
        })
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisClient {
    async fn analyze(
        &self,
        text: &str,
        program_context: Option<&str>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let request_id = next_request_id();
        let start = Instant::now();

        if self.api_key.is_empty() {
            return Err(AnalysisError::Failed("API key not set".to_string()));
        }
        if text.trim().is_empty() {
            return Ok(AnalysisOutcome::default());
        }

        let mut messages = vec![json!({ "role": "system", "content": SYSTEM_PROMPT })];
        if let Some(program) = program_context {
            messages.push(json!({
                "role": "system",
                "content": format!("The student is applying to: {program}")
            }));
        }
        messages.push(json!({ "role": "user", "content": format!("Draft:\n{text}") }));

        let body = json!({
            "model": self.model,
            "messages": messages,
            "response_format": { "type": "json_object" }
        });

        debug!(request_id, provider = self.provider.name(), text_len = text.len(), "sending analysis request");

        let mut request = self
            .client
            .post(self.provider.base_url())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body);

        if self.provider == ApiProvider::OpenRouter {
            request = request
                .header("HTTP-Referer", "https://github.com/redraft-app")
                .header("X-Title", "Redraft");
        }

        let response = request
            .send()
            .await
            .map_err(|e| AnalysisError::Failed(format!("network error: {e}")))?;

        let status = response.status();
        debug!(request_id, %status, elapsed = ?start.elapsed(), "analysis response");

        if !status.is_success() {
            let error_body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = error_body["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();

            if status.as_u16() == 429 || message.to_lowercase().contains("rate limit") {
                return Err(AnalysisError::RateLimited {
                    retry_after: parse_retry_hint(&message),
                });
            }
            return Err(AnalysisError::Failed(format!(
                "{} error ({status}): {message}",
                self.provider.name()
            )));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::Failed(format!("failed to parse response: {e}")))?;

        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or(r#"{"suggestions":[]}"#);

        let mut wire: WireAnalysis = serde_json::from_str(content)
            .map_err(|e| AnalysisError::Failed(format!("invalid JSON from model: {e}")))?;
        let overall_feedback = wire.overall_feedback.take();

        let suggestions = suggestion::ingest(text, wire);
        debug!(request_id, count = suggestions.len(), elapsed = ?start.elapsed(), "analysis complete");

        Ok(AnalysisOutcome {
            suggestions,
            overall_feedback,
        })
    }
}

/// Pull a wait duration out of a rate-limit message, e.g. "please retry
/// after 30 seconds" or "try again in 1500ms". Returns `None` when the
/// message carries no usable hint.
pub fn parse_retry_hint(message: &str) -> Option<Duration> {
    let lower = message.to_lowercase();
    let keyword_at = ["retry", "try again", "wait"]
        .iter()
        .filter_map(|k| lower.find(k))
        .min()?;

    let tail = &lower[keyword_at..];
    let digits_start = tail.find(|c: char| c.is_ascii_digit())?;
    let digits: String = tail[digits_start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let value: u64 = digits.parse().ok()?;

    let unit = tail[digits_start + digits.len()..].trim_start();
    if unit.starts_with("ms") {
        Some(Duration::from_millis(value))
    } else {
        Some(Duration::from_secs(value))
    }
}
