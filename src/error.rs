use std::time::Duration;

use thiserror::Error;

/// Why a single suggestion could not be applied to the document.
///
/// None of these invalidate the editing session; the buffer and lifecycle
/// state stay intact and the caller decides how to surface the failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// The anchor locator found no span for the suggestion in the current
    /// document. Never apply at the stale offset; re-analysis is the fix.
    #[error("suggestion target could not be located in the current document")]
    PositionLost,

    /// The replacement failed safety validation against the located slice.
    #[error("replacement failed safety validation")]
    UnsafeReplacement,

    /// The stored highlight range is corrupt: degenerate, out of bounds, or
    /// off a character boundary.
    #[error("suggestion range is outside the document bounds")]
    RangeOutOfBounds,

    /// Informational suggestion with no range or no usable replacement.
    #[error("suggestion is not auto-applicable")]
    NotActionable,

    #[error("unknown suggestion id")]
    UnknownSuggestion,
}

/// Failure modes of the external analysis call.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    /// The service rejected the request for rate reasons. `retry_after` is
    /// the machine-parseable hint from the error payload, when present.
    #[error("analysis rate limited")]
    RateLimited { retry_after: Option<Duration> },

    /// Any other terminal failure for this attempt.
    #[error("analysis failed: {0}")]
    Failed(String),
}

/// Auto-save failures surface as status only; they never block editing.
#[derive(Debug, Clone, Error)]
#[error("save failed: {0}")]
pub struct SaveError(pub String);
