//! Suggestion re-anchoring and safe-application engine.
//!
//! The editor UI owns rendering and input; this crate owns everything between
//! an AI analysis response and a safe mutation of the document buffer:
//! relocating suggestion spans in text that has been edited since analysis,
//! gating replacements behind safety checks, selecting non-conflicting
//! batches, and caching per-paragraph analysis results so small edits only
//! re-analyze what changed.

pub mod anchor;
pub mod api;
pub mod batch;
pub mod config;
pub mod conflict;
pub mod error;
pub mod paragraph;
pub mod session;
pub mod similarity;
pub mod store;
pub mod suggestion;
pub mod validate;

pub use error::{AnalysisError, ApplyError};
pub use session::EditorSession;
pub use suggestion::{Severity, Suggestion, SuggestionId, SuggestionKind};
