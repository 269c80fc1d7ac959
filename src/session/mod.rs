mod analyze;
mod state;

pub mod debounce;
pub mod history;
pub mod lifecycle;

pub use analyze::{MAX_ANALYSIS_ATTEMPTS, RATE_LIMIT_FALLBACK};
pub use state::{AnalysisPhase, BatchReport, EditorSession};
