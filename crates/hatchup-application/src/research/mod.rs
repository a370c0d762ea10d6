//! Live research: query heuristic, tool sessions, fan-out, cache, sanitizer.

pub mod cache;
pub mod heuristic;
pub mod orchestrator;
pub mod registry;
pub mod sanitize;

pub use cache::SearchCache;
pub use heuristic::{normalize_query, should_run_live_search};
pub use orchestrator::{OrchestratorSettings, ResearchOrchestrator, ResearchOutcome};
pub use registry::ToolRegistry;
pub use sanitize::{TRUNCATION_MARKER, build_context, sanitize, sanitize_results};
