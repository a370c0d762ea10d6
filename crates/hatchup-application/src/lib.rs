//! Application layer for HatchUp.
//!
//! Use cases that coordinate the workspace store, the research orchestrator
//! and the external collaborators behind the core traits.

pub mod analysis_service;
pub mod chat_usecase;
pub mod research;

pub use analysis_service::{AnalysisListing, AnalysisService, IngestOutcome};
pub use chat_usecase::{ChatUseCase, LiveChatReply, ResearchChatReply};
pub use research::{OrchestratorSettings, ResearchOrchestrator, SearchCache, ToolRegistry};
