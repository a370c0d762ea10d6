//! Analysis workspace domain.

pub mod model;
pub mod storage;

pub use model::{
    AnalysisRecord, AnalysisStatus, AnalysisSummary, AnalysisView, Deck, ResearchMessage,
    UNTITLED_ANALYSIS, Workspace, new_analysis_id,
};
pub use storage::WorkspaceStorage;
