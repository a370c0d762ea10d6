//! Persistence and configuration for the HatchUp backend.

pub mod config;
pub mod dto;
pub mod migration;
pub mod storage;
pub mod workspace_store;

pub use config::AppConfig;
pub use storage::{FileWorkspaceStorage, InMemoryWorkspaceStorage};
pub use workspace_store::AnalysisWorkspaceStore;
