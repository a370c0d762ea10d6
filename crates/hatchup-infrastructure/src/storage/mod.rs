//! Workspace storage backends.

pub mod atomic_json;
pub mod file_workspace_storage;
pub mod memory_workspace_storage;

pub use atomic_json::AtomicJsonFile;
pub use file_workspace_storage::FileWorkspaceStorage;
pub use memory_workspace_storage::InMemoryWorkspaceStorage;
