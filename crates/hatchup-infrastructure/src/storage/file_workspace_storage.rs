//! File-backed workspace storage.
//!
//! Directory structure:
//! ```text
//! base_dir/
//! └── workspaces/
//!     ├── <owner-id>.json
//!     └── <owner-id>.lock
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use hatchup_core::analysis::WorkspaceStorage;
use hatchup_core::{HatchupError, Result};

use super::atomic_json::AtomicJsonFile;

const MAX_OWNER_ID_LEN: usize = 128;

/// One JSON document per owner under `<base_dir>/workspaces`.
#[derive(Debug, Clone)]
pub struct FileWorkspaceStorage {
    workspaces_dir: PathBuf,
}

impl FileWorkspaceStorage {
    /// Creates the storage, making sure the directory exists.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be created.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let workspaces_dir = base_dir.as_ref().join("workspaces");
        tokio::fs::create_dir_all(&workspaces_dir).await?;
        tracing::debug!(
            "[FileWorkspaceStorage] Using directory {}",
            workspaces_dir.display()
        );
        Ok(Self { workspaces_dir })
    }

    pub fn workspaces_dir(&self) -> &Path {
        &self.workspaces_dir
    }

    fn file_for(&self, owner_id: &str) -> Result<AtomicJsonFile> {
        validate_owner_id(owner_id)?;
        Ok(AtomicJsonFile::new(
            self.workspaces_dir.join(format!("{}.json", owner_id)),
        ))
    }
}

/// Owner ids become file names, so only `[A-Za-z0-9_-]` is accepted.
fn validate_owner_id(owner_id: &str) -> Result<()> {
    let valid = !owner_id.is_empty()
        && owner_id.len() <= MAX_OWNER_ID_LEN
        && owner_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(HatchupError::invalid_input(format!(
            "Owner id '{}' is not a valid storage key",
            owner_id
        )))
    }
}

#[async_trait]
impl WorkspaceStorage for FileWorkspaceStorage {
    async fn read(&self, owner_id: &str) -> Result<Option<Value>> {
        let file = self.file_for(owner_id)?;
        tokio::task::spawn_blocking(move || file.load())
            .await
            .map_err(|e| HatchupError::internal(format!("Storage task failed: {}", e)))?
    }

    async fn write(&self, owner_id: &str, document: &Value) -> Result<()> {
        let file = self.file_for(owner_id)?;
        let document = document.clone();
        tokio::task::spawn_blocking(move || file.save(&document))
            .await
            .map_err(|e| HatchupError::internal(format!("Storage task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileWorkspaceStorage::new(temp_dir.path()).await.unwrap();

        assert_eq!(storage.read("owner-1").await.unwrap(), None);
        storage
            .write("owner-1", &json!({"schema_version": "2.0.0"}))
            .await
            .unwrap();

        assert_eq!(
            storage.read("owner-1").await.unwrap(),
            Some(json!({"schema_version": "2.0.0"}))
        );
        assert!(storage.workspaces_dir().join("owner-1.json").exists());
    }

    #[tokio::test]
    async fn test_owners_are_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileWorkspaceStorage::new(temp_dir.path()).await.unwrap();

        storage.write("alice", &json!({"n": 1})).await.unwrap();
        assert_eq!(storage.read("bob").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_path_traversal_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileWorkspaceStorage::new(temp_dir.path()).await.unwrap();

        let err = storage.read("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, HatchupError::InvalidInput(_)));
    }
}
