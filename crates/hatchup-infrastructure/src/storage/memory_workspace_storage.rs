use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use hatchup_core::Result;
use hatchup_core::analysis::WorkspaceStorage;

/// Process-local workspace storage.
///
/// Used for ephemeral runs and tests. Counts writes so tests can assert that
/// loading a canonical workspace does not rewrite it.
#[derive(Debug, Default)]
pub struct InMemoryWorkspaceStorage {
    documents: RwLock<HashMap<String, Value>>,
    writes: AtomicUsize,
}

impl InMemoryWorkspaceStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a raw document, bypassing the write counter.
    pub async fn seed(&self, owner_id: &str, document: Value) {
        self.documents
            .write()
            .await
            .insert(owner_id.to_string(), document);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkspaceStorage for InMemoryWorkspaceStorage {
    async fn read(&self, owner_id: &str) -> Result<Option<Value>> {
        Ok(self.documents.read().await.get(owner_id).cloned())
    }

    async fn write(&self, owner_id: &str, document: &Value) -> Result<()> {
        self.documents
            .write()
            .await
            .insert(owner_id.to_string(), document.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
