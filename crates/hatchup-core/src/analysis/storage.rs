use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Raw persistence for one owner's workspace document.
///
/// Implementations deal in untyped JSON so that documents written under any
/// historical layout can be read back and migrated by the store above.
#[async_trait]
pub trait WorkspaceStorage: Send + Sync {
    /// Reads the stored document for `owner_id`.
    ///
    /// Returns `Ok(None)` when nothing has been written for this owner yet.
    async fn read(&self, owner_id: &str) -> Result<Option<Value>>;

    /// Replaces the stored document for `owner_id`.
    ///
    /// A successful return means the whole document is durable; a failed
    /// write must leave the previous document intact.
    async fn write(&self, owner_id: &str, document: &Value) -> Result<()>;
}
