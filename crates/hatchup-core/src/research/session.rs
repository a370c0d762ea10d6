use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::source::SearchSource;
use crate::error::Result;

/// A live handle to one external tool back-end.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Invokes `tool` with JSON `arguments` and returns its text output.
    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<String>;
}

/// Opens sessions to tool back-ends.
///
/// Called at most once per source per process by the tool registry.
#[async_trait]
pub trait ToolConnector: Send + Sync {
    /// Sources this connector is able to reach.
    fn configured_sources(&self) -> Vec<SearchSource>;

    async fn connect(&self, source: SearchSource) -> Result<Arc<dyn ToolSession>>;
}
