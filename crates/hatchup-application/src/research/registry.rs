use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OnceCell;

use hatchup_core::research::{SearchSource, ToolConnector, ToolSession};
use hatchup_core::{HatchupError, Result};

/// Process-wide set of lazily opened tool sessions.
///
/// Every source in [`SearchSource::ALL`] is part of the registry. Configured
/// sources get one once-only cell: concurrent first callers
/// share a single connection attempt, and a failed attempt leaves the cell
/// empty so a later request can retry.
pub struct ToolRegistry {
    connector: Arc<dyn ToolConnector>,
    sessions: HashMap<SearchSource, OnceCell<Arc<dyn ToolSession>>>,
}

impl ToolRegistry {
    pub fn new(connector: Arc<dyn ToolConnector>) -> Self {
        let sessions = connector
            .configured_sources()
            .into_iter()
            .map(|source| (source, OnceCell::new()))
            .collect();
        Self {
            connector,
            sessions,
        }
    }

    /// Configured sources in context order.
    pub fn configured_sources(&self) -> Vec<SearchSource> {
        SearchSource::ALL
            .into_iter()
            .filter(|source| self.sessions.contains_key(source))
            .collect()
    }

    pub fn has_configured_sources(&self) -> bool {
        !self.sessions.is_empty()
    }

    /// Returns the session for `source`, connecting on first use.
    ///
    /// # Errors
    ///
    /// `Config` for a source without a back-end, or the connect failure.
    pub async fn session(&self, source: SearchSource) -> Result<Arc<dyn ToolSession>> {
        let cell = self.sessions.get(&source).ok_or_else(|| {
            HatchupError::config(format!("{} is not configured", source.server_name()))
        })?;
        let session = cell
            .get_or_try_init(|| async {
                tracing::debug!("[ToolRegistry] Opening session for {}", source.server_name());
                self.connector.connect(source).await
            })
            .await?;
        Ok(session.clone())
    }
}
