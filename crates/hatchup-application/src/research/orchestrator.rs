//! Concurrent multi-source research.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use hatchup_core::research::{FanoutResults, SearchSource, SourceOutcome};
use hatchup_core::{HatchupError, Result};

use super::cache::SearchCache;
use super::heuristic;
use super::registry::ToolRegistry;
use super::sanitize::{build_context, sanitize_results};

/// Tunables for [`ResearchOrchestrator`].
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    pub call_timeout: Duration,
    pub max_source_chars: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(8),
            max_source_chars: 2200,
        }
    }
}

/// Result of one research pass, ready for prompting.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchOutcome {
    /// Sanitized per-source text.
    pub results: FanoutResults,
    pub context: String,
    pub cached: bool,
}

/// Fans a query out to every registered search source.
///
/// Each call is bounded by its own timeout and fails independently; the
/// aggregate always holds one entry per registered source, with unconfigured
/// sources reported as failures. Raw aggregates are
/// cached by normalized query and sanitized on the way out.
pub struct ResearchOrchestrator {
    registry: Arc<ToolRegistry>,
    cache: Arc<SearchCache>,
    settings: OrchestratorSettings,
}

impl ResearchOrchestrator {
    pub fn new(
        registry: Arc<ToolRegistry>,
        cache: Arc<SearchCache>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            registry,
            cache,
            settings,
        }
    }

    pub fn should_run_live_search(&self, query: &str) -> bool {
        heuristic::should_run_live_search(query)
    }

    /// Issues one call per registered source concurrently.
    ///
    /// # Errors
    ///
    /// `OrchestratorUnavailable` if no source is configured at all. Individual
    /// source failures never surface as errors.
    pub async fn run_fanout(&self, query: &str) -> Result<FanoutResults> {
        if !self.registry.has_configured_sources() {
            return Err(HatchupError::OrchestratorUnavailable(
                "no tool back-ends configured".to_string(),
            ));
        }

        let calls = SearchSource::ALL.into_iter().map(|source| async move {
            let outcome = self.call_source(source, query).await;
            (source, outcome)
        });

        let mut results = FanoutResults::new();
        for (source, outcome) in join_all(calls).await {
            results.insert(source, outcome);
        }

        tracing::info!(
            sources = results.len(),
            failures = results.failure_count(),
            "[ResearchOrchestrator] Fan-out finished"
        );
        Ok(results)
    }

    async fn call_source(&self, source: SearchSource, query: &str) -> SourceOutcome {
        let timeout = self.settings.call_timeout;
        let call = async {
            let session = self.registry.session(source).await?;
            session
                .call_tool(source.tool_name(), source.arguments(query))
                .await
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(text)) => SourceOutcome::Success(text),
            Ok(Err(err)) => {
                tracing::warn!(
                    source = source.key(),
                    "[ResearchOrchestrator] Source failed: {}",
                    err
                );
                SourceOutcome::failure(source, failure_reason(&err))
            }
            Err(_) => {
                tracing::warn!(
                    source = source.key(),
                    "[ResearchOrchestrator] Source timed out after {:?}",
                    timeout
                );
                SourceOutcome::failure(
                    source,
                    format!("timed out after {}s", timeout.as_secs_f32()),
                )
            }
        }
    }

    /// Cache-aware fan-out followed by sanitization and context assembly.
    pub async fn research(&self, query: &str) -> Result<ResearchOutcome> {
        let (raw, cached) = match self.cache.get(query).await {
            Some(hit) => {
                tracing::debug!("[ResearchOrchestrator] Cache hit");
                (hit, true)
            }
            None => {
                let fresh = self.run_fanout(query).await?;
                self.cache.put(query, fresh.clone()).await;
                (fresh, false)
            }
        };

        let results = sanitize_results(&raw, self.settings.max_source_chars);
        let context = build_context(&results);
        Ok(ResearchOutcome {
            results,
            context,
            cached,
        })
    }
}

fn failure_reason(err: &HatchupError) -> String {
    match err {
        HatchupError::ToolUnavailable { reason, .. } => reason.clone(),
        HatchupError::Config(message) => message.clone(),
        other => other.to_string(),
    }
}
