//! Wires configuration into concrete adapters.

use std::sync::Arc;

use anyhow::Context;

use hatchup_application::{
    AnalysisService, ChatUseCase, OrchestratorSettings, ResearchOrchestrator, SearchCache,
    ToolRegistry,
};
use hatchup_core::analysis::WorkspaceStorage;
use hatchup_core::clock::{Clock, SystemClock};
use hatchup_core::completion::CompletionService;
use hatchup_infrastructure::{
    AnalysisWorkspaceStore, AppConfig, FileWorkspaceStorage, InMemoryWorkspaceStorage,
};
use hatchup_interaction::{
    CompletionDeckAnalyzer, HttpToolConnector, OpenAiCompatibleCompletion, PlainTextExtractor,
    SupabaseIdentityProvider,
};

use super::state::AppState;
use crate::identity::IdentityResolver;

/// Builds every process-wide component from `config`.
///
/// Missing credentials do not fail here; the adapter that needs them returns a
/// configuration error on first use.
///
/// # Errors
///
/// Fails if the data directory cannot be created or the migration chain is
/// malformed.
pub async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let storage: Arc<dyn WorkspaceStorage> = if config.storage.in_memory {
        tracing::warn!("[bootstrap] Using in-memory workspace storage");
        Arc::new(InMemoryWorkspaceStorage::new())
    } else {
        let data_dir = config.data_dir()?;
        let storage = FileWorkspaceStorage::new(&data_dir)
            .await
            .with_context(|| format!("opening workspace storage at {}", data_dir.display()))?;
        tracing::info!("[bootstrap] Workspaces stored in {}", storage.workspaces_dir().display());
        Arc::new(storage)
    };
    let store = Arc::new(AnalysisWorkspaceStore::new(storage, clock.clone())?);

    if config.completion.api_key.is_none() {
        tracing::warn!("[bootstrap] GROQ_API_KEY is not set; completion calls will fail");
    }
    let completion: Arc<dyn CompletionService> =
        Arc::new(OpenAiCompatibleCompletion::new(config.completion.clone()));

    let analysis = Arc::new(AnalysisService::new(
        store,
        Arc::new(PlainTextExtractor),
        Arc::new(CompletionDeckAnalyzer::new(completion.clone())),
    ));

    let connector = HttpToolConnector::from_config(&config.research);
    let registry = Arc::new(ToolRegistry::new(Arc::new(connector)));
    tracing::info!(
        "[bootstrap] Research sources configured: {:?}",
        registry.configured_sources()
    );
    let cache = Arc::new(SearchCache::new(config.research.cache_ttl(), clock));
    let orchestrator = Arc::new(ResearchOrchestrator::new(
        registry,
        cache,
        OrchestratorSettings {
            call_timeout: config.research.call_timeout(),
            max_source_chars: config.research.max_source_chars,
        },
    ));

    let chat = Arc::new(ChatUseCase::new(
        analysis.clone(),
        orchestrator,
        completion,
    ));

    let identity = Arc::new(IdentityResolver::new(
        Arc::new(SupabaseIdentityProvider::new(config.identity.clone())),
        config.server.allow_anonymous,
    ));

    Ok(AppState::new(analysis, chat, identity))
}
