//! Persisted per-owner analysis workspaces.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use hatchup_core::analysis::{
    AnalysisRecord, AnalysisSummary, Deck, ResearchMessage, Workspace, WorkspaceStorage,
};
use hatchup_core::clock::Clock;
use hatchup_core::{HatchupError, Result};

use crate::dto::WorkspaceV2_0_0;
use crate::migration::{MigrationChain, MigrationRegistry, create_workspace_migrator, detect_version};

type OwnerLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Read-normalize-write store for analysis workspaces.
///
/// Every operation runs under an owner-scoped async lock: load the raw
/// document, migrate it to the canonical layout, apply the change to an
/// in-memory copy, then persist. A failed write leaves the stored document
/// untouched and the caller gets the error, so no partial record is ever
/// observable.
pub struct AnalysisWorkspaceStore {
    storage: Arc<dyn WorkspaceStorage>,
    clock: Arc<dyn Clock>,
    migrator: MigrationRegistry<Value>,
    owner_locks: OwnerLocks,
}

impl AnalysisWorkspaceStore {
    /// # Errors
    ///
    /// Fails only if the migration chain is malformed.
    pub fn new(storage: Arc<dyn WorkspaceStorage>, clock: Arc<dyn Clock>) -> Result<Self> {
        let migrator = create_workspace_migrator(clock.clone())?;
        Ok(Self {
            storage,
            clock,
            migrator,
            owner_locks: Mutex::new(HashMap::new()),
        })
    }

    // ============================================================================
    // Public operations
    // ============================================================================

    /// Loads the canonical workspace, migrating and persisting it first if the
    /// stored form is empty, legacy, or otherwise non-canonical.
    pub async fn load(&self, owner_id: &str) -> Result<Workspace> {
        let _lease = self.lock_owner(owner_id).await;
        self.load_normalized(owner_id).await
    }

    /// Appends an empty draft record, makes it active and returns it.
    pub async fn create(&self, owner_id: &str, title: Option<String>) -> Result<AnalysisRecord> {
        self.mutate(owner_id, |workspace, now| {
            let analysis_id = workspace.create_analysis(title, now);
            tracing::info!(
                "[AnalysisWorkspaceStore] Created analysis {} for {}",
                analysis_id,
                owner_id
            );
            active_clone(workspace)
        })
        .await
    }

    /// Moves the active pointer to `analysis_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the owner has no such record.
    pub async fn set_active(&self, owner_id: &str, analysis_id: &str) -> Result<AnalysisRecord> {
        self.mutate(owner_id, |workspace, _| {
            workspace.set_active(analysis_id)?;
            active_clone(workspace)
        })
        .await
    }

    /// Replaces the deck and clears every derived artifact.
    pub async fn update_deck(
        &self,
        owner_id: &str,
        analysis_id: &str,
        deck: Deck,
    ) -> Result<AnalysisRecord> {
        self.mutate(owner_id, |workspace, now| {
            workspace
                .update_deck(analysis_id, deck, now)
                .cloned()
        })
        .await
    }

    pub async fn update_memo_and_insights(
        &self,
        owner_id: &str,
        analysis_id: &str,
        memo: Value,
        insights: Value,
    ) -> Result<AnalysisRecord> {
        self.mutate(owner_id, |workspace, now| {
            workspace
                .update_memo_and_insights(analysis_id, memo, insights, now)
                .cloned()
        })
        .await
    }

    pub async fn update_research(
        &self,
        owner_id: &str,
        analysis_id: &str,
        messages: Vec<ResearchMessage>,
    ) -> Result<AnalysisRecord> {
        self.mutate(owner_id, |workspace, now| {
            workspace
                .update_research(analysis_id, messages, now)
                .cloned()
        })
        .await
    }

    /// Summaries, newest first.
    pub async fn list(&self, owner_id: &str) -> Result<Vec<AnalysisSummary>> {
        Ok(self.load(owner_id).await?.summaries())
    }

    /// Resolves "the current analysis" and makes it active.
    ///
    /// Resolution order: `hint_id` when present and owned, then the most
    /// recently created record. A workspace is never empty after
    /// normalization, so a fresh record is only created by the load itself.
    pub async fn get_or_create_active(
        &self,
        owner_id: &str,
        hint_id: Option<&str>,
    ) -> Result<AnalysisRecord> {
        let hint = hint_id.map(str::trim).filter(|id| !id.is_empty());
        self.mutate(owner_id, |workspace, now| {
            let target = match hint.filter(|id| workspace.contains(id)) {
                Some(id) => id.to_string(),
                None => match workspace.latest_analysis_id() {
                    Some(latest) => latest.to_string(),
                    None => workspace.create_analysis(None, now),
                },
            };
            workspace.set_active(&target)?;
            active_clone(workspace)
        })
        .await
    }

    // ============================================================================
    // Internals
    // ============================================================================

    /// Waits for exclusive access to `owner_id`'s workspace. The lock entry
    /// lives only while someone holds or waits on it.
    async fn lock_owner(&self, owner_id: &str) -> OwnerLease<'_> {
        let lock = {
            let mut locks = self.owner_locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(owner_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        let guard = lock.lock_owned().await;
        OwnerLease {
            locks: &self.owner_locks,
            owner_id: owner_id.to_string(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn tracked_owner_count(&self) -> usize {
        self.owner_locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Runs `apply` against a copy of the workspace and persists the result
    /// only if it succeeds and actually changed something.
    async fn mutate<T, F>(&self, owner_id: &str, apply: F) -> Result<T>
    where
        F: FnOnce(&mut Workspace, chrono::DateTime<chrono::Utc>) -> Result<T>,
    {
        let _lease = self.lock_owner(owner_id).await;

        let original = self.load_normalized(owner_id).await?;
        let mut workspace = original.clone();
        let output = apply(&mut workspace, self.clock.now())?;
        workspace.heal(self.clock.now());

        if workspace != original {
            self.persist(owner_id, &workspace).await?;
        }
        Ok(output)
    }

    async fn load_normalized(&self, owner_id: &str) -> Result<Workspace> {
        let raw = self.storage.read(owner_id).await?;
        let raw_value = raw.clone().unwrap_or(Value::Null);

        let version = detect_version(&raw_value)?;
        let migrated = self.migrator.migrate_to_latest(raw_value, &version)?;
        let dto: WorkspaceV2_0_0 = serde_json::from_value(migrated)?;

        let now = self.clock.now();
        let mut workspace = dto.into_domain(owner_id, now);
        workspace.assign_owner(owner_id);
        workspace.heal(now);

        let canonical = canonical_value(&workspace)?;
        if raw.as_ref() != Some(&canonical) {
            tracing::info!(
                "[AnalysisWorkspaceStore] Normalized workspace for {} (from schema {})",
                owner_id,
                version
            );
            self.storage.write(owner_id, &canonical).await?;
        }
        Ok(workspace)
    }

    async fn persist(&self, owner_id: &str, workspace: &Workspace) -> Result<()> {
        let canonical = canonical_value(workspace)?;
        self.storage.write(owner_id, &canonical).await.map_err(|e| {
            tracing::error!(
                "[AnalysisWorkspaceStore] Failed to persist workspace for {}: {}",
                owner_id,
                e
            );
            e
        })
    }
}

/// Held for the duration of one store operation.
struct OwnerLease<'a> {
    locks: &'a OwnerLocks,
    owner_id: String,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for OwnerLease<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Only the map's own handle left: nobody holds or waits on it.
        if locks
            .get(&self.owner_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.owner_id);
        }
    }
}

fn canonical_value(workspace: &Workspace) -> Result<Value> {
    Ok(serde_json::to_value(WorkspaceV2_0_0::from_domain(workspace))?)
}

fn active_clone(workspace: &Workspace) -> Result<AnalysisRecord> {
    workspace.active_record().cloned().ok_or_else(|| {
        HatchupError::internal(format!(
            "Active analysis {} missing after update",
            workspace.active_analysis_id
        ))
    })
}
