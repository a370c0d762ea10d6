//! Workspace document migrations.
//!
//! ### Version history
//! - **0.0.0**: nothing stored, or an object without any analysis content
//! - **1.0.0**: legacy single record at the document root
//!   (`data`, `summary`, `memo`, `research`, timestamps)
//! - **2.0.0**: canonical `{active_analysis_id, analyses: {id: record}}`

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use semver::Version;
use serde_json::{Value, json};

use hatchup_core::analysis::new_analysis_id;
use hatchup_core::clock::Clock;

use super::registry::MigrationRegistry;
use super::traits::{Migration, TypedMigration};
use crate::dto::{
    AnalysisRecordV2_0_0, LegacyWorkspaceV1_0_0, WORKSPACE_SCHEMA_VERSION, WorkspaceV2_0_0,
    format_timestamp,
};

const LEGACY_KEYS: [&str; 4] = ["data", "summary", "memo", "research"];

/// Determines which schema version a raw document was written under.
///
/// An explicit `schema_version` wins. Unversioned documents are classified by
/// shape: a non-empty `analyses` object is canonical, any populated legacy
/// field is legacy, everything else counts as empty.
///
/// # Errors
///
/// Fails if `schema_version` is present but not a valid semver string.
pub fn detect_version(raw: &Value) -> Result<Version> {
    let Some(map) = raw.as_object() else {
        return Ok(Version::new(0, 0, 0));
    };

    if let Some(declared) = map.get("schema_version").and_then(Value::as_str) {
        return Version::parse(declared)
            .with_context(|| format!("Invalid schema_version '{}'", declared));
    }

    let has_records = map
        .get("analyses")
        .and_then(Value::as_object)
        .is_some_and(|analyses| !analyses.is_empty());
    if has_records {
        return Ok(Version::new(2, 0, 0));
    }

    if LEGACY_KEYS.iter().any(|key| map.get(*key).is_some_and(is_populated)) {
        return Ok(Version::new(1, 0, 0));
    }

    Ok(Version::new(0, 0, 0))
}

fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        Value::Number(_) => true,
    }
}

// ============================================================================
// 0.0.0 -> 1.0.0
// ============================================================================

/// Treats an empty document as a blank legacy record.
#[derive(Debug, Default)]
pub struct BootstrapEmptyWorkspace;

impl Migration for BootstrapEmptyWorkspace {
    fn from_version(&self) -> Version {
        Version::new(0, 0, 0)
    }

    fn to_version(&self) -> Version {
        Version::new(1, 0, 0)
    }

    fn description(&self) -> &str {
        "bootstrap empty workspace as a blank legacy record"
    }
}

impl TypedMigration<Value, Value> for BootstrapEmptyWorkspace {
    fn migrate(&self, _from: Value) -> Result<Value> {
        Ok(json!({ "schema_version": "1.0.0" }))
    }
}

// ============================================================================
// 1.0.0 -> 2.0.0
// ============================================================================

/// Wraps the legacy root record as the single entry of a multi-record
/// workspace, keyed by a fresh id and marked active.
pub struct WrapLegacyRecord {
    clock: Arc<dyn Clock>,
}

impl WrapLegacyRecord {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl fmt::Debug for WrapLegacyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapLegacyRecord").finish_non_exhaustive()
    }
}

impl Migration for WrapLegacyRecord {
    fn from_version(&self) -> Version {
        Version::new(1, 0, 0)
    }

    fn to_version(&self) -> Version {
        Version::new(2, 0, 0)
    }

    fn description(&self) -> &str {
        "wrap legacy single record into the multi-record layout"
    }
}

impl TypedMigration<Value, Value> for WrapLegacyRecord {
    fn migrate(&self, from: Value) -> Result<Value> {
        let legacy: LegacyWorkspaceV1_0_0 =
            serde_json::from_value(from).context("Legacy workspace is not an object")?;

        let now = format_timestamp(self.clock.now());
        let analysis_id = new_analysis_id();
        let completed = legacy.memo.as_ref().is_some_and(is_populated)
            && legacy.summary.as_ref().is_some_and(is_populated);
        let created_at = legacy.created_at.unwrap_or_else(|| now.clone());

        let record = AnalysisRecordV2_0_0 {
            analysis_id: Some(analysis_id.clone()),
            owner_id: None,
            title: None,
            deck: legacy.data,
            insights: legacy.summary,
            memo: legacy.memo,
            research: Some(legacy.research.unwrap_or_default()),
            status: Some(if completed { "completed" } else { "draft" }.to_string()),
            updated_at: Some(legacy.updated_at.unwrap_or_else(|| created_at.clone())),
            created_at: Some(created_at),
        };

        let workspace = WorkspaceV2_0_0 {
            schema_version: Some(WORKSPACE_SCHEMA_VERSION.to_string()),
            owner_id: None,
            active_analysis_id: Some(analysis_id.clone()),
            analyses: [(analysis_id, record)].into_iter().collect(),
        };
        Ok(serde_json::to_value(workspace)?)
    }
}

/// Builds the workspace migration chain `0.0.0 -> 1.0.0 -> 2.0.0`.
pub fn create_workspace_migrator(clock: Arc<dyn Clock>) -> Result<MigrationRegistry<Value>> {
    MigrationRegistry::new(Version::parse(WORKSPACE_SCHEMA_VERSION)?)
        .with_step(Arc::new(BootstrapEmptyWorkspace))?
        .with_step(Arc::new(WrapLegacyRecord::new(clock)))
}
