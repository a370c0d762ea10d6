//! Workspace DTOs
//!
//! Persisted layouts of an owner's analysis workspace. All fields are lenient
//! on read: missing, null or wrongly typed values fall back to defaults, and a
//! record entry that is not an object reads as an empty record.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use hatchup_core::analysis::{AnalysisRecord, AnalysisStatus, Deck, ResearchMessage, Workspace};

/// Latest workspace schema version.
pub const WORKSPACE_SCHEMA_VERSION: &str = "2.0.0";

// ============================================================================
// V1.0.0: legacy single-record layout
// ============================================================================

/// One analysis stored directly at the document root.
///
/// `data` holds the deck and `summary` holds the insights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyWorkspaceV1_0_0 {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub summary: Option<Value>,
    #[serde(default)]
    pub memo: Option<Value>,
    #[serde(default, deserialize_with = "lenient_array")]
    pub research: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_at: Option<String>,
}

// ============================================================================
// V2.0.0: canonical multi-record layout
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecordV2_0_0 {
    #[serde(default, deserialize_with = "lenient_string")]
    pub analysis_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub owner_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(default)]
    pub deck: Option<Value>,
    #[serde(default)]
    pub insights: Option<Value>,
    #[serde(default)]
    pub memo: Option<Value>,
    #[serde(default, deserialize_with = "lenient_array")]
    pub research: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceV2_0_0 {
    #[serde(default, deserialize_with = "lenient_string")]
    pub schema_version: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub owner_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub active_analysis_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub analyses: BTreeMap<String, AnalysisRecordV2_0_0>,
}

// ============================================================================
// Lenient field readers
// ============================================================================

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}

fn lenient_array<'de, D>(deserializer: D) -> Result<Option<Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(items)),
        _ => Ok(None),
    }
}

fn lenient_records<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, AnalysisRecordV2_0_0>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(entries) = Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(entries
        .into_iter()
        .map(|(key, entry)| {
            // Every field is lenient, so only non-object entries fail here.
            let record: AnalysisRecordV2_0_0 = serde_json::from_value(entry).unwrap_or_default();
            (key, record)
        })
        .collect())
}

// ============================================================================
// Domain conversions
// ============================================================================

impl AnalysisRecordV2_0_0 {
    /// Converts to the domain record, filling gaps from `key`, `owner_id`
    /// and `now`.
    pub fn into_domain(self, key: &str, owner_id: &str, now: DateTime<Utc>) -> AnalysisRecord {
        let created_at = parse_timestamp(self.created_at.as_deref()).unwrap_or(now);
        let updated_at = parse_timestamp(self.updated_at.as_deref()).unwrap_or(created_at);
        AnalysisRecord {
            analysis_id: key.to_string(),
            owner_id: owner_id.to_string(),
            title: self.title,
            deck: self.deck.and_then(|value| Deck::from_value(value).ok()),
            insights: self.insights.filter(|v| !v.is_null()),
            memo: self.memo.filter(|v| !v.is_null()),
            research: research_into_domain(self.research),
            status: match self.status.as_deref() {
                Some("completed") => AnalysisStatus::Completed,
                _ => AnalysisStatus::Draft,
            },
            created_at,
            updated_at,
        }
    }

    pub fn from_domain(record: &AnalysisRecord) -> Self {
        Self {
            analysis_id: Some(record.analysis_id.clone()),
            owner_id: Some(record.owner_id.clone()),
            title: record.title.clone(),
            deck: record.deck.as_ref().map(Deck::to_value),
            insights: record.insights.clone(),
            memo: record.memo.clone(),
            research: Some(
                record
                    .research
                    .iter()
                    .filter_map(|message| serde_json::to_value(message).ok())
                    .collect(),
            ),
            status: Some(
                match record.status {
                    AnalysisStatus::Draft => "draft",
                    AnalysisStatus::Completed => "completed",
                }
                .to_string(),
            ),
            created_at: Some(format_timestamp(record.created_at)),
            updated_at: Some(format_timestamp(record.updated_at)),
        }
    }
}

impl WorkspaceV2_0_0 {
    /// Converts to the domain workspace. The result may still violate the
    /// pointer invariant; callers heal it.
    pub fn into_domain(self, owner_id: &str, now: DateTime<Utc>) -> Workspace {
        let analyses = self
            .analyses
            .into_iter()
            .map(|(key, record)| {
                let record = record.into_domain(&key, owner_id, now);
                (key, record)
            })
            .collect();
        Workspace {
            owner_id: owner_id.to_string(),
            analyses,
            active_analysis_id: self.active_analysis_id.unwrap_or_default(),
        }
    }

    pub fn from_domain(workspace: &Workspace) -> Self {
        Self {
            schema_version: Some(WORKSPACE_SCHEMA_VERSION.to_string()),
            owner_id: Some(workspace.owner_id.clone()),
            active_analysis_id: Some(workspace.active_analysis_id.clone()),
            analyses: workspace
                .analyses
                .iter()
                .map(|(key, record)| (key.clone(), AnalysisRecordV2_0_0::from_domain(record)))
                .collect(),
        }
    }
}

/// Timestamps are RFC 3339 in UTC with as many fractional digits as needed.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn research_into_domain(raw: Option<Vec<Value>>) -> Vec<ResearchMessage> {
    raw.unwrap_or_default()
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect()
}
