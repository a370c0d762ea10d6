//! Analysis workspace domain model.
//!
//! A [`Workspace`] is the per-owner collection of [`AnalysisRecord`]s plus the
//! active-record pointer. All mutation goes through methods on these types so
//! the derived-artifact invalidation cascade and the pointer invariant live in
//! one place.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{HatchupError, Result};

/// Title shown when neither an explicit title nor a startup name exists.
pub const UNTITLED_ANALYSIS: &str = "Untitled Analysis";

/// Lifecycle of an analysis record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// Deck present (or not yet), derived artifacts incomplete.
    #[default]
    Draft,
    /// Memo and insights were written together.
    Completed,
}

/// The structured pitch-deck document extracted from an uploaded file.
///
/// The schema belongs to the extraction collaborator, so the deck is kept as a
/// JSON object. Only `startup_name` is interpreted here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deck(Map<String, Value>);

impl Deck {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Builds a deck from an arbitrary JSON value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the value is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(HatchupError::invalid_input(format!(
                "Deck must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// The trimmed startup name, if the deck carries a non-empty one.
    pub fn startup_name(&self) -> Option<&str> {
        self.0
            .get("startup_name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// One message of a research transcript.
///
/// Unknown fields sent by clients are preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResearchMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            extra: Map::new(),
        }
    }
}

/// One owner-scoped unit of deck + derived memo/insights/research.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub analysis_id: String,
    pub owner_id: String,
    pub title: Option<String>,
    pub deck: Option<Deck>,
    pub insights: Option<Value>,
    pub memo: Option<Value>,
    pub research: Vec<ResearchMessage>,
    pub status: AnalysisStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisRecord {
    /// Creates an empty draft record.
    pub fn new_draft(
        analysis_id: impl Into<String>,
        owner_id: impl Into<String>,
        title: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            analysis_id: analysis_id.into(),
            owner_id: owner_id.into(),
            title: title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            deck: None,
            insights: None,
            memo: None,
            research: Vec::new(),
            status: AnalysisStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn startup_name(&self) -> Option<&str> {
        self.deck.as_ref().and_then(Deck::startup_name)
    }

    /// Title resolution: explicit title, then deck-derived name, then the
    /// untitled placeholder.
    pub fn display_title(&self) -> String {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or_else(|| self.startup_name())
            .unwrap_or(UNTITLED_ANALYSIS)
            .to_string()
    }

    pub fn has_deck(&self) -> bool {
        self.deck.as_ref().is_some_and(|deck| !deck.is_empty())
    }

    /// Replaces the deck and invalidates every derived artifact.
    pub fn apply_deck(&mut self, deck: Deck, now: DateTime<Utc>) {
        self.deck = Some(deck);
        self.memo = None;
        self.insights = None;
        self.research.clear();
        self.status = AnalysisStatus::Draft;
        self.updated_at = now;
    }

    /// Writes memo and insights together, completing the record.
    pub fn apply_memo_and_insights(&mut self, memo: Value, insights: Value, now: DateTime<Utc>) {
        self.memo = Some(memo);
        self.insights = Some(insights);
        self.status = AnalysisStatus::Completed;
        self.updated_at = now;
    }

    /// Replaces the research transcript. No other artifact is touched.
    pub fn apply_research(&mut self, messages: Vec<ResearchMessage>, now: DateTime<Utc>) {
        self.research = messages;
        self.updated_at = now;
    }

    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            analysis_id: self.analysis_id.clone(),
            title: self.display_title(),
            startup_name: self.startup_name().map(str::to_string),
            created_at: self.created_at,
            has_deck: self.has_deck(),
            status: self.status,
        }
    }

    pub fn view(&self) -> AnalysisView {
        AnalysisView {
            analysis_id: self.analysis_id.clone(),
            title: self.display_title(),
            deck: self.deck.clone(),
            insights: self.insights.clone().unwrap_or_else(empty_object),
            memo: self.memo.clone().unwrap_or_else(empty_object),
            research: self.research.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// List entry for an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub analysis_id: String,
    pub title: String,
    pub startup_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub has_deck: bool,
    pub status: AnalysisStatus,
}

/// Read-side rendering of one record.
///
/// Absent memo and insights render as `{}` so clients never branch on null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisView {
    pub analysis_id: String,
    pub title: String,
    pub deck: Option<Deck>,
    pub insights: Value,
    pub memo: Value,
    pub research: Vec<ResearchMessage>,
    pub status: AnalysisStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-owner collection of analysis records with an active pointer.
///
/// Invariant (after [`Workspace::heal`] and every mutating method):
/// `analyses` is non-empty and `active_analysis_id` is one of its keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub owner_id: String,
    pub analyses: BTreeMap<String, AnalysisRecord>,
    pub active_analysis_id: String,
}

impl Workspace {
    /// A fresh workspace holding one empty draft record.
    pub fn bootstrap(owner_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        let owner_id = owner_id.into();
        let analysis_id = new_analysis_id();
        let record = AnalysisRecord::new_draft(&analysis_id, &owner_id, None, now);
        let mut analyses = BTreeMap::new();
        analyses.insert(analysis_id.clone(), record);
        Self {
            owner_id,
            analyses,
            active_analysis_id: analysis_id,
        }
    }

    /// Restores the pointer invariant.
    ///
    /// An empty workspace gets a new draft record; a dangling pointer moves to
    /// the most recently created record. Returns `true` if anything changed.
    pub fn heal(&mut self, now: DateTime<Utc>) -> bool {
        if self.analyses.is_empty() {
            let analysis_id = self.insert_draft(None, now);
            self.active_analysis_id = analysis_id;
            return true;
        }
        if self.analyses.contains_key(&self.active_analysis_id) {
            return false;
        }
        if let Some(latest) = self.latest_analysis_id() {
            self.active_analysis_id = latest.to_string();
        }
        true
    }

    /// Stamps `owner_id` on the workspace and every record.
    pub fn assign_owner(&mut self, owner_id: &str) -> bool {
        let mut changed = self.owner_id != owner_id;
        self.owner_id = owner_id.to_string();
        for record in self.analyses.values_mut() {
            if record.owner_id != owner_id {
                record.owner_id = owner_id.to_string();
                changed = true;
            }
        }
        changed
    }

    pub fn contains(&self, analysis_id: &str) -> bool {
        self.analyses.contains_key(analysis_id)
    }

    pub fn record(&self, analysis_id: &str) -> Option<&AnalysisRecord> {
        self.analyses.get(analysis_id)
    }

    pub fn active_record(&self) -> Option<&AnalysisRecord> {
        self.analyses.get(&self.active_analysis_id)
    }

    /// Id of the most recently created record.
    pub fn latest_analysis_id(&self) -> Option<&str> {
        self.analyses
            .values()
            .max_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.analysis_id.cmp(&b.analysis_id))
            })
            .map(|record| record.analysis_id.as_str())
    }

    /// Appends an empty draft record and makes it active.
    pub fn create_analysis(&mut self, title: Option<String>, now: DateTime<Utc>) -> String {
        let analysis_id = self.insert_draft(title, now);
        self.active_analysis_id = analysis_id.clone();
        analysis_id
    }

    /// Moves the active pointer.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `analysis_id` is not one of this owner's records.
    pub fn set_active(&mut self, analysis_id: &str) -> Result<()> {
        if !self.contains(analysis_id) {
            return Err(HatchupError::not_found("Analysis", analysis_id));
        }
        self.active_analysis_id = analysis_id.to_string();
        Ok(())
    }

    pub fn update_deck(
        &mut self,
        analysis_id: &str,
        deck: Deck,
        now: DateTime<Utc>,
    ) -> Result<&AnalysisRecord> {
        let record = self.record_mut(analysis_id)?;
        record.apply_deck(deck, now);
        Ok(&*record)
    }

    pub fn update_memo_and_insights(
        &mut self,
        analysis_id: &str,
        memo: Value,
        insights: Value,
        now: DateTime<Utc>,
    ) -> Result<&AnalysisRecord> {
        let record = self.record_mut(analysis_id)?;
        record.apply_memo_and_insights(memo, insights, now);
        Ok(&*record)
    }

    pub fn update_research(
        &mut self,
        analysis_id: &str,
        messages: Vec<ResearchMessage>,
        now: DateTime<Utc>,
    ) -> Result<&AnalysisRecord> {
        let record = self.record_mut(analysis_id)?;
        record.apply_research(messages, now);
        Ok(&*record)
    }

    /// Summaries ordered by `created_at`, newest first.
    pub fn summaries(&self) -> Vec<AnalysisSummary> {
        let mut records: Vec<&AnalysisRecord> = self.analyses.values().collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.analysis_id.cmp(&a.analysis_id))
        });
        records.into_iter().map(AnalysisRecord::summary).collect()
    }

    fn record_mut(&mut self, analysis_id: &str) -> Result<&mut AnalysisRecord> {
        self.analyses
            .get_mut(analysis_id)
            .ok_or_else(|| HatchupError::not_found("Analysis", analysis_id))
    }

    fn insert_draft(&mut self, title: Option<String>, now: DateTime<Utc>) -> String {
        let analysis_id = new_analysis_id();
        let record = AnalysisRecord::new_draft(&analysis_id, &self.owner_id, title, now);
        self.analyses.insert(analysis_id.clone(), record);
        analysis_id
    }
}

/// Generates a fresh analysis id.
pub fn new_analysis_id() -> String {
    Uuid::new_v4().to_string()
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
