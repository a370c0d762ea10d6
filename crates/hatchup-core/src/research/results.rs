use std::collections::BTreeMap;

use serde::{Serialize, Serializer, ser::SerializeMap};

use super::source::SearchSource;

/// Outcome of one source call during fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Success(String),
    /// Failure already rendered as `"[<Label> error: <reason>]"`.
    Failure(String),
}

impl SourceOutcome {
    pub fn failure(source: SearchSource, reason: impl std::fmt::Display) -> Self {
        SourceOutcome::Failure(format!("[{} error: {}]", source.label(), reason))
    }

    pub fn text(&self) -> &str {
        match self {
            SourceOutcome::Success(text) | SourceOutcome::Failure(text) => text,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SourceOutcome::Failure(_))
    }
}

/// Per-source results of one fan-out. Serializes as `{key: text}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutResults {
    entries: BTreeMap<SearchSource, SourceOutcome>,
}

impl FanoutResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: SearchSource, outcome: SourceOutcome) {
        self.entries.insert(source, outcome);
    }

    pub fn get(&self, source: SearchSource) -> Option<&SourceOutcome> {
        self.entries.get(&source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.entries.values().filter(|o| o.is_failure()).count()
    }

    /// Entries in source order.
    pub fn iter(&self) -> impl Iterator<Item = (SearchSource, &SourceOutcome)> {
        self.entries.iter().map(|(source, outcome)| (*source, outcome))
    }

    /// Applies `f` to every text, keeping keys and outcome kinds.
    pub fn map_text(&self, f: impl Fn(&str) -> String) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|(source, outcome)| {
                let mapped = match outcome {
                    SourceOutcome::Success(text) => SourceOutcome::Success(f(text)),
                    SourceOutcome::Failure(text) => SourceOutcome::Failure(f(text)),
                };
                (*source, mapped)
            })
            .collect();
        Self { entries }
    }
}

impl Serialize for FanoutResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (source, outcome) in &self.entries {
            map.serialize_entry(source.key(), outcome.text())?;
        }
        map.end()
    }
}
