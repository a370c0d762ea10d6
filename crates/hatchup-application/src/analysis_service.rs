//! Analysis Service
//!
//! Owner-facing analysis operations: create/select/list, document ingestion
//! and persistence of artifacts produced elsewhere (memo, insights, research).

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use hatchup_core::analysis::{AnalysisRecord, AnalysisSummary, AnalysisView, Deck, ResearchMessage};
use hatchup_core::document::{DeckAnalyzer, DocumentExtractor};
use hatchup_core::{HatchupError, Result};
use hatchup_infrastructure::AnalysisWorkspaceStore;

/// Listing of an owner's analyses plus the resolved active one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisListing {
    pub active_analysis_id: String,
    pub analyses: Vec<AnalysisSummary>,
    pub active_analysis: AnalysisView,
}

/// Result of ingesting one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub analysis_id: String,
    pub deck: Deck,
    /// The extractor returned an error message rather than document text.
    pub low_confidence: bool,
}

pub struct AnalysisService {
    store: Arc<AnalysisWorkspaceStore>,
    extractor: Arc<dyn DocumentExtractor>,
    analyzer: Arc<dyn DeckAnalyzer>,
}

impl AnalysisService {
    pub fn new(
        store: Arc<AnalysisWorkspaceStore>,
        extractor: Arc<dyn DocumentExtractor>,
        analyzer: Arc<dyn DeckAnalyzer>,
    ) -> Self {
        Self {
            store,
            extractor,
            analyzer,
        }
    }

    /// Creates a new draft analysis and makes it active.
    pub async fn create(&self, owner_id: &str, title: Option<String>) -> Result<AnalysisRecord> {
        self.store.create(owner_id, title).await
    }

    /// Selects an existing analysis.
    ///
    /// # Errors
    ///
    /// `NotFound` if `analysis_id` is not one of the owner's records.
    pub async fn select(&self, owner_id: &str, analysis_id: &str) -> Result<AnalysisRecord> {
        let analysis_id = analysis_id.trim();
        if analysis_id.is_empty() {
            return Err(HatchupError::invalid_input("analysis_id is required"));
        }
        self.store.set_active(owner_id, analysis_id).await
    }

    pub async fn list(&self, owner_id: &str, hint_id: Option<&str>) -> Result<AnalysisListing> {
        let active = self.store.get_or_create_active(owner_id, hint_id).await?;
        let analyses = self.store.list(owner_id).await?;
        Ok(AnalysisListing {
            active_analysis_id: active.analysis_id.clone(),
            analyses,
            active_analysis: active.view(),
        })
    }

    /// Resolves the active analysis, honoring `hint_id` when it is owned.
    pub async fn active(&self, owner_id: &str, hint_id: Option<&str>) -> Result<AnalysisRecord> {
        self.store.get_or_create_active(owner_id, hint_id).await
    }

    /// Extracts text, turns it into a deck and writes it to the active record.
    ///
    /// Writing the deck clears memo, insights and research. Extractor error
    /// text is still analyzed; the outcome is flagged `low_confidence`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: empty upload or unsupported format
    /// - `CompletionService` / `Config`: deck analysis failed
    /// - store failures
    pub async fn ingest_document(
        &self,
        owner_id: &str,
        hint_id: Option<&str>,
        bytes: &[u8],
        filename: &str,
    ) -> Result<IngestOutcome> {
        if bytes.is_empty() {
            return Err(HatchupError::invalid_input("Uploaded file is empty"));
        }

        let document = self.extractor.extract_text(bytes, filename).await?;
        if document.low_confidence {
            tracing::warn!(
                "[AnalysisService] Extraction of '{}' returned no usable text",
                filename
            );
        }

        let deck = self.analyzer.analyze(&document.text).await?;
        let active = self.store.get_or_create_active(owner_id, hint_id).await?;
        let record = self
            .store
            .update_deck(owner_id, &active.analysis_id, deck)
            .await?;

        tracing::info!(
            "[AnalysisService] Ingested '{}' into analysis {}",
            filename,
            record.analysis_id
        );
        Ok(IngestOutcome {
            analysis_id: record.analysis_id,
            deck: record.deck.unwrap_or_default(),
            low_confidence: document.low_confidence,
        })
    }

    /// Stores memo and insights on the active record and marks it completed.
    pub async fn save_memo_and_insights(
        &self,
        owner_id: &str,
        hint_id: Option<&str>,
        memo: Value,
        insights: Value,
    ) -> Result<AnalysisRecord> {
        let active = self.store.get_or_create_active(owner_id, hint_id).await?;
        self.store
            .update_memo_and_insights(owner_id, &active.analysis_id, memo, insights)
            .await
    }

    /// Replaces the active record's research transcript.
    pub async fn save_research(
        &self,
        owner_id: &str,
        hint_id: Option<&str>,
        messages: Vec<ResearchMessage>,
    ) -> Result<AnalysisRecord> {
        let active = self.store.get_or_create_active(owner_id, hint_id).await?;
        self.store
            .update_research(owner_id, &active.analysis_id, messages)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use hatchup_core::analysis::AnalysisStatus;
    use hatchup_core::clock::ManualClock;
    use hatchup_core::document::ExtractedDocument;
    use hatchup_infrastructure::InMemoryWorkspaceStorage;
    use serde_json::json;

    struct EchoExtractor;

    #[async_trait]
    impl DocumentExtractor for EchoExtractor {
        async fn extract_text(&self, bytes: &[u8], _filename: &str) -> Result<ExtractedDocument> {
            Ok(ExtractedDocument::from_extractor_output(
                String::from_utf8_lossy(bytes).into_owned(),
            ))
        }
    }

    /// Treats the extracted text as the deck's startup name.
    struct NameAnalyzer;

    #[async_trait]
    impl DeckAnalyzer for NameAnalyzer {
        async fn analyze(&self, text: &str) -> Result<Deck> {
            Deck::from_value(json!({"startup_name": text.trim(), "industry": "Fintech"}))
        }
    }

    fn service() -> (AnalysisService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = AnalysisWorkspaceStore::new(
            Arc::new(InMemoryWorkspaceStorage::new()),
            clock.clone(),
        )
        .unwrap();
        let service = AnalysisService::new(
            Arc::new(store),
            Arc::new(EchoExtractor),
            Arc::new(NameAnalyzer),
        );
        (service, clock)
    }

    #[tokio::test]
    async fn test_ingest_then_read_active_view() {
        let (service, _) = service();

        let outcome = service
            .ingest_document("owner-1", None, b"Acme", "deck.txt")
            .await
            .unwrap();
        assert_eq!(outcome.deck.startup_name(), Some("Acme"));
        assert!(!outcome.low_confidence);

        let view = service.active("owner-1", None).await.unwrap().view();
        assert_eq!(view.analysis_id, outcome.analysis_id);
        assert_eq!(view.title, "Acme");
        assert_eq!(view.deck.unwrap().startup_name(), Some("Acme"));
        assert_eq!(view.memo, json!({}));
        assert_eq!(view.insights, json!({}));
        assert!(view.research.is_empty());
    }

    #[tokio::test]
    async fn test_reingest_invalidates_derived_artifacts() {
        let (service, _) = service();
        service
            .ingest_document("owner-1", None, b"Acme", "deck.txt")
            .await
            .unwrap();
        service
            .save_memo_and_insights("owner-1", None, json!({"verdict": "pass"}), json!({"risk": "high"}))
            .await
            .unwrap();
        let researched = service
            .save_research("owner-1", None, vec![ResearchMessage::new("user", "who competes?")])
            .await
            .unwrap();
        assert_eq!(researched.status, AnalysisStatus::Completed);
        assert_eq!(researched.research.len(), 1);

        service
            .ingest_document("owner-1", None, b"Acme v2", "deck.md")
            .await
            .unwrap();

        let record = service.active("owner-1", None).await.unwrap();
        assert_eq!(record.memo, None);
        assert_eq!(record.insights, None);
        assert!(record.research.is_empty());
        assert_eq!(record.status, AnalysisStatus::Draft);
    }

    #[tokio::test]
    async fn test_extractor_error_text_is_low_confidence() {
        let (service, _) = service();
        let outcome = service
            .ingest_document("owner-1", None, b"Error: could not parse PDF", "deck.txt")
            .await
            .unwrap();
        assert!(outcome.low_confidence);
    }

    #[tokio::test]
    async fn test_empty_upload_is_invalid_input() {
        let (service, _) = service();
        let err = service
            .ingest_document("owner-1", None, b"", "deck.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, HatchupError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_listing_follows_hint_and_orders_newest_first() {
        let (service, clock) = service();
        let first = service.active("owner-1", None).await.unwrap();
        clock.advance(Duration::seconds(5));
        let second = service
            .create("owner-1", Some("Second look".into()))
            .await
            .unwrap();

        let listing = service
            .list("owner-1", Some(&first.analysis_id))
            .await
            .unwrap();
        assert_eq!(listing.active_analysis_id, first.analysis_id);
        assert_eq!(listing.active_analysis.analysis_id, first.analysis_id);
        let ids: Vec<_> = listing.analyses.iter().map(|s| s.analysis_id.as_str()).collect();
        assert_eq!(ids, vec![second.analysis_id.as_str(), first.analysis_id.as_str()]);
        assert_eq!(listing.analyses[1].title, "Untitled Analysis");
    }

    #[tokio::test]
    async fn test_foreign_hint_falls_back_to_latest() {
        let (service, _) = service();
        let other = service.active("owner-2", None).await.unwrap();
        let mine = service.active("owner-1", Some(&other.analysis_id)).await.unwrap();
        assert_ne!(mine.analysis_id, other.analysis_id);
        assert_eq!(mine.owner_id, "owner-1");
    }

    #[tokio::test]
    async fn test_select_unknown_analysis_is_not_found() {
        let (service, _) = service();
        let err = service.select("owner-1", "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
