//! Document ingestion collaborator contracts.

use async_trait::async_trait;

use crate::analysis::Deck;
use crate::error::Result;

/// Plain text pulled out of an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub text: String,
    /// Set when the extractor returned an error message instead of content.
    pub low_confidence: bool,
}

impl ExtractedDocument {
    /// Wraps extractor output, flagging error text as low confidence.
    pub fn from_extractor_output(text: String) -> Self {
        let trimmed = text.trim_start();
        let low_confidence = trimmed.is_empty()
            || trimmed.starts_with("Error")
            || trimmed.starts_with("[Error")
            || trimmed.to_ascii_lowercase().starts_with("extraction failed");
        Self {
            text,
            low_confidence,
        }
    }
}

/// Raw bytes plus filename to plain text.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract_text(&self, bytes: &[u8], filename: &str) -> Result<ExtractedDocument>;
}

/// Plain text to a structured deck.
#[async_trait]
pub trait DeckAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<Deck>;
}
