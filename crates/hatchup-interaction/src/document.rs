//! Document ingestion adapters: plain-text extraction and deck analysis.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use hatchup_core::analysis::Deck;
use hatchup_core::completion::{CompletionOptions, CompletionService, PromptMessage};
use hatchup_core::document::{DeckAnalyzer, DocumentExtractor, ExtractedDocument};
use hatchup_core::{HatchupError, Result};

const TEXT_EXTENSIONS: [&str; 4] = ["txt", "md", "csv", "json"];

/// Extracts text from plain-text uploads.
///
/// Binary formats (PDF, slides, images) belong to an external extraction
/// service and are rejected here.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

#[async_trait]
impl DocumentExtractor for PlainTextExtractor {
    async fn extract_text(&self, bytes: &[u8], filename: &str) -> Result<ExtractedDocument> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !TEXT_EXTENSIONS.contains(&extension.as_str()) {
            return Err(HatchupError::invalid_input(format!(
                "Unsupported file format '{}'. Supported: {}",
                filename,
                TEXT_EXTENSIONS.join(", ")
            )));
        }

        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(err) => format!("Error decoding {}: {}", filename, err),
        };
        Ok(ExtractedDocument::from_extractor_output(text))
    }
}

const DECK_SYSTEM_PROMPT: &str = "You are a cynical, analytical, and highly structured junior VC analyst. \
Extract key due diligence information from a startup pitch deck. Be objective. \
If a section is missing, say it is missing. Flag vague claims as weak signals and potential risks as red flags. \
Respond with a single JSON object and nothing else.";

const DECK_FIELDS: &str = "startup_name (string), one_liner (string), problem (string), \
solution (string), market_size (string), business_model (string), traction (string), \
team (array of strings), competition (array of strings), funding_ask (string), \
weak_signals (array of strings), red_flags (array of strings)";

/// Turns deck text into a structured [`Deck`] with one completion call.
pub struct CompletionDeckAnalyzer {
    completion: Arc<dyn CompletionService>,
}

impl CompletionDeckAnalyzer {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl DeckAnalyzer for CompletionDeckAnalyzer {
    async fn analyze(&self, text: &str) -> Result<Deck> {
        let messages = [
            PromptMessage::system(DECK_SYSTEM_PROMPT),
            PromptMessage::user(format!(
                "Extract information from this pitch deck text:\n\n{}\n\nReturn JSON with these keys: {}",
                text, DECK_FIELDS
            )),
        ];
        let raw = self
            .completion
            .complete(&messages, CompletionOptions { temperature: 0.0 })
            .await?;
        parse_deck_json(&raw)
    }
}

/// Finds the JSON object in a completion response, tolerating code fences
/// and surrounding prose.
fn parse_deck_json(raw: &str) -> Result<Deck> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let candidate = match (start, end) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => {
            return Err(HatchupError::completion(
                "deck extraction returned no JSON object",
            ));
        }
    };
    let value: Value = serde_json::from_str(candidate)
        .map_err(|err| HatchupError::completion(format!("deck extraction returned invalid JSON: {err}")))?;
    Deck::from_value(value)
        .map_err(|_| HatchupError::completion("deck extraction returned a non-object"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CannedCompletion {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionService for CannedCompletion {
        async fn complete(
            &self,
            messages: &[PromptMessage],
            _options: CompletionOptions,
        ) -> Result<String> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.extend(messages.iter().map(|m| m.content.clone()));
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_plain_text_extraction() {
        let doc = PlainTextExtractor
            .extract_text(b"Acme: rockets for everyone", "deck.MD")
            .await
            .unwrap();
        assert_eq!(doc.text, "Acme: rockets for everyone");
        assert!(!doc.low_confidence);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_low_confidence() {
        let doc = PlainTextExtractor
            .extract_text(&[0xff, 0xfe, 0x00], "deck.txt")
            .await
            .unwrap();
        assert!(doc.low_confidence);
    }

    #[tokio::test]
    async fn test_binary_formats_are_rejected() {
        let err = PlainTextExtractor
            .extract_text(b"%PDF-1.7", "deck.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, HatchupError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_analyzer_strips_code_fences() {
        let completion = Arc::new(CannedCompletion {
            reply: "```json\n{\"startup_name\": \"Acme\", \"red_flags\": []}\n```".to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let analyzer = CompletionDeckAnalyzer::new(completion.clone());

        let deck = analyzer.analyze("Acme deck text").await.unwrap();

        assert_eq!(deck.startup_name(), Some("Acme"));
        assert!(completion.prompts.lock().unwrap()[1].contains("Acme deck text"));
    }

    #[test]
    fn test_non_json_reply_is_a_completion_failure() {
        let err = parse_deck_json("I could not read the deck.").unwrap_err();
        assert!(matches!(err, HatchupError::CompletionService(_)));
    }
}
