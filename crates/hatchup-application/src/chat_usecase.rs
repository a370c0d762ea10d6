//! Chat use cases.
//!
//! Two flavors:
//! - research chat: answers from the stored deck and memo only
//! - live chat: answers from a fresh (or cached) multi-source search

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use hatchup_core::analysis::ResearchMessage;
use hatchup_core::completion::{CompletionOptions, CompletionService, PromptMessage};
use hatchup_core::research::FanoutResults;
use hatchup_core::{HatchupError, Result};

use crate::analysis_service::AnalysisService;
use crate::research::ResearchOrchestrator;

const RESEARCH_TEMPERATURE: f32 = 0.5;
const LIVE_TEMPERATURE: f32 = 0.3;
const LIVE_HISTORY_LIMIT: usize = 5;

const RESEARCH_SYSTEM_PROMPT: &str = "You are a highly intelligent VC Research Associate.
You have access to the parsed Pitch Deck Data and a generated Investment Memo for a startup.

Your goal is to answer the User's (Partner's) questions deeply and critically.

Guidelines:
1. Use the provided Context as your primary source.
2. If the user asks for validation (e.g. Market size, competitors), use your own internal knowledge to verify if the startup's claims are realistic.
3. Be concise but insightful. Start directly with the answer.
4. If drafting emails, use a professional VC tone.

FORMATTING RULES (CRITICAL):
- Format your response as a clean, executive-style memo.
- Avoid Markdown tables.
- Use clear uppercase or bold HEADERS for sections.
- Use short, sharp bullet points for lists.
- Keep language professional, simple, and direct.
- Focus on actionable insights.
- Ensure clean spacing between sections.
- Do NOT use academic grid structures or complex markdown.";

const LIVE_SYSTEM_PROMPT: &str = "You are HatchUp Chat, a smart VC research assistant.

BEHAVIOR:
1. If the user says \"Hello\" or engages in small talk, reply conversationally.
2. If the user asks a specific question or topic, use the provided [Context] to generate an analysis.
3. IGNORE error messages in the context.
4. Do NOT hallucinate.

FORMATTING RULES (CRITICAL):
- Format your response as a clean, executive-style strategy memo.
- Use clear uppercase or bold HEADERS for sections (e.g. \"KEY INSIGHTS\", \"MARKET SIGNALS\").
- Use short, punchy bullet points.
- Focus on actionable insights.
- Do NOT use markdown tables or complex grids.
- Keep spacing clean and readable.";

/// Context placeholder when the query did not warrant a live search.
const CONTEXT_SKIPPED: &str = "none";
/// Context placeholder when the fan-out step itself could not run.
const CONTEXT_UNAVAILABLE: &str = "unavailable";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchChatReply {
    pub response: String,
    pub analysis_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveChatReply {
    pub response: String,
    /// Sanitized per-source text; empty when no live search ran.
    pub sources: FanoutResults,
    pub used_live_tools: bool,
    pub cached: bool,
}

pub struct ChatUseCase {
    analysis: Arc<AnalysisService>,
    orchestrator: Arc<ResearchOrchestrator>,
    completion: Arc<dyn CompletionService>,
}

impl ChatUseCase {
    pub fn new(
        analysis: Arc<AnalysisService>,
        orchestrator: Arc<ResearchOrchestrator>,
        completion: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            analysis,
            orchestrator,
            completion,
        }
    }

    /// Answers the latest user question from stored deck and memo.
    ///
    /// `data` and `memo` override the stored artifacts when the client already
    /// holds them; otherwise the active analysis is resolved from `hint_id`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: no messages, or no deck to reason about
    /// - `CompletionService` / `Config`: completion call failed
    pub async fn research_chat(
        &self,
        owner_id: &str,
        hint_id: Option<&str>,
        messages: &[ResearchMessage],
        data: Option<Value>,
        memo: Option<Value>,
    ) -> Result<ResearchChatReply> {
        let question = latest_question(messages)?;

        let (analysis_id, deck, memo) = match data.filter(is_populated) {
            Some(deck) => (hint_id.map(str::to_string), deck, memo),
            None => {
                let active = self.analysis.active(owner_id, hint_id).await?;
                let view = active.view();
                let deck = if active.has_deck() {
                    view.deck.map(|deck| deck.to_value())
                } else {
                    None
                };
                (Some(view.analysis_id), deck.unwrap_or(Value::Null), Some(view.memo))
            }
        };
        if !is_populated(&deck) {
            return Err(HatchupError::invalid_input("No active deck analysis found"));
        }

        let context = format!(
            "*** STARTUP ANALYZED DATA ***\n{}\n\n*** INVESTMENT MEMO ***\n{}",
            pretty(&deck)?,
            pretty(&memo.unwrap_or_else(|| Value::Object(Default::default())))?
        );
        let prompt = [
            PromptMessage::system(RESEARCH_SYSTEM_PROMPT),
            PromptMessage::user(format!("Context:\n{context}\n\nQuestion: {question}")),
        ];

        let response = self
            .completion
            .complete(
                &prompt,
                CompletionOptions {
                    temperature: RESEARCH_TEMPERATURE,
                },
            )
            .await?;
        Ok(ResearchChatReply {
            response,
            analysis_id,
        })
    }

    /// Answers `query` using live tool results when the query warrants it.
    ///
    /// Tool failures never fail the request: a failed source shows up as
    /// labeled text, and a fan-out that cannot run at all degrades to an
    /// `unavailable` context.
    pub async fn live_chat(&self, query: &str, history: &[ResearchMessage]) -> Result<LiveChatReply> {
        let query = query.trim();
        if query.is_empty() {
            return Err(HatchupError::invalid_input("query must not be empty"));
        }

        let mut sources = FanoutResults::new();
        let mut used_live_tools = false;
        let mut cached = false;
        let context = if self.orchestrator.should_run_live_search(query) {
            match self.orchestrator.research(query).await {
                Ok(outcome) => {
                    sources = outcome.results;
                    used_live_tools = true;
                    cached = outcome.cached;
                    outcome.context
                }
                Err(err) => {
                    tracing::warn!("[ChatUseCase] Live search unavailable: {}", err);
                    CONTEXT_UNAVAILABLE.to_string()
                }
            }
        } else {
            tracing::debug!("[ChatUseCase] Skipping live search for conversational input");
            CONTEXT_SKIPPED.to_string()
        };

        let prompt = [
            PromptMessage::system(LIVE_SYSTEM_PROMPT),
            PromptMessage::user(format!(
                "[Context from Live Tools]\n{}\n\n[Conversation History]\n{}\n\n[Current User Input]\n{}",
                context,
                render_history(history),
                query
            )),
        ];
        let response = self
            .completion
            .complete(
                &prompt,
                CompletionOptions {
                    temperature: LIVE_TEMPERATURE,
                },
            )
            .await?;

        Ok(LiveChatReply {
            response,
            sources,
            used_live_tools,
            cached,
        })
    }
}

/// The last user message, or the last message if none is tagged `user`.
fn latest_question(messages: &[ResearchMessage]) -> Result<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role.eq_ignore_ascii_case("user"))
        .or_else(|| messages.last())
        .map(|m| m.content.as_str())
        .ok_or_else(|| HatchupError::invalid_input("messages must not be empty"))
}

fn render_history(history: &[ResearchMessage]) -> String {
    let start = history.len().saturating_sub(LIVE_HISTORY_LIMIT);
    history[start..]
        .iter()
        .map(|m| format!("{}: {}", m.role.to_uppercase(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

fn pretty(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::{OrchestratorSettings, SearchCache, ToolRegistry};
    use async_trait::async_trait;
    use chrono::Utc;
    use hatchup_core::analysis::Deck;
    use hatchup_core::clock::{ManualClock, SystemClock};
    use hatchup_core::document::{DeckAnalyzer, DocumentExtractor, ExtractedDocument};
    use hatchup_core::research::{SearchSource, ToolConnector, ToolSession};
    use hatchup_infrastructure::{AnalysisWorkspaceStore, InMemoryWorkspaceStorage};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCompletion {
        calls: Mutex<Vec<(Vec<PromptMessage>, f32)>>,
    }

    impl RecordingCompletion {
        fn last_user_prompt(&self) -> String {
            let calls = self.calls.lock().unwrap();
            calls.last().unwrap().0[1].content.clone()
        }

        fn last_temperature(&self) -> f32 {
            self.calls.lock().unwrap().last().unwrap().1
        }
    }

    #[async_trait]
    impl CompletionService for RecordingCompletion {
        async fn complete(
            &self,
            messages: &[PromptMessage],
            options: CompletionOptions,
        ) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((messages.to_vec(), options.temperature));
            Ok("answer".to_string())
        }
    }

    struct TextExtractor;

    #[async_trait]
    impl DocumentExtractor for TextExtractor {
        async fn extract_text(&self, bytes: &[u8], _filename: &str) -> Result<ExtractedDocument> {
            Ok(ExtractedDocument::from_extractor_output(
                String::from_utf8_lossy(bytes).into_owned(),
            ))
        }
    }

    struct NameAnalyzer;

    #[async_trait]
    impl DeckAnalyzer for NameAnalyzer {
        async fn analyze(&self, text: &str) -> Result<Deck> {
            Deck::from_value(json!({"startup_name": text}))
        }
    }

    struct StaticSession(&'static str);

    #[async_trait]
    impl ToolSession for StaticSession {
        async fn call_tool(&self, _tool: &str, _arguments: Value) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct StaticConnector(Vec<SearchSource>);

    #[async_trait]
    impl ToolConnector for StaticConnector {
        fn configured_sources(&self) -> Vec<SearchSource> {
            self.0.clone()
        }

        async fn connect(&self, source: SearchSource) -> Result<Arc<dyn ToolSession>> {
            match source {
                SearchSource::Google => Err(HatchupError::tool_unavailable("Google", "refused")),
                _ => Ok(Arc::new(StaticSession("market is growing"))),
            }
        }
    }

    fn build_chat(sources: Vec<SearchSource>) -> (ChatUseCase, Arc<AnalysisService>, Arc<RecordingCompletion>) {
        let store = AnalysisWorkspaceStore::new(
            Arc::new(InMemoryWorkspaceStorage::new()),
            Arc::new(SystemClock),
        )
        .unwrap();
        let analysis = Arc::new(AnalysisService::new(
            Arc::new(store),
            Arc::new(TextExtractor),
            Arc::new(NameAnalyzer),
        ));
        let cache = Arc::new(SearchCache::new(
            chrono::Duration::seconds(300),
            Arc::new(ManualClock::new(Utc::now())),
        ));
        let orchestrator = Arc::new(ResearchOrchestrator::new(
            Arc::new(ToolRegistry::new(Arc::new(StaticConnector(sources)))),
            cache,
            OrchestratorSettings::default(),
        ));
        let completion = Arc::new(RecordingCompletion::default());
        let use_case = ChatUseCase::new(analysis.clone(), orchestrator, completion.clone());
        (use_case, analysis, completion)
    }

    #[tokio::test]
    async fn test_research_chat_uses_stored_deck_and_memo() {
        let (chat, analysis, completion) = build_chat(vec![]);
        let ingested = analysis
            .ingest_document("owner-1", None, b"Acme", "deck.txt")
            .await
            .unwrap();

        let reply = chat
            .research_chat(
                "owner-1",
                None,
                &[
                    ResearchMessage::new("user", "Is the TAM realistic?"),
                    ResearchMessage::new("assistant", "Let me check."),
                ],
                None,
                None,
            )
            .await
            .unwrap();

        assert_eq!(reply.response, "answer");
        assert_eq!(reply.analysis_id, Some(ingested.analysis_id));
        let prompt = completion.last_user_prompt();
        assert!(prompt.starts_with("Context:\n*** STARTUP ANALYZED DATA ***\n"));
        assert!(prompt.contains("\"startup_name\": \"Acme\""));
        assert!(prompt.contains("*** INVESTMENT MEMO ***\n{}"));
        assert!(prompt.ends_with("Question: Is the TAM realistic?"));
        assert_eq!(completion.last_temperature(), RESEARCH_TEMPERATURE);
    }

    #[tokio::test]
    async fn test_research_chat_without_deck_is_invalid_input() {
        let (chat, _, completion) = build_chat(vec![]);
        let err = chat
            .research_chat("owner-1", None, &[ResearchMessage::new("user", "hi")], None, None)
            .await
            .unwrap_err();
        assert!(
            matches!(err, HatchupError::InvalidInput(ref msg) if msg == "No active deck analysis found")
        );
        assert!(completion.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_research_chat_prefers_supplied_artifacts() {
        let (chat, _, completion) = build_chat(vec![]);
        let reply = chat
            .research_chat(
                "owner-1",
                Some("client-id"),
                &[ResearchMessage::new("user", "Summarize")],
                Some(json!({"startup_name": "Beta"})),
                Some(json!({"verdict": "pass"})),
            )
            .await
            .unwrap();
        assert_eq!(reply.analysis_id.as_deref(), Some("client-id"));
        let prompt = completion.last_user_prompt();
        assert!(prompt.contains("Beta"));
        assert!(prompt.contains("\"verdict\": \"pass\""));
    }

    #[tokio::test]
    async fn test_live_chat_skips_search_for_greetings() {
        let (chat, _, completion) = build_chat(vec![SearchSource::Wikipedia]);
        let reply = chat.live_chat("hello", &[]).await.unwrap();
        assert!(!reply.used_live_tools);
        assert!(reply.sources.is_empty());
        assert!(completion
            .last_user_prompt()
            .starts_with("[Context from Live Tools]\nnone\n"));
        assert_eq!(completion.last_temperature(), LIVE_TEMPERATURE);
    }

    #[tokio::test]
    async fn test_live_chat_isolates_failing_source() {
        let (chat, _, completion) = build_chat(vec![SearchSource::Wikipedia, SearchSource::Google]);
        let query = "what is the current market size for B2B fintech in Europe";

        let reply = chat.live_chat(query, &[]).await.unwrap();
        assert!(reply.used_live_tools);
        assert!(!reply.cached);
        assert_eq!(reply.sources.len(), SearchSource::ALL.len());
        assert_eq!(
            reply.sources.get(SearchSource::Google).unwrap().text(),
            "[Google error: refused]"
        );
        assert_eq!(
            reply.sources.get(SearchSource::Medium).unwrap().text(),
            "[Medium error: @echolab/mcp-medium is not configured]"
        );
        assert!(completion.last_user_prompt().contains("[Wikipedia]: market is growing"));

        let again = chat.live_chat(query, &[]).await.unwrap();
        assert!(again.cached);
    }

    #[tokio::test]
    async fn test_live_chat_degrades_when_no_sources() {
        let (chat, _, completion) = build_chat(vec![]);
        let reply = chat
            .live_chat("latest funding news for climate startups", &[])
            .await
            .unwrap();
        assert!(!reply.used_live_tools);
        assert!(completion
            .last_user_prompt()
            .starts_with("[Context from Live Tools]\nunavailable\n"));
    }

    #[test]
    fn test_history_keeps_last_five_with_uppercase_roles() {
        let history: Vec<_> = (0..7)
            .map(|i| ResearchMessage::new("user", format!("m{i}")))
            .collect();
        let rendered = render_history(&history);
        assert_eq!(rendered.lines().count(), 5);
        assert!(rendered.starts_with("USER: m2"));
        assert!(rendered.ends_with("USER: m6"));
    }
}
