use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

use hatchup_application::{
    AnalysisService, ChatUseCase, OrchestratorSettings, ResearchOrchestrator, SearchCache,
    ToolRegistry,
};
use hatchup_core::clock::SystemClock;
use hatchup_core::completion::{CompletionOptions, CompletionService, PromptMessage};
use hatchup_core::identity::{Identity, IdentityProvider};
use hatchup_core::research::{SearchSource, ToolConnector, ToolSession};
use hatchup_core::{HatchupError, Result};
use hatchup_infrastructure::{AnalysisWorkspaceStore, InMemoryWorkspaceStorage};
use hatchup_interaction::{CompletionDeckAnalyzer, PlainTextExtractor};
use hatchup_server::identity::IdentityResolver;
use hatchup_server::{AppState, build_router};

const SESSION: &str = "test-session-0001";

/// Answers deck-extraction prompts with a deck naming the document text,
/// everything else with a fixed reply.
struct ScriptedCompletion;

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(
        &self,
        messages: &[PromptMessage],
        _options: CompletionOptions,
    ) -> Result<String> {
        if messages[0].content.contains("junior VC analyst") {
            Ok(r#"Here you go: {"startup_name": "Acme", "industry": "Fintech"}"#.to_string())
        } else {
            Ok("answer".to_string())
        }
    }
}

struct NoTools;

#[async_trait]
impl ToolConnector for NoTools {
    fn configured_sources(&self) -> Vec<SearchSource> {
        Vec::new()
    }

    async fn connect(&self, source: SearchSource) -> Result<Arc<dyn ToolSession>> {
        Err(HatchupError::config(format!("{source} not configured")))
    }
}

struct TokenIsUser;

#[async_trait]
impl IdentityProvider for TokenIsUser {
    async fn verify(&self, token: &str) -> Result<Identity> {
        match token.strip_prefix("user:") {
            Some(user_id) => Ok(Identity {
                user_id: user_id.to_string(),
                email: Some(format!("{user_id}@example.com")),
                full_name: Some("Test User".into()),
                avatar_url: None,
            }),
            None => Err(HatchupError::unauthenticated("Invalid authentication token")),
        }
    }
}

async fn spawn_app(allow_anonymous: bool) -> SocketAddr {
    let clock = Arc::new(SystemClock);
    let store = AnalysisWorkspaceStore::new(Arc::new(InMemoryWorkspaceStorage::new()), clock.clone())
        .unwrap();
    let completion: Arc<dyn CompletionService> = Arc::new(ScriptedCompletion);
    let analysis = Arc::new(AnalysisService::new(
        Arc::new(store),
        Arc::new(PlainTextExtractor),
        Arc::new(CompletionDeckAnalyzer::new(completion.clone())),
    ));
    let orchestrator = Arc::new(ResearchOrchestrator::new(
        Arc::new(ToolRegistry::new(Arc::new(NoTools))),
        Arc::new(SearchCache::new(chrono::Duration::seconds(300), clock)),
        OrchestratorSettings::default(),
    ));
    let chat = Arc::new(ChatUseCase::new(analysis.clone(), orchestrator, completion));
    let identity = Arc::new(IdentityResolver::new(Arc::new(TokenIsUser), allow_anonymous));
    let app = build_router(AppState::new(analysis, chat, identity));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}

#[tokio::test]
async fn test_health() {
    let addr = spawn_app(true).await;
    let body = reqwest::get(url(addr, "/health")).await.unwrap().text().await.unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_ingest_then_read_active_analysis() {
    let addr = spawn_app(true).await;
    let client = reqwest::Client::new();

    let form = Form::new().part("file", Part::bytes(b"Acme pitch".to_vec()).file_name("deck.txt"));
    let response = client
        .post(url(addr, "/api/analyze"))
        .header("x-hatchup-session", SESSION)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookies: Vec<String> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with(&format!("hatchup_sid={SESSION};"))));
    assert!(cookies.iter().any(|c| c.starts_with("hatchup_active_analysis_id=")));
    let ingested: Value = response.json().await.unwrap();
    assert_eq!(ingested["deck"]["startup_name"], "Acme");
    assert_eq!(ingested["low_confidence"], false);

    let active: Value = client
        .get(url(addr, "/api/session/analysis"))
        .header("x-hatchup-session", SESSION)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(active["has_analysis"], true);
    assert_eq!(active["analysis_id"], ingested["analysis_id"]);
    assert_eq!(active["session_id"], SESSION);
    assert_eq!(active["analysis"]["deck"]["startup_name"], "Acme");
    assert_eq!(active["analysis"]["memo"], json!({}));
    assert_eq!(active["analysis"]["research"], json!([]));
}

#[tokio::test]
async fn test_create_list_activate_and_save_research() {
    let addr = spawn_app(true).await;
    let client = reqwest::Client::new();

    let first: Value = client
        .post(url(addr, "/api/session/analysis/new"))
        .header("x-hatchup-session", SESSION)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let first_id = first["active_analysis_id"].as_str().unwrap().to_string();
    assert_eq!(first["analysis"]["title"], "Untitled Analysis");

    let second: Value = client
        .post(url(addr, "/api/session/analysis/new"))
        .header("x-hatchup-session", SESSION)
        .json(&json!({"title": "Beta Corp"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["analysis"]["title"], "Beta Corp");

    let activated: Value = client
        .post(url(addr, "/api/session/analysis/activate"))
        .header("x-hatchup-session", SESSION)
        .json(&json!({"analysis_id": first_id}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(activated["active_analysis_id"], first_id.as_str());

    let saved: Value = client
        .post(url(addr, "/api/session/analysis/research"))
        .header("x-hatchup-session", SESSION)
        .header("x-hatchup-analysis-id", first_id.as_str())
        .json(&json!({"messages": [
            {"role": "user", "content": "who competes?"},
            {"role": "assistant", "content": "Stripe", "pinned": true}
        ]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(saved["analysis_id"], first_id.as_str());
    assert_eq!(saved["research_count"], 2);

    let listing: Value = client
        .get(url(addr, "/api/session/analyses"))
        .header("x-hatchup-session", SESSION)
        .header("x-hatchup-analysis-id", first_id.as_str())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["active_analysis_id"], first_id.as_str());
    assert_eq!(listing["active_analysis"]["research"][1]["pinned"], true);
    // The bootstrap draft plus the two created records.
    assert_eq!(listing["analyses"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_activate_unknown_analysis_is_404() {
    let addr = spawn_app(true).await;
    let response = reqwest::Client::new()
        .post(url(addr, "/api/session/analysis/activate"))
        .header("x-hatchup-session", SESSION)
        .json(&json!({"analysis_id": "does-not-exist"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Analysis not found");
}

#[tokio::test]
async fn test_research_chat_requires_a_deck() {
    let addr = spawn_app(true).await;
    let response = reqwest::Client::new()
        .post(url(addr, "/api/chat/research"))
        .header("x-hatchup-session", SESSION)
        .json(&json!({"messages": [{"role": "user", "content": "Is the TAM real?"}]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "No active deck analysis found");
}

#[tokio::test]
async fn test_live_chat_degrades_without_tools() {
    let addr = spawn_app(true).await;
    let body: Value = reqwest::Client::new()
        .post(url(addr, "/api/chat/hatchup"))
        .json(&json!({"messages": [], "query": "latest fintech funding news in Europe"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["response"], "answer");
    assert_eq!(body["used_live_tools"], false);
    assert_eq!(body["sources"], json!({}));
}

#[tokio::test]
async fn test_credentials_scope_workspaces_and_gate_anonymous_access() {
    let addr = spawn_app(false).await;
    let client = reqwest::Client::new();

    let response = client
        .get(url(addr, "/api/session/analyses"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(url(addr, "/api/session/analyses"))
        .header("authorization", "Bearer nope")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(url(addr, "/api/session/analyses"))
        .header("cookie", "hatchup_access_token=user:alice")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let profile: Value = client
        .get(url(addr, "/api/auth/profile"))
        .header("authorization", "bearer user:alice")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["ok"], true);
    assert_eq!(profile["profile"]["user_id"], "alice");
    assert_eq!(profile["profile"]["email"], "alice@example.com");
}
