//! MCP tool sessions over streamable HTTP.
//!
//! Handshake on connect:
//! 1. `initialize` request
//! 2. `notifications/initialized` notification
//!
//! Every later call is a `tools/call` request. Servers may answer with plain
//! JSON or with an SSE stream of `data:` lines; both are accepted.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use hatchup_core::research::{SearchSource, ToolConnector, ToolSession};
use hatchup_core::{HatchupError, Result};
use hatchup_infrastructure::config::ResearchConfig;

const PROTOCOL_VERSION: &str = "2025-03-26";
const SESSION_HEADER: &str = "mcp-session-id";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// One initialized MCP session.
pub struct HttpToolSession {
    client: Client,
    endpoint: String,
    source: SearchSource,
    session_id: Option<String>,
    request_id: AtomicU64,
}

impl HttpToolSession {
    /// Opens a session and completes the MCP handshake.
    ///
    /// # Errors
    ///
    /// `ToolUnavailable` if the server is unreachable or rejects `initialize`.
    pub async fn connect(client: Client, endpoint: String, source: SearchSource) -> Result<Self> {
        let mut session = Self {
            client,
            endpoint,
            source,
            session_id: None,
            request_id: AtomicU64::new(1),
        };

        let (session_id, response) = session
            .post(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "hatchup",
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
                true,
            )
            .await?;
        let response = response.ok_or_else(|| session.fail("empty initialize response"))?;
        if let Some(error) = response.error {
            return Err(session.fail(format!(
                "initialize rejected [{}] {}",
                error.code, error.message
            )));
        }
        session.session_id = session_id;

        // Notifications get no response body; failures here are not fatal.
        if let Err(err) = session.post("notifications/initialized", json!({}), false).await {
            tracing::debug!(
                "[HttpToolSession] {} initialized notification failed: {}",
                session.source.label(),
                err
            );
        }

        tracing::info!(
            "[HttpToolSession] Connected to {} at {}",
            session.source.server_name(),
            session.endpoint
        );
        Ok(session)
    }

    fn fail(&self, reason: impl Into<String>) -> HatchupError {
        HatchupError::tool_unavailable(self.source.label(), reason)
    }

    /// Sends one JSON-RPC message. Returns the session header (if any) and the
    /// parsed response (absent for notifications).
    async fn post(
        &self,
        method: &str,
        params: Value,
        expect_response: bool,
    ) -> Result<(Option<String>, Option<JsonRpcResponse>)> {
        let id = expect_response.then(|| self.request_id.fetch_add(1, Ordering::SeqCst));
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .json(&request);
        if let Some(session_id) = &self.session_id {
            builder = builder.header(SESSION_HEADER, session_id);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| self.fail(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.fail(format!("HTTP {}", status.as_u16())));
        }
        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        if !expect_response {
            return Ok((session_id, None));
        }

        let body = response
            .text()
            .await
            .map_err(|err| self.fail(format!("unreadable body: {err}")))?;
        let parsed = parse_rpc_body(&body).map_err(|reason| self.fail(reason))?;
        Ok((session_id, Some(parsed)))
    }
}

#[async_trait]
impl ToolSession for HttpToolSession {
    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<String> {
        let (_, response) = self
            .post(
                "tools/call",
                json!({ "name": tool, "arguments": arguments }),
                true,
            )
            .await?;
        let response = response.ok_or_else(|| self.fail("empty tools/call response"))?;

        if let Some(error) = response.error {
            return Err(self.fail(format!("[{}] {}", error.code, error.message)));
        }
        extract_tool_text(response.result.unwrap_or(Value::Null)).map_err(|reason| self.fail(reason))
    }
}

/// Parses a JSON-RPC body that is either plain JSON or an SSE stream.
fn parse_rpc_body(body: &str) -> std::result::Result<JsonRpcResponse, String> {
    let trimmed = body.trim();
    if trimmed.starts_with('{') {
        return serde_json::from_str(trimmed).map_err(|e| format!("invalid JSON-RPC body: {e}"));
    }

    trimmed
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .filter_map(|data| serde_json::from_str::<JsonRpcResponse>(data.trim()).ok())
        .filter(|response| response.result.is_some() || response.error.is_some())
        .last()
        .ok_or_else(|| "no JSON-RPC response in event stream".to_string())
}

/// Joins the text items of a `tools/call` result.
fn extract_tool_text(result: Value) -> std::result::Result<String, String> {
    let texts: Vec<&str> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    let joined = texts.join("\n");

    if result.get("isError").and_then(Value::as_bool).unwrap_or(false) {
        return Err(if joined.is_empty() {
            "tool reported an error".to_string()
        } else {
            joined
        });
    }
    if !joined.is_empty() {
        return Ok(joined);
    }
    Ok(match result.get("structuredContent") {
        Some(structured) => structured.to_string(),
        None => result.to_string(),
    })
}

/// Connects to the MCP endpoints named in configuration.
pub struct HttpToolConnector {
    client: Client,
    endpoints: BTreeMap<SearchSource, String>,
}

impl HttpToolConnector {
    pub fn new(endpoints: BTreeMap<SearchSource, String>) -> Self {
        Self {
            client: Client::new(),
            endpoints,
        }
    }

    pub fn from_config(config: &ResearchConfig) -> Self {
        let endpoints = SearchSource::ALL
            .into_iter()
            .filter_map(|source| {
                config
                    .tool_url(source)
                    .map(|url| (source, url.to_string()))
            })
            .collect();
        Self::new(endpoints)
    }
}

#[async_trait]
impl ToolConnector for HttpToolConnector {
    fn configured_sources(&self) -> Vec<SearchSource> {
        self.endpoints.keys().copied().collect()
    }

    async fn connect(&self, source: SearchSource) -> Result<Arc<dyn ToolSession>> {
        let endpoint = self.endpoints.get(&source).ok_or_else(|| {
            HatchupError::config(format!(
                "No endpoint configured for {} (HATCHUP_TOOL_{}_URL)",
                source.server_name(),
                source.key().to_ascii_uppercase()
            ))
        })?;
        let session = HttpToolSession::connect(self.client.clone(), endpoint.clone(), source).await?;
        Ok(Arc::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};

    #[test]
    fn test_parse_plain_json_body() {
        let parsed = parse_rpc_body(r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#).unwrap();
        assert_eq!(parsed.result, Some(json!({"ok": true})));
    }

    #[test]
    fn test_parse_sse_body() {
        let body = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"content\":[]}}\n\n";
        let parsed = parse_rpc_body(body).unwrap();
        assert!(parsed.result.is_some());
        assert!(parse_rpc_body("event: ping\n\n").is_err());
    }

    #[test]
    fn test_extract_tool_text_joins_text_items() {
        let text = extract_tool_text(json!({
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image", "data": "..."},
                {"type": "text", "text": "second"}
            ]
        }))
        .unwrap();
        assert_eq!(text, "first\nsecond");
    }

    #[test]
    fn test_extract_tool_text_surfaces_is_error() {
        let err = extract_tool_text(json!({
            "isError": true,
            "content": [{"type": "text", "text": "rate limited"}]
        }))
        .unwrap_err();
        assert_eq!(err, "rate limited");
    }

    async fn mock_mcp(headers: HeaderMap, Json(request): Json<Value>) -> (HeaderMap, String) {
        let mut out = HeaderMap::new();
        out.insert(SESSION_HEADER, "sess-1".parse().unwrap());
        let id = request.get("id").cloned().unwrap_or(Value::Null);
        let body = match request["method"].as_str() {
            Some("initialize") => json!({"jsonrpc": "2.0", "id": id, "result": {"protocolVersion": PROTOCOL_VERSION}}).to_string(),
            Some("tools/call") => {
                let session = headers
                    .get(SESSION_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("missing")
                    .to_string();
                let query = request["params"]["arguments"]["query"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                let result = json!({"jsonrpc": "2.0", "id": id, "result": {
                    "content": [{"type": "text", "text": format!("{session}:{query}")}]
                }});
                format!("event: message\ndata: {}\n\n", result)
            }
            _ => String::new(),
        };
        (out, body)
    }

    #[tokio::test]
    async fn test_session_handshake_and_call_against_mock_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/mcp", post(mock_mcp));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut endpoints = BTreeMap::new();
        endpoints.insert(SearchSource::Google, format!("http://{}/mcp", addr));
        let connector = HttpToolConnector::new(endpoints);
        assert_eq!(connector.configured_sources(), vec![SearchSource::Google]);

        let session = connector.connect(SearchSource::Google).await.unwrap();
        let text = session
            .call_tool("google_search", json!({"query": "b2b fintech"}))
            .await
            .unwrap();
        assert_eq!(text, "sess-1:b2b fintech");
    }

    #[tokio::test]
    async fn test_unconfigured_source_is_a_config_error() {
        let connector = HttpToolConnector::new(BTreeMap::new());
        let err = connector.connect(SearchSource::Reddit).await.err().unwrap();
        assert!(err.is_config());
    }
}
