//! Chat routes.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::Value;

use hatchup_application::{LiveChatReply, ResearchChatReply};
use hatchup_core::analysis::ResearchMessage;

use crate::app::AppState;
use crate::error::ApiResult;
use crate::session::{SessionContext, SessionResponse};

#[derive(Debug, Deserialize)]
pub struct ResearchChatRequest {
    pub messages: Vec<ResearchMessage>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub memo: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct LiveChatRequest {
    #[serde(default)]
    pub messages: Vec<ResearchMessage>,
    pub query: String,
}

/// `POST /api/chat/research`
pub async fn research(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ResearchChatRequest>,
) -> ApiResult<SessionResponse<ResearchChatReply>> {
    let session = SessionContext::from_headers(&headers);
    let owner = state.identity.owner(&headers, &session).await?;

    let reply = state
        .chat
        .research_chat(
            &owner,
            session.hint(),
            &request.messages,
            request.data,
            request.memo,
        )
        .await?;

    let active = reply.analysis_id.clone();
    let response = SessionResponse::new(session, reply);
    Ok(match active {
        Some(analysis_id) => response.with_active(analysis_id),
        None => response,
    })
}

/// `POST /api/chat/hatchup`
pub async fn live(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LiveChatRequest>,
) -> ApiResult<SessionResponse<LiveChatReply>> {
    let session = SessionContext::from_headers(&headers);
    state.identity.owner(&headers, &session).await?;

    let reply = state.chat.live_chat(&request.query, &request.messages).await?;
    Ok(SessionResponse::new(session, reply))
}
