//! Analysis workspace routes.

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use hatchup_application::{AnalysisListing, IngestOutcome};
use hatchup_core::HatchupError;
use hatchup_core::analysis::{AnalysisStatus, AnalysisView, ResearchMessage};

use crate::app::AppState;
use crate::error::ApiResult;
use crate::session::{SessionContext, SessionResponse};

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Default, Deserialize)]
pub struct NewAnalysisRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub analysis_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ResearchStateRequest {
    #[serde(default)]
    pub messages: Vec<ResearchMessage>,
}

#[derive(Debug, Deserialize)]
pub struct MemoRequest {
    pub memo: Value,
    /// Executive summary; older clients send it as `summary`.
    #[serde(alias = "summary")]
    pub insights: Value,
}

#[derive(Debug, Serialize)]
pub struct ActiveAnalysisResponse {
    pub active_analysis_id: String,
    pub analysis: AnalysisView,
}

#[derive(Debug, Serialize)]
pub struct SessionAnalysisResponse {
    pub has_analysis: bool,
    pub analysis_id: String,
    pub analysis: AnalysisView,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ResearchSavedResponse {
    pub analysis_id: String,
    pub research_count: usize,
}

#[derive(Debug, Serialize)]
pub struct MemoSavedResponse {
    pub analysis_id: String,
    pub status: AnalysisStatus,
}

async fn resolve(state: &AppState, headers: &HeaderMap) -> ApiResult<(SessionContext, String)> {
    let session = SessionContext::from_headers(headers);
    let owner = state.identity.owner(headers, &session).await?;
    Ok((session, owner))
}

/// `POST /api/session/analysis/new`
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<NewAnalysisRequest>>,
) -> ApiResult<SessionResponse<ActiveAnalysisResponse>> {
    let (session, owner) = resolve(&state, &headers).await?;
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let record = state.analysis.create(&owner, request.title).await?;
    let analysis_id = record.analysis_id.clone();
    Ok(SessionResponse::new(
        session,
        ActiveAnalysisResponse {
            active_analysis_id: analysis_id.clone(),
            analysis: record.view(),
        },
    )
    .with_active(analysis_id))
}

/// `GET /api/session/analyses`
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<SessionResponse<AnalysisListing>> {
    let (session, owner) = resolve(&state, &headers).await?;
    let listing = state.analysis.list(&owner, session.hint()).await?;
    let active_id = listing.active_analysis_id.clone();
    Ok(SessionResponse::new(session, listing).with_active(active_id))
}

/// `GET /api/session/analysis`
pub async fn active(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<SessionResponse<SessionAnalysisResponse>> {
    let (session, owner) = resolve(&state, &headers).await?;
    let record = state.analysis.active(&owner, session.hint()).await?;
    let analysis_id = record.analysis_id.clone();
    let body = SessionAnalysisResponse {
        has_analysis: record.has_deck(),
        analysis_id: analysis_id.clone(),
        analysis: record.view(),
        session_id: session.session_id.clone(),
    };
    Ok(SessionResponse::new(session, body).with_active(analysis_id))
}

/// `POST /api/session/analysis/activate`
pub async fn activate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ActivateRequest>,
) -> ApiResult<SessionResponse<ActiveAnalysisResponse>> {
    let (session, owner) = resolve(&state, &headers).await?;
    let record = state.analysis.select(&owner, &request.analysis_id).await?;
    let analysis_id = record.analysis_id.clone();
    Ok(SessionResponse::new(
        session,
        ActiveAnalysisResponse {
            active_analysis_id: analysis_id.clone(),
            analysis: record.view(),
        },
    )
    .with_active(analysis_id))
}

/// `POST /api/session/analysis/research`
pub async fn save_research(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ResearchStateRequest>,
) -> ApiResult<SessionResponse<ResearchSavedResponse>> {
    let (session, owner) = resolve(&state, &headers).await?;
    let record = state
        .analysis
        .save_research(&owner, session.hint(), request.messages)
        .await?;
    let analysis_id = record.analysis_id.clone();
    let body = ResearchSavedResponse {
        analysis_id: analysis_id.clone(),
        research_count: record.research.len(),
    };
    Ok(SessionResponse::new(session, body).with_active(analysis_id))
}

/// `POST /api/session/analysis/memo`
pub async fn save_memo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<MemoRequest>,
) -> ApiResult<SessionResponse<MemoSavedResponse>> {
    let (session, owner) = resolve(&state, &headers).await?;
    let record = state
        .analysis
        .save_memo_and_insights(&owner, session.hint(), request.memo, request.insights)
        .await?;
    let analysis_id = record.analysis_id.clone();
    let body = MemoSavedResponse {
        analysis_id: analysis_id.clone(),
        status: record.status,
    };
    Ok(SessionResponse::new(session, body).with_active(analysis_id))
}

/// `POST /api/analyze` with a multipart `file` field.
pub async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<SessionResponse<IngestOutcome>> {
    let (session, owner) = resolve(&state, &headers).await?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HatchupError::invalid_input(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| HatchupError::invalid_input(format!("Malformed upload: {e}")))?;
        upload = Some((filename, bytes));
        break;
    }
    let (filename, bytes) =
        upload.ok_or_else(|| HatchupError::invalid_input("A 'file' field is required"))?;

    let outcome = state
        .analysis
        .ingest_document(&owner, session.hint(), &bytes, &filename)
        .await?;
    let analysis_id = outcome.analysis_id.clone();
    Ok(SessionResponse::new(session, outcome).with_active(analysis_id))
}
