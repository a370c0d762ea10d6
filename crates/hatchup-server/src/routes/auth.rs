use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Serialize;

use hatchup_core::identity::Identity;

use crate::app::AppState;
use crate::error::ApiResult;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub ok: bool,
    pub profile: Identity,
}

/// `GET /api/auth/profile`
pub async fn profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = state.identity.identity(&headers).await?;
    Ok(Json(ProfileResponse { ok: true, profile }))
}
