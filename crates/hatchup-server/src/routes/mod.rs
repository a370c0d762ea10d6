//! HTTP routes.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

use crate::app::AppState;

pub mod analysis;
pub mod auth;
pub mod chat;

/// Upper bound for uploaded documents.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/auth/profile", get(auth::profile))
        .route("/api/session/analysis/new", post(analysis::create))
        .route("/api/session/analyses", get(analysis::list))
        .route("/api/session/analysis", get(analysis::active))
        .route("/api/session/analysis/activate", post(analysis::activate))
        .route("/api/session/analysis/research", post(analysis::save_research))
        .route("/api/session/analysis/memo", post(analysis::save_memo))
        .route(
            "/api/analyze",
            post(analysis::ingest).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/chat/research", post(chat::research))
        .route("/api/chat/hatchup", post(chat::live))
        .with_state(state)
}
