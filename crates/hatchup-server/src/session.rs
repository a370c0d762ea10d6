//! Per-request session context carried in headers and cookies.

use std::sync::LazyLock;

use axum::Json;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use regex::Regex;
use serde::Serialize;

pub const SESSION_HEADER: &str = "x-hatchup-session";
pub const SESSION_COOKIE: &str = "hatchup_sid";
pub const ANALYSIS_HEADER: &str = "x-hatchup-analysis-id";
pub const ANALYSIS_COOKIE: &str = "hatchup_active_analysis_id";
pub const ACCESS_TOKEN_COOKIE: &str = "hatchup_access_token";

const COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 30;

static SESSION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{8,128}$").expect("valid regex"));

/// Session id and active-analysis hint resolved from one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: String,
    pub analysis_hint: Option<String>,
}

impl SessionContext {
    /// Resolution order for the session id: a well-formed
    /// `x-hatchup-session` header, then a well-formed `hatchup_sid` cookie,
    /// then a fresh UUID. The analysis hint comes from `x-hatchup-analysis-id`, then the
    /// `hatchup_active_analysis_id` cookie.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let session_id = header_value(headers, SESSION_HEADER)
            .filter(|value| SESSION_ID.is_match(value))
            .or_else(|| {
                cookie_value(headers, SESSION_COOKIE).filter(|value| SESSION_ID.is_match(value))
            })
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let analysis_hint = header_value(headers, ANALYSIS_HEADER)
            .or_else(|| cookie_value(headers, ANALYSIS_COOKIE));

        Self {
            session_id,
            analysis_hint,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        self.analysis_hint.as_deref()
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Reads one cookie from every `Cookie` header on the request.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn set_cookie_header(name: &str, value: &str) -> Option<HeaderValue> {
    let cookie =
        format!("{name}={value}; HttpOnly; SameSite=Lax; Max-Age={COOKIE_MAX_AGE_SECS}; Path=/");
    match HeaderValue::from_str(&cookie) {
        Ok(header) => Some(header),
        Err(_) => {
            tracing::warn!("[SessionContext] Skipping unencodable cookie {}", name);
            None
        }
    }
}

/// JSON body plus the session cookies that go with it.
///
/// The session cookie is re-issued on every response; the active-analysis
/// cookie only when the handler resolved an analysis.
pub struct SessionResponse<T> {
    session: SessionContext,
    active_analysis_id: Option<String>,
    body: T,
}

impl<T> SessionResponse<T> {
    pub fn new(session: SessionContext, body: T) -> Self {
        Self {
            session,
            active_analysis_id: None,
            body,
        }
    }

    pub fn with_active(mut self, analysis_id: impl Into<String>) -> Self {
        self.active_analysis_id = Some(analysis_id.into());
        self
    }
}

impl<T: Serialize> IntoResponse for SessionResponse<T> {
    fn into_response(self) -> Response {
        let mut response = Json(self.body).into_response();
        let headers = response.headers_mut();
        if let Some(cookie) = set_cookie_header(SESSION_COOKIE, &self.session.session_id) {
            headers.append(SET_COOKIE, cookie);
        }
        if let Some(cookie) = self
            .active_analysis_id
            .as_deref()
            .and_then(|id| set_cookie_header(ANALYSIS_COOKIE, id))
        {
            headers.append(SET_COOKIE, cookie);
        }
        response
    }
}
