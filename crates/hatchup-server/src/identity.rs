//! Request owner resolution.

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

use hatchup_core::identity::{Identity, IdentityProvider};
use hatchup_core::{HatchupError, Result};

use crate::session::{ACCESS_TOKEN_COOKIE, SessionContext, cookie_value};

const BEARER_PREFIX: &str = "bearer ";

/// Decides who owns a request.
///
/// A presented credential must verify. Without one, the session id is the
/// owner when anonymous sessions are allowed.
pub struct IdentityResolver {
    provider: Arc<dyn IdentityProvider>,
    allow_anonymous: bool,
}

impl IdentityResolver {
    pub fn new(provider: Arc<dyn IdentityProvider>, allow_anonymous: bool) -> Self {
        Self {
            provider,
            allow_anonymous,
        }
    }

    /// Returns the owner id for workspace operations.
    ///
    /// # Errors
    ///
    /// `AuthenticationRequired` if the credential is rejected, or if none is
    /// presented and anonymous sessions are disabled.
    pub async fn owner(&self, headers: &HeaderMap, session: &SessionContext) -> Result<String> {
        match bearer_token(headers) {
            Some(token) => Ok(self.provider.verify(&token).await?.user_id),
            None if self.allow_anonymous => Ok(session.session_id.clone()),
            None => Err(HatchupError::unauthenticated("Authentication required")),
        }
    }

    /// Returns the verified identity; a credential is mandatory.
    pub async fn identity(&self, headers: &HeaderMap) -> Result<Identity> {
        let token = bearer_token(headers)
            .ok_or_else(|| HatchupError::unauthenticated("Authentication required"))?;
        self.provider.verify(&token).await
    }
}

/// `Authorization: Bearer <t>` (prefix matched case-insensitively), else the
/// access-token cookie.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let prefix = value.get(..BEARER_PREFIX.len())?;
            prefix
                .eq_ignore_ascii_case(BEARER_PREFIX)
                .then(|| value[BEARER_PREFIX.len()..].trim().to_string())
        })
        .filter(|token| !token.is_empty());

    from_header.or_else(|| cookie_value(headers, ACCESS_TOKEN_COOKIE))
}
