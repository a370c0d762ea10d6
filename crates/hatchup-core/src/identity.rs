//! Caller identity and the external verifier contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A verified user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Verifies bearer credentials against an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the identity behind `token`.
    ///
    /// # Errors
    ///
    /// `AuthenticationRequired` if the provider rejects the token, `Config` if
    /// the provider is not configured.
    async fn verify(&self, token: &str) -> Result<Identity>;
}
