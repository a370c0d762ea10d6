//! Supabase-style identity verification.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use hatchup_core::identity::{Identity, IdentityProvider};
use hatchup_core::{HatchupError, Result};
use hatchup_infrastructure::config::IdentityConfig;

const INVALID_TOKEN: &str = "Invalid authentication token";

/// Verifies access tokens with `GET {url}/auth/v1/user`.
#[derive(Clone)]
pub struct SupabaseIdentityProvider {
    client: Client,
    config: IdentityConfig,
}

impl SupabaseIdentityProvider {
    pub fn new(config: IdentityConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: Option<String>,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Map<String, Value>,
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    async fn verify(&self, token: &str) -> Result<Identity> {
        let (base_url, anon_key) = self.config.require_endpoint()?;

        let response = self
            .client
            .get(format!("{}/auth/v1/user", base_url))
            .header("apikey", anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!("[SupabaseIdentityProvider] Request failed: {}", err);
                HatchupError::unauthenticated(INVALID_TOKEN)
            })?;

        if !response.status().is_success() {
            tracing::debug!(
                "[SupabaseIdentityProvider] Token rejected with HTTP {}",
                response.status().as_u16()
            );
            return Err(HatchupError::unauthenticated(INVALID_TOKEN));
        }

        let user: AuthUser = response
            .json()
            .await
            .map_err(|_| HatchupError::unauthenticated(INVALID_TOKEN))?;
        identity_from_user(user)
    }
}

fn identity_from_user(user: AuthUser) -> Result<Identity> {
    let user_id = user
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| HatchupError::unauthenticated(INVALID_TOKEN))?;
    Ok(Identity {
        user_id,
        email: user.email.filter(|email| !email.is_empty()),
        full_name: first_text(&user.user_metadata, &["full_name", "name", "preferred_name"]),
        avatar_url: first_text(&user.user_metadata, &["avatar_url", "picture"]),
    })
}

/// First non-blank string among `keys`, in order.
fn first_text(metadata: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| metadata.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(value: Value) -> AuthUser {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_metadata_name_and_avatar_precedence() {
        let identity = identity_from_user(user(json!({
            "id": "u-1",
            "email": "a@b.co",
            "user_metadata": {
                "name": "Ada",
                "preferred_name": "A",
                "full_name": "  ",
                "picture": "https://img/p.png"
            }
        })))
        .unwrap();

        assert_eq!(identity.full_name.as_deref(), Some("Ada"));
        assert_eq!(identity.avatar_url.as_deref(), Some("https://img/p.png"));
    }

    #[test]
    fn test_user_without_id_is_rejected() {
        let err = identity_from_user(user(json!({"email": "a@b.co"}))).unwrap_err();
        assert!(err.is_unauthenticated());
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_a_config_error() {
        let provider = SupabaseIdentityProvider::new(IdentityConfig::default());
        assert!(provider.verify("token").await.unwrap_err().is_config());
    }
}
