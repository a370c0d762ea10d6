//! Application configuration.
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables. Missing credentials are not an error here: the component that
//! needs them fails with `Config` at first use.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use hatchup_core::research::SearchSource;
use hatchup_core::{HatchupError, Result};

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_COMPLETION_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_COMPLETION_MODEL: &str = "openai/gpt-oss-20b";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Treat the session id as the owner when no credential is presented.
    pub allow_anonymous: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            allow_anonymous: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Defaults to `<local data dir>/hatchup`.
    pub data_dir: Option<PathBuf>,
    /// Keep workspaces in memory only.
    pub in_memory: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub api_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_COMPLETION_URL.to_string(),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl CompletionConfig {
    /// # Errors
    ///
    /// `Config` if no API key is set.
    pub fn require_api_key(&self) -> Result<&str> {
        non_empty(self.api_key.as_deref())
            .ok_or_else(|| HatchupError::config("GROQ_API_KEY not found"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
}

impl IdentityConfig {
    /// Returns `(base_url, anon_key)`.
    ///
    /// # Errors
    ///
    /// `Config` if either value is missing.
    pub fn require_endpoint(&self) -> Result<(&str, &str)> {
        match (
            non_empty(self.supabase_url.as_deref()),
            non_empty(self.supabase_anon_key.as_deref()),
        ) {
            (Some(url), Some(key)) => Ok((url.trim_end_matches('/'), key)),
            _ => Err(HatchupError::config(
                "Supabase auth is not configured. Set SUPABASE_URL and SUPABASE_ANON_KEY.",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub call_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub max_source_chars: usize,
    /// MCP endpoint per source key (`reddit`, `wiki`, ...).
    pub tools: BTreeMap<String, String>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 8,
            cache_ttl_secs: 300,
            max_source_chars: 2200,
            tools: BTreeMap::new(),
        }
    }
}

impl ResearchConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.cache_ttl_secs).unwrap_or(i64::MAX))
    }

    pub fn tool_url(&self, source: SearchSource) -> Option<&str> {
        non_empty(self.tools.get(source.key()).map(String::as_str))
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub completion: CompletionConfig,
    pub identity: IdentityConfig,
    pub research: ResearchConfig,
}

impl AppConfig {
    /// Reads `path` (if given) and applies process environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an IO or TOML error if the file exists but cannot be read or
    /// parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HatchupError::io(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config = toml::from_str(&content)?;
        tracing::debug!("[AppConfig] Loaded {}", path.display());
        Ok(config)
    }

    /// Overrides fields from environment-style variables read via `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(bind) = get("HATCHUP_BIND") {
            self.server.bind = bind;
        }
        if let Some(flag) = get("HATCHUP_ALLOW_ANONYMOUS") {
            self.server.allow_anonymous = parse_flag(&flag);
        }
        if let Some(dir) = get("HATCHUP_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(key) = get("GROQ_API_KEY") {
            self.completion.api_key = Some(key);
        }
        if let Some(url) = get("HATCHUP_COMPLETION_URL") {
            self.completion.api_url = url;
        }
        if let Some(model) = get("HATCHUP_COMPLETION_MODEL") {
            self.completion.model = model;
        }
        if let Some(url) = get("SUPABASE_URL") {
            self.identity.supabase_url = Some(url);
        }
        if let Some(key) = get("SUPABASE_ANON_KEY") {
            self.identity.supabase_anon_key = Some(key);
        }
        for source in SearchSource::ALL {
            let var = format!("HATCHUP_TOOL_{}_URL", source.key().to_ascii_uppercase());
            if let Some(url) = get(&var) {
                self.research.tools.insert(source.key().to_string(), url);
            }
        }
    }

    /// Directory for persisted workspaces.
    ///
    /// # Errors
    ///
    /// `Config` if no data dir is set and the platform has none.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.storage.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_local_dir()
            .map(|dir| dir.join("hatchup"))
            .ok_or_else(|| HatchupError::config("Cannot determine local data directory"))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert!(config.server.allow_anonymous);
        assert_eq!(config.research.call_timeout(), Duration::from_secs(8));
        assert_eq!(config.research.cache_ttl(), chrono::Duration::seconds(300));
        assert_eq!(config.research.max_source_chars, 2200);
    }

    #[test]
    fn test_env_overrides_file_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hatchup.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind = "0.0.0.0:9000"

[research]
cache_ttl_secs = 60

[research.tools]
wiki = "http://localhost:7001/mcp"
"#,
        )
        .unwrap();

        let mut config = AppConfig::from_file(&path).unwrap();
        config.apply_env_overrides(env(&[
            ("HATCHUP_BIND", "127.0.0.1:9100"),
            ("GROQ_API_KEY", "gsk_test"),
            ("HATCHUP_ALLOW_ANONYMOUS", "false"),
            ("HATCHUP_TOOL_REDDIT_URL", "http://localhost:7000/mcp"),
        ]));

        assert_eq!(config.server.bind, "127.0.0.1:9100");
        assert!(!config.server.allow_anonymous);
        assert_eq!(config.research.cache_ttl_secs, 60);
        assert_eq!(config.completion.require_api_key().unwrap(), "gsk_test");
        assert_eq!(
            config.research.tool_url(SearchSource::Wikipedia),
            Some("http://localhost:7001/mcp")
        );
        assert_eq!(
            config.research.tool_url(SearchSource::Reddit),
            Some("http://localhost:7000/mcp")
        );
        assert_eq!(config.research.tool_url(SearchSource::Google), None);
    }

    #[test]
    fn test_missing_credentials_are_config_errors() {
        let config = AppConfig::default();
        assert!(config.completion.require_api_key().unwrap_err().is_config());
        assert!(config.identity.require_endpoint().unwrap_err().is_config());
    }

    #[test]
    fn test_identity_endpoint_trims_trailing_slash() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(env(&[
            ("SUPABASE_URL", "https://x.supabase.co/"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]));
        assert_eq!(
            config.identity.require_endpoint().unwrap(),
            ("https://x.supabase.co", "anon")
        );
    }
}
