//! The fixed registry of external search sources.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// One external search back-end.
///
/// Each source is invoked with a single fixed tool name and argument shape.
/// [`SearchSource::ALL`] is also the order sources appear in prompt context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Reddit,
    #[serde(rename = "wiki")]
    Wikipedia,
    Google,
    Medium,
    Tavily,
}

impl SearchSource {
    pub const ALL: [SearchSource; 5] = [
        SearchSource::Reddit,
        SearchSource::Wikipedia,
        SearchSource::Google,
        SearchSource::Medium,
        SearchSource::Tavily,
    ];

    /// Result-map key (`reddit`, `wiki`, ...).
    pub fn key(self) -> &'static str {
        match self {
            SearchSource::Reddit => "reddit",
            SearchSource::Wikipedia => "wiki",
            SearchSource::Google => "google",
            SearchSource::Medium => "medium",
            SearchSource::Tavily => "tavily",
        }
    }

    /// Human-readable label used in context blocks and error strings.
    pub fn label(self) -> &'static str {
        match self {
            SearchSource::Reddit => "Reddit",
            SearchSource::Wikipedia => "Wikipedia",
            SearchSource::Google => "Google",
            SearchSource::Medium => "Medium",
            SearchSource::Tavily => "Tavily",
        }
    }

    /// Back-end server name.
    pub fn server_name(self) -> &'static str {
        match self {
            SearchSource::Reddit => "@echolab/mcp-reddit",
            SearchSource::Wikipedia => "@echolab/mcp-wikipedia",
            SearchSource::Google => "@echolab/mcp-google",
            SearchSource::Medium => "@echolab/mcp-medium",
            SearchSource::Tavily => "tavily-search",
        }
    }

    pub fn tool_name(self) -> &'static str {
        match self {
            SearchSource::Reddit => "fetch_reddit_posts_with_comments",
            SearchSource::Wikipedia => "search",
            SearchSource::Google => "google_search",
            SearchSource::Medium => "search_medium",
            SearchSource::Tavily => "tavily",
        }
    }

    /// Tool arguments for `query`. Reddit ignores the query and reads the
    /// latest startups thread.
    pub fn arguments(self, query: &str) -> Value {
        match self {
            SearchSource::Reddit => json!({"subreddit": "startups", "limit": 1}),
            _ => json!({"query": query}),
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|source| source.key() == key)
    }
}

impl fmt::Display for SearchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
