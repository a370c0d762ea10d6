use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use hatchup_core::clock::Clock;
use hatchup_core::research::FanoutResults;

use super::heuristic::normalize_query;

#[derive(Debug, Clone)]
struct SearchCacheEntry {
    captured_at: DateTime<Utc>,
    results: FanoutResults,
}

/// Process-wide TTL cache of fan-out results, keyed by normalized query.
///
/// Shared across owners. An entry is served while
/// `now - captured_at <= ttl`; expired entries are swept on every write.
pub struct SearchCache {
    entries: RwLock<HashMap<String, SearchCacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SearchCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub async fn get(&self, query: &str) -> Option<FanoutResults> {
        let key = normalize_query(query);
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry) if now - entry.captured_at <= self.ttl => {
                    return Some(entry.results.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it unless a fresher entry raced in.
        let mut entries = self.entries.write().await;
        if entries
            .get(&key)
            .is_some_and(|entry| now - entry.captured_at > self.ttl)
        {
            entries.remove(&key);
        }
        None
    }

    /// Stores `results`, replacing any existing entry, and drops every
    /// expired one.
    pub async fn put(&self, query: &str, results: FanoutResults) {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now - entry.captured_at <= self.ttl);
        let swept = before - entries.len();
        if swept > 0 {
            tracing::debug!("[SearchCache] Swept {} expired entries", swept);
        }
        entries.insert(
            normalize_query(query),
            SearchCacheEntry {
                captured_at: now,
                results,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
