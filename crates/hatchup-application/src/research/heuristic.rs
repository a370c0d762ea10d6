//! Decides whether a chat query is worth a live multi-source lookup.

/// Short phrases that never trigger a lookup.
const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "hiya",
    "yo",
    "sup",
    "thanks",
    "thank you",
    "thx",
    "ok",
    "okay",
    "cool",
    "great",
    "nice",
    "bye",
    "goodbye",
    "good morning",
    "good afternoon",
    "good evening",
    "how are you",
    "got it",
];

/// Single words that signal the answer depends on fresh external data.
const TRIGGER_WORDS: &[&str] = &[
    "latest",
    "current",
    "currently",
    "today",
    "recent",
    "recently",
    "now",
    "tam",
    "sam",
    "som",
    "competitor",
    "competitors",
    "competition",
    "competitive",
    "rival",
    "rivals",
    "funding",
    "funded",
    "raised",
    "raise",
    "investors",
    "valuation",
    "valued",
    "news",
    "update",
    "updates",
    "trend",
    "trends",
    "trending",
    "growth",
    "acquisition",
    "acquired",
    "ipo",
    "2024",
    "2025",
    "2026",
];

/// Multi-word trigger phrases, matched against the normalized query.
const TRIGGER_PHRASES: &[&str] = &[
    "market size",
    "market share",
    "this year",
    "last year",
    "series a",
    "series b",
    "seed round",
];

const MIN_WORDS_FOR_LOOKUP: usize = 5;

/// Trims, lowercases and collapses internal whitespace.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn should_run_live_search(query: &str) -> bool {
    let normalized = normalize_query(query);
    if normalized.is_empty() {
        return false;
    }

    let bare = normalized.trim_end_matches(|c: char| c.is_ascii_punctuation() || c == ' ');
    if GREETINGS.contains(&bare) {
        return false;
    }

    let words: Vec<&str> = normalized
        .split(' ')
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect();

    words.len() >= MIN_WORDS_FOR_LOOKUP
        || words.iter().any(|w| TRIGGER_WORDS.contains(w))
        || TRIGGER_PHRASES.iter().any(|p| normalized.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  What IS\tthe\n TAM  "), "what is the tam");
    }

    #[test]
    fn test_greetings_and_empty_skip_lookup() {
        assert!(!should_run_live_search(""));
        assert!(!should_run_live_search("   "));
        assert!(!should_run_live_search("hello"));
        assert!(!should_run_live_search("Thanks!"));
        assert!(!should_run_live_search("good morning"));
    }

    #[test]
    fn test_long_queries_trigger_lookup() {
        assert!(should_run_live_search(
            "what is the current market size for B2B fintech in Europe"
        ));
        assert!(should_run_live_search("tell me about this startup please"));
    }

    #[test]
    fn test_trigger_terms_in_short_queries() {
        assert!(should_run_live_search("Stripe valuation?"));
        assert!(should_run_live_search("fintech news"));
        assert!(should_run_live_search("market size"));
        assert!(!should_run_live_search("summarize deck"));
    }

    #[test]
    fn test_trigger_words_need_word_boundaries() {
        assert!(!should_run_live_search("tamper proof"));
    }
}
