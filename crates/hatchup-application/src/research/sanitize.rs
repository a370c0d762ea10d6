//! Neutralizes untrusted tool output before it is embedded in a prompt.

use std::sync::LazyLock;

use regex::Regex;

use hatchup_core::research::{FanoutResults, SearchSource};

pub const TRUNCATION_MARKER: &str = " ... [TRUNCATED]";

const CONTEXT_HEADER: &str = "--- SEARCH RESULTS ---";
const CONTEXT_FOOTER: &str = "----------------------";

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`{3,}|~{3,}").expect("valid regex"));
static DASH_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{3,}").expect("valid regex"));
static EQUALS_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"={3,}").expect("valid regex"));
static HASH_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#{3,}").expect("valid regex"));
static SPECIAL_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<\||\|>").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Cleans one source result.
///
/// Control characters are dropped, fence and separator runs are shortened so
/// they cannot close or open prompt sections, whitespace is collapsed, and the
/// result is cut to `max_chars` characters plus [`TRUNCATION_MARKER`].
pub fn sanitize(value: &str, max_chars: usize) -> String {
    let stripped: String = value
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect();

    let text = CODE_FENCE.replace_all(&stripped, "'''");
    let text = DASH_RUN.replace_all(&text, "-");
    let text = EQUALS_RUN.replace_all(&text, "=");
    let text = HASH_RUN.replace_all(&text, "#");
    let text = SPECIAL_TOKEN.replace_all(&text, "|");
    let text = WHITESPACE.replace_all(&text, " ");
    let text = text.trim();

    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Sanitizes every entry of a fan-out aggregate.
pub fn sanitize_results(results: &FanoutResults, max_chars: usize) -> FanoutResults {
    results.map_text(|text| sanitize(text, max_chars))
}

/// Renders sanitized results as one labeled block in fixed source order.
pub fn build_context(results: &FanoutResults) -> String {
    let mut lines = vec![CONTEXT_HEADER.to_string()];
    for source in SearchSource::ALL {
        if let Some(outcome) = results.get(source) {
            lines.push(format!("[{}]: {}", source.label(), outcome.text()));
        }
    }
    lines.push(CONTEXT_FOOTER.to_string());
    lines.join("\n")
}
