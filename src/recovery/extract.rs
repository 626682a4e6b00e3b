use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Fenced code block patterns, tried in order: tagged or untagged fence with loose
/// whitespace, newline-delimited fence, bare fence.
static FENCE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?is)```(?:json)?\s*(\{.*?\})\s*```").expect("Invalid fenced JSON regex"),
        Regex::new(r"(?is)```(?:json)?\n(\{.*?\})\n```").expect("Invalid newline-fenced JSON regex"),
        Regex::new(r"(?s)```(\{.*?\})```").expect("Invalid bare-fenced JSON regex"),
    ]
});

/// Locates the JSON object inside a model response. Returns `None` when the text has
/// no `{` or the first object never closes.
pub fn extract_json(raw: &str) -> Option<&str> {
    extract_fenced(raw).or_else(|| {
        debug!("No fenced code block found, scanning for a raw JSON object");
        extract_balanced(raw)
    })
}

fn extract_fenced(raw: &str) -> Option<&str> {
    FENCE_PATTERNS.iter().enumerate().find_map(|(index, pattern)| {
        let body = pattern.captures(raw)?.get(1)?.as_str().trim();
        debug!(pattern = index + 1, "Found fenced JSON block");
        Some(body)
    })
}

/// Walks from the first `{` counting brace depth until it returns to zero.
fn extract_balanced(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in raw[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}
