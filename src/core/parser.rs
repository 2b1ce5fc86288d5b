//! Parsing of free-form LLM replies into structured payloads.

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::GeneratorError;

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"```[\w-]*\s*\n?([\s\S]*?)```").expect("fence regex is valid")
    })
}

/// Extract the JSON body of an LLM reply.
///
/// Prefers the first fenced block; otherwise takes the span from the first
/// `[` or `{` to the matching last `]` or `}`; otherwise the trimmed reply.
pub fn extract_json(response: &str) -> &str {
    if let Some(body) = fence_re()
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
    {
        debug!("Extracted JSON from fenced block");
        return body;
    }

    let trimmed = response.trim();
    let start = trimmed.find(|c| c == '[' || c == '{');
    let end = trimmed.rfind(|c| c == ']' || c == '}');
    match (start, end) {
        (Some(s), Some(e)) if e > s => &trimmed[s..=e],
        _ => trimmed,
    }
}

/// Parse an LLM reply as JSON of type `T`
pub fn parse_reply<T: DeserializeOwned>(what: &str, response: &str) -> Result<T, GeneratorError> {
    let body = extract_json(response);
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        GeneratorError::new(format!("Failed to parse {} from model reply: {} ({})", what, e, preview))
    })
}
