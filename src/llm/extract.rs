//! Lenient JSON extraction from generated text.
//!
//! Generated text is untrusted: it may be fenced, wrapped in prose, truncated
//! or not JSON at all. Extraction never fails; unusable input yields `{}`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Matches a fenced block, capturing the optional language tag and the interior.
/// An unterminated fence runs to the end of the text.
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+.-]*)[ \t]*\r?\n?(.*?)(?:```|\z)")
        .expect("fence pattern is valid")
});

/// Select the substring that should hold the JSON payload.
///
/// Prefers the first block tagged `json`, then the first fenced block of any
/// kind, then the whole text.
pub fn select_payload(text: &str) -> &str {
    let mut first_fenced: Option<&str> = None;

    for caps in FENCE.captures_iter(text) {
        let tag = caps.get(1).map_or("", |m| m.as_str());
        let Some(body) = caps.get(2).map(|m| m.as_str()) else {
            continue;
        };
        if tag.eq_ignore_ascii_case("json") {
            return body.trim();
        }
        if first_fenced.is_none() {
            first_fenced = Some(body.trim());
        }
    }

    first_fenced.unwrap_or_else(|| text.trim())
}

/// Parse the JSON payload out of generated text.
///
/// Returns the parsed value, or an empty object when nothing parses.
pub fn extract_json(text: &str) -> Value {
    let payload = select_payload(text);

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to parse JSON from generated text: {e}");
            debug!(raw = %text, "Unparseable generated text");
            Value::Object(Map::new())
        }
    }
}
