//! Extraction engine - scrapes structured payloads out of assistant free text
//!
//! The assistant is asked to embed a JSON fragment in its conversational
//! reply. This module finds it: a fenced block tagged as JSON first, then any
//! fenced block, then the first bare `{...}`/`[...]` span. Extraction never
//! fails the request; anything unparseable is reported as `NoPayload`.

mod cleaner;

pub use cleaner::clean_response;

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// Outcome of scanning one assistant reply
///
/// Ephemeral: never persisted, only folded into the document by the merger.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    Payload(Value),
    NoPayload,
}

impl ExtractionResult {
    /// Consume into an optional payload
    pub fn into_payload(self) -> Option<Value> {
        match self {
            ExtractionResult::Payload(v) => Some(v),
            ExtractionResult::NoPayload => None,
        }
    }

    pub fn is_payload(&self) -> bool {
        matches!(self, ExtractionResult::Payload(_))
    }
}

fn tagged_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?i:json)[ \t]*\r?\n(.*?)```").unwrap())
}

fn any_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").unwrap())
}

/// Scan assistant free text for an embedded structured payload
///
/// Matchers are tried in priority order; the first span found is parsed.
/// When an assistant reply contains several structured-looking spans only the
/// first match is used; later spans are ignored.
pub fn extract_payload(text: &str) -> ExtractionResult {
    let span = tagged_fence_re()
        .captures(text)
        .or_else(|| any_fence_re().captures(text))
        .map(|caps| caps[1].trim().to_string())
        .or_else(|| bare_span(text));

    let Some(span) = span else {
        debug!(text_len = text.len(), "extract_payload: no structured span found");
        return ExtractionResult::NoPayload;
    };

    match serde_json::from_str::<Value>(&span) {
        Ok(value) if value.is_object() || value.is_array() => ExtractionResult::Payload(value),
        Ok(_) => {
            debug!("extract_payload: span parsed to a scalar, ignoring");
            ExtractionResult::NoPayload
        }
        Err(e) => {
            debug!(error = %e, raw = %text, "extract_payload: span failed to parse");
            ExtractionResult::NoPayload
        }
    }
}

/// Find the first balanced `{...}` or `[...]` span, string- and escape-aware
fn bare_span(text: &str) -> Option<String> {
    let start = text.find(['{', '['])?;
    let bytes = text.as_bytes();
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            _ if b == open => depth += 1,
            _ if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..=i].to_string());
                }
            }
            _ => {}
        }
    }

    // Unbalanced span (e.g. truncated reply)
    None
}
