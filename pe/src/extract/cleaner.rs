//! Response cleaner - strips structured-data spans from display text
//!
//! Runs independently of extraction: whatever the extractor managed to parse,
//! the caller-visible text must not contain raw JSON fences or directive
//! markers.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Directive markers the assistant is prompted with; dropped from display text
const DIRECTIVE_MARKERS: &[&str] = &["JSON:", "STRUCTURED DATA:", "DATA:"];

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?.*?```").unwrap())
}

fn blank_runs_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap())
}

/// Strip fenced JSON blocks, bare JSON spans and directive markers
///
/// Fenced blocks are removed when their body parses as JSON (code examples in
/// other languages survive). Bare `{...}`/`[...]` spans are removed only when
/// they parse. The result is whitespace-normalized.
pub fn clean_response(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for m in fence_re().find_iter(text) {
        out.push_str(&text[last..m.start()]);
        if !fence_holds_json(m.as_str()) {
            out.push_str(m.as_str());
        }
        last = m.end();
    }
    out.push_str(&text[last..]);

    let out = strip_bare_json_spans(&out);
    let out = strip_directive_markers(&out);

    blank_runs_re().replace_all(&out, "\n\n").trim().to_string()
}

fn fence_holds_json(fence: &str) -> bool {
    let inner = fence
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim_start_matches(|c: char| c.is_alphanumeric() || c == '_' || c == '-')
        .trim();
    serde_json::from_str::<Value>(inner)
        .map(|v| v.is_object() || v.is_array())
        .unwrap_or(false)
}

/// Remove every bare balanced span that parses as a JSON object or array
fn strip_bare_json_spans(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    loop {
        let Some(start) = rest.find(['{', '[']) else {
            out.push_str(rest);
            break;
        };

        match balanced_end(rest, start) {
            Some(end) if serde_json::from_str::<Value>(&rest[start..end]).is_ok() => {
                out.push_str(&rest[..start]);
                rest = &rest[end..];
            }
            _ => {
                // Not a JSON span; keep the bracket and move past it
                out.push_str(&rest[..=start]);
                rest = &rest[start + 1..];
            }
        }
    }

    out
}

/// Byte offset one past the close of the balanced span starting at `start`
fn balanced_end(text: &str, start: usize) -> Option<usize> {
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
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

fn strip_directive_markers(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !DIRECTIVE_MARKERS
                .iter()
                .any(|marker| trimmed.eq_ignore_ascii_case(marker.trim_end_matches(':')) || trimmed == *marker)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_json_fence() {
        let text = "Great, noted!\n\n```json\n{\"a\": 1}\n```\n\nWhat about year two?";
        assert_eq!(clean_response(text), "Great, noted!\n\nWhat about year two?");
    }

    #[test]
    fn test_keeps_non_json_fence() {
        let text = "Try this:\n```python\nprint('hi')\n```\nDone.";
        let cleaned = clean_response(text);
        assert!(cleaned.contains("print('hi')"));
    }

    #[test]
    fn test_strips_bare_json_span() {
        let text = "Captured {\"vision\": \"grow\"} for you. Anything else?";
        assert_eq!(clean_response(text), "Captured  for you. Anything else?".trim());
    }

    #[test]
    fn test_keeps_non_json_braces() {
        let text = "Budget range {low to high} depends on scale.";
        assert_eq!(clean_response(text), text);
    }

    #[test]
    fn test_strips_directive_marker_lines() {
        let text = "Here is the summary.\nJSON:\nAll set.";
        assert_eq!(clean_response(text), "Here is the summary.\nAll set.");
    }

    #[test]
    fn test_untouched_text_survives() {
        let text = "Could you tell me more about your customers?";
        assert_eq!(clean_response(text), text);
    }

    #[test]
    fn test_collapses_blank_runs() {
        let text = "One.\n\n\n\nTwo.";
        assert_eq!(clean_response(text), "One.\n\nTwo.");
    }
}
