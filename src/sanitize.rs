//! Text sanitization for caller queries and provider output.
//!
//! Two strictness levels:
//! - `strict_query`: caller input that gets echoed back or stored as a label.
//!   Length-checked, all markup removed, HTML-escaped.
//! - `lenient`: provider display text. Never fails; only control characters
//!   and `<script>` blocks are removed and the result is length-capped.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_QUERY_CHARS: usize = 500;

/// Marker appended when lenient sanitization truncates text
pub const TRUNCATION_SUFFIX: &str = "...";

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SanitizeError {
    #[error("Search query must be at least {MIN_QUERY_CHARS} characters")]
    QueryTooShort,

    #[error("Search query cannot exceed {MAX_QUERY_CHARS} characters")]
    QueryTooLong,
}

/// Sanitize a caller-supplied search query.
pub fn strict_query(input: &str) -> Result<String, SanitizeError> {
    let trimmed = input.trim();
    let len = trimmed.chars().count();

    if len < MIN_QUERY_CHARS {
        return Err(SanitizeError::QueryTooShort);
    }
    if len > MAX_QUERY_CHARS {
        return Err(SanitizeError::QueryTooLong);
    }

    let text = strip_control(trimmed);
    let text = SCRIPT_BLOCK.replace_all(&text, "");
    let text = HTML_TAG.replace_all(&text, "");
    let text = collapse_whitespace(&text);

    // a query made only of markup leaves nothing to search for
    if text.chars().count() < MIN_QUERY_CHARS {
        return Err(SanitizeError::QueryTooShort);
    }

    Ok(escape_html(&text))
}

/// Sanitize provider text for display.
///
/// Truncated output is at most `max_chars` characters plus the suffix.
pub fn lenient(input: &str, max_chars: usize) -> String {
    let text = strip_control(input.trim());
    let text = SCRIPT_BLOCK.replace_all(&text, "");
    let text = collapse_whitespace(&text);

    if text.chars().count() <= max_chars {
        return text;
    }

    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}{TRUNCATION_SUFFIX}", truncated.trim_end())
}

/// Lenient sanitization of an arbitrary JSON value.
///
/// Anything that is not a string becomes an empty string.
pub fn lenient_value(value: Option<&Value>, max_chars: usize) -> String {
    match value {
        Some(Value::String(text)) => lenient(text, max_chars),
        _ => String::new(),
    }
}

/// Remove control characters. Whitespace controls become spaces so words on
/// separate lines stay separate.
fn strip_control(input: &str) -> String {
    input
        .chars()
        .filter_map(|c| match c {
            '\n' | '\r' | '\t' => Some(' '),
            c if c.is_control() => None,
            // zero-width and bidi formatting characters
            '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}' => None,
            c => Some(c),
        })
        .collect()
}

fn collapse_whitespace(input: &str) -> String {
    WHITESPACE_RUN.replace_all(input, " ").trim().to_string()
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '/' => escaped.push_str("&#x2F;"),
            c => escaped.push(c),
        }
    }
    escaped
}
