// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! XSS screening and input sanitization.
//!
//! Two different responses to suspicious input:
//!
//! - [`detect_xss`] rejects. It runs on raw keystrokes, and a field that
//!   trips it is discarded outright.
//! - [`sanitize_input`] and [`sanitize_string`] clean and keep. The first
//!   also entity-encodes for display; the second only strips, for values that
//!   are persisted or compared. Their outputs differ on purpose and callers
//!   pick one per field.
//!
//! Detection is a denylist of independent patterns, checked in order. It is
//! a cheap heuristic for common payloads, not an HTML parser.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Patterns that mark input as an XSS attempt, checked in order.
static XSS_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("script_tag", r"(?is)<script\b[^>]*>.*?</script\s*>"),
        ("javascript_uri", r"(?i)javascript:"),
        ("event_handler", r"(?i)\bon\w+\s*="),
        ("img_onerror", r"(?i)<img\b[^>]*\bonerror"),
        ("svg_onload", r"(?i)<svg\b[^>]*\bonload"),
        ("css_expression", r"(?i)expression\s*\("),
        ("data_url", r#"(?i)url\s*\(\s*['"]?\s*data:"#),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).unwrap()))
    .collect()
});

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static JAVASCRIPT_URI: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)javascript:").unwrap());
static EVENT_HANDLER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bon\w+\s*=").unwrap());
static DATA_URI: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bdata:").unwrap());
static CSS_EXPRESSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)expression\s*\(").unwrap());

/// Entities emitted by [`sanitize_input`]. An `&` already starting one of
/// these is not encoded again.
const ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&#x27;"];

/// Returns true if `input` matches any known XSS pattern.
pub fn detect_xss(input: &str) -> bool {
    match XSS_PATTERNS.iter().find(|(_, re)| re.is_match(input)) {
        Some((name, _)) => {
            debug!(pattern = name, "XSS pattern detected");
            true
        }
        None => false,
    }
}

/// [`detect_xss`] over arbitrary form values. Non-strings are never flagged.
pub fn detect_xss_value(input: &Value) -> bool {
    input.as_str().is_some_and(detect_xss)
}

/// Strip markup and script vectors, then HTML-encode what is left.
///
/// Steps: tags, `javascript:`, inline event handlers, `data:` prefixes and
/// CSS `expression(` are removed (repeated until nothing matches, so split
/// payloads cannot reassemble), then `& < > " '` are entity-encoded and the
/// result trimmed. Applying it twice gives the same result as once.
pub fn sanitize_input(input: &str) -> String {
    let stripped = strip_to_fixpoint(
        input,
        &[&TAG, &JAVASCRIPT_URI, &EVENT_HANDLER, &DATA_URI, &CSS_EXPRESSION],
    );
    encode_entities(&stripped).trim().to_string()
}

/// [`sanitize_input`] over arbitrary form values. Non-strings become `""`.
pub fn sanitize_input_value(input: &Value) -> String {
    input.as_str().map(sanitize_input).unwrap_or_default()
}

/// Strip tags, `javascript:` and inline event handlers, then trim.
///
/// No entity encoding: the result is meant for persisting and comparing.
pub fn sanitize_string(input: &str) -> String {
    strip_to_fixpoint(input, &[&TAG, &JAVASCRIPT_URI, &EVENT_HANDLER])
        .trim()
        .to_string()
}

/// [`sanitize_string`] over arbitrary form values. Non-strings become `""`.
pub fn sanitize_string_value(input: &Value) -> String {
    input.as_str().map(sanitize_string).unwrap_or_default()
}

/// True if `input` contains anything shaped like a tag.
pub fn contains_tag(input: &str) -> bool {
    TAG.is_match(input)
}

fn strip_to_fixpoint(input: &str, patterns: &[&Regex]) -> String {
    let mut current = input.to_string();
    loop {
        let mut next = current.clone();
        for re in patterns {
            next = re.replace_all(&next, "").into_owned();
        }
        // Every pattern matches at least one char, so this terminates
        if next == current {
            return current;
        }
        current = next;
    }
}

fn encode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for (i, c) in input.char_indices() {
        match c {
            '&' if ENTITIES.iter().any(|e| input[i..].starts_with(e)) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
