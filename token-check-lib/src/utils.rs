//! Utility functions for token list processing and display.
//!
//! Helpers for parsing token lists and scope lists, masking tokens for
//! display, and parsing human duration strings from config and env.

use std::time::Duration;

/// Number of leading characters kept when a token is masked.
pub const MASK_PREFIX_CHARS: usize = 6;

/// Marker appended to masked tokens.
pub const MASK_MARKER: &str = "…";

/// Parse a token list: one token per line, whitespace trimmed, blank lines dropped.
///
/// Order is preserved and duplicates are kept; every line is its own unit of work.
pub fn parse_token_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Produce the display form of a token.
///
/// When masking, at most the first six characters survive followed by `…`.
pub fn mask_token(token: &str, mask: bool) -> String {
    if !mask {
        return token.to_string();
    }
    let prefix: String = token.chars().take(MASK_PREFIX_CHARS).collect();
    format!("{}{}", prefix, MASK_MARKER)
}

/// Return the first `max_chars` characters of `text` (char-boundary safe).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Split a comma-separated scope list into trimmed, non-empty, de-duplicated tokens.
///
/// First occurrence wins so the original order is kept.
pub fn parse_scope_list(raw: &str) -> Vec<String> {
    let mut scopes: Vec<String> = Vec::new();
    for scope in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !scopes.iter().any(|existing| existing == scope) {
            scopes.push(scope.to_string());
        }
    }
    scopes
}

/// Parse a duration string like "500ms", "1.5s", "30s", "2m".
///
/// A bare number is read as seconds. Returns `None` for anything else,
/// including negative values.
pub fn parse_duration_string(raw: &str) -> Option<Duration> {
    let raw = raw.trim().to_lowercase();

    let (number, millis_per_unit) = if let Some(ms) = raw.strip_suffix("ms") {
        (ms, 1.0)
    } else if let Some(secs) = raw.strip_suffix('s') {
        (secs, 1_000.0)
    } else if let Some(mins) = raw.strip_suffix('m') {
        (mins, 60_000.0)
    } else {
        (raw.as_str(), 1_000.0)
    };

    let value = number.trim().parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(Duration::from_millis((value * millis_per_unit).round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_list() {
        let content = "  tokA  \n\n\ttokB\n   \ntokA\n";
        assert_eq!(parse_token_list(content), vec!["tokA", "tokB", "tokA"]);
    }

    #[test]
    fn test_parse_token_list_empty() {
        assert!(parse_token_list("").is_empty());
        assert!(parse_token_list("\n  \n\t\n").is_empty());
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("ghp_abcdef123456", true), "ghp_ab…");
        assert_eq!(mask_token("ghp_abcdef123456", false), "ghp_abcdef123456");
        assert_eq!(mask_token("abc", true), "abc…");
    }

    #[test]
    fn test_mask_token_never_leaks_more_than_prefix() {
        let token = "0123456789abcdefghij";
        let masked = mask_token(token, true);
        let visible = masked.strip_suffix(MASK_MARKER).unwrap();
        assert!(visible.chars().count() <= MASK_PREFIX_CHARS);
        assert!(token.starts_with(visible));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 80), "hello");
        assert_eq!(truncate_chars("hello", 2), "he");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_parse_scope_list() {
        assert_eq!(
            parse_scope_list("repo, read:org ,, gist,repo"),
            vec!["repo", "read:org", "gist"]
        );
        assert!(parse_scope_list("").is_empty());
        assert!(parse_scope_list(" , ").is_empty());
    }

    #[test]
    fn test_parse_duration_string() {
        assert_eq!(parse_duration_string("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration_string("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration_string("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration_string("1.5"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration_string("0"), Some(Duration::ZERO));
        assert_eq!(parse_duration_string("-1s"), None);
        assert_eq!(parse_duration_string("soon"), None);
    }
}
