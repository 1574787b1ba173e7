//! Shared helpers: the browser-like HTTP client and string truncation.

use rand::prelude::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use std::time::Duration;

/// Small pool of current desktop User-Agent strings. One is picked per
/// request so repeated polls do not present a single fingerprint.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
];

pub fn random_user_agent() -> &'static str {
    let mut rng = rand::rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Build the shared HTTP client with a realistic browser identity and an
/// explicit per-request timeout so one unresponsive host cannot stall the
/// run. The User-Agent rotates per request, the rest of the identity is
/// fixed here.
pub fn browser_client(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Truncate a string for logging purposes, appending a byte-count marker.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let cut = s
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= max)
            .last()
            .unwrap_or(0);
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

/// Truncate `s` to at most `max_chars` characters, cutting at a word
/// boundary where possible and appending an ellipsis marker. Strings at
/// or under the limit are returned untouched; truncated output never
/// exceeds `max_chars` characters, marker included.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    let total = s.chars().count();
    if total <= max_chars {
        return s.to_string();
    }

    // Reserve one character for the marker.
    let budget = max_chars - 1;
    let cut = s
        .char_indices()
        .nth(budget)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let mut head = &s[..cut];
    if let Some(ws) = head.rfind(char::is_whitespace) {
        if ws > 0 {
            head = &head[..ws];
        }
    }
    let mut out = head.trim_end().to_string();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("bytes)"));
    }

    #[test]
    fn test_truncate_with_ellipsis_at_limit_untouched() {
        let s = "a".repeat(80);
        assert_eq!(truncate_with_ellipsis(&s, 80), s);
    }

    #[test]
    fn test_truncate_with_ellipsis_one_over_limit() {
        let s = "a".repeat(81);
        let out = truncate_with_ellipsis(&s, 80);
        assert!(out.ends_with('…'));
        assert!(out.chars().count() <= 80);
    }

    #[test]
    fn test_truncate_with_ellipsis_prefers_word_boundary() {
        let s = "the quick brown fox jumps over the lazy dog";
        let out = truncate_with_ellipsis(s, 20);
        assert!(out.chars().count() <= 20);
        assert!(out.ends_with('…'));
        // no half-word before the marker
        let body = out.trim_end_matches('…');
        assert!(s.split_whitespace().any(|w| body.ends_with(w)));
    }

    #[test]
    fn test_truncate_with_ellipsis_multibyte() {
        let s = "мода ".repeat(40);
        let out = truncate_with_ellipsis(&s, 50);
        assert!(out.chars().count() <= 50);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn test_random_user_agent_is_from_pool() {
        let ua = random_user_agent();
        assert!(USER_AGENTS.contains(&ua));
    }
}
