//! URL extraction from message bodies.
//!
//! Plaintext bodies are scanned for schemed URLs and bare `www.` tokens;
//! HTML bodies additionally contribute every anchor `href` value. The
//! combined result is cleaned, deduplicated and sorted so downstream
//! stages see a deterministic list.

use regex::Regex;
use std::collections::BTreeSet;

/// Punctuation stripped from the end of every raw match.
const TRAILING_PUNCTUATION: &[char] = &[')', '.', ',', ';', '!', '"', '\'', '<', '>'];

pub struct UrlExtractor {
    url_pattern: Regex,
    href_pattern: Regex,
}

impl Default for UrlExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlExtractor {
    pub fn new() -> Self {
        Self {
            // Tokens starting http://, https:// or www., terminated at
            // whitespace or any of <>'"
            url_pattern: Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>'"]+"#).unwrap(),
            href_pattern: Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#).unwrap(),
        }
    }

    /// Scan plain text for URLs. Bare `www.` matches are rewritten with an
    /// `http://` prefix so every result is a schemed absolute URL.
    pub fn extract_from_text(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();
        for m in self.url_pattern.find_iter(text) {
            let cleaned = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
            if cleaned.is_empty() {
                continue;
            }
            if cleaned.len() >= 4 && cleaned[..4].eq_ignore_ascii_case("www.") {
                found.push(format!("http://{cleaned}"));
            } else {
                found.push(cleaned.to_string());
            }
        }
        found
    }

    /// Scan HTML for URLs: every anchor `href` value is run through the
    /// plaintext extractor (an href may be the URL itself or text containing
    /// one), and the full markup is re-scanned for URLs outside anchors.
    pub fn extract_from_html(&self, html: &str) -> Vec<String> {
        let mut found = Vec::new();
        for cap in self.href_pattern.captures_iter(html) {
            found.extend(self.extract_from_text(&cap[1]));
        }
        found.extend(self.extract_from_text(html));
        found
    }

    /// Sorted, duplicate-free union of both body scans.
    pub fn collect(&self, body_text: &str, body_html: &str) -> Vec<String> {
        let mut set = BTreeSet::new();
        set.extend(self.extract_from_text(body_text));
        set.extend(self.extract_from_html(body_html));
        set.into_iter().filter(|u| !u.is_empty()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_schemed_urls() {
        let extractor = UrlExtractor::new();
        let urls = extractor.extract_from_text("visit https://example.com/login today");
        assert_eq!(urls, vec!["https://example.com/login"]);
    }

    #[test]
    fn test_strips_trailing_punctuation() {
        let extractor = UrlExtractor::new();
        let urls = extractor.extract_from_text("see (http://example.com/a), or http://example.com/b.");
        assert_eq!(urls, vec!["http://example.com/a", "http://example.com/b"]);
    }

    #[test]
    fn test_rewrites_bare_www() {
        let extractor = UrlExtractor::new();
        let urls = extractor.extract_from_text("go to www.example.com now");
        assert_eq!(urls, vec!["http://www.example.com"]);
    }

    #[test]
    fn test_case_insensitive_scheme() {
        let extractor = UrlExtractor::new();
        let urls = extractor.extract_from_text("HTTPS://EXAMPLE.COM and WWW.other.org");
        assert_eq!(urls, vec!["HTTPS://EXAMPLE.COM", "http://WWW.other.org"]);
    }

    #[test]
    fn test_terminates_at_angle_brackets_and_quotes() {
        let extractor = UrlExtractor::new();
        let urls = extractor.extract_from_text("<http://example.com/path>\"http://example.com/q\"");
        assert_eq!(urls, vec!["http://example.com/path", "http://example.com/q"]);
    }

    #[test]
    fn test_href_extraction() {
        let extractor = UrlExtractor::new();
        let html = r#"<p>hi</p><a href="http://example.com/x">click</a><A HREF='www.example.org'>go</A>"#;
        let urls = extractor.extract_from_html(html);
        assert!(urls.contains(&"http://example.com/x".to_string()));
        assert!(urls.contains(&"http://www.example.org".to_string()));
    }

    #[test]
    fn test_html_raw_text_scan_catches_unanchored_urls() {
        let extractor = UrlExtractor::new();
        let html = "<p>plain mention: http://example.com/bare</p>";
        let urls = extractor.extract_from_html(html);
        assert_eq!(urls, vec!["http://example.com/bare"]);
    }

    #[test]
    fn test_relative_hrefs_are_dropped() {
        let extractor = UrlExtractor::new();
        let urls = extractor.extract_from_html(r#"<a href="/account/reset">reset</a>"#);
        assert!(urls.is_empty());
    }

    #[test]
    fn test_collect_is_sorted_and_deduplicated() {
        let extractor = UrlExtractor::new();
        let text = "http://b.example.com http://a.example.com";
        let html = r#"<a href="http://a.example.com">a</a> http://b.example.com"#;
        let urls = extractor.collect(text, html);
        assert_eq!(urls, vec!["http://a.example.com", "http://b.example.com"]);
    }

    #[test]
    fn test_no_result_has_trailing_strip_punctuation() {
        let extractor = UrlExtractor::new();
        let text = "http://a.com). www.b.com;! http://c.com/path,'";
        for url in extractor.collect(text, "") {
            let last = url.chars().last().unwrap();
            assert!(
                !TRAILING_PUNCTUATION.contains(&last),
                "{url} kept trailing punctuation"
            );
        }
    }
}
