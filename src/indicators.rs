//! Indicator extraction.
//!
//! Derives comparison and classification signals from a normalized
//! message: sender/reply-to domains and their mismatch, best-effort
//! authentication results, and per-URL classification. This stage never
//! fails; anything unparseable degrades to an empty string or a false
//! flag.

use crate::config::RulesConfig;
use crate::message::NormalizedMessage;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use url::Url;

/// Canonical result tokens recognized per authentication mechanism.
pub const SPF_RESULT_TOKENS: &[&str] = &[
    "pass", "fail", "softfail", "neutral", "none", "temperror", "permerror",
];
pub const DKIM_RESULT_TOKENS: &[&str] =
    &["pass", "fail", "neutral", "none", "temperror", "permerror"];
pub const DMARC_RESULT_TOKENS: &[&str] = &["pass", "fail", "bestguesspass", "none"];

/// ASCII compatibility encoding prefix marking an internationalized label.
const PUNYCODE_PREFIX: &str = "xn--";

/// Best-effort authentication results. Each field is one canonical
/// lowercase token, or empty when the mechanism was not found at all —
/// distinct from an explicit "none" result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthResults {
    pub spf: String,
    pub dkim: String,
    pub dmarc: String,
    /// Untouched concatenation of the two source headers, for audit.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlDetail {
    pub url: String,
    pub domain: String,
    pub domain_display: String,
    pub tld: String,
    pub punycode: bool,
    pub risky_tld: bool,
    /// Enrichment placeholder; never populated by this pipeline.
    pub domain_age_days: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Indicators {
    pub from_domain: String,
    pub reply_to_domain: String,
    pub from_reply_to_mismatch: bool,
    pub auth: AuthResults,
    pub url_details: Vec<UrlDetail>,
}

pub struct IndicatorExtractor {
    spf_pattern: Regex,
    dkim_pattern: Regex,
    dmarc_pattern: Regex,
    risky_tlds: BTreeSet<String>,
}

impl Default for IndicatorExtractor {
    fn default() -> Self {
        Self::new(&RulesConfig::default())
    }
}

impl IndicatorExtractor {
    pub fn new(config: &RulesConfig) -> Self {
        Self {
            spf_pattern: result_pattern("spf", SPF_RESULT_TOKENS),
            dkim_pattern: result_pattern("dkim", DKIM_RESULT_TOKENS),
            dmarc_pattern: result_pattern("dmarc", DMARC_RESULT_TOKENS),
            risky_tlds: config.risky_tlds.clone(),
        }
    }

    pub fn extract(&self, message: &NormalizedMessage) -> Indicators {
        let from_domain = email_domain(&message.from_raw);
        let reply_to_domain = email_domain(&message.reply_to_raw);
        let from_reply_to_mismatch =
            !from_domain.is_empty() && !reply_to_domain.is_empty() && from_domain != reply_to_domain;

        let auth = self.extract_auth(&message.authentication_results, &message.received_spf);
        log::debug!(
            "auth results: spf='{}' dkim='{}' dmarc='{}'",
            auth.spf,
            auth.dkim,
            auth.dmarc
        );

        let url_details = message
            .urls
            .iter()
            .map(|url| self.classify_url(url))
            .collect();

        Indicators {
            from_domain,
            reply_to_domain,
            from_reply_to_mismatch,
            auth,
            url_details,
        }
    }

    /// First-occurrence match per mechanism over the lowercased
    /// concatenation of both source headers.
    fn extract_auth(&self, authentication_results: &str, received_spf: &str) -> AuthResults {
        let blob = format!("{authentication_results} {received_spf}")
            .trim()
            .to_lowercase();

        let pick = |pattern: &Regex| -> String {
            pattern
                .captures(&blob)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        let raw = if received_spf.is_empty() {
            authentication_results.to_string()
        } else {
            format!("{authentication_results}\n{received_spf}")
        };

        AuthResults {
            spf: pick(&self.spf_pattern),
            dkim: pick(&self.dkim_pattern),
            dmarc: pick(&self.dmarc_pattern),
            raw,
        }
    }

    fn classify_url(&self, url: &str) -> UrlDetail {
        let domain = url_domain(url);
        let tld = domain_tld(&domain);
        let punycode = is_punycode(&domain);
        let domain_display = if punycode {
            decode_idna(&domain)
        } else {
            domain.clone()
        };
        let risky_tld = !tld.is_empty() && self.risky_tlds.contains(&tld);

        UrlDetail {
            url: url.to_string(),
            domain,
            domain_display,
            tld,
            punycode,
            risky_tld,
            domain_age_days: None,
        }
    }
}

fn result_pattern(mechanism: &str, tokens: &[&str]) -> Regex {
    Regex::new(&format!(r"\b{}=({})\b", mechanism, tokens.join("|"))).unwrap()
}

/// Lowercased domain part of the first address in a header value.
/// Handles both bare addresses and the display-name `<addr>` form; a
/// value without `@` yields an empty domain.
pub fn email_domain(raw: &str) -> String {
    let trimmed = raw.trim();
    let addr = match trimmed.find('<') {
        Some(start) => {
            let rest = &trimmed[start + 1..];
            match rest.find('>') {
                Some(end) => &rest[..end],
                None => rest,
            }
        }
        None => trimmed.split(',').next().unwrap_or(trimmed).trim(),
    };
    match addr.split_once('@') {
        Some((_, domain)) => domain
            .to_lowercase()
            .trim_matches(|c| c == '>' || c == ' ')
            .to_string(),
        None => String::new(),
    }
}

/// Lowercased hostname of a URL; empty when the URL does not parse.
fn url_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| host.to_lowercase()))
        .unwrap_or_default()
}

/// Last label of a domain with at least two labels, else empty.
fn domain_tld(domain: &str) -> String {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() >= 2 {
        labels.last().unwrap_or(&"").to_lowercase()
    } else {
        String::new()
    }
}

fn is_punycode(domain: &str) -> bool {
    domain
        .split('.')
        .any(|label| label.starts_with(PUNYCODE_PREFIX))
}

/// IDNA-decoded display form; decode failure falls back to the raw
/// (possibly punycode) domain.
fn decode_idna(domain: &str) -> String {
    let (decoded, outcome) = idna::domain_to_unicode(domain);
    if outcome.is_ok() && !decoded.is_empty() {
        decoded
    } else {
        log::debug!("idna decode failed for '{domain}', keeping raw form");
        domain.to_string()
    }
}
