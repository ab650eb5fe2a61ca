//! End-to-end composition of the triage pipeline.
//!
//! Normalizer, indicator extractor and scorer run strictly in that
//! order; each stage consumes the previous stage's record by reference
//! and nothing flows backwards.

use crate::config::RulesConfig;
use crate::indicators::{IndicatorExtractor, Indicators};
use crate::message::NormalizedMessage;
use crate::parser::{MessageNormalizer, ParseError};
use crate::scoring::{RiskScorer, ScoreResult};
use serde::Serialize;

/// The full output triple handed to renderers and exporters. Every
/// field is always present; absence is expressed as an empty value,
/// never a missing key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageResult {
    pub message: NormalizedMessage,
    pub indicators: Indicators,
    pub score: ScoreResult,
}

pub struct TriagePipeline {
    normalizer: MessageNormalizer,
    extractor: IndicatorExtractor,
    scorer: RiskScorer,
}

impl Default for TriagePipeline {
    fn default() -> Self {
        Self::new(RulesConfig::default())
    }
}

impl TriagePipeline {
    pub fn new(config: RulesConfig) -> Self {
        Self {
            normalizer: MessageNormalizer::new(),
            extractor: IndicatorExtractor::new(&config),
            scorer: RiskScorer::new(config),
        }
    }

    /// Analyze one raw message. The only failure is an unparseable
    /// transport envelope; everything downstream of the normalizer is
    /// infallible by design.
    pub fn run(&self, raw: &[u8]) -> Result<TriageResult, ParseError> {
        let message = self.normalizer.normalize(raw)?;
        let indicators = self.extractor.extract(&message);
        let score = self.scorer.score(&message, &indicators);
        log::info!(
            "triage complete: score {} ({:?}), {} finding(s)",
            score.total,
            score.risk,
            score.breakdown.len()
        );
        Ok(TriageResult {
            message,
            indicators,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::RiskLevel;

    fn run(raw: &str) -> TriageResult {
        TriagePipeline::default().run(raw.as_bytes()).unwrap()
    }

    #[test]
    fn test_scenario_mismatch_only() {
        let email = "\
From: a@example.com\r\n\
Reply-To: b@evil.com\r\n\
Subject: hello\r\n\
Content-Type: text/plain\r\n\
\r\n\
no links here\r\n";
        let result = run(email);

        assert_eq!(result.indicators.from_domain, "example.com");
        assert_eq!(result.indicators.reply_to_domain, "evil.com");
        assert!(result.indicators.from_reply_to_mismatch);
        assert_eq!(result.score.total, 25);
        assert_eq!(result.score.risk, RiskLevel::Low);
        assert_eq!(result.score.breakdown.len(), 1);
    }

    #[test]
    fn test_scenario_auth_failures_with_punycode_url() {
        let email = "\
From: accounts@example.com\r\n\
Reply-To: accounts@example.com\r\n\
Subject: verify\r\n\
Authentication-Results: mx.example.com; spf=fail dkim=pass dmarc=fail\r\n\
Content-Type: text/plain\r\n\
\r\n\
Sign in at http://xn--80ak6aa92e.com/login today\r\n";
        let result = run(email);

        assert!(!result.indicators.from_reply_to_mismatch);
        assert_eq!(result.indicators.auth.spf, "fail");
        assert_eq!(result.indicators.auth.dkim, "pass");
        assert_eq!(result.indicators.auth.dmarc, "fail");
        assert_eq!(result.indicators.url_details.len(), 1);
        assert!(result.indicators.url_details[0].punycode);
        // 20 (spf) + 20 (dmarc) + 5 (url) + 8 (one punycode url) = 53.
        assert_eq!(result.score.total, 53);
        assert_eq!(result.score.risk, RiskLevel::Medium);
    }

    #[test]
    fn test_scenario_risky_attachment_and_tlds() {
        let email = "\
From: billing@example.com\r\n\
Subject: invoice attached\r\n\
Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain\r\n\
\r\n\
Pay at http://pay.example.xyz/now or http://alt.example.xyz/backup\r\n\
--b1\r\n\
Content-Type: application/octet-stream; name=\"invoice.EXE\"\r\n\
Content-Disposition: attachment; filename=\"invoice.EXE\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
TVqQAAMAAAAE\r\n\
--b1--\r\n";
        let result = run(email);

        assert_eq!(result.message.attachments.len(), 1);
        assert_eq!(result.indicators.url_details.len(), 2);
        assert!(result.indicators.url_details.iter().all(|u| u.risky_tld));
        // 5 (urls) + 10 (two risky TLDs) + 10 (attachment) + 20 (.exe) = 45.
        assert_eq!(result.score.total, 45);
        assert_eq!(result.score.risk, RiskLevel::Medium);
    }

    #[test]
    fn test_scenario_clean_message() {
        let email = "\
From: friend@example.com\r\n\
Reply-To: friend@example.com\r\n\
Subject: lunch?\r\n\
Content-Type: text/plain\r\n\
\r\n\
Same place as always?\r\n";
        let result = run(email);

        assert_eq!(result.score.total, 0);
        assert_eq!(result.score.risk, RiskLevel::Low);
        assert!(result.score.breakdown.is_empty());
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let email = "\
From: a@example.com\r\n\
Reply-To: b@evil.com\r\n\
Subject: repeat\r\n\
Authentication-Results: spf=softfail\r\n\
Content-Type: text/plain\r\n\
\r\n\
http://a.example.zip http://xn--b.example.com\r\n";
        let first = run(email);
        let second = run(email);
        assert_eq!(first, second);
    }

    #[test]
    fn test_total_never_exceeds_hundred() {
        let email = "\
From: a@example.com\r\n\
Reply-To: b@evil.com\r\n\
Subject: everything at once\r\n\
Authentication-Results: spf=fail; dkim=fail; dmarc=fail\r\n\
Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain\r\n\
\r\n\
http://a.example.zip http://b.example.top http://xn--c.example.com\r\n\
--b1\r\n\
Content-Type: application/octet-stream\r\n\
Content-Disposition: attachment; filename=\"a.exe\"\r\n\
\r\n\
xx\r\n\
--b1\r\n\
Content-Type: application/octet-stream\r\n\
Content-Disposition: attachment; filename=\"b.scr\"\r\n\
\r\n\
yy\r\n\
--b1--\r\n";
        let result = run(email);

        let raw_sum: i32 = result.score.breakdown.iter().map(|hit| hit.points).sum();
        assert!(raw_sum > 100, "fixture should overflow the cap, got {raw_sum}");
        assert_eq!(result.score.total, 100);
        assert_eq!(result.score.risk, RiskLevel::High);
    }
}
