//! Risk scoring.
//!
//! Applies a fixed, ordered set of additive rules to the normalized
//! message and its indicators. The evaluation order is a contract: the
//! breakdown lists every award in exactly the order the rules ran, and
//! reports rely on that ordering.

use crate::config::RulesConfig;
use crate::indicators::Indicators;
use crate::message::NormalizedMessage;
use serde::Serialize;

/// SPF results that count against the sender.
const SPF_FAILING_RESULTS: &[&str] = &["fail", "softfail", "permerror"];
/// DKIM results that count against the sender.
const DKIM_FAILING_RESULTS: &[&str] = &["fail", "permerror"];

/// One award: the points granted and the human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleHit {
    pub points: i32,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    /// Clamped to 0..=100. The breakdown keeps the true per-rule points,
    /// so a reader can audit a raw sum above 100.
    pub total: i32,
    pub risk: RiskLevel,
    pub breakdown: Vec<RuleHit>,
}

trait ScoreRule {
    fn evaluate(
        &self,
        message: &NormalizedMessage,
        indicators: &Indicators,
        config: &RulesConfig,
    ) -> Vec<RuleHit>;
    fn name(&self) -> &str;
}

pub struct RiskScorer {
    rules: Vec<Box<dyn ScoreRule>>,
    config: RulesConfig,
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new(RulesConfig::default())
    }
}

impl RiskScorer {
    pub fn new(config: RulesConfig) -> Self {
        Self {
            // Evaluation order is part of the output contract.
            rules: vec![
                Box::new(ReplyToMismatchRule),
                Box::new(SpfRule),
                Box::new(DkimRule),
                Box::new(DmarcRule),
                Box::new(UrlPresenceRule),
                Box::new(RiskyTldRule),
                Box::new(PunycodeRule),
                Box::new(AttachmentPresenceRule),
                Box::new(AttachmentExtensionRule),
            ],
            config,
        }
    }

    pub fn score(&self, message: &NormalizedMessage, indicators: &Indicators) -> ScoreResult {
        let mut breakdown = Vec::new();
        for rule in &self.rules {
            let hits = rule.evaluate(message, indicators, &self.config);
            for hit in &hits {
                log::debug!("rule '{}' awarded {}: {}", rule.name(), hit.points, hit.reason);
            }
            breakdown.extend(hits);
        }

        let raw_total: i32 = breakdown.iter().map(|hit| hit.points).sum();
        let total = raw_total.clamp(0, 100);
        let risk = self.risk_label(total);

        ScoreResult {
            total,
            risk,
            breakdown,
        }
    }

    fn risk_label(&self, total: i32) -> RiskLevel {
        if total >= self.config.thresholds.high {
            RiskLevel::High
        } else if total >= self.config.thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

struct ReplyToMismatchRule;

impl ScoreRule for ReplyToMismatchRule {
    fn evaluate(
        &self,
        _message: &NormalizedMessage,
        indicators: &Indicators,
        config: &RulesConfig,
    ) -> Vec<RuleHit> {
        if indicators.from_reply_to_mismatch {
            vec![RuleHit {
                points: config.weights.reply_to_mismatch,
                reason: "From and Reply-To domains do not match.".to_string(),
            }]
        } else {
            Vec::new()
        }
    }

    fn name(&self) -> &str {
        "reply-to-mismatch"
    }
}

struct SpfRule;

impl ScoreRule for SpfRule {
    fn evaluate(
        &self,
        _message: &NormalizedMessage,
        indicators: &Indicators,
        config: &RulesConfig,
    ) -> Vec<RuleHit> {
        let spf = indicators.auth.spf.as_str();
        if SPF_FAILING_RESULTS.contains(&spf) {
            vec![RuleHit {
                points: config.weights.spf_failure,
                reason: format!("SPF result is {spf}."),
            }]
        } else {
            Vec::new()
        }
    }

    fn name(&self) -> &str {
        "spf-failure"
    }
}

struct DkimRule;

impl ScoreRule for DkimRule {
    fn evaluate(
        &self,
        _message: &NormalizedMessage,
        indicators: &Indicators,
        config: &RulesConfig,
    ) -> Vec<RuleHit> {
        let dkim = indicators.auth.dkim.as_str();
        if DKIM_FAILING_RESULTS.contains(&dkim) {
            vec![RuleHit {
                points: config.weights.dkim_failure,
                reason: format!("DKIM result is {dkim}."),
            }]
        } else {
            Vec::new()
        }
    }

    fn name(&self) -> &str {
        "dkim-failure"
    }
}

struct DmarcRule;

impl ScoreRule for DmarcRule {
    fn evaluate(
        &self,
        _message: &NormalizedMessage,
        indicators: &Indicators,
        config: &RulesConfig,
    ) -> Vec<RuleHit> {
        if indicators.auth.dmarc == "fail" {
            vec![RuleHit {
                points: config.weights.dmarc_failure,
                reason: "DMARC result is fail.".to_string(),
            }]
        } else {
            Vec::new()
        }
    }

    fn name(&self) -> &str {
        "dmarc-failure"
    }
}

struct UrlPresenceRule;

impl ScoreRule for UrlPresenceRule {
    fn evaluate(
        &self,
        _message: &NormalizedMessage,
        indicators: &Indicators,
        config: &RulesConfig,
    ) -> Vec<RuleHit> {
        let count = indicators.url_details.len();
        if count > 0 {
            vec![RuleHit {
                points: config.weights.url_present,
                reason: format!("Email contains {count} URL(s)."),
            }]
        } else {
            Vec::new()
        }
    }

    fn name(&self) -> &str {
        "url-present"
    }
}

struct RiskyTldRule;

impl ScoreRule for RiskyTldRule {
    fn evaluate(
        &self,
        _message: &NormalizedMessage,
        indicators: &Indicators,
        config: &RulesConfig,
    ) -> Vec<RuleHit> {
        let risky = indicators
            .url_details
            .iter()
            .filter(|detail| detail.risky_tld)
            .count() as i32;
        if risky > 0 {
            let points = (risky * config.weights.risky_tld_per_url).min(config.weights.risky_tld_cap);
            vec![RuleHit {
                points,
                reason: format!("{risky} URL(s) use a risky TLD."),
            }]
        } else {
            Vec::new()
        }
    }

    fn name(&self) -> &str {
        "risky-tld"
    }
}

struct PunycodeRule;

impl ScoreRule for PunycodeRule {
    fn evaluate(
        &self,
        _message: &NormalizedMessage,
        indicators: &Indicators,
        config: &RulesConfig,
    ) -> Vec<RuleHit> {
        let punycode = indicators
            .url_details
            .iter()
            .filter(|detail| detail.punycode)
            .count() as i32;
        if punycode > 0 {
            let points = (punycode * config.weights.punycode_per_url).min(config.weights.punycode_cap);
            vec![RuleHit {
                points,
                reason: format!(
                    "{punycode} URL domain(s) appear punycode-encoded (possible lookalike)."
                ),
            }]
        } else {
            Vec::new()
        }
    }

    fn name(&self) -> &str {
        "punycode-url"
    }
}

struct AttachmentPresenceRule;

impl ScoreRule for AttachmentPresenceRule {
    fn evaluate(
        &self,
        message: &NormalizedMessage,
        _indicators: &Indicators,
        config: &RulesConfig,
    ) -> Vec<RuleHit> {
        let count = message.attachments.len();
        if count > 0 {
            vec![RuleHit {
                points: config.weights.attachment_present,
                reason: format!("Email contains {count} attachment(s)."),
            }]
        } else {
            Vec::new()
        }
    }

    fn name(&self) -> &str {
        "attachment-present"
    }
}

struct AttachmentExtensionRule;

impl ScoreRule for AttachmentExtensionRule {
    fn evaluate(
        &self,
        message: &NormalizedMessage,
        _indicators: &Indicators,
        config: &RulesConfig,
    ) -> Vec<RuleHit> {
        let mut hits = Vec::new();
        for attachment in &message.attachments {
            let filename = attachment.filename.to_lowercase();
            // One award per attachment: stop at the first matching
            // extension.
            if let Some(extension) = config
                .high_risk_extensions
                .iter()
                .find(|extension| filename.ends_with(extension.as_str()))
            {
                hits.push(RuleHit {
                    points: config.weights.high_risk_extension,
                    reason: format!(
                        "Attachment '{filename}' has high-risk extension {extension}."
                    ),
                });
            }
        }
        hits
    }

    fn name(&self) -> &str {
        "high-risk-attachment-extension"
    }
}
