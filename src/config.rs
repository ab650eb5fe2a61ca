use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Scoring rule tables and weights.
///
/// The defaults are the built-in rule set; a YAML file with the same shape
/// can override any part of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// TLDs with elevated abuse rates. Matched against the last domain
    /// label, lowercased, without a leading dot.
    #[serde(default = "default_risky_tlds")]
    pub risky_tlds: BTreeSet<String>,
    /// Attachment filename suffixes treated as high risk, lowercased,
    /// with a leading dot. Order is the match order.
    #[serde(default = "default_high_risk_extensions")]
    pub high_risk_extensions: Vec<String>,
    #[serde(default)]
    pub weights: ScoreWeights,
    #[serde(default)]
    pub thresholds: RiskThresholds,
}

/// Points awarded per rule, and the caps for the per-URL rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub reply_to_mismatch: i32,
    pub spf_failure: i32,
    pub dkim_failure: i32,
    pub dmarc_failure: i32,
    pub url_present: i32,
    pub risky_tld_per_url: i32,
    pub risky_tld_cap: i32,
    pub punycode_per_url: i32,
    pub punycode_cap: i32,
    pub attachment_present: i32,
    pub high_risk_extension: i32,
}

/// Inclusive lower bounds of the High and Medium risk bands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub high: i32,
    pub medium: i32,
}

fn default_risky_tlds() -> BTreeSet<String> {
    ["zip", "mov", "xyz", "top", "click", "gq", "tk", "icu", "work"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_high_risk_extensions() -> Vec<String> {
    [
        ".exe", ".js", ".vbs", ".scr", ".bat", ".cmd", ".lnk", ".iso", ".img", ".hta",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            reply_to_mismatch: 25,
            spf_failure: 20,
            dkim_failure: 20,
            dmarc_failure: 20,
            url_present: 5,
            risky_tld_per_url: 5,
            risky_tld_cap: 15,
            punycode_per_url: 8,
            punycode_cap: 15,
            attachment_present: 10,
            high_risk_extension: 20,
        }
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high: 70,
            medium: 40,
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            risky_tlds: default_risky_tlds(),
            high_risk_extensions: default_high_risk_extensions(),
            weights: ScoreWeights::default(),
            thresholds: RiskThresholds::default(),
        }
    }
}

impl RulesConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RulesConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rule_tables() {
        let config = RulesConfig::default();
        assert!(config.risky_tlds.contains("zip"));
        assert!(config.risky_tlds.contains("xyz"));
        assert!(config.risky_tlds.contains("work"));
        assert_eq!(config.risky_tlds.len(), 9);
        assert_eq!(
            config.high_risk_extensions.first().map(String::as_str),
            Some(".exe")
        );
        assert_eq!(config.high_risk_extensions.len(), 10);
        assert_eq!(config.weights.reply_to_mismatch, 25);
        assert_eq!(config.thresholds.high, 70);
        assert_eq!(config.thresholds.medium, 40);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = RulesConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: RulesConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.risky_tlds, config.risky_tlds);
        assert_eq!(parsed.high_risk_extensions, config.high_risk_extensions);
        assert_eq!(parsed.weights.punycode_cap, 15);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "risky_tlds:\n  - example\n";
        let parsed: RulesConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(parsed.risky_tlds.contains("example"));
        assert_eq!(parsed.weights.url_present, 5);
        assert_eq!(parsed.high_risk_extensions.len(), 10);
    }
}
