//! Report rendering for triage results.
//!
//! Renderers are pure consumers of the output triple: a Markdown report
//! for humans and a JSON export for machines. Only the Markdown
//! renderer stamps a generation time; the pipeline records themselves
//! carry none.

use crate::pipeline::TriageResult;

const BODY_PREVIEW_CHARS: usize = 500;

/// Render the full Markdown report.
pub fn render_markdown(result: &TriageResult) -> String {
    let message = &result.message;
    let indicators = &result.indicators;
    let score = &result.score;
    let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%SZ");
    let mut lines: Vec<String> = Vec::new();

    lines.push("# Phishing Triage Report\n".to_string());
    lines.push(format!("- **Generated (UTC):** {now}"));
    lines.push(format!("- **Risk:** **{:?}**", score.risk));
    lines.push(format!("- **Score:** **{}/100**\n", score.total));

    lines.push("## Email Summary".to_string());
    lines.push(format!("- **Subject:** {}", or_none(&message.subject)));
    lines.push(format!("- **From:** {}", or_none(&message.from_raw)));
    lines.push(format!("- **Reply-To:** {}", or_none(&message.reply_to_raw)));
    lines.push(format!("- **To:** {}", or_none(&message.to_raw)));
    lines.push(format!("- **Date:** {}", or_none(&message.date)));
    lines.push(format!("- **Message-ID:** {}\n", or_none(&message.message_id)));

    lines.push("## Key Findings".to_string());
    if score.breakdown.is_empty() {
        lines.push("- No significant indicators triggered in the current heuristic set.".to_string());
    } else {
        for hit in &score.breakdown {
            lines.push(format!("- (+{}) {}", hit.points, hit.reason));
        }
    }
    lines.push(String::new());

    lines.push("## Authentication Signals (Best-Effort)".to_string());
    lines.push(format!("- **SPF:** {}", or_not_found(&indicators.auth.spf)));
    lines.push(format!("- **DKIM:** {}", or_not_found(&indicators.auth.dkim)));
    lines.push(format!("- **DMARC:** {}", or_not_found(&indicators.auth.dmarc)));
    lines.push(String::new());

    lines.push("## URLs".to_string());
    if indicators.url_details.is_empty() {
        lines.push("- None found.\n".to_string());
    } else {
        for detail in &indicators.url_details {
            let mut flags = Vec::new();
            if detail.punycode {
                flags.push("punycode/lookalike".to_string());
            }
            if detail.risky_tld {
                flags.push("risky TLD".to_string());
            }
            if detail.domain_age_days.is_none() {
                flags.push("domain age: (placeholder)".to_string());
            }
            let flag_str = if flags.is_empty() {
                String::new()
            } else {
                format!(" — _{}_", flags.join(", "))
            };
            lines.push(format!(
                "- {}{} (domain: `{}`)",
                detail.url, flag_str, detail.domain_display
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Attachments".to_string());
    if message.attachments.is_empty() {
        lines.push("- None.\n".to_string());
    } else {
        for attachment in &message.attachments {
            lines.push(format!(
                "- `{}` ({}), {} bytes",
                attachment.filename, attachment.content_type, attachment.size_bytes
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Header Checks".to_string());
    lines.push(format!(
        "- **From domain:** `{}`",
        or_none(&indicators.from_domain)
    ));
    lines.push(format!(
        "- **Reply-To domain:** `{}`",
        or_none(&indicators.reply_to_domain)
    ));
    lines.push(format!(
        "- **From/Reply-To mismatch:** `{}`\n",
        indicators.from_reply_to_mismatch
    ));

    let mut preview = message.body_text.trim().to_string();
    if preview.is_empty() {
        preview = "(no text body extracted)".to_string();
    }
    let preview: String = preview.chars().take(BODY_PREVIEW_CHARS).collect();

    lines.push(format!("## Body Preview (first {BODY_PREVIEW_CHARS} chars)"));
    lines.push("```".to_string());
    lines.push(preview);
    lines.push("```".to_string());

    lines.join("\n")
}

/// Serialize the output triple as pretty-printed JSON. Attachment bytes
/// are never part of the triple, only metadata.
pub fn render_json(result: &TriageResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

fn or_none(value: &str) -> &str {
    if value.is_empty() {
        "(none)"
    } else {
        value
    }
}

fn or_not_found(value: &str) -> &str {
    if value.is_empty() {
        "(not found)"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TriagePipeline;

    const PHISHY_EMAIL: &str = "\
From: support@example.com\r\n\
Reply-To: support@evil.example\r\n\
To: victim@example.org\r\n\
Subject: Action required\r\n\
Authentication-Results: mx.example.org; spf=fail\r\n\
Content-Type: text/plain\r\n\
\r\n\
Verify your account at http://login.example.zip/now\r\n";

    fn phishy_result() -> crate::pipeline::TriageResult {
        TriagePipeline::default()
            .run(PHISHY_EMAIL.as_bytes())
            .unwrap()
    }

    #[test]
    fn test_markdown_sections_present() {
        let markdown = render_markdown(&phishy_result());
        assert!(markdown.contains("# Phishing Triage Report"));
        assert!(markdown.contains("## Email Summary"));
        assert!(markdown.contains("## Key Findings"));
        assert!(markdown.contains("## Authentication Signals (Best-Effort)"));
        assert!(markdown.contains("## URLs"));
        assert!(markdown.contains("## Attachments"));
        assert!(markdown.contains("## Header Checks"));
        assert!(markdown.contains("## Body Preview (first 500 chars)"));
    }

    #[test]
    fn test_markdown_lists_breakdown_and_flags() {
        let markdown = render_markdown(&phishy_result());
        assert!(markdown.contains("- (+25) From and Reply-To domains do not match."));
        assert!(markdown.contains("- (+20) SPF result is fail."));
        assert!(markdown.contains("risky TLD"));
        assert!(markdown.contains("domain age: (placeholder)"));
        assert!(markdown.contains("- **DKIM:** (not found)"));
    }

    #[test]
    fn test_markdown_empty_message_uses_placeholders() {
        let email = "\
Subject: bare\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>html only</p>\r\n";
        let result = TriagePipeline::default().run(email.as_bytes()).unwrap();
        let markdown = render_markdown(&result);
        assert!(markdown.contains("- **From:** (none)"));
        assert!(markdown.contains("- None found."));
        assert!(markdown.contains("- None."));
        assert!(markdown.contains("(no text body extracted)"));
    }

    #[test]
    fn test_json_export_uses_record_field_names() {
        let json = render_json(&phishy_result()).unwrap();
        assert!(json.contains("\"message\""));
        assert!(json.contains("\"indicators\""));
        assert!(json.contains("\"score\""));
        assert!(json.contains("\"from_raw\""));
        assert!(json.contains("\"url_details\""));
        assert!(json.contains("\"domain_age_days\": null"));
        assert!(json.contains("\"breakdown\""));
        assert!(json.contains("\"risk\": \"Medium\""));
    }
}
