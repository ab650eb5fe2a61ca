use serde::Serialize;
use std::collections::BTreeMap;

/// Metadata for one attachment. The decoded payload is measured and then
/// discarded; only the length is retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub size_bytes: usize,
}

/// Flat record extracted from one raw message.
///
/// Dedicated fields hold the allowlisted headers (empty string when the
/// header is absent); every header, allowlisted or not, also lands in the
/// generic `headers` map. Built once by the normalizer and never mutated
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedMessage {
    pub subject: String,
    pub date: String,
    pub message_id: String,
    pub from_raw: String,
    pub reply_to_raw: String,
    pub return_path: String,
    pub to_raw: String,
    pub cc_raw: String,
    pub authentication_results: String,
    pub received_spf: String,
    /// All headers; repeated headers are joined with a line break in
    /// source order.
    pub headers: BTreeMap<String, String>,
    pub body_text: String,
    pub body_html: String,
    pub attachments: Vec<Attachment>,
    /// Sorted, duplicate-free URLs found in either body form.
    pub urls: Vec<String>,
}
