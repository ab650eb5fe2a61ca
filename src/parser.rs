//! Message normalization.
//!
//! Parses one raw RFC 5322 / MIME message into the flat
//! `NormalizedMessage` record consumed by the indicator and scoring
//! stages. Unparseable input is fatal; individual parts that fail
//! content decoding are recovered with byte substitution and never
//! abort the run.

use crate::message::{Attachment, NormalizedMessage};
use crate::urls::UrlExtractor;
use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use thiserror::Error;

/// Sentinel filename for attachments that declare none.
const NO_FILENAME: &str = "(no-filename)";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unable to parse message structure ({0} bytes)")]
    InvalidMessage(usize),
}

pub struct MessageNormalizer {
    urls: UrlExtractor,
}

impl Default for MessageNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageNormalizer {
    pub fn new() -> Self {
        Self {
            urls: UrlExtractor::new(),
        }
    }

    pub fn normalize(&self, raw: &[u8]) -> Result<NormalizedMessage, ParseError> {
        let message = MessageParser::default()
            .parse(raw)
            .ok_or(ParseError::InvalidMessage(raw.len()))?;

        let mut text_chunks = Vec::new();
        let mut html_chunks = Vec::new();
        let mut attachments = Vec::new();
        collect_parts(&message, &mut text_chunks, &mut html_chunks, &mut attachments);

        let body_text = join_chunks(&text_chunks);
        let body_html = join_chunks(&html_chunks);
        let urls = self.urls.collect(&body_text, &body_html);

        log::debug!(
            "normalized message: {} text part(s), {} html part(s), {} attachment(s), {} url(s)",
            text_chunks.len(),
            html_chunks.len(),
            attachments.len(),
            urls.len()
        );

        Ok(NormalizedMessage {
            subject: message.subject().unwrap_or("").trim().to_string(),
            date: raw_header(&message, "Date"),
            message_id: raw_header(&message, "Message-ID"),
            from_raw: raw_header(&message, "From"),
            reply_to_raw: raw_header(&message, "Reply-To"),
            return_path: raw_header(&message, "Return-Path"),
            to_raw: raw_header(&message, "To"),
            cc_raw: raw_header(&message, "Cc"),
            authentication_results: raw_header(&message, "Authentication-Results"),
            received_spf: raw_header(&message, "Received-SPF"),
            headers: collect_headers(&message, raw),
            body_text,
            body_html,
            attachments,
            urls,
        })
    }
}

/// First occurrence of a header, raw value, surrounding whitespace trimmed.
fn raw_header(message: &Message, name: &str) -> String {
    message
        .header_raw(name)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Every top-level header; repeated headers join with a line break in
/// source order.
fn collect_headers(message: &Message, raw: &[u8]) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    for header in message.headers() {
        let value = raw
            .get(header.offset_start..header.offset_end)
            .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
            .unwrap_or_default();
        match headers.entry(header.name.as_str().to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => {
                let joined = slot.get_mut();
                joined.push('\n');
                joined.push_str(&value);
            }
        }
    }
    headers
}

/// Walk every leaf part, recursing into nested messages. Multipart
/// containers are skipped; a leaf with a filename or an explicit
/// attachment disposition becomes attachment metadata regardless of
/// content type, text/plain and text/html leaves contribute body chunks,
/// anything else is dropped.
fn collect_parts(
    message: &Message,
    text_chunks: &mut Vec<String>,
    html_chunks: &mut Vec<String>,
    attachments: &mut Vec<Attachment>,
) {
    for part in &message.parts {
        if matches!(part.body, PartType::Multipart(_)) {
            continue;
        }
        if part.is_encoding_problem {
            log::warn!("message part decoded with byte substitution (malformed transfer encoding)");
        }

        if is_attachment(part) {
            attachments.push(Attachment {
                filename: part.attachment_name().unwrap_or(NO_FILENAME).to_string(),
                content_type: declared_content_type(part),
                size_bytes: part.contents().len(),
            });
        } else {
            let (ctype, subtype) = media_type(part);
            if ctype == "text" && subtype == "plain" {
                text_chunks.push(part_text(part));
            } else if ctype == "text" && subtype == "html" {
                html_chunks.push(part_text(part));
            }
        }

        // An attached or embedded message still exposes its own leaves.
        if let PartType::Message(nested) = &part.body {
            collect_parts(nested, text_chunks, html_chunks, attachments);
        }
    }
}

fn is_attachment(part: &MessagePart) -> bool {
    part.attachment_name().is_some()
        || part
            .content_disposition()
            .is_some_and(|disposition| disposition.ctype().eq_ignore_ascii_case("attachment"))
}

/// Declared media type as a lowercase (type, subtype) pair. A part with
/// no Content-Type header defaults to text/plain per RFC 2045.
fn media_type(part: &MessagePart) -> (String, String) {
    match part.content_type() {
        Some(ct) => (
            ct.ctype().to_lowercase(),
            ct.subtype().unwrap_or("").to_lowercase(),
        ),
        None => ("text".to_string(), "plain".to_string()),
    }
}

fn declared_content_type(part: &MessagePart) -> String {
    match part.content_type() {
        Some(ct) => match ct.subtype() {
            Some(subtype) => format!("{}/{}", ct.ctype(), subtype).to_lowercase(),
            None => ct.ctype().to_lowercase(),
        },
        None => "text/plain".to_string(),
    }
}

fn part_text(part: &MessagePart) -> String {
    match part.text_contents() {
        Some(text) => text.to_string(),
        // Best-effort recovery: decode raw bytes with replacement.
        None => String::from_utf8_lossy(part.contents()).into_owned(),
    }
}

fn join_chunks(chunks: &[String]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.trim())
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
