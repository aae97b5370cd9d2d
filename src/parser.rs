//! Parsing raw RFC 822 messages into the fields the scanner filters on.
//!
//! Decoding is resilient: a MIME part that fails to decode is logged and skipped,
//! and the rest of the message is still used.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use mailparse::{addrparse_header, DispositionType, MailAddr, MailHeaderMap, ParsedMail};
use tracing::{debug, warn};

/// Headers that name the recipients of a message, including forwarding headers
/// added by aliasing and shared-inbox setups.
pub const RECIPIENT_HEADERS: [&str; 6] = [
    "To",
    "Cc",
    "Bcc",
    "Delivered-To",
    "X-Original-To",
    "X-Forwarded-To",
];

/// A message reduced to what the scanner needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    /// Decoded subject (empty if absent).
    pub subject: String,
    /// Sender address, lowercased (empty if absent).
    pub from: String,
    /// Lowercased recipient addresses from all [`RECIPIENT_HEADERS`], deduplicated.
    pub recipients: Vec<String>,
    /// Parsed `Date` header, `None` if missing or unparseable.
    pub date: Option<DateTime<Utc>>,
    /// First decodable `text/html` part.
    pub html: Option<String>,
    /// First decodable `text/plain` part.
    pub text: Option<String>,
}

impl ParsedMessage {
    /// Returns the decoded body text used for loose address matching.
    ///
    /// Plain text and HTML are both included since either may carry the address.
    #[must_use]
    pub fn body_text(&self) -> String {
        match (&self.text, &self.html) {
            (Some(text), Some(html)) => format!("{text}\n{html}"),
            (Some(text), None) => text.clone(),
            (None, Some(html)) => html.clone(),
            (None, None) => String::new(),
        }
    }

    /// Returns `true` if `address` appears in the recipient headers.
    #[must_use]
    pub fn has_recipient(&self, address: &str) -> bool {
        let address = address.trim().to_lowercase();
        self.recipients.iter().any(|r| *r == address)
    }
}

/// Parses a raw message.
///
/// # Errors
///
/// Returns [`Error::ParseEmail`] if the message structure cannot be parsed at all.
/// Undecodable parts do not cause an error.
pub fn parse_message(raw: &[u8]) -> Result<ParsedMessage> {
    let parsed = mailparse::parse_mail(raw).map_err(|source| Error::ParseEmail { source })?;

    let subject = parsed
        .headers
        .get_first_value("Subject")
        .unwrap_or_default()
        .trim()
        .to_string();

    let from = parsed
        .headers
        .get_first_header("From")
        .and_then(|header| header_addresses(header).into_iter().next())
        .unwrap_or_default();

    let mut recipients: Vec<String> = Vec::new();
    for name in RECIPIENT_HEADERS {
        for header in parsed.headers.get_all_headers(name) {
            for address in header_addresses(header) {
                if !recipients.contains(&address) {
                    recipients.push(address);
                }
            }
        }
    }

    let date = parsed
        .headers
        .get_first_value("Date")
        .and_then(|value| parse_date(&value));

    let mut html = None;
    let mut text = None;
    collect_bodies(&parsed, &mut html, &mut text);

    Ok(ParsedMessage {
        subject,
        from,
        recipients,
        date,
        html,
        text,
    })
}

/// Parses an RFC 2822 date header value.
///
/// Returns `None` for values that do not describe a date after the Unix epoch;
/// `dateparse` reports most garbage as timestamp 0 rather than an error.
#[must_use]
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    match mailparse::dateparse(value) {
        Ok(timestamp) if timestamp > 0 => DateTime::from_timestamp(timestamp, 0),
        Ok(_) => {
            debug!(value, "Date header without a usable date");
            None
        }
        Err(reason) => {
            debug!(value, reason = %reason, "Unparseable Date header");
            None
        }
    }
}

/// Extracts lowercased addresses from an address header.
///
/// Falls back to splitting the raw value on commas when the header is not valid
/// RFC 5322 (common with `Delivered-To` rewriting).
fn header_addresses(header: &mailparse::MailHeader<'_>) -> Vec<String> {
    match addrparse_header(header) {
        Ok(list) => list
            .iter()
            .flat_map(|addr| match addr {
                MailAddr::Single(info) => vec![info.addr.to_lowercase()],
                MailAddr::Group(group) => {
                    group.addrs.iter().map(|i| i.addr.to_lowercase()).collect()
                }
            })
            .filter(|a| !a.is_empty())
            .collect(),
        Err(_) => header
            .get_value()
            .split(',')
            .map(|part| {
                let part = part.trim();
                let inner = match (part.rfind('<'), part.rfind('>')) {
                    (Some(start), Some(end)) if start < end => &part[start + 1..end],
                    _ => part,
                };
                inner.trim().to_lowercase()
            })
            .filter(|a| a.contains('@'))
            .collect(),
    }
}

/// Walks the MIME tree keeping the first decodable HTML and plain-text parts.
fn collect_bodies(part: &ParsedMail<'_>, html: &mut Option<String>, text: &mut Option<String>) {
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            collect_bodies(sub, html, text);
        }
        return;
    }

    if part.get_content_disposition().disposition == DispositionType::Attachment {
        return;
    }

    let mimetype = part.ctype.mimetype.to_lowercase();
    let slot = match mimetype.as_str() {
        "text/html" => &mut *html,
        "text/plain" => &mut *text,
        _ => return,
    };

    if slot.is_some() {
        return;
    }

    match decode_part(part) {
        Ok(body) => *slot = Some(body),
        Err(e) => warn!(error = %e, "Skipping undecodable part"),
    }
}

/// Decodes one leaf part (transfer encoding and charset).
fn decode_part(part: &ParsedMail<'_>) -> Result<String> {
    part.get_body().map_err(|source| Error::DecodePart {
        mimetype: part.ctype.mimetype.clone(),
        source,
    })
}
