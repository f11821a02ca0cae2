//! Builds the text that gets scanned for one request.

use std::borrow::Cow;

use tracing::debug;

/// The parts of an HTTP request the guard inspects.
#[derive(Debug, Clone, Copy, Default)]
pub struct InspectedRequest<'a> {
    /// Percent-decoded request path, e.g. `/orders/5`. See [`decode_path`].
    pub path: &'a str,
    /// Raw, undecoded query string without the leading `?`.
    pub query: Option<&'a str>,
    /// Raw body bytes, if the request carried any.
    pub body: Option<&'a [u8]>,
}

impl<'a> InspectedRequest<'a> {
    pub fn new(path: &'a str) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: &'a str) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_body(mut self, body: &'a [u8]) -> Self {
        self.body = Some(body);
        self
    }
}

/// Outcome of decoding a request body as UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyText<'a> {
    /// The whole body was valid UTF-8.
    Clean(&'a str),
    /// Invalid byte sequences were dropped; the remaining text is kept.
    Recovered { text: String, dropped_bytes: usize },
    /// Nothing in the body decoded to text.
    Empty,
}

impl BodyText<'_> {
    pub fn as_str(&self) -> &str {
        match self {
            BodyText::Clean(text) => text,
            BodyText::Recovered { text, .. } => text,
            BodyText::Empty => "",
        }
    }
}

/// Decode `bytes` as UTF-8, dropping any invalid sequences.
pub fn decode_body(bytes: &[u8]) -> BodyText<'_> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return BodyText::Clean(text);
    }

    let mut text = String::with_capacity(bytes.len());
    let mut dropped_bytes = 0;
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
        dropped_bytes += chunk.invalid().len();
    }

    if text.is_empty() {
        BodyText::Empty
    } else {
        BodyText::Recovered {
            text,
            dropped_bytes,
        }
    }
}

/// Percent-decode a request path. Sequences that do not decode to UTF-8 are
/// replaced with U+FFFD.
///
/// Only the path is decoded; the query string is scanned exactly as sent.
pub fn decode_path(raw: &str) -> Cow<'_, str> {
    match urlencoding::decode_binary(raw.as_bytes()) {
        Cow::Borrowed(_) => Cow::Borrowed(raw),
        Cow::Owned(bytes) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

/// Concatenate path, raw query and decoded body, separated by single spaces.
///
/// The body part is only appended when the request has a non-empty body.
pub fn sample(request: &InspectedRequest<'_>) -> String {
    let query = request.query.unwrap_or("");
    let mut target = String::with_capacity(
        request.path.len() + query.len() + request.body.map_or(0, <[u8]>::len) + 2,
    );
    target.push_str(request.path);
    target.push(' ');
    target.push_str(query);

    if let Some(body) = request.body.filter(|b| !b.is_empty()) {
        let decoded = decode_body(body);
        match &decoded {
            BodyText::Clean(_) => {}
            BodyText::Recovered { dropped_bytes, .. } => {
                debug!(
                    path = request.path,
                    dropped_bytes,
                    "Body is not valid UTF-8; scanning the decodable remainder"
                );
            }
            BodyText::Empty => {
                debug!(
                    path = request.path,
                    "Body has no decodable text; scanning path and query only"
                );
            }
        }
        target.push(' ');
        target.push_str(decoded.as_str());
    }

    target
}

/// Shorten `s` to at most `max_chars` characters for log output.
pub fn truncate(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => Cow::Owned(format!("{}...", &s[..idx])),
        None => Cow::Borrowed(s),
    }
}
