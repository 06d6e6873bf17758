//! Binary and text encoding helpers
//!
//! Conversions between response bodies, base64 and text, including the
//! `data:<type>;base64,` form produced by data-URL readers.

use crate::error::Result;
use crate::types::RequestResult;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encode bytes as standard base64
///
/// An empty payload is encoded as a single newline (`"Cg=="`), so the result
/// is never empty.
///
/// # Examples
///
/// ```
/// use fetch_syncer::codec::to_base64;
///
/// assert_eq!(to_base64(b"hi"), "aGk=");
/// assert_eq!(to_base64(b""), "Cg==");
/// ```
#[must_use]
pub fn to_base64(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return STANDARD.encode(b"\n");
    }
    STANDARD.encode(bytes)
}

/// Encode the UTF-8 bytes of `text` as base64
///
/// Empty text follows the same rule as [`to_base64`].
#[must_use]
pub fn text_to_base64(text: &str) -> String {
    to_base64(text.as_bytes())
}

/// Decode base64 into a string
///
/// Invalid UTF-8 sequences are replaced with U+FFFD.
pub fn base64_to_string(encoded: &str) -> Result<String> {
    let bytes = STANDARD.decode(data_url_payload(encoded.trim()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Strip a leading `data:<type>;base64,` prefix, if any
#[must_use]
pub fn data_url_payload(input: &str) -> &str {
    if let Some(rest) = input.strip_prefix("data:")
        && let Some(marker) = rest.find(";base64,")
    {
        return &rest[marker + ";base64,".len()..];
    }
    input
}

/// A body decoded according to its content type
#[derive(Clone, Debug, PartialEq)]
pub enum DecodedBody {
    /// Parsed JSON (content type ends with `json`)
    Json(serde_json::Value),
    /// Text (lossily decoded as UTF-8)
    Text(String),
}

/// Decode a body to JSON or text
///
/// Content types ending in `json` (case-insensitive) are parsed as JSON,
/// falling back to text when parsing fails. Everything else is text.
/// Invalid UTF-8 sequences are replaced with U+FFFD.
#[must_use]
pub fn decode_body(bytes: &[u8], content_type: &str) -> DecodedBody {
    let text = String::from_utf8_lossy(bytes).into_owned();
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence.ends_with("json") {
        match serde_json::from_str(&text) {
            Ok(value) => return DecodedBody::Json(value),
            Err(e) => {
                tracing::debug!(error = %e, "body declared as JSON did not parse, returning text");
            }
        }
    }
    DecodedBody::Text(text)
}

impl RequestResult {
    /// Base64 of the response body (an absent body encodes like an empty one)
    pub fn to_base64(&self) -> String {
        to_base64(self.data.as_deref().unwrap_or_default())
    }

    /// Decode the response body using its recorded content type
    #[must_use]
    pub fn decode_body(&self) -> DecodedBody {
        decode_body(self.data.as_deref().unwrap_or_default(), &self.content_type)
    }
}
