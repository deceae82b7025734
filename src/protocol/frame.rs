//! Length-prefixed JSON framing.
//!
//! Every message after the connection preamble is framed as
//! `<N>:<json>`, where `N` is the UTF-8 byte length of `<json>`.
//!
//! # Preamble
//!
//! The relay's first inbound text may be plain text rather than a frame.
//! [`InboundDecoder`] keeps a one-shot flag for that case: the first text
//! that fails framed decoding becomes an [`Inbound::Notice`]. Every later
//! failure is an [`Inbound::Invalid`] carrying [`Error::FrameDecode`].

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Encoding
// ============================================================================

/// Serializes `payload` and prefixes it with its byte length.
///
/// # Errors
///
/// [`Error::Json`] if the payload cannot be serialized.
pub fn encode<T: Serialize + ?Sized>(payload: &T) -> Result<String> {
    let body = serde_json::to_string(payload)?;
    Ok(format!("{}:{}", body.len(), body))
}

// ============================================================================
// Decoding
// ============================================================================

/// Splits the first frame off `raw`.
///
/// Returns the JSON body and the text after it.
///
/// # Errors
///
/// [`Error::FrameDecode`] if the prefix is missing, not a decimal byte
/// count, or larger than the text that follows.
pub fn split_frame(raw: &str) -> Result<(&str, &str)> {
    let Some((prefix, rest)) = raw.split_once(':') else {
        return Err(Error::frame_decode("missing length prefix"));
    };

    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::frame_decode(format!("bad length prefix {prefix:?}")));
    }

    let len: usize = prefix
        .parse()
        .map_err(|_| Error::frame_decode(format!("length prefix {prefix} out of range")))?;

    if rest.len() < len {
        return Err(Error::frame_decode(format!(
            "frame announces {len} bytes, only {} present",
            rest.len()
        )));
    }

    if !rest.is_char_boundary(len) {
        return Err(Error::frame_decode(format!(
            "length {len} splits a UTF-8 character"
        )));
    }

    Ok(rest.split_at(len))
}

/// Decodes the first frame of `raw` into a JSON value.
///
/// Text after the first frame is ignored; see [`decode_all`]. When the
/// announced length cuts the body short but everything after the colon is
/// one JSON value, that value is returned: the length is a hint for a
/// single-frame text.
///
/// # Errors
///
/// [`Error::FrameDecode`] on a bad prefix, a body shorter than announced,
/// or invalid JSON.
pub fn decode(raw: &str) -> Result<Value> {
    let (body, _) = split_frame(raw)?;
    parse_body(body).or_else(|e| whole_remainder(raw).ok_or(e))
}

/// Decodes every back-to-back frame in `raw`, in order.
///
/// Stops at the first malformed frame.
///
/// # Errors
///
/// [`Error::FrameDecode`] for an empty input or any malformed frame.
pub fn decode_all(raw: &str) -> Result<Vec<Value>> {
    if raw.is_empty() {
        return Err(Error::frame_decode("empty message"));
    }

    let mut values = Vec::new();
    let mut rest = raw;

    while !rest.is_empty() {
        let (body, tail) = split_frame(rest)?;
        values.push(parse_body(body)?);
        rest = tail;
    }

    Ok(values)
}

fn parse_body(body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| Error::frame_decode(format!("invalid JSON body: {e}")))
}

/// Parses everything after the length prefix, ignoring the announced length.
fn whole_remainder(raw: &str) -> Option<Value> {
    let (prefix, rest) = raw.split_once(':')?;
    let value = serde_json::from_str(rest).ok()?;
    trace!(prefix, actual = rest.len(), "Length prefix disagrees with body");
    Some(value)
}

// ============================================================================
// Inbound
// ============================================================================

/// One decoded inbound text.
#[derive(Debug)]
pub enum Inbound {
    /// A framed JSON message.
    Message(Value),
    /// Unframed relay text, accepted only as the first inbound text.
    Notice(String),
    /// A text that could not be decoded. The connection stays open.
    Invalid(Error),
}

// ============================================================================
// InboundDecoder
// ============================================================================

/// Decoder for the inbound side of one connection.
///
/// Owns the one-shot "preamble expected" flag.
#[derive(Debug, Clone)]
pub struct InboundDecoder {
    preamble_expected: bool,
}

impl Default for InboundDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl InboundDecoder {
    /// Creates a decoder for a fresh connection.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            preamble_expected: true,
        }
    }

    /// Returns `true` until the first text has been decoded.
    #[inline]
    #[must_use]
    pub const fn preamble_expected(&self) -> bool {
        self.preamble_expected
    }

    /// Decodes one inbound text into zero or more [`Inbound`] items.
    ///
    /// Frames decoded before a malformed one are still delivered.
    pub fn decode(&mut self, text: &str) -> Vec<Inbound> {
        let first = std::mem::replace(&mut self.preamble_expected, false);

        let mut items = Vec::new();
        let mut rest = text;

        loop {
            let first_frame = items.is_empty();
            let decoded = split_frame(rest).and_then(|(body, tail)| match parse_body(body) {
                Ok(value) => Ok((value, tail)),
                Err(e) if first_frame => whole_remainder(text).map(|value| (value, "")).ok_or(e),
                Err(e) => Err(e),
            });

            match decoded {
                Ok((value, tail)) => {
                    items.push(Inbound::Message(value));
                    rest = tail;
                    if rest.is_empty() {
                        break;
                    }
                }
                Err(_) if first && items.is_empty() => {
                    trace!("First inbound text is not framed, treating as relay notice");
                    items.push(Inbound::Notice(text.to_owned()));
                    break;
                }
                Err(e) => {
                    items.push(Inbound::Invalid(e));
                    break;
                }
            }
        }

        items
    }
}

// ============================================================================
// Tests
// ============================================================================
