// ABOUTME: Decoded message schema and the decode_message/software_error collaborators
// ABOUTME: Both are pure functions, schema-agnostic beyond the one KEEP_ALIVE distinction

use serde::{Deserialize, Serialize};
use std::fmt;

/// The distinguished message shapes this crate interprets itself.
///
/// Every other `type` value decodes to [`MessageBody::Other`]; this crate
/// only needs to recognize `KEEP_ALIVE`, since that is the only type whose
/// handling differs (it never reaches the ingress queue). The embedding
/// application is expected to inspect [`Message::raw`] for anything else.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum MessageBody {
    #[serde(rename = "KEEP_ALIVE")]
    KeepAlive,
    #[serde(other)]
    Other,
}

/// A successfully decoded wire message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub body: MessageBody,
    pub raw: serde_json::Value,
}

impl Message {
    /// True if this message is a `KEEP_ALIVE` pulse and should never be
    /// enqueued.
    pub fn is_keep_alive(&self) -> bool {
        matches!(self.body, MessageBody::KeepAlive)
    }
}

/// Error produced by [`decode_message`] when the frame bytes are not a
/// valid JSON object, or not a JSON object at all.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("decoded value is not a JSON object")]
    NotAnObject,
}

/// Decode one frame's bytes into a [`Message`]. A pure function: given the
/// same bytes it always produces the same result, with no observable side
/// effect.
pub fn decode_message(bytes: &[u8]) -> Result<Message, DecodeError> {
    let raw: serde_json::Value = serde_json::from_slice(bytes)?;
    if !raw.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    let body: MessageBody = serde_json::from_value(raw.clone())?;
    Ok(Message { body, raw })
}

/// The three fixed reasons this crate synthesizes a failure message for.
/// Modeled as an enum, rather than a free-text reason string, because the
/// set of reasons is exhaustively known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftwareError {
    CouldNotDecodeMessage,
    ConnectionClosed,
    ConnectionTimeout,
}

impl SoftwareError {
    pub fn reason(&self) -> &'static str {
        match self {
            SoftwareError::CouldNotDecodeMessage => "Could not decode message",
            SoftwareError::ConnectionClosed => "Connection closed",
            SoftwareError::ConnectionTimeout => "Connection timeout",
        }
    }
}

impl fmt::Display for SoftwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Construct a synthetic error message carrying one of the three fixed
/// reasons.
pub fn software_error(kind: SoftwareError) -> SoftwareError {
    kind
}

/// Either a successfully decoded message or a synthetic failure notice —
/// the payload half of a [`crate::queue::QueueItem`].
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOrError {
    Message(Message),
    SoftwareError(SoftwareError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_object() {
        let msg = decode_message(br#"{"type":"PING","seq":1}"#).unwrap();
        assert_eq!(msg.body, MessageBody::Other);
        assert_eq!(msg.raw["seq"], 1);
    }

    #[test]
    fn recognizes_keep_alive() {
        let msg = decode_message(br#"{"type":"KEEP_ALIVE"}"#).unwrap();
        assert!(msg.is_keep_alive());
    }

    #[test]
    fn nested_object_decodes() {
        let msg = decode_message(br#"{"a":{"b":1}}"#).unwrap();
        assert_eq!(msg.raw["a"]["b"], 1);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = decode_message(br#"{not json}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn rejects_non_object_json() {
        let err = decode_message(br#"[1,2,3]"#).unwrap_err();
        assert!(matches!(err, DecodeError::NotAnObject));
    }

    #[test]
    fn software_error_reasons_are_stable_strings() {
        assert_eq!(
            SoftwareError::CouldNotDecodeMessage.reason(),
            "Could not decode message"
        );
        assert_eq!(SoftwareError::ConnectionClosed.reason(), "Connection closed");
        assert_eq!(
            SoftwareError::ConnectionTimeout.reason(),
            "Connection timeout"
        );
    }
}
