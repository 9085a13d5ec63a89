//! Text-frame codec for the control channel.
//!
//! Encoding produces the exact JSON text that goes into a data-channel text
//! frame; decoding accepts any JSON object with a string `command` field.
//!
//! # Errors vs. ignored input
//!
//! The codec only reports *structural* problems (not JSON, not an object, no
//! `command`).  Whether a command is known is a dispatch concern and never a
//! codec error.

use serde::Serialize;
use thiserror::Error;

use crate::protocol::messages::ControlMessage;

/// Errors produced while encoding or decoding control-channel frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not valid JSON or does not have the `{command, data}` shape.
    #[error("malformed control frame: {0}")]
    MalformedFrame(String),

    /// The frame parsed, but `data` does not match what the command expects.
    #[error("invalid payload for command '{command}': {reason}")]
    InvalidPayload { command: String, reason: String },

    /// The outbound payload could not be serialized to JSON.
    #[error("failed to encode control frame: {0}")]
    Encode(String),
}

/// Serializes `{command, data}` into a JSON text frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if `data` cannot be represented as JSON
/// (for example a map with non-string keys).
///
/// # Example
///
/// ```rust
/// use deskview_core::encode_control;
/// use serde_json::json;
///
/// let frame = encode_control("screensize", &json!({})).unwrap();
/// assert_eq!(frame, r#"{"command":"screensize","data":{}}"#);
/// ```
pub fn encode_control<T: Serialize + ?Sized>(command: &str, data: &T) -> Result<String, ProtocolError> {
    let data = serde_json::to_value(data).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    let msg = ControlMessage::new(command, data);
    serde_json::to_string(&msg).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Parses one inbound text frame.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedFrame`] when the text is not JSON, is not
/// an object, or has no string `command` field.
pub fn decode_control(text: &str) -> Result<ControlMessage, ProtocolError> {
    serde_json::from_str(text).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
