//! JSON message types carried over the `messages` data channel.
//!
//! Every frame is a UTF-8 text frame holding one JSON object with exactly two
//! fields:
//!
//! ```json
//! {"command":"screensize","data":{"width":1920,"height":1080}}
//! ```
//!
//! The `command` string selects the meaning of `data`.  There is no schema
//! version and no acknowledgement: ordering is whatever the data channel's
//! in-order delivery provides.
//!
//! # Why keep `data` as a raw JSON value?
//!
//! The command set is open-ended.  The viewer dispatches on `command` through
//! a handler table, and each handler decodes `data` into the payload type it
//! understands (see [`ControlMessage::payload`]).  Unknown commands therefore
//! never fail to parse; they are simply not handled.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::protocol::codec::ProtocolError;

/// Command names understood by the viewer and the remote server.
pub mod commands {
    /// Request (client → server, empty data) or report (server → client,
    /// `{width, height}`) of the remote screen dimensions.
    pub const SCREEN_SIZE: &str = "screensize";

    /// Pointer position in remote screen coordinates, `{x, y}`.
    pub const MOUSE_POSE: &str = "mousepose";
}

/// A single control-channel frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    /// Command name, e.g. [`commands::SCREEN_SIZE`].
    pub command: String,

    /// Command-specific payload.
    ///
    /// Absent `data` decodes as an empty object so that `{"command":"x"}`
    /// is still a well-formed frame.
    #[serde(default = "empty_object")]
    pub data: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl ControlMessage {
    /// Creates a message from a command name and an arbitrary JSON payload.
    pub fn new(command: impl Into<String>, data: Value) -> Self {
        Self {
            command: command.into(),
            data,
        }
    }

    /// The request the viewer sends as soon as the control channel opens.
    ///
    /// ```rust
    /// use deskview_core::{commands, ControlMessage};
    ///
    /// let msg = ControlMessage::screen_size_request();
    /// assert_eq!(msg.command, commands::SCREEN_SIZE);
    /// assert!(msg.data.as_object().unwrap().is_empty());
    /// ```
    pub fn screen_size_request() -> Self {
        Self::new(commands::SCREEN_SIZE, empty_object())
    }

    /// Decodes `data` into a typed payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidPayload`] when `data` does not have the
    /// shape `T` expects (missing fields, wrong types, negative sizes).
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        T::deserialize(&self.data).map_err(|e| ProtocolError::InvalidPayload {
            command: self.command.clone(),
            reason: e.to_string(),
        })
    }
}

/// Payload of a `screensize` report from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    /// Remote screen width in pixels.
    pub width: u32,
    /// Remote screen height in pixels.
    pub height: u32,
}

/// Payload of a `mousepose` command: a pointer position in remote screen
/// pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerPosition {
    pub x: i32,
    pub y: i32,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_control_message_serializes_command_and_data_fields() {
        // Arrange
        let msg = ControlMessage::new(commands::MOUSE_POSE, json!({"x": 10, "y": 20}));

        // Act
        let value = serde_json::to_value(&msg).unwrap();

        // Assert
        assert_eq!(value, json!({"command": "mousepose", "data": {"x": 10, "y": 20}}));
    }

    #[test]
    fn test_missing_data_field_decodes_as_empty_object() {
        let msg: ControlMessage = serde_json::from_str(r#"{"command":"screensize"}"#).unwrap();
        assert_eq!(msg.data, json!({}));
    }

    #[test]
    fn test_screen_size_request_has_empty_data() {
        let msg = ControlMessage::screen_size_request();
        assert_eq!(msg.command, "screensize");
        assert_eq!(msg.data, json!({}));
    }

    #[test]
    fn test_payload_decodes_screen_size() {
        // Arrange
        let msg = ControlMessage::new(commands::SCREEN_SIZE, json!({"width": 1920, "height": 1080}));

        // Act
        let size: ScreenSize = msg.payload().unwrap();

        // Assert
        assert_eq!(size, ScreenSize { width: 1920, height: 1080 });
    }

    #[test]
    fn test_payload_ignores_extra_fields() {
        let msg = ControlMessage::new(
            commands::SCREEN_SIZE,
            json!({"width": 800, "height": 600, "depth": 24}),
        );
        let size: ScreenSize = msg.payload().unwrap();
        assert_eq!(size.width, 800);
    }

    #[test]
    fn test_payload_missing_height_returns_invalid_payload() {
        // Arrange
        let msg = ControlMessage::new(commands::SCREEN_SIZE, json!({"width": 1920}));

        // Act
        let result = msg.payload::<ScreenSize>();

        // Assert
        match result {
            Err(ProtocolError::InvalidPayload { command, .. }) => assert_eq!(command, "screensize"),
            other => panic!("expected InvalidPayload, got {other:?}"),
        }
    }

    #[test]
    fn test_payload_negative_width_is_rejected() {
        let msg = ControlMessage::new(commands::SCREEN_SIZE, json!({"width": -1, "height": 10}));
        assert!(msg.payload::<ScreenSize>().is_err());
    }

    #[test]
    fn test_payload_decodes_pointer_position() {
        let msg = ControlMessage::new(commands::MOUSE_POSE, json!({"x": -5, "y": 7}));
        let pos: PointerPosition = msg.payload().unwrap();
        assert_eq!(pos, PointerPosition { x: -5, y: 7 });
    }
}
