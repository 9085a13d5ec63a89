//! The `messages` control channel: outbound commands and inbound dispatch.
//!
//! Inbound frames are decoded with [`deskview_core::decode_control`] and routed
//! through a [`CommandRegistry`], a table from command name to
//! [`CommandHandler`].  Every failure on the inbound path is logged and
//! swallowed; the event loop never sees an error from a bad frame.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use deskview_core::{
    commands, decode_control, encode_control, ControlMessage, Dimensions, ProtocolError,
    ResolutionState, ScreenSize,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::peer::{DataChannel, PeerError};

/// Label of the control data channel.
pub const CONTROL_CHANNEL_LABEL: &str = "messages";

/// Label of the placeholder channel created with the peer connection.
pub const PLACEHOLDER_CHANNEL_LABEL: &str = "noop";

/// Resolution state shared between the event loop and the canvas mirror.
pub type SharedResolution = Arc<Mutex<ResolutionState>>;

/// Locks the shared resolution state.
///
/// The state is plain data, so a poisoned lock is recovered rather than
/// propagated.
pub fn lock_resolution(resolution: &SharedResolution) -> MutexGuard<'_, ResolutionState> {
    resolution.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Errors on the control channel.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("control channel send failed: {0}")]
    Send(#[from] PeerError),

    #[error("handler for '{command}' failed: {reason}")]
    Handler { command: String, reason: String },
}

/// Handles one inbound command.
///
/// Handlers run on the event loop with the resolution lock held, so they must
/// not block.
pub trait CommandHandler: Send + Sync {
    fn handle(
        &self,
        message: &ControlMessage,
        resolution: &mut ResolutionState,
    ) -> Result<(), ControlError>;
}

impl<F> CommandHandler for F
where
    F: Fn(&ControlMessage, &mut ResolutionState) -> Result<(), ControlError> + Send + Sync,
{
    fn handle(
        &self,
        message: &ControlMessage,
        resolution: &mut ResolutionState,
    ) -> Result<(), ControlError> {
        self(message, resolution)
    }
}

/// `screensize` report: records the remote screen dimensions.
pub struct ScreenSizeHandler;

impl CommandHandler for ScreenSizeHandler {
    fn handle(
        &self,
        message: &ControlMessage,
        resolution: &mut ResolutionState,
    ) -> Result<(), ControlError> {
        // Decode fully before touching the state.
        let size: ScreenSize = message.payload()?;
        resolution.set_screen(Dimensions::new(size.width, size.height));
        info!(width = size.width, height = size.height, "remote screen size updated");
        Ok(())
    }
}

/// `mousepose` report: logged only.
pub struct MousePoseHandler;

impl CommandHandler for MousePoseHandler {
    fn handle(
        &self,
        message: &ControlMessage,
        _resolution: &mut ResolutionState,
    ) -> Result<(), ControlError> {
        debug!(data = %message.data, "remote pointer position");
        Ok(())
    }
}

/// What [`CommandRegistry::dispatch`] did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran successfully.
    Handled,
    /// No handler is registered for the command.
    Ignored,
    /// The frame was not a valid control message.
    Malformed,
    /// The handler returned an error.
    Failed,
}

/// Command name → handler table.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// An empty table; every command is ignored.
    pub fn new() -> Self {
        Self::default()
    }

    /// The table the viewer starts with: `screensize` and `mousepose`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(commands::SCREEN_SIZE, ScreenSizeHandler);
        registry.register(commands::MOUSE_POSE, MousePoseHandler);
        registry
    }

    /// Installs `handler` for `command`, replacing any previous one.
    pub fn register(&mut self, command: impl Into<String>, handler: impl CommandHandler + 'static) {
        self.handlers.insert(command.into(), Box::new(handler));
    }

    /// Returns `true` if a handler is registered for `command`.
    pub fn contains(&self, command: &str) -> bool {
        self.handlers.contains_key(command)
    }

    /// Decodes `text` and runs the matching handler.
    pub fn dispatch(&self, text: &str, resolution: &SharedResolution) -> DispatchOutcome {
        let message = match decode_control(text) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "dropping malformed control frame");
                return DispatchOutcome::Malformed;
            }
        };

        let Some(handler) = self.handlers.get(&message.command) else {
            debug!(command = %message.command, "ignoring unknown control command");
            return DispatchOutcome::Ignored;
        };

        let mut state = lock_resolution(resolution);
        match handler.handle(&message, &mut state) {
            Ok(()) => DispatchOutcome::Handled,
            Err(e) => {
                warn!(command = %message.command, error = %e, "control command handler failed");
                DispatchOutcome::Failed
            }
        }
    }
}

/// Sends `{command, data}` on `channel`.
///
/// Returns `Ok(false)` without sending when there is no channel or it is not
/// open.
///
/// # Errors
///
/// [`ControlError::Protocol`] if `data` cannot be encoded, or
/// [`ControlError::Send`] if the open channel fails to transmit.
pub async fn send_command<T: Serialize + ?Sized>(
    channel: Option<&dyn DataChannel>,
    command: &str,
    data: &T,
) -> Result<bool, ControlError> {
    let Some(channel) = channel.filter(|c| c.is_open()) else {
        debug!(command, "control channel not open, command not sent");
        return Ok(false);
    };
    let frame = encode_control(command, data)?;
    channel.send_text(frame).await?;
    debug!(command, "control command sent");
    Ok(true)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
