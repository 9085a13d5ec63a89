//! # deskview-core
//!
//! Shared library for the deskview remote desktop viewer containing the
//! control-channel protocol, the signaling wire types, and the resolution
//! state used for coordinate mapping.
//!
//! This crate has zero dependencies on async runtimes, sockets, or the WebRTC
//! stack, so everything in it can be unit tested in isolation.
//!
//! # Architecture overview
//!
//! The viewer talks to a remote desktop server over two paths:
//!
//! - **Signaling** – plain HTTP request/response calls that carry ICE server
//!   descriptors and SDP offers/answers.  The JSON shapes live in
//!   [`signaling`].
//!
//! - **Control channel** – a WebRTC data channel labelled `messages` that
//!   carries small JSON commands such as `screensize` and `mousepose`.  The
//!   frame format and codec live in [`protocol`].
//!
//! Both paths feed the [`ResolutionState`] in [`domain`], which records the
//! remote screen size and the local overlay size, and maps pointer positions
//! between them.

pub mod domain;
pub mod protocol;
pub mod signaling;

// Re-export the most-used types at the crate root so callers can write
// `deskview_core::ControlMessage` instead of the full module path.
pub use domain::resolution::{Dimensions, ResolutionState};
pub use protocol::codec::{decode_control, encode_control, ProtocolError};
pub use protocol::messages::{commands, ControlMessage, PointerPosition, ScreenSize};
pub use signaling::{IceServer, SdpType, SessionDescription, SignalingEndpoint};
