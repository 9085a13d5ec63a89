//! Infrastructure layer for the viewer.
//!
//! Implements the application-layer traits against the outside world.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain` and
//! `deskview_core`, but MUST NOT be imported by them.
//!
//! # Sub-modules
//!
//! - **`http_signaling`** – `reqwest` client for `/iceServers`,
//!   `/createPeerConnection`, `/startVideo` and `/stopVideo`.
//! - **`webrtc_peer`** – webrtc-rs adapter; turns peer, channel and track
//!   callbacks into viewer events.
//! - **`headless_presenter`** – presentation without a window.
//! - **`config_file`** – TOML config file loading.
//! - **`loopback`** – in-process signaling, peer and presenter used by tests.

pub mod config_file;
pub mod headless_presenter;
pub mod http_signaling;
pub mod loopback;
pub mod webrtc_peer;
