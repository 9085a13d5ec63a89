//! deskview-client library crate.
//!
//! A native remote desktop viewer: it negotiates a single WebRTC peer
//! connection with a remote server over plain HTTP signaling calls, receives
//! the server's video and audio tracks, and exchanges small JSON commands
//! (screen size, pointer position) over a data channel.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! [deskview-client]
//!   ├── domain/           ViewerConfig
//!   ├── application/      Viewer session, negotiation, control-channel
//!   │                     dispatch, track routing, canvas mirror, and the
//!   │                     traits the infrastructure implements
//!   └── infrastructure/
//!         ├── http_signaling/     reqwest client for the signaling endpoints
//!         ├── webrtc_peer/        webrtc-rs peer connection adapter
//!         ├── headless_presenter/ presentation without a window
//!         ├── config_file/        TOML config loading
//!         └── loopback/           in-process peer + signaling for tests
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain`, `deskview-core` and tokio's task,
//!   timer and channel primitives, and talks to the outside world only
//!   through the traits it defines ([`application::SignalingTransport`],
//!   [`application::PeerConnection`], [`application::MediaPresenter`], ...).
//! - `infrastructure` implements those traits with `reqwest`, `webrtc` and
//!   `tokio`.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: the viewer session and its collaborators' traits.
pub mod application;

/// Infrastructure layer: HTTP signaling, WebRTC adapter, presentation.
pub mod infrastructure;
