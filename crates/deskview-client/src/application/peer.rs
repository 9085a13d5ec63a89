//! The peer-connection seam.
//!
//! The application layer never touches the WebRTC implementation directly.
//! It drives a [`PeerConnection`] trait object, and the infrastructure layer
//! provides the real adapter (`infrastructure::webrtc_peer`) or the in-process
//! loopback used by tests (`infrastructure::loopback`).
//!
//! Asynchronous notifications from the peer (tracks, channel open/close,
//! inbound frames, connection state) are not delivered through this trait.
//! Implementations push them onto the viewer's event queue as
//! [`ViewerEvent`](crate::application::events::ViewerEvent)s instead.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use deskview_core::{IceServer, SessionDescription};
use thiserror::Error;
use uuid::Uuid;

use crate::application::events::EventSender;

/// Identity of one data channel instance.  Two channels created with the
/// same label never share an id.
pub type ChannelId = Uuid;

/// Errors reported by the WebRTC implementation.
#[derive(Debug, Error)]
pub enum PeerError {
    /// The underlying WebRTC stack rejected an operation.
    #[error("WebRTC error: {0}")]
    Platform(String),

    /// A session description could not be parsed or applied.
    #[error("invalid session description: {0}")]
    InvalidDescription(String),

    /// The connection or channel has already been closed.
    #[error("peer connection is closed")]
    Closed,
}

/// Media kind of a transceiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

/// Offer/answer state of a peer connection (the W3C `signalingState`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveLocalPranswer,
    HaveRemotePranswer,
    Closed,
}

/// Transport state of a peer connection (the W3C `connectionState`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Receive intent declared when creating an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferOptions {
    pub offer_to_receive_audio: bool,
    pub offer_to_receive_video: bool,
}

impl OfferOptions {
    /// Receive both audio and video; every offer the viewer makes uses this.
    pub fn receive_all() -> Self {
        Self {
            offer_to_receive_audio: true,
            offer_to_receive_video: true,
        }
    }
}

/// A single WebRTC peer connection.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Creates a data channel.  Its open/message/close notifications arrive
    /// on the event queue tagged with the channel's id and `label`.
    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>, PeerError>;

    /// Generates a local SDP offer.
    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription, PeerError>;

    /// Applies a local description (normally the offer just created).
    ///
    /// A new offer may replace one that is still pending; local rollback is
    /// not supported.
    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), PeerError>;

    /// Applies the remote answer.
    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), PeerError>;

    /// Current offer/answer state.
    fn signaling_state(&self) -> SignalingState;

    /// Number of transceivers currently attached.
    async fn transceiver_count(&self) -> usize;

    /// Attaches a receive-only transceiver of the given kind.
    async fn add_receive_transceiver(&self, kind: MediaKind) -> Result<(), PeerError>;

    /// Closes the connection and every channel on it.
    async fn close(&self) -> Result<(), PeerError>;
}

/// A data channel on a [`PeerConnection`].
#[async_trait]
pub trait DataChannel: Send + Sync {
    /// Unique id, carried by every event this channel produces.
    fn id(&self) -> ChannelId;

    /// The label the channel was created with.
    fn label(&self) -> &str;

    /// `true` while the channel can carry frames.
    fn is_open(&self) -> bool;

    /// Sends one UTF-8 text frame.
    async fn send_text(&self, text: String) -> Result<(), PeerError>;

    /// Closes the channel.
    async fn close(&self) -> Result<(), PeerError>;
}

/// Builds peer connections.
///
/// `events` is the queue every notification from the new connection must be
/// pushed onto.
#[async_trait]
pub trait PeerFactory: Send + Sync {
    async fn create(
        &self,
        ice_servers: &[IceServer],
        events: EventSender,
    ) -> Result<Arc<dyn PeerConnection>, PeerError>;
}

// ── Remote tracks ─────────────────────────────────────────────────────────────

/// Kind of a received remote track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
    /// Anything the WebRTC stack could not classify.
    Other(String),
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Video => f.write_str("video"),
            TrackKind::Other(kind) => write!(f, "{kind}"),
        }
    }
}

/// Packet source behind a remote track.
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Waits for the next media payload.  `None` once the track has ended.
    async fn next_payload(&self) -> Option<Vec<u8>>;
}

/// A media track the server sent over the connection.
#[derive(Clone)]
pub struct RemoteTrack {
    pub id: String,
    pub stream_id: String,
    pub kind: TrackKind,
    pub source: Arc<dyn TrackSource>,
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
