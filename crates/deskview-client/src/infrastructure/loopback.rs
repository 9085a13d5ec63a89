//! In-process signaling, peer and presenter for tests.
//!
//! Nothing here touches the network.  [`LoopbackSignaling`] answers every
//! offer locally, [`LoopbackPeer`] models the offer/answer state machine and
//! lets a test drive the remote side (open a channel, deliver a frame, emit a
//! track), and [`RecordingPresenter`] records what it is asked to present.
//!
//! Every recorded call lives in a `Mutex<Vec<...>>` so assertions can inspect
//! exactly what happened and in what order.
//!
//! ```ignore
//! let signaling = Arc::new(LoopbackSignaling::new());
//! let factory = LoopbackPeerFactory::new();
//! let mut viewer = Viewer::connect(signaling.clone(), &factory, presenter, event_queue(), opts).await?;
//! viewer.start_session().await?;
//!
//! let peer = factory.last_peer().unwrap();
//! peer.open_channel("messages");
//! let event = viewer.next_event().await.unwrap();
//! viewer.handle_event(event).await;
//! ```

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use deskview_core::{Dimensions, IceServer, SdpType, SessionDescription, SignalingEndpoint};
use uuid::Uuid;

use crate::application::events::{EventSender, ViewerEvent};
use crate::application::media::MediaPresenter;
use crate::application::peer::{
    ChannelId, DataChannel, MediaKind, OfferOptions, PeerConnection, PeerError, PeerFactory,
    RemoteTrack,
    SignalingState, TrackKind, TrackSource,
};
use crate::application::signaling::{SignalingError, SignalingTransport};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ── Signaling ─────────────────────────────────────────────────────────────────

/// Answers every offer locally and records each request.
#[derive(Default)]
pub struct LoopbackSignaling {
    /// ICE servers returned by `fetch_ice_servers`.
    pub ice_servers: Vec<IceServer>,
    /// When set, `fetch_ice_servers` fails with HTTP 503.
    pub fail_ice_servers: AtomicBool,
    /// Endpoints whose exchanges fail with HTTP 500.
    pub failing: Mutex<HashSet<SignalingEndpoint>>,
    /// Every request in order, `IceServers` included.
    pub requests: Mutex<Vec<SignalingEndpoint>>,
    /// Every offer received, with its endpoint.
    pub offers: Mutex<Vec<(SignalingEndpoint, SessionDescription)>>,
}

impl LoopbackSignaling {
    pub fn new() -> Self {
        Self {
            ice_servers: vec![IceServer::stun("stun:stun.l.google.com:19302")],
            ..Default::default()
        }
    }

    /// Makes exchanges with `endpoint` fail until [`Self::recover`] is called.
    pub fn fail_endpoint(&self, endpoint: SignalingEndpoint) {
        lock(&self.failing).insert(endpoint);
    }

    pub fn recover(&self, endpoint: SignalingEndpoint) {
        lock(&self.failing).remove(&endpoint);
    }

    /// Number of requests made to `endpoint`.
    pub fn request_count(&self, endpoint: SignalingEndpoint) -> usize {
        lock(&self.requests).iter().filter(|e| **e == endpoint).count()
    }

    pub fn requests(&self) -> Vec<SignalingEndpoint> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl SignalingTransport for LoopbackSignaling {
    async fn fetch_ice_servers(&self) -> Result<Vec<IceServer>, SignalingError> {
        let endpoint = SignalingEndpoint::IceServers;
        lock(&self.requests).push(endpoint);
        if self.fail_ice_servers.load(Ordering::SeqCst) {
            return Err(SignalingError::Status {
                endpoint,
                status: 503,
            });
        }
        Ok(self.ice_servers.clone())
    }

    async fn exchange(
        &self,
        endpoint: SignalingEndpoint,
        offer: &SessionDescription,
    ) -> Result<SessionDescription, SignalingError> {
        lock(&self.requests).push(endpoint);
        lock(&self.offers).push((endpoint, offer.clone()));
        if lock(&self.failing).contains(&endpoint) {
            return Err(SignalingError::Status {
                endpoint,
                status: 500,
            });
        }
        Ok(SessionDescription::answer(format!("v=0 answer for {endpoint}")))
    }
}

// ── Peer ──────────────────────────────────────────────────────────────────────

/// Creates [`LoopbackPeer`]s and keeps a handle to each one.
#[derive(Default)]
pub struct LoopbackPeerFactory {
    pub peers: Mutex<Vec<Arc<LoopbackPeer>>>,
    pub ice_servers: Mutex<Vec<IceServer>>,
}

impl LoopbackPeerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created_count(&self) -> usize {
        lock(&self.peers).len()
    }

    /// ICE servers passed to the most recent `create`.
    pub fn last_ice_servers(&self) -> Vec<IceServer> {
        lock(&self.ice_servers).clone()
    }

    pub fn last_peer(&self) -> Option<Arc<LoopbackPeer>> {
        lock(&self.peers).last().cloned()
    }
}

#[async_trait]
impl PeerFactory for LoopbackPeerFactory {
    async fn create(
        &self,
        ice_servers: &[IceServer],
        events: EventSender,
    ) -> Result<Arc<dyn PeerConnection>, PeerError> {
        *lock(&self.ice_servers) = ice_servers.to_vec();
        let peer = Arc::new(LoopbackPeer::new(events));
        lock(&self.peers).push(peer.clone());
        Ok(peer)
    }
}

/// An in-process peer connection.
pub struct LoopbackPeer {
    events: EventSender,
    state: Mutex<SignalingState>,
    closed: AtomicBool,
    offers_created: AtomicUsize,
    /// Every channel created, in order.
    pub channels: Mutex<Vec<Arc<LoopbackDataChannel>>>,
    /// Every transceiver added, in order.
    pub transceivers: Mutex<Vec<MediaKind>>,
}

impl LoopbackPeer {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            state: Mutex::new(SignalingState::Stable),
            closed: AtomicBool::new(false),
            offers_created: AtomicUsize::new(0),
            channels: Mutex::new(Vec::new()),
            transceivers: Mutex::new(Vec::new()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// The most recently created channel with `label`.
    pub fn channel(&self, label: &str) -> Option<Arc<LoopbackDataChannel>> {
        lock(&self.channels)
            .iter()
            .rev()
            .find(|c| c.label == label)
            .cloned()
    }

    /// Number of channels ever created with `label`.
    pub fn channel_count(&self, label: &str) -> usize {
        lock(&self.channels).iter().filter(|c| c.label == label).count()
    }

    pub fn offers_created(&self) -> usize {
        self.offers_created.load(Ordering::SeqCst)
    }

    /// Opens the most recent channel with `label` as the remote side would.
    /// Returns `false` if there is no such channel or it was closed.
    pub fn open_channel(&self, label: &str) -> bool {
        self.channel(label).is_some_and(|c| c.remote_open())
    }

    /// Delivers a text frame from the remote side on the most recent channel
    /// with `label`.  Does nothing if no such channel exists.
    pub fn deliver(&self, label: &str, text: &str) {
        if let Some(channel) = self.channel(label) {
            channel.remote_send(text);
        }
    }

    /// Emits a remote track that yields `payloads` and then ends.
    pub fn emit_track(&self, id: &str, kind: TrackKind, payloads: Vec<Vec<u8>>) {
        let _ = self.events.send(ViewerEvent::TrackReceived(RemoteTrack {
            id: id.to_string(),
            stream_id: "loopback".to_string(),
            kind,
            source: Arc::new(LoopbackTrackSource::new(payloads)),
        }));
    }

    fn ensure_open(&self) -> Result<(), PeerError> {
        if self.is_closed() {
            Err(PeerError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PeerConnection for LoopbackPeer {
    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>, PeerError> {
        self.ensure_open()?;
        let channel = Arc::new(LoopbackDataChannel::new(label, self.events.clone()));
        lock(&self.channels).push(channel.clone());
        Ok(channel)
    }

    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription, PeerError> {
        self.ensure_open()?;
        let n = self.offers_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SessionDescription::offer(format!(
            "v=0 loopback offer {n} audio={} video={}",
            options.offer_to_receive_audio, options.offer_to_receive_video
        )))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), PeerError> {
        self.ensure_open()?;
        let mut state = lock(&self.state);
        match (desc.sdp_type, *state) {
            (SdpType::Offer, SignalingState::Stable | SignalingState::HaveLocalOffer) => {
                *state = SignalingState::HaveLocalOffer;
                Ok(())
            }
            (sdp_type, current) => Err(PeerError::InvalidDescription(format!(
                "cannot apply local {sdp_type} in state {current:?}"
            ))),
        }
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), PeerError> {
        self.ensure_open()?;
        let mut state = lock(&self.state);
        match (desc.sdp_type, *state) {
            (SdpType::Answer, SignalingState::HaveLocalOffer) => {
                *state = SignalingState::Stable;
                Ok(())
            }
            (sdp_type, current) => Err(PeerError::InvalidDescription(format!(
                "cannot apply remote {sdp_type} in state {current:?}"
            ))),
        }
    }

    fn signaling_state(&self) -> SignalingState {
        *lock(&self.state)
    }

    async fn transceiver_count(&self) -> usize {
        lock(&self.transceivers).len()
    }

    async fn add_receive_transceiver(&self, kind: MediaKind) -> Result<(), PeerError> {
        self.ensure_open()?;
        lock(&self.transceivers).push(kind);
        Ok(())
    }

    async fn close(&self) -> Result<(), PeerError> {
        self.closed.store(true, Ordering::SeqCst);
        *lock(&self.state) = SignalingState::Closed;
        let channels = lock(&self.channels).clone();
        for channel in channels {
            channel.close().await?;
        }
        Ok(())
    }
}

/// An in-process data channel.  It starts closed until the test opens it
/// through [`LoopbackPeer::open_channel`] or [`LoopbackDataChannel::remote_open`].
pub struct LoopbackDataChannel {
    id: ChannelId,
    label: String,
    events: EventSender,
    open: AtomicBool,
    closed: AtomicBool,
    /// Every frame sent, in order.
    pub sent: Mutex<Vec<String>>,
}

impl LoopbackDataChannel {
    fn new(label: &str, events: EventSender) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.to_string(),
            events,
            open: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// `true` once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn sent_frames(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }

    /// Opens the channel from the remote side.  Returns `false` once closed.
    pub fn remote_open(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.open.store(true, Ordering::SeqCst);
        let _ = self.events.send(ViewerEvent::ChannelOpened {
            channel: self.id,
            label: self.label.clone(),
        });
        true
    }

    /// Sends a text frame from the remote side.
    pub fn remote_send(&self, text: &str) {
        let _ = self.events.send(ViewerEvent::ChannelMessage {
            channel: self.id,
            label: self.label.clone(),
            text: text.to_string(),
        });
    }
}

#[async_trait]
impl DataChannel for LoopbackDataChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn send_text(&self, text: String) -> Result<(), PeerError> {
        if !self.is_open() {
            return Err(PeerError::Closed);
        }
        lock(&self.sent).push(text);
        Ok(())
    }

    async fn close(&self) -> Result<(), PeerError> {
        self.open.store(false, Ordering::SeqCst);
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(ViewerEvent::ChannelClosed {
                channel: self.id,
                label: self.label.clone(),
            });
        }
        Ok(())
    }
}

/// A track source that yields a fixed list of payloads.
pub struct LoopbackTrackSource {
    payloads: Mutex<VecDeque<Vec<u8>>>,
}

impl LoopbackTrackSource {
    pub fn new(payloads: Vec<Vec<u8>>) -> Self {
        Self {
            payloads: Mutex::new(payloads.into()),
        }
    }
}

#[async_trait]
impl TrackSource for LoopbackTrackSource {
    async fn next_payload(&self) -> Option<Vec<u8>> {
        lock(&self.payloads).pop_front()
    }
}

// ── Presenter ─────────────────────────────────────────────────────────────────

/// Records presentation calls.
#[derive(Default)]
pub struct RecordingPresenter {
    /// Ids of attached audio tracks.
    pub audio: Mutex<Vec<String>>,
    /// Ids of attached video tracks.
    pub video: Mutex<Vec<String>>,
    /// Every overlay resize.
    pub overlay_resizes: Mutex<Vec<Dimensions>>,
    /// Size reported by `rendered_video_size`.
    pub rendered: Mutex<Option<Dimensions>>,
}

impl RecordingPresenter {
    pub fn with_rendered_size(size: Dimensions) -> Self {
        Self {
            rendered: Mutex::new(Some(size)),
            ..Default::default()
        }
    }

    pub fn resize_count(&self) -> usize {
        lock(&self.overlay_resizes).len()
    }
}

impl MediaPresenter for RecordingPresenter {
    fn attach_audio(&self, track: RemoteTrack) {
        lock(&self.audio).push(track.id);
    }

    fn attach_video(&self, track: RemoteTrack) {
        lock(&self.video).push(track.id);
    }

    fn rendered_video_size(&self) -> Option<Dimensions> {
        *lock(&self.rendered)
    }

    fn resize_overlay(&self, size: Dimensions) {
        lock(&self.overlay_resizes).push(size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::event_queue;

    #[tokio::test]
    async fn test_answer_without_offer_is_rejected() {
        let (tx, _rx) = event_queue();
        let peer = LoopbackPeer::new(tx);

        let result = peer
            .set_remote_description(SessionDescription::answer("v=0"))
            .await;

        assert!(matches!(result, Err(PeerError::InvalidDescription(_))));
        assert_eq!(peer.signaling_state(), SignalingState::Stable);
    }

    #[tokio::test]
    async fn test_channel_cannot_send_before_open() {
        let (tx, _rx) = event_queue();
        let peer = LoopbackPeer::new(tx);
        let channel = peer.create_data_channel("messages").await.unwrap();

        let result = channel.send_text("x".to_string()).await;

        assert!(matches!(result, Err(PeerError::Closed)));
    }

    #[tokio::test]
    async fn test_closing_peer_closes_channels_and_emits_events() {
        // Arrange
        let (tx, mut rx) = event_queue();
        let peer = LoopbackPeer::new(tx);
        peer.create_data_channel("noop").await.unwrap();

        // Act
        peer.close().await.unwrap();

        // Assert
        assert!(peer.is_closed());
        assert!(peer.channel("noop").unwrap().is_closed());
        assert!(matches!(
            rx.recv().await,
            Some(ViewerEvent::ChannelClosed { label, .. }) if label == "noop"
        ));
    }

    #[tokio::test]
    async fn test_failing_endpoint_is_recorded_and_recovers() {
        let signaling = LoopbackSignaling::new();
        signaling.fail_endpoint(SignalingEndpoint::StartVideo);
        let offer = SessionDescription::offer("v=0");

        let first = signaling.exchange(SignalingEndpoint::StartVideo, &offer).await;
        signaling.recover(SignalingEndpoint::StartVideo);
        let second = signaling.exchange(SignalingEndpoint::StartVideo, &offer).await;

        assert!(first.is_err());
        assert_eq!(second.unwrap().sdp_type, SdpType::Answer);
        assert_eq!(signaling.request_count(SignalingEndpoint::StartVideo), 2);
    }

    #[tokio::test]
    async fn test_new_offer_replaces_pending_local_offer() {
        // Arrange
        let (tx, _rx) = event_queue();
        let peer = LoopbackPeer::new(tx);
        let first = peer.create_offer(OfferOptions::receive_all()).await.unwrap();
        peer.set_local_description(first).await.unwrap();

        // Act
        let second = peer.create_offer(OfferOptions::receive_all()).await.unwrap();
        let result = peer.set_local_description(second).await;

        // Assert
        assert!(result.is_ok());
        assert_eq!(peer.signaling_state(), SignalingState::HaveLocalOffer);
        assert_eq!(peer.offers_created(), 2);
    }

    #[tokio::test]
    async fn test_local_answer_is_rejected() {
        let (tx, _rx) = event_queue();
        let peer = LoopbackPeer::new(tx);

        let result = peer
            .set_local_description(SessionDescription::answer("v=0"))
            .await;

        assert!(matches!(result, Err(PeerError::InvalidDescription(_))));
        assert_eq!(peer.signaling_state(), SignalingState::Stable);
    }

    #[tokio::test]
    async fn test_channels_with_same_label_get_distinct_ids() {
        // Arrange
        let (tx, mut rx) = event_queue();
        let peer = LoopbackPeer::new(tx);
        let first = peer.create_data_channel("messages").await.unwrap();
        let second = peer.create_data_channel("messages").await.unwrap();

        // Act
        assert!(peer.open_channel("messages"));

        // Assert
        assert_ne!(first.id(), second.id());
        assert!(matches!(
            rx.recv().await,
            Some(ViewerEvent::ChannelOpened { channel, .. }) if channel == second.id()
        ));
    }
}
