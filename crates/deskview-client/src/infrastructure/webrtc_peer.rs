//! webrtc-rs implementation of the peer-connection seam.
//!
//! Callbacks registered on the `RTCPeerConnection` and its data channels only
//! translate the notification into a [`ViewerEvent`] and push it onto the
//! viewer's queue.

use std::sync::Arc;

use async_trait::async_trait;
use deskview_core::{IceServer, SdpType, SessionDescription};
use tracing::{debug, trace};
use uuid::Uuid;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::track::track_remote::TrackRemote;

use crate::application::events::{EventSender, ViewerEvent};
use crate::application::peer::{
    ChannelId, ConnectionState, DataChannel, MediaKind, OfferOptions, PeerConnection, PeerError,
    PeerFactory, RemoteTrack, SignalingState, TrackKind, TrackSource,
};

fn platform(e: webrtc::Error) -> PeerError {
    PeerError::Platform(e.to_string())
}

// ── Factory ───────────────────────────────────────────────────────────────────

/// Builds [`WebRtcPeer`]s from a shared webrtc-rs API instance with the
/// default codecs and interceptors registered.
pub struct WebRtcPeerFactory {
    api: API,
}

impl WebRtcPeerFactory {
    /// # Errors
    ///
    /// [`PeerError::Platform`] if codec or interceptor registration fails.
    pub fn new() -> Result<Self, PeerError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs().map_err(platform)?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine).map_err(platform)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();
        Ok(Self { api })
    }
}

fn to_rtc_ice_server(server: &IceServer) -> RTCIceServer {
    RTCIceServer {
        urls: server.urls.clone(),
        username: server.username.clone().unwrap_or_default(),
        credential: server.credential.clone().unwrap_or_default(),
        ..Default::default()
    }
}

#[async_trait]
impl PeerFactory for WebRtcPeerFactory {
    async fn create(
        &self,
        ice_servers: &[IceServer],
        events: EventSender,
    ) -> Result<Arc<dyn PeerConnection>, PeerError> {
        let config = RTCConfiguration {
            ice_servers: ice_servers.iter().map(to_rtc_ice_server).collect(),
            ..Default::default()
        };
        let pc = Arc::new(self.api.new_peer_connection(config).await.map_err(platform)?);

        pc.on_ice_candidate(Box::new(|candidate: Option<RTCIceCandidate>| {
            Box::pin(async move {
                if let Some(candidate) = candidate {
                    debug!(candidate = %candidate, "local ICE candidate gathered");
                }
            })
        }));

        let tx = events.clone();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            let tx = tx.clone();
            Box::pin(async move {
                if let Some(state) = connection_state(state) {
                    let _ = tx.send(ViewerEvent::ConnectionStateChanged(state));
                }
            })
        }));

        let tx = events.clone();
        pc.on_track(Box::new(move |track: Arc<TrackRemote>, _receiver, _transceiver| {
            let tx = tx.clone();
            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => TrackKind::Audio,
                    RTPCodecType::Video => TrackKind::Video,
                    other => TrackKind::Other(other.to_string()),
                };
                let remote = RemoteTrack {
                    id: track.id(),
                    stream_id: track.stream_id(),
                    kind,
                    source: Arc::new(WebRtcTrackSource { track }),
                };
                let _ = tx.send(ViewerEvent::TrackReceived(remote));
            })
        }));

        Ok(Arc::new(WebRtcPeer { pc, events }))
    }
}

fn connection_state(state: RTCPeerConnectionState) -> Option<ConnectionState> {
    match state {
        RTCPeerConnectionState::New => Some(ConnectionState::New),
        RTCPeerConnectionState::Connecting => Some(ConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(ConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(ConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(ConnectionState::Failed),
        RTCPeerConnectionState::Closed => Some(ConnectionState::Closed),
        RTCPeerConnectionState::Unspecified => None,
    }
}

// ── Peer connection ───────────────────────────────────────────────────────────

/// A webrtc-rs `RTCPeerConnection` behind the [`PeerConnection`] trait.
pub struct WebRtcPeer {
    pc: Arc<RTCPeerConnection>,
    events: EventSender,
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription, PeerError> {
    let invalid = |e: webrtc::Error| PeerError::InvalidDescription(e.to_string());
    match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp).map_err(invalid),
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp).map_err(invalid),
        SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp).map_err(invalid),
        SdpType::Rollback => Err(PeerError::InvalidDescription(
            "rollback descriptions are not supported".to_string(),
        )),
    }
}

fn from_rtc_description(desc: RTCSessionDescription) -> Result<SessionDescription, PeerError> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        RTCSdpType::Unspecified => {
            return Err(PeerError::InvalidDescription("unspecified SDP type".to_string()))
        }
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: desc.sdp,
    })
}

#[async_trait]
impl PeerConnection for WebRtcPeer {
    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>, PeerError> {
        let dc = self
            .pc
            .create_data_channel(label, None)
            .await
            .map_err(platform)?;
        let id = Uuid::new_v4();
        wire_channel_events(&dc, id, &self.events);
        Ok(Arc::new(WebRtcDataChannel {
            id,
            label: label.to_string(),
            dc,
        }))
    }

    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription, PeerError> {
        // Receive intent is carried by the recvonly transceivers.
        trace!(?options, "creating offer");
        let offer = self.pc.create_offer(None).await.map_err(platform)?;
        from_rtc_description(offer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), PeerError> {
        let desc = to_rtc_description(desc)?;
        self.pc.set_local_description(desc).await.map_err(platform)
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), PeerError> {
        let desc = to_rtc_description(desc)?;
        self.pc
            .set_remote_description(desc)
            .await
            .map_err(|e| PeerError::InvalidDescription(e.to_string()))
    }

    fn signaling_state(&self) -> SignalingState {
        match self.pc.signaling_state() {
            RTCSignalingState::HaveLocalOffer => SignalingState::HaveLocalOffer,
            RTCSignalingState::HaveRemoteOffer => SignalingState::HaveRemoteOffer,
            RTCSignalingState::HaveLocalPranswer => SignalingState::HaveLocalPranswer,
            RTCSignalingState::HaveRemotePranswer => SignalingState::HaveRemotePranswer,
            RTCSignalingState::Closed => SignalingState::Closed,
            RTCSignalingState::Stable | RTCSignalingState::Unspecified => SignalingState::Stable,
        }
    }

    async fn transceiver_count(&self) -> usize {
        self.pc.get_transceivers().await.len()
    }

    async fn add_receive_transceiver(&self, kind: MediaKind) -> Result<(), PeerError> {
        let codec_type = match kind {
            MediaKind::Audio => RTPCodecType::Audio,
            MediaKind::Video => RTPCodecType::Video,
        };
        self.pc
            .add_transceiver_from_kind(
                codec_type,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await
            .map_err(platform)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), PeerError> {
        self.pc.close().await.map_err(platform)
    }
}

fn wire_channel_events(dc: &Arc<RTCDataChannel>, channel: ChannelId, events: &EventSender) {
    let label = dc.label().to_string();

    let tx = events.clone();
    let open_label = label.clone();
    dc.on_open(Box::new(move || {
        let _ = tx.send(ViewerEvent::ChannelOpened {
            channel,
            label: open_label,
        });
        Box::pin(async {})
    }));

    let tx = events.clone();
    let message_label = label.clone();
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = tx.clone();
        let label = message_label.clone();
        Box::pin(async move {
            if !msg.is_string {
                trace!(%label, "ignoring binary data channel frame");
                return;
            }
            match String::from_utf8(msg.data.to_vec()) {
                Ok(text) => {
                    let _ = tx.send(ViewerEvent::ChannelMessage {
                        channel,
                        label,
                        text,
                    });
                }
                Err(e) => debug!(%label, error = %e, "dropping non-UTF-8 text frame"),
            }
        })
    }));

    let tx = events.clone();
    dc.on_close(Box::new(move || {
        let _ = tx.send(ViewerEvent::ChannelClosed {
            channel,
            label: label.clone(),
        });
        Box::pin(async {})
    }));
}

// ── Data channel ──────────────────────────────────────────────────────────────

/// A webrtc-rs data channel behind the [`DataChannel`] trait.
pub struct WebRtcDataChannel {
    id: ChannelId,
    label: String,
    dc: Arc<RTCDataChannel>,
}

#[async_trait]
impl DataChannel for WebRtcDataChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn is_open(&self) -> bool {
        self.dc.ready_state() == RTCDataChannelState::Open
    }

    async fn send_text(&self, text: String) -> Result<(), PeerError> {
        self.dc.send_text(text).await.map_err(platform)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), PeerError> {
        self.dc.close().await.map_err(platform)
    }
}

// ── Track source ──────────────────────────────────────────────────────────────

struct WebRtcTrackSource {
    track: Arc<TrackRemote>,
}

#[async_trait]
impl TrackSource for WebRtcTrackSource {
    async fn next_payload(&self) -> Option<Vec<u8>> {
        match self.track.read_rtp().await {
            Ok((packet, _attributes)) => Some(packet.payload.to_vec()),
            Err(e) => {
                debug!(track = %self.track.id(), error = %e, "remote track ended");
                None
            }
        }
    }
}
