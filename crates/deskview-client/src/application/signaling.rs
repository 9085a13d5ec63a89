//! SDP negotiation over the HTTP signaling endpoints.
//!
//! [`Negotiator::negotiate`] performs one offer/answer round trip:
//!
//! 1. refuse to start while another exchange is in flight,
//! 2. create an offer that declares audio + video receive intent,
//! 3. apply it locally,
//! 4. POST it to the endpoint and apply the returned answer.
//!
//! The WebRTC stack cannot roll back a local offer.  When step 4 fails the
//! offer stays applied (`HaveLocalOffer`) and is marked abandoned; the next
//! negotiation replaces it with a fresh offer.  Nothing is retried.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use deskview_core::{IceServer, SessionDescription, SignalingEndpoint};
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::peer::{MediaKind, OfferOptions, PeerConnection, PeerError, SignalingState};

/// Errors produced while talking to the signaling endpoints.
#[derive(Debug, Error)]
pub enum SignalingError {
    /// The request never produced a response (connect, timeout, I/O).
    #[error("signaling request to {endpoint} failed: {reason}")]
    Network {
        endpoint: SignalingEndpoint,
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("signaling endpoint {endpoint} returned HTTP {status}")]
    Status {
        endpoint: SignalingEndpoint,
        status: u16,
    },

    /// The response body was not the expected JSON.
    #[error("could not decode response from {endpoint}: {reason}")]
    Decode {
        endpoint: SignalingEndpoint,
        reason: String,
    },

    /// The offer could not be serialized.
    #[error("could not encode request for {endpoint}: {reason}")]
    Encode {
        endpoint: SignalingEndpoint,
        reason: String,
    },

    /// The local WebRTC stack rejected the offer or the answer.
    #[error(transparent)]
    Peer(#[from] PeerError),

    /// Another offer/answer exchange has not finished yet.
    #[error("negotiation already in progress (signaling state {0:?})")]
    NegotiationInProgress(SignalingState),
}

/// The request/response transport for the signaling endpoints.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    /// Fetches the ICE server list (`POST /iceServers`, no body).
    async fn fetch_ice_servers(&self) -> Result<Vec<IceServer>, SignalingError>;

    /// POSTs `offer` to `endpoint` and returns the decoded answer.
    async fn exchange(
        &self,
        endpoint: SignalingEndpoint,
        offer: &SessionDescription,
    ) -> Result<SessionDescription, SignalingError>;
}

/// Offer/answer driver for one peer connection.
///
/// Remembers whether the offer currently applied locally was abandoned by a
/// failed exchange, which is the only case where a negotiation may start
/// outside `Stable`.
#[derive(Debug, Default)]
pub struct Negotiator {
    abandoned_offer: AtomicBool,
}

impl Negotiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` while a failed exchange has left its offer applied locally.
    pub fn has_abandoned_offer(&self) -> bool {
        self.abandoned_offer.load(Ordering::SeqCst)
    }

    /// Runs one offer/answer exchange against `endpoint`.
    ///
    /// # Errors
    ///
    /// - [`SignalingError::NegotiationInProgress`] if another exchange is in
    ///   flight; nothing is touched in that case.
    /// - Any transport or peer error from the exchange itself.  An offer left
    ///   applied by the failure is replaced by the next negotiation.
    pub async fn negotiate(
        &self,
        peer: &dyn PeerConnection,
        signaling: &dyn SignalingTransport,
        endpoint: SignalingEndpoint,
    ) -> Result<(), SignalingError> {
        let state = peer.signaling_state();
        let replaces_abandoned = state == SignalingState::HaveLocalOffer
            && self.abandoned_offer.swap(false, Ordering::SeqCst);
        if state != SignalingState::Stable && !replaces_abandoned {
            return Err(SignalingError::NegotiationInProgress(state));
        }
        if replaces_abandoned {
            debug!(%endpoint, "replacing abandoned local offer");
        }

        let result = exchange_offer(peer, signaling, endpoint).await;

        match &result {
            Ok(()) => debug!(%endpoint, "remote answer applied"),
            Err(e) => {
                if peer.signaling_state() == SignalingState::HaveLocalOffer {
                    self.abandoned_offer.store(true, Ordering::SeqCst);
                }
                warn!(%endpoint, error = %e, "negotiation failed");
            }
        }
        result
    }
}

async fn exchange_offer(
    peer: &dyn PeerConnection,
    signaling: &dyn SignalingTransport,
    endpoint: SignalingEndpoint,
) -> Result<(), SignalingError> {
    let offer = peer.create_offer(OfferOptions::receive_all()).await?;
    peer.set_local_description(offer.clone()).await?;
    debug!(%endpoint, "local offer applied");

    let answer = signaling.exchange(endpoint, &offer).await?;
    peer.set_remote_description(answer).await?;
    Ok(())
}

/// Adds one receive-only video and one receive-only audio transceiver when
/// the connection has none yet.  Returns `true` if transceivers were added.
///
/// # Errors
///
/// Returns [`PeerError`] if the WebRTC stack refuses a transceiver.
pub async fn ensure_receive_transceivers(peer: &dyn PeerConnection) -> Result<bool, PeerError> {
    if peer.transceiver_count().await > 0 {
        return Ok(false);
    }
    peer.add_receive_transceiver(MediaKind::Video).await?;
    peer.add_receive_transceiver(MediaKind::Audio).await?;
    Ok(true)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::peer::DataChannel;
    use std::sync::{Arc, Mutex};

    // ── Recording peer ────────────────────────────────────────────────────────

    /// Follows the WebRTC stack's rules: an offer may replace a pending local
    /// offer, an answer is only accepted in `HaveLocalOffer`.
    #[derive(Default)]
    struct RecordingPeer {
        state: Mutex<Option<SignalingState>>,
        calls: Mutex<Vec<String>>,
        transceivers: Mutex<Vec<MediaKind>>,
        reject_answer: bool,
    }

    impl RecordingPeer {
        fn in_state(state: SignalingState) -> Self {
            let peer = Self::default();
            *peer.state.lock().unwrap() = Some(state);
            peer
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }
    }

    #[async_trait]
    impl PeerConnection for RecordingPeer {
        async fn create_data_channel(&self, _label: &str) -> Result<Arc<dyn DataChannel>, PeerError> {
            Err(PeerError::Platform("not supported".to_string()))
        }

        async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription, PeerError> {
            assert_eq!(options, OfferOptions::receive_all());
            self.record("create_offer");
            Ok(SessionDescription::offer("v=0 offer"))
        }

        async fn set_local_description(&self, _desc: SessionDescription) -> Result<(), PeerError> {
            self.record("set_local");
            *self.state.lock().unwrap() = Some(SignalingState::HaveLocalOffer);
            Ok(())
        }

        async fn set_remote_description(&self, _desc: SessionDescription) -> Result<(), PeerError> {
            self.record("set_remote");
            if self.reject_answer {
                return Err(PeerError::InvalidDescription("bad answer".to_string()));
            }
            *self.state.lock().unwrap() = Some(SignalingState::Stable);
            Ok(())
        }

        fn signaling_state(&self) -> SignalingState {
            self.state.lock().unwrap().unwrap_or(SignalingState::Stable)
        }

        async fn transceiver_count(&self) -> usize {
            self.transceivers.lock().unwrap().len()
        }

        async fn add_receive_transceiver(&self, kind: MediaKind) -> Result<(), PeerError> {
            self.transceivers.lock().unwrap().push(kind);
            Ok(())
        }

        async fn close(&self) -> Result<(), PeerError> {
            Ok(())
        }
    }

    fn answering_transport() -> MockSignalingTransport {
        let mut transport = MockSignalingTransport::new();
        transport
            .expect_exchange()
            .returning(|_, _| Ok(SessionDescription::answer("v=0 answer")));
        transport
    }

    fn failing_transport() -> MockSignalingTransport {
        let mut transport = MockSignalingTransport::new();
        transport.expect_exchange().returning(|endpoint, _| {
            Err(SignalingError::Status {
                endpoint,
                status: 500,
            })
        });
        transport
    }

    // ── negotiate ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_negotiate_applies_offer_then_answer() {
        // Arrange
        let peer = RecordingPeer::default();
        let negotiator = Negotiator::new();

        // Act
        negotiator
            .negotiate(&peer, &answering_transport(), SignalingEndpoint::StartVideo)
            .await
            .unwrap();

        // Assert
        assert_eq!(peer.calls(), vec!["create_offer", "set_local", "set_remote"]);
        assert_eq!(peer.signaling_state(), SignalingState::Stable);
        assert!(!negotiator.has_abandoned_offer());
    }

    #[tokio::test]
    async fn test_negotiate_posts_local_offer_to_requested_endpoint() {
        // Arrange
        let peer = RecordingPeer::default();
        let mut transport = MockSignalingTransport::new();
        transport
            .expect_exchange()
            .withf(|endpoint, offer| {
                *endpoint == SignalingEndpoint::StopVideo && offer.sdp == "v=0 offer"
            })
            .times(1)
            .returning(|_, _| Ok(SessionDescription::answer("v=0 answer")));

        // Act / Assert
        Negotiator::new()
            .negotiate(&peer, &transport, SignalingEndpoint::StopVideo)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_negotiate_refuses_while_exchange_in_flight() {
        // Arrange: a pending offer this negotiator did not abandon.
        let peer = RecordingPeer::in_state(SignalingState::HaveLocalOffer);
        let mut transport = MockSignalingTransport::new();
        transport.expect_exchange().never();

        // Act
        let err = Negotiator::new()
            .negotiate(&peer, &transport, SignalingEndpoint::StartVideo)
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(
            err,
            SignalingError::NegotiationInProgress(SignalingState::HaveLocalOffer)
        ));
        assert!(peer.calls().is_empty(), "nothing must be touched");
    }

    #[tokio::test]
    async fn test_negotiate_refuses_in_have_remote_offer() {
        let peer = RecordingPeer::in_state(SignalingState::HaveRemoteOffer);

        let err = Negotiator::new()
            .negotiate(&peer, &answering_transport(), SignalingEndpoint::StartVideo)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SignalingError::NegotiationInProgress(SignalingState::HaveRemoteOffer)
        ));
    }

    #[tokio::test]
    async fn test_failed_exchange_marks_offer_abandoned() {
        // Arrange
        let peer = RecordingPeer::default();
        let negotiator = Negotiator::new();

        // Act
        let err = negotiator
            .negotiate(&peer, &failing_transport(), SignalingEndpoint::StartVideo)
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(err, SignalingError::Status { status: 500, .. }));
        assert_eq!(peer.calls(), vec!["create_offer", "set_local"]);
        assert_eq!(peer.signaling_state(), SignalingState::HaveLocalOffer);
        assert!(negotiator.has_abandoned_offer());
    }

    #[tokio::test]
    async fn test_rejected_answer_marks_offer_abandoned() {
        // Arrange
        let peer = RecordingPeer {
            reject_answer: true,
            ..Default::default()
        };
        let negotiator = Negotiator::new();

        // Act
        let err = negotiator
            .negotiate(&peer, &answering_transport(), SignalingEndpoint::CreatePeerConnection)
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(
            err,
            SignalingError::Peer(PeerError::InvalidDescription(_))
        ));
        assert!(negotiator.has_abandoned_offer());
    }

    #[tokio::test]
    async fn test_next_negotiation_replaces_abandoned_offer() {
        // Arrange
        let peer = RecordingPeer::default();
        let negotiator = Negotiator::new();
        negotiator
            .negotiate(&peer, &failing_transport(), SignalingEndpoint::StartVideo)
            .await
            .unwrap_err();

        // Act
        negotiator
            .negotiate(&peer, &answering_transport(), SignalingEndpoint::StopVideo)
            .await
            .unwrap();

        // Assert
        assert_eq!(
            peer.calls(),
            vec!["create_offer", "set_local", "create_offer", "set_local", "set_remote"]
        );
        assert_eq!(peer.signaling_state(), SignalingState::Stable);
        assert!(!negotiator.has_abandoned_offer());
    }

    #[tokio::test]
    async fn test_offer_abandoned_twice_is_still_replaceable() {
        let peer = RecordingPeer::default();
        let negotiator = Negotiator::new();

        for _ in 0..2 {
            negotiator
                .negotiate(&peer, &failing_transport(), SignalingEndpoint::StartVideo)
                .await
                .unwrap_err();
        }
        negotiator
            .negotiate(&peer, &answering_transport(), SignalingEndpoint::StartVideo)
            .await
            .unwrap();

        assert_eq!(peer.signaling_state(), SignalingState::Stable);
    }

    // ── ensure_receive_transceivers ───────────────────────────────────────────

    #[tokio::test]
    async fn test_transceivers_added_video_then_audio_when_none_exist() {
        let peer = RecordingPeer::default();

        let added = ensure_receive_transceivers(&peer).await.unwrap();

        assert!(added);
        assert_eq!(
            *peer.transceivers.lock().unwrap(),
            vec![MediaKind::Video, MediaKind::Audio]
        );
    }

    #[tokio::test]
    async fn test_transceivers_not_duplicated_on_second_call() {
        let peer = RecordingPeer::default();
        ensure_receive_transceivers(&peer).await.unwrap();

        let added = ensure_receive_transceivers(&peer).await.unwrap();

        assert!(!added);
        assert_eq!(peer.transceivers.lock().unwrap().len(), 2);
    }
}
