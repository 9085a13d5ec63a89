//! The viewer: one peer connection, at most one session at a time.
//!
//! # Lifecycle
//!
//! ```text
//! connect ──► [connected] ──start_session──► [session active]
//!                  ▲                               │
//!                  └──────────stop_session─────────┘
//! close (from either state) tears everything down.
//! ```
//!
//! `connect` fetches the ICE servers, builds the peer connection, opens the
//! `noop` placeholder channel and runs the `createPeerConnection` exchange.
//! `start_session` opens the `messages` control channel, adds receive-only
//! transceivers and runs `startVideo`.  `stop_session` closes the control
//! channel and runs `stopVideo`.
//!
//! All asynchronous notifications arrive on one event queue and are applied by
//! [`Viewer::handle_event`], either called directly or through
//! [`Viewer::run`].

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use deskview_core::{
    commands, ControlMessage, PointerPosition, ResolutionState, SignalingEndpoint,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::canvas_mirror::CanvasMirror;
use crate::application::control_channel::{
    lock_resolution, send_command, CommandRegistry, ControlError, SharedResolution,
    CONTROL_CHANNEL_LABEL, PLACEHOLDER_CHANNEL_LABEL,
};
use crate::application::events::{EventReceiver, EventSender, ViewerEvent};
use crate::application::media::{route_track, MediaPresenter};
use crate::application::peer::{ChannelId, DataChannel, PeerConnection, PeerError, PeerFactory};
use crate::application::signaling::{
    ensure_receive_transceivers, Negotiator, SignalingError, SignalingTransport,
};
use crate::domain::ViewerConfig;

/// Errors from the viewer's session operations.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("failed to fetch ICE servers: {0}")]
    IceServers(#[source] SignalingError),

    #[error("failed to create peer connection: {0}")]
    PeerCreation(#[source] PeerError),

    #[error("failed to create data channel '{label}': {source}")]
    Channel {
        label: &'static str,
        #[source]
        source: PeerError,
    },

    #[error("{endpoint} negotiation failed: {source}")]
    Negotiation {
        endpoint: SignalingEndpoint,
        #[source]
        source: SignalingError,
    },

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error(transparent)]
    Control(#[from] ControlError),
}

/// Tunables for a [`Viewer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerOptions {
    /// Period of the canvas mirror task.
    pub mirror_interval: Duration,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self::from(&ViewerConfig::default())
    }
}

impl From<&ViewerConfig> for ViewerOptions {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            mirror_interval: config.mirror_interval,
        }
    }
}

/// State that exists only between `start_session` and `stop_session`.
struct ActiveSession {
    id: Uuid,
    channel: Arc<dyn DataChannel>,
    mirror: Option<CanvasMirror>,
}

/// A connected remote desktop viewer.
pub struct Viewer {
    signaling: Arc<dyn SignalingTransport>,
    peer: Arc<dyn PeerConnection>,
    negotiator: Negotiator,
    presenter: Arc<dyn MediaPresenter>,
    placeholder: Arc<dyn DataChannel>,
    resolution: SharedResolution,
    handlers: CommandRegistry,
    events_tx: EventSender,
    events_rx: EventReceiver,
    session: Option<ActiveSession>,
    options: ViewerOptions,
}

impl Viewer {
    /// Connects to the server.
    ///
    /// `events` is the queue the peer and the presenter report into; the
    /// viewer keeps both halves.
    ///
    /// # Errors
    ///
    /// - [`ViewerError::IceServers`] if the ICE server fetch fails.  No peer
    ///   connection is created in that case.
    /// - Any peer or negotiation error during setup.  The half-built peer
    ///   connection is closed before returning.
    pub async fn connect(
        signaling: Arc<dyn SignalingTransport>,
        factory: &dyn PeerFactory,
        presenter: Arc<dyn MediaPresenter>,
        events: (EventSender, EventReceiver),
        options: ViewerOptions,
    ) -> Result<Self, ViewerError> {
        let (events_tx, events_rx) = events;

        let ice_servers = signaling
            .fetch_ice_servers()
            .await
            .map_err(ViewerError::IceServers)?;
        info!(count = ice_servers.len(), "ICE servers received");

        let peer = factory
            .create(&ice_servers, events_tx.clone())
            .await
            .map_err(ViewerError::PeerCreation)?;

        let negotiator = Negotiator::new();
        let placeholder = match Self::open_base_connection(
            peer.as_ref(),
            signaling.as_ref(),
            &negotiator,
        )
        .await
        {
            Ok(channel) => channel,
            Err(e) => {
                if let Err(close_err) = peer.close().await {
                    warn!(error = %close_err, "failed to close peer after setup error");
                }
                return Err(e);
            }
        };
        info!("peer connection established");

        Ok(Self {
            signaling,
            peer,
            negotiator,
            presenter,
            placeholder,
            resolution: Arc::new(Mutex::new(ResolutionState::new())),
            handlers: CommandRegistry::with_defaults(),
            events_tx,
            events_rx,
            session: None,
            options,
        })
    }

    async fn open_base_connection(
        peer: &dyn PeerConnection,
        signaling: &dyn SignalingTransport,
        negotiator: &Negotiator,
    ) -> Result<Arc<dyn DataChannel>, ViewerError> {
        let placeholder = peer
            .create_data_channel(PLACEHOLDER_CHANNEL_LABEL)
            .await
            .map_err(|source| ViewerError::Channel {
                label: PLACEHOLDER_CHANNEL_LABEL,
                source,
            })?;
        let endpoint = SignalingEndpoint::CreatePeerConnection;
        negotiator
            .negotiate(peer, signaling, endpoint)
            .await
            .map_err(|source| ViewerError::Negotiation { endpoint, source })?;
        Ok(placeholder)
    }

    /// Starts a video session.  A no-op while a session is already active.
    ///
    /// # Errors
    ///
    /// Returns the channel, transceiver or negotiation error.  The control
    /// channel is closed again and no session is recorded.
    pub async fn start_session(&mut self) -> Result<(), ViewerError> {
        if let Some(session) = &self.session {
            debug!(session = %session.id, "session already active, start ignored");
            return Ok(());
        }

        let id = Uuid::new_v4();
        let channel = self
            .peer
            .create_data_channel(CONTROL_CHANNEL_LABEL)
            .await
            .map_err(|source| ViewerError::Channel {
                label: CONTROL_CHANNEL_LABEL,
                source,
            })?;

        if let Err(e) = self.negotiate_video().await {
            warn!(session = %id, error = %e, "session start failed");
            if let Err(close_err) = channel.close().await {
                warn!(session = %id, error = %close_err, "failed to close control channel");
            }
            return Err(e);
        }

        info!(session = %id, "session started");
        self.session = Some(ActiveSession {
            id,
            channel,
            mirror: None,
        });
        Ok(())
    }

    async fn negotiate_video(&self) -> Result<(), ViewerError> {
        if ensure_receive_transceivers(self.peer.as_ref()).await? {
            debug!("receive-only video and audio transceivers added");
        }
        let endpoint = SignalingEndpoint::StartVideo;
        self.negotiator
            .negotiate(self.peer.as_ref(), self.signaling.as_ref(), endpoint)
            .await
            .map_err(|source| ViewerError::Negotiation { endpoint, source })
    }

    /// Stops the active session.  A no-op when there is none.
    ///
    /// The canvas mirror is cancelled and the control channel closed before
    /// the `stopVideo` exchange runs.
    ///
    /// # Errors
    ///
    /// Returns the `stopVideo` negotiation error.  The session is gone either
    /// way.
    pub async fn stop_session(&mut self) -> Result<(), ViewerError> {
        let Some(session) = self.session.take() else {
            debug!("no active session, stop ignored");
            return Ok(());
        };
        let ActiveSession { id, channel, mirror } = session;
        drop(mirror);

        if let Err(e) = channel.close().await {
            warn!(session = %id, error = %e, "failed to close control channel");
        }

        let endpoint = SignalingEndpoint::StopVideo;
        self.negotiator
            .negotiate(self.peer.as_ref(), self.signaling.as_ref(), endpoint)
            .await
            .map_err(|source| ViewerError::Negotiation { endpoint, source })?;
        info!(session = %id, "session stopped");
        Ok(())
    }

    /// Sends `{command, data}` on the control channel.
    ///
    /// Returns `Ok(false)` when no session is active or the channel is not
    /// open yet.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Control`] if encoding or transmission fails.
    pub async fn send_command<T: Serialize + ?Sized>(
        &self,
        command: &str,
        data: &T,
    ) -> Result<bool, ViewerError> {
        let channel = self.session.as_ref().map(|s| s.channel.as_ref());
        Ok(send_command(channel, command, data).await?)
    }

    /// Sends the pointer position, given in overlay canvas pixels, as a
    /// `mousepose` command in remote screen pixels.
    ///
    /// Returns `Ok(false)` while the mapping is undefined (either size still
    /// unknown) or the channel is not open.
    pub async fn send_pointer(&self, canvas_x: f64, canvas_y: f64) -> Result<bool, ViewerError> {
        let mapped = lock_resolution(&self.resolution).canvas_to_screen(canvas_x, canvas_y);
        let Some((x, y)) = mapped else {
            debug!(canvas_x, canvas_y, "pointer mapping undefined, not sent");
            return Ok(false);
        };
        self.send_command(commands::MOUSE_POSE, &PointerPosition { x, y })
            .await
    }

    /// Waits for the next queued event.
    pub async fn next_event(&mut self) -> Option<ViewerEvent> {
        self.events_rx.recv().await
    }

    /// `true` if `channel` is the active session's control channel.
    fn is_control_channel(&self, channel: ChannelId) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.channel.id() == channel)
    }

    /// Applies one event.  Failures are logged, never returned.
    ///
    /// Channel events are matched by channel id, so events from a control
    /// channel of an earlier session are ignored.
    pub async fn handle_event(&mut self, event: ViewerEvent) {
        match event {
            ViewerEvent::TrackReceived(track) => {
                route_track(track, self.presenter.as_ref());
            }
            ViewerEvent::ChannelOpened { channel, .. } if self.is_control_channel(channel) => {
                info!("control channel open, requesting screen size");
                let request = ControlMessage::screen_size_request();
                match self.send_command(&request.command, &request.data).await {
                    Ok(true) => {}
                    Ok(false) => debug!("control channel closed again before the request"),
                    Err(e) => warn!(error = %e, "screen size request failed"),
                }
            }
            ViewerEvent::ChannelOpened { channel, label } => {
                debug!(%channel, %label, "data channel open");
            }
            ViewerEvent::ChannelMessage { channel, text, .. } if self.is_control_channel(channel) => {
                let outcome = self.handlers.dispatch(&text, &self.resolution);
                debug!(?outcome, "control frame dispatched");
            }
            ViewerEvent::ChannelMessage { channel, label, .. } => {
                debug!(%channel, %label, "ignoring frame outside the session control channel");
            }
            ViewerEvent::ChannelClosed { channel, label } => {
                info!(%channel, %label, "data channel closed");
            }
            ViewerEvent::ConnectionStateChanged(state) => {
                info!(?state, "peer connection state changed");
            }
            ViewerEvent::VideoPlaying => match self.session.as_mut() {
                Some(session) => {
                    // Assigning drops (and aborts) the previous mirror.
                    session.mirror = Some(CanvasMirror::spawn(
                        self.options.mirror_interval,
                        self.presenter.clone(),
                        self.resolution.clone(),
                    ));
                    debug!(session = %session.id, "canvas mirror (re)started");
                }
                None => debug!("video playing without an active session, mirror not started"),
            },
        }
    }

    /// Runs the event loop until `shutdown` resolves.
    pub async fn run<F: Future<Output = ()>>(&mut self, shutdown: F) {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                event = self.next_event() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }
    }

    /// Stops any active session and closes the peer connection.
    ///
    /// # Errors
    ///
    /// Returns the error from closing the peer connection.  A failing
    /// `stopVideo` exchange is logged and does not prevent the close.
    pub async fn close(mut self) -> Result<(), ViewerError> {
        if let Err(e) = self.stop_session().await {
            warn!(error = %e, "stop during close failed");
        }
        if let Err(e) = self.placeholder.close().await {
            debug!(error = %e, "placeholder channel close failed");
        }
        self.peer.close().await?;
        info!("viewer closed");
        Ok(())
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    /// Snapshot of the resolution state.
    pub fn resolution(&self) -> ResolutionState {
        *lock_resolution(&self.resolution)
    }

    /// The shared resolution state handle.
    pub fn shared_resolution(&self) -> SharedResolution {
        self.resolution.clone()
    }

    pub fn is_session_active(&self) -> bool {
        self.session.is_some()
    }

    /// Id of the active session, used to correlate log lines.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    /// `true` while the active session has a running canvas mirror.
    pub fn is_mirror_running(&self) -> bool {
        self.session
            .as_ref()
            .and_then(|s| s.mirror.as_ref())
            .is_some_and(CanvasMirror::is_running)
    }

    /// The command handler table, for registering extra commands.
    pub fn handlers_mut(&mut self) -> &mut CommandRegistry {
        &mut self.handlers
    }

    /// A sender onto this viewer's event queue.
    pub fn event_sender(&self) -> EventSender {
        self.events_tx.clone()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
