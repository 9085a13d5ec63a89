pub mod canvas_mirror;
pub mod control_channel;
pub mod events;
pub mod media;
pub mod peer;
pub mod signaling;
pub mod viewer;

pub use canvas_mirror::CanvasMirror;
pub use control_channel::{
    CommandHandler, CommandRegistry, ControlError, DispatchOutcome, SharedResolution,
    CONTROL_CHANNEL_LABEL, PLACEHOLDER_CHANNEL_LABEL,
};
pub use events::{event_queue, EventReceiver, EventSender, ViewerEvent};
pub use media::{route_track, MediaPresenter, TrackRoute};
pub use peer::{
    ChannelId, ConnectionState, DataChannel, MediaKind, OfferOptions, PeerConnection, PeerError,
    PeerFactory, RemoteTrack, SignalingState, TrackKind, TrackSource,
};
pub use signaling::{Negotiator, SignalingError, SignalingTransport};
pub use viewer::{Viewer, ViewerError, ViewerOptions};
