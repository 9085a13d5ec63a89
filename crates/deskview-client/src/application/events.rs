//! Events delivered to the viewer's event loop.
//!
//! Every asynchronous notification (from the WebRTC stack, the data channels,
//! or the presenter) is funnelled into one unbounded queue and handled in
//! arrival order by [`Viewer::handle_event`](crate::application::Viewer::handle_event).
//! Producers only enqueue; all state changes happen on the consuming task.

use tokio::sync::mpsc;

use crate::application::peer::{ChannelId, ConnectionState, RemoteTrack};

/// Sending half of the viewer event queue.
pub type EventSender = mpsc::UnboundedSender<ViewerEvent>;

/// Receiving half of the viewer event queue.
pub type EventReceiver = mpsc::UnboundedReceiver<ViewerEvent>;

/// Creates a new, empty event queue.
pub fn event_queue() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// A notification for the viewer event loop.
#[derive(Debug)]
pub enum ViewerEvent {
    /// The server sent a media track.
    TrackReceived(RemoteTrack),

    /// A data channel became open.
    ChannelOpened { channel: ChannelId, label: String },

    /// A text frame arrived on a data channel.
    ChannelMessage {
        channel: ChannelId,
        label: String,
        text: String,
    },

    /// A data channel closed.
    ChannelClosed { channel: ChannelId, label: String },

    /// The peer connection's transport state changed.
    ConnectionStateChanged(ConnectionState),

    /// The video surface started playing (first frame rendered).
    VideoPlaying,
}
