//! Remote track routing and the presentation seam.

use deskview_core::Dimensions;
use tracing::{info, warn};

use crate::application::peer::{RemoteTrack, TrackKind};

/// The surface remote media is presented on: a video element with an overlay
/// canvas on top, plus audio outputs.
pub trait MediaPresenter: Send + Sync {
    /// Wraps an audio track in an output.  Outputs start paused.
    fn attach_audio(&self, track: RemoteTrack);

    /// Makes `track` the source of the video surface, replacing any previous
    /// source.
    fn attach_video(&self, track: RemoteTrack);

    /// Current rendered size of the video surface, if it has one.
    fn rendered_video_size(&self) -> Option<Dimensions>;

    /// Resizes the overlay canvas.
    fn resize_overlay(&self, size: Dimensions);
}

/// Where [`route_track`] sent a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackRoute {
    Audio,
    Video,
    Discarded,
}

/// Hands a remote track to the presenter according to its kind.
pub fn route_track(track: RemoteTrack, presenter: &dyn MediaPresenter) -> TrackRoute {
    match track.kind {
        TrackKind::Audio => {
            info!(track = %track.id, "attaching remote audio track (paused)");
            presenter.attach_audio(track);
            TrackRoute::Audio
        }
        TrackKind::Video => {
            info!(track = %track.id, "attaching remote video track");
            presenter.attach_video(track);
            TrackRoute::Video
        }
        TrackKind::Other(ref kind) => {
            warn!(track = %track.id, kind = %kind, "discarding track of unsupported kind");
            TrackRoute::Discarded
        }
    }
}
