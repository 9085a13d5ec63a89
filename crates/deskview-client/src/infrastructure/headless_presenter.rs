//! A [`MediaPresenter`] that renders nothing.
//!
//! Video packets are drained and counted so the receive path stays live, and
//! the first payload is reported as [`ViewerEvent::VideoPlaying`].  The video
//! surface reports the configured viewport as its rendered size once it has a
//! source.  Audio outputs are recorded and stay paused.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use deskview_core::Dimensions;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::application::events::{EventSender, ViewerEvent};
use crate::application::media::MediaPresenter;
use crate::application::peer::RemoteTrack;

/// An audio output wrapping one remote track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioOutput {
    pub track_id: String,
    pub paused: bool,
}

#[derive(Default)]
struct VideoSurface {
    track_id: Option<String>,
    reader: Option<JoinHandle<()>>,
}

/// Windowless presenter used by the `deskview` binary.
pub struct HeadlessPresenter {
    viewport: Dimensions,
    events: EventSender,
    video: Mutex<VideoSurface>,
    audio: Mutex<Vec<AudioOutput>>,
    overlay: Mutex<Dimensions>,
    video_bytes: Arc<AtomicU64>,
}

impl HeadlessPresenter {
    pub fn new(viewport: Dimensions, events: EventSender) -> Self {
        Self {
            viewport,
            events,
            video: Mutex::new(VideoSurface::default()),
            audio: Mutex::new(Vec::new()),
            overlay: Mutex::new(Dimensions::default()),
            video_bytes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current overlay canvas size.
    pub fn overlay_size(&self) -> Dimensions {
        *self.overlay.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Id of the track currently feeding the video surface.
    pub fn video_track_id(&self) -> Option<String> {
        self.video
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .track_id
            .clone()
    }

    /// Total video payload bytes received so far.
    pub fn video_bytes_received(&self) -> u64 {
        self.video_bytes.load(Ordering::Relaxed)
    }

    pub fn audio_outputs(&self) -> Vec<AudioOutput> {
        self.audio.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl MediaPresenter for HeadlessPresenter {
    fn attach_audio(&self, track: RemoteTrack) {
        self.audio
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(AudioOutput {
                track_id: track.id,
                paused: true,
            });
    }

    fn attach_video(&self, track: RemoteTrack) {
        let events = self.events.clone();
        let bytes = self.video_bytes.clone();
        let source = track.source.clone();
        let track_id = track.id.clone();

        let reader = tokio::spawn(async move {
            let mut playing = false;
            while let Some(payload) = source.next_payload().await {
                bytes.fetch_add(payload.len() as u64, Ordering::Relaxed);
                if !playing {
                    playing = true;
                    info!(track = %track_id, "video playing");
                    let _ = events.send(ViewerEvent::VideoPlaying);
                }
            }
            debug!(track = %track_id, "video source ended");
        });

        let mut video = self.video.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = video.reader.replace(reader) {
            previous.abort();
        }
        video.track_id = Some(track.id);
    }

    fn rendered_video_size(&self) -> Option<Dimensions> {
        let has_source = self
            .video
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .track_id
            .is_some();
        has_source.then_some(self.viewport)
    }

    fn resize_overlay(&self, size: Dimensions) {
        *self.overlay.lock().unwrap_or_else(|e| e.into_inner()) = size;
    }
}

impl Drop for HeadlessPresenter {
    fn drop(&mut self) {
        let video = self.video.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(reader) = video.reader.take() {
            reader.abort();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
