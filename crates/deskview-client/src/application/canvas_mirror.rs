//! Periodic copy of the rendered video size onto the overlay canvas.
//!
//! A [`CanvasMirror`] owns its tokio task.  Dropping the mirror aborts the
//! task, so a session that holds the mirror cancels it on teardown.

use std::sync::Arc;
use std::time::Duration;

use deskview_core::Dimensions;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::application::control_channel::{lock_resolution, SharedResolution};
use crate::application::media::MediaPresenter;

/// A running canvas mirror task.
pub struct CanvasMirror {
    task: JoinHandle<()>,
}

impl CanvasMirror {
    /// Starts mirroring every `period`.  The first tick happens one full
    /// period after the call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        period: Duration,
        presenter: Arc<dyn MediaPresenter>,
        resolution: SharedResolution,
    ) -> Self {
        debug!(period_ms = period.as_millis() as u64, "starting canvas mirror");
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                mirror_once(presenter.as_ref(), &resolution);
            }
        });
        Self { task }
    }

    /// `false` once the task has been aborted or has panicked.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for CanvasMirror {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// One mirror tick: resize the overlay to the rendered video size and record
/// it as the canvas dimensions.  Returns the size applied, if any.
pub fn mirror_once(presenter: &dyn MediaPresenter, resolution: &SharedResolution) -> Option<Dimensions> {
    let size = presenter.rendered_video_size()?;
    presenter.resize_overlay(size);
    lock_resolution(resolution).set_canvas(size);
    trace!(width = size.width, height = size.height, "overlay canvas resized");
    Some(size)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
