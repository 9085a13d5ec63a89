//! Viewer configuration types.
//!
//! [`ViewerConfig`] is the single source of truth for runtime settings.  It is
//! built once at startup from defaults, an optional TOML file, and CLI flags
//! (in increasing order of precedence), then handed to the components that
//! need it.

use std::time::Duration;

use deskview_core::Dimensions;

/// All runtime configuration for the viewer.
///
/// # Example
///
/// ```rust
/// use deskview_client::domain::ViewerConfig;
///
/// let cfg = ViewerConfig::default();
/// assert_eq!(cfg.server_url, "http://localhost:8080");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Base URL of the remote server hosting the signaling endpoints.
    ///
    /// Endpoint paths (`/iceServers`, `/startVideo`, ...) are appended to it.
    pub server_url: String,

    /// Period of the canvas mirror task that copies the rendered video size
    /// onto the overlay canvas.
    pub mirror_interval: Duration,

    /// Rendered size the headless presenter reports for the video surface.
    pub viewport: Dimensions,

    /// Per-request timeout for signaling calls.  `None` waits indefinitely.
    pub request_timeout: Option<Duration>,

    /// Fallback `tracing` filter used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ViewerConfig {
    /// | Field            | Default                  |
    /// |------------------|--------------------------|
    /// | server_url       | `http://localhost:8080`  |
    /// | mirror_interval  | 1 second                 |
    /// | viewport         | 1280 × 720               |
    /// | request_timeout  | none                     |
    /// | log_level        | `info`                   |
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            mirror_interval: Duration::from_secs(1),
            viewport: Dimensions::new(1280, 720),
            request_timeout: None,
            log_level: "info".to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_url_is_localhost_8080() {
        let cfg = ViewerConfig::default();
        assert_eq!(cfg.server_url, "http://localhost:8080");
    }

    #[test]
    fn test_default_mirror_interval_is_one_second() {
        let cfg = ViewerConfig::default();
        assert_eq!(cfg.mirror_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_default_has_no_request_timeout() {
        // Signaling calls wait indefinitely unless a timeout is configured.
        let cfg = ViewerConfig::default();
        assert!(cfg.request_timeout.is_none());
    }

    #[test]
    fn test_default_viewport_is_720p() {
        let cfg = ViewerConfig::default();
        assert_eq!(cfg.viewport, Dimensions::new(1280, 720));
    }
}
