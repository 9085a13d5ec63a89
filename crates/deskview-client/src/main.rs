//! deskview: remote desktop viewer entry point.
//!
//! Connects to a remote desktop server, starts a video session and keeps the
//! session running until Ctrl+C, then stops it and closes the connection.
//!
//! # Usage
//!
//! ```text
//! deskview [OPTIONS]
//!
//! Options:
//!   --server-url <URL>             Base URL of the server [default: http://localhost:8080]
//!   --config <PATH>                TOML config file
//!   --viewport-width <PX>          Rendered video width reported by the presenter
//!   --viewport-height <PX>         Rendered video height reported by the presenter
//!   --mirror-interval-ms <MS>      Canvas mirror period
//!   --request-timeout-secs <SECS>  Signaling request timeout
//!   --log-level <FILTER>           Log filter when RUST_LOG is unset
//! ```
//!
//! # Precedence
//!
//! Built-in defaults, then the `--config` file, then CLI flags.  Every flag
//! can also be set through the environment:
//!
//! | Variable                        | Flag                      |
//! |---------------------------------|---------------------------|
//! | `DESKVIEW_SERVER_URL`           | `--server-url`            |
//! | `DESKVIEW_CONFIG`               | `--config`                |
//! | `DESKVIEW_VIEWPORT_WIDTH`       | `--viewport-width`        |
//! | `DESKVIEW_VIEWPORT_HEIGHT`      | `--viewport-height`       |
//! | `DESKVIEW_MIRROR_INTERVAL_MS`   | `--mirror-interval-ms`    |
//! | `DESKVIEW_REQUEST_TIMEOUT_SECS` | `--request-timeout-secs`  |
//! | `DESKVIEW_LOG_LEVEL`            | `--log-level`             |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use deskview_client::application::{event_queue, Viewer, ViewerOptions};
use deskview_client::domain::ViewerConfig;
use deskview_client::infrastructure::config_file::load_config;
use deskview_client::infrastructure::headless_presenter::HeadlessPresenter;
use deskview_client::infrastructure::http_signaling::HttpSignaling;
use deskview_client::infrastructure::webrtc_peer::WebRtcPeerFactory;
use deskview_core::Dimensions;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Remote desktop viewer over WebRTC.
#[derive(Debug, Parser)]
#[command(name = "deskview", about = "Remote desktop viewer over WebRTC", version)]
struct Cli {
    /// Base URL of the server hosting the signaling endpoints.
    #[arg(long, env = "DESKVIEW_SERVER_URL")]
    server_url: Option<String>,

    /// TOML config file.  Flags given on the command line override it.
    #[arg(long, env = "DESKVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// Rendered video width reported by the headless presenter.
    #[arg(long, env = "DESKVIEW_VIEWPORT_WIDTH")]
    viewport_width: Option<u32>,

    /// Rendered video height reported by the headless presenter.
    #[arg(long, env = "DESKVIEW_VIEWPORT_HEIGHT")]
    viewport_height: Option<u32>,

    /// Period of the canvas mirror task in milliseconds.
    #[arg(long, env = "DESKVIEW_MIRROR_INTERVAL_MS", value_parser = clap::value_parser!(u64).range(1..))]
    mirror_interval_ms: Option<u64>,

    /// Per-request signaling timeout in seconds.  No timeout when unset.
    #[arg(long, env = "DESKVIEW_REQUEST_TIMEOUT_SECS", value_parser = clap::value_parser!(u64).range(1..))]
    request_timeout_secs: Option<u64>,

    /// `tracing` filter used when `RUST_LOG` is not set.
    #[arg(long, env = "DESKVIEW_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Builds the effective [`ViewerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--config` names a file that cannot be loaded.
    fn into_viewer_config(self) -> anyhow::Result<ViewerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config file '{}'", path.display()))?,
            None => ViewerConfig::default(),
        };

        if let Some(url) = self.server_url {
            config.server_url = url;
        }
        if let Some(width) = self.viewport_width {
            config.viewport = Dimensions::new(width, config.viewport.height);
        }
        if let Some(height) = self.viewport_height {
            config.viewport = Dimensions::new(config.viewport.width, height);
        }
        if let Some(ms) = self.mirror_interval_ms {
            config.mirror_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_viewer_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(server = %config.server_url, "deskview starting");

    let signaling = Arc::new(
        HttpSignaling::new(&config.server_url, config.request_timeout)
            .context("failed to create signaling client")?,
    );
    let factory = WebRtcPeerFactory::new().context("failed to initialise WebRTC")?;
    let (events_tx, events_rx) = event_queue();
    let presenter = Arc::new(HeadlessPresenter::new(config.viewport, events_tx.clone()));

    let mut viewer = Viewer::connect(
        signaling,
        &factory,
        presenter,
        (events_tx, events_rx),
        ViewerOptions::from(&config),
    )
    .await
    .with_context(|| format!("failed to connect to {}", config.server_url))?;

    if let Err(e) = viewer.start_session().await {
        if let Err(close_err) = viewer.close().await {
            warn!(error = %close_err, "failed to close viewer");
        }
        return Err(e).context("failed to start video session");
    }

    info!("session running, press Ctrl+C to stop");
    viewer
        .run(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("received Ctrl+C, shutting down"),
                Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
            }
        })
        .await;

    if let Err(e) = viewer.stop_session().await {
        warn!(error = %e, "failed to stop session cleanly");
    }
    viewer.close().await.context("failed to close peer connection")?;

    info!("deskview stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
