//! TOML configuration file for the viewer.
//!
//! Every field is optional; anything left out keeps its
//! [`ViewerConfig::default`] value.
//!
//! ```toml
//! [viewer]
//! server_url = "http://desktop.lan:8080"
//! log_level = "debug"
//! request_timeout_secs = 10
//!
//! [display]
//! viewport_width = 1920
//! viewport_height = 1080
//! mirror_interval_ms = 500
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use deskview_core::Dimensions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ViewerConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is not usable.
    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Schema ────────────────────────────────────────────────────────────────────

/// On-disk layout of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub viewer: ViewerSection,
    #[serde(default)]
    pub display: DisplaySection,
}

/// `[viewer]` table: connection and logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewerSection {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Signaling request timeout.  Absent means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

/// `[display]` table: presentation sizes and timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplaySection {
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    #[serde(default = "default_mirror_interval_ms")]
    pub mirror_interval_ms: u64,
}

fn default_server_url() -> String {
    ViewerConfig::default().server_url
}
fn default_log_level() -> String {
    ViewerConfig::default().log_level
}
fn default_viewport_width() -> u32 {
    ViewerConfig::default().viewport.width
}
fn default_viewport_height() -> u32 {
    ViewerConfig::default().viewport.height
}
fn default_mirror_interval_ms() -> u64 {
    ViewerConfig::default().mirror_interval.as_millis() as u64
}

impl Default for ViewerSection {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            log_level: default_log_level(),
            request_timeout_secs: None,
        }
    }
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            mirror_interval_ms: default_mirror_interval_ms(),
        }
    }
}

impl ConfigFile {
    /// Converts the file contents into a [`ViewerConfig`].
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] for a zero mirror interval or zero timeout.
    pub fn into_viewer_config(self) -> Result<ViewerConfig, ConfigError> {
        if self.display.mirror_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "display.mirror_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.viewer.request_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                field: "viewer.request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(ViewerConfig {
            server_url: self.viewer.server_url,
            mirror_interval: Duration::from_millis(self.display.mirror_interval_ms),
            viewport: Dimensions::new(self.display.viewport_width, self.display.viewport_height),
            request_timeout: self.viewer.request_timeout_secs.map(Duration::from_secs),
            log_level: self.viewer.log_level,
        })
    }
}

/// Parses config TOML text.
///
/// # Errors
///
/// [`ConfigError::Parse`] for malformed TOML, [`ConfigError::Invalid`] for
/// unusable values.
pub fn parse_config(content: &str) -> Result<ViewerConfig, ConfigError> {
    let file: ConfigFile = toml::from_str(content)?;
    file.into_viewer_config()
}

/// Loads a [`ViewerConfig`] from `path`.
///
/// # Errors
///
/// [`ConfigError::Io`] if the file cannot be read (including when it does
/// not exist), otherwise as [`parse_config`].
pub fn load_config(path: &Path) -> Result<ViewerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let cfg = parse_config("").expect("parse");
        assert_eq!(cfg, ViewerConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_missing_fields() {
        // Arrange
        let toml_str = r#"
            [viewer]
            server_url = "http://desktop.lan:9000"
        "#;

        // Act
        let cfg = parse_config(toml_str).expect("parse");

        // Assert
        assert_eq!(cfg.server_url, "http://desktop.lan:9000");
        assert_eq!(cfg.mirror_interval, Duration::from_secs(1));
        assert_eq!(cfg.viewport, Dimensions::new(1280, 720));
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_full_file_overrides_every_field() {
        let toml_str = r#"
            [viewer]
            server_url = "https://remote.example.org"
            log_level = "debug"
            request_timeout_secs = 10

            [display]
            viewport_width = 1920
            viewport_height = 1080
            mirror_interval_ms = 250
        "#;

        let cfg = parse_config(toml_str).expect("parse");

        assert_eq!(cfg.server_url, "https://remote.example.org");
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.request_timeout, Some(Duration::from_secs(10)));
        assert_eq!(cfg.viewport, Dimensions::new(1920, 1080));
        assert_eq!(cfg.mirror_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_zero_mirror_interval_is_rejected() {
        let err = parse_config("[display]\nmirror_interval_ms = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "display.mirror_interval_ms",
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = parse_config("[viewer\nserver_url = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = std::env::temp_dir().join(format!("deskview-missing-{}.toml", uuid::Uuid::new_v4()));

        let err = load_config(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_config_reads_file_from_disk() {
        // Arrange
        let path = std::env::temp_dir().join(format!("deskview-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[display]\nviewport_width = 800\nviewport_height = 600\n").unwrap();

        // Act
        let result = load_config(&path);
        std::fs::remove_file(&path).ok();

        // Assert
        let cfg = result.expect("load");
        assert_eq!(cfg.viewport, Dimensions::new(800, 600));
    }
}
