//! Configuration surface
//!
//! Loaded from an optional TOML file (`ROADVIEW_CONFIG`, default
//! `roadview.toml`) with env fallbacks for the server-level settings.
//! Per-camera entries carry the capture tuning knobs; defaults mirror the
//! field deployment (800x450 @ 15fps, quality 85).

use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server bind host
    pub host: String,
    /// Server port
    pub port: u16,
    /// SQLite database path
    pub database_path: String,
    /// Days of telemetry to keep (0 = keep forever)
    pub retention_days: u32,
    /// Poll interval for the background alert watcher, seconds
    pub alert_poll_secs: u64,
    /// Camera streams served by the relay
    pub cameras: Vec<CameraConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "roadview_analytics.db".to_string()),
            retention_days: 0,
            alert_poll_secs: 2,
            cameras: Vec::new(),
        }
    }
}

/// Per-camera stream configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    /// Stream identifier used in relay URLs (e.g. "main", "camera_0")
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// RTSP source URI
    pub url: String,
    /// Physical location label
    #[serde(default)]
    pub location: String,
    /// Output frame width
    #[serde(default = "defaults::width")]
    pub width: u32,
    /// Output frame height
    #[serde(default = "defaults::height")]
    pub height: u32,
    /// Output frame rate
    #[serde(default = "defaults::fps")]
    pub fps: u32,
    /// JPEG re-encode quality, 1-100
    #[serde(default = "defaults::jpeg_quality")]
    pub jpeg_quality: u8,
    /// Frames discarded between each stored frame
    #[serde(default = "defaults::frame_skip")]
    pub frame_skip: u32,
    /// Minimum interval between reconnection attempts, seconds
    #[serde(default = "defaults::reconnect_interval_secs")]
    pub reconnect_interval_secs: u64,
    /// Consecutive failures before the extended backoff kicks in
    #[serde(default = "defaults::max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Extended cooldown after max_reconnect_attempts failures, seconds
    #[serde(default = "defaults::backoff_secs")]
    pub backoff_secs: u64,
    /// No stored frame within this window marks the stream disconnected
    #[serde(default = "defaults::stale_timeout_secs")]
    pub stale_timeout_secs: u64,
}

impl CameraConfig {
    /// Frame geometry and quality used when no camera config applies
    /// (placeholders for unknown stream ids).
    pub fn default_geometry() -> (u32, u32, u8) {
        (defaults::width(), defaults::height(), defaults::jpeg_quality())
    }
}

mod defaults {
    pub fn width() -> u32 {
        800
    }
    pub fn height() -> u32 {
        450
    }
    pub fn fps() -> u32 {
        15
    }
    pub fn jpeg_quality() -> u8 {
        85
    }
    pub fn frame_skip() -> u32 {
        1
    }
    pub fn reconnect_interval_secs() -> u64 {
        5
    }
    pub fn max_reconnect_attempts() -> u32 {
        5
    }
    pub fn backoff_secs() -> u64 {
        10
    }
    pub fn stale_timeout_secs() -> u64 {
        10
    }
}

impl Config {
    /// Load configuration from the given TOML file, falling back to defaults
    /// when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults (no cameras)"
            );
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        for camera in &config.cameras {
            if camera.id.is_empty() || camera.url.is_empty() {
                return Err(Error::Config(
                    "camera entries require non-empty id and url".to_string(),
                ));
            }
        }

        Ok(config)
    }

    /// Path of the config file, from env or the default location.
    pub fn default_path() -> String {
        std::env::var("ROADVIEW_CONFIG").unwrap_or_else(|_| "roadview.toml".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camera_defaults() {
        let config: Config = toml::from_str(
            r#"
            port = 8080

            [[cameras]]
            id = "main"
            url = "rtsp://example/stream"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        let cam = &config.cameras[0];
        assert_eq!(cam.width, 800);
        assert_eq!(cam.height, 450);
        assert_eq!(cam.fps, 15);
        assert_eq!(cam.jpeg_quality, 85);
        assert_eq!(cam.frame_skip, 1);
        assert_eq!(cam.max_reconnect_attempts, 5);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roadview.toml");
        std::fs::write(
            &path,
            r#"
            port = 9000
            retention_days = 14

            [[cameras]]
            id = "gate"
            url = "rtsp://10.0.0.4/stream"
            fps = 10
            "#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.retention_days, 14);
        assert_eq!(config.cameras[0].fps, 10);
    }

    #[test]
    fn rejects_camera_without_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roadview.toml");
        std::fs::write(&path, "[[cameras]]\nid = \"gate\"\nurl = \"\"\n").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load("/nonexistent/roadview.toml").unwrap();
        assert!(config.cameras.is_empty());
        assert_eq!(config.port, 5000);
    }
}
