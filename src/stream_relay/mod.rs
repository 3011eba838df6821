//! StreamRelay - MJPEG fan-out from frame buffers to HTTP viewers
//!
//! ## Responsibilities
//!
//! - One multipart MJPEG stream per viewer, paced at the camera's frame rate
//! - Placeholder frames when a camera is unknown, still connecting, or failed
//! - Health snapshots of every capture loop for the status endpoint
//!
//! Viewers never touch the capture side: each tick reads the camera's frame
//! buffer, so any number of viewers share one upstream connection and a slow
//! viewer only skips its own frames.

mod placeholder;

pub use placeholder::{render_placeholder, PlaceholderKind, PlaceholderSet};

use bytes::{BufMut, Bytes, BytesMut};
use futures::Stream;
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::config::CameraConfig;
use crate::error::Result;
use crate::stream_capture::{CaptureState, StreamCaptureManager};

/// Multipart boundary token, fixed so clients can be written against it
pub const BOUNDARY: &str = "frame";
/// Content-Type for the multiplexed stream response
pub const MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Pace for the not-found placeholder stream, 1 Hz
const UNKNOWN_CAMERA_INTERVAL: Duration = Duration::from_secs(1);

/// Health snapshot of one camera, as served by the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct StreamHealth {
    pub camera_id: String,
    pub name: String,
    pub state: CaptureState,
    pub consecutive_failures: u32,
    pub has_frame: bool,
    /// Seconds since the buffered frame was captured, absent before the
    /// first frame
    pub frame_age_secs: Option<f64>,
}

/// Fan-out of capture buffers to any number of MJPEG viewers
pub struct StreamRelay {
    captures: HashMap<String, Arc<StreamCaptureManager>>,
    placeholders: HashMap<String, PlaceholderSet>,
    fallback: PlaceholderSet,
}

impl StreamRelay {
    /// Build the relay over the capture managers, pre-rendering placeholder
    /// frames at each camera's geometry.
    pub fn new(captures: HashMap<String, Arc<StreamCaptureManager>>) -> Result<Arc<Self>> {
        let mut placeholders = HashMap::new();
        for (id, capture) in &captures {
            let cfg = capture.config();
            placeholders.insert(
                id.clone(),
                PlaceholderSet::render(cfg.width, cfg.height, cfg.jpeg_quality)?,
            );
        }

        let defaults = CameraConfig::default_geometry();
        let fallback = PlaceholderSet::render(defaults.0, defaults.1, defaults.2)?;

        Ok(Arc::new(Self {
            captures,
            placeholders,
            fallback,
        }))
    }

    pub fn camera_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.captures.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn capture(&self, camera_id: &str) -> Option<&Arc<StreamCaptureManager>> {
        self.captures.get(camera_id)
    }

    /// Endless multipart MJPEG part stream for one viewer. Pacing happens
    /// here, per viewer; dropping the stream ends it.
    ///
    /// An unknown camera id still yields a stream, serving the not-found
    /// placeholder, so browser `<img>` tags degrade gracefully.
    pub fn mjpeg_parts(
        self: &Arc<Self>,
        camera_id: &str,
    ) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> {
        let relay = self.clone();
        let camera_id = camera_id.to_string();
        let frame_interval = relay.frame_interval(&camera_id);

        async_stream::stream! {
            let mut ticker = tokio::time::interval(frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                yield Ok(multipart_part(&relay.current_jpeg(&camera_id)));
            }
        }
    }

    /// Single-shot JPEG for snapshot requests; placeholder when the camera
    /// has nothing buffered.
    pub fn snapshot(&self, camera_id: &str) -> Bytes {
        self.current_jpeg(camera_id)
    }

    /// Health of every camera, sorted by id.
    pub fn health(&self) -> Vec<StreamHealth> {
        let mut report: Vec<StreamHealth> = self
            .captures
            .iter()
            .map(|(id, capture)| {
                let status = capture.status();
                let frame = capture.latest_frame();
                StreamHealth {
                    camera_id: id.clone(),
                    name: capture.config().name.clone(),
                    state: status.state,
                    consecutive_failures: status.consecutive_failures,
                    has_frame: frame.is_some(),
                    frame_age_secs: frame.map(|f| f.captured_at.elapsed().as_secs_f64()),
                }
            })
            .collect();
        report.sort_by(|a, b| a.camera_id.cmp(&b.camera_id));
        report
    }

    fn frame_interval(&self, camera_id: &str) -> Duration {
        match self.captures.get(camera_id) {
            Some(capture) => Duration::from_millis(1000 / u64::from(capture.config().fps.max(1))),
            None => UNKNOWN_CAMERA_INTERVAL,
        }
    }

    fn current_jpeg(&self, camera_id: &str) -> Bytes {
        let Some(capture) = self.captures.get(camera_id) else {
            return self.fallback.get(PlaceholderKind::NotFound);
        };

        match capture.latest_frame() {
            Some(frame) => frame.jpeg,
            None => {
                let kind = if capture.status().looks_failed() {
                    PlaceholderKind::ConnectionFailed
                } else {
                    PlaceholderKind::Connecting
                };
                self.placeholders
                    .get(camera_id)
                    .unwrap_or(&self.fallback)
                    .get(kind)
            }
        }
    }
}

/// Frame one JPEG as a multipart part, headers included.
fn multipart_part(jpeg: &Bytes) -> Bytes {
    let mut part = BytesMut::with_capacity(jpeg.len() + 96);
    part.put_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    part.put_slice(b"Content-Type: image/jpeg\r\n");
    part.put_slice(format!("Content-Length: {}\r\n\r\n", jpeg.len()).as_bytes());
    part.put_slice(jpeg);
    part.put_slice(b"\r\n");
    part.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn test_capture(id: &str) -> Arc<StreamCaptureManager> {
        StreamCaptureManager::new(CameraConfig {
            id: id.to_string(),
            name: format!("Camera {id}"),
            url: "rtsp://127.0.0.1:1/none".to_string(),
            location: String::new(),
            width: 320,
            height: 180,
            fps: 10,
            jpeg_quality: 80,
            frame_skip: 1,
            reconnect_interval_secs: 5,
            max_reconnect_attempts: 5,
            backoff_secs: 10,
            stale_timeout_secs: 10,
        })
    }

    fn relay_with(ids: &[&str]) -> Arc<StreamRelay> {
        let captures = ids
            .iter()
            .map(|id| (id.to_string(), test_capture(id)))
            .collect();
        StreamRelay::new(captures).unwrap()
    }

    #[test]
    fn multipart_part_frames_the_jpeg() {
        let jpeg = Bytes::from_static(b"\xff\xd8data\xff\xd9");
        let part = multipart_part(&jpeg);
        let text = String::from_utf8_lossy(&part);

        assert!(text.starts_with("--frame\r\n"));
        assert!(text.contains("Content-Type: image/jpeg\r\n"));
        assert!(text.contains(&format!("Content-Length: {}\r\n\r\n", jpeg.len())));
        assert!(part.ends_with(b"\xff\xd9\r\n"));
    }

    #[test]
    fn unknown_camera_gets_not_found_placeholder() {
        let relay = relay_with(&["cam1"]);
        let jpeg = relay.current_jpeg("nope");
        assert_eq!(jpeg, relay.fallback.get(PlaceholderKind::NotFound));
    }

    #[test]
    fn camera_without_frame_gets_connecting_placeholder() {
        let relay = relay_with(&["cam1"]);
        let jpeg = relay.current_jpeg("cam1");
        let expected = relay.placeholders["cam1"].get(PlaceholderKind::Connecting);
        assert_eq!(jpeg, expected);
    }

    #[test]
    fn health_is_sorted_and_frame_free() {
        let relay = relay_with(&["b", "a"]);
        let health = relay.health();

        assert_eq!(health.len(), 2);
        assert_eq!(health[0].camera_id, "a");
        assert_eq!(health[1].camera_id, "b");
        assert!(!health[0].has_frame);
        assert!(health[0].frame_age_secs.is_none());
        assert_eq!(health[0].state, CaptureState::Disconnected);
    }

    #[tokio::test]
    async fn stream_yields_parts_for_unknown_camera() {
        let relay = relay_with(&[]);
        let stream = relay.mjpeg_parts("ghost");
        tokio::pin!(stream);

        let first = stream.next().await.unwrap().unwrap();
        assert!(first.starts_with(b"--frame\r\n"));
        let second = stream.next().await.unwrap().unwrap();
        assert!(second.starts_with(b"--frame\r\n"));
    }
}
