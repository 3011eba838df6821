//! StreamCapture - per-camera RTSP capture into frame buffers
//!
//! ## Responsibilities
//!
//! - One background loop per camera: connect, decode, re-encode, buffer
//! - Reconnection pacing with extended backoff after repeated failures
//! - Staleness detection when a source stays open but stops producing
//!
//! Transport is an ffmpeg child process emitting MJPEG to stdout
//! (`kill_on_drop` guarantees cleanup); scaling, pacing and JPEG quality are
//! applied by its filter chain, so the loop only splits frames and stores
//! them. The loop never exits on an I/O error - every failure collapses to
//! disconnect-and-retry until `stop()`.

mod frame_buffer;
mod mjpeg;
mod types;

pub use frame_buffer::{Frame, FrameBuffer};
pub use mjpeg::MjpegFrameReader;
pub use types::{CaptureState, CaptureStatus};

use bytes::Bytes;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::config::CameraConfig;
use crate::error::{Error, Result};

/// Immediate connection attempts made by `start()` before backgrounding
const STARTUP_ATTEMPTS: u32 = 3;
/// Delay between those startup attempts
const STARTUP_RETRY_DELAY: Duration = Duration::from_secs(2);
/// Bounded wait for the loop to exit on `stop()`
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(3);

/// A live ffmpeg source; dropping it kills the process
struct CaptureSource {
    _child: Child,
    reader: MjpegFrameReader<ChildStdout>,
}

/// Per-camera background capture loop
pub struct StreamCaptureManager {
    config: CameraConfig,
    buffer: FrameBuffer,
    state: Mutex<CaptureState>,
    failures: AtomicU32,
    running: AtomicBool,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl StreamCaptureManager {
    pub fn new(config: CameraConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            buffer: FrameBuffer::new(),
            state: Mutex::new(CaptureState::Disconnected),
            failures: AtomicU32::new(0),
            running: AtomicBool::new(false),
            task: tokio::sync::Mutex::new(None),
        })
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Most recent frame without blocking on I/O; `None` before the first
    /// successful decode.
    pub fn latest_frame(&self) -> Option<Frame> {
        self.buffer.latest()
    }

    /// Current loop health, for the relay's placeholder choice.
    pub fn status(&self) -> CaptureStatus {
        let state = *self.state.lock().expect("state lock poisoned");
        let consecutive_failures = self.failures.load(Ordering::Relaxed);
        CaptureStatus {
            state,
            consecutive_failures,
            exhausted: consecutive_failures >= self.config.max_reconnect_attempts,
        }
    }

    /// Launch the capture loop. Idempotent; makes up to three immediate
    /// connection attempts before handing off to the background loop, which
    /// keeps retrying indefinitely.
    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!(camera_id = %self.config.id, "Capture already running");
            return;
        }

        let mut source = None;
        for attempt in 1..=STARTUP_ATTEMPTS {
            self.set_state(CaptureState::Connecting);
            match self.connect().await {
                Ok(src) => {
                    self.failures.store(0, Ordering::Relaxed);
                    source = Some(src);
                    break;
                }
                Err(e) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    self.set_state(CaptureState::Disconnected);
                    tracing::warn!(
                        camera_id = %self.config.id,
                        attempt,
                        error = %e,
                        "Startup connection attempt failed"
                    );
                    if attempt < STARTUP_ATTEMPTS {
                        tokio::time::sleep(STARTUP_RETRY_DELAY).await;
                    }
                }
            }
        }

        let manager = self.clone();
        let handle = tokio::spawn(async move { manager.run(source).await });
        *self.task.lock().await = Some(handle);

        tracing::info!(
            camera_id = %self.config.id,
            url = %self.config.url,
            connected = self.latest_frame().is_some(),
            "Capture loop started"
        );
    }

    /// Signal the loop to exit and join it with a bounded wait. The source
    /// process dies with its handle.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(handle) = self.task.lock().await.take() {
            let abort = handle.abort_handle();
            if timeout(STOP_JOIN_TIMEOUT, handle).await.is_err() {
                tracing::warn!(
                    camera_id = %self.config.id,
                    "Capture loop did not exit in time, aborting"
                );
                abort.abort();
            }
        }

        self.set_state(CaptureState::Disconnected);
        tracing::info!(camera_id = %self.config.id, "Capture loop stopped");
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: CaptureState) {
        *self.state.lock().expect("state lock poisoned") = state;
    }

    /// The capture loop: stream while connected, otherwise pace reconnection
    /// attempts, entering an extended cooldown after too many failures.
    async fn run(self: Arc<Self>, mut source: Option<CaptureSource>) {
        let reconnect_interval = Duration::from_secs(self.config.reconnect_interval_secs);
        let mut last_attempt = Instant::now();

        while self.is_running() {
            match source.take() {
                Some(src) => {
                    self.set_state(CaptureState::Streaming);
                    if let Err(e) = self.stream_frames(src).await {
                        tracing::warn!(
                            camera_id = %self.config.id,
                            error = %e,
                            "Stream interrupted"
                        );
                    }
                    if !self.is_running() {
                        break;
                    }
                    self.set_state(CaptureState::Disconnected);
                }
                None => {
                    if self.failures.load(Ordering::Relaxed) >= self.config.max_reconnect_attempts {
                        self.set_state(CaptureState::Backoff);
                        tracing::warn!(
                            camera_id = %self.config.id,
                            backoff_secs = self.config.backoff_secs,
                            "Reconnect limit reached, backing off"
                        );
                        self.idle_sleep(Duration::from_secs(self.config.backoff_secs))
                            .await;
                        self.failures.store(0, Ordering::Relaxed);
                        if !self.is_running() {
                            break;
                        }
                        self.set_state(CaptureState::Disconnected);
                    }

                    if last_attempt.elapsed() >= reconnect_interval {
                        last_attempt = Instant::now();
                        self.set_state(CaptureState::Connecting);
                        match self.connect().await {
                            Ok(src) => {
                                self.failures.store(0, Ordering::Relaxed);
                                source = Some(src);
                                continue;
                            }
                            Err(e) => {
                                self.failures.fetch_add(1, Ordering::Relaxed);
                                self.set_state(CaptureState::Disconnected);
                                tracing::debug!(
                                    camera_id = %self.config.id,
                                    error = %e,
                                    "Reconnection attempt failed"
                                );
                            }
                        }
                    }

                    self.idle_sleep(Duration::from_secs(1)).await;
                }
            }
        }

        self.set_state(CaptureState::Disconnected);
    }

    /// Read frames into the buffer until an error, staleness, or `stop()`.
    ///
    /// `frame_skip` frames are discarded between stored frames; the pipe is
    /// read continuously either way, so source-side buffering never grows and
    /// the stored frame is always the most recent one decoded.
    async fn stream_frames(&self, mut src: CaptureSource) -> std::io::Result<()> {
        let stale_window = Duration::from_secs(self.config.stale_timeout_secs);

        loop {
            if !self.is_running() {
                return Ok(());
            }

            let acquire = async {
                for _ in 0..self.config.frame_skip {
                    src.reader.next_frame().await?;
                }
                src.reader.next_frame().await
            };

            match timeout(stale_window, acquire).await {
                Ok(Ok(frame)) => self.buffer.store(Bytes::from(frame)),
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("no frame within {}s", self.config.stale_timeout_secs),
                    ))
                }
            }
        }
    }

    /// One connection attempt: spawn the source process and wait for its
    /// first complete frame, which is stored immediately.
    async fn connect(&self) -> Result<CaptureSource> {
        let cfg = &self.config;
        let qscale = jpeg_quality_to_qscale(cfg.jpeg_quality).to_string();
        let filter = format!("fps={},scale={}:{}", cfg.fps, cfg.width, cfg.height);

        let mut child = Command::new("ffmpeg")
            .args([
                "-fflags",
                "+nobuffer+discardcorrupt",
                "-flags",
                "low_delay",
                "-rtsp_transport",
                "tcp",
                "-i",
                &cfg.url,
                "-f",
                "mjpeg",
                "-q:v",
                &qscale,
                "-vf",
                &filter,
                "-an",
                "-loglevel",
                "error",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Capture(format!("ffmpeg spawn failed: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Capture("ffmpeg stdout unavailable".to_string()))?;
        let mut reader = MjpegFrameReader::new(stdout);

        let first = timeout(
            Duration::from_secs(cfg.stale_timeout_secs),
            reader.next_frame(),
        )
        .await
        .map_err(|_| {
            Error::Capture(format!(
                "no frame within {}s of connecting",
                cfg.stale_timeout_secs
            ))
        })?
        .map_err(|e| Error::Capture(format!("stream read failed: {e}")))?;

        self.buffer.store(Bytes::from(first));

        Ok(CaptureSource {
            _child: child,
            reader,
        })
    }

    /// Sleep in one-second steps so `stop()` stays responsive.
    async fn idle_sleep(&self, total: Duration) {
        let deadline = Instant::now() + total;
        while self.is_running() && Instant::now() < deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(remaining.min(Duration::from_secs(1))).await;
        }
    }
}

/// Map a 1-100 JPEG quality to ffmpeg's inverted 2-31 qscale range.
fn jpeg_quality_to_qscale(quality: u8) -> u32 {
    let quality = u32::from(quality.clamp(1, 100));
    (31 - quality * 29 / 100).clamp(2, 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CameraConfig {
        CameraConfig {
            id: "test".to_string(),
            name: String::new(),
            url: "rtsp://127.0.0.1:1/nonexistent".to_string(),
            location: String::new(),
            width: 320,
            height: 180,
            fps: 5,
            jpeg_quality: 85,
            frame_skip: 0,
            reconnect_interval_secs: 1,
            max_reconnect_attempts: 5,
            backoff_secs: 1,
            stale_timeout_secs: 1,
        }
    }

    #[test]
    fn qscale_mapping_is_inverted_and_clamped() {
        assert_eq!(jpeg_quality_to_qscale(100), 2);
        assert_eq!(jpeg_quality_to_qscale(85), 7);
        assert_eq!(jpeg_quality_to_qscale(1), 31);
        assert_eq!(jpeg_quality_to_qscale(0), 31);
    }

    #[tokio::test]
    async fn unreachable_source_never_streams() {
        let manager = StreamCaptureManager::new(test_config());
        manager.start().await;

        assert!(manager.latest_frame().is_none());
        let status = manager.status();
        assert_ne!(status.state, CaptureState::Streaming);
        assert!(status.consecutive_failures > 0);

        manager.stop().await;
        assert_eq!(manager.status().state, CaptureState::Disconnected);
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let manager = StreamCaptureManager::new(test_config());
        manager.start().await;
        // second call must not spawn a second loop or reset anything
        manager.start().await;
        manager.stop().await;
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let manager = StreamCaptureManager::new(test_config());
        manager.stop().await;
        assert_eq!(manager.status().state, CaptureState::Disconnected);
    }
}
