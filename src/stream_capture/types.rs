//! Capture state types

use serde::Serialize;

/// Connection state of one capture loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    /// No source connection; reconnection pending
    Disconnected,
    /// A connection attempt is in flight
    Connecting,
    /// Frames are flowing into the buffer
    Streaming,
    /// Extended cooldown after repeated connection failures
    Backoff,
}

/// Snapshot of a capture loop's health, for status endpoints and the relay's
/// placeholder choice
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CaptureStatus {
    pub state: CaptureState,
    /// Consecutive failed connection attempts since the last success
    pub consecutive_failures: u32,
    /// Failure count has reached the configured reconnect limit
    pub exhausted: bool,
}

impl CaptureStatus {
    /// True when the relay should show "connection failed" rather than
    /// "connecting".
    pub fn looks_failed(&self) -> bool {
        self.exhausted || self.state == CaptureState::Backoff
    }
}
