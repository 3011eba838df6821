//! Single most-recent-frame buffer
//!
//! One writer (the capture loop), any number of readers (relay viewers).
//! Overwrite semantics, never a queue: a slow consumer can only ever cost
//! itself frames, and the producer never waits.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Instant;

/// One captured frame, cheap to clone out of the buffer
#[derive(Debug, Clone)]
pub struct Frame {
    /// Encoded JPEG bytes
    pub jpeg: Bytes,
    /// Monotonic capture instant, used for staleness checks
    pub captured_at: Instant,
    /// Wall-clock capture time, for display
    pub captured_wall: DateTime<Utc>,
}

/// Lock-protected holder of the most recent encoded frame
#[derive(Debug, Default)]
pub struct FrameBuffer {
    current: Mutex<Option<Frame>>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the buffer with a newly captured frame.
    pub fn store(&self, jpeg: Bytes) {
        let frame = Frame {
            jpeg,
            captured_at: Instant::now(),
            captured_wall: Utc::now(),
        };
        // Lock held only for the swap; readers never see a partial write
        *self.current.lock().expect("frame buffer poisoned") = Some(frame);
    }

    /// Copy-out of the latest frame, `None` before the first capture.
    pub fn latest(&self) -> Option<Frame> {
        self.current.lock().expect("frame buffer poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_until_first_store() {
        let buffer = FrameBuffer::new();
        assert!(buffer.latest().is_none());

        buffer.store(Bytes::from_static(b"\xff\xd8frame\xff\xd9"));
        let frame = buffer.latest().unwrap();
        assert_eq!(&frame.jpeg[..2], b"\xff\xd8");
    }

    #[test]
    fn overwrite_keeps_only_newest() {
        let buffer = FrameBuffer::new();
        buffer.store(Bytes::from_static(b"old"));
        let first = buffer.latest().unwrap();

        buffer.store(Bytes::from_static(b"new"));
        let second = buffer.latest().unwrap();

        assert_eq!(&second.jpeg[..], b"new");
        // capture instants never move backwards
        assert!(second.captured_at >= first.captured_at);
    }
}
