//! MJPEG frame splitter
//!
//! Reads concatenated JPEG images from a byte stream (ffmpeg's stdout) and
//! yields one complete frame at a time, delimited by the SOI (FFD8) and EOI
//! (FFD9) markers. Marker pairs split across read boundaries are handled by
//! scanning an accumulated buffer rather than individual chunks.

use tokio::io::{AsyncRead, AsyncReadExt};

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];
const CHUNK_SIZE: usize = 8192;

/// Incremental reader over an MJPEG byte stream
pub struct MjpegFrameReader<R> {
    reader: R,
    pending: Vec<u8>,
    chunk: Vec<u8>,
}

impl<R: AsyncRead + Unpin> MjpegFrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::with_capacity(100_000),
            chunk: vec![0u8; CHUNK_SIZE],
        }
    }

    /// Next complete JPEG frame, including both markers.
    ///
    /// Returns `UnexpectedEof` when the stream ends mid-frame (the source
    /// process died).
    pub async fn next_frame(&mut self) -> std::io::Result<Vec<u8>> {
        self.align_to_soi().await?;

        // pending now starts at SOI; scan forward for EOI
        let mut scan_from = SOI.len();
        loop {
            if let Some(at) = find_marker(&self.pending[scan_from.min(self.pending.len())..], EOI) {
                let end = scan_from + at + EOI.len();
                let frame = self.pending[..end].to_vec();
                self.pending.drain(..end);
                return Ok(frame);
            }

            // keep one byte of overlap so a split FF D9 pair is still found
            scan_from = self.pending.len().saturating_sub(1);
            self.fill().await?;
        }
    }

    /// Discard bytes until the buffer starts with an SOI marker.
    async fn align_to_soi(&mut self) -> std::io::Result<()> {
        loop {
            if let Some(at) = find_marker(&self.pending, SOI) {
                self.pending.drain(..at);
                return Ok(());
            }

            // keep a trailing 0xFF that may be half of the marker
            let keep = usize::from(self.pending.last() == Some(&0xFF));
            let len = self.pending.len();
            self.pending.drain(..len - keep);
            self.fill().await?;
        }
    }

    async fn fill(&mut self) -> std::io::Result<()> {
        let n = self.reader.read(&mut self.chunk).await?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "mjpeg stream ended",
            ));
        }
        self.pending.extend_from_slice(&self.chunk[..n]);
        Ok(())
    }
}

fn find_marker(haystack: &[u8], marker: [u8; 2]) -> Option<usize> {
    haystack
        .windows(2)
        .position(|pair| pair == marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn jpeg(body: &[u8]) -> Vec<u8> {
        let mut frame = vec![0xFF, 0xD8];
        frame.extend_from_slice(body);
        frame.extend_from_slice(&[0xFF, 0xD9]);
        frame
    }

    #[tokio::test]
    async fn splits_consecutive_frames() {
        let mut stream = jpeg(b"first");
        stream.extend(jpeg(b"second"));

        let mut reader = MjpegFrameReader::new(Cursor::new(stream));
        assert_eq!(reader.next_frame().await.unwrap(), jpeg(b"first"));
        assert_eq!(reader.next_frame().await.unwrap(), jpeg(b"second"));
    }

    #[tokio::test]
    async fn skips_leading_garbage() {
        let mut stream = b"noise before".to_vec();
        stream.extend(jpeg(b"frame"));

        let mut reader = MjpegFrameReader::new(Cursor::new(stream));
        assert_eq!(reader.next_frame().await.unwrap(), jpeg(b"frame"));
    }

    #[tokio::test]
    async fn eof_mid_frame_is_an_error() {
        let mut stream = jpeg(b"ok");
        stream.extend_from_slice(&[0xFF, 0xD8, 0x01, 0x02]); // truncated

        let mut reader = MjpegFrameReader::new(Cursor::new(stream));
        assert!(reader.next_frame().await.is_ok());
        let err = reader.next_frame().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn marker_split_across_chunk_boundary() {
        // force tiny reads so FF / D9 land in different fills
        struct OneByte(Cursor<Vec<u8>>);
        impl AsyncRead for OneByte {
            fn poll_read(
                mut self: std::pin::Pin<&mut Self>,
                cx: &mut std::task::Context<'_>,
                buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                let mut tiny = tokio::io::ReadBuf::new(&mut buf.initialize_unfilled()[..1]);
                match std::pin::Pin::new(&mut self.0).poll_read(cx, &mut tiny) {
                    std::task::Poll::Ready(Ok(())) => {
                        let n = tiny.filled().len();
                        let data = tiny.filled().to_vec();
                        buf.put_slice(&data[..n]);
                        std::task::Poll::Ready(Ok(()))
                    }
                    other => other,
                }
            }
        }

        let mut reader = MjpegFrameReader::new(OneByte(Cursor::new(jpeg(b"x"))));
        assert_eq!(reader.next_frame().await.unwrap(), jpeg(b"x"));
    }
}
