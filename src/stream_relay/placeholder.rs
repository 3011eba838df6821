//! Placeholder frame rendering
//!
//! When a camera has no frame to serve, viewers get a synthetic JPEG with a
//! short caption instead of a stalled connection. Frames are rendered once
//! per camera at startup with a small built-in bitmap font and cached, so
//! serving a placeholder is just a `Bytes` clone.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};

use crate::error::{Error, Result};

/// Which placeholder a viewer should see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// The camera id is not configured
    NotFound,
    /// The capture loop has no frame yet but is still trying
    Connecting,
    /// The capture loop has exhausted its reconnect budget
    ConnectionFailed,
}

impl PlaceholderKind {
    pub fn caption(self) -> &'static str {
        match self {
            PlaceholderKind::NotFound => "Stream Not Found",
            PlaceholderKind::Connecting => "Connecting...",
            PlaceholderKind::ConnectionFailed => "Connection Failed",
        }
    }
}

/// Pre-rendered placeholder JPEGs for one frame geometry
#[derive(Debug, Clone)]
pub struct PlaceholderSet {
    not_found: Bytes,
    connecting: Bytes,
    connection_failed: Bytes,
}

impl PlaceholderSet {
    pub fn render(width: u32, height: u32, jpeg_quality: u8) -> Result<Self> {
        Ok(Self {
            not_found: render_placeholder(
                PlaceholderKind::NotFound.caption(),
                width,
                height,
                jpeg_quality,
            )?,
            connecting: render_placeholder(
                PlaceholderKind::Connecting.caption(),
                width,
                height,
                jpeg_quality,
            )?,
            connection_failed: render_placeholder(
                PlaceholderKind::ConnectionFailed.caption(),
                width,
                height,
                jpeg_quality,
            )?,
        })
    }

    pub fn get(&self, kind: PlaceholderKind) -> Bytes {
        match kind {
            PlaceholderKind::NotFound => self.not_found.clone(),
            PlaceholderKind::Connecting => self.connecting.clone(),
            PlaceholderKind::ConnectionFailed => self.connection_failed.clone(),
        }
    }
}

const BACKGROUND: Rgb<u8> = Rgb([28, 28, 32]);
const FOREGROUND: Rgb<u8> = Rgb([210, 210, 210]);

const GLYPH_WIDTH: u32 = 8;
const GLYPH_HEIGHT: u32 = 12;

/// Render a dark frame with the caption centered, returned as encoded JPEG.
pub fn render_placeholder(text: &str, width: u32, height: u32, jpeg_quality: u8) -> Result<Bytes> {
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);

    // scale the 8x12 font up on larger frames, down to 1x on tiny ones
    let scale = (width / (text.chars().count().max(1) as u32 * GLYPH_WIDTH * 2)).clamp(1, 3);
    let text_w = text.chars().count() as u32 * GLYPH_WIDTH * scale;
    let text_h = GLYPH_HEIGHT * scale;
    let origin_x = width.saturating_sub(text_w) / 2;
    let origin_y = height.saturating_sub(text_h) / 2;

    draw_text(&mut img, text, origin_x, origin_y, scale);

    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, jpeg_quality)
        .encode_image(&img)
        .map_err(|e| Error::Internal(format!("placeholder encode failed: {e}")))?;

    Ok(Bytes::from(encoded))
}

fn draw_text(img: &mut RgbImage, text: &str, start_x: u32, start_y: u32, scale: u32) {
    let mut x = start_x;
    for ch in text.chars() {
        if let Some(pattern) = glyph(ch) {
            for (row, bits) in pattern.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (bits >> (7 - col)) & 1 == 0 {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let px = x + col * scale + dx;
                            let py = start_y + row as u32 * scale + dy;
                            if px < img.width() && py < img.height() {
                                img.put_pixel(px, py, FOREGROUND);
                            }
                        }
                    }
                }
            }
        }
        x += GLYPH_WIDTH * scale;
        if x >= img.width() {
            break;
        }
    }
}

/// 8x12 bitmap glyphs, one byte per row, MSB leftmost. Covers only the
/// characters the captions use.
fn glyph(ch: char) -> Option<[u8; 12]> {
    let pattern = match ch {
        'C' => [0x00, 0x3C, 0x42, 0x40, 0x40, 0x40, 0x40, 0x40, 0x42, 0x3C, 0x00, 0x00],
        'F' => [0x00, 0x7E, 0x40, 0x40, 0x40, 0x7C, 0x40, 0x40, 0x40, 0x40, 0x00, 0x00],
        'N' => [0x00, 0x42, 0x62, 0x52, 0x4A, 0x46, 0x42, 0x42, 0x42, 0x42, 0x00, 0x00],
        'S' => [0x00, 0x3C, 0x42, 0x40, 0x30, 0x0C, 0x02, 0x42, 0x42, 0x3C, 0x00, 0x00],
        'a' => [0x00, 0x00, 0x00, 0x3C, 0x02, 0x3E, 0x42, 0x42, 0x46, 0x3A, 0x00, 0x00],
        'c' => [0x00, 0x00, 0x00, 0x3C, 0x42, 0x40, 0x40, 0x40, 0x42, 0x3C, 0x00, 0x00],
        'd' => [0x00, 0x02, 0x02, 0x3A, 0x46, 0x42, 0x42, 0x42, 0x46, 0x3A, 0x00, 0x00],
        'e' => [0x00, 0x00, 0x00, 0x3C, 0x42, 0x7E, 0x40, 0x40, 0x42, 0x3C, 0x00, 0x00],
        'g' => [0x00, 0x00, 0x00, 0x3A, 0x46, 0x42, 0x46, 0x3A, 0x02, 0x3C, 0x00, 0x00],
        'i' => [0x00, 0x08, 0x00, 0x18, 0x08, 0x08, 0x08, 0x08, 0x08, 0x3E, 0x00, 0x00],
        'l' => [0x00, 0x18, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x3E, 0x00, 0x00],
        'm' => [0x00, 0x00, 0x00, 0x76, 0x49, 0x49, 0x49, 0x49, 0x49, 0x49, 0x00, 0x00],
        'n' => [0x00, 0x00, 0x00, 0x5C, 0x62, 0x42, 0x42, 0x42, 0x42, 0x42, 0x00, 0x00],
        'o' => [0x00, 0x00, 0x00, 0x3C, 0x42, 0x42, 0x42, 0x42, 0x42, 0x3C, 0x00, 0x00],
        'r' => [0x00, 0x00, 0x00, 0x5C, 0x62, 0x40, 0x40, 0x40, 0x40, 0x40, 0x00, 0x00],
        't' => [0x00, 0x10, 0x10, 0x7C, 0x10, 0x10, 0x10, 0x10, 0x10, 0x0C, 0x00, 0x00],
        'u' => [0x00, 0x00, 0x00, 0x42, 0x42, 0x42, 0x42, 0x42, 0x46, 0x3A, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x18, 0x18, 0x00, 0x00],
        _ => return None,
    };
    Some(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_valid_jpeg() {
        let jpeg = render_placeholder("Connecting...", 800, 450, 85).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn captions_are_renderable() {
        // every caption character must have a glyph
        for kind in [
            PlaceholderKind::NotFound,
            PlaceholderKind::Connecting,
            PlaceholderKind::ConnectionFailed,
        ] {
            for ch in kind.caption().chars() {
                assert!(
                    ch == ' ' || glyph(ch).is_some(),
                    "missing glyph for {ch:?}"
                );
            }
        }
    }

    #[test]
    fn set_contains_distinct_frames() {
        let set = PlaceholderSet::render(320, 180, 80).unwrap();
        let a = set.get(PlaceholderKind::NotFound);
        let b = set.get(PlaceholderKind::Connecting);
        assert_ne!(a, b);
    }

    #[test]
    fn tiny_frames_still_render() {
        let jpeg = render_placeholder("Stream Not Found", 64, 48, 70).unwrap();
        assert!(!jpeg.is_empty());
    }
}
