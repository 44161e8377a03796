//! Pixel buffers produced by the photo output.

use super::{DeviceId, Position};
use crate::orientation::Orientation;
use chrono::{DateTime, Utc};

/// Memory layout of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One byte per pixel.
    Gray8,
    /// Three bytes per pixel, R G B.
    Rgb8,
    /// Four bytes per pixel, R G B A.
    Rgba8,
}

impl PixelFormat {
    /// Bytes occupied by a single pixel.
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// A tightly packed pixel buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl Frame {
    /// Creates a frame from packed pixel data.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            pixels,
            width,
            height,
            format,
        }
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the pixel layout.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == self.pixel_count() * self.format.bytes_per_pixel()
    }

    /// Returns the bytes of the pixel at `(x, y)`.
    ///
    /// Panics if the coordinate is out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let bpp = self.format.bytes_per_pixel();
        let start = (y as usize * self.width as usize + x as usize) * bpp;
        &self.pixels[start..start + bpp]
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}

/// Unprocessed still image as delivered by the hardware.
///
/// `orientation` describes how the stored pixels relate to the upright
/// scene, including any mirroring the hardware applied.
#[derive(Debug, Clone)]
pub struct RawPhoto {
    /// Pixels in sensor order.
    pub frame: Frame,
    /// Orientation tag of the stored pixels.
    pub orientation: Orientation,
}

impl RawPhoto {
    /// Wraps a sensor-order frame with its orientation tag.
    pub fn new(frame: Frame, orientation: Orientation) -> Self {
        Self { frame, orientation }
    }
}

/// A normalized still image ready for downstream consumers.
///
/// Only the capture orchestrator constructs these, after normalizing the
/// raw buffer, so the pixels are always upright and never mirrored.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    frame: Frame,
    orientation: Orientation,
    mirrored: bool,
    position: Position,
    device_id: DeviceId,
    request_id: u64,
    captured_at: DateTime<Utc>,
}

impl CapturedFrame {
    pub(crate) fn normalized(
        frame: Frame,
        position: Position,
        device_id: DeviceId,
        request_id: u64,
    ) -> Self {
        Self {
            frame,
            orientation: Orientation::Up,
            mirrored: false,
            position,
            device_id,
            request_id,
            captured_at: Utc::now(),
        }
    }

    /// Upright pixel data.
    #[inline]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Consumes the capture and returns its pixel data.
    pub fn into_frame(self) -> Frame {
        self.frame
    }

    /// Orientation of the pixel data. Always [`Orientation::Up`].
    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Whether the pixel data is mirrored. Always `false`.
    #[inline]
    pub fn mirrored(&self) -> bool {
        self.mirrored
    }

    /// Position of the device that took the photo.
    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Identity of the device that took the photo.
    #[inline]
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Identifier of the capture request this frame answers.
    #[inline]
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// When the orchestrator finished normalizing the frame.
    #[inline]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let pixels = vec![0u8; 640 * 480 * 3];
        let frame = Frame::new(pixels, 640, 480, PixelFormat::Rgb8);

        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.pixel_count(), 640 * 480);
        assert!(frame.is_valid());
    }

    #[test]
    fn test_frame_invalid_size() {
        let pixels = vec![0u8; 640 * 480]; // Gray-sized buffer tagged as RGBA
        let frame = Frame::new(pixels, 640, 480, PixelFormat::Rgba8);

        assert!(!frame.is_valid());
    }

    #[test]
    fn test_pixel_lookup() {
        let frame = Frame::new((0..12).collect(), 2, 2, PixelFormat::Rgb8);
        assert_eq!(frame.pixel(0, 0), &[0, 1, 2]);
        assert_eq!(frame.pixel(1, 1), &[9, 10, 11]);
    }

    #[test]
    fn test_captured_frame_is_upright_and_unmirrored() {
        let frame = Frame::new(vec![0u8; 4], 2, 2, PixelFormat::Gray8);
        let captured =
            CapturedFrame::normalized(frame, Position::Front, DeviceId::new("cam-1"), 7);

        assert_eq!(captured.orientation(), Orientation::Up);
        assert!(!captured.mirrored());
        assert_eq!(captured.position(), Position::Front);
        assert_eq!(captured.request_id(), 7);
    }
}
