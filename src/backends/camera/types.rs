// SPDX-License-Identifier: GPL-3.0-only
// Shared types for frame sources, recording and playback

//! Shared frame types

use gstreamer::buffer::{MappedBuffer, Readable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::constants::DEFAULT_PLAYBACK_FPS;

/// Frame data storage - either pre-copied bytes or zero-copy GStreamer buffer
///
/// The `Mapped` variant keeps the GStreamer buffer mapped and alive until all
/// references are dropped. Frames that outlive their pipeline (playback
/// buffers, anything sent across threads) should use `Copied`.
#[derive(Clone)]
pub enum FrameData {
    /// Pre-copied bytes (decoded files, resampled frames, tests)
    Copied(Arc<[u8]>),
    /// Zero-copy mapped GStreamer buffer
    Mapped(Arc<MappedBuffer<Readable>>),
}

impl FrameData {
    /// Create FrameData from a mapped GStreamer buffer (zero-copy)
    pub fn from_mapped_buffer(buffer: MappedBuffer<Readable>) -> Self {
        FrameData::Mapped(Arc::new(buffer))
    }

    /// Get the length of the frame data in bytes
    pub fn len(&self) -> usize {
        match self {
            FrameData::Copied(data) => data.len(),
            FrameData::Mapped(buf) => buf.len(),
        }
    }

    /// Check if the frame data is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<u8>> for FrameData {
    fn from(data: Vec<u8>) -> Self {
        FrameData::Copied(Arc::from(data.into_boxed_slice()))
    }
}

impl std::fmt::Debug for FrameData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameData::Copied(data) => write!(f, "FrameData::Copied({} bytes)", data.len()),
            FrameData::Mapped(buf) => write!(f, "FrameData::Mapped({} bytes)", buf.len()),
        }
    }
}

impl AsRef<[u8]> for FrameData {
    fn as_ref(&self) -> &[u8] {
        match self {
            FrameData::Copied(data) => data.as_ref(),
            FrameData::Mapped(buf) => buf.as_slice(),
        }
    }
}

impl std::ops::Deref for FrameData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_ref()
    }
}

/// Framerate as a fraction (numerator/denominator)
/// Stores exact framerate to handle NTSC rates like 59.94fps (60000/1001)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Framerate {
    pub num: u32,
    pub denom: u32,
}

impl Framerate {
    /// Create a new framerate from numerator and denominator
    pub fn new(num: u32, denom: u32) -> Self {
        Self {
            num,
            denom: if denom == 0 { 1 } else { denom },
        }
    }

    /// Create a framerate from an integer (e.g., 30 becomes 30/1)
    pub fn from_int(fps: u32) -> Self {
        Self { num: fps, denom: 1 }
    }

    /// Get the framerate as a floating point value
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.denom.max(1) as f64
    }

    /// A zero framerate cannot drive a timer
    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    /// Time between two frames
    ///
    /// A zero framerate falls back to the default playback rate instead of
    /// dividing by zero.
    pub fn frame_interval(&self) -> Duration {
        let rate = if self.is_zero() {
            Framerate::from_int(DEFAULT_PLAYBACK_FPS)
        } else {
            *self
        };
        Duration::from_nanos(1_000_000_000u64 * rate.denom.max(1) as u64 / rate.num as u64)
    }

    /// Presentation timestamp of the n-th frame in nanoseconds
    pub fn timestamp_ns(&self, frame_index: u64) -> u64 {
        self.frame_interval().as_nanos() as u64 * frame_index
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fps = self.as_f64();
        // Show decimal for non-integer framerates (NTSC)
        if self.denom != 1 {
            write!(f, "{:.2}", fps)
        } else {
            write!(f, "{}", self.num)
        }
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self {
            num: DEFAULT_PLAYBACK_FPS,
            denom: 1,
        }
    }
}

/// Pixel format (channel layout) of a frame
///
/// Live sources and decoded files deliver `BGR24`, the native order the
/// recorder writes. Display surfaces ask for `RGB24` or `RGBA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 24-bit, B G R byte order
    BGR24,
    /// 24-bit, R G B byte order
    RGB24,
    /// 32-bit with alpha, R G B A byte order
    RGBA,
    /// 8-bit grayscale
    Gray8,
}

impl PixelFormat {
    /// Number of bytes per pixel
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Self::BGR24 | Self::RGB24 => 3,
            Self::RGBA => 4,
            Self::Gray8 => 1,
        }
    }

    /// Convert to a GStreamer video/x-raw format string.
    pub fn to_gst_format_string(&self) -> &'static str {
        match self {
            Self::BGR24 => "BGR",
            Self::RGB24 => "RGB",
            Self::RGBA => "RGBA",
            Self::Gray8 => "GRAY8",
        }
    }

    /// Parse format from GStreamer format string
    pub fn from_gst_format(format: &str) -> Option<Self> {
        match format {
            "BGR" => Some(Self::BGR24),
            "RGB" => Some(Self::RGB24),
            "RGBA" | "RGBx" => Some(Self::RGBA),
            "GRAY8" => Some(Self::Gray8),
            _ => None,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_gst_format_string())
    }
}

/// Frame width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A single frame from a camera or a decoded file
///
/// Frames are immutable once handed off; the pixel data is reference counted
/// so clones are cheap.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Pixel data, `stride * height` bytes
    pub data: FrameData,
    /// Channel layout of the data
    pub format: PixelFormat,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// Arrival order within its source, starting at 0
    pub sequence: u64,
    /// Timestamp when the frame was captured or decoded
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a frame from tightly packed pixel data
    pub fn from_packed(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
        sequence: u64,
    ) -> Self {
        Self {
            width,
            height,
            stride: width * format.bytes_per_pixel(),
            data: FrameData::from(data),
            format,
            sequence,
            captured_at: Instant::now(),
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Bytes of actual pixel data in one row (without padding)
    pub fn row_bytes(&self) -> usize {
        (self.width * self.format.bytes_per_pixel()) as usize
    }

    /// Iterate over the rows of the frame, padding stripped
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        let stride = self.stride as usize;
        let row_bytes = self.row_bytes();
        self.data
            .chunks(stride.max(1))
            .take(self.height as usize)
            .map(move |row| &row[..row_bytes.min(row.len())])
    }

    /// Pixel data with row padding removed
    pub fn packed_data(&self) -> Vec<u8> {
        if self.stride as usize == self.row_bytes() {
            return self.data.to_vec();
        }
        let mut packed = Vec::with_capacity(self.row_bytes() * self.height as usize);
        for row in self.rows() {
            packed.extend_from_slice(row);
        }
        packed
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for frame sources and decoders
#[derive(Debug, Clone)]
pub enum BackendError {
    /// GStreamer or a required element is not available
    NotAvailable(String),
    /// The source could not be opened
    SourceUnavailable(String),
    /// A frame could not be read from an open source
    ReadFailed(String),
    /// Format not supported
    FormatNotSupported(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::SourceUnavailable(msg) => write!(f, "Cannot open source: {}", msg),
            BackendError::ReadFailed(msg) => write!(f, "Failed to read frame: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_framerate_interval_falls_back() {
        let zero = Framerate::from_int(0);
        assert!(zero.is_zero());
        assert_eq!(
            zero.frame_interval(),
            Framerate::from_int(DEFAULT_PLAYBACK_FPS).frame_interval()
        );
    }

    #[test]
    fn test_frame_interval_for_common_rates() {
        assert_eq!(
            Framerate::from_int(20).frame_interval(),
            Duration::from_millis(50)
        );
        assert_eq!(
            Framerate::from_int(25).frame_interval(),
            Duration::from_millis(40)
        );
        assert_eq!(Framerate::new(30, 0).denom, 1);
    }

    #[test]
    fn test_packed_data_strips_padding() {
        // 2x2 BGR with 8-byte stride (2 bytes of padding per row)
        let data = vec![1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0];
        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: FrameData::from(data),
            format: PixelFormat::BGR24,
            stride: 8,
            sequence: 0,
            captured_at: Instant::now(),
        };
        assert_eq!(
            frame.packed_data(),
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]
        );
        assert_eq!(frame.rows().count(), 2);
    }

    #[test]
    fn test_gst_format_roundtrip_names() {
        for format in [
            PixelFormat::BGR24,
            PixelFormat::RGB24,
            PixelFormat::RGBA,
            PixelFormat::Gray8,
        ] {
            assert_eq!(
                PixelFormat::from_gst_format(format.to_gst_format_string()),
                Some(format)
            );
        }
    }
}
