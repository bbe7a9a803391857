// SPDX-License-Identifier: GPL-3.0-only

//! Live frame sources
//!
//! ```text
//! ┌─────────────────────┐
//! │  CaptureController  │  ← one read per tick
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  FrameSource trait  │  ← Frame / NotReady / Closed
//! └──────────┬──────────┘
//!            │
//!            ▼
//!    ┌───────────────┐
//!    │ GstFrameSource│  ← uridecodebin / v4l2src → appsink (BGR)
//!    └───────────────┘
//! ```

pub mod frame_loop;
pub mod gst_source;
pub mod types;

pub use gst_source::GstFrameSource;
pub use types::*;

use std::str::FromStr;
use std::time::Duration;

/// Where live frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraSource {
    /// Local capture device, `/dev/video{n}`
    Device(u32),
    /// Network stream or any URI GStreamer can decode
    Url(String),
}

impl Default for CameraSource {
    fn default() -> Self {
        CameraSource::Device(0)
    }
}

impl FromStr for CameraSource {
    type Err = BackendError;

    /// All-digit strings are device indices, anything else is a URL
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(BackendError::SourceUnavailable("empty source".into()));
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            s.parse::<u32>()
                .map(CameraSource::Device)
                .map_err(|e| BackendError::SourceUnavailable(e.to_string()))
        } else {
            Ok(CameraSource::Url(s.to_string()))
        }
    }
}

impl std::fmt::Display for CameraSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraSource::Device(index) => write!(f, "/dev/video{}", index),
            CameraSource::Url(url) => f.write_str(url),
        }
    }
}

/// Outcome of a single read from a live source
#[derive(Debug)]
pub enum SourceRead {
    /// A frame in the source's native channel order
    Frame(CameraFrame),
    /// Nothing arrived within the timeout; the source may still deliver
    NotReady,
    /// The source has ended or failed and will not deliver again
    Closed(Option<BackendError>),
}

/// A live camera or stream handle
///
/// Dropping a source releases the underlying device or connection.
pub trait FrameSource {
    /// Wait up to `timeout` for the next frame
    fn read_frame(&mut self, timeout: Duration) -> SourceRead;

    /// Human-readable description for logs and status lines
    fn describe(&self) -> String;

    /// Size of the frames, once known
    fn dimensions(&self) -> Option<Dimensions>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read_frame(&mut self, timeout: Duration) -> SourceRead {
        (**self).read_frame(timeout)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn dimensions(&self) -> Option<Dimensions> {
        (**self).dimensions()
    }
}
