// SPDX-License-Identifier: GPL-3.0-only

//! Video file decoders
//!
//! Playback pulls frames out of a [`FrameDecoder`] on a background thread.
//! [`VideoFileDecoder`] is the GStreamer implementation.

mod file;

pub use file::VideoFileDecoder;

use crate::backends::camera::types::{BackendResult, CameraFrame};

/// Sequential frame decoder
///
/// Decoders are moved onto the decode thread, so they must be `Send`.
/// Dropping a decoder releases the file.
pub trait FrameDecoder: Send {
    /// Decode the next frame; `Ok(None)` at end of stream
    fn next_frame(&mut self) -> BackendResult<Option<CameraFrame>>;
}

impl<D: FrameDecoder + ?Sized> FrameDecoder for Box<D> {
    fn next_frame(&mut self) -> BackendResult<Option<CameraFrame>> {
        (**self).next_frame()
    }
}
