// SPDX-License-Identifier: GPL-3.0-only

//! Display sinks
//!
//! Controllers never know what they draw on. They hand frames to a
//! [`FrameSink`] after converting them to the channel order the sink asks
//! for.

use crate::backends::camera::types::{BackendResult, CameraFrame, PixelFormat};
use crate::media::formats::convert_frame;

/// Something that can show frames
pub trait FrameSink {
    /// Channel order the sink expects
    fn pixel_format(&self) -> PixelFormat;

    /// Show one frame, already in [`FrameSink::pixel_format`] order
    fn display(&mut self, frame: &CameraFrame);
}

impl<T: FrameSink + ?Sized> FrameSink for &mut T {
    fn pixel_format(&self) -> PixelFormat {
        (**self).pixel_format()
    }

    fn display(&mut self, frame: &CameraFrame) {
        (**self).display(frame)
    }
}

/// Sink that drops everything
///
/// Used for live ticks while playback owns the display, and by headless
/// recording.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl FrameSink for DiscardSink {
    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::BGR24
    }

    fn display(&mut self, _frame: &CameraFrame) {}
}

/// Convert `frame` to the sink's order and display it once
pub fn present(sink: &mut dyn FrameSink, frame: &CameraFrame) -> BackendResult<()> {
    let converted = convert_frame(frame, sink.pixel_format())?;
    sink.display(&converted);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CollectingSink {
        shown: Vec<CameraFrame>,
    }

    impl FrameSink for CollectingSink {
        fn pixel_format(&self) -> PixelFormat {
            PixelFormat::RGB24
        }

        fn display(&mut self, frame: &CameraFrame) {
            self.shown.push(frame.clone());
        }
    }

    #[test]
    fn test_present_converts_to_sink_order() {
        let mut sink = CollectingSink::default();
        let frame = CameraFrame::from_packed(1, 1, PixelFormat::BGR24, vec![1, 2, 3], 0);

        present(&mut sink, &frame).unwrap();

        assert_eq!(sink.shown.len(), 1);
        assert_eq!(sink.shown[0].format, PixelFormat::RGB24);
        assert_eq!(&sink.shown[0].data[..], &[3, 2, 1]);
    }
}
