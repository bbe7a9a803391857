// SPDX-License-Identifier: GPL-3.0-only

//! Append-only frame log with a read cursor
//!
//! The playback buffer. Frames are appended in decode order and read back
//! one per tick. Only the owner (the main loop) touches it; frames cross
//! threads through a channel before they get here.

use crate::backends::camera::types::CameraFrame;

#[derive(Debug, Default)]
pub struct FrameBuffer {
    frames: Vec<CameraFrame>,
    /// Index of the next frame to read, always in `0..=frames.len()`
    cursor: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame at the end
    pub fn push(&mut self, frame: CameraFrame) {
        self.frames.push(frame);
    }

    /// Return the frame under the cursor and advance, or `None` when caught up
    pub fn next_frame(&mut self) -> Option<&CameraFrame> {
        let frame = self.frames.get(self.cursor)?;
        self.cursor += 1;
        Some(frame)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// True once every appended frame has been read
    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.frames.len()
    }

    /// Drop all frames and rewind
    pub fn clear(&mut self) {
        self.frames.clear();
        self.cursor = 0;
    }
}
