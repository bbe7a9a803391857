// SPDX-License-Identifier: GPL-3.0-only

//! Video recording
//!
//! [`RecordingSession`] owns the start/stop/pause state and is generic over
//! the [`WriterFactory`] that opens output files. [`GstWriterFactory`] is the
//! GStreamer-backed factory used by the application.

pub mod recorder;
pub mod session;

pub use recorder::{GstVideoWriter, GstWriterFactory};
pub use session::{FrameWriter, RecordOutcome, RecordingSession, RecordingSummary, WriterFactory};

/// Recording session writing real video files
pub type VideoRecordingSession = RecordingSession<GstWriterFactory>;
