// SPDX-License-Identifier: GPL-3.0-only

//! Live capture tick
//!
//! One tick is one read from the live source. A frame goes to the recording
//! session first, in the source's native channel order, and then to the
//! display sink.

use super::sink::{FrameSink, present};
use crate::backends::camera::types::{BackendError, Dimensions, Framerate};
use crate::backends::camera::{FrameSource, SourceRead};
use crate::constants::timing;
use crate::errors::{RecordingError, RecordingResult};
use crate::pipelines::video::{RecordingSession, RecordingSummary, WriterFactory};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How a tick reacts to a read that produced no frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFailurePolicy {
    /// Any missing frame ends the stream
    Terminal,
    /// Skip ticks with no frame ready, end only when the source closes
    SkipTransient,
}

/// Result of one capture tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was read and displayed
    Frame,
    /// No frame this tick, source still open
    Skipped,
    /// The source is gone; later ticks do nothing
    EndOfStream,
}

pub struct CaptureController<S: FrameSource, F: WriterFactory> {
    source: Option<S>,
    session: RecordingSession<F>,
    policy: ReadFailurePolicy,
    read_timeout: Duration,
    frames_captured: u64,
    /// Last recording or source problem, for the status line
    last_error: Option<String>,
    /// Recording finalized because the source ended
    finished: Option<RecordingSummary>,
}

impl<S: FrameSource, F: WriterFactory> CaptureController<S, F> {
    /// Build a controller
    ///
    /// `source` is `None` when the camera could not be opened; the
    /// controller then reports end of stream and refuses to record.
    pub fn new(
        source: Option<S>,
        session: RecordingSession<F>,
        policy: ReadFailurePolicy,
        read_timeout: Duration,
    ) -> Self {
        if let Some(source) = source.as_ref() {
            info!(source = %source.describe(), ?policy, "Capture controller ready");
        } else {
            warn!("Capture controller has no source");
        }

        Self {
            source,
            session,
            policy,
            read_timeout,
            frames_captured: 0,
            last_error: None,
            finished: None,
        }
    }

    pub fn source_description(&self) -> Option<String> {
        self.source.as_ref().map(|s| s.describe())
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }

    pub fn recording(&self) -> &RecordingSession<F> {
        &self.session
    }

    /// Take the last reported problem, if any
    pub fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    /// Take the recording that was finalized when the source ended, if any
    pub fn take_finished(&mut self) -> Option<RecordingSummary> {
        self.finished.take()
    }

    /// Start recording the live feed
    pub fn start_recording(
        &mut self,
        output_path: &Path,
        framerate: Framerate,
        dimensions: Dimensions,
    ) -> RecordingResult<()> {
        if self.source.is_none() {
            return Err(RecordingError::NoSource);
        }
        self.session.start(output_path, framerate, dimensions)
    }

    pub fn stop_recording(&mut self) -> RecordingResult<Option<RecordingSummary>> {
        self.session.stop()
    }

    pub fn toggle_pause(&mut self) {
        self.session.toggle_pause();
    }

    /// Read once from the source and route the frame
    pub fn tick(&mut self, sink: &mut dyn FrameSink) -> TickOutcome {
        let Some(source) = self.source.as_mut() else {
            return TickOutcome::EndOfStream;
        };

        match source.read_frame(self.read_timeout) {
            SourceRead::Frame(frame) => {
                self.frames_captured += 1;
                if self.frames_captured % timing::FRAME_LOG_INTERVAL == 0 {
                    debug!(
                        frames = self.frames_captured,
                        sequence = frame.sequence,
                        "Live frames captured"
                    );
                }

                // The session warns on the first failure of a recording
                if let Err(e) = self.session.record(&frame) {
                    self.last_error = Some(e.to_string());
                }

                if let Err(e) = present(sink, &frame) {
                    warn!(error = %e, "Failed to display frame");
                }
                TickOutcome::Frame
            }
            SourceRead::NotReady => match self.policy {
                ReadFailurePolicy::SkipTransient => TickOutcome::Skipped,
                ReadFailurePolicy::Terminal => {
                    self.close_source(Some(BackendError::ReadFailed("no frame available".into())));
                    TickOutcome::EndOfStream
                }
            },
            SourceRead::Closed(reason) => {
                self.close_source(reason);
                TickOutcome::EndOfStream
            }
        }
    }

    /// Release the source and finalize any recording of it
    fn close_source(&mut self, reason: Option<BackendError>) {
        match reason {
            Some(e) => {
                warn!(error = %e, frames = self.frames_captured, "Live source ended");
                self.last_error = Some(e.to_string());
            }
            None => info!(frames = self.frames_captured, "Live source reached end of stream"),
        }

        self.source = None;

        match self.session.stop() {
            Ok(Some(summary)) => {
                info!(path = %summary.path.display(), "Recording finalized after source closed");
                self.finished = Some(summary);
            }
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "Failed to finalize recording after source closed");
                self.last_error = Some(e.to_string());
            }
        }
    }
}
