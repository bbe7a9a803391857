// SPDX-License-Identifier: GPL-3.0-only

//! Recording session state
//!
//! A session is either idle or owns exactly one open writer. The writer is
//! opened on start, finalized exactly once on stop (or on drop), and never
//! replaced while a recording is active.

use crate::backends::camera::types::{CameraFrame, Dimensions, Framerate};
use crate::config::DimensionPolicy;
use crate::errors::{RecordingError, RecordingResult};
use crate::media::formats::resize_frame;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Destination for recorded frames
pub trait FrameWriter {
    /// Size every written frame must have
    fn dimensions(&self) -> Dimensions;

    /// File the writer is producing, after any extension fix-up
    fn path(&self) -> &Path;

    /// Append one frame in the source's native channel order
    fn write_frame(&mut self, frame: &CameraFrame) -> RecordingResult<()>;

    /// Flush, close and release the output, returning the final file path
    fn finish(self) -> RecordingResult<PathBuf>
    where
        Self: Sized;
}

/// Opens writers for new recordings
pub trait WriterFactory {
    type Writer: FrameWriter;

    fn open(
        &self,
        path: &Path,
        framerate: Framerate,
        dimensions: Dimensions,
    ) -> RecordingResult<Self::Writer>;
}

/// What happened to a frame handed to [`RecordingSession::record`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Frame written to the output
    Written,
    /// Recording is paused, frame not persisted
    Paused,
    /// No recording active
    Idle,
}

/// Statistics of a finished recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSummary {
    pub path: PathBuf,
    pub frames_written: u64,
    pub frames_resampled: u64,
    /// Frames that could not be written (rejected or encoder errors)
    pub frames_failed: u64,
    pub elapsed: Duration,
}

struct ActiveRecording<W> {
    writer: W,
    paused: bool,
    started_at: Instant,
    frames_written: u64,
    frames_resampled: u64,
    frames_failed: u64,
}

/// Start/stop/pause state around one optional writer
pub struct RecordingSession<F: WriterFactory> {
    factory: F,
    policy: DimensionPolicy,
    active: Option<ActiveRecording<F::Writer>>,
}

impl<F: WriterFactory> RecordingSession<F> {
    pub fn new(factory: F, policy: DimensionPolicy) -> Self {
        Self {
            factory,
            policy,
            active: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.paused)
    }

    /// Frames written so far in the active recording
    pub fn frames_written(&self) -> u64 {
        self.active.as_ref().map_or(0, |a| a.frames_written)
    }

    /// Output file of the active recording
    pub fn output_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.writer.path())
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.active.as_ref().map(|a| a.started_at.elapsed())
    }

    /// Open a writer and start recording
    ///
    /// Rejected with [`RecordingError::AlreadyRecording`] while a recording is
    /// active; the running recording is left untouched.
    pub fn start(
        &mut self,
        output_path: &Path,
        framerate: Framerate,
        dimensions: Dimensions,
    ) -> RecordingResult<()> {
        if self.active.is_some() {
            warn!("Start requested while already recording");
            return Err(RecordingError::AlreadyRecording);
        }
        if framerate.is_zero() {
            return Err(RecordingError::StartFailed(
                "frame rate must be greater than zero".into(),
            ));
        }
        if dimensions.is_empty() {
            return Err(RecordingError::StartFailed(format!(
                "invalid frame size {}",
                dimensions
            )));
        }

        let writer = self.factory.open(output_path, framerate, dimensions)?;

        info!(
            path = %writer.path().display(),
            %framerate,
            %dimensions,
            "Recording started"
        );

        self.active = Some(ActiveRecording {
            writer,
            paused: false,
            started_at: Instant::now(),
            frames_written: 0,
            frames_resampled: 0,
            frames_failed: 0,
        });
        Ok(())
    }

    /// Finalize and release the writer
    ///
    /// Idempotent: returns `Ok(None)` when nothing is recording.
    pub fn stop(&mut self) -> RecordingResult<Option<RecordingSummary>> {
        let Some(active) = self.active.take() else {
            debug!("Stop requested with no active recording");
            return Ok(None);
        };

        let elapsed = active.started_at.elapsed();
        let path = active.writer.finish()?;

        info!(
            path = %path.display(),
            frames = active.frames_written,
            resampled = active.frames_resampled,
            failed = active.frames_failed,
            ?elapsed,
            "Recording stopped"
        );

        Ok(Some(RecordingSummary {
            path,
            frames_written: active.frames_written,
            frames_resampled: active.frames_resampled,
            frames_failed: active.frames_failed,
            elapsed,
        }))
    }

    /// Stop persisting frames; no effect unless recording
    pub fn pause(&mut self) {
        if let Some(active) = self.active.as_mut() {
            if !active.paused {
                info!("Recording paused");
            }
            active.paused = true;
        }
    }

    /// Resume persisting frames; no effect unless recording
    pub fn resume(&mut self) {
        if let Some(active) = self.active.as_mut() {
            if active.paused {
                info!("Recording resumed");
            }
            active.paused = false;
        }
    }

    /// Flip between paused and recording; no effect unless recording
    pub fn toggle_pause(&mut self) {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Persist a frame if recording and not paused
    ///
    /// Frames whose size differs from the writer's are resampled or rejected
    /// according to the session's [`DimensionPolicy`]. Only the first failure
    /// of a recording is logged as a warning.
    pub fn record(&mut self, frame: &CameraFrame) -> RecordingResult<RecordOutcome> {
        let policy = self.policy;
        let Some(active) = self.active.as_mut() else {
            return Ok(RecordOutcome::Idle);
        };
        if active.paused {
            return Ok(RecordOutcome::Paused);
        }

        match write_frame(active, frame, policy) {
            Ok(()) => {
                active.frames_written += 1;
                Ok(RecordOutcome::Written)
            }
            Err(e) => {
                active.frames_failed += 1;
                if active.frames_failed == 1 {
                    warn!(error = %e, "Failed to record frame");
                } else {
                    debug!(error = %e, failed = active.frames_failed, "Failed to record frame");
                }
                Err(e)
            }
        }
    }
}

fn write_frame<W: FrameWriter>(
    active: &mut ActiveRecording<W>,
    frame: &CameraFrame,
    policy: DimensionPolicy,
) -> RecordingResult<()> {
    let expected = active.writer.dimensions();
    let actual = frame.dimensions();

    if expected == actual {
        return active.writer.write_frame(frame);
    }

    match policy {
        DimensionPolicy::Reject => Err(RecordingError::DimensionMismatch { expected, actual }),
        DimensionPolicy::Resample => {
            if active.frames_resampled == 0 {
                warn!(%expected, %actual, "Live frames differ from recording size, resampling");
            }
            let resized = resize_frame(frame, expected)
                .map_err(|e| RecordingError::WriteFailed(e.to_string()))?;
            active.writer.write_frame(&resized)?;
            active.frames_resampled += 1;
            Ok(())
        }
    }
}

impl<F: WriterFactory> Drop for RecordingSession<F> {
    fn drop(&mut self) {
        if self.active.is_some() {
            debug!("Recording session dropped while recording, finalizing");
            if let Err(e) = self.stop() {
                error!(error = %e, "Failed to finalize recording on drop");
            }
        }
    }
}
