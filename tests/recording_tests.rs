// SPDX-License-Identifier: GPL-3.0-only

//! Recording scenarios driven through the capture controller

use camera_studio::app::{CaptureController, FrameSink, ReadFailurePolicy, TickOutcome};
use camera_studio::backends::camera::types::{
    BackendError, CameraFrame, Dimensions, Framerate, PixelFormat,
};
use camera_studio::backends::camera::{FrameSource, SourceRead};
use camera_studio::config::DimensionPolicy;
use camera_studio::errors::{RecordingError, RecordingResult};
use camera_studio::pipelines::video::{FrameWriter, RecordingSession, WriterFactory};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Yields `frames` frames of `size`, then fails
struct FailingCamera {
    size: Dimensions,
    frames: u64,
    next: u64,
}

impl FrameSource for FailingCamera {
    fn read_frame(&mut self, _timeout: Duration) -> SourceRead {
        if self.next == self.frames {
            return SourceRead::Closed(Some(BackendError::ReadFailed("camera unplugged".into())));
        }
        let len = (self.size.width * self.size.height * 3) as usize;
        let frame = CameraFrame::from_packed(
            self.size.width,
            self.size.height,
            PixelFormat::BGR24,
            vec![self.next as u8; len],
            self.next,
        );
        self.next += 1;
        SourceRead::Frame(frame)
    }

    fn describe(&self) -> String {
        "failing camera".into()
    }

    fn dimensions(&self) -> Option<Dimensions> {
        Some(self.size)
    }
}

#[derive(Debug, Default)]
struct WriterLog {
    opened: usize,
    finalized: usize,
    frames: Vec<(u64, Dimensions)>,
}

struct LoggingWriter {
    size: Dimensions,
    path: PathBuf,
    log: Arc<Mutex<WriterLog>>,
}

impl FrameWriter for LoggingWriter {
    fn dimensions(&self) -> Dimensions {
        self.size
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn write_frame(&mut self, frame: &CameraFrame) -> RecordingResult<()> {
        self.log
            .lock()
            .unwrap()
            .frames
            .push((frame.sequence, frame.dimensions()));
        Ok(())
    }

    fn finish(self) -> RecordingResult<PathBuf> {
        self.log.lock().unwrap().finalized += 1;
        Ok(self.path)
    }
}

#[derive(Clone, Default)]
struct LoggingFactory {
    log: Arc<Mutex<WriterLog>>,
}

impl WriterFactory for LoggingFactory {
    type Writer = LoggingWriter;

    fn open(
        &self,
        path: &Path,
        _framerate: Framerate,
        dimensions: Dimensions,
    ) -> RecordingResult<LoggingWriter> {
        self.log.lock().unwrap().opened += 1;
        Ok(LoggingWriter {
            size: dimensions,
            path: path.to_path_buf(),
            log: Arc::clone(&self.log),
        })
    }
}

#[derive(Default)]
struct CountingSink {
    shown: usize,
}

impl FrameSink for CountingSink {
    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::RGBA
    }

    fn display(&mut self, frame: &CameraFrame) {
        assert_eq!(frame.format, PixelFormat::RGBA);
        self.shown += 1;
    }
}

fn capture(
    camera: FailingCamera,
    policy: DimensionPolicy,
) -> (CaptureController<FailingCamera, LoggingFactory>, Arc<Mutex<WriterLog>>) {
    let factory = LoggingFactory::default();
    let log = Arc::clone(&factory.log);
    let session = RecordingSession::new(factory, policy);
    (
        CaptureController::new(
            Some(camera),
            session,
            ReadFailurePolicy::Terminal,
            Duration::from_millis(10),
        ),
        log,
    )
}

fn camera(width: u32, height: u32, frames: u64) -> FailingCamera {
    FailingCamera {
        size: Dimensions::new(width, height),
        frames,
        next: 0,
    }
}

#[test]
fn test_ten_frames_then_failure_stops_cleanly() {
    let (mut capture, log) = capture(camera(4, 4, 10), DimensionPolicy::Reject);
    let mut sink = CountingSink::default();

    capture
        .start_recording(Path::new("take.avi"), Framerate::from_int(20), Dimensions::new(4, 4))
        .unwrap();

    let mut outcomes = Vec::new();
    loop {
        let outcome = capture.tick(&mut sink);
        outcomes.push(outcome);
        if outcome == TickOutcome::EndOfStream {
            break;
        }
    }

    assert_eq!(outcomes.len(), 11);
    assert_eq!(sink.shown, 10);

    let log = log.lock().unwrap();
    let sequences: Vec<u64> = log.frames.iter().map(|f| f.0).collect();
    assert_eq!(sequences, (0..10).collect::<Vec<_>>());
    // The failed source finalized the recording
    assert_eq!(log.finalized, 1);
    drop(log);

    assert!(!capture.recording().is_recording());
    assert_eq!(capture.tick(&mut sink), TickOutcome::EndOfStream);
    assert_eq!(sink.shown, 10);
}

#[test]
fn test_pause_resume_gap() {
    let (mut capture, log) = capture(camera(4, 4, 6), DimensionPolicy::Reject);
    let mut sink = CountingSink::default();

    capture
        .start_recording(Path::new("take.avi"), Framerate::from_int(20), Dimensions::new(4, 4))
        .unwrap();

    capture.tick(&mut sink);
    capture.tick(&mut sink);
    capture.toggle_pause();
    capture.tick(&mut sink);
    capture.tick(&mut sink);
    capture.toggle_pause();
    capture.tick(&mut sink);

    assert!(capture.recording().is_recording());
    assert!(!capture.recording().is_paused());
    assert_eq!(sink.shown, 5);

    let sequences: Vec<u64> = log.lock().unwrap().frames.iter().map(|f| f.0).collect();
    assert_eq!(sequences, vec![0, 1, 4]);
}

#[test]
fn test_double_start_and_double_stop() {
    let (mut capture, log) = capture(camera(4, 4, 3), DimensionPolicy::Reject);

    capture
        .start_recording(Path::new("a.avi"), Framerate::from_int(20), Dimensions::new(4, 4))
        .unwrap();
    let second =
        capture.start_recording(Path::new("b.avi"), Framerate::from_int(20), Dimensions::new(4, 4));
    assert!(matches!(second, Err(RecordingError::AlreadyRecording)));

    let summary = capture.stop_recording().unwrap().unwrap();
    assert_eq!(summary.path, PathBuf::from("a.avi"));
    assert!(capture.stop_recording().unwrap().is_none());

    let log = log.lock().unwrap();
    assert_eq!(log.opened, 1);
    assert_eq!(log.finalized, 1);
}

#[test]
fn test_mismatched_camera_resampled_to_recording_size() {
    let (mut capture, log) = capture(camera(8, 6, 2), DimensionPolicy::Resample);
    let mut sink = CountingSink::default();

    capture
        .start_recording(Path::new("take.avi"), Framerate::from_int(20), Dimensions::new(4, 3))
        .unwrap();
    capture.tick(&mut sink);
    capture.tick(&mut sink);

    let summary = capture.stop_recording().unwrap().unwrap();
    assert_eq!(summary.frames_written, 2);
    assert_eq!(summary.frames_resampled, 2);
    assert!(
        log.lock()
            .unwrap()
            .frames
            .iter()
            .all(|f| f.1 == Dimensions::new(4, 3))
    );
}

#[test]
fn test_mismatched_camera_rejected() {
    let (mut capture, log) = capture(camera(8, 6, 2), DimensionPolicy::Reject);
    let mut sink = CountingSink::default();

    capture
        .start_recording(Path::new("take.avi"), Framerate::from_int(20), Dimensions::new(4, 3))
        .unwrap();
    assert_eq!(capture.tick(&mut sink), TickOutcome::Frame);

    assert!(capture.take_error().is_some());
    assert!(log.lock().unwrap().frames.is_empty());
    // Preview is unaffected
    assert_eq!(sink.shown, 1);
}
