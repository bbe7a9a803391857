// SPDX-License-Identifier: GPL-3.0-only

//! Studio application model
//!
//! The studio previews a live camera, records it, and plays recordings back
//! in the same display. It is driven by two periodic callbacks on the main
//! loop (capture tick and playback tick) plus user [`Message`]s. The model
//! knows nothing about the terminal; the front end only supplies sinks.
//!
//! # Module Structure
//!
//! - `capture`: live tick, recording hand-off
//! - `playback`: decode thread, frame buffer, display tick
//! - `sink`: the display abstraction
//! - `timer`: fixed-interval deadlines

pub mod capture;
pub mod playback;
pub mod sink;
pub mod timer;

pub use capture::{CaptureController, ReadFailurePolicy, TickOutcome};
pub use playback::{DecodeEvent, PlaybackEngine, PlaybackProgress, PlaybackState, PlaybackTick};
pub use sink::{DiscardSink, FrameSink};
pub use timer::Ticker;

use crate::backends::camera::FrameSource;
use crate::backends::camera::types::Framerate;
use crate::config::{Config, RecordingConfig};
use crate::errors::PlaybackResult;
use crate::media::FrameDecoder;
use crate::pipelines::video::WriterFactory;
use crate::storage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// User actions in the studio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    StartRecording,
    StopRecording,
    TogglePause,
    Play,
    StopPlayback,
    Quit,
}

/// Studio state shared by every front end
pub struct Studio<S: FrameSource, F: WriterFactory> {
    capture: CaptureController<S, F>,
    playback: PlaybackEngine,
    recording: RecordingConfig,
    playback_fps: Framerate,
    output_path: Option<PathBuf>,
    save_directory: PathBuf,
    /// File to play: `--play` argument or the last finished recording
    play_path: Option<PathBuf>,
    status: String,
    quit: bool,
}

impl<S: FrameSource, F: WriterFactory> Studio<S, F> {
    pub fn new(
        capture: CaptureController<S, F>,
        config: &Config,
        output_path: Option<PathBuf>,
        play_path: Option<PathBuf>,
    ) -> Self {
        let status = match capture.source_description() {
            Some(source) => format!("Live: {}", source),
            None => "Camera unavailable".to_string(),
        };

        Self {
            capture,
            playback: PlaybackEngine::new(config.decode_shutdown_timeout()),
            recording: config.recording.clone(),
            playback_fps: config.playback_framerate(),
            output_path,
            save_directory: storage::video_directory(&config.save_folder),
            play_path,
            status,
            quit: false,
        }
    }

    pub fn capture(&self) -> &CaptureController<S, F> {
        &self.capture
    }

    pub fn playback(&self) -> &PlaybackEngine {
        &self.playback
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn play_path(&self) -> Option<&Path> {
        self.play_path.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn playback_interval(&self) -> Duration {
        self.playback.frame_interval()
    }

    pub fn update(&mut self, message: Message) {
        match message {
            Message::StartRecording => self.start_recording(),
            Message::StopRecording => self.stop_recording(),
            Message::TogglePause => self.toggle_pause(),
            Message::Play => self.play(),
            Message::StopPlayback => {
                self.playback.stop();
                self.status = "Playback stopped".into();
            }
            Message::Quit => self.shutdown(),
        }
    }

    /// Live tick; the display belongs to playback while a file is playing
    pub fn capture_tick(&mut self, display: &mut dyn FrameSink) -> TickOutcome {
        let outcome = if self.playback.is_active() {
            self.capture.tick(&mut DiscardSink)
        } else {
            self.capture.tick(display)
        };

        if let Some(problem) = self.capture.take_error() {
            self.status = format!("Error: {}", problem);
        }
        if let Some(summary) = self.capture.take_finished() {
            info!(path = %summary.path.display(), "Recording saved after camera stopped");
            self.status = format!(
                "Camera stopped, saved {} ({} frames)",
                summary.path.display(),
                summary.frames_written
            );
            self.play_path = Some(summary.path);
        }
        outcome
    }

    pub fn playback_tick(&mut self, display: &mut dyn FrameSink) -> PlaybackTick {
        let tick = self.playback.tick(display);
        if tick == PlaybackTick::Finished {
            self.status = match self.playback.take_failure() {
                Some(reason) => format!("Playback ended early: {}", reason),
                None => format!("Playback finished ({} frames)", self.playback.progress().displayed),
            };
        }
        tick
    }

    /// One-line summary for the front end
    pub fn indicator(&self) -> String {
        let session = self.capture.recording();
        let mut parts = Vec::new();

        if session.is_recording() {
            let secs = session.elapsed().map_or(0, |d| d.as_secs());
            let label = if session.is_paused() { "PAUSED" } else { "REC" };
            parts.push(format!(
                "{} {:02}:{:02} {} frames",
                label,
                secs / 60,
                secs % 60,
                session.frames_written()
            ));
        }

        if self.playback.is_active() {
            let progress = self.playback.progress();
            parts.push(format!("PLAY {}/{}", progress.displayed, progress.decoded));
        }

        parts.join(" | ")
    }

    fn start_recording(&mut self) {
        let path = storage::recording_path(
            self.output_path.as_deref(),
            &self.save_directory,
            self.recording.codec,
        );

        match self.capture.start_recording(
            &path,
            self.recording.framerate(),
            self.recording.dimensions(),
        ) {
            Ok(()) => {
                let target = self.capture.recording().output_path().unwrap_or(&path);
                self.status = format!("Recording to {}", target.display());
            }
            Err(e) => {
                warn!(error = %e, "Could not start recording");
                self.status = format!("Error: {}", e);
            }
        }
    }

    fn stop_recording(&mut self) {
        match self.capture.stop_recording() {
            Ok(Some(summary)) => {
                info!(path = %summary.path.display(), "Recording saved");
                self.status = format!(
                    "Saved {} ({} frames)",
                    summary.path.display(),
                    summary.frames_written
                );
                self.play_path = Some(summary.path);
            }
            Ok(None) => self.status = "Not recording".into(),
            Err(e) => {
                error!(error = %e, "Failed to finalize recording");
                self.status = format!("Error: {}", e);
            }
        }
    }

    fn toggle_pause(&mut self) {
        if !self.capture.recording().is_recording() {
            self.status = "Not recording".into();
            return;
        }
        self.capture.toggle_pause();
        self.status = if self.capture.recording().is_paused() {
            "Recording paused".into()
        } else {
            "Recording resumed".into()
        };
    }

    fn play(&mut self) {
        let Some(path) = self.play_path.clone() else {
            self.status = "Nothing to play yet".into();
            return;
        };

        let result = self.playback.play(&path, self.playback_fps);
        self.playback_started(result, &path.display().to_string());
    }

    /// Play frames from an already opened decoder, labelled `name` in the status
    pub fn play_decoder<D>(&mut self, decoder: D, name: &str)
    where
        D: FrameDecoder + 'static,
    {
        let result = self.playback.play_with_decoder(decoder, self.playback_fps);
        self.playback_started(result, name);
    }

    fn playback_started(&mut self, result: PlaybackResult<()>, name: &str) {
        match result {
            Ok(()) => self.status = format!("Playing {}", name),
            Err(e) => {
                warn!(error = %e, "Could not start playback");
                self.status = format!("Error: {}", e);
            }
        }
    }

    /// Release everything: finalize recording, stop decoding
    fn shutdown(&mut self) {
        self.quit = true;
        self.playback.stop();
        if let Err(e) = self.capture.stop_recording() {
            error!(error = %e, "Failed to finalize recording on quit");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::SourceRead;
    use crate::backends::camera::types::{
        BackendError, BackendResult, CameraFrame, Dimensions, PixelFormat,
    };
    use crate::config::DimensionPolicy;
    use crate::errors::RecordingResult;
    use crate::pipelines::video::{FrameWriter, RecordingSession};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    const TAKE: &str = "studio-test-output/take.avi";

    /// Yields frames until `limit` is reached, then closes
    struct LoopingSource {
        limit: Option<u64>,
        read: u64,
    }

    impl LoopingSource {
        fn endless() -> Self {
            Self { limit: None, read: 0 }
        }

        fn closing_after(limit: u64) -> Self {
            Self {
                limit: Some(limit),
                read: 0,
            }
        }
    }

    impl FrameSource for LoopingSource {
        fn read_frame(&mut self, _timeout: Duration) -> SourceRead {
            if self.limit.is_some_and(|limit| self.read >= limit) {
                return SourceRead::Closed(None);
            }
            self.read += 1;
            SourceRead::Frame(CameraFrame::from_packed(
                2,
                2,
                PixelFormat::BGR24,
                vec![0; 12],
                self.read,
            ))
        }

        fn describe(&self) -> String {
            "loop".into()
        }

        fn dimensions(&self) -> Option<Dimensions> {
            Some(Dimensions::new(2, 2))
        }
    }

    struct NullWriter(PathBuf);

    impl FrameWriter for NullWriter {
        fn dimensions(&self) -> Dimensions {
            Dimensions::new(2, 2)
        }

        fn path(&self) -> &Path {
            &self.0
        }

        fn write_frame(&mut self, _frame: &CameraFrame) -> RecordingResult<()> {
            Ok(())
        }

        fn finish(self) -> RecordingResult<PathBuf> {
            Ok(self.0)
        }
    }

    #[derive(Default, Clone)]
    struct CountingFactory {
        opened: Arc<Mutex<usize>>,
    }

    impl WriterFactory for CountingFactory {
        type Writer = NullWriter;

        fn open(&self, path: &Path, _: Framerate, _: Dimensions) -> RecordingResult<NullWriter> {
            *self.opened.lock().unwrap() += 1;
            Ok(NullWriter(path.to_path_buf()))
        }
    }

    #[derive(Default)]
    struct CountingSink(usize);

    impl FrameSink for CountingSink {
        fn pixel_format(&self) -> PixelFormat {
            PixelFormat::RGB24
        }

        fn display(&mut self, _frame: &CameraFrame) {
            self.0 += 1;
        }
    }

    fn studio(source: Option<LoopingSource>) -> (Studio<LoopingSource, CountingFactory>, CountingFactory) {
        let factory = CountingFactory::default();
        let session = RecordingSession::new(factory.clone(), DimensionPolicy::Resample);
        let capture = CaptureController::new(
            source,
            session,
            ReadFailurePolicy::SkipTransient,
            Duration::from_millis(1),
        );
        let config = Config {
            playback_fps: 500,
            ..Config::default()
        };
        let studio = Studio::new(capture, &config, Some(PathBuf::from(TAKE)), None);
        (studio, factory)
    }

    struct ScriptedDecoder {
        frames: u64,
        next: u64,
        fail_at_end: bool,
    }

    impl FrameDecoder for ScriptedDecoder {
        fn next_frame(&mut self) -> BackendResult<Option<CameraFrame>> {
            if self.next == self.frames {
                if self.fail_at_end {
                    return Err(BackendError::ReadFailed("truncated file".into()));
                }
                return Ok(None);
            }
            self.next += 1;
            Ok(Some(CameraFrame::from_packed(
                1,
                1,
                PixelFormat::BGR24,
                vec![0, 0, 0],
                self.next,
            )))
        }
    }

    fn decoder(frames: u64, fail_at_end: bool) -> ScriptedDecoder {
        ScriptedDecoder {
            frames,
            next: 0,
            fail_at_end,
        }
    }

    /// Drive both ticks until playback finishes; returns (live, played) display counts
    fn play_to_end(studio: &mut Studio<LoopingSource, CountingFactory>) -> (usize, usize) {
        let mut live = CountingSink::default();
        let mut played = CountingSink::default();
        let deadline = Instant::now() + Duration::from_secs(10);

        while Instant::now() < deadline {
            studio.capture_tick(&mut live);
            match studio.playback_tick(&mut played) {
                PlaybackTick::Finished | PlaybackTick::Idle => break,
                PlaybackTick::Waiting => std::thread::sleep(Duration::from_millis(1)),
                PlaybackTick::Displayed => {}
            }
        }
        (live.0, played.0)
    }

    #[test]
    fn test_record_stop_remembers_last_recording() {
        let (mut studio, factory) = studio(Some(LoopingSource::endless()));
        let mut sink = CountingSink::default();

        studio.update(Message::StartRecording);
        assert!(studio.capture().recording().is_recording());
        studio.capture_tick(&mut sink);
        studio.capture_tick(&mut sink);
        assert!(studio.indicator().starts_with("REC"));

        studio.update(Message::StopRecording);
        assert!(!studio.capture().recording().is_recording());
        assert_eq!(studio.play_path(), Some(Path::new(TAKE)));
        assert_eq!(*factory.opened.lock().unwrap(), 1);
        assert_eq!(sink.0, 2);
    }

    #[test]
    fn test_double_start_reports_error() {
        let (mut studio, factory) = studio(Some(LoopingSource::endless()));
        studio.update(Message::StartRecording);
        studio.update(Message::StartRecording);

        assert!(studio.status().starts_with("Error"));
        assert_eq!(*factory.opened.lock().unwrap(), 1);
        assert!(studio.capture().recording().is_recording());
    }

    #[test]
    fn test_pause_toggles_indicator() {
        let (mut studio, _) = studio(Some(LoopingSource::endless()));
        studio.update(Message::TogglePause);
        assert_eq!(studio.status(), "Not recording");

        studio.update(Message::StartRecording);
        studio.update(Message::TogglePause);
        assert!(studio.indicator().starts_with("PAUSED"));
        studio.update(Message::TogglePause);
        assert!(studio.indicator().starts_with("REC"));
    }

    #[test]
    fn test_missing_camera_is_not_fatal() {
        let (mut studio, factory) = studio(None);
        let mut sink = CountingSink::default();

        assert_eq!(studio.status(), "Camera unavailable");
        assert_eq!(studio.capture_tick(&mut sink), TickOutcome::EndOfStream);
        studio.update(Message::StartRecording);
        assert!(studio.status().starts_with("Error"));
        assert_eq!(*factory.opened.lock().unwrap(), 0);
    }

    #[test]
    fn test_play_without_file() {
        let (mut studio, _) = studio(Some(LoopingSource::endless()));
        studio.update(Message::Play);
        assert_eq!(studio.status(), "Nothing to play yet");
        assert_eq!(studio.playback().state(), PlaybackState::Idle);
    }

    #[test]
    fn test_quit_finalizes_recording() {
        let (mut studio, _) = studio(Some(LoopingSource::endless()));
        studio.update(Message::StartRecording);
        studio.update(Message::Quit);
        assert!(studio.should_quit());
        assert!(!studio.capture().recording().is_recording());
    }

    #[test]
    fn test_recording_status_names_writer_path() {
        let (mut studio, _) = studio(Some(LoopingSource::endless()));
        studio.update(Message::StartRecording);
        assert_eq!(studio.status(), format!("Recording to {}", TAKE));
    }

    #[test]
    fn test_source_end_keeps_finalized_take_for_play() {
        let (mut studio, _) = studio(Some(LoopingSource::closing_after(2)));
        let mut sink = CountingSink::default();

        studio.update(Message::StartRecording);
        assert_eq!(studio.capture_tick(&mut sink), TickOutcome::Frame);
        assert_eq!(studio.capture_tick(&mut sink), TickOutcome::Frame);
        assert_eq!(studio.capture_tick(&mut sink), TickOutcome::EndOfStream);

        assert!(!studio.capture().recording().is_recording());
        assert_eq!(studio.play_path(), Some(Path::new(TAKE)));
        assert!(studio.status().starts_with("Camera stopped, saved"));
        assert!(studio.status().contains("(2 frames)"));

        // The take was never written to disk by the fake writer
        studio.update(Message::Play);
        assert!(studio.status().contains(TAKE), "{}", studio.status());
        assert_eq!(studio.playback().state(), PlaybackState::Idle);
    }

    #[test]
    fn test_playback_owns_display_while_active() {
        let (mut studio, _) = studio(Some(LoopingSource::endless()));
        studio.play_decoder(decoder(3, false), "clip");
        assert_eq!(studio.status(), "Playing clip");
        assert!(studio.indicator().starts_with("PLAY"));

        let (live, played) = play_to_end(&mut studio);

        assert_eq!(live, 0);
        assert_eq!(played, 3);
        assert!(studio.capture().frames_captured() > 0);
        assert_eq!(studio.status(), "Playback finished (3 frames)");
        assert_eq!(studio.playback().state(), PlaybackState::Idle);

        let mut live = CountingSink::default();
        studio.capture_tick(&mut live);
        assert_eq!(live.0, 1);
    }

    #[test]
    fn test_decode_failure_reported_in_status() {
        let (mut studio, _) = studio(Some(LoopingSource::endless()));
        studio.play_decoder(decoder(1, true), "broken");

        let (_, played) = play_to_end(&mut studio);

        assert_eq!(played, 1);
        assert!(studio.status().starts_with("Playback ended early"), "{}", studio.status());
        assert!(studio.status().contains("truncated file"));
    }

    #[test]
    fn test_second_play_rejected_while_playing() {
        let (mut studio, _) = studio(Some(LoopingSource::endless()));
        studio.play_decoder(decoder(50, false), "first");
        studio.play_decoder(decoder(1, false), "second");

        assert!(studio.status().starts_with("Error"));
        studio.update(Message::StopPlayback);
        assert_eq!(studio.playback().state(), PlaybackState::Idle);
    }
}
