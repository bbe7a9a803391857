// SPDX-License-Identifier: GPL-3.0-only

//! Playback scenarios with scripted decoders

use camera_studio::app::{FrameSink, PlaybackEngine, PlaybackState, PlaybackTick};
use camera_studio::backends::camera::types::{BackendResult, CameraFrame, Framerate, PixelFormat};
use camera_studio::errors::PlaybackError;
use camera_studio::media::{FrameBuffer, FrameDecoder};
use std::path::Path;
use std::time::{Duration, Instant};

struct CountingDecoder {
    total: u64,
    next: u64,
}

impl CountingDecoder {
    fn new(total: u64) -> Self {
        Self { total, next: 0 }
    }
}

impl FrameDecoder for CountingDecoder {
    fn next_frame(&mut self) -> BackendResult<Option<CameraFrame>> {
        if self.next == self.total {
            return Ok(None);
        }
        let frame = CameraFrame::from_packed(2, 2, PixelFormat::BGR24, vec![9; 12], self.next);
        self.next += 1;
        Ok(Some(frame))
    }
}

#[derive(Default)]
struct SequenceSink {
    shown: Vec<u64>,
}

impl FrameSink for SequenceSink {
    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::RGB24
    }

    fn display(&mut self, frame: &CameraFrame) {
        self.shown.push(frame.sequence);
    }
}

/// Tick until idle, observing every state the engine passes through
fn play_out(engine: &mut PlaybackEngine, sink: &mut SequenceSink) -> Vec<PlaybackTick> {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut ticks = Vec::new();
    while engine.state() != PlaybackState::Idle {
        assert!(Instant::now() < deadline, "playback did not finish");
        let tick = engine.tick(sink);
        if tick == PlaybackTick::Waiting {
            std::thread::sleep(Duration::from_millis(1));
        }
        ticks.push(tick);
    }
    ticks
}

#[test]
fn test_buffer_holds_every_decoded_frame() {
    let mut engine = PlaybackEngine::new(Duration::from_millis(500));
    let mut sink = SequenceSink::default();

    engine
        .play_with_decoder(CountingDecoder::new(40), Framerate::from_int(500))
        .unwrap();
    play_out(&mut engine, &mut sink);

    let progress = engine.progress();
    assert_eq!(progress.decoded, 40);
    assert_eq!(progress.displayed, 40);
    assert_eq!(sink.shown, (0..40).collect::<Vec<_>>());
}

#[test]
fn test_zero_frames_zero_fps() {
    let mut engine = PlaybackEngine::new(Duration::from_millis(500));
    let mut sink = SequenceSink::default();

    engine
        .play_with_decoder(CountingDecoder::new(0), Framerate::from_int(0))
        .unwrap();
    assert_eq!(engine.state(), PlaybackState::Decoding);

    let ticks = play_out(&mut engine, &mut sink);

    assert!(sink.shown.is_empty());
    assert_eq!(ticks.last(), Some(&PlaybackTick::Finished));
    assert_eq!(engine.state(), PlaybackState::Idle);
}

#[test]
fn test_engine_can_play_again_after_finishing() {
    let mut engine = PlaybackEngine::new(Duration::from_millis(500));
    let mut sink = SequenceSink::default();

    engine
        .play_with_decoder(CountingDecoder::new(3), Framerate::from_int(500))
        .unwrap();
    play_out(&mut engine, &mut sink);

    engine
        .play_with_decoder(CountingDecoder::new(2), Framerate::from_int(500))
        .unwrap();
    play_out(&mut engine, &mut sink);

    assert_eq!(sink.shown, vec![0, 1, 2, 0, 1]);
    assert_eq!(engine.progress().decoded, 2);
}

#[test]
fn test_unreadable_paths_fail_fast() {
    let mut engine = PlaybackEngine::new(Duration::from_millis(500));

    let dir = tempfile::tempdir().unwrap();
    let missing = engine.play(&dir.path().join("nope.avi"), Framerate::from_int(20));
    assert!(matches!(missing, Err(PlaybackError::FileMissing(_))));

    // A directory is not a playable file either
    let directory = engine.play(dir.path(), Framerate::from_int(20));
    assert!(matches!(directory, Err(PlaybackError::FileMissing(_))));

    assert_eq!(engine.state(), PlaybackState::Idle);
    assert_eq!(engine.progress().decoded, 0);
}

#[test]
fn test_stop_while_decoding_returns_to_idle() {
    let mut engine = PlaybackEngine::new(Duration::from_secs(1));
    let mut sink = SequenceSink::default();

    engine
        .play_with_decoder(CountingDecoder::new(10_000), Framerate::from_int(2))
        .unwrap();
    engine.tick(&mut sink);
    engine.stop();

    assert_eq!(engine.state(), PlaybackState::Idle);
    assert_eq!(engine.tick(&mut sink), PlaybackTick::Idle);
    assert!(matches!(
        engine.play(Path::new(""), Framerate::from_int(20)),
        Err(PlaybackError::FileMissing(_))
    ));
}

#[test]
fn test_frame_buffer_cursor_walk() {
    let mut buffer = FrameBuffer::new();
    for i in 0..7 {
        buffer.push(CameraFrame::from_packed(1, 1, PixelFormat::BGR24, vec![0; 3], i));
    }

    let mut visited = Vec::new();
    while let Some(frame) = buffer.next_frame() {
        visited.push(frame.sequence);
        assert!(buffer.cursor() <= buffer.len());
    }

    assert_eq!(visited, (0..7).collect::<Vec<_>>());
    assert!(buffer.is_exhausted());
}
