// SPDX-License-Identifier: GPL-3.0-only

//! Video file playback
//!
//! ```text
//! decode thread ──DecodeEvent──▶ channel ──▶ tick() ──▶ FrameBuffer ──▶ FrameSink
//! (paced at 1/fps)            (unbounded)   (main)     (append-only)
//! ```
//!
//! The decode thread never touches the buffer. Frames become visible to the
//! display only after the main loop has received them whole from the
//! channel, so the buffer is only ever mutated from one thread.

use super::sink::{FrameSink, present};
use crate::backends::camera::frame_loop::{FrameLoopController, LoopAction};
use crate::backends::camera::types::{CameraFrame, Framerate};
use crate::errors::{PlaybackError, PlaybackResult};
use crate::media::{FrameBuffer, FrameDecoder, VideoFileDecoder};
use futures::channel::mpsc;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Playback lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    /// Decode thread running, frames still arriving
    Decoding,
    /// Decoder finished, showing what is left in the buffer
    Draining,
}

/// Message from the decode thread
#[derive(Debug)]
pub enum DecodeEvent {
    Frame(CameraFrame),
    EndOfStream,
    Failed(String),
}

/// Result of one display tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackTick {
    /// Nothing is playing
    Idle,
    /// One frame was shown
    Displayed,
    /// Caught up with the decoder, waiting for more frames
    Waiting,
    /// Last frame already shown; playback is now idle
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackProgress {
    pub decoded: usize,
    pub displayed: usize,
}

pub struct PlaybackEngine {
    state: PlaybackState,
    buffer: FrameBuffer,
    events: Option<mpsc::UnboundedReceiver<DecodeEvent>>,
    decode_loop: Option<FrameLoopController>,
    framerate: Framerate,
    shutdown_timeout: Duration,
    failure: Option<String>,
}

impl PlaybackEngine {
    pub fn new(shutdown_timeout: Duration) -> Self {
        Self {
            state: PlaybackState::Idle,
            buffer: FrameBuffer::new(),
            events: None,
            decode_loop: None,
            framerate: Framerate::default(),
            shutdown_timeout,
            failure: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != PlaybackState::Idle
    }

    pub fn progress(&self) -> PlaybackProgress {
        PlaybackProgress {
            decoded: self.buffer.len(),
            displayed: self.buffer.cursor(),
        }
    }

    /// Interval between display ticks for the current playback
    pub fn frame_interval(&self) -> Duration {
        self.framerate.frame_interval()
    }

    /// Take the decode error that ended the last playback early, if any
    pub fn take_failure(&mut self) -> Option<String> {
        self.failure.take()
    }

    /// Open `path` and start decoding it
    ///
    /// The file is opened before any thread starts, so a missing or
    /// unreadable file leaves the engine idle with an empty buffer.
    pub fn play(&mut self, path: &Path, framerate: Framerate) -> PlaybackResult<()> {
        if self.is_active() {
            return Err(PlaybackError::AlreadyPlaying);
        }
        let decoder = VideoFileDecoder::open(path)?;
        self.play_with_decoder(decoder, framerate)
    }

    /// Start playback from an already opened decoder
    pub fn play_with_decoder<D>(&mut self, decoder: D, framerate: Framerate) -> PlaybackResult<()>
    where
        D: FrameDecoder + 'static,
    {
        if self.is_active() {
            return Err(PlaybackError::AlreadyPlaying);
        }

        self.reset();
        self.framerate = framerate;
        let interval = framerate.frame_interval();

        let (sender, receiver) = mpsc::unbounded();
        let mut decoder = Some(decoder);

        let decode_loop = FrameLoopController::start("playback-decode", move |stop| {
            let Some(active) = decoder.as_mut() else {
                return LoopAction::Stop;
            };

            let event = match active.next_frame() {
                Ok(Some(frame)) => DecodeEvent::Frame(frame),
                Ok(None) => DecodeEvent::EndOfStream,
                Err(e) => DecodeEvent::Failed(e.to_string()),
            };

            let more = matches!(event, DecodeEvent::Frame(_));
            if !more {
                // Release the file before reporting the end
                decoder = None;
            }

            if sender.unbounded_send(event).is_err() {
                debug!("Playback receiver gone, stopping decoder");
                return LoopAction::Stop;
            }

            if more && stop.sleep(interval) {
                LoopAction::Continue
            } else {
                LoopAction::Stop
            }
        });

        info!(%framerate, ?interval, "Playback started");

        self.events = Some(receiver);
        self.decode_loop = Some(decode_loop);
        self.state = PlaybackState::Decoding;
        Ok(())
    }

    /// Pull decoded frames in and show the next one
    pub fn tick(&mut self, sink: &mut dyn FrameSink) -> PlaybackTick {
        if self.state == PlaybackState::Idle {
            return PlaybackTick::Idle;
        }

        self.receive_events();

        if self.state == PlaybackState::Decoding && !self.decoder_running() {
            // Thread exited; anything it sent is already queued
            self.receive_events();
            if self.state == PlaybackState::Decoding {
                warn!("Decode thread exited without end of stream");
                self.state = PlaybackState::Draining;
            }
        }

        if let Some(frame) = self.buffer.next_frame() {
            if let Err(e) = present(sink, frame) {
                warn!(error = %e, "Failed to display playback frame");
            }
            return PlaybackTick::Displayed;
        }

        match self.state {
            PlaybackState::Draining if self.buffer.is_exhausted() => {
                self.finish();
                PlaybackTick::Finished
            }
            _ => PlaybackTick::Waiting,
        }
    }

    /// Stop decoding, drop buffered frames and return to idle
    pub fn stop(&mut self) {
        if let Some(mut decode_loop) = self.decode_loop.take() {
            decode_loop.request_stop();
            if !decode_loop.shutdown(self.shutdown_timeout) {
                warn!("Decode thread did not stop in time, detached");
            }
        }
        if self.state != PlaybackState::Idle {
            info!(
                displayed = self.buffer.cursor(),
                decoded = self.buffer.len(),
                "Playback stopped"
            );
        }
        self.reset();
    }

    fn receive_events(&mut self) {
        let Some(events) = self.events.as_mut() else {
            return;
        };

        while let Ok(event) = events.try_recv() {
            match event {
                DecodeEvent::Frame(frame) => self.buffer.push(frame),
                DecodeEvent::EndOfStream => {
                    debug!(frames = self.buffer.len(), "Decoder reached end of stream");
                    self.state = PlaybackState::Draining;
                }
                DecodeEvent::Failed(reason) => {
                    warn!(%reason, frames = self.buffer.len(), "Decoding failed, ending playback early");
                    self.failure = Some(reason);
                    self.state = PlaybackState::Draining;
                }
            }
        }
    }

    fn decoder_running(&self) -> bool {
        self.decode_loop.as_ref().is_some_and(|l| l.is_running())
    }

    /// Natural end: every decoded frame has been shown
    fn finish(&mut self) {
        if let Some(mut decode_loop) = self.decode_loop.take() {
            decode_loop.shutdown(self.shutdown_timeout);
        }
        self.events = None;
        self.state = PlaybackState::Idle;
        info!(frames = self.buffer.cursor(), "Playback finished");
    }

    fn reset(&mut self) {
        self.events = None;
        self.decode_loop = None;
        self.buffer.clear();
        self.state = PlaybackState::Idle;
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
