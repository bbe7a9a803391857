// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer file decoder for playback

use super::FrameDecoder;
use crate::backends::camera::gst_source::{
    build_appsink_pipeline, frame_from_sample, take_bus_error,
};
use crate::backends::camera::types::{BackendError, BackendResult, CameraFrame, PixelFormat};
use crate::constants::timing;
use crate::errors::{PlaybackError, PlaybackResult};
use gstreamer::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Decodes every frame of a video file, in order, as BGR
///
/// The appsink neither drops nor syncs to the clock: the decode thread
/// paces itself and playback needs every frame.
pub struct VideoFileDecoder {
    pipeline: gstreamer::Pipeline,
    appsink: gstreamer_app::AppSink,
    path: PathBuf,
    next_sequence: u64,
}

impl VideoFileDecoder {
    /// Open `path` and preroll the pipeline
    ///
    /// Fails fast with [`PlaybackError::FileMissing`] or
    /// [`PlaybackError::Unreadable`]; nothing is left running on failure.
    pub fn open(path: &Path) -> PlaybackResult<Self> {
        info!(path = %path.display(), "Opening video for playback");

        if !path.is_file() {
            return Err(PlaybackError::FileMissing(path.display().to_string()));
        }

        gstreamer::init()
            .map_err(|e| PlaybackError::Unreadable(format!("GStreamer init failed: {}", e)))?;

        let pipeline_str = format!(
            "filesrc location=\"{}\" ! decodebin ! queue ! videoconvert ! \
             video/x-raw,format={} ! appsink name=sink sync=false max-buffers=8 drop=false",
            path.to_string_lossy(),
            PixelFormat::BGR24.to_gst_format_string()
        );

        let (pipeline, appsink) = build_appsink_pipeline(&pipeline_str)
            .map_err(|e| PlaybackError::Unreadable(e.to_string()))?;

        if let Err(e) = preroll(&pipeline) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(PlaybackError::Unreadable(format!(
                "{}: {}",
                path.display(),
                e
            )));
        }

        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(PlaybackError::Unreadable(format!(
                "Failed to start decoding: {:?}",
                e
            )));
        }

        debug!(path = %path.display(), "Video decoder ready");

        Ok(Self {
            pipeline,
            appsink,
            path: path.to_path_buf(),
            next_sequence: 0,
        })
    }
}

impl FrameDecoder for VideoFileDecoder {
    fn next_frame(&mut self) -> BackendResult<Option<CameraFrame>> {
        match self.appsink.pull_sample() {
            Ok(sample) => {
                let frame = frame_from_sample(&sample, self.next_sequence, true)?;
                self.next_sequence += 1;
                Ok(Some(frame))
            }
            Err(_) if self.appsink.is_eos() => {
                info!(
                    path = %self.path.display(),
                    frames = self.next_sequence,
                    "Video decoded to end of stream"
                );
                Ok(None)
            }
            Err(_) => Err(BackendError::ReadFailed(
                take_bus_error(&self.pipeline).unwrap_or_else(|| "decoder stopped".into()),
            )),
        }
    }
}

impl Drop for VideoFileDecoder {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Releasing video decoder");
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!(?e, "Failed to set decoder pipeline to Null on drop");
        }
    }
}

/// Bring the pipeline to PAUSED so open errors surface before any thread starts
fn preroll(pipeline: &gstreamer::Pipeline) -> Result<(), String> {
    pipeline
        .set_state(gstreamer::State::Paused)
        .map_err(|e| take_bus_error(pipeline).unwrap_or_else(|| format!("{:?}", e)))?;

    let bus = pipeline.bus().ok_or("No bus on pipeline")?;
    let deadline = Instant::now() + Duration::from_secs(timing::SOURCE_OPEN_TIMEOUT_SECS);

    while Instant::now() < deadline {
        if let Some(msg) = bus.timed_pop_filtered(
            gstreamer::ClockTime::from_mseconds(100),
            &[
                gstreamer::MessageType::Error,
                gstreamer::MessageType::AsyncDone,
                gstreamer::MessageType::Eos,
            ],
        ) {
            use gstreamer::MessageView;
            match msg.view() {
                MessageView::Error(err) => return Err(err.error().to_string()),
                // An empty stream prerolls straight to EOS
                MessageView::AsyncDone(_) | MessageView::Eos(_) => return Ok(()),
                _ => {}
            }
        }
    }

    Err("timed out opening the file".into())
}
