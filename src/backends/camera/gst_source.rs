// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer live source
//!
//! Opens a capture device or stream URL and exposes it as a pull-based
//! [`FrameSource`]. Frames come out of an appsink in BGR, the native order
//! the recorder writes.

use super::types::{
    BackendError, BackendResult, CameraFrame, Dimensions, FrameData, PixelFormat,
};
use super::{CameraSource, FrameSource, SourceRead};
use crate::constants::timing;
use gstreamer::prelude::*;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Live camera or stream pipeline feeding an appsink
pub struct GstFrameSource {
    pipeline: gstreamer::Pipeline,
    appsink: gstreamer_app::AppSink,
    source: CameraSource,
    dimensions: Option<Dimensions>,
    next_sequence: u64,
}

impl GstFrameSource {
    /// Open the source and wait until it is streaming
    ///
    /// Fails with [`BackendError::SourceUnavailable`] when the device or
    /// stream cannot be opened.
    pub fn open(source: &CameraSource) -> BackendResult<Self> {
        info!(source = %source, "Opening live source");

        gstreamer::init()
            .map_err(|e| BackendError::NotAvailable(format!("GStreamer init failed: {}", e)))?;

        let pipeline_str = Self::pipeline_description(source);
        debug!(pipeline = %pipeline_str, "Source pipeline");

        let (pipeline, appsink) = build_appsink_pipeline(&pipeline_str)
            .map_err(|e| BackendError::SourceUnavailable(e.to_string()))?;

        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            let reason = take_bus_error(&pipeline).unwrap_or_else(|| format!("{:?}", e));
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(BackendError::SourceUnavailable(format!(
                "{}: {}",
                source, reason
            )));
        }

        if let Err(e) = wait_for_streaming(
            &pipeline,
            Duration::from_secs(timing::SOURCE_OPEN_TIMEOUT_SECS),
        ) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(BackendError::SourceUnavailable(format!("{}: {}", source, e)));
        }

        info!(source = %source, "Live source streaming");

        Ok(Self {
            pipeline,
            appsink,
            source: source.clone(),
            dimensions: None,
            next_sequence: 0,
        })
    }

    fn pipeline_description(source: &CameraSource) -> String {
        let head = match source {
            CameraSource::Device(index) => format!("v4l2src device=/dev/video{}", index),
            CameraSource::Url(url) => format!("uridecodebin uri=\"{}\"", url),
        };
        format!(
            "{} ! queue ! videoconvert ! video/x-raw,format={} ! \
             appsink name=sink max-buffers=2 drop=true sync=false",
            head,
            PixelFormat::BGR24.to_gst_format_string()
        )
    }
}

impl FrameSource for GstFrameSource {
    fn read_frame(&mut self, timeout: Duration) -> SourceRead {
        if let Some(closed) = poll_bus_for_end(&self.pipeline) {
            return closed;
        }

        let timeout = gstreamer::ClockTime::from_nseconds(timeout.as_nanos() as u64);
        match self.appsink.try_pull_sample(timeout) {
            Some(sample) => match frame_from_sample(&sample, self.next_sequence, false) {
                Ok(frame) => {
                    self.next_sequence += 1;
                    self.dimensions = Some(frame.dimensions());
                    if frame.sequence % timing::FRAME_LOG_INTERVAL == 0 {
                        debug!(sequence = frame.sequence, "Live frames received");
                    }
                    SourceRead::Frame(frame)
                }
                Err(e) => {
                    warn!(error = %e, "Dropping unreadable sample");
                    SourceRead::NotReady
                }
            },
            None if self.appsink.is_eos() => {
                info!(source = %self.source, "Live source reached end of stream");
                SourceRead::Closed(None)
            }
            None => poll_bus_for_end(&self.pipeline).unwrap_or(SourceRead::NotReady),
        }
    }

    fn describe(&self) -> String {
        self.source.to_string()
    }

    fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }
}

impl Drop for GstFrameSource {
    fn drop(&mut self) {
        debug!(source = %self.source, "Releasing live source");
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!(?e, "Failed to set source pipeline to Null on drop");
        }
    }
}

/// Parse a launch line ending in `appsink name=sink`
pub(crate) fn build_appsink_pipeline(
    description: &str,
) -> BackendResult<(gstreamer::Pipeline, gstreamer_app::AppSink)> {
    let pipeline = gstreamer::parse::launch(description)
        .map_err(|e| BackendError::Other(format!("Failed to create pipeline: {}", e)))?
        .downcast::<gstreamer::Pipeline>()
        .map_err(|_| BackendError::Other("Failed to downcast to Pipeline".into()))?;

    let appsink = pipeline
        .by_name("sink")
        .ok_or_else(|| BackendError::Other("Failed to find appsink".into()))?
        .downcast::<gstreamer_app::AppSink>()
        .map_err(|_| BackendError::Other("Failed to downcast to AppSink".into()))?;

    Ok((pipeline, appsink))
}

/// Wait until the pipeline is PLAYING, failing on bus errors or timeout
pub(crate) fn wait_for_streaming(
    pipeline: &gstreamer::Pipeline,
    timeout: Duration,
) -> Result<(), String> {
    let bus = pipeline.bus().ok_or("No bus on pipeline")?;
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        if let Some(msg) = bus.timed_pop_filtered(
            gstreamer::ClockTime::from_mseconds(100),
            &[
                gstreamer::MessageType::Error,
                gstreamer::MessageType::Eos,
                gstreamer::MessageType::StateChanged,
            ],
        ) {
            use gstreamer::MessageView;
            match msg.view() {
                MessageView::Error(err) => return Err(err.error().to_string()),
                MessageView::Eos(_) => return Ok(()),
                MessageView::StateChanged(state)
                    if state.src() == Some(pipeline.upcast_ref::<gstreamer::Object>())
                        && state.current() == gstreamer::State::Playing =>
                {
                    return Ok(());
                }
                _ => {}
            }
        }
    }

    Err("timed out waiting for the stream to start".into())
}

/// Pop the first pending error message off the bus, if any
pub(crate) fn take_bus_error(pipeline: &gstreamer::Pipeline) -> Option<String> {
    let bus = pipeline.bus()?;
    while let Some(msg) = bus.pop_filtered(&[gstreamer::MessageType::Error]) {
        if let gstreamer::MessageView::Error(err) = msg.view() {
            return Some(err.error().to_string());
        }
    }
    None
}

fn poll_bus_for_end(pipeline: &gstreamer::Pipeline) -> Option<SourceRead> {
    let bus = pipeline.bus()?;
    while let Some(msg) =
        bus.pop_filtered(&[gstreamer::MessageType::Error, gstreamer::MessageType::Eos])
    {
        use gstreamer::MessageView;
        match msg.view() {
            MessageView::Error(err) => {
                warn!(error = %err.error(), debug = ?err.debug(), "Live source error");
                return Some(SourceRead::Closed(Some(BackendError::ReadFailed(
                    err.error().to_string(),
                ))));
            }
            MessageView::Eos(_) => return Some(SourceRead::Closed(None)),
            _ => {}
        }
    }
    None
}

/// Turn an appsink sample into a frame
///
/// With `copy` the pixels are copied out of the GStreamer buffer so the frame
/// can outlive the pipeline; otherwise the buffer stays mapped.
pub(crate) fn frame_from_sample(
    sample: &gstreamer::Sample,
    sequence: u64,
    copy: bool,
) -> BackendResult<CameraFrame> {
    let caps = sample
        .caps()
        .ok_or_else(|| BackendError::ReadFailed("No caps on sample".into()))?;
    let info = gstreamer_video::VideoInfo::from_caps(caps)
        .map_err(|e| BackendError::FormatNotSupported(format!("Invalid video caps: {}", e)))?;
    let format = match info.format() {
        gstreamer_video::VideoFormat::Bgr => PixelFormat::BGR24,
        gstreamer_video::VideoFormat::Rgb => PixelFormat::RGB24,
        gstreamer_video::VideoFormat::Rgba | gstreamer_video::VideoFormat::Rgbx => {
            PixelFormat::RGBA
        }
        gstreamer_video::VideoFormat::Gray8 => PixelFormat::Gray8,
        other => {
            return Err(BackendError::FormatNotSupported(format!(
                "Unexpected pixel format {:?}",
                other
            )));
        }
    };

    let buffer = sample
        .buffer_owned()
        .ok_or_else(|| BackendError::ReadFailed("No buffer in sample".into()))?;

    let data = if copy {
        let map = buffer
            .map_readable()
            .map_err(|_| BackendError::ReadFailed("Failed to map buffer".into()))?;
        FrameData::from(map.as_slice().to_vec())
    } else {
        let mapped = buffer
            .into_mapped_buffer_readable()
            .map_err(|_| BackendError::ReadFailed("Failed to map buffer".into()))?;
        FrameData::from_mapped_buffer(mapped)
    };

    Ok(CameraFrame {
        width: info.width(),
        height: info.height(),
        stride: info.stride()[0] as u32,
        data,
        format,
        sequence,
        captured_at: Instant::now(),
    })
}
