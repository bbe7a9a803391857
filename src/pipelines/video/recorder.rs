// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer video file writer
//!
//! Frames are pushed into an appsrc and encoded on GStreamer's own threads:
//!
//! ```text
//! appsrc (BGR) -> videoconvert -> encoder -> [parser] -> muxer -> filesink
//! ```
//!
//! Timestamps are derived from the frame index and the configured frame
//! rate, so the file plays back at that rate regardless of how fast frames
//! actually arrive.

use super::session::{FrameWriter, WriterFactory};
use crate::backends::camera::gst_source::take_bus_error;
use crate::backends::camera::types::{CameraFrame, Dimensions, Framerate, PixelFormat};
use crate::constants::{BitratePreset, Codec, timing};
use crate::errors::{RecordingError, RecordingResult};
use crate::media::formats::convert_frame;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app::AppSrc;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Creates [`GstVideoWriter`]s for a fixed codec and bitrate preset
#[derive(Debug, Clone, Copy, Default)]
pub struct GstWriterFactory {
    pub codec: Codec,
    pub bitrate_preset: BitratePreset,
}

impl GstWriterFactory {
    pub fn new(codec: Codec, bitrate_preset: BitratePreset) -> Self {
        Self {
            codec,
            bitrate_preset,
        }
    }
}

impl WriterFactory for GstWriterFactory {
    type Writer = GstVideoWriter;

    fn open(
        &self,
        path: &Path,
        framerate: Framerate,
        dimensions: Dimensions,
    ) -> RecordingResult<GstVideoWriter> {
        GstVideoWriter::open(
            path,
            self.codec,
            self.bitrate_preset,
            framerate,
            dimensions,
        )
    }
}

/// One open output file
pub struct GstVideoWriter {
    pipeline: gst::Pipeline,
    appsrc: AppSrc,
    info: gstreamer_video::VideoInfo,
    framerate: Framerate,
    dimensions: Dimensions,
    output_path: PathBuf,
    frames_pushed: u64,
    finished: bool,
}

impl GstVideoWriter {
    /// Build and start the encoding pipeline
    ///
    /// The output extension is forced to match the codec's container.
    pub fn open(
        path: &Path,
        codec: Codec,
        bitrate_preset: BitratePreset,
        framerate: Framerate,
        dimensions: Dimensions,
    ) -> RecordingResult<Self> {
        gst::init().map_err(|e| {
            RecordingError::EncoderNotAvailable(format!("GStreamer init failed: {}", e))
        })?;

        let output_path = path.with_extension(codec.extension());
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                RecordingError::StartFailed(format!(
                    "Cannot create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        info!(
            path = %output_path.display(),
            %codec,
            %framerate,
            %dimensions,
            "Opening video writer"
        );

        let info = gstreamer_video::VideoInfo::builder(
            gstreamer_video::VideoFormat::Bgr,
            dimensions.width,
            dimensions.height,
        )
        .fps(gst::Fraction::new(
            framerate.num as i32,
            framerate.denom as i32,
        ))
        .build()
        .map_err(|e| RecordingError::StartFailed(format!("Invalid video info: {}", e)))?;

        let caps = info
            .to_caps()
            .map_err(|e| RecordingError::StartFailed(format!("Invalid caps: {}", e)))?;

        let appsrc = make_element("appsrc")?
            .downcast::<AppSrc>()
            .map_err(|_| RecordingError::StartFailed("Failed to downcast to AppSrc".into()))?;
        appsrc.set_caps(Some(&caps));
        appsrc.set_format(gst::Format::Time);
        appsrc.set_is_live(false);
        appsrc.set_do_timestamp(false);

        let videoconvert = make_element("videoconvert")?;
        let encoder = make_element(codec.encoder_element())?;
        configure_encoder(&encoder, codec, bitrate_preset, dimensions);

        let parser = match codec.parser_element() {
            Some(name) => match gst::ElementFactory::make(name).build() {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!(parser = name, %e, "Parser unavailable, linking encoder directly");
                    None
                }
            },
            None => None,
        };

        let muxer = make_element(codec.muxer_element())?;
        if muxer.has_property("streamable") {
            muxer.set_property("streamable", false);
        }

        let filesink = gst::ElementFactory::make("filesink")
            .property("location", output_path.to_string_lossy().to_string())
            .build()
            .map_err(|e| {
                RecordingError::StartFailed(format!("Failed to create filesink: {}", e))
            })?;

        let mut chain: Vec<&gst::Element> = vec![appsrc.upcast_ref(), &videoconvert, &encoder];
        if let Some(parser) = parser.as_ref() {
            chain.push(parser);
        }
        chain.push(&muxer);
        chain.push(&filesink);

        let pipeline = gst::Pipeline::new();
        pipeline
            .add_many(chain.iter().copied())
            .map_err(|e| RecordingError::StartFailed(format!("Failed to add elements: {}", e)))?;
        gst::Element::link_many(chain.iter().copied())
            .map_err(|e| RecordingError::StartFailed(format!("Failed to link elements: {}", e)))?;

        if let Err(e) = pipeline.set_state(gst::State::Playing) {
            let reason = take_bus_error(&pipeline).unwrap_or_else(|| format!("{:?}", e));
            let _ = pipeline.set_state(gst::State::Null);
            return Err(RecordingError::StartFailed(reason));
        }

        Ok(Self {
            pipeline,
            appsrc,
            info,
            framerate,
            dimensions,
            output_path,
            frames_pushed: 0,
            finished: false,
        })
    }

    /// Copy the frame's rows into a buffer laid out for the appsrc caps
    fn build_buffer(&self, frame: &CameraFrame) -> RecordingResult<gst::Buffer> {
        let dst_stride = self.info.stride()[0] as usize;
        let row_bytes = frame.row_bytes();

        let mut buffer = gst::Buffer::with_size(self.info.size())
            .map_err(|e| RecordingError::WriteFailed(format!("Failed to allocate buffer: {}", e)))?;
        {
            let buffer_ref = buffer.get_mut().ok_or_else(|| {
                RecordingError::WriteFailed("Failed to get mutable buffer reference".into())
            })?;

            let pts = self.framerate.timestamp_ns(self.frames_pushed);
            let next = self.framerate.timestamp_ns(self.frames_pushed + 1);
            buffer_ref.set_pts(gst::ClockTime::from_nseconds(pts));
            buffer_ref.set_duration(gst::ClockTime::from_nseconds(next - pts));

            let mut map = buffer_ref
                .map_writable()
                .map_err(|e| RecordingError::WriteFailed(format!("Failed to map buffer: {}", e)))?;

            let mut rows = 0;
            for (dst, src) in map.chunks_mut(dst_stride).zip(frame.rows()) {
                if src.len() != row_bytes {
                    break;
                }
                dst[..row_bytes].copy_from_slice(src);
                rows += 1;
            }
            if rows != frame.height as usize {
                return Err(RecordingError::WriteFailed(format!(
                    "Frame data holds {} of {} rows",
                    rows, frame.height
                )));
            }
        }
        Ok(buffer)
    }

    /// Send EOS and wait for the muxer to write its trailer
    fn finalize(&mut self) -> RecordingResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        debug!(path = %self.output_path.display(), "Sending EOS to video writer");
        let eos_result = self.appsrc.end_of_stream();

        let mut outcome = Ok(());
        if let Err(e) = eos_result {
            outcome = Err(RecordingError::FinalizeFailed(format!(
                "Failed to send EOS: {:?}",
                e
            )));
        } else if let Some(bus) = self.pipeline.bus() {
            match bus.timed_pop_filtered(
                gst::ClockTime::from_seconds(timing::FINALIZE_TIMEOUT_SECS),
                &[gst::MessageType::Eos, gst::MessageType::Error],
            ) {
                Some(msg) => {
                    if let gst::MessageView::Error(err) = msg.view() {
                        outcome = Err(RecordingError::FinalizeFailed(err.error().to_string()));
                    }
                }
                None => {
                    warn!(
                        timeout_secs = timing::FINALIZE_TIMEOUT_SECS,
                        "Timed out waiting for the muxer to finish, file may be truncated"
                    );
                }
            }
        }

        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            warn!(?e, "Failed to set writer pipeline to Null");
        }

        outcome
    }
}

impl FrameWriter for GstVideoWriter {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn path(&self) -> &Path {
        &self.output_path
    }

    fn write_frame(&mut self, frame: &CameraFrame) -> RecordingResult<()> {
        if self.finished {
            return Err(RecordingError::WriteFailed("writer already closed".into()));
        }
        if frame.dimensions() != self.dimensions {
            return Err(RecordingError::DimensionMismatch {
                expected: self.dimensions,
                actual: frame.dimensions(),
            });
        }

        let buffer = if frame.format == PixelFormat::BGR24 {
            self.build_buffer(frame)?
        } else {
            let bgr = convert_frame(frame, PixelFormat::BGR24)
                .map_err(|e| RecordingError::WriteFailed(e.to_string()))?;
            self.build_buffer(&bgr)?
        };

        self.appsrc.push_buffer(buffer).map_err(|e| {
            let reason = take_bus_error(&self.pipeline).unwrap_or_else(|| format!("{:?}", e));
            RecordingError::WriteFailed(reason)
        })?;

        self.frames_pushed += 1;
        if self.frames_pushed % timing::FRAME_LOG_INTERVAL == 0 {
            debug!(frames = self.frames_pushed, "Frames pushed to video writer");
        }
        Ok(())
    }

    fn finish(mut self) -> RecordingResult<PathBuf> {
        self.finalize()?;
        info!(
            path = %self.output_path.display(),
            frames = self.frames_pushed,
            "Video file finalized"
        );
        Ok(self.output_path.clone())
    }
}

impl Drop for GstVideoWriter {
    fn drop(&mut self) {
        if !self.finished {
            debug!("Video writer dropped without finish, finalizing");
            if let Err(e) = self.finalize() {
                error!(error = %e, "Failed to finalize video on drop");
            }
        }
    }
}

fn make_element(name: &str) -> RecordingResult<gst::Element> {
    gst::ElementFactory::make(name)
        .build()
        .map_err(|e| RecordingError::EncoderNotAvailable(format!("{}: {}", name, e)))
}

/// Apply bitrate and latency settings the element understands
fn configure_encoder(
    encoder: &gst::Element,
    codec: Codec,
    preset: BitratePreset,
    dimensions: Dimensions,
) {
    let bitrate_kbps = preset.bitrate_kbps(dimensions.width, dimensions.height);

    match codec {
        Codec::Mjpeg => {
            let quality = match preset {
                BitratePreset::Low => 60,
                BitratePreset::Medium => 85,
                BitratePreset::High => 95,
            };
            if encoder.has_property("quality") {
                encoder.set_property("quality", quality);
            }
            debug!(quality, "Configured jpegenc");
        }
        Codec::Xvid => {
            // avenc_* takes bits per second
            if encoder.has_property("bitrate") {
                let _ = encoder
                    .set_property_from_str("bitrate", &(bitrate_kbps as u64 * 1000).to_string());
            }
            debug!(bitrate_kbps, "Configured avenc_mpeg4");
        }
        Codec::H264 => {
            let _ = encoder.set_property_from_str("speed-preset", "veryfast");
            let _ = encoder.set_property_from_str("tune", "zerolatency");
            if encoder.has_property("bitrate") {
                encoder.set_property("bitrate", bitrate_kbps);
            }
            debug!(bitrate_kbps, "Configured x264enc");
        }
    }
}
