// SPDX-License-Identifier: GPL-3.0-only

//! Pixel format conversion and resampling
//!
//! Sources deliver BGR. Display sinks want RGB(A), and the recorder wants
//! frames at its configured size. Both conversions run on the CPU and always
//! produce tightly packed, copied frames.

use crate::backends::camera::types::{
    BackendError, BackendResult, CameraFrame, Dimensions, FrameData, PixelFormat,
};
use image::{ImageBuffer, Rgb, imageops};

/// Convert a frame to `target` channel order
///
/// Returns a cheap clone when the frame is already in the target format.
pub fn convert_frame(frame: &CameraFrame, target: PixelFormat) -> BackendResult<CameraFrame> {
    if frame.format == target {
        return Ok(frame.clone());
    }

    let pixels = (frame.width * frame.height) as usize;
    let mut out = Vec::with_capacity(pixels * target.bytes_per_pixel() as usize);
    let src_bpp = frame.format.bytes_per_pixel() as usize;

    for row in frame.rows() {
        for px in row.chunks_exact(src_bpp) {
            let (r, g, b) = match frame.format {
                PixelFormat::BGR24 => (px[2], px[1], px[0]),
                PixelFormat::RGB24 | PixelFormat::RGBA => (px[0], px[1], px[2]),
                PixelFormat::Gray8 => (px[0], px[0], px[0]),
            };
            match target {
                PixelFormat::BGR24 => out.extend_from_slice(&[b, g, r]),
                PixelFormat::RGB24 => out.extend_from_slice(&[r, g, b]),
                PixelFormat::RGBA => out.extend_from_slice(&[r, g, b, 255]),
                PixelFormat::Gray8 => out.push(luma(r, g, b)),
            }
        }
    }

    if out.len() != pixels * target.bytes_per_pixel() as usize {
        return Err(BackendError::FormatNotSupported(format!(
            "Frame data too short for {}x{} {}",
            frame.width, frame.height, frame.format
        )));
    }

    Ok(CameraFrame {
        data: FrameData::from(out),
        format: target,
        stride: frame.width * target.bytes_per_pixel(),
        ..frame.clone()
    })
}

/// Scale a 3-channel frame to `size`, keeping its channel order
pub fn resize_frame(frame: &CameraFrame, size: Dimensions) -> BackendResult<CameraFrame> {
    if frame.dimensions() == size {
        return Ok(frame.clone());
    }
    if size.is_empty() {
        return Err(BackendError::FormatNotSupported(format!(
            "Cannot resample to {}",
            size
        )));
    }
    if frame.format.bytes_per_pixel() != 3 {
        return Err(BackendError::FormatNotSupported(format!(
            "Resampling needs a 3-channel frame, got {}",
            frame.format
        )));
    }

    // The filter is channel-agnostic, so BGR data can go through an Rgb buffer
    let image: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_raw(frame.width, frame.height, frame.packed_data()).ok_or_else(|| {
            BackendError::FormatNotSupported(format!(
                "Frame data too short for {}x{}",
                frame.width, frame.height
            ))
        })?;

    let resized = imageops::resize(
        &image,
        size.width,
        size.height,
        imageops::FilterType::Triangle,
    );

    Ok(CameraFrame {
        width: size.width,
        height: size.height,
        stride: size.width * 3,
        data: FrameData::from(resized.into_raw()),
        ..frame.clone()
    })
}

/// BT.601 luma
fn luma(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32)
        .round()
        .clamp(0.0, 255.0) as u8
}
