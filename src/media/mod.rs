// SPDX-License-Identifier: GPL-3.0-only

//! Media utilities for playback and display
//!
//! - [`decoders`]: video file decoding for playback
//! - [`formats`]: channel-order conversion and resampling
//! - [`frame_buffer`]: append-only playback buffer with a read cursor

pub mod decoders;
pub mod formats;
pub mod frame_buffer;

pub use decoders::{FrameDecoder, VideoFileDecoder};
pub use formats::{convert_frame, resize_frame};
pub use frame_buffer::FrameBuffer;
