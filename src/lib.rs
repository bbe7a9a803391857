// SPDX-License-Identifier: GPL-3.0-only

//! Camera Studio - terminal camera viewer, recorder and player
//!
//! This library provides live capture from cameras and network streams,
//! recording to video files and paced playback of recordings.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Capture controller, playback engine and the studio model
//! - [`backends`]: Frame sources (GStreamer cameras and streams)
//! - [`media`]: File decoding, pixel conversion and the playback buffer
//! - [`pipelines`]: Recording sessions and the video file writer
//! - [`config`]: User configuration handling
//! - [`storage`]: Recording locations
//! - [`terminal`]: Terminal front end
//!
//! # Example
//!
//! ```ignore
//! // Preview and record from /dev/video0:
//! // camera-studio studio --source 0
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;
pub mod pipelines;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::{Message, Studio};
pub use config::Config;
pub use constants::{BitratePreset, Codec};
