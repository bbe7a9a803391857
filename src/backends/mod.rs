// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for live capture
//!
//! The backend layer hides how frames are obtained, so the capture
//! controller sees the same API for a local camera and a network stream:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Capture Controller              │
//! └────────────────────┬────────────────────────┘
//!                      │ FrameSource
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐    ┌──────────────────┐   │
//! │  │   v4l2src   │    │  uridecodebin    │   │
//! │  │  (device)   │    │  (stream URL)    │   │
//! │  └─────────────┘    └──────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Frame types, the frame source trait and its GStreamer
//!   implementation

pub mod camera;
