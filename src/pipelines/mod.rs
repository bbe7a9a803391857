// SPDX-License-Identifier: GPL-3.0-only

//! Output pipelines
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Camera Frame │ ──▶ │ RecordingSession  │ ──▶ │  Video File  │
//! │    (BGR)     │     │  - pause/resume   │     │  (AVI/MP4)   │
//! │              │     │  - size policy    │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```

pub mod video;
