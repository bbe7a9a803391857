// SPDX-License-Identifier: GPL-3.0-only

//! Pixel format utilities

pub mod conversions;

pub use conversions::{convert_frame, resize_frame};
