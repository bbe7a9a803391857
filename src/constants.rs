// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback rate used when none (or zero) is configured
pub const DEFAULT_PLAYBACK_FPS: u32 = 20;

/// Live capture tick (~30 ticks per second)
pub const DEFAULT_CAPTURE_INTERVAL_MS: u64 = 33;

/// Recording output defaults
pub const DEFAULT_RECORDING_FPS: u32 = 20;
pub const DEFAULT_RECORDING_WIDTH: u32 = 640;
pub const DEFAULT_RECORDING_HEIGHT: u32 = 480;

/// Stream URL used by `stream` when neither the CLI nor the config names one
pub const DEFAULT_STREAM_URL: &str = "http://192.168.3.68:8080/video";

/// Default folder name for saving recordings
pub const DEFAULT_SAVE_FOLDER: &str = "Camera";

/// Directory name under the user config dir
pub const CONFIG_DIR_NAME: &str = "camera-studio";

/// Config file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Video codec written by the recorder, identified by its FourCC tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Codec {
    /// Motion JPEG in an AVI container
    #[default]
    Mjpeg,
    /// MPEG-4 Part 2 (XVID-compatible) in an AVI container
    Xvid,
    /// H.264 in an MP4 container
    H264,
}

impl Codec {
    /// All codecs, for iteration
    pub const ALL: [Codec; 3] = [Codec::Mjpeg, Codec::Xvid, Codec::H264];

    /// FourCC tag of the codec
    pub fn fourcc(&self) -> &'static str {
        match self {
            Codec::Mjpeg => "MJPG",
            Codec::Xvid => "XVID",
            Codec::H264 => "H264",
        }
    }

    /// Parse a FourCC tag (case insensitive)
    pub fn from_fourcc(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "MJPG" | "MJPEG" => Some(Codec::Mjpeg),
            "XVID" | "DIVX" | "MP4V" => Some(Codec::Xvid),
            "H264" | "AVC1" | "X264" => Some(Codec::H264),
            _ => None,
        }
    }

    /// File extension of the container
    pub fn extension(&self) -> &'static str {
        match self {
            Codec::Mjpeg | Codec::Xvid => "avi",
            Codec::H264 => "mp4",
        }
    }

    /// GStreamer encoder element factory name
    pub fn encoder_element(&self) -> &'static str {
        match self {
            Codec::Mjpeg => "jpegenc",
            Codec::Xvid => "avenc_mpeg4",
            Codec::H264 => "x264enc",
        }
    }

    /// Optional parser element between encoder and muxer
    pub fn parser_element(&self) -> Option<&'static str> {
        match self {
            Codec::Mjpeg => None,
            Codec::Xvid => Some("mpeg4videoparse"),
            Codec::H264 => Some("h264parse"),
        }
    }

    /// GStreamer muxer element factory name
    pub fn muxer_element(&self) -> &'static str {
        match self {
            Codec::Mjpeg | Codec::Xvid => "avimux",
            Codec::H264 => "mp4mux",
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.fourcc())
    }
}

impl std::str::FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Codec::from_fourcc(s).ok_or_else(|| {
            let known: Vec<&str> = Codec::ALL.iter().map(Codec::fourcc).collect();
            format!("unknown codec '{}' (expected one of {})", s, known.join(", "))
        })
    }
}

/// Video encoder bitrate presets
///
/// Only applied to encoders with a bitrate property (XVID, H.264).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BitratePreset {
    /// Low bitrate - smaller files, reduced quality
    Low,
    /// Medium bitrate - balanced quality and file size (default)
    #[default]
    Medium,
    /// High bitrate - larger files, better quality
    High,
}

impl BitratePreset {
    /// Get all preset variants
    pub const ALL: [BitratePreset; 3] = [
        BitratePreset::Low,
        BitratePreset::Medium,
        BitratePreset::High,
    ];

    /// Get display name for the preset
    pub fn display_name(&self) -> &'static str {
        match self {
            BitratePreset::Low => "Low",
            BitratePreset::Medium => "Medium",
            BitratePreset::High => "High",
        }
    }

    /// Get bitrate in kbps for a given resolution
    ///
    /// - SD (640x480 and below): Low=1, Medium=2, High=4 Mbps
    /// - HD (up to 1280x720): Low=2.5, Medium=5, High=10 Mbps
    /// - Full HD and above: Low=4, Medium=8, High=16 Mbps
    pub fn bitrate_kbps(&self, width: u32, _height: u32) -> u32 {
        match (get_resolution_tier(width), self) {
            (ResolutionTier::SD, BitratePreset::Low) => 1_000,
            (ResolutionTier::SD, BitratePreset::Medium) => 2_000,
            (ResolutionTier::SD, BitratePreset::High) => 4_000,
            (ResolutionTier::HD, BitratePreset::Low) => 2_500,
            (ResolutionTier::HD, BitratePreset::Medium) => 5_000,
            (ResolutionTier::HD, BitratePreset::High) => 10_000,
            (ResolutionTier::FullHD, BitratePreset::Low) => 4_000,
            (ResolutionTier::FullHD, BitratePreset::Medium) => 8_000,
            (ResolutionTier::FullHD, BitratePreset::High) => 16_000,
        }
    }
}

impl std::str::FromStr for BitratePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BitratePreset::ALL
            .into_iter()
            .find(|preset| preset.display_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown bitrate preset '{}' (expected low, medium or high)", s))
    }
}

/// Resolution tiers for bitrate calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    SD,
    HD,
    FullHD,
}

/// Determine the resolution tier from the frame width
pub fn get_resolution_tier(width: u32) -> ResolutionTier {
    if width >= 1920 {
        ResolutionTier::FullHD
    } else if width > 640 {
        ResolutionTier::HD
    } else {
        ResolutionTier::SD
    }
}

/// Pipeline timing constants
pub mod timing {
    use super::Duration;

    /// Log a progress line every N frames
    pub const FRAME_LOG_INTERVAL: u64 = 100;

    /// Time allowed for a source pipeline to reach PLAYING
    pub const SOURCE_OPEN_TIMEOUT_SECS: u64 = 10;

    /// Blocking read timeout for the stream viewer
    pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5_000;

    /// Time allowed for a muxer to finalize after EOS
    pub const FINALIZE_TIMEOUT_SECS: u64 = 5;

    /// Time the decode thread is given to exit on shutdown
    pub const DEFAULT_DECODE_SHUTDOWN_TIMEOUT_MS: u64 = 500;

    /// Granularity of interruptible sleeps on background threads
    pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(10);

    /// Upper bound on how long the terminal loop blocks waiting for input
    pub const MAX_INPUT_POLL: Duration = Duration::from_millis(100);
}

/// Supported file extensions
pub mod file_formats {
    /// Container extensions the playback decoder is expected to open
    pub const VIDEO_EXTENSIONS: &[&str] = &["avi", "mp4", "mkv", "webm", "mov"];

    /// Check if an extension is a supported video format
    pub fn is_video_extension(ext: &str) -> bool {
        VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_parsing() {
        for codec in Codec::ALL {
            assert_eq!(Codec::from_fourcc(codec.fourcc()), Some(codec));
        }
        assert_eq!(Codec::from_fourcc("mjpg"), Some(Codec::Mjpeg));
        assert_eq!(Codec::from_fourcc("avc1"), Some(Codec::H264));
        assert_eq!(Codec::from_fourcc("????"), None);
    }

    #[test]
    fn test_resolution_tiers() {
        assert_eq!(get_resolution_tier(640), ResolutionTier::SD);
        assert_eq!(get_resolution_tier(1280), ResolutionTier::HD);
        assert_eq!(get_resolution_tier(3840), ResolutionTier::FullHD);
    }
}
