// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as JSON in `$XDG_CONFIG_HOME/camera-studio/config.json`. Every field
//! has a default so partial files load, and a missing or broken file falls
//! back to the defaults.

use crate::backends::camera::CameraSource;
use crate::backends::camera::types::{Dimensions, Framerate};
use crate::constants::{self, BitratePreset, Codec, timing};
use crate::errors::AppResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// What to do with live frames whose size differs from the recording size
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum DimensionPolicy {
    /// Scale the frame to the recording size
    #[default]
    Resample,
    /// Refuse to write the frame
    Reject,
}

/// Output file settings, fixed when a recording starts
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Codec FourCC, decides the container too
    pub codec: Codec,
    /// Output frame rate
    pub framerate: u32,
    /// Output width
    pub width: u32,
    /// Output height
    pub height: u32,
    /// Handling of frames that do not match `width`x`height`
    pub dimension_policy: DimensionPolicy,
    /// Encoder bitrate preset (XVID and H.264 only)
    pub bitrate_preset: BitratePreset,
}

impl RecordingConfig {
    pub fn framerate(&self) -> Framerate {
        Framerate::from_int(self.framerate)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            codec: Codec::default(),
            framerate: constants::DEFAULT_RECORDING_FPS,
            width: constants::DEFAULT_RECORDING_WIDTH,
            height: constants::DEFAULT_RECORDING_HEIGHT,
            dimension_policy: DimensionPolicy::default(),
            bitrate_preset: BitratePreset::default(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Live source for the studio: device index ("0") or stream URL
    pub source: String,
    /// Stream URL for the stream viewer
    pub stream_url: String,
    /// Live capture tick in milliseconds
    pub capture_interval_ms: u64,
    /// Playback frame rate
    pub playback_fps: u32,
    /// How long a blocking read waits before the stream is considered stalled
    pub read_timeout_ms: u64,
    /// How long shutdown waits for the decode thread
    pub decode_shutdown_timeout_ms: u64,
    /// Folder under the user's video directory for recordings
    pub save_folder: String,
    /// Recording output settings
    pub recording: RecordingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: "0".to_string(),
            stream_url: constants::DEFAULT_STREAM_URL.to_string(),
            capture_interval_ms: constants::DEFAULT_CAPTURE_INTERVAL_MS,
            playback_fps: constants::DEFAULT_PLAYBACK_FPS,
            read_timeout_ms: timing::DEFAULT_READ_TIMEOUT_MS,
            decode_shutdown_timeout_ms: timing::DEFAULT_DECODE_SHUTDOWN_TIMEOUT_MS,
            save_folder: constants::DEFAULT_SAVE_FOLDER.to_string(),
            recording: RecordingConfig::default(),
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(constants::CONFIG_DIR_NAME)
                .join(constants::CONFIG_FILE_NAME)
        })
    }

    /// Load from an explicit path
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load from `path` (or the default location), falling back to defaults
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            debug!("No config directory, using defaults");
            return Self::default();
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                Self::default()
            }
        }
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Parsed studio source
    pub fn camera_source(&self) -> CameraSource {
        self.source.parse().unwrap_or_default()
    }

    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms.max(1))
    }

    pub fn playback_framerate(&self) -> Framerate {
        Framerate::from_int(self.playback_fps)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn decode_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.decode_shutdown_timeout_ms)
    }
}
