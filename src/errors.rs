// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the camera studio

use std::fmt;

use crate::backends::camera::types::{BackendError, Dimensions};

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type for recording operations
pub type RecordingResult<T> = Result<T, RecordingError>;

/// Result type for playback operations
pub type PlaybackResult<T> = Result<T, PlaybackError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Live source errors
    Source(BackendError),
    /// Recording-related errors
    Recording(RecordingError),
    /// Playback-related errors
    Playback(PlaybackError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
}

/// Recording-specific errors
#[derive(Debug, Clone)]
pub enum RecordingError {
    /// Recording already in progress
    AlreadyRecording,
    /// No live source to record from
    NoSource,
    /// Encoder, muxer or sink element not available
    EncoderNotAvailable(String),
    /// Failed to open the output writer
    StartFailed(String),
    /// Frame size differs from the writer size and the policy rejects it
    DimensionMismatch {
        expected: Dimensions,
        actual: Dimensions,
    },
    /// Failed to hand a frame to the writer
    WriteFailed(String),
    /// Failed to flush and close the output file
    FinalizeFailed(String),
}

/// Playback-specific errors
#[derive(Debug, Clone)]
pub enum PlaybackError {
    /// A playback is already decoding or draining
    AlreadyPlaying,
    /// The file does not exist
    FileMissing(String),
    /// The file exists but cannot be decoded
    Unreadable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Source(e) => write!(f, "Source error: {}", e),
            AppError::Recording(e) => write!(f, "Recording error: {}", e),
            AppError::Playback(e) => write!(f, "Playback error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingError::AlreadyRecording => write!(f, "Recording already in progress"),
            RecordingError::NoSource => write!(f, "No camera available to record from"),
            RecordingError::EncoderNotAvailable(msg) => write!(f, "Encoder not available: {}", msg),
            RecordingError::StartFailed(msg) => write!(f, "Failed to start recording: {}", msg),
            RecordingError::DimensionMismatch { expected, actual } => write!(
                f,
                "Frame size {} does not match recording size {}",
                actual, expected
            ),
            RecordingError::WriteFailed(msg) => write!(f, "Failed to write frame: {}", msg),
            RecordingError::FinalizeFailed(msg) => write!(f, "Failed to finalize recording: {}", msg),
        }
    }
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackError::AlreadyPlaying => write!(f, "Playback already in progress"),
            PlaybackError::FileMissing(path) => write!(f, "File not found: {}", path),
            PlaybackError::Unreadable(msg) => write!(f, "Cannot read video: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for RecordingError {}
impl std::error::Error for PlaybackError {}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Source(err)
    }
}

impl From<RecordingError> for AppError {
    fn from(err: RecordingError) -> Self {
        AppError::Recording(err)
    }
}

impl From<PlaybackError> for AppError {
    fn from(err: PlaybackError) -> Self {
        AppError::Playback(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
