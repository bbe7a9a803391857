// SPDX-License-Identifier: GPL-3.0-only

//! Where recordings go

use crate::constants::{Codec, file_formats};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory recordings are saved to: `<videos>/<save_folder>`
///
/// Falls back to the home directory, then the working directory, when the
/// platform has no videos directory.
pub fn video_directory(save_folder: &str) -> PathBuf {
    dirs::video_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(save_folder)
}

/// Timestamped file name for a new recording
pub fn recording_file_name(codec: Codec) -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("video_{}.{}", timestamp, codec.extension())
}

/// Output path for a new recording
///
/// An explicit path wins; otherwise a timestamped file in `directory`.
pub fn recording_path(explicit: Option<&Path>, directory: &Path, codec: Codec) -> PathBuf {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => directory.join(recording_file_name(codec)),
    };
    debug!(path = %path.display(), "Recording path chosen");
    path
}

/// Most recently modified video in `directory`
pub fn latest_video(directory: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(directory).ok()?;

    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(file_formats::is_video_extension)
        })
        .filter_map(|path| {
            let modified = path.metadata().ok()?.modified().ok()?;
            Some((modified, path))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_uses_codec_extension() {
        let name = recording_file_name(Codec::H264);
        assert!(name.starts_with("video_"));
        assert!(name.ends_with(".mp4"));
        // video_YYYYMMDD_HHMMSS.mp4
        assert_eq!(name.len(), "video_20240101_120000.mp4".len());
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = recording_path(Some(Path::new("/tmp/take.avi")), Path::new("/videos"), Codec::Mjpeg);
        assert_eq!(path, PathBuf::from("/tmp/take.avi"));

        let path = recording_path(None, Path::new("/videos"), Codec::Mjpeg);
        assert!(path.starts_with("/videos"));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("avi"));
    }

    #[test]
    fn test_latest_video_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(latest_video(dir.path()).is_none());

        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("clip.avi"), b"x").unwrap();

        assert_eq!(latest_video(dir.path()), Some(dir.path().join("clip.avi")));
    }

    #[test]
    fn test_video_directory_ends_with_folder() {
        assert!(video_directory("Camera").ends_with("Camera"));
    }
}
