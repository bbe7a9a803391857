// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use camera_studio::Config;
use camera_studio::backends::camera::CameraSource;
use camera_studio::backends::camera::types::{Dimensions, Framerate};
use camera_studio::config::DimensionPolicy;
use camera_studio::constants::Codec;
use camera_studio::errors::AppError;
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.camera_source(), CameraSource::Device(0));
    assert_eq!(config.capture_interval(), Duration::from_millis(33));
    assert_eq!(config.playback_framerate(), Framerate::from_int(20));
    assert_eq!(config.recording.codec, Codec::Mjpeg);
    assert_eq!(config.recording.framerate(), Framerate::from_int(20));
    assert_eq!(config.recording.dimensions(), Dimensions::new(640, 480));
    assert_eq!(config.recording.dimension_policy, DimensionPolicy::Resample);
}

#[test]
fn test_config_roundtrip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.source = "rtsp://camera.local/stream".into();
    config.recording.codec = Codec::H264;
    config.recording.dimension_policy = DimensionPolicy::Reject;

    config.save_to(&path).unwrap();
    let loaded = Config::load_from(&path).unwrap();

    assert_eq!(loaded, config);
    assert_eq!(
        loaded.camera_source(),
        CameraSource::Url("rtsp://camera.local/stream".into())
    );
}

#[test]
fn test_partial_file_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "playback_fps": 30, "recording": { "width": 320 } }"#).unwrap();

    let config = Config::load(Some(path.as_path()));

    assert_eq!(config.playback_fps, 30);
    assert_eq!(config.recording.width, 320);
    assert_eq!(config.recording.height, 480);
    assert_eq!(config.save_folder, Config::default().save_folder);
}

#[test]
fn test_invalid_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "not json").unwrap();

    assert!(Config::load_from(&path).is_err());
    assert_eq!(Config::load(Some(path.as_path())), Config::default());
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(Some(dir.path().join("absent.json").as_path()));
    assert_eq!(config, Config::default());
}

#[test]
fn test_zero_playback_fps_still_has_an_interval() {
    let config = Config {
        playback_fps: 0,
        ..Config::default()
    };
    assert!(config.playback_framerate().frame_interval() > Duration::ZERO);
}

#[test]
fn test_save_into_a_file_path_is_a_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();

    let err = Config::default()
        .save_to(&blocker.join("config.json"))
        .unwrap_err();
    assert!(matches!(err, AppError::Storage(_)), "{:?}", err);
}
