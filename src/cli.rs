// SPDX-License-Identifier: GPL-3.0-only

//! Non-interactive commands

use camera_studio::app::{CaptureController, DiscardSink, ReadFailurePolicy, TickOutcome, Ticker};
use camera_studio::backends::camera::{CameraSource, FrameSource, GstFrameSource};
use camera_studio::config::Config;
use camera_studio::pipelines::video::{GstWriterFactory, RecordingSession};
use camera_studio::storage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Record the live source to a file for `duration` seconds (or until Ctrl+C)
pub fn record_video(
    config: &Config,
    source: &CameraSource,
    duration: u64,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let camera = GstFrameSource::open(source)?;
    println!("Using source: {}", source);
    if let Some(dims) = camera.dimensions() {
        println!("Source format: {}", dims);
    }

    let recording = &config.recording;
    let output_path = storage::recording_path(
        output.as_deref(),
        &storage::video_directory(&config.save_folder),
        recording.codec,
    );

    println!(
        "Recording format: {} @ {}fps ({}, {} bitrate)",
        recording.dimensions(),
        recording.framerate,
        recording.codec,
        recording.bitrate_preset.display_name()
    );
    println!("Duration: {} seconds", duration);

    let session = RecordingSession::new(
        GstWriterFactory::new(recording.codec, recording.bitrate_preset),
        recording.dimension_policy,
    );
    let mut capture = CaptureController::new(
        Some(camera),
        session,
        ReadFailurePolicy::SkipTransient,
        config.read_timeout(),
    );
    capture.start_recording(&output_path, recording.framerate(), recording.dimensions())?;
    if let Some(path) = capture.recording().output_path() {
        println!("Output: {}", path.display());
    }

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!();
    println!("Recording... (press Ctrl+C to stop early)");

    let start = Instant::now();
    let target_duration = Duration::from_secs(duration);
    let mut ticker = Ticker::new(config.capture_interval(), start);
    let mut last_progress = 0;

    while start.elapsed() < target_duration {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }

        let now = Instant::now();
        if ticker.fire(now) && capture.tick(&mut DiscardSink) == TickOutcome::EndOfStream {
            println!();
            println!("Source ended");
            break;
        }

        let elapsed = start.elapsed().as_secs();
        if elapsed != last_progress || capture.frames_captured() == 1 {
            last_progress = elapsed;
            print!(
                "\rRecording: {:02}:{:02} ({} frames)",
                elapsed / 60,
                elapsed % 60,
                capture.recording().frames_written()
            );
            std::io::Write::flush(&mut std::io::stdout())?;
        }

        std::thread::sleep(ticker.remaining(Instant::now()));
    }
    println!();

    if let Some(problem) = capture.take_error() {
        eprintln!("Warning: {}", problem);
    }

    // The source may have ended and finalized the file already
    let summary = match capture.take_finished() {
        Some(summary) => Some(summary),
        None => capture.stop_recording()?,
    };
    match summary {
        Some(summary) => {
            println!(
                "Video saved: {} ({} frames)",
                summary.path.display(),
                summary.frames_written
            );
            if summary.frames_failed > 0 {
                eprintln!("Warning: {} frames could not be written", summary.frames_failed);
            }
        }
        None => eprintln!("Warning: no recording was finalized"),
    }

    Ok(())
}

/// Print the effective configuration, optionally writing it to disk
pub fn show_config(
    config: &Config,
    path: Option<&Path>,
    write_default: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(config)?);

    if write_default {
        let target = path
            .map(Path::to_path_buf)
            .or_else(Config::default_path)
            .ok_or("No configuration directory available")?;
        config.save_to(&target)?;
        println!();
        println!("Configuration written to {}", target.display());
    }

    Ok(())
}
