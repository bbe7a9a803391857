// SPDX-License-Identifier: GPL-3.0-only

use camera_studio::backends::camera::CameraSource;
use camera_studio::backends::camera::types::Framerate;
use camera_studio::config::Config;
use camera_studio::constants::{BitratePreset, Codec};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-studio")]
#[command(about = "Terminal camera viewer, recorder and player")]
#[command(version = camera_studio::constants::app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    /// Configuration file (default: ~/.config/camera-studio/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// View a network stream or camera until quit
    Stream {
        /// Stream URL or device index (default: stream_url from the config)
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Preview, record and play back (default)
    Studio {
        /// Camera device index or URL (default: source from the config)
        #[arg(short, long)]
        source: Option<String>,

        /// Recording output path (default: ~/Videos/Camera/video_TIMESTAMP.avi)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// File for the play action before anything has been recorded
        #[arg(short, long)]
        play: Option<PathBuf>,

        /// Recording codec: MJPG, XVID or H264 (default: from the config)
        #[arg(long)]
        codec: Option<Codec>,

        /// Encoder bitrate preset: low, medium or high (default: from the config)
        #[arg(long)]
        bitrate: Option<BitratePreset>,
    },

    /// Play a video file in the terminal
    Play {
        /// Video file
        file: PathBuf,

        /// Playback frame rate (default: playback_fps from the config)
        #[arg(short, long)]
        fps: Option<u32>,
    },

    /// Record without a display
    Record {
        /// Camera device index or URL (default: source from the config)
        #[arg(short, long)]
        source: Option<String>,

        /// Recording duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Output file path (default: ~/Videos/Camera/video_TIMESTAMP.avi)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Recording codec: MJPG, XVID or H264 (default: from the config)
        #[arg(long)]
        codec: Option<Codec>,

        /// Encoder bitrate preset: low, medium or high (default: from the config)
        #[arg(long)]
        bitrate: Option<BitratePreset>,
    },

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        write_default: bool,
    },
}

fn main() {
    // Logs go to stderr, keeping them out of stdout and piped output. Under the
    // terminal UI stderr is the same tty, so per-frame paths log at debug.
    // Examples: RUST_LOG=debug, RUST_LOG=camera_studio=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load(cli.config.as_deref());

    match cli.command {
        Some(Commands::Stream { url }) => {
            let source = parse_source(url.as_deref().unwrap_or(&config.stream_url))?;
            camera_studio::terminal::run_stream(&config, &source)
        }
        Some(Commands::Studio {
            source,
            output,
            play,
            codec,
            bitrate,
        }) => {
            override_recording(&mut config, codec, bitrate);
            let source = resolve_source(source.as_deref(), &config)?;
            camera_studio::terminal::run_studio(&config, &source, output, play)
        }
        Some(Commands::Play { file, fps }) => {
            let framerate = fps.map_or_else(|| config.playback_framerate(), Framerate::from_int);
            camera_studio::terminal::run_play(&config, &file, framerate)
        }
        Some(Commands::Record {
            source,
            duration,
            output,
            codec,
            bitrate,
        }) => {
            override_recording(&mut config, codec, bitrate);
            let source = resolve_source(source.as_deref(), &config)?;
            cli::record_video(&config, &source, duration, output)
        }
        Some(Commands::Config { write_default }) => {
            cli::show_config(&config, cli.config.as_deref(), write_default)
        }
        None => {
            let source = resolve_source(None, &config)?;
            camera_studio::terminal::run_studio(&config, &source, None, None)
        }
    }
}

fn override_recording(config: &mut Config, codec: Option<Codec>, bitrate: Option<BitratePreset>) {
    if let Some(codec) = codec {
        config.recording.codec = codec;
    }
    if let Some(bitrate) = bitrate {
        config.recording.bitrate_preset = bitrate;
    }
}

fn parse_source(text: &str) -> Result<CameraSource, Box<dyn std::error::Error>> {
    Ok(text.parse::<CameraSource>()?)
}

fn resolve_source(
    arg: Option<&str>,
    config: &Config,
) -> Result<CameraSource, Box<dyn std::error::Error>> {
    match arg {
        Some(text) => parse_source(text),
        None => Ok(config.camera_source()),
    }
}
