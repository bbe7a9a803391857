// SPDX-License-Identifier: GPL-3.0-only

//! Terminal front end
//!
//! Renders frames to the terminal using Unicode half-block characters for
//! improved vertical resolution. Hosts the three interactive modes: stream
//! viewer, studio and file playback.

use crate::app::{
    CaptureController, FrameSink, Message, PlaybackEngine, PlaybackTick, ReadFailurePolicy,
    Studio, TickOutcome, Ticker,
};
use crate::backends::camera::types::{CameraFrame, Framerate, PixelFormat};
use crate::backends::camera::{CameraSource, FrameSource, GstFrameSource};
use crate::config::Config;
use crate::constants::timing;
use crate::pipelines::video::{
    GstWriterFactory, RecordingSession, VideoRecordingSession, WriterFactory,
};
use crate::storage;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    widgets::Widget,
};
use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info};

type TerminalResult = Result<(), Box<dyn std::error::Error>>;
type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Set up the terminal, run `body`, restore the terminal whatever happened
fn with_terminal<F>(body: F) -> TerminalResult
where
    F: FnOnce(&mut Term) -> TerminalResult,
{
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = body(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn recording_session(config: &Config) -> VideoRecordingSession {
    RecordingSession::new(
        GstWriterFactory::new(config.recording.codec, config.recording.bitrate_preset),
        config.recording.dimension_policy,
    )
}

/// Stream viewer: show the source until the user quits or it stops
///
/// Failing to open the source is returned before the terminal is touched.
/// A read failure ends the viewer normally; its reason is printed once the
/// terminal is restored.
pub fn run_stream(config: &Config, source: &CameraSource) -> TerminalResult {
    let camera = GstFrameSource::open(source)?;
    let description = source.to_string();

    let mut capture = CaptureController::new(
        Some(camera),
        recording_session(config),
        ReadFailurePolicy::Terminal,
        config.read_timeout(),
    );

    with_terminal(|terminal| {
        let mut widget = FrameWidget::new();
        let mut ticker = Ticker::new(config.capture_interval(), Instant::now());
        let status = format!("{} | 'q' quit", description);

        loop {
            if ticker.fire(Instant::now()) && capture.tick(&mut widget) == TickOutcome::EndOfStream
            {
                info!(frames = capture.frames_captured(), "Stream ended");
                break;
            }

            draw(terminal, &widget, &status)?;

            if let Some(key) = poll_key(ticker.remaining(Instant::now()))?
                && is_quit(&key)
            {
                break;
            }
        }
        Ok(())
    })?;

    if let Some(reason) = stream_end_message(&mut capture) {
        eprintln!("{}", reason);
    }
    Ok(())
}

/// Why the stream viewer stopped, when it was not the user quitting
fn stream_end_message<S, F>(capture: &mut CaptureController<S, F>) -> Option<String>
where
    S: FrameSource,
    F: WriterFactory,
{
    let reason = capture.take_error()?;
    Some(format!("Failed to grab frame: {}", reason))
}

/// Studio: live preview, recording and playback in one display
pub fn run_studio(
    config: &Config,
    source: &CameraSource,
    output: Option<PathBuf>,
    play: Option<PathBuf>,
) -> TerminalResult {
    // A missing camera is shown in the status line, not fatal
    let camera = match GstFrameSource::open(source) {
        Ok(camera) => Some(camera),
        Err(e) => {
            error!(%source, error = %e, "Camera unavailable");
            None
        }
    };

    let capture = CaptureController::new(
        camera,
        recording_session(config),
        ReadFailurePolicy::SkipTransient,
        // Keep the UI responsive: never wait longer than one capture interval
        config.capture_interval(),
    );
    // Without --play, `l` starts from the newest recording already on disk
    let play = play.or_else(|| storage::latest_video(&storage::video_directory(&config.save_folder)));
    let mut studio = Studio::new(capture, config, output, play);

    with_terminal(|terminal| {
        let mut widget = FrameWidget::new();
        let mut capture_ticker = Ticker::new(config.capture_interval(), Instant::now());
        let mut playback_ticker: Option<Ticker> = None;

        while !studio.should_quit() {
            let now = Instant::now();

            if capture_ticker.fire(now) {
                studio.capture_tick(&mut widget);
            }

            if !studio.playback().is_active() {
                playback_ticker = None;
            } else if playback_ticker.is_none() {
                playback_ticker = Some(Ticker::new(studio.playback_interval(), now));
            }
            if let Some(ticker) = playback_ticker.as_mut()
                && ticker.fire(now)
                && studio.playback_tick(&mut widget) == PlaybackTick::Finished
            {
                playback_ticker = None;
            }

            let indicator = studio.indicator();
            let status = if indicator.is_empty() {
                format!("{} | {}", studio.status(), STUDIO_HELP)
            } else {
                format!("{} | {} | {}", indicator, studio.status(), STUDIO_HELP)
            };
            draw(terminal, &widget, &status)?;

            let now = Instant::now();
            let wait = playback_ticker
                .as_ref()
                .map_or(capture_ticker.remaining(now), |t| {
                    t.remaining(now).min(capture_ticker.remaining(now))
                });

            if let Some(key) = poll_key(wait)?
                && let Some(message) = studio_message(&key)
            {
                studio.update(message);
            }
        }
        Ok(())
    })
}

/// Play a file to the end, or until the user quits
pub fn run_play(config: &Config, path: &Path, framerate: Framerate) -> TerminalResult {
    let mut engine = PlaybackEngine::new(config.decode_shutdown_timeout());
    engine.play(path, framerate)?;

    let name = path.display().to_string();

    with_terminal(|terminal| {
        let mut widget = FrameWidget::new();
        let mut ticker = Ticker::new(engine.frame_interval(), Instant::now());

        loop {
            if ticker.fire(Instant::now()) && engine.tick(&mut widget) == PlaybackTick::Finished {
                break;
            }

            let progress = engine.progress();
            let status = format!(
                "{} | {}/{} | 'q' quit",
                name, progress.displayed, progress.decoded
            );
            draw(terminal, &widget, &status)?;

            if let Some(key) = poll_key(ticker.remaining(Instant::now()))?
                && is_quit(&key)
            {
                engine.stop();
                break;
            }
        }
        Ok(())
    })?;

    if let Some(reason) = engine.take_failure() {
        return Err(format!("Playback ended early: {}", reason).into());
    }
    Ok(())
}

const STUDIO_HELP: &str = "r rec | s stop | p pause | l play | x stop play | q quit";

/// Map a key press to a studio action
pub fn studio_message(key: &KeyEvent) -> Option<Message> {
    if is_quit(key) {
        return Some(Message::Quit);
    }
    match key.code {
        KeyCode::Char('r') => Some(Message::StartRecording),
        KeyCode::Char('s') => Some(Message::StopRecording),
        KeyCode::Char('p') => Some(Message::TogglePause),
        KeyCode::Char('l') => Some(Message::Play),
        KeyCode::Char('x') => Some(Message::StopPlayback),
        _ => None,
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('q')
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

/// Wait up to `timeout` for a key press
fn poll_key(timeout: Duration) -> io::Result<Option<KeyEvent>> {
    if event::poll(timeout.min(timing::MAX_INPUT_POLL))?
        && let Event::Key(key) = event::read()?
        && key.kind == KeyEventKind::Press
    {
        return Ok(Some(key));
    }
    Ok(None)
}

fn draw(terminal: &mut Term, widget: &FrameWidget, status: &str) -> io::Result<()> {
    terminal.draw(|f| {
        let area = f.area();

        // Reserve bottom line for status
        let frame_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height: area.height.saturating_sub(1),
        };
        f.render_widget(widget, frame_area);

        let status_area = Rect {
            x: area.x,
            y: area.height.saturating_sub(1),
            width: area.width,
            height: 1,
        };
        f.render_widget(StatusBar { message: status }, status_area);
    })?;
    Ok(())
}

/// Widget that renders the latest frame using half-block characters
struct FrameWidget {
    frame: Option<CameraFrame>,
}

impl FrameWidget {
    fn new() -> Self {
        Self { frame: None }
    }
}

impl FrameSink for FrameWidget {
    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::RGB24
    }

    fn display(&mut self, frame: &CameraFrame) {
        self.frame = Some(frame.clone());
    }
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame.as_ref().filter(|f| f.width > 0 && f.height > 0) else {
            let msg = "Waiting for frames...";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, ratatui::style::Style::default());
            }
            return;
        };

        // Each terminal cell displays 2 vertical pixels
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        // Upper half (▀) colored with fg, lower half with bg
        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                if term_x >= area.x + area.width || term_y >= area.y + area.height {
                    continue;
                }

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(sample_pixel(frame, src_x, src_y_top));
                    cell.set_bg(sample_pixel(frame, src_x, src_y_bottom));
                }
            }
        }
    }
}

/// Color of an RGB24 pixel, black when out of range
fn sample_pixel(frame: &CameraFrame, x: u32, y: u32) -> Color {
    let x = x.min(frame.width - 1);
    let y = y.min(frame.height - 1);
    let idx = (y * frame.stride + x * 3) as usize;

    match frame.data.get(idx..idx + 3) {
        Some(px) => Color::Rgb(px[0], px[1], px[2]),
        None => Color::Black,
    }
}

struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();

        buf.set_string(
            area.x,
            area.y,
            text,
            ratatui::style::Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray),
        );
    }
}
