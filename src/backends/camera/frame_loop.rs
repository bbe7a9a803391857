// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for background frame loops
//!
//! Playback decodes on its own thread. This module owns that thread: it
//! starts the loop, lets the loop sleep in a way a stop request can cut
//! short, and stops it without ever blocking shutdown indefinitely.

use crate::constants::timing::STOP_POLL_INTERVAL;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Action returned by the loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Shared stop flag handed to the loop body
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless a stop is requested first
    ///
    /// Returns `false` if the sleep was cut short by a stop request.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(STOP_POLL_INTERVAL));
        }
    }
}

/// Controller for a loop running in a separate thread
///
/// # Example
///
/// ```ignore
/// let controller = FrameLoopController::start("playback-decode", move |stop| {
///     match decoder.next_frame() {
///         Ok(Some(frame)) => {
///             sender.unbounded_send(frame).ok();
///             if stop.sleep(interval) { LoopAction::Continue } else { LoopAction::Stop }
///         }
///         _ => LoopAction::Stop,
///     }
/// });
///
/// // Later, on shutdown
/// controller.shutdown(Duration::from_millis(500));
/// ```
pub struct FrameLoopController {
    /// Thread handle for joining
    thread_handle: Option<JoinHandle<()>>,
    /// Signal to stop the loop
    stop_signal: StopSignal,
    /// Name for logging
    name: String,
}

impl FrameLoopController {
    /// Start a new loop in a separate thread
    ///
    /// The closure is called repeatedly until it returns `LoopAction::Stop`
    /// or a stop is requested.
    pub fn start<F>(name: &str, mut loop_fn: F) -> Self
    where
        F: FnMut(&StopSignal) -> LoopAction + Send + 'static,
    {
        let stop_signal = StopSignal::new();
        let thread_signal = stop_signal.clone();
        let thread_name = name.to_string();

        info!(name = %name, "Starting frame loop");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!(name = %thread_name, "Frame loop thread started");

                loop {
                    if thread_signal.is_requested() {
                        debug!(name = %thread_name, "Stop signal received");
                        break;
                    }

                    if loop_fn(&thread_signal) == LoopAction::Stop {
                        debug!(name = %thread_name, "Loop requested stop");
                        break;
                    }
                }

                info!(name = %thread_name, "Frame loop thread exiting");
            });

        let thread_handle = match thread_handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(name = %name, error = %e, "Failed to spawn frame loop thread");
                None
            }
        };

        Self {
            thread_handle,
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop (non-blocking)
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting frame loop stop");
        self.stop_signal.request();
    }

    /// Request a stop and wait at most `timeout` for the thread to exit
    ///
    /// Returns `true` if the thread finished and was joined. A thread still
    /// running after the timeout is detached.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        self.request_stop();

        let Some(handle) = self.thread_handle.take() else {
            return true;
        };

        let deadline = Instant::now() + timeout;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(STOP_POLL_INTERVAL);
        }

        if !handle.is_finished() {
            warn!(name = %self.name, ?timeout, "Frame loop did not stop in time, detaching");
            return false;
        }

        if let Err(e) = handle.join() {
            warn!(name = %self.name, "Frame loop thread panicked: {:?}", e);
        } else {
            debug!(name = %self.name, "Frame loop thread finished");
        }
        true
    }
}

impl Drop for FrameLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "FrameLoopController dropped, stopping loop");
            self.shutdown(Duration::from_millis(
                crate::constants::timing::DEFAULT_DECODE_SHUTDOWN_TIMEOUT_MS,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = FrameLoopController::start("test-loop", move |_| {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            if count >= 10 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        while controller.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }

        assert!(controller.shutdown(Duration::from_secs(1)));
        assert_eq!(counter.load(Ordering::SeqCst), 11); // 0-10 inclusive
    }

    #[test]
    fn test_stop_interrupts_sleep() {
        let mut controller = FrameLoopController::start("sleepy-loop", |stop| {
            if stop.sleep(Duration::from_secs(60)) {
                LoopAction::Continue
            } else {
                LoopAction::Stop
            }
        });

        thread::sleep(Duration::from_millis(20));
        assert!(controller.is_running());

        let started = Instant::now();
        assert!(controller.shutdown(Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_shutdown_does_not_wait_forever() {
        let mut controller = FrameLoopController::start("stuck-loop", |_| {
            // Ignores the stop signal for longer than the shutdown timeout
            thread::sleep(Duration::from_millis(300));
            LoopAction::Continue
        });

        thread::sleep(Duration::from_millis(10));
        let started = Instant::now();
        let joined = controller.shutdown(Duration::from_millis(20));
        assert!(!joined);
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[test]
    fn test_stop_signal_sleep_completes() {
        let signal = StopSignal::new();
        assert!(signal.sleep(Duration::from_millis(5)));
        signal.request();
        assert!(!signal.sleep(Duration::from_secs(60)));
    }
}
