// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle for backend delivery loops
//!
//! Every backend that pushes frames does it from a dedicated thread running
//! one step per frame interval. This controller owns that thread: a shared
//! stop flag checked before every step, and a bounded stop that never holds
//! a closing session hostage to a wedged driver call.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long to wait between finish checks while stopping
const STOP_POLL: Duration = Duration::from_millis(2);

/// Action returned by a delivery step to control the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryAction {
    /// Run another step
    Continue,
    /// Exit the loop
    Stop,
}

/// Controller for a delivery loop running in its own thread
pub struct DeliveryLoop {
    handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl DeliveryLoop {
    /// Spawn a thread calling `step` until it returns
    /// [`DeliveryAction::Stop`] or a stop is requested
    pub fn spawn<F>(name: &str, mut step: F) -> Self
    where
        F: FnMut() -> DeliveryAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_in_thread = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, "Starting delivery loop");

        let handle = thread::spawn(move || {
            debug!(name = %thread_name, "Delivery thread started");
            loop {
                if stop_in_thread.load(Ordering::SeqCst) {
                    break;
                }
                match step() {
                    DeliveryAction::Continue => {}
                    DeliveryAction::Stop => {
                        debug!(name = %thread_name, "Delivery loop requested stop");
                        break;
                    }
                }
            }
            debug!(name = %thread_name, "Delivery thread exiting");
        });

        Self {
            handle: Some(handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Set the stop flag without waiting
    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Whether the thread is still running
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// Stop the loop, waiting at most `grace` for the thread to finish
    ///
    /// A thread that misses the deadline is detached with a warning; the
    /// stop flag makes any remaining steps exit at the next check.
    pub fn stop_within(&mut self, grace: Duration) {
        self.request_stop();

        let deadline = Instant::now() + grace;
        while let Some(handle) = &self.handle {
            if handle.is_finished() || Instant::now() >= deadline {
                break;
            }
            thread::sleep(STOP_POLL);
        }

        if let Some(handle) = self.handle.take() {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    warn!(name = %self.name, "Delivery thread panicked: {:?}", e);
                }
            } else {
                warn!(
                    name = %self.name,
                    grace_ms = grace.as_millis() as u64,
                    "Delivery thread missed the stop deadline, detaching"
                );
            }
        }
    }

    /// Wait for the thread to finish without a deadline
    ///
    /// For loops that stop themselves via [`DeliveryAction::Stop`].
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.join()
        {
            warn!(name = %self.name, "Delivery thread panicked: {:?}", e);
        }
    }
}

impl Drop for DeliveryLoop {
    fn drop(&mut self) {
        if self.handle.is_some() {
            debug!(name = %self.name, "DeliveryLoop dropped, stopping thread");
            self.request_stop();
            self.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn loop_runs_until_it_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_in_loop = Arc::clone(&counter);

        let mut delivery = DeliveryLoop::spawn("test-loop", move || {
            if counter_in_loop.fetch_add(1, Ordering::SeqCst) >= 10 {
                DeliveryAction::Stop
            } else {
                DeliveryAction::Continue
            }
        });

        delivery.join();
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn stop_flag_ends_the_loop() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_in_loop = Arc::clone(&counter);

        let mut delivery = DeliveryLoop::spawn("test-stop", move || {
            counter_in_loop.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            DeliveryAction::Continue
        });

        thread::sleep(Duration::from_millis(30));
        delivery.stop_within(Duration::from_millis(500));

        assert!(!delivery.is_running());
        assert!(counter.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn stop_within_detaches_a_slow_thread() {
        let mut delivery = DeliveryLoop::spawn("test-slow", move || {
            thread::sleep(Duration::from_millis(400));
            DeliveryAction::Continue
        });

        let start = Instant::now();
        delivery.stop_within(Duration::from_millis(20));

        // Returned well before the sleeping step could have finished
        assert!(start.elapsed() < Duration::from_millis(300));
    }
}
