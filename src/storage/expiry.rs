//! Background Reaper
//!
//! This module implements the background task that retires expired keys.
//! Every sweep interval it asks its target to reap once: pop the expired
//! buckets off the expiry queue and batch-erase their keys from the store.
//!
//! ## Design
//!
//! The reaper runs on its own OS thread, which drives a current-thread Tokio
//! runtime. The loop:
//! 1. Sleeps for the sweep interval (or until shutdown is signalled)
//! 2. Runs one sweep and measures how long it took
//! 3. Sleeps for `interval - elapsed` so that slow sweeps do not push every
//!    following sweep later
//!
//! ## Lifecycle
//!
//! ```text
//!   start() ──► Running ──stop()──► Stopping ──join──► Stopped
//!                  │
//!                  └── sweep panics ──► Faulted
//! ```
//!
//! A panicking sweep is caught and logged, and the reaper stays down.
//! The cache keeps serving reads and writes; keys just stop expiring.
//! [`Reaper::stop`] reports the fault as [`CacheError::ReaperFault`].

use crate::error::{CacheError, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

/// Name given to the reaper's OS thread.
pub const REAPER_THREAD_NAME: &str = "flashcache-reaper";

/// Something the reaper can sweep.
pub trait Reap: Send + Sync + 'static {
    /// Runs one sweep.
    fn reap(&self) -> SweepStats;
}

/// Outcome of a single sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Queue entries whose bucket expired
    pub popped: usize,
    /// Keys actually removed from the store
    pub removed: usize,
}

/// Lifecycle state of a [`Reaper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaperState {
    /// Sweeping on schedule.
    Running,
    /// Shutdown requested, waiting for the thread to finish.
    Stopping,
    /// Thread has exited cleanly.
    Stopped,
    /// A sweep panicked; expiry is disabled.
    Faulted,
}

impl ReaperState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ReaperState::Running,
            1 => ReaperState::Stopping,
            2 => ReaperState::Stopped,
            _ => ReaperState::Faulted,
        }
    }
}

/// State shared between the handle and the reaper thread.
#[derive(Debug)]
struct ReaperShared {
    state: AtomicU8,
    fault: Mutex<Option<String>>,
}

impl ReaperShared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(ReaperState::Running as u8),
            fault: Mutex::new(None),
        }
    }

    fn state(&self) -> ReaperState {
        ReaperState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ReaperState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn begin_stopping(&self) {
        let _ = self.state.compare_exchange(
            ReaperState::Running as u8,
            ReaperState::Stopping as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    fn record_fault(&self, message: String) {
        *self.fault.lock().unwrap_or_else(PoisonError::into_inner) = Some(message);
        self.set_state(ReaperState::Faulted);
    }

    fn fault(&self) -> Option<String> {
        self.fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// A handle to the running reaper.
///
/// When this handle is dropped, the reaper is stopped and its thread joined.
#[derive(Debug)]
pub struct Reaper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
    handle: Option<thread::JoinHandle<()>>,
    shared: Arc<ReaperShared>,
}

impl Reaper {
    /// Starts the reaper on a dedicated thread.
    ///
    /// # Arguments
    ///
    /// * `target` - What to sweep
    /// * `interval` - Time between the start of consecutive sweeps
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ReaperSpawn`] if the runtime or the thread
    /// cannot be created.
    pub fn start<R: Reap>(target: Arc<R>, interval: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(ReaperShared::new());
        let loop_shared = Arc::clone(&shared);

        let handle = thread::Builder::new()
            .name(REAPER_THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(reaper_loop(target, interval, shutdown_rx, &loop_shared));
                if loop_shared.state() != ReaperState::Faulted {
                    loop_shared.set_state(ReaperState::Stopped);
                }
            })?;

        info!(
            interval_ms = interval.as_millis() as u64,
            "Background reaper started"
        );

        Ok(Self {
            shutdown_tx,
            handle: Some(handle),
            shared,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ReaperState {
        self.shared.state()
    }

    /// The panic message of a faulted sweep, if any.
    pub fn fault(&self) -> Option<String> {
        self.shared.fault()
    }

    /// Signals the reaper to stop and waits for its thread to exit.
    ///
    /// A sleeping reaper wakes immediately; a reaper in the middle of a
    /// sweep finishes that sweep first. Calling this more than once is
    /// harmless.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ReaperFault`] if a sweep panicked at any point.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            self.shared.begin_stopping();
            // The receiver is gone if the loop already exited
            let _ = self.shutdown_tx.send(true);

            if handle.join().is_err() {
                self.shared
                    .record_fault("reaper thread panicked outside a sweep".to_string());
            }
            info!("Background reaper stopped");
        }

        match self.shared.fault() {
            Some(message) => Err(CacheError::ReaperFault(message)),
            None => Ok(()),
        }
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        if self.handle.is_none() {
            return;
        }
        if let Err(e) = self.stop() {
            warn!(error = %e, "Reaper shut down after a fault");
        }
    }
}

/// The main reaper loop.
async fn reaper_loop<R: Reap>(
    target: Arc<R>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    shared: &ReaperShared,
) {
    let mut pause = interval;

    loop {
        // Wait for the interval or shutdown signal
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Reaper received shutdown signal");
                    return;
                }
            }
        }

        let started = Instant::now();
        let stats = match panic::catch_unwind(AssertUnwindSafe(|| target.reap())) {
            Ok(stats) => stats,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    fault = %message,
                    "Sweep panicked, expiry disabled for this cache"
                );
                shared.record_fault(message);
                return;
            }
        };
        let elapsed = started.elapsed();

        if stats.popped > 0 {
            debug!(
                expired = stats.popped,
                removed = stats.removed,
                elapsed_ms = elapsed.as_millis() as u64,
                "Expired keys reaped"
            );
        } else {
            trace!(elapsed_ms = elapsed.as_millis() as u64, "Idle sweep");
        }

        // Subtract the sweep's own duration so the schedule doesn't drift
        pause = interval.saturating_sub(elapsed);
        if pause.is_zero() {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                interval_ms = interval.as_millis() as u64,
                "Sweep overran its interval"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
