//! # Playback State Poller
//!
//! Calls an update callback at a fixed period while playback is active. The
//! player reports position far more often than the page can usefully redraw,
//! so the page is refreshed on this slower cadence instead.
//!
//! ## Cancellation
//!
//! [`UpdatePoller::stop`] sets a flag and wakes the loop. The flag is checked
//! before every callback, so once `stop` returns at most one callback that
//! already passed its check can still complete, and the task exits within one
//! period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// A running periodic update loop
pub struct UpdatePoller {
    stop: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

impl UpdatePoller {
    /// Spawn the loop on `runtime`; the first callback fires after one period
    pub fn start<F>(runtime: &Handle, period: Duration, on_update: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());

        let task = {
            let stop = stop.clone();
            let wake = wake.clone();
            runtime.spawn(async move {
                let mut ticker = time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        biased;
                        _ = wake.notified() => {}
                        _ = ticker.tick() => {}
                    }

                    if stop.load(Ordering::Acquire) {
                        break;
                    }
                    on_update();
                }
                debug!("Update poller stopped");
            })
        };

        debug!("Update poller started, period {period:?}");
        Self { stop, wake, task }
    }

    /// Stop the loop; idempotent
    pub fn stop(&self) {
        if !self.stop.swap(true, Ordering::AcqRel) {
            // notify_one keeps a permit if the loop is mid-callback
            self.wake.notify_one();
        }
    }

    /// Whether `stop` has not been called yet
    pub fn is_running(&self) -> bool {
        !self.stop.load(Ordering::Acquire)
    }

    /// Whether the background task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for UpdatePoller {
    fn drop(&mut self) {
        self.stop();
    }
}
