//! Centralized polling for the monitor, schedule, and stats queries.
//!
//! One type owns every interval and every task handle; the global
//! auto-refresh switch cancels all of them, so "off" really means no
//! further network calls, not hidden timers.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::console::Console;

/// Poll intervals per query, matching the panel's refresh settings.
#[derive(Debug, Clone, Copy)]
pub struct PollerIntervals {
    pub history: Duration,
    pub schedules: Duration,
    pub stats: Duration,
}

impl Default for PollerIntervals {
    fn default() -> Self {
        Self {
            history: Duration::from_secs(5),
            schedules: Duration::from_secs(10),
            stats: Duration::from_secs(30),
        }
    }
}

/// Owns the three polling loops.
pub struct Poller {
    console: Arc<Console>,
    intervals: PollerIntervals,
    cancel: Option<CancellationToken>,
}

impl Poller {
    /// Create a poller in the disabled state; call
    /// [`set_enabled`](Self::set_enabled) to start it.
    pub fn new(console: Arc<Console>, intervals: PollerIntervals) -> Self {
        Self {
            console,
            intervals,
            cancel: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.cancel.is_some()
    }

    /// Flip the global auto-refresh switch. Turning it off cancels every
    /// loop immediately; turning it on spawns fresh ones.
    pub fn set_enabled(&mut self, enabled: bool) {
        match (enabled, self.cancel.is_some()) {
            (true, false) => self.start(),
            (false, true) => self.stop(),
            _ => {}
        }
    }

    fn start(&mut self) {
        let cancel = CancellationToken::new();

        spawn_loop(
            Arc::clone(&self.console),
            self.intervals.history,
            cancel.clone(),
            |console| async move {
                let _ = console.refresh_history().await;
            },
        );
        spawn_loop(
            Arc::clone(&self.console),
            self.intervals.schedules,
            cancel.clone(),
            |console| async move {
                let _ = console.refresh_schedules().await;
            },
        );
        spawn_loop(
            Arc::clone(&self.console),
            self.intervals.stats,
            cancel.clone(),
            |console| async move {
                let _ = console.refresh_stats().await;
            },
        );

        self.cancel = Some(cancel);
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn one polling loop: tick, refresh, repeat until cancelled.
fn spawn_loop<F, Fut>(
    console: Arc<Console>,
    every: Duration,
    cancel: CancellationToken,
    refresh: F,
) where
    F: Fn(Arc<Console>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    refresh(Arc::clone(&console)).await;
                }
            }
        }
    });
}
