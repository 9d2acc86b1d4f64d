//! Display ticker for the active session.
//!
//! Ticks recompute a read-only projection (elapsed, remaining, running cost)
//! and publish it to an observer. They never settle and never touch the
//! balance; debiting stays with explicit `SessionStore` operations. The
//! spawned thread stops the moment the session ends and the handle guarantees
//! shutdown on drop.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::session::ParkingSession;
use crate::store::SessionStore;

pub const DEFAULT_TICK_INTERVAL: StdDuration = StdDuration::from_secs(1);

/// One display frame. Elapsed is clamped to `[0, limit]`, so the cost shown
/// stops at the cap and a backward clock reads as zero, never negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickSnapshot {
    pub session_id: String,
    pub elapsed_secs: i64,
    pub remaining_secs: i64,
    pub display_cost: Decimal,
    pub limit_reached: bool,
    pub captured_at: DateTime<Utc>,
}

pub trait TickObserver: Send + Sync {
    fn on_tick(&self, snapshot: &TickSnapshot);
}

/// Projects the display state of `session` at `now`.
pub fn project(session: &ParkingSession, now: DateTime<Utc>) -> TickSnapshot {
    let limit_secs = session.limit_secs();
    let raw_elapsed = (now - session.started_at).num_seconds();
    let elapsed_secs = raw_elapsed.clamp(0, limit_secs);

    TickSnapshot {
        session_id: session.id.clone(),
        elapsed_secs,
        remaining_secs: limit_secs - elapsed_secs,
        display_cost: session.cost_for_secs(elapsed_secs),
        limit_reached: raw_elapsed >= limit_secs,
        captured_at: now,
    }
}

/// Handle to the background tick thread.
///
/// `stop()` (or dropping the handle) signals the thread and joins it; after
/// either, no further tick is delivered. The thread also exits on its own
/// once no session is active.
pub struct AccrualClock {
    stop_tx: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl AccrualClock {
    pub fn spawn(
        store: Arc<SessionStore>,
        observer: Arc<dyn TickObserver>,
        interval: StdDuration,
    ) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || run_tick_loop(store, observer, interval, stop_rx));
        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// True once the tick thread has exited, whether stopped or run out of
    /// session.
    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true)
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AccrualClock {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_tick_loop(
    store: Arc<SessionStore>,
    observer: Arc<dyn TickObserver>,
    interval: StdDuration,
    stop_rx: mpsc::Receiver<()>,
) {
    let clock = store.clock();
    loop {
        match stop_rx.recv_timeout(interval) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                debug!("Accrual clock stopped");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        let Some(session) = store.active_session() else {
            debug!("No active session; accrual clock exiting");
            break;
        };
        let snapshot = project(&session, clock.now());
        observer.on_tick(&snapshot);
    }
}
