//! Redraw request coalescing.
//!
//! Triggers from the interaction task and the periodic ticker land in a
//! single slot. The render task drains it one request at a time, so it is
//! never more than one redraw behind no matter how fast triggers arrive.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// Default period of the unconditional redraw tick.
pub const DEFAULT_REDRAW_INTERVAL: Duration = Duration::from_secs(1);

/// Kind of redraw requested, ordered by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RedrawKind {
    /// Timer tick: repaint to pick up tiles that finished loading.
    Periodic,

    /// Cheap resample of the last full frame while a zoom drag is active.
    InPlaceRescale,

    /// Recompute the whole frame from the tile caches.
    Full,
}

#[derive(Debug, Default)]
struct SlotState {
    pending: Option<RedrawKind>,
    closed: bool,
    accepted: u64,
    dropped: u64,
}

/// Single-slot redraw queue.
///
/// A request replaces the pending one only if it has strictly higher
/// priority; otherwise it is dropped.
#[derive(Debug, Default)]
pub struct RedrawScheduler {
    state: Mutex<SlotState>,
    notify: Notify,
}

impl RedrawScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a redraw. Returns `false` if the request was coalesced away or
    /// the scheduler is closed.
    pub fn request(&self, kind: RedrawKind) -> bool {
        {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            match state.pending {
                Some(pending) if pending >= kind => {
                    state.dropped += 1;
                    trace!(?kind, ?pending, "Coalesced redraw request");
                    return false;
                }
                _ => {
                    state.pending = Some(kind);
                    state.accepted += 1;
                }
            }
        }
        self.notify.notify_one();
        true
    }

    /// Take the pending request without waiting.
    pub fn try_next(&self) -> Option<RedrawKind> {
        self.state.lock().pending.take()
    }

    /// Wait for the next request. Returns `None` once the scheduler is closed.
    pub async fn next(&self) -> Option<RedrawKind> {
        loop {
            {
                let mut state = self.state.lock();
                if state.closed {
                    return None;
                }
                if let Some(kind) = state.pending.take() {
                    return Some(kind);
                }
            }
            self.notify.notified().await;
        }
    }

    /// Stop accepting requests and wake the consumer so it can exit.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_one();
        debug!("Redraw scheduler closed");
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn pending(&self) -> Option<RedrawKind> {
        self.state.lock().pending
    }

    /// Requests that entered the slot.
    pub fn accepted(&self) -> u64 {
        self.state.lock().accepted
    }

    /// Requests dropped because an equal or higher priority one was pending.
    pub fn dropped(&self) -> u64 {
        self.state.lock().dropped
    }
}

/// Issue a [`RedrawKind::Periodic`] request every `period` until the
/// scheduler closes.
pub async fn run_ticker(scheduler: Arc<RedrawScheduler>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;
        if scheduler.is_closed() {
            break;
        }
        scheduler.request(RedrawKind::Periodic);
    }
    debug!("Redraw ticker stopped");
}
