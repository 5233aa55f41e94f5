//! Debounced change broadcast for UI listeners. Several network responses can
//! land within a few milliseconds in multi-league batch mode; the debounce
//! window collapses them into a single deferred callback carrying the latest
//! value.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::config::BUS_DEBOUNCE_MS;
use crate::types::MonitorStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub status: MonitorStatus,
    pub event_count: usize,
}

struct Debounce {
    last_emit: Option<Instant>,
    /// Latest value captured while inside the window.
    pending: Option<ChangeNotice>,
    /// Whether a deferred emit is already scheduled.
    deferred: bool,
}

pub struct ChangeBus {
    tx: broadcast::Sender<ChangeNotice>,
    state: Mutex<Debounce>,
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Arc<Self> {
        let (tx, _) = broadcast::channel(capacity);
        Arc::new(Self {
            tx,
            state: Mutex::new(Debounce {
                last_emit: None,
                pending: None,
                deferred: false,
            }),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.tx.subscribe()
    }

    /// Fan out a store change. Emits directly when the last emission is older
    /// than the debounce window; otherwise captures the value and schedules a
    /// single deferred emission for when the window elapses.
    pub fn publish(self: &Arc<Self>, notice: ChangeNotice) {
        let window = Duration::from_millis(BUS_DEBOUNCE_MS);
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();

        match state.last_emit {
            Some(at) if now.duration_since(at) < window => {
                state.pending = Some(notice);
                if !state.deferred {
                    state.deferred = true;
                    let remaining = window - now.duration_since(at);
                    let bus = Arc::clone(self);
                    tokio::spawn(async move {
                        tokio::time::sleep(remaining).await;
                        let mut state = bus.state.lock().unwrap();
                        state.deferred = false;
                        if let Some(pending) = state.pending.take() {
                            state.last_emit = Some(Instant::now());
                            // No subscribers is fine.
                            let _ = bus.tx.send(pending);
                        }
                    });
                }
            }
            _ => {
                state.last_emit = Some(now);
                let _ = self.tx.send(notice);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(event_count: usize) -> ChangeNotice {
        ChangeNotice {
            status: MonitorStatus::Ok,
            event_count,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_publish_is_direct() {
        let bus = ChangeBus::new(16);
        let mut rx = bus.subscribe();
        bus.publish(notice(1));
        assert_eq!(rx.try_recv().unwrap(), notice(1));
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_publishes_collapse_into_one_deferred_latest_value() {
        let bus = ChangeBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(notice(1));
        assert_eq!(rx.try_recv().unwrap(), notice(1));

        // Two more inside the window: suppressed, latest captured.
        bus.publish(notice(2));
        bus.publish(notice(3));
        assert!(rx.try_recv().is_err(), "inside the window nothing fires");

        // Once the window elapses, exactly one deferred emission fires.
        let deferred = rx.recv().await.unwrap();
        assert_eq!(deferred, notice(3));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn publish_after_the_window_is_direct_again() {
        let bus = ChangeBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(notice(1));
        tokio::time::sleep(Duration::from_millis(BUS_DEBOUNCE_MS + 10)).await;
        bus.publish(notice(2));
        assert_eq!(rx.try_recv().unwrap(), notice(1));
        assert_eq!(rx.try_recv().unwrap(), notice(2));
    }
}
