use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::config::{TOAST_GRACE_MS, TOAST_RETRY_MS};
use crate::error::Result;
use crate::types::Notification;

/// Host-provided modal overlay. Implementations must signal `done` when the
/// toast leaves the screen; dropping the sender counts as completion.
pub trait DisplaySurface: Send + Sync {
    fn show(&self, toast: &Notification, duration: Duration, done: oneshot::Sender<()>)
        -> Result<()>;
}

/// Headless default: logs the toast and completes after its display duration.
pub struct LogSurface;

impl DisplaySurface for LogSurface {
    fn show(
        &self,
        toast: &Notification,
        duration: Duration,
        done: oneshot::Sender<()>,
    ) -> Result<()> {
        info!(
            kind = %toast.kind,
            league = %toast.league,
            sound = toast.sound,
            "TOAST | {} - {} | {} | {}",
            toast.home, toast.away, toast.score, toast.label,
        );
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = done.send(());
        });
        Ok(())
    }
}

#[derive(Debug)]
pub enum QueueCmd {
    Enqueue(Notification),
    SetEnabled(bool),
    /// The active toast left the screen.
    DisplayDone,
    /// Post-display grace elapsed; the display slot is free again.
    Pump,
    /// Failure-retry delay elapsed. Unlike Pump this must not clear the
    /// active flag: a toast may have started displaying in the meantime.
    Retry,
}

/// Serialized toast display: FIFO with one priority override (soccer inserts
/// at the front), never more than one toast visible, a short grace period
/// between toasts, and recovery when the display surface is unavailable.
pub struct NotificationQueue {
    rx: mpsc::Receiver<QueueCmd>,
    /// Handed to spawned completion/retry watchers.
    tx: mpsc::Sender<QueueCmd>,
    surface: Box<dyn DisplaySurface>,
    pending: VecDeque<Notification>,
    enabled: bool,
    /// True from a successful show until the post-display grace elapses.
    active: bool,
}

impl NotificationQueue {
    pub fn new(
        surface: Box<dyn DisplaySurface>,
        rx: mpsc::Receiver<QueueCmd>,
        tx: mpsc::Sender<QueueCmd>,
    ) -> Self {
        Self {
            rx,
            tx,
            surface,
            pending: VecDeque::new(),
            enabled: true,
            active: false,
        }
    }

    pub async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                QueueCmd::Enqueue(toast) => {
                    if !self.enabled {
                        continue;
                    }
                    if toast.sport.is_priority() {
                        self.pending.push_front(toast);
                    } else {
                        self.pending.push_back(toast);
                    }
                    self.pump();
                }
                QueueCmd::SetEnabled(on) => {
                    self.enabled = on;
                    if !on {
                        // Flush immediately; nothing further displays until re-enabled.
                        self.pending.clear();
                    }
                }
                QueueCmd::DisplayDone => self.after_delay(TOAST_GRACE_MS, QueueCmd::Pump),
                QueueCmd::Pump => {
                    self.active = false;
                    self.pump();
                }
                QueueCmd::Retry => self.pump(),
            }
        }
    }

    fn pump(&mut self) {
        if self.active || !self.enabled {
            return;
        }
        let Some(toast) = self.pending.pop_front() else {
            return;
        };

        let (done_tx, done_rx) = oneshot::channel();
        let duration = toast.display_duration();
        match self.surface.show(&toast, duration, done_tx) {
            Ok(()) => {
                self.active = true;
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let _ = done_rx.await;
                    let _ = tx.send(QueueCmd::DisplayDone).await;
                });
            }
            Err(e) => {
                // Surface unavailable must not wedge the queue: keep the
                // toast, stay inactive, retry processing after a delay.
                warn!("display surface unavailable, retrying: {e}");
                self.pending.push_front(toast);
                self.after_delay(TOAST_RETRY_MS, QueueCmd::Retry);
            }
        }
    }

    fn after_delay(&self, delay_ms: u64, cmd: QueueCmd) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            let _ = tx.send(cmd).await;
        });
    }
}
