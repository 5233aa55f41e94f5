use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::bus::{ChangeBus, ChangeNotice};
use crate::cache::SnapshotCache;
use crate::config::{Settings, CHANNEL_CAPACITY, FAST_POLL_SECS, SLOW_POLL_SECS};
use crate::error::{AppError, Result};
use crate::fetcher::Fetcher;
use crate::normalizer;
use crate::notify::QueueCmd;
use crate::reconciler::Reconciler;
use crate::reminders::{self, HostTuner, ReminderBook, TunePrompt};
use crate::state::EventStore;
use crate::types::{ControlMsg, MonitorStatus, Reminder};

/// Interval until the next poll: fast while anything is live, slow otherwise.
pub fn poll_interval(live_count: usize) -> Duration {
    if live_count > 0 {
        Duration::from_secs(FAST_POLL_SECS)
    } else {
        Duration::from_secs(SLOW_POLL_SECS)
    }
}

/// Whether the scheduler has any reason to tick: discovery is on, or pending
/// reminders still need their trigger times checked.
fn scheduler_active(discovery_enabled: bool, pending_reminders: usize) -> bool {
    discovery_enabled || pending_reminders > 0
}

/// Mutation surface handed to embedding UIs. All requests are applied on the
/// monitor task; callers never touch shared state directly.
#[derive(Clone)]
pub struct MonitorHandle {
    control_tx: mpsc::Sender<ControlMsg>,
}

impl MonitorHandle {
    pub async fn set_league(&self, name: impl Into<String>) -> Result<()> {
        self.send(ControlMsg::SetLeague(name.into())).await
    }

    pub async fn set_custom_leagues(&self, names: Vec<String>) -> Result<()> {
        self.send(ControlMsg::SetCustomLeagues(names)).await
    }

    pub async fn set_discovery(&self, on: bool) -> Result<()> {
        self.send(ControlMsg::SetDiscovery(on)).await
    }

    pub async fn set_sound(&self, on: bool) -> Result<()> {
        self.send(ControlMsg::SetSound(on)).await
    }

    pub async fn add_reminder(&self, reminder: Reminder) -> Result<()> {
        self.send(ControlMsg::AddReminder(reminder)).await
    }

    pub async fn remove_reminder(&self, match_name: String, trigger_unix: u64) -> Result<()> {
        self.send(ControlMsg::RemoveReminder { match_name, trigger_unix }).await
    }

    async fn send(&self, msg: ControlMsg) -> Result<()> {
        self.control_tx
            .send(msg)
            .await
            .map_err(|e| AppError::ChannelSend(e.to_string()))
    }
}

/// The single-instance service object owning the event store, reminder book
/// and notification pipeline. Runs the adaptive poll loop until shut down.
pub struct SportsMonitor {
    settings_path: PathBuf,
    settings: Settings,
    store: Arc<EventStore>,
    fetcher: Arc<Fetcher>,
    reconciler: Reconciler,
    notify_tx: mpsc::Sender<QueueCmd>,
    bus: Arc<ChangeBus>,
    cache: SnapshotCache,
    reminders: ReminderBook,
    control_rx: mpsc::Receiver<ControlMsg>,
    prompt: Arc<dyn TunePrompt>,
    tuner: Arc<dyn HostTuner>,
    shutdown: watch::Receiver<bool>,
}

impl SportsMonitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings_path: PathBuf,
        settings: Settings,
        store: Arc<EventStore>,
        fetcher: Arc<Fetcher>,
        cache: SnapshotCache,
        notify_tx: mpsc::Sender<QueueCmd>,
        bus: Arc<ChangeBus>,
        prompt: Arc<dyn TunePrompt>,
        tuner: Arc<dyn HostTuner>,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, MonitorHandle) {
        let (control_tx, control_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let reminders = ReminderBook::from_entries(settings.reminders.clone());
        let reconciler = Reconciler::new(Arc::clone(&store), notify_tx.clone());
        let monitor = Self {
            settings_path,
            settings,
            store,
            fetcher,
            reconciler,
            notify_tx,
            bus,
            cache,
            reminders,
            control_rx,
            prompt,
            tuner,
            shutdown,
        };
        (monitor, MonitorHandle { control_tx })
    }

    pub async fn run(mut self) {
        self.reconciler.set_sound(self.settings.notification_sound);
        let _ = self
            .notify_tx
            .try_send(QueueCmd::SetEnabled(self.settings.discovery_enabled));

        info!(
            discovery = self.settings.discovery_enabled,
            reminders = self.settings.reminders.len(),
            "monitor started"
        );

        let mut control_open = true;
        let mut next_tick = Instant::now();
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(next_tick) => {
                    if scheduler_active(self.settings.discovery_enabled, self.reminders.entries().len()) {
                        self.tick().await;
                    }
                    next_tick = Instant::now() + poll_interval(self.store.live_count());
                }
                msg = self.control_rx.recv(), if control_open => match msg {
                    Some(msg) => self.apply_control(msg),
                    None => control_open = false,
                },
                _ = self.shutdown.changed() => break,
            }
        }

        // Final snapshot on teardown, bypassing the coalescing window.
        if let Err(e) = self.cache.flush(&self.store.snapshot()) {
            warn!("final snapshot write failed: {e}");
        }
        info!("monitor stopped");
    }

    /// One scheduler tick: expire goal flags, evaluate reminders, then, gated
    /// separately on discovery/custom-league mode, run a fetch cycle.
    async fn tick(&mut self) {
        let now = now_secs();
        self.store.sweep_goal_flags(now);
        self.evaluate_reminders(now);
        if self.settings.discovery_enabled || self.settings.custom_league_mode {
            self.fetch_cycle(now).await;
        }
    }

    fn evaluate_reminders(&mut self, now_unix: u64) {
        let due = self.reminders.take_due(now_unix);
        if due.is_empty() {
            return;
        }
        for reminder in due {
            info!(match_name = %reminder.match_name, "reminder due");
            reminders::fire(reminder, &self.notify_tx, &self.prompt, &self.tuner);
        }
        self.persist_settings();
    }

    /// Fetch every active league endpoint concurrently, normalize, reconcile,
    /// publish the change, and snapshot the store. A failed endpoint leaves
    /// existing data intact; stale-but-present beats empty.
    async fn fetch_cycle(&mut self, now_unix: u64) {
        let sources = self.settings.active_sources();
        if sources.is_empty() {
            return;
        }

        let fetches = sources.into_iter().map(|source| {
            let fetcher = Arc::clone(&self.fetcher);
            async move {
                let result = fetcher.fetch_scoreboard(&source.url).await;
                (source, result)
            }
        });
        let results = join_all(fetches).await;

        let mut batch = Vec::new();
        let mut fetched = false;
        let mut network_failed = false;
        let mut parse_failed = false;
        for (source, result) in results {
            match result {
                // Already in flight from a previous cycle; skip this round.
                Ok(None) => {}
                Ok(Some(body)) => match normalizer::parse_scoreboard(&body) {
                    Ok(payload) => {
                        fetched = true;
                        batch.extend(normalizer::normalize(&payload, &source));
                    }
                    Err(e) => {
                        parse_failed = true;
                        warn!(league = %source.name, "scoreboard parse failed: {e}");
                    }
                },
                Err(e) => {
                    network_failed = true;
                    warn!(league = %source.name, "scoreboard fetch failed: {e}");
                }
            }
        }

        if fetched {
            self.fetcher.prefetch_event_logos(&batch);
            let changed = self.reconciler.apply(batch, now_unix);
            self.store.set_status(MonitorStatus::Ok);
            debug!(changed, total = self.store.event_count(), live = self.store.live_count(), "reconcile complete");
            if let Err(e) = self.cache.save(&self.store.snapshot()) {
                warn!("snapshot write failed: {e}");
            }
        } else if network_failed {
            self.store.set_status(MonitorStatus::ConnectionError);
        } else if parse_failed {
            self.store.set_status(MonitorStatus::ParseError);
        }

        self.bus.publish(ChangeNotice {
            status: self.store.status(),
            event_count: self.store.event_count(),
        });
    }

    fn apply_control(&mut self, msg: ControlMsg) {
        match msg {
            ControlMsg::SetLeague(name) => {
                info!(league = %name, "league selected");
                self.settings.selected_league = name;
                self.persist_settings();
            }
            ControlMsg::SetCustomLeagues(names) => {
                self.settings.custom_league_mode = !names.is_empty();
                self.settings.custom_leagues = names;
                self.persist_settings();
            }
            ControlMsg::SetDiscovery(on) => {
                self.settings.discovery_enabled = on;
                let _ = self.notify_tx.try_send(QueueCmd::SetEnabled(on));
                self.persist_settings();
            }
            ControlMsg::SetSound(on) => {
                self.settings.notification_sound = on;
                self.reconciler.set_sound(on);
                self.persist_settings();
            }
            ControlMsg::AddReminder(reminder) => {
                if self.reminders.add(reminder) {
                    self.persist_settings();
                } else {
                    warn!("duplicate reminder ignored");
                }
            }
            ControlMsg::RemoveReminder { match_name, trigger_unix } => {
                if self.reminders.remove(&match_name, trigger_unix) {
                    self.persist_settings();
                }
            }
        }
    }

    /// Settings are written on every mutation; reminders live inside them.
    fn persist_settings(&mut self) {
        self.settings.reminders = self.reminders.entries().to_vec();
        if let Err(e) = self.settings.save(&self.settings_path) {
            warn!("failed to persist settings: {e}");
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminders::{LogTunePrompt, LogTuner};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn interval_is_fast_with_live_events_slow_without() {
        assert_eq!(poll_interval(0), Duration::from_millis(60_000));
        assert_eq!(poll_interval(1), Duration::from_millis(15_000));
        assert_eq!(poll_interval(7), Duration::from_millis(15_000));
    }

    #[test]
    fn scheduler_keeps_ticking_for_pending_reminders() {
        assert!(scheduler_active(true, 0));
        assert!(scheduler_active(false, 1));
        assert!(!scheduler_active(false, 0));
    }

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    fn temp_path(name: &str) -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "livescore-monitor-test-{}-{n}-{name}",
            std::process::id()
        ))
    }

    fn reminder(name: &str, trigger: u64) -> Reminder {
        Reminder {
            match_name: name.to_string(),
            trigger_unix: trigger,
            league: "Premier League".to_string(),
            label: "Starts soon".to_string(),
            home_logo_url: None,
            away_logo_url: None,
            tune_ref: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn control_messages_apply_on_the_monitor_task_and_persist() {
        let settings_path = temp_path("settings.json");
        let cache_path = temp_path("events.json");

        // Discovery off and no reminders: the loop idles, no fetch happens.
        let settings = Settings {
            discovery_enabled: false,
            ..Settings::default()
        };

        let store = crate::state::EventStore::new();
        let fetcher = Fetcher::new(temp_path("logos")).unwrap();
        let cache = SnapshotCache::new(cache_path.clone());
        let bus = ChangeBus::new(16);
        let (notify_tx, _notify_rx) = mpsc::channel(16);
        let prompt: Arc<dyn TunePrompt> = Arc::new(LogTunePrompt);
        let tuner: Arc<dyn HostTuner> = Arc::new(LogTuner);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let (monitor, handle) = SportsMonitor::new(
            settings_path.clone(),
            settings,
            store,
            fetcher,
            cache,
            notify_tx,
            bus,
            prompt,
            tuner,
            shutdown_rx,
        );
        let task = tokio::spawn(monitor.run());

        handle.set_league("NBA").await.unwrap();
        handle.set_custom_leagues(vec!["NBA".to_string(), "NHL".to_string()]).await.unwrap();
        handle.set_sound(false).await.unwrap();
        handle.set_discovery(false).await.unwrap();
        handle.add_reminder(reminder("Derby", u64::MAX)).await.unwrap();
        handle.add_reminder(reminder("Cup Final", u64::MAX)).await.unwrap();
        handle.remove_reminder("Derby".to_string(), u64::MAX).await.unwrap();

        // Let the monitor task drain the control channel.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let persisted = Settings::load(&settings_path);
        assert_eq!(persisted.selected_league, "NBA");
        assert!(persisted.custom_league_mode);
        assert_eq!(persisted.custom_leagues, vec!["NBA".to_string(), "NHL".to_string()]);
        assert!(!persisted.notification_sound);
        assert!(!persisted.discovery_enabled);
        assert_eq!(persisted.reminders.len(), 1);
        assert_eq!(persisted.reminders[0].match_name, "Cup Final");

        let _ = shutdown_tx.send(true);
        let _ = task.await;
        let _ = std::fs::remove_file(settings_path);
        let _ = std::fs::remove_file(cache_path);
    }
}
