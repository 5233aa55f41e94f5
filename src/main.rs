mod bus;
mod cache;
mod config;
mod error;
mod fetcher;
mod monitor;
mod normalizer;
mod notify;
mod reconciler;
mod reminders;
mod state;
mod types;
mod wire;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::bus::ChangeBus;
use crate::cache::SnapshotCache;
use crate::config::{Config, Settings, CHANNEL_CAPACITY};
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::monitor::SportsMonitor;
use crate::notify::{LogSurface, NotificationQueue};
use crate::reminders::{HostTuner, LogTunePrompt, LogTuner, TunePrompt};
use crate::state::EventStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    std::fs::create_dir_all(&cfg.logo_dir)?;

    let settings = Settings::load(&cfg.settings_path);
    info!(
        league = %settings.selected_league,
        custom = settings.custom_league_mode,
        "settings loaded"
    );

    // Seed the store from the last snapshot so listeners have data before the
    // first fetch resolves.
    let store = EventStore::new();
    let cache = SnapshotCache::new(cfg.cache_path.clone());
    match cache.load() {
        Some((timestamp, events)) => {
            info!(count = events.len(), timestamp, "store seeded from snapshot");
            store.seed(events);
        }
        None => info!("no snapshot on disk, starting empty"),
    }

    let fetcher = Fetcher::new(cfg.logo_dir.clone())?;
    let bus = ChangeBus::new(CHANNEL_CAPACITY);

    // Toast queue, drained one at a time onto the display surface.
    let (notify_tx, notify_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let queue = NotificationQueue::new(Box::new(LogSurface), notify_rx, notify_tx.clone());
    tokio::spawn(queue.run());

    // Headless host collaborators; an embedding UI supplies real ones.
    let prompt: Arc<dyn TunePrompt> = Arc::new(LogTunePrompt);
    let tuner: Arc<dyn HostTuner> = Arc::new(LogTuner);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (monitor, _handle) = SportsMonitor::new(
        cfg.settings_path.clone(),
        settings,
        Arc::clone(&store),
        fetcher,
        cache,
        notify_tx,
        Arc::clone(&bus),
        prompt,
        tuner,
        shutdown_rx,
    );
    let monitor_task = tokio::spawn(monitor.run());

    // Attached listener: logs every (debounced) store change.
    let mut changes = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(notice) = changes.recv().await {
            info!(status = %notice.status, events = notice.event_count, "store changed");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    let _ = shutdown_tx.send(true);
    let _ = monitor_task.await;

    Ok(())
}
