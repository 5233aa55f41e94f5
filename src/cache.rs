use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CACHE_COALESCE_SECS;
use crate::error::Result;
use crate::types::Event;

#[derive(Serialize, Deserialize)]
struct CacheDoc {
    timestamp: u64,
    events: Vec<Event>,
}

/// Persists the last known event list so the UI has data immediately at
/// startup, before the first network round trip completes. Writes are
/// coalesced: at most one per 120 s while the store carries data.
pub struct SnapshotCache {
    path: PathBuf,
    last_write: Mutex<Option<Instant>>,
}

impl SnapshotCache {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_write: Mutex::new(None),
        }
    }

    /// Returns whether a write happened. Skipped when the previous successful
    /// write is fresher than the coalescing window and there is data on disk
    /// worth keeping.
    pub fn save(&self, events: &[Event]) -> Result<bool> {
        let mut last_write = self.last_write.lock().unwrap();
        if let Some(at) = *last_write {
            let window = Duration::from_secs(CACHE_COALESCE_SECS);
            if at.elapsed() < window && !events.is_empty() {
                debug!("snapshot write coalesced");
                return Ok(false);
            }
        }
        self.write(events)?;
        *last_write = Some(Instant::now());
        Ok(true)
    }

    /// Unconditional write, used at teardown.
    pub fn flush(&self, events: &[Event]) -> Result<()> {
        let mut last_write = self.last_write.lock().unwrap();
        self.write(events)?;
        *last_write = Some(Instant::now());
        Ok(())
    }

    fn write(&self, events: &[Event]) -> Result<()> {
        let doc = CacheDoc {
            timestamp: now_secs(),
            events: events.to_vec(),
        };
        // Temp-file + rename so a crash mid-write never leaves a torn document.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(&doc)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Absence or corruption is non-fatal; the store simply starts empty.
    pub fn load(&self) -> Option<(u64, Vec<Event>)> {
        let body = std::fs::read_to_string(&self.path).ok()?;
        let doc: CacheDoc = match serde_json::from_str(&body) {
            Ok(doc) => doc,
            Err(e) => {
                debug!("snapshot unreadable, starting empty: {e}");
                return None;
            }
        };
        Some((doc.timestamp, doc.events))
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
    use crate::types::{Competitor, EventState, Sport};
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    fn temp_path() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "livescore-cache-test-{}-{n}.json",
            std::process::id()
        ))
    }

    fn event(id: &str) -> Event {
        Event {
            id: id.to_string(),
            league_name: "Premier League".to_string(),
            league_url: "https://x/soccer/eng.1/scoreboard".to_string(),
            sport: Sport::Soccer,
            state: EventState::Pre,
            date: "2026-08-06T19:00Z".to_string(),
            clock: String::new(),
            competitors: vec![
                Competitor { name: "H".to_string(), score: "0".to_string(), id: None, home: true },
                Competitor { name: "A".to_string(), score: "0".to_string(), id: None, home: false },
            ],
            home_logo: None,
            away_logo: None,
            scoring_plays: Vec::new(),
            extras: None,
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let path = temp_path();
        let cache = SnapshotCache::new(path.clone());
        assert!(cache.save(&[event("1"), event("2")]).unwrap());

        let (timestamp, events) = cache.load().expect("snapshot present");
        assert!(timestamp > 0);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "1");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn second_save_inside_the_window_is_coalesced() {
        let path = temp_path();
        let cache = SnapshotCache::new(path.clone());
        assert!(cache.save(&[event("1")]).unwrap());
        assert!(!cache.save(&[event("1"), event("2")]).unwrap());

        // Only the first write landed.
        let (_, events) = cache.load().unwrap();
        assert_eq!(events.len(), 1);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn empty_store_writes_are_not_coalesced() {
        let path = temp_path();
        let cache = SnapshotCache::new(path.clone());
        assert!(cache.save(&[]).unwrap());
        assert!(cache.save(&[]).unwrap());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn flush_bypasses_the_window() {
        let path = temp_path();
        let cache = SnapshotCache::new(path.clone());
        assert!(cache.save(&[event("1")]).unwrap());
        cache.flush(&[event("1"), event("2")]).unwrap();
        let (_, events) = cache.load().unwrap();
        assert_eq!(events.len(), 2);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_or_corrupt_snapshot_is_none() {
        let path = temp_path();
        let cache = SnapshotCache::new(path.clone());
        assert!(cache.load().is_none());

        std::fs::write(&path, b"{not json").unwrap();
        assert!(cache.load().is_none());
        let _ = std::fs::remove_file(path);
    }
}
