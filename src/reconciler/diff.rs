use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::STALE_SCORE_RETRIES;
use crate::notify::QueueCmd;
use crate::reconciler::labels;
use crate::state::EventStore;
use crate::types::{Event, EventState, Notification, NotificationKind, Side};

/// Merges normalized batches into the store and derives transition and
/// score-delta signals from the diff against each event's previous snapshot.
pub struct Reconciler {
    store: Arc<EventStore>,
    notify_tx: mpsc::Sender<QueueCmd>,
    /// match_id → last score pair the queue was told about. Internal delta
    /// memory, deliberately separate from the store: the store is overwritten
    /// every pass, this only advances when a delta has been handled.
    last_scores: HashMap<String, (i64, i64)>,
    /// match_id → count of passes a delta has been deferred waiting for the
    /// scorer to appear upstream.
    stale: HashMap<String, u32>,
    sound: bool,
}

impl Reconciler {
    pub fn new(store: Arc<EventStore>, notify_tx: mpsc::Sender<QueueCmd>) -> Self {
        Self {
            store,
            notify_tx,
            last_scores: HashMap::new(),
            stale: HashMap::new(),
            sound: true,
        }
    }

    pub fn set_sound(&mut self, on: bool) {
        self.sound = on;
    }

    /// Merge one normalized batch. Returns how many events were classified
    /// changed.
    pub fn apply(&mut self, batch: Vec<Event>, now_unix: u64) -> usize {
        let mut changed_count = 0;

        for event in batch {
            let prev = self.store.get(&event.id);
            let changed = prev.as_ref().map(|p| !unchanged(p, &event)).unwrap_or(false);

            // Overwrite unconditionally: derived logo fields are recomputed
            // every pass and must stay fresh even for unchanged events.
            self.store.upsert(event.clone());

            let Some(prev) = prev else {
                continue;
            };
            if changed {
                changed_count += 1;
                match (prev.state, event.state) {
                    (EventState::Pre, EventState::In) => {
                        self.emit(&event, NotificationKind::Started, "Kick-off".to_string(), None)
                    }
                    (EventState::In, EventState::Post) => {
                        self.emit(&event, NotificationKind::FullTime, "Full time".to_string(), None)
                    }
                    _ => {}
                }
            }

            // Deferred deltas re-enter here even though the store comparison
            // now reports the event unchanged.
            let pending = self.stale.contains_key(&event.id);
            if event.state == EventState::In && (changed || pending) {
                self.detect_score_delta(&event, &prev, now_unix);
            }
        }

        self.store.rebuild_snapshot();
        changed_count
    }

    fn detect_score_delta(&mut self, event: &Event, prev: &Event, now_unix: u64) {
        let Some((new_home, new_away)) = scores_of(event) else {
            return;
        };
        let base = self
            .last_scores
            .get(&event.id)
            .copied()
            .or_else(|| scores_of(prev));
        let Some((old_home, old_away)) = base else {
            // First numeric sighting: remember it, nothing to compare yet.
            self.last_scores.insert(event.id.clone(), (new_home, new_away));
            return;
        };

        let delta_home = new_home - old_home;
        let delta_away = new_away - old_away;
        if delta_home <= 0 && delta_away <= 0 {
            // No increase, or an upstream correction; resync the memory.
            self.last_scores.insert(event.id.clone(), (new_home, new_away));
            self.stale.remove(&event.id);
            return;
        }

        // Staleness guard: the scorer's name is not yet published upstream
        // when fewer scoring plays exist than the score implies. Defer and
        // hold the delta memory so the next pass retries.
        let mut degraded = false;
        if event.sport.needs_named_scorer()
            && (event.scoring_plays.len() as i64) < new_home + new_away
        {
            let retries = self.stale.entry(event.id.clone()).or_insert(0);
            *retries += 1;
            if *retries < STALE_SCORE_RETRIES {
                debug!(
                    match_id = %event.id,
                    retries = *retries,
                    "scorer not yet available upstream for {}, deferring notification",
                    event.display_name(),
                );
                self.last_scores
                    .entry(event.id.clone())
                    .or_insert((old_home, old_away));
                return;
            }
            degraded = true;
        }

        for (side, delta) in [(Side::Home, delta_home), (Side::Away, delta_away)] {
            if delta <= 0 {
                continue;
            }
            let (label, wants_sound) = if degraded {
                ("Goal".to_string(), true)
            } else {
                labels::delta_label(event.sport, delta, &event.scoring_plays, &event.clock)
            };
            self.emit_score(event, label, side, wants_sound);
            self.store.set_goal_flag(&event.id, side, now_unix);
        }

        self.last_scores.insert(event.id.clone(), (new_home, new_away));
        self.stale.remove(&event.id);
    }

    fn emit(&self, event: &Event, kind: NotificationKind, label: String, side: Option<Side>) {
        self.send(self.notification(event, kind, label, side, self.sound));
    }

    fn emit_score(&self, event: &Event, label: String, side: Side, wants_sound: bool) {
        self.send(self.notification(
            event,
            NotificationKind::Score,
            label,
            Some(side),
            wants_sound && self.sound,
        ));
    }

    fn notification(
        &self,
        event: &Event,
        kind: NotificationKind,
        label: String,
        side: Option<Side>,
        sound: bool,
    ) -> Notification {
        let home = event.home();
        let away = event.away();
        Notification {
            kind,
            sport: event.sport,
            league: event.league_name.clone(),
            home: home.map(|c| c.name.clone()).unwrap_or_default(),
            away: away.map(|c| c.name.clone()).unwrap_or_default(),
            score: format!(
                "{} - {}",
                home.map(|c| c.score.as_str()).unwrap_or(""),
                away.map(|c| c.score.as_str()).unwrap_or(""),
            ),
            label,
            home_logo_url: event.home_logo.as_ref().map(|l| l.url.clone()),
            away_logo_url: event.away_logo.as_ref().map(|l| l.url.clone()),
            scoring_side: side,
            sound,
        }
    }

    fn send(&self, toast: Notification) {
        if let Err(e) = self.notify_tx.try_send(QueueCmd::Enqueue(toast)) {
            warn!("notification channel full, dropping toast: {e}");
        }
    }
}

/// Cheap field-subset equality: state, competitor count, and every
/// competitor's score string.
fn unchanged(prev: &Event, next: &Event) -> bool {
    prev.state == next.state
        && prev.competitors.len() == next.competitors.len()
        && prev
            .competitors
            .iter()
            .zip(&next.competitors)
            .all(|(a, b)| a.score == b.score)
}

fn scores_of(event: &Event) -> Option<(i64, i64)> {
    let home = event.home()?.score.trim().parse().ok()?;
    let away = event.away()?.score.trim().parse().ok()?;
    Some((home, away))
}
