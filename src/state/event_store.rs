use std::sync::{Arc, RwLock};

use dashmap::DashMap;

use crate::config::GOAL_FLAG_TTL_SECS;
use crate::types::{Event, EventState, GoalFlag, MonitorStatus, Side};

/// Source of truth for the current state of the world: event id → latest
/// normalized record, last-write-wins. Mutated only by the monitor task; UI
/// layers read snapshots.
pub struct EventStore {
    events: DashMap<String, Event>,
    /// match_id → "this side just scored" marker, swept after 60 s.
    goal_flags: DashMap<String, GoalFlag>,
    /// Display-ordered copy of the store, rebuilt after each reconcile batch.
    snapshot: RwLock<Vec<Event>>,
    status: RwLock<MonitorStatus>,
}

impl EventStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: DashMap::new(),
            goal_flags: DashMap::new(),
            snapshot: RwLock::new(Vec::new()),
            status: RwLock::new(MonitorStatus::Loading),
        })
    }

    pub fn get(&self, id: &str) -> Option<Event> {
        self.events.get(id).map(|e| e.clone())
    }

    /// The most recently normalized record for an id always wins.
    pub fn upsert(&self, event: Event) {
        self.events.insert(event.id.clone(), event);
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn live_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.state == EventState::In)
            .count()
    }

    /// Seed the store from a disk snapshot so the UI has data before the
    /// first network round trip resolves.
    pub fn seed(&self, events: Vec<Event>) {
        for event in events {
            self.upsert(event);
        }
        self.rebuild_snapshot();
    }

    /// Rebuild the display-ordered event list: finished first, then
    /// scheduled, live last; ties broken by date, league and id so the
    /// ordering is deterministic.
    pub fn rebuild_snapshot(&self) {
        let mut events: Vec<Event> = self.events.iter().map(|e| e.clone()).collect();
        events.sort_by(|a, b| {
            (a.state.sort_rank(), &a.date, &a.league_name, &a.id)
                .cmp(&(b.state.sort_rank(), &b.date, &b.league_name, &b.id))
        });
        *self.snapshot.write().unwrap() = events;
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.snapshot.read().unwrap().clone()
    }

    pub fn status(&self) -> MonitorStatus {
        *self.status.read().unwrap()
    }

    pub fn set_status(&self, status: MonitorStatus) {
        *self.status.write().unwrap() = status;
    }

    pub fn set_goal_flag(&self, match_id: &str, side: Side, now_unix: u64) {
        self.goal_flags
            .insert(match_id.to_string(), GoalFlag { at_unix: now_unix, side });
    }

    pub fn goal_flag(&self, match_id: &str) -> Option<GoalFlag> {
        self.goal_flags.get(match_id).map(|f| *f)
    }

    /// Janitor sweep, not a precise timer; flags expire on the tick after
    /// their TTL elapses.
    pub fn sweep_goal_flags(&self, now_unix: u64) {
        self.goal_flags
            .retain(|_, flag| now_unix.saturating_sub(flag.at_unix) < GOAL_FLAG_TTL_SECS);
    }
}
