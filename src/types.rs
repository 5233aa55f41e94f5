use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{TOAST_MAX_SECS, TOAST_MIN_SECS};

// ---------------------------------------------------------------------------
// Event state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventState {
    /// Scheduled, not yet started.
    Pre,
    /// Live.
    In,
    /// Finished.
    Post,
}

impl EventState {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "in" => EventState::In,
            "post" => EventState::Post,
            _ => EventState::Pre,
        }
    }

    /// Snapshot ordering rank: finished events sort first, scheduled next,
    /// live last. This ordering is a documented contract; tests pin it.
    pub fn sort_rank(self) -> u8 {
        match self {
            EventState::Post => 0,
            EventState::Pre => 1,
            EventState::In => 2,
        }
    }
}

impl std::fmt::Display for EventState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventState::Pre => "pre",
            EventState::In => "in",
            EventState::Post => "post",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Sport classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Soccer,
    Basketball,
    /// American football.
    Football,
    Hockey,
    Tennis,
    Golf,
    Racing,
    Combat,
    Cricket,
    Rugby,
    /// Default team sport.
    Other,
}

/// Fixed keyword table mapping a league URL to its extraction path.
/// First match wins.
const SPORT_KEYWORDS: &[(&str, Sport)] = &[
    ("racing", Sport::Racing),
    ("/f1", Sport::Racing),
    ("golf", Sport::Golf),
    ("/pga", Sport::Golf),
    ("tennis", Sport::Tennis),
    ("mma", Sport::Combat),
    ("/ufc", Sport::Combat),
    ("boxing", Sport::Combat),
    ("cricket", Sport::Cricket),
    ("rugby", Sport::Rugby),
    ("soccer", Sport::Soccer),
    ("basketball", Sport::Basketball),
    ("/nba", Sport::Basketball),
    ("football", Sport::Football),
    ("/nfl", Sport::Football),
    ("hockey", Sport::Hockey),
    ("/nhl", Sport::Hockey),
];

impl Sport {
    pub fn from_league_url(url: &str) -> Self {
        let url = url.to_lowercase();
        SPORT_KEYWORDS
            .iter()
            .find(|(keyword, _)| url.contains(keyword))
            .map(|&(_, sport)| sport)
            .unwrap_or(Sport::Other)
    }

    /// Individual-event sports have no team concept and carry no logos.
    pub fn has_logos(self) -> bool {
        !matches!(self, Sport::Racing | Sport::Golf | Sport::Combat)
    }

    /// Soccer notifications pre-empt the queue backlog.
    pub fn is_priority(self) -> bool {
        self == Sport::Soccer
    }

    /// Whether a score notification wants a named scorer from the play-by-play
    /// details. Basketball and football build synthetic labels instead.
    pub fn needs_named_scorer(self) -> bool {
        !matches!(self, Sport::Basketball | Sport::Football)
    }
}

impl std::fmt::Display for Sport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Sport::Soccer => "soccer",
            Sport::Basketball => "basketball",
            Sport::Football => "football",
            Sport::Hockey => "hockey",
            Sport::Tennis => "tennis",
            Sport::Golf => "golf",
            Sport::Racing => "racing",
            Sport::Combat => "combat",
            Sport::Cricket => "cricket",
            Sport::Rugby => "rugby",
            Sport::Other => "other",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Event record: one fixture at a snapshot in time
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    pub name: String,
    /// Upstream sends scores as strings; kept verbatim.
    pub score: String,
    /// Numeric team/athlete identifier used for logo resolution.
    pub id: Option<String>,
    pub home: bool,
}

/// Derived presentation metadata, recomputed every normalization pass,
/// never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logo {
    pub id: String,
    pub url: String,
}

/// One normalized play-by-play detail entry. The count of these feeds the
/// staleness guard; the newest athlete/clock feed the default score label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringPlay {
    pub athlete: Option<String>,
    pub clock: Option<String>,
    pub team_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Stable identifier, unique across all sources. Tennis sub-matches get a
    /// synthesized id derived from tournament, competitors and date.
    pub id: String,
    pub league_name: String,
    pub league_url: String,
    pub sport: Sport,
    pub state: EventState,
    /// Scheduled kickoff, ISO 8601 UTC.
    pub date: String,
    /// Live match clock text; empty when not live.
    pub clock: String,
    /// Ordered home-first.
    pub competitors: Vec<Competitor>,
    pub home_logo: Option<Logo>,
    pub away_logo: Option<Logo>,
    pub scoring_plays: Vec<ScoringPlay>,
    /// Sport-specific nested structure (racing grid, golf leaderboard, tennis
    /// set scores) carried opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<serde_json::Value>,
}

impl Event {
    pub fn home(&self) -> Option<&Competitor> {
        self.competitors.iter().find(|c| c.home)
    }

    pub fn away(&self) -> Option<&Competitor> {
        self.competitors.iter().find(|c| !c.home)
    }

    pub fn display_name(&self) -> String {
        match (self.home(), self.away()) {
            (Some(h), Some(a)) => format!("{} - {}", h.name, a.name),
            _ => self.id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

/// Ephemeral "this side just scored" marker, swept 60 seconds after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalFlag {
    pub at_unix: u64,
    pub side: Side,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Started,
    FullTime,
    Score,
    Reminder,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationKind::Started => "started",
            NotificationKind::FullTime => "full_time",
            NotificationKind::Score => "score",
            NotificationKind::Reminder => "reminder",
        };
        write!(f, "{s}")
    }
}

/// An immutable toast, consumed exactly once by the display queue.
#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub sport: Sport,
    pub league: String,
    pub home: String,
    pub away: String,
    pub score: String,
    /// Scorer text, synthetic delta label, or kickoff/full-time caption.
    pub label: String,
    pub home_logo_url: Option<String>,
    pub away_logo_url: Option<String>,
    pub scoring_side: Option<Side>,
    pub sound: bool,
}

impl Notification {
    /// Display duration scales with the amount of text, clamped to 5–12 s.
    pub fn display_duration(&self) -> Duration {
        let text_len = self.home.len() + self.away.len() + self.label.len();
        let secs = (TOAST_MIN_SECS + text_len as u64 / 18).clamp(TOAST_MIN_SECS, TOAST_MAX_SECS);
        Duration::from_secs(secs)
    }
}

// ---------------------------------------------------------------------------
// Reminders
// ---------------------------------------------------------------------------

/// A user-scheduled one-shot alert tied to a match start time. Identity is
/// `(match_name, trigger_unix)`; no two reminders may share both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub match_name: String,
    pub trigger_unix: u64,
    pub league: String,
    pub label: String,
    pub home_logo_url: Option<String>,
    pub away_logo_url: Option<String>,
    /// Channel reference for the direct-tune confirmation flow.
    pub tune_ref: Option<String>,
}

impl Reminder {
    pub fn key(&self) -> (&str, u64) {
        (&self.match_name, self.trigger_unix)
    }
}

// ---------------------------------------------------------------------------
// Monitor status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    /// No data yet; waiting for the first fetch to resolve.
    Loading,
    Ok,
    ConnectionError,
    ParseError,
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MonitorStatus::Loading => "loading",
            MonitorStatus::Ok => "ok",
            MonitorStatus::ConnectionError => "connection error",
            MonitorStatus::ParseError => "parse error",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Channel message types
// ---------------------------------------------------------------------------

/// Mutation requests from embedding UIs, applied on the monitor task.
#[derive(Debug)]
pub enum ControlMsg {
    SetLeague(String),
    SetCustomLeagues(Vec<String>),
    SetDiscovery(bool),
    SetSound(bool),
    AddReminder(Reminder),
    RemoveReminder { match_name: String, trigger_unix: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sport_keyword_table_classifies_league_urls() {
        let cases = [
            ("https://example.com/sports/soccer/eng.1/scoreboard", Sport::Soccer),
            ("https://example.com/sports/basketball/nba/scoreboard", Sport::Basketball),
            ("https://example.com/sports/football/nfl/scoreboard", Sport::Football),
            ("https://example.com/sports/hockey/nhl/scoreboard", Sport::Hockey),
            ("https://example.com/sports/tennis/atp/scoreboard", Sport::Tennis),
            ("https://example.com/sports/golf/pga/scoreboard", Sport::Golf),
            ("https://example.com/sports/racing/f1/scoreboard", Sport::Racing),
            ("https://example.com/sports/mma/ufc/scoreboard", Sport::Combat),
            ("https://example.com/sports/cricket/8048/scoreboard", Sport::Cricket),
            ("https://example.com/sports/rugby/242041/scoreboard", Sport::Rugby),
            ("https://example.com/sports/handball/x/scoreboard", Sport::Other),
        ];
        for (url, expected) in cases {
            assert_eq!(Sport::from_league_url(url), expected, "{url}");
        }
    }

    #[test]
    fn snapshot_rank_orders_post_before_pre_before_in() {
        assert!(EventState::Post.sort_rank() < EventState::Pre.sort_rank());
        assert!(EventState::Pre.sort_rank() < EventState::In.sort_rank());
    }

    #[test]
    fn no_team_sports_carry_no_logos() {
        assert!(!Sport::Racing.has_logos());
        assert!(!Sport::Golf.has_logos());
        assert!(!Sport::Combat.has_logos());
        assert!(Sport::Tennis.has_logos());
        assert!(Sport::Soccer.has_logos());
    }

    #[test]
    fn toast_duration_is_clamped() {
        let mut toast = Notification {
            kind: NotificationKind::Score,
            sport: Sport::Soccer,
            league: "L".to_string(),
            home: "H".to_string(),
            away: "A".to_string(),
            score: "1-0".to_string(),
            label: "x".to_string(),
            home_logo_url: None,
            away_logo_url: None,
            scoring_side: Some(Side::Home),
            sound: true,
        };
        assert_eq!(toast.display_duration(), Duration::from_secs(TOAST_MIN_SECS));
        toast.label = "y".repeat(400);
        assert_eq!(toast.display_duration(), Duration::from_secs(TOAST_MAX_SECS));
    }
}
