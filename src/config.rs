use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, Result};
use crate::types::Reminder;

pub const SCOREBOARD_API_URL: &str = "https://site.api.espn.com/apis/site/v2/sports";
pub const LOGO_CDN_URL: &str = "https://a.espncdn.com/i";

/// Poll interval while at least one tracked event is live (seconds).
pub const FAST_POLL_SECS: u64 = 15;

/// Poll interval with no live events (seconds).
pub const SLOW_POLL_SECS: u64 = 60;

/// Minimum gap between two snapshot writes when the store is non-empty (seconds).
pub const CACHE_COALESCE_SECS: u64 = 120;

/// Change-bus debounce window (milliseconds).
pub const BUS_DEBOUNCE_MS: u64 = 300;

/// Grace period between one toast closing and the next being displayed (milliseconds).
pub const TOAST_GRACE_MS: u64 = 500;

/// Delay before retrying queue processing after the display surface failed (milliseconds).
pub const TOAST_RETRY_MS: u64 = 3_000;

/// Toast display duration bounds (seconds). Actual duration scales with text length.
pub const TOAST_MIN_SECS: u64 = 5;
pub const TOAST_MAX_SECS: u64 = 12;

/// A score delta whose scorer is not yet published upstream is re-checked this
/// many poll cycles before degrading to a generic notification.
pub const STALE_SCORE_RETRIES: u32 = 4;

/// Goal flags are swept away this long after creation (seconds).
pub const GOAL_FLAG_TTL_SECS: u64 = 60;

/// A tune-carrying reminder prompt left unanswered this long takes its default action (seconds).
pub const TUNE_PROMPT_TIMEOUT_SECS: u64 = 30;

/// HTTP request timeout (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// Channel capacity for internal message routing.
pub const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Fixed path of the event snapshot document.
    pub cache_path: PathBuf,
    /// Path of the user settings document.
    pub settings_path: PathBuf,
    /// Directory logo images are prefetched into.
    pub logo_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| ".".to_string());
        let data_dir = PathBuf::from(data_dir);
        if data_dir.as_os_str().is_empty() {
            return Err(AppError::Config("DATA_DIR must not be empty".to_string()));
        }
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            cache_path: data_dir.join("events.json"),
            settings_path: data_dir.join("settings.json"),
            logo_dir: data_dir.join("logos"),
        })
    }
}

// ---------------------------------------------------------------------------
// League sources
// ---------------------------------------------------------------------------

/// One configured scoreboard endpoint. The URL doubles as provenance on every
/// event record produced from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueSource {
    pub name: String,
    pub url: String,
}

impl LeagueSource {
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            url: format!("{SCOREBOARD_API_URL}/{path}/scoreboard"),
        }
    }
}

/// Built-in league table. Overridable through the settings file.
pub fn default_leagues() -> Vec<LeagueSource> {
    vec![
        LeagueSource::new("Premier League", "soccer/eng.1"),
        LeagueSource::new("Champions League", "soccer/uefa.champions"),
        LeagueSource::new("Bundesliga", "soccer/ger.1"),
        LeagueSource::new("NBA", "basketball/nba"),
        LeagueSource::new("NFL", "football/nfl"),
        LeagueSource::new("NHL", "hockey/nhl"),
        LeagueSource::new("ATP Tour", "tennis/atp"),
        LeagueSource::new("PGA Tour", "golf/pga"),
        LeagueSource::new("Formula 1", "racing/f1"),
        LeagueSource::new("UFC", "mma/ufc"),
        LeagueSource::new("Super Rugby", "rugby/242041"),
    ]
}

// ---------------------------------------------------------------------------
// User settings: read at startup, written on every mutation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// League polled in single-league mode.
    pub selected_league: String,
    /// Poll every league in `custom_leagues` in one batch instead of the selected one.
    pub custom_league_mode: bool,
    pub custom_leagues: Vec<String>,
    /// Discovery mode: whether score notifications are active at all.
    pub discovery_enabled: bool,
    /// Whether notifications that support sound play one.
    pub notification_sound: bool,
    pub reminders: Vec<Reminder>,
    pub leagues: Vec<LeagueSource>,
}

impl Default for Settings {
    fn default() -> Self {
        let leagues = default_leagues();
        Self {
            selected_league: leagues[0].name.clone(),
            custom_league_mode: false,
            custom_leagues: Vec::new(),
            discovery_enabled: true,
            notification_sound: true,
            reminders: Vec::new(),
            leagues,
        }
    }
}

impl Settings {
    /// Absence or corruption of the settings file is non-fatal; defaults apply.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(body) => match serde_json::from_str(&body) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("settings file unreadable, using defaults: {e}");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// The league endpoints the next fetch cycle targets: the whole custom
    /// batch in custom-league mode, otherwise just the selected league.
    pub fn active_sources(&self) -> Vec<LeagueSource> {
        if self.custom_league_mode {
            self.leagues
                .iter()
                .filter(|l| self.custom_leagues.contains(&l.name))
                .cloned()
                .collect()
        } else {
            self.leagues
                .iter()
                .filter(|l| l.name == self.selected_league)
                .cloned()
                .take(1)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_league_mode_targets_selected_league_only() {
        let settings = Settings {
            selected_league: "NBA".to_string(),
            ..Settings::default()
        };
        let sources = settings.active_sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "NBA");
    }

    #[test]
    fn custom_mode_targets_every_configured_league() {
        let settings = Settings {
            custom_league_mode: true,
            custom_leagues: vec!["NBA".to_string(), "NHL".to_string()],
            ..Settings::default()
        };
        let names: Vec<_> = settings.active_sources().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["NBA".to_string(), "NHL".to_string()]);
    }

    #[test]
    fn unknown_selected_league_yields_no_sources() {
        let settings = Settings {
            selected_league: "No Such League".to_string(),
            ..Settings::default()
        };
        assert!(settings.active_sources().is_empty());
    }
}
