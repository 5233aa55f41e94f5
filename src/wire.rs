//! Raw wire types for the upstream scoreboard JSON. The payload is untrusted
//! and partially present, so every field is optional; the normalizer decides
//! what is usable.

use serde::Deserialize;

/// Top-level events stay raw here: each one is converted to [`WireEvent`]
/// individually by the normalizer, so one malformed event cannot abort the
/// rest of the payload.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScoreboardResponse {
    pub events: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireEvent {
    pub id: Option<String>,
    /// "Home at Away" or "P1 vs P2" display string.
    pub name: Option<String>,
    pub date: Option<String>,
    pub status: Option<WireStatus>,
    pub competitions: Option<Vec<WireCompetition>>,
    /// Tennis tournaments nest their individual matches here.
    pub groupings: Option<Vec<WireGrouping>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireStatus {
    #[serde(rename = "type")]
    pub kind: Option<WireStatusType>,
    #[serde(rename = "displayClock")]
    pub display_clock: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireStatusType {
    /// "pre" | "in" | "post"
    pub state: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireGrouping {
    pub competitions: Option<Vec<WireCompetition>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireCompetition {
    pub date: Option<String>,
    /// Grouped tennis matches carry their own status.
    pub status: Option<WireStatus>,
    pub competitors: Option<Vec<WireCompetitor>>,
    /// Play-by-play entries; scoring plays among them feed score labels.
    pub details: Option<Vec<WireDetail>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireCompetitor {
    pub id: Option<String>,
    #[serde(rename = "homeAway")]
    pub home_away: Option<String>,
    /// Scores arrive as strings, occasionally as bare numbers.
    pub score: Option<serde_json::Value>,
    pub team: Option<WireTeam>,
    pub athlete: Option<WireAthlete>,
    /// Per-period scoring (tennis set scores), opaque to the engine.
    pub linescores: Option<serde_json::Value>,
}

impl WireCompetitor {
    pub fn score_text(&self) -> String {
        match &self.score {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    pub fn display_name(&self) -> Option<String> {
        if let Some(team) = &self.team {
            if let Some(name) = &team.display_name {
                return Some(name.clone());
            }
            if let Some(abbr) = &team.abbreviation {
                return Some(abbr.clone());
            }
        }
        self.athlete.as_ref().and_then(|a| a.display_name.clone())
    }

    /// Numeric team/athlete identifier used for logo resolution.
    pub fn logo_id(&self) -> Option<String> {
        self.team
            .as_ref()
            .and_then(|t| t.id.clone())
            .or_else(|| self.athlete.as_ref().and_then(|a| a.id.clone()))
            .or_else(|| self.id.clone())
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireTeam {
    pub id: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub abbreviation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireAthlete {
    pub id: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireDetail {
    pub clock: Option<WireClock>,
    pub team: Option<WireTeam>,
    #[serde(rename = "athletesInvolved")]
    pub athletes_involved: Option<Vec<WireAthlete>>,
    #[serde(rename = "scoringPlay")]
    pub scoring_play: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireClock {
    #[serde(rename = "displayValue")]
    pub display_value: Option<String>,
}
