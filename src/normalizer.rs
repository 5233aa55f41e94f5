//! Turns one raw scoreboard payload into normalized [`Event`] records with
//! league provenance attached. Malformed events are skipped per-event; one bad
//! record never aborts the rest of the payload.

use serde_json::json;
use tracing::debug;

use crate::config::{LeagueSource, LOGO_CDN_URL};
use crate::error::Result;
use crate::types::{Competitor, Event, EventState, Logo, ScoringPlay, Sport};
use crate::wire::{ScoreboardResponse, WireCompetition, WireCompetitor, WireEvent, WireStatus};

pub fn parse_scoreboard(body: &str) -> Result<ScoreboardResponse> {
    Ok(serde_json::from_str(body)?)
}

pub fn normalize(payload: &ScoreboardResponse, league: &LeagueSource) -> Vec<Event> {
    let sport = Sport::from_league_url(&league.url);
    let mut out = Vec::new();

    for raw in payload.events.as_deref().unwrap_or_default() {
        let ev: WireEvent = match serde_json::from_value(raw.clone()) {
            Ok(ev) => ev,
            Err(e) => {
                debug!(league = %league.name, "skipping malformed event: {e}");
                continue;
            }
        };

        match sport {
            Sport::Tennis => out.extend(normalize_tennis(&ev, league)),
            Sport::Racing | Sport::Golf => {
                if let Some(event) = normalize_individual(&ev, raw, league, sport) {
                    out.push(event);
                }
            }
            _ => {
                if let Some(event) = normalize_team(&ev, league, sport) {
                    out.push(event);
                }
            }
        }
    }

    out
}

/// Derived logo location for a competitor id, per the sport → CDN folder
/// table. None for sports with no team/athlete imagery.
pub fn logo_url(sport: Sport, id: &str) -> Option<String> {
    let folder = match sport {
        Sport::Soccer => "teamlogos/soccer",
        Sport::Basketball => "teamlogos/nba",
        Sport::Football => "teamlogos/nfl",
        Sport::Hockey => "teamlogos/nhl",
        Sport::Cricket => "teamlogos/cricket",
        Sport::Rugby => "teamlogos/rugby",
        Sport::Other => "teamlogos/default",
        Sport::Tennis => {
            return Some(format!("{LOGO_CDN_URL}/headshots/tennis/players/full/{id}.png"))
        }
        Sport::Racing | Sport::Golf | Sport::Combat => return None,
    };
    Some(format!("{LOGO_CDN_URL}/{folder}/500/{id}.png"))
}

// ---------------------------------------------------------------------------
// Team sports (and combat cards: a pair of athletes, no logos)
// ---------------------------------------------------------------------------

fn normalize_team(ev: &WireEvent, league: &LeagueSource, sport: Sport) -> Option<Event> {
    let id = ev.id.clone()?;
    let competition = ev.competitions.as_ref()?.first()?;
    let (home, away) = competitor_pair(competition.competitors.as_deref().unwrap_or(&[]))?;

    let state = wire_state(ev.status.as_ref());
    let (home_logo, away_logo) = if sport.has_logos() {
        (logo_for(sport, &home), logo_for(sport, &away))
    } else {
        (None, None)
    };

    Some(Event {
        id,
        league_name: league.name.clone(),
        league_url: league.url.clone(),
        sport,
        state,
        date: ev.date.clone().unwrap_or_default(),
        clock: wire_clock(ev.status.as_ref(), state),
        competitors: vec![home, away],
        home_logo,
        away_logo,
        scoring_plays: scoring_plays(competition),
        extras: None,
    })
}

// ---------------------------------------------------------------------------
// Individual-event sports: racing grids and golf leaderboards have no
// home/away pair; the field is carried opaquely for presentation layers.
// ---------------------------------------------------------------------------

fn normalize_individual(
    ev: &WireEvent,
    raw: &serde_json::Value,
    league: &LeagueSource,
    sport: Sport,
) -> Option<Event> {
    let id = ev.id.clone()?;
    let state = wire_state(ev.status.as_ref());
    let field = raw
        .pointer("/competitions/0/competitors")
        .cloned()
        .unwrap_or(serde_json::Value::Null);

    Some(Event {
        id,
        league_name: league.name.clone(),
        league_url: league.url.clone(),
        sport,
        state,
        date: ev.date.clone().unwrap_or_default(),
        clock: wire_clock(ev.status.as_ref(), state),
        competitors: Vec::new(),
        home_logo: None,
        away_logo: None,
        scoring_plays: Vec::new(),
        extras: Some(json!({ "name": ev.name, "field": field })),
    })
}

// ---------------------------------------------------------------------------
// Tennis: one upstream event is a tournament grouping several matches;
// each nested match becomes its own flat record with a synthesized id.
// ---------------------------------------------------------------------------

fn normalize_tennis(ev: &WireEvent, league: &LeagueSource) -> Vec<Event> {
    let tournament_id = ev.id.clone().unwrap_or_default();
    let grouped = ev
        .groupings
        .iter()
        .flatten()
        .flat_map(|g| g.competitions.iter().flatten());
    let direct = ev.competitions.iter().flatten();

    grouped
        .chain(direct)
        .filter_map(|m| tennis_match(ev, &tournament_id, m, league))
        .collect()
}

fn tennis_match(
    ev: &WireEvent,
    tournament_id: &str,
    m: &WireCompetition,
    league: &LeagueSource,
) -> Option<Event> {
    let wire = m.competitors.as_deref().unwrap_or(&[]);
    let (mut home, mut away) = competitor_pair(wire)?;

    // Structured athlete fields can be absent; fall back to splitting the
    // "P1 vs P2" display string.
    if home.name.is_empty() || away.name.is_empty() {
        if let Some((p1, p2)) = ev.name.as_deref().and_then(split_versus) {
            if home.name.is_empty() {
                home.name = p1;
            }
            if away.name.is_empty() {
                away.name = p2;
            }
        }
    }

    let date = m.date.clone().or_else(|| ev.date.clone()).unwrap_or_default();
    let status = m.status.as_ref().or(ev.status.as_ref());
    let state = wire_state(status);

    let extras = wire
        .iter()
        .any(|c| c.linescores.is_some())
        .then(|| json!({ "linescores": wire.iter().map(|c| c.linescores.clone()).collect::<Vec<_>>() }));

    let home_logo = logo_for(Sport::Tennis, &home);
    let away_logo = logo_for(Sport::Tennis, &away);

    Some(Event {
        id: synth_match_id(tournament_id, &home, &away, &date),
        league_name: league.name.clone(),
        league_url: league.url.clone(),
        sport: Sport::Tennis,
        state,
        date,
        clock: wire_clock(status, state),
        competitors: vec![home, away],
        home_logo,
        away_logo,
        scoring_plays: scoring_plays(m),
        extras,
    })
}

/// Stable id for a tennis sub-match: tournament + both competitors + day.
fn synth_match_id(tournament_id: &str, home: &Competitor, away: &Competitor, date: &str) -> String {
    let h = home.id.as_deref().unwrap_or(&home.name);
    let a = away.id.as_deref().unwrap_or(&away.name);
    let day = date.get(..10).unwrap_or(date);
    format!("{tournament_id}-{h}-{a}-{day}")
}

fn split_versus(name: &str) -> Option<(String, String)> {
    let (p1, p2) = name
        .split_once(" vs ")
        .or_else(|| name.split_once(" v "))?;
    let p1 = p1.trim();
    let p2 = p2.trim();
    if p1.is_empty() || p2.is_empty() {
        return None;
    }
    Some((p1.to_string(), p2.to_string()))
}

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

fn wire_state(status: Option<&WireStatus>) -> EventState {
    let kind = status.and_then(|s| s.kind.as_ref());
    match kind.and_then(|k| k.state.as_deref()) {
        Some(state) => EventState::from_wire(state),
        // Some feeds omit the state string but still flag completion.
        None if kind.and_then(|k| k.completed) == Some(true) => EventState::Post,
        None => EventState::Pre,
    }
}

fn wire_clock(status: Option<&WireStatus>, state: EventState) -> String {
    if state != EventState::In {
        return String::new();
    }
    status
        .and_then(|s| s.display_clock.clone())
        .unwrap_or_default()
}

/// Ordered (home, away) pair. Prefers the explicit homeAway marker, falls
/// back to positional order. None when fewer than two competitors exist.
fn competitor_pair(wire: &[WireCompetitor]) -> Option<(Competitor, Competitor)> {
    if wire.len() < 2 {
        return None;
    }
    let home_idx = wire
        .iter()
        .position(|c| c.home_away.as_deref() == Some("home"))
        .unwrap_or(0);
    let mut away_idx = wire
        .iter()
        .position(|c| c.home_away.as_deref() == Some("away"))
        .unwrap_or(if home_idx == 0 { 1 } else { 0 });
    if away_idx == home_idx {
        away_idx = if home_idx == 0 { 1 } else { 0 };
    }
    Some((
        competitor_from(&wire[home_idx], true),
        competitor_from(&wire[away_idx], false),
    ))
}

fn competitor_from(c: &WireCompetitor, home: bool) -> Competitor {
    Competitor {
        name: c.display_name().unwrap_or_default(),
        score: c.score_text(),
        id: c.logo_id(),
        home,
    }
}

fn logo_for(sport: Sport, c: &Competitor) -> Option<Logo> {
    let id = c.id.as_deref()?;
    let url = logo_url(sport, id)?;
    Some(Logo { id: id.to_string(), url })
}

fn scoring_plays(competition: &WireCompetition) -> Vec<ScoringPlay> {
    competition
        .details
        .iter()
        .flatten()
        .filter(|d| d.scoring_play == Some(true))
        .map(|d| ScoringPlay {
            athlete: d
                .athletes_involved
                .as_ref()
                .and_then(|a| a.first())
                .and_then(|a| a.display_name.clone()),
            clock: d.clock.as_ref().and_then(|c| c.display_value.clone()),
            team_id: d.team.as_ref().and_then(|t| t.id.clone()),
        })
        .collect()
}
