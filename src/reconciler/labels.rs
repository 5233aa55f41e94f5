//! Sport-specific text for a score delta. Returns the toast label and whether
//! the toast wants a sound.

use crate::types::{ScoringPlay, Sport};

pub fn delta_label(sport: Sport, delta: i64, plays: &[ScoringPlay], clock: &str) -> (String, bool) {
    match sport {
        Sport::Basketball => (format!("+{delta} POINTS"), false),
        Sport::Football => (football_label(delta), true),
        _ => (scorer_label(plays, clock), true),
    }
}

/// Point deltas map onto named plays; anything else is a generic score.
fn football_label(delta: i64) -> String {
    match delta {
        6 => "TOUCHDOWN!".to_string(),
        3 => "FIELD GOAL".to_string(),
        1 => "EXTRA POINT".to_string(),
        2 => "SAFETY/2PT".to_string(),
        n => format!("SCORE (+{n})"),
    }
}

/// Default path: the most recent scoring play's athlete plus the match clock.
fn scorer_label(plays: &[ScoringPlay], clock: &str) -> String {
    let latest = plays.last();
    match latest.and_then(|p| p.athlete.clone()) {
        Some(athlete) => {
            let at = latest
                .and_then(|p| p.clock.clone())
                .unwrap_or_else(|| clock.to_string());
            if at.is_empty() {
                athlete
            } else {
                format!("{athlete} {at}")
            }
        }
        None => "Goal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(athlete: &str, clock: &str) -> ScoringPlay {
        ScoringPlay {
            athlete: Some(athlete.to_string()),
            clock: Some(clock.to_string()),
            team_id: None,
        }
    }

    #[test]
    fn basketball_points_label_is_silent() {
        let (label, sound) = delta_label(Sport::Basketball, 3, &[], "");
        assert_eq!(label, "+3 POINTS");
        assert!(!sound);
    }

    #[test]
    fn football_maps_point_deltas_to_named_plays() {
        assert_eq!(football_label(6), "TOUCHDOWN!");
        assert_eq!(football_label(3), "FIELD GOAL");
        assert_eq!(football_label(1), "EXTRA POINT");
        assert_eq!(football_label(2), "SAFETY/2PT");
        assert_eq!(football_label(8), "SCORE (+8)");
    }

    #[test]
    fn default_path_uses_newest_scorer_and_clock() {
        let plays = vec![play("A. Early", "12'"), play("M. Salah", "54'")];
        let (label, sound) = delta_label(Sport::Soccer, 1, &plays, "90'");
        assert_eq!(label, "M. Salah 54'");
        assert!(sound);
    }

    #[test]
    fn missing_scorer_degrades_to_generic_goal() {
        let (label, _) = delta_label(Sport::Hockey, 1, &[], "P2 10:33");
        assert_eq!(label, "Goal");
    }
}
