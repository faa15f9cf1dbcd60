//! Margin preparation for rating updates.
//!
//! Two steps turn a final score into the number the blend rule consumes:
//! - garbage-time stripping: late points scored by a team already down big
//!   are removed, otherwise blowouts look closer than they were
//! - home-field adjustment: the home team's margin is reduced by the
//!   home-field constant and the visitor's raised by the same amount

use crate::domain::{GameResult, ScoringPlay, TeamId, VenueRole};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Quarter number of the fourth (final regulation) quarter
const FOURTH_QUARTER: u8 = 4;

/// What the blend rule treats as the "margin" input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarginBasis {
    /// `adjusted_margin` alone (ratings live on a margin scale)
    #[default]
    Raw,
    /// `opponent_rating + adjusted_margin` (a single-game performance rating)
    OpponentRelative,
}

/// Garbage-time rule parameters
#[derive(Debug, Clone, Copy)]
pub struct GarbageTimeRule {
    /// Plays ending with this many seconds or fewer left are candidates
    pub final_seconds: u32,
    /// Scoring team must trail by more than this before the play
    pub deficit: u16,
}

impl GarbageTimeRule {
    /// Whether a scoring play falls in garbage time
    pub fn is_garbage(&self, play: &ScoringPlay, home: &TeamId) -> bool {
        if play.quarter < FOURTH_QUARTER || play.seconds_remaining > self.final_seconds {
            return false;
        }
        let (own, other) = if &play.team == home {
            (play.home_score_before, play.away_score_before)
        } else {
            (play.away_score_before, play.home_score_before)
        };
        other.saturating_sub(own) > self.deficit
    }
}

/// Home margin of a result with garbage-time points removed.
///
/// Without play-by-play the raw final margin is used.
pub fn effective_home_margin(result: &GameResult, rule: GarbageTimeRule) -> f64 {
    let mut margin = result.score.home_margin();
    for play in result.scoring.iter().filter(|p| rule.is_garbage(p, &result.home)) {
        let points = play.points as i32;
        if play.team == result.home {
            margin -= points;
        } else {
            margin += points;
        }
        debug!(
            game_id = %result.game_id,
            team = %play.team,
            points,
            seconds_remaining = play.seconds_remaining,
            "Stripped garbage-time score"
        );
    }
    margin as f64
}

/// Remove home-field advantage from a team's raw margin
pub fn adjusted_margin(role: VenueRole, raw_margin: f64, home_field: f64) -> f64 {
    match role {
        VenueRole::Home => raw_margin - home_field,
        VenueRole::Away => raw_margin + home_field,
        VenueRole::Neutral => raw_margin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FinalScore, Period};
    use chrono::Utc;

    const RULE: GarbageTimeRule = GarbageTimeRule {
        final_seconds: 120,
        deficit: 14,
    };

    fn play(team: &str, points: u8, quarter: u8, secs: u32, home: u16, away: u16) -> ScoringPlay {
        ScoringPlay {
            team: TeamId::new(team),
            points,
            seconds_remaining: secs,
            quarter,
            home_score_before: home,
            away_score_before: away,
        }
    }

    fn result(score: FinalScore, scoring: Vec<ScoringPlay>) -> GameResult {
        GameResult {
            game_id: "g".to_string(),
            period: Period::new(2025, 3),
            home: TeamId::new("DAL"),
            away: TeamId::new("NYG"),
            kickoff: Utc::now(),
            neutral_site: false,
            completed: true,
            score,
            scoring,
        }
    }

    #[test]
    fn test_late_score_by_trailing_team_stripped() {
        // DAL leads 35-10, NYG scores a TD with 0:45 left -> 35-17 final
        let r = result(
            FinalScore { home: 35, away: 17 },
            vec![play("NYG", 7, 4, 45, 35, 10)],
        );
        assert_eq!(effective_home_margin(&r, RULE), 25.0);
    }

    #[test]
    fn test_late_score_in_close_game_kept() {
        let r = result(
            FinalScore { home: 24, away: 21 },
            vec![play("NYG", 7, 4, 30, 24, 14)],
        );
        assert_eq!(effective_home_margin(&r, RULE), 3.0);
    }

    #[test]
    fn test_deficit_must_exceed_threshold() {
        // Exactly 14 down is not garbage time
        let r = result(
            FinalScore { home: 28, away: 21 },
            vec![play("NYG", 7, 4, 60, 28, 14)],
        );
        assert_eq!(effective_home_margin(&r, RULE), 7.0);
    }

    #[test]
    fn test_early_score_by_trailing_team_kept() {
        let r = result(
            FinalScore { home: 35, away: 17 },
            vec![play("NYG", 7, 4, 300, 35, 10), play("NYG", 7, 3, 60, 28, 3)],
        );
        assert_eq!(effective_home_margin(&r, RULE), 18.0);
    }

    #[test]
    fn test_home_team_garbage_time_stripped() {
        let r = result(
            FinalScore { home: 13, away: 38 },
            vec![play("DAL", 3, 4, 10, 10, 38)],
        );
        assert_eq!(effective_home_margin(&r, RULE), -28.0);
    }

    #[test]
    fn test_adjusted_margin_symmetry() {
        let hf = 2.5;
        for m in [-21.0, -3.0, 0.0, 7.0, 17.0] {
            let home = adjusted_margin(VenueRole::Home, m, hf);
            let away = adjusted_margin(VenueRole::Away, -m, hf);
            assert_eq!(home, -away);
        }
        assert_eq!(adjusted_margin(VenueRole::Neutral, 6.0, hf), 6.0);
    }
}
