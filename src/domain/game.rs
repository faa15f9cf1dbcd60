use crate::domain::team::{ClimateAffinity, OffenseStyle, Period, Surface, TeamId};
use crate::error::{LinesmithError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Venue a game is played at
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub id: String,
    #[serde(default)]
    pub surface: Surface,
    /// Dome or closed roof
    #[serde(default)]
    pub indoor: bool,
}

/// Schedule metadata for one side of a matchup
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TeamSchedule {
    /// Days since the team's previous game
    pub rest_days: u32,
    /// Miles traveled to the venue (0 for the home team)
    #[serde(default)]
    pub travel_miles: u32,
    #[serde(default)]
    pub time_zones_crossed: u8,
    /// Coming off a bye week
    #[serde(default)]
    pub off_bye: bool,
    /// Final margin of the team's previous game (negative = loss)
    #[serde(default)]
    pub previous_margin: Option<i32>,
    /// Team played in last season's postseason
    #[serde(default)]
    pub prior_postseason: bool,
    #[serde(default)]
    pub home_surface: Surface,
    #[serde(default)]
    pub climate: ClimateAffinity,
    #[serde(default)]
    pub offense: OffenseStyle,
}

/// Everything known about a scheduled game before kickoff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameContext {
    pub game_id: String,
    pub period: Period,
    pub home: TeamId,
    pub away: TeamId,
    pub kickoff: DateTime<Utc>,
    pub venue: Venue,
    #[serde(default)]
    pub neutral_site: bool,
    pub home_schedule: TeamSchedule,
    pub away_schedule: TeamSchedule,
    #[serde(default)]
    pub divisional: bool,
    #[serde(default)]
    pub conference: bool,
    #[serde(default)]
    pub primetime: bool,
    #[serde(default)]
    pub postseason: bool,
}

impl GameContext {
    /// Reject contexts that cannot describe a real game
    pub fn validate(&self) -> Result<()> {
        if self.home == self.away {
            return Err(LinesmithError::InvalidState(format!(
                "game {} lists {} as both home and away",
                self.game_id, self.home
            )));
        }
        Ok(())
    }

    pub fn has_started(&self, as_of: DateTime<Utc>) -> bool {
        as_of >= self.kickoff
    }

    pub fn schedule(&self, role: VenueRole) -> &TeamSchedule {
        match role {
            VenueRole::Away => &self.away_schedule,
            _ => &self.home_schedule,
        }
    }
}

/// A team's role at the venue of a given game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueRole {
    Home,
    Away,
    Neutral,
}

/// A single scoring play, used to strip garbage time from final margins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPlay {
    pub team: TeamId,
    pub points: u8,
    /// Seconds left on the game clock when the play ended
    pub seconds_remaining: u32,
    /// Quarter (5+ = overtime)
    pub quarter: u8,
    /// Score immediately before the play
    pub home_score_before: u16,
    pub away_score_before: u16,
}

/// Final score of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    pub home: u16,
    pub away: u16,
}

impl FinalScore {
    pub fn home_margin(&self) -> i32 {
        self.home as i32 - self.away as i32
    }
}

/// A completed (or in-progress) game as reported by the results feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResult {
    pub game_id: String,
    pub period: Period,
    pub home: TeamId,
    pub away: TeamId,
    pub kickoff: DateTime<Utc>,
    #[serde(default)]
    pub neutral_site: bool,
    pub completed: bool,
    pub score: FinalScore,
    /// Scoring plays in game order; empty means no play-by-play available
    #[serde(default)]
    pub scoring: Vec<ScoringPlay>,
}
