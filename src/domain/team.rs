use serde::{Deserialize, Serialize};
use std::fmt;

/// Team identifier (league abbreviation, e.g. "KC")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct TeamId(String);

impl TeamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TeamId {
    fn from(value: String) -> Self {
        TeamId::new(value)
    }
}

impl From<TeamId> for String {
    fn from(value: TeamId) -> Self {
        value.0
    }
}

impl From<&str> for TeamId {
    fn from(value: &str) -> Self {
        TeamId::new(value)
    }
}

/// Season week used to version ratings and group bets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub season: u16,
    pub week: u8,
}

impl Period {
    pub fn new(season: u16, week: u8) -> Self {
        Self { season, week }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.season, self.week)
    }
}

/// One team's power rating as committed by the rating store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRating {
    pub team: TeamId,
    pub rating: f64,
    /// Period of the last result folded into this rating
    pub period: Period,
    /// Store version that produced this rating (0 = seed)
    #[serde(default)]
    pub version: u64,
}

impl TeamRating {
    pub fn seed(team: impl Into<TeamId>, rating: f64, period: Period) -> Self {
        Self {
            team: team.into(),
            rating,
            period,
            version: 0,
        }
    }
}

/// Playing surface of a venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    #[default]
    Grass,
    Turf,
}

/// How a team tends to play in the cold, derived from its home climate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClimateAffinity {
    Warm,
    Cold,
    #[default]
    Neutral,
}

impl ClimateAffinity {
    /// Mean home-game temperature at or above this is a warm-weather team
    pub const WARM_MEAN_F: f64 = 65.0;
    /// Mean home-game temperature at or below this is a cold-weather team
    pub const COLD_MEAN_F: f64 = 45.0;

    /// Derive affinity from the temperatures of a team's recent home games.
    ///
    /// Dome teams (no outdoor home history) come out `Neutral`.
    pub fn from_home_climate(home_temps_f: &[f64]) -> Self {
        if home_temps_f.is_empty() {
            return ClimateAffinity::Neutral;
        }
        let mean = home_temps_f.iter().sum::<f64>() / home_temps_f.len() as f64;
        if mean >= Self::WARM_MEAN_F {
            ClimateAffinity::Warm
        } else if mean <= Self::COLD_MEAN_F {
            ClimateAffinity::Cold
        } else {
            ClimateAffinity::Neutral
        }
    }
}

/// Offensive identity, used by the wind and precipitation factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OffenseStyle {
    PassLeaning,
    RunLeaning,
    #[default]
    Balanced,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_id_normalized() {
        assert_eq!(TeamId::new(" kc "), TeamId::new("KC"));
        assert_eq!(TeamId::from("buf").as_str(), "BUF");
    }

    #[test]
    fn test_team_id_normalized_when_deserialized() {
        let id: TeamId = serde_json::from_str("\" kc\"").unwrap();
        assert_eq!(id, TeamId::new("KC"));
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"KC\"");

        let rating: TeamRating =
            serde_json::from_str(r#"{"team":"buf","rating":3.5,"period":{"season":2025,"week":1}}"#).unwrap();
        assert_eq!(rating.team, TeamId::new("BUF"));
    }

    #[test]
    fn test_period_ordering() {
        assert!(Period::new(2024, 18) < Period::new(2025, 1));
        assert!(Period::new(2025, 2) > Period::new(2025, 1));
        assert_eq!(Period::new(2025, 3).to_string(), "2025-W03");
    }

    #[test]
    fn test_climate_affinity_from_history() {
        assert_eq!(ClimateAffinity::from_home_climate(&[78.0, 82.0, 70.0]), ClimateAffinity::Warm);
        assert_eq!(ClimateAffinity::from_home_climate(&[30.0, 41.0, 38.0]), ClimateAffinity::Cold);
        assert_eq!(ClimateAffinity::from_home_climate(&[55.0, 60.0]), ClimateAffinity::Neutral);
        assert_eq!(ClimateAffinity::from_home_climate(&[]), ClimateAffinity::Neutral);
    }
}
