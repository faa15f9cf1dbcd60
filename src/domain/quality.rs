use serde::{Deserialize, Serialize};

/// Confidence attached to a derived value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    #[default]
    Normal,
}

impl Confidence {
    /// Weakest of two confidences
    pub fn combine(self, other: Confidence) -> Confidence {
        self.min(other)
    }

    pub fn is_low(&self) -> bool {
        matches!(self, Confidence::Low)
    }
}

/// A degraded input that lowered confidence without aborting the evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityIssue {
    MissingWeather { venue: String },
    StaleWeather { venue: String, age_hours: f64 },
    StaleInjuryReport { team: String, age_days: i64 },
    SkippedInjuryRecord { team: String, player: String, reason: String },
}

impl std::fmt::Display for DataQualityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataQualityIssue::MissingWeather { venue } => {
                write!(f, "no usable weather observation for {venue}")
            }
            DataQualityIssue::StaleWeather { venue, age_hours } => {
                write!(f, "weather for {venue} is {age_hours:.1}h old")
            }
            DataQualityIssue::StaleInjuryReport { team, age_days } => {
                write!(f, "latest injury report for {team} is {age_days}d old")
            }
            DataQualityIssue::SkippedInjuryRecord { team, player, reason } => {
                write!(f, "skipped injury record {player} ({team}): {reason}")
            }
        }
    }
}
