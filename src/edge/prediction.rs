//! Predicted lines and their append-only archive.

use crate::domain::Confidence;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Named input to a predicted spread or total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionKind {
    RatingDiff,
    HomeField,
    Situational,
    Weather,
    Injuries,
    LeagueBaseline,
    OffensiveInjuries,
}

impl ContributionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionKind::RatingDiff => "rating_diff",
            ContributionKind::HomeField => "home_field",
            ContributionKind::Situational => "situational",
            ContributionKind::Weather => "weather",
            ContributionKind::Injuries => "injuries",
            ContributionKind::LeagueBaseline => "league_baseline",
            ContributionKind::OffensiveInjuries => "offensive_injuries",
        }
    }
}

impl std::fmt::Display for ContributionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub kind: ContributionKind,
    pub value: f64,
}

impl Contribution {
    pub fn new(kind: ContributionKind, value: f64) -> Self {
        Self { kind, value }
    }
}

/// One evaluation run's prediction for a game.
///
/// `spread` and `total` are the sums of their contributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictedLine {
    pub id: Uuid,
    pub game_id: String,
    /// Expected home margin
    spread: f64,
    total: f64,
    pub spread_contributions: Vec<Contribution>,
    pub total_contributions: Vec<Contribution>,
    /// Rating snapshot the prediction was computed from
    pub snapshot_version: u64,
    pub confidence: Confidence,
    pub evaluated_at: DateTime<Utc>,
}

impl PredictedLine {
    pub fn from_contributions(
        game_id: impl Into<String>,
        spread_contributions: Vec<Contribution>,
        total_contributions: Vec<Contribution>,
        snapshot_version: u64,
        confidence: Confidence,
        evaluated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id: game_id.into(),
            spread: spread_contributions.iter().map(|c| c.value).sum(),
            total: total_contributions.iter().map(|c| c.value).sum(),
            spread_contributions,
            total_contributions,
            snapshot_version,
            confidence,
            evaluated_at,
        }
    }

    pub fn spread(&self) -> f64 {
        self.spread
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// Value of one spread contribution (0 if absent)
    pub fn spread_contribution(&self, kind: ContributionKind) -> f64 {
        self.spread_contributions
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.value)
            .sum()
    }
}

/// Append-only JSONL archive of predictions
#[derive(Debug, Clone)]
pub struct PredictionArchive {
    path: PathBuf,
}

impl PredictionArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one prediction; earlier runs are never rewritten
    pub fn append(&self, prediction: &PredictedLine) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(prediction)?)?;
        debug!(game_id = %prediction.game_id, id = %prediction.id, "Archived prediction");
        Ok(())
    }

    /// Every archived prediction in append order
    pub fn read_all(&self) -> Result<Vec<PredictedLine>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(std::fs::File::open(&self.path)?);
        let mut predictions = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            predictions.push(serde_json::from_str(&line)?);
        }
        Ok(predictions)
    }

    /// Archived runs for one game, oldest first
    pub fn for_game(&self, game_id: &str) -> Result<Vec<PredictedLine>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|p| p.game_id == game_id)
            .collect())
    }
}
