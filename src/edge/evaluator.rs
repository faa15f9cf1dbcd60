//! Per-game evaluation and slate batching.

use super::classify::{detect_edge, EdgeConfig, EdgeResult};
use super::prediction::{Contribution, ContributionKind, PredictedLine};
use super::staking::{Recommendation, Staker};
use crate::adjustments::{
    injury_impact, situational_adjustment, weather_adjustment, InjuryConfig, InjuryImpact,
    InjuryRecord, SituationalAdjustment, SituationalConfig, WeatherAdjustment, WeatherConfig,
    WeatherObservation,
};
use crate::domain::{GameContext, MarketLine};
use crate::error::{LinesmithError, Result};
use crate::ratings::{PowerRatingStore, RatingSnapshot};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Everything needed to evaluate one game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameInputs {
    pub context: GameContext,
    /// Opening market line
    pub market: MarketLine,
    #[serde(default)]
    pub weather: Option<WeatherObservation>,
    #[serde(default)]
    pub home_injuries: Vec<InjuryRecord>,
    #[serde(default)]
    pub away_injuries: Vec<InjuryRecord>,
}

/// Edge plus the adjustments that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvaluation {
    pub edge: EdgeResult,
    pub situational: SituationalAdjustment,
    pub weather: WeatherAdjustment,
    pub home_injuries: InjuryImpact,
    pub away_injuries: InjuryImpact,
}

/// Result of one slate run
#[derive(Debug)]
pub struct SlateEvaluation {
    /// Snapshot every game was evaluated against
    pub snapshot_version: u64,
    /// Per-game outcome in input order
    pub games: Vec<(String, Result<GameEvaluation>)>,
}

impl SlateEvaluation {
    pub fn evaluations(&self) -> impl Iterator<Item = &GameEvaluation> {
        self.games.iter().filter_map(|(_, outcome)| outcome.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &LinesmithError)> {
        self.games
            .iter()
            .filter_map(|(game_id, outcome)| outcome.as_ref().err().map(|e| (game_id.as_str(), e)))
    }
}

/// Evaluates games against a rating snapshot
#[derive(Debug, Clone)]
pub struct Evaluator {
    home_field: f64,
    situational: SituationalConfig,
    weather: WeatherConfig,
    injury: InjuryConfig,
    edge: EdgeConfig,
}

impl Evaluator {
    /// Build an evaluator; fails on a malformed tier table
    pub fn new(
        home_field: f64,
        situational: SituationalConfig,
        weather: WeatherConfig,
        injury: InjuryConfig,
        edge: EdgeConfig,
    ) -> Result<Self> {
        edge.check()?;
        Ok(Self {
            home_field,
            situational,
            weather,
            injury,
            edge,
        })
    }

    pub fn edge_config(&self) -> &EdgeConfig {
        &self.edge
    }

    /// Evaluate one game before kickoff
    pub fn evaluate(
        &self,
        snapshot: &RatingSnapshot,
        inputs: &GameInputs,
        as_of: DateTime<Utc>,
    ) -> Result<GameEvaluation> {
        let ctx = &inputs.context;
        ctx.validate()?;
        if inputs.market.game_id != ctx.game_id {
            return Err(LinesmithError::InvalidState(format!(
                "market line for {} supplied to game {}",
                inputs.market.game_id, ctx.game_id
            )));
        }
        if ctx.has_started(as_of) {
            return Err(LinesmithError::InvalidState(format!(
                "game {} kicked off at {}",
                ctx.game_id, ctx.kickoff
            )));
        }

        let home_rating = snapshot.rating(&ctx.home)?;
        let away_rating = snapshot.rating(&ctx.away)?;

        let situational = situational_adjustment(ctx, &self.situational);
        let weather = weather_adjustment(ctx, inputs.weather.as_ref(), &self.weather);
        let home_injuries = injury_impact(&ctx.home, &inputs.home_injuries, as_of, &self.injury);
        let away_injuries = injury_impact(&ctx.away, &inputs.away_injuries, as_of, &self.injury);

        let home_field = if ctx.neutral_site { 0.0 } else { self.home_field };
        let spread_contributions = vec![
            Contribution::new(ContributionKind::RatingDiff, home_rating - away_rating),
            Contribution::new(ContributionKind::HomeField, home_field),
            Contribution::new(ContributionKind::Situational, situational.spread_delta),
            Contribution::new(ContributionKind::Weather, weather.spread_delta),
            Contribution::new(
                ContributionKind::Injuries,
                away_injuries.total - home_injuries.total,
            ),
        ];
        let total_contributions = vec![
            Contribution::new(ContributionKind::LeagueBaseline, self.edge.league_baseline_total),
            Contribution::new(ContributionKind::Weather, weather.total_delta),
            Contribution::new(
                ContributionKind::OffensiveInjuries,
                -(home_injuries.offensive + away_injuries.offensive)
                    * self.edge.offensive_injury_total_weight,
            ),
        ];

        let confidence = weather
            .confidence
            .combine(home_injuries.confidence)
            .combine(away_injuries.confidence);
        let issues = weather
            .issues
            .iter()
            .chain(&home_injuries.issues)
            .chain(&away_injuries.issues)
            .cloned()
            .collect();

        let predicted = PredictedLine::from_contributions(
            ctx.game_id.clone(),
            spread_contributions,
            total_contributions,
            snapshot.version,
            confidence,
            as_of,
        );
        let edge = detect_edge(predicted, inputs.market.clone(), ctx.period, issues, &self.edge);

        Ok(GameEvaluation {
            edge,
            situational,
            weather,
            home_injuries,
            away_injuries,
        })
    }

    /// Evaluate a slate in parallel against one rating snapshot
    pub fn evaluate_slate(
        &self,
        store: &PowerRatingStore,
        games: &[GameInputs],
        as_of: DateTime<Utc>,
    ) -> SlateEvaluation {
        let snapshot = store.snapshot();
        let results: Vec<(String, Result<GameEvaluation>)> = games
            .par_iter()
            .map(|inputs| {
                let outcome = self.evaluate(&snapshot, inputs, as_of);
                (inputs.context.game_id.clone(), outcome)
            })
            .collect();

        for (game_id, outcome) in &results {
            if let Err(e) = outcome {
                warn!(%game_id, error = %e, "Evaluation failed");
            }
        }
        let playable = results
            .iter()
            .filter(|(_, r)| r.as_ref().is_ok_and(|e| e.edge.is_playable()))
            .count();
        info!(
            games = games.len(),
            playable,
            snapshot_version = snapshot.version,
            "Evaluated slate"
        );

        SlateEvaluation {
            snapshot_version: snapshot.version,
            games: results,
        }
    }

    /// Size playable edges, strongest first, so the exposure ceiling
    /// binds on the weakest plays
    pub fn recommend_slate<'a>(
        &self,
        staker: &mut Staker,
        evaluations: impl IntoIterator<Item = &'a GameEvaluation>,
        now: DateTime<Utc>,
    ) -> Vec<Recommendation> {
        let mut playable: Vec<&EdgeResult> = evaluations
            .into_iter()
            .map(|e| &e.edge)
            .filter(|edge| edge.is_playable())
            .collect();
        playable.sort_by(|a, b| b.percentage_edge.total_cmp(&a.percentage_edge));

        playable
            .into_iter()
            .filter_map(|edge| staker.recommend(edge, now))
            .collect()
    }
}
