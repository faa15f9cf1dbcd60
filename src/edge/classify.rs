//! Edge detection: gap vs. market, key numbers, tiers and stability.

use super::prediction::{ContributionKind, PredictedLine};
use crate::domain::{Confidence, DataQualityIssue, MarketLine, Period, Side};
use crate::error::{LinesmithError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Edge classification, weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeTier {
    NoPlay,
    Lean,
    Moderate,
    Strong,
    Max,
}

impl EdgeTier {
    const PLAYABLE: [EdgeTier; 4] = [EdgeTier::Lean, EdgeTier::Moderate, EdgeTier::Strong, EdgeTier::Max];

    /// Staking steps above no-play
    pub fn steps(&self) -> u32 {
        match self {
            EdgeTier::NoPlay => 0,
            EdgeTier::Lean => 1,
            EdgeTier::Moderate => 2,
            EdgeTier::Strong => 3,
            EdgeTier::Max => 4,
        }
    }

    pub fn is_playable(&self) -> bool {
        !matches!(self, EdgeTier::NoPlay)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeTier::NoPlay => "NO_PLAY",
            EdgeTier::Lean => "LEAN",
            EdgeTier::Moderate => "MODERATE",
            EdgeTier::Strong => "STRONG",
            EdgeTier::Max => "MAX",
        }
    }
}

impl std::fmt::Display for EdgeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A margin that lands disproportionately often, with its gap premium
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyNumber {
    pub value: f64,
    pub premium: f64,
}

fn default_key_numbers() -> Vec<KeyNumber> {
    [(3.0, 0.5), (7.0, 0.4), (6.0, 0.2), (10.0, 0.2), (14.0, 0.2)]
        .into_iter()
        .map(|(value, premium)| KeyNumber { value, premium })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Starting point for every predicted total
    pub league_baseline_total: f64,
    /// Total points removed per point of lost offensive value
    pub offensive_injury_total_weight: f64,
    pub key_numbers: Vec<KeyNumber>,
    /// Percentage edge per point of key-adjusted gap
    pub percent_per_point: f64,
    /// Lean, moderate, strong and max thresholds in percent
    pub tier_thresholds: [f64; 4],
    /// Gaps smaller than this are never playable
    pub min_gap: f64,
    pub perturbation_fraction: f64,
    pub perturbation_floor: f64,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            league_baseline_total: 44.5,
            offensive_injury_total_weight: 0.5,
            key_numbers: default_key_numbers(),
            percent_per_point: 2.5,
            tier_thresholds: [5.5, 8.0, 11.0, 14.0],
            min_gap: 0.5,
            perturbation_fraction: 0.1,
            perturbation_floor: 0.25,
        }
    }
}

impl EdgeConfig {
    pub fn validate(&self, errors: &mut Vec<String>) {
        let t = &self.tier_thresholds;
        if t.iter().any(|x| !x.is_finite() || *x <= 0.0) || t.windows(2).any(|w| w[0] >= w[1]) {
            errors.push(format!("edge: tier thresholds must be positive and strictly increasing (got {t:?})"));
        }
        if self.percent_per_point <= 0.0 {
            errors.push("edge: percent_per_point must be positive".to_string());
        }
        if self.key_numbers.iter().any(|k| k.value <= 0.0 || k.premium < 0.0) {
            errors.push("edge: key numbers must be positive with non-negative premiums".to_string());
        }
        if self.min_gap < 0.0 || self.perturbation_fraction < 0.0 || self.perturbation_floor < 0.0 {
            errors.push("edge: stability parameters must be non-negative".to_string());
        }
    }

    /// Fail with a configuration error if the tier table is malformed
    pub fn check(&self) -> Result<()> {
        let mut errors = Vec::new();
        self.validate(&mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(LinesmithError::Configuration(errors.join("; ")))
        }
    }

    /// Tier for a percentage edge; monotonic and exact at each threshold
    pub fn classify(&self, percentage_edge: f64) -> EdgeTier {
        let mut tier = EdgeTier::NoPlay;
        for (threshold, candidate) in self.tier_thresholds.iter().zip(EdgeTier::PLAYABLE) {
            if percentage_edge >= *threshold {
                tier = candidate;
            }
        }
        tier
    }

    /// Key numbers between the market and predicted lines.
    ///
    /// A key counts when it lies strictly beyond the market line and at or
    /// before the predicted line, on either side of zero.
    pub fn key_numbers_crossed(&self, market_spread: f64, predicted_spread: f64) -> Vec<KeyNumber> {
        let direction = (predicted_spread - market_spread).signum();
        if predicted_spread == market_spread {
            return Vec::new();
        }
        self.key_numbers
            .iter()
            .filter(|key| {
                [key.value, -key.value].iter().any(|&point| {
                    (point - market_spread) * direction > 0.0 && (predicted_spread - point) * direction >= 0.0
                })
            })
            .copied()
            .collect()
    }
}

/// Why an edge was or was not considered stable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    Stable,
    /// Gap below the minimum playable size
    BelowMinimum,
    /// Gap changes sign under small input perturbation
    SignUnstable,
}

/// Comparison of one prediction against the opening market line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeResult {
    pub id: Uuid,
    pub game_id: String,
    pub period: Period,
    pub predicted: PredictedLine,
    pub market: MarketLine,
    /// Predicted minus market spread (home-margin units)
    pub raw_gap: f64,
    pub side: Option<Side>,
    pub key_numbers_crossed: Vec<f64>,
    pub key_adjusted_gap: f64,
    pub percentage_edge: f64,
    pub tier: EdgeTier,
    pub stability: Stability,
    /// Predicted minus market total
    pub total_gap: Option<f64>,
    pub confidence: Confidence,
    #[serde(default)]
    pub quality_issues: Vec<DataQualityIssue>,
}

impl EdgeResult {
    pub fn is_playable(&self) -> bool {
        self.tier.is_playable() && self.side.is_some()
    }
}

/// Largest movement of the spread toward the market under perturbation
fn perturbation(predicted: &PredictedLine, config: &EdgeConfig) -> f64 {
    predicted
        .spread_contributions
        .iter()
        .filter(|c| c.kind != ContributionKind::RatingDiff && c.value != 0.0)
        .map(|c| c.value.abs() * config.perturbation_fraction + config.perturbation_floor)
        .sum()
}

/// Compare a prediction with the market and classify the gap
pub fn detect_edge(
    predicted: PredictedLine,
    market: MarketLine,
    period: Period,
    quality_issues: Vec<DataQualityIssue>,
    config: &EdgeConfig,
) -> EdgeResult {
    let raw_gap = predicted.spread() - market.spread;
    let side = if raw_gap > 0.0 {
        Some(Side::Home)
    } else if raw_gap < 0.0 {
        Some(Side::Away)
    } else {
        None
    };

    let crossed = config.key_numbers_crossed(market.spread, predicted.spread());
    let premium: f64 = crossed.iter().map(|k| k.premium).sum();
    let key_adjusted_gap = raw_gap + premium * raw_gap.signum();
    let percentage_edge = key_adjusted_gap.abs() * config.percent_per_point;

    let stability = if raw_gap.abs() < config.min_gap {
        Stability::BelowMinimum
    } else if perturbation(&predicted, config) >= raw_gap.abs() {
        Stability::SignUnstable
    } else {
        Stability::Stable
    };

    let tier = match stability {
        Stability::Stable => config.classify(percentage_edge),
        _ => EdgeTier::NoPlay,
    };

    debug!(
        game_id = %predicted.game_id,
        predicted = predicted.spread(),
        market = market.spread,
        raw_gap,
        keys = crossed.len(),
        percentage_edge,
        %tier,
        ?stability,
        "Edge detected"
    );

    EdgeResult {
        id: Uuid::new_v4(),
        game_id: predicted.game_id.clone(),
        period,
        total_gap: market.total.map(|total| predicted.total() - total),
        confidence: predicted.confidence,
        predicted,
        market,
        raw_gap,
        side,
        key_numbers_crossed: crossed.iter().map(|k| k.value).collect(),
        key_adjusted_gap,
        percentage_edge,
        tier,
        stability,
        quality_issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::prediction::Contribution;
    use chrono::Utc;

    fn predicted(contributions: &[(ContributionKind, f64)]) -> PredictedLine {
        PredictedLine::from_contributions(
            "g1",
            contributions
                .iter()
                .map(|(kind, value)| Contribution::new(*kind, *value))
                .collect(),
            vec![Contribution::new(ContributionKind::LeagueBaseline, 44.5)],
            1,
            Confidence::Normal,
            Utc::now(),
        )
    }

    fn market(spread: f64) -> MarketLine {
        MarketLine::from_book_home_line("g1", "book", -spread, Some(45.5), Utc::now())
    }

    fn edge(pred: f64, mkt: f64) -> EdgeResult {
        detect_edge(
            predicted(&[(ContributionKind::RatingDiff, pred)]),
            market(mkt),
            Period::new(2025, 1),
            vec![],
            &EdgeConfig::default(),
        )
    }

    #[test]
    fn test_threshold_exactness() {
        let config = EdgeConfig::default();
        assert_eq!(config.classify(5.49), EdgeTier::NoPlay);
        assert_eq!(config.classify(5.5), EdgeTier::Lean);
        assert_eq!(config.classify(7.99), EdgeTier::Lean);
        assert_eq!(config.classify(8.0), EdgeTier::Moderate);
        assert_eq!(config.classify(11.0), EdgeTier::Strong);
        assert_eq!(config.classify(14.0), EdgeTier::Max);
        assert_eq!(config.classify(40.0), EdgeTier::Max);
    }

    #[test]
    fn test_classification_monotonic() {
        let config = EdgeConfig::default();
        let mut previous = EdgeTier::NoPlay;
        for i in 0..=2000 {
            let tier = config.classify(i as f64 * 0.01);
            assert!(tier >= previous);
            previous = tier;
        }
    }

    #[test]
    fn test_key_number_raises_tier() {
        // Market 1, predicted 4: crosses 3
        let crossing = edge(4.0, 1.0);
        assert_eq!(crossing.key_numbers_crossed, vec![3.0]);
        assert!((crossing.percentage_edge - 8.75).abs() < 1e-9);
        assert_eq!(crossing.tier, EdgeTier::Moderate);

        // Same 3-point gap in a range without keys
        let plain = edge(18.0, 15.0);
        assert!(plain.key_numbers_crossed.is_empty());
        assert!((plain.percentage_edge - 7.5).abs() < 1e-9);
        assert_eq!(plain.tier, EdgeTier::Lean);

        assert!(crossing.tier > plain.tier);
    }

    #[test]
    fn test_key_crossing_boundaries() {
        let config = EdgeConfig::default();
        // Market already on the key: not crossed
        assert!(config.key_numbers_crossed(3.0, 5.0).is_empty());
        // Prediction lands on the key: crossed
        assert_eq!(config.key_numbers_crossed(1.0, 3.0).len(), 1);
        // Away side across -3
        let away = config.key_numbers_crossed(-1.5, -3.5);
        assert_eq!(away[0].value, 3.0);
        // Both 6 and 7
        assert_eq!(config.key_numbers_crossed(5.5, 7.5).len(), 2);
    }

    #[test]
    fn test_away_side_selected_for_negative_gap() {
        let result = edge(-2.0, 3.5);
        assert_eq!(result.side, Some(Side::Away));
        assert!(result.key_adjusted_gap < 0.0);
    }

    #[test]
    fn test_tiny_gap_is_no_play() {
        let result = edge(3.3, 3.0);
        assert_eq!(result.stability, Stability::BelowMinimum);
        assert_eq!(result.tier, EdgeTier::NoPlay);
    }

    #[test]
    fn test_sign_unstable_gap_is_no_play() {
        // Gap of 1.0 resting on soft adjustments worth 3 points
        let pred = predicted(&[
            (ContributionKind::RatingDiff, 1.0),
            (ContributionKind::HomeField, 2.5),
            (ContributionKind::Situational, 0.4),
            (ContributionKind::Weather, 0.1),
        ]);
        let result = detect_edge(pred, market(3.0), Period::new(2025, 1), vec![], &EdgeConfig::default());
        assert_eq!(result.stability, Stability::SignUnstable);
        assert_eq!(result.tier, EdgeTier::NoPlay);
    }

    #[test]
    fn test_non_increasing_thresholds_rejected() {
        let config = EdgeConfig {
            tier_thresholds: [5.5, 8.0, 8.0, 14.0],
            ..Default::default()
        };
        assert!(matches!(config.check(), Err(LinesmithError::Configuration(_))));
        assert!(EdgeConfig::default().check().is_ok());
    }

    #[test]
    fn test_total_gap() {
        let result = edge(4.0, 1.0);
        assert_eq!(result.total_gap, Some(-1.0));
    }
}
