//! Stake sizing: tier stake capped by fractional Kelly, then by the per-bet
//! ceiling and the rolling weekly exposure ceiling.

use super::classify::{EdgeResult, EdgeTier};
use super::prediction::Contribution;
use crate::domain::{breakeven_probability, payout_multiple, Confidence, Period, Side};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingConfig {
    /// Bankroll used to turn fractions into amounts
    pub bankroll: Decimal,
    /// Bankroll fraction per tier step
    pub tier_step_fraction: Decimal,
    /// Fraction of full Kelly
    pub kelly_multiplier: f64,
    /// Ceiling on any single stake
    pub max_bet_fraction: Decimal,
    /// Ceiling on stakes placed within the exposure window
    pub max_weekly_exposure: Decimal,
    pub exposure_window_days: i64,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            bankroll: dec!(10000),
            tier_step_fraction: dec!(0.005),
            kelly_multiplier: 0.25,
            max_bet_fraction: dec!(0.03),
            max_weekly_exposure: dec!(0.10),
            exposure_window_days: 7,
        }
    }
}

impl StakingConfig {
    pub fn validate(&self, errors: &mut Vec<String>) {
        if self.bankroll <= Decimal::ZERO {
            errors.push("staking: bankroll must be positive".to_string());
        }
        if self.tier_step_fraction <= Decimal::ZERO {
            errors.push("staking: tier_step_fraction must be positive".to_string());
        }
        if !(self.kelly_multiplier > 0.0 && self.kelly_multiplier <= 1.0) {
            errors.push("staking: kelly_multiplier must be within (0, 1]".to_string());
        }
        for (name, value) in [
            ("max_bet_fraction", self.max_bet_fraction),
            ("max_weekly_exposure", self.max_weekly_exposure),
        ] {
            if value <= Decimal::ZERO || value > Decimal::ONE {
                errors.push(format!("staking: {name} must be within (0, 1]"));
            }
        }
        if self.exposure_window_days <= 0 {
            errors.push("staking: exposure_window_days must be positive".to_string());
        }
    }

    /// Tier stake before Kelly and ceilings
    pub fn tier_stake(&self, tier: EdgeTier) -> Decimal {
        self.tier_step_fraction * Decimal::from(tier.steps())
    }
}

/// Full-Kelly fraction for win probability `p` at net payout `b`
pub fn full_kelly(p: f64, b: f64) -> f64 {
    if b <= 0.0 {
        return 0.0;
    }
    ((b * p - (1.0 - p)) / b).max(0.0)
}

/// Which limit reduced a stake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampKind {
    /// Fractional Kelly was below the tier stake
    Kelly,
    PerBetCeiling,
    WeeklyExposure,
}

/// A recorded reduction of the stake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeClamp {
    pub kind: ClampKind,
    pub requested: Decimal,
    pub allowed: Decimal,
}

impl std::fmt::Display for StakeClamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} clamp {} -> {}", self.kind, self.requested, self.allowed)
    }
}

/// Stakes placed, for the rolling exposure window
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExposureLedger {
    entries: Vec<(DateTime<Utc>, Decimal)>,
}

impl ExposureLedger {
    pub fn record(&mut self, at: DateTime<Utc>, fraction: Decimal) {
        self.entries.push((at, fraction));
    }

    /// Sum of stakes that can share a `window` with a stake placed at `now`.
    ///
    /// Entries dated after `now` count too: stakes may be sized out of time
    /// order (backfills at a past `as_of`), and every window holding `now`
    /// lies inside `now ± window`.
    pub fn exposure(&self, now: DateTime<Utc>, window: Duration) -> Decimal {
        let since = now - window;
        let until = now + window;
        self.entries
            .iter()
            .filter(|(at, _)| *at > since && *at < until)
            .map(|(_, fraction)| *fraction)
            .sum()
    }

    /// Largest sum inside any `window` ending at a recorded stake
    pub fn peak_exposure(&self, window: Duration) -> Decimal {
        self.entries
            .iter()
            .map(|(end, _)| {
                self.entries
                    .iter()
                    .filter(|(at, _)| *at > *end - window && *at <= *end)
                    .map(|(_, fraction)| *fraction)
                    .sum::<Decimal>()
            })
            .max()
            .unwrap_or(Decimal::ZERO)
    }
}

/// Outcome of sizing one edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sizing {
    pub tier_stake: Decimal,
    pub kelly_stake: Decimal,
    pub stake_fraction: Decimal,
    pub clamps: Vec<StakeClamp>,
}

/// A sized wagering recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub edge_result_id: Uuid,
    pub game_id: String,
    pub period: Period,
    pub side: Side,
    /// Line taken in the side's book notation
    pub line_taken: f64,
    /// American odds
    pub price: i32,
    pub tier: EdgeTier,
    pub percentage_edge: f64,
    pub stake_fraction: Decimal,
    pub stake_amount: Decimal,
    pub clamps: Vec<StakeClamp>,
    pub contributions: Vec<Contribution>,
    pub rationale: Vec<String>,
    pub confidence: Confidence,
    pub created_at: DateTime<Utc>,
}

/// Sizes recommendations against one bankroll and exposure window
#[derive(Debug, Clone)]
pub struct Staker {
    config: StakingConfig,
    exposure: ExposureLedger,
}

impl Staker {
    pub fn new(config: StakingConfig) -> Self {
        Self::with_exposure(config, ExposureLedger::default())
    }

    /// Start from stakes already placed
    pub fn with_exposure(config: StakingConfig, exposure: ExposureLedger) -> Self {
        Self { config, exposure }
    }

    pub fn config(&self) -> &StakingConfig {
        &self.config
    }

    pub fn exposure(&self, now: DateTime<Utc>) -> Decimal {
        self.exposure
            .exposure(now, Duration::days(self.config.exposure_window_days))
    }

    /// Size a stake for an edge without committing it
    pub fn size(&self, tier: EdgeTier, percentage_edge: f64, price: i32, now: DateTime<Utc>) -> Sizing {
        let tier_stake = self.config.tier_stake(tier);

        let p = (breakeven_probability(price) + percentage_edge / 100.0).min(1.0);
        let kelly = self.config.kelly_multiplier * full_kelly(p, payout_multiple(price));
        let kelly_stake = Decimal::from_f64(kelly)
            .unwrap_or(Decimal::ZERO)
            .round_dp(6);

        let mut clamps = Vec::new();
        let mut stake = tier_stake;
        if kelly_stake < stake {
            clamps.push(StakeClamp {
                kind: ClampKind::Kelly,
                requested: stake,
                allowed: kelly_stake,
            });
            stake = kelly_stake;
        }
        if stake > self.config.max_bet_fraction {
            clamps.push(StakeClamp {
                kind: ClampKind::PerBetCeiling,
                requested: stake,
                allowed: self.config.max_bet_fraction,
            });
            stake = self.config.max_bet_fraction;
        }
        let remaining = (self.config.max_weekly_exposure - self.exposure(now)).max(Decimal::ZERO);
        if stake > remaining {
            clamps.push(StakeClamp {
                kind: ClampKind::WeeklyExposure,
                requested: stake,
                allowed: remaining,
            });
            stake = remaining;
        }

        Sizing {
            tier_stake,
            kelly_stake,
            stake_fraction: stake,
            clamps,
        }
    }

    /// Size a playable edge and commit its stake to the exposure window.
    ///
    /// Returns `None` for unplayable edges and for stakes clamped to zero.
    pub fn recommend(&mut self, edge: &EdgeResult, now: DateTime<Utc>) -> Option<Recommendation> {
        let side = edge.side.filter(|_| edge.is_playable())?;
        let price = edge.market.price_for(side);
        let sizing = self.size(edge.tier, edge.percentage_edge, price, now);

        for clamp in &sizing.clamps {
            if clamp.kind != ClampKind::Kelly {
                warn!(game_id = %edge.game_id, %clamp, "Stake clamped");
            }
        }
        if sizing.stake_fraction <= Decimal::ZERO {
            warn!(game_id = %edge.game_id, tier = %edge.tier, "Stake clamped to zero, no recommendation");
            return None;
        }

        self.exposure.record(now, sizing.stake_fraction);

        let line_taken = edge.market.line_for(side);
        let mut rationale = vec![format!(
            "predicted {:+.1} vs market {:+.1} (home margin), gap {:+.2}",
            edge.predicted.spread(),
            edge.market.spread,
            edge.raw_gap
        )];
        if !edge.key_numbers_crossed.is_empty() {
            rationale.push(format!("crosses key numbers {:?}", edge.key_numbers_crossed));
        }
        rationale.extend(
            edge.predicted
                .spread_contributions
                .iter()
                .map(|c| format!("{}: {:+.2}", c.kind, c.value)),
        );
        rationale.extend(sizing.clamps.iter().map(|c| c.to_string()));
        rationale.extend(edge.quality_issues.iter().map(|issue| issue.to_string()));

        let stake_amount = (sizing.stake_fraction * self.config.bankroll).round_dp(2);
        info!(
            game_id = %edge.game_id,
            %side,
            line = line_taken,
            tier = %edge.tier,
            stake_fraction = %sizing.stake_fraction,
            %stake_amount,
            "Recommendation"
        );

        Some(Recommendation {
            id: Uuid::new_v4(),
            edge_result_id: edge.id,
            game_id: edge.game_id.clone(),
            period: edge.period,
            side,
            line_taken,
            price,
            tier: edge.tier,
            percentage_edge: edge.percentage_edge,
            stake_fraction: sizing.stake_fraction,
            stake_amount,
            clamps: sizing.clamps,
            contributions: edge.predicted.spread_contributions.clone(),
            rationale,
            confidence: edge.confidence,
            created_at: now,
        })
    }
}
