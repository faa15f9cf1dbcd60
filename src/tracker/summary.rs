//! Performance aggregation over bet records. Always derived, never stored.

use super::record::{BetRecord, BetResult};
use crate::domain::Period;
use crate::edge::EdgeTier;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive period range; open ends match everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryFilter {
    pub from: Option<Period>,
    pub to: Option<Period>,
}

impl SummaryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn period(period: Period) -> Self {
        Self::range(period, period)
    }

    pub fn range(from: Period, to: Period) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn matches(&self, period: Period) -> bool {
        self.from.map_or(true, |from| period >= from) && self.to.map_or(true, |to| period <= to)
    }
}

/// Results for one edge tier
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TierStats {
    pub resolved: u32,
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    pub staked: Decimal,
    pub pnl: Decimal,
}

impl TierStats {
    pub fn win_rate(&self) -> Decimal {
        win_rate(self.wins, self.losses)
    }

    pub fn roi(&self) -> Decimal {
        ratio(self.pnl, self.staked)
    }
}

/// Rolling performance over a set of bet records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub filter: SummaryFilter,
    pub total: u32,
    pub resolved: u32,
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    /// Wins over decided (non-push) bets
    pub win_rate: Decimal,
    /// Records with a captured closing line
    pub closing_recorded: u32,
    pub beat_close: u32,
    pub beat_close_pct: Decimal,
    /// Mean closing-line value in points
    pub avg_clv: f64,
    pub total_staked: Decimal,
    pub total_pnl: Decimal,
    pub roi: Decimal,
    pub by_tier: BTreeMap<EdgeTier, TierStats>,
}

fn win_rate(wins: u32, losses: u32) -> Decimal {
    ratio(Decimal::from(wins), Decimal::from(wins + losses))
}

fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator == Decimal::ZERO {
        return Decimal::ZERO;
    }
    numerator / denominator
}

impl PerformanceSummary {
    /// Aggregate records matching `filter`. An empty set yields zeros.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a BetRecord>, filter: SummaryFilter) -> Self {
        let mut summary = PerformanceSummary {
            filter,
            ..Default::default()
        };
        let mut clv_sum = 0.0;

        for record in records.into_iter().filter(|r| filter.matches(r.period)) {
            summary.total += 1;

            if let Some(clv) = record.clv() {
                summary.closing_recorded += 1;
                clv_sum += clv;
                if clv > 0.0 {
                    summary.beat_close += 1;
                }
            }

            let (Some(result), Some(pnl)) = (record.result, record.pnl) else {
                continue;
            };
            let tier = summary.by_tier.entry(record.tier).or_default();
            summary.resolved += 1;
            tier.resolved += 1;
            match result {
                BetResult::Win => {
                    summary.wins += 1;
                    tier.wins += 1;
                }
                BetResult::Loss => {
                    summary.losses += 1;
                    tier.losses += 1;
                }
                BetResult::Push => {
                    summary.pushes += 1;
                    tier.pushes += 1;
                }
            }
            summary.total_staked += record.stake_amount;
            summary.total_pnl += pnl;
            tier.staked += record.stake_amount;
            tier.pnl += pnl;
        }

        summary.win_rate = win_rate(summary.wins, summary.losses);
        summary.beat_close_pct = ratio(
            Decimal::from(summary.beat_close),
            Decimal::from(summary.closing_recorded),
        );
        if summary.closing_recorded > 0 {
            summary.avg_clv = clv_sum / summary.closing_recorded as f64;
        }
        summary.roi = ratio(summary.total_pnl, summary.total_staked);
        summary
    }
}
