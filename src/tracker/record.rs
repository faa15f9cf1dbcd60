use crate::domain::{payout_multiple, FinalScore, MarketLine, Period, Side};
use crate::edge::{EdgeTier, Recommendation};
use crate::error::{LinesmithError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// Bet record lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BetStatus {
    /// Recommendation placed, waiting for the closing line
    Pending,
    /// Closing line captured, waiting for the final score
    ClosingRecorded,
    /// Final score applied; immutable from here
    Resolved,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Pending => "PENDING",
            BetStatus::ClosingRecorded => "CLOSING_RECORDED",
            BetStatus::Resolved => "RESOLVED",
        }
    }

    /// Check if this status can transition to another status
    pub fn can_transition_to(&self, target: BetStatus) -> bool {
        use BetStatus::*;

        matches!((self, target), (Pending, ClosingRecorded) | (ClosingRecorded, Resolved))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BetStatus::Resolved)
    }
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Graded result against the line taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BetResult {
    Win,
    Loss,
    Push,
}

/// Audit record for one recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetRecord {
    pub id: Uuid,
    pub recommendation_id: Uuid,
    pub game_id: String,
    pub period: Period,
    pub side: Side,
    pub tier: EdgeTier,
    /// Line taken, side notation
    pub opening_line: f64,
    /// American odds
    pub price: i32,
    pub stake_fraction: Decimal,
    pub stake_amount: Decimal,
    /// Closing line, side notation
    pub closing_line: Option<f64>,
    pub outcome: Option<FinalScore>,
    pub result: Option<BetResult>,
    pub pnl: Option<Decimal>,
    pub status: BetStatus,
    pub created_at: DateTime<Utc>,
    pub closing_recorded_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl BetRecord {
    /// Open a pending record for a recommendation
    pub fn open(rec: &Recommendation, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            recommendation_id: rec.id,
            game_id: rec.game_id.clone(),
            period: rec.period,
            side: rec.side,
            tier: rec.tier,
            opening_line: rec.line_taken,
            price: rec.price,
            stake_fraction: rec.stake_fraction,
            stake_amount: rec.stake_amount,
            closing_line: None,
            outcome: None,
            result: None,
            pnl: None,
            status: BetStatus::Pending,
            created_at: at,
            closing_recorded_at: None,
            resolved_at: None,
        }
    }

    fn transition(&mut self, target: BetStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(LinesmithError::InvalidTransition {
                id: self.id.to_string(),
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        self.status = target;
        Ok(())
    }

    /// Capture the closing line. Pending -> ClosingRecorded.
    pub fn record_closing(&mut self, closing: &MarketLine, at: DateTime<Utc>) -> Result<()> {
        if closing.game_id != self.game_id {
            return Err(LinesmithError::InvalidState(format!(
                "closing line for {} supplied to bet on {}",
                closing.game_id, self.game_id
            )));
        }
        self.transition(BetStatus::ClosingRecorded)?;
        self.closing_line = Some(closing.line_for(self.side));
        self.closing_recorded_at = Some(at);
        Ok(())
    }

    /// Grade against the final score. ClosingRecorded -> Resolved.
    pub fn resolve(&mut self, score: FinalScore, at: DateTime<Utc>) -> Result<()> {
        self.transition(BetStatus::Resolved)?;

        let result = match self.side.covers(self.opening_line, score.home_margin()) {
            Ordering::Greater => BetResult::Win,
            Ordering::Less => BetResult::Loss,
            Ordering::Equal => BetResult::Push,
        };
        let pnl = match result {
            BetResult::Win => {
                let multiple = Decimal::from_f64(payout_multiple(self.price)).unwrap_or(Decimal::ONE);
                (self.stake_amount * multiple).round_dp(2)
            }
            BetResult::Loss => -self.stake_amount,
            BetResult::Push => Decimal::ZERO,
        };

        self.outcome = Some(score);
        self.result = Some(result);
        self.pnl = Some(pnl);
        self.resolved_at = Some(at);
        Ok(())
    }

    /// Closing-line value in points; positive means the bet beat the close
    pub fn clv(&self) -> Option<f64> {
        self.closing_line.map(|closing| self.opening_line - closing)
    }

    pub fn beat_close(&self) -> Option<bool> {
        self.clv().map(|clv| clv > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Confidence;
    use rust_decimal_macros::dec;

    fn recommendation(side: Side, line: f64) -> Recommendation {
        Recommendation {
            id: Uuid::new_v4(),
            edge_result_id: Uuid::new_v4(),
            game_id: "g1".to_string(),
            period: Period::new(2025, 3),
            side,
            line_taken: line,
            price: -110,
            tier: EdgeTier::Lean,
            percentage_edge: 6.0,
            stake_fraction: dec!(0.005),
            stake_amount: dec!(110),
            clamps: vec![],
            contributions: vec![],
            rationale: vec![],
            confidence: Confidence::Normal,
            created_at: Utc::now(),
        }
    }

    fn closing(home_line: f64) -> MarketLine {
        MarketLine::from_book_home_line("g1", "book", home_line, None, Utc::now())
    }

    #[test]
    fn test_status_transitions() {
        assert!(BetStatus::Pending.can_transition_to(BetStatus::ClosingRecorded));
        assert!(BetStatus::ClosingRecorded.can_transition_to(BetStatus::Resolved));
        assert!(!BetStatus::Pending.can_transition_to(BetStatus::Resolved));
        assert!(!BetStatus::Resolved.can_transition_to(BetStatus::Pending));
        assert!(!BetStatus::ClosingRecorded.can_transition_to(BetStatus::ClosingRecorded));
    }

    #[test]
    fn test_resolve_before_closing_fails() {
        let mut bet = BetRecord::open(&recommendation(Side::Home, -3.0), Utc::now());
        let err = bet.resolve(FinalScore { home: 24, away: 17 }, Utc::now()).unwrap_err();
        assert!(matches!(err, LinesmithError::InvalidTransition { .. }));
        assert_eq!(bet.status, BetStatus::Pending);
        assert!(bet.result.is_none());
    }

    #[test]
    fn test_home_favorite_lifecycle() {
        let mut bet = BetRecord::open(&recommendation(Side::Home, -3.0), Utc::now());
        bet.record_closing(&closing(-5.0), Utc::now()).unwrap();
        assert_eq!(bet.clv(), Some(2.0));
        assert_eq!(bet.beat_close(), Some(true));

        bet.resolve(FinalScore { home: 24, away: 17 }, Utc::now()).unwrap();
        assert_eq!(bet.result, Some(BetResult::Win));
        assert_eq!(bet.pnl, Some(dec!(100.00)));

        // Resolved records are immutable
        assert!(bet.resolve(FinalScore { home: 0, away: 0 }, Utc::now()).is_err());
        assert!(bet.record_closing(&closing(-1.0), Utc::now()).is_err());
        assert_eq!(bet.outcome, Some(FinalScore { home: 24, away: 17 }));
    }

    #[test]
    fn test_away_dog_push_and_negative_clv() {
        let mut bet = BetRecord::open(&recommendation(Side::Away, 3.0), Utc::now());
        // Closes home -1.5, away +1.5
        bet.record_closing(&closing(-1.5), Utc::now()).unwrap();
        assert_eq!(bet.clv(), Some(1.5));

        let mut bet = BetRecord::open(&recommendation(Side::Away, 3.0), Utc::now());
        bet.record_closing(&closing(-4.0), Utc::now()).unwrap();
        assert_eq!(bet.beat_close(), Some(false));
        bet.resolve(FinalScore { home: 20, away: 17 }, Utc::now()).unwrap();
        assert_eq!(bet.result, Some(BetResult::Push));
        assert_eq!(bet.pnl, Some(Decimal::ZERO));
    }

    #[test]
    fn test_loss_costs_stake() {
        let mut bet = BetRecord::open(&recommendation(Side::Home, -7.0), Utc::now());
        bet.record_closing(&closing(-7.0), Utc::now()).unwrap();
        assert_eq!(bet.beat_close(), Some(false));
        bet.resolve(FinalScore { home: 21, away: 17 }, Utc::now()).unwrap();
        assert_eq!(bet.result, Some(BetResult::Loss));
        assert_eq!(bet.pnl, Some(dec!(-110)));
    }

    #[test]
    fn test_closing_for_other_game_rejected() {
        let mut bet = BetRecord::open(&recommendation(Side::Home, -3.0), Utc::now());
        let other = MarketLine::from_book_home_line("g2", "book", -3.0, None, Utc::now());
        assert!(matches!(
            bet.record_closing(&other, Utc::now()),
            Err(LinesmithError::InvalidState(_))
        ));
    }
}
