use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Side of a point-spread market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Home => "HOME",
            Side::Away => "AWAY",
        }
    }

    /// Convert an expected home margin into this side's book notation.
    ///
    /// A home margin of 7 is "HOME -7" and "AWAY +7".
    pub fn line_from_margin(&self, home_margin: f64) -> f64 {
        match self {
            Side::Home => -home_margin,
            Side::Away => home_margin,
        }
    }

    /// Whether this side beats `line` (book notation) given the actual home margin
    pub fn covers(&self, line: f64, actual_home_margin: i32) -> std::cmp::Ordering {
        let own_margin = match self {
            Side::Home => actual_home_margin as f64,
            Side::Away => -(actual_home_margin as f64),
        };
        (own_margin + line)
            .partial_cmp(&0.0)
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_spread_price() -> i32 {
    -110
}

/// Net payout per unit staked at American odds
pub fn payout_multiple(american: i32) -> f64 {
    if american < 0 {
        100.0 / (-american) as f64
    } else if american > 0 {
        american as f64 / 100.0
    } else {
        1.0
    }
}

/// Win probability needed to break even at American odds
pub fn breakeven_probability(american: i32) -> f64 {
    1.0 / (1.0 + payout_multiple(american))
}

/// One capture of a sportsbook's line for a game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketLine {
    pub game_id: String,
    pub source: String,
    /// Expected home margin implied by the book (positive = home favored)
    pub spread: f64,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub home_moneyline: Option<i32>,
    #[serde(default)]
    pub away_moneyline: Option<i32>,
    #[serde(default = "default_spread_price")]
    pub home_spread_price: i32,
    #[serde(default = "default_spread_price")]
    pub away_spread_price: i32,
    pub captured_at: DateTime<Utc>,
}

impl MarketLine {
    /// Build a line from the book's home quote ("home -3.5" is `-3.5`)
    pub fn from_book_home_line(
        game_id: impl Into<String>,
        source: impl Into<String>,
        home_line: f64,
        total: Option<f64>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            source: source.into(),
            spread: -home_line,
            total,
            home_moneyline: None,
            away_moneyline: None,
            home_spread_price: default_spread_price(),
            away_spread_price: default_spread_price(),
            captured_at,
        }
    }

    /// Line for a side in book notation
    pub fn line_for(&self, side: Side) -> f64 {
        side.line_from_margin(self.spread)
    }

    /// Spread price for a side in American odds
    pub fn price_for(&self, side: Side) -> i32 {
        match side {
            Side::Home => self.home_spread_price,
            Side::Away => self.away_spread_price,
        }
    }
}

/// Captures of one game's line, ordered by capture time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketHistory {
    captures: Vec<MarketLine>,
}

impl MarketHistory {
    pub fn new(mut captures: Vec<MarketLine>) -> Self {
        captures.sort_by_key(|line| line.captured_at);
        Self { captures }
    }

    pub fn push(&mut self, line: MarketLine) {
        let idx = self
            .captures
            .partition_point(|existing| existing.captured_at <= line.captured_at);
        self.captures.insert(idx, line);
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    pub fn captures(&self) -> &[MarketLine] {
        &self.captures
    }

    pub fn opening(&self) -> Option<&MarketLine> {
        self.captures.first()
    }

    pub fn latest(&self) -> Option<&MarketLine> {
        self.captures.last()
    }

    /// Last capture at or before kickoff
    pub fn closing(&self, kickoff: DateTime<Utc>) -> Option<&MarketLine> {
        self.captures
            .iter()
            .rev()
            .find(|line| line.captured_at <= kickoff)
    }

    /// Spread movement from opening to latest capture (home-margin units)
    pub fn movement(&self) -> f64 {
        match (self.opening(), self.latest()) {
            (Some(open), Some(last)) => last.spread - open.spread,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::cmp::Ordering;

    fn line(spread: f64, minutes: i64) -> MarketLine {
        let t0 = DateTime::from_timestamp(1_757_000_000, 0).unwrap();
        MarketLine::from_book_home_line("g1", "book", -spread, Some(47.5), t0 + Duration::minutes(minutes))
    }

    #[test]
    fn test_book_notation_round_trip() {
        let l = line(3.5, 0);
        assert_eq!(l.spread, 3.5);
        assert_eq!(l.line_for(Side::Home), -3.5);
        assert_eq!(l.line_for(Side::Away), 3.5);
    }

    #[test]
    fn test_covers() {
        // Home -3 wins by 7: covers; wins by 3: push; wins by 1: loses
        assert_eq!(Side::Home.covers(-3.0, 7), Ordering::Greater);
        assert_eq!(Side::Home.covers(-3.0, 3), Ordering::Equal);
        assert_eq!(Side::Home.covers(-3.0, 1), Ordering::Less);
        // Away +3 loses by 1: covers
        assert_eq!(Side::Away.covers(3.0, 1), Ordering::Greater);
    }

    #[test]
    fn test_payout_and_breakeven() {
        assert!((payout_multiple(-110) - 0.909_090).abs() < 1e-5);
        assert!((payout_multiple(150) - 1.5).abs() < 1e-9);
        assert!((breakeven_probability(-110) - 0.523_809).abs() < 1e-5);
        assert!((breakeven_probability(100) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_history_ordering_and_closing() {
        let mut history = MarketHistory::new(vec![line(3.0, 30), line(2.5, 0)]);
        history.push(line(4.0, 90));
        assert_eq!(history.opening().unwrap().spread, 2.5);
        assert_eq!(history.latest().unwrap().spread, 4.0);
        assert_eq!(history.movement(), 1.5);

        let kickoff = history.captures()[0].captured_at + Duration::minutes(60);
        assert_eq!(history.closing(kickoff).unwrap().spread, 3.0);
    }
}
