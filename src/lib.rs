pub mod adjustments;
pub mod config;
pub mod domain;
pub mod edge;
pub mod error;
pub mod inputs;
pub mod logging;
pub mod ratings;
pub mod tracker;

pub use adjustments::{
    injury_impact, situational_adjustment, weather_adjustment, InjuryImpact, InjuryRecord,
    SituationalAdjustment, WeatherAdjustment, WeatherObservation,
};
pub use config::AppConfig;
pub use domain::{
    Confidence, DataQualityIssue, FinalScore, GameContext, GameResult, MarketLine, Period, Side,
    TeamId, TeamRating,
};
pub use edge::{
    EdgeResult, EdgeTier, Evaluator, GameEvaluation, GameInputs, PredictedLine, Recommendation,
    Staker,
};
pub use error::{LinesmithError, Result};
pub use inputs::{read_jsonl, OnMalformed, SlateInputs};
pub use ratings::{PowerRatingStore, RatingSnapshot};
pub use tracker::{BetLedger, BetRecord, BetStatus, PerformanceSummary, SummaryFilter};
