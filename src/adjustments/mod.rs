//! Adjustment calculators applied on top of the rating difference.
//!
//! All calculators are pure functions of their config and inputs.

pub mod injury;
pub mod situational;
pub mod weather;

pub use injury::{
    injury_impact, InjuryConfig, InjuryHistory, InjuryImpact, InjuryRecord, InjuryStatus,
    InjuryTrend, InjuryType, Position, Tier, Unit,
};
pub use situational::{
    situational_adjustment, FactorKind, SituationalAdjustment, SituationalConfig, SituationalTable,
};
pub use weather::{
    select_observation, weather_adjustment, Precipitation, WeatherAdjustment, WeatherConfig,
    WeatherObservation,
};
