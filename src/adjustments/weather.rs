//! Weather factors for one venue and kickoff.

use crate::domain::{
    ClimateAffinity, Confidence, DataQualityIssue, GameContext, OffenseStyle, Side, TeamSchedule,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Precipitation category at kickoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Precipitation {
    #[default]
    None,
    LightRain,
    HeavyRain,
    LightSnow,
    HeavySnow,
}

/// Forecast or observed conditions at a venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub venue_id: String,
    pub temperature_f: f64,
    pub wind_mph: f64,
    #[serde(default)]
    pub precipitation: Precipitation,
    pub observed_at: DateTime<Utc>,
}

impl WeatherObservation {
    /// Hours between the observation and kickoff
    pub fn age_hours(&self, kickoff: DateTime<Utc>) -> f64 {
        (kickoff - self.observed_at).num_seconds() as f64 / 3600.0
    }
}

/// Freshest observation for a venue taken at or before kickoff.
///
/// Observations after kickoff are discarded.
pub fn select_observation<'a>(
    observations: &'a [WeatherObservation],
    venue_id: &str,
    kickoff: DateTime<Utc>,
) -> Option<&'a WeatherObservation> {
    observations
        .iter()
        .filter(|obs| obs.venue_id == venue_id && obs.observed_at <= kickoff)
        .max_by_key(|obs| obs.observed_at)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Temperatures below this are cold
    pub cold_threshold_f: f64,
    /// Temperatures below this are extreme cold (severity doubles)
    pub extreme_cold_threshold_f: f64,
    pub cold_points: f64,
    pub cold_affinity_factor: f64,
    pub warm_affinity_factor: f64,
    pub neutral_affinity_factor: f64,
    pub moderate_wind_mph: f64,
    pub moderate_wind_points: f64,
    pub strong_wind_mph: f64,
    pub strong_wind_points: f64,
    pub light_rain_points: f64,
    pub heavy_rain_points: f64,
    pub light_snow_points: f64,
    pub heavy_snow_points: f64,
    pub pass_wind_factor: f64,
    pub run_wind_factor: f64,
    pub pass_precipitation_factor: f64,
    pub run_precipitation_factor: f64,
    /// Weather points per spread/total point
    pub conversion_ratio: f64,
    /// Observations older than this at kickoff lower confidence
    pub max_age_hours: f64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            cold_threshold_f: 35.0,
            extreme_cold_threshold_f: 10.0,
            cold_points: 2.0,
            cold_affinity_factor: 1.0,
            warm_affinity_factor: -1.0,
            neutral_affinity_factor: -0.5,
            moderate_wind_mph: 15.0,
            moderate_wind_points: 1.5,
            strong_wind_mph: 20.0,
            strong_wind_points: 3.0,
            light_rain_points: 1.0,
            heavy_rain_points: 3.0,
            light_snow_points: 1.5,
            heavy_snow_points: 4.5,
            pass_wind_factor: -1.0,
            run_wind_factor: 1.0,
            pass_precipitation_factor: -1.0,
            run_precipitation_factor: 0.5,
            conversion_ratio: 5.0,
            max_age_hours: 6.0,
        }
    }
}

impl WeatherConfig {
    pub fn validate(&self, errors: &mut Vec<String>) {
        if self.conversion_ratio <= 0.0 {
            errors.push("weather: conversion_ratio must be positive".to_string());
        }
        if self.extreme_cold_threshold_f >= self.cold_threshold_f {
            errors.push("weather: extreme cold threshold must be below cold threshold".to_string());
        }
        if self.moderate_wind_mph >= self.strong_wind_mph {
            errors.push("weather: wind bands must be increasing".to_string());
        }
        if self.max_age_hours <= 0.0 {
            errors.push("weather: max_age_hours must be positive".to_string());
        }
    }

    /// Temperature severity before affinity is applied
    pub fn temperature_severity(&self, temperature_f: f64) -> f64 {
        if temperature_f < self.extreme_cold_threshold_f {
            self.cold_points * 2.0
        } else if temperature_f < self.cold_threshold_f {
            self.cold_points
        } else {
            0.0
        }
    }

    pub fn wind_severity(&self, wind_mph: f64) -> f64 {
        if wind_mph > self.strong_wind_mph {
            self.strong_wind_points
        } else if wind_mph > self.moderate_wind_mph {
            self.moderate_wind_points
        } else {
            0.0
        }
    }

    pub fn precipitation_severity(&self, precipitation: Precipitation) -> f64 {
        match precipitation {
            Precipitation::None => 0.0,
            Precipitation::LightRain => self.light_rain_points,
            Precipitation::HeavyRain => self.heavy_rain_points,
            Precipitation::LightSnow => self.light_snow_points,
            Precipitation::HeavySnow => self.heavy_snow_points,
        }
    }

    fn affinity_factor(&self, affinity: ClimateAffinity) -> f64 {
        match affinity {
            ClimateAffinity::Cold => self.cold_affinity_factor,
            ClimateAffinity::Warm => self.warm_affinity_factor,
            ClimateAffinity::Neutral => self.neutral_affinity_factor,
        }
    }

    fn wind_factor(&self, style: OffenseStyle) -> f64 {
        match style {
            OffenseStyle::PassLeaning => self.pass_wind_factor,
            OffenseStyle::RunLeaning => self.run_wind_factor,
            OffenseStyle::Balanced => 0.0,
        }
    }

    fn precipitation_factor(&self, style: OffenseStyle) -> f64 {
        match style {
            OffenseStyle::PassLeaning => self.pass_precipitation_factor,
            OffenseStyle::RunLeaning => self.run_precipitation_factor,
            OffenseStyle::Balanced => 0.0,
        }
    }

    /// Weather points for one team under the given severities
    fn team_points(&self, schedule: &TeamSchedule, temperature: f64, wind: f64, precipitation: f64) -> f64 {
        temperature * self.affinity_factor(schedule.climate)
            + wind * self.wind_factor(schedule.offense)
            + precipitation * self.precipitation_factor(schedule.offense)
    }
}

/// Result of the weather calculation for one game
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherAdjustment {
    pub temperature_severity: f64,
    pub wind_severity: f64,
    pub precipitation_severity: f64,
    pub home_points: f64,
    pub away_points: f64,
    /// Spread points in home-margin units
    pub spread_delta: f64,
    /// Points added to the predicted total (never positive)
    pub total_delta: f64,
    pub confidence: Confidence,
    #[serde(default)]
    pub issues: Vec<DataQualityIssue>,
}

/// Compute weather adjustments for a game.
///
/// Indoor venues yield all zeros. A missing or stale observation lowers
/// confidence; a stale one is still used. Observations after kickoff are
/// treated as missing.
pub fn weather_adjustment(
    ctx: &GameContext,
    observation: Option<&WeatherObservation>,
    config: &WeatherConfig,
) -> WeatherAdjustment {
    if ctx.venue.indoor {
        return WeatherAdjustment::default();
    }

    // An observation taken after kickoff is not a forecast for this game
    let observation = observation.filter(|obs| {
        let usable = obs.observed_at <= ctx.kickoff;
        if !usable {
            warn!(
                game_id = %ctx.game_id,
                observed_at = %obs.observed_at,
                kickoff = %ctx.kickoff,
                "Discarding weather observed after kickoff"
            );
        }
        usable
    });

    let Some(obs) = observation else {
        warn!(game_id = %ctx.game_id, venue = %ctx.venue.id, "No weather observation for outdoor venue");
        return WeatherAdjustment {
            confidence: Confidence::Low,
            issues: vec![DataQualityIssue::MissingWeather {
                venue: ctx.venue.id.clone(),
            }],
            ..Default::default()
        };
    };

    let mut adj = WeatherAdjustment::default();
    let age_hours = obs.age_hours(ctx.kickoff);
    if age_hours > config.max_age_hours {
        warn!(
            game_id = %ctx.game_id,
            venue = %ctx.venue.id,
            age_hours,
            "Stale weather observation"
        );
        adj.confidence = Confidence::Low;
        adj.issues.push(DataQualityIssue::StaleWeather {
            venue: ctx.venue.id.clone(),
            age_hours,
        });
    }

    adj.temperature_severity = config.temperature_severity(obs.temperature_f);
    adj.wind_severity = config.wind_severity(obs.wind_mph);
    adj.precipitation_severity = config.precipitation_severity(obs.precipitation);

    for side in [Side::Home, Side::Away] {
        let schedule = match side {
            Side::Home => &ctx.home_schedule,
            Side::Away => &ctx.away_schedule,
        };
        let points = config.team_points(
            schedule,
            adj.temperature_severity,
            adj.wind_severity,
            adj.precipitation_severity,
        );
        match side {
            Side::Home => adj.home_points = points,
            Side::Away => adj.away_points = points,
        }
    }

    adj.spread_delta = (adj.home_points - adj.away_points) / config.conversion_ratio;
    adj.total_delta = -(adj.temperature_severity + adj.wind_severity + adj.precipitation_severity)
        / config.conversion_ratio;

    debug!(
        game_id = %ctx.game_id,
        temperature_f = obs.temperature_f,
        wind_mph = obs.wind_mph,
        precipitation = ?obs.precipitation,
        spread_delta = adj.spread_delta,
        total_delta = adj.total_delta,
        "Weather adjustment"
    );
    adj
}
