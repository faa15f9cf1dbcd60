//! Situational factors: schedule, travel, rest and venue context.
//!
//! Each factor awards a fixed increment from [`SituationalTable`] to one
//! team. Increments sum per team and the difference converts to spread
//! points through `conversion_ratio`. Overlapping factors all apply.

use crate::domain::{GameContext, Side, TeamSchedule};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fixed increments and bands for every situational factor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SituationalTable {
    /// Visitor playing on a surface different from its home surface
    pub surface_mismatch: f64,
    /// Home edge shrinks against a familiar division rival
    pub divisional_home: f64,
    pub short_week_max_rest: u32,
    pub short_week: f64,
    pub primetime_home: f64,
    pub bye_home: f64,
    pub bye_road: f64,
    pub travel_moderate_miles: u32,
    pub travel_moderate: f64,
    pub travel_long_miles: u32,
    pub travel_long: f64,
    pub time_zones_moderate: u8,
    pub time_zones_moderate_points: f64,
    pub time_zones_extreme: u8,
    pub time_zones_extreme_points: f64,
    /// Previous margin at or below this counts as a blowout loss
    pub bounce_back_margin: i32,
    pub bounce_back: f64,
    /// Carryover applies through this week of the new season
    pub postseason_carryover_weeks: u8,
    pub postseason_carryover: f64,
    pub long_rest_min_rest: u32,
    pub long_rest: f64,
}

impl Default for SituationalTable {
    fn default() -> Self {
        Self {
            surface_mismatch: -1.0,
            divisional_home: -1.0,
            short_week_max_rest: 5,
            short_week: -2.0,
            primetime_home: 1.0,
            bye_home: 3.0,
            bye_road: 2.0,
            travel_moderate_miles: 1000,
            travel_moderate: -1.0,
            travel_long_miles: 2000,
            travel_long: -2.0,
            time_zones_moderate: 2,
            time_zones_moderate_points: -1.0,
            time_zones_extreme: 3,
            time_zones_extreme_points: -2.0,
            bounce_back_margin: -21,
            bounce_back: 1.0,
            postseason_carryover_weeks: 4,
            postseason_carryover: 1.0,
            long_rest_min_rest: 10,
            long_rest: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SituationalConfig {
    pub table: SituationalTable,
    /// Situational points per spread point
    pub conversion_ratio: f64,
}

impl Default for SituationalConfig {
    fn default() -> Self {
        Self {
            table: SituationalTable::default(),
            conversion_ratio: 5.0,
        }
    }
}

impl SituationalConfig {
    pub fn validate(&self, errors: &mut Vec<String>) {
        if self.conversion_ratio <= 0.0 {
            errors.push("situational: conversion_ratio must be positive".to_string());
        }
        let t = &self.table;
        if t.travel_moderate_miles >= t.travel_long_miles {
            errors.push("situational: travel bands must be increasing".to_string());
        }
        if t.time_zones_moderate >= t.time_zones_extreme {
            errors.push("situational: time-zone bands must be increasing".to_string());
        }
    }
}

/// Kind of situational factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    SurfaceMismatch,
    Divisional,
    ShortWeek,
    Primetime,
    ByeReturn,
    Travel,
    TimeZones,
    BounceBack,
    PostseasonCarryover,
    LongRest,
}

/// One applied factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SituationalFactor {
    pub side: Side,
    pub kind: FactorKind,
    pub points: f64,
}

/// Result of the situational calculation for one matchup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SituationalAdjustment {
    pub home_points: f64,
    pub away_points: f64,
    /// Spread points in home-margin units
    pub spread_delta: f64,
    pub factors: Vec<SituationalFactor>,
}

impl SituationalAdjustment {
    fn apply(&mut self, side: Side, kind: FactorKind, points: f64) {
        if points == 0.0 {
            return;
        }
        match side {
            Side::Home => self.home_points += points,
            Side::Away => self.away_points += points,
        }
        self.factors.push(SituationalFactor { side, kind, points });
    }
}

/// Compute the situational spread adjustment for a matchup
pub fn situational_adjustment(ctx: &GameContext, config: &SituationalConfig) -> SituationalAdjustment {
    let table = &config.table;
    let mut adj = SituationalAdjustment::default();

    for side in [Side::Home, Side::Away] {
        let schedule = match side {
            Side::Home => &ctx.home_schedule,
            Side::Away => &ctx.away_schedule,
        };
        // On a neutral field both teams are visitors
        let at_home = side == Side::Home && !ctx.neutral_site;

        if !at_home && schedule.home_surface != ctx.venue.surface {
            adj.apply(side, FactorKind::SurfaceMismatch, table.surface_mismatch);
        }
        if schedule.rest_days <= table.short_week_max_rest {
            adj.apply(side, FactorKind::ShortWeek, table.short_week);
        }
        if schedule.off_bye {
            let points = if at_home { table.bye_home } else { table.bye_road };
            adj.apply(side, FactorKind::ByeReturn, points);
        } else if schedule.rest_days >= table.long_rest_min_rest {
            adj.apply(side, FactorKind::LongRest, table.long_rest);
        }
        adj.apply(side, FactorKind::Travel, travel_points(schedule, table));
        adj.apply(side, FactorKind::TimeZones, time_zone_points(schedule, table));
        if schedule
            .previous_margin
            .is_some_and(|margin| margin <= table.bounce_back_margin)
        {
            adj.apply(side, FactorKind::BounceBack, table.bounce_back);
        }
        if schedule.prior_postseason && ctx.period.week <= table.postseason_carryover_weeks {
            adj.apply(side, FactorKind::PostseasonCarryover, table.postseason_carryover);
        }
    }

    if !ctx.neutral_site {
        if ctx.divisional {
            adj.apply(Side::Home, FactorKind::Divisional, table.divisional_home);
        }
        if ctx.primetime {
            adj.apply(Side::Home, FactorKind::Primetime, table.primetime_home);
        }
    }

    adj.spread_delta = (adj.home_points - adj.away_points) / config.conversion_ratio;

    debug!(
        game_id = %ctx.game_id,
        home_points = adj.home_points,
        away_points = adj.away_points,
        spread_delta = adj.spread_delta,
        factors = adj.factors.len(),
        "Situational adjustment"
    );
    adj
}

fn travel_points(schedule: &TeamSchedule, table: &SituationalTable) -> f64 {
    if schedule.travel_miles >= table.travel_long_miles {
        table.travel_long
    } else if schedule.travel_miles >= table.travel_moderate_miles {
        table.travel_moderate
    } else {
        0.0
    }
}

fn time_zone_points(schedule: &TeamSchedule, table: &SituationalTable) -> f64 {
    if schedule.time_zones_crossed >= table.time_zones_extreme {
        table.time_zones_extreme_points
    } else if schedule.time_zones_crossed >= table.time_zones_moderate {
        table.time_zones_moderate_points
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Period, Surface, TeamId, Venue};
    use chrono::Utc;

    fn context() -> GameContext {
        GameContext {
            game_id: "2025-05-SEA-MIA".to_string(),
            period: Period::new(2025, 5),
            home: TeamId::new("SEA"),
            away: TeamId::new("MIA"),
            kickoff: Utc::now(),
            venue: Venue {
                id: "lumen".to_string(),
                surface: Surface::Turf,
                indoor: false,
            },
            neutral_site: false,
            home_schedule: TeamSchedule {
                rest_days: 7,
                home_surface: Surface::Turf,
                ..Default::default()
            },
            away_schedule: TeamSchedule {
                rest_days: 7,
                home_surface: Surface::Turf,
                ..Default::default()
            },
            divisional: false,
            conference: false,
            primetime: false,
            postseason: false,
        }
    }

    #[test]
    fn test_plain_matchup_is_zero() {
        let adj = situational_adjustment(&context(), &SituationalConfig::default());
        assert_eq!(adj.spread_delta, 0.0);
        assert!(adj.factors.is_empty());
    }

    #[test]
    fn test_overlapping_factors_all_apply() {
        // Short week and cross-country travel through three time zones
        let mut ctx = context();
        ctx.away_schedule.rest_days = 4;
        ctx.away_schedule.travel_miles = 2700;
        ctx.away_schedule.time_zones_crossed = 3;

        let adj = situational_adjustment(&ctx, &SituationalConfig::default());
        assert_eq!(adj.away_points, -6.0);
        assert_eq!(adj.factors.len(), 3);
        // (0 - -6) / 5
        assert!((adj.spread_delta - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_bands_are_fixed_not_interpolated() {
        let config = SituationalConfig::default();
        let mut ctx = context();

        ctx.away_schedule.travel_miles = 999;
        assert_eq!(situational_adjustment(&ctx, &config).away_points, 0.0);
        ctx.away_schedule.travel_miles = 1000;
        assert_eq!(situational_adjustment(&ctx, &config).away_points, -1.0);
        ctx.away_schedule.travel_miles = 1999;
        assert_eq!(situational_adjustment(&ctx, &config).away_points, -1.0);
        ctx.away_schedule.travel_miles = 2000;
        assert_eq!(situational_adjustment(&ctx, &config).away_points, -2.0);
    }

    #[test]
    fn test_surface_mismatch_hits_visitor_only() {
        let mut ctx = context();
        ctx.away_schedule.home_surface = Surface::Grass;
        ctx.home_schedule.home_surface = Surface::Grass;
        let adj = situational_adjustment(&ctx, &SituationalConfig::default());
        assert_eq!(adj.away_points, -1.0);
        assert_eq!(adj.home_points, 0.0);
    }

    #[test]
    fn test_bye_return_home_vs_road() {
        let config = SituationalConfig::default();
        let mut ctx = context();
        ctx.home_schedule.off_bye = true;
        ctx.home_schedule.rest_days = 14;
        let adj = situational_adjustment(&ctx, &config);
        // Bye replaces long rest
        assert_eq!(adj.home_points, 3.0);

        let mut ctx = context();
        ctx.away_schedule.off_bye = true;
        ctx.away_schedule.rest_days = 14;
        assert_eq!(situational_adjustment(&ctx, &config).away_points, 2.0);
    }

    #[test]
    fn test_home_only_factors_skip_neutral_site() {
        let config = SituationalConfig::default();
        let mut ctx = context();
        ctx.divisional = true;
        ctx.primetime = true;
        let adj = situational_adjustment(&ctx, &config);
        assert_eq!(adj.home_points, 0.0);
        assert_eq!(adj.factors.len(), 2);

        ctx.neutral_site = true;
        let adj = situational_adjustment(&ctx, &config);
        assert!(adj.factors.is_empty());
    }

    #[test]
    fn test_bounce_back_and_carryover() {
        let config = SituationalConfig::default();
        let mut ctx = context();
        ctx.period = Period::new(2025, 2);
        ctx.home_schedule.previous_margin = Some(-24);
        ctx.home_schedule.prior_postseason = true;
        ctx.away_schedule.previous_margin = Some(-20);
        let adj = situational_adjustment(&ctx, &config);
        assert_eq!(adj.home_points, 2.0);
        assert_eq!(adj.away_points, 0.0);

        ctx.period = Period::new(2025, 5);
        assert_eq!(situational_adjustment(&ctx, &config).home_points, 1.0);
    }

    #[test]
    fn test_conversion_ratio_validated() {
        let mut errors = Vec::new();
        SituationalConfig {
            conversion_ratio: 0.0,
            ..Default::default()
        }
        .validate(&mut errors);
        assert_eq!(errors.len(), 1);
    }
}
