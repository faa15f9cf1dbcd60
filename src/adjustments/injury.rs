//! Injury impact: point value a team loses to its injury list.
//!
//! Per player the lost value is `base * (1 - capacity)`, where the base comes
//! from a position x tier table and capacity recovers linearly from the
//! immediate capacity toward 1.0 over the injury type's typical recovery.
//! Units with three or more degraded starters compound.

use crate::domain::{Confidence, DataQualityIssue, TeamId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Player importance tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Elite,
    Starter,
    Backup,
}

/// Reported game status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjuryStatus {
    Probable,
    Questionable,
    Doubtful,
    Out,
    #[serde(alias = "ir")]
    InjuredReserve,
}

impl InjuryStatus {
    /// Whether the player cannot play regardless of recovery
    pub fn is_unavailable(&self) -> bool {
        matches!(self, InjuryStatus::Out | InjuryStatus::InjuredReserve)
    }

    /// Ordering used for trend detection (higher = worse)
    fn severity(&self) -> u8 {
        match self {
            InjuryStatus::Probable => 0,
            InjuryStatus::Questionable => 1,
            InjuryStatus::Doubtful => 2,
            InjuryStatus::Out => 3,
            InjuryStatus::InjuredReserve => 4,
        }
    }
}

/// Injury category driving the recovery curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InjuryType {
    Concussion,
    Hamstring,
    Ankle,
    Knee,
    Acl,
    Shoulder,
    Back,
    Illness,
    #[default]
    #[serde(other)]
    Other,
}

/// Roster position, parsed leniently from feed labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    Qb,
    Rb,
    Wr,
    Te,
    Ot,
    Og,
    C,
    De,
    Dt,
    Lb,
    Cb,
    S,
    K,
    P,
    Ls,
}

impl Position {
    /// Parse a raw position label ("LT", "hb", "FS", ...)
    pub fn parse(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_uppercase();
        let position = match normalized.as_str() {
            "QB" => Position::Qb,
            "RB" | "HB" | "FB" => Position::Rb,
            "WR" => Position::Wr,
            "TE" => Position::Te,
            "OT" | "T" | "LT" | "RT" => Position::Ot,
            "OG" | "G" | "LG" | "RG" => Position::Og,
            "C" | "OC" => Position::C,
            "DE" | "EDGE" => Position::De,
            "DT" | "NT" | "DL" => Position::Dt,
            "LB" | "ILB" | "OLB" | "MLB" => Position::Lb,
            "CB" => Position::Cb,
            "S" | "FS" | "SS" | "DB" => Position::S,
            "K" | "PK" => Position::K,
            "P" => Position::P,
            "LS" => Position::Ls,
            _ => return None,
        };
        Some(position)
    }

    /// Position group that compounds when several starters are hurt
    pub fn unit(&self) -> Option<Unit> {
        match self {
            Position::Ot | Position::Og | Position::C => Some(Unit::OffensiveLine),
            Position::De | Position::Dt => Some(Unit::DefensiveLine),
            Position::Cb | Position::S => Some(Unit::Secondary),
            _ => None,
        }
    }

    /// Whether losing this player mostly costs points scored
    pub fn is_offense(&self) -> bool {
        matches!(
            self,
            Position::Qb
                | Position::Rb
                | Position::Wr
                | Position::Te
                | Position::Ot
                | Position::Og
                | Position::C
        )
    }
}

/// Position groups subject to crisis compounding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    OffensiveLine,
    DefensiveLine,
    Secondary,
}

/// One injury report for one player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjuryRecord {
    pub player_id: String,
    pub player_name: String,
    pub team: TeamId,
    /// Raw position label from the feed
    pub position: String,
    pub tier: Tier,
    pub status: InjuryStatus,
    #[serde(default)]
    pub injury_type: InjuryType,
    pub injury_date: NaiveDate,
    pub report_date: NaiveDate,
}

/// Point values per tier for one position
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierValues {
    pub elite: f64,
    pub starter: f64,
    pub backup: f64,
}

impl TierValues {
    const fn new(elite: f64, starter: f64, backup: f64) -> Self {
        Self {
            elite,
            starter,
            backup,
        }
    }

    pub fn get(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Elite => self.elite,
            Tier::Starter => self.starter,
            Tier::Backup => self.backup,
        }
    }
}

/// Base point value by position and tier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionValueTable {
    pub qb: TierValues,
    pub rb: TierValues,
    pub wr: TierValues,
    pub te: TierValues,
    pub ot: TierValues,
    pub og: TierValues,
    pub c: TierValues,
    pub de: TierValues,
    pub dt: TierValues,
    pub lb: TierValues,
    pub cb: TierValues,
    pub s: TierValues,
    pub k: TierValues,
    pub p: TierValues,
    pub ls: TierValues,
}

impl Default for PositionValueTable {
    fn default() -> Self {
        Self {
            qb: TierValues::new(7.0, 4.5, 1.0),
            rb: TierValues::new(1.5, 0.8, 0.2),
            wr: TierValues::new(2.0, 1.2, 0.3),
            te: TierValues::new(1.5, 0.8, 0.2),
            ot: TierValues::new(1.5, 1.0, 0.3),
            og: TierValues::new(1.0, 0.7, 0.2),
            c: TierValues::new(1.2, 0.8, 0.2),
            de: TierValues::new(1.8, 1.0, 0.3),
            dt: TierValues::new(1.2, 0.8, 0.2),
            lb: TierValues::new(1.2, 0.7, 0.2),
            cb: TierValues::new(1.8, 1.0, 0.3),
            s: TierValues::new(1.2, 0.7, 0.2),
            k: TierValues::new(0.8, 0.5, 0.1),
            p: TierValues::new(0.4, 0.3, 0.1),
            ls: TierValues::new(0.2, 0.1, 0.05),
        }
    }
}

impl PositionValueTable {
    pub fn value(&self, position: Position, tier: Tier) -> f64 {
        let values = match position {
            Position::Qb => &self.qb,
            Position::Rb => &self.rb,
            Position::Wr => &self.wr,
            Position::Te => &self.te,
            Position::Ot => &self.ot,
            Position::Og => &self.og,
            Position::C => &self.c,
            Position::De => &self.de,
            Position::Dt => &self.dt,
            Position::Lb => &self.lb,
            Position::Cb => &self.cb,
            Position::S => &self.s,
            Position::K => &self.k,
            Position::P => &self.p,
            Position::Ls => &self.ls,
        };
        values.get(tier)
    }

    fn all(&self) -> [&TierValues; 15] {
        [
            &self.qb, &self.rb, &self.wr, &self.te, &self.ot, &self.og, &self.c, &self.de,
            &self.dt, &self.lb, &self.cb, &self.s, &self.k, &self.p, &self.ls,
        ]
    }
}

/// Capacity factor and typical recovery for an injury type
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RecoveryProfile {
    pub capacity_factor: f64,
    pub recovery_days: u32,
}

impl RecoveryProfile {
    const fn new(capacity_factor: f64, recovery_days: u32) -> Self {
        Self {
            capacity_factor,
            recovery_days,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryTable {
    pub concussion: RecoveryProfile,
    pub hamstring: RecoveryProfile,
    pub ankle: RecoveryProfile,
    pub knee: RecoveryProfile,
    pub acl: RecoveryProfile,
    pub shoulder: RecoveryProfile,
    pub back: RecoveryProfile,
    pub illness: RecoveryProfile,
    pub other: RecoveryProfile,
}

impl Default for RecoveryTable {
    fn default() -> Self {
        Self {
            concussion: RecoveryProfile::new(0.5, 10),
            hamstring: RecoveryProfile::new(0.7, 21),
            ankle: RecoveryProfile::new(0.8, 14),
            knee: RecoveryProfile::new(0.6, 28),
            acl: RecoveryProfile::new(0.2, 270),
            shoulder: RecoveryProfile::new(0.8, 14),
            back: RecoveryProfile::new(0.75, 14),
            illness: RecoveryProfile::new(0.9, 5),
            other: RecoveryProfile::new(0.85, 10),
        }
    }
}

impl RecoveryTable {
    pub fn profile(&self, injury_type: InjuryType) -> RecoveryProfile {
        match injury_type {
            InjuryType::Concussion => self.concussion,
            InjuryType::Hamstring => self.hamstring,
            InjuryType::Ankle => self.ankle,
            InjuryType::Knee => self.knee,
            InjuryType::Acl => self.acl,
            InjuryType::Shoulder => self.shoulder,
            InjuryType::Back => self.back,
            InjuryType::Illness => self.illness,
            InjuryType::Other => self.other,
        }
    }
}

/// Playing capacity implied by each status before recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusTable {
    pub probable: f64,
    pub questionable: f64,
    pub doubtful: f64,
}

impl Default for StatusTable {
    fn default() -> Self {
        Self {
            probable: 0.9,
            questionable: 0.6,
            doubtful: 0.25,
        }
    }
}

impl StatusTable {
    pub fn base(&self, status: InjuryStatus) -> f64 {
        match status {
            InjuryStatus::Probable => self.probable,
            InjuryStatus::Questionable => self.questionable,
            InjuryStatus::Doubtful => self.doubtful,
            InjuryStatus::Out | InjuryStatus::InjuredReserve => 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InjuryConfig {
    pub positions: PositionValueTable,
    pub statuses: StatusTable,
    pub recovery: RecoveryTable,
    /// Value used when a position label is not recognized
    pub fallback_value: f64,
    /// Degraded starters in one unit that trigger compounding
    pub crisis_threshold: usize,
    pub crisis_multiplier: f64,
    /// Latest report older than this lowers confidence
    pub max_report_age_days: i64,
}

impl Default for InjuryConfig {
    fn default() -> Self {
        Self {
            positions: PositionValueTable::default(),
            statuses: StatusTable::default(),
            recovery: RecoveryTable::default(),
            fallback_value: 0.3,
            crisis_threshold: 3,
            crisis_multiplier: 1.5,
            max_report_age_days: 7,
        }
    }
}

impl InjuryConfig {
    pub fn validate(&self, errors: &mut Vec<String>) {
        if self.positions.all().iter().any(|v| {
            [v.elite, v.starter, v.backup]
                .iter()
                .any(|x| !x.is_finite() || *x < 0.0)
        }) {
            errors.push("injury: position values must be non-negative".to_string());
        }
        for (name, base) in [
            ("probable", self.statuses.probable),
            ("questionable", self.statuses.questionable),
            ("doubtful", self.statuses.doubtful),
        ] {
            if !(0.0..=1.0).contains(&base) {
                errors.push(format!("injury: status base for {name} must be within [0, 1]"));
            }
        }
        if self.crisis_multiplier < 1.0 {
            errors.push("injury: crisis_multiplier must be at least 1".to_string());
        }
        if self.crisis_threshold == 0 {
            errors.push("injury: crisis_threshold must be positive".to_string());
        }
    }

    /// Capacity at the time of injury, in `[0, 1]`
    pub fn immediate_capacity(&self, status: InjuryStatus, injury_type: InjuryType) -> f64 {
        let factor = self.recovery.profile(injury_type).capacity_factor;
        (self.statuses.base(status) * factor).clamp(0.0, 1.0)
    }

    /// Capacity after `days_since_injury` days of recovery, in `[0, 1]`
    pub fn capacity(&self, status: InjuryStatus, injury_type: InjuryType, days_since_injury: i64) -> f64 {
        if status.is_unavailable() {
            return 0.0;
        }
        let immediate = self.immediate_capacity(status, injury_type);
        let recovery_days = self.recovery.profile(injury_type).recovery_days;
        let progress = if recovery_days == 0 {
            1.0
        } else {
            (days_since_injury.max(0) as f64 / recovery_days as f64).min(1.0)
        };
        (immediate + (1.0 - immediate) * progress).clamp(0.0, 1.0)
    }

    /// Base point value for a raw position label and tier
    pub fn base_value(&self, label: &str, tier: Tier) -> Option<f64> {
        Position::parse(label).map(|position| self.positions.value(position, tier))
    }
}

/// Lost value for one player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerImpact {
    pub player_id: String,
    pub player_name: String,
    pub position: Option<Position>,
    pub tier: Tier,
    pub status: InjuryStatus,
    pub base_value: f64,
    pub capacity: f64,
    pub lost_value: f64,
}

/// Subtotal for a compounding unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitImpact {
    pub unit: Unit,
    pub degraded_starters: usize,
    pub subtotal: f64,
    pub crisis: bool,
}

/// Total injury impact for one team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjuryImpact {
    pub team: TeamId,
    /// Total lost point value
    pub total: f64,
    /// Lost value attributable to offensive positions
    pub offensive: f64,
    pub players: Vec<PlayerImpact>,
    pub units: Vec<UnitImpact>,
    pub confidence: Confidence,
    #[serde(default)]
    pub issues: Vec<DataQualityIssue>,
}

impl InjuryImpact {
    pub fn none(team: TeamId) -> Self {
        Self {
            team,
            total: 0.0,
            offensive: 0.0,
            players: Vec::new(),
            units: Vec::new(),
            confidence: Confidence::Normal,
            issues: Vec::new(),
        }
    }
}

/// Reason a record cannot be used, if any
fn malformed_reason(record: &InjuryRecord, team: &TeamId, as_of: NaiveDate) -> Option<String> {
    if &record.team != team {
        return Some(format!("record belongs to {}", record.team));
    }
    if record.report_date < record.injury_date {
        return Some(format!(
            "report date {} precedes injury date {}",
            record.report_date, record.injury_date
        ));
    }
    if record.injury_date > as_of {
        return Some(format!("injury date {} is in the future", record.injury_date));
    }
    None
}

/// Compute a team's injury impact as of a point in time.
///
/// Malformed records are skipped with a warning and a data-quality issue;
/// the rest of the list is still evaluated. The latest report per player
/// supersedes earlier ones.
pub fn injury_impact(
    team: &TeamId,
    records: &[InjuryRecord],
    as_of: DateTime<Utc>,
    config: &InjuryConfig,
) -> InjuryImpact {
    let today = as_of.date_naive();
    let mut impact = InjuryImpact::none(team.clone());

    let mut latest: HashMap<&str, &InjuryRecord> = HashMap::new();
    for record in records {
        if let Some(reason) = malformed_reason(record, team, today) {
            warn!(%team, player = %record.player_name, %reason, "Skipping injury record");
            impact.confidence = Confidence::Low;
            impact.issues.push(DataQualityIssue::SkippedInjuryRecord {
                team: team.to_string(),
                player: record.player_name.clone(),
                reason,
            });
            continue;
        }
        if record.report_date > today {
            debug!(
                %team,
                player = %record.player_name,
                report_date = %record.report_date,
                "Ignoring report published after as_of"
            );
            continue;
        }
        // Later reports supersede; ties go to the later record
        latest
            .entry(record.player_id.as_str())
            .and_modify(|current| {
                if record.report_date >= current.report_date {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    if let Some(newest) = latest.values().map(|r| r.report_date).max() {
        let age_days = (today - newest).num_days();
        if age_days > config.max_report_age_days {
            warn!(%team, age_days, "Stale injury report");
            impact.confidence = Confidence::Low;
            impact.issues.push(DataQualityIssue::StaleInjuryReport {
                team: team.to_string(),
                age_days,
            });
        }
    }

    let mut current: Vec<&InjuryRecord> = latest.into_values().collect();
    current.sort_by(|a, b| a.player_id.cmp(&b.player_id));

    let mut units: HashMap<Unit, UnitImpact> = HashMap::new();
    let mut ungrouped = 0.0;

    for record in current {
        let position = Position::parse(&record.position);
        let base_value = match position {
            Some(position) => config.positions.value(position, record.tier),
            None => {
                warn!(
                    %team,
                    player = %record.player_name,
                    position = %record.position,
                    fallback = config.fallback_value,
                    "Unrecognized position, using fallback value"
                );
                config.fallback_value
            }
        };
        let days = (today - record.injury_date).num_days();
        let capacity = config.capacity(record.status, record.injury_type, days);
        let lost_value = base_value * (1.0 - capacity);

        debug!(
            %team,
            player = %record.player_name,
            status = ?record.status,
            base_value,
            capacity,
            lost_value,
            "Player injury impact"
        );

        match position.and_then(|p| p.unit()) {
            Some(unit) => {
                let entry = units.entry(unit).or_insert(UnitImpact {
                    unit,
                    degraded_starters: 0,
                    subtotal: 0.0,
                    crisis: false,
                });
                entry.subtotal += lost_value;
                if capacity < 1.0 && record.tier != Tier::Backup {
                    entry.degraded_starters += 1;
                }
            }
            None => ungrouped += lost_value,
        }
        if position.is_some_and(|p| p.is_offense()) {
            impact.offensive += lost_value;
        }

        impact.players.push(PlayerImpact {
            player_id: record.player_id.clone(),
            player_name: record.player_name.clone(),
            position,
            tier: record.tier,
            status: record.status,
            base_value,
            capacity,
            lost_value,
        });
    }

    let mut total = ungrouped;
    let mut unit_impacts: Vec<UnitImpact> = units.into_values().collect();
    unit_impacts.sort_by_key(|u| u.unit);
    for unit in unit_impacts.iter_mut() {
        if unit.degraded_starters >= config.crisis_threshold {
            let compounded = unit.subtotal * config.crisis_multiplier;
            if unit.unit == Unit::OffensiveLine {
                impact.offensive += compounded - unit.subtotal;
            }
            debug!(%team, unit = ?unit.unit, degraded = unit.degraded_starters, "Unit crisis");
            unit.subtotal = compounded;
            unit.crisis = true;
        }
        total += unit.subtotal;
    }

    impact.total = total;
    impact.units = unit_impacts;
    impact
}

/// Direction of a player's reported status over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjuryTrend {
    Improving,
    Worsening,
    Stable,
}

/// Every report received this season, per player
#[derive(Debug, Clone, Default)]
pub struct InjuryHistory {
    reports: HashMap<String, Vec<InjuryRecord>>,
}

impl InjuryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain a report, keeping each player's reports in report order
    pub fn record(&mut self, record: InjuryRecord) {
        let reports = self.reports.entry(record.player_id.clone()).or_default();
        let idx = reports.partition_point(|r| r.report_date <= record.report_date);
        reports.insert(idx, record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = InjuryRecord>) {
        for record in records {
            self.record(record);
        }
    }

    pub fn reports(&self, player_id: &str) -> &[InjuryRecord] {
        self.reports.get(player_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn latest(&self, player_id: &str) -> Option<&InjuryRecord> {
        self.reports(player_id).last()
    }

    /// Reports for one team published by `as_of`, suitable for [`injury_impact`]
    pub fn team_records(&self, team: &TeamId, as_of: NaiveDate) -> Vec<InjuryRecord> {
        self.reports
            .values()
            .flatten()
            .filter(|r| &r.team == team && r.report_date <= as_of)
            .cloned()
            .collect()
    }

    /// Compare the two most recent reports for a player
    pub fn trend(&self, player_id: &str) -> InjuryTrend {
        match self.reports(player_id) {
            [.., previous, last] => match last.status.severity().cmp(&previous.status.severity()) {
                std::cmp::Ordering::Less => InjuryTrend::Improving,
                std::cmp::Ordering::Greater => InjuryTrend::Worsening,
                std::cmp::Ordering::Equal => InjuryTrend::Stable,
            },
            _ => InjuryTrend::Stable,
        }
    }
}
