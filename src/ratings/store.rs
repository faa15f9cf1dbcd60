//! Power Rating Store
//!
//! Holds one scalar rating per team and folds completed results into it with
//! a fixed blend rule. Readers work against an immutable, versioned
//! [`RatingSnapshot`]; writers are serialized per team so at most one update
//! per team is in flight while different teams update in parallel.

use super::margin::{adjusted_margin, effective_home_margin, GarbageTimeRule, MarginBasis};
use crate::domain::{GameResult, Period, TeamId, TeamRating, VenueRole};
use crate::error::{LinesmithError, Result};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info};

/// Rating store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Weight kept from the previous rating
    pub old_weight: f64,
    /// Weight given to the new game's adjusted margin
    pub margin_weight: f64,
    /// Home-field advantage in points
    pub home_field: f64,
    /// Scoring inside this many final seconds can be garbage time
    pub garbage_time_seconds: u32,
    /// Trailing by more than this many points makes late scoring garbage time
    pub garbage_time_deficit: u16,
    pub basis: MarginBasis,
    /// Where the store is persisted between runs
    pub store_path: Option<PathBuf>,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            old_weight: 0.9,
            margin_weight: 0.1,
            home_field: 2.5,
            garbage_time_seconds: 120,
            garbage_time_deficit: 14,
            basis: MarginBasis::Raw,
            store_path: Some(PathBuf::from("data/ratings.json")),
        }
    }
}

impl RatingConfig {
    pub fn garbage_time_rule(&self) -> GarbageTimeRule {
        GarbageTimeRule {
            final_seconds: self.garbage_time_seconds,
            deficit: self.garbage_time_deficit,
        }
    }

    /// Validate configuration values
    pub fn validate(&self, errors: &mut Vec<String>) {
        if !(0.0..=1.0).contains(&self.old_weight) || !(0.0..=1.0).contains(&self.margin_weight) {
            errors.push("ratings: blend weights must be within [0, 1]".to_string());
        }
        if ((self.old_weight + self.margin_weight) - 1.0).abs() > 1e-9 {
            errors.push(format!(
                "ratings: blend weights must sum to 1 (got {} + {})",
                self.old_weight, self.margin_weight
            ));
        }
        if self.home_field < 0.0 {
            errors.push("ratings: home_field must be non-negative".to_string());
        }
    }
}

/// One team's margin from a completed game, garbage time already removed
#[derive(Debug, Clone, Copy)]
pub struct TeamMargin {
    pub venue: VenueRole,
    /// Team's own margin (positive = won by)
    pub points: f64,
    pub period: Period,
}

/// Immutable view of every team's current rating
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatingSnapshot {
    pub version: u64,
    ratings: HashMap<TeamId, TeamRating>,
}

impl RatingSnapshot {
    pub fn get(&self, team: &TeamId) -> Result<&TeamRating> {
        self.ratings
            .get(team)
            .ok_or_else(|| LinesmithError::team_not_found(team))
    }

    pub fn rating(&self, team: &TeamId) -> Result<f64> {
        self.get(team).map(|r| r.rating)
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn teams(&self) -> impl Iterator<Item = &TeamId> {
        self.ratings.keys()
    }
}

/// On-disk form of the store: full per-team history
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u64,
    histories: BTreeMap<TeamId, Vec<TeamRating>>,
}

type TeamLedger = Arc<Mutex<Vec<TeamRating>>>;

fn lock(ledger: &TeamLedger) -> MutexGuard<'_, Vec<TeamRating>> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Power rating store with per-team write serialization
pub struct PowerRatingStore {
    config: RatingConfig,
    /// Last committed snapshot
    current: RwLock<Arc<RatingSnapshot>>,
    /// Per-team rating history; the mutex is the team's write lock
    histories: DashMap<TeamId, TeamLedger>,
}

impl PowerRatingStore {
    /// Create an empty store
    pub fn new(config: RatingConfig) -> Self {
        Self {
            config,
            current: RwLock::new(Arc::new(RatingSnapshot::default())),
            histories: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// Last committed snapshot; never changes underneath the caller
    pub fn snapshot(&self) -> Arc<RatingSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Current rating of a team
    pub fn get(&self, team: &TeamId) -> Result<TeamRating> {
        self.snapshot().get(team).cloned()
    }

    /// Every rating a team has held, oldest first
    pub fn history(&self, team: &TeamId) -> Result<Vec<TeamRating>> {
        let ledger = self.ledger(team)?;
        let history = lock(&ledger).clone();
        Ok(history)
    }

    /// Register a team with a starting rating
    pub fn register(&self, team: TeamId, rating: f64, period: Period) -> Result<TeamRating> {
        let mut seed = [TeamRating {
            team: team.clone(),
            rating,
            period,
            version: 0,
        }];
        match self.histories.entry(team) {
            Entry::Occupied(entry) => {
                return Err(LinesmithError::InvalidState(format!(
                    "team {} is already registered",
                    entry.key()
                )));
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Mutex::new(Vec::new())));
            }
        }

        let ledger = self.ledger(&seed[0].team)?;
        let history = lock(&ledger);
        self.commit(&mut seed);
        Self::append(history, &seed[0]);

        let [seed] = seed;
        debug!(team = %seed.team, rating, "Registered team");
        Ok(seed)
    }

    /// Register a batch of seed ratings
    pub fn seed(&self, seeds: Vec<TeamRating>) -> Result<usize> {
        let count = seeds.len();
        for seed in seeds {
            self.register(seed.team, seed.rating, seed.period)?;
        }
        info!("Seeded {} team ratings", count);
        Ok(count)
    }

    /// Fold one team's game margin into its rating.
    ///
    /// `new = old * old_weight + adjusted_margin * margin_weight`
    pub fn update(&self, team: &TeamId, opponent: &TeamId, margin: &TeamMargin) -> Result<TeamRating> {
        let team_ledger = self.ledger(team)?;
        // Opponent must exist even under the raw basis
        self.ledger(opponent)?;

        let history = lock(&team_ledger);
        let snapshot = self.snapshot();
        let mut next = [self.blend(&snapshot, team, opponent, margin)?];
        self.commit(&mut next);
        Self::append(history, &next[0]);

        let [next] = next;
        Ok(next)
    }

    /// Apply a completed game to both teams from one pre-game snapshot.
    ///
    /// Garbage-time scoring is stripped before the blend rule runs.
    pub fn apply_result(
        &self,
        result: &GameResult,
        as_of: DateTime<Utc>,
    ) -> Result<(TeamRating, TeamRating)> {
        if !result.completed {
            return Err(LinesmithError::InvalidState(format!(
                "game {} is not completed",
                result.game_id
            )));
        }
        if result.kickoff > as_of {
            return Err(LinesmithError::InvalidState(format!(
                "game {} kicks off in the future ({})",
                result.game_id, result.kickoff
            )));
        }
        if result.home == result.away {
            return Err(LinesmithError::InvalidState(format!(
                "game {} lists {} on both sides",
                result.game_id, result.home
            )));
        }

        let home_ledger = self.ledger(&result.home)?;
        let away_ledger = self.ledger(&result.away)?;

        // Lock in id order so concurrent games never deadlock
        let (home_history, away_history) = if result.home < result.away {
            let h = lock(&home_ledger);
            let a = lock(&away_ledger);
            (h, a)
        } else {
            let a = lock(&away_ledger);
            let h = lock(&home_ledger);
            (h, a)
        };

        let home_margin = effective_home_margin(result, self.config.garbage_time_rule());
        let (home_role, away_role) = if result.neutral_site {
            (VenueRole::Neutral, VenueRole::Neutral)
        } else {
            (VenueRole::Home, VenueRole::Away)
        };

        let snapshot = self.snapshot();
        let home_next = self.blend(
            &snapshot,
            &result.home,
            &result.away,
            &TeamMargin {
                venue: home_role,
                points: home_margin,
                period: result.period,
            },
        )?;
        let away_next = self.blend(
            &snapshot,
            &result.away,
            &result.home,
            &TeamMargin {
                venue: away_role,
                points: -home_margin,
                period: result.period,
            },
        )?;

        let mut committed = [home_next, away_next];
        self.commit(&mut committed);
        Self::append(home_history, &committed[0]);
        Self::append(away_history, &committed[1]);

        info!(
            game_id = %result.game_id,
            home = %committed[0].team,
            home_rating = committed[0].rating,
            away = %committed[1].team,
            away_rating = committed[1].rating,
            margin = home_margin,
            version = committed[0].version,
            "Applied game result"
        );

        let [home, away] = committed;
        Ok((home, away))
    }

    /// Compute a team's next rating without committing it
    fn blend(
        &self,
        snapshot: &RatingSnapshot,
        team: &TeamId,
        opponent: &TeamId,
        margin: &TeamMargin,
    ) -> Result<TeamRating> {
        let current = snapshot.get(team)?;
        if margin.period < current.period {
            return Err(LinesmithError::InvalidState(format!(
                "{team} already rated through {}, cannot apply {}",
                current.period, margin.period
            )));
        }

        let mut adjusted = adjusted_margin(margin.venue, margin.points, self.config.home_field);
        if self.config.basis == MarginBasis::OpponentRelative {
            adjusted += snapshot.rating(opponent)?;
        }
        let rating = current.rating * self.config.old_weight + adjusted * self.config.margin_weight;

        debug!(
            %team,
            %opponent,
            old = current.rating,
            adjusted_margin = adjusted,
            new = rating,
            "Blended rating"
        );

        Ok(TeamRating {
            team: team.clone(),
            rating,
            period: margin.period,
            version: 0,
        })
    }

    /// Publish new ratings as one snapshot version
    fn commit(&self, ratings: &mut [TeamRating]) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = RatingSnapshot::clone(&guard);
        next.version += 1;
        for rating in ratings.iter_mut() {
            rating.version = next.version;
            next.ratings.insert(rating.team.clone(), rating.clone());
        }
        *guard = Arc::new(next);
    }

    fn append(mut history: MutexGuard<'_, Vec<TeamRating>>, rating: &TeamRating) {
        history.push(rating.clone());
    }

    fn ledger(&self, team: &TeamId) -> Result<TeamLedger> {
        self.histories
            .get(team)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LinesmithError::team_not_found(team))
    }

    // ==================== Persistence ====================

    /// Save the full rating history as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let histories: BTreeMap<TeamId, Vec<TeamRating>> = self
            .histories
            .iter()
            .map(|entry| (entry.key().clone(), lock(entry.value()).clone()))
            .collect();
        let file = StoreFile {
            version: self.snapshot().version,
            histories,
        };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;

        debug!("Saved {} team histories to {:?}", file.histories.len(), path);
        Ok(())
    }

    /// Load a store saved by [`PowerRatingStore::save`].
    ///
    /// A missing file yields an empty store.
    pub fn load(config: RatingConfig, path: &Path) -> Result<Self> {
        let store = Self::new(config);
        if !path.exists() {
            debug!("No existing ratings file, starting fresh");
            return Ok(store);
        }

        let content = std::fs::read_to_string(path)?;
        let file: StoreFile = serde_json::from_str(&content)?;

        let mut snapshot = RatingSnapshot {
            version: file.version,
            ratings: HashMap::new(),
        };
        for (team, history) in file.histories {
            let Some(latest) = history.last().cloned() else {
                continue;
            };
            snapshot.ratings.insert(team.clone(), latest);
            store.histories.insert(team, Arc::new(Mutex::new(history)));
        }

        info!(
            "Loaded {} team ratings (version {})",
            snapshot.len(),
            snapshot.version
        );
        *store.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
        Ok(store)
    }
}
