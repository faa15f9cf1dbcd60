//! Persistent bet ledger

use super::record::BetRecord;
use super::summary::{PerformanceSummary, SummaryFilter};
use crate::domain::{FinalScore, MarketLine};
use crate::edge::Recommendation;
use crate::error::{LinesmithError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Where bet records persist; `None` keeps them in memory
    pub ledger_path: Option<PathBuf>,
    /// JSONL archive of every predicted line; `None` disables it
    pub prediction_archive: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            ledger_path: Some(PathBuf::from("data/bets.json")),
            prediction_archive: Some(PathBuf::from("data/predictions.jsonl")),
        }
    }
}

/// Bet ledger with JSON persistence after every transition
pub struct BetLedger {
    /// Path to the ledger JSON file
    path: Option<PathBuf>,
    records: RwLock<Vec<BetRecord>>,
}

impl BetLedger {
    /// Ledger that never touches disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: RwLock::new(Vec::new()),
        }
    }

    /// Load existing records, starting empty when the file is missing
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records: Vec<BetRecord> = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let records: Vec<BetRecord> = serde_json::from_str(&content)?;
            info!("Loaded {} bet records", records.len());
            records
        } else {
            debug!("No existing ledger file, starting fresh");
            Vec::new()
        };
        Ok(Self {
            path: Some(path),
            records: RwLock::new(records),
        })
    }

    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        match &config.ledger_path {
            Some(path) => Self::load(path),
            None => Ok(Self::in_memory()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<BetRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<BetRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Save records to file (no-op for in-memory ledgers)
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let records = self.read();
        let content = serde_json::to_string_pretty(&*records)?;
        std::fs::write(path, content)?;

        debug!("Saved {} bet records to {:?}", records.len(), path);
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        self.save().map_err(|e| {
            error!(error = %e, "Failed to persist bet ledger");
            e
        })
    }

    /// Open a pending record for a recommendation
    pub fn open(&self, rec: &Recommendation) -> Result<BetRecord> {
        let record = {
            let mut records = self.write();
            if records.iter().any(|r| r.recommendation_id == rec.id) {
                return Err(LinesmithError::InvalidState(format!(
                    "recommendation {} already has a bet record",
                    rec.id
                )));
            }
            let record = BetRecord::open(rec, rec.created_at);
            records.push(record.clone());
            record
        };

        info!(
            id = %record.id,
            game_id = %record.game_id,
            side = %record.side,
            line = record.opening_line,
            stake = %record.stake_amount,
            "Opened bet record"
        );
        self.persist()?;
        Ok(record)
    }

    /// Apply a transition to one record, leaving it untouched on failure
    fn apply<F>(&self, id: Uuid, f: F) -> Result<BetRecord>
    where
        F: FnOnce(&mut BetRecord) -> Result<()>,
    {
        let updated = {
            let mut records = self.write();
            let record = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| LinesmithError::bet_not_found(id))?;
            let mut next = record.clone();
            f(&mut next)?;
            *record = next.clone();
            next
        };
        self.persist()?;
        Ok(updated)
    }

    /// Capture the closing line for a pending record
    pub fn record_closing(&self, id: Uuid, closing: &MarketLine) -> Result<BetRecord> {
        let record = self.apply(id, |r| r.record_closing(closing, Utc::now()))?;
        info!(
            %id,
            game_id = %record.game_id,
            closing = ?record.closing_line,
            clv = ?record.clv(),
            "Recorded closing line"
        );
        Ok(record)
    }

    /// Resolve a record against the final score
    pub fn resolve(&self, id: Uuid, score: FinalScore) -> Result<BetRecord> {
        let record = self.apply(id, |r| r.resolve(score, Utc::now()))?;
        info!(
            %id,
            game_id = %record.game_id,
            result = ?record.result,
            pnl = ?record.pnl,
            "Resolved bet"
        );
        Ok(record)
    }

    pub fn get(&self, id: Uuid) -> Result<BetRecord> {
        self.read()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| LinesmithError::bet_not_found(id))
    }

    pub fn records(&self) -> Vec<BetRecord> {
        self.read().clone()
    }

    /// Records for a game that still await a closing line
    pub fn pending_for_game(&self, game_id: &str) -> Vec<BetRecord> {
        self.read()
            .iter()
            .filter(|r| r.game_id == game_id && r.closing_line.is_none())
            .cloned()
            .collect()
    }

    /// Aggregate performance; pure read
    pub fn summary(&self, filter: SummaryFilter) -> PerformanceSummary {
        PerformanceSummary::from_records(self.read().iter(), filter)
    }
}
