//! Closing Line Tracker
//!
//! Follows each recommendation through pending -> closing-recorded ->
//! resolved and derives performance summaries from the records.

pub mod ledger;
pub mod record;
pub mod summary;

pub use ledger::{BetLedger, TrackerConfig};
pub use record::{BetRecord, BetResult, BetStatus};
pub use summary::{PerformanceSummary, SummaryFilter, TierStats};
