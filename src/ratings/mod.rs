//! Team power ratings
//!
//! - `margin`: garbage-time stripping and home-field adjustment
//! - `store`: versioned rating store with per-team write serialization

pub mod margin;
pub mod store;

pub use margin::{adjusted_margin, effective_home_margin, GarbageTimeRule, MarginBasis};
pub use store::{PowerRatingStore, RatingConfig, RatingSnapshot, TeamMargin};
