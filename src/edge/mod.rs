//! Edge Detector & Staking
//!
//! - `prediction`: predicted lines built from named contributions
//! - `classify`: gap vs. market, key numbers, tiers, stability
//! - `staking`: fractional-Kelly sizing under bankroll ceilings
//! - `evaluator`: per-game and slate evaluation

pub mod classify;
pub mod evaluator;
pub mod prediction;
pub mod staking;

pub use classify::{detect_edge, EdgeConfig, EdgeResult, EdgeTier, KeyNumber, Stability};
pub use evaluator::{Evaluator, GameEvaluation, GameInputs, SlateEvaluation};
pub use prediction::{Contribution, ContributionKind, PredictedLine, PredictionArchive};
pub use staking::{
    full_kelly, ClampKind, ExposureLedger, Recommendation, Sizing, StakeClamp, Staker, StakingConfig,
};
