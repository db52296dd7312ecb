//! Strategies: turn a multi-timeframe frame into a direction and confidence.
//!
//! The [`Strategy`] trait is the narrow seam the signal engine depends on.
//! [`ConfluenceScorer`] is the one concrete strategy; its behavior is entirely
//! driven by a [`ScorerConfig`] (see [`presets`] for the named configurations).

pub mod checks;
pub mod presets;
pub mod scorer;

pub use checks::{Check, CheckOutcome};
pub use presets::Preset;
pub use scorer::{CheckEntry, ConfluenceScorer, ScoreCard, ScorerConfig, TimeframeChecks};

use serde::{Deserialize, Serialize};

use crate::data::MultiTimeframeFrame;

/// Trade direction recommended by a strategy or the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Buy,
    Sell,
    Neutral,
}

impl Direction {
    /// +1.0 for buy, -1.0 for sell, 0.0 for neutral.
    pub fn sign(self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
            Self::Neutral => 0.0,
        }
    }
}

/// A strategy's verdict on one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub direction: Direction,
    /// In `[0, 1]`; exactly 0 when `direction` is `Neutral`.
    pub confidence: f64,
}

impl StrategyResult {
    pub fn neutral() -> Self {
        Self {
            direction: Direction::Neutral,
            confidence: 0.0,
        }
    }

    /// Direction from the sign of `score`, confidence `|score| / total`.
    pub fn from_score(score: i32, total: u32) -> Self {
        if total == 0 || score == 0 {
            return Self::neutral();
        }
        let direction = if score > 0 {
            Direction::Buy
        } else {
            Direction::Sell
        };
        Self {
            direction,
            confidence: (f64::from(score.unsigned_abs()) / f64::from(total)).min(1.0),
        }
    }

    /// Signed contribution: `confidence * sign(direction)`.
    pub fn signed(&self) -> f64 {
        self.confidence * self.direction.sign()
    }
}

/// Something that can score one bar of a frame.
///
/// Implementations must only look at bars `[0..=bar_index]` of each timeframe.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, frame: &MultiTimeframeFrame, bar_index: usize) -> StrategyResult;
}
