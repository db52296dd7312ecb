//! Weighted aggregation of several strategies into one decision.
//!
//! `total = Σ weight · confidence · sign(direction)`. Buy when
//! `total ≥ threshold`, Sell when `total ≤ -threshold`, otherwise Neutral.
//! The reported confidence is `|total|`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::MultiTimeframeFrame;
use crate::strategy::{Direction, Strategy, StrategyResult};

/// Allowed deviation of the weight sum from 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Errors raised while building a [`SignalEngine`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("{strategies} strategies but {weights} weights")]
    CountMismatch { strategies: usize, weights: usize },

    #[error("no strategies configured")]
    Empty,

    #[error("weight {weight} of strategy '{strategy}' must be finite and non-negative")]
    InvalidWeight { strategy: String, weight: f64 },

    #[error("weights sum to {0}, expected 1.0")]
    WeightSum(f64),

    #[error("threshold {0} outside [0, 1]")]
    InvalidThreshold(f64),
}

/// Direction, confidence and signed total of a weighted vote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub direction: Direction,
    pub confidence: f64,
    pub total: f64,
}

/// Combine `(result, weight)` pairs under `threshold`.
pub fn aggregate(inputs: &[(StrategyResult, f64)], threshold: f64) -> Aggregate {
    let total: f64 = inputs.iter().map(|(r, w)| w * r.signed()).sum();
    let direction = if total >= threshold {
        Direction::Buy
    } else if total <= -threshold {
        Direction::Sell
    } else {
        Direction::Neutral
    };
    Aggregate {
        direction,
        confidence: total.abs(),
        total,
    }
}

/// One strategy's contribution to a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyVote {
    pub strategy: String,
    pub weight: f64,
    pub result: StrategyResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub direction: Direction,
    pub confidence: f64,
    pub total: f64,
    pub votes: Vec<StrategyVote>,
}

pub struct SignalEngine {
    strategies: Vec<Box<dyn Strategy>>,
    weights: Vec<f64>,
    threshold: f64,
}

impl SignalEngine {
    pub fn new(
        strategies: Vec<Box<dyn Strategy>>,
        weights: Vec<f64>,
        threshold: f64,
    ) -> Result<Self, EngineError> {
        if strategies.len() != weights.len() {
            return Err(EngineError::CountMismatch {
                strategies: strategies.len(),
                weights: weights.len(),
            });
        }
        if strategies.is_empty() {
            return Err(EngineError::Empty);
        }
        for (strategy, &weight) in strategies.iter().zip(&weights) {
            if !weight.is_finite() || weight < 0.0 {
                return Err(EngineError::InvalidWeight {
                    strategy: strategy.name().to_string(),
                    weight,
                });
            }
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(EngineError::WeightSum(sum));
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(EngineError::InvalidThreshold(threshold));
        }
        Ok(Self {
            strategies,
            weights,
            threshold,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn strategy_names(&self) -> impl Iterator<Item = &str> {
        self.strategies.iter().map(|s| s.name())
    }

    /// Evaluate every strategy at `bar_index` and combine their results.
    pub fn decide(&self, frame: &MultiTimeframeFrame, bar_index: usize) -> Decision {
        let votes: Vec<StrategyVote> = self
            .strategies
            .iter()
            .zip(&self.weights)
            .map(|(strategy, &weight)| StrategyVote {
                strategy: strategy.name().to_string(),
                weight,
                result: strategy.evaluate(frame, bar_index),
            })
            .collect();
        let inputs: Vec<(StrategyResult, f64)> =
            votes.iter().map(|v| (v.result, v.weight)).collect();
        let Aggregate {
            direction,
            confidence,
            total,
        } = aggregate(&inputs, self.threshold);
        Decision {
            direction,
            confidence,
            total,
            votes,
        }
    }
}
