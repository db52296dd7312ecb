//! Trade lifecycle simulation.
//!
//! A [`TradeSimulator`] takes an entry and the bars that follow it and runs a
//! [`Position`] through them until it closes or the bars run out. Every
//! distance in [`RiskParams`] is in price units; the runner converts pips.

pub mod position;
pub mod ratchet;

pub use position::{Position, StepEvent};
pub use ratchet::TrailingStop;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Bar, Side, TradeOutcome, TradeRecord};

/// Errors raised while validating [`RiskParams`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    #[error("{field} must be finite and > 0, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("partial_ratio must lie strictly between 0 and 1, got {0}")]
    PartialRatio(f64),
}

/// Risk parameters, all in price units except `pip_value` (currency per pip
/// per unit size) and `partial_ratio` (fraction of the remaining size).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    pub pip_size: f64,
    pub pip_value: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub break_even_trigger: f64,
    pub break_even_buffer: f64,
    pub partial_trigger: f64,
    pub partial_ratio: f64,
    pub trail_trigger: f64,
    pub trail_distance: f64,
}

impl RiskParams {
    pub fn validate(&self) -> Result<(), RiskError> {
        let distances = [
            ("pip_size", self.pip_size),
            ("pip_value", self.pip_value),
            ("stop_loss", self.stop_loss),
            ("take_profit", self.take_profit),
            ("break_even_trigger", self.break_even_trigger),
            ("break_even_buffer", self.break_even_buffer),
            ("partial_trigger", self.partial_trigger),
            ("trail_trigger", self.trail_trigger),
            ("trail_distance", self.trail_distance),
        ];
        for (field, value) in distances {
            if !value.is_finite() || value <= 0.0 {
                return Err(RiskError::NotPositive { field, value });
            }
        }
        if !(self.partial_ratio > 0.0 && self.partial_ratio < 1.0) {
            return Err(RiskError::PartialRatio(self.partial_ratio));
        }
        Ok(())
    }
}

/// Where and when a simulated trade starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub side: Side,
    pub time: DateTime<Utc>,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct TradeSimulator {
    params: RiskParams,
}

impl TradeSimulator {
    pub fn new(params: RiskParams) -> Result<Self, RiskError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &RiskParams {
        &self.params
    }

    /// Run one trade over `bars`, which must all come after the entry.
    ///
    /// Running out of bars yields [`TradeOutcome::Unresolved`]; partial fills
    /// realized before that stay on the record.
    pub fn simulate(&self, entry: Entry, bars: &[Bar]) -> TradeRecord {
        let mut position = Position::open(entry, self.params);
        let mut exits = Vec::new();
        let mut bars_held: usize = 0;
        let mut closed = None;

        for bar in bars {
            bars_held += 1;
            if let StepEvent::Closed(outcome) = position.step(bar, &mut exits) {
                closed = Some(outcome);
                break;
            }
        }

        let outcome = closed.unwrap_or(TradeOutcome::Unresolved);
        let (exit_time, exit_price) = match (closed, exits.last()) {
            (Some(_), Some(last)) => (Some(last.time), Some(last.price)),
            _ => (None, None),
        };
        let pnl_pips: f64 = exits.iter().map(|f| f.pnl_pips).sum();
        let pnl_currency: f64 = exits.iter().map(|f| f.pnl_currency).sum();

        tracing::debug!(
            side = ?entry.side,
            entry = entry.price,
            ?outcome,
            pnl_pips,
            bars_held,
            "trade finished"
        );

        TradeRecord {
            side: entry.side,
            entry_time: entry.time,
            entry_price: entry.price,
            exit_time,
            exit_price,
            outcome,
            pnl_pips,
            pnl_currency,
            bars_held,
            exits,
            flags: position.flags,
            remaining_size: position.remaining_size,
            trigger: None,
        }
    }
}
