//! TradeRecord: the finalized result of one simulated trade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ZoneKind;

/// Position side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1.0 for long, -1.0 for short. Multiplies price moves into favorable moves.
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

/// How a trade ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeOutcome {
    Win,
    Loss,
    PartialThenWin,
    PartialThenLoss,
    /// The series ended before any closing exit was hit.
    Unresolved,
}

impl TradeOutcome {
    pub fn is_win(self) -> bool {
        matches!(self, Self::Win | Self::PartialThenWin)
    }

    pub fn is_loss(self) -> bool {
        matches!(self, Self::Loss | Self::PartialThenLoss)
    }

    pub fn is_resolved(self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

/// What triggered an exit fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Partial,
    TrailingStop,
}

/// One closure event, full or partial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitFill {
    pub time: DateTime<Utc>,
    pub price: f64,
    /// Fraction of the original position closed by this fill.
    pub size: f64,
    pub reason: ExitReason,
    pub pnl_pips: f64,
    pub pnl_currency: f64,
}

/// Lifecycle flags accumulated over a trade's life.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleFlags {
    pub break_even_moved: bool,
    pub partial_taken: bool,
    pub trailing: bool,
}

/// A finalized trade: entry, every exit fill, and the net result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub side: Side,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_price: Option<f64>,
    pub outcome: TradeOutcome,
    pub pnl_pips: f64,
    pub pnl_currency: f64,
    pub bars_held: usize,
    pub exits: Vec<ExitFill>,
    pub flags: LifecycleFlags,
    /// Size still open when the record was produced (0 for closed trades).
    pub remaining_size: f64,
    /// Pattern kind whose signal opened the trade; `None` for engine entries.
    #[serde(default)]
    pub trigger: Option<ZoneKind>,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.outcome.is_win()
    }

    pub fn is_closed(&self) -> bool {
        self.outcome.is_resolved()
    }
}
