//! Zones and signals: the typed output of pattern detection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::Session;

/// Directional bias of a detected structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    Bullish,
    Bearish,
}

impl Bias {
    pub fn opposite(self) -> Self {
        match self {
            Self::Bullish => Self::Bearish,
            Self::Bearish => Self::Bullish,
        }
    }

    /// +1 for bullish, -1 for bearish.
    pub fn sign(self) -> i32 {
        match self {
            Self::Bullish => 1,
            Self::Bearish => -1,
        }
    }
}

/// Which detector produced a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    FairValueGap,
    OrderBlock,
    OrderBlockFlip,
    BreakerBlock,
    BreakOfStructure,
    ChangeOfCharacter,
    LiquidityPool,
}

impl ZoneKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::FairValueGap => "fair_value_gap",
            Self::OrderBlock => "order_block",
            Self::OrderBlockFlip => "order_block_flip",
            Self::BreakerBlock => "breaker_block",
            Self::BreakOfStructure => "break_of_structure",
            Self::ChangeOfCharacter => "change_of_character",
            Self::LiquidityPool => "liquidity_pool",
        }
    }
}

/// A price zone anchored at one bar of the scanned slice.
///
/// Zones are scoped to one detection pass: `anchor_index` indexes the slice
/// that was scanned, not any global timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub anchor_index: usize,
    pub low: f64,
    pub high: f64,
    pub bias: Bias,
    pub kind: ZoneKind,
}

impl Zone {
    pub fn new(anchor_index: usize, a: f64, b: f64, bias: Bias, kind: ZoneKind) -> Self {
        Self {
            anchor_index,
            low: a.min(b),
            high: a.max(b),
            bias,
            kind,
        }
    }
}

/// A tagged event attached to a specific bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub time: DateTime<Utc>,
    pub bar_index: usize,
    pub kind: ZoneKind,
    pub bias: Bias,
    pub session: Session,
}
