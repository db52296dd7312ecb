//! Pattern detectors over bar slices.
//!
//! Every detector is a pure function `&[Bar] -> Vec<Zone>`: no state survives
//! between calls, so scanning a prefix of a series always gives the same zones
//! as scanning that prefix inside a longer run. Too little history yields an
//! empty vector rather than an error.

pub mod breaker;
pub mod gap;
pub mod liquidity;
pub mod order_block;
pub mod structure;

pub use breaker::detect_breaker_blocks;
pub use gap::detect_fair_value_gaps;
pub use liquidity::detect_liquidity_pools;
pub use order_block::{detect_order_block_flips, detect_order_blocks};
pub use structure::detect_structure_breaks;

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Signal, Zone};
use crate::session::SessionTable;

/// Detector families selectable for signal scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    FairValueGap,
    OrderBlock,
    BreakerBlock,
    /// Break of structure and change of character.
    Structure,
}

impl PatternKind {
    /// Fixed detector order, also the tie-break order within one bar.
    pub const ALL: [PatternKind; 4] = [
        PatternKind::FairValueGap,
        PatternKind::OrderBlock,
        PatternKind::BreakerBlock,
        PatternKind::Structure,
    ];

    pub fn detect(self, bars: &[Bar]) -> Vec<Zone> {
        match self {
            Self::FairValueGap => detect_fair_value_gaps(bars),
            Self::OrderBlock => detect_order_blocks(bars),
            Self::BreakerBlock => detect_breaker_blocks(bars),
            Self::Structure => detect_structure_breaks(bars),
        }
    }
}

/// Run the selected detectors and tag each zone with its anchor bar's session.
///
/// Output is ordered by bar index; zones on the same bar keep detector order
/// (see [`PatternKind::ALL`]) regardless of the order of `kinds`.
pub fn scan_signals(bars: &[Bar], sessions: &SessionTable, kinds: &[PatternKind]) -> Vec<Signal> {
    let mut zones: Vec<Zone> = PatternKind::ALL
        .iter()
        .filter(|k| kinds.contains(k))
        .flat_map(|k| k.detect(bars))
        .collect();
    zones.sort_by_key(|z| z.anchor_index);

    zones
        .into_iter()
        .map(|z| {
            let time = bars[z.anchor_index].time;
            Signal {
                time,
                bar_index: z.anchor_index,
                kind: z.kind,
                bias: z.bias,
                session: sessions.classify(time),
            }
        })
        .collect()
}

/// Hourly bars from `(open, high, low, close)` tuples, starting 2024-01-01 00:00 UTC.
#[cfg(test)]
pub(crate) fn make_bars(ohlc: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    use chrono::{Duration, TimeZone, Utc};
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    ohlc.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            time: start + Duration::hours(i as i64),
            open,
            high,
            low,
            close,
            volume: 0.0,
        })
        .collect()
}
