//! Fair value gap: a three-bar imbalance where bar[i-2] and bar[i] do not overlap.
//!
//! Bullish when `bar[i-2].high < bar[i].low`; bearish when `bar[i-2].low > bar[i].high`.
//! The zone spans the untraded price between the two wicks and is anchored at
//! the confirming bar `i`.

use crate::domain::{Bar, Bias, Zone, ZoneKind};

pub fn detect_fair_value_gaps(bars: &[Bar]) -> Vec<Zone> {
    let mut zones = Vec::new();
    for i in 2..bars.len() {
        let (first, third) = (&bars[i - 2], &bars[i]);
        if first.high < third.low {
            zones.push(Zone::new(
                i,
                first.high,
                third.low,
                Bias::Bullish,
                ZoneKind::FairValueGap,
            ));
        } else if first.low > third.high {
            zones.push(Zone::new(
                i,
                third.high,
                first.low,
                Bias::Bearish,
                ZoneKind::FairValueGap,
            ));
        }
    }
    zones
}
