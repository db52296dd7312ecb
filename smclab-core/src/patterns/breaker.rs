//! Breaker blocks: a failed order block retested from the other side.
//!
//! For `i` in `[2, n-2)`:
//! - bearish: `bar[i-2].high < bar[i].high` and `bar[i-1]` closed down; each of
//!   `bar[i+1]`, `bar[i+2]` whose low trades below `bar[i-1].high` is a retest.
//! - bullish: `bar[i-2].low > bar[i].low` and `bar[i-1]` closed up; each of the
//!   next two bars whose high trades above `bar[i-1].low` is a retest.
//!
//! One zone (the range of `bar[i-1]`) is emitted per retest, anchored at the
//! retest bar. Both directions are evaluated independently.

use crate::domain::{Bar, Bias, Zone, ZoneKind};

pub fn detect_breaker_blocks(bars: &[Bar]) -> Vec<Zone> {
    let n = bars.len();
    let mut zones = Vec::new();
    if n < 4 {
        return zones;
    }
    for i in 2..n - 2 {
        let (origin, block, pivot) = (&bars[i - 2], &bars[i - 1], &bars[i]);

        if origin.high < pivot.high && block.close < block.open {
            for j in i + 1..=i + 2 {
                if bars[j].low < block.high {
                    zones.push(breaker(j, block, Bias::Bearish));
                }
            }
        }
        if origin.low > pivot.low && block.close > block.open {
            for j in i + 1..=i + 2 {
                if bars[j].high > block.low {
                    zones.push(breaker(j, block, Bias::Bullish));
                }
            }
        }
    }
    zones.sort_by_key(|z| z.anchor_index);
    zones
}

fn breaker(anchor: usize, block: &Bar, bias: Bias) -> Zone {
    Zone::new(anchor, block.low, block.high, bias, ZoneKind::BreakerBlock)
}
