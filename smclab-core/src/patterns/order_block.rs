//! Order blocks: the last opposing candle before a directional move.
//!
//! Two variants are detected:
//! - [`detect_order_blocks`]: triple-bar form used by the signal scan. For each
//!   `i` in `[1, n-2)` with `(prev, cur, next)`: bullish when `prev` closed down
//!   and `next` closes above `cur`; bearish on the mirror. Zone = range of `cur`.
//! - [`detect_order_block_flips`]: two-bar body flip used by the scorer. Bullish
//!   when a bearish bar is followed by a bullish one; the zone is the range of
//!   the opposing (earlier) candle, anchored at the flip bar.

use crate::domain::{Bar, Bias, Zone, ZoneKind};

pub fn detect_order_blocks(bars: &[Bar]) -> Vec<Zone> {
    let n = bars.len();
    let mut zones = Vec::new();
    if n < 3 {
        return zones;
    }
    for i in 1..n - 2 {
        let (prev, cur, next) = (&bars[i - 1], &bars[i], &bars[i + 1]);
        let bias = if prev.close < prev.open && next.close > cur.close {
            Bias::Bullish
        } else if prev.close > prev.open && next.close < cur.close {
            Bias::Bearish
        } else {
            continue;
        };
        zones.push(Zone::new(i, cur.low, cur.high, bias, ZoneKind::OrderBlock));
    }
    zones
}

pub fn detect_order_block_flips(bars: &[Bar]) -> Vec<Zone> {
    bars.windows(2)
        .enumerate()
        .filter_map(|(k, pair)| {
            let (opposing, flip) = (&pair[0], &pair[1]);
            let bias = if opposing.is_bearish() && flip.is_bullish() {
                Bias::Bullish
            } else if opposing.is_bullish() && flip.is_bearish() {
                Bias::Bearish
            } else {
                return None;
            };
            Some(Zone::new(
                k + 1,
                opposing.low,
                opposing.high,
                bias,
                ZoneKind::OrderBlockFlip,
            ))
        })
        .collect()
}
