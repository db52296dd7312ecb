//! Liquidity pools: 5-bar swing fractals where resting stops cluster.
//!
//! For `i` in `[2, n-2)`, a bar whose low equals the minimum low of
//! `bars[i-2..=i+2]` is a bullish pool (sell-side liquidity below), and a bar
//! whose high equals the window maximum is a bearish pool. Zones are
//! degenerate: `low == high == level`.

use crate::domain::{Bar, Bias, Zone, ZoneKind};

/// Bars on each side of the fractal center.
pub const FRACTAL_WING: usize = 2;

pub fn detect_liquidity_pools(bars: &[Bar]) -> Vec<Zone> {
    let n = bars.len();
    let mut zones = Vec::new();
    if n < 2 * FRACTAL_WING + 1 {
        return zones;
    }
    for i in FRACTAL_WING..n - FRACTAL_WING {
        let window = &bars[i - FRACTAL_WING..=i + FRACTAL_WING];
        let min_low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let max_high = window
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max);
        let bar = &bars[i];
        if bar.low == min_low {
            zones.push(Zone::new(i, bar.low, bar.low, Bias::Bullish, ZoneKind::LiquidityPool));
        }
        if bar.high == max_high {
            zones.push(Zone::new(i, bar.high, bar.high, Bias::Bearish, ZoneKind::LiquidityPool));
        }
    }
    zones
}
