//! Confluence checks evaluated on the last bar of one timeframe.
//!
//! Each check looks up one reference structure in the history (a flip, a gap,
//! a liquidity pool, a completed session range) and asks whether the last bar
//! reacted to it. A check with no reference structure is not attempted at all
//! and does not count towards the scorer's total.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Bias, Zone};
use crate::patterns::{detect_fair_value_gaps, detect_liquidity_pools, detect_order_block_flips};
use crate::session::{Session, SessionRange, SessionTable};

/// One configurable confluence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    OrderBlockRetest,
    GapRetest,
    LiquiditySweep,
    SessionRangeSweep,
}

/// Result of running one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    /// No reference structure to test against.
    NotApplicable,
    /// Attempted, did not fire.
    Quiet,
    Bullish,
    Bearish,
}

impl CheckOutcome {
    pub fn is_attempted(self) -> bool {
        self != Self::NotApplicable
    }

    /// Contribution to the running score.
    pub fn score(self) -> i32 {
        match self {
            Self::Bullish => 1,
            Self::Bearish => -1,
            Self::NotApplicable | Self::Quiet => 0,
        }
    }

    fn from_sides(bullish: bool, bearish: bool) -> Self {
        match (bullish, bearish) {
            (true, false) => Self::Bullish,
            (false, true) => Self::Bearish,
            _ => Self::Quiet,
        }
    }
}

impl Check {
    pub fn name(self) -> &'static str {
        match self {
            Self::OrderBlockRetest => "order_block_retest",
            Self::GapRetest => "gap_retest",
            Self::LiquiditySweep => "liquidity_sweep",
            Self::SessionRangeSweep => "session_range_sweep",
        }
    }

    /// Evaluate the check on the last bar of `bars`, using only `bars` as history.
    pub fn run(self, bars: &[Bar], sessions: &SessionTable, range_session: Session) -> CheckOutcome {
        let Some(last) = bars.last() else {
            return CheckOutcome::NotApplicable;
        };
        let last_index = bars.len() - 1;
        match self {
            Self::OrderBlockRetest => {
                retest(latest_before(detect_order_block_flips(bars), last_index), last)
            }
            Self::GapRetest => retest(latest_before(detect_fair_value_gaps(bars), last_index), last),
            Self::LiquiditySweep => liquidity_sweep(bars, last_index, last),
            Self::SessionRangeSweep => {
                session_sweep(sessions.completed_range(bars, range_session), last)
            }
        }
    }
}

fn latest_before(zones: Vec<Zone>, last_index: usize) -> Option<Zone> {
    zones.into_iter().rev().find(|z| z.anchor_index < last_index)
}

/// The zone's own bias is the only direction that can fire.
fn retest(zone: Option<Zone>, last: &Bar) -> CheckOutcome {
    let Some(zone) = zone else {
        return CheckOutcome::NotApplicable;
    };
    let fired = match zone.bias {
        Bias::Bullish => last.low <= zone.high && last.is_bullish(),
        Bias::Bearish => last.high >= zone.low && last.is_bearish(),
    };
    match (fired, zone.bias) {
        (true, Bias::Bullish) => CheckOutcome::Bullish,
        (true, Bias::Bearish) => CheckOutcome::Bearish,
        (false, _) => CheckOutcome::Quiet,
    }
}

fn liquidity_sweep(bars: &[Bar], last_index: usize, last: &Bar) -> CheckOutcome {
    // A pool is usable once its whole 5-bar window lies before the last bar.
    let pools = detect_liquidity_pools(bars);
    let settled = |bias: Bias| {
        pools
            .iter()
            .rev()
            .find(|z| z.bias == bias && z.anchor_index + 2 < last_index)
            .map(|z| z.low)
    };
    let (swing_low, swing_high) = (settled(Bias::Bullish), settled(Bias::Bearish));
    if swing_low.is_none() && swing_high.is_none() {
        return CheckOutcome::NotApplicable;
    }
    let bullish = swing_low.is_some_and(|level| last.low <= level && last.close > level);
    let bearish = swing_high.is_some_and(|level| last.high >= level && last.close < level);
    CheckOutcome::from_sides(bullish, bearish)
}

fn session_sweep(range: Option<SessionRange>, last: &Bar) -> CheckOutcome {
    let Some(range) = range else {
        return CheckOutcome::NotApplicable;
    };
    let bullish = last.low <= range.low && last.close > range.low;
    let bearish = last.high >= range.high && last.close < range.high;
    CheckOutcome::from_sides(bullish, bearish)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::make_bars;
    use chrono::{Duration, TimeZone, Utc};

    fn run(check: Check, bars: &[Bar]) -> CheckOutcome {
        check.run(bars, &SessionTable::standard(), Session::Asia)
    }

    #[test]
    fn empty_history_is_not_applicable() {
        for check in [
            Check::OrderBlockRetest,
            Check::GapRetest,
            Check::LiquiditySweep,
            Check::SessionRangeSweep,
        ] {
            assert_eq!(run(check, &[]), CheckOutcome::NotApplicable);
        }
    }

    #[test]
    fn bullish_flip_retest_fires() {
        let bars = make_bars(&[
            (2.0, 2.0, 1.0, 1.0),
            (1.0, 2.0, 1.0, 2.0),
            (1.0, 2.0, 1.0, 2.0),
        ]);
        assert_eq!(run(Check::OrderBlockRetest, &bars), CheckOutcome::Bullish);
    }

    #[test]
    fn bearish_close_into_bullish_flip_is_quiet() {
        let bars = make_bars(&[
            (2.0, 2.0, 1.0, 1.0),
            (1.0, 2.0, 1.0, 2.0),
            (2.0, 2.0, 1.0, 1.0),
        ]);
        assert_eq!(run(Check::OrderBlockRetest, &bars), CheckOutcome::Quiet);
    }

    #[test]
    fn flip_on_last_bar_is_not_a_reference() {
        let bars = make_bars(&[(1.0, 2.0, 1.0, 2.0), (2.0, 2.0, 1.0, 1.0)]);
        assert_eq!(run(Check::OrderBlockRetest, &bars), CheckOutcome::NotApplicable);
    }

    #[test]
    fn gap_retest_fires_on_bullish_gap() {
        let bars = make_bars(&[
            (10.0, 11.0, 9.0, 10.5),
            (10.5, 14.0, 10.4, 13.8),
            (13.8, 15.0, 12.0, 14.5),
            (14.5, 14.6, 11.5, 14.0), // dips into [11, 12], closes down
            (14.0, 14.8, 11.8, 14.6), // dips into the gap, closes up
        ]);
        assert_eq!(run(Check::GapRetest, &bars[..4]), CheckOutcome::Quiet);
        assert_eq!(run(Check::GapRetest, &bars), CheckOutcome::Bullish);
    }

    #[test]
    fn liquidity_sweep_of_swing_low() {
        let mut ohlc = vec![
            (10.0, 10.5, 9.5, 10.0),
            (10.0, 10.4, 9.2, 9.8),
            (9.8, 10.3, 8.0, 9.0), // swing low 8.0
            (9.0, 10.2, 8.5, 9.5),
            (9.5, 10.1, 9.0, 10.0),
        ];
        // Window of the pool ends at index 4, so a sixth bar is needed.
        assert_eq!(run(Check::LiquiditySweep, &make_bars(&ohlc)), CheckOutcome::NotApplicable);
        ohlc.push((9.0, 9.5, 7.9, 8.6));
        assert_eq!(run(Check::LiquiditySweep, &make_bars(&ohlc)), CheckOutcome::Bullish);
    }

    #[test]
    fn session_sweep_of_asia_low() {
        let start = Utc.with_ymd_and_hms(2025, 1, 2, 1, 0, 0).unwrap();
        let mut bars = make_bars(&[
            (10.0, 11.0, 9.0, 10.5),
            (10.5, 12.0, 10.0, 11.0),
            (11.0, 11.5, 9.5, 10.0),
            (10.0, 10.5, 8.5, 9.5), // 09:00 London, sweeps 9.0 and closes above
        ]);
        for (i, bar) in bars.iter_mut().enumerate() {
            bar.time = start + Duration::hours(2 * i as i64);
        }
        bars[3].time = Utc.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap();
        assert_eq!(run(Check::SessionRangeSweep, &bars), CheckOutcome::Bullish);
    }

    #[test]
    fn session_sweep_both_sides_is_quiet() {
        let range = SessionRange {
            session: Session::Asia,
            start: Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 1, 2, 8, 0, 0).unwrap(),
            high: 11.0,
            low: 9.0,
            high_index: 0,
            low_index: 1,
        };
        // Outside bar sweeping both ends and closing inside the range.
        let bar = make_bars(&[(10.0, 12.0, 8.0, 9.5)])[0];
        assert_eq!(session_sweep(Some(range), &bar), CheckOutcome::Quiet);
        assert_eq!(session_sweep(None, &bar), CheckOutcome::NotApplicable);
    }
}
