//! Property tests for the runner's entry scheduling.
//!
//! Uses proptest to verify, over random hourly walks:
//! 1. Without overlap, an entry never lands on a bar an earlier trade still holds
//! 2. Without overlap, nothing follows an unresolved trade
//! 3. With overlap, every confident decision is traded

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use smclab_core::data::MultiTimeframeFrame;
use smclab_core::domain::{Bar, BarSeries};
use smclab_runner::config::BacktestConfig;
use smclab_runner::runner::run_backtest;

const CONFIG: &str = r#"
[backtest]
symbol = "WALK"
reference = "1h"
warmup_bars = 3

[risk]
pip_size = 0.01
pip_value = 1.0
stop_loss_pips = 80.0
take_profit_pips = 160.0
break_even_trigger_pips = 40.0
break_even_buffer_pips = 2.0
partial_trigger_pips = 80.0
partial_ratio = 0.5
trail_trigger_pips = 120.0
trail_distance_pips = 40.0

[engine]
threshold = 0.3

[[engine.strategies]]
type = "custom"
weight = 1.0

[engine.strategies.config]
name = "walk_1h"

[[engine.strategies.config.timeframes]]
timeframe = "1h"
checks = ["order_block_retest", "gap_retest", "liquidity_sweep"]
"#;

fn config(allow_overlap: bool) -> BacktestConfig {
    let mut config = BacktestConfig::from_toml(CONFIG).unwrap();
    config.backtest.allow_overlap = allow_overlap;
    config
}

/// A random walk of sane hourly bars.
fn arb_series(max_len: usize) -> impl Strategy<Value = BarSeries> {
    prop::collection::vec((-1.5..1.5_f64, 0.0..1.0_f64, 0.0..1.0_f64), 4..max_len).prop_map(
        |steps| {
            let start = Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap();
            let mut price = 100.0;
            let bars = steps
                .into_iter()
                .enumerate()
                .map(|(i, (drift, up, down))| {
                    let open = price;
                    let close = open + drift;
                    price = close;
                    Bar {
                        time: start + Duration::hours(i as i64),
                        open,
                        high: open.max(close) + up,
                        low: open.min(close) - down,
                        close,
                        volume: 0.0,
                    }
                })
                .collect();
            BarSeries::new(bars).unwrap()
        },
    )
}

proptest! {
    #[test]
    fn entries_wait_for_the_previous_trade(series in arb_series(60)) {
        let frame = MultiTimeframeFrame::single("1h", series.clone());
        let result = run_backtest(&config(false), &frame).unwrap();

        for pair in result.trades.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            prop_assert!(prev.is_closed());
            let prev_index = series.position_of(prev.entry_time).unwrap();
            let next_index = series.position_of(next.entry_time).unwrap();
            prop_assert!(next_index > prev_index + prev.bars_held);
        }
    }

    #[test]
    fn overlap_trades_every_confident_decision(series in arb_series(60)) {
        let frame = MultiTimeframeFrame::single("1h", series);
        let result = run_backtest(&config(true), &frame).unwrap();

        let confident = result.decisions.iter().filter(|d| d.confidence > 0.0).count();
        prop_assert_eq!(result.trades.len(), confident);
        for (trade, decision) in result
            .trades
            .iter()
            .zip(result.decisions.iter().filter(|d| d.confidence > 0.0))
        {
            prop_assert_eq!(trade.entry_time, decision.time);
        }
    }
}
