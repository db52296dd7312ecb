//! Integration tests for the runner: TOML config + CSV files → BacktestResult.
//!
//! Fixtures are tiny hourly series written to a temp dir, small enough that
//! every decision and fill can be worked out by hand.

use std::collections::BTreeMap;
use std::path::PathBuf;

use smclab_core::domain::{ExitReason, Side, TradeOutcome, ZoneKind};
use smclab_core::strategy::Direction;
use smclab_runner::config::BacktestConfig;
use smclab_runner::data_loader::{load_frame, LoadError};
use smclab_runner::runner::{
    latest_decision, run_from_files, BacktestResult, RunError, SCHEMA_VERSION,
};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

const RISK: &str = r#"
[risk]
pip_size = 0.01
pip_value = 1.0
stop_loss_pips = 50.0
take_profit_pips = 100.0
break_even_trigger_pips = 20.0
break_even_buffer_pips = 1.0
partial_trigger_pips = 40.0
partial_ratio = 0.5
trail_trigger_pips = 60.0
trail_distance_pips = 20.0
"#;

const ENGINE: &str = r#"
[engine]
threshold = 0.5

[[engine.strategies]]
type = "custom"
weight = 1.0

[engine.strategies.config]
name = "ob_1h"

[[engine.strategies.config.timeframes]]
timeframe = "1h"
checks = ["order_block_retest"]
"#;

fn engine_config(allow_overlap: bool) -> BacktestConfig {
    let text = format!(
        "[backtest]\nsymbol = \"TEST\"\nreference = \"1h\"\nwarmup_bars = 2\nallow_overlap = {allow_overlap}\n{RISK}{ENGINE}"
    );
    BacktestConfig::from_toml(&text).unwrap()
}

fn pattern_config(session: &str) -> BacktestConfig {
    let text = format!(
        "[backtest]\nsymbol = \"TEST\"\nreference = \"1h\"\nsignal_source = \"patterns\"\n{RISK}{ENGINE}\n\
         [patterns]\nkinds = [\"fair_value_gap\"]\nsessions = [\"{session}\"]\n"
    );
    BacktestConfig::from_toml(&text).unwrap()
}

/// Hourly rows `(open, high, low, close)` from Monday 2025-01-06 00:00 UTC.
fn write_bars(dir: &tempfile::TempDir, name: &str, rows: &[(f64, f64, f64, f64)]) -> PathBuf {
    let mut csv = String::from("time,open,high,low,close\n");
    for (i, (o, h, l, c)) in rows.iter().enumerate() {
        csv.push_str(&format!("2025-01-06 {i:02}:00,{o},{h},{l},{c}\n"));
    }
    let path = dir.path().join(name);
    std::fs::write(&path, csv).unwrap();
    path
}

fn paths(path: PathBuf) -> BTreeMap<String, PathBuf> {
    BTreeMap::from([("1h".to_string(), path)])
}

/// Bearish bar, bullish flip, bullish retest of the flipped block at bar 2.
const FLIP: [(f64, f64, f64, f64); 3] = [(2.0, 2.0, 1.0, 1.0), (1.0, 2.0, 1.0, 2.0), (1.0, 2.0, 1.0, 2.0)];

fn run(config: &BacktestConfig, rows: &[(f64, f64, f64, f64)]) -> BacktestResult {
    let dir = tempfile::tempdir().unwrap();
    let path = write_bars(&dir, "bars_1h.csv", rows);
    run_from_files(config, &paths(path)).unwrap()
}

// ──────────────────────────────────────────────
// Engine mode
// ──────────────────────────────────────────────

#[test]
fn engine_buy_hits_take_profit() {
    let mut rows = FLIP.to_vec();
    rows.push((2.0, 3.2, 1.9, 3.0));
    rows.push((3.0, 3.05, 2.95, 3.0));
    let result = run(&engine_config(false), &rows);

    assert_eq!(result.schema_version, SCHEMA_VERSION);
    assert_eq!(result.bar_count, 5);
    assert_eq!(result.decisions.len(), 2);
    assert_eq!(result.decisions[0].bar_index, 2);
    assert_eq!(result.decisions[0].direction, Direction::Buy);
    assert_eq!(result.decisions[0].confidence, 1.0);

    // Bar 3 also says Buy but the first trade is still open on that bar.
    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.side, Side::Long);
    assert_eq!(trade.entry_price, 2.0);
    assert_eq!(trade.outcome, TradeOutcome::Win);
    assert_eq!(trade.exits[0].reason, ExitReason::TakeProfit);
    assert!((trade.pnl_currency - 100.0).abs() < 1e-6);
    assert_eq!(trade.trigger, None);
    assert!(result.by_kind.is_empty());

    assert_eq!(result.summary.trades, 1);
    assert_eq!(result.summary.win_rate, 1.0);
    assert_eq!(result.weekly.len(), 1);
    assert_eq!(result.weekly[0].week_start.to_string(), "2025-01-06");
}

#[test]
fn overlap_allows_second_entry() {
    let mut rows = FLIP.to_vec();
    rows.push((2.0, 3.2, 1.9, 3.0));
    rows.push((3.0, 3.05, 2.95, 3.0));
    let result = run(&engine_config(true), &rows);

    assert_eq!(result.trades.len(), 2);
    assert_eq!(result.trades[1].entry_price, 3.0);
    assert_eq!(result.trades[1].outcome, TradeOutcome::Unresolved);
    assert_eq!(result.summary.trades, 1);
    assert_eq!(result.summary.unresolved, 1);
}

#[test]
fn unresolved_trade_stays_open_to_the_end() {
    let mut rows = FLIP.to_vec();
    for _ in 0..3 {
        rows.push((2.0, 2.1, 1.9, 2.0));
    }
    let result = run(&engine_config(false), &rows);

    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.outcome, TradeOutcome::Unresolved);
    assert_eq!(trade.bars_held, 3);
    assert!(trade.exit_time.is_none());
    assert_eq!(result.summary.trades, 0);
    assert!(result.weekly.is_empty());
}

#[test]
fn warmup_covers_whole_series() {
    let mut config = engine_config(false);
    config.backtest.warmup_bars = 10;
    let result = run(&config, &FLIP);
    assert!(result.decisions.is_empty());
    assert!(result.trades.is_empty());
    assert_eq!(result.summary.win_rate, 0.0);
}

#[test]
fn zero_confidence_decisions_are_not_traded() {
    let mut config = engine_config(false);
    config.engine.threshold = 0.0;
    // No flips anywhere, so every check is not applicable and the total is 0.
    let result = run(&config, &[(2.0, 2.0, 1.0, 1.0); 4]);

    assert_eq!(result.decisions.len(), 2);
    assert!(result
        .decisions
        .iter()
        .all(|d| d.direction == Direction::Buy && d.confidence == 0.0));
    assert!(result.trades.is_empty());
}

#[test]
fn latest_decision_reads_last_bar() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_bars(&dir, "bars_1h.csv", &FLIP);
    let frame = load_frame("1h", &paths(path)).unwrap();
    let decision = latest_decision(&engine_config(false), &frame).unwrap().unwrap();
    assert_eq!(decision.bar_index, 2);
    assert_eq!(decision.direction, Direction::Buy);
    assert_eq!(decision.votes.len(), 1);
    assert_eq!(decision.votes[0].strategy, "ob_1h");
}

// ──────────────────────────────────────────────
// Pattern mode
// ──────────────────────────────────────────────

/// Bullish gap confirmed at bar 2 (Asia), then a drop through the stop.
const GAP_THEN_DROP: [(f64, f64, f64, f64); 4] = [
    (1.0, 1.2, 1.0, 1.2),
    (1.2, 2.0, 1.2, 2.0),
    (2.0, 2.2, 1.9, 2.2),
    (2.2, 2.2, 1.6, 1.7),
];

#[test]
fn pattern_gap_long_stops_out() {
    let result = run(&pattern_config("asia"), &GAP_THEN_DROP);

    assert!(result.decisions.is_empty());
    assert_eq!(result.signals.len(), 1);
    assert_eq!(result.signals[0].bar_index, 2);

    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.side, Side::Long);
    assert_eq!(trade.entry_price, 2.2);
    assert_eq!(trade.outcome, TradeOutcome::Loss);
    assert_eq!(trade.exits[0].reason, ExitReason::StopLoss);
    assert!((trade.pnl_currency + 50.0).abs() < 1e-6);
    assert_eq!(trade.trigger, Some(ZoneKind::FairValueGap));
    assert_eq!(result.summary.losses, 1);

    assert_eq!(result.by_kind.len(), 1);
    let gaps = &result.by_kind[0];
    assert_eq!(gaps.kind, ZoneKind::FairValueGap);
    assert_eq!((gaps.trades, gaps.wins, gaps.losses), (1, 0, 1));
    assert_eq!(gaps.win_rate, 0.0);
    assert!((gaps.pnl + 50.0).abs() < 1e-6);
}

#[test]
fn pattern_session_filter_blocks_entries() {
    let result = run(&pattern_config("london"), &GAP_THEN_DROP);
    assert!(result.signals.is_empty());
    assert!(result.trades.is_empty());
}

#[test]
fn pattern_fade_reverses_side() {
    let mut config = pattern_config("asia");
    config.patterns.fade = true;
    let result = run(&config, &GAP_THEN_DROP);
    assert_eq!(result.trades[0].side, Side::Short);
}

// ──────────────────────────────────────────────
// Errors and serialization
// ──────────────────────────────────────────────

#[test]
fn missing_reference_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_bars(&dir, "bars_4h.csv", &FLIP);
    let files = BTreeMap::from([("4h".to_string(), path)]);
    let err = run_from_files(&engine_config(false), &files).unwrap_err();
    assert!(matches!(err, RunError::Data(LoadError::Frame(_))));
}

#[test]
fn run_is_reproducible() {
    let a = run(&engine_config(false), &FLIP);
    let b = run(&engine_config(false), &FLIP);
    assert_eq!(a.run_id, b.run_id);
    assert_eq!(a.dataset_hash, b.dataset_hash);
    assert_eq!(a.trades, b.trades);
}

#[test]
fn json_without_schema_version_uses_current() {
    let result = run(&engine_config(false), &FLIP);
    let mut value = serde_json::to_value(&result).unwrap();
    let object = value.as_object_mut().unwrap();
    object.remove("schema_version");
    object.remove("by_kind");
    let back: BacktestResult = serde_json::from_value(value).unwrap();
    assert_eq!(back.schema_version, SCHEMA_VERSION);
    assert!(back.by_kind.is_empty());
    assert_eq!(back.trades, result.trades);
}
